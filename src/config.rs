//! # Configuration
//!
//! The numeric cell type is a build-time choice (spec §3: "selectable at
//! build time"): `i16` by default, `f32` under the `float` feature. Runtime
//! configuration (byte-store size, the Stefan string-assignment extension)
//! is a small `Config` struct threaded in from `main.rs`'s `clap` parsing.

#[cfg(not(feature = "float"))]
pub type Number = i16;

#[cfg(feature = "float")]
pub type Number = f32;

pub const NUMBER_SIZE: usize = std::mem::size_of::<Number>();

/// Two bytes, per spec §3 ("Addresses are unsigned 16-bit").
pub const ADDR_SIZE: usize = 2;

/// Width, in bytes, of a string's logical-length prefix field (spec §3,
/// "`strindexsize` — 2 bytes").
pub const STRINDEXSIZE: usize = 2;

pub const DEFAULT_MEM: usize = 8192;
pub const STACK_SIZE: usize = 32;
pub const GOSUB_DEPTH: usize = 24;
pub const FOR_DEPTH: usize = 12;
pub const INPUT_BUFFER_SIZE: usize = 256;

#[derive(Debug, Clone)]
pub struct Config {
    /// Capacity of the shared byte store, `MEM` in the spec.
    pub mem: usize,
    /// `A$(3)="XY"` extends rather than truncates when set (spec §8 law 3).
    pub stefan_extension: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mem: DEFAULT_MEM,
            stefan_extension: true,
        }
    }
}

/// Whether numeric literals accept a fractional/exponent suffix — tied to
/// the `float` build feature rather than threaded through `Config`, since
/// it's a compile-time choice of `Number` itself (spec §3).
pub fn float_mode() -> bool {
    cfg!(feature = "float")
}
