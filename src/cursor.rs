//! # Token sources
//!
//! Rather than two parallel tokenizer code paths, interactive and run
//! mode are unified behind one small trait (Design Notes, "Tokenizer
//! duality"). `InteractiveSource` wraps the line-input character buffer;
//! `ProgramSource` wraps the shared byte store (or an EEPROM image, when
//! running in `ERUN` mode). `tokenizer::nexttoken` is generic over
//! `dyn TokenSource` and doesn't know or care which backs it.

/// A byte-addressable, seekable source of characters/token bytes.
pub trait TokenSource {
    fn read_byte(&mut self) -> Option<u8>;
    fn peek_byte(&self) -> Option<u8>;
    fn tell(&self) -> u16;
    fn seek(&mut self, pos: u16);
}

/// Interactive mode: the character buffer `ibuffer`, cursor `bi`.
pub struct InteractiveSource<'a> {
    buf: &'a [u8],
    pos: u16,
}

impl<'a> InteractiveSource<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }
}

impl<'a> TokenSource for InteractiveSource<'a> {
    fn read_byte(&mut self) -> Option<u8> {
        let b = *self.buf.get(self.pos as usize)?;
        self.pos += 1;
        Some(b)
    }

    fn peek_byte(&self) -> Option<u8> {
        self.buf.get(self.pos as usize).copied()
    }

    fn tell(&self) -> u16 {
        self.pos
    }

    fn seek(&mut self, pos: u16) {
        self.pos = pos;
    }
}

/// Run mode: a byte range inside the shared store (or the EEPROM mirror),
/// cursor `here`.
pub struct ProgramSource<'a> {
    bytes: &'a [i8],
    base: u16,
    pos: u16,
}

impl<'a> ProgramSource<'a> {
    /// `bytes` is the full backing slice (store or EEPROM image); `base`
    /// is the offset within it at which token data begins, and `pos` is
    /// the absolute cursor (`here`), already `>= base`.
    pub fn new(bytes: &'a [i8], base: u16, pos: u16) -> Self {
        Self { bytes, base, pos }
    }
}

impl<'a> TokenSource for ProgramSource<'a> {
    fn read_byte(&mut self) -> Option<u8> {
        let b = *self.bytes.get(self.pos as usize)? as u8;
        self.pos += 1;
        Some(b)
    }

    fn peek_byte(&self) -> Option<u8> {
        self.bytes.get(self.pos as usize).map(|&b| b as u8)
    }

    fn tell(&self) -> u16 {
        self.pos
    }

    fn seek(&mut self, pos: u16) {
        self.pos = pos.max(self.base);
    }
}
