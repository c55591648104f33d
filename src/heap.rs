//! # Heap allocator (component D)
//!
//! Objects live high-to-low from `himem`, physically inside the shared
//! byte store: a 3-byte header `[name1, name2, type]`, then (arrays and
//! strings only) a 2-byte capacity field, then the payload. `bfind` never
//! builds a parallel index — like `first_pass::SymbolTable`'s insertion-
//! ordered linear scan, lookup here is a linear walk over exactly `nvars`
//! objects, in allocation order, reading directly out of `Memory`.

use crate::config::{Number, NUMBER_SIZE, STRINDEXSIZE};
use crate::error::{BasicError, ErrorKind, Result};
use crate::memory::Memory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjType {
    Scalar,
    Array,
    Str,
}

impl ObjType {
    fn tag(self) -> i8 {
        match self {
            ObjType::Scalar => 0,
            ObjType::Array => 1,
            ObjType::Str => 2,
        }
    }

    fn from_tag(tag: i8) -> Option<Self> {
        match tag {
            0 => Some(ObjType::Scalar),
            1 => Some(ObjType::Array),
            2 => Some(ObjType::Str),
            _ => None,
        }
    }
}

/// 26 scalar slots outside the heap (spec §3, "Static variables").
pub struct Statics {
    slots: [Number; 26],
}

impl Statics {
    pub fn new() -> Self {
        Self { slots: [0 as Number; 26] }
    }

    pub fn get(&self, letter: char) -> Number {
        self.slots[(letter as u8 - b'A') as usize]
    }

    pub fn set(&mut self, letter: char, value: Number) {
        self.slots[(letter as u8 - b'A') as usize] = value;
    }

    pub fn clear(&mut self) {
        self.slots = [0 as Number; 26];
    }
}

impl Default for Statics {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Heap {
    pub nvars: u32,
}

impl Heap {
    pub fn new() -> Self {
        Self { nvars: 0 }
    }

    /// Is `name1`/`name2` a two-letter static name (`A0`..`Z9` style names
    /// are heap objects; a bare single letter with no second character is
    /// a static scalar and never touches the heap).
    pub fn is_static_scalar(name1: char, name2: char) -> bool {
        name1 != '@' && name2 == '\0'
    }

    /// Linear downward scan from `memsize` (spec §4.D): read header, then
    /// capacity for non-scalar kinds, skip the payload, for exactly
    /// `nvars` steps. Returns the *low* payload address, matching `bmalloc`.
    pub fn bfind(&self, mem: &Memory, name1: char, name2: char, ty: ObjType) -> Option<u16> {
        self.bfind_obj(mem, name1, name2, ty).map(|(addr, _cap)| addr)
    }

    /// Allocate a new object. `len` is array length (elements) or string
    /// declared capacity (bytes); ignored for scalars.
    pub fn bmalloc(
        &mut self,
        mem: &mut Memory,
        name1: char,
        name2: char,
        ty: ObjType,
        len: u16,
    ) -> Result<u16> {
        if self.bfind(mem, name1, name2, ty).is_some() {
            return Err(BasicError::new(ErrorKind::Dim));
        }
        let payload_size = match ty {
            ObjType::Scalar => NUMBER_SIZE as u16,
            ObjType::Array => (len as usize * NUMBER_SIZE) as u16,
            ObjType::Str => len + STRINDEXSIZE as u16,
        };
        let header_size = match ty {
            ObjType::Scalar => 3,
            _ => 5,
        };
        let total = payload_size + header_size;
        if (total as usize) > mem.free() {
            return Err(BasicError::new(ErrorKind::OutOfMemory));
        }

        let himem = mem.himem();
        let payload_start = himem + 1 - total;
        let header = payload_start + payload_size;
        mem.write8(header, name1 as i8);
        mem.write8(header + 1, name2 as i8);
        mem.write8(header + 2, ty.tag());
        if ty != ObjType::Scalar {
            mem.write_addr(header - 2, payload_size);
        }
        mem.set_himem(payload_start - 1);
        self.nvars += 1;
        log::debug!(
            "bmalloc {}{}: {:?} len={} total={} bytes at {}, himem now {}",
            name1,
            name2,
            ty,
            len,
            total,
            payload_start,
            mem.himem()
        );
        Ok(payload_start)
    }

    pub fn getvar(&self, mem: &Memory, name1: char, name2: char) -> Result<Number> {
        let addr = self
            .bfind(mem, name1, name2, ObjType::Scalar)
            .ok_or_else(|| BasicError::new(ErrorKind::Variable))?;
        Ok(mem.read_num(addr))
    }

    pub fn setvar(&mut self, mem: &mut Memory, name1: char, name2: char, value: Number) -> Result<()> {
        let addr = self
            .bfind(mem, name1, name2, ObjType::Scalar)
            .ok_or_else(|| BasicError::new(ErrorKind::Variable))?;
        mem.write_num(addr, value);
        Ok(())
    }

    /// `index` is 1-based (spec §4.D).
    pub fn array_get(&self, mem: &Memory, name1: char, name2: char, index: u16) -> Result<Number> {
        let (addr, cap_bytes) = self
            .bfind_obj(mem, name1, name2, ObjType::Array)
            .ok_or_else(|| BasicError::new(ErrorKind::Variable))?;
        let offset = (index.checked_sub(1).ok_or_else(|| BasicError::new(ErrorKind::Range))? as usize)
            * NUMBER_SIZE;
        if offset + NUMBER_SIZE > cap_bytes as usize {
            return Err(BasicError::new(ErrorKind::Range));
        }
        Ok(mem.read_num(addr + offset as u16))
    }

    pub fn array_set(
        &mut self,
        mem: &mut Memory,
        name1: char,
        name2: char,
        index: u16,
        value: Number,
    ) -> Result<()> {
        let (addr, cap_bytes) = self
            .bfind_obj(mem, name1, name2, ObjType::Array)
            .ok_or_else(|| BasicError::new(ErrorKind::Variable))?;
        let offset = (index.checked_sub(1).ok_or_else(|| BasicError::new(ErrorKind::Range))? as usize)
            * NUMBER_SIZE;
        if offset + NUMBER_SIZE > cap_bytes as usize {
            return Err(BasicError::new(ErrorKind::Range));
        }
        mem.write_num(addr + offset as u16, value);
        Ok(())
    }

    pub fn string_get(&self, mem: &Memory, name1: char, name2: char) -> Result<String> {
        let (addr, _cap) = self
            .bfind_obj(mem, name1, name2, ObjType::Str)
            .ok_or_else(|| BasicError::new(ErrorKind::Variable))?;
        let len = mem.read_addr(addr) as u16;
        let bytes = mem.read_bytes(addr + STRINDEXSIZE as u16, len);
        Ok(bytes.iter().map(|&b| b as u8 as char).collect())
    }

    pub fn string_dim(&self, mem: &Memory, name1: char, name2: char) -> Result<u16> {
        let (_, cap) = self
            .bfind_obj(mem, name1, name2, ObjType::Str)
            .ok_or_else(|| BasicError::new(ErrorKind::Variable))?;
        Ok(cap - STRINDEXSIZE as u16)
    }

    pub fn set_string_length(&self, mem: &mut Memory, name1: char, name2: char, len: u16) -> Result<()> {
        let (addr, cap) = self
            .bfind_obj(mem, name1, name2, ObjType::Str)
            .ok_or_else(|| BasicError::new(ErrorKind::Variable))?;
        if len as usize > cap as usize - STRINDEXSIZE {
            return Err(BasicError::new(ErrorKind::String));
        }
        mem.write_addr(addr, len);
        Ok(())
    }

    /// Write `text` into the string starting at 1-based `start`, extending
    /// or truncating per the Stefan-extension toggle (spec §4.F "LET /
    /// assignment"): with the extension, new length is
    /// `max(old_length, start + len - 1)`; without it, always
    /// `start + len - 1` (classic Apple-1 truncation).
    pub fn string_set(
        &self,
        mem: &mut Memory,
        name1: char,
        name2: char,
        start: u16,
        text: &str,
        stefan_extension: bool,
    ) -> Result<()> {
        let (addr, cap) = self
            .bfind_obj(mem, name1, name2, ObjType::Str)
            .ok_or_else(|| BasicError::new(ErrorKind::Variable))?;
        let old_len = mem.read_addr(addr);
        let cap_bytes = cap - STRINDEXSIZE as u16;
        let start0 = start.saturating_sub(1);
        let end0 = start0 + text.len() as u16;
        if end0 > cap_bytes {
            return Err(BasicError::new(ErrorKind::String));
        }
        let base = addr + STRINDEXSIZE as u16;
        for (i, ch) in text.chars().enumerate() {
            mem.write8(base + start0 + i as u16, ch as i8);
        }
        let new_len = if stefan_extension { old_len.max(end0) } else { end0 };
        mem.write_addr(addr, new_len);
        Ok(())
    }

    /// Like `bfind` but also returns the object's capacity field (array
    /// element count * NUMBER_SIZE, or string byte capacity including the
    /// length prefix). Scalars have no capacity field; callers that need
    /// one use `bfind`/`getvar` instead.
    pub fn bfind_obj(&self, mem: &Memory, name1: char, name2: char, ty: ObjType) -> Option<(u16, u16)> {
        let mut addr = mem.len() as u32;
        for _ in 0..self.nvars {
            let header = (addr - 3) as u16;
            let n1 = mem.read8(header) as u8 as char;
            let n2 = mem.read8(header + 1) as u8 as char;
            let tag = mem.read8(header + 2);
            let obj_ty = ObjType::from_tag(tag)?;
            let (cap, payload_start) = match obj_ty {
                ObjType::Scalar => (0u16, header - NUMBER_SIZE as u16),
                _ => {
                    let cap = mem.read_addr(header - 2);
                    (cap, header - 2 - cap)
                }
            };
            if n1 == name1 && n2 == name2 && obj_ty == ty {
                return Some((payload_start, cap));
            }
            addr = payload_start as u32;
        }
        None
    }

    pub fn clear(&mut self, mem: &mut Memory) {
        self.nvars = 0;
        mem.set_himem(mem.len() as u16 - 1);
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn setup() -> (Memory, Heap) {
        (Memory::new(&Config { mem: 256, ..Config::default() }), Heap::new())
    }

    #[test]
    fn scalar_roundtrip() {
        let (mut mem, mut heap) = setup();
        let addr = heap.bmalloc(&mut mem, 'A', '0', ObjType::Scalar, 0).unwrap();
        mem.write_num(addr, 42);
        assert_eq!(heap.getvar(&mem, 'A', '0').unwrap(), 42);
        assert_eq!(heap.bfind(&mem, 'A', '0', ObjType::Scalar), Some(addr));
    }

    #[test]
    fn duplicate_dim_errors() {
        let (mut mem, mut heap) = setup();
        heap.bmalloc(&mut mem, 'A', '\0', ObjType::Array, 5).unwrap();
        assert!(heap.bmalloc(&mut mem, 'A', '\0', ObjType::Array, 5).is_err());
    }

    #[test]
    fn array_bounds() {
        let (mut mem, mut heap) = setup();
        heap.bmalloc(&mut mem, 'A', '\0', ObjType::Array, 5).unwrap();
        for i in 1..=5u16 {
            heap.array_set(&mut mem, 'A', '\0', i, i as Number).unwrap();
        }
        assert_eq!(heap.array_get(&mem, 'A', '\0', 3).unwrap(), 3);
        assert!(heap.array_get(&mem, 'A', '\0', 6).is_err());
        assert!(heap.array_get(&mem, 'A', '\0', 0).is_err());
    }

    #[test]
    fn string_truncation_vs_extension() {
        let (mut mem, mut heap) = setup();
        heap.bmalloc(&mut mem, 'A', '\0', ObjType::Str, 10).unwrap();
        heap.string_set(&mut mem, 'A', '\0', 1, "HELLO", true).unwrap();
        assert_eq!(heap.string_get(&mem, 'A', '\0').unwrap(), "HELLO");
        heap.string_set(&mut mem, 'A', '\0', 3, "XY", true).unwrap();
        assert_eq!(heap.string_get(&mem, 'A', '\0').unwrap(), "HEXYO");
        heap.string_set(&mut mem, 'A', '\0', 3, "XY", false).unwrap();
        assert_eq!(heap.string_get(&mem, 'A', '\0').unwrap(), "HEXY");
    }
}
