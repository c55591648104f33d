//! # EEPROM image (spec §6)
//!
//! Byte 0 is a flag (0 = stored but don't autorun, 1 = autorun on boot,
//! 255 = empty); bytes `1..1+ADDR_SIZE` hold the program's `top`; the
//! rest is the program image itself. On boot with flag 1, the
//! interpreter is meant to run directly from this image by setting
//! `st := ERUN` and redirecting token reads to it instead of `Memory`.

use crate::config::ADDR_SIZE;

pub const FLAG_NO_AUTORUN: u8 = 0;
pub const FLAG_AUTORUN: u8 = 1;
pub const FLAG_EMPTY: u8 = 255;

pub struct Image {
    pub flag: u8,
    pub top: u16,
    pub program: Vec<u8>,
}

impl Image {
    pub fn empty() -> Self {
        Self { flag: FLAG_EMPTY, top: 0, program: Vec::new() }
    }

    pub fn from_program(program_bytes: &[i8], top: u16, autorun: bool) -> Self {
        Self {
            flag: if autorun { FLAG_AUTORUN } else { FLAG_NO_AUTORUN },
            top,
            program: program_bytes[..top as usize].iter().map(|&b| b as u8).collect(),
        }
    }

    pub fn header_len() -> usize {
        1 + ADDR_SIZE
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::header_len() + self.program.len());
        out.push(self.flag);
        out.extend_from_slice(&self.top.to_le_bytes());
        out.extend_from_slice(&self.program);
        out
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::header_len() {
            return None;
        }
        let flag = bytes[0];
        let top = u16::from_le_bytes([bytes[1], bytes[2]]);
        let program = bytes[Self::header_len()..].to_vec();
        Some(Self { flag, top, program })
    }

    pub fn should_autorun(&self) -> bool {
        self.flag == FLAG_AUTORUN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let img = Image::from_program(&[1, 2, 3, 4], 3, true);
        let bytes = img.encode();
        let decoded = Image::decode(&bytes).unwrap();
        assert_eq!(decoded.flag, FLAG_AUTORUN);
        assert_eq!(decoded.top, 3);
        assert_eq!(decoded.program, vec![1, 2, 3]);
        assert!(decoded.should_autorun());
    }

    #[test]
    fn empty_image_does_not_autorun() {
        assert!(!Image::empty().should_autorun());
    }
}
