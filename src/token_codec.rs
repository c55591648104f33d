//! # Token wire format
//!
//! The tokenized program store holds tag bytes and their payloads (spec
//! §3, §4.C): `encode_token` turns a scanned `TokenKind` into the bytes
//! `storetoken` appends to the shared buffer; `decode_token` is run mode's
//! half of the tokenizer (spec §4.B: "reads the tag byte at `here`, then
//! the tag-specific payload"), built on the same `TokenSource` trait the
//! character-level lexer uses, so both a live `Memory` region and an
//! EEPROM image mirror decode identically.

use crate::config::{Number, NUMBER_SIZE};
use crate::cursor::TokenSource;
use crate::error::{BasicError, ErrorKind, Result};
use crate::token::{self, Builtin, Keyword, TokenKind};

const TAG_LINENUMBER: u8 = 0;
const TAG_NUMBER: u8 = 1;
const TAG_STRING: u8 = 2;
const TAG_VARIABLE: u8 = 3;
const TAG_ARRAYVAR: u8 = 4;
const TAG_STRINGVAR: u8 = 5;
const TAG_EOL: u8 = 6;
const TAG_KEYWORD: u8 = 7;
const TAG_BUILTIN: u8 = 8;
const TAG_CHAR: u8 = 9;
const TAG_GE: u8 = 10;
const TAG_LE: u8 = 11;
const TAG_NE: u8 = 12;

pub fn encode_token(tok: &TokenKind) -> Vec<u8> {
    let mut out = Vec::new();
    match tok {
        TokenKind::LineNumber(n) => {
            out.push(TAG_LINENUMBER);
            out.extend_from_slice(&n.to_le_bytes());
        }
        TokenKind::Number(n) => {
            out.push(TAG_NUMBER);
            out.extend_from_slice(&n.to_le_bytes());
        }
        TokenKind::Str(s) => {
            out.push(TAG_STRING);
            out.push(s.len().min(255) as u8);
            out.extend(s.bytes().take(255));
        }
        TokenKind::Variable(a, b) => {
            out.push(TAG_VARIABLE);
            out.push(*a as u8);
            out.push(*b as u8);
        }
        TokenKind::ArrayVar(a, b) => {
            out.push(TAG_ARRAYVAR);
            out.push(*a as u8);
            out.push(*b as u8);
        }
        TokenKind::StringVar(a, b) => {
            out.push(TAG_STRINGVAR);
            out.push(*a as u8);
            out.push(*b as u8);
        }
        TokenKind::Eol => out.push(TAG_EOL),
        TokenKind::Keyword(k) => {
            out.push(TAG_KEYWORD);
            out.push(keyword_index(*k));
        }
        TokenKind::Builtin(b) => {
            out.push(TAG_BUILTIN);
            out.push(builtin_index(*b));
        }
        TokenKind::Char(c) => {
            out.push(TAG_CHAR);
            out.push(*c as u8);
        }
        TokenKind::GreaterEqual => out.push(TAG_GE),
        TokenKind::LesserEqual => out.push(TAG_LE),
        TokenKind::NotEqual => out.push(TAG_NE),
    }
    out
}

pub fn decode_token(src: &mut dyn TokenSource) -> Result<TokenKind> {
    let unknown = || BasicError::new(ErrorKind::Unknown);
    let tag = src.read_byte().ok_or_else(unknown)?;
    match tag {
        TAG_LINENUMBER => {
            let lo = src.read_byte().ok_or_else(unknown)? as u16;
            let hi = src.read_byte().ok_or_else(unknown)? as u16;
            Ok(TokenKind::LineNumber(lo | (hi << 8)))
        }
        TAG_NUMBER => {
            let mut bytes = [0u8; NUMBER_SIZE];
            for b in bytes.iter_mut() {
                *b = src.read_byte().ok_or_else(unknown)?;
            }
            Ok(TokenKind::Number(Number::from_le_bytes(bytes)))
        }
        TAG_STRING => {
            let len = src.read_byte().ok_or_else(unknown)? as usize;
            let mut s = String::with_capacity(len);
            for _ in 0..len {
                s.push(src.read_byte().ok_or_else(unknown)? as char);
            }
            Ok(TokenKind::Str(s))
        }
        TAG_VARIABLE | TAG_ARRAYVAR | TAG_STRINGVAR => {
            let a = src.read_byte().ok_or_else(unknown)? as char;
            let b = src.read_byte().ok_or_else(unknown)? as char;
            Ok(match tag {
                TAG_VARIABLE => TokenKind::Variable(a, b),
                TAG_ARRAYVAR => TokenKind::ArrayVar(a, b),
                _ => TokenKind::StringVar(a, b),
            })
        }
        TAG_EOL => Ok(TokenKind::Eol),
        TAG_KEYWORD => {
            let idx = src.read_byte().ok_or_else(unknown)?;
            Ok(TokenKind::Keyword(keyword_from_index(idx).ok_or_else(unknown)?))
        }
        TAG_BUILTIN => {
            let idx = src.read_byte().ok_or_else(unknown)?;
            Ok(TokenKind::Builtin(builtin_from_index(idx).ok_or_else(unknown)?))
        }
        TAG_CHAR => Ok(TokenKind::Char(src.read_byte().ok_or_else(unknown)? as char)),
        TAG_GE => Ok(TokenKind::GreaterEqual),
        TAG_LE => Ok(TokenKind::LesserEqual),
        TAG_NE => Ok(TokenKind::NotEqual),
        _ => Err(unknown()),
    }
}

fn keyword_index(k: Keyword) -> u8 {
    token::KEYWORDS.iter().position(|&(_, kw)| kw == k).unwrap() as u8
}

fn keyword_from_index(i: u8) -> Option<Keyword> {
    token::KEYWORDS.get(i as usize).map(|&(_, kw)| kw)
}

fn builtin_index(b: Builtin) -> u8 {
    token::BUILTINS.iter().position(|&(_, bi)| bi == b).unwrap() as u8
}

fn builtin_from_index(i: u8) -> Option<Builtin> {
    token::BUILTINS.get(i as usize).map(|&(_, bi)| bi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::InteractiveSource;

    fn roundtrip(tok: TokenKind) -> TokenKind {
        let bytes = encode_token(&tok);
        let as_i8: Vec<u8> = bytes;
        let mut src = InteractiveSource::new(&as_i8);
        decode_token(&mut src).unwrap()
    }

    #[test]
    fn all_variants_roundtrip() {
        assert_eq!(roundtrip(TokenKind::LineNumber(10)), TokenKind::LineNumber(10));
        assert_eq!(roundtrip(TokenKind::Number(7 as Number)), TokenKind::Number(7 as Number));
        assert_eq!(roundtrip(TokenKind::Str("HI".into())), TokenKind::Str("HI".into()));
        assert_eq!(roundtrip(TokenKind::Variable('A', '0')), TokenKind::Variable('A', '0'));
        assert_eq!(roundtrip(TokenKind::Keyword(Keyword::Print)), TokenKind::Keyword(Keyword::Print));
        assert_eq!(roundtrip(TokenKind::Builtin(Builtin::Abs)), TokenKind::Builtin(Builtin::Abs));
        assert_eq!(roundtrip(TokenKind::Eol), TokenKind::Eol);
        assert_eq!(roundtrip(TokenKind::NotEqual), TokenKind::NotEqual);
    }
}
