//! # Program store & line editor (component C)
//!
//! Appends tokens to `[0, top)` and keeps lines in ascending line-number
//! order via in-place block moves. The new line is first tokenized into a
//! small owned scratch buffer — not appended into the shared store — so
//! the subsequent insert/replace/delete shuffling only ever has to reason
//! about *existing* bytes plus one independent buffer, never a self-
//! overlapping rotation inside the store itself.

use crate::cursor::InteractiveSource;
use crate::error::{BasicError, ErrorKind, Result};
use crate::memory::Memory;
use crate::token::TokenKind;
use crate::token_codec::{decode_token, encode_token};
use crate::tokenizer;

/// Append one already-encoded token's bytes at `top`, checking free space
/// first (spec §4.C: "Every write first checks free room"). Used by the
/// executor for statements that write directly into run-mode territory;
/// `storeline` builds its scratch buffer with `encode_token` directly
/// instead, since it isn't writing into the store yet.
pub fn storetoken(mem: &mut Memory, tok: &TokenKind) -> Result<()> {
    let bytes = encode_token(tok);
    if bytes.len() > mem.free() {
        return Err(BasicError::new(ErrorKind::OutOfMemory));
    }
    let top = mem.top();
    for (i, b) in bytes.iter().enumerate() {
        mem.write8(top + i as u16, *b as i8);
    }
    mem.set_top(top + bytes.len() as u16);
    Ok(())
}

/// Tokenize one full interactive line (already stripped of its trailing
/// newline) into a scratch byte buffer, prefixed with its `LineNumber`
/// record and terminated with `Eol`. Returns `None` if the line has no
/// leading line number (an immediate-mode statement, never stored).
pub fn tokenize_line(text: &str, float_mode: bool) -> Result<Option<(u16, Vec<u8>)>> {
    let bytes = text.as_bytes();
    let mut src = InteractiveSource::new(bytes);
    let Some(n) = tokenizer::scan_line_number(&mut src)? else {
        return Ok(None);
    };
    let mut out = encode_token(&TokenKind::LineNumber(n));
    loop {
        let tok = tokenizer::nexttoken(&mut src, float_mode)?;
        let is_eol = matches!(tok, TokenKind::Eol);
        out.extend(encode_token(&tok));
        if is_eol {
            break;
        }
    }
    Ok(Some((n, out)))
}

/// A bare `LineNumber`+`Eol` scratch buffer (4 bytes) is the delete
/// sentinel: the user typed just a line number with nothing after it.
fn is_bare_delete(scratch: &[u8]) -> bool {
    scratch.len() == 4
}

/// The editor (spec §4.C): insert, replace, or delete the line numbered
/// `number`, whose freshly tokenized bytes are `scratch` (already
/// including its `LineNumber` header and trailing `Eol`).
pub fn storeline(mem: &mut Memory, number: u16, scratch: &[u8]) -> Result<()> {
    if is_bare_delete(scratch) {
        if let Some(old_start) = findline_addr(mem, number) {
            let old_len = line_len(mem, old_start);
            let tail_start = old_start + old_len;
            let tail_len = mem.top() - tail_start;
            log::debug!(
                "storeline: deleting line {}, moving {} tail bytes from {} to {}",
                number,
                tail_len,
                tail_start,
                old_start
            );
            mem.moveblock(tail_start, tail_len, old_start)?;
            mem.set_top(mem.top() - old_len);
        }
        return Ok(());
    }

    let new_len = scratch.len() as u16;
    if new_len as usize > mem.free() {
        return Err(BasicError::new(ErrorKind::OutOfMemory));
    }

    // Walk existing lines for the first with number >= the new one.
    let top = mem.top();
    let mut addr = 0u16;
    let mut found: Option<(u16, u16)> = None; // (start, number)
    while addr < top {
        let n = line_number_at(mem, addr);
        if n >= number {
            found = Some((addr, n));
            break;
        }
        addr += line_len(mem, addr);
    }

    match found {
        Some((old_start, old_number)) if old_number == number => {
            replace_at(mem, old_start, new_len, scratch)?;
        }
        Some((old_start, _)) => {
            // Strictly greater: insert before old_start — shift everything
            // from old_start onward up by new_len, then drop the scratch
            // line into the freed gap.
            let tail_len = top - old_start;
            log::debug!(
                "storeline: inserting line {}, moving {} tail bytes from {} to {}",
                number,
                tail_len,
                old_start,
                old_start + new_len
            );
            mem.moveblock(old_start, tail_len, old_start + new_len)?;
            mem.write_bytes_u8(old_start, scratch);
            mem.set_top(top + new_len);
        }
        None => {
            // Nothing has number >= new number: append, unless the last
            // existing line shares the same number (replace it instead).
            if top > 0 {
                let last_start = last_line_start(mem, top);
                if line_number_at(mem, last_start) == number {
                    replace_at(mem, last_start, new_len, scratch)?;
                    return Ok(());
                }
            }
            mem.write_bytes_u8(top, scratch);
            mem.set_top(top + new_len);
        }
    }
    Ok(())
}

fn replace_at(mem: &mut Memory, old_start: u16, new_len: u16, scratch: &[u8]) -> Result<()> {
    let old_len = line_len(mem, old_start);
    let top = mem.top();
    let tail_start = old_start + old_len;
    let tail_len = top - tail_start;
    if new_len == old_len {
        mem.write_bytes_u8(old_start, scratch);
    } else if new_len > old_len {
        let grow = new_len - old_len;
        log::debug!("replace_at: line grows by {}, moving {} tail bytes forward", grow, tail_len);
        mem.moveblock(tail_start, tail_len, tail_start + grow)?;
        mem.write_bytes_u8(old_start, scratch);
        mem.set_top(top + grow);
    } else {
        let shrink = old_len - new_len;
        log::debug!("replace_at: line shrinks by {}, moving {} tail bytes back", shrink, tail_len);
        mem.write_bytes_u8(old_start, scratch);
        mem.moveblock(tail_start, tail_len, tail_start - shrink)?;
        mem.set_top(top - shrink);
    }
    Ok(())
}

fn line_number_at(mem: &Memory, addr: u16) -> u16 {
    mem.read_addr(addr + 1)
}

/// Total encoded length of the line starting at `addr`, including its
/// `LineNumber` header and trailing `Eol` tag.
fn line_len(mem: &Memory, addr: u16) -> u16 {
    let bytes = mem.read_bytes(0, mem.top());
    let mut pos = addr + 3; // past tag(1) + LineNumber payload(2)
    loop {
        let mut src = crate::cursor::ProgramSource::new(bytes, 0, pos);
        let tok = decode_token(&mut src).unwrap_or(TokenKind::Eol);
        let is_eol = matches!(tok, TokenKind::Eol);
        pos = src.tell();
        if is_eol {
            break;
        }
    }
    pos - addr
}

fn findline_addr(mem: &Memory, number: u16) -> Option<u16> {
    let mut addr = 0u16;
    while addr < mem.top() {
        if line_number_at(mem, addr) == number {
            return Some(addr);
        }
        addr += line_len(mem, addr);
    }
    None
}

fn last_line_start(mem: &Memory, end: u16) -> u16 {
    let mut addr = 0u16;
    let mut last = 0u16;
    while addr < end {
        last = addr;
        addr += line_len(mem, addr);
    }
    last
}

pub fn firstline(mem: &Memory) -> Option<u16> {
    if mem.top() == 0 {
        None
    } else {
        Some(0)
    }
}

pub fn nextline(mem: &Memory, addr: u16) -> Option<u16> {
    let next = addr + line_len(mem, addr);
    if next < mem.top() {
        Some(next)
    } else {
        None
    }
}

pub fn findline(mem: &Memory, number: u16) -> Result<u16> {
    findline_addr(mem, number).ok_or_else(|| BasicError::new(ErrorKind::LineUnknown))
}

/// The line number containing `addr`, used for error reports (spec
/// glossary: `myline`).
pub fn myline(mem: &Memory, addr: u16) -> Option<u16> {
    let mut cur = 0u16;
    let mut last = None;
    while cur < mem.top() {
        let len = line_len(mem, cur);
        if addr < cur + len {
            return Some(line_number_at(mem, cur));
        }
        last = Some(line_number_at(mem, cur));
        cur += len;
    }
    last
}

pub fn line_number(mem: &Memory, addr: u16) -> u16 {
    line_number_at(mem, addr)
}

pub fn line_body_start(addr: u16) -> u16 {
    addr + 3
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn mem() -> Memory {
        Memory::new(&Config { mem: 2048, ..Config::default() })
    }

    fn store(mem: &mut Memory, text: &str) {
        let (n, scratch) = tokenize_line(text, false).unwrap().unwrap();
        storeline(mem, n, &scratch).unwrap();
    }

    #[test]
    fn insert_keeps_order() {
        let mut m = mem();
        store(&mut m, "20 PRINT 2");
        store(&mut m, "10 PRINT 1");
        store(&mut m, "30 PRINT 3");
        let mut nums = Vec::new();
        let mut addr = firstline(&m);
        while let Some(a) = addr {
            nums.push(line_number(&m, a));
            addr = nextline(&m, a);
        }
        assert_eq!(nums, vec![10, 20, 30]);
    }

    #[test]
    fn replace_same_length_keeps_top() {
        let mut m = mem();
        store(&mut m, "10 PRINT 1");
        let top_before = m.top();
        store(&mut m, "10 PRINT 2");
        assert_eq!(m.top(), top_before);
    }

    #[test]
    fn replace_grow_and_shrink() {
        let mut m = mem();
        store(&mut m, "10 PRINT 1");
        store(&mut m, "20 PRINT 2");
        store(&mut m, "10 PRINT 111111");
        assert!(findline(&m, 20).is_ok());
        let mut nums = Vec::new();
        let mut addr = firstline(&m);
        while let Some(a) = addr {
            nums.push(line_number(&m, a));
            addr = nextline(&m, a);
        }
        assert_eq!(nums, vec![10, 20]);
        store(&mut m, "10 A=1");
        let mut nums2 = Vec::new();
        let mut addr = firstline(&m);
        while let Some(a) = addr {
            nums2.push(line_number(&m, a));
            addr = nextline(&m, a);
        }
        assert_eq!(nums2, vec![10, 20]);
    }

    #[test]
    fn bare_number_deletes() {
        let mut m = mem();
        store(&mut m, "10 PRINT 1");
        store(&mut m, "20 PRINT 2");
        let (n, scratch) = tokenize_line("10", false).unwrap().unwrap();
        storeline(&mut m, n, &scratch).unwrap();
        assert!(findline(&m, 10).is_err());
        assert!(findline(&m, 20).is_ok());
    }
}
