//! # Listing (LIST / SAVE text form)
//!
//! The inverse of tokenization: walk a stored line's tokens back out as
//! text. The only subtlety is spacing — two adjacent alphanumeric-ending
//! and alphanumeric-starting fragments must get a separating space, or
//! re-tokenizing the listing would misread `FORI` as variable `FO`
//! (`token::prefix_match`'s trailing-letter guard would reject `FOR` there)
//! rather than `FOR` followed by variable `I`. Punctuation never needs a
//! guard space since it isn't alphanumeric.

use crate::cursor::ProgramSource;
use crate::memory::Memory;
use crate::token::{self, Builtin, Keyword, TokenKind};
use crate::token_codec::decode_token;
use crate::value::format_number;

fn is_alnum_end(s: &str) -> bool {
    s.chars().last().is_some_and(|c| c.is_ascii_alphanumeric())
}

fn is_alnum_start(s: &str) -> bool {
    s.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
}

fn join(fragments: Vec<String>) -> String {
    let mut out = String::new();
    for f in fragments {
        if !out.is_empty() && is_alnum_end(&out) && is_alnum_start(&f) {
            out.push(' ');
        }
        out.push_str(&f);
    }
    out
}

fn var_text(n1: char, n2: char) -> String {
    if n2 == '\0' {
        n1.to_string()
    } else {
        format!("{n1}{n2}")
    }
}

fn keyword_text(k: Keyword) -> &'static str {
    token::KEYWORDS.iter().find(|&&(_, kw)| kw == k).map(|&(s, _)| s).unwrap_or("?")
}

fn builtin_text(b: Builtin) -> &'static str {
    token::BUILTINS.iter().find(|&&(_, bi)| bi == b).map(|&(s, _)| s).unwrap_or("?")
}

fn token_text(tok: &TokenKind) -> String {
    match tok {
        TokenKind::Char(c) => c.to_string(),
        TokenKind::GreaterEqual => ">=".to_string(),
        TokenKind::LesserEqual => "<=".to_string(),
        TokenKind::NotEqual => "<>".to_string(),
        TokenKind::Keyword(k) => keyword_text(*k).to_string(),
        TokenKind::Builtin(b) => builtin_text(*b).to_string(),
        TokenKind::LineNumber(n) => n.to_string(),
        TokenKind::Number(n) => format_number(*n),
        TokenKind::Str(s) => format!("\"{s}\""),
        TokenKind::Variable(n1, n2) => var_text(*n1, *n2),
        TokenKind::ArrayVar(n1, n2) => var_text(*n1, *n2),
        TokenKind::StringVar(n1, n2) => format!("{}$", var_text(*n1, *n2)),
        TokenKind::Eol => String::new(),
    }
}

/// Render the line whose `LineNumber` record starts at `addr` back into
/// text, ending with the line number itself (LIST's usual "10 PRINT X").
pub fn render_line(mem: &Memory, addr: u16) -> String {
    let bytes: Vec<i8> = mem.read_bytes(0, mem.top()).to_vec();
    let mut src = ProgramSource::new(&bytes, 0, addr);
    let mut fragments = Vec::new();
    loop {
        let tok = match decode_token(&mut src) {
            Ok(t) => t,
            Err(_) => break,
        };
        if matches!(tok, TokenKind::Eol) {
            break;
        }
        fragments.push(token_text(&tok));
    }
    join(fragments)
}

/// Render the whole program, one line per `\n`-separated entry — the
/// canonical text form `SAVE` writes out and `LOAD` reads back in.
pub fn render_program(mem: &Memory) -> String {
    let mut lines = Vec::new();
    let mut addr = crate::program::firstline(mem);
    while let Some(a) = addr {
        lines.push(render_line(mem, a));
        addr = crate::program::nextline(mem, a);
    }
    lines.join("\n")
}
