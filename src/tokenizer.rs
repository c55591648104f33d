//! # Tokenizer (component B)
//!
//! `nexttoken` is the single entry point for both interactive and run
//! mode (spec §4.B): callers hand it a `TokenSource` — `InteractiveSource`
//! over the line buffer, or `ProgramSource` over the shared byte store —
//! and it applies the seven lexical rules in order. The keyword-vs-variable
//! ambiguity (`TO` vs. a variable named `T...`) is resolved by
//! `token::prefix_match`'s trailing-letter guard.

use crate::cursor::TokenSource;
use crate::error::{BasicError, ErrorKind, Result};
use crate::token::{self, Builtin, Keyword, TokenKind};

fn is_upper(b: u8) -> bool {
    b.is_ascii_uppercase()
}

fn to_upper(b: u8) -> u8 {
    b.to_ascii_uppercase()
}

/// Scan one token from `src`. `float_mode` enables the optional fraction
/// and exponent suffix on numeric literals (spec §4.B.1).
pub fn nexttoken(src: &mut dyn TokenSource, float_mode: bool) -> Result<TokenKind> {
    let tok = nexttoken_inner(src, float_mode)?;
    log::trace!("nexttoken -> {:?}", tok);
    Ok(tok)
}

fn nexttoken_inner(src: &mut dyn TokenSource, float_mode: bool) -> Result<TokenKind> {
    // Skip whitespace outside strings (rule preamble).
    while matches!(src.peek_byte(), Some(b' ') | Some(b'\t')) {
        src.read_byte();
    }

    let Some(b) = src.peek_byte() else {
        return Ok(TokenKind::Eol);
    };

    if b == 0 {
        src.read_byte();
        return Ok(TokenKind::Eol);
    }

    // Rule 1: unsigned numeric literal.
    if b.is_ascii_digit() {
        return scan_number(src, float_mode);
    }

    // Rule 2: string literal.
    if b == b'"' {
        src.read_byte();
        let mut s = String::new();
        loop {
            match src.read_byte() {
                None => break,
                Some(b'"') => break,
                Some(c) => s.push(c as char),
            }
        }
        return Ok(TokenKind::Str(s));
    }

    // Rule 4: relational tokens, including compound forms.
    match b {
        b'=' => {
            src.read_byte();
            return Ok(match src.peek_byte() {
                Some(b'>') => {
                    src.read_byte();
                    TokenKind::GreaterEqual
                }
                Some(b'<') => {
                    src.read_byte();
                    TokenKind::LesserEqual
                }
                _ => TokenKind::Char('='),
            });
        }
        b'>' => {
            src.read_byte();
            return Ok(match src.peek_byte() {
                Some(b'=') => {
                    src.read_byte();
                    TokenKind::GreaterEqual
                }
                _ => TokenKind::Char('>'),
            });
        }
        b'<' => {
            src.read_byte();
            return Ok(match src.peek_byte() {
                Some(b'=') => {
                    src.read_byte();
                    TokenKind::LesserEqual
                }
                Some(b'>') => {
                    src.read_byte();
                    TokenKind::NotEqual
                }
                _ => TokenKind::Char('<'),
            });
        }
        _ => {}
    }

    // Rule 3: single-character operators/punctuation.
    if matches!(b, b'+' | b'-' | b'*' | b'/' | b'%' | b'\\' | b':' | b',' | b'(' | b')' | b';' | b'&' | b'#') {
        src.read_byte();
        return Ok(TokenKind::Char(b as char));
    }

    // Rule 5/6: identifier / keyword / variable.
    if b.is_ascii_alphabetic() || b == b'@' {
        return scan_identifier(src);
    }

    // Rule 7: anything else is its own code.
    src.read_byte();
    Ok(TokenKind::Char(to_upper(b) as char))
}

fn scan_number(src: &mut dyn TokenSource, float_mode: bool) -> Result<TokenKind> {
    let mut digits = String::new();
    while let Some(b) = src.peek_byte() {
        if b.is_ascii_digit() {
            digits.push(b as char);
            src.read_byte();
        } else {
            break;
        }
    }
    if float_mode {
        if src.peek_byte() == Some(b'.') {
            digits.push('.');
            src.read_byte();
            while let Some(b) = src.peek_byte() {
                if b.is_ascii_digit() {
                    digits.push(b as char);
                    src.read_byte();
                } else {
                    break;
                }
            }
        }
        if matches!(src.peek_byte(), Some(b'E') | Some(b'e')) {
            digits.push('E');
            src.read_byte();
            if matches!(src.peek_byte(), Some(b'+') | Some(b'-')) {
                digits.push(src.read_byte().unwrap() as char);
            }
            while let Some(b) = src.peek_byte() {
                if b.is_ascii_digit() {
                    digits.push(b as char);
                    src.read_byte();
                } else {
                    break;
                }
            }
        }
    }

    #[cfg(feature = "float")]
    let value = digits.parse::<f32>().map_err(|_| BasicError::new(ErrorKind::Number))?;
    #[cfg(not(feature = "float"))]
    let value = digits.parse::<i16>().map_err(|_| BasicError::new(ErrorKind::Number))?;

    Ok(TokenKind::Number(value))
}

fn scan_identifier(src: &mut dyn TokenSource) -> Result<TokenKind> {
    let mut word = String::new();
    let first = to_upper(src.read_byte().unwrap());
    word.push(first as char);
    while let Some(b) = src.peek_byte() {
        if is_upper(to_upper(b)) && b.is_ascii_alphabetic() {
            word.push(to_upper(b) as char);
            src.read_byte();
        } else {
            break;
        }
    }

    // Rule 5: keyword and builtin prefix match.
    if let Some((_, kw)) = token::prefix_match(&word, token::KEYWORDS) {
        return Ok(TokenKind::Keyword(kw));
    }
    if let Some((_, bi)) = token::prefix_match(&word, token::BUILTINS) {
        return Ok(TokenKind::Builtin(bi));
    }

    // Rule 6: variable name is the first 1-2 characters of the scanned
    // word; re-derive it rather than reusing the (possibly longer, if it
    // failed keyword match because of a trailing digit) scanned word.
    let name1 = first as char;
    let name2 = if name1 == '@' {
        word.chars().nth(1).unwrap_or('\0')
    } else {
        word.chars()
            .nth(1)
            .filter(|c| c.is_ascii_digit())
            .unwrap_or('\0')
    };

    if src.peek_byte() == Some(b'$') {
        src.read_byte();
        return Ok(TokenKind::StringVar(name1, name2));
    }
    if src.peek_byte() == Some(b'(') {
        return Ok(TokenKind::ArrayVar(name1, name2));
    }
    Ok(TokenKind::Variable(name1, name2))
}

/// A `LINENUMBER` record's payload is a bare numeric literal scanned as
/// the first token on an interactive line; not part of `nexttoken`'s own
/// dispatch (the grammar distinguishes it only by statement position).
pub fn scan_line_number(src: &mut dyn TokenSource) -> Result<Option<u16>> {
    while matches!(src.peek_byte(), Some(b' ') | Some(b'\t')) {
        src.read_byte();
    }
    let Some(b) = src.peek_byte() else { return Ok(None) };
    if !b.is_ascii_digit() {
        return Ok(None);
    }
    let mut digits = String::new();
    while let Some(b) = src.peek_byte() {
        if b.is_ascii_digit() {
            digits.push(b as char);
            src.read_byte();
        } else {
            break;
        }
    }
    let n: u32 = digits.parse().map_err(|_| BasicError::new(ErrorKind::Number))?;
    if n == 0 || n > u16::MAX as u32 {
        return Err(BasicError::new(ErrorKind::Number));
    }
    Ok(Some(n as u16))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::InteractiveSource;

    fn tok(s: &str) -> TokenKind {
        let buf = s.as_bytes();
        let mut src = InteractiveSource::new(buf);
        nexttoken(&mut src, false).unwrap()
    }

    #[test]
    fn number() {
        assert_eq!(tok("123"), TokenKind::Number(123));
    }

    #[test]
    fn keyword_vs_variable() {
        assert_eq!(tok("TO"), TokenKind::Keyword(Keyword::To));
        assert_eq!(tok("T "), TokenKind::Variable('T', '\0'));
    }

    #[test]
    fn total_is_not_to() {
        // "TO" doesn't match inside "TOTAL" because the next source
        // character (`T`) is A-Z (rule 5's trailing-letter guard). Having
        // missed the keyword table, the word falls to rule 6: a variable
        // name is only 1-2 characters and the second may only be a digit
        // for a non-`@` name (spec §4.B.6), so `O` doesn't count — the
        // name truncates to `T` alone.
        let mut src = InteractiveSource::new(b"TOTAL");
        let t = nexttoken(&mut src, false).unwrap();
        assert_eq!(t, TokenKind::Variable('T', '\0'));
    }

    #[test]
    fn two_letter_variable_needs_digit_second_char() {
        assert_eq!(tok("T1"), TokenKind::Variable('T', '1'));
        assert_eq!(tok("AB"), TokenKind::Variable('A', '\0'));
    }

    #[test]
    fn string_literal() {
        assert_eq!(tok("\"HI\""), TokenKind::Str("HI".to_string()));
    }

    #[test]
    fn relational_compound() {
        assert_eq!(tok("<>"), TokenKind::NotEqual);
        assert_eq!(tok(">="), TokenKind::GreaterEqual);
        assert_eq!(tok("=<"), TokenKind::LesserEqual);
    }

    #[test]
    fn array_and_string_var() {
        assert_eq!(tok("A("), TokenKind::ArrayVar('A', '\0'));
        assert_eq!(tok("A$"), TokenKind::StringVar('A', '\0'));
    }

    #[test]
    fn builtin() {
        assert_eq!(tok("ABS"), TokenKind::Builtin(Builtin::Abs));
    }
}
