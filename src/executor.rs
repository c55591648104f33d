//! # Statement executor (component F)
//!
//! One method per statement keyword, dispatched from `exec_statement`
//! (called once per statement by `Interpreter::step_once`). Every
//! handler propagates its `Result` with `?` rather than catching
//! anything locally — `step_once` is the only place that branches on
//! `ErrorKind::is_trappable` (see `error.rs`).

use crate::config::Number;
use crate::error::{BasicError, ErrorKind, Result};
use crate::evaluator::to_i32;
use crate::heap::ObjType;
use crate::interpreter::{self, ForRecord, Interpreter, Mode, BREAKCHAR};
use crate::io::sink;
use crate::program;
use crate::token::{Keyword, TokenKind};
use crate::value::Value;

fn line_len_bytes(bytes: &[i8], addr: u16) -> u16 {
    let mut pos = addr + 3;
    loop {
        let mut src = crate::cursor::ProgramSource::new(bytes, 0, pos);
        let tok = crate::token_codec::decode_token(&mut src).unwrap_or(TokenKind::Eol);
        let is_eol = matches!(tok, TokenKind::Eol);
        pos = crate::cursor::TokenSource::tell(&src);
        if is_eol {
            break;
        }
    }
    pos - addr
}

fn line_number_at_bytes(bytes: &[i8], addr: u16) -> u16 {
    let mut src = crate::cursor::ProgramSource::new(bytes, 0, addr);
    match crate::token_codec::decode_token(&mut src) {
        Ok(TokenKind::LineNumber(n)) => n,
        _ => 0,
    }
}

fn find_line_bytes(bytes: &[i8], top: u16, number: u16) -> Option<u16> {
    let mut addr = 0u16;
    while addr < top {
        if line_number_at_bytes(bytes, addr) == number {
            return Some(addr);
        }
        addr += line_len_bytes(bytes, addr);
    }
    None
}

fn parse_input_number(s: &str) -> Result<Number> {
    let s = s.trim();
    #[cfg(feature = "float")]
    {
        s.parse::<f32>().map_err(|_| BasicError::new(ErrorKind::Number))
    }
    #[cfg(not(feature = "float"))]
    {
        s.parse::<i16>().map_err(|_| BasicError::new(ErrorKind::Number))
    }
}

impl Interpreter {
    pub(crate) fn exec_statement(&mut self) -> Result<()> {
        match self.token.clone() {
            TokenKind::Keyword(Keyword::Print) => {
                self.advance()?;
                self.exec_print()
            }
            TokenKind::Keyword(Keyword::Let) => {
                self.advance()?;
                self.exec_assignment()
            }
            TokenKind::Keyword(Keyword::Input) => {
                self.advance()?;
                self.exec_input()
            }
            TokenKind::Keyword(Keyword::Goto) => {
                self.advance()?;
                let target = to_i32(self.expression()?.as_num()?) as u16;
                self.jump_to_line(target)
            }
            TokenKind::Keyword(Keyword::Gosub) => {
                self.advance()?;
                self.exec_gosub()
            }
            TokenKind::Keyword(Keyword::Return) => {
                self.advance()?;
                self.exec_return()
            }
            TokenKind::Keyword(Keyword::If) => {
                self.advance()?;
                self.exec_if()
            }
            TokenKind::Keyword(Keyword::For) => {
                self.advance()?;
                self.exec_for()
            }
            TokenKind::Keyword(Keyword::Next) => {
                self.advance()?;
                self.exec_next()
            }
            TokenKind::Keyword(Keyword::Stop) => {
                self.advance()?;
                self.resume_mode = Some(self.mode);
                self.halted = true;
                Ok(())
            }
            TokenKind::Keyword(Keyword::List) => {
                self.advance()?;
                self.exec_list()
            }
            TokenKind::Keyword(Keyword::New) => {
                self.advance()?;
                self.exec_new()
            }
            TokenKind::Keyword(Keyword::Run) => {
                self.advance()?;
                self.exec_run()
            }
            TokenKind::Keyword(Keyword::Clr) => {
                self.advance()?;
                self.clr();
                Ok(())
            }
            TokenKind::Keyword(Keyword::Dim) => {
                self.advance()?;
                self.exec_dim()
            }
            TokenKind::Keyword(Keyword::Cont) => {
                self.advance()?;
                self.exec_cont()
            }
            TokenKind::Keyword(Keyword::Rem) => {
                self.skip_rest_of_line()?;
                Ok(())
            }
            TokenKind::Keyword(Keyword::End) => {
                self.resume_mode = None;
                self.mode = Mode::Int;
                self.halted = true;
                Ok(())
            }
            TokenKind::Keyword(Keyword::Break) => {
                self.advance()?;
                self.exec_break()
            }
            TokenKind::Keyword(Keyword::Poke) => {
                self.advance()?;
                self.exec_poke()
            }
            TokenKind::Keyword(Keyword::Save) => {
                self.advance()?;
                self.exec_save()
            }
            TokenKind::Keyword(Keyword::Load) => {
                self.advance()?;
                self.exec_load()
            }
            TokenKind::Keyword(Keyword::Catalog) => {
                self.advance()?;
                self.exec_catalog()
            }
            TokenKind::Keyword(Keyword::Delete) => {
                self.advance()?;
                self.exec_delete()
            }
            TokenKind::Keyword(Keyword::Open) => {
                self.advance()?;
                self.exec_open()
            }
            TokenKind::Keyword(Keyword::Close) => {
                self.advance()?;
                self.exec_close()
            }
            TokenKind::Variable(..) | TokenKind::ArrayVar(..) | TokenKind::StringVar(..) => {
                self.exec_assignment()
            }
            _ => Err(BasicError::new(ErrorKind::Unknown)),
        }
    }

    fn skip_rest_of_line(&mut self) -> Result<()> {
        while !matches!(self.token, TokenKind::Eol) {
            self.advance()?;
        }
        Ok(())
    }

    fn jump_to_line(&mut self, line: u16) -> Result<()> {
        match self.mode {
            Mode::Erun => {
                let bytes = self.eeprom_cells.clone();
                let top = bytes.len() as u16;
                let addr =
                    find_line_bytes(&bytes, top, line).ok_or_else(|| BasicError::new(ErrorKind::LineUnknown))?;
                self.here = addr;
            }
            _ => {
                let addr = program::findline(&self.mem, line)?;
                self.mode = Mode::Run;
                self.here = addr;
            }
        }
        self.advance()
    }

    // -- assignment ------------------------------------------------------

    fn exec_assignment(&mut self) -> Result<()> {
        match self.token.clone() {
            TokenKind::Variable(n1, n2) => {
                self.advance()?;
                self.expect_char('=')?;
                let v = self.expression()?;
                self.set_scalar(n1, n2, v.as_num()?)
            }
            TokenKind::ArrayVar(n1, n2) => {
                self.advance()?;
                self.expect_char('(')?;
                let idx = to_i32(self.expression()?.as_num()?) as u16;
                self.expect_char(')')?;
                self.expect_char('=')?;
                let v = self.expression()?;
                self.array_set(n1, n2, idx, v.as_num()?)
            }
            TokenKind::StringVar(n1, n2) => {
                self.advance()?;
                let start = if self.token == TokenKind::Char('(') {
                    self.advance()?;
                    let s = to_i32(self.expression()?.as_num()?) as u16;
                    self.expect_char(')')?;
                    s
                } else {
                    1
                };
                self.expect_char('=')?;
                let v = self.expression()?;
                self.string_set(n1, n2, start, &v.as_str())
            }
            _ => Err(BasicError::new(ErrorKind::Unknown)),
        }
    }

    // -- PRINT -------------------------------------------------------------

    /// PRINT (spec §4.F). A statement that ends without printing a
    /// newline (trailing `;`) leaves the next bare number "on the same
    /// line" — the next `PRINT` to run, even from an unrelated statement a
    /// loop iteration later, opens with a single space so consecutively
    /// printed numbers stay separated (spec §8 scenario 4: `PRINT A(I);`
    /// repeated by a `FOR`/`NEXT` prints `1 4 9 16 25`, not `1491625`).
    fn exec_print(&mut self) -> Result<()> {
        if self.print_pending_space {
            self.print_pending_space = false;
            self.write_str(" ");
        }
        let mut suppress_newline = false;
        let mut last_was_number = false;
        loop {
            match &self.token {
                TokenKind::Eol | TokenKind::Char(':') => break,
                TokenKind::Char('&') => {
                    self.advance()?;
                    let v = to_i32(self.expression()?.as_num()?);
                    self.out_override = Some(v as u8);
                    suppress_newline = true;
                }
                TokenKind::Char(',') => {
                    self.advance()?;
                    // "Comma inserts a separator (space if no field width
                    // is active)" (spec §4.F).
                    self.write_str(" ");
                    suppress_newline = true;
                }
                TokenKind::Char(';') => {
                    self.advance()?;
                    suppress_newline = true;
                }
                TokenKind::Char('#') => {
                    self.advance()?;
                    let width = to_i32(self.expression()?.as_num()?).max(0) as usize;
                    let v = self.expression()?;
                    let text = v.as_str();
                    self.write_str(&text);
                    // "form pads numbers on the right with spaces to its
                    // width" (spec §4.F) — the padding trails the value.
                    if text.len() < width {
                        self.write_str(&" ".repeat(width - text.len()));
                    }
                    suppress_newline = false;
                    last_was_number = matches!(v, Value::Num(_));
                }
                _ => {
                    let v = self.expression()?;
                    last_was_number = matches!(v, Value::Num(_));
                    self.write_str(&v.as_str());
                    suppress_newline = false;
                }
            }
        }
        if !suppress_newline {
            self.write_str("\n");
        }
        self.print_pending_space = suppress_newline && last_was_number;
        self.out_override = None;
        Ok(())
    }

    // -- INPUT ---------------------------------------------------------

    fn read_input_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        loop {
            match self.charport.read_char() {
                None => return Ok(if line.is_empty() { None } else { Some(line) }),
                Some(c) if c == BREAKCHAR => {
                    self.resume_mode = None;
                    self.mode = Mode::Int;
                    self.halted = true;
                    return Ok(None);
                }
                Some(b'\n') => return Ok(Some(line)),
                Some(b'\r') => {}
                Some(b) => line.push(b as char),
            }
        }
    }

    fn exec_input(&mut self) -> Result<()> {
        if self.token == TokenKind::Char('&') {
            self.advance()?;
            let v = to_i32(self.expression()?.as_num()?);
            self.input_source = interpreter::input_source_from_code(v as i64);
            self.expect_char(',')?;
        }
        if let TokenKind::Str(prompt) = self.token.clone() {
            self.advance()?;
            self.write_str(&prompt);
            if matches!(self.token, TokenKind::Char(';') | TokenKind::Char(',')) {
                self.advance()?;
            }
        } else {
            self.write_str("? ");
        }
        loop {
            match self.token.clone() {
                TokenKind::Variable(n1, n2) => {
                    self.advance()?;
                    let Some(line) = self.read_input_line()? else { return Ok(()) };
                    let n = parse_input_number(&line)?;
                    self.set_scalar(n1, n2, n)?;
                }
                TokenKind::StringVar(n1, n2) => {
                    self.advance()?;
                    let Some(line) = self.read_input_line()? else { return Ok(()) };
                    self.string_set(n1, n2, 1, &line)?;
                }
                TokenKind::ArrayVar(n1, n2) => {
                    self.advance()?;
                    self.expect_char('(')?;
                    let idx = to_i32(self.expression()?.as_num()?) as u16;
                    self.expect_char(')')?;
                    let Some(line) = self.read_input_line()? else { return Ok(()) };
                    let n = parse_input_number(&line)?;
                    self.array_set(n1, n2, idx, n)?;
                }
                _ => return Err(BasicError::new(ErrorKind::Unknown)),
            }
            if self.token == TokenKind::Char(',') {
                self.advance()?;
            } else {
                break;
            }
        }
        Ok(())
    }

    // -- control flow --------------------------------------------------

    fn exec_gosub(&mut self) -> Result<()> {
        if self.gosub_stack.len() >= crate::config::GOSUB_DEPTH {
            return Err(BasicError::new(ErrorKind::Gosub));
        }
        let target = to_i32(self.expression()?.as_num()?) as u16;
        let return_pos = if self.mode == Mode::Int { self.bi } else { self.here };
        self.gosub_stack.push((self.mode, return_pos));
        self.jump_to_line(target)
    }

    fn exec_return(&mut self) -> Result<()> {
        let (mode, pos) = self.gosub_stack.pop().ok_or_else(|| BasicError::new(ErrorKind::Return))?;
        self.mode = mode;
        if mode == Mode::Int {
            self.bi = pos;
        } else {
            self.here = pos;
        }
        self.advance()
    }

    fn exec_if(&mut self) -> Result<()> {
        let cond = self.expression()?.is_truthy()?;
        if self.token == TokenKind::Keyword(Keyword::Then) {
            self.advance()?;
        }
        if !cond {
            self.skip_rest_of_line()?;
            return Ok(());
        }
        if let TokenKind::Number(n) = self.token {
            let target = to_i32(n) as u16;
            self.advance()?;
            return self.jump_to_line(target);
        }
        self.exec_statement()
    }

    fn exec_for(&mut self) -> Result<()> {
        let TokenKind::Variable(n1, n2) = self.token.clone() else {
            return Err(BasicError::new(ErrorKind::Unknown));
        };
        self.advance()?;
        self.expect_char('=')?;
        let start = self.expression()?.as_num()?;
        if self.token != TokenKind::Keyword(Keyword::To) {
            return Err(BasicError::new(ErrorKind::Unknown));
        }
        self.advance()?;
        let limit = self.expression()?.as_num()?;
        let step = if self.token == TokenKind::Keyword(Keyword::Step) {
            self.advance()?;
            self.expression()?.as_num()?
        } else {
            1 as Number
        };
        self.set_scalar(n1, n2, start)?;
        if self.for_stack.len() >= crate::config::FOR_DEPTH {
            return Err(BasicError::new(ErrorKind::For));
        }
        let return_pos = if self.mode == Mode::Int { self.bi } else { self.here };
        self.for_stack.push(ForRecord {
            name1: n1,
            name2: n2,
            return_pos,
            return_mode: self.mode,
            limit,
            step,
        });
        if !loop_should_continue(start, limit, step) {
            self.exec_break()?;
        }
        Ok(())
    }

    fn exec_next(&mut self) -> Result<()> {
        let target = if let TokenKind::Variable(n1, n2) = self.token.clone() {
            self.advance()?;
            Some((n1, n2))
        } else {
            None
        };
        let rec = *self.for_stack.last().ok_or_else(|| BasicError::new(ErrorKind::Next))?;
        if let Some((n1, n2)) = target {
            if rec.name1 != n1 || rec.name2 != n2 {
                return Err(BasicError::new(ErrorKind::Next));
            }
        }
        let current = self.get_scalar(rec.name1, rec.name2)?;
        let next = current + rec.step;
        if loop_should_continue(next, rec.limit, rec.step) {
            self.set_scalar(rec.name1, rec.name2, next)?;
            self.mode = rec.return_mode;
            if rec.return_mode == Mode::Int {
                self.bi = rec.return_pos;
            } else {
                self.here = rec.return_pos;
            }
            self.advance()
        } else {
            self.for_stack.pop();
            self.advance()
        }
    }

    fn exec_break(&mut self) -> Result<()> {
        let rec = self.for_stack.pop().ok_or_else(|| BasicError::new(ErrorKind::Next))?;
        self.skip_to_matching_next(rec.name1, rec.name2)
    }

    /// Scan forward from the current token past the `NEXT` that matches
    /// `FOR`'s variable, tolerating nested `FOR`s (spec §4.F "BREAK / IF-
    /// false skip"). Relies on the generic token stream: cross-line
    /// `LineNumber` tokens fall through the catch-all arm harmlessly.
    fn skip_to_matching_next(&mut self, name1: char, name2: char) -> Result<()> {
        let mut depth = 0u32;
        loop {
            match self.token.clone() {
                TokenKind::Keyword(Keyword::For) => {
                    depth += 1;
                    self.advance()?;
                }
                TokenKind::Keyword(Keyword::Next) => {
                    self.advance()?;
                    let matched = if let TokenKind::Variable(n1, n2) = self.token.clone() {
                        let is_target = depth == 0 && n1 == name1 && n2 == name2;
                        self.advance()?;
                        is_target
                    } else {
                        depth == 0
                    };
                    if matched {
                        return Ok(());
                    }
                    if depth > 0 {
                        depth -= 1;
                    }
                }
                TokenKind::Eol if self.mode == Mode::Int => {
                    return Err(BasicError::new(ErrorKind::Next));
                }
                _ => {
                    if self.here_or_bi_at_end() {
                        return Err(BasicError::new(ErrorKind::Next));
                    }
                    self.advance()?;
                }
            }
        }
    }

    fn here_or_bi_at_end(&self) -> bool {
        match self.mode {
            Mode::Int => false,
            _ => self.here >= self.program_len() && matches!(self.token, TokenKind::Eol),
        }
    }

    // -- DIM ---------------------------------------------------------------

    fn exec_dim(&mut self) -> Result<()> {
        loop {
            match self.token.clone() {
                TokenKind::ArrayVar(n1, n2) => {
                    self.advance()?;
                    self.expect_char('(')?;
                    let len = to_i32(self.expression()?.as_num()?) as u16;
                    self.expect_char(')')?;
                    self.heap.bmalloc(&mut self.mem, n1, n2, ObjType::Array, len)?;
                }
                TokenKind::StringVar(n1, n2) => {
                    self.advance()?;
                    self.expect_char('(')?;
                    let len = to_i32(self.expression()?.as_num()?) as u16;
                    self.expect_char(')')?;
                    self.heap.bmalloc(&mut self.mem, n1, n2, ObjType::Str, len)?;
                }
                _ => return Err(BasicError::new(ErrorKind::Unknown)),
            }
            if self.token == TokenKind::Char(',') {
                self.advance()?;
            } else {
                break;
            }
        }
        Ok(())
    }

    // -- program control -------------------------------------------------

    fn exec_new(&mut self) -> Result<()> {
        self.mem.set_top(0);
        self.clr();
        self.stack.clear();
        self.for_stack.clear();
        self.gosub_stack.clear();
        self.mode = Mode::Int;
        self.resume_mode = None;
        self.halted = true;
        Ok(())
    }

    fn exec_run(&mut self) -> Result<()> {
        self.stack.clear();
        self.for_stack.clear();
        self.gosub_stack.clear();
        self.clr();
        let Some(addr) = program::firstline(&self.mem) else {
            self.halted = true;
            return Ok(());
        };
        self.mode = Mode::Run;
        self.here = addr;
        self.advance()
    }

    fn exec_cont(&mut self) -> Result<()> {
        let mode = self.resume_mode.take().ok_or_else(|| BasicError::new(ErrorKind::Unknown))?;
        self.mode = mode;
        self.advance()
    }

    fn exec_list(&mut self) -> Result<()> {
        let from = if !matches!(self.token, TokenKind::Eol | TokenKind::Char(':')) {
            Some(to_i32(self.expression()?.as_num()?) as u16)
        } else {
            None
        };
        let to = if self.token == TokenKind::Char(',') {
            self.advance()?;
            Some(to_i32(self.expression()?.as_num()?) as u16)
        } else {
            from
        };
        let mut addr = program::firstline(&self.mem);
        while let Some(a) = addr {
            let n = program::line_number(&self.mem, a);
            let in_range = from.map_or(true, |f| n >= f) && to.map_or(true, |t| n <= t);
            if in_range {
                let text = crate::listing::render_line(&self.mem, a);
                self.write_str(&text);
                self.write_str("\n");
                if self.charport.wait_on_scroll() {
                    break;
                }
            }
            addr = program::nextline(&self.mem, a);
        }
        Ok(())
    }

    fn exec_poke(&mut self) -> Result<()> {
        let addr = to_i32(self.expression()?.as_num()?);
        self.expect_char(',')?;
        let value = to_i32(self.expression()?.as_num()?);
        if addr < 0 || addr as usize >= self.mem.len() {
            return Err(BasicError::new(ErrorKind::Range));
        }
        self.mem.write8(addr as u16, value as i8);
        Ok(())
    }

    // -- file statements ---------------------------------------------------

    fn expect_filename(&mut self) -> Result<String> {
        let name = self.expression()?.as_str();
        if name.is_empty() {
            Err(BasicError::new(ErrorKind::File))
        } else {
            Ok(name)
        }
    }

    fn exec_save(&mut self) -> Result<()> {
        let name = self.expect_filename()?;
        let text = crate::listing::render_program(&self.mem);
        self.filestore.save(&name, &text)
    }

    fn exec_load(&mut self) -> Result<()> {
        let name = self.expect_filename()?;
        let text = self.filestore.load(&name)?;
        self.mem.set_top(0);
        self.clr();
        for line in text.lines() {
            if let Some((n, scratch)) = program::tokenize_line(line, crate::config::float_mode())? {
                program::storeline(&mut self.mem, n, &scratch)?;
            }
        }
        self.mode = Mode::Int;
        self.resume_mode = None;
        self.halted = true;
        Ok(())
    }

    fn exec_catalog(&mut self) -> Result<()> {
        let glob = if !matches!(self.token, TokenKind::Eol | TokenKind::Char(':')) {
            self.expect_filename()?
        } else {
            String::new()
        };
        let names = self.filestore.catalog(&glob)?;
        for n in names {
            self.write_str(&n);
            self.write_str("\n");
        }
        Ok(())
    }

    fn exec_delete(&mut self) -> Result<()> {
        let name = self.expect_filename()?;
        self.filestore.delete(&name)
    }

    fn exec_open(&mut self) -> Result<()> {
        let name = self.expect_filename()?;
        let mode = if self.token == TokenKind::Char(',') {
            self.advance()?;
            to_i32(self.expression()?.as_num()?) as u8
        } else {
            sink::FILE
        };
        self.filestore.open(&name, mode)
    }

    fn exec_close(&mut self) -> Result<()> {
        let mode = if !matches!(self.token, TokenKind::Eol | TokenKind::Char(':')) {
            to_i32(self.expression()?.as_num()?) as u8
        } else {
            sink::FILE
        };
        self.filestore.close(mode)
    }
}

fn loop_should_continue(value: Number, limit: Number, step: Number) -> bool {
    if step >= 0 as Number {
        value <= limit
    } else {
        value >= limit
    }
}
