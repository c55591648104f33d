//! # Interpreter core (components E/F glue)
//!
//! `Interpreter` bundles the byte store, heap, static variables and I/O
//! ports behind one token-cursor/token-cache pair, the way the teacher's
//! own top-level pipeline struct threads its stages' state through one
//! value instead of free functions passing everything explicitly. Two
//! design choices worth naming up front (see `DESIGN.md` for the longer
//! version):
//!
//! - `advance` always refreshes `self.token` from whichever source the
//!   current `Mode` selects, so the rest of the interpreter (evaluator,
//!   executor) never branches on mode itself — it just reads `self.token`
//!   and calls `self.advance()` when it's done with it.
//! - Trappable I/O errors (`ErrorKind::is_trappable`) are never special-
//!   cased at the call site; every statement function propagates `Result`
//!   normally, and `step` is the only place that inspects it.

use crate::config::{self, Config};
use crate::cursor::TokenSource as _;
use crate::error::{BasicError, ErrorKind, Result};
use crate::heap::{Heap, Statics};
use crate::hardware::HardwarePort;
use crate::io::{sink, CharPort, FileStore, InputSource};
use crate::memory::Memory;
use crate::program;
use crate::token::TokenKind;
use crate::tokenizer;
use crate::value::Value;

pub const BREAKCHAR: u8 = b'#';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Int,
    Run,
    Erun,
}

#[derive(Debug, Clone, Copy)]
pub struct ForRecord {
    pub name1: char,
    pub name2: char,
    pub return_pos: u16,
    pub return_mode: Mode,
    pub limit: crate::config::Number,
    pub step: crate::config::Number,
}

pub struct Interpreter {
    pub config: Config,
    pub mem: Memory,
    pub heap: Heap,
    pub statics: Statics,

    pub charport: Box<dyn CharPort>,
    pub filestore: Box<dyn FileStore>,
    pub hardware: Box<dyn HardwarePort>,
    pub usr_fn: Option<Box<dyn FnMut(i32, i32) -> i32>>,

    pub mode: Mode,
    pub ibuffer: Vec<u8>,
    pub bi: u16,
    pub here: u16,
    pub eeprom_cells: Vec<i8>,

    pub token: TokenKind,
    pub stack: Vec<Value>,
    /// `(mode, position)` pairs — a `GOSUB` issued from `Int` mode returns
    /// to the interactive cursor, not `here`, mirroring `ForRecord`.
    pub gosub_stack: Vec<(Mode, u16)>,
    pub for_stack: Vec<ForRecord>,

    pub ert: Option<ErrorKind>,
    pub last_error: Option<ErrorKind>,
    pub rng_state: u16,
    pub od: u8,
    pub out_override: Option<u8>,
    pub input_source: InputSource,
    /// Set by `exec_print` when the statement just run ended with a
    /// suppressed newline after printing a bare number (spec §8 scenario
    /// 4); the next `PRINT` opens with a space instead of concatenating
    /// directly onto the same line.
    pub print_pending_space: bool,
    pub form: u16,
    pub cursor_x: crate::config::Number,
    pub cursor_y: crate::config::Number,
    pub display: Vec<i8>,
    pub current_line: Option<u16>,
    pub halted: bool,
    /// Mode to restore on `CONT` after a `STOP`/keyboard break; `None`
    /// after `END` or an error, both of which make `CONT` invalid.
    pub resume_mode: Option<Mode>,
}

/// Display buffer sized for a typical 24x40 character terminal (spec §3
/// names `@D` as a pseudo-array over "the display buffer" without
/// specifying dimensions; this is the value a hosted build uses).
const DISPLAY_CELLS: usize = 24 * 40;

impl Interpreter {
    pub fn new(
        config: Config,
        charport: Box<dyn CharPort>,
        filestore: Box<dyn FileStore>,
        hardware: Box<dyn HardwarePort>,
    ) -> Self {
        let mem = Memory::new(&config);
        Self {
            config,
            mem,
            heap: Heap::new(),
            statics: Statics::new(),
            charport,
            filestore,
            hardware,
            usr_fn: None,
            mode: Mode::Int,
            ibuffer: vec![0],
            bi: 0,
            here: 0,
            eeprom_cells: Vec::new(),
            token: TokenKind::Eol,
            stack: Vec::new(),
            gosub_stack: Vec::new(),
            for_stack: Vec::new(),
            ert: None,
            last_error: None,
            rng_state: 1,
            od: sink::DEFAULT,
            out_override: None,
            input_source: InputSource::Keyboard,
            print_pending_space: false,
            form: 0,
            cursor_x: 0 as crate::config::Number,
            cursor_y: 0 as crate::config::Number,
            display: vec![0; DISPLAY_CELLS],
            current_line: None,
            halted: false,
            resume_mode: None,
        }
    }

    /// Program length in the current mode's source — `top` in `RUN`, the
    /// EEPROM image's program length in `ERUN`.
    pub fn program_len(&self) -> u16 {
        match self.mode {
            Mode::Erun => self.eeprom_cells.len() as u16,
            _ => self.mem.top(),
        }
    }

    /// Load the next token from whichever source the current mode selects,
    /// advancing that source's cursor (`bi` or `here`) past it.
    pub fn advance(&mut self) -> Result<()> {
        self.token = match self.mode {
            Mode::Int => {
                let mut src = crate::cursor::InteractiveSource::new(&self.ibuffer);
                src.seek(self.bi);
                let t = tokenizer::nexttoken(&mut src, config::float_mode())?;
                self.bi = src.tell();
                t
            }
            Mode::Run => {
                let bytes: Vec<i8> = self.mem.read_bytes(0, self.mem.top()).to_vec();
                let mut src = crate::cursor::ProgramSource::new(&bytes, 0, self.here);
                let t = crate::token_codec::decode_token(&mut src)?;
                self.here = src.tell();
                t
            }
            Mode::Erun => {
                let mut src = crate::cursor::ProgramSource::new(&self.eeprom_cells, 0, self.here);
                let t = crate::token_codec::decode_token(&mut src)?;
                self.here = src.tell();
                t
            }
        };
        Ok(())
    }

    pub fn expect_char(&mut self, c: char) -> Result<()> {
        if self.token == TokenKind::Char(c) {
            self.advance()
        } else {
            Err(BasicError::new(ErrorKind::Unknown))
        }
    }

    // -- scalar / array / string variable routing ---------------------
    //
    // A single letter with no second character is a static (spec §3); a
    // two-character or `@`-prefixed name lives on the heap. Two-character
    // heap scalars are lazily `bmalloc`'d on first write and raise
    // `ErrorKind::Variable` on a read before that — statics are implicitly
    // declared at zero and never error.

    pub fn get_scalar(&mut self, n1: char, n2: char) -> Result<crate::config::Number> {
        if n1 == '@' {
            return self.get_pseudo_scalar(n2);
        }
        if Heap::is_static_scalar(n1, n2) {
            return Ok(self.statics.get(n1));
        }
        self.heap.getvar(&self.mem, n1, n2)
    }

    pub fn set_scalar(&mut self, n1: char, n2: char, v: crate::config::Number) -> Result<()> {
        if n1 == '@' {
            return self.set_pseudo_scalar(n2, v);
        }
        if Heap::is_static_scalar(n1, n2) {
            self.statics.set(n1, v);
            return Ok(());
        }
        if self.heap.bfind(&self.mem, n1, n2, crate::heap::ObjType::Scalar).is_none() {
            self.heap.bmalloc(&mut self.mem, n1, n2, crate::heap::ObjType::Scalar, 0)?;
        }
        self.heap.setvar(&mut self.mem, n1, n2, v)
    }

    pub fn array_get(&mut self, n1: char, n2: char, idx: u16) -> Result<crate::config::Number> {
        if n1 == '@' {
            return self.pseudo_array_get(n2, idx);
        }
        self.heap.array_get(&self.mem, n1, n2, idx)
    }

    pub fn array_set(&mut self, n1: char, n2: char, idx: u16, v: crate::config::Number) -> Result<()> {
        if n1 == '@' {
            return self.pseudo_array_set(n2, idx, v);
        }
        self.heap.array_set(&mut self.mem, n1, n2, idx, v)
    }

    pub fn string_get(&mut self, n1: char, n2: char) -> Result<String> {
        if n1 == '@' {
            return self.pseudo_string_get(n2);
        }
        self.heap.string_get(&self.mem, n1, n2)
    }

    pub fn string_set(&mut self, n1: char, n2: char, start: u16, text: &str) -> Result<()> {
        if n1 == '@' {
            return Err(BasicError::new(ErrorKind::String));
        }
        self.heap.string_set(&mut self.mem, n1, n2, start, text, self.config.stefan_extension)
    }

    fn get_pseudo_scalar(&mut self, n2: char) -> Result<crate::config::Number> {
        use crate::config::Number;
        Ok(match n2 {
            'S' => self.ert.map(|k| k.code()).unwrap_or(0) as Number,
            'I' => input_source_code(self.input_source) as Number,
            'O' => self.od as Number,
            'C' => self.charport.peek_char().unwrap_or(0) as Number,
            'R' => self.rng_state as Number,
            'X' => self.cursor_x,
            'Y' => self.cursor_y,
            _ => return Err(BasicError::new(ErrorKind::Variable)),
        })
    }

    fn set_pseudo_scalar(&mut self, n2: char, v: crate::config::Number) -> Result<()> {
        match n2 {
            'S' => {
                self.ert = None;
            }
            'I' => self.input_source = input_source_from_code(v as i64),
            'O' => self.od = v as i64 as u8,
            'R' => self.rng_state = v as i64 as u16,
            'X' => self.cursor_x = v,
            'Y' => self.cursor_y = v,
            _ => return Err(BasicError::new(ErrorKind::Variable)),
        }
        Ok(())
    }

    fn pseudo_array_get(&self, n2: char, idx: u16) -> Result<crate::config::Number> {
        use crate::config::Number;
        match n2 {
            'E' => {
                let i = (idx as usize).checked_sub(1).ok_or_else(|| BasicError::new(ErrorKind::Range))?;
                self.eeprom_cells.get(i).map(|&b| b as Number).ok_or_else(|| BasicError::new(ErrorKind::Range))
            }
            'D' => {
                let i = (idx as usize).checked_sub(1).ok_or_else(|| BasicError::new(ErrorKind::Range))?;
                self.display.get(i).map(|&b| b as Number).ok_or_else(|| BasicError::new(ErrorKind::Range))
            }
            '\0' => {
                let len = self.mem.len();
                let i = idx as usize;
                if i == 0 || i > len {
                    return Err(BasicError::new(ErrorKind::Range));
                }
                Ok(self.mem.read8((len - i) as u16) as Number)
            }
            _ => Err(BasicError::new(ErrorKind::Variable)),
        }
    }

    fn pseudo_array_set(&mut self, n2: char, idx: u16, v: crate::config::Number) -> Result<()> {
        match n2 {
            'E' => {
                let i = (idx as usize).checked_sub(1).ok_or_else(|| BasicError::new(ErrorKind::Range))?;
                let slot = self.eeprom_cells.get_mut(i).ok_or_else(|| BasicError::new(ErrorKind::Range))?;
                *slot = v as i64 as i8;
                Ok(())
            }
            'D' => {
                let i = (idx as usize).checked_sub(1).ok_or_else(|| BasicError::new(ErrorKind::Range))?;
                let slot = self.display.get_mut(i).ok_or_else(|| BasicError::new(ErrorKind::Range))?;
                *slot = v as i64 as i8;
                Ok(())
            }
            '\0' => {
                let len = self.mem.len();
                let i = idx as usize;
                if i == 0 || i > len {
                    return Err(BasicError::new(ErrorKind::Range));
                }
                self.mem.write8((len - i) as u16, v as i64 as i8);
                Ok(())
            }
            _ => Err(BasicError::new(ErrorKind::Variable)),
        }
    }

    fn pseudo_string_get(&mut self, n2: char) -> Result<String> {
        if n2 != '\0' {
            return Err(BasicError::new(ErrorKind::Variable));
        }
        let end = self.ibuffer.iter().position(|&b| b == 0).unwrap_or(self.ibuffer.len());
        Ok(self.ibuffer[..end].iter().map(|&b| b as char).collect())
    }

    // -- output --------------------------------------------------------

    pub fn write_str(&mut self, s: &str) {
        let mask = self.out_override.unwrap_or(self.od);
        for b in s.bytes() {
            self.charport.write_char(mask, b);
        }
    }

    // -- CLR / NEW -------------------------------------------------------

    /// Zeros static variables and releases the heap (spec §4.F "CLR").
    pub fn clr(&mut self) {
        self.statics.clear();
        self.heap.clear(&mut self.mem);
        self.print_pending_space = false;
    }

    // -- top-level driver -------------------------------------------------

    /// Run statements from the current token/cursor position until the
    /// program (or the single immediate-mode statement list) is exhausted,
    /// `END`/`STOP`/`NEW`/`LOAD` halt it, or an error aborts it.
    pub fn drive(&mut self) {
        self.halted = false;
        loop {
            if self.halted {
                break;
            }
            if self.mode != Mode::Int && self.poll_break() {
                break;
            }
            match self.step_once() {
                Ok(()) => {}
                Err(e) => {
                    self.report_error(e);
                    break;
                }
            }
        }
    }

    fn poll_break(&mut self) -> bool {
        if self.charport.peek_char() == Some(BREAKCHAR) {
            self.charport.read_char();
            self.resume_mode = Some(self.mode);
            self.mode = Mode::Int;
            self.halted = true;
            return true;
        }
        false
    }

    fn step_once(&mut self) -> Result<()> {
        match &self.token {
            TokenKind::LineNumber(n) => {
                self.current_line = Some(*n);
                self.advance()?;
                return Ok(());
            }
            TokenKind::Eol => {
                if self.mode == Mode::Int {
                    self.halted = true;
                    return Ok(());
                }
                if self.here >= self.program_len() {
                    self.halted = true;
                    self.mode = Mode::Int;
                    return Ok(());
                }
                self.advance()?;
                return Ok(());
            }
            _ => {}
        }
        match self.exec_statement() {
            Ok(()) => {
                if self.token == TokenKind::Char(':') {
                    self.advance()?;
                }
                Ok(())
            }
            Err(e) if e.kind.is_trappable() => {
                log::warn!("trappable I/O error {:?} set into @S", e.kind);
                self.ert = Some(e.kind);
                if self.token == TokenKind::Char(':') {
                    self.advance()?;
                }
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// The 5-step error protocol (spec §7): print, clear the evaluation
    /// and control stacks, reset I/O stream selection, drop to `INT`.
    fn report_error(&mut self, mut err: BasicError) {
        if err.line.is_none() && self.mode != Mode::Int {
            err.line = program::myline(&self.mem, self.here.saturating_sub(1));
        }
        let text = err.to_string();
        self.last_error = Some(err.kind);
        self.write_str(&text);
        self.write_str("\n");
        self.stack.clear();
        self.for_stack.clear();
        self.gosub_stack.clear();
        self.od = sink::DEFAULT;
        self.out_override = None;
        self.input_source = InputSource::Keyboard;
        self.print_pending_space = false;
        self.mode = Mode::Int;
        self.resume_mode = None;
        self.halted = true;
    }

    /// Entry point for one line typed at the prompt: either stores it (it
    /// has a leading line number) or executes it immediately.
    pub fn handle_line(&mut self, line: &str) -> Result<()> {
        self.last_error = None;
        match program::tokenize_line(line, config::float_mode()) {
            Ok(Some((n, scratch))) => {
                if let Err(e) = program::storeline(&mut self.mem, n, &scratch) {
                    self.report_error(e);
                }
                return Ok(());
            }
            Ok(None) => {}
            Err(e) => {
                self.report_error(e);
                return Ok(());
            }
        }
        self.ibuffer = line.bytes().chain(std::iter::once(0u8)).collect();
        self.bi = 0;
        self.mode = Mode::Int;
        if let Err(e) = self.advance() {
            self.report_error(e);
            return Ok(());
        }
        self.drive();
        Ok(())
    }

    /// Boot directly from an EEPROM image (spec §6): if it's flagged to
    /// autorun, enter `ERUN` and execute it in place without ever copying
    /// it into the byte store.
    pub fn boot_from_eeprom(&mut self, image: crate::eeprom::Image) -> Result<()> {
        self.eeprom_cells = image.program.iter().map(|&b| b as i8).collect();
        if image.should_autorun() {
            self.stack.clear();
            self.for_stack.clear();
            self.gosub_stack.clear();
            self.clr();
            self.mode = Mode::Erun;
            self.here = 0;
            self.advance()?;
            self.drive();
        }
        Ok(())
    }
}

pub(crate) fn input_source_code(s: InputSource) -> i32 {
    match s {
        InputSource::Keyboard => 0,
        InputSource::Serial => 1,
        InputSource::File => 2,
    }
}

pub(crate) fn input_source_from_code(n: i64) -> InputSource {
    match n {
        1 => InputSource::Serial,
        2 => InputSource::File,
        _ => InputSource::Keyboard,
    }
}

impl ErrorKind {
    /// Stable small integer code exposed through `@S` (spec §3).
    pub fn code(self) -> i32 {
        match self {
            ErrorKind::Unknown => 1,
            ErrorKind::Number => 2,
            ErrorKind::DivByZero => 3,
            ErrorKind::LineUnknown => 4,
            ErrorKind::Return => 5,
            ErrorKind::Next => 6,
            ErrorKind::Gosub => 7,
            ErrorKind::For => 8,
            ErrorKind::OutOfMemory => 9,
            ErrorKind::Stack => 10,
            ErrorKind::Dim => 11,
            ErrorKind::Range => 12,
            ErrorKind::String => 13,
            ErrorKind::Variable => 14,
            ErrorKind::File => 15,
            ErrorKind::Function => 16,
            ErrorKind::Args => 17,
            ErrorKind::Eeprom => 18,
            ErrorKind::Sdcard => 19,
        }
    }
}
