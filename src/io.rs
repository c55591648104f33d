//! # I/O façade (component G)
//!
//! `CharPort` and `FileStore` match spec §6's external interfaces
//! exactly. `StdioPort` is the hosted implementation `main.rs` wires up;
//! `BufferPort` is an in-memory port over `Vec<u8>` queues used by every
//! test in this crate, mirroring the teacher's habit of driving its
//! pipeline from in-memory fixtures rather than real files wherever it
//! can.

use std::io::Write as _;

use crate::error::{BasicError, ErrorKind, Result};

/// Output sink selector bits (spec §4.G: "`od` is a bitmask over
/// {serial, display, printer, file}").
pub mod sink {
    pub const SERIAL: u8 = 1 << 0;
    pub const DISPLAY: u8 = 1 << 1;
    pub const PRINTER: u8 = 1 << 2;
    pub const FILE: u8 = 1 << 3;
    pub const DEFAULT: u8 = DISPLAY;
}

/// Input source selector (spec §4.G: "Input is one of {serial, keyboard, file}").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    Serial,
    Keyboard,
    File,
}

pub trait CharPort {
    /// Blocks until a character is available.
    fn read_char(&mut self) -> Option<u8>;
    /// Non-blocking peek; `checkch` in the spec's glossary terms.
    fn peek_char(&mut self) -> Option<u8>;
    /// Writes to every sink selected by `mask`.
    fn write_char(&mut self, mask: u8, c: u8);
    /// Reads a full line (without the trailing newline), blocking.
    fn read_line(&mut self) -> Option<String>;
    /// Called once per printed line while `LIST`ing; may return `true`
    /// (the spec's `ESC`) to cancel the listing.
    fn wait_on_scroll(&mut self) -> bool {
        false
    }
}

pub trait FileStore {
    fn save(&mut self, name: &str, contents: &str) -> Result<()>;
    fn load(&mut self, name: &str) -> Result<String>;
    fn catalog(&mut self, glob: &str) -> Result<Vec<String>>;
    fn delete(&mut self, name: &str) -> Result<()>;
    fn open(&mut self, name: &str, mode: u8) -> Result<()>;
    fn close(&mut self, mode: u8) -> Result<()>;
}

fn io_err() -> BasicError {
    BasicError::new(ErrorKind::File)
}

/// The hosted port used by `main.rs`: blocking stdin reads, writes fanned
/// out per `od` to stdout. Printer/file bits are no-ops here; a real
/// embedded build would route them to actual peripherals, which are out
/// of scope (spec §1).
pub struct StdioPort {
    pending: std::collections::VecDeque<u8>,
}

impl StdioPort {
    pub fn new() -> Self {
        Self { pending: std::collections::VecDeque::new() }
    }

    fn fill(&mut self) {
        if self.pending.is_empty() {
            let mut line = String::new();
            if std::io::stdin().read_line(&mut line).unwrap_or(0) > 0 {
                self.pending.extend(line.into_bytes());
            }
        }
    }
}

impl Default for StdioPort {
    fn default() -> Self {
        Self::new()
    }
}

impl CharPort for StdioPort {
    fn read_char(&mut self) -> Option<u8> {
        self.fill();
        self.pending.pop_front()
    }

    fn peek_char(&mut self) -> Option<u8> {
        self.fill();
        self.pending.front().copied()
    }

    fn write_char(&mut self, mask: u8, c: u8) {
        if mask & (sink::SERIAL | sink::DISPLAY) != 0 {
            let _ = std::io::stdout().write_all(&[c]);
            let _ = std::io::stdout().flush();
        }
    }

    fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        if std::io::stdin().read_line(&mut line).unwrap_or(0) == 0 {
            return None;
        }
        Some(line.trim_end_matches(['\n', '\r']).to_string())
    }
}

impl FileStore for StdioPort {
    fn save(&mut self, name: &str, contents: &str) -> Result<()> {
        std::fs::write(name, contents).map_err(|_| io_err())
    }

    fn load(&mut self, name: &str) -> Result<String> {
        std::fs::read_to_string(name).map_err(|_| io_err())
    }

    fn catalog(&mut self, glob: &str) -> Result<Vec<String>> {
        let dir = std::path::Path::new(glob).parent().unwrap_or_else(|| std::path::Path::new("."));
        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(|_| io_err())? {
            let entry = entry.map_err(|_| io_err())?;
            if let Some(s) = entry.file_name().to_str() {
                names.push(s.to_string());
            }
        }
        Ok(names)
    }

    fn delete(&mut self, name: &str) -> Result<()> {
        std::fs::remove_file(name).map_err(|_| io_err())
    }

    fn open(&mut self, _name: &str, _mode: u8) -> Result<()> {
        Ok(())
    }

    fn close(&mut self, _mode: u8) -> Result<()> {
        Ok(())
    }
}

/// In-memory port used by every test: input drained from a preloaded
/// queue, output collected into a buffer the test then asserts on.
#[derive(Default)]
pub struct BufferPort {
    pub input: std::collections::VecDeque<u8>,
    pub output: Vec<u8>,
    pub files: std::collections::HashMap<String, String>,
}

impl BufferPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, s: &str) {
        self.input.extend(s.bytes());
    }

    pub fn output_string(&self) -> String {
        self.output.iter().map(|&b| b as char).collect()
    }
}

impl CharPort for BufferPort {
    fn read_char(&mut self) -> Option<u8> {
        self.input.pop_front()
    }

    fn peek_char(&mut self) -> Option<u8> {
        self.input.front().copied()
    }

    fn write_char(&mut self, mask: u8, c: u8) {
        if mask & (sink::SERIAL | sink::DISPLAY) != 0 {
            self.output.push(c);
        }
    }

    fn read_line(&mut self) -> Option<String> {
        if self.input.is_empty() {
            return None;
        }
        let mut line = Vec::new();
        while let Some(b) = self.input.pop_front() {
            if b == b'\n' {
                break;
            }
            line.push(b);
        }
        Some(line.into_iter().map(|b| b as char).collect())
    }
}

impl FileStore for BufferPort {
    fn save(&mut self, name: &str, contents: &str) -> Result<()> {
        self.files.insert(name.to_string(), contents.to_string());
        Ok(())
    }

    fn load(&mut self, name: &str) -> Result<String> {
        self.files.get(name).cloned().ok_or_else(io_err)
    }

    fn catalog(&mut self, _glob: &str) -> Result<Vec<String>> {
        Ok(self.files.keys().cloned().collect())
    }

    fn delete(&mut self, name: &str) -> Result<()> {
        self.files.remove(name).map(|_| ()).ok_or_else(io_err)
    }

    fn open(&mut self, _name: &str, _mode: u8) -> Result<()> {
        Ok(())
    }

    fn close(&mut self, _mode: u8) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_port_echoes_writes() {
        let mut p = BufferPort::new();
        p.write_char(sink::DISPLAY, b'H');
        p.write_char(sink::DISPLAY, b'I');
        assert_eq!(p.output_string(), "HI");
    }

    #[test]
    fn buffer_port_file_roundtrip() {
        let mut p = BufferPort::new();
        p.save("X", "10 PRINT 1").unwrap();
        assert_eq!(p.load("X").unwrap(), "10 PRINT 1");
        assert!(p.load("Y").is_err());
    }
}
