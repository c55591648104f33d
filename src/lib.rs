//! # tinybasic
//!
//! A line-numbered BASIC interpreter in the Palo Alto / Apple 1 tradition:
//! the program is tokenized into a single fixed-capacity byte store and
//! run by a recursive-descent evaluator over a small operator-precedence
//! grammar.
//!
//! ## Pipeline
//!
//! 1. **Tokenizer** (`tokenizer`, `token`) - turns source text into
//!    `TokenKind`s, shared between interactive and run-mode reads.
//! 2. **Program store** (`program`, `memory`, `token_codec`) - keeps the
//!    tokenized program in ascending line-number order inside one byte
//!    buffer, with variables living on a heap that grows down from the
//!    opposite end.
//! 3. **Evaluator** (`evaluator`) - a precedence-climbing expression
//!    parser producing `Value`s.
//! 4. **Executor** (`executor`, `interpreter`) - dispatches one statement
//!    at a time, driven by `Interpreter::handle_line`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use tinybasic::config::Config;
//! use tinybasic::hardware::NullHardwarePort;
//! use tinybasic::interpreter::Interpreter;
//! use tinybasic::io::StdioPort;
//!
//! let mut interp = Interpreter::new(
//!     Config::default(),
//!     Box::new(StdioPort::new()),
//!     Box::new(StdioPort::new()),
//!     Box::new(NullHardwarePort),
//! );
//! interp.handle_line("10 PRINT \"HELLO\"").unwrap();
//! interp.handle_line("RUN").unwrap();
//! ```

pub mod config;
pub mod cursor;
pub mod eeprom;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod hardware;
pub mod heap;
pub mod interpreter;
pub mod io;
pub mod listing;
pub mod memory;
pub mod program;
pub mod rng;
pub mod token;
pub mod token_codec;
pub mod tokenizer;
pub mod value;
