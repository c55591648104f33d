//! End-to-end tests driving `Interpreter` through a small in-memory
//! character port, the way `io::BufferPort`'s own unit tests drive
//! `CharPort` directly — except here the port's queues are shared via
//! `Rc<RefCell<..>>` so the test can feed input and read output after
//! the interpreter has taken ownership of the boxed port.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use tinybasic::config::Config;
use tinybasic::hardware::NullHardwarePort;
use tinybasic::interpreter::Interpreter;
use tinybasic::io::{sink, BufferPort, CharPort};

#[derive(Clone, Default)]
struct Shared {
    input: Rc<RefCell<VecDeque<u8>>>,
    output: Rc<RefCell<Vec<u8>>>,
}

struct SharedPort(Shared);

impl CharPort for SharedPort {
    fn read_char(&mut self) -> Option<u8> {
        self.0.input.borrow_mut().pop_front()
    }

    fn peek_char(&mut self) -> Option<u8> {
        self.0.input.borrow().front().copied()
    }

    fn write_char(&mut self, mask: u8, c: u8) {
        if mask & (sink::SERIAL | sink::DISPLAY) != 0 {
            self.0.output.borrow_mut().push(c);
        }
    }

    fn read_line(&mut self) -> Option<String> {
        let mut buf = self.0.input.borrow_mut();
        if buf.is_empty() {
            return None;
        }
        let mut line = Vec::new();
        while let Some(b) = buf.pop_front() {
            if b == b'\n' {
                break;
            }
            line.push(b);
        }
        Some(line.into_iter().map(|b| b as char).collect())
    }
}

struct Harness {
    interp: Interpreter,
    shared: Shared,
}

impl Harness {
    fn new() -> Self {
        let shared = Shared::default();
        let interp = Interpreter::new(
            Config::default(),
            Box::new(SharedPort(shared.clone())),
            Box::new(BufferPort::new()),
            Box::new(NullHardwarePort),
        );
        Self { interp, shared }
    }

    fn feed(&mut self, s: &str) {
        self.shared.input.borrow_mut().extend(s.bytes());
    }

    fn output(&self) -> String {
        self.shared.output.borrow().iter().map(|&b| b as char).collect()
    }

    /// Load every line of `prog`, then `RUN` it, returning everything
    /// written to the display sink.
    fn run(&mut self, prog: &str) -> String {
        for line in prog.lines() {
            let line = line.trim();
            if !line.is_empty() {
                self.interp.handle_line(line).unwrap();
            }
        }
        self.interp.handle_line("RUN").unwrap();
        self.output()
    }
}

#[test]
fn for_next_counts_up() {
    let mut h = Harness::new();
    let out = h.run(
        r#"
        10 FOR I = 1 TO 5
        20 PRINT I
        30 NEXT I
        "#,
    );
    assert_eq!(out, "1\n2\n3\n4\n5\n");
}

#[test]
fn for_next_with_step() {
    let mut h = Harness::new();
    let out = h.run(
        r#"
        10 FOR I = 10 TO 0 STEP -5
        20 PRINT I
        30 NEXT I
        "#,
    );
    assert_eq!(out, "10\n5\n0\n");
}

#[test]
fn if_then_branches() {
    let mut h = Harness::new();
    let out = h.run(
        r#"
        10 LET X = 5
        20 IF X > 3 THEN PRINT "BIG"
        30 IF X > 10 THEN PRINT "HUGE"
        "#,
    );
    assert_eq!(out, "BIG\n");
}

#[test]
fn if_then_bare_line_number_is_goto() {
    let mut h = Harness::new();
    let out = h.run(
        r#"
        10 LET X = 1
        20 IF X = 1 THEN 40
        30 PRINT "SKIPPED"
        40 PRINT "LANDED"
        "#,
    );
    assert_eq!(out, "LANDED\n");
}

#[test]
fn gosub_return_resumes_after_call() {
    let mut h = Harness::new();
    let out = h.run(
        r#"
        10 PRINT "BEFORE"
        20 GOSUB 100
        30 PRINT "AFTER"
        40 END
        100 PRINT "INSIDE"
        110 RETURN
        "#,
    );
    assert_eq!(out, "BEFORE\nINSIDE\nAFTER\n");
}

#[test]
fn return_without_gosub_errors() {
    let mut h = Harness::new();
    let out = h.run("10 RETURN");
    assert!(out.contains("RETURN WITHOUT GOSUB"));
}

#[test]
fn dim_array_filled_by_for_loop() {
    let mut h = Harness::new();
    let out = h.run(
        r#"
        10 DIM A(3)
        20 FOR I = 1 TO 3
        30 LET A(I) = I * I
        40 NEXT I
        50 FOR I = 1 TO 3
        60 PRINT A(I)
        70 NEXT I
        "#,
    );
    assert_eq!(out, "1\n4\n9\n");
}

#[test]
fn string_concatenation() {
    let mut h = Harness::new();
    let out = h.run(
        r#"
        10 DIM A$(10)
        20 LET A$ = "HI "
        30 PRINT A$ + "THERE"
        "#,
    );
    assert_eq!(out, "HI THERE\n");
}

#[test]
fn string_equality_is_not_numeric_coercion() {
    let mut h = Harness::new();
    let out = h.run(
        r#"
        10 DIM A$(5)
        20 LET A$ = "HI"
        30 IF A$ = "HI" THEN PRINT "MATCH"
        40 IF A$ = "BYE" THEN PRINT "NOPE"
        "#,
    );
    assert_eq!(out, "MATCH\n");
}

#[test]
fn input_doubles_a_number() {
    let mut h = Harness::new();
    h.feed("21\n");
    let out = h.run(
        r#"
        10 INPUT X
        20 PRINT X * 2
        "#,
    );
    assert!(out.ends_with("42\n"), "output was {out:?}");
}

#[test]
fn input_break_char_aborts_cleanly() {
    let mut h = Harness::new();
    h.feed("#");
    let out = h.run(
        r#"
        10 INPUT X
        20 PRINT "UNREACHED"
        "#,
    );
    assert!(!out.contains("UNREACHED"));
}

#[test]
fn break_exits_for_loop_early() {
    let mut h = Harness::new();
    let out = h.run(
        r#"
        10 FOR I = 1 TO 10
        20 IF I = 3 THEN BREAK
        30 PRINT I
        40 NEXT I
        50 PRINT "DONE"
        "#,
    );
    assert_eq!(out, "1\n2\nDONE\n");
}

#[test]
fn print_semicolon_suppresses_newline_and_comma_spaces() {
    let mut h = Harness::new();
    let out = h.run(r#"10 PRINT "A";"B","C""#);
    assert_eq!(out, "AB C\n");
}

#[test]
fn print_separates_numbers_across_suppressed_newlines() {
    let mut h = Harness::new();
    let out = h.run(
        r#"
        10 DIM A(5)
        20 FOR I = 1 TO 5: A(I) = I * I: NEXT I
        30 FOR I = 1 TO 5: PRINT A(I);: NEXT I
        "#,
    );
    assert_eq!(out, "1 4 9 16 25");
}

#[test]
fn division_by_zero_is_trapped_by_program() {
    let mut h = Harness::new();
    let out = h.run(
        r#"
        10 LET X = 1 / 0
        20 PRINT "AFTER"
        "#,
    );
    assert!(out.contains("DIVIDE BY ZERO"));
    assert!(!out.contains("AFTER"));
}

#[test]
fn list_round_trips_through_detokenizer() {
    let mut h = Harness::new();
    h.interp.handle_line("10 FOR I = 1 TO 3").unwrap();
    h.interp.handle_line("20 PRINT I").unwrap();
    h.interp.handle_line("30 NEXT I").unwrap();
    h.interp.handle_line("LIST").unwrap();
    let out = h.output();
    assert!(out.contains("FOR I"));
    assert!(out.contains("NEXT I"));
}

#[test]
fn save_and_load_round_trip_a_program() {
    let mut h = Harness::new();
    h.interp.handle_line("10 PRINT 1").unwrap();
    h.interp.handle_line("20 PRINT 2").unwrap();
    h.interp.handle_line("SAVE \"PROG\"").unwrap();
    h.interp.handle_line("NEW").unwrap();
    h.interp.handle_line("LOAD \"PROG\"").unwrap();
    let out = h.run("");
    assert_eq!(out, "1\n2\n");
}
