use std::io::Write as _;

use clap::Parser;

use tinybasic::config::{Config, DEFAULT_MEM};
use tinybasic::hardware::NullHardwarePort;
use tinybasic::interpreter::Interpreter;
use tinybasic::io::StdioPort;

/// A line-numbered BASIC interpreter in the Palo Alto / Apple 1 tradition.
#[derive(Parser)]
#[command(name = "tinybasic", version)]
struct Args {
    /// A `.bas` source file to load before dropping into the prompt.
    file: Option<String>,

    /// Byte-store capacity.
    #[arg(long, default_value_t = DEFAULT_MEM)]
    mem: usize,

    /// Run `file` immediately instead of waiting at the prompt.
    #[arg(long)]
    autorun: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let config = Config { mem: args.mem, ..Config::default() };
    let mut interp = Interpreter::new(
        config,
        Box::new(StdioPort::new()),
        Box::new(StdioPort::new()),
        Box::new(NullHardwarePort),
    );

    if let Some(path) = &args.file {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                for line in text.lines() {
                    if let Err(e) = interp.handle_line(line) {
                        eprintln!("{e}");
                    }
                }
                if args.autorun {
                    if let Err(e) = interp.handle_line("RUN") {
                        eprintln!("{e}");
                    }
                }
            }
            Err(e) => {
                eprintln!("tinybasic: {path}: {e}");
                std::process::exit(1);
            }
        }
    }

    loop {
        print!("> ");
        let _ = std::io::stdout().flush();
        let mut line = String::new();
        if std::io::stdin().read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        let line = line.trim_end_matches(['\n', '\r']);
        if line.is_empty() {
            continue;
        }
        if let Err(e) = interp.handle_line(line) {
            println!("{e}");
        }
    }
}
