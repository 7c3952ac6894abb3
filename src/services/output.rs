//! Operator console.
//!
//! Colored, human-facing progress lines. Structured diagnostics go through
//! `tracing` instead; this is what the person running the tool reads.

use colored::Colorize;
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug)]
enum Sink {
    Terminal,
    Buffer(Arc<Mutex<String>>),
}

#[derive(Clone, Debug)]
pub struct Console {
    sink: Sink,
}

impl Console {
    /// Writes to stdout (errors to stderr).
    pub fn terminal() -> Self {
        Self {
            sink: Sink::Terminal,
        }
    }

    /// Captures everything in memory; used by tests.
    pub fn buffered() -> Self {
        Self {
            sink: Sink::Buffer(Arc::new(Mutex::new(String::new()))),
        }
    }

    /// Captured text (always empty for the terminal sink).
    pub fn contents(&self) -> String {
        match self.sink {
            Sink::Terminal => String::new(),
            Sink::Buffer(ref buf) => buf.lock().map(|b| b.clone()).unwrap_or_default(),
        }
    }

    fn emit(&self, line: String, to_stderr: bool) {
        match self.sink {
            Sink::Terminal if to_stderr => eprintln!("{}", line),
            Sink::Terminal => println!("{}", line),
            Sink::Buffer(ref buf) => {
                if let Ok(mut b) = buf.lock() {
                    b.push_str(&line);
                    b.push('\n');
                }
            }
        }
    }

    pub fn blank(&self) {
        self.emit(String::new(), false);
    }

    pub fn header(&self, text: &str) {
        self.emit(format!("{}", format!("=== {} ===", text).cyan().bold()), false);
    }

    pub fn step(&self, index: usize, total: usize, text: &str) {
        self.emit(
            format!("{} {}", format!("[{}/{}]", index, total).blue().bold(), text.bold()),
            false,
        );
    }

    pub fn info(&self, text: &str) {
        self.emit(format!("{} {}", "→".cyan(), text), false);
    }

    pub fn success(&self, text: &str) {
        self.emit(format!("{} {}", "✓".green().bold(), text), false);
    }

    pub fn warn(&self, text: &str) {
        self.emit(format!("{} {}", "⚠".yellow().bold(), text), false);
    }

    pub fn error(&self, text: &str) {
        self.emit(format!("{} {}", "✗".red().bold(), text), true);
    }

    /// Indented, dimmed multi-line block (command output, log tails).
    pub fn block(&self, text: &str) {
        for line in text.lines() {
            self.emit(format!("    {}", line.dimmed()), false);
        }
    }

    pub fn plain(&self, text: &str) {
        self.emit(text.to_string(), false);
    }
}
