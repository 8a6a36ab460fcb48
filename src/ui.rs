use std::io::{BufRead, IsTerminal, Write};
use crate::error::Result;

fn enabled() -> bool {
    std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

fn paint(s: &str, code: &str) -> String {
    if enabled() {
        format!("\x1b[{}m{}\x1b[0m", code, s)
    } else {
        s.to_string()
    }
}

pub fn success_line(label: &str, value: &str) -> String {
    let mark = paint("✓", "32");
    let label = paint(label, "1;32");
    format!("{} {} {}", mark, label, value)
}

pub fn info_line(label: &str, value: &str) -> String {
    let mark = paint("•", "36");
    let label = paint(label, "1;36");
    format!("{} {} {}", mark, label, value)
}

pub fn warn_line(label: &str, value: &str) -> String {
    let mark = paint("!", "33");
    let label = paint(label, "1;33");
    format!("{} {} {}", mark, label, value)
}

/// Yes/no question put to the user.
pub trait Confirm {
    fn confirm(&mut self, label: &str) -> Result<bool>;
}

/// Asks on a text terminal; anything but an explicit yes declines.
pub struct TerminalPrompt<R, W> {
    input: R,
    output: W,
}

impl TerminalPrompt<std::io::StdinLock<'static>, std::io::Stdout> {
    pub fn stdio() -> Self {
        TerminalPrompt::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        TerminalPrompt { input, output }
    }
}

impl<R: BufRead, W: Write> Confirm for TerminalPrompt<R, W> {
    fn confirm(&mut self, label: &str) -> Result<bool> {
        write!(self.output, "{}? [y/N]: ", paint(label, "1"))?;
        self.output.flush()?;
        let mut answer = String::new();
        if self.input.read_line(&mut answer)? == 0 {
            writeln!(self.output)?;
            return Ok(false);
        }
        Ok(parse_yes(&answer))
    }
}

fn parse_yes(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
