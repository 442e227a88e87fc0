//! The console every operation writes its user-facing output to.
//!
//! A single `Console` is created per invocation and passed down explicitly.
//! All steps of a composite run share it, so writes are serialized through one
//! lock and flushed immediately to keep them in program order with the output
//! of child processes.

use std::fmt::Display;
use std::io::{self, IsTerminal, Write};
use std::sync::Arc;
use std::time::Duration;

use anstyle::{AnsiColor, Reset, RgbColor, Style};
use parking_lot::Mutex;

const ACCENT_COLOR: Style =
    Style::new().fg_color(Some(anstyle::Color::Rgb(RgbColor(207, 106, 76))));
const SUCCESS_COLOR: Style = Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Green)));
const ERROR_COLOR: Style = Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Red)));
const WARN_COLOR: Style = Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Yellow)));
const DIM: Style = Style::new().dimmed();
const BOLD: Style = Style::new().bold();

pub struct Console {
    out: Mutex<Box<dyn Write + Send>>,
    color: bool,
    inherit_stdio: bool,
}

/// In-memory sink backing a buffered console.
#[derive(Clone, Default)]
pub struct ConsoleBuffer(Arc<Mutex<Vec<u8>>>);

impl ConsoleBuffer {
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for ConsoleBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Console {
    /// Console on stdout. Child processes inherit the terminal directly.
    #[must_use]
    pub fn terminal() -> Self {
        Self {
            color: io::stdout().is_terminal(),
            out: Mutex::new(Box::new(io::stdout())),
            inherit_stdio: true,
        }
    }

    /// Console writing into memory. Child process output is captured and
    /// copied into the same buffer, all of stdout before all of stderr, so
    /// their relative order is lost.
    #[must_use]
    pub fn buffered() -> (Self, ConsoleBuffer) {
        let buffer = ConsoleBuffer::default();
        let console = Self {
            out: Mutex::new(Box::new(buffer.clone())),
            color: false,
            inherit_stdio: false,
        };
        (console, buffer)
    }

    /// Whether child processes should write straight to the inherited stdio.
    #[must_use]
    pub fn inherits_stdio(&self) -> bool {
        self.inherit_stdio
    }

    pub fn write_raw(&self, bytes: &[u8]) {
        let mut out = self.out.lock();
        let _ = out.write_all(bytes);
        let _ = out.flush();
    }

    pub fn println(&self, message: impl Display) {
        self.write_raw(format!("{message}\n").as_bytes());
    }

    pub fn notice(&self, message: impl Display) {
        self.println(format!("{} {message}", self.paint(ACCENT_COLOR, "❱")));
    }

    pub fn success(&self, message: impl Display) {
        self.println(format!("{} {message}", self.paint(SUCCESS_COLOR, "✓")));
    }

    pub fn failure(&self, message: impl Display) {
        self.println(format!("{} {message}", self.paint(ERROR_COLOR, "✘")));
    }

    pub fn warning(&self, message: impl Display) {
        self.println(self.paint(WARN_COLOR, &message.to_string()));
    }

    pub fn step_started(&self, index: usize, total: usize, name: &str) {
        let prefix = step_prefix(index, total);
        self.notice(format!("{} {name}", self.paint(BOLD, &prefix)));
    }

    pub fn step_succeeded(&self, index: usize, total: usize, name: &str, elapsed: Duration) {
        let prefix = step_prefix(index, total);
        self.success(format!(
            "{} {name} {} {}",
            self.paint(BOLD, &prefix),
            self.paint(SUCCESS_COLOR, "ok"),
            self.paint(DIM, &format!("({})", format_duration(elapsed)))
        ));
    }

    pub fn step_failed(
        &self,
        index: usize,
        total: usize,
        name: &str,
        code: i32,
        elapsed: Duration,
    ) {
        let prefix = step_prefix(index, total);
        self.failure(format!(
            "{} {name} {} {}",
            self.paint(BOLD, &prefix),
            self.paint(ERROR_COLOR, &format!("failed (exit code {code})")),
            self.paint(DIM, &format!("({})", format_duration(elapsed)))
        ));
    }

    fn paint(&self, style: Style, s: &str) -> String {
        if self.color {
            format!("{style}{s}{Reset}")
        } else {
            s.to_string()
        }
    }
}

fn step_prefix(index: usize, total: usize) -> String {
    let width = total.to_string().len();
    format!("[{index:>width$}/{total}]")
}

#[must_use]
pub fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let tenths = d.subsec_millis() / 100;
    if total_secs < 60 {
        format!("{total_secs}.{tenths}s")
    } else {
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        format!("{mins}m {secs}.{tenths}s")
    }
}
