use std::io::{self, Write};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderPayload {
    pub title: String,
    pub body: String,
}

pub trait Notifier {
    /// Returns whether a system-level notification was actually shown.
    fn notify(&mut self, payload: &ReminderPayload) -> bool;
}

/// In-process alert line shown when the notifier could not deliver.
pub fn fallback_alert(payload: &ReminderPayload) -> String {
    format!("[reminder] {}: {}", payload.title, payload.body)
}

/// Rings the terminal bell and prints the reminder on its own line.
pub struct TerminalNotifier<W: Write> {
    out: W,
    available: bool,
}

impl TerminalNotifier<io::Stdout> {
    pub fn stdout(available: bool) -> Self {
        Self {
            out: io::stdout(),
            available,
        }
    }
}

#[cfg(test)]
impl<W: Write> TerminalNotifier<W> {
    pub fn new(out: W, available: bool) -> Self {
        Self { out, available }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Notifier for TerminalNotifier<W> {
    fn notify(&mut self, payload: &ReminderPayload) -> bool {
        if !self.available {
            return false;
        }
        let written = writeln!(self.out, "\x07{}: {}", payload.title, payload.body)
            .and_then(|()| self.out.flush());
        written.is_ok()
    }
}
