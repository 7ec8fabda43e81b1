use std::io::Write;

use crate::events::format_mm_ss;

/// Where the countdown shows its remaining time.
pub trait DisplaySink: Send + Sync {
    fn show(&self, label: &str, remaining_secs: u64);

    fn finish(&self, label: &str);
}

/// Single self-overwriting line on stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalDisplay;

impl DisplaySink for TerminalDisplay {
    fn show(&self, label: &str, remaining_secs: u64) {
        let mut out = std::io::stdout().lock();
        let _ = write!(out, "\r  {label} {}", format_mm_ss(remaining_secs));
        let _ = out.flush();
    }

    fn finish(&self, label: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "\r  {label} 00:00    ");
        let _ = out.flush();
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullDisplay;

impl DisplaySink for NullDisplay {
    fn show(&self, _label: &str, _remaining_secs: u64) {}

    fn finish(&self, _label: &str) {}
}
