use std::io::{self, Write};

use tracing::warn;

use crate::codes::ScanRecord;

/// Fired exactly once per newly seen payload between resets.
pub trait Notifier: Send {
    fn alert(&mut self, record: &ScanRecord);
}

#[derive(Default)]
pub struct TerminalBell;

impl Notifier for TerminalBell {
    fn alert(&mut self, _record: &ScanRecord) {
        let mut out = io::stdout().lock();
        if let Err(e) = out.write_all(b"\x07").and_then(|_| out.flush()) {
            warn!("Failed to ring terminal bell: {e}");
        }
    }
}
