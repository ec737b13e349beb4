mod notify;
mod registry;

pub use notify::{Notifier, TerminalBell};
pub use registry::{Observation, Registry, ScanRecord, ScanSession, TrackedCode};
