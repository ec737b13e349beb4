use std::sync::mpsc::{self, Receiver, Sender};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Forget every code seen so far without stopping capture.
    ResetScan,
    Stop,
}

pub fn channel() -> (Sender<Command>, Receiver<Command>) {
    mpsc::channel()
}
