use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
        mpsc::{Receiver, Sender},
    },
    thread,
    time::{Duration, Instant},
};

use tracing::{error, info, warn};

use crate::{
    bus::{self, Command},
    capturer::{CameraBackend, start_capturer},
    codes::{Notifier, Registry, ScanRecord},
    config::ScannerConfig,
    decoder::SymbolDecoder,
    display::{DisplaySurface, Key},
    error::ScanError,
    frame::{CapturedFrame, LatestFrame},
    overlay,
    pipeline::DecodePipeline,
    vision::RoiDetector,
};

/// What the control surface gets to see after each tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScanStatus {
    pub unique: usize,
    pub last: Option<ScanRecord>,
    pub milestone: Option<Duration>,
    pub running: bool,
}

#[derive(Clone)]
pub struct ControlHandle {
    commands: Sender<Command>,
    running: Arc<AtomicBool>,
    status: Arc<Mutex<ScanStatus>>,
}

impl ControlHandle {
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        let _ = self.commands.send(Command::Stop);
    }

    pub fn reset_scan(&self) {
        if self.commands.send(Command::ResetScan).is_err() {
            warn!("Scanner is gone, reset ignored");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> ScanStatus {
        match self.status.lock() {
            Ok(status) => status.clone(),
            Err(e) => {
                error!("Failed to lock scan status: {e:?}");
                ScanStatus::default()
            }
        }
    }
}

pub struct Scanner {
    config: ScannerConfig,
    running: Arc<AtomicBool>,
    commands_tx: Sender<Command>,
    commands_rx: Receiver<Command>,
    status: Arc<Mutex<ScanStatus>>,
}

impl Scanner {
    pub fn new(config: ScannerConfig) -> Self {
        let (commands_tx, commands_rx) = bus::channel();
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            commands_tx,
            commands_rx,
            status: Arc::new(Mutex::new(ScanStatus::default())),
        }
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn control(&self) -> ControlHandle {
        ControlHandle {
            commands: self.commands_tx.clone(),
            running: self.running.clone(),
            status: self.status.clone(),
        }
    }

    /// Blocks, rendering on the calling thread until stopped.
    pub fn start<B, D, S>(
        &self,
        backend: Arc<B>,
        device: u32,
        decoder: D,
        display: &mut S,
        notifier: Box<dyn Notifier>,
    ) -> Result<ScanStatus, ScanError>
    where
        B: CameraBackend + ?Sized + 'static,
        D: SymbolDecoder + 'static,
        S: DisplaySurface + ?Sized,
    {
        // stale commands from a previous run
        while self.commands_rx.try_recv().is_ok() {}
        self.running.store(true, Ordering::SeqCst);

        let latest = Arc::new(LatestFrame::new());
        let capturer = match start_capturer(
            backend,
            device,
            self.config.capture.clone(),
            latest.clone(),
            self.running.clone(),
        ) {
            Ok(v) => v,
            Err(e) => {
                error!("Failed to start capture on camera #{device}: {e}");
                self.running.store(false, Ordering::SeqCst);
                self.publish_status(ScanStatus::default());
                return Err(e);
            }
        };

        let mut pipeline = match DecodePipeline::spawn(
            decoder,
            RoiDetector::new(self.config.roi.clone()),
            self.config.pipeline.clone(),
            self.running.clone(),
        ) {
            Ok(v) => v,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                if let Err(cause) = capturer.join() {
                    warn!("Capture ended with: {cause}");
                }
                return Err(ScanError::Decode(format!("failed to spawn decode thread: {e}")));
            }
        };

        let mut registry =
            Registry::with_limits(notifier, self.config.track_timeout, self.config.milestone);
        info!("Scanning started on camera #{device}");

        let outcome = self.render_loop(&latest, &pipeline, &mut registry, display);

        self.running.store(false, Ordering::SeqCst);
        pipeline.stop();
        let capture_outcome = capturer.join();
        latest.clear();

        let status = self.snapshot(&registry);
        self.publish_status(status.clone());
        info!("Scanning stopped with {} codes", status.unique);

        outcome.and(capture_outcome).map(|_| status)
    }

    fn render_loop<S: DisplaySurface + ?Sized>(
        &self,
        latest: &LatestFrame,
        pipeline: &DecodePipeline,
        registry: &mut Registry,
        display: &mut S,
    ) -> Result<(), ScanError> {
        let mut last_submitted: Option<Arc<CapturedFrame>> = None;

        while self.running.load(Ordering::SeqCst) {
            let tick_started = Instant::now();

            for command in self.commands_rx.try_iter() {
                match command {
                    Command::ResetScan => reset(pipeline, registry),
                    Command::Stop => self.running.store(false, Ordering::SeqCst),
                }
            }
            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            let now = Instant::now();
            let frame = latest.snapshot();
            if let Some(frame) = &frame {
                let fresh = last_submitted
                    .as_ref()
                    .is_none_or(|prev| !Arc::ptr_eq(prev, frame));
                if fresh {
                    pipeline.submit(frame.to_gray());
                    last_submitted = Some(frame.clone());
                }
            }

            if let Some(batch) = pipeline.poll() {
                for result in &batch {
                    registry.observe(result, now);
                }
            }
            registry.expire(now);

            if let Some(frame) = &frame {
                let annotated = overlay::render(
                    &frame.image,
                    registry.tracked(),
                    registry.unique_count(),
                    registry.session(),
                );
                if let Err(e) = display.show(&annotated) {
                    error!("Failed to show frame: {e}");
                    return Err(e);
                }
            }

            for key in display.poll_keys() {
                match key {
                    Key::Char('c' | 'C') => reset(pipeline, registry),
                    Key::Char('q' | 'Q') | Key::Escape => {
                        self.running.store(false, Ordering::SeqCst)
                    }
                    Key::Char(_) => {}
                }
            }
            if !display.is_open() {
                info!("Display closed");
                self.running.store(false, Ordering::SeqCst);
            }

            self.publish_status(self.snapshot(registry));

            if let Some(rest) = self.config.tick.checked_sub(tick_started.elapsed()) {
                thread::sleep(rest);
            }
        }

        Ok(())
    }

    fn snapshot(&self, registry: &Registry) -> ScanStatus {
        ScanStatus {
            unique: registry.unique_count(),
            last: registry.last_record().cloned(),
            milestone: registry.session().milestone,
            running: self.running.load(Ordering::SeqCst),
        }
    }

    fn publish_status(&self, status: ScanStatus) {
        match self.status.lock() {
            Ok(mut slot) => *slot = status,
            Err(e) => error!("Failed to lock scan status to publish it: {e:?}"),
        }
    }
}

fn reset(pipeline: &DecodePipeline, registry: &mut Registry) {
    pipeline.drain();
    registry.reset();
    info!("Scan reset");
}
