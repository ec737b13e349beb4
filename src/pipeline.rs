use std::{
    collections::VecDeque,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc, Condvar, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use image::GrayImage;
use imageproc::point::Point;
use tracing::{debug, error, trace, warn};

use crate::{
    decoder::{DecodeResult, SymbolDecoder},
    error::ScanError,
    vision::{RoiDetector, crop::crop_region},
};

/// Capacity-one handoff where the newest value wins.
pub struct NewestSlot<T> {
    value: Mutex<Option<T>>,
    ready: Condvar,
}

impl<T> Default for NewestSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> NewestSlot<T> {
    pub fn new() -> Self {
        Self {
            value: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    /// Store `value`, returning `true` if an undelivered value was evicted.
    pub fn put(&self, value: T) -> bool {
        let mut slot = match self.value.lock() {
            Ok(v) => v,
            Err(e) => {
                error!("Failed to lock slot to put value: {e}");
                return false;
            }
        };
        let evicted = slot.replace(value).is_some();
        drop(slot);
        self.ready.notify_one();
        evicted
    }

    pub fn take(&self) -> Option<T> {
        match self.value.lock() {
            Ok(mut slot) => slot.take(),
            Err(e) => {
                error!("Failed to lock slot to take value: {e}");
                None
            }
        }
    }

    /// Take the pending value, waiting up to `timeout` for one to arrive.
    pub fn wait_take(&self, timeout: Duration) -> Option<T> {
        let slot = match self.value.lock() {
            Ok(v) => v,
            Err(e) => {
                error!("Failed to lock slot to wait for value: {e}");
                return None;
            }
        };
        match self.ready.wait_timeout_while(slot, timeout, |v| v.is_none()) {
            Ok((mut slot, _)) => slot.take(),
            Err(e) => {
                error!("Slot poisoned while waiting: {e}");
                None
            }
        }
    }

    pub fn clear(&self) -> bool {
        self.take().is_some()
    }
}

/// Completed batches waiting for the render tick; the oldest goes first when full.
pub struct BatchQueue {
    batches: Mutex<VecDeque<Vec<DecodeResult>>>,
    capacity: usize,
}

impl BatchQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            batches: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&self, batch: Vec<DecodeResult>) {
        let mut batches = match self.batches.lock() {
            Ok(v) => v,
            Err(e) => {
                error!("Failed to lock result queue to push batch: {e}");
                return;
            }
        };
        if batches.len() >= self.capacity {
            batches.pop_front();
            warn!("result backlog full, dropped oldest batch");
        }
        batches.push_back(batch);
    }

    pub fn take_all(&self) -> Vec<DecodeResult> {
        match self.batches.lock() {
            Ok(mut batches) => batches.drain(..).flatten().collect(),
            Err(e) => {
                error!("Failed to lock result queue to take batches: {e}");
                Vec::new()
            }
        }
    }

    pub fn clear(&self) {
        match self.batches.lock() {
            Ok(mut batches) => batches.clear(),
            Err(e) => error!("Failed to lock result queue to clear it: {e}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PipelineParams {
    pub roi_timeout: Duration,
    pub full_frame_timeout: Duration,
    /// Run a whole-frame decode when ROI decoding yields fewer results.
    pub fallback_below: usize,
    /// How long the worker waits for a frame before re-checking the running flag.
    pub idle_wait: Duration,
    /// Completed batches kept until the render tick polls.
    pub result_backlog: usize,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            roi_timeout: Duration::from_millis(5),
            full_frame_timeout: Duration::from_millis(10),
            fallback_below: 2,
            idle_wait: Duration::from_millis(50),
            result_backlog: 8,
        }
    }
}

// Any decoder error discards the partial results of the cycle.
pub fn decode_cycle(
    decoder: &mut dyn SymbolDecoder,
    detector: &RoiDetector,
    gray: &GrayImage,
    params: &PipelineParams,
) -> Result<Vec<DecodeResult>, ScanError> {
    let mut results = Vec::new();

    for roi in detector.detect(gray) {
        let Some(region) = crop_region(gray, &roi.rect) else {
            continue;
        };
        let origin = Point::new(roi.rect.left(), roi.rect.top());
        for symbol in decoder.decode(&region, params.roi_timeout)? {
            results.push(DecodeResult::new(symbol, origin));
        }
    }

    if results.len() < params.fallback_below {
        for symbol in decoder.decode(gray, params.full_frame_timeout)? {
            results.push(DecodeResult::new(symbol, Point::new(0, 0)));
        }
    }

    Ok(results)
}

pub struct DecodeWorker<D> {
    decoder: D,
    detector: RoiDetector,
    params: PipelineParams,
    submit: Arc<NewestSlot<GrayImage>>,
    results: Arc<BatchQueue>,
}

impl<D: SymbolDecoder> DecodeWorker<D> {
    /// Returns `false` if no frame arrived within `idle_wait`.
    pub fn step(&mut self) -> bool {
        let Some(gray) = self.submit.wait_take(self.params.idle_wait) else {
            return false;
        };

        let decoder = &mut self.decoder;
        let detector = &self.detector;
        let params = &self.params;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            decode_cycle(decoder, detector, &gray, params)
        }))
        .unwrap_or_else(|_| Err(ScanError::Decode("decoder panicked".into())));

        match outcome {
            Ok(batch) if !batch.is_empty() => {
                trace!(count = batch.len(), "decode cycle produced results");
                self.results.push(batch);
            }
            Ok(_) => {}
            Err(e) => debug!("decode cycle discarded: {e}"),
        }
        true
    }

    fn run(mut self, running: Arc<AtomicBool>) {
        while running.load(Ordering::Relaxed) {
            self.step();
        }
    }
}

pub struct DecodePipeline {
    submit: Arc<NewestSlot<GrayImage>>,
    results: Arc<BatchQueue>,
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl DecodePipeline {
    /// Build the slots and worker without starting a thread.
    pub fn worker<D: SymbolDecoder>(
        decoder: D,
        detector: RoiDetector,
        params: PipelineParams,
    ) -> (Self, DecodeWorker<D>) {
        let submit = Arc::new(NewestSlot::new());
        let results = Arc::new(BatchQueue::new(params.result_backlog));
        let worker = DecodeWorker {
            decoder,
            detector,
            params,
            submit: submit.clone(),
            results: results.clone(),
        };
        let pipeline = Self {
            submit,
            results,
            running: Arc::new(AtomicBool::new(true)),
            handle: None,
        };
        (pipeline, worker)
    }

    pub fn spawn<D: SymbolDecoder + 'static>(
        decoder: D,
        detector: RoiDetector,
        params: PipelineParams,
        running: Arc<AtomicBool>,
    ) -> std::io::Result<Self> {
        let (mut pipeline, worker) = Self::worker(decoder, detector, params);
        pipeline.running = running.clone();
        let handle = thread::Builder::new()
            .name("dmscan-decode".into())
            .spawn(move || worker.run(running))?;
        pipeline.handle = Some(handle);
        Ok(pipeline)
    }

    /// Hand a frame to the worker, evicting any frame it has not started on.
    pub fn submit(&self, gray: GrayImage) {
        if self.submit.put(gray) {
            trace!("replaced undelivered frame");
        }
    }

    /// Results of every batch completed since the last poll, oldest first.
    pub fn poll(&self) -> Option<Vec<DecodeResult>> {
        let results = self.results.take_all();
        (!results.is_empty()).then_some(results)
    }

    pub fn drain(&self) {
        self.submit.clear();
        self.results.clear();
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        self.drain();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("decode thread panicked");
            }
        }
    }
}

impl Drop for DecodePipeline {
    fn drop(&mut self) {
        self.stop();
    }
}
