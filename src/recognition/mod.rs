//! Text recognition boundary
//!
//! The pipeline only knows [`TextRecognizer`]; the OCR engine behind it is
//! chosen once when the pipeline is built.

pub mod extract;
pub mod ocr;

use image::DynamicImage;
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::RecognizeError;

pub use extract::{CODE_WIDTH, ExtractedNumber, extract_code, extract_number};
pub use ocr::OcrsRecognizer;

/// One piece of recognized text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextSpan {
    pub text: String,
    /// Confidence score (0.0 - 1.0)
    pub confidence: f32,
}

impl TextSpan {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// Turns a prepared region into zero or more text spans
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, region: &DynamicImage) -> Result<Vec<TextSpan>, RecognizeError>;
}

/// Returns the same spans for every region
#[derive(Debug, Clone, Default)]
pub struct StaticRecognizer {
    spans: Vec<TextSpan>,
}

impl StaticRecognizer {
    pub fn new(spans: Vec<TextSpan>) -> Self {
        Self { spans }
    }

    /// A single span of `text`
    pub fn text(text: impl Into<String>, confidence: f32) -> Self {
        Self::new(vec![TextSpan::new(text, confidence)])
    }
}

impl TextRecognizer for StaticRecognizer {
    fn recognize(&self, _region: &DynamicImage) -> Result<Vec<TextSpan>, RecognizeError> {
        Ok(self.spans.clone())
    }
}

/// Bounds every call of an inner recognizer.
///
/// Calls are handed to one long-lived worker thread, one region at a time.
/// When the deadline passes the caller gets [`RecognizeError::Timeout`] and
/// the worker keeps going; until it is done, further calls fail at once with
/// [`RecognizeError::Busy`]. At most one engine call is ever in flight.
pub struct TimeoutRecognizer {
    inner: Arc<dyn TextRecognizer>,
    timeout: Duration,
    in_flight: Arc<AtomicBool>,
    jobs: Mutex<Option<SyncSender<Job>>>,
}

struct Job {
    region: DynamicImage,
    reply: mpsc::Sender<Result<Vec<TextSpan>, RecognizeError>>,
}

impl TimeoutRecognizer {
    pub fn new(inner: Arc<dyn TextRecognizer>, timeout: Duration) -> Self {
        Self {
            inner,
            timeout,
            in_flight: Arc::new(AtomicBool::new(false)),
            jobs: Mutex::new(None),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether the engine is still working on an earlier region
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn submit(&self, job: Job) -> Result<(), RecognizeError> {
        let mut jobs = self.jobs.lock().map_err(|_| RecognizeError::WorkerLost)?;

        if jobs.is_none() {
            let (sender, receiver) = mpsc::sync_channel(1);
            let inner = Arc::clone(&self.inner);
            let in_flight = Arc::clone(&self.in_flight);
            thread::Builder::new()
                .name("numtag-recognizer".to_string())
                .spawn(move || run_worker(inner, receiver, in_flight))
                .map_err(|e| RecognizeError::Engine(e.into()))?;
            *jobs = Some(sender);
        }

        let Some(sender) = jobs.as_ref() else {
            return Err(RecognizeError::WorkerLost);
        };
        match sender.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(RecognizeError::Busy),
            Err(TrySendError::Disconnected(_)) => {
                // Start a fresh worker on the next call
                *jobs = None;
                Err(RecognizeError::WorkerLost)
            }
        }
    }
}

impl TextRecognizer for TimeoutRecognizer {
    fn recognize(&self, region: &DynamicImage) -> Result<Vec<TextSpan>, RecognizeError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(RecognizeError::Busy);
        }

        let (reply, response) = mpsc::channel();
        let job = Job {
            region: region.clone(),
            reply,
        };
        if let Err(e) = self.submit(job) {
            self.in_flight.store(false, Ordering::Release);
            return Err(e);
        }

        match response.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(RecognizeError::Timeout(self.timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(RecognizeError::WorkerLost),
        }
    }
}

fn run_worker(
    inner: Arc<dyn TextRecognizer>,
    receiver: mpsc::Receiver<Job>,
    in_flight: Arc<AtomicBool>,
) {
    while let Ok(job) = receiver.recv() {
        let result = panic::catch_unwind(AssertUnwindSafe(|| inner.recognize(&job.region)));
        in_flight.store(false, Ordering::Release);
        match result {
            // The caller may have timed out and dropped its receiver
            Ok(result) => {
                let _ = job.reply.send(result);
            }
            Err(_) => warn!("Recognition engine panicked, region dropped"),
        }
    }
    debug!("Recognition worker finished");
}
