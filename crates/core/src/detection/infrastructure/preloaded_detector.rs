use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crate::detection::domain::detection_result::DetectionResult;
use crate::detection::domain::expression_detector::{ExpressionDetector, InferenceError};
use crate::shared::frame::Frame;

/// Builds the real detector, typically after resolving model files.
pub type DetectorLoader =
    Box<dyn FnOnce() -> Result<Box<dyn ExpressionDetector>, String> + Send + 'static>;

type LoadResult = Result<Box<dyn ExpressionDetector>, String>;

/// Decorator that loads its inner detector once, in the background.
///
/// Loading starts at construction. Until it finishes, and forever if it
/// fails, `detect` reports `ModelNotLoaded` so the scheduler simply retries
/// on its next tick.
pub struct PreloadedDetector {
    slot: Arc<LoadSlot>,
    loaded: Option<Box<dyn ExpressionDetector>>,
    failure_logged: bool,
}

struct LoadSlot {
    result: Mutex<Option<LoadResult>>,
    ready: Condvar,
}

impl PreloadedDetector {
    pub fn spawn(loader: DetectorLoader) -> Self {
        let slot = Arc::new(LoadSlot {
            result: Mutex::new(None),
            ready: Condvar::new(),
        });

        let thread_slot = slot.clone();
        thread::spawn(move || {
            let result = loader();
            match &result {
                Ok(_) => log::info!("Models loaded successfully"),
                Err(e) => log::error!("Error loading models: {e}"),
            }
            *thread_slot
                .result
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(result);
            thread_slot.ready.notify_all();
        });

        Self {
            slot,
            loaded: None,
            failure_logged: false,
        }
    }

    /// Blocks until loading has finished or `timeout` elapses.
    pub fn wait_until_loaded(&mut self, timeout: Duration) -> Result<(), InferenceError> {
        if self.loaded.is_some() {
            return Ok(());
        }
        let deadline = Instant::now() + timeout;
        let mut guard = self
            .slot
            .result
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while guard.is_none() {
            let now = Instant::now();
            if now >= deadline {
                return Err(InferenceError::ModelNotLoaded);
            }
            let (next, _) = self
                .slot
                .ready
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            guard = next;
        }
        drop(guard);
        self.take_loaded()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    /// Moves a successfully loaded detector out of the shared slot.
    fn take_loaded(&mut self) -> Result<(), InferenceError> {
        if self.loaded.is_some() {
            return Ok(());
        }
        let mut guard = self
            .slot
            .result
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match guard.take() {
            Some(Ok(detector)) => {
                self.loaded = Some(detector);
                Ok(())
            }
            Some(Err(e)) => {
                if !self.failure_logged {
                    log::warn!("Detection unavailable, model load failed: {e}");
                    self.failure_logged = true;
                }
                *guard = Some(Err(e));
                Err(InferenceError::ModelNotLoaded)
            }
            None => Err(InferenceError::ModelNotLoaded),
        }
    }
}

impl ExpressionDetector for PreloadedDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectionResult>, InferenceError> {
        self.take_loaded()?;
        match self.loaded.as_mut() {
            Some(detector) => detector.detect(frame),
            None => Err(InferenceError::ModelNotLoaded),
        }
    }
}
