use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::capture::frame_source::FrameSource;
use crate::detection::domain::detection_result::DetectionResult;
use crate::detection::domain::expression_aggregator::ExpressionAggregator;
use crate::detection::domain::expression_detector::{ExpressionDetector, InferenceError};
use crate::overlay::overlay_renderer::OverlayRenderer;
use crate::overlay::render_target::RenderTarget;
use crate::scheduler::tick_logger::TickLogger;
use crate::session::expression_cell::ExpressionCell;
use crate::session::session_event::SessionEvent;
use crate::shared::frame::Frame;
use crate::shared::settings::SessionSettings;

/// Detector shared by every session of a controller. Only the inference
/// worker of the running session locks it.
pub type SharedDetector = Arc<Mutex<Box<dyn ExpressionDetector>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The stream has no decodable frame yet.
    NoFrame,
    /// The previous inference call has not completed.
    Busy,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoFrame => f.write_str("no frame available"),
            SkipReason::Busy => f.write_str("inference in flight"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulerState {
    #[default]
    Idle,
    Running,
    InFlight,
}

/// Counters over the lifetime of one scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerStats {
    pub ticks: u64,
    pub dispatched: u64,
    pub applied: u64,
    pub busy_skips: u64,
    pub no_frame_skips: u64,
    pub failures: u64,
    pub stale_completions: u64,
}

/// Shared state the scheduler reads frames from and publishes passes to.
pub struct SchedulerHandles {
    pub frame_source: Arc<Mutex<FrameSource>>,
    pub detector: SharedDetector,
    pub render_target: Arc<Mutex<RenderTarget>>,
    pub expression: ExpressionCell,
    pub events: Sender<SessionEvent>,
}

struct InferenceRequest {
    seq: u64,
    frame: Frame,
}

struct Completion {
    seq: u64,
    frame_size: (u32, u32),
    result: Result<Vec<DetectionResult>, InferenceError>,
    elapsed: Duration,
}

/// Polls the frame source on every tick and keeps at most one inference
/// call in flight.
///
/// Layout: `ticker → scheduler [guard/dispatch/apply] ⇄ inference worker`
///
/// Ticks that arrive while a call is pending are dropped, not queued. Only
/// the scheduler thread touches the render target and the expression cell,
/// so passes are applied strictly one at a time and in dispatch order.
pub struct DetectionScheduler {
    live: Arc<AtomicBool>,
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
    state: Arc<Mutex<SchedulerState>>,
    stats: Arc<Mutex<SchedulerStats>>,
}

impl DetectionScheduler {
    /// Starts a scheduler driven by the settings' poll interval.
    pub fn with_interval(
        settings: &SessionSettings,
        handles: SchedulerHandles,
        logger: Box<dyn TickLogger>,
    ) -> Self {
        let ticks = crossbeam_channel::tick(settings.poll_interval());
        Self::spawn(settings, handles, ticks, logger)
    }

    /// Starts a scheduler driven by an arbitrary tick source.
    pub fn spawn(
        settings: &SessionSettings,
        handles: SchedulerHandles,
        ticks: Receiver<Instant>,
        logger: Box<dyn TickLogger>,
    ) -> Self {
        let live = Arc::new(AtomicBool::new(true));
        let state = Arc::new(Mutex::new(SchedulerState::Running));
        let stats = Arc::new(Mutex::new(SchedulerStats::default()));
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let (request_tx, request_rx) = crossbeam_channel::bounded::<InferenceRequest>(1);
        let (done_tx, done_rx) = crossbeam_channel::unbounded::<Completion>();

        spawn_inference_worker(handles.detector, request_rx, done_tx);

        let mut scheduler_loop = SchedulerLoop {
            frame_source: handles.frame_source,
            render_target: handles.render_target,
            expression: handles.expression,
            events: handles.events,
            renderer: OverlayRenderer::new(settings.overlay.clone()),
            aggregator: ExpressionAggregator::new(settings.empty_detections),
            min_detection_score: settings.min_detection_score,
            live: live.clone(),
            state: state.clone(),
            stats: stats.clone(),
            request_tx,
            in_flight: None,
            next_seq: 0,
            logger,
        };
        let handle = thread::spawn(move || scheduler_loop.run(ticks, done_rx, stop_rx));

        Self {
            live,
            stop_tx,
            handle: Some(handle),
            state,
            stats,
        }
    }

    /// Cancels the ticker and joins the scheduler thread.
    ///
    /// A call still running on the inference worker is abandoned: its
    /// result is never applied. Calling `stop` again is a no-op.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.live.store(false, Ordering::SeqCst);
        let _ = self.stop_tx.send(());
        if handle.join().is_err() {
            log::error!("Detection scheduler thread panicked");
        }
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = SchedulerState::Idle;
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn stats(&self) -> SchedulerStats {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for DetectionScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_inference_worker(
    detector: SharedDetector,
    request_rx: Receiver<InferenceRequest>,
    done_tx: Sender<Completion>,
) {
    thread::spawn(move || {
        for request in request_rx {
            let started = Instant::now();
            let frame_size = (request.frame.width(), request.frame.height());
            let result = detector
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .detect(&request.frame);
            let completion = Completion {
                seq: request.seq,
                frame_size,
                result,
                elapsed: started.elapsed(),
            };
            // Scheduler gone: the session stopped while we were busy.
            if done_tx.send(completion).is_err() {
                break;
            }
        }
    });
}

enum Wake {
    Stop,
    Tick,
    TicksClosed,
    Completed(Completion),
    WorkerGone,
}

struct SchedulerLoop {
    frame_source: Arc<Mutex<FrameSource>>,
    render_target: Arc<Mutex<RenderTarget>>,
    expression: ExpressionCell,
    events: Sender<SessionEvent>,
    renderer: OverlayRenderer,
    aggregator: ExpressionAggregator,
    min_detection_score: f64,
    live: Arc<AtomicBool>,
    state: Arc<Mutex<SchedulerState>>,
    stats: Arc<Mutex<SchedulerStats>>,
    request_tx: Sender<InferenceRequest>,
    in_flight: Option<u64>,
    next_seq: u64,
    logger: Box<dyn TickLogger>,
}

impl SchedulerLoop {
    fn run(
        &mut self,
        mut ticks: Receiver<Instant>,
        mut done_rx: Receiver<Completion>,
        stop_rx: Receiver<()>,
    ) {
        self.logger.info("Detection started");
        loop {
            let wake = crossbeam_channel::select! {
                recv(stop_rx) -> _ => Wake::Stop,
                recv(ticks) -> tick => match tick {
                    Ok(_) => Wake::Tick,
                    Err(_) => Wake::TicksClosed,
                },
                recv(done_rx) -> done => match done {
                    Ok(completion) => Wake::Completed(completion),
                    Err(_) => Wake::WorkerGone,
                },
            };

            match wake {
                Wake::Stop => break,
                Wake::Tick => self.on_tick(),
                Wake::TicksClosed => ticks = crossbeam_channel::never(),
                Wake::Completed(completion) => self.on_completion(completion),
                Wake::WorkerGone => {
                    done_rx = crossbeam_channel::never();
                    self.on_worker_gone();
                }
            }
        }
        self.logger.info("Detection stopped");
        self.logger.summary();
    }

    fn on_tick(&mut self) {
        self.bump(|s| s.ticks += 1);

        if self.in_flight.is_some() {
            self.skip(SkipReason::Busy);
            return;
        }
        let frame = self
            .frame_source
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .current_frame();
        let Some(frame) = frame else {
            self.skip(SkipReason::NoFrame);
            return;
        };

        self.next_seq += 1;
        let seq = self.next_seq;
        match self.request_tx.try_send(InferenceRequest { seq, frame }) {
            Ok(()) => {
                self.in_flight = Some(seq);
                self.set_state(SchedulerState::InFlight);
                self.bump(|s| s.dispatched += 1);
            }
            Err(e) => {
                log::error!("Could not dispatch inference: {e}");
                self.fail("inference worker unavailable".to_string());
            }
        }
    }

    fn on_completion(&mut self, done: Completion) {
        if !self.live.load(Ordering::SeqCst) || self.in_flight != Some(done.seq) {
            log::debug!("Discarding stale inference result #{}", done.seq);
            self.bump(|s| s.stale_completions += 1);
            return;
        }
        self.in_flight = None;
        self.set_state(SchedulerState::Running);
        self.logger
            .timing("inference", done.elapsed.as_secs_f64() * 1000.0);

        let detections = match done.result {
            Ok(detections) => detections,
            Err(e) => {
                log::warn!("Inference failed: {e}");
                self.fail(e.to_string());
                return;
            }
        };
        let detections = DetectionResult::filter_by_score(detections, self.min_detection_score);

        let display_size = self
            .frame_source
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .display_size();
        let render_start = Instant::now();
        let faces = {
            let mut target = self
                .render_target
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            self.renderer
                .render(&mut target, display_size, done.frame_size, &detections)
        };
        self.logger
            .timing("render", render_start.elapsed().as_secs_f64() * 1000.0);
        self.logger.metric("faces", detections.len() as f64);

        let changed = self.aggregator.update(&detections);
        let current = self.aggregator.current().cloned();
        // score moves every pass even when the label holds
        self.expression.set(current.clone());
        if changed {
            self.emit(SessionEvent::ExpressionChanged(current));
        }
        self.bump(|s| s.applied += 1);
        self.emit(SessionEvent::PassRendered { faces });
    }

    fn on_worker_gone(&mut self) {
        log::error!("Inference worker exited");
        if self.in_flight.take().is_some() {
            self.set_state(SchedulerState::Running);
            self.fail("inference worker exited".to_string());
        }
    }

    fn skip(&mut self, reason: SkipReason) {
        self.bump(|s| match reason {
            SkipReason::Busy => s.busy_skips += 1,
            SkipReason::NoFrame => s.no_frame_skips += 1,
        });
        self.logger.tick_skipped(reason);
        self.emit(SessionEvent::TickSkipped(reason));
    }

    fn fail(&mut self, message: String) {
        self.bump(|s| s.failures += 1);
        self.emit(SessionEvent::TickFailed(message));
    }

    fn emit(&self, event: SessionEvent) {
        if let Err(TrySendError::Full(_)) = self.events.try_send(event) {
            log::trace!("Session event queue full, dropping event");
        }
    }

    fn set_state(&self, state: SchedulerState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn bump(&self, f: impl FnOnce(&mut SchedulerStats)) {
        f(&mut *self.stats.lock().unwrap_or_else(PoisonError::into_inner));
    }
}
