use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use thiserror::Error;

use crate::capture::domain::camera_device::{CameraDevice, DeviceError};
use crate::capture::frame_source::FrameSource;
use crate::detection::domain::expression_aggregator::DominantExpression;
use crate::overlay::render_target::RenderTarget;
use crate::scheduler::detection_scheduler::{
    DetectionScheduler, SchedulerHandles, SchedulerStats, SharedDetector,
};
use crate::scheduler::tick_logger::{LogTickLogger, TickLogger};
use crate::session::expression_cell::ExpressionCell;
use crate::session::session_event::SessionEvent;
use crate::session::session_state::SessionState;
use crate::shared::settings::{SessionSettings, SettingsError};

const EVENT_CAPACITY: usize = 256;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("camera unavailable: {0}")]
    DeviceUnavailable(#[source] DeviceError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Produces the tick channel for a new session from the poll interval.
pub type TickSource = Box<dyn FnMut(Duration) -> Receiver<Instant> + Send>;

/// Builds the per-session scheduler logger.
pub type TickLoggerFactory = Box<dyn Fn() -> Box<dyn TickLogger> + Send>;

/// Owns the camera feed and, while running, its detection scheduler.
///
/// The UI toggles the session and observes the current expression, the
/// overlay surface, and the event stream. Dropping the controller stops the
/// session and releases the camera.
pub struct SessionController {
    settings: SessionSettings,
    frame_source: Arc<Mutex<FrameSource>>,
    detector: SharedDetector,
    render_target: Arc<Mutex<RenderTarget>>,
    expression: ExpressionCell,
    state: SessionState,
    scheduler: Option<DetectionScheduler>,
    last_stats: SchedulerStats,
    tick_source: TickSource,
    logger_factory: TickLoggerFactory,
    events_tx: Sender<SessionEvent>,
    events_rx: Receiver<SessionEvent>,
}

impl SessionController {
    pub fn new(
        camera: Box<dyn CameraDevice>,
        detector: SharedDetector,
        settings: SessionSettings,
    ) -> Result<Self, SessionError> {
        settings.validate()?;
        let (width, height) = (settings.display_width, settings.display_height);
        let (events_tx, events_rx) = crossbeam_channel::bounded(EVENT_CAPACITY);

        Ok(Self {
            frame_source: Arc::new(Mutex::new(FrameSource::with_display_size(
                camera, width, height,
            ))),
            detector,
            render_target: Arc::new(Mutex::new(RenderTarget::new(width, height))),
            expression: ExpressionCell::new(),
            state: SessionState::Stopped,
            scheduler: None,
            last_stats: SchedulerStats::default(),
            tick_source: Box::new(crossbeam_channel::tick),
            logger_factory: Box::new(|| -> Box<dyn TickLogger> {
                Box::new(LogTickLogger::new())
            }),
            events_tx,
            events_rx,
            settings,
        })
    }

    /// Replaces the wall-clock ticker, e.g. with a manually driven channel.
    pub fn with_tick_source(mut self, tick_source: TickSource) -> Self {
        self.tick_source = tick_source;
        self
    }

    pub fn with_logger_factory(mut self, factory: TickLoggerFactory) -> Self {
        self.logger_factory = factory;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Starts a stopped session or stops a running one, returning the new
    /// state.
    pub fn toggle(&mut self) -> Result<SessionState, SessionError> {
        match self.state {
            SessionState::Running => self.stop(),
            _ => self.start()?,
        }
        Ok(self.state)
    }

    /// Acquires the camera and starts detection. No-op while running.
    ///
    /// If the camera cannot be opened the session stays stopped.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Stopped {
            return Ok(());
        }
        self.set_state(SessionState::Starting);

        let started = self.lock_frame_source().start();
        if let Err(e) = started {
            self.set_state(SessionState::Stopped);
            return Err(SessionError::DeviceUnavailable(e));
        }

        self.expression.clear();
        self.render_target
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();

        let ticks = (self.tick_source)(self.settings.poll_interval());
        let handles = SchedulerHandles {
            frame_source: self.frame_source.clone(),
            detector: self.detector.clone(),
            render_target: self.render_target.clone(),
            expression: self.expression.clone(),
            events: self.events_tx.clone(),
        };
        self.scheduler = Some(DetectionScheduler::spawn(
            &self.settings,
            handles,
            ticks,
            (self.logger_factory)(),
        ));
        self.set_state(SessionState::Running);
        Ok(())
    }

    /// Stops detection, then releases the camera. No-op while stopped.
    pub fn stop(&mut self) {
        if self.state != SessionState::Running {
            return;
        }
        self.set_state(SessionState::Stopping);

        if let Some(mut scheduler) = self.scheduler.take() {
            scheduler.stop();
            self.last_stats = scheduler.stats();
        }
        self.lock_frame_source().stop();

        self.set_state(SessionState::Stopped);
    }

    pub fn current_expression(&self) -> Option<DominantExpression> {
        self.expression.get()
    }

    /// A cloneable handle on the current expression, for UI threads.
    pub fn expression_cell(&self) -> ExpressionCell {
        self.expression.clone()
    }

    pub fn render_target(&self) -> Arc<Mutex<RenderTarget>> {
        self.render_target.clone()
    }

    pub fn frame_source(&self) -> Arc<Mutex<FrameSource>> {
        self.frame_source.clone()
    }

    pub fn events(&self) -> Receiver<SessionEvent> {
        self.events_rx.clone()
    }

    /// Updates the display size the overlay is drawn at. Takes effect on
    /// the next pass.
    pub fn set_display_size(&mut self, width: u32, height: u32) {
        self.lock_frame_source().set_display_size(width, height);
    }

    /// Statistics of the running scheduler, or of the last one if stopped.
    pub fn stats(&self) -> SchedulerStats {
        self.scheduler
            .as_ref()
            .map_or(self.last_stats, DetectionScheduler::stats)
    }

    fn set_state(&mut self, state: SessionState) {
        log::debug!("Session {} -> {}", self.state, state);
        self.state = state;
        let _ = self.events_tx.try_send(SessionEvent::StateChanged(state));
    }

    fn lock_frame_source(&self) -> MutexGuard<'_, FrameSource> {
        self.frame_source
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.stop();
    }
}
