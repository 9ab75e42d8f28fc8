use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};

use facemood_core::capture::domain::camera_device::{
    CameraDevice, DeviceError, MediaStream, MediaTrack,
};
use facemood_core::detection::domain::detection_result::DetectionResult;
use facemood_core::detection::domain::expression::ExpressionScores;
use facemood_core::detection::domain::expression_detector::{ExpressionDetector, InferenceError};
use facemood_core::scheduler::detection_scheduler::SharedDetector;
use facemood_core::session::session_controller::SessionController;
use facemood_core::session::session_event::SessionEvent;
use facemood_core::session::session_state::SessionState;
use facemood_core::shared::bounding_box::BoundingBox;
use facemood_core::shared::frame::Frame;
use facemood_core::shared::settings::SessionSettings;

const TIMEOUT: Duration = Duration::from_secs(5);

type Outcome = Result<Vec<DetectionResult>, InferenceError>;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// --- fake camera ---

struct FakeTrack {
    live: Arc<AtomicBool>,
}

impl MediaTrack for FakeTrack {
    fn stop(&mut self) {
        self.live.store(false, Ordering::SeqCst);
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

struct FakeStream {
    tracks: Vec<Box<dyn MediaTrack>>,
    index: u64,
}

impl MediaStream for FakeStream {
    fn tracks(&self) -> &[Box<dyn MediaTrack>] {
        &self.tracks
    }

    fn tracks_mut(&mut self) -> &mut [Box<dyn MediaTrack>] {
        &mut self.tracks
    }

    fn current_frame(&mut self) -> Option<Frame> {
        self.index += 1;
        Some(Frame::solid(640, 480, [30, 30, 30], self.index))
    }
}

/// Remembers every track it ever handed out.
#[derive(Clone)]
struct FakeCamera {
    tracks_per_stream: usize,
    opens: Arc<AtomicUsize>,
    tracks: Arc<Mutex<Vec<Arc<AtomicBool>>>>,
}

impl FakeCamera {
    fn new(tracks_per_stream: usize) -> Self {
        Self {
            tracks_per_stream,
            opens: Arc::new(AtomicUsize::new(0)),
            tracks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    fn live_tracks(&self) -> usize {
        self.tracks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.load(Ordering::SeqCst))
            .count()
    }

    fn stopped_tracks(&self) -> usize {
        let total = self.tracks.lock().unwrap().len();
        total - self.live_tracks()
    }
}

impl CameraDevice for FakeCamera {
    fn open_stream(&mut self) -> Result<Box<dyn MediaStream>, DeviceError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let mut tracks: Vec<Box<dyn MediaTrack>> = Vec::new();
        for _ in 0..self.tracks_per_stream {
            let live = Arc::new(AtomicBool::new(true));
            self.tracks.lock().unwrap().push(live.clone());
            tracks.push(Box::new(FakeTrack { live }));
        }
        Ok(Box::new(FakeStream { tracks, index: 0 }))
    }
}

// --- detectors ---

/// Waits for the test to supply each call's outcome.
struct ScriptedDetector {
    entered: Sender<u64>,
    outcomes: Receiver<Outcome>,
}

impl ExpressionDetector for ScriptedDetector {
    fn detect(&mut self, frame: &Frame) -> Outcome {
        let _ = self.entered.send(frame.index());
        self.outcomes.recv().unwrap_or_else(|_| Ok(Vec::new()))
    }
}

/// Takes a while per call and records the peak number of concurrent calls.
struct SlowDetector {
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
}

impl ExpressionDetector for SlowDetector {
    fn detect(&mut self, _frame: &Frame) -> Outcome {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(15));
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

fn face(x: f64, y: f64, pairs: &[(&str, f64)]) -> DetectionResult {
    DetectionResult::new(
        BoundingBox::new(x, y, 80.0, 80.0),
        pairs.iter().map(|&(l, s)| (l, s)).collect::<ExpressionScores>(),
    )
}

/// A session driven by manual ticks and a scripted detector.
struct Rig {
    session: SessionController,
    camera: FakeCamera,
    ticks: Sender<Instant>,
    events: Receiver<SessionEvent>,
    entered: Receiver<u64>,
    outcomes: Sender<Outcome>,
}

impl Rig {
    fn new() -> Self {
        init_logging();
        let camera = FakeCamera::new(1);
        let (entered_tx, entered_rx) = crossbeam_channel::unbounded();
        let (outcome_tx, outcome_rx) = crossbeam_channel::unbounded();
        let detector: SharedDetector = Arc::new(Mutex::new(Box::new(ScriptedDetector {
            entered: entered_tx,
            outcomes: outcome_rx,
        })));
        let (tick_tx, tick_rx) = crossbeam_channel::unbounded::<Instant>();

        let session = SessionController::new(
            Box::new(camera.clone()),
            detector,
            SessionSettings::default(),
        )
        .unwrap()
        .with_tick_source(Box::new(move |_| tick_rx.clone()));
        let events = session.events();

        Self {
            session,
            camera,
            ticks: tick_tx,
            events,
            entered: entered_rx,
            outcomes: outcome_tx,
        }
    }

    /// Dispatches one inference call and blocks until the detector has it.
    fn dispatch(&self) {
        self.ticks.send(Instant::now()).unwrap();
        self.entered
            .recv_timeout(TIMEOUT)
            .expect("inference was not dispatched");
    }

    /// Runs one full pass and returns the number of faces drawn.
    fn pass(&self, detections: Vec<DetectionResult>) -> usize {
        self.dispatch();
        self.outcomes.send(Ok(detections)).unwrap();
        self.wait_rendered()
    }

    fn wait_rendered(&self) -> usize {
        let deadline = Instant::now() + TIMEOUT;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.events.recv_timeout(remaining) {
                Ok(SessionEvent::PassRendered { faces }) => return faces,
                Ok(_) => continue,
                Err(_) => panic!("no pass was rendered"),
            }
        }
    }

    fn label(&self) -> Option<String> {
        self.session.current_expression().map(|d| d.label)
    }
}

#[test]
fn test_at_most_one_inference_in_flight() {
    init_logging();
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let calls = Arc::new(AtomicUsize::new(0));
    let detector: SharedDetector = Arc::new(Mutex::new(Box::new(SlowDetector {
        active: active.clone(),
        peak: peak.clone(),
        calls: calls.clone(),
    })));
    let settings = SessionSettings {
        poll_interval_ms: 2,
        ..SessionSettings::default()
    };
    let mut session =
        SessionController::new(Box::new(FakeCamera::new(1)), detector, settings).unwrap();

    session.start().unwrap();
    thread::sleep(Duration::from_millis(150));
    let stats = session.stats();
    // restart while a call may still be running on the old worker
    session.stop();
    session.start().unwrap();
    thread::sleep(Duration::from_millis(100));
    session.stop();

    assert_eq!(peak.load(Ordering::SeqCst), 1);
    assert!(calls.load(Ordering::SeqCst) >= 2);
    assert!(stats.busy_skips > 0);
    assert!(stats.dispatched <= stats.ticks);
}

#[test]
fn test_no_track_live_after_any_stop() {
    init_logging();
    let camera = FakeCamera::new(2);
    let detector: SharedDetector = Arc::new(Mutex::new(Box::new(SlowDetector {
        active: Arc::new(AtomicUsize::new(0)),
        peak: Arc::new(AtomicUsize::new(0)),
        calls: Arc::new(AtomicUsize::new(0)),
    })));
    let mut session =
        SessionController::new(Box::new(camera.clone()), detector, SessionSettings::default())
            .unwrap();

    for cycle in 1..=3 {
        session.start().unwrap();
        assert_eq!(camera.live_tracks(), 2);
        session.stop();

        assert_eq!(camera.live_tracks(), 0, "cycle {cycle}");
        assert_eq!(camera.stopped_tracks(), cycle * 2);
        assert_eq!(session.frame_source().lock().unwrap().active_track_count(), 0);
    }
}

#[test]
fn test_first_face_determines_expression() {
    let mut rig = Rig::new();
    rig.session.start().unwrap();

    let faces = rig.pass(vec![
        face(10.0, 30.0, &[("happy", 0.9), ("sad", 0.1)]),
        face(300.0, 200.0, &[("angry", 0.99)]),
    ]);

    assert_eq!(faces, 2);
    assert_eq!(rig.label().as_deref(), Some("happy"));
}

#[test]
fn test_tied_scores_resolve_to_neutral() {
    let mut rig = Rig::new();
    rig.session.start().unwrap();

    rig.pass(vec![face(10.0, 30.0, &[("neutral", 0.5), ("happy", 0.5)])]);

    assert_eq!(rig.label().as_deref(), Some("neutral"));
}

#[test]
fn test_empty_pass_keeps_previous_expression() {
    let mut rig = Rig::new();
    rig.session.start().unwrap();

    rig.pass(vec![face(10.0, 30.0, &[("happy", 0.8)])]);
    let faces = rig.pass(Vec::new());

    assert_eq!(faces, 0);
    assert_eq!(rig.label().as_deref(), Some("happy"));
}

#[test]
fn test_empty_pass_clears_overlay() {
    let mut rig = Rig::new();
    rig.session.start().unwrap();
    let target = rig.session.render_target();

    rig.pass(vec![
        face(10.0, 30.0, &[("happy", 0.8)]),
        face(300.0, 200.0, &[("sad", 0.7)]),
    ]);
    assert_eq!(target.lock().unwrap().annotations().len(), 2);

    rig.pass(Vec::new());

    let target = target.lock().unwrap();
    assert!(target.annotations().is_empty());
    assert!(target.is_blank());
}

#[test]
fn test_two_toggles_start_and_stop_camera_once() {
    let mut rig = Rig::new();

    assert_eq!(rig.session.toggle().unwrap(), SessionState::Running);
    assert_eq!(rig.session.toggle().unwrap(), SessionState::Stopped);

    assert_eq!(rig.camera.opens(), 1);
    assert_eq!(rig.camera.stopped_tracks(), 1);
    assert_eq!(rig.camera.live_tracks(), 0);
}

#[test]
fn test_completion_after_stop_changes_nothing() {
    let mut rig = Rig::new();
    rig.session.start().unwrap();
    rig.pass(vec![face(10.0, 30.0, &[("happy", 0.8)])]);
    let target = rig.session.render_target();
    let before = target.lock().unwrap().to_rgba_image();

    rig.dispatch();
    rig.session.stop();
    rig.outcomes
        .send(Ok(vec![
            face(100.0, 100.0, &[("angry", 0.95)]),
            face(300.0, 300.0, &[("sad", 0.9)]),
        ]))
        .unwrap();
    thread::sleep(Duration::from_millis(50));

    assert_eq!(rig.label().as_deref(), Some("happy"));
    let target = target.lock().unwrap();
    assert_eq!(target.annotations().len(), 1);
    assert_eq!(target.to_rgba_image(), before);
    assert!(!rig
        .events
        .try_iter()
        .any(|e| matches!(e, SessionEvent::PassRendered { .. })));
}

#[test]
fn test_new_session_starts_without_expression() {
    let mut rig = Rig::new();
    rig.session.start().unwrap();
    rig.pass(vec![face(10.0, 30.0, &[("surprised", 0.8)])]);
    rig.session.stop();
    assert_eq!(rig.label().as_deref(), Some("surprised"));

    rig.session.start().unwrap();

    assert!(rig.label().is_none());
    assert!(rig.session.render_target().lock().unwrap().is_blank());
}

#[test]
fn test_failed_inference_keeps_session_running() {
    let mut rig = Rig::new();
    rig.session.start().unwrap();

    rig.dispatch();
    rig.outcomes
        .send(Err(InferenceError::ModelNotLoaded))
        .unwrap();
    let failed = rig
        .events
        .iter()
        .find(|e| matches!(e, SessionEvent::TickFailed(_)));
    assert!(failed.is_some());

    let faces = rig.pass(vec![face(10.0, 30.0, &[("happy", 0.8)])]);

    assert_eq!(faces, 1);
    assert!(rig.session.is_running());
    assert_eq!(rig.session.stats().failures, 1);
}
