//! Fusion runtime tests on a paused tokio clock.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tokio_test::{assert_err, assert_ok};

use mindbell_engine::{
    AbsencePolicy, EngineConfig, EngineResult, FusionRuntime, PresentationFrame, ResponseRecorder,
};
use mindbell_gesture::{Edge, InputSource, RawSample};
use mindbell_models::{ChimeEvent, Outcome, SessionId};

type Recorded = (Outcome, Option<u32>);

/// Forwards every recorded outcome to the test.
struct ChannelRecorder {
    tx: mpsc::UnboundedSender<Recorded>,
}

#[async_trait]
impl ResponseRecorder for ChannelRecorder {
    async fn record(&self, outcome: Outcome, latency_ms: Option<u32>) -> EngineResult<ChimeEvent> {
        let _ = self.tx.send((outcome, latency_ms));
        Ok(ChimeEvent::new(SessionId::new(), outcome, latency_ms))
    }
}

fn spawn(config: EngineConfig) -> (FusionRuntime, mpsc::UnboundedReceiver<Recorded>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let runtime = FusionRuntime::spawn(config, Arc::new(ChannelRecorder { tx }));
    (runtime, rx)
}

fn short_timeout(secs: u64) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.window.response_timeout = Duration::from_secs(secs);
    config
}

const FRAME: Duration = Duration::from_millis(33);

async fn feed(runtime: &FusionRuntime, source: InputSource, sample: RawSample, frames: u32) {
    let sender = runtime.sample_sender(source);
    for _ in 0..frames {
        sender.send(sample).await.expect("runtime stopped");
        sleep(FRAME).await;
    }
}

async fn feed_both(runtime: &FusionRuntime, head: RawSample, pointer: RawSample, frames: u32) {
    let head_tx = runtime.sample_sender(InputSource::Head);
    let pointer_tx = runtime.sample_sender(InputSource::Pointer);
    for _ in 0..frames {
        head_tx.send(head).await.expect("runtime stopped");
        pointer_tx.send(pointer).await.expect("runtime stopped");
        sleep(FRAME).await;
    }
}

async fn next_outcome(rx: &mut mpsc::UnboundedReceiver<Recorded>) -> Recorded {
    timeout(Duration::from_secs(30), rx.recv())
        .await
        .expect("no outcome recorded")
        .expect("recorder dropped")
}

async fn assert_no_outcome(rx: &mut mpsc::UnboundedReceiver<Recorded>) {
    assert_err!(timeout(Duration::from_secs(2), rx.recv()).await);
}

fn neutral_head() -> RawSample {
    RawSample::head(0.0, 0.0, true)
}

/// A held head tilt resolves the window as present with its latency.
#[tokio::test(start_paused = true)]
async fn test_head_tilt_records_present() {
    let (runtime, mut rx) = spawn(EngineConfig::default());

    runtime.open_window().await.unwrap();
    feed(&runtime, InputSource::Head, neutral_head(), 10).await;
    feed(&runtime, InputSource::Head, RawSample::head(-0.3, 0.0, true), 20).await;

    let (outcome, latency) = next_outcome(&mut rx).await;
    assert_eq!(outcome, Outcome::Present);
    let latency = latency.expect("gesture responses carry a latency");
    assert!(latency > 300 && latency < 1_000, "latency {}", latency);

    assert_ok!(runtime.shutdown().await);
}

/// A head turn maps to the returned outcome.
#[tokio::test(start_paused = true)]
async fn test_head_turn_records_returned() {
    let (runtime, mut rx) = spawn(EngineConfig::default());

    runtime.open_window().await.unwrap();
    feed(&runtime, InputSource::Head, neutral_head(), 10).await;
    feed(&runtime, InputSource::Head, RawSample::head(0.0, 0.4, true), 20).await;

    assert_eq!(next_outcome(&mut rx).await.0, Outcome::Returned);
    assert_ok!(runtime.shutdown().await);
}

/// Each window yields one event, however many gestures follow.
#[tokio::test(start_paused = true)]
async fn test_exactly_one_event_per_window() {
    let (runtime, mut rx) = spawn(EngineConfig::default());
    let tilt = RawSample::head(-0.3, 0.0, true);

    runtime.open_window().await.unwrap();
    feed(&runtime, InputSource::Head, neutral_head(), 10).await;
    feed(&runtime, InputSource::Head, tilt, 20).await;
    assert_eq!(next_outcome(&mut rx).await.0, Outcome::Present);

    feed(&runtime, InputSource::Head, neutral_head(), 10).await;
    feed(&runtime, InputSource::Head, tilt, 20).await;
    runtime.close_window().await.unwrap();
    assert_no_outcome(&mut rx).await;

    runtime.open_window().await.unwrap();
    feed(&runtime, InputSource::Head, neutral_head(), 10).await;
    feed(&runtime, InputSource::Head, tilt, 20).await;
    assert_eq!(next_outcome(&mut rx).await.0, Outcome::Present);

    assert_ok!(runtime.shutdown().await);
}

/// Timeout with nobody in front of the sensors records absent by default.
#[tokio::test(start_paused = true)]
async fn test_timeout_without_subject_records_absent() {
    let (runtime, mut rx) = spawn(short_timeout(1));

    runtime.open_window().await.unwrap();
    feed(&runtime, InputSource::Head, RawSample::absent(), 45).await;

    assert_eq!(next_outcome(&mut rx).await, (Outcome::Absent, None));
    assert_ok!(runtime.shutdown().await);
}

/// The absence policy can fold absence into missed.
#[tokio::test(start_paused = true)]
async fn test_timeout_without_subject_counts_as_missed() {
    let mut config = short_timeout(1);
    config.window.absence_policy = AbsencePolicy::CountAsMissed;
    let (runtime, mut rx) = spawn(config);

    runtime.open_window().await.unwrap();
    feed(&runtime, InputSource::Head, RawSample::absent(), 45).await;

    assert_eq!(next_outcome(&mut rx).await, (Outcome::Missed, None));
    assert_ok!(runtime.shutdown().await);
}

/// A present subject that never gestures is missed.
#[tokio::test(start_paused = true)]
async fn test_timeout_with_subject_records_missed() {
    let (runtime, mut rx) = spawn(short_timeout(1));

    runtime.open_window().await.unwrap();
    feed(&runtime, InputSource::Head, RawSample::head(0.01, -0.01, true), 45).await;

    assert_eq!(next_outcome(&mut rx).await, (Outcome::Missed, None));
    assert_ok!(runtime.shutdown().await);
}

/// A gesture on the source the arbiter did not select never resolves
/// the window.
#[tokio::test(start_paused = true)]
async fn test_inactive_source_trigger_is_suppressed() {
    let (runtime, mut rx) = spawn(short_timeout(2));
    let pointer_neutral = RawSample::pointer(0.5, 0.5, true);
    let pointer_left = RawSample::pointer(0.02, 0.5, true);

    runtime.open_window().await.unwrap();
    feed_both(&runtime, neutral_head(), pointer_neutral, 10).await;
    feed_both(&runtime, neutral_head(), pointer_left, 60).await;

    assert_eq!(next_outcome(&mut rx).await, (Outcome::Missed, None));
    assert_ok!(runtime.shutdown().await);
}

/// With no face in view the pointer is selected and its gesture counts.
#[tokio::test(start_paused = true)]
async fn test_pointer_gesture_without_face_records_returned() {
    let (runtime, mut rx) = spawn(EngineConfig::default());
    let pointer_neutral = RawSample::pointer(0.5, 0.5, true);
    let pointer_left = RawSample::pointer(0.02, 0.5, true);

    runtime.open_window().await.unwrap();
    feed_both(&runtime, RawSample::absent(), pointer_neutral, 10).await;
    feed_both(&runtime, RawSample::absent(), pointer_left, 30).await;

    let (outcome, latency) = next_outcome(&mut rx).await;
    assert_eq!(outcome, Outcome::Returned);
    assert!(latency.is_some());

    assert_ok!(runtime.shutdown().await);
}

/// With the head source disabled the pointer drives the window alone.
#[tokio::test(start_paused = true)]
async fn test_pointer_edge_with_head_disabled() {
    let (runtime, mut rx) = spawn(EngineConfig::default());

    runtime.set_enabled(InputSource::Head, false).await.unwrap();
    runtime.open_window().await.unwrap();
    feed(&runtime, InputSource::Pointer, RawSample::pointer(0.5, 0.5, true), 10).await;
    feed(&runtime, InputSource::Pointer, RawSample::pointer(0.02, 0.5, true), 20).await;

    let (outcome, latency) = next_outcome(&mut rx).await;
    assert_eq!(outcome, Outcome::Returned);
    assert!(latency.is_some());
    assert!(!runtime.snapshot(InputSource::Head).active);

    assert_ok!(runtime.shutdown().await);
}

/// Closing early resolves the window once; a second close is a no-op.
#[tokio::test(start_paused = true)]
async fn test_close_window_early() {
    let (runtime, mut rx) = spawn(EngineConfig::default());

    runtime.open_window().await.unwrap();
    feed(&runtime, InputSource::Head, neutral_head(), 5).await;
    runtime.close_window().await.unwrap();
    assert_eq!(next_outcome(&mut rx).await, (Outcome::Missed, None));

    runtime.close_window().await.unwrap();
    assert_no_outcome(&mut rx).await;
    assert_ok!(runtime.shutdown().await);
}

/// A chime while a window is open does not start a second window.
#[tokio::test(start_paused = true)]
async fn test_duplicate_open_is_ignored() {
    let (runtime, mut rx) = spawn(short_timeout(1));

    runtime.open_window().await.unwrap();
    runtime.open_window().await.unwrap();
    feed(&runtime, InputSource::Head, neutral_head(), 45).await;

    assert_eq!(next_outcome(&mut rx).await.0, Outcome::Missed);
    assert_no_outcome(&mut rx).await;
    assert_ok!(runtime.shutdown().await);
}

/// Shutdown resolves a window that is still open.
#[tokio::test(start_paused = true)]
async fn test_shutdown_closes_open_window() {
    let (runtime, mut rx) = spawn(EngineConfig::default());

    runtime.open_window().await.unwrap();
    sleep(Duration::from_millis(100)).await;
    assert_ok!(runtime.shutdown().await);

    assert_eq!(rx.try_recv().unwrap(), (Outcome::Absent, None));
}

/// `offer` never waits: samples beyond the channel capacity are dropped.
#[tokio::test(start_paused = true)]
async fn test_offer_drops_samples_when_full() {
    let mut config = EngineConfig::default();
    config.sample_channel_capacity = 4;
    let (runtime, _rx) = spawn(config);

    let sender = runtime.sample_sender(InputSource::Head);
    let accepted = (0..10).filter(|_| sender.offer(neutral_head())).count();
    assert_eq!(accepted, 4);

    assert_ok!(runtime.shutdown().await);
}

/// Pipeline snapshots are published as samples arrive.
#[tokio::test(start_paused = true)]
async fn test_snapshots_are_published() {
    let (runtime, _rx) = spawn(EngineConfig::default());
    let mut updates = runtime.subscribe(InputSource::Head);

    runtime.open_window().await.unwrap();
    feed(&runtime, InputSource::Head, neutral_head(), 8).await;

    assert!(updates.has_changed().unwrap());
    let snapshot = *updates.borrow_and_update();
    assert!(snapshot.active);
    assert!(snapshot.baseline_set);
    assert!(snapshot.subject_seen);

    runtime.close_window().await.unwrap();
    sleep(FRAME).await;
    assert!(!runtime.snapshot(InputSource::Head).active);

    assert_ok!(runtime.shutdown().await);
}

/// Presentation frames follow the active source and carry the trigger.
#[tokio::test(start_paused = true)]
async fn test_presentation_frames() {
    let (mut runtime, _rx) = spawn(EngineConfig::default());
    let mut presentation = runtime.take_presentation().expect("first take");
    assert!(runtime.take_presentation().is_none());

    let head = runtime.sample_sender(InputSource::Head);
    let mut frames: Vec<PresentationFrame> = Vec::new();
    runtime.open_window().await.unwrap();
    for index in 0..30 {
        let pitch = if index < 10 { 0.0 } else { -0.3 };
        head.send(RawSample::head(pitch, 0.0, true)).await.unwrap();
        sleep(FRAME).await;
        while let Ok(frame) = presentation.try_recv() {
            frames.push(frame);
        }
    }

    assert!(frames.iter().any(|frame| frame.window_open));
    assert!(frames
        .iter()
        .any(|frame| frame.active_source == Some(InputSource::Head)));
    assert!(frames
        .iter()
        .any(|frame| frame.trigger_edge == Some(Edge::Top)));
    assert!(frames.windows(2).all(|pair| pair[0].time <= pair[1].time));

    assert_ok!(runtime.shutdown().await);
}

/// New settings take effect without restarting the runtime.
#[tokio::test(start_paused = true)]
async fn test_config_reload() {
    let config = short_timeout(1);
    let mut gesture = config.gesture.clone();
    let (runtime, mut rx) = spawn(config);
    let tilt = RawSample::head(-0.3, 0.0, true);

    gesture.head.dwell_time = 5.0;
    runtime.apply_config(gesture.clone()).unwrap();
    runtime.open_window().await.unwrap();
    feed(&runtime, InputSource::Head, neutral_head(), 10).await;
    feed(&runtime, InputSource::Head, tilt, 35).await;
    assert_eq!(next_outcome(&mut rx).await.0, Outcome::Missed);

    gesture.head.dwell_time = 0.0;
    runtime.apply_config(gesture).unwrap();
    runtime.open_window().await.unwrap();
    feed(&runtime, InputSource::Head, neutral_head(), 10).await;
    feed(&runtime, InputSource::Head, tilt, 5).await;
    assert_eq!(next_outcome(&mut rx).await.0, Outcome::Present);

    assert_ok!(runtime.shutdown().await);
}
