//! Scripted mindbell session.
//!
//! Plays a handful of chimes against synthetic head and pointer input, then
//! prints the period summary as JSON.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use tracing::info;

use mindbell_engine::{
    init_tracing, summarize_period, EngineConfig, EventStore, FusionRuntime, InMemoryEventStore,
    StoreRecorder,
};
use mindbell_gesture::{InputSource, RawSample};

/// Frames fed per chime at 30 Hz.
const FRAMES_PER_CHIME: u32 = 40;
/// Neutral frames before the scripted movement starts.
const NEUTRAL_FRAMES: u32 = 10;

#[derive(Debug, Clone, Copy)]
enum Script {
    HeadTilt,
    HeadTurnRight,
    PointerToLeftEdge,
    PresentNoGesture,
    NobodyThere,
}

impl Script {
    fn frame(self, index: u32) -> (RawSample, RawSample) {
        let moving = index >= NEUTRAL_FRAMES;
        match self {
            Script::HeadTilt => {
                let pitch = if moving { -0.3 } else { 0.0 };
                (RawSample::head(pitch, 0.0, true), RawSample::absent())
            }
            Script::HeadTurnRight => {
                let yaw = if moving { 0.4 } else { 0.0 };
                (RawSample::head(0.0, yaw, true), RawSample::absent())
            }
            Script::PointerToLeftEdge => {
                let x = if moving { 0.02 } else { 0.5 };
                (RawSample::absent(), RawSample::pointer(x, 0.5, true))
            }
            Script::PresentNoGesture => (RawSample::head(0.01, -0.01, true), RawSample::absent()),
            Script::NobodyThere => (RawSample::absent(), RawSample::absent()),
        }
    }
}

async fn play(runtime: &FusionRuntime, script: Script) -> anyhow::Result<()> {
    info!("Chime: {:?}", script);
    let head = runtime.sample_sender(InputSource::Head);
    let pointer = runtime.sample_sender(InputSource::Pointer);

    runtime.open_window().await?;
    let mut frames = tokio::time::interval(Duration::from_millis(33));
    for index in 0..FRAMES_PER_CHIME {
        frames.tick().await;
        let (head_sample, pointer_sample) = script.frame(index);
        head.offer(head_sample);
        pointer.offer(pointer_sample);
    }
    // Resolves as missed or absent unless a gesture already closed it.
    runtime.close_window().await?;
    tokio::time::sleep(Duration::from_millis(100)).await;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let mut config = EngineConfig::from_env();
    if let Ok(path) = std::env::var("MINDBELL_GESTURE_SETTINGS") {
        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read gesture settings {}", path))?;
        config = config.with_gesture_json(&json)?;
    }
    info!("Engine config: {:?}", config);

    let store = Arc::new(InMemoryEventStore::new());
    let session = store.start_session(Utc::now()).await?;
    let recorder = Arc::new(StoreRecorder::new(store.clone(), session.id));
    let runtime = FusionRuntime::spawn(config, recorder);

    play(&runtime, Script::HeadTilt).await?;
    play(&runtime, Script::HeadTurnRight).await?;

    runtime.set_enabled(InputSource::Head, false).await?;
    play(&runtime, Script::PointerToLeftEdge).await?;
    runtime.set_enabled(InputSource::Head, true).await?;

    play(&runtime, Script::PresentNoGesture).await?;
    play(&runtime, Script::NobodyThere).await?;

    runtime.shutdown().await?;
    let ended = store.end_session(session.id, Utc::now()).await?;
    info!("Session {} ended", ended.id);

    let summary = summarize_period(store.as_ref(), ended.started_at, Utc::now()).await?;
    let json = serde_json::to_string_pretty(&summary).context("failed to serialize summary")?;
    println!("{}", json);

    Ok(())
}
