//! Async host for the gesture pipelines.
//!
//! One consumer task owns both pipelines, the arbiter and the open response
//! window. Producers hand samples in through bounded per-source channels;
//! the task stamps each sample with its own clock, updates the matching
//! pipeline and publishes the resulting snapshot whole through a `watch`
//! channel. A fixed-period tick runs arbitration, emits a presentation frame
//! and drives the response window.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn, Instrument};

use mindbell_gesture::{
    ArbiterOutput, Edge, GestureConfig, HeadPose, HeadPoseSource, InputArbiter, InputSource,
    PipelineSnapshot, PointerEdge, PointerEdgeSource, RawSample, SourceProfile,
};

use crate::config::{tick_interval, EngineConfig};
use crate::error::{EngineError, EngineResult};
use crate::logging::WindowLogger;
use crate::metrics;
use crate::recorder::ResponseRecorder;
use crate::window::{ResponseWindow, WindowConfig, WindowResolution};

/// Commands accepted by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// A chime played: start a response window.
    OpenWindow,
    /// End the open window now, as if it had timed out.
    CloseWindow,
    SetEnabled(InputSource, bool),
    Shutdown,
}

/// Per-tick values for the rendering surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PresentationFrame {
    pub top_intensity: f64,
    pub left_intensity: f64,
    pub right_intensity: f64,
    pub dwell_progress: f64,
    pub active_source: Option<InputSource>,
    pub trigger_edge: Option<Edge>,
    pub window_open: bool,
    /// Runtime clock, seconds since start.
    pub time: f64,
}

impl PresentationFrame {
    fn from_output(output: &ArbiterOutput, window_open: bool, time: f64) -> Self {
        Self {
            top_intensity: output.intensities.top,
            left_intensity: output.intensities.left,
            right_intensity: output.intensities.right,
            dwell_progress: output.dwell_progress,
            active_source: output.active,
            trigger_edge: output.trigger.map(|trigger| trigger.edge),
            window_open,
            time,
        }
    }
}

/// Producer handle for one source's samples.
#[derive(Debug, Clone)]
pub struct SampleSender {
    source: InputSource,
    tx: mpsc::Sender<RawSample>,
}

impl SampleSender {
    pub fn source(&self) -> InputSource {
        self.source
    }

    /// Hand over a sample without waiting.
    ///
    /// Returns `false` when the sample was dropped because the channel is
    /// full or the runtime has stopped.
    pub fn offer(&self, sample: RawSample) -> bool {
        match self.tx.try_send(sample) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                metrics::record_sample_dropped(self.source);
                warn!("Dropped {} sample, channel full", self.source);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Hand over a sample, waiting for channel capacity.
    pub async fn send(&self, sample: RawSample) -> EngineResult<()> {
        self.tx
            .send(sample)
            .await
            .map_err(|_| EngineError::channel_closed(format!("{} samples", self.source)))
    }
}

/// Handle to a running fusion task.
pub struct FusionRuntime {
    head: SampleSender,
    pointer: SampleSender,
    control: mpsc::Sender<ControlCommand>,
    config: watch::Sender<GestureConfig>,
    head_snapshots: watch::Receiver<PipelineSnapshot>,
    pointer_snapshots: watch::Receiver<PipelineSnapshot>,
    presentation: Option<mpsc::Receiver<PresentationFrame>>,
    task: JoinHandle<()>,
}

impl FusionRuntime {
    /// Start the consumer task on the current tokio runtime.
    pub fn spawn(config: EngineConfig, recorder: Arc<dyn ResponseRecorder>) -> Self {
        let gesture = config.gesture.sanitized();

        let (head_tx, head_rx) = mpsc::channel(config.sample_channel_capacity.max(1));
        let (pointer_tx, pointer_rx) = mpsc::channel(config.sample_channel_capacity.max(1));
        let (control_tx, control_rx) = mpsc::channel(config.control_capacity.max(1));
        let (presentation_tx, presentation_rx) = mpsc::channel(config.presentation_capacity.max(1));
        let (config_tx, config_rx) = watch::channel(gesture.clone());
        let (head_snapshot_tx, head_snapshots) =
            watch::channel(PipelineSnapshot::idle(InputSource::Head));
        let (pointer_snapshot_tx, pointer_snapshots) =
            watch::channel(PipelineSnapshot::idle(InputSource::Pointer));

        let fusion = FusionLoop {
            head: HeadPoseSource::new(HeadPose::select(&gesture).clone()),
            pointer: PointerEdgeSource::new(PointerEdge::select(&gesture).clone()),
            arbiter: InputArbiter::new(&gesture),
            gesture,
            window_config: config.window,
            window: None,
            windows_opened: 0,
            last_active: None,
            recorder,
            head_snapshot_tx,
            pointer_snapshot_tx,
            presentation_tx,
            origin: Instant::now(),
        };

        let task = tokio::spawn(fusion.run(head_rx, pointer_rx, control_rx, config_rx));

        Self {
            head: SampleSender {
                source: InputSource::Head,
                tx: head_tx,
            },
            pointer: SampleSender {
                source: InputSource::Pointer,
                tx: pointer_tx,
            },
            control: control_tx,
            config: config_tx,
            head_snapshots,
            pointer_snapshots,
            presentation: Some(presentation_rx),
            task,
        }
    }

    pub fn sample_sender(&self, source: InputSource) -> SampleSender {
        match source {
            InputSource::Head => self.head.clone(),
            InputSource::Pointer => self.pointer.clone(),
        }
    }

    pub async fn send_command(&self, command: ControlCommand) -> EngineResult<()> {
        self.control
            .send(command)
            .await
            .map_err(|_| EngineError::channel_closed("control"))
    }

    pub async fn open_window(&self) -> EngineResult<()> {
        self.send_command(ControlCommand::OpenWindow).await
    }

    pub async fn close_window(&self) -> EngineResult<()> {
        self.send_command(ControlCommand::CloseWindow).await
    }

    pub async fn set_enabled(&self, source: InputSource, enabled: bool) -> EngineResult<()> {
        self.send_command(ControlCommand::SetEnabled(source, enabled)).await
    }

    /// Hand down new settings. They apply from the next frame on.
    pub fn apply_config(&self, config: GestureConfig) -> EngineResult<()> {
        self.config
            .send(config)
            .map_err(|_| EngineError::channel_closed("config"))
    }

    /// Latest published state of a source's pipeline.
    pub fn snapshot(&self, source: InputSource) -> PipelineSnapshot {
        *self.subscribe(source).borrow()
    }

    pub fn subscribe(&self, source: InputSource) -> watch::Receiver<PipelineSnapshot> {
        match source {
            InputSource::Head => self.head_snapshots.clone(),
            InputSource::Pointer => self.pointer_snapshots.clone(),
        }
    }

    /// The single consumer of presentation frames. Only the first call
    /// returns the receiver.
    pub fn take_presentation(&mut self) -> Option<mpsc::Receiver<PresentationFrame>> {
        self.presentation.take()
    }

    /// Stop the task, closing any open window first.
    pub async fn shutdown(self) -> EngineResult<()> {
        // The task may already be gone; joining below reports that.
        let _ = self.control.send(ControlCommand::Shutdown).await;
        self.task
            .await
            .map_err(|e| EngineError::TaskFailed(e.to_string()))
    }
}

/// State owned by the consumer task.
struct FusionLoop {
    head: HeadPoseSource,
    pointer: PointerEdgeSource,
    arbiter: InputArbiter,
    gesture: GestureConfig,
    window_config: WindowConfig,
    window: Option<(ResponseWindow, WindowLogger)>,
    windows_opened: u64,
    last_active: Option<InputSource>,
    recorder: Arc<dyn ResponseRecorder>,
    head_snapshot_tx: watch::Sender<PipelineSnapshot>,
    pointer_snapshot_tx: watch::Sender<PipelineSnapshot>,
    presentation_tx: mpsc::Sender<PresentationFrame>,
    origin: Instant,
}

fn ticker(gesture: &GestureConfig) -> Interval {
    let mut ticker = interval(tick_interval(gesture));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

impl FusionLoop {
    async fn run(
        mut self,
        mut head_rx: mpsc::Receiver<RawSample>,
        mut pointer_rx: mpsc::Receiver<RawSample>,
        mut control_rx: mpsc::Receiver<ControlCommand>,
        mut config_rx: watch::Receiver<GestureConfig>,
    ) {
        let mut ticks = ticker(&self.gesture);
        info!(
            "Fusion runtime started (tick {:?})",
            tick_interval(&self.gesture)
        );

        loop {
            tokio::select! {
                biased;

                command = control_rx.recv() => match command {
                    Some(ControlCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command).await,
                },
                Ok(()) = config_rx.changed() => {
                    let config = config_rx.borrow_and_update().clone();
                    let previous_tick = tick_interval(&self.gesture);
                    self.apply_config(config);
                    if tick_interval(&self.gesture) != previous_tick {
                        ticks = ticker(&self.gesture);
                    }
                }
                _ = ticks.tick() => self.on_tick().await,
                Some(sample) = head_rx.recv() => self.on_sample(InputSource::Head, sample),
                Some(sample) = pointer_rx.recv() => self.on_sample(InputSource::Pointer, sample),
            }
        }

        self.close_window().await;
        info!("Fusion runtime stopped");
    }

    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    fn on_sample(&mut self, source: InputSource, sample: RawSample) {
        let now = self.now();
        match source {
            InputSource::Head => {
                let snapshot = self.head.update(&sample, now);
                self.head_snapshot_tx.send_replace(snapshot);
            }
            InputSource::Pointer => {
                let snapshot = self.pointer.update(&sample, now);
                self.pointer_snapshot_tx.send_replace(snapshot);
            }
        }
    }

    async fn on_tick(&mut self) {
        let now = self.now();
        let head = self.head.snapshot();
        let pointer = self.pointer.snapshot();
        let output = self.arbiter.tick(now, &head, &pointer);

        if output.switched {
            if let Some(to) = output.active {
                metrics::record_arbiter_switch(to);
            }
        }
        if output.active != self.last_active {
            metrics::set_active_source(output.active);
            self.last_active = output.active;
        }
        if let Some(trigger) = output.trigger {
            metrics::record_trigger(trigger.source, trigger.edge);
        }

        let frame = PresentationFrame::from_output(&output, self.window.is_some(), now);
        if let Err(TrySendError::Full(_)) = self.presentation_tx.try_send(frame) {
            debug!("Presentation consumer lagging, frame dropped");
        }

        let subject_seen = head.subject_seen || pointer.subject_seen;
        let resolution = match self.window.as_mut() {
            Some((window, logger)) => {
                if let Some(trigger) = &output.trigger {
                    logger.log_trigger(trigger);
                }
                window.poll(now, output.trigger, subject_seen, &self.window_config)
            }
            None => None,
        };

        if let Some(resolution) = resolution {
            self.finish_window(resolution).await;
        }
    }

    async fn handle_command(&mut self, command: ControlCommand) {
        match command {
            ControlCommand::OpenWindow => self.open_window(),
            ControlCommand::CloseWindow => self.close_window().await,
            ControlCommand::SetEnabled(source, enabled) => self.set_enabled(source, enabled),
            // Handled by the run loop.
            ControlCommand::Shutdown => {}
        }
    }

    fn open_window(&mut self) {
        if self.window.is_some() {
            warn!("Response window already open, ignoring chime");
            return;
        }

        self.windows_opened += 1;
        let session_id = self.recorder.session_id();
        let logger = WindowLogger::new(self.windows_opened, session_id.as_ref());

        for source in InputSource::ALL {
            if self.arbiter.is_enabled(source) {
                self.activate(source);
            } else {
                self.deactivate(source);
            }
        }
        self.arbiter.reset();

        let timeout = self.window_config.response_timeout;
        logger.log_open(timeout.as_secs_f64());
        self.window = Some((ResponseWindow::open(self.now(), timeout), logger));
    }

    async fn close_window(&mut self) {
        let subject_seen = self.head.snapshot().subject_seen || self.pointer.snapshot().subject_seen;
        let resolution = match self.window.as_mut() {
            Some((window, _)) => window.close(subject_seen, &self.window_config),
            None => {
                debug!("No response window open");
                None
            }
        };

        if let Some(resolution) = resolution {
            self.finish_window(resolution).await;
        }
    }

    async fn finish_window(&mut self, resolution: WindowResolution) {
        let Some((_, logger)) = self.window.take() else {
            return;
        };
        logger.log_close(&resolution);
        metrics::record_window(resolution.outcome);

        for source in InputSource::ALL {
            self.deactivate(source);
        }
        self.arbiter.reset();

        let recorded = self
            .recorder
            .record(resolution.outcome, resolution.latency_ms)
            .instrument(logger.create_span())
            .await;
        if let Err(e) = recorded {
            logger.log_warning(&format!("failed to record outcome: {}", e));
        }
    }

    fn set_enabled(&mut self, source: InputSource, enabled: bool) {
        info!("{} source {}", source, if enabled { "enabled" } else { "disabled" });
        self.arbiter.set_enabled(source, enabled);

        if self.window.is_none() {
            return;
        }
        let active = match source {
            InputSource::Head => self.head.is_active(),
            InputSource::Pointer => self.pointer.is_active(),
        };
        if enabled && !active {
            self.activate(source);
        } else if !enabled {
            self.deactivate(source);
        }
    }

    fn activate(&mut self, source: InputSource) {
        match source {
            InputSource::Head => {
                self.head.activate();
                self.head_snapshot_tx.send_replace(self.head.snapshot());
            }
            InputSource::Pointer => {
                self.pointer.activate();
                self.pointer_snapshot_tx.send_replace(self.pointer.snapshot());
            }
        }
    }

    fn deactivate(&mut self, source: InputSource) {
        match source {
            InputSource::Head => {
                self.head.deactivate();
                self.head_snapshot_tx.send_replace(self.head.snapshot());
            }
            InputSource::Pointer => {
                self.pointer.deactivate();
                self.pointer_snapshot_tx.send_replace(self.pointer.snapshot());
            }
        }
    }

    fn apply_config(&mut self, config: GestureConfig) {
        let config = config.sanitized();
        self.head.apply_config(HeadPose::select(&config));
        self.pointer.apply_config(PointerEdge::select(&config));
        self.arbiter.apply_config(&config);
        self.gesture = config;
        info!("Gesture configuration reloaded");
    }
}
