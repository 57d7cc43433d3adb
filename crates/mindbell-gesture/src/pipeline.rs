//! Generic Smoother → Baseline → Classifier → DwellGate pipeline.
//!
//! One pipeline type serves both input sources; a [`SourceProfile`] supplies
//! the source identity, its default settings and any conditioning of the
//! raw reading. Each update returns a [`PipelineSnapshot`], a small `Copy`
//! value that is published whole so readers never observe torn state.

use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::baseline::BaselineCapture;
use crate::classifier::{Edge, EdgeIntensities, GestureClassifier};
use crate::config::{GestureConfig, SourceConfig};
use crate::dwell::DwellGate;
use crate::sample::{ChannelValues, InputSource, RawSample};
use crate::smoother::SignalSmoother;

/// Source-specific behaviour plugged into [`GesturePipeline`].
pub trait SourceProfile: Send + Sync + 'static {
    const SOURCE: InputSource;

    fn default_config() -> SourceConfig;

    /// This source's settings within the full configuration.
    fn select(config: &GestureConfig) -> &SourceConfig;

    /// Condition a raw reading before it enters the filter.
    fn condition(sample: RawSample) -> RawSample {
        sample
    }
}

/// Whether the last frame carried a detectable subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    Present,
    #[default]
    Absent,
}

/// A fired gesture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub source: InputSource,
    pub edge: Edge,
    /// Host clock time of the frame that fired, in seconds.
    pub at: f64,
}

/// Complete published state of one pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSnapshot {
    pub source: InputSource,
    pub presence: Presence,
    /// Pipeline is activated for a response window.
    pub active: bool,
    pub baseline_set: bool,
    /// Latest smoothed channels, once the filter has seen a sample.
    pub smoothed: Option<ChannelValues>,
    pub intensities: EdgeIntensities,
    pub dwell_progress: f64,
    pub dwell_edge: Option<Edge>,
    pub awaiting_neutral: bool,
    /// Incremented once per fired gesture over the pipeline's lifetime.
    pub trigger_seq: u64,
    pub last_trigger: Option<TriggerEvent>,
    /// Subject was present on at least one frame since activation.
    pub subject_seen: bool,
    /// Host clock time of the last update.
    pub time: f64,
}

impl PipelineSnapshot {
    /// Initial snapshot of an idle pipeline.
    pub fn idle(source: InputSource) -> Self {
        Self {
            source,
            presence: Presence::Absent,
            active: false,
            baseline_set: false,
            smoothed: None,
            intensities: EdgeIntensities::default(),
            dwell_progress: 0.0,
            dwell_edge: None,
            awaiting_neutral: false,
            trigger_seq: 0,
            last_trigger: None,
            subject_seen: false,
            time: 0.0,
        }
    }

    /// The source holds the arbitration lock: a dwell is in progress or a
    /// fired gesture has not yet returned to neutral.
    pub fn is_locked(&self) -> bool {
        self.dwell_progress > 0.0 || self.dwell_edge.is_some() || self.awaiting_neutral
    }
}

pub struct GesturePipeline<P: SourceProfile> {
    config: SourceConfig,
    primary: SignalSmoother,
    lateral: SignalSmoother,
    baseline: BaselineCapture,
    classifier: GestureClassifier,
    dwell: DwellGate,
    active: bool,
    presence: Presence,
    subject_seen: bool,
    intensities: EdgeIntensities,
    trigger_seq: u64,
    last_trigger: Option<TriggerEvent>,
    time: f64,
    _profile: PhantomData<P>,
}

impl<P: SourceProfile> Default for GesturePipeline<P> {
    fn default() -> Self {
        Self::new(P::default_config())
    }
}

impl<P: SourceProfile> GesturePipeline<P> {
    pub fn new(config: SourceConfig) -> Self {
        let config = config.sanitized(P::SOURCE.as_str());
        Self {
            primary: SignalSmoother::new(),
            lateral: SignalSmoother::new(),
            baseline: BaselineCapture::new(config.frames_to_skip),
            classifier: GestureClassifier::new(&config),
            dwell: DwellGate::new(),
            active: false,
            presence: Presence::Absent,
            subject_seen: false,
            intensities: EdgeIntensities::default(),
            trigger_seq: 0,
            last_trigger: None,
            time: 0.0,
            config,
            _profile: PhantomData,
        }
    }

    pub fn source(&self) -> InputSource {
        P::SOURCE
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Process one frame.
    ///
    /// Absent frames only record presence: smoothing, warm-up, baseline and
    /// dwell timing are left exactly as they were.
    pub fn update(&mut self, sample: &RawSample, now: f64) -> PipelineSnapshot {
        self.time = now;
        let sample = P::condition(*sample);
        let readable = sample.subject_present
            && sample.channels.primary.is_finite()
            && sample.channels.lateral.is_finite();

        if !readable {
            self.presence = Presence::Absent;
            self.intensities = EdgeIntensities::default();
            return self.snapshot();
        }

        self.presence = Presence::Present;
        if !self.active {
            return self.snapshot();
        }
        self.subject_seen = true;

        let factor = self.config.smoothing_factor;
        let smoothed = ChannelValues::new(
            self.primary.update(sample.channels.primary, factor),
            self.lateral.update(sample.channels.lateral, factor),
        );

        let delta = match self.baseline.observe(smoothed) {
            Some(delta) => delta,
            None => {
                if self.baseline.is_set() {
                    debug!(
                        "{} baseline captured at ({:.3}, {:.3})",
                        P::SOURCE,
                        smoothed.primary,
                        smoothed.lateral
                    );
                }
                self.intensities = EdgeIntensities::default();
                return self.snapshot();
            }
        };

        let (verdict, intensities) = self.classifier.classify(delta);
        self.intensities = intensities;

        let update = self.dwell.update(verdict, now, self.config.dwell_time);
        if let Some(edge) = update.fired {
            self.trigger_seq += 1;
            self.last_trigger = Some(TriggerEvent {
                source: P::SOURCE,
                edge,
                at: now,
            });
            debug!(
                "{} gesture fired: {} (seq {})",
                P::SOURCE,
                edge.as_str(),
                self.trigger_seq
            );
        }

        self.snapshot()
    }

    /// Start a response window from a clean slate.
    pub fn activate(&mut self) {
        self.reset();
        self.active = true;
        info!("{} pipeline activated", P::SOURCE);
    }

    /// Stop detecting and drop all per-window state. Safe to call repeatedly.
    pub fn deactivate(&mut self) {
        if self.active {
            info!("{} pipeline deactivated", P::SOURCE);
        }
        self.reset();
        self.active = false;
    }

    /// Clear smoothing, baseline and dwell state.
    ///
    /// `trigger_seq` is kept so observers never see it move backwards.
    pub fn reset(&mut self) {
        self.primary.reset();
        self.lateral.reset();
        self.baseline.reset();
        self.dwell.reset();
        self.subject_seen = false;
        self.intensities = EdgeIntensities::default();
    }

    /// Apply new settings from the next frame on. Dwell progress is kept.
    pub fn apply_config(&mut self, config: &SourceConfig) {
        let config = config.sanitized(P::SOURCE.as_str());
        if config == self.config {
            return;
        }
        self.classifier = GestureClassifier::new(&config);
        self.baseline.set_frames_to_skip(config.frames_to_skip);
        self.config = config;
        debug!("{} pipeline config updated", P::SOURCE);
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        let smoothed = match (self.primary.value(), self.lateral.value()) {
            (Some(primary), Some(lateral)) => Some(ChannelValues::new(primary, lateral)),
            _ => None,
        };

        PipelineSnapshot {
            source: P::SOURCE,
            presence: self.presence,
            active: self.active,
            baseline_set: self.baseline.is_set(),
            smoothed,
            intensities: self.intensities,
            dwell_progress: self.dwell.progress(),
            dwell_edge: self.dwell.dwelling_edge(),
            awaiting_neutral: self.dwell.awaiting_neutral(),
            trigger_seq: self.trigger_seq,
            last_trigger: self.last_trigger,
            subject_seen: self.subject_seen,
            time: self.time,
        }
    }
}
