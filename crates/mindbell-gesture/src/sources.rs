//! The two concrete gesture sources.

use crate::config::{GestureConfig, SourceConfig};
use crate::pipeline::{GesturePipeline, SourceProfile};
use crate::sample::{ChannelValues, InputSource, RawSample};

/// Camera-derived head orientation, channels in radians.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadPose;

impl SourceProfile for HeadPose {
    const SOURCE: InputSource = InputSource::Head;

    fn default_config() -> SourceConfig {
        SourceConfig::head()
    }

    fn select(config: &GestureConfig) -> &SourceConfig {
        &config.head
    }
}

/// Pointer proximity to the screen edges, channels in normalized screen units.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointerEdge;

impl SourceProfile for PointerEdge {
    const SOURCE: InputSource = InputSource::Pointer;

    fn default_config() -> SourceConfig {
        SourceConfig::pointer()
    }

    fn select(config: &GestureConfig) -> &SourceConfig {
        &config.pointer
    }

    /// Pointer coordinates past the screen bounds (secondary displays) are
    /// pinned to the nearest edge.
    fn condition(sample: RawSample) -> RawSample {
        RawSample {
            channels: ChannelValues::new(
                sample.channels.primary.clamp(0.0, 1.0),
                sample.channels.lateral.clamp(0.0, 1.0),
            ),
            ..sample
        }
    }
}

pub type HeadPoseSource = GesturePipeline<HeadPose>;
pub type PointerEdgeSource = GesturePipeline<PointerEdge>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Edge;

    fn pointer_source() -> PointerEdgeSource {
        let mut source = PointerEdgeSource::new(SourceConfig {
            smoothing_factor: 0.0,
            dwell_time: 0.0,
            frames_to_skip: 0,
            ..SourceConfig::pointer()
        });
        source.activate();
        // Baseline in the middle of the screen.
        source.update(&RawSample::pointer(0.5, 0.5, true), 0.0);
        source
    }

    #[test]
    fn test_profiles_pick_their_config() {
        let config = GestureConfig::default();
        assert_eq!(HeadPose::select(&config), &SourceConfig::head());
        assert_eq!(PointerEdge::select(&config), &SourceConfig::pointer());
        assert_eq!(HeadPoseSource::default().source(), InputSource::Head);
        assert_eq!(PointerEdgeSource::default().source(), InputSource::Pointer);
    }

    #[test]
    fn test_pointer_to_top_edge() {
        let mut source = pointer_source();
        let snapshot = source.update(&RawSample::pointer(0.5, 0.2, true), 0.1);
        assert_eq!(snapshot.last_trigger.map(|t| t.edge), Some(Edge::Top));
        assert_eq!(snapshot.last_trigger.map(|t| t.source), Some(InputSource::Pointer));
    }

    #[test]
    fn test_pointer_to_side_edges() {
        let mut source = pointer_source();
        let snapshot = source.update(&RawSample::pointer(0.1, 0.5, true), 0.1);
        assert_eq!(snapshot.last_trigger.map(|t| t.edge), Some(Edge::Left));

        source.update(&RawSample::pointer(0.5, 0.5, true), 0.2);
        let snapshot = source.update(&RawSample::pointer(0.95, 0.5, true), 0.3);
        assert_eq!(snapshot.last_trigger.map(|t| t.edge), Some(Edge::Right));
        assert_eq!(snapshot.trigger_seq, 2);
    }

    #[test]
    fn test_pointer_moving_down_is_not_a_gesture() {
        let mut source = pointer_source();
        let snapshot = source.update(&RawSample::pointer(0.5, 0.9, true), 0.1);
        assert_eq!(snapshot.trigger_seq, 0);
        assert_eq!(snapshot.intensities.top, 0.0);
    }

    #[test]
    fn test_pointer_off_screen_is_clamped() {
        let mut source = pointer_source();
        let snapshot = source.update(&RawSample::pointer(-3.0, 0.5, true), 0.1);
        let smoothed = snapshot.smoothed.unwrap();
        assert_eq!(smoothed.lateral, 0.0);
        assert_eq!(snapshot.intensities.left, 1.0);
    }
}
