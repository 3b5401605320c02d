//! Presentation sink: receives each tick's match results for display.

use crate::sampler::SamplerError;
use rollcall_core::{Frame, MatchResult};

pub trait PresentationSink: Send + Sync {
    /// Called once per completed tick, with one result per detection.
    fn on_results(&self, frame: &Frame, results: &[MatchResult]);

    /// Called when the pipeline cannot run at all (camera unavailable).
    fn on_error(&self, error: &SamplerError);
}

/// Sink that reports recognitions through `tracing`.
pub struct LogSink;

impl PresentationSink for LogSink {
    fn on_results(&self, frame: &Frame, results: &[MatchResult]) {
        for result in results {
            let b = &result.detection.bbox;
            tracing::debug!(
                seq = frame.sequence,
                label = %result,
                x = b.x,
                y = b.y,
                w = b.width,
                h = b.height,
                "Recognized User: {}",
                result.display_name()
            );
        }
    }

    fn on_error(&self, error: &SamplerError) {
        tracing::error!(error = %error, "sampling unavailable");
    }
}
