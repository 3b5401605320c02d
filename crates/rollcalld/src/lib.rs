//! rollcalld — Attendance daemon.
//!
//! Samples video frames, matches detected faces against the roster's
//! reference set and sends a debounced welcome mail per recognized person.

pub mod api;
pub mod config;
pub mod mail;
pub mod pipeline;
pub mod sampler;
pub mod sink;

pub use config::Config;
pub use pipeline::{start_pipeline, Pipeline, PipelineError};
pub use sampler::{Sampler, SamplerConfig, SamplerError, SamplerHandle};
pub use sink::{LogSink, PresentationSink};
