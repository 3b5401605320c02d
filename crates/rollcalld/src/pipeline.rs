//! Pipeline assembly: roster → reference set → sampler → notifier.
//!
//! The video source and face analyzer are supplied by the embedding
//! application. The notification channel is usually
//! [`Config::notify_channel`]; everything else is built from [`Config`].

use crate::config::Config;
use crate::sampler::{Sampler, SamplerError, SamplerHandle};
use crate::sink::PresentationSink;
use rollcall_core::{
    load_reference_set, DirPhotoStore, EuclideanMatcher, FaceAnalyzer, ReferenceSet, Roster,
    RosterError, VideoSource,
};
use rollcall_notify::{spawn_dispatcher, MemoryCooldownStore, NotificationChannel, Notifier};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("roster: {0}")]
    Roster(#[from] RosterError),
    #[error("sampler: {0}")]
    Sampler(#[from] SamplerError),
}

/// A running pipeline.
pub struct Pipeline {
    pub references: Arc<ReferenceSet>,
    pub notifier: Notifier,
    pub sampler: SamplerHandle,
}

/// Load the roster and reference set, then start sampling.
pub async fn start_pipeline(
    config: &Config,
    source: Arc<dyn VideoSource>,
    analyzer: Arc<dyn FaceAnalyzer>,
    channel: Arc<dyn NotificationChannel>,
    sink: Arc<dyn PresentationSink>,
) -> Result<Pipeline, PipelineError> {
    let roster = Roster::load(&config.roster_path)?;
    let photos = Arc::new(DirPhotoStore::new(&config.photo_dir));
    let references = Arc::new(load_reference_set(&roster, photos, Arc::clone(&analyzer)).await);

    let store = Arc::new(MemoryCooldownStore::new(config.cooldown_purge_threshold));
    let dispatch = spawn_dispatcher(
        channel,
        config.retry_policy(),
        config.dispatch_queue,
        config.dispatch_concurrency,
    );
    let notifier = Notifier::with_cooldown(store, dispatch, config.cooldown());

    let sampler = Sampler::new(
        source,
        analyzer,
        Arc::new(EuclideanMatcher::new(config.distance_threshold)),
        Arc::clone(&references),
        notifier.clone(),
        sink,
    )
    .start(config.sampler_config())
    .await?;

    Ok(Pipeline {
        references,
        notifier,
        sampler,
    })
}
