//! Reference set loading.
//!
//! Computes one descriptor per roster entry from its reference photo.
//! Entries are processed concurrently; any failure degrades that entry to
//! a placeholder descriptor that can never match.

use crate::analyzer::FaceAnalyzer;
use crate::photo::PhotoStore;
use crate::roster::Roster;
use crate::types::{Descriptor, Identity, ReferenceDescriptor, ReferenceSet};
use std::sync::Arc;
use tokio::task::JoinSet;

/// Build the reference set for `roster`. Never fails.
pub async fn load_reference_set(
    roster: &Roster,
    photos: Arc<dyn PhotoStore>,
    analyzer: Arc<dyn FaceAnalyzer>,
) -> ReferenceSet {
    let mut tasks = JoinSet::new();
    for (index, identity) in roster.identities().iter().cloned().enumerate() {
        let photos = Arc::clone(&photos);
        let analyzer = Arc::clone(&analyzer);
        tasks.spawn(async move {
            let descriptor = describe(&identity, photos.as_ref(), analyzer.as_ref()).await;
            (index, descriptor)
        });
    }

    let mut slots: Vec<Option<Descriptor>> = vec![None; roster.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, descriptor)) => slots[index] = Some(descriptor),
            Err(err) => tracing::warn!(error = %err, "reference load task failed"),
        }
    }

    let entries: Vec<ReferenceDescriptor> = roster
        .identities()
        .iter()
        .zip(slots)
        .map(|(identity, slot)| ReferenceDescriptor {
            identity: identity.clone(),
            descriptor: slot.unwrap_or_else(Descriptor::placeholder),
        })
        .collect();

    let set = ReferenceSet::new(entries);
    tracing::info!(
        entries = set.len(),
        matchable = set.matchable_len(),
        "reference set loaded"
    );
    set
}

/// Fetch one photo and take the descriptor of its first detected face.
async fn describe(
    identity: &Identity,
    photos: &dyn PhotoStore,
    analyzer: &dyn FaceAnalyzer,
) -> Descriptor {
    let image = match photos.fetch(&identity.photo).await {
        Ok(image) => image,
        Err(err) => {
            tracing::warn!(name = %identity.name, photo = %identity.photo, error = %err, "reference photo unavailable");
            return Descriptor::placeholder();
        }
    };

    match analyzer.detect_one(&image).await {
        Ok(Some(detection)) => {
            tracing::debug!(
                name = %identity.name,
                dims = detection.descriptor.values.len(),
                "reference descriptor computed"
            );
            detection.descriptor
        }
        Ok(None) => {
            tracing::warn!(name = %identity.name, photo = %identity.photo, "no face in reference photo");
            Descriptor::placeholder()
        }
        Err(err) => {
            tracing::warn!(name = %identity.name, error = %err, "reference descriptor failed");
            Descriptor::placeholder()
        }
    }
}
