//! rollcall-core — Roster, reference descriptors and face matching.
//!
//! Face detection and descriptor extraction are delegated to a
//! [`FaceAnalyzer`] implementation; this crate owns everything around it.

pub mod analyzer;
pub mod frame;
pub mod photo;
pub mod reference;
pub mod roster;
pub mod source;
pub mod types;

pub use analyzer::{AnalyzerError, FaceAnalyzer};
pub use frame::Frame;
pub use photo::{DirPhotoStore, PhotoError, PhotoStore};
pub use reference::load_reference_set;
pub use roster::{Roster, RosterError};
pub use source::{SourceError, VideoSource};
pub use types::{
    BoundingBox, Descriptor, Detection, EuclideanMatcher, Identity, MatchLabel, MatchResult,
    Matcher, ReferenceDescriptor, ReferenceSet, DEFAULT_DISTANCE_THRESHOLD,
};
