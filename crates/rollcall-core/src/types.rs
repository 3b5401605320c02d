use serde::{Deserialize, Serialize};
use std::fmt;

/// Default maximum descriptor distance for a positive match.
pub const DEFAULT_DISTANCE_THRESHOLD: f32 = 0.6;

/// Bounding box for a detected face, in frame pixel coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
}

/// Face descriptor vector (128-dimensional for the usual recognition nets).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    pub values: Vec<f32>,
}

impl Descriptor {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Empty descriptor standing in for a roster entry whose photo yielded no face.
    pub fn placeholder() -> Self {
        Self { values: Vec::new() }
    }

    pub fn is_placeholder(&self) -> bool {
        self.values.is_empty()
    }

    /// Compute Euclidean distance between two descriptors.
    ///
    /// Descriptors of different length (including placeholders) are not
    /// comparable and sit at infinite distance, so they never match.
    pub fn euclidean_distance(&self, other: &Descriptor) -> f32 {
        if self.values.is_empty() || self.values.len() != other.values.len() {
            return f32::INFINITY;
        }
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// A known person from the roster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    /// Reference photo, relative to the photo store root.
    pub photo: String,
    pub email: String,
}

/// The descriptor computed once from an identity's reference photo.
#[derive(Debug, Clone)]
pub struct ReferenceDescriptor {
    pub identity: Identity,
    pub descriptor: Descriptor,
}

/// Immutable, ordered set of reference descriptors, one per identity.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSet {
    entries: Vec<ReferenceDescriptor>,
}

impl ReferenceSet {
    /// Build a set from entries. Later entries with an already seen name are dropped.
    pub fn new(entries: Vec<ReferenceDescriptor>) -> Self {
        let mut unique: Vec<ReferenceDescriptor> = Vec::with_capacity(entries.len());
        for entry in entries {
            if unique.iter().any(|e| e.identity.name == entry.identity.name) {
                tracing::warn!(name = %entry.identity.name, "duplicate reference identity dropped");
                continue;
            }
            unique.push(entry);
        }
        Self { entries: unique }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries with a real (non-placeholder) descriptor.
    pub fn matchable_len(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| !e.descriptor.is_placeholder())
            .count()
    }

    pub fn get(&self, name: &str) -> Option<&ReferenceDescriptor> {
        self.entries.iter().find(|e| e.identity.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReferenceDescriptor> {
        self.entries.iter()
    }
}

/// A face found in a sampled frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub descriptor: Descriptor,
}

/// Outcome label of a match.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchLabel {
    Known(Identity),
    Unknown,
}

/// Result of matching one detection against the reference set.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub detection: Detection,
    pub label: MatchLabel,
    /// Distance to the closest reference; `f32::INFINITY` when nothing was comparable.
    pub distance: f32,
}

impl MatchResult {
    pub fn identity(&self) -> Option<&Identity> {
        match &self.label {
            MatchLabel::Known(identity) => Some(identity),
            MatchLabel::Unknown => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self.label, MatchLabel::Unknown)
    }

    /// Name shown to the operator ("Unknown Person" for unmatched faces).
    pub fn display_name(&self) -> &str {
        match &self.label {
            MatchLabel::Known(identity) => &identity.name,
            MatchLabel::Unknown => "Unknown Person",
        }
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match &self.label {
            MatchLabel::Known(identity) => identity.name.as_str(),
            MatchLabel::Unknown => "unknown",
        };
        write!(f, "{label} ({:.2})", self.distance)
    }
}

/// Strategy for picking the best reference for a detection.
pub trait Matcher {
    fn find_best_match(&self, detection: &Detection, references: &ReferenceSet) -> MatchResult;
}

/// Nearest-neighbour matcher over Euclidean descriptor distance.
///
/// Always traverses the whole set. Ties resolve to the first entry in
/// roster order.
#[derive(Debug, Clone, Copy)]
pub struct EuclideanMatcher {
    pub threshold: f32,
}

impl Default for EuclideanMatcher {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_DISTANCE_THRESHOLD,
        }
    }
}

impl EuclideanMatcher {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }
}

impl Matcher for EuclideanMatcher {
    fn find_best_match(&self, detection: &Detection, references: &ReferenceSet) -> MatchResult {
        let mut best_dist = f32::INFINITY;
        let mut best: Option<&ReferenceDescriptor> = None;

        for entry in references.iter() {
            let dist = detection.descriptor.euclidean_distance(&entry.descriptor);
            // NaN never compares less, so corrupt descriptors cannot win.
            if dist < best_dist {
                best_dist = dist;
                best = Some(entry);
            }
        }

        let label = match best {
            Some(entry) if best_dist <= self.threshold => MatchLabel::Known(entry.identity.clone()),
            _ => MatchLabel::Unknown,
        };

        MatchResult {
            detection: detection.clone(),
            label,
            distance: best_dist,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(name: &str) -> Identity {
        Identity {
            name: name.into(),
            photo: format!("{}.jpg", name.to_lowercase()),
            email: format!("{}@x.com", name.to_lowercase()),
        }
    }

    fn reference(name: &str, values: Vec<f32>) -> ReferenceDescriptor {
        ReferenceDescriptor {
            identity: identity(name),
            descriptor: Descriptor::new(values),
        }
    }

    fn detection(values: Vec<f32>) -> Detection {
        Detection {
            bbox: BoundingBox { x: 0.0, y: 0.0, width: 10.0, height: 10.0, confidence: 0.9 },
            descriptor: Descriptor::new(values),
        }
    }

    #[test]
    fn test_euclidean_distance() {
        let a = Descriptor::new(vec![0.0, 0.0]);
        let b = Descriptor::new(vec![3.0, 4.0]);
        assert!((a.euclidean_distance(&b) - 5.0).abs() < 1e-6);
        assert!((b.euclidean_distance(&a) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_distance_placeholder_is_infinite() {
        let a = Descriptor::new(vec![0.1, 0.2]);
        assert_eq!(a.euclidean_distance(&Descriptor::placeholder()), f32::INFINITY);
        assert_eq!(Descriptor::placeholder().euclidean_distance(&a), f32::INFINITY);
    }

    #[test]
    fn test_distance_length_mismatch_is_infinite() {
        let a = Descriptor::new(vec![0.1, 0.2]);
        let b = Descriptor::new(vec![0.1, 0.2, 0.3]);
        assert_eq!(a.euclidean_distance(&b), f32::INFINITY);
    }

    #[test]
    fn test_matcher_close_match() {
        let refs = ReferenceSet::new(vec![reference("Alice", vec![0.0, 0.0, 0.0])]);
        let result = EuclideanMatcher::default().find_best_match(&detection(vec![0.3, 0.0, 0.0]), &refs);
        assert_eq!(result.identity().map(|i| i.name.as_str()), Some("Alice"));
        assert!((result.distance - 0.3).abs() < 1e-6);
        assert_eq!(result.to_string(), "Alice (0.30)");
    }

    #[test]
    fn test_matcher_far_is_unknown() {
        let refs = ReferenceSet::new(vec![reference("Alice", vec![0.0, 0.0, 0.0])]);
        let result = EuclideanMatcher::default().find_best_match(&detection(vec![0.9, 0.0, 0.0]), &refs);
        assert!(result.is_unknown());
        assert!((result.distance - 0.9).abs() < 1e-6);
        assert_eq!(result.display_name(), "Unknown Person");
        assert_eq!(result.to_string(), "unknown (0.90)");
    }

    #[test]
    fn test_matcher_threshold_is_inclusive() {
        let refs = ReferenceSet::new(vec![reference("Alice", vec![0.0, 0.0])]);
        let result = EuclideanMatcher::new(0.5).find_best_match(&detection(vec![0.5, 0.0]), &refs);
        assert!(!result.is_unknown());
    }

    #[test]
    fn test_matcher_empty_set() {
        let result = EuclideanMatcher::default()
            .find_best_match(&detection(vec![0.1, 0.2]), &ReferenceSet::default());
        assert!(result.is_unknown());
        assert!(result.distance >= 0.0);
    }

    #[test]
    fn test_matcher_full_traversal_picks_nearest() {
        // Best match is the last entry
        let refs = ReferenceSet::new(vec![
            reference("decoy1", vec![0.0, 1.0]),
            reference("decoy2", vec![1.0, 1.0]),
            reference("match", vec![1.0, 0.0]),
        ]);
        let result = EuclideanMatcher::default().find_best_match(&detection(vec![0.9, 0.0]), &refs);
        assert_eq!(result.identity().map(|i| i.name.as_str()), Some("match"));
    }

    #[test]
    fn test_matcher_tie_breaks_to_first() {
        let refs = ReferenceSet::new(vec![
            reference("first", vec![1.0, 0.0]),
            reference("second", vec![-1.0, 0.0]),
        ]);
        let probe = detection(vec![0.0, 0.0]);
        let matcher = EuclideanMatcher::new(2.0);
        for _ in 0..10 {
            let result = matcher.find_best_match(&probe, &refs);
            assert_eq!(result.identity().map(|i| i.name.as_str()), Some("first"));
        }
    }

    #[test]
    fn test_matcher_skips_placeholder() {
        let refs = ReferenceSet::new(vec![
            ReferenceDescriptor { identity: identity("Ghost"), descriptor: Descriptor::placeholder() },
            reference("Bob", vec![0.0, 0.0]),
        ]);
        let result = EuclideanMatcher::default().find_best_match(&detection(vec![0.1, 0.0]), &refs);
        assert_eq!(result.identity().map(|i| i.name.as_str()), Some("Bob"));

        let only_ghost = ReferenceSet::new(vec![ReferenceDescriptor {
            identity: identity("Ghost"),
            descriptor: Descriptor::placeholder(),
        }]);
        let result = EuclideanMatcher::default().find_best_match(&detection(vec![0.1, 0.0]), &only_ghost);
        assert!(result.is_unknown());
        assert_eq!(result.distance, f32::INFINITY);
    }

    #[test]
    fn test_reference_set_drops_duplicate_names() {
        let refs = ReferenceSet::new(vec![
            reference("Alice", vec![0.0]),
            reference("Alice", vec![1.0]),
        ]);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs.get("Alice").map(|r| r.descriptor.values.clone()), Some(vec![0.0]));
    }
}
