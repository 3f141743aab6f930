use std::{collections::BTreeMap, path::PathBuf, time::Duration};

pub(crate) const DEFAULT_BASE_URL: &str = "https://vision.googleapis.com/v1/";
pub(crate) const DEFAULT_MAX_WIDTH: u32 = 640;
pub(crate) const DEFAULT_MAX_HEIGHT: u32 = 480;
pub(crate) const DEFAULT_MAX_RESULTS: u32 = 3;
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 20;
pub(crate) const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// Annotation feature the remote service can be asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum FeatureKind {
    LabelDetection,
    TextDetection,
    FaceDetection,
    LandmarkDetection,
    LogoDetection,
}

impl FeatureKind {
    pub const ALL: [FeatureKind; 5] = [
        FeatureKind::LabelDetection,
        FeatureKind::TextDetection,
        FeatureKind::FaceDetection,
        FeatureKind::LandmarkDetection,
        FeatureKind::LogoDetection,
    ];

    /// Wire name expected by the annotation API.
    pub fn as_str(self) -> &'static str {
        match self {
            FeatureKind::LabelDetection => "LABEL_DETECTION",
            FeatureKind::TextDetection => "TEXT_DETECTION",
            FeatureKind::FaceDetection => "FACE_DETECTION",
            FeatureKind::LandmarkDetection => "LANDMARK_DETECTION",
            FeatureKind::LogoDetection => "LOGO_DETECTION",
        }
    }
}

/// Requested features with their per-feature result cap. Keys are unique and
/// iterate in a stable order, so the serialized request is deterministic.
#[derive(Clone, Debug)]
pub struct FeatureSet {
    entries: BTreeMap<FeatureKind, u32>,
}

impl FeatureSet {
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Insert or overwrite a feature, builder style.
    pub fn with(mut self, kind: FeatureKind, max_results: u32) -> Self {
        self.entries.insert(kind, max_results);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn max_results(&self, kind: FeatureKind) -> Option<u32> {
        self.entries.get(&kind).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureKind, u32)> + '_ {
        self.entries.iter().map(|(kind, max)| (*kind, *max))
    }
}

impl Default for FeatureSet {
    /// Every supported feature, capped at three results each.
    fn default() -> Self {
        let mut entries = BTreeMap::new();
        for kind in FeatureKind::ALL {
            entries.insert(kind, DEFAULT_MAX_RESULTS);
        }
        Self { entries }
    }
}

/// Everything the worker needs, supplied at construction.
#[derive(Clone, Debug)]
pub struct AnnotatorConfig {
    /// API key appended to the annotate URL. Treated as a secret: only a
    /// redacted form is ever logged.
    pub api_key: String,
    pub base_url: String,
    pub features: FeatureSet,
    pub max_width: u32,
    pub max_height: u32,
    pub request_timeout: Duration,
    pub queue_capacity: usize,
    /// Skip TLS certificate verification. Off by default.
    pub accept_invalid_certs: bool,
    /// When set, each cycle writes `request.json` and `result.json` here.
    pub dump_dir: Option<PathBuf>,
}

impl AnnotatorConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            features: FeatureSet::default(),
            max_width: DEFAULT_MAX_WIDTH,
            max_height: DEFAULT_MAX_HEIGHT,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            accept_invalid_certs: false,
            dump_dir: None,
        }
    }

    /// Full annotate endpoint including the key query parameter.
    pub(crate) fn endpoint(&self) -> String {
        format!("{}images:annotate?key={}", self.base_url, self.api_key)
    }

    /// Key form safe for logs: first four characters, rest elided.
    pub fn redacted_key(&self) -> String {
        let visible: String = self.api_key.chars().take(4).collect();
        format!("{visible}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_feature_set_covers_all_kinds_at_three() {
        let features = FeatureSet::default();
        assert_eq!(features.len(), 5);
        for kind in FeatureKind::ALL {
            assert_eq!(features.max_results(kind), Some(3));
        }
    }

    #[test]
    fn feature_set_iterates_in_stable_order() {
        let a = FeatureSet::empty()
            .with(FeatureKind::LogoDetection, 1)
            .with(FeatureKind::LabelDetection, 2);
        let b = FeatureSet::empty()
            .with(FeatureKind::LabelDetection, 2)
            .with(FeatureKind::LogoDetection, 1);
        let order_a: Vec<_> = a.iter().collect();
        let order_b: Vec<_> = b.iter().collect();
        assert_eq!(order_a, order_b);
    }

    #[test]
    fn endpoint_appends_annotate_path_and_key() {
        let config = AnnotatorConfig::new("secret-key");
        assert_eq!(
            config.endpoint(),
            "https://vision.googleapis.com/v1/images:annotate?key=secret-key"
        );
    }

    #[test]
    fn redacted_key_hides_the_tail() {
        let config = AnnotatorConfig::new("AIzaSyExample");
        let redacted = config.redacted_key();
        assert!(redacted.starts_with("AIza"));
        assert!(!redacted.contains("Example"));
    }
}
