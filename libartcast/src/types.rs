//! Core types for Artcast

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canonical content-maturity scale understood by the orchestrator.
///
/// Each website adapter owns a private mapping from this scale to its own
/// rating vocabulary; several sites collapse `Adult` and `Extreme` into a
/// single tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Rating {
    General,
    Mature,
    Adult,
    Extreme,
}

impl Rating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::General => "general",
            Rating::Mature => "mature",
            Rating::Adult => "adult",
            Rating::Extreme => "extreme",
        }
    }
}

impl std::str::FromStr for Rating {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "general" | "g" => Ok(Rating::General),
            "mature" | "m" => Ok(Rating::Mature),
            "adult" | "a" => Ok(Rating::Adult),
            "extreme" | "e" => Ok(Rating::Extreme),
            _ => Err(format!(
                "Invalid rating: '{}'. Valid options: general, mature, adult, extreme",
                s
            )),
        }
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One file carried by a submission: raw bytes plus the metadata websites
/// validate against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionFile {
    /// Display name, e.g. "commission.png"
    pub name: String,
    /// Declared MIME type, e.g. "image/png"
    pub mime_type: String,
    /// Size in bytes
    pub size: u64,
    /// File content
    pub data: Vec<u8>,
}

impl SubmissionFile {
    pub fn new(name: String, mime_type: String, data: Vec<u8>) -> Self {
        Self {
            size: data.len() as u64,
            name,
            mime_type,
            data,
        }
    }

    /// The part after "/" in the MIME type ("png" for "image/png"), used
    /// when matching against a website's accepted type list.
    pub fn mime_subtype(&self) -> &str {
        self.mime_type
            .split_once('/')
            .map(|(_, sub)| sub)
            .unwrap_or(&self.mime_type)
    }

    /// File name extension, lowercased, without the dot.
    pub fn extension(&self) -> Option<String> {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
    }
}

/// A named, user-curated, reusable set of tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagGroup {
    pub alias: String,
    pub tags: Vec<String>,
}

/// The tags attached to one submission.
///
/// `extend_defaults` controls whether website-independent default tags are
/// merged in; `group` optionally pulls in a saved [`TagGroup`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagSet {
    pub tags: Vec<String>,
    pub extend_defaults: bool,
    pub group: Option<TagGroup>,
}

impl TagSet {
    /// All raw tags including the referenced group's, before
    /// normalization or default merging.
    pub fn raw_tags(&self) -> Vec<String> {
        let mut tags = self.tags.clone();
        if let Some(group) = &self.group {
            tags.extend(group.tags.iter().cloned());
        }
        tags
    }
}

/// Immutable-per-attempt bundle describing one logical submission.
///
/// Created by the caller, read (never mutated) by the orchestrator and the
/// website adapters, discarded once every [`PostResult`] is produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub title: String,
    pub primary: SubmissionFile,
    pub additional: Vec<SubmissionFile>,
    pub tags: TagSet,
    pub description: String,
    pub rating: Rating,
    pub sources: Vec<String>,
    /// Website-specific option set, opaque to the orchestrator
    pub options: serde_json::Value,
    pub created_at: i64,
}

impl Submission {
    pub fn new(title: String, primary: SubmissionFile) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            primary,
            additional: Vec::new(),
            tags: TagSet::default(),
            description: String::new(),
            rating: Rating::General,
            sources: Vec::new(),
            options: serde_json::Value::Object(serde_json::Map::new()),
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Look up a string option by key, e.g. a per-site source override.
    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(|v| v.as_str())
    }

    /// Look up a boolean option by key, falling back to `default`.
    pub fn option_bool(&self, key: &str, default: bool) -> bool {
        self.options
            .get(key)
            .and_then(|v| v.as_bool())
            .unwrap_or(default)
    }

    /// Whether the primary file may be automatically downscaled to fit a
    /// website's size limit.
    pub fn autoscale_allowed(&self) -> bool {
        self.option_bool("autoscale", true)
    }
}

/// Outcome of validating a submission against one website's rules.
///
/// `problems` block the post; `warnings` are surfaced but do not. Both are
/// user-facing messages consumed verbatim by callers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub problems: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn problem(&mut self, message: impl Into<String>) {
        self.problems.push(message.into());
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// True when any blocking problem was recorded.
    pub fn is_blocked(&self) -> bool {
        !self.problems.is_empty()
    }

    /// Fold another report's findings into this one.
    pub fn merge(&mut self, other: ValidationReport) {
        self.problems.extend(other.problems);
        self.warnings.extend(other.warnings);
    }
}

/// Result of posting one submission to one website.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostResult {
    /// Website name (e.g. "derpibooru", "weasyl")
    pub website: String,
    /// Whether the post was accepted
    pub success: bool,
    /// Location of the posted submission, when the site reports one
    pub location: Option<String>,
    /// Error detail (if failed)
    pub error: Option<String>,
}

impl PostResult {
    pub fn succeeded(website: &str, location: Option<String>) -> Self {
        Self {
            website: website.to_string(),
            success: true,
            location,
            error: None,
        }
    }

    pub fn failed(website: &str, error: String) -> Self {
        Self {
            website: website.to_string(),
            success: false,
            location: None,
            error: Some(error),
        }
    }

    /// A submission rejected during validation, before any network access.
    pub fn rejected(website: &str, problems: &[String]) -> Self {
        Self::failed(website, format!("Rejected: {}", problems.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_from_str() {
        assert_eq!("general".parse::<Rating>().unwrap(), Rating::General);
        assert_eq!("Mature".parse::<Rating>().unwrap(), Rating::Mature);
        assert_eq!("a".parse::<Rating>().unwrap(), Rating::Adult);
        assert_eq!("EXTREME".parse::<Rating>().unwrap(), Rating::Extreme);
        assert!("spicy".parse::<Rating>().is_err());
    }

    #[test]
    fn test_rating_display() {
        assert_eq!(Rating::General.to_string(), "general");
        assert_eq!(Rating::Extreme.to_string(), "extreme");
    }

    #[test]
    fn test_submission_file_size_derived_from_data() {
        let file = SubmissionFile::new(
            "art.png".to_string(),
            "image/png".to_string(),
            vec![0u8; 42],
        );
        assert_eq!(file.size, 42);
    }

    #[test]
    fn test_submission_file_mime_subtype() {
        let file = SubmissionFile::new("a.png".to_string(), "image/png".to_string(), vec![]);
        assert_eq!(file.mime_subtype(), "png");

        let odd = SubmissionFile::new("a".to_string(), "weird".to_string(), vec![]);
        assert_eq!(odd.mime_subtype(), "weird");
    }

    #[test]
    fn test_submission_file_extension() {
        let file = SubmissionFile::new("Final.Piece.JPG".to_string(), "image/jpeg".into(), vec![]);
        assert_eq!(file.extension(), Some("jpg".to_string()));

        let bare = SubmissionFile::new("noext".to_string(), "image/png".into(), vec![]);
        assert_eq!(bare.extension(), None);
    }

    #[test]
    fn test_tag_set_raw_tags_includes_group() {
        let set = TagSet {
            tags: vec!["fox".to_string()],
            extend_defaults: false,
            group: Some(TagGroup {
                alias: "commissions".to_string(),
                tags: vec!["commission".to_string(), "digital".to_string()],
            }),
        };
        assert_eq!(set.raw_tags(), vec!["fox", "commission", "digital"]);
    }

    #[test]
    fn test_submission_new_defaults() {
        let file = SubmissionFile::new("a.png".to_string(), "image/png".to_string(), vec![1, 2]);
        let submission = Submission::new("Test".to_string(), file);

        assert!(Uuid::parse_str(&submission.id).is_ok());
        assert_eq!(submission.rating, Rating::General);
        assert!(submission.sources.is_empty());
        assert!(submission.autoscale_allowed());
    }

    #[test]
    fn test_submission_options() {
        let file = SubmissionFile::new("a.png".to_string(), "image/png".to_string(), vec![]);
        let mut submission = Submission::new("Test".to_string(), file);
        submission.options = serde_json::json!({
            "source": "https://example.com/original",
            "autoscale": false,
        });

        assert_eq!(
            submission.option_str("source"),
            Some("https://example.com/original")
        );
        assert_eq!(submission.option_str("missing"), None);
        assert!(!submission.autoscale_allowed());
    }

    #[test]
    fn test_validation_report_blocking() {
        let mut report = ValidationReport::new();
        assert!(!report.is_blocked());

        report.warning("Will be scaled down");
        assert!(!report.is_blocked());

        report.problem("Requires at least 3 tags.");
        assert!(report.is_blocked());
    }

    #[test]
    fn test_validation_report_merge() {
        let mut report = ValidationReport::new();
        report.warning("w1");

        let mut other = ValidationReport::new();
        other.problem("p1");
        other.warning("w2");

        report.merge(other);
        assert_eq!(report.problems, vec!["p1"]);
        assert_eq!(report.warnings, vec!["w1", "w2"]);
    }

    #[test]
    fn test_post_result_rejected_joins_problems() {
        let result = PostResult::rejected(
            "derpibooru",
            &["Requires at least 3 tags.".to_string(), "Too large".to_string()],
        );
        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("Rejected: Requires at least 3 tags.; Too large")
        );
    }

    #[test]
    fn test_post_result_serialization() {
        let result = PostResult::succeeded("weasyl", Some("https://weasyl.com/s/1".to_string()));
        let json = serde_json::to_string(&result).unwrap();
        let back: PostResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.website, "weasyl");
        assert!(back.success);
        assert_eq!(back.location.as_deref(), Some("https://weasyl.com/s/1"));
    }
}
