//! Website abstraction and implementations
//!
//! One [`Website`] implementation exists per destination. The trait
//! normalizes wildly different site APIs behind a single contract: declare
//! limits, check login, map the canonical rating, validate a submission,
//! describe the post as a [`PostPlan`], and decide afterwards whether the
//! site actually accepted it (few of them use HTTP status codes honestly).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::accounts::AccountId;
use crate::description::UsernameShortcut;
use crate::error::{Result, WebsiteError};
use crate::tags;
use crate::transport::{HttpResponse, RequestOptions, SessionTransport};
use crate::types::{Rating, Submission, TagSet, ValidationReport};

pub mod plan;

pub mod derpibooru;
pub mod furaffinity;
pub mod pixiv;
pub mod weasyl;

// Mock website is available for all builds to support integration tests
pub mod mock;

pub use plan::{FieldValue, FileRef, FormCapture, PayloadEncoding, PlanField, PlanStep, PostPlan};

/// Result of probing a destination's authenticated page.
#[derive(Debug, Clone, Default)]
pub struct LoginStatus {
    pub logged_in: bool,
    pub username: Option<String>,
}

/// Contract every destination adapter implements.
///
/// Implementations read the submission, never mutate it, and keep all
/// site-specific knowledge (markers, endpoints, rating vocabulary) to
/// themselves so nothing leaks into the orchestrator.
#[async_trait]
pub trait Website: Send + Sync {
    /// Lowercase identifier, e.g. "derpibooru"
    fn name(&self) -> &'static str;

    fn base_url(&self) -> &'static str;

    /// Accepted file types as lowercase extensions/subtypes
    fn accepted_file_types(&self) -> &'static [&'static str];

    /// Effective per-file byte limit
    fn size_limit(&self) -> u64;

    /// Option shape the UI seeds per-website settings from
    fn default_options(&self) -> serde_json::Value {
        serde_json::json!({})
    }

    /// Profile-link shorthands usable in descriptions
    fn username_shortcuts(&self) -> &'static [UsernameShortcut] {
        &[]
    }

    /// Probe a known authenticated page and inspect body markers. On
    /// success the implementation persists the observed session cookies
    /// via the transport.
    async fn check_login_status(
        &self,
        transport: &SessionTransport,
        account: &AccountId,
    ) -> Result<LoginStatus>;

    /// Map the canonical rating to this site's vocabulary.
    fn map_rating(&self, rating: Rating) -> &'static str;

    /// Site-specific rewriting applied before the generic markup
    /// translation. Default: expand this site's username shortcuts.
    fn preprocess_description(&self, text: &str) -> String {
        crate::description::expand_username_shortcuts(text, self.username_shortcuts())
    }

    /// Translate the generic description markup into this site's dialect.
    fn postprocess_description(&self, text: &str) -> String {
        crate::description::to_plaintext(text)
    }

    /// Full description pipeline for a submission.
    fn render_description(&self, submission: &Submission) -> String {
        let text = self.preprocess_description(&submission.description);
        self.postprocess_description(&text)
    }

    /// Compose tag and file checks with any site-only rule. A report with
    /// problems must stop the attempt before any network access.
    fn validate(&self, submission: &Submission) -> ValidationReport;

    /// Describe exactly what must be sent. May include prerequisite
    /// fetches for hidden form fields.
    fn build_post_plan(&self, submission: &Submission)
        -> std::result::Result<PostPlan, WebsiteError>;

    /// Decide success from the final response and return the posted
    /// location when the site reports one.
    fn interpret_response(
        &self,
        response: &HttpResponse,
    ) -> std::result::Result<String, WebsiteError>;
}

/// Shared login probe: GET `url`, look for `marker` in the body, pull the
/// username out with `username_pattern`'s first capture group, and persist
/// the session cookies on success.
pub(crate) async fn marker_login_check(
    transport: &SessionTransport,
    account: &AccountId,
    url: &str,
    marker: &str,
    username_pattern: &regex::Regex,
) -> Result<LoginStatus> {
    let response = transport.get(url, account, RequestOptions::default()).await;
    if let Some(error) = &response.error {
        return Err(WebsiteError::Transport(error.clone()).into());
    }

    let mut status = LoginStatus::default();
    if response.body.contains(marker) {
        status.logged_in = true;
        status.username = username_pattern
            .captures(&response.body)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());
        transport.persist_cookies(account, url, &response.set_cookies);
    }
    Ok(status)
}

/// The tag collection a website actually posts: the submission's defaults
/// (including any tag group), optionally overridden/extended by a
/// per-website tag set carried in the option map under "tags".
pub(crate) fn effective_tags(submission: &Submission) -> Vec<String> {
    let site = site_tag_set(submission);
    let own = tags::normalize(&site.raw_tags());
    let defaults = tags::normalize(&submission.tags.raw_tags());
    tags::merge(&own, &defaults, site.extend_defaults)
}

fn site_tag_set(submission: &Submission) -> TagSet {
    match submission.options.get("tags") {
        // No site-specific tags: use the defaults alone
        None => TagSet {
            extend_defaults: true,
            ..TagSet::default()
        },
        Some(serde_json::Value::Array(values)) => TagSet {
            tags: values
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect(),
            extend_defaults: true,
            group: None,
        },
        Some(value) => serde_json::from_value(value.clone()).unwrap_or(TagSet {
            extend_defaults: true,
            ..TagSet::default()
        }),
    }
}

/// Source URL to report to the site: the per-website option wins, then the
/// submission's first source link.
pub(crate) fn source_url(submission: &Submission) -> Option<String> {
    submission
        .option_str("source")
        .map(String::from)
        .or_else(|| submission.sources.first().cloned())
}

/// Maps destination identifiers to adapter instances.
pub struct WebsiteRegistry {
    websites: HashMap<String, Arc<dyn Website>>,
}

impl WebsiteRegistry {
    pub fn new() -> Self {
        Self {
            websites: HashMap::new(),
        }
    }

    pub fn register(&mut self, website: Arc<dyn Website>) {
        self.websites.insert(website.name().to_string(), website);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Website>> {
        self.websites.get(name).cloned()
    }

    /// Registered website names, sorted for stable display.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.websites.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for WebsiteRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry holding every shipped adapter.
pub fn default_registry() -> WebsiteRegistry {
    let mut registry = WebsiteRegistry::new();
    registry.register(Arc::new(derpibooru::Derpibooru::new()));
    registry.register(Arc::new(furaffinity::FurAffinity::new()));
    registry.register(Arc::new(weasyl::Weasyl::new()));
    registry.register(Arc::new(pixiv::Pixiv::new()));
    registry
}
