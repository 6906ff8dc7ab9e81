//! FurAffinity website adapter
//!
//! Classic form-driven site: every POST must echo back the per-session
//! form `key` scraped from the submit page. Success is signalled by a
//! redirect carrying the `upload-successful` marker, not by status codes.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;

use crate::accounts::AccountId;
use crate::description::{self, UsernameShortcut};
use crate::error::{Result, WebsiteError};
use crate::files::{check_file, mb_to_bytes, FileConstraints, ImageScaleProbe};
use crate::tags::{self, TagPolicy};
use crate::transport::{HttpResponse, SessionTransport};
use crate::types::{Rating, Submission, ValidationReport};
use crate::websites::{
    effective_tags, marker_login_check, FormCapture, LoginStatus, PayloadEncoding, PlanField,
    PostPlan, Website,
};

const BASE_URL: &str = "https://www.furaffinity.net";
const ACCEPTED: &[&str] = &["jpeg", "jpg", "png", "gif"];
const SHORTCUTS: &[UsernameShortcut] = &[UsernameShortcut {
    key: "fa",
    url: "https://www.furaffinity.net/user/$1",
}];

pub struct FurAffinity {
    constraints: FileConstraints,
}

impl FurAffinity {
    pub fn new() -> Self {
        Self {
            constraints: FileConstraints::new(ACCEPTED, mb_to_bytes(10)),
        }
    }

    /// Keywords field is space-delimited, so spaces inside tags become
    /// underscores.
    fn keywords(&self, submission: &Submission) -> String {
        tags::replace_spaces(&effective_tags(submission), "_").join(" ")
    }
}

impl Default for FurAffinity {
    fn default() -> Self {
        Self::new()
    }
}

fn username_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"<a id="my-username"[^>]*>[~]?(.*?)</a>"#).expect("username pattern"))
}

#[async_trait]
impl Website for FurAffinity {
    fn name(&self) -> &'static str {
        "furaffinity"
    }

    fn base_url(&self) -> &'static str {
        BASE_URL
    }

    fn accepted_file_types(&self) -> &'static [&'static str] {
        ACCEPTED
    }

    fn size_limit(&self) -> u64 {
        self.constraints.max_bytes
    }

    fn default_options(&self) -> serde_json::Value {
        serde_json::json!({
            "category": "1",
            "species": "1",
            "gender": "0",
            "scraps": false,
            "autoscale": true,
        })
    }

    fn username_shortcuts(&self) -> &'static [UsernameShortcut] {
        SHORTCUTS
    }

    async fn check_login_status(
        &self,
        transport: &SessionTransport,
        account: &AccountId,
    ) -> Result<LoginStatus> {
        marker_login_check(
            transport,
            account,
            BASE_URL,
            "log-out",
            username_re(),
        )
        .await
    }

    fn map_rating(&self, rating: Rating) -> &'static str {
        // FA's vocabulary: 0 = General, 1 = Adult, 2 = Mature
        match rating {
            Rating::General => "0",
            Rating::Mature => "2",
            Rating::Adult | Rating::Extreme => "1",
        }
    }

    fn postprocess_description(&self, text: &str) -> String {
        description::to_bbcode(text)
    }

    fn validate(&self, submission: &Submission) -> ValidationReport {
        let mut report = ValidationReport::new();

        // Keywords field caps out around 500 characters server-side
        let policy = TagPolicy::joined(1, 500);
        report.merge(tags::validate(&effective_tags(submission), &policy));

        report.merge(check_file(
            &submission.primary,
            &self.constraints,
            submission.autoscale_allowed(),
            &ImageScaleProbe,
        ));

        if submission.title.trim().is_empty() {
            report.problem("Requires a title.");
        }

        report
    }

    fn build_post_plan(
        &self,
        submission: &Submission,
    ) -> std::result::Result<PostPlan, WebsiteError> {
        let scraps = submission.option_bool("scraps", false);

        let fields = vec![
            PlanField::captured("key", "key"),
            PlanField::text("submission_type", "submission"),
            PlanField::primary_file("submission"),
            PlanField::text("title", submission.title.clone()),
            PlanField::text("message", self.render_description(submission)),
            PlanField::text("keywords", self.keywords(submission)),
            PlanField::text("rating", self.map_rating(submission.rating)),
            PlanField::text(
                "cat",
                submission
                    .option_str("category")
                    .unwrap_or("1")
                    .to_string(),
            ),
            PlanField::text(
                "atype",
                submission.option_str("species").unwrap_or("1").to_string(),
            ),
            PlanField::text(
                "gender",
                submission.option_str("gender").unwrap_or("0").to_string(),
            ),
            PlanField::text("scrap", if scraps { "1" } else { "0" }),
        ];

        Ok(PostPlan::new()
            .fetch(
                format!("{}/submit/", BASE_URL),
                vec![FormCapture::hidden_input("key")],
            )
            .submit(
                format!("{}/submit/upload/", BASE_URL),
                PayloadEncoding::MultipartForm,
                fields,
            ))
    }

    fn interpret_response(
        &self,
        response: &HttpResponse,
    ) -> std::result::Result<String, WebsiteError> {
        if response.final_url.contains("upload-successful") {
            return Ok(response.final_url.clone());
        }
        if response.body.contains("Security code missing or invalid") {
            return Err(WebsiteError::Interpretation(
                "Form key was rejected; the session may have rotated".to_string(),
            ));
        }
        Err(WebsiteError::Interpretation(format!(
            "No upload confirmation (landed on {})",
            response.final_url
        )))
    }
}
