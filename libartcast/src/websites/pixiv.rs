//! Pixiv website adapter
//!
//! The upload endpoint is an ajax API: the CSRF token is embedded in the
//! page markup rather than a form input, the response is JSON, and the
//! maturity scale is binary (all-ages vs. R-18).

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;

use crate::accounts::AccountId;
use crate::description::UsernameShortcut;
use crate::error::{Result, WebsiteError};
use crate::files::{check_file, mb_to_bytes, FileConstraints, ImageScaleProbe};
use crate::tags::{self, TagPolicy};
use crate::transport::{HttpResponse, SessionTransport};
use crate::types::{Rating, Submission, ValidationReport};
use crate::websites::{
    effective_tags, marker_login_check, FormCapture, LoginStatus, PayloadEncoding, PlanField,
    PostPlan, Website,
};

const BASE_URL: &str = "https://www.pixiv.net";
const ACCEPTED: &[&str] = &["jpeg", "jpg", "png", "gif"];
const MAX_TAGS: usize = 10;
const SHORTCUTS: &[UsernameShortcut] = &[UsernameShortcut {
    key: "px",
    url: "https://www.pixiv.net/users/$1",
}];

pub struct Pixiv {
    constraints: FileConstraints,
}

impl Pixiv {
    pub fn new() -> Self {
        Self {
            constraints: FileConstraints::new(ACCEPTED, mb_to_bytes(32)),
        }
    }
}

impl Default for Pixiv {
    fn default() -> Self {
        Self::new()
    }
}

fn username_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""userName":"(.*?)""#).expect("username pattern"))
}

#[derive(Debug, Deserialize)]
struct AjaxResponse {
    error: bool,
    message: Option<String>,
    body: Option<AjaxBody>,
}

#[derive(Debug, Deserialize)]
struct AjaxBody {
    id: Option<String>,
}

#[async_trait]
impl Website for Pixiv {
    fn name(&self) -> &'static str {
        "pixiv"
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
            "original": true,
            "ai_generated": false,
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
            "logout.php",
            username_re(),
        )
        .await
    }

    fn map_rating(&self, rating: Rating) -> &'static str {
        // Binary scale: everything past all-ages is R-18
        match rating {
            Rating::General => "0",
            Rating::Mature | Rating::Adult | Rating::Extreme => "1",
        }
    }

    fn validate(&self, submission: &Submission) -> ValidationReport {
        let mut report = ValidationReport::new();

        let policy = TagPolicy::counted(1, Some(MAX_TAGS));
        report.merge(tags::validate(&effective_tags(submission), &policy));

        report.merge(check_file(
            &submission.primary,
            &self.constraints,
            submission.autoscale_allowed(),
            &ImageScaleProbe,
        ));

        report
    }

    fn build_post_plan(
        &self,
        submission: &Submission,
    ) -> std::result::Result<PostPlan, WebsiteError> {
        let tag_list: Vec<String> = effective_tags(submission)
            .into_iter()
            .take(MAX_TAGS)
            .collect();

        let mut fields = vec![
            PlanField::captured("tt", "tt"),
            PlanField::primary_file("files[]"),
            PlanField::text("title", submission.title.clone()),
            PlanField::text("comment", self.render_description(submission)),
            PlanField::text("tags", tag_list.join(" ")),
            PlanField::text("x_restrict", self.map_rating(submission.rating)),
            PlanField::text(
                "original",
                if submission.option_bool("original", true) {
                    "true"
                } else {
                    "false"
                },
            ),
        ];
        for (index, _) in submission.additional.iter().enumerate() {
            fields.push(PlanField::additional_file("files[]", index));
        }

        Ok(PostPlan::new()
            .fetch(
                format!("{}/illustration/create", BASE_URL),
                // The token lives in an embedded JSON blob, not a form input
                vec![FormCapture::new("tt", r#""token":"([0-9a-f]+)""#)],
            )
            .submit(
                format!("{}/ajax/work/create/illustration", BASE_URL),
                PayloadEncoding::MultipartForm,
                fields,
            ))
    }

    fn interpret_response(
        &self,
        response: &HttpResponse,
    ) -> std::result::Result<String, WebsiteError> {
        let parsed: AjaxResponse = serde_json::from_str(&response.body).map_err(|e| {
            WebsiteError::Interpretation(format!("Response was not the expected JSON: {}", e))
        })?;

        if parsed.error {
            return Err(WebsiteError::Interpretation(
                parsed
                    .message
                    .unwrap_or_else(|| "Pixiv reported an unspecified error".to_string()),
            ));
        }

        match parsed.body.and_then(|b| b.id) {
            Some(id) => Ok(format!("{}/artworks/{}", BASE_URL, id)),
            None => Err(WebsiteError::Interpretation(
                "Accepted but no work id returned".to_string(),
            )),
        }
    }
}
