//! Derpibooru website adapter
//!
//! Philomena-engine booru. The upload form is protected by a Rails
//! `authenticity_token`, so the plan scrapes the new-image page before the
//! multipart submit. The rating is not a form field: it is a required tag
//! injected into the tag list.

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
    effective_tags, marker_login_check, source_url, FormCapture, LoginStatus, PayloadEncoding,
    PlanField, PostPlan, Website,
};

const BASE_URL: &str = "https://derpibooru.org";
const ACCEPTED: &[&str] = &["jpeg", "jpg", "png", "svg", "gif", "webm"];
const SHORTCUTS: &[UsernameShortcut] = &[UsernameShortcut {
    key: "db",
    url: "https://derpibooru.org/profiles/$1",
}];

pub struct Derpibooru {
    constraints: FileConstraints,
}

impl Derpibooru {
    pub fn new() -> Self {
        Self {
            constraints: FileConstraints::new(ACCEPTED, mb_to_bytes(100)),
        }
    }

    /// The full tag list sent to the site: effective tags plus the rating
    /// tag, if the user did not already include it.
    fn tag_input(&self, submission: &Submission) -> Vec<String> {
        let mut list = effective_tags(submission);
        let rating_tag = self.map_rating(submission.rating).to_string();
        if !list.contains(&rating_tag) {
            list.push(rating_tag);
        }
        list
    }
}

impl Default for Derpibooru {
    fn default() -> Self {
        Self::new()
    }
}

fn username_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"data-user-name="(.*?)""#).expect("username pattern"))
}

fn image_page_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/images/\d+").expect("image page pattern"))
}

#[async_trait]
impl Website for Derpibooru {
    fn name(&self) -> &'static str {
        "derpibooru"
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
            "source": null,
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
        marker_login_check(transport, account, BASE_URL, "Logout", username_re()).await
    }

    fn map_rating(&self, rating: Rating) -> &'static str {
        match rating {
            Rating::General => "safe",
            Rating::Mature => "questionable",
            Rating::Adult | Rating::Extreme => "explicit",
        }
    }

    fn postprocess_description(&self, text: &str) -> String {
        description::to_textile(text)
    }

    fn validate(&self, submission: &Submission) -> ValidationReport {
        let mut report = ValidationReport::new();

        let policy = TagPolicy::counted(3, None);
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
        if !submission.additional.is_empty() {
            return Err(WebsiteError::Unsupported(
                "Derpibooru takes a single image per submission".to_string(),
            ));
        }

        let fields = vec![
            PlanField::captured("authenticity_token", "authenticity_token"),
            PlanField::text("_method", "post"),
            PlanField::text("image[tag_input]", self.tag_input(submission).join(", ")),
            PlanField::primary_file("image[image]"),
            PlanField::text("image[description]", self.render_description(submission)),
            PlanField::text(
                "image[source_url]",
                source_url(submission).unwrap_or_default(),
            ),
        ];

        Ok(PostPlan::new()
            .fetch(
                format!("{}/images/new", BASE_URL),
                vec![FormCapture::hidden_input("authenticity_token")],
            )
            .submit(
                format!("{}/images", BASE_URL),
                PayloadEncoding::MultipartForm,
                fields,
            ))
    }

    fn interpret_response(
        &self,
        response: &HttpResponse,
    ) -> std::result::Result<String, WebsiteError> {
        if response.status >= 400 {
            return Err(WebsiteError::Interpretation(format!(
                "Upload rejected with HTTP {}",
                response.status
            )));
        }
        if image_page_re().is_match(&response.final_url) {
            return Ok(response.final_url.clone());
        }
        Err(WebsiteError::Interpretation(
            "Expected a redirect to the new image page".to_string(),
        ))
    }
}
