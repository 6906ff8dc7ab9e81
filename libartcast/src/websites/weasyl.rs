//! Weasyl website adapter
//!
//! Multipart submit guarded by a scraped `token`; ratings are numeric
//! strings and the description dialect is Markdown. Weasyl redirects to
//! the submission view on success, so interpretation keys off `final_url`.

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

const BASE_URL: &str = "https://www.weasyl.com";
const ACCEPTED: &[&str] = &["jpeg", "jpg", "png", "gif"];
const SHORTCUTS: &[UsernameShortcut] = &[UsernameShortcut {
    key: "ws",
    url: "https://www.weasyl.com/~$1",
}];

pub struct Weasyl {
    constraints: FileConstraints,
}

impl Weasyl {
    pub fn new() -> Self {
        Self {
            constraints: FileConstraints::new(ACCEPTED, mb_to_bytes(10)),
        }
    }
}

impl Default for Weasyl {
    fn default() -> Self {
        Self::new()
    }
}

fn username_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"<a id="username"[^>]*>(.*?)</a>"#).expect("username pattern"))
}

fn submission_page_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/submissions?/\d+").expect("submission page pattern"))
}

#[async_trait]
impl Website for Weasyl {
    fn name(&self) -> &'static str {
        "weasyl"
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
            "folder": null,
            "critique": false,
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
            &format!("{}/messages/notifications", BASE_URL),
            "signout",
            username_re(),
        )
        .await
    }

    fn map_rating(&self, rating: Rating) -> &'static str {
        match rating {
            Rating::General => "10",
            Rating::Mature => "30",
            Rating::Adult | Rating::Extreme => "40",
        }
    }

    fn postprocess_description(&self, text: &str) -> String {
        description::to_markdown(text)
    }

    fn validate(&self, submission: &Submission) -> ValidationReport {
        let mut report = ValidationReport::new();

        let policy = TagPolicy::counted(2, None);
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
        let critique = submission.option_bool("critique", false);

        let mut fields = vec![
            PlanField::captured("token", "token"),
            PlanField::primary_file("submitfile"),
            PlanField::text("title", submission.title.clone()),
            PlanField::text("content", self.render_description(submission)),
            PlanField::text(
                "tags",
                tags::replace_spaces(&effective_tags(submission), "_").join(" "),
            ),
            PlanField::text("rating", self.map_rating(submission.rating)),
            PlanField::text("subtype", "visual"),
        ];
        if critique {
            fields.push(PlanField::text("critique", "1"));
        }
        if let Some(folder) = submission.option_str("folder") {
            fields.push(PlanField::text("folderid", folder.to_string()));
        }

        Ok(PostPlan::new()
            .fetch(
                format!("{}/submit/visual", BASE_URL),
                vec![FormCapture::hidden_input("token")],
            )
            .submit(
                format!("{}/submit/visual", BASE_URL),
                PayloadEncoding::MultipartForm,
                fields,
            ))
    }

    fn interpret_response(
        &self,
        response: &HttpResponse,
    ) -> std::result::Result<String, WebsiteError> {
        if submission_page_re().is_match(&response.final_url) {
            return Ok(response.final_url.clone());
        }
        if response.body.contains("This page contains errors") {
            return Err(WebsiteError::Interpretation(
                "Weasyl reported form errors".to_string(),
            ));
        }
        Err(WebsiteError::Interpretation(format!(
            "No redirect to a submission page (landed on {})",
            response.final_url
        )))
    }
}
