//! Multi-website posting orchestration
//!
//! Drives one submission through validate → build → send → interpret for
//! each destination, with one automatic re-run of the network sequence on
//! retryable failures, and fans out across destinations concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use regex::Regex;
use tracing::{info, warn};

use crate::accounts::AccountId;
use crate::error::WebsiteError;
use crate::transport::{
    HttpResponse, MultipartField, RequestBody, RequestOptions, SessionTransport,
};
use crate::types::{PostResult, Submission, SubmissionFile};
use crate::websites::{
    FieldValue, FileRef, PayloadEncoding, PlanField, PlanStep, PostPlan, Website,
};

/// One destination of a fan-out: a website plus the account to post under.
#[derive(Clone)]
pub struct PostTarget {
    pub website: Arc<dyn Website>,
    pub account: AccountId,
}

impl PostTarget {
    pub fn new(website: Arc<dyn Website>, account: AccountId) -> Self {
        Self { website, account }
    }
}

/// Orchestrates post attempts. Holds only the injected transport; every
/// attempt's state lives on the stack, so attempts are independent and may
/// run concurrently.
pub struct Poster {
    transport: Arc<SessionTransport>,
}

impl Poster {
    pub fn new(transport: Arc<SessionTransport>) -> Self {
        Self { transport }
    }

    /// Post one submission to one website under one account.
    ///
    /// Validation problems reject the submission before any network
    /// access. A retryable failure of the build/send/interpret sequence is
    /// re-run exactly once; whatever the second attempt yields is final.
    pub async fn post(
        &self,
        website: &dyn Website,
        submission: &Submission,
        account: &AccountId,
    ) -> PostResult {
        let name = website.name();

        let report = website.validate(submission);
        if report.is_blocked() {
            info!(
                website = name,
                problems = report.problems.len(),
                "Submission rejected during validation"
            );
            return PostResult::rejected(name, &report.problems);
        }
        for warning in &report.warnings {
            warn!(website = name, "{}", warning);
        }

        match self.attempt(website, submission, account).await {
            Ok(location) => {
                info!(website = name, location = %location, "Posted");
                PostResult::succeeded(name, Some(location))
            }
            Err(first) if first.is_retryable() => {
                warn!(website = name, error = %first, "Post failed, retrying once");
                match self.attempt(website, submission, account).await {
                    Ok(location) => {
                        info!(website = name, location = %location, "Posted on second attempt");
                        PostResult::succeeded(name, Some(location))
                    }
                    Err(second) => {
                        warn!(website = name, error = %second, "Retry failed");
                        PostResult::failed(name, second.to_string())
                    }
                }
            }
            Err(error) => {
                warn!(website = name, error = %error, "Post failed");
                PostResult::failed(name, error.to_string())
            }
        }
    }

    /// Post one submission to many destinations concurrently. A slow or
    /// failing destination never delays the others, and every in-flight
    /// attempt still runs interpretation once its network call resolves.
    pub async fn post_to_all(
        &self,
        submission: &Submission,
        targets: &[PostTarget],
    ) -> Vec<PostResult> {
        let futures: Vec<_> = targets
            .iter()
            .map(|target| self.post(target.website.as_ref(), submission, &target.account))
            .collect();
        join_all(futures).await
    }

    /// One full build/send/interpret sequence.
    async fn attempt(
        &self,
        website: &dyn Website,
        submission: &Submission,
        account: &AccountId,
    ) -> std::result::Result<String, WebsiteError> {
        let plan = website.build_post_plan(submission)?;
        let response = self.execute_plan(&plan, submission, account).await?;
        website.interpret_response(&response)
    }

    /// Run a plan's steps in order, threading captured values into later
    /// submits. The final response is what the adapter interprets.
    async fn execute_plan(
        &self,
        plan: &PostPlan,
        submission: &Submission,
        account: &AccountId,
    ) -> std::result::Result<HttpResponse, WebsiteError> {
        let mut captured: HashMap<String, String> = HashMap::new();
        let mut last: Option<HttpResponse> = None;

        for step in &plan.steps {
            match step {
                PlanStep::Fetch { url, captures } => {
                    let response = self
                        .transport
                        .get(url, account, RequestOptions::default())
                        .await;
                    if let Some(error) = &response.error {
                        return Err(WebsiteError::Transport(error.clone()));
                    }
                    for capture in captures {
                        let pattern = Regex::new(&capture.pattern).map_err(|e| {
                            WebsiteError::Unsupported(format!(
                                "Invalid capture pattern for '{}': {}",
                                capture.name, e
                            ))
                        })?;
                        let value = pattern
                            .captures(&response.body)
                            .and_then(|caps| caps.get(1))
                            .ok_or_else(|| {
                                WebsiteError::Interpretation(format!(
                                    "Could not find '{}' on {}",
                                    capture.name, url
                                ))
                            })?;
                        captured.insert(capture.name.clone(), value.as_str().to_string());
                    }
                    last = Some(response);
                }
                PlanStep::Submit {
                    url,
                    encoding,
                    fields,
                } => {
                    let body = build_body(*encoding, fields, submission, &captured)?;
                    let response = self
                        .transport
                        .post(url, account, RequestOptions::default(), body)
                        .await;
                    if let Some(error) = &response.error {
                        return Err(WebsiteError::Transport(error.clone()));
                    }
                    last = Some(response);
                }
            }
        }

        last.ok_or_else(|| WebsiteError::Unsupported("Post plan contained no steps".to_string()))
    }
}

fn resolve_file<'a>(
    submission: &'a Submission,
    file_ref: FileRef,
) -> std::result::Result<&'a SubmissionFile, WebsiteError> {
    match file_ref {
        FileRef::Primary => Ok(&submission.primary),
        FileRef::Additional(index) => submission.additional.get(index).ok_or_else(|| {
            WebsiteError::Unsupported(format!("Plan references missing additional file {}", index))
        }),
    }
}

fn resolve_text(
    field: &PlanField,
    captured: &HashMap<String, String>,
) -> std::result::Result<String, WebsiteError> {
    match &field.value {
        FieldValue::Text(value) => Ok(value.clone()),
        FieldValue::Captured(key) => captured.get(key).cloned().ok_or_else(|| {
            WebsiteError::Unsupported(format!(
                "Field '{}' references capture '{}' that no step produced",
                field.name, key
            ))
        }),
        FieldValue::File(_) => Err(WebsiteError::Unsupported(format!(
            "Field '{}' is a file, which this encoding cannot carry",
            field.name
        ))),
    }
}

/// Assemble a submit step's wire body from its field list.
fn build_body(
    encoding: PayloadEncoding,
    fields: &[PlanField],
    submission: &Submission,
    captured: &HashMap<String, String>,
) -> std::result::Result<RequestBody, WebsiteError> {
    match encoding {
        PayloadEncoding::UrlEncodedForm => {
            let mut pairs = Vec::with_capacity(fields.len());
            for field in fields {
                pairs.push((field.name.clone(), resolve_text(field, captured)?));
            }
            Ok(RequestBody::Form(pairs))
        }
        PayloadEncoding::Json => {
            let mut object = serde_json::Map::new();
            for field in fields {
                object.insert(
                    field.name.clone(),
                    serde_json::Value::String(resolve_text(field, captured)?),
                );
            }
            Ok(RequestBody::Json(serde_json::Value::Object(object)))
        }
        PayloadEncoding::MultipartForm => {
            let mut parts = Vec::with_capacity(fields.len());
            for field in fields {
                let part = match &field.value {
                    FieldValue::File(file_ref) => {
                        let file = resolve_file(submission, *file_ref)?;
                        MultipartField::file(
                            field.name.clone(),
                            file.name.clone(),
                            file.mime_type.clone(),
                            file.data.clone(),
                        )
                    }
                    _ => MultipartField::text(field.name.clone(), resolve_text(field, captured)?),
                };
                parts.push(part);
            }
            Ok(RequestBody::Multipart(parts))
        }
    }
}
