//! Mock website implementation for testing
//!
//! A configurable stand-in used to exercise orchestrator logic (rejection,
//! retry, fan-out) without real destinations. Kept in the normal build so
//! integration tests can use it.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::accounts::AccountId;
use crate::error::{Result, WebsiteError};
use crate::transport::{HttpResponse, SessionTransport};
use crate::types::{Rating, Submission, ValidationReport};
use crate::websites::{LoginStatus, PayloadEncoding, PostPlan, Website};

/// Behavior knobs for [`MockWebsite`].
pub struct MockConfig {
    /// Website name used in results
    pub name: &'static str,

    /// Report returned by `validate`
    pub validation: ValidationReport,

    /// Error returned by `build_post_plan` instead of a plan
    pub plan_error: Option<WebsiteError>,

    /// Plan returned by `build_post_plan`
    pub plan: PostPlan,

    /// Scripted `interpret_response` outcomes, consumed front to back;
    /// when exhausted, interpretation succeeds with a fixed location
    pub interpretations: Vec<std::result::Result<String, WebsiteError>>,

    /// Whether `check_login_status` reports a live session
    pub logged_in: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: "mock",
            validation: ValidationReport::new(),
            plan_error: None,
            plan: PostPlan::new().submit(
                "https://mock.example/post",
                PayloadEncoding::UrlEncodedForm,
                Vec::new(),
            ),
            interpretations: Vec::new(),
            logged_in: true,
        }
    }
}

/// Mock website for testing
pub struct MockWebsite {
    config: MockConfig,
    interpretations: Mutex<Vec<std::result::Result<String, WebsiteError>>>,
    validate_calls: Arc<Mutex<usize>>,
    build_calls: Arc<Mutex<usize>>,
    interpret_calls: Arc<Mutex<usize>>,
}

impl MockWebsite {
    pub fn new(mut config: MockConfig) -> Self {
        let interpretations = std::mem::take(&mut config.interpretations);
        Self {
            config,
            interpretations: Mutex::new(interpretations),
            validate_calls: Arc::new(Mutex::new(0)),
            build_calls: Arc::new(Mutex::new(0)),
            interpret_calls: Arc::new(Mutex::new(0)),
        }
    }

    /// A mock that validates cleanly and accepts every post.
    pub fn accepting(name: &'static str) -> Self {
        Self::new(MockConfig {
            name,
            ..Default::default()
        })
    }

    /// A mock whose validation reports the given blocking problem.
    pub fn rejecting(name: &'static str, problem: &str) -> Self {
        let mut validation = ValidationReport::new();
        validation.problem(problem);
        Self::new(MockConfig {
            name,
            validation,
            ..Default::default()
        })
    }

    /// A mock whose plan building fails outright.
    pub fn unsupported(name: &'static str, message: &str) -> Self {
        Self::new(MockConfig {
            name,
            plan_error: Some(WebsiteError::Unsupported(message.to_string())),
            ..Default::default()
        })
    }

    /// A mock whose interpretations follow the given script.
    pub fn scripted(
        name: &'static str,
        interpretations: Vec<std::result::Result<String, WebsiteError>>,
    ) -> Self {
        Self::new(MockConfig {
            name,
            interpretations,
            ..Default::default()
        })
    }

    pub fn validate_calls(&self) -> usize {
        *self.validate_calls.lock().unwrap()
    }

    pub fn build_calls(&self) -> usize {
        *self.build_calls.lock().unwrap()
    }

    pub fn interpret_calls(&self) -> usize {
        *self.interpret_calls.lock().unwrap()
    }
}

#[async_trait]
impl Website for MockWebsite {
    fn name(&self) -> &'static str {
        self.config.name
    }

    fn base_url(&self) -> &'static str {
        "https://mock.example"
    }

    fn accepted_file_types(&self) -> &'static [&'static str] {
        &["jpeg", "jpg", "png"]
    }

    fn size_limit(&self) -> u64 {
        crate::files::mb_to_bytes(100)
    }

    async fn check_login_status(
        &self,
        _transport: &SessionTransport,
        _account: &AccountId,
    ) -> Result<LoginStatus> {
        let logged_in = self.config.logged_in;
        Ok(LoginStatus {
            logged_in,
            username: logged_in.then(|| "mock-user".to_string()),
        })
    }

    fn map_rating(&self, rating: Rating) -> &'static str {
        match rating {
            Rating::General => "safe",
            Rating::Mature => "questionable",
            Rating::Adult | Rating::Extreme => "explicit",
        }
    }

    fn validate(&self, _submission: &Submission) -> ValidationReport {
        *self.validate_calls.lock().unwrap() += 1;
        self.config.validation.clone()
    }

    fn build_post_plan(
        &self,
        _submission: &Submission,
    ) -> std::result::Result<PostPlan, WebsiteError> {
        *self.build_calls.lock().unwrap() += 1;
        if let Some(error) = &self.config.plan_error {
            return Err(error.clone());
        }
        Ok(self.config.plan.clone())
    }

    fn interpret_response(
        &self,
        response: &HttpResponse,
    ) -> std::result::Result<String, WebsiteError> {
        *self.interpret_calls.lock().unwrap() += 1;
        let mut scripted = self.interpretations.lock().unwrap();
        if scripted.is_empty() {
            Ok(format!("https://mock.example/view/{}", response.status))
        } else {
            scripted.remove(0)
        }
    }
}
