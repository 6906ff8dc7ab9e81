//! Account-scoped HTTP session transport
//!
//! Every request a website adapter makes goes through [`SessionTransport`],
//! which injects the owning account's cookies for the request origin,
//! applies the process-wide user agent, and captures transport failures
//! into the response value instead of raising them. The actual wire call
//! sits behind the [`HttpExecutor`] trait so tests can script it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::accounts::{AccountId, Cookie, CookieStore};
use crate::error::{ArtcastError, Result};

pub const DEFAULT_USER_AGENT: &str = concat!("artcast/", env!("CARGO_PKG_VERSION"));

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Body encodings a destination may require.
#[derive(Debug, Clone)]
pub enum RequestBody {
    Raw(Vec<u8>),
    Form(Vec<(String, String)>),
    Multipart(Vec<MultipartField>),
    Json(serde_json::Value),
}

#[derive(Debug, Clone)]
pub struct MultipartField {
    pub name: String,
    pub value: MultipartValue,
}

impl MultipartField {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: MultipartValue::Text(value.into()),
        }
    }

    pub fn file(
        name: impl Into<String>,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            value: MultipartValue::File {
                file_name: file_name.into(),
                mime_type: mime_type.into(),
                data,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub enum MultipartValue {
    Text(String),
    File {
        file_name: String,
        mime_type: String,
        data: Vec<u8>,
    },
}

/// A fully assembled request, ready for an executor.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

/// Per-call knobs. `cookies` overrides the store-derived `Cookie` header;
/// `skip_cookies` suppresses cookie injection entirely.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: Vec<(String, String)>,
    pub cookies: Option<String>,
    pub skip_cookies: bool,
}

/// What came back. Transport failures land in `error` rather than being
/// raised, so callers always inspect `{body, error}` uniformly.
/// `final_url` reflects the URL after redirects; several sites signal
/// success only through the redirect target.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
    pub final_url: String,
    pub set_cookies: Vec<Cookie>,
    pub error: Option<String>,
}

impl HttpResponse {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn failure(url: &str, error: impl Into<String>) -> Self {
        Self {
            status: 0,
            body: String::new(),
            final_url: url.to_string(),
            set_cookies: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// The generic HTTP execution primitive the transport is built on.
#[async_trait]
pub trait HttpExecutor: Send + Sync {
    async fn execute(&self, request: PreparedRequest) -> HttpResponse;
}

/// Production executor backed by a single shared `reqwest` client.
pub struct ReqwestExecutor {
    client: reqwest::Client,
}

impl ReqwestExecutor {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| ArtcastError::Http(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpExecutor for ReqwestExecutor {
    async fn execute(&self, request: PreparedRequest) -> HttpResponse {
        let url = request.url.clone();

        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        if let Some(body) = request.body {
            builder = match body {
                RequestBody::Raw(bytes) => builder.body(bytes),
                RequestBody::Form(pairs) => builder.form(&pairs),
                RequestBody::Json(value) => builder.json(&value),
                RequestBody::Multipart(fields) => {
                    let mut form = reqwest::multipart::Form::new();
                    for field in fields {
                        match field.value {
                            MultipartValue::Text(text) => {
                                form = form.text(field.name, text);
                            }
                            MultipartValue::File {
                                file_name,
                                mime_type,
                                data,
                            } => {
                                let part = reqwest::multipart::Part::bytes(data)
                                    .file_name(file_name);
                                let part = match part.mime_str(&mime_type) {
                                    Ok(part) => part,
                                    Err(e) => {
                                        return HttpResponse::failure(
                                            &url,
                                            format!(
                                                "Invalid MIME type '{}': {}",
                                                mime_type, e
                                            ),
                                        );
                                    }
                                };
                                form = form.part(field.name, part);
                            }
                        }
                    }
                    builder.multipart(form)
                }
            };
        }

        match builder.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let final_url = response.url().to_string();
                let set_cookies = response
                    .headers()
                    .get_all(reqwest::header::SET_COOKIE)
                    .iter()
                    .filter_map(|v| v.to_str().ok())
                    .filter_map(Cookie::parse_set_cookie)
                    .collect();

                match response.text().await {
                    Ok(body) => HttpResponse {
                        status,
                        body,
                        final_url,
                        set_cookies,
                        error: None,
                    },
                    Err(e) => HttpResponse {
                        status,
                        body: String::new(),
                        final_url,
                        set_cookies,
                        error: Some(format!("Failed to read response body: {}", e)),
                    },
                }
            }
            Err(e) => HttpResponse::failure(&url, e.to_string()),
        }
    }
}

/// The origin (scheme://host[:port]) cookies are scoped to.
pub fn origin_of(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(parsed) => {
            let mut origin = format!("{}://{}", parsed.scheme(), parsed.host_str().unwrap_or(""));
            if let Some(port) = parsed.port() {
                origin.push_str(&format!(":{}", port));
            }
            origin
        }
        Err(_) => url.to_string(),
    }
}

/// Issues authenticated GET/POST requests scoped to one account identity.
///
/// Constructed once at startup and injected into the orchestrator and
/// adapters; holds no per-request state of its own.
pub struct SessionTransport {
    executor: Arc<dyn HttpExecutor>,
    cookies: Arc<CookieStore>,
}

impl SessionTransport {
    /// Build a transport over the production reqwest executor.
    pub fn new(
        cookies: Arc<CookieStore>,
        user_agent: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let executor = ReqwestExecutor::new(
            user_agent.unwrap_or(DEFAULT_USER_AGENT),
            timeout.unwrap_or(DEFAULT_TIMEOUT),
        )?;
        Ok(Self::with_executor(Arc::new(executor), cookies))
    }

    /// Build a transport over a caller-supplied executor (tests, custom
    /// stacks).
    pub fn with_executor(executor: Arc<dyn HttpExecutor>, cookies: Arc<CookieStore>) -> Self {
        Self { executor, cookies }
    }

    pub fn cookie_store(&self) -> &Arc<CookieStore> {
        &self.cookies
    }

    pub async fn get(
        &self,
        url: &str,
        account: &AccountId,
        options: RequestOptions,
    ) -> HttpResponse {
        let headers = self.assemble_headers(url, account, options);
        debug!(url, account = %account, "GET");
        self.executor
            .execute(PreparedRequest {
                method: Method::Get,
                url: url.to_string(),
                headers,
                body: None,
            })
            .await
    }

    pub async fn post(
        &self,
        url: &str,
        account: &AccountId,
        options: RequestOptions,
        body: RequestBody,
    ) -> HttpResponse {
        let headers = self.assemble_headers(url, account, options);
        debug!(url, account = %account, "POST");
        self.executor
            .execute(PreparedRequest {
                method: Method::Post,
                url: url.to_string(),
                headers,
                body: Some(body),
            })
            .await
    }

    /// Commit cookies observed on a response to the account's store entry
    /// for the URL's origin. Callers invoke this after confirming a login
    /// succeeded; it is never done automatically per response.
    pub fn persist_cookies(&self, account: &AccountId, url: &str, cookies: &[Cookie]) {
        self.cookies.store(account, &origin_of(url), cookies);
    }

    fn assemble_headers(
        &self,
        url: &str,
        account: &AccountId,
        options: RequestOptions,
    ) -> Vec<(String, String)> {
        let mut headers = options.headers;
        if !options.skip_cookies {
            let value = match options.cookies {
                Some(explicit) => explicit,
                None => self.cookies.header_value(account, &origin_of(url)),
            };
            if !value.is_empty() {
                headers.push(("Cookie".to_string(), value));
            }
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Executor that records every request and replays canned responses.
    struct ScriptedExecutor {
        requests: Mutex<Vec<PreparedRequest>>,
        responses: Mutex<Vec<HttpResponse>>,
    }

    impl ScriptedExecutor {
        fn new(responses: Vec<HttpResponse>) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                responses: Mutex::new(responses),
            }
        }

        fn requests(&self) -> Vec<PreparedRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpExecutor for ScriptedExecutor {
        async fn execute(&self, request: PreparedRequest) -> HttpResponse {
            let url = request.url.clone();
            self.requests.lock().unwrap().push(request);
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                ok_response(&url, "")
            } else {
                responses.remove(0)
            }
        }
    }

    fn ok_response(url: &str, body: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            body: body.to_string(),
            final_url: url.to_string(),
            set_cookies: Vec::new(),
            error: None,
        }
    }

    fn transport_with(
        executor: Arc<ScriptedExecutor>,
    ) -> (SessionTransport, Arc<CookieStore>) {
        let store = Arc::new(CookieStore::new());
        (
            SessionTransport::with_executor(executor, store.clone()),
            store,
        )
    }

    fn cookie_header(request: &PreparedRequest) -> Option<String> {
        request
            .headers
            .iter()
            .find(|(name, _)| name == "Cookie")
            .map(|(_, value)| value.clone())
    }

    #[test]
    fn test_origin_of() {
        assert_eq!(
            origin_of("https://derpibooru.org/images/new?a=1"),
            "https://derpibooru.org"
        );
        assert_eq!(
            origin_of("http://localhost:8080/path"),
            "http://localhost:8080"
        );
        assert_eq!(origin_of("not a url"), "not a url");
    }

    #[tokio::test]
    async fn test_get_injects_stored_cookies_for_origin() {
        let executor = Arc::new(ScriptedExecutor::new(vec![]));
        let (transport, store) = transport_with(executor.clone());
        let account = AccountId::from("acct");

        store.store(
            &account,
            "https://example.com",
            &[Cookie::new("session", "abc"), Cookie::new("csrf", "x")],
        );

        transport
            .get("https://example.com/page", &account, RequestOptions::default())
            .await;

        let requests = executor.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            cookie_header(&requests[0]).as_deref(),
            Some("session=abc; csrf=x")
        );
    }

    #[tokio::test]
    async fn test_cookies_not_injected_for_other_origin() {
        let executor = Arc::new(ScriptedExecutor::new(vec![]));
        let (transport, store) = transport_with(executor.clone());
        let account = AccountId::from("acct");

        store.store(&account, "https://example.com", &[Cookie::new("s", "1")]);

        transport
            .get("https://other.example/page", &account, RequestOptions::default())
            .await;

        assert_eq!(cookie_header(&executor.requests()[0]), None);
    }

    #[tokio::test]
    async fn test_explicit_cookies_override_store() {
        let executor = Arc::new(ScriptedExecutor::new(vec![]));
        let (transport, store) = transport_with(executor.clone());
        let account = AccountId::from("acct");

        store.store(&account, "https://example.com", &[Cookie::new("s", "1")]);

        let options = RequestOptions {
            cookies: Some("s=override".to_string()),
            ..Default::default()
        };
        transport
            .get("https://example.com/page", &account, options)
            .await;

        assert_eq!(
            cookie_header(&executor.requests()[0]).as_deref(),
            Some("s=override")
        );
    }

    #[tokio::test]
    async fn test_skip_cookies() {
        let executor = Arc::new(ScriptedExecutor::new(vec![]));
        let (transport, store) = transport_with(executor.clone());
        let account = AccountId::from("acct");

        store.store(&account, "https://example.com", &[Cookie::new("s", "1")]);

        let options = RequestOptions {
            skip_cookies: true,
            ..Default::default()
        };
        transport
            .get("https://example.com/page", &account, options)
            .await;

        assert_eq!(cookie_header(&executor.requests()[0]), None);
    }

    #[tokio::test]
    async fn test_persist_cookies_feeds_next_request() {
        let executor = Arc::new(ScriptedExecutor::new(vec![]));
        let (transport, _store) = transport_with(executor.clone());
        let account = AccountId::from("acct");

        // Simulate a login check that observed Set-Cookie values and
        // confirmed success.
        transport.persist_cookies(
            &account,
            "https://example.com/login",
            &[Cookie::new("session", "fresh")],
        );

        transport
            .get("https://example.com/submit", &account, RequestOptions::default())
            .await;

        assert_eq!(
            cookie_header(&executor.requests()[0]).as_deref(),
            Some("session=fresh")
        );
    }

    #[tokio::test]
    async fn test_post_carries_body_and_extra_headers() {
        let executor = Arc::new(ScriptedExecutor::new(vec![]));
        let (transport, _store) = transport_with(executor.clone());
        let account = AccountId::from("acct");

        let options = RequestOptions {
            headers: vec![("X-Requested-With".to_string(), "XMLHttpRequest".to_string())],
            ..Default::default()
        };
        transport
            .post(
                "https://example.com/api",
                &account,
                options,
                RequestBody::Form(vec![("q".to_string(), "1".to_string())]),
            )
            .await;

        let requests = executor.requests();
        assert_eq!(requests[0].method, Method::Post);
        assert!(matches!(requests[0].body, Some(RequestBody::Form(_))));
        assert!(requests[0]
            .headers
            .iter()
            .any(|(name, value)| name == "X-Requested-With" && value == "XMLHttpRequest"));
    }

    #[tokio::test]
    async fn test_failure_response_is_a_value_not_a_panic() {
        let executor = Arc::new(ScriptedExecutor::new(vec![HttpResponse::failure(
            "https://example.com",
            "connection refused",
        )]));
        let (transport, _store) = transport_with(executor);
        let account = AccountId::from("acct");

        let response = transport
            .get("https://example.com", &account, RequestOptions::default())
            .await;

        assert!(!response.is_ok());
        assert_eq!(response.error.as_deref(), Some("connection refused"));
        assert_eq!(response.status, 0);
    }
}
