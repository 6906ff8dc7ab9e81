//! End-to-end posting pipeline tests
//!
//! Drives real adapters through the orchestrator over a scripted HTTP
//! executor: login check persists the session, the prerequisite fetch is
//! scraped for its token, and the multipart submit carries the cookies and
//! the captured value.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use libartcast::accounts::{AccountId, CookieStore};
use libartcast::poster::{PostTarget, Poster};
use libartcast::transport::{
    HttpExecutor, HttpResponse, Method, MultipartValue, PreparedRequest, RequestBody,
    SessionTransport,
};
use libartcast::types::{Rating, Submission, SubmissionFile};
use libartcast::websites::derpibooru::Derpibooru;
use libartcast::websites::mock::MockWebsite;
use libartcast::websites::Website;
use libartcast::Cookie;

struct ScriptedExecutor {
    requests: Mutex<Vec<PreparedRequest>>,
    responses: Mutex<Vec<HttpResponse>>,
}

impl ScriptedExecutor {
    fn new(responses: Vec<HttpResponse>) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            responses: Mutex::new(responses),
        })
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
            response(200, &url, "")
        } else {
            responses.remove(0)
        }
    }
}

fn response(status: u16, final_url: &str, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        body: body.to_string(),
        final_url: final_url.to_string(),
        set_cookies: Vec::new(),
        error: None,
    }
}

fn submission() -> Submission {
    let file = SubmissionFile::new(
        "pony.png".to_string(),
        "image/png".to_string(),
        vec![0u8; 128],
    );
    let mut submission = Submission::new("Sunset Flight".to_string(), file);
    submission.tags.tags = vec![
        "pony".to_string(),
        "oc".to_string(),
        "digital art".to_string(),
    ];
    submission.rating = Rating::General;
    submission.description = "<b>first flight</b>".to_string();
    submission.sources = vec!["https://example.com/original".to_string()];
    submission
}

fn cookie_header(request: &PreparedRequest) -> Option<String> {
    request
        .headers
        .iter()
        .find(|(name, _)| name == "Cookie")
        .map(|(_, value)| value.clone())
}

#[tokio::test]
async fn login_check_persists_cookies_for_later_posts() {
    let login_page = HttpResponse {
        status: 200,
        body: r#"<a data-user-name="rainpelt" href="/profiles/rainpelt">rainpelt</a> <a>Logout</a>"#
            .to_string(),
        final_url: "https://derpibooru.org/".to_string(),
        set_cookies: vec![Cookie::new("_booru_session", "s3cr3t")],
        error: None,
    };
    let form_page = response(
        200,
        "https://derpibooru.org/images/new",
        r#"<form><input type="hidden" name="authenticity_token" value="tok-42"></form>"#,
    );
    let posted = response(200, "https://derpibooru.org/images/3141592", "");

    let executor = ScriptedExecutor::new(vec![login_page, form_page, posted]);
    let transport = Arc::new(SessionTransport::with_executor(
        executor.clone(),
        Arc::new(CookieStore::new()),
    ));
    let account = AccountId::from("db-main");
    let website = Derpibooru::new();

    let status = website
        .check_login_status(&transport, &account)
        .await
        .unwrap();
    assert!(status.logged_in);
    assert_eq!(status.username.as_deref(), Some("rainpelt"));

    let poster = Poster::new(transport);
    let result = poster.post(&website, &submission(), &account).await;
    assert!(result.success, "post failed: {:?}", result.error);
    assert_eq!(
        result.location.as_deref(),
        Some("https://derpibooru.org/images/3141592")
    );

    let requests = executor.requests();
    assert_eq!(requests.len(), 3);

    // The login check itself carried no cookies yet
    assert_eq!(cookie_header(&requests[0]), None);

    // Both posting requests replay the persisted session
    assert_eq!(
        cookie_header(&requests[1]).as_deref(),
        Some("_booru_session=s3cr3t")
    );
    assert_eq!(
        cookie_header(&requests[2]).as_deref(),
        Some("_booru_session=s3cr3t")
    );

    // The submit is multipart and echoes the scraped token
    assert_eq!(requests[2].method, Method::Post);
    match requests[2].body.as_ref().unwrap() {
        RequestBody::Multipart(parts) => {
            let token = parts
                .iter()
                .find(|p| p.name == "authenticity_token")
                .expect("token part");
            assert!(matches!(
                &token.value,
                MultipartValue::Text(value) if value == "tok-42"
            ));
            let image = parts
                .iter()
                .find(|p| p.name == "image[image]")
                .expect("image part");
            assert!(matches!(
                &image.value,
                MultipartValue::File { file_name, .. } if file_name == "pony.png"
            ));
            let tags = parts
                .iter()
                .find(|p| p.name == "image[tag_input]")
                .expect("tags part");
            assert!(matches!(
                &tags.value,
                MultipartValue::Text(value) if value == "pony, oc, digital art, safe"
            ));
        }
        other => panic!("expected multipart body, got {:?}", other),
    }
}

#[tokio::test]
async fn transient_first_failure_is_retried_and_succeeds() {
    let form_page = |_: ()| {
        response(
            200,
            "https://derpibooru.org/images/new",
            r#"<input type="hidden" name="authenticity_token" value="tok">"#,
        )
    };

    let executor = ScriptedExecutor::new(vec![
        form_page(()),
        HttpResponse::failure("https://derpibooru.org/images", "connection reset by peer"),
        form_page(()),
        response(200, "https://derpibooru.org/images/101", ""),
    ]);
    let transport = Arc::new(SessionTransport::with_executor(
        executor.clone(),
        Arc::new(CookieStore::new()),
    ));
    let poster = Poster::new(transport);
    let website = Derpibooru::new();

    let result = poster
        .post(&website, &submission(), &AccountId::from("db-main"))
        .await;

    assert!(result.success);
    // Both full plan executions went over the wire: 2 fetches + 2 submits
    assert_eq!(executor.requests().len(), 4);
}

#[tokio::test]
async fn validation_rejection_never_touches_the_network() {
    let executor = ScriptedExecutor::new(vec![]);
    let transport = Arc::new(SessionTransport::with_executor(
        executor.clone(),
        Arc::new(CookieStore::new()),
    ));
    let poster = Poster::new(transport);
    let website = Derpibooru::new();

    let mut under_tagged = submission();
    under_tagged.tags.tags = vec!["pony".to_string()];

    let result = poster
        .post(&website, &under_tagged, &AccountId::from("db-main"))
        .await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("at least 3 tags"));
    assert!(executor.requests().is_empty());
}

#[tokio::test]
async fn fan_out_continues_past_failing_destinations() {
    let executor = ScriptedExecutor::new(vec![]);
    let transport = Arc::new(SessionTransport::with_executor(
        executor,
        Arc::new(CookieStore::new()),
    ));
    let poster = Poster::new(transport);

    let targets = vec![
        PostTarget::new(
            Arc::new(MockWebsite::accepting("gallery-a")),
            AccountId::from("a"),
        ),
        PostTarget::new(
            Arc::new(MockWebsite::rejecting("gallery-b", "Requires a title.")),
            AccountId::from("b"),
        ),
        PostTarget::new(
            Arc::new(MockWebsite::accepting("gallery-c")),
            AccountId::from("c"),
        ),
    ];

    let results = poster.post_to_all(&submission(), &targets).await;

    assert_eq!(results.len(), 3);
    let by_name = |name: &str| results.iter().find(|r| r.website == name).unwrap();
    assert!(by_name("gallery-a").success);
    assert!(!by_name("gallery-b").success);
    assert!(by_name("gallery-c").success);
}
