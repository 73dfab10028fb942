//! HTTP-level tests for the vote endpoints, run against the in-memory store.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use brosolve_app::domain::{Answer, Bug};
use brosolve_app::infrastructure::auth::{Claims, TokenVerifier};
use brosolve_app::infrastructure::security::{RateLimitConfig, RateLimiter};
use brosolve_app::infrastructure::store::MemoryStore;
use brosolve_app::AppContext;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tower::ServiceExt;

const SECRET: &[u8] = b"api-test-secret";

fn token_for(user_id: &str) -> String {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: now + 3600,
        iat: Some(now),
        iss: None,
        aud: None,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET)).unwrap()
}

fn app_with(store: &MemoryStore, limits: RateLimitConfig) -> Router {
    let ctx = AppContext::new(
        store.clone().into(),
        TokenVerifier::new(SECRET, None, None),
        RateLimiter::new(limits),
    );
    brosolve_api::router(ctx, Duration::from_secs(5))
}

fn app(store: &MemoryStore) -> Router {
    app_with(store, RateLimitConfig::default())
}

fn seed_bug(store: &MemoryStore, id: &str, votes: i32) {
    let mut bug = Bug::new("Build fails".into(), "linker error".into(), vec!["rust".into()], "author".into());
    bug.id = id.to_string();
    bug.votes = votes;
    store.insert_bug(&bug).unwrap();
}

fn seed_answer(store: &MemoryStore, bug_id: &str, id: &str, votes: i32) {
    let mut answer = Answer::new(bug_id.to_string(), "install lld".into(), "helper".into());
    answer.id = id.to_string();
    answer.votes = votes;
    store.insert_answer(&answer).unwrap();
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    with_json(Method::POST, uri, token, body)
}

fn with_json(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    without_body(Method::GET, uri, token)
}

fn without_body(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_bug_vote_toggle_scenario() {
    let store = MemoryStore::new();
    seed_bug(&store, "bug-5", 5);
    let app = app(&store);
    let token = token_for("user-a");
    let body = json!({"targetId": "bug-5", "targetType": "bug", "voteType": "up"});

    let (status, json) = send(&app, post_json("/api/votes", Some(&token), body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"newVoteCount": 6, "userVote": "up"}));

    let (status, json) = send(&app, get("/api/votes/status?targetId=bug-5&targetType=bug", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"userVote": "up"}));

    let (status, json) = send(&app, post_json("/api/votes", Some(&token), body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"newVoteCount": 5, "userVote": null}));
}

#[tokio::test]
async fn test_answer_vote_scenario() {
    let store = MemoryStore::new();
    seed_bug(&store, "B1", 0);
    seed_answer(&store, "B1", "A1", 0);
    let app = app(&store);
    let token = token_for("user-b");

    let (status, json) = send(
        &app,
        post_json(
            "/api/votes",
            Some(&token),
            json!({"targetId": "A1", "targetType": "answer", "voteType": "down", "parentId": "B1"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"newVoteCount": -1, "userVote": "down"}));

    let (_, json) = send(
        &app,
        post_json(
            "/api/votes",
            Some(&token),
            json!({"targetId": "A1", "targetType": "answer", "voteType": "up", "parentId": "B1"}),
        ),
    )
    .await;
    assert_eq!(json, json!({"newVoteCount": 1, "userVote": "up"}));

    let (_, detail) = send(&app, get("/api/bugs/B1", None)).await;
    assert_eq!(detail["answers"][0]["votes"], json!(1));
}

#[tokio::test]
async fn test_vote_errors_map_to_status_codes() {
    let store = MemoryStore::new();
    seed_bug(&store, "bug-1", 2);
    let app = app(&store);
    let token = token_for("user-c");

    let (status, json) = send(
        &app,
        post_json("/api/votes", None, json!({"targetId": "bug-1", "targetType": "bug", "voteType": "up"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(json["error"].is_string());

    let (status, _) = send(
        &app,
        post_json("/api/votes", Some(&token), json!({"targetId": "bug-1", "targetType": "bug", "voteType": "down"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        post_json("/api/votes", Some(&token), json!({"targetId": "A9", "targetType": "answer", "voteType": "up"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(
        &app,
        post_json("/api/votes", Some(&token), json!({"targetId": "nope", "targetType": "bug", "voteType": "up"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json, json!({"error": "Bug not found"}));

    let malformed = Request::builder()
        .method(Method::POST)
        .uri("/api/votes")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = send(&app, malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // None of the failures touched the count
    let (_, detail) = send(&app, get("/api/bugs/bug-1", None)).await;
    assert_eq!(detail["bug"]["votes"], json!(2));
}

#[tokio::test]
async fn test_status_without_credential_is_null() {
    let store = MemoryStore::new();
    let app = app(&store);

    for kind in ["bug", "answer"] {
        let uri = format!("/api/votes/status?targetId=t1&targetType={}", kind);
        let (status, json) = send(&app, get(&uri, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"userVote": null}));

        let (status, json) = send(&app, get(&uri, Some("not-a-token"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"userVote": null}));
    }

    let (status, _) = send(&app, get("/api/votes/status?targetId=t1", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rate_limited_vote() {
    let store = MemoryStore::new();
    seed_bug(&store, "bug-1", 0);
    let app = app_with(&store, RateLimitConfig { per_minute: 1, per_hour: 10 });
    let token = token_for("user-d");
    let body = json!({"targetId": "bug-1", "targetType": "bug", "voteType": "up"});

    let (status, _) = send(&app, post_json("/api/votes", Some(&token), body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, post_json("/api/votes", Some(&token), body)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(store.find_bug("bug-1").unwrap().unwrap().votes, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_voters_converge() {
    const VOTERS: usize = 25;
    let store = MemoryStore::new().with_max_attempts(64);
    seed_bug(&store, "popular", 0);
    let app = app(&store);

    let handles: Vec<_> = (0..VOTERS)
        .map(|i| {
            let app = app.clone();
            tokio::spawn(async move {
                let token = token_for(&format!("fan-{}", i));
                let body = json!({"targetId": "popular", "targetType": "bug", "voteType": "up"});
                send(&app, post_json("/api/votes", Some(&token), body)).await.0
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }
    assert_eq!(store.find_bug("popular").unwrap().unwrap().votes, VOTERS as i32);
}

#[tokio::test]
async fn test_health_reports_backend() {
    let store = MemoryStore::new();
    let (status, json) = send(&app(&store), get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"status": "ok", "store": "memory"}));
}

#[tokio::test]
async fn test_feed_pages_with_cursor() {
    let store = MemoryStore::new();
    for (i, title) in ["First crash", "Second crash", "Third hang"].into_iter().enumerate() {
        let mut bug = Bug::new(title.into(), "repro inside".into(), vec!["rust".into()], "poster".into());
        bug.id = format!("feed-{}", i);
        bug.created_at = Some(chrono::Utc::now() - chrono::Duration::minutes(10 - i as i64));
        store.insert_bug(&bug).unwrap();
    }
    let app = app(&store);

    let (status, page) = send(&app, get("/api/bugs?limit=2", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["bugs"][0]["title"], json!("Third hang"));
    assert_eq!(page["bugs"].as_array().unwrap().len(), 2);
    let cursor = page["nextCursor"].as_str().unwrap().to_string();

    let (_, page) = send(&app, get(&format!("/api/bugs?limit=2&cursor={}", cursor), None)).await;
    assert_eq!(page["bugs"][0]["title"], json!("First crash"));
    assert_eq!(page["nextCursor"], Value::Null);

    let (_, page) = send(&app, get("/api/bugs?q=CRASH&tag=rust", None)).await;
    assert_eq!(page["bugs"].as_array().unwrap().len(), 2);

    let (status, _) = send(&app, get("/api/bugs?limit=zero", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_author_deletes_bug_and_votes_go_with_it() {
    let store = MemoryStore::new();
    seed_bug(&store, "B1", 0);
    seed_answer(&store, "B1", "A1", 0);
    let app = app(&store);
    let voter = token_for("fan");

    send(
        &app,
        post_json("/api/votes", Some(&voter), json!({"targetId": "B1", "targetType": "bug", "voteType": "up"})),
    )
    .await;
    send(
        &app,
        post_json(
            "/api/votes",
            Some(&voter),
            json!({"targetId": "A1", "targetType": "answer", "voteType": "up", "parentId": "B1"}),
        ),
    )
    .await;

    let (status, _) = send(&app, without_body(Method::DELETE, "/api/bugs/B1", Some(&voter))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, without_body(Method::DELETE, "/api/bugs/B1", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let author = token_for("author");
    let (status, json) = send(&app, without_body(Method::DELETE, "/api/bugs/B1", Some(&author))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"message": "Bug deleted successfully"}));

    for uri in [
        "/api/votes/status?targetId=B1&targetType=bug",
        "/api/votes/status?targetId=A1&targetType=answer",
    ] {
        let (status, json) = send(&app, get(uri, Some(&voter))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"userVote": null}));
    }

    let (status, _) = send(&app, get("/api/bugs/B1", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, without_body(Method::DELETE, "/api/bugs/B1", Some(&author))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_answer_edit_and_delete() {
    let store = MemoryStore::new();
    seed_bug(&store, "B1", 0);
    seed_answer(&store, "B1", "A1", 0);
    let app = app(&store);
    let helper = token_for("helper");

    let (status, json) = send(
        &app,
        with_json(
            Method::PATCH,
            "/api/bugs/B1/answers/A1",
            Some(&helper),
            json!({"content": "use lld instead"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["content"], json!("use lld instead"));

    let (status, _) = send(
        &app,
        with_json(Method::PATCH, "/api/bugs/B1/answers/A1", Some(&token_for("other")), json!({"content": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, without_body(Method::DELETE, "/api/bugs/B1/answers/A1", Some(&helper))).await;
    assert_eq!(status, StatusCode::OK);
    let (_, detail) = send(&app, get("/api/bugs/B1", None)).await;
    assert_eq!(detail["answers"], json!([]));
}
