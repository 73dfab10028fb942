use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use brosolve_app::domain::{
    Answer, Bug, BugDetail, BugFeedQuery, BugPage, CastVoteRequest, PostAnswerRequest,
    SubmitBugRequest, UpdateBugRequest, VoteOutcome, VoteStatus, VoteStatusQuery,
};
use brosolve_app::infrastructure::auth::bearer_token;
use brosolve_app::AppContext;
use brosolve_errors::AppError;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

#[derive(Serialize)]
struct Created {
    message: &'static str,
    id: String,
}

#[derive(Serialize)]
struct Done {
    message: &'static str,
}

pub fn router(ctx: AppContext, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/votes", post(cast_vote))
        .route("/api/votes/status", get(vote_status))
        .route("/api/bugs", get(list_bugs))
        .route("/api/bugs/new", post(submit_bug))
        .route(
            "/api/bugs/{bug_id}",
            get(view_bug).patch(update_bug).delete(delete_bug),
        )
        .route("/api/bugs/{bug_id}/answers", post(post_answer))
        .route(
            "/api/bugs/{bug_id}/answers/{answer_id}",
            patch(update_answer).delete(delete_answer),
        )
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

fn credential(headers: &HeaderMap) -> Option<&str> {
    bearer_token(headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()))
}

fn require_credential(headers: &HeaderMap) -> Result<&str, AppError> {
    credential(headers).ok_or_else(|| AppError::Unauthenticated("missing token".to_string()))
}

fn bad_query(rejection: QueryRejection) -> AppError {
    tracing::debug!("Rejected query string: {}", rejection);
    AppError::InvalidRequest("Invalid request parameters".to_string())
}

fn bad_body(rejection: JsonRejection) -> AppError {
    tracing::debug!("Rejected request body: {}", rejection);
    AppError::InvalidRequest("Invalid request parameters".to_string())
}

async fn health(State(ctx): State<AppContext>) -> impl IntoResponse {
    Json(json!({ "status": "ok", "store": ctx.store.backend_name() }))
}

async fn cast_vote(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    body: Result<Json<CastVoteRequest>, JsonRejection>,
) -> Result<Json<VoteOutcome>, AppError> {
    // Credential first, so an anonymous caller with a broken body still sees 401
    let token = require_credential(&headers)?;
    let Json(request) = body.map_err(bad_body)?;
    let outcome = ctx.cast_vote.execute(Some(token), request).await?;
    Ok(Json(outcome))
}

async fn vote_status(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    query: Result<Query<VoteStatusQuery>, QueryRejection>,
) -> Result<Json<VoteStatus>, AppError> {
    let Query(query) = query.map_err(bad_query)?;
    let status = ctx.vote_status.execute(credential(&headers), query).await?;
    Ok(Json(status))
}

async fn submit_bug(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    body: Result<Json<SubmitBugRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let token = require_credential(&headers)?;
    let Json(request) = body.map_err(bad_body)?;
    let bug = ctx.submit_bug.execute(Some(token), request).await?;
    Ok((
        StatusCode::CREATED,
        Json(Created {
            message: "Bug submitted successfully",
            id: bug.id,
        }),
    ))
}

async fn view_bug(
    State(ctx): State<AppContext>,
    Path(bug_id): Path<String>,
) -> Result<Json<BugDetail>, AppError> {
    Ok(Json(ctx.view_bug.execute(&bug_id).await?))
}

async fn post_answer(
    State(ctx): State<AppContext>,
    Path(bug_id): Path<String>,
    headers: HeaderMap,
    body: Result<Json<PostAnswerRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let token = require_credential(&headers)?;
    let Json(request) = body.map_err(bad_body)?;
    let answer = ctx.post_answer.execute(Some(token), &bug_id, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(Created {
            message: "Answer submitted successfully",
            id: answer.id,
        }),
    ))
}

async fn list_bugs(
    State(ctx): State<AppContext>,
    query: Result<Query<BugFeedQuery>, QueryRejection>,
) -> Result<Json<BugPage>, AppError> {
    let Query(query) = query.map_err(bad_query)?;
    Ok(Json(ctx.list_bugs.execute(query).await?))
}

async fn update_bug(
    State(ctx): State<AppContext>,
    Path(bug_id): Path<String>,
    headers: HeaderMap,
    body: Result<Json<UpdateBugRequest>, JsonRejection>,
) -> Result<Json<Bug>, AppError> {
    let token = require_credential(&headers)?;
    let Json(request) = body.map_err(bad_body)?;
    Ok(Json(ctx.manage_bug.update(Some(token), &bug_id, request).await?))
}

async fn delete_bug(
    State(ctx): State<AppContext>,
    Path(bug_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Done>, AppError> {
    let token = require_credential(&headers)?;
    ctx.manage_bug.delete(Some(token), &bug_id).await?;
    Ok(Json(Done {
        message: "Bug deleted successfully",
    }))
}

async fn update_answer(
    State(ctx): State<AppContext>,
    Path((bug_id, answer_id)): Path<(String, String)>,
    headers: HeaderMap,
    body: Result<Json<PostAnswerRequest>, JsonRejection>,
) -> Result<Json<Answer>, AppError> {
    let token = require_credential(&headers)?;
    let Json(request) = body.map_err(bad_body)?;
    let answer = ctx
        .manage_answer
        .update(Some(token), &bug_id, &answer_id, request)
        .await?;
    Ok(Json(answer))
}

async fn delete_answer(
    State(ctx): State<AppContext>,
    Path((bug_id, answer_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<Done>, AppError> {
    let token = require_credential(&headers)?;
    ctx.manage_answer.delete(Some(token), &bug_id, &answer_id).await?;
    Ok(Json(Done {
        message: "Answer deleted successfully",
    }))
}
