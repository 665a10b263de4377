use actix_web::http::header::ContentType;
use actix_web::{web, Either, HttpResponse};
use serde::Deserialize;

use crate::error::ApiError;
use crate::models::*;
use crate::service::{BoardService, Outcome};
use crate::validate::{require_fields, FormBody};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(
                web::resource("/threads/{board}")
                    .route(web::get().to(list_threads))
                    .route(web::post().to(create_thread))
                    .route(web::delete().to(delete_thread))
                    .route(web::put().to(report_thread)),
            )
            .service(
                web::resource("/replies/{board}")
                    .route(web::get().to(get_replies))
                    .route(web::post().to(create_reply))
                    .route(web::delete().to(delete_reply))
                    .route(web::put().to(report_reply)),
            )
            .default_service(web::to(not_found)),
    );
    cfg.route("/healthz", web::get().to(healthz));
}

#[derive(Clone)]
pub struct AppState { pub service: BoardService }

/// Form or JSON body; the form encoding is tried first.
type Body = Either<web::Form<FormBody>, web::Json<FormBody>>;

fn into_body(body: Body) -> FormBody {
    match body {
        Either::Left(form) => form.into_inner(),
        Either::Right(json) => json.into_inner(),
    }
}

fn plain(text: String) -> HttpResponse {
    HttpResponse::Ok().content_type(ContentType::plaintext()).body(text)
}

#[utoipa::path(
    get,
    path = "/api/threads/{board}",
    params(("board" = String, Path, description = "Board name")),
    responses(
        (status = 200, description = "Ten most recently bumped threads, three newest replies each", body = [ThreadView])
    )
)]
pub async fn list_threads(data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let threads = data.service.get_threads(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(threads))
}

#[utoipa::path(
    post,
    path = "/api/threads/{board}",
    params(("board" = String, Path, description = "Board name")),
    responses(
        (status = 201, description = "Thread created", body = CreatedThread),
        (status = 400, description = "Missing text or delete_password")
    )
)]
pub async fn create_thread(data: web::Data<AppState>, path: web::Path<String>, body: Body) -> Result<HttpResponse, ApiError> {
    let body = into_body(body);
    require_fields(&body, &["text", "delete_password"])?;
    let created = data.service
        .create_thread(&path.into_inner(), &body.required_text("text")?, &body.required_text("delete_password")?)
        .await?;
    Ok(HttpResponse::Created().json(created))
}

#[utoipa::path(
    delete,
    path = "/api/threads/{board}",
    params(("board" = String, Path, description = "Board name")),
    responses(
        (status = 200, description = "`success` or `incorrect password`", body = String),
        (status = 400, description = "Missing thread_id or delete_password")
    )
)]
pub async fn delete_thread(data: web::Data<AppState>, path: web::Path<String>, body: Body) -> Result<HttpResponse, ApiError> {
    let body = into_body(body);
    require_fields(&body, &["thread_id", "delete_password"])?;
    let thread_id = body.id("thread_id")?;
    let outcome = data.service
        .delete_thread(thread_id, &path.into_inner(), &body.required_text("delete_password")?)
        .await?;
    Ok(plain(outcome.status_text("success", "incorrect password")))
}

#[utoipa::path(
    put,
    path = "/api/threads/{board}",
    params(("board" = String, Path, description = "Board name")),
    responses(
        (status = 200, description = "`reported` or a failure message", body = String),
        (status = 400, description = "Missing report_id")
    )
)]
pub async fn report_thread(data: web::Data<AppState>, path: web::Path<String>, body: Body) -> Result<HttpResponse, ApiError> {
    let body = into_body(body);
    require_fields(&body, &["report_id"])?;
    let outcome = data.service.report_thread(body.id("report_id")?, &path.into_inner()).await?;
    Ok(plain(outcome.status_text("reported", "Error reporting thread")))
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RepliesQuery {
    /// Thread to fetch
    thread_id: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/replies/{board}",
    params(("board" = String, Path, description = "Board name"), RepliesQuery),
    responses(
        (status = 200, description = "Thread with every reply, or `{}` when absent", body = ThreadView),
        (status = 400, description = "Missing or malformed thread_id")
    )
)]
pub async fn get_replies(data: web::Data<AppState>, path: web::Path<String>, query: web::Query<RepliesQuery>) -> Result<HttpResponse, ApiError> {
    let raw = query.into_inner().thread_id.ok_or_else(|| ApiError::BadRequest("missing thread_id".into()))?;
    let thread_id: Id = raw.trim().parse().map_err(|_| ApiError::BadRequest("invalid value for thread_id".into()))?;
    match data.service.get_replies(thread_id, &path.into_inner()).await? {
        Some(thread) => Ok(HttpResponse::Ok().json(thread)),
        None => Ok(HttpResponse::Ok().json(serde_json::json!({}))),
    }
}

#[utoipa::path(
    post,
    path = "/api/replies/{board}",
    params(("board" = String, Path, description = "Board name")),
    responses(
        (status = 200, description = "Reply created, or `thread not found`", body = Reply),
        (status = 400, description = "Missing text, delete_password or thread_id")
    )
)]
pub async fn create_reply(data: web::Data<AppState>, path: web::Path<String>, body: Body) -> Result<HttpResponse, ApiError> {
    let body = into_body(body);
    require_fields(&body, &["text", "delete_password", "thread_id"])?;
    let thread_id = body.id("thread_id")?;
    let outcome = data.service
        .create_reply(thread_id, &body.required_text("text")?, &body.required_text("delete_password")?, &path.into_inner())
        .await?;
    match outcome {
        Outcome::Success(reply) => Ok(HttpResponse::Ok().json(reply)),
        other => Ok(plain(other.status_text("", "thread not found"))),
    }
}

#[utoipa::path(
    delete,
    path = "/api/replies/{board}",
    params(("board" = String, Path, description = "Board name")),
    responses(
        (status = 200, description = "`success` or `incorrect password`", body = String),
        (status = 400, description = "Missing thread_id, reply_id or delete_password")
    )
)]
pub async fn delete_reply(data: web::Data<AppState>, path: web::Path<String>, body: Body) -> Result<HttpResponse, ApiError> {
    let body = into_body(body);
    require_fields(&body, &["thread_id", "reply_id", "delete_password"])?;
    let (thread_id, reply_id) = (body.id("thread_id")?, body.id("reply_id")?);
    let outcome = data.service
        .delete_reply(thread_id, reply_id, &body.required_text("delete_password")?, &path.into_inner())
        .await?;
    Ok(plain(outcome.status_text("success", "incorrect password")))
}

#[utoipa::path(
    put,
    path = "/api/replies/{board}",
    params(("board" = String, Path, description = "Board name")),
    responses(
        (status = 200, description = "`reported` or `reply not found`", body = String)
    )
)]
pub async fn report_reply(data: web::Data<AppState>, path: web::Path<String>, body: Option<Body>) -> Result<HttpResponse, ApiError> {
    // fields are not required here; unusable ids simply match nothing
    let body = body.map(into_body).unwrap_or_default();
    let outcome = match (body.opt_id("thread_id"), body.opt_id("reply_id")) {
        (Some(thread_id), Some(reply_id)) => data.service.report_reply(thread_id, reply_id, &path.into_inner()).await?,
        _ => Outcome::NotFound,
    };
    Ok(plain(outcome.status_text("reported", "reply not found")))
}

pub async fn healthz() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"status": "ok"}))
}

async fn not_found() -> Result<HttpResponse, ApiError> {
    Err(ApiError::NotFound)
}
