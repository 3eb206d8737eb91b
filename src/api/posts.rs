use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::middleware::auth::Claims;
use crate::models::{CreatePostRequest, FeedFilter, PageRequest};
use crate::services::{engagement_service, feed_service};
use crate::store::{LikeToggle, Store};
use crate::utils::AppError;

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FeedQuery {
    /// Club id
    pub club: Option<String>,
    /// Author user id
    pub author: Option<String>,
    /// Exact tag
    pub tag: Option<String>,
    /// Case-insensitive substring of title, content or tags
    pub search: Option<String>,
    pub page: Option<i64>,
    /// Clamped to 1..=50, default 10
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct PinRequest {
    #[serde(alias = "pinned")]
    pub is_pinned: bool,
}

/// GET /api/v1/posts - Paginated public feed, pinned first then newest
#[utoipa::path(
    get,
    path = "/api/v1/posts",
    tag = "Feed",
    params(FeedQuery),
    responses(
        (status = 200, description = "Feed page with items, page, limit, total, total_pages, has_next and has_prev")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_feed(
    user: web::ReqData<Claims>,
    store: web::Data<dyn Store>,
    query: web::Query<FeedQuery>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    let filter = FeedFilter::new(query.club, query.author, query.tag, query.search);
    let page = PageRequest::new(query.page, query.limit);

    let feed =
        feed_service::list_feed(store.get_ref(), &filter, page, Some(user.sub.as_str())).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "items": feed.items,
        "page": feed.page,
        "limit": feed.limit,
        "total": feed.total,
        "total_pages": feed.total_pages,
        "has_next": feed.has_next,
        "has_prev": feed.has_prev
    })))
}

/// POST /api/v1/posts - Creates a post
#[utoipa::path(
    post,
    path = "/api/v1/posts",
    tag = "Feed",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Post created"),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Caller is not a member of the club")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_post(
    user: web::ReqData<Claims>,
    store: web::Data<dyn Store>,
    body: web::Json<CreatePostRequest>,
) -> Result<HttpResponse, AppError> {
    let post = feed_service::create_post(store.get_ref(), &user.actor(), &body).await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "post": post
    })))
}

/// GET /api/v1/posts/{id}
#[utoipa::path(
    get,
    path = "/api/v1/posts/{id}",
    tag = "Feed",
    params(("id" = String, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post with its latest comments"),
        (status = 404, description = "Post not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_post(
    user: web::ReqData<Claims>,
    store: web::Data<dyn Store>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let post = feed_service::get_post(store.get_ref(), &path, Some(&user.actor())).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "post": post
    })))
}

/// PUT /api/v1/posts/{id}/pin - Pins or unpins a post (admin only)
#[utoipa::path(
    put,
    path = "/api/v1/posts/{id}/pin",
    tag = "Feed",
    params(("id" = String, Path, description = "Post id")),
    request_body = PinRequest,
    responses(
        (status = 200, description = "Updated post"),
        (status = 403, description = "Caller is not an admin")
    ),
    security(("bearer_auth" = []))
)]
pub async fn set_pinned(
    user: web::ReqData<Claims>,
    store: web::Data<dyn Store>,
    path: web::Path<String>,
    body: web::Json<PinRequest>,
) -> Result<HttpResponse, AppError> {
    let post =
        feed_service::set_pinned(store.get_ref(), &user.actor(), &path, body.is_pinned).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "post": post
    })))
}

/// POST /api/v1/posts/{id}/like - Toggles the caller's like
#[utoipa::path(
    post,
    path = "/api/v1/posts/{id}/like",
    tag = "Feed",
    params(("id" = String, Path, description = "Post id")),
    responses(
        (status = 200, description = "New like state", body = LikeToggle),
        (status = 404, description = "Post not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn toggle_like(
    user: web::ReqData<Claims>,
    store: web::Data<dyn Store>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let result = engagement_service::toggle_like(store.get_ref(), &path, &user.sub).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "liked": result.liked,
        "like_count": result.like_count
    })))
}

/// POST /api/v1/posts/{id}/share
#[utoipa::path(
    post,
    path = "/api/v1/posts/{id}/share",
    tag = "Feed",
    params(("id" = String, Path, description = "Post id")),
    responses(
        (status = 200, description = "New share count"),
        (status = 404, description = "Post not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn share_post(
    user: web::ReqData<Claims>,
    store: web::Data<dyn Store>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let share_count = feed_service::share_post(store.get_ref(), &user.actor(), &path).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "share_count": share_count
    })))
}
