use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::middleware::auth::Claims;
use crate::models::{CreateCommentRequest, PageRequest};
use crate::services::{engagement_service, feed_service};
use crate::store::{LikeToggle, Store};
use crate::utils::AppError;

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /api/v1/posts/{id}/comments - All comments, oldest first
#[utoipa::path(
    get,
    path = "/api/v1/posts/{id}/comments",
    tag = "Comments",
    params(("id" = String, Path, description = "Post id"), PageQuery),
    responses(
        (status = 200, description = "Comment page"),
        (status = 404, description = "Post not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_comments(
    user: web::ReqData<Claims>,
    store: web::Data<dyn Store>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    let page = PageRequest::new(query.page, query.limit);
    let comments =
        feed_service::list_comments(store.get_ref(), &path, page, Some(&user.actor())).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "items": comments.items,
        "page": comments.page,
        "limit": comments.limit,
        "total": comments.total,
        "total_pages": comments.total_pages,
        "has_next": comments.has_next,
        "has_prev": comments.has_prev
    })))
}

/// POST /api/v1/posts/{id}/comments - Comments on a post, or replies to a comment
#[utoipa::path(
    post,
    path = "/api/v1/posts/{id}/comments",
    tag = "Comments",
    params(("id" = String, Path, description = "Post id")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment created"),
        (status = 400, description = "Invalid payload or reply target"),
        (status = 404, description = "Post or parent comment not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_comment(
    user: web::ReqData<Claims>,
    store: web::Data<dyn Store>,
    path: web::Path<String>,
    body: web::Json<CreateCommentRequest>,
) -> Result<HttpResponse, AppError> {
    let comment = feed_service::add_comment(store.get_ref(), &user.actor(), &path, &body).await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "comment": comment
    })))
}

/// POST /api/v1/comments/{id}/like
#[utoipa::path(
    post,
    path = "/api/v1/comments/{id}/like",
    tag = "Comments",
    params(("id" = String, Path, description = "Comment id")),
    responses(
        (status = 200, description = "New like state", body = LikeToggle),
        (status = 404, description = "Comment not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn toggle_comment_like(
    user: web::ReqData<Claims>,
    store: web::Data<dyn Store>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let result = engagement_service::toggle_comment_like(store.get_ref(), &path, &user.sub).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "liked": result.liked,
        "like_count": result.like_count
    })))
}
