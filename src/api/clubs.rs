use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::middleware::auth::Claims;
use crate::models::{ClubType, CreateClubRequest};
use crate::services::{club_directory, membership_service};
use crate::store::Store;
use crate::utils::AppError;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ClubListQuery {
    /// general, faculty, department, state, religion or src
    #[serde(rename = "type")]
    pub club_type: Option<String>,
}

/// GET /api/v1/clubs - Lists clubs, optionally by type
#[utoipa::path(
    get,
    path = "/api/v1/clubs",
    tag = "Clubs",
    params(ClubListQuery),
    responses(
        (status = 200, description = "Clubs"),
        (status = 400, description = "Unknown club type")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_clubs(
    store: web::Data<dyn Store>,
    query: web::Query<ClubListQuery>,
) -> Result<HttpResponse, AppError> {
    let club_type = query
        .club_type
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .map(str::parse::<ClubType>)
        .transpose()
        .map_err(|e| AppError::validation("type", e))?;

    let clubs = club_directory::list_clubs(store.get_ref(), club_type).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "clubs": clubs,
        "total": clubs.len()
    })))
}

/// POST /api/v1/clubs - Creates a club (admin only)
#[utoipa::path(
    post,
    path = "/api/v1/clubs",
    tag = "Clubs",
    request_body = CreateClubRequest,
    responses(
        (status = 201, description = "Club created"),
        (status = 403, description = "Caller is not an admin"),
        (status = 409, description = "A club with the same criteria exists")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_club(
    user: web::ReqData<Claims>,
    store: web::Data<dyn Store>,
    body: web::Json<CreateClubRequest>,
) -> Result<HttpResponse, AppError> {
    let club = club_directory::create_club(store.get_ref(), &user.actor(), &body).await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "club": club
    })))
}

/// GET /api/v1/clubs/{id}
#[utoipa::path(
    get,
    path = "/api/v1/clubs/{id}",
    tag = "Clubs",
    params(("id" = String, Path, description = "Club id")),
    responses(
        (status = 200, description = "Club"),
        (status = 404, description = "Club not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_club(
    store: web::Data<dyn Store>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let club = club_directory::get_club(store.get_ref(), &path).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "club": club
    })))
}

/// POST /api/v1/clubs/{id}/join - Joins a general club
#[utoipa::path(
    post,
    path = "/api/v1/clubs/{id}/join",
    tag = "Clubs",
    params(("id" = String, Path, description = "Club id")),
    responses(
        (status = 200, description = "Joined"),
        (status = 403, description = "Club is assigned automatically"),
        (status = 409, description = "Already a member")
    ),
    security(("bearer_auth" = []))
)]
pub async fn join_club(
    user: web::ReqData<Claims>,
    store: web::Data<dyn Store>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let membership = membership_service::join(store.get_ref(), &user.sub, &path).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "membership": membership
    })))
}

/// POST /api/v1/clubs/{id}/leave - Leaves a voluntarily joined club
#[utoipa::path(
    post,
    path = "/api/v1/clubs/{id}/leave",
    tag = "Clubs",
    params(("id" = String, Path, description = "Club id")),
    responses(
        (status = 200, description = "Left the club"),
        (status = 403, description = "Matched memberships cannot be left"),
        (status = 404, description = "Not a member")
    ),
    security(("bearer_auth" = []))
)]
pub async fn leave_club(
    user: web::ReqData<Claims>,
    store: web::Data<dyn Store>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    membership_service::leave(store.get_ref(), &user.sub, &path).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Left club"
    })))
}

/// POST /api/v1/clubs/{id}/dues - Records that the caller paid dues
#[utoipa::path(
    post,
    path = "/api/v1/clubs/{id}/dues",
    tag = "Clubs",
    params(("id" = String, Path, description = "Club id")),
    responses(
        (status = 200, description = "Dues recorded"),
        (status = 422, description = "Dues do not apply to this membership")
    ),
    security(("bearer_auth" = []))
)]
pub async fn mark_dues_paid(
    user: web::ReqData<Claims>,
    store: web::Data<dyn Store>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let membership = membership_service::mark_dues_paid(store.get_ref(), &user.sub, &path).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "membership": membership
    })))
}
