use actix_web::{web, HttpResponse};

use crate::middleware::auth::Claims;
use crate::models::RegisterUserRequest;
use crate::services::{membership_service, user_service};
use crate::store::Store;
use crate::utils::AppError;

/// POST /api/v1/users - Registers the caller and auto-enrolls matched clubs
#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "Users",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "User registered and matched"),
        (status = 400, description = "Invalid payload"),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn register(
    user: web::ReqData<Claims>,
    store: web::Data<dyn Store>,
    body: web::Json<RegisterUserRequest>,
) -> Result<HttpResponse, AppError> {
    let registration = user_service::register(store.get_ref(), &user.actor(), &body).await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "user": registration.user,
        "matched_clubs": registration.matched_clubs,
        "message": registration.message
    })))
}

/// POST /api/v1/users/me/match - Re-runs matching (idempotent)
#[utoipa::path(
    post,
    path = "/api/v1/users/me/match",
    tag = "Users",
    responses(
        (status = 200, description = "Matched clubs"),
        (status = 404, description = "User not registered")
    ),
    security(("bearer_auth" = []))
)]
pub async fn rematch(
    user: web::ReqData<Claims>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, AppError> {
    let outcome = user_service::rematch(store.get_ref(), &user.sub).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "matched_clubs": outcome.matched,
        "newly_enrolled": outcome.newly_enrolled,
        "message": outcome.message()
    })))
}

/// GET /api/v1/users/me/memberships - Lists the caller's memberships
#[utoipa::path(
    get,
    path = "/api/v1/users/me/memberships",
    tag = "Users",
    responses(
        (status = 200, description = "Memberships with their clubs")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_memberships(
    user: web::ReqData<Claims>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, AppError> {
    let memberships = membership_service::list_memberships(store.get_ref(), &user.sub).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "memberships": memberships,
        "total": memberships.len()
    })))
}

#[cfg(test)]
mod tests {
    use crate::api::test_app::{app, bearer, send};
    use crate::models::Role;
    use crate::store::MemoryStore;
    use crate::test_support::seed_directory;
    use actix_web::test;
    use serde_json::json;
    use std::sync::Arc;

    #[actix_web::test]
    async fn test_register_then_list_memberships() {
        let store = Arc::new(MemoryStore::new());
        seed_directory(&store).await;
        let app = test::init_service(app(store.clone())).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/users")
            .insert_header(bearer("u1", Role::Student))
            .set_json(json!({
                "name": "Amina Bello",
                "identifier": "UG20/SCCS/1026",
                "state": "Gombe",
                "religion": "ISLAM"
            }))
            .to_request();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, 201);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "matched with 5 clubs");
        assert_eq!(body["matched_clubs"].as_array().map(Vec::len), Some(5));

        let req = test::TestRequest::get()
            .uri("/api/v1/users/me/memberships")
            .insert_header(bearer("u1", Role::Student))
            .to_request();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, 200);
        assert_eq!(body["total"], 5);
        assert_eq!(body["memberships"][0]["origin"], "auto");
    }

    #[actix_web::test]
    async fn test_missing_token_is_unauthorized() {
        let app = test::init_service(app(Arc::new(MemoryStore::new()))).await;
        let req = test::TestRequest::post()
            .uri("/api/v1/users/me/match")
            .to_request();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, 401);
        assert_eq!(body["code"], "UNAUTHORIZED");
    }

    #[actix_web::test]
    async fn test_invalid_payload_lists_violations() {
        let app = test::init_service(app(Arc::new(MemoryStore::new()))).await;
        let req = test::TestRequest::post()
            .uri("/api/v1/users")
            .insert_header(bearer("u1", Role::Student))
            .set_json(json!({ "name": "A" }))
            .to_request();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, 400);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["violations"].as_array().map(Vec::len), Some(2));
    }
}
