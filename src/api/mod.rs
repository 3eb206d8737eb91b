pub mod clubs;
pub mod comments;
pub mod health;
pub mod posts;
pub mod swagger;
pub mod users;

use actix_web::web;
use std::sync::Arc;

use crate::middleware::auth::{AuthMiddleware, JwtVerifier};
use crate::utils::AppError;

/// Malformed JSON bodies are reported like any other schema violation.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(|err, _req| AppError::validation("body", err.to_string()).into())
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| AppError::validation("query", err.to_string()).into())
}

/// Registers every route. Everything under `/api/v1` requires a bearer token.
pub fn configure(cfg: &mut web::ServiceConfig, verifier: Arc<JwtVerifier>) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .route("/health", web::get().to(health::health_check))
        .service(
            web::scope("/api/v1")
                .wrap(AuthMiddleware::new(verifier))
                // ==================== USERS ====================
                .service(
                    web::scope("/users")
                        .route("", web::post().to(users::register))
                        .route("/me/match", web::post().to(users::rematch))
                        .route("/me/memberships", web::get().to(users::list_memberships)),
                )
                // ==================== CLUBS ====================
                .service(
                    web::scope("/clubs")
                        .route("", web::get().to(clubs::list_clubs))
                        .route("", web::post().to(clubs::create_club))
                        .route("/{id}", web::get().to(clubs::get_club))
                        .route("/{id}/join", web::post().to(clubs::join_club))
                        .route("/{id}/leave", web::post().to(clubs::leave_club))
                        .route("/{id}/dues", web::post().to(clubs::mark_dues_paid)),
                )
                // ==================== FEED ====================
                .service(
                    web::scope("/posts")
                        .route("", web::get().to(posts::list_feed))
                        .route("", web::post().to(posts::create_post))
                        .route("/{id}", web::get().to(posts::get_post))
                        .route("/{id}/pin", web::put().to(posts::set_pinned))
                        .route("/{id}/like", web::post().to(posts::toggle_like))
                        .route("/{id}/share", web::post().to(posts::share_post))
                        .route("/{id}/comments", web::get().to(comments::list_comments))
                        .route("/{id}/comments", web::post().to(comments::add_comment)),
                )
                .service(
                    web::scope("/comments")
                        .route("/{id}/like", web::post().to(comments::toggle_comment_like)),
                ),
        );
}

#[cfg(test)]
pub(crate) mod test_app {
    use actix_web::{
        body::MessageBody,
        dev::{Service, ServiceResponse},
        test, web, App, Error,
    };
    use serde_json::Value;
    use std::sync::Arc;

    use crate::config::JwtSettings;
    use crate::middleware::auth::JwtVerifier;
    use crate::models::Role;
    use crate::store::{MemoryStore, Store};

    pub fn verifier() -> Arc<JwtVerifier> {
        Arc::new(JwtVerifier::new(&JwtSettings {
            secret: "test-secret".to_string(),
            issuer: "campus-auth".to_string(),
            audience: "campus-clubs".to_string(),
        }))
    }

    pub fn bearer(user_id: &str, role: Role) -> (&'static str, String) {
        ("Authorization", format!("Bearer {}", verifier().issue(user_id, role)))
    }

    pub fn app(
        store: Arc<MemoryStore>,
    ) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = ServiceResponse,
            Error = Error,
            InitError = (),
        >,
    > {
        let store: Arc<dyn Store> = store;
        let verifier = verifier();
        App::new()
            .app_data(web::Data::from(store))
            .configure(move |cfg| super::configure(cfg, verifier))
    }

    /// Status and JSON body, whether the request failed in a handler or in
    /// the auth middleware.
    pub async fn send<S, R, B>(app: &S, req: R) -> (u16, Value)
    where
        S: Service<R, Response = ServiceResponse<B>, Error = Error>,
        B: MessageBody + 'static,
    {
        let res = match test::try_call_service(app, req).await {
            Ok(res) => res.map_into_boxed_body(),
            Err(err) => {
                let res = err.error_response();
                return (res.status().as_u16(), body_json(res.into_body()).await);
            }
        };
        let status = res.status().as_u16();
        (status, body_json(res.into_body()).await)
    }

    async fn body_json(body: actix_web::body::BoxBody) -> Value {
        let bytes = actix_web::body::to_bytes(body).await.unwrap_or_default();
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    }
}
