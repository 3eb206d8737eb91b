use utoipa::OpenApi;
use utoipa::openapi::security::{SecurityScheme, HttpAuthScheme, HttpBuilder};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Campus Clubs API",
        version = "1.0.0",
        description = "Club membership matching and feed engagement.\n\n**Authentication:** every `/api/v1` endpoint requires a JWT Bearer token issued by the campus auth service.\n\n**Features:**\n- Automatic club enrollment from the student identifier, state and religion\n- Joining and leaving general clubs\n- Dues state for matched memberships\n- Paginated feed with pinned posts, tags and search\n- Comments, replies, likes and shares"
    ),
    paths(
        // Health
        crate::api::health::health_check,

        // Users
        crate::api::users::register,
        crate::api::users::rematch,
        crate::api::users::list_memberships,

        // Clubs
        crate::api::clubs::list_clubs,
        crate::api::clubs::create_club,
        crate::api::clubs::get_club,
        crate::api::clubs::join_club,
        crate::api::clubs::leave_club,
        crate::api::clubs::mark_dues_paid,

        // Feed
        crate::api::posts::list_feed,
        crate::api::posts::create_post,
        crate::api::posts::get_post,
        crate::api::posts::set_pinned,
        crate::api::posts::toggle_like,
        crate::api::posts::share_post,

        // Comments
        crate::api::comments::list_comments,
        crate::api::comments::add_comment,
        crate::api::comments::toggle_comment_like,
    ),
    components(
        schemas(
            crate::api::health::HealthResponse,
            crate::api::posts::PinRequest,
            crate::models::RegisterUserRequest,
            crate::models::CreateClubRequest,
            crate::models::CreatePostRequest,
            crate::models::CreateCommentRequest,
            crate::models::ClubType,
            crate::models::ClubSummary,
            crate::models::MembershipOrigin,
            crate::models::MembershipView,
            crate::models::AuthorSummary,
            crate::models::Role,
            crate::store::LikeToggle,
            crate::utils::Violation,
        )
    ),
    tags(
        (name = "Health", description = "Service liveness."),
        (name = "Users", description = "Registration and automatic club matching."),
        (name = "Clubs", description = "Club directory and the membership lifecycle: join, leave and dues."),
        (name = "Feed", description = "Posts, pinning, likes and shares."),
        (name = "Comments", description = "Comments, one-level replies and comment likes."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Token issued by the campus auth service"))
                        .build()
                ),
            );
        }
    }
}
