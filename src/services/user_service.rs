// ==================== USER REGISTRATION ====================

use serde::Serialize;

use crate::{
    models::{Actor, ClubSummary, RegisterUserRequest, User},
    services::{
        identity_parser::{parse_identifier, ParsedIdentity},
        membership_matcher::{self, MatchOutcome},
    },
    store::Store,
    utils::{now_millis, AppError, AppResult},
};

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub user: User,
    pub matched_clubs: Vec<ClubSummary>,
    pub message: String,
}

impl Registration {
    fn new(user: User, outcome: MatchOutcome) -> Self {
        Self {
            message: outcome.message(),
            matched_clubs: outcome.matched,
            user,
        }
    }
}

/// Stores the caller's user record and runs the matcher.
///
/// Identity fields are written once: registering again with the same id keeps
/// the stored record and only re-runs matching, which is idempotent.
pub async fn register(
    store: &dyn Store,
    actor: &Actor,
    request: &RegisterUserRequest,
) -> AppResult<Registration> {
    let new_user = request.validate().map_err(AppError::Validation)?;

    let codes = match parse_identifier(&new_user.identifier) {
        ParsedIdentity::Parsed(codes) => Some(codes),
        ParsedIdentity::Unparsed => {
            log::warn!(
                "⚠️  Identifier {} of user {} did not parse; only src will match",
                new_user.identifier,
                actor.user_id
            );
            None
        }
    };

    let candidate = User {
        id: actor.user_id.clone(),
        name: new_user.name,
        identifier: new_user.identifier,
        faculty_code: codes.as_ref().map(|c| c.faculty_code.clone()),
        department_code: codes.map(|c| c.department_code),
        state: new_user.state,
        religion: new_user.religion,
        role: actor.role,
        created_at: now_millis(),
    };

    let user = if store.insert_user(&candidate).await? {
        log::info!("👤 Registered user {} ({})", candidate.id, candidate.name);
        candidate
    } else {
        log::debug!("User {} already registered, re-running match", candidate.id);
        store
            .find_user(&candidate.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", candidate.id)))?
    };

    let outcome = membership_matcher::match_and_enroll(store, &user).await?;
    Ok(Registration::new(user, outcome))
}

pub async fn get_user(store: &dyn Store, user_id: &str) -> AppResult<User> {
    store
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", user_id)))
}

/// Retries matching for an already registered user.
pub async fn rematch(store: &dyn Store, user_id: &str) -> AppResult<MatchOutcome> {
    let user = get_user(store, user_id).await?;
    membership_matcher::match_and_enroll(store, &user).await
}
