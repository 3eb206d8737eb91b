// ==================== CLUB DIRECTORY ====================
// Club records keyed by type and matching criteria.

use crate::{
    models::{Actor, Club, ClubCriteria, ClubType, CreateClubRequest},
    store::Store,
    utils::{new_id, now_millis, AppError, AppResult},
};

/// Zero-or-one club for the criteria. A missing club is a normal outcome.
pub async fn find_by_criteria(
    store: &dyn Store,
    criteria: &ClubCriteria,
) -> AppResult<Option<Club>> {
    Ok(store.find_club_by_key(&criteria.match_key()).await?)
}

pub async fn get_club(store: &dyn Store, club_id: &str) -> AppResult<Club> {
    store
        .find_club(club_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("club {}", club_id)))
}

pub async fn list_clubs(store: &dyn Store, club_type: Option<ClubType>) -> AppResult<Vec<Club>> {
    Ok(store.list_clubs(club_type).await?)
}

/// Admin-only. At most one club may exist per (type, criteria) tuple,
/// which also caps `src` clubs at one.
pub async fn create_club(
    store: &dyn Store,
    actor: &Actor,
    request: &CreateClubRequest,
) -> AppResult<Club> {
    if !actor.is_admin() {
        log::warn!("⛔ Non-admin {} attempted to create a club", actor.user_id);
        return Err(AppError::Forbidden("only admins can create clubs".into()));
    }

    let new_club = request.validate().map_err(AppError::Validation)?;
    let club = Club::new(
        new_id(),
        new_club.name,
        new_club.description,
        new_club.criteria.as_ref(),
        new_club.dues_applied,
        new_club.dues_amount,
        now_millis(),
    );

    if !store.insert_club(&club).await? {
        return Err(AppError::AlreadyExists(format!(
            "a {} club with the same criteria",
            club.club_type
        )));
    }

    log::info!("🏛️  Club created: {} ({}, {})", club.name, club.club_type, club.id);
    Ok(club)
}

/// Makes sure the single `src` club exists and returns it.
pub async fn ensure_src_club(store: &dyn Store, name: &str) -> AppResult<Club> {
    if let Some(existing) = find_by_criteria(store, &ClubCriteria::Src).await? {
        return Ok(existing);
    }

    let club = Club::new(
        new_id(),
        name.to_string(),
        None,
        Some(&ClubCriteria::Src),
        false,
        0.0,
        now_millis(),
    );
    if store.insert_club(&club).await? {
        return Ok(club);
    }

    // Lost a race with another instance seeding the same club
    find_by_criteria(store, &ClubCriteria::Src)
        .await?
        .ok_or_else(|| AppError::NotFound("src club".into()))
}
