// ==================== MEMBERSHIP LIFECYCLE ====================
// unmatched -> auto      (matcher only; no user-triggered way out)
// unmatched -> voluntary -> removed   (join/leave, general clubs only)
// auto dues: unpaid -> paid (one way)

use std::collections::HashMap;

use crate::{
    models::{Membership, MembershipOrigin, MembershipView},
    services::club_directory,
    store::Store,
    utils::{now_millis, AppError, AppResult},
};

pub async fn join(store: &dyn Store, user_id: &str, club_id: &str) -> AppResult<Membership> {
    let club = club_directory::get_club(store, club_id).await?;
    if club.club_type.is_auto_joined() {
        return Err(AppError::InvalidOperation(format!(
            "{} clubs are assigned automatically and cannot be joined",
            club.club_type
        )));
    }

    let membership = Membership::new(user_id, club_id, MembershipOrigin::Voluntary, now_millis());
    if !store.enroll(&membership).await? {
        return Err(AppError::AlreadyMember);
    }

    log::info!("➕ User {} joined club {}", user_id, club.name);
    Ok(membership)
}

pub async fn leave(store: &dyn Store, user_id: &str, club_id: &str) -> AppResult<()> {
    let membership = store
        .find_membership(user_id, club_id)
        .await?
        .ok_or(AppError::NotAMember)?;

    if membership.origin == MembershipOrigin::Auto {
        return Err(AppError::InvalidOperation(
            "matched memberships cannot be left".into(),
        ));
    }

    // The origin guard in the delete makes a concurrent second leave a no-op
    if !store
        .withdraw(user_id, club_id, MembershipOrigin::Voluntary)
        .await?
    {
        return Err(AppError::NotAMember);
    }

    log::info!("➖ User {} left club {}", user_id, club_id);
    Ok(())
}

/// Records an external payment confirmation. Only auto memberships of clubs
/// that charge dues are gated; paying twice is a no-op.
pub async fn mark_dues_paid(store: &dyn Store, user_id: &str, club_id: &str) -> AppResult<Membership> {
    let club = club_directory::get_club(store, club_id).await?;
    let membership = store
        .find_membership(user_id, club_id)
        .await?
        .ok_or(AppError::NotAMember)?;

    if !club.dues_applied || membership.origin != MembershipOrigin::Auto {
        return Err(AppError::NotApplicable(
            "dues apply only to matched memberships of clubs that charge dues".into(),
        ));
    }

    if membership.dues_paid {
        log::debug!("Dues already recorded for {} in {}", user_id, club_id);
        return Ok(membership);
    }

    if !store.mark_dues_paid(user_id, club_id).await? {
        return Err(AppError::NotAMember);
    }

    log::info!("💳 Dues marked paid for user {} in club {}", user_id, club.name);
    Ok(Membership {
        dues_paid: true,
        ..membership
    })
}

pub async fn list_memberships(store: &dyn Store, user_id: &str) -> AppResult<Vec<MembershipView>> {
    let memberships = store.list_memberships(user_id).await?;
    let club_ids: Vec<String> = memberships.iter().map(|m| m.club_id.clone()).collect();
    let clubs: HashMap<String, _> = store
        .find_clubs(&club_ids)
        .await?
        .into_iter()
        .map(|c| (c.id.clone(), c))
        .collect();

    Ok(memberships
        .iter()
        .filter_map(|m| clubs.get(&m.club_id).map(|club| MembershipView::new(m, club)))
        .collect())
}
