use crate::services::club_directory;
use crate::store::Store;
use crate::utils::AppResult;

/// Makes sure the single `src` club exists. Every registered user is matched
/// into it, so a missing `src` club would silently shrink every match.
/// Safe to run on every startup and from several instances at once.
pub async fn seed_src_club(store: &dyn Store, name: &str) -> AppResult<()> {
    let club = club_directory::ensure_src_club(store, name).await?;
    log::info!(
        "🏛️  SRC club ready: {} ({}, {} members)",
        club.name,
        club.id,
        club.member_count
    );
    Ok(())
}
