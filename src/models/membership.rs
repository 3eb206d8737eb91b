use serde::{Deserialize, Serialize};

use crate::models::club::{Club, ClubSummary};
use crate::utils::new_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MembershipOrigin {
    /// Assigned by the matcher; the member cannot remove it.
    Auto,
    /// Joined by the member (general clubs only).
    Voluntary,
}

impl MembershipOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipOrigin::Auto => "auto",
            MembershipOrigin::Voluntary => "voluntary",
        }
    }
}

/// (user, club) membership (collection: memberships)
///
/// At most one per (user_id, club_id); the store enforces it with a unique
/// index rather than through the id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Membership {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub club_id: String,
    pub origin: MembershipOrigin,
    pub joined_at: i64,
    #[serde(default)]
    pub dues_paid: bool,
}

impl Membership {
    pub fn new(user_id: &str, club_id: &str, origin: MembershipOrigin, joined_at: i64) -> Self {
        Self {
            id: new_id(),
            user_id: user_id.to_string(),
            club_id: club_id.to_string(),
            origin,
            joined_at,
            dues_paid: false,
        }
    }
}

/// Membership as returned to the member, with its club resolved.
#[derive(Debug, Clone, Serialize, PartialEq, utoipa::ToSchema)]
pub struct MembershipView {
    pub club: ClubSummary,
    pub origin: MembershipOrigin,
    pub joined_at: i64,
    pub dues_applied: bool,
    pub dues_amount: f64,
    pub dues_paid: bool,
}

impl MembershipView {
    pub fn new(membership: &Membership, club: &Club) -> Self {
        Self {
            club: ClubSummary::from(club),
            origin: membership.origin,
            joined_at: membership.joined_at,
            dues_applied: club.dues_applied,
            dues_amount: club.dues_amount,
            dues_paid: membership.dues_paid,
        }
    }
}
