//! Persistence ports consumed by the services.
//!
//! Every operation that touches a shared counter or like-set is a single
//! atomic store call; callers never read a value, change it and write it back.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

use crate::config::StoreBackend;
use crate::models::{
    Club, ClubType, Comment, FeedFilter, Membership, MembershipOrigin, Post, User,
};

pub mod memory;

pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("store lock poisoned")]
    Poisoned,

    #[error("gave up after concurrent updates on {0}")]
    Contention(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of a like toggle, read from the post-update document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct LikeToggle {
    pub liked: bool,
    pub like_count: i64,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Returns `false` when a user with the same id already exists.
    async fn insert_user(&self, user: &User) -> StoreResult<bool>;

    async fn find_user(&self, id: &str) -> StoreResult<Option<User>>;

    async fn find_users(&self, ids: &[String]) -> StoreResult<Vec<User>>;
}

#[async_trait]
pub trait ClubStore: Send + Sync {
    /// Returns `false` when another club already owns the same `match_key`.
    async fn insert_club(&self, club: &Club) -> StoreResult<bool>;

    async fn find_club(&self, id: &str) -> StoreResult<Option<Club>>;

    async fn find_club_by_key(&self, match_key: &str) -> StoreResult<Option<Club>>;

    async fn find_clubs(&self, ids: &[String]) -> StoreResult<Vec<Club>>;

    async fn list_clubs(&self, club_type: Option<ClubType>) -> StoreResult<Vec<Club>>;
}

#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Inserts the membership and raises the club's `member_count` by one,
    /// both or neither. Returns `false` and leaves the count alone when the
    /// (user, club) pair already exists, so a retry after a failed attempt
    /// can never skip the increment.
    async fn enroll(&self, membership: &Membership) -> StoreResult<bool>;

    async fn find_membership(&self, user_id: &str, club_id: &str)
        -> StoreResult<Option<Membership>>;

    /// Deletes the membership if it has the given origin and lowers the
    /// club's `member_count` by one (floored at zero), both or neither.
    async fn withdraw(
        &self,
        user_id: &str,
        club_id: &str,
        origin: MembershipOrigin,
    ) -> StoreResult<bool>;

    async fn list_memberships(&self, user_id: &str) -> StoreResult<Vec<Membership>>;

    /// Sets `dues_paid` on an auto membership; `false` if there is none.
    async fn mark_dues_paid(&self, user_id: &str, club_id: &str) -> StoreResult<bool>;
}

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn insert_post(&self, post: &Post) -> StoreResult<()>;

    async fn find_post(&self, id: &str) -> StoreResult<Option<Post>>;

    /// Public posts matching `filter`, ordered pinned first, then newest,
    /// then by id descending. Returns the page and the total match count.
    async fn query_posts(
        &self,
        filter: &FeedFilter,
        skip: u64,
        limit: u64,
    ) -> StoreResult<(Vec<Post>, u64)>;

    async fn set_pinned(&self, post_id: &str, pinned: bool) -> StoreResult<Option<Post>>;

    /// `None` when the post does not exist.
    async fn toggle_post_like(&self, post_id: &str, user_id: &str)
        -> StoreResult<Option<LikeToggle>>;

    async fn increment_shares(&self, post_id: &str) -> StoreResult<Option<i64>>;

    async fn increment_comment_count(&self, post_id: &str) -> StoreResult<()>;

    async fn insert_comment(&self, comment: &Comment) -> StoreResult<()>;

    async fn find_comment(&self, id: &str) -> StoreResult<Option<Comment>>;

    /// Up to `per_post` newest comments of each post, keyed by post id, in
    /// one round trip. Posts without comments are absent from the map.
    async fn recent_comments(
        &self,
        post_ids: &[String],
        per_post: u64,
    ) -> StoreResult<HashMap<String, Vec<Comment>>>;

    /// Oldest first, with the total comment count of the post.
    async fn list_comments(
        &self,
        post_id: &str,
        skip: u64,
        limit: u64,
    ) -> StoreResult<(Vec<Comment>, u64)>;

    async fn toggle_comment_like(
        &self,
        comment_id: &str,
        user_id: &str,
    ) -> StoreResult<Option<LikeToggle>>;
}

/// The full persistence collaborator.
pub trait Store: UserStore + ClubStore + MembershipStore + PostStore {
    fn backend(&self) -> StoreBackend;
}

/// Shared ordering of the feed: pinned first, newest first, id as tie-break.
pub(crate) fn feed_order(a: &Post, b: &Post) -> std::cmp::Ordering {
    b.is_pinned
        .cmp(&a.is_pinned)
        .then(b.created_at.cmp(&a.created_at))
        .then(b.id.cmp(&a.id))
}
