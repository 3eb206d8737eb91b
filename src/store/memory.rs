use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::StoreBackend;
use crate::models::{
    Club, ClubType, Comment, FeedFilter, Membership, MembershipOrigin, Post, User,
};
use crate::store::{
    feed_order, ClubStore, LikeToggle, MembershipStore, PostStore, Store, StoreError,
    StoreResult, UserStore,
};

type Pair = (String, String);

fn pair(user_id: &str, club_id: &str) -> Pair {
    (user_id.to_string(), club_id.to_string())
}

#[derive(Default)]
struct Collections {
    users: HashMap<String, User>,
    clubs: HashMap<String, Club>,
    club_keys: HashMap<String, String>,
    memberships: HashMap<Pair, Membership>,
    posts: HashMap<String, Post>,
    comments: HashMap<String, Comment>,
}

/// In-process store. Each mutation runs under a single write guard, which
/// gives the same atomicity the Mongo adapter gets from `$inc`/`$addToSet`.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
    #[cfg(test)]
    failing_club: RwLock<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Collections>> {
        self.inner.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Collections>> {
        self.inner.write().map_err(|_| StoreError::Poisoned)
    }

    /// Makes every `enroll` into `club_id` fail before it writes anything.
    #[cfg(test)]
    pub fn fail_enrollments_into(&self, club_id: Option<&str>) {
        if let Ok(mut failing) = self.failing_club.write() {
            *failing = club_id.map(str::to_string);
        }
    }

    #[cfg(test)]
    fn injected_failure(&self, club_id: &str) -> StoreResult<()> {
        match self.failing_club.read() {
            Ok(failing) if failing.as_deref() == Some(club_id) => {
                Err(StoreError::Database(format!("enroll into {} failed", club_id)))
            }
            _ => Ok(()),
        }
    }

    #[cfg(not(test))]
    fn injected_failure(&self, _club_id: &str) -> StoreResult<()> {
        Ok(())
    }
}

impl Store for MemoryStore {
    fn backend(&self) -> StoreBackend {
        StoreBackend::Memory
    }
}

fn adjust_members(clubs: &mut HashMap<String, Club>, club_id: &str, delta: i64) {
    if let Some(club) = clubs.get_mut(club_id) {
        club.member_count = (club.member_count + delta).max(0);
    }
}

fn toggle(likes: &mut Vec<String>, like_count: &mut i64, user_id: &str) -> LikeToggle {
    let liked = match likes.iter().position(|l| l == user_id) {
        Some(idx) => {
            likes.remove(idx);
            false
        }
        None => {
            likes.push(user_id.to_string());
            true
        }
    };
    *like_count = likes.len() as i64;
    LikeToggle {
        liked,
        like_count: *like_count,
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<bool> {
        let mut db = self.write()?;
        if db.users.contains_key(&user.id) {
            return Ok(false);
        }
        db.users.insert(user.id.clone(), user.clone());
        Ok(true)
    }

    async fn find_user(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.get(id).cloned())
    }

    async fn find_users(&self, ids: &[String]) -> StoreResult<Vec<User>> {
        let db = self.read()?;
        Ok(ids.iter().filter_map(|id| db.users.get(id).cloned()).collect())
    }
}

#[async_trait]
impl ClubStore for MemoryStore {
    async fn insert_club(&self, club: &Club) -> StoreResult<bool> {
        let mut db = self.write()?;
        if let Some(key) = &club.match_key {
            if db.club_keys.contains_key(key) {
                return Ok(false);
            }
            db.club_keys.insert(key.clone(), club.id.clone());
        }
        db.clubs.insert(club.id.clone(), club.clone());
        Ok(true)
    }

    async fn find_club(&self, id: &str) -> StoreResult<Option<Club>> {
        Ok(self.read()?.clubs.get(id).cloned())
    }

    async fn find_club_by_key(&self, match_key: &str) -> StoreResult<Option<Club>> {
        let db = self.read()?;
        Ok(db
            .club_keys
            .get(match_key)
            .and_then(|id| db.clubs.get(id))
            .cloned())
    }

    async fn find_clubs(&self, ids: &[String]) -> StoreResult<Vec<Club>> {
        let db = self.read()?;
        Ok(ids.iter().filter_map(|id| db.clubs.get(id).cloned()).collect())
    }

    async fn list_clubs(&self, club_type: Option<ClubType>) -> StoreResult<Vec<Club>> {
        let db = self.read()?;
        let mut clubs: Vec<Club> = db
            .clubs
            .values()
            .filter(|c| club_type.map_or(true, |t| c.club_type == t))
            .cloned()
            .collect();
        clubs.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(clubs)
    }
}

#[async_trait]
impl MembershipStore for MemoryStore {
    async fn enroll(&self, membership: &Membership) -> StoreResult<bool> {
        self.injected_failure(&membership.club_id)?;
        let mut db = self.write()?;
        let key = pair(&membership.user_id, &membership.club_id);
        if db.memberships.contains_key(&key) {
            return Ok(false);
        }
        db.memberships.insert(key, membership.clone());
        adjust_members(&mut db.clubs, &membership.club_id, 1);
        Ok(true)
    }

    async fn find_membership(
        &self,
        user_id: &str,
        club_id: &str,
    ) -> StoreResult<Option<Membership>> {
        Ok(self
            .read()?
            .memberships
            .get(&pair(user_id, club_id))
            .cloned())
    }

    async fn withdraw(
        &self,
        user_id: &str,
        club_id: &str,
        origin: MembershipOrigin,
    ) -> StoreResult<bool> {
        let mut db = self.write()?;
        let key = pair(user_id, club_id);
        let removable = db.memberships.get(&key).is_some_and(|m| m.origin == origin);
        if removable {
            db.memberships.remove(&key);
            adjust_members(&mut db.clubs, club_id, -1);
        }
        Ok(removable)
    }

    async fn list_memberships(&self, user_id: &str) -> StoreResult<Vec<Membership>> {
        let db = self.read()?;
        let mut memberships: Vec<Membership> = db
            .memberships
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        memberships.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then(a.id.cmp(&b.id)));
        Ok(memberships)
    }

    async fn mark_dues_paid(&self, user_id: &str, club_id: &str) -> StoreResult<bool> {
        let mut db = self.write()?;
        match db.memberships.get_mut(&pair(user_id, club_id)) {
            Some(m) if m.origin == MembershipOrigin::Auto => {
                m.dues_paid = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn insert_post(&self, post: &Post) -> StoreResult<()> {
        self.write()?.posts.insert(post.id.clone(), post.clone());
        Ok(())
    }

    async fn find_post(&self, id: &str) -> StoreResult<Option<Post>> {
        Ok(self.read()?.posts.get(id).cloned())
    }

    async fn query_posts(
        &self,
        filter: &FeedFilter,
        skip: u64,
        limit: u64,
    ) -> StoreResult<(Vec<Post>, u64)> {
        let db = self.read()?;
        let mut matching: Vec<&Post> = db.posts.values().filter(|p| filter.matches(p)).collect();
        matching.sort_by(|a, b| feed_order(a, b));
        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn set_pinned(&self, post_id: &str, pinned: bool) -> StoreResult<Option<Post>> {
        let mut db = self.write()?;
        Ok(db.posts.get_mut(post_id).map(|post| {
            post.is_pinned = pinned;
            post.clone()
        }))
    }

    async fn toggle_post_like(
        &self,
        post_id: &str,
        user_id: &str,
    ) -> StoreResult<Option<LikeToggle>> {
        let mut db = self.write()?;
        Ok(db
            .posts
            .get_mut(post_id)
            .map(|post| toggle(&mut post.likes, &mut post.like_count, user_id)))
    }

    async fn increment_shares(&self, post_id: &str) -> StoreResult<Option<i64>> {
        let mut db = self.write()?;
        Ok(db.posts.get_mut(post_id).map(|post| {
            post.share_count += 1;
            post.share_count
        }))
    }

    async fn increment_comment_count(&self, post_id: &str) -> StoreResult<()> {
        let mut db = self.write()?;
        if let Some(post) = db.posts.get_mut(post_id) {
            post.comment_count += 1;
        }
        Ok(())
    }

    async fn insert_comment(&self, comment: &Comment) -> StoreResult<()> {
        self.write()?
            .comments
            .insert(comment.id.clone(), comment.clone());
        Ok(())
    }

    async fn find_comment(&self, id: &str) -> StoreResult<Option<Comment>> {
        Ok(self.read()?.comments.get(id).cloned())
    }

    async fn recent_comments(
        &self,
        post_ids: &[String],
        per_post: u64,
    ) -> StoreResult<HashMap<String, Vec<Comment>>> {
        let db = self.read()?;
        let mut grouped: HashMap<String, Vec<Comment>> = HashMap::new();
        for comment in db.comments.values().filter(|c| post_ids.contains(&c.post_id)) {
            grouped
                .entry(comment.post_id.clone())
                .or_default()
                .push(comment.clone());
        }
        for comments in grouped.values_mut() {
            comments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            comments.truncate(per_post as usize);
        }
        Ok(grouped)
    }

    async fn list_comments(
        &self,
        post_id: &str,
        skip: u64,
        limit: u64,
    ) -> StoreResult<(Vec<Comment>, u64)> {
        let db = self.read()?;
        let mut comments: Vec<&Comment> =
            db.comments.values().filter(|c| c.post_id == post_id).collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        let total = comments.len() as u64;
        let page = comments
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn toggle_comment_like(
        &self,
        comment_id: &str,
        user_id: &str,
    ) -> StoreResult<Option<LikeToggle>> {
        let mut db = self.write()?;
        Ok(db
            .comments
            .get_mut(comment_id)
            .map(|comment| toggle(&mut comment.likes, &mut comment.like_count, user_id)))
    }
}
