// ==================== MONGODB STORE ====================
// Counters use $inc, like-sets use $addToSet/$pull behind guarding filters,
// and uniqueness comes from the indexes created in `MongoDB::ensure_indexes`.
// A membership and its club's member_count change in one transaction.

use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::error::{
    ErrorKind, WriteFailure, TRANSIENT_TRANSACTION_ERROR, UNKNOWN_TRANSACTION_COMMIT_RESULT,
};
use mongodb::options::ReturnDocument;
use mongodb::ClientSession;
use std::collections::HashMap;

use super::{MongoDB, CLUBS, COMMENTS, MEMBERSHIPS, POSTS, USERS};
use crate::config::StoreBackend;
use crate::models::{
    Club, ClubType, Comment, FeedFilter, Membership, MembershipOrigin, Post, User,
};
use crate::store::{
    ClubStore, LikeToggle, MembershipStore, PostStore, Store, StoreError, StoreResult,
    UserStore,
};

const DUPLICATE_KEY: i32 = 11000;
const TOGGLE_ATTEMPTS: usize = 5;
const TRANSACTION_ATTEMPTS: usize = 5;

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY
    )
}

/// Maps a unique-index violation to `Ok(false)`.
fn inserted<T>(result: mongodb::error::Result<T>) -> StoreResult<bool> {
    match result {
        Ok(_) => Ok(true),
        Err(e) if is_duplicate_key(&e) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn feed_query(filter: &FeedFilter) -> Document {
    let mut query = doc! { "is_public": true };
    if let Some(club_id) = &filter.club_id {
        query.insert("club_id", club_id.as_str());
    }
    if let Some(author_id) = &filter.author_id {
        query.insert("author_id", author_id.as_str());
    }
    if let Some(tag) = &filter.tag {
        query.insert("tags", tag.as_str());
    }
    if let Some(search) = &filter.search {
        let pattern = doc! { "$regex": regex::escape(search), "$options": "i" };
        query.insert(
            "$or",
            vec![
                doc! { "title": pattern.clone() },
                doc! { "content": pattern.clone() },
                doc! { "tags": pattern },
            ],
        );
    }
    query
}

fn decode<T: serde::de::DeserializeOwned>(document: Document) -> StoreResult<T> {
    mongodb::bson::from_document(document).map_err(|e| StoreError::Database(e.to_string()))
}

/// Commits, re-trying only the commit itself while its outcome is unknown.
async fn commit(session: &mut ClientSession) -> mongodb::error::Result<()> {
    let mut attempt = 0;
    loop {
        match session.commit_transaction().await {
            Err(e) if e.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT)
                && attempt + 1 < TRANSACTION_ATTEMPTS =>
            {
                attempt += 1;
            }
            other => return other,
        }
    }
}

/// A membership write together with its member_count adjustment.
enum CountedWrite<'a> {
    Enroll(&'a Membership),
    Withdraw {
        user_id: &'a str,
        club_id: &'a str,
        origin: MembershipOrigin,
    },
}

impl CountedWrite<'_> {
    fn club_id(&self) -> &str {
        match self {
            CountedWrite::Enroll(membership) => &membership.club_id,
            CountedWrite::Withdraw { club_id, .. } => club_id,
        }
    }
}

fn like_count_of(document: &Document) -> i64 {
    document
        .get_array("likes")
        .map(|likes| likes.len() as i64)
        .unwrap_or(0)
}

impl MongoDB {
    /// Both writes of `write` inside the open transaction. `Ok(false)` means
    /// the membership step matched nothing and the transaction must be aborted.
    async fn apply_counted(
        &self,
        session: &mut ClientSession,
        write: &CountedWrite<'_>,
    ) -> mongodb::error::Result<bool> {
        let memberships = self.collection::<Membership>(MEMBERSHIPS);
        let clubs = self.collection::<Document>(CLUBS);

        match write {
            CountedWrite::Enroll(membership) => {
                match memberships.insert_one(*membership).session(&mut *session).await {
                    Ok(_) => {}
                    Err(e) if is_duplicate_key(&e) => return Ok(false),
                    Err(e) => return Err(e),
                }
                clubs
                    .update_one(
                        doc! { "_id": membership.club_id.as_str() },
                        doc! { "$inc": { "member_count": 1_i64 } },
                    )
                    .session(&mut *session)
                    .await?;
            }
            CountedWrite::Withdraw {
                user_id,
                club_id,
                origin,
            } => {
                let deleted = memberships
                    .delete_one(doc! {
                        "user_id": *user_id,
                        "club_id": *club_id,
                        "origin": origin.as_str(),
                    })
                    .session(&mut *session)
                    .await?;
                if deleted.deleted_count == 0 {
                    return Ok(false);
                }
                clubs
                    .update_one(
                        doc! { "_id": *club_id, "member_count": { "$gt": 0_i64 } },
                        doc! { "$inc": { "member_count": -1_i64 } },
                    )
                    .session(&mut *session)
                    .await?;
            }
        }
        Ok(true)
    }

    async fn counted_write(&self, write: CountedWrite<'_>) -> StoreResult<bool> {
        let mut session = self.client.start_session().await?;

        for attempt in 0..TRANSACTION_ATTEMPTS {
            session.start_transaction().await?;
            let outcome = match self.apply_counted(&mut session, &write).await {
                Ok(true) => commit(&mut session).await.map(|_| true),
                Ok(false) => {
                    let _ = session.abort_transaction().await;
                    return Ok(false);
                }
                Err(e) => {
                    let _ = session.abort_transaction().await;
                    Err(e)
                }
            };

            match outcome {
                Ok(written) => return Ok(written),
                Err(e) if e.contains_label(TRANSIENT_TRANSACTION_ERROR) => log::debug!(
                    "🔁 Membership write on club {} hit a transient conflict (attempt {})",
                    write.club_id(),
                    attempt + 1
                ),
                Err(e) => return Err(e.into()),
            }
        }

        Err(StoreError::Contention(format!("{}/{}", CLUBS, write.club_id())))
    }

    /// Flips `user_id` in the like-set of one document. Each branch is a
    /// single `find_one_and_update`, and the count is read from the
    /// post-update document.
    async fn toggle_like_in(
        &self,
        collection: &str,
        id: &str,
        user_id: &str,
    ) -> StoreResult<Option<LikeToggle>> {
        let coll = self.collection::<Document>(collection);

        for attempt in 0..TOGGLE_ATTEMPTS {
            let liked = coll
                .find_one_and_update(
                    doc! { "_id": id, "likes": { "$ne": user_id } },
                    doc! { "$addToSet": { "likes": user_id }, "$inc": { "like_count": 1 } },
                )
                .return_document(ReturnDocument::After)
                .await?;
            if let Some(after) = liked {
                return Ok(Some(LikeToggle {
                    liked: true,
                    like_count: like_count_of(&after),
                }));
            }

            let unliked = coll
                .find_one_and_update(
                    doc! { "_id": id, "likes": user_id },
                    doc! { "$pull": { "likes": user_id }, "$inc": { "like_count": -1 } },
                )
                .return_document(ReturnDocument::After)
                .await?;
            if let Some(after) = unliked {
                return Ok(Some(LikeToggle {
                    liked: false,
                    like_count: like_count_of(&after),
                }));
            }

            if coll.count_documents(doc! { "_id": id }).await? == 0 {
                return Ok(None);
            }
            log::debug!(
                "🔁 Like toggle on {}/{} raced a concurrent toggle (attempt {})",
                collection,
                id,
                attempt + 1
            );
        }

        Err(StoreError::Contention(format!("{}/{}", collection, id)))
    }
}

impl Store for MongoDB {
    fn backend(&self) -> StoreBackend {
        StoreBackend::Mongo
    }
}

#[async_trait]
impl UserStore for MongoDB {
    async fn insert_user(&self, user: &User) -> StoreResult<bool> {
        inserted(self.collection::<User>(USERS).insert_one(user).await)
    }

    async fn find_user(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self
            .collection::<User>(USERS)
            .find_one(doc! { "_id": id })
            .await?)
    }

    async fn find_users(&self, ids: &[String]) -> StoreResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self
            .collection::<User>(USERS)
            .find(doc! { "_id": { "$in": ids.to_vec() } })
            .await?;
        Ok(cursor.try_collect().await?)
    }
}

#[async_trait]
impl ClubStore for MongoDB {
    async fn insert_club(&self, club: &Club) -> StoreResult<bool> {
        inserted(self.collection::<Club>(CLUBS).insert_one(club).await)
    }

    async fn find_club(&self, id: &str) -> StoreResult<Option<Club>> {
        Ok(self
            .collection::<Club>(CLUBS)
            .find_one(doc! { "_id": id })
            .await?)
    }

    async fn find_club_by_key(&self, match_key: &str) -> StoreResult<Option<Club>> {
        Ok(self
            .collection::<Club>(CLUBS)
            .find_one(doc! { "match_key": match_key })
            .await?)
    }

    async fn find_clubs(&self, ids: &[String]) -> StoreResult<Vec<Club>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self
            .collection::<Club>(CLUBS)
            .find(doc! { "_id": { "$in": ids.to_vec() } })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn list_clubs(&self, club_type: Option<ClubType>) -> StoreResult<Vec<Club>> {
        let filter = match club_type {
            Some(t) => doc! { "club_type": t.as_str() },
            None => doc! {},
        };
        let cursor = self
            .collection::<Club>(CLUBS)
            .find(filter)
            .sort(doc! { "name": 1, "_id": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }
}

#[async_trait]
impl MembershipStore for MongoDB {
    async fn enroll(&self, membership: &Membership) -> StoreResult<bool> {
        self.counted_write(CountedWrite::Enroll(membership)).await
    }

    async fn find_membership(
        &self,
        user_id: &str,
        club_id: &str,
    ) -> StoreResult<Option<Membership>> {
        Ok(self
            .collection::<Membership>(MEMBERSHIPS)
            .find_one(doc! { "user_id": user_id, "club_id": club_id })
            .await?)
    }

    async fn withdraw(
        &self,
        user_id: &str,
        club_id: &str,
        origin: MembershipOrigin,
    ) -> StoreResult<bool> {
        self.counted_write(CountedWrite::Withdraw {
            user_id,
            club_id,
            origin,
        })
        .await
    }

    async fn list_memberships(&self, user_id: &str) -> StoreResult<Vec<Membership>> {
        let cursor = self
            .collection::<Membership>(MEMBERSHIPS)
            .find(doc! { "user_id": user_id })
            .sort(doc! { "joined_at": 1, "_id": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn mark_dues_paid(&self, user_id: &str, club_id: &str) -> StoreResult<bool> {
        let result = self
            .collection::<Membership>(MEMBERSHIPS)
            .update_one(
                doc! {
                    "user_id": user_id,
                    "club_id": club_id,
                    "origin": MembershipOrigin::Auto.as_str(),
                },
                doc! { "$set": { "dues_paid": true } },
            )
            .await?;
        Ok(result.matched_count > 0)
    }
}

#[async_trait]
impl PostStore for MongoDB {
    async fn insert_post(&self, post: &Post) -> StoreResult<()> {
        self.collection::<Post>(POSTS).insert_one(post).await?;
        Ok(())
    }

    async fn find_post(&self, id: &str) -> StoreResult<Option<Post>> {
        Ok(self
            .collection::<Post>(POSTS)
            .find_one(doc! { "_id": id })
            .await?)
    }

    async fn query_posts(
        &self,
        filter: &FeedFilter,
        skip: u64,
        limit: u64,
    ) -> StoreResult<(Vec<Post>, u64)> {
        let posts = self.collection::<Post>(POSTS);
        let query = feed_query(filter);

        let total = posts.count_documents(query.clone()).await?;
        let cursor = posts
            .find(query)
            .sort(doc! { "is_pinned": -1, "created_at": -1, "_id": -1 })
            .skip(skip)
            .limit(limit as i64)
            .await?;
        Ok((cursor.try_collect().await?, total))
    }

    async fn set_pinned(&self, post_id: &str, pinned: bool) -> StoreResult<Option<Post>> {
        Ok(self
            .collection::<Post>(POSTS)
            .find_one_and_update(
                doc! { "_id": post_id },
                doc! { "$set": { "is_pinned": pinned } },
            )
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn toggle_post_like(
        &self,
        post_id: &str,
        user_id: &str,
    ) -> StoreResult<Option<LikeToggle>> {
        self.toggle_like_in(POSTS, post_id, user_id).await
    }

    async fn increment_shares(&self, post_id: &str) -> StoreResult<Option<i64>> {
        let post = self
            .collection::<Post>(POSTS)
            .find_one_and_update(
                doc! { "_id": post_id },
                doc! { "$inc": { "share_count": 1_i64 } },
            )
            .return_document(ReturnDocument::After)
            .await?;
        Ok(post.map(|p| p.share_count))
    }

    async fn increment_comment_count(&self, post_id: &str) -> StoreResult<()> {
        self.collection::<Document>(POSTS)
            .update_one(
                doc! { "_id": post_id },
                doc! { "$inc": { "comment_count": 1_i64 } },
            )
            .await?;
        Ok(())
    }

    async fn insert_comment(&self, comment: &Comment) -> StoreResult<()> {
        self.collection::<Comment>(COMMENTS)
            .insert_one(comment)
            .await?;
        Ok(())
    }

    async fn find_comment(&self, id: &str) -> StoreResult<Option<Comment>> {
        Ok(self
            .collection::<Comment>(COMMENTS)
            .find_one(doc! { "_id": id })
            .await?)
    }

    async fn recent_comments(
        &self,
        post_ids: &[String],
        per_post: u64,
    ) -> StoreResult<HashMap<String, Vec<Comment>>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let pipeline = vec![
            doc! { "$match": { "post_id": { "$in": post_ids.to_vec() } } },
            doc! { "$sort": { "created_at": -1, "_id": -1 } },
            doc! { "$group": { "_id": "$post_id", "comments": { "$push": "$$ROOT" } } },
            doc! { "$project": { "comments": { "$slice": ["$comments", per_post as i64] } } },
        ];
        let mut cursor = self
            .collection::<Document>(COMMENTS)
            .aggregate(pipeline)
            .await?;

        let mut grouped = HashMap::new();
        while let Some(group) = cursor.try_next().await? {
            let post_id = group
                .get_str("_id")
                .map_err(|e| StoreError::Database(e.to_string()))?
                .to_string();
            let comments = group
                .get_array("comments")
                .map_err(|e| StoreError::Database(e.to_string()))?
                .iter()
                .filter_map(|c| c.as_document().cloned())
                .map(decode::<Comment>)
                .collect::<StoreResult<Vec<_>>>()?;
            grouped.insert(post_id, comments);
        }
        Ok(grouped)
    }

    async fn list_comments(
        &self,
        post_id: &str,
        skip: u64,
        limit: u64,
    ) -> StoreResult<(Vec<Comment>, u64)> {
        let comments = self.collection::<Comment>(COMMENTS);
        let total = comments
            .count_documents(doc! { "post_id": post_id })
            .await?;
        let cursor = comments
            .find(doc! { "post_id": post_id })
            .sort(doc! { "created_at": 1, "_id": 1 })
            .skip(skip)
            .limit(limit as i64)
            .await?;
        Ok((cursor.try_collect().await?, total))
    }

    async fn toggle_comment_like(
        &self,
        comment_id: &str,
        user_id: &str,
    ) -> StoreResult<Option<LikeToggle>> {
        self.toggle_like_in(COMMENTS, comment_id, user_id).await
    }
}
