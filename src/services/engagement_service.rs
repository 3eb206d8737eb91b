// ==================== ENGAGEMENT ====================
// Like toggles are a single atomic store operation each; the returned count is
// read from the post-update state, never from an earlier read.

use crate::{
    store::{LikeToggle, Store},
    utils::{AppError, AppResult},
};

pub async fn toggle_like(store: &dyn Store, post_id: &str, user_id: &str) -> AppResult<LikeToggle> {
    let result = store
        .toggle_post_like(post_id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))?;

    log::debug!(
        "Post {} like by {}: liked={} count={}",
        post_id,
        user_id,
        result.liked,
        result.like_count
    );
    Ok(result)
}

pub async fn toggle_comment_like(
    store: &dyn Store,
    comment_id: &str,
    user_id: &str,
) -> AppResult<LikeToggle> {
    store
        .toggle_comment_like(comment_id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("comment {}", comment_id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Comment, Post};
    use crate::store::{MemoryStore, PostStore};
    use std::sync::Arc;

    fn post(id: &str) -> Post {
        Post {
            id: id.to_string(),
            author_id: "author".to_string(),
            club_id: None,
            title: "Hello".to_string(),
            content: "Hello campus, first post".to_string(),
            tags: Vec::new(),
            is_public: true,
            is_pinned: false,
            likes: Vec::new(),
            like_count: 0,
            comment_count: 0,
            share_count: 0,
            created_at: 1,
        }
    }

    #[tokio::test]
    async fn test_toggle_twice_restores_count() {
        let store = MemoryStore::new();
        store.insert_post(&post("p1")).await.unwrap();
        toggle_like(&store, "p1", "other").await.unwrap();

        let liked = toggle_like(&store, "p1", "u1").await.unwrap();
        assert_eq!(liked, LikeToggle { liked: true, like_count: 2 });

        let unliked = toggle_like(&store, "p1", "u1").await.unwrap();
        assert_eq!(unliked, LikeToggle { liked: false, like_count: 1 });
    }

    #[tokio::test]
    async fn test_unknown_targets_are_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            toggle_like(&store, "missing", "u1").await.unwrap_err(),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            toggle_comment_like(&store, "missing", "u1").await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_comment_likes_toggle() {
        let store = MemoryStore::new();
        store
            .insert_comment(&Comment {
                id: "c1".into(),
                post_id: "p1".into(),
                author_id: "u2".into(),
                content: "nice".into(),
                parent_id: None,
                likes: Vec::new(),
                like_count: 0,
                created_at: 1,
            })
            .await
            .unwrap();

        assert!(toggle_comment_like(&store, "c1", "u1").await.unwrap().liked);
        let second = toggle_comment_like(&store, "c1", "u1").await.unwrap();
        assert_eq!(second, LikeToggle { liked: false, like_count: 0 });
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_toggles_lose_no_updates() {
        let store = Arc::new(MemoryStore::new());
        store.insert_post(&post("p1")).await.unwrap();

        let handles: Vec<_> = (0..50)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    toggle_like(store.as_ref(), "p1", &format!("u{}", i)).await.unwrap()
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().liked);
        }

        // Same user from two sessions: an even number of toggles cancels out
        let handles: Vec<_> = (0..10)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { toggle_like(store.as_ref(), "p1", "u0").await.unwrap() })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let stored = store.find_post("p1").await.unwrap().unwrap();
        assert_eq!(stored.likes.len(), 50);
        assert_eq!(stored.like_count, 50);
        assert!(stored.likes.iter().any(|l| l == "u0"));
    }
}
