// ==================== FEED ====================
// Posts and comments with author/club identity resolved for display.

use std::collections::HashMap;

use crate::{
    models::{
        Actor, AuthorSummary, ClubSummary, Comment, CommentView, CreateCommentRequest,
        CreatePostRequest, FeedFilter, Page, PageRequest, Post, PostView,
    },
    services::club_directory,
    store::Store,
    utils::{new_id, now_millis, AppError, AppResult},
};

/// Comments embedded in each listed post.
pub const PREVIEW_COMMENTS: u64 = 3;

async fn authors(store: &dyn Store, ids: Vec<String>) -> AppResult<HashMap<String, AuthorSummary>> {
    let mut ids = ids;
    ids.sort();
    ids.dedup();
    Ok(store
        .find_users(&ids)
        .await?
        .iter()
        .map(|u| (u.id.clone(), AuthorSummary::from(u)))
        .collect())
}

fn author_of(authors: &HashMap<String, AuthorSummary>, id: &str) -> AuthorSummary {
    authors
        .get(id)
        .cloned()
        .unwrap_or_else(|| AuthorSummary::unknown(id))
}

async fn render_comments(store: &dyn Store, comments: &[Comment]) -> AppResult<Vec<CommentView>> {
    let authors = authors(store, comments.iter().map(|c| c.author_id.clone()).collect()).await?;
    Ok(comments
        .iter()
        .map(|c| CommentView::new(c, author_of(&authors, &c.author_id)))
        .collect())
}

async fn render_posts(
    store: &dyn Store,
    posts: &[Post],
    viewer_id: Option<&str>,
) -> AppResult<Vec<PostView>> {
    let post_ids: Vec<String> = posts.iter().map(|p| p.id.clone()).collect();
    let mut previews = store.recent_comments(&post_ids, PREVIEW_COMMENTS).await?;

    let author_ids = posts
        .iter()
        .map(|p| p.author_id.clone())
        .chain(previews.values().flatten().map(|c| c.author_id.clone()))
        .collect();
    let authors = authors(store, author_ids).await?;

    let club_ids: Vec<String> = posts.iter().filter_map(|p| p.club_id.clone()).collect();
    let clubs: HashMap<String, ClubSummary> = store
        .find_clubs(&club_ids)
        .await?
        .iter()
        .map(|c| (c.id.clone(), ClubSummary::from(c)))
        .collect();

    Ok(posts
        .iter()
        .map(|post| {
            let recent = previews
                .remove(&post.id)
                .unwrap_or_default()
                .iter()
                .map(|c| CommentView::new(c, author_of(&authors, &c.author_id)))
                .collect();
            PostView::new(
                post,
                author_of(&authors, &post.author_id),
                post.club_id.as_ref().and_then(|id| clubs.get(id).cloned()),
                viewer_id,
                recent,
            )
        })
        .collect())
}

async fn render_post(store: &dyn Store, post: &Post, viewer_id: Option<&str>) -> AppResult<PostView> {
    render_posts(store, std::slice::from_ref(post), viewer_id)
        .await?
        .pop()
        .ok_or_else(|| AppError::NotFound(format!("post {}", post.id)))
}

/// Loads a post the viewer is allowed to see. Private posts are reported as
/// missing to everyone but their author and admins.
async fn visible_post(store: &dyn Store, post_id: &str, viewer: Option<&Actor>) -> AppResult<Post> {
    let post = store
        .find_post(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))?;

    let allowed = post.is_public
        || viewer.is_some_and(|v| v.is_admin() || v.user_id == post.author_id);
    if !allowed {
        return Err(AppError::NotFound(format!("post {}", post_id)));
    }
    Ok(post)
}

pub async fn create_post(
    store: &dyn Store,
    actor: &Actor,
    request: &CreatePostRequest,
) -> AppResult<PostView> {
    let new_post = request.validate().map_err(AppError::Validation)?;

    if let Some(club_id) = &new_post.club_id {
        club_directory::get_club(store, club_id).await?;
        if !actor.is_admin() && store.find_membership(&actor.user_id, club_id).await?.is_none() {
            log::warn!("⛔ User {} is not a member of club {}", actor.user_id, club_id);
            return Err(AppError::Forbidden(
                "only members can post to this club".into(),
            ));
        }
    }

    // Pinning is an admin privilege; everyone else is clamped, not rejected
    let is_pinned = new_post.is_pinned && actor.is_admin();
    if new_post.is_pinned && !is_pinned {
        log::debug!("Ignoring pin request from non-admin {}", actor.user_id);
    }

    let post = Post {
        id: new_id(),
        author_id: actor.user_id.clone(),
        club_id: new_post.club_id,
        title: new_post.title,
        content: new_post.content,
        tags: new_post.tags,
        is_public: new_post.is_public,
        is_pinned,
        likes: Vec::new(),
        like_count: 0,
        comment_count: 0,
        share_count: 0,
        created_at: now_millis(),
    };
    store.insert_post(&post).await?;

    log::info!("📝 Post {} created by {}", post.id, actor.user_id);
    render_post(store, &post, Some(&actor.user_id)).await
}

pub async fn list_feed(
    store: &dyn Store,
    filter: &FeedFilter,
    page: PageRequest,
    viewer_id: Option<&str>,
) -> AppResult<Page<PostView>> {
    let (posts, total) = store.query_posts(filter, page.skip(), page.limit).await?;
    let items = render_posts(store, &posts, viewer_id).await?;
    Ok(Page::new(items, page, total))
}

pub async fn get_post(store: &dyn Store, post_id: &str, viewer: Option<&Actor>) -> AppResult<PostView> {
    let post = visible_post(store, post_id, viewer).await?;
    render_post(store, &post, viewer.map(|v| v.user_id.as_str())).await
}

pub async fn add_comment(
    store: &dyn Store,
    actor: &Actor,
    post_id: &str,
    request: &CreateCommentRequest,
) -> AppResult<CommentView> {
    let new_comment = request.validate().map_err(AppError::Validation)?;
    visible_post(store, post_id, Some(actor)).await?;

    if let Some(parent_id) = &new_comment.parent_id {
        let parent = store
            .find_comment(parent_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("comment {}", parent_id)))?;
        if parent.post_id != post_id {
            return Err(AppError::validation(
                "parent_id",
                "parent comment belongs to another post",
            ));
        }
        if parent.parent_id.is_some() {
            return Err(AppError::validation("parent_id", "replies cannot be nested"));
        }
    }

    let comment = Comment {
        id: new_id(),
        post_id: post_id.to_string(),
        author_id: actor.user_id.clone(),
        content: new_comment.content,
        parent_id: new_comment.parent_id,
        likes: Vec::new(),
        like_count: 0,
        created_at: now_millis(),
    };
    store.insert_comment(&comment).await?;
    store.increment_comment_count(post_id).await?;

    log::info!("💬 Comment {} on post {} by {}", comment.id, post_id, actor.user_id);
    render_comments(store, std::slice::from_ref(&comment))
        .await?
        .pop()
        .ok_or_else(|| AppError::NotFound(format!("comment {}", comment.id)))
}

pub async fn list_comments(
    store: &dyn Store,
    post_id: &str,
    page: PageRequest,
    viewer: Option<&Actor>,
) -> AppResult<Page<CommentView>> {
    visible_post(store, post_id, viewer).await?;
    let (comments, total) = store.list_comments(post_id, page.skip(), page.limit).await?;
    let items = render_comments(store, &comments).await?;
    Ok(Page::new(items, page, total))
}

pub async fn set_pinned(
    store: &dyn Store,
    actor: &Actor,
    post_id: &str,
    pinned: bool,
) -> AppResult<PostView> {
    if !actor.is_admin() {
        log::warn!("⛔ Non-admin {} attempted to pin post {}", actor.user_id, post_id);
        return Err(AppError::Forbidden("only admins can pin posts".into()));
    }

    let post = store
        .set_pinned(post_id, pinned)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))?;

    log::info!("📌 Post {} pinned={} by {}", post_id, pinned, actor.user_id);
    render_post(store, &post, Some(&actor.user_id)).await
}

/// Returns the new share count.
pub async fn share_post(store: &dyn Store, actor: &Actor, post_id: &str) -> AppResult<i64> {
    visible_post(store, post_id, Some(actor)).await?;
    store
        .increment_shares(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::services::membership_service;
    use crate::store::{MemoryStore, PostStore};
    use crate::test_support::{admin, insert_user, seed_directory, student};

    fn post(id: &str, created_at: i64, is_pinned: bool, is_public: bool) -> Post {
        Post {
            id: id.to_string(),
            author_id: "author".to_string(),
            club_id: None,
            title: format!("Post {}", id),
            content: "Some campus news for everyone".to_string(),
            tags: vec!["news".to_string()],
            is_public,
            is_pinned,
            likes: Vec::new(),
            like_count: 0,
            comment_count: 0,
            share_count: 0,
            created_at,
        }
    }

    fn request(club: Option<&str>, pinned: bool) -> CreatePostRequest {
        CreatePostRequest {
            title: Some("Weekly meetup".into()),
            content: Some("Join us in the main hall on Friday".into()),
            tags: Some(vec!["Events".into()]),
            club_id: club.map(Into::into),
            is_pinned: Some(pinned),
            ..Default::default()
        }
    }

    async fn seeded_feed(store: &MemoryStore) {
        for i in 0..23 {
            let pinned = i % 7 == 0;
            let public = i % 11 != 5;
            store
                .insert_post(&post(&format!("p{:02}", i), 1_000 + (i % 4) as i64, pinned, public))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_pagination_covers_every_match_once() {
        let store = MemoryStore::new();
        seeded_feed(&store).await;
        let filter = FeedFilter::default();

        for limit in 1..=50 {
            let first = list_feed(&store, &filter, PageRequest::new(Some(1), Some(limit)), None)
                .await
                .unwrap();
            assert_eq!(first.total, 21);
            assert_eq!(first.total_pages, first.total.div_ceil(limit as u64));

            let mut seen = Vec::new();
            for page in 1..=first.total_pages.max(1) {
                let result = list_feed(&store, &filter, PageRequest::new(Some(page as i64), Some(limit)), None)
                    .await
                    .unwrap();
                assert_eq!(result.has_prev, page > 1);
                assert_eq!(result.has_next, page < first.total_pages);
                seen.extend(result.items.into_iter().map(|p| p.id));
            }
            assert_eq!(seen.len() as u64, first.total, "limit {}", limit);
            seen.sort();
            seen.dedup();
            assert_eq!(seen.len() as u64, first.total, "limit {}", limit);
        }
    }

    #[tokio::test]
    async fn test_feed_ranks_pinned_then_newest() {
        let store = MemoryStore::new();
        seeded_feed(&store).await;

        let page = list_feed(&store, &FeedFilter::default(), PageRequest::new(None, Some(50)), None)
            .await
            .unwrap();
        assert!(page.items.iter().all(|p| p.is_public));
        for pair in page.items.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(
                a.is_pinned > b.is_pinned
                    || (a.is_pinned == b.is_pinned && a.created_at >= b.created_at),
                "{} before {}",
                a.id,
                b.id
            );
        }
        assert!(page.items[0].is_pinned);
    }

    #[tokio::test]
    async fn test_limit_is_clamped() {
        let store = MemoryStore::new();
        seeded_feed(&store).await;
        let page = list_feed(&store, &FeedFilter::default(), PageRequest::new(Some(1), Some(500)), None)
            .await
            .unwrap();
        assert_eq!(page.limit, 50);
        let page = list_feed(&store, &FeedFilter::default(), PageRequest::new(Some(1), Some(0)), None)
            .await
            .unwrap();
        assert_eq!(page.limit, 1);
        assert_eq!(page.items.len(), 1);
    }

    #[tokio::test]
    async fn test_non_member_posts_after_joining() {
        let store = MemoryStore::new();
        let dir = seed_directory(&store).await;
        let actor = student("u1");

        let err = create_post(&store, &actor, &request(Some(&dir.chess.id), false))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        membership_service::join(&store, "u1", &dir.chess.id).await.unwrap();
        let view = create_post(&store, &actor, &request(Some(&dir.chess.id), false))
            .await
            .unwrap();
        assert_eq!(view.club.map(|c| c.id), Some(dir.chess.id.clone()));
        assert_eq!(view.tags, vec!["events".to_string()]);
        assert_eq!(
            club_directory::get_club(&store, &dir.chess.id).await.unwrap().member_count,
            1
        );
    }

    #[tokio::test]
    async fn test_post_to_unknown_club_is_not_found() {
        let store = MemoryStore::new();
        let err = create_post(&store, &admin(), &request(Some("missing"), false))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_pin_flag_clamped_for_non_admins() {
        let store = MemoryStore::new();
        insert_user(&store, "admin-1", Role::Admin).await;

        let pinned = create_post(&store, &admin(), &request(None, true)).await.unwrap();
        assert!(pinned.is_pinned);
        assert_eq!(pinned.author.name, "Student admin-1");

        let clamped = create_post(&store, &student("u1"), &request(None, true)).await.unwrap();
        assert!(!clamped.is_pinned);
        assert!(!store.find_post(&clamped.id).await.unwrap().unwrap().is_pinned);
    }

    #[tokio::test]
    async fn test_set_pinned_is_admin_only() {
        let store = MemoryStore::new();
        let view = create_post(&store, &student("u1"), &request(None, false)).await.unwrap();

        let err = set_pinned(&store, &student("u1"), &view.id, true).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        assert!(set_pinned(&store, &admin(), &view.id, true).await.unwrap().is_pinned);
        assert!(matches!(
            set_pinned(&store, &admin(), "missing", true).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_comments_preview_and_counter() {
        let store = MemoryStore::new();
        let view = create_post(&store, &student("u1"), &request(None, false)).await.unwrap();

        let mut ids = Vec::new();
        for i in 0..5 {
            let req = CreateCommentRequest {
                content: Some(format!("comment {}", i)),
                parent_id: None,
            };
            ids.push(add_comment(&store, &student("u2"), &view.id, &req).await.unwrap().id);
        }

        let fetched = get_post(&store, &view.id, None).await.unwrap();
        assert_eq!(fetched.comment_count, 5);
        assert_eq!(fetched.recent_comments.len(), 3);

        let all = list_comments(&store, &view.id, PageRequest::new(Some(1), Some(10)), None)
            .await
            .unwrap();
        assert_eq!(all.total, 5);
        assert!(all.items.windows(2).all(|w| w[0].created_at <= w[1].created_at));
        let mut listed: Vec<String> = all.items.into_iter().map(|c| c.id).collect();
        listed.sort();
        ids.sort();
        assert_eq!(listed, ids);
    }

    #[tokio::test]
    async fn test_feed_previews_belong_to_their_post() {
        let store = MemoryStore::new();
        let mut posts = Vec::new();
        for (i, comments) in [4, 1, 0].into_iter().enumerate() {
            let view = create_post(&store, &student(&format!("u{}", i)), &request(None, false))
                .await
                .unwrap();
            for c in 0..comments {
                let req = CreateCommentRequest {
                    content: Some(format!("comment {} on {}", c, view.id)),
                    parent_id: None,
                };
                add_comment(&store, &student("u9"), &view.id, &req).await.unwrap();
            }
            posts.push((view.id, comments.min(PREVIEW_COMMENTS as usize)));
        }

        let feed = list_feed(&store, &FeedFilter::default(), PageRequest::new(None, None), None)
            .await
            .unwrap();
        assert_eq!(feed.items.len(), 3);
        for (id, expected) in posts {
            let item = feed.items.iter().find(|p| p.id == id).unwrap();
            assert_eq!(item.recent_comments.len(), expected, "{}", id);
            assert!(item.recent_comments.iter().all(|c| c.post_id == id));
        }
    }

    #[tokio::test]
    async fn test_replies_are_one_level_deep() {
        let store = MemoryStore::new();
        let first = create_post(&store, &student("u1"), &request(None, false)).await.unwrap();
        let second = create_post(&store, &student("u1"), &request(None, false)).await.unwrap();
        let comment = |content: &str, parent: Option<&str>| CreateCommentRequest {
            content: Some(content.into()),
            parent_id: parent.map(Into::into),
        };

        let top = add_comment(&store, &student("u2"), &first.id, &comment("top", None))
            .await
            .unwrap();
        let reply = add_comment(&store, &student("u3"), &first.id, &comment("reply", Some(&top.id)))
            .await
            .unwrap();
        assert_eq!(reply.parent_id.as_deref(), Some(top.id.as_str()));

        let nested = add_comment(&store, &student("u2"), &first.id, &comment("deeper", Some(&reply.id)))
            .await
            .unwrap_err();
        assert!(matches!(nested, AppError::Validation(_)));

        let cross = add_comment(&store, &student("u2"), &second.id, &comment("elsewhere", Some(&top.id)))
            .await
            .unwrap_err();
        assert!(matches!(cross, AppError::Validation(_)));

        let orphan = add_comment(&store, &student("u2"), &first.id, &comment("lost", Some("missing")))
            .await
            .unwrap_err();
        assert!(matches!(orphan, AppError::NotFound(_)));

        let no_post = add_comment(&store, &student("u2"), "missing", &comment("hi", None))
            .await
            .unwrap_err();
        assert!(matches!(no_post, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_private_posts_hidden_from_feed_and_strangers() {
        let store = MemoryStore::new();
        let req = CreatePostRequest {
            is_public: Some(false),
            ..request(None, false)
        };
        let view = create_post(&store, &student("u1"), &req).await.unwrap();

        let feed = list_feed(&store, &FeedFilter::default(), PageRequest::default(), None)
            .await
            .unwrap();
        assert_eq!(feed.total, 0);

        assert!(get_post(&store, &view.id, Some(&student("u1"))).await.is_ok());
        assert!(get_post(&store, &view.id, Some(&admin())).await.is_ok());
        assert!(matches!(
            get_post(&store, &view.id, Some(&student("u2"))).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_share_counter_increments() {
        let store = MemoryStore::new();
        let view = create_post(&store, &student("u1"), &request(None, false)).await.unwrap();
        assert_eq!(share_post(&store, &student("u2"), &view.id).await.unwrap(), 1);
        assert_eq!(share_post(&store, &student("u3"), &view.id).await.unwrap(), 2);
        assert!(matches!(
            share_post(&store, &student("u2"), "missing").await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }
}
