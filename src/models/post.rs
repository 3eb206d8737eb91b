use serde::{Deserialize, Serialize};

use crate::models::club::ClubSummary;
use crate::models::comment::CommentView;
use crate::models::user::{optional_trimmed, AuthorSummary};
use crate::utils::Violation;

pub const TITLE_MIN: usize = 3;
pub const TITLE_MAX: usize = 200;
pub const CONTENT_MIN: usize = 10;
pub const CONTENT_MAX: usize = 5000;
pub const MAX_TAGS: usize = 10;
pub const TAG_MAX: usize = 50;

/// Feed post (collection: posts)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: String,
    pub author_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub club_id: Option<String>,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_public: bool,
    pub is_pinned: bool,
    /// Like-set; uniqueness is kept by `$addToSet`/`$pull` in the store.
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub comment_count: i64,
    #[serde(default)]
    pub share_count: i64,
    pub created_at: i64,
}

/// Inbound post payload; every field is checked by `validate`
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default, alias = "club")]
    pub club_id: Option<String>,
    #[serde(default)]
    pub is_public: Option<bool>,
    #[serde(default)]
    pub is_pinned: Option<bool>,
}

/// Post payload after schema checks and tag normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub club_id: Option<String>,
    pub is_public: bool,
    pub is_pinned: bool,
}

impl CreatePostRequest {
    pub fn validate(&self) -> Result<NewPost, Vec<Violation>> {
        let mut violations = Vec::new();

        let title = self.title.as_deref().map(str::trim).unwrap_or_default();
        let title_len = title.chars().count();
        if !(TITLE_MIN..=TITLE_MAX).contains(&title_len) {
            violations.push(Violation::new(
                "title",
                format!("must be between {} and {} characters", TITLE_MIN, TITLE_MAX),
            ));
        }

        let content = self.content.as_deref().map(str::trim).unwrap_or_default();
        let content_len = content.chars().count();
        if !(CONTENT_MIN..=CONTENT_MAX).contains(&content_len) {
            violations.push(Violation::new(
                "content",
                format!("must be between {} and {} characters", CONTENT_MIN, CONTENT_MAX),
            ));
        }

        let raw_tags = self.tags.as_deref().unwrap_or_default();
        if raw_tags.iter().any(|t| t.trim().chars().count() > TAG_MAX) {
            violations.push(Violation::new(
                "tags",
                format!("each tag must be at most {} characters", TAG_MAX),
            ));
        }
        let tags = normalize_tags(raw_tags);
        if tags.len() > MAX_TAGS {
            violations.push(Violation::new(
                "tags",
                format!("at most {} distinct tags are allowed", MAX_TAGS),
            ));
        }

        if !violations.is_empty() {
            return Err(violations);
        }

        Ok(NewPost {
            title: title.to_string(),
            content: content.to_string(),
            tags,
            club_id: optional_trimmed(&self.club_id),
            is_public: self.is_public.unwrap_or(true),
            is_pinned: self.is_pinned.unwrap_or(false),
        })
    }
}

/// Trims and lowercases tags, dropping blanks and duplicates (first occurrence wins).
pub fn normalize_tags(raw: &[String]) -> Vec<String> {
    let mut tags: Vec<String> = Vec::with_capacity(raw.len());
    for tag in raw {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

/// Feed filter; every field narrows the result set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedFilter {
    pub club_id: Option<String>,
    pub author_id: Option<String>,
    pub tag: Option<String>,
    pub search: Option<String>,
}

impl FeedFilter {
    pub fn new(
        club_id: Option<String>,
        author_id: Option<String>,
        tag: Option<String>,
        search: Option<String>,
    ) -> Self {
        Self {
            club_id: optional_trimmed(&club_id),
            author_id: optional_trimmed(&author_id),
            tag: optional_trimmed(&tag).map(|t| t.to_lowercase()),
            search: optional_trimmed(&search),
        }
    }

    /// In-process evaluation of the filter; the Mongo adapter builds the
    /// equivalent query document instead.
    pub fn matches(&self, post: &Post) -> bool {
        if !post.is_public {
            return false;
        }
        if let Some(club_id) = &self.club_id {
            if post.club_id.as_deref() != Some(club_id.as_str()) {
                return false;
            }
        }
        if let Some(author_id) = &self.author_id {
            if &post.author_id != author_id {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if !post.tags.contains(tag) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = post.title.to_lowercase().contains(&needle)
                || post.content.to_lowercase().contains(&needle)
                || post.tags.iter().any(|t| t.contains(&needle));
            if !hit {
                return false;
            }
        }
        true
    }
}

/// Post as served to clients, with author/club resolved and comment preview.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PostView {
    pub id: String,
    pub author: AuthorSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub club: Option<ClubSummary>,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub is_public: bool,
    pub is_pinned: bool,
    pub like_count: i64,
    pub liked_by_viewer: bool,
    pub comment_count: i64,
    pub share_count: i64,
    pub created_at: i64,
    pub recent_comments: Vec<CommentView>,
}

impl PostView {
    pub fn new(
        post: &Post,
        author: AuthorSummary,
        club: Option<ClubSummary>,
        viewer_id: Option<&str>,
        recent_comments: Vec<CommentView>,
    ) -> Self {
        Self {
            id: post.id.clone(),
            author,
            club,
            title: post.title.clone(),
            content: post.content.clone(),
            tags: post.tags.clone(),
            is_public: post.is_public,
            is_pinned: post.is_pinned,
            like_count: post.likes.len() as i64,
            liked_by_viewer: viewer_id.is_some_and(|v| post.likes.iter().any(|l| l == v)),
            comment_count: post.comment_count,
            share_count: post.share_count,
            created_at: post.created_at,
            recent_comments,
        }
    }
}
