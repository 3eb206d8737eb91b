use serde::{Deserialize, Serialize};

use crate::models::user::{optional_trimmed, AuthorSummary};
use crate::utils::Violation;

pub const COMMENT_MAX: usize = 1000;

/// Comment on a post (collection: comments)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub content: String,
    /// Set for replies; replies are one level deep.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub like_count: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, alias = "parent_comment_id")]
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub content: String,
    pub parent_id: Option<String>,
}

impl CreateCommentRequest {
    pub fn validate(&self) -> Result<NewComment, Vec<Violation>> {
        let content = self.content.as_deref().map(str::trim).unwrap_or_default();
        let len = content.chars().count();
        if len == 0 || len > COMMENT_MAX {
            return Err(vec![Violation::new(
                "content",
                format!("must be between 1 and {} characters", COMMENT_MAX),
            )]);
        }
        Ok(NewComment {
            content: content.to_string(),
            parent_id: optional_trimmed(&self.parent_id),
        })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CommentView {
    pub id: String,
    pub post_id: String,
    pub author: AuthorSummary,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub like_count: i64,
    pub created_at: i64,
}

impl CommentView {
    pub fn new(comment: &Comment, author: AuthorSummary) -> Self {
        Self {
            id: comment.id.clone(),
            post_id: comment.post_id.clone(),
            author,
            content: comment.content.clone(),
            parent_id: comment.parent_id.clone(),
            like_count: comment.likes.len() as i64,
            created_at: comment.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_comment_rejected() {
        let req = CreateCommentRequest {
            content: Some("   ".into()),
            parent_id: None,
        };
        assert_eq!(req.validate().unwrap_err()[0].field, "content");
    }

    #[test]
    fn test_comment_trimmed() {
        let req = CreateCommentRequest {
            content: Some("  nice one ".into()),
            parent_id: Some(" ".into()),
        };
        let comment = req.validate().unwrap();
        assert_eq!(comment.content, "nice one");
        assert_eq!(comment.parent_id, None);
    }
}
