//! Pure mapping from provider handles to flat records.

use chrono::{DateTime, Utc};
use harvest_core::{
    CommentHandle, CommentRecord, Community, CoreError, PostHandle, PostRecord, RankingMethod,
};

/// Author written for posts whose account no longer exists.
pub const MISSING_AUTHOR: &str = "None";

pub fn timestamp_from_epoch(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    let nanos = (((seconds - whole) * 1e9).round() as u32).min(999_999_999);
    DateTime::from_timestamp(whole as i64, nanos)
}

pub struct PostRecordBuilder;

impl PostRecordBuilder {
    pub fn build(
        post: &PostHandle,
        community: &Community,
        method: RankingMethod,
    ) -> Result<PostRecord, CoreError> {
        let created_utc =
            timestamp_from_epoch(post.created_utc).ok_or_else(|| CoreError::PostProcessing {
                post_id: post.id.clone(),
                message: format!("invalid creation timestamp {}", post.created_utc),
            })?;

        let upvote_ratio = if post.upvote_ratio.is_finite() {
            post.upvote_ratio.clamp(0.0, 1.0)
        } else {
            0.0
        };

        Ok(PostRecord {
            community: community.clone(),
            post_id: post.id.clone(),
            title: post.title.clone(),
            author: post
                .author
                .clone()
                .unwrap_or_else(|| MISSING_AUTHOR.to_string()),
            score: post.score,
            num_comments: post.num_comments,
            upvote_ratio,
            url: post.url.clone(),
            created_utc,
            ranking_method: method,
        })
    }
}

pub struct CommentRecordBuilder;

impl CommentRecordBuilder {
    pub fn build(comment: &CommentHandle, post_id: &str) -> Result<CommentRecord, CoreError> {
        let created_utc =
            timestamp_from_epoch(comment.created_utc).ok_or_else(|| CoreError::PostProcessing {
                post_id: post_id.to_string(),
                message: format!(
                    "comment {} has invalid creation timestamp {}",
                    comment.id, comment.created_utc
                ),
            })?;

        Ok(CommentRecord {
            comment_id: comment.id.clone(),
            post_id: post_id.to_string(),
            author: comment.author.clone(),
            score: comment.score,
            body: comment.body.clone(),
            created_utc,
        })
    }
}
