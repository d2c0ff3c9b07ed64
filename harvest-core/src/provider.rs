//! Seams between the collection engine and the remote service.
//!
//! The engine only depends on [`ListingProvider`]; `reddit-client` implements
//! it against the Reddit API and tests implement it with in-memory stubs.

use crate::error::CoreError;
use crate::types::{Community, RankingMethod};
use serde::{Deserialize, Serialize};

/// Raw post as handed out by a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostHandle {
    pub id: String,
    pub title: String,
    /// `None` when the account was deleted.
    pub author: Option<String>,
    pub score: i64,
    pub num_comments: u64,
    pub upvote_ratio: f64,
    pub url: String,
    pub permalink: String,
    /// Seconds since the Unix epoch.
    pub created_utc: f64,
}

/// Raw comment from a materialized comment tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentHandle {
    pub id: String,
    pub author: Option<String>,
    pub score: i64,
    pub body: String,
    pub created_utc: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityInfo {
    pub name: String,
    pub subscribers: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Page size, never above [`MAX_PAGE_SIZE`].
    pub limit: u32,
    /// Pagination cursor returned by the previous page.
    pub after: Option<String>,
}

/// Largest page the listing endpoints hand out.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct ListingPage {
    pub posts: Vec<PostHandle>,
    /// `None` once the listing is exhausted.
    pub after: Option<String>,
}

/// Remote listing and comment provider.
///
/// Not-found communities must surface as
/// [`RedditApiError::SubredditNotFound`](crate::RedditApiError::SubredditNotFound)
/// and throttling as
/// [`RedditApiError::RateLimitExceeded`](crate::RedditApiError::RateLimitExceeded).
pub trait ListingProvider {
    async fn lookup_community(&self, community: &Community) -> Result<CommunityInfo, CoreError>;

    async fn listing_page(
        &self,
        community: &Community,
        method: RankingMethod,
        request: PageRequest,
    ) -> Result<ListingPage, CoreError>;

    /// Every comment of the post, placeholders resolved or removed, in
    /// breadth-first order.
    async fn comments(&self, post: &PostHandle) -> Result<Vec<CommentHandle>, CoreError>;
}
