//! Comment trees as returned by `/comments/{id}` and `/api/morechildren`.
//!
//! The nested JSON is folded into a parent -> children table so that
//! comments loaded later through `morechildren` (which arrive as a flat list
//! tagged with `parent_id`) land in the same place the placeholder held.
//! Flattening walks that table breadth-first, level by level, the order in
//! which Reddit clients list a comment forest.

use crate::api::RedditListing;
use harvest_core::CommentHandle;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Author Reddit reports for content whose account was deleted.
pub const DELETED_AUTHOR: &str = "[deleted]";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum CommentThing {
    #[serde(rename = "t1")]
    Comment(Box<RedditCommentData>),
    #[serde(rename = "more")]
    More(RedditMoreData),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditCommentData {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub score: i64,
    pub created_utc: f64,
    #[serde(default)]
    pub replies: Option<RedditReplies>,
}

/// Reddit sends `""` instead of an empty listing for a comment without replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RedditReplies {
    Listing(RedditListing<CommentThing>),
    Empty(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditMoreData {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub children: Vec<String>,
}

/// A "load more comments" stub still present in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MorePlaceholder {
    pub parent: String,
    pub count: u64,
    pub children: Vec<String>,
}

impl MorePlaceholder {
    /// "Continue this thread" links carry no ids and cannot be resolved
    /// through `morechildren`.
    pub fn is_resolvable(&self) -> bool {
        !self.children.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct CommentForest {
    root: String,
    children: HashMap<String, Vec<CommentHandle>>,
    placeholders: Vec<MorePlaceholder>,
}

impl CommentForest {
    pub fn new(post_id: &str) -> Self {
        Self {
            root: format!("t3_{}", post_id),
            children: HashMap::new(),
            placeholders: Vec::new(),
        }
    }

    pub fn from_listing(post_id: &str, listing: RedditListing<CommentThing>) -> Self {
        let mut forest = Self::new(post_id);
        let root = forest.root.clone();
        forest.insert_level(&root, listing.data.children);
        forest
    }

    fn insert_level(&mut self, parent: &str, things: Vec<CommentThing>) {
        for thing in things {
            match thing {
                CommentThing::Comment(data) => self.insert_comment(parent, *data),
                CommentThing::More(more) => self.placeholders.push(MorePlaceholder {
                    parent: more.parent_id.unwrap_or_else(|| parent.to_string()),
                    count: more.count,
                    children: more.children,
                }),
            }
        }
    }

    fn insert_comment(&mut self, parent: &str, data: RedditCommentData) {
        let fullname = format!("t1_{}", data.id);
        let replies = match data.replies {
            Some(RedditReplies::Listing(listing)) => listing.data.children,
            _ => Vec::new(),
        };

        self.children
            .entry(parent.to_string())
            .or_default()
            .push(CommentHandle {
                id: data.id,
                author: data.author.filter(|author| author != DELETED_AUTHOR),
                score: data.score,
                body: data.body,
                created_utc: data.created_utc,
            });

        self.insert_level(&fullname, replies);
    }

    /// Adds the entries returned by `morechildren`; each one is attached to
    /// the parent named in its `parent_id`.
    pub fn insert_things(&mut self, things: Vec<CommentThing>) {
        let root = self.root.clone();
        for thing in things {
            let parent = match &thing {
                CommentThing::Comment(data) => data.parent_id.clone(),
                CommentThing::More(more) => more.parent_id.clone(),
            }
            .unwrap_or_else(|| root.clone());
            self.insert_level(&parent, vec![thing]);
        }
    }

    pub fn placeholders(&self) -> &[MorePlaceholder] {
        &self.placeholders
    }

    /// Removes and returns the resolvable placeholder hiding the most
    /// comments.
    pub fn take_largest_placeholder(&mut self) -> Option<MorePlaceholder> {
        let index = self
            .placeholders
            .iter()
            .enumerate()
            .filter(|(_, placeholder)| placeholder.is_resolvable())
            .max_by_key(|(index, placeholder)| (placeholder.count, std::cmp::Reverse(*index)))
            .map(|(index, _)| index)?;
        Some(self.placeholders.remove(index))
    }

    /// Drops every remaining placeholder.
    pub fn discard_placeholders(&mut self) -> usize {
        let dropped = self.placeholders.len();
        self.placeholders.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.children.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Breadth-first list of every materialized comment.
    pub fn flatten(&self) -> Vec<CommentHandle> {
        let mut flat = Vec::with_capacity(self.len());
        let mut queue: VecDeque<&CommentHandle> = VecDeque::new();

        if let Some(top_level) = self.children.get(&self.root) {
            queue.extend(top_level);
        }
        while let Some(comment) = queue.pop_front() {
            if let Some(replies) = self.children.get(&format!("t1_{}", comment.id)) {
                queue.extend(replies);
            }
            flat.push(comment.clone());
        }

        flat
    }
}
