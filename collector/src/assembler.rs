//! Long-format dataset assembly.
//!
//! Row counts depend on the join policy, so callers pick one policy per
//! export and keep it fixed:
//!
//! | policy      | post with N > 0 comments | post without comments |
//! |-------------|--------------------------|-----------------------|
//! | `PostsOnly` | 1 row, comment empty     | 1 row, comment empty  |
//! | `LeftJoin`  | N rows                   | 1 row, comment empty  |
//! | `InnerJoin` | N rows                   | no row                |

use harvest_core::{CollectionRow, CommentRecord, PostRecord};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinPolicy {
    PostsOnly {
        /// Keep only the first row of a post id seen under several methods.
        dedupe_posts: bool,
    },
    #[default]
    LeftJoin,
    InnerJoin,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblerOptions {
    pub join: JoinPolicy,
    /// Drop comments of a post whose trimmed body was already seen for it.
    pub dedupe_comment_bodies: bool,
}

pub struct DatasetAssembler {
    options: AssemblerOptions,
}

impl DatasetAssembler {
    pub fn new(options: AssemblerOptions) -> Self {
        Self { options }
    }

    pub fn with_join(join: JoinPolicy) -> Self {
        Self::new(AssemblerOptions {
            join,
            ..Default::default()
        })
    }

    pub fn options(&self) -> &AssemblerOptions {
        &self.options
    }

    /// Joins posts with their comments by post id, keeping post order and the
    /// order of comments within each post.
    pub fn assemble(
        &self,
        posts: &[PostRecord],
        comments: &[CommentRecord],
    ) -> Vec<CollectionRow> {
        if let JoinPolicy::PostsOnly { dedupe_posts } = self.options.join {
            let mut seen = HashSet::new();
            return posts
                .iter()
                .filter(|post| !dedupe_posts || seen.insert(post.post_id.as_str()))
                .map(|post| CollectionRow {
                    post: post.clone(),
                    comment: None,
                })
                .collect();
        }

        let by_post = self.group_comments(comments);
        let mut rows = Vec::with_capacity(posts.len().max(comments.len()));

        for post in posts {
            match by_post.get(post.post_id.as_str()) {
                Some(post_comments) if !post_comments.is_empty() => {
                    rows.extend(post_comments.iter().map(|comment| CollectionRow {
                        post: post.clone(),
                        comment: Some((*comment).clone()),
                    }));
                }
                _ if self.options.join == JoinPolicy::LeftJoin => rows.push(CollectionRow {
                    post: post.clone(),
                    comment: None,
                }),
                _ => {}
            }
        }

        rows
    }

    fn group_comments<'c>(
        &self,
        comments: &'c [CommentRecord],
    ) -> HashMap<&'c str, Vec<&'c CommentRecord>> {
        let mut by_post: HashMap<&str, Vec<&CommentRecord>> = HashMap::new();
        let mut seen_bodies: HashSet<(&str, &str)> = HashSet::new();

        for comment in comments {
            if self.options.dedupe_comment_bodies
                && !seen_bodies.insert((comment.post_id.as_str(), comment.body.trim()))
            {
                continue;
            }
            by_post
                .entry(comment.post_id.as_str())
                .or_default()
                .push(comment);
        }

        by_post
    }
}
