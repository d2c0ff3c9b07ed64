use crate::error::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A subreddit name, trimmed and without the `r/` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Community(String);

impl Community {
    pub fn new(name: &str) -> Result<Self, CoreError> {
        let trimmed = name.trim();
        let trimmed = trimmed
            .strip_prefix("/r/")
            .or_else(|| trimmed.strip_prefix("r/"))
            .unwrap_or(trimmed)
            .trim();

        if trimmed.is_empty() {
            return Err(CoreError::InvalidInput {
                message: "community name must not be empty".to_string(),
            });
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Community {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Community {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Community> for String {
    fn from(community: Community) -> Self {
        community.0
    }
}

/// Listing order requested from a community.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankingMethod {
    New,
    Hot,
    Top,
    Controversial,
    Rising,
}

impl RankingMethod {
    pub const ALL: [RankingMethod; 5] = [
        RankingMethod::Hot,
        RankingMethod::New,
        RankingMethod::Top,
        RankingMethod::Controversial,
        RankingMethod::Rising,
    ];

    /// Path segment of the listing endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            RankingMethod::New => "new",
            RankingMethod::Hot => "hot",
            RankingMethod::Top => "top",
            RankingMethod::Controversial => "controversial",
            RankingMethod::Rising => "rising",
        }
    }

    /// Whether the listing accepts a time window (`t=`) parameter.
    pub fn takes_time_window(&self) -> bool {
        matches!(self, RankingMethod::Top | RankingMethod::Controversial)
    }
}

impl fmt::Display for RankingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RankingMethod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" | "newest" => Ok(RankingMethod::New),
            "hot" | "hottest" => Ok(RankingMethod::Hot),
            "top" | "toprated" | "top_rated" => Ok(RankingMethod::Top),
            "controversial" | "mostcontroversial" | "most_controversial" => {
                Ok(RankingMethod::Controversial)
            }
            "rising" => Ok(RankingMethod::Rising),
            other => Err(CoreError::InvalidInput {
                message: format!(
                    "unknown ranking method '{}', expected one of {}",
                    other,
                    RankingMethod::ALL.map(|method| method.as_str()).join(", ")
                ),
            }),
        }
    }
}

/// How many posts to request per (community, ranking method).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingLimit {
    Bounded(u32),
    Unbounded,
}

/// Flat view of one post as retrieved under a ranking method.
///
/// Records are handed out by value in events and only by shared reference
/// from the accumulator, so nothing rewrites a record after it is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub community: Community,
    pub post_id: String,
    pub title: String,
    pub author: String,
    pub score: i64,
    pub num_comments: u64,
    pub upvote_ratio: f64,
    pub url: String,
    pub created_utc: DateTime<Utc>,
    pub ranking_method: RankingMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub comment_id: String,
    pub post_id: String,
    pub author: Option<String>,
    pub score: i64,
    pub body: String,
    pub created_utc: DateTime<Utc>,
}

/// Which comments of a post to keep, applied to the fully materialized list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommentSelectionPolicy {
    /// First `n` comments.
    Limit(usize),
    /// 1-based inclusive positions `lo..=hi`.
    Range { lo: usize, hi: usize },
    All,
}

impl CommentSelectionPolicy {
    /// Rejects policies that can never select anything.
    pub fn validate(&self) -> Result<(), CoreError> {
        match *self {
            CommentSelectionPolicy::Limit(0) => Err(CoreError::MalformedSelectionRange {
                message: "comment limit must be at least 1".to_string(),
            }),
            CommentSelectionPolicy::Range { lo, hi } if hi == 0 || hi < lo => {
                Err(CoreError::MalformedSelectionRange {
                    message: format!("range {}-{} selects no position", lo, hi),
                })
            }
            _ => Ok(()),
        }
    }
}

impl FromStr for CommentSelectionPolicy {
    type Err = CoreError;

    /// Accepts `all`, a count such as `25`, or a range such as `3-10`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let malformed = || CoreError::MalformedSelectionRange {
            message: format!("cannot parse '{}'", s),
        };

        let policy = if s.eq_ignore_ascii_case("all") {
            CommentSelectionPolicy::All
        } else if let Some((lo, hi)) = s.split_once('-') {
            CommentSelectionPolicy::Range {
                lo: lo.trim().parse().map_err(|_| malformed())?,
                hi: hi.trim().parse().map_err(|_| malformed())?,
            }
        } else {
            CommentSelectionPolicy::Limit(s.parse().map_err(|_| malformed())?)
        };

        policy.validate()?;
        Ok(policy)
    }
}

/// One long-format output row: a post joined with at most one comment.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionRow {
    pub post: PostRecord,
    pub comment: Option<CommentRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressEvent {
    /// Share of the expected posts processed, in `[0, 1]`.
    Fraction(f64),
    /// Posts processed so far when no total is known.
    Count(u64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CollectionEvent {
    PostCollected(PostRecord),
    CommentCollected(CommentRecord),
    ProgressUpdate(ProgressEvent),
    Warning(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_community_trims_and_strips_prefix() {
        assert_eq!(Community::new("  rust ").unwrap().as_str(), "rust");
        assert_eq!(Community::new("r/rust").unwrap().as_str(), "rust");
        assert_eq!(Community::new("/r/AskReddit").unwrap().as_str(), "AskReddit");
        assert!(Community::new("   ").is_err());
        assert!(Community::new("r/").is_err());
    }

    #[test]
    fn test_ranking_method_parsing() {
        assert_eq!("hot".parse::<RankingMethod>().unwrap(), RankingMethod::Hot);
        assert_eq!("Newest".parse::<RankingMethod>().unwrap(), RankingMethod::New);
        assert_eq!(
            "topRated".parse::<RankingMethod>().unwrap(),
            RankingMethod::Top
        );
        match "best".parse::<RankingMethod>() {
            Err(CoreError::InvalidInput { message }) => {
                assert!(message.contains("'best'"));
                assert!(message.contains("hot, new, top, controversial, rising"));
            }
            other => panic!("Expected InvalidInput error, got {:?}", other),
        }
        assert_eq!(RankingMethod::Controversial.to_string(), "controversial");
        assert!(RankingMethod::Top.takes_time_window());
        assert!(!RankingMethod::Rising.takes_time_window());
    }

    #[test]
    fn test_selection_policy_parsing() {
        assert_eq!(
            "all".parse::<CommentSelectionPolicy>().unwrap(),
            CommentSelectionPolicy::All
        );
        assert_eq!(
            "5".parse::<CommentSelectionPolicy>().unwrap(),
            CommentSelectionPolicy::Limit(5)
        );
        assert_eq!(
            " 3 - 10 ".parse::<CommentSelectionPolicy>().unwrap(),
            CommentSelectionPolicy::Range { lo: 3, hi: 10 }
        );
    }

    #[test]
    fn test_malformed_selection_policies_rejected() {
        for input in ["0", "10-3", "0-0", "abc", "3-x"] {
            let result = input.parse::<CommentSelectionPolicy>();
            assert!(
                matches!(result, Err(CoreError::MalformedSelectionRange { .. })),
                "expected {} to be rejected",
                input
            );
        }

        // lo below 1 is clamped at selection time, not rejected
        assert!(CommentSelectionPolicy::Range { lo: 0, hi: 4 }
            .validate()
            .is_ok());
    }
}
