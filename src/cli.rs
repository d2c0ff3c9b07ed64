use clap::{Parser, ValueEnum};
use collector::{AssemblerOptions, CollectionRequest, JoinPolicy};
use harvest_core::{
    CommentSelectionPolicy, Community, CoreError, ListingLimit, RankingMethod,
};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Collect Reddit posts and comments into a CSV dataset")]
pub struct Args {
    /// TOML configuration file; REDDIT_* environment variables override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Subreddit to collect from (repeatable)
    #[arg(long = "community", required = true)]
    pub communities: Vec<String>,

    /// Ranking method: new, hot, top, controversial or rising (repeatable)
    #[arg(long = "method", default_values_t = [RankingMethod::Hot])]
    pub methods: Vec<RankingMethod>,

    /// Posts per community and method; 0 collects until the listing ends
    #[arg(long, default_value_t = 10)]
    pub limit: u32,

    /// Also collect comments
    #[arg(long, default_value_t = false)]
    pub comments: bool,

    /// Keep the first N comments of each post
    #[arg(long, conflicts_with = "comment_range")]
    pub comment_limit: Option<usize>,

    /// Keep comments at positions LO-HI (1-based, inclusive)
    #[arg(long)]
    pub comment_range: Option<String>,

    #[arg(long, value_enum, default_value_t = JoinArg::Left)]
    pub join: JoinArg,

    /// Drop repeated post ids in a posts-only export
    #[arg(long, default_value_t = false)]
    pub dedupe_posts: bool,

    /// Drop comments whose trimmed body repeats within a post
    #[arg(long, default_value_t = false)]
    pub dedupe_comments: bool,

    /// Seconds to pause after each post; defaults to the configured value
    #[arg(long)]
    pub sleep: Option<f64>,

    /// Output file; defaults to a name derived from the communities
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinArg {
    PostsOnly,
    Left,
    Inner,
}

impl Args {
    pub fn selection(&self) -> Result<CommentSelectionPolicy, CoreError> {
        let policy = match (self.comment_limit, self.comment_range.as_deref()) {
            (Some(n), _) => CommentSelectionPolicy::Limit(n),
            (None, Some(range)) => match range.parse::<CommentSelectionPolicy>()? {
                policy @ CommentSelectionPolicy::Range { .. } => policy,
                _ => {
                    return Err(CoreError::MalformedSelectionRange {
                        message: format!("expected LO-HI, got '{}'", range),
                    })
                }
            },
            (None, None) => CommentSelectionPolicy::All,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn listing_limit(&self) -> ListingLimit {
        match self.limit {
            0 => ListingLimit::Unbounded,
            n => ListingLimit::Bounded(n),
        }
    }

    pub fn community_list(&self) -> Result<Vec<Community>, CoreError> {
        self.communities.iter().map(|name| Community::new(name)).collect()
    }

    pub fn assembler_options(&self) -> AssemblerOptions {
        let join = match self.join {
            JoinArg::PostsOnly => JoinPolicy::PostsOnly {
                dedupe_posts: self.dedupe_posts,
            },
            JoinArg::Left => JoinPolicy::LeftJoin,
            JoinArg::Inner => JoinPolicy::InnerJoin,
        };
        AssemblerOptions {
            join,
            dedupe_comment_bodies: self.dedupe_comments,
        }
    }

    pub fn collection_request(&self, default_sleep: f64) -> Result<CollectionRequest, CoreError> {
        let seconds = self.sleep.unwrap_or(default_sleep);
        let sleep = Duration::try_from_secs_f64(seconds).map_err(|_| CoreError::InvalidInput {
            message: format!("sleep must be a non-negative number of seconds, got {}", seconds),
        })?;

        let request = CollectionRequest {
            communities: self.community_list()?,
            methods: self.methods.clone(),
            limit: self.listing_limit(),
            collect_comments: self.comments,
            selection: self.selection()?,
            sleep,
        };
        request.validate()?;
        Ok(request)
    }
}
