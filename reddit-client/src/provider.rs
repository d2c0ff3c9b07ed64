use crate::api::{RedditApiClient, RedditListingChild, RedditPostData};
use crate::auth::AuthSession;
use crate::comments::{CommentForest, DELETED_AUTHOR};
use harvest_core::{
    CommentHandle, Community, CommunityInfo, CoreError, ListingPage, ListingProvider,
    PageRequest, PostHandle, RankingMethod,
};
use tracing::debug;

/// [`ListingProvider`] backed by the Reddit OAuth API.
pub struct RedditProvider {
    api: RedditApiClient,
    session: AuthSession,
    replace_more_limit: usize,
}

impl RedditProvider {
    pub fn new(api: RedditApiClient, session: AuthSession) -> Self {
        Self {
            api,
            session,
            replace_more_limit: 0,
        }
    }

    /// Number of "load more" placeholders resolved per post. Zero drops them
    /// all, leaving the comments Reddit sent with the first page.
    pub fn with_replace_more_limit(mut self, limit: usize) -> Self {
        self.replace_more_limit = limit;
        self
    }

    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    async fn resolve_placeholders(
        &self,
        post_id: &str,
        forest: &mut CommentForest,
    ) -> Result<(), CoreError> {
        let mut resolved = 0;
        while resolved < self.replace_more_limit {
            let Some(placeholder) = forest.take_largest_placeholder() else {
                break;
            };
            let things = self
                .api
                .get_more_children(self.session.access_token(), post_id, &placeholder.children)
                .await?;
            forest.insert_things(things);
            resolved += 1;
        }

        let dropped = forest.discard_placeholders();
        if resolved > 0 || dropped > 0 {
            debug!(
                "Post {}: resolved {} placeholders, dropped {}",
                post_id, resolved, dropped
            );
        }
        Ok(())
    }
}

impl ListingProvider for RedditProvider {
    async fn lookup_community(&self, community: &Community) -> Result<CommunityInfo, CoreError> {
        let info = self
            .api
            .get_subreddit_info(self.session.access_token(), community.as_str())
            .await?;

        Ok(CommunityInfo {
            name: info.display_name,
            subscribers: info.subscribers,
        })
    }

    async fn listing_page(
        &self,
        community: &Community,
        method: RankingMethod,
        request: PageRequest,
    ) -> Result<ListingPage, CoreError> {
        let listing = self
            .api
            .get_subreddit_posts(
                self.session.access_token(),
                community.as_str(),
                method,
                request.limit,
                request.after.as_deref(),
            )
            .await?;

        Ok(ListingPage {
            posts: listing
                .data
                .children
                .into_iter()
                .filter(|child| child.kind == "t3")
                .map(post_handle)
                .collect(),
            after: listing.data.after,
        })
    }

    async fn comments(&self, post: &PostHandle) -> Result<Vec<CommentHandle>, CoreError> {
        let listing = self
            .api
            .get_comments(self.session.access_token(), &post.id)
            .await?;

        let mut forest = CommentForest::from_listing(&post.id, listing);
        self.resolve_placeholders(&post.id, &mut forest).await?;

        Ok(forest.flatten())
    }
}

pub fn post_handle(child: RedditListingChild<RedditPostData>) -> PostHandle {
    let data = child.data;
    PostHandle {
        id: data.id,
        title: data.title,
        author: data.author.filter(|author| author != DELETED_AUTHOR),
        score: data.score,
        num_comments: data.num_comments,
        upvote_ratio: data.upvote_ratio.unwrap_or(0.0),
        url: data.url,
        permalink: data.permalink,
        created_utc: data.created_utc,
    }
}
