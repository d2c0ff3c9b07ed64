use crate::comments::CommentThing;
use harvest_core::{CoreError, RankingMethod, RedditApiError};
use reqwest::{redirect, Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

pub const REDDIT_API_BASE: &str = "https://oauth.reddit.com";

/// Largest number of ids `/api/morechildren` accepts per call.
pub const MORE_CHILDREN_BATCH: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<T>,
    pub after: Option<String>,
    pub before: Option<String>,
    pub dist: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditPostData {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    pub subreddit: String,
    pub url: String,
    pub permalink: String,
    pub created_utc: f64,
    pub score: i64,
    pub num_comments: u64,
    #[serde(default)]
    pub upvote_ratio: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditUserData {
    pub id: String,
    pub name: String,
    pub created_utc: f64,
    #[serde(default)]
    pub link_karma: i64,
    #[serde(default)]
    pub comment_karma: i64,
    #[serde(default)]
    pub verified: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditSubredditData {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subscribers: Option<u64>,
    #[serde(default)]
    pub over18: bool,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct MoreChildrenResponse {
    json: MoreChildrenJson,
}

#[derive(Debug, Deserialize)]
struct MoreChildrenJson {
    #[serde(default)]
    errors: Vec<serde_json::Value>,
    #[serde(default)]
    data: Option<MoreChildrenData>,
}

#[derive(Debug, Deserialize)]
struct MoreChildrenData {
    #[serde(default)]
    things: Vec<CommentThing>,
}

/// Thin HTTP layer over the Reddit OAuth API.
///
/// Redirects are never followed: Reddit answers a request for an unknown
/// subreddit with a redirect to its search page, which is reported as
/// [`RedditApiError::SubredditNotFound`].
#[derive(Debug, Clone)]
pub struct RedditApiClient {
    http_client: Client,
    base_url: Url,
    user_agent: String,
}

impl RedditApiClient {
    pub fn new(user_agent: String) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .user_agent(&user_agent)
            .timeout(Duration::from_secs(30))
            .redirect(redirect::Policy::none())
            .build()?;

        let base_url = Url::parse(REDDIT_API_BASE).map_err(|e| CoreError::Internal {
            message: format!("invalid API base URL: {}", e),
        })?;

        Ok(Self {
            http_client,
            base_url,
            user_agent,
        })
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn endpoint_url(&self, endpoint: &str) -> Result<Url, CoreError> {
        self.base_url
            .join(endpoint)
            .map_err(|e| CoreError::InvalidInput {
                message: format!("invalid endpoint {}: {}", endpoint, e),
            })
    }

    pub async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        access_token: &str,
        query_params: &[(&str, &str)],
    ) -> Result<Response, CoreError> {
        let url = self.endpoint_url(endpoint)?;

        let request_builder = self
            .http_client
            .request(method.clone(), url)
            .bearer_auth(access_token)
            .query(query_params);

        debug!("Making Reddit API request: {} {}", method, endpoint);
        let response = match request_builder.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Network error for {} {}: {}", method, endpoint, e);
                if e.is_timeout() {
                    return Err(CoreError::RedditApi(RedditApiError::RequestTimeout));
                }
                return Err(CoreError::Network(e));
            }
        };

        let status = response.status();
        if status.is_success() {
            debug!("Request successful: {} {}", status, endpoint);
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());

        Err(map_status(status, endpoint, retry_after).into())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        access_token: &str,
        query_params: &[(&str, &str)],
        what: &str,
    ) -> Result<T, CoreError> {
        let response = self
            .make_request(Method::GET, endpoint, access_token, query_params)
            .await?;

        response.json().await.map_err(|e| {
            error!("Failed to parse {}: {}", what, e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("Failed to parse {}", what),
            })
        })
    }

    pub async fn get_user_info(&self, access_token: &str) -> Result<RedditUserData, CoreError> {
        let user_data: RedditUserData = self
            .get_json("/api/v1/me", access_token, &[], "user data")
            .await?;

        debug!("Retrieved user info for: {}", user_data.name);
        Ok(user_data)
    }

    pub async fn get_subreddit_info(
        &self,
        access_token: &str,
        subreddit: &str,
    ) -> Result<RedditSubredditData, CoreError> {
        let endpoint = format!("/r/{}/about", subreddit);
        let about: RedditListingChild<serde_json::Value> = self
            .get_json(&endpoint, access_token, &[("raw_json", "1")], "subreddit info")
            .await?;

        // Some unknown names come back as an empty search listing instead.
        if about.kind != "t5" {
            return Err(RedditApiError::SubredditNotFound {
                subreddit: subreddit.to_string(),
            }
            .into());
        }

        let info: RedditSubredditData = serde_json::from_value(about.data)?;
        debug!("Retrieved info for r/{}", info.display_name);
        Ok(info)
    }

    pub async fn get_subreddit_posts(
        &self,
        access_token: &str,
        subreddit: &str,
        method: RankingMethod,
        limit: u32,
        after: Option<&str>,
    ) -> Result<RedditListing<RedditListingChild<RedditPostData>>, CoreError> {
        let endpoint = format!("/r/{}/{}", subreddit, method.as_str());
        let params = listing_params(method, limit, after);
        let params: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();

        let listing: RedditListing<RedditListingChild<RedditPostData>> = self
            .get_json(&endpoint, access_token, &params, "subreddit posts")
            .await?;

        info!(
            "Retrieved {} {} posts from r/{}",
            listing.data.children.len(),
            method,
            subreddit
        );
        Ok(listing)
    }

    /// Returns the comment listing of a post: the second element of the
    /// `[post, comments]` pair Reddit answers with.
    pub async fn get_comments(
        &self,
        access_token: &str,
        post_id: &str,
    ) -> Result<RedditListing<CommentThing>, CoreError> {
        let endpoint = format!("/comments/{}", post_id);
        let (_post, comments): (serde_json::Value, RedditListing<CommentThing>) = self
            .get_json(&endpoint, access_token, &[("raw_json", "1")], "comment tree")
            .await?;

        debug!(
            "Retrieved {} top-level comment entries for post {}",
            comments.data.children.len(),
            post_id
        );
        Ok(comments)
    }

    /// Loads the comments hidden behind a "load more" placeholder.
    pub async fn get_more_children(
        &self,
        access_token: &str,
        post_id: &str,
        children: &[String],
    ) -> Result<Vec<CommentThing>, CoreError> {
        let link_id = format!("t3_{}", post_id);
        let mut things = Vec::new();

        for batch in children.chunks(MORE_CHILDREN_BATCH) {
            let ids = batch.join(",");
            let params = [
                ("api_type", "json"),
                ("link_id", link_id.as_str()),
                ("children", ids.as_str()),
                ("limit_children", "false"),
                ("raw_json", "1"),
            ];
            let response: MoreChildrenResponse = self
                .get_json("/api/morechildren", access_token, &params, "more children")
                .await?;

            if !response.json.errors.is_empty() {
                warn!(
                    "morechildren for post {} reported errors: {:?}",
                    post_id, response.json.errors
                );
                return Err(RedditApiError::InvalidResponse {
                    details: format!("morechildren failed for post {}", post_id),
                }
                .into());
            }
            if let Some(data) = response.json.data {
                things.extend(data.things);
            }
        }

        debug!(
            "Resolved {} ids into {} entries for post {}",
            children.len(),
            things.len(),
            post_id
        );
        Ok(things)
    }
}

/// Query parameters of a listing page.
pub fn listing_params(
    method: RankingMethod,
    limit: u32,
    after: Option<&str>,
) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("limit", limit.to_string()),
        ("raw_json", "1".to_string()),
    ];
    if let Some(after) = after {
        params.push(("after", after.to_string()));
    }
    if method.takes_time_window() {
        params.push(("t", "all".to_string()));
    }
    params
}

/// Maps an unsuccessful status to the error the collector acts on.
pub fn map_status(status: StatusCode, endpoint: &str, retry_after: Option<u64>) -> RedditApiError {
    match status.as_u16() {
        429 => {
            let retry_after = retry_after.unwrap_or(60);
            warn!("Rate limited on {}, retry after {} seconds", endpoint, retry_after);
            RedditApiError::RateLimitExceeded { retry_after }
        }
        401 => RedditApiError::InvalidToken,
        403 => RedditApiError::Forbidden {
            resource: endpoint.to_string(),
        },
        404 | 300..=399 => not_found(endpoint),
        code if status.is_server_error() => RedditApiError::ServerError { status_code: code },
        code => RedditApiError::InvalidResponse {
            details: format!("unexpected status {} for {}", code, endpoint),
        },
    }
}

fn not_found(endpoint: &str) -> RedditApiError {
    let mut segments = endpoint.trim_start_matches('/').split('/');
    match (segments.next(), segments.next()) {
        (Some("r"), Some(subreddit)) => RedditApiError::SubredditNotFound {
            subreddit: subreddit.to_string(),
        },
        (Some("comments"), Some(post_id)) => RedditApiError::PostNotFound {
            post_id: post_id.to_string(),
        },
        _ => RedditApiError::InvalidResponse {
            details: format!("Resource not found: {}", endpoint),
        },
    }
}
