#[cfg(test)]
mod tests {
    use crate::{
        api, comments, provider, AuthSession, RedditAuthenticator, RedditOAuth2Config, RedditToken,
    };
    use harvest_core::{CoreError, ErrorExt, RankingMethod, RedditApiError};
    use reqwest::StatusCode;
    use serde_json::json;
    use std::time::{Duration, SystemTime};

    fn create_test_config() -> RedditOAuth2Config {
        RedditOAuth2Config::new(
            "test_client_id".to_string(),
            "test_client_secret".to_string(),
            "test_user".to_string(),
            "hunter2".to_string(),
            "reddit-harvest/0.1 by test_user".to_string(),
        )
    }

    fn session(username: Option<&str>) -> AuthSession {
        AuthSession {
            token: RedditToken {
                access_token: "token".to_string(),
                expires_at: SystemTime::now() + Duration::from_secs(3600),
                scope: vec!["identity".to_string(), "read".to_string()],
            },
            username: username.map(str::to_string),
        }
    }

    #[test]
    fn test_config_creation() {
        let config = create_test_config();
        assert_eq!(config.client_id, "test_client_id");
        assert_eq!(config.client_secret, "test_client_secret");
        assert_eq!(config.username, "test_user");
        assert_eq!(config.user_agent, "reddit-harvest/0.1 by test_user");
    }

    #[test]
    fn test_config_debug_hides_secrets() {
        let rendered = format!("{:?}", create_test_config());
        assert!(rendered.contains("test_client_id"));
        assert!(!rendered.contains("test_client_secret"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_authenticator_creation() {
        let authenticator = RedditAuthenticator::new(create_test_config());
        assert!(authenticator.is_ok());
        assert_eq!(authenticator.unwrap().config().username, "test_user");
    }

    #[test]
    fn test_required_scopes() {
        assert_eq!(RedditAuthenticator::required_scopes(), vec!["identity", "read"]);
    }

    #[test]
    fn test_token_expiry() {
        let mut token = session(Some("someone")).token;
        assert!(!token.is_expired());

        token.expires_at = SystemTime::now() - Duration::from_secs(1);
        assert!(token.is_expired());
        assert!(!format!("{:?}", token).contains("\"token\""));
    }

    #[test]
    fn test_read_only_session_is_rejected() {
        let user_session = session(Some("someone"));
        assert!(!user_session.is_read_only());
        assert!(user_session.ensure_write_capable().is_ok());
        assert_eq!(user_session.scopes(), ["identity", "read"]);

        let anonymous = session(None);
        assert!(anonymous.is_read_only());
        match anonymous.ensure_write_capable() {
            Err(CoreError::RedditApi(RedditApiError::AuthenticationFailed { reason })) => {
                assert!(reason.contains("read-only"));
            }
            other => panic!("Expected AuthenticationFailed error, got {:?}", other),
        }
    }

    // API Client Tests
    #[test]
    fn test_api_client_creation() {
        let client = api::RedditApiClient::new("test-user-agent/1.0".to_string()).unwrap();
        assert_eq!(client.user_agent(), "test-user-agent/1.0");

        let url = client.endpoint_url("/r/rust/about").unwrap();
        assert_eq!(url.as_str(), "https://oauth.reddit.com/r/rust/about");
    }

    #[test]
    fn test_listing_params_for_time_windowed_methods() {
        let params = api::listing_params(RankingMethod::Top, 25, Some("t3_abc"));
        assert!(params.contains(&("limit", "25".to_string())));
        assert!(params.contains(&("after", "t3_abc".to_string())));
        assert!(params.contains(&("t", "all".to_string())));
        assert!(params.contains(&("raw_json", "1".to_string())));

        let params = api::listing_params(RankingMethod::Hot, 100, None);
        assert!(!params.iter().any(|(key, _)| *key == "t" || *key == "after"));
    }

    #[test]
    fn test_status_mapping() {
        let throttled = api::map_status(StatusCode::TOO_MANY_REQUESTS, "/r/rust/hot", Some(7));
        assert!(matches!(
            throttled,
            RedditApiError::RateLimitExceeded { retry_after: 7 }
        ));
        assert!(throttled.is_rate_limited());

        let missing = api::map_status(StatusCode::FOUND, "/r/nosuchplace/about", None);
        assert!(matches!(
            missing,
            RedditApiError::SubredditNotFound { ref subreddit } if subreddit == "nosuchplace"
        ));
        assert!(missing.is_not_found());

        assert!(matches!(
            api::map_status(StatusCode::NOT_FOUND, "/comments/abc", None),
            RedditApiError::PostNotFound { ref post_id } if post_id == "abc"
        ));
        assert!(matches!(
            api::map_status(StatusCode::UNAUTHORIZED, "/api/v1/me", None),
            RedditApiError::InvalidToken
        ));
        assert!(matches!(
            api::map_status(StatusCode::FORBIDDEN, "/r/private/about", None),
            RedditApiError::Forbidden { .. }
        ));
        assert!(matches!(
            api::map_status(StatusCode::BAD_GATEWAY, "/r/rust/new", None),
            RedditApiError::ServerError { status_code: 502 }
        ));
    }

    #[test]
    fn test_default_retry_after_when_header_missing() {
        let error = api::map_status(StatusCode::TOO_MANY_REQUESTS, "/comments/abc", None);
        assert_eq!(error.retry_after(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_listing_page_conversion() {
        let fixture = json!({
            "kind": "Listing",
            "data": {
                "after": "t3_p2",
                "before": null,
                "dist": 2,
                "children": [
                    {
                        "kind": "t3",
                        "data": {
                            "id": "p1",
                            "title": "Test Post",
                            "author": "test_user",
                            "subreddit": "rust",
                            "url": "https://example.com/article",
                            "permalink": "/r/rust/comments/p1/test_post/",
                            "created_utc": 1640995200.0,
                            "score": 42,
                            "num_comments": 5,
                            "upvote_ratio": 0.93,
                            "stickied": false
                        }
                    },
                    {
                        "kind": "t3",
                        "data": {
                            "id": "p2",
                            "title": "Orphaned",
                            "author": "[deleted]",
                            "subreddit": "rust",
                            "url": "https://www.reddit.com/r/rust/comments/p2/",
                            "permalink": "/r/rust/comments/p2/orphaned/",
                            "created_utc": 1640995300.0,
                            "score": -3,
                            "num_comments": 0
                        }
                    }
                ]
            }
        });

        let listing: api::RedditListing<api::RedditListingChild<api::RedditPostData>> =
            serde_json::from_value(fixture).unwrap();
        assert_eq!(listing.data.after.as_deref(), Some("t3_p2"));

        let posts: Vec<_> = listing
            .data
            .children
            .into_iter()
            .map(provider::post_handle)
            .collect();

        assert_eq!(posts[0].id, "p1");
        assert_eq!(posts[0].author.as_deref(), Some("test_user"));
        assert_eq!(posts[0].upvote_ratio, 0.93);
        assert_eq!(posts[1].author, None);
        assert_eq!(posts[1].score, -3);
        assert_eq!(posts[1].upvote_ratio, 0.0);
    }

    #[test]
    fn test_comment_page_pair_parses() {
        let fixture = json!([
            { "kind": "Listing", "data": { "children": [], "after": null } },
            {
                "kind": "Listing",
                "data": {
                    "after": null,
                    "children": [
                        {
                            "kind": "t1",
                            "data": {
                                "id": "c1",
                                "parent_id": "t3_p1",
                                "author": "alice",
                                "body": "top level",
                                "score": 4,
                                "created_utc": 1640995400.0,
                                "replies": {
                                    "kind": "Listing",
                                    "data": {
                                        "after": null,
                                        "children": [
                                            {
                                                "kind": "t1",
                                                "data": {
                                                    "id": "c2",
                                                    "parent_id": "t1_c1",
                                                    "author": "bob",
                                                    "body": "reply",
                                                    "score": 1,
                                                    "created_utc": 1640995500.0,
                                                    "replies": ""
                                                }
                                            }
                                        ]
                                    }
                                }
                            }
                        },
                        {
                            "kind": "more",
                            "data": { "id": "c9", "parent_id": "t3_p1", "count": 4, "children": ["c9", "c10"] }
                        }
                    ]
                }
            }
        ]);

        let (_post, listing): (serde_json::Value, api::RedditListing<comments::CommentThing>) =
            serde_json::from_value(fixture).unwrap();
        let mut forest = comments::CommentForest::from_listing("p1", listing);

        assert_eq!(forest.placeholders().len(), 1);
        forest.discard_placeholders();

        let flat = forest.flatten();
        let bodies: Vec<_> = flat.iter().map(|c| c.body.as_str()).collect();
        assert_eq!(bodies, vec!["top level", "reply"]);
    }
}
