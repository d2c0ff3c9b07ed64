pub mod api;
pub mod auth;
pub mod comments;
pub mod provider;

mod tests;

pub use api::RedditApiClient;
pub use auth::{AuthSession, RedditAuthenticator, RedditOAuth2Config, RedditToken};
pub use comments::{CommentForest, CommentThing, MorePlaceholder};
pub use provider::RedditProvider;
