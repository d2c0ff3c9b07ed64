use crate::api::RedditApiClient;
use harvest_core::{CoreError, Credentials, RedditApiError};
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, ClientId, ClientSecret, HttpRequest, HttpResponse, ResourceOwnerPassword,
    ResourceOwnerUsername, Scope, TokenResponse, TokenUrl,
};
use reqwest::{redirect, Client};
use std::fmt;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

pub const REDDIT_AUTH_URL: &str = "https://www.reddit.com/api/v1/authorize";
pub const REDDIT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

#[derive(Clone)]
pub struct RedditOAuth2Config {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
}

impl RedditOAuth2Config {
    pub fn new(
        client_id: String,
        client_secret: String,
        username: String,
        password: String,
        user_agent: String,
    ) -> Self {
        Self {
            client_id,
            client_secret,
            username,
            password,
            user_agent,
        }
    }
}

impl From<Credentials> for RedditOAuth2Config {
    fn from(credentials: Credentials) -> Self {
        Self::new(
            credentials.client_id,
            credentials.client_secret,
            credentials.username,
            credentials.password,
            credentials.user_agent,
        )
    }
}

impl fmt::Debug for RedditOAuth2Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedditOAuth2Config")
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct RedditToken {
    pub access_token: String,
    pub expires_at: SystemTime,
    pub scope: Vec<String>,
}

impl RedditToken {
    pub fn is_expired(&self) -> bool {
        SystemTime::now() >= self.expires_at
    }
}

impl fmt::Debug for RedditToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedditToken")
            .field("access_token", &"***")
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: RedditToken,
    /// Account the token acts for; `None` when `/api/v1/me` could not name one.
    pub username: Option<String>,
}

impl AuthSession {
    pub fn access_token(&self) -> &str {
        &self.token.access_token
    }

    pub fn scopes(&self) -> &[String] {
        &self.token.scope
    }

    pub fn is_read_only(&self) -> bool {
        self.username.is_none()
    }

    /// Collection needs a user-bound session; a read-only one is fatal.
    pub fn ensure_write_capable(&self) -> Result<(), CoreError> {
        if self.is_read_only() {
            return Err(RedditApiError::AuthenticationFailed {
                reason: "Reddit granted a read-only session; check the username and password"
                    .to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Script-app login through the OAuth2 resource-owner password grant.
pub struct RedditAuthenticator {
    config: RedditOAuth2Config,
    oauth_client: BasicClient,
    http_client: Client,
}

impl RedditAuthenticator {
    pub fn new(config: RedditOAuth2Config) -> Result<Self, CoreError> {
        let auth_url = AuthUrl::new(REDDIT_AUTH_URL.to_string()).map_err(|e| {
            CoreError::Internal {
                message: format!("invalid authorize URL: {}", e),
            }
        })?;
        let token_url = TokenUrl::new(REDDIT_TOKEN_URL.to_string()).map_err(|e| {
            CoreError::Internal {
                message: format!("invalid token URL: {}", e),
            }
        })?;

        let oauth_client = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
            auth_url,
            Some(token_url),
        );

        let http_client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(30))
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(Self {
            config,
            oauth_client,
            http_client,
        })
    }

    pub fn required_scopes() -> Vec<&'static str> {
        vec!["identity", "read"]
    }

    pub fn config(&self) -> &RedditOAuth2Config {
        &self.config
    }

    /// Exchanges the credentials for a token, then asks Reddit who the token
    /// belongs to.
    pub async fn authenticate(&self, api: &RedditApiClient) -> Result<AuthSession, CoreError> {
        let token = self.request_token().await?;

        let username = match api.get_user_info(&token.access_token).await {
            Ok(user) => Some(user.name),
            Err(CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after })) => {
                return Err(RedditApiError::RateLimitExceeded { retry_after }.into());
            }
            Err(e) => {
                warn!("Could not resolve the authenticated user: {}", e);
                None
            }
        };

        match &username {
            Some(name) => info!("Authenticated as u/{}", name),
            None => warn!("Authenticated without a user identity (read-only)"),
        }

        Ok(AuthSession { token, username })
    }

    async fn request_token(&self) -> Result<RedditToken, CoreError> {
        let username = ResourceOwnerUsername::new(self.config.username.clone());
        let password = ResourceOwnerPassword::new(self.config.password.clone());

        debug!("Requesting access token for u/{}", self.config.username);
        let response = self
            .oauth_client
            .exchange_password(&username, &password)
            .add_scopes(
                Self::required_scopes()
                    .into_iter()
                    .map(|scope| Scope::new(scope.to_string())),
            )
            .request_async(|request| send_token_request(&self.http_client, request))
            .await
            .map_err(|e| RedditApiError::AuthenticationFailed {
                reason: e.to_string(),
            })?;

        // Reddit tokens last an hour when no lifetime is reported.
        let expires_in = response
            .expires_in()
            .unwrap_or_else(|| Duration::from_secs(3600));
        let scope = response
            .scopes()
            .map(|scopes| scopes.iter().map(|s| s.to_string()).collect())
            .unwrap_or_else(|| {
                Self::required_scopes()
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            });

        Ok(RedditToken {
            access_token: response.access_token().secret().clone(),
            expires_at: SystemTime::now() + expires_in,
            scope,
        })
    }
}

/// Sends the token request through our own client so Reddit sees the
/// configured user agent.
async fn send_token_request(
    client: &Client,
    request: HttpRequest,
) -> Result<HttpResponse, reqwest::Error> {
    let mut builder = client
        .request(request.method, request.url.as_str())
        .body(request.body);
    for (name, value) in request.headers.iter() {
        builder = builder.header(name, value);
    }

    let response = builder.send().await?;
    let status_code = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?.to_vec();

    Ok(HttpResponse {
        status_code,
        headers,
        body,
    })
}
