//! OAuth2 authentication and token management for Google Drive.

use chrono::{DateTime, Duration, Utc};
use oauth2::basic::BasicClient;
use oauth2::{
    reqwest as oauth_reqwest, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use driveremote_common::{Error, Result};

use super::credentials::CredentialStore;

/// Environment variable supplying the default OAuth2 client ID.
pub const CLIENT_ID_ENV: &str = "DRIVEREMOTE_GDRIVE_CLIENT_ID";
/// Environment variable supplying the default OAuth2 client secret.
pub const CLIENT_SECRET_ENV: &str = "DRIVEREMOTE_GDRIVE_CLIENT_SECRET";
/// OAuth2 authorization endpoint.
const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
/// OAuth2 token endpoint.
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
/// Redirect URL for OAuth2 flow (localhost for desktop apps).
const REDIRECT_URL: &str = "http://localhost:8080/callback";

/// Full drive access, needed to address folders by ID.
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";
/// Access to the hidden application data folder.
pub const DRIVE_APPDATA_SCOPE: &str = "https://www.googleapis.com/auth/drive.appdata";

/// Client with authorization and token endpoints configured.
type GoogleClient = BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// OAuth2 tokens with expiration tracking.
///
/// Secrets are wiped from memory when the value is dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tokens {
    /// Access token for API requests.
    pub access_token: String,
    /// Refresh token for obtaining new access tokens.
    pub refresh_token: String,
    /// When the access token expires.
    pub expires_at: DateTime<Utc>,
}

impl Tokens {
    /// Check if the access token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        // Consider expired if less than 5 minutes remaining
        self.expires_at < Utc::now() + Duration::minutes(5)
    }
}

impl Drop for Tokens {
    fn drop(&mut self) {
        self.access_token.zeroize();
        self.refresh_token.zeroize();
    }
}

/// Configuration for OAuth2 authentication.
///
/// Passed explicitly to [`AuthManager::new`]; there is no process-wide
/// auth state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Client ID; defaults to `DRIVEREMOTE_GDRIVE_CLIENT_ID`.
    pub client_id: String,
    /// Client secret; defaults to `DRIVEREMOTE_GDRIVE_CLIENT_SECRET`.
    pub client_secret: String,
    /// Redirect URL for OAuth2 callback.
    pub redirect_url: String,
    /// Requested scopes.
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

fn default_scopes() -> Vec<String> {
    vec![DRIVE_SCOPE.to_string(), DRIVE_APPDATA_SCOPE.to_string()]
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: std::env::var(CLIENT_ID_ENV).unwrap_or_default(),
            client_secret: std::env::var(CLIENT_SECRET_ENV).unwrap_or_default(),
            redirect_url: REDIRECT_URL.to_string(),
            scopes: default_scopes(),
        }
    }
}

/// OAuth2 authentication manager for Google Drive.
pub struct AuthManager {
    client: GoogleClient,
    http: oauth_reqwest::Client,
    config: AuthConfig,
}

impl AuthManager {
    /// Create a new authentication manager.
    ///
    /// # Errors
    /// - Invalid redirect URL in `config`
    /// - HTTP client construction failure
    pub fn new(config: AuthConfig) -> Result<Self> {
        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_uri(
                AuthUrl::new(GOOGLE_AUTH_URL.to_string())
                    .map_err(|e| Error::InvalidInput(format!("Invalid auth URL: {}", e)))?,
            )
            .set_token_uri(
                TokenUrl::new(GOOGLE_TOKEN_URL.to_string())
                    .map_err(|e| Error::InvalidInput(format!("Invalid token URL: {}", e)))?,
            )
            .set_redirect_uri(
                RedirectUrl::new(config.redirect_url.clone())
                    .map_err(|e| Error::InvalidInput(format!("Invalid redirect URL: {}", e)))?,
            );

        // Token endpoints must not follow redirects.
        let http = oauth_reqwest::ClientBuilder::new()
            .redirect(oauth_reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::Network(format!("Failed to create OAuth HTTP client: {}", e)))?;

        Ok(Self {
            client,
            http,
            config,
        })
    }

    /// Generate the authorization URL for the user to visit.
    ///
    /// Returns the URL and a CSRF token that should be verified on callback.
    pub fn authorization_url(&self) -> (String, String) {
        let mut request = self.client.authorize_url(CsrfToken::new_random);
        for scope in &self.config.scopes {
            request = request.add_scope(Scope::new(scope.clone()));
        }

        let (auth_url, csrf_token) = request
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .url();

        (auth_url.to_string(), csrf_token.secret().clone())
    }

    /// Exchange an authorization code for tokens.
    ///
    /// # Errors
    /// - Invalid authorization code
    /// - No refresh token in the response
    /// - Network errors
    pub async fn exchange_code(&self, code: &str) -> Result<Tokens> {
        let token_result = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| Error::Authentication(format!("Token exchange failed: {}", e)))?;

        let refresh_token = token_result
            .refresh_token()
            .ok_or_else(|| {
                Error::Authentication("No refresh token received. Ensure 'offline' access and 'consent' prompt were requested.".to_string())
            })?
            .secret()
            .clone();

        Ok(Tokens {
            access_token: token_result.access_token().secret().clone(),
            refresh_token,
            expires_at: expiry(token_result.expires_in()),
        })
    }

    /// Refresh an access token using the refresh token.
    ///
    /// # Errors
    /// - Invalid or revoked refresh token
    /// - Network errors
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<Tokens> {
        let token_result = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| Error::Authentication(format!("Token refresh failed: {}", e)))?;

        // Refresh tokens may or may not be returned in refresh response
        let new_refresh_token = token_result
            .refresh_token()
            .map(|t| t.secret().clone())
            .unwrap_or_else(|| refresh_token.to_string());

        Ok(Tokens {
            access_token: token_result.access_token().secret().clone(),
            refresh_token: new_refresh_token,
            expires_at: expiry(token_result.expires_in()),
        })
    }

    /// Get the current configuration.
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}

fn expiry(expires_in: Option<std::time::Duration>) -> DateTime<Utc> {
    let expires_in = expires_in.unwrap_or_else(|| std::time::Duration::from_secs(3600));
    Utc::now() + Duration::from_std(expires_in).unwrap_or_else(|_| Duration::hours(1))
}

/// Token manager that automatically refreshes expired tokens.
///
/// With a credential store attached, tokens are loaded from it on first use
/// when none were given, fresher tokens stored by another process are
/// picked up before refreshing, and refreshed tokens are written back.
pub struct TokenManager {
    auth_manager: AuthManager,
    tokens: tokio::sync::RwLock<Option<Tokens>>,
    store: Option<CredentialStore>,
}

impl TokenManager {
    /// Create a new token manager with initial tokens.
    pub fn new(auth_manager: AuthManager, tokens: Tokens) -> Self {
        Self {
            auth_manager,
            tokens: tokio::sync::RwLock::new(Some(tokens)),
            store: None,
        }
    }

    /// Create a token manager whose tokens come from `store`.
    pub fn from_store(auth_manager: AuthManager, store: CredentialStore) -> Self {
        Self {
            auth_manager,
            tokens: tokio::sync::RwLock::new(None),
            store: Some(store),
        }
    }

    /// Persist refreshed tokens to `store`.
    pub fn with_store(mut self, store: CredentialStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Get a valid access token, refreshing if necessary.
    ///
    /// # Errors
    /// - No tokens given and none stored
    /// - Token refresh failed
    /// - Reading or persisting stored tokens failed
    pub async fn get_access_token(&self) -> Result<String> {
        {
            let tokens = self.tokens.read().await;
            if let Some(current) = tokens.as_ref().filter(|t| !t.is_expired()) {
                return Ok(current.access_token.clone());
            }
        }

        let mut tokens = self.tokens.write().await;

        // Double-check after acquiring write lock
        if let Some(current) = tokens.as_ref().filter(|t| !t.is_expired()) {
            return Ok(current.access_token.clone());
        }

        if let Some(stored) = self.load_stored().await? {
            if !stored.is_expired() {
                let access_token = stored.access_token.clone();
                *tokens = Some(stored);
                return Ok(access_token);
            }
            if tokens.is_none() {
                *tokens = Some(stored);
            }
        }

        let refresh_token = match tokens.as_ref() {
            Some(current) => current.refresh_token.clone(),
            None => return Err(self.missing_credentials()),
        };

        tracing::info!("Refreshing expired access token");

        let new_tokens = self.auth_manager.refresh_token(&refresh_token).await?;

        if let Some(store) = &self.store {
            store.save(&new_tokens).await?;
        }

        let access_token = new_tokens.access_token.clone();
        *tokens = Some(new_tokens);

        Ok(access_token)
    }

    /// Get the current tokens, loading them from the store if needed.
    ///
    /// # Errors
    /// - No tokens given and none stored
    pub async fn get_tokens(&self) -> Result<Tokens> {
        let cached = self.tokens.read().await.clone();
        if let Some(tokens) = cached {
            return Ok(tokens);
        }

        let mut tokens = self.tokens.write().await;
        if tokens.is_none() {
            *tokens = self.load_stored().await?;
        }
        tokens.clone().ok_or_else(|| self.missing_credentials())
    }

    async fn load_stored(&self) -> Result<Option<Tokens>> {
        match &self.store {
            Some(store) => store.load().await,
            None => Ok(None),
        }
    }

    fn missing_credentials(&self) -> Error {
        match &self.store {
            Some(store) => Error::Authentication(format!(
                "No stored credentials at {}; run `driveremote login` first",
                store.path().display()
            )),
            None => Error::Authentication("No tokens configured".to_string()),
        }
    }
}
