//! Authentication API client methods

use super::{ApiRequest, CanteenClient, ClientError};
use crate::types::{LoginRequest, RefreshTokenRequest, RegisterRequest, User};
use canteen_core::TokenPair;
use tracing::{debug, info};

impl CanteenClient {
    /// Sign in and store the issued token pair
    pub async fn login(&self, credentials: &LoginRequest) -> Result<TokenPair, ClientError> {
        let request = ApiRequest::post("/auth/login").json(credentials)?;
        let pair: TokenPair = self.execute(request).await?;
        self.session().store(&pair)?;
        info!("Signed in");
        Ok(pair)
    }

    /// Create an account and store the issued token pair
    pub async fn register(&self, details: &RegisterRequest) -> Result<TokenPair, ClientError> {
        let request = ApiRequest::post("/auth/register").json(details)?;
        let pair: TokenPair = self.execute(request).await?;
        self.session().store(&pair)?;
        info!("Account registered");
        Ok(pair)
    }

    /// Invalidate the refresh token server-side if possible, then forget local tokens.
    ///
    /// Never fails: local tokens are cleared even if the server call does.
    pub async fn logout(&self) {
        if let Some(refresh_token) = self.session().refresh_token() {
            let result = match ApiRequest::post("/auth/logout").json(&RefreshTokenRequest {
                refresh_token: &refresh_token,
            }) {
                Ok(request) => self.execute_unit(request).await,
                Err(err) => Err(err),
            };
            if let Err(err) = result {
                debug!("Server-side logout failed, continuing: {err}");
            }
        }

        self.session().clear();
        info!("Signed out");
    }

    /// Explicitly renew the session through the shared refresh path
    pub async fn refresh_session(&self) -> Result<TokenPair, ClientError> {
        self.session().refresh().await
    }

    /// Current account, with its allergies loaded
    pub async fn current_user(&self) -> Result<User, ClientError> {
        let mut user: User = self.execute(ApiRequest::get("/users/me")).await?;

        if user.is_banned.is_none() {
            user.is_banned = user.banned;
        }

        user.allergies = match self.allergies().await {
            Ok(allergies) => allergies,
            Err(err) => {
                debug!("Allergies unavailable: {err}");
                Vec::new()
            }
        };

        Ok(user)
    }
}
