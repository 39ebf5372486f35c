//! Session and token lifecycle
//!
//! The manager owns the token store and the pending-refresh slot. Any
//! number of requests may find their access token rejected at the same
//! time; they all join the one refresh stored in the slot, so the refresh
//! endpoint is called once per expiry no matter how many callers noticed.

use super::error::{ClientError, SESSION_EXPIRED_MESSAGE};
use crate::types::RefreshTokenRequest;
use canteen_core::{TokenPair, TokenStore};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use reqwest::{Client, RequestBuilder, header};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Path of the refresh endpoint
pub const REFRESH_PATH: &str = "/auth/refresh_token";

#[derive(Debug, Clone, Copy)]
struct RefreshFailed;

type PendingRefresh = Shared<BoxFuture<'static, Result<TokenPair, RefreshFailed>>>;

/// Credential storage plus single-flight token refresh
pub struct SessionManager {
    client: Client,
    refresh_url: String,
    tokens: TokenStore,
    pending: Arc<Mutex<Option<PendingRefresh>>>,
}

impl SessionManager {
    pub(crate) fn new(client: Client, base_url: String, tokens: TokenStore) -> Self {
        Self {
            client,
            refresh_url: format!("{base_url}{REFRESH_PATH}"),
            tokens,
            pending: Arc::new(Mutex::new(None)),
        }
    }

    /// Underlying token store
    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn access_token(&self) -> Option<String> {
        self.tokens.access_token()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.tokens.refresh_token()
    }

    pub fn is_authenticated(&self) -> bool {
        self.tokens.is_authenticated()
    }

    /// Set the bearer header when an access token is stored
    pub fn attach_credentials(&self, request: RequestBuilder) -> RequestBuilder {
        self.authorize(request).0
    }

    /// Set the bearer header and report which access token went out with it
    pub(crate) fn authorize(&self, request: RequestBuilder) -> (RequestBuilder, Option<String>) {
        match self.tokens.access_token() {
            Some(token) => {
                let request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
                (request, Some(token))
            }
            None => (request, None),
        }
    }

    /// Persist a freshly issued pair
    pub fn store(&self, pair: &TokenPair) -> Result<(), ClientError> {
        self.tokens.save(pair)?;
        Ok(())
    }

    /// Forget both tokens
    pub fn clear(&self) {
        self.tokens.clear();
    }

    /// Whether a refresh is currently in flight
    pub fn refresh_in_flight(&self) -> bool {
        self.slot().is_some()
    }

    /// Obtain a new token pair, joining the in-flight refresh if there is one.
    ///
    /// On failure both tokens are cleared and every waiter receives
    /// [`ClientError::SessionExpired`].
    pub async fn refresh(&self) -> Result<TokenPair, ClientError> {
        let pending = {
            let mut slot = self.slot();
            if let Some(pending) = slot.as_ref() {
                debug!("Joining in-flight token refresh");
                pending.clone()
            } else {
                let pending = self.start_refresh();
                *slot = Some(pending.clone());
                pending
            }
        };

        pending
            .await
            .map_err(|RefreshFailed| ClientError::SessionExpired(SESSION_EXPIRED_MESSAGE.to_string()))
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<PendingRefresh>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start_refresh(&self) -> PendingRefresh {
        let client = self.client.clone();
        let url = self.refresh_url.clone();
        let tokens = self.tokens.clone();
        let pending = Arc::clone(&self.pending);

        async move {
            let result = match request_new_pair(&client, &url, &tokens).await {
                Ok(pair) => match tokens.save(&pair) {
                    Ok(()) => {
                        info!("Session refreshed");
                        Ok(pair)
                    }
                    Err(err) => {
                        warn!("Refreshed tokens could not be stored: {err}");
                        Err(RefreshFailed)
                    }
                },
                Err(RefreshFailed) => {
                    tokens.clear();
                    Err(RefreshFailed)
                }
            };

            pending.lock().unwrap_or_else(PoisonError::into_inner).take();
            result
        }
        .boxed()
        .shared()
    }
}

async fn request_new_pair(
    client: &Client,
    url: &str,
    tokens: &TokenStore,
) -> Result<TokenPair, RefreshFailed> {
    let Some(refresh_token) = tokens.refresh_token() else {
        info!("No refresh token stored, session cannot be renewed");
        return Err(RefreshFailed);
    };

    let response = client
        .post(url)
        .json(&RefreshTokenRequest {
            refresh_token: &refresh_token,
        })
        .send()
        .await
        .map_err(|err| {
            warn!("Token refresh request failed: {err}");
            RefreshFailed
        })?;

    let status = response.status();
    if !status.is_success() {
        let rejected = ClientError::from_response(response).await;
        warn!(status = status.as_u16(), "Token refresh rejected: {}", rejected.message());
        return Err(RefreshFailed);
    }

    response.json::<TokenPair>().await.map_err(|err| {
        warn!("Token refresh returned an unusable body: {err}");
        RefreshFailed
    })
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("refresh_url", &self.refresh_url)
            .field("tokens", &self.tokens)
            .field("refresh_in_flight", &self.refresh_in_flight())
            .finish()
    }
}
