//! Canteen HTTP client
//!
//! Every typed endpoint method builds an [`ApiRequest`] and hands it to
//! [`CanteenClient::execute`]. The request description is immutable and can
//! be turned into a fresh `reqwest` request any number of times, which is
//! what makes the refresh-and-retry path possible without mutating shared
//! request state.

pub mod auth;
pub mod catalog;
pub mod error;
pub mod notifications;
pub mod orders;
pub mod reports;
pub mod session;
pub mod users;

use crate::types::ListParams;
use canteen_core::{ClientConfig, TokenStore};
use error::ClientError;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, ClientBuilder, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use session::SessionManager;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Paths whose 401 responses are final and never trigger a refresh
pub const AUTH_ENDPOINTS: [&str; 3] = ["/auth/login", "/auth/register", "/auth/refresh_token"];

/// Body of an [`ApiRequest`]
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(Vec<FormField>),
}

/// One field of a multipart form
#[derive(Debug, Clone)]
pub enum FormField {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        mime_type: String,
        bytes: Vec<u8>,
    },
}

/// Rebuildable description of one logical API call
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Add a query parameter when a value is present
    #[must_use]
    pub fn query_opt<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    /// Attach page, limit and search parameters
    #[must_use]
    pub fn paged(self, params: &ListParams, default_limit: u32, max_limit: u32) -> Self {
        let limit = params.limit.unwrap_or(default_limit).clamp(1, max_limit);
        self.query("page", params.page.unwrap_or(1).max(1))
            .query("limit", limit)
            .query_opt("search", params.search.as_deref())
    }

    /// Set a JSON body
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be serialized
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ClientError> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Set a multipart body
    #[must_use]
    pub fn multipart(mut self, fields: Vec<FormField>) -> Self {
        self.body = RequestBody::Multipart(fields);
        self
    }

    /// Whether a 401 on this request is final
    pub fn is_auth_endpoint(&self) -> bool {
        AUTH_ENDPOINTS.contains(&self.path.as_str())
    }
}

/// Canteen API client
#[derive(Clone)]
pub struct CanteenClient {
    client: Client,
    base_url: String,
    session: Arc<SessionManager>,
}

impl CanteenClient {
    /// Create a new client with default configuration and in-memory tokens
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a new client builder
    pub fn builder() -> CanteenClientBuilder {
        CanteenClientBuilder::default()
    }

    /// Create a client from loaded configuration
    pub fn from_config(config: &ClientConfig, tokens: TokenStore) -> Result<Self, ClientError> {
        let mut builder = Self::builder()
            .base_url(&config.api.base_url)
            .user_agent(&config.api.user_agent)
            .token_store(tokens);
        if let Some(timeout) = config.api.timeout() {
            builder = builder.timeout(timeout);
        }
        builder.build()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Session and token state shared by all clones of this client
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Turn a request description into a `reqwest` request carrying the current
    /// credentials. Also returns the access token that was attached.
    fn build(
        &self,
        request: &ApiRequest,
    ) -> Result<(reqwest::RequestBuilder, Option<String>), ClientError> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.client.request(request.method.clone(), url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(fields) => builder.multipart(build_form(fields)?),
        };

        Ok(self.session.authorize(builder))
    }

    /// Send a request, recovering once from an expired access token
    async fn send(&self, request: &ApiRequest) -> Result<reqwest::Response, ClientError> {
        let mut retried = false;

        loop {
            let (builder, sent_token) = self.build(request)?;
            let response = builder.send().await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }

            if status != StatusCode::UNAUTHORIZED {
                return Err(ClientError::from_response(response).await);
            }

            if request.is_auth_endpoint() || retried {
                debug!(path = %request.path, retried, "Unauthorized, clearing session");
                self.session.clear();
                return Err(ClientError::from_response(response).await);
            }

            retried = true;

            // Another caller already rotated the pair while this request was in flight
            let current = self.session.access_token();
            if current.is_some() && current != sent_token {
                debug!(path = %request.path, "Access token replaced since sending, retrying");
                continue;
            }

            debug!(path = %request.path, "Access token rejected, refreshing session");
            self.session.refresh().await?;
        }
    }

    /// Execute a request and decode its JSON response
    pub async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ClientError> {
        let response = self.send(&request).await?;
        let bytes = response.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::from_slice(b"null")?);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Execute a request whose response body is irrelevant
    pub async fn execute_unit(&self, request: ApiRequest) -> Result<(), ClientError> {
        let response = self.send(&request).await?;
        // drain the body so the connection can be reused
        let _ = response.bytes().await;
        Ok(())
    }
}

fn build_form(fields: &[FormField]) -> Result<Form, ClientError> {
    let mut form = Form::new();
    for field in fields {
        form = match field {
            FormField::Text { name, value } => form.text(name.clone(), value.clone()),
            FormField::File {
                name,
                file_name,
                mime_type,
                bytes,
            } => {
                let part = Part::bytes(bytes.clone())
                    .file_name(file_name.clone())
                    .mime_str(mime_type)?;
                form.part(name.clone(), part)
            }
        };
    }
    Ok(form)
}

/// Builder for CanteenClient
#[derive(Default)]
pub struct CanteenClientBuilder {
    base_url: Option<String>,
    tokens: Option<TokenStore>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl CanteenClientBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set where tokens are persisted
    pub fn token_store(mut self, tokens: TokenStore) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client
    pub fn build(self) -> Result<CanteenClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        let mut client_builder = ClientBuilder::new();

        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        client_builder = client_builder.user_agent(
            self.user_agent
                .unwrap_or_else(|| concat!("canteen-client/", env!("CARGO_PKG_VERSION")).to_string()),
        );

        let client = client_builder.build()?;
        let tokens = self.tokens.unwrap_or_else(TokenStore::in_memory);
        let session = SessionManager::new(client.clone(), base_url.clone(), tokens);

        Ok(CanteenClient {
            client,
            base_url,
            session: Arc::new(session),
        })
    }
}
