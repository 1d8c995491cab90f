//! Backend API client

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::Result;

/// HTTP client for the console backend.
///
/// The token slot is interior state shared by clones: the session layer
/// sets it on login and clears it on logout, and every request made
/// through any clone carries the current value. Non-2xx responses are
/// errors.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        // A trailing slash keeps Url::join from eating the last path segment
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            base_url,
            token: Arc::new(RwLock::new(None)),
        })
    }

    pub fn set_token(&self, token: &str) {
        *self.token.write() = Some(token.to_string());
    }

    pub fn clear_token(&self) {
        *self.token.write() = None;
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    pub async fn get(&self, path: &str) -> Result<Value> {
        let url = self.endpoint(path)?;
        tracing::debug!(%url, "GET");

        let mut request = self.http.get(url);
        if let Some(token) = self.token() {
            request = request.header("token", token);
        }

        let response = request.send().await?.error_for_status()?;
        Ok(response.json().await?)
    }

    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value> {
        let url = self.endpoint(path)?;
        tracing::debug!(%url, "POST");

        let mut request = self.http.post(url).json(body);
        if let Some(token) = self.token() {
            request = request.header("token", token);
        }

        let response = request.send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}

impl Clone for ApiClient {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            token: Arc::clone(&self.token),
        }
    }
}
