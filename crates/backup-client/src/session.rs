//! Authenticated HTTP session

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{debug, info, instrument};
use url::Url;

use crate::config::TimeoutsConfig;
use crate::error::{ExportError, Result};
use crate::profile::BackendProfile;

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Credential-bound HTTP session
///
/// Created once per run by [`Session::login`]. The session cookie lives in
/// the client's cookie store, so every request made through
/// [`Session::http_client`] is authenticated.
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
    base_url: Url,
}

impl Session {
    /// Log in against the profile's instance
    ///
    /// Fails with [`ExportError::Auth`] carrying the status and response body
    /// when the login endpoint does not answer with 200.
    #[instrument(skip(profile, password, timeouts), fields(instance = %profile.base_url()))]
    pub async fn login(
        profile: &BackendProfile,
        username: &str,
        password: &str,
        timeouts: &TimeoutsConfig,
    ) -> Result<Self> {
        let client = build_client(timeouts)?;
        let url = profile.login_url()?;
        debug!("Creating session at {}", url);

        let response = client
            .post(url)
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ExportError::Auth {
                status: status.as_u16(),
                body,
            });
        }

        info!("Session created for {}", username);
        Ok(Self {
            client,
            base_url: profile.base_url().clone(),
        })
    }

    /// Instance the session is bound to
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The authenticated HTTP client
    pub fn http_client(&self) -> &Client {
        &self.client
    }
}

fn build_client(timeouts: &TimeoutsConfig) -> Result<Client> {
    let mut builder = Client::builder().cookie_store(true);
    if let Some(ms) = timeouts.request_ms {
        builder = builder.timeout(Duration::from_millis(ms));
    }
    if let Some(ms) = timeouts.connect_ms {
        builder = builder.connect_timeout(Duration::from_millis(ms));
    }
    builder.build().map_err(Into::into)
}
