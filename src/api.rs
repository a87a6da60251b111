//! HTTP access to the Subless service.
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{
    cookie::Jar,
    header::{HeaderMap, HeaderValue, CACHE_CONTROL, CONTENT_TYPE},
    StatusCode, Url,
};
use serde::de::DeserializeOwned;

use crate::{hit::TagHit, settings::AuthorizationSettings, Error, Result};

const SETTINGS_ENDPOINT: &str = "/api/Authorization/settings";
const LOGIN_STATUS_ENDPOINT: &str = "/api/user/loginStatus";
const HIT_ENDPOINT: &str = "/api/hit";
const TAG_HIT_ENDPOINT: &str = "/api/hit/tag";

/// Requests the client issues against the Subless service.
///
/// [`HttpApi`] is the production implementation. Hosts with their own networking stack (or tests)
/// can provide another one through [`ClientConfig::api`](crate::ClientConfig::api).
#[async_trait]
pub trait SublessApi: Send + Sync {
    /// Fetch authorization settings. Does not require a session.
    async fn authorization_settings(&self) -> Result<AuthorizationSettings>;

    /// Fetch the integer-coded login status of the current session.
    async fn login_status(&self) -> Result<i64>;

    /// Record a hit for a whole page.
    async fn push_uri_hit(&self, uri: &str) -> Result<()>;

    /// Record a hit for one creator tagged on a page.
    async fn push_tag_hit(&self, hit: &TagHit) -> Result<()>;
}

/// [`SublessApi`] over HTTP, sending the session cookie with every credentialed request.
pub struct HttpApi {
    // Client holds a connection pool internally, so we're reusing the client between requests.
    client: reqwest::Client,
    cookies: Arc<Jar>,
    service_url: Url,
    settings_url: Url,
    login_status_url: Url,
    hit_url: Url,
    tag_hit_url: Url,
}

impl HttpApi {
    pub fn new(service_url: &Url) -> Result<HttpApi> {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));

        let cookies = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .cookie_provider(Arc::clone(&cookies))
            .build()?;

        Ok(HttpApi {
            client,
            cookies,
            service_url: service_url.clone(),
            settings_url: endpoint(service_url, SETTINGS_ENDPOINT)?,
            login_status_url: endpoint(service_url, LOGIN_STATUS_ENDPOINT)?,
            hit_url: endpoint(service_url, HIT_ENDPOINT)?,
            tag_hit_url: endpoint(service_url, TAG_HIT_ENDPOINT)?,
        })
    }

    /// Seed the cookie store with a `Set-Cookie` style string scoped to the service.
    ///
    /// Browser hosts already share the visitor's cookies and never need this.
    pub fn add_session_cookie(&self, cookie: &str) {
        self.cookies.add_cookie_str(cookie, &self.service_url);
    }
}

#[async_trait]
impl SublessApi for HttpApi {
    async fn authorization_settings(&self) -> Result<AuthorizationSettings> {
        log::debug!(target: "subless", "fetching authorization settings");
        let response = self.client.get(self.settings_url.clone()).send().await?;
        let settings = read_json(response).await?;
        log::debug!(target: "subless", "successfully fetched authorization settings");
        Ok(settings)
    }

    async fn login_status(&self) -> Result<i64> {
        let response = self
            .client
            .get(self.login_status_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;
        read_json(response).await
    }

    async fn push_uri_hit(&self, uri: &str) -> Result<()> {
        let response = self
            .client
            .post(self.hit_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(uri.to_owned())
            .send()
            .await?;
        read_json::<serde_json::Value>(response).await?;
        Ok(())
    }

    async fn push_tag_hit(&self, hit: &TagHit) -> Result<()> {
        let response = self
            .client
            .post(self.tag_hit_url.clone())
            .json(hit)
            .send()
            .await?;
        read_json::<serde_json::Value>(response).await?;
        Ok(())
    }
}

fn endpoint(service_url: &Url, path: &str) -> Result<Url> {
    Url::parse(&format!(
        "{}{}",
        service_url.as_str().trim_end_matches('/'),
        path
    ))
    .map_err(Error::InvalidBaseUrl)
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let response = response.error_for_status().map_err(|err| {
        if err.status() == Some(StatusCode::UNAUTHORIZED) {
            log::warn!(target: "subless", "service rejected the session as unauthorized");
            Error::Unauthorized
        } else {
            log::warn!(target: "subless", "received non-success response from service: {:?}", err);
            Error::from(err)
        }
    })?;

    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}
