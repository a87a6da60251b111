use std::sync::Arc;

use url::Url;

use crate::{api::SublessApi, host::HostPage, Error, HitStrategy, Result, Subless};

/// Environment variable holding the Subless service base URL.
pub const SERVICE_URL_ENV: &str = "SUBLESS_URL";
/// Environment variable holding the Subless CDN base URL.
pub const CDN_URL_ENV: &str = "SUBLESS_CDN";

/// Configuration for [`Subless`].
pub struct ClientConfig {
    pub(crate) service_url: Url,
    pub(crate) cdn_url: Url,
    pub(crate) marketing_url: Url,
    pub(crate) client_base_url: Option<Url>,
    pub(crate) hit_strategy: HitStrategy,
    pub(crate) api: Option<Arc<dyn SublessApi>>,
}

impl ClientConfig {
    /// Default marketing site banner links point to.
    pub const DEFAULT_MARKETING_URL: &'static str = "https://www.subless.com";

    /// Create a configuration for the given service and CDN base URLs.
    ///
    /// ```
    /// # use subless::ClientConfig;
    /// let config = ClientConfig::new("https://api.subless.example", "https://cdn.subless.example")
    ///     .unwrap();
    /// ```
    pub fn new(service_url: &str, cdn_url: &str) -> Result<ClientConfig> {
        Ok(ClientConfig {
            service_url: parse_base_url(service_url)?,
            cdn_url: parse_base_url(cdn_url)?,
            marketing_url: parse_base_url(ClientConfig::DEFAULT_MARKETING_URL)?,
            client_base_url: None,
            hit_strategy: HitStrategy::default(),
            api: None,
        })
    }

    /// Create a configuration from the `SUBLESS_URL` and `SUBLESS_CDN` environment variables.
    pub fn from_env() -> Result<ClientConfig> {
        let service_url = std::env::var(SERVICE_URL_ENV)
            .map_err(|_| Error::MissingConfiguration(SERVICE_URL_ENV))?;
        let cdn_url =
            std::env::var(CDN_URL_ENV).map_err(|_| Error::MissingConfiguration(CDN_URL_ENV))?;
        ClientConfig::new(&service_url, &cdn_url)
    }

    /// Set the hit strategy. Defaults to [`HitStrategy::Uri`].
    pub fn hit_strategy(mut self, hit_strategy: HitStrategy) -> ClientConfig {
        self.hit_strategy = hit_strategy;
        self
    }

    /// Override the URL the service redirects back to after login and logout.
    ///
    /// Defaults to the origin of the host page followed by `/`.
    pub fn client_base_url(mut self, client_base_url: Url) -> ClientConfig {
        self.client_base_url = Some(client_base_url);
        self
    }

    /// Override the site banner links point to.
    pub fn marketing_url(mut self, marketing_url: &str) -> Result<ClientConfig> {
        self.marketing_url = parse_base_url(marketing_url)?;
        Ok(self)
    }

    /// Use a custom [`SublessApi`] instead of the built-in HTTP client.
    pub fn api(mut self, api: Arc<dyn SublessApi>) -> ClientConfig {
        self.api = Some(api);
        self
    }

    /// Create a new [`Subless`] client hosted by `host`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn to_client(self, host: Arc<dyn HostPage>) -> Result<Subless> {
        Subless::new(self, host)
    }
}

fn parse_base_url(value: &str) -> Result<Url> {
    let url = Url::parse(value).map_err(Error::InvalidBaseUrl)?;
    if url.cannot_be_a_base() {
        return Err(Error::InvalidBaseUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase));
    }
    Ok(url)
}

/// Origin of the host page followed by `/`.
pub(crate) fn client_base_url(page_url: &Url) -> Result<Url> {
    let origin = page_url.origin();
    if !origin.is_tuple() {
        return Err(Error::InvalidBaseUrl(url::ParseError::EmptyHost));
    }
    Url::parse(&format!("{}/", origin.ascii_serialization())).map_err(Error::InvalidBaseUrl)
}
