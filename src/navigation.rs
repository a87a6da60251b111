//! Navigations the client asks the host page to perform.
//!
//! Login, logout and session renewal are redirect chains handled entirely by the service. The
//! client only decides where to go and hands a [`NavigationCommand`] to the
//! [`HostPage`](crate::HostPage).
use url::Url;

use crate::{Error, Result};

const LOGIN_ENDPOINT: &str = "/bff/login";
const LOGOUT_ENDPOINT: &str = "/bff/logout";
const RENEW_ENDPOINT: &str = "/renew";

/// Browsing context a navigation should happen in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationTarget {
    /// Replace the current top-level page.
    TopLevel,
    /// Open a new browsing context (tab or window), leaving the current page alone.
    NewContext,
}

/// A navigation to be performed by the host page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationCommand {
    pub url: Url,
    pub target: NavigationTarget,
}

impl NavigationCommand {
    /// Interactive login that returns to `return_url` afterwards.
    pub fn login(service_url: &Url, return_url: &Url) -> Result<NavigationCommand> {
        Ok(NavigationCommand {
            url: endpoint(service_url, LOGIN_ENDPOINT, "returnUrl", return_url)?,
            target: NavigationTarget::TopLevel,
        })
    }

    /// Logout, opened in a new browsing context.
    pub fn logout(service_url: &Url, return_url: &Url) -> Result<NavigationCommand> {
        Ok(NavigationCommand {
            url: endpoint(service_url, LOGOUT_ENDPOINT, "returnUrl", return_url)?,
            target: NavigationTarget::NewContext,
        })
    }

    /// Silent session renewal that comes back to `current_page` once the cookie is refreshed.
    pub fn renewal(service_url: &Url, current_page: &Url) -> Result<NavigationCommand> {
        Ok(NavigationCommand {
            url: endpoint(service_url, RENEW_ENDPOINT, "return_uri", current_page)?,
            target: NavigationTarget::TopLevel,
        })
    }
}

fn endpoint(service_url: &Url, path: &str, param: &str, return_url: &Url) -> Result<Url> {
    Url::parse_with_params(
        &format!("{}{}", service_url.as_str().trim_end_matches('/'), path),
        &[(param, return_url.as_str())],
    )
    .map_err(Error::InvalidBaseUrl)
}
