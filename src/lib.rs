//! A Rust client for Subless, a service that lets visitors of partner sites support the creators
//! they read.
//!
//! # Overview
//!
//! The crate revolves around a [`Subless`] client embedded in a partner page. When created, the
//! client fetches authorization settings once, asks the service whether the visitor is logged in
//! and, if so, reports a *hit*: either for the page itself ([`HitStrategy::Uri`]) or for every
//! creator tagged on it with `<subless creatorName="...">` ([`HitStrategy::Tag`]).
//!
//! The client does not touch any global page state. Everything it needs from the page (its URL,
//! its elements, the ability to navigate) goes through a [`HostPage`] implementation supplied by
//! the embedder. [`InMemoryPage`] is a ready-made implementation for headless hosts.
//!
//! Login, logout and session renewal are redirect chains handled by the service. The client
//! describes them as [`NavigationCommand`]s and hands them to the host page.
//!
//! # Error Handling
//!
//! Errors are represented by the [`Error`] enum.
//!
//! The hit report that runs automatically on creation never returns an error to the host;
//! failures are logged instead. Operations called explicitly return their errors.
//!
//! # Logging
//!
//! The package uses the [`log`](https://docs.rs/log/latest/log/) crate for logging messages under
//! the `subless` target. Consider integrating a `log`-compatible logger implementation for better
//! visibility into client operations.

#![warn(rustdoc::missing_crate_level_docs)]

mod api;
mod banner;
mod client;
mod config;
mod error;
mod hit;
mod host;
mod navigation;
mod session;
mod settings;
mod tags;

pub use api::{HttpApi, SublessApi};
pub use banner::{BannerMessage, BANNER_CONTAINER_ID, BANNER_MESSAGE_COUNT};
pub use client::Subless;
pub use config::{ClientConfig, CDN_URL_ENV, SERVICE_URL_ENV};
pub use error::{Error, Result};
pub use hit::{page_uri, TagHit};
pub use host::{Element, HostPage, InMemoryPage};
pub use navigation::{NavigationCommand, NavigationTarget};
pub use session::LoginState;
pub use settings::{AuthorizationSettings, HitStrategy, Settings};
pub use tags::{scan_tags, CREATOR_ATTRIBUTE, CREATOR_TAG};
