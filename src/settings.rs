//! Authorization settings fetched once per client and shared between all operations.
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use url::Url;

use crate::{Error, Result};

/// Defines whether hits are reported using the page URI or the creator tags contained within it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HitStrategy {
    /// Report one hit for the page itself.
    #[default]
    Uri,
    /// Report one hit per `<subless creatorName="...">` element on the page.
    Tag,
}

/// Settings returned by the service's authorization settings endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationSettings {
    #[serde(rename = "cognitoUrl")]
    pub authority: String,
    #[serde(rename = "appClientId")]
    pub client_id: String,
}

/// Settings which define the behavior of a [`Subless`](crate::Subless) client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub redirect_uri: Url,
    pub post_logout_redirect_uri: Url,
    pub authority: String,
    pub client_id: String,
    pub hit_strategy: HitStrategy,
}

impl Settings {
    pub(crate) fn merge(
        authorization: AuthorizationSettings,
        hit_strategy: HitStrategy,
        client_base_url: &Url,
    ) -> Settings {
        Settings {
            redirect_uri: client_base_url.clone(),
            post_logout_redirect_uri: client_base_url.clone(),
            authority: authorization.authority,
            client_id: authorization.client_id,
            hit_strategy,
        }
    }
}

type Slot = Option<Result<Arc<Settings>>>;

/// Write side of the settings slot. Consumed by the single write.
pub(crate) struct SettingsWriter {
    sender: watch::Sender<Slot>,
}

/// Read side of the settings slot. Cheap to clone, every clone observes the same value.
#[derive(Clone)]
pub(crate) struct SettingsReader {
    receiver: watch::Receiver<Slot>,
}

pub(crate) fn settings_slot() -> (SettingsWriter, SettingsReader) {
    let (sender, receiver) = watch::channel(None);
    (SettingsWriter { sender }, SettingsReader { receiver })
}

impl SettingsWriter {
    pub(crate) fn settle(self, value: Result<Settings>) {
        self.sender.send_replace(Some(value.map(Arc::new)));
    }
}

impl SettingsReader {
    /// Wait for the settings to settle. Returns the same value (or error) to every caller.
    pub(crate) async fn wait(&self) -> Result<Arc<Settings>> {
        let mut receiver = self.receiver.clone();
        let slot = receiver
            .wait_for(Option::is_some)
            .await
            .map_err(|_| Error::SettingsUnavailable)?;
        (*slot).clone().unwrap_or(Err(Error::SettingsUnavailable))
    }

    /// Returns the settled value without waiting.
    pub(crate) fn try_get(&self) -> Option<Result<Arc<Settings>>> {
        (*self.receiver.borrow()).clone()
    }
}
