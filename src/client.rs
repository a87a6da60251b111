use std::sync::Arc;

use tokio::{runtime::Handle, sync::watch};
use url::Url;

use crate::{
    api::{HttpApi, SublessApi},
    banner::{BannerMessage, BANNER_CONTAINER_ID},
    config::client_base_url,
    hit::{page_uri, TagHit},
    host::HostPage,
    navigation::NavigationCommand,
    session::LoginState,
    settings::{settings_slot, SettingsReader},
    tags::scan_tags,
    ClientConfig, Error, HitStrategy, Result, Settings,
};

/// A Subless client embedded in a partner page.
///
/// Creating a client fetches authorization settings once and, if the visitor is logged in to
/// Subless, reports a hit for the current page in the background. Failures of that background
/// report are logged and never surface to the host.
///
/// # Examples
/// ```no_run
/// # use std::sync::Arc;
/// # use subless::{ClientConfig, HitStrategy, InMemoryPage, Subless};
/// # async fn run() -> subless::Result<()> {
/// let page = Arc::new(InMemoryPage::new("https://partner.example/articles/42".parse().unwrap()));
/// let client: Subless = ClientConfig::new("https://api.subless.example", "https://cdn.subless.example")?
///     .hit_strategy(HitStrategy::Tag)
///     .to_client(page)?;
/// client.wait_for_initial_report().await;
/// # Ok(())
/// # }
/// ```
pub struct Subless {
    inner: Arc<ClientInner>,
    initial_report: watch::Receiver<bool>,
}

struct ClientInner {
    api: Arc<dyn SublessApi>,
    host: Arc<dyn HostPage>,
    settings: SettingsReader,
    service_url: Url,
    cdn_url: Url,
    marketing_url: Url,
    client_base_url: Url,
}

impl Subless {
    /// Create a new client and start the initial hit report.
    ///
    /// Must be called from within a Tokio runtime, fails with [`Error::NoRuntime`] otherwise.
    pub fn new(config: ClientConfig, host: Arc<dyn HostPage>) -> Result<Subless> {
        let runtime = Handle::try_current().map_err(|_| Error::NoRuntime)?;
        let client_base_url = match config.client_base_url {
            Some(url) => url,
            None => client_base_url(&host.current_url())?,
        };
        let api: Arc<dyn SublessApi> = match config.api {
            Some(api) => api,
            None => Arc::new(HttpApi::new(&config.service_url)?),
        };

        let (writer, settings) = settings_slot();
        runtime.spawn({
            let api = Arc::clone(&api);
            let client_base_url = client_base_url.clone();
            let hit_strategy = config.hit_strategy;
            async move {
                let result = api
                    .authorization_settings()
                    .await
                    .map(|authorization| {
                        Settings::merge(authorization, hit_strategy, &client_base_url)
                    });
                match &result {
                    Ok(settings) => {
                        log::debug!(target: "subless", settings:serde; "loaded authorization settings")
                    }
                    Err(err) => {
                        log::warn!(target: "subless", "failed to load authorization settings: {}", err)
                    }
                }
                writer.settle(result);
            }
        });

        let inner = Arc::new(ClientInner {
            api,
            host,
            settings,
            service_url: config.service_url,
            cdn_url: config.cdn_url,
            marketing_url: config.marketing_url,
            client_base_url,
        });

        let (report_done, initial_report) = watch::channel(false);
        runtime.spawn({
            let inner = Arc::clone(&inner);
            async move {
                if let Err(err) = inner.report_hit().await {
                    log::warn!(target: "subless", "failed to report hit: {}", err);
                }
                report_done.send_replace(true);
            }
        });

        Ok(Subless {
            inner,
            initial_report,
        })
    }

    /// Create a client reporting page hits, configured from the environment.
    pub fn using_uris(host: Arc<dyn HostPage>) -> Result<Subless> {
        ClientConfig::from_env()?
            .hit_strategy(HitStrategy::Uri)
            .to_client(host)
    }

    /// Create a client reporting creator tag hits, configured from the environment.
    pub fn using_tags(host: Arc<dyn HostPage>) -> Result<Subless> {
        ClientConfig::from_env()?
            .hit_strategy(HitStrategy::Tag)
            .to_client(host)
    }

    /// Wait for the authorization settings fetched at construction.
    ///
    /// Never issues a request of its own. Every call returns the same value or error.
    pub async fn get_config(&self) -> Result<Arc<Settings>> {
        self.inner.settings.wait().await
    }

    /// Authorization settings, if they have been fetched already.
    pub fn settings(&self) -> Option<Result<Arc<Settings>>> {
        self.inner.settings.try_get()
    }

    /// Ask the service for the login state of the current session.
    pub async fn login_state(&self) -> Result<LoginState> {
        self.inner.login_state().await
    }

    /// Check whether the visitor is logged in to Subless.
    ///
    /// A session that needs renewal counts as logged in. The renewal redirect is handed to the
    /// host page and not waited for.
    pub async fn is_logged_in(&self) -> Result<bool> {
        self.inner.is_logged_in().await
    }

    /// If the visitor is logged in, report their view of this page (or its creators).
    ///
    /// This runs once automatically when the client is created.
    pub async fn report_hit(&self) -> Result<()> {
        self.inner.report_hit().await
    }

    /// Wait for the hit report started at construction to finish, successfully or not.
    pub async fn wait_for_initial_report(&self) {
        let mut done = self.initial_report.clone();
        // Error means the report task is gone, which also means it's finished.
        let _ = done.wait_for(|done| *done).await;
    }

    /// Creator identifiers tagged on the current page.
    pub fn scan_tags(&self) -> Vec<String> {
        scan_tags(self.inner.host.as_ref())
    }

    /// Redirect the visitor to the Subless login, coming back to this site afterwards.
    pub async fn login(&self) -> Result<NavigationCommand> {
        let settings = self.inner.settings.wait().await?;
        let command = NavigationCommand::login(&self.inner.service_url, &settings.redirect_uri)?;
        self.inner.host.navigate(&command);
        Ok(command)
    }

    /// Open the Subless logout in a new browsing context.
    pub fn logout(&self) -> Result<NavigationCommand> {
        let command =
            NavigationCommand::logout(&self.inner.service_url, &self.inner.client_base_url)?;
        self.inner.host.navigate(&command);
        Ok(command)
    }

    /// Append a random Subless banner to the `sublessMessage` element of the page.
    ///
    /// Returns `None` without touching the page if there is no such element. Repeated calls add
    /// more banners.
    pub fn show_banner(&self) -> Result<Option<BannerMessage>> {
        let message = BannerMessage::pick(
            &mut rand::thread_rng(),
            &self.inner.cdn_url,
            &self.inner.marketing_url,
        )?;
        if !self
            .inner
            .host
            .append_to_element(BANNER_CONTAINER_ID, message.to_element())
        {
            log::trace!(target: "subless", "no banner container on the page");
            return Ok(None);
        }
        Ok(Some(message))
    }
}

impl ClientInner {
    async fn login_state(&self) -> Result<LoginState> {
        let status = self.api.login_status().await?;
        let state = LoginState::from_status(status);
        log::trace!(target: "subless", status, state:serde; "fetched login state");
        Ok(state)
    }

    async fn is_logged_in(&self) -> Result<bool> {
        let state = self.login_state().await?;
        if state == LoginState::Renewable {
            let command = NavigationCommand::renewal(&self.service_url, &self.host.current_url())?;
            log::debug!(target: "subless", url = command.url.as_str(); "renewing session");
            self.host.navigate(&command);
        }
        Ok(state.is_logged_in())
    }

    async fn report_hit(&self) -> Result<()> {
        let settings = self.settings.wait().await?;
        if !self.is_logged_in().await? {
            log::trace!(target: "subless", "visitor is not logged in, not reporting a hit");
            return Ok(());
        }

        let uri = page_uri(&self.host.current_url());
        match settings.hit_strategy {
            HitStrategy::Uri => {
                self.api.push_uri_hit(&uri).await?;
                log::trace!(target: "subless", uri = uri.as_str(); "reported page hit");
                Ok(())
            }
            HitStrategy::Tag => self.push_tag_hits(uri).await,
        }
    }

    /// Report one hit per creator tag. A failed tag does not stop the remaining ones, the first
    /// failure is returned once all tags have been tried.
    async fn push_tag_hits(&self, uri: String) -> Result<()> {
        let mut first_error = None;
        for creator in scan_tags(self.host.as_ref()) {
            let hit = TagHit {
                uri: uri.clone(),
                creator,
            };
            match self.api.push_tag_hit(&hit).await {
                Ok(()) => {
                    log::trace!(target: "subless", creator = hit.creator.as_str(); "reported tag hit")
                }
                Err(err) => {
                    log::warn!(target: "subless", creator = hit.creator.as_str(); "failed to report tag hit: {}", err);
                    first_error.get_or_insert(err);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::fake::{Call, FakeApi},
        host::{Element, InMemoryPage},
        navigation::NavigationTarget,
        tags::{CREATOR_ATTRIBUTE, CREATOR_TAG},
    };

    const SERVICE: &str = "https://api.subless.example";
    const CDN: &str = "https://cdn.subless.example";

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn page(url: &str) -> Arc<InMemoryPage> {
        Arc::new(InMemoryPage::new(Url::parse(url).unwrap()))
    }

    fn tagged_page(url: &str, creators: &[&str]) -> Arc<InMemoryPage> {
        let page = creators.iter().fold(
            InMemoryPage::new(Url::parse(url).unwrap()),
            |page, creator| {
                page.with_element(
                    Element::new(CREATOR_TAG).with_attribute(CREATOR_ATTRIBUTE, *creator),
                )
            },
        );
        Arc::new(page)
    }

    fn client(api: &Arc<FakeApi>, page: &Arc<InMemoryPage>, strategy: HitStrategy) -> Subless {
        init_logging();
        ClientConfig::new(SERVICE, CDN)
            .unwrap()
            .hit_strategy(strategy)
            .api(api.clone())
            .to_client(page.clone())
            .unwrap()
    }

    fn tag_hit(uri: &str, creator: &str) -> Call {
        Call::TagHit(TagHit {
            uri: uri.to_owned(),
            creator: creator.to_owned(),
        })
    }

    #[test]
    fn construction_outside_runtime_is_an_error() {
        let api = Arc::new(FakeApi::new(1));
        let page = page("https://partner.example/articles/42");

        let client = ClientConfig::new(SERVICE, CDN)
            .unwrap()
            .api(api.clone())
            .to_client(page.clone());

        assert!(matches!(client, Err(Error::NoRuntime)));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn logged_out_visitor_reports_nothing() {
        for strategy in [HitStrategy::Uri, HitStrategy::Tag] {
            let api = Arc::new(FakeApi::new(0));
            let page = tagged_page("https://partner.example/articles/42", &["alice"]);
            let client = client(&api, &page, strategy);

            client.wait_for_initial_report().await;

            assert_eq!(api.calls(), vec![Call::Settings, Call::LoginStatus]);
            assert!(page.navigations().is_empty());
        }
    }

    #[tokio::test]
    async fn reports_page_uri_without_query_or_fragment() {
        let api = Arc::new(FakeApi::new(1));
        let page = page("https://partner.example/articles/42?ref=x#comments");
        let client = client(&api, &page, HitStrategy::Uri);

        client.wait_for_initial_report().await;

        assert_eq!(
            api.hits(),
            vec![Call::UriHit("https://partner.example/articles/42".to_owned())]
        );
        assert!(page.navigations().is_empty());
    }

    #[tokio::test]
    async fn uri_strategy_ignores_creator_tags() {
        let api = Arc::new(FakeApi::new(1));
        let page = tagged_page("https://partner.example/articles/42", &["alice", "bob"]);
        let client = client(&api, &page, HitStrategy::Uri);

        client.wait_for_initial_report().await;

        assert_eq!(
            api.hits(),
            vec![Call::UriHit("https://partner.example/articles/42".to_owned())]
        );
    }

    #[tokio::test]
    async fn reports_one_hit_per_tag_in_document_order() {
        let api = Arc::new(FakeApi::new(1));
        let page = tagged_page(
            "https://partner.example/articles/42?ref=x",
            &["alice", "bob", "alice"],
        );
        let client = client(&api, &page, HitStrategy::Tag);

        client.wait_for_initial_report().await;

        let uri = "https://partner.example/articles/42";
        assert_eq!(
            api.hits(),
            vec![
                tag_hit(uri, "alice"),
                tag_hit(uri, "bob"),
                tag_hit(uri, "alice")
            ]
        );
    }

    #[tokio::test]
    async fn renewable_session_renews_then_reports_tags() {
        let api = Arc::new(FakeApi::new(2));
        let page = tagged_page("https://partner.example/articles/42?ref=x", &["alice", "bob"]);
        let client = client(&api, &page, HitStrategy::Tag);

        client.wait_for_initial_report().await;

        let navigations = page.navigations();
        assert_eq!(navigations.len(), 1);
        assert_eq!(navigations[0].target, NavigationTarget::TopLevel);
        assert_eq!(navigations[0].url.path(), "/renew");
        assert_eq!(
            navigations[0].url.query_pairs().into_owned().collect::<Vec<_>>(),
            vec![(
                "return_uri".to_owned(),
                "https://partner.example/articles/42?ref=x".to_owned()
            )]
        );

        let uri = "https://partner.example/articles/42";
        assert_eq!(api.hits(), vec![tag_hit(uri, "alice"), tag_hit(uri, "bob")]);
    }

    #[tokio::test]
    async fn unknown_login_status_is_logged_out() {
        let api = Arc::new(FakeApi::new(7));
        let page = page("https://partner.example/");
        let client = client(&api, &page, HitStrategy::Uri);

        client.wait_for_initial_report().await;

        assert!(api.hits().is_empty());
        assert_eq!(client.login_state().await.unwrap(), LoginState::LoggedOut);
        assert!(!client.is_logged_in().await.unwrap());
        assert!(page.navigations().is_empty());
    }

    #[tokio::test]
    async fn failed_tag_hit_does_not_stop_remaining_tags() {
        let api = Arc::new(FakeApi::new(1).with_failing_creator("bob"));
        let page = tagged_page("https://partner.example/", &["alice", "bob", "carol"]);
        let client = client(&api, &page, HitStrategy::Tag);

        client.wait_for_initial_report().await;

        let uri = "https://partner.example/";
        assert_eq!(
            api.hits(),
            vec![
                tag_hit(uri, "alice"),
                tag_hit(uri, "bob"),
                tag_hit(uri, "carol")
            ]
        );
        assert!(matches!(
            client.report_hit().await,
            Err(Error::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn settings_are_fetched_once_for_concurrent_callers() {
        let api = Arc::new(FakeApi::new(1).with_gated_settings());
        let page = page("https://partner.example/articles/42");
        let client = client(&api, &page, HitStrategy::Uri);

        assert!(client.settings().is_none());

        let (logged_in, reported, login, ()) = tokio::join!(
            client.is_logged_in(),
            client.report_hit(),
            client.login(),
            async {
                tokio::task::yield_now().await;
                api.release_settings();
            }
        );
        logged_in.unwrap();
        reported.unwrap();
        login.unwrap();
        client.wait_for_initial_report().await;

        assert_eq!(api.settings_requests(), 1);
        let settings = client.get_config().await.unwrap();
        assert_eq!(settings.authority, "https://auth.subless.example");
        assert_eq!(settings.client_id, "partner-client");
        assert_eq!(settings.hit_strategy, HitStrategy::Uri);
        assert_eq!(settings.redirect_uri.as_str(), "https://partner.example/");
        assert_eq!(api.settings_requests(), 1);
    }

    #[tokio::test]
    async fn settings_failure_propagates_without_reporting() {
        let api = Arc::new(FakeApi::new(1).with_settings_error(Error::Unauthorized));
        let page = page("https://partner.example/");
        let client = client(&api, &page, HitStrategy::Uri);

        client.wait_for_initial_report().await;

        assert!(matches!(client.get_config().await, Err(Error::Unauthorized)));
        assert!(matches!(client.report_hit().await, Err(Error::Unauthorized)));
        assert!(matches!(client.login().await, Err(Error::Unauthorized)));
        assert_eq!(api.calls(), vec![Call::Settings]);
        assert!(page.navigations().is_empty());
    }

    #[tokio::test]
    async fn login_status_failure_reports_nothing() {
        let api = Arc::new(FakeApi::new(1).with_login_status_error(Error::Unauthorized));
        let page = page("https://partner.example/");
        let client = client(&api, &page, HitStrategy::Uri);

        client.wait_for_initial_report().await;

        assert!(api.hits().is_empty());
        assert!(matches!(client.is_logged_in().await, Err(Error::Unauthorized)));
    }

    #[tokio::test]
    async fn login_redirects_back_to_client_base() {
        let api = Arc::new(FakeApi::new(0));
        let page = page("http://localhost:8080/articles/42?ref=x");
        let client = client(&api, &page, HitStrategy::Uri);

        let command = client.login().await.unwrap();

        assert_eq!(command.target, NavigationTarget::TopLevel);
        assert_eq!(
            command.url.as_str(),
            "https://api.subless.example/bff/login?returnUrl=http%3A%2F%2Flocalhost%3A8080%2F"
        );
        assert_eq!(page.navigations(), vec![command]);
    }

    #[tokio::test]
    async fn logout_opens_new_context_without_settings() {
        let api = Arc::new(FakeApi::new(0).with_gated_settings());
        let page = page("https://partner.example/articles/42");
        let client = client(&api, &page, HitStrategy::Uri);

        let command = client.logout().unwrap();

        assert!(client.settings().is_none());
        assert_eq!(command.target, NavigationTarget::NewContext);
        assert_eq!(command.url.path(), "/bff/logout");
        assert_eq!(page.navigations(), vec![command]);
    }

    #[tokio::test]
    async fn configured_client_base_url_is_used_for_redirects() {
        init_logging();
        let api = Arc::new(FakeApi::new(0));
        let page = page("https://partner.example/articles/42");
        let client = ClientConfig::new(SERVICE, CDN)
            .unwrap()
            .client_base_url(Url::parse("https://partner.example/home/").unwrap())
            .api(api.clone())
            .to_client(page.clone())
            .unwrap();

        let settings = client.get_config().await.unwrap();
        assert_eq!(settings.redirect_uri.as_str(), "https://partner.example/home/");
        assert_eq!(
            settings.post_logout_redirect_uri.as_str(),
            "https://partner.example/home/"
        );
    }

    #[tokio::test]
    async fn banner_without_container_is_a_no_op() {
        let api = Arc::new(FakeApi::new(0));
        let page = page("https://partner.example/");
        let client = client(&api, &page, HitStrategy::Uri);

        assert_eq!(client.show_banner().unwrap(), None);
        assert!(page.query_elements("a").is_empty());
        assert!(page.query_elements("img").is_empty());
    }

    #[tokio::test]
    async fn banners_accumulate_in_container() {
        let api = Arc::new(FakeApi::new(0));
        let page = Arc::new(
            InMemoryPage::new(Url::parse("https://partner.example/").unwrap()).with_element(
                Element::new("div")
                    .with_attribute("id", BANNER_CONTAINER_ID)
                    .with_child(Element::new("p")),
            ),
        );
        let client = client(&api, &page, HitStrategy::Uri);

        let first = client.show_banner().unwrap().unwrap();
        let second = client.show_banner().unwrap().unwrap();

        let container = page.element_by_id(BANNER_CONTAINER_ID).unwrap();
        assert_eq!(container.children().len(), 3);
        assert_eq!(container.children()[0].tag_name(), "p");
        for (message, link) in [first, second].iter().zip(&container.children()[1..]) {
            assert_eq!(link.attribute("href"), Some(message.link_url.as_str()));
            let expected_page = if message.index == 3 {
                "/hf-creator-instructions"
            } else {
                "/patron"
            };
            assert_eq!(message.link_url.path(), expected_page);
            assert_eq!(
                message.image_url.as_str(),
                format!("https://cdn.subless.example/message{}.png", message.index)
            );
        }
    }

    #[tokio::test]
    async fn scan_tags_reads_live_page() {
        let api = Arc::new(FakeApi::new(0));
        let page = tagged_page("https://partner.example/", &["alice", "", "bob"]);
        let client = client(&api, &page, HitStrategy::Tag);

        assert_eq!(client.scan_tags(), ["alice", "bob"]);
    }
}
