use std::sync::Arc;

use subless::{
    Element, HitStrategy, InMemoryPage, BANNER_CONTAINER_ID, CREATOR_ATTRIBUTE, CREATOR_TAG,
};

#[tokio::main]
pub async fn main() -> subless::Result<()> {
    // Configure env_logger to see Subless client logs.
    env_logger::Builder::from_env(env_logger::Env::new().default_filter_or("subless")).init();

    let page_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://partner.example/articles/42".to_owned());
    let page = Arc::new(
        InMemoryPage::new(page_url.parse().expect("page URL should be a valid URL"))
            .with_element(Element::new(CREATOR_TAG).with_attribute(CREATOR_ATTRIBUTE, "alice"))
            .with_element(Element::new("div").with_attribute("id", BANNER_CONTAINER_ID)),
    );

    // Reads SUBLESS_URL and SUBLESS_CDN.
    let client = subless::ClientConfig::from_env()?
        .hit_strategy(HitStrategy::Tag)
        .to_client(page.clone())?;

    // The hit report runs in the background. Errors are logged, not returned.
    client.wait_for_initial_report().await;

    match client.get_config().await {
        Ok(settings) => println!("settings: {:?}", settings),
        Err(err) => println!("error requesting settings: {:?}", err),
    }

    if let Some(banner) = client.show_banner()? {
        println!("showing banner {} linking to {}", banner.index, banner.link_url);
    }

    for navigation in page.navigations() {
        println!("requested navigation: {:?}", navigation);
    }

    Ok(())
}
