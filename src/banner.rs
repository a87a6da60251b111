//! Optional promotional banner served from the Subless CDN.
use rand::Rng;
use url::Url;

use crate::{host::Element, Error, Result};

/// Id of the partner element the banner is appended to.
pub const BANNER_CONTAINER_ID: &str = "sublessMessage";

const BANNER_LINK_ID: &str = "sublessMessageLink";
const BANNER_IMAGE_ID: &str = "sublessMessageImage";
const BANNER_IMAGE_STYLE: &str = "max-height: 90px";

/// Number of banner messages available on the CDN, numbered from 1.
pub const BANNER_MESSAGE_COUNT: u8 = 8;

/// The one message that points creators at the onboarding instructions.
const CREATOR_INSTRUCTIONS_MESSAGE: u8 = 3;

/// A banner image together with the page it links to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BannerMessage {
    pub index: u8,
    pub image_url: Url,
    pub link_url: Url,
}

impl BannerMessage {
    /// Pick one of the [`BANNER_MESSAGE_COUNT`] messages uniformly at random.
    pub fn pick(rng: &mut impl Rng, cdn_url: &Url, marketing_url: &Url) -> Result<BannerMessage> {
        let index = rng.gen_range(1..=BANNER_MESSAGE_COUNT);
        BannerMessage::for_index(index, cdn_url, marketing_url)
    }

    pub fn for_index(index: u8, cdn_url: &Url, marketing_url: &Url) -> Result<BannerMessage> {
        let image_url = Url::parse(&format!(
            "{}/message{}.png",
            cdn_url.as_str().trim_end_matches('/'),
            index
        ))
        .map_err(Error::InvalidBaseUrl)?;

        let page = if index == CREATOR_INSTRUCTIONS_MESSAGE {
            "hf-creator-instructions"
        } else {
            "patron"
        };
        let mut link_url = marketing_url.join(page).map_err(Error::InvalidBaseUrl)?;
        link_url
            .query_pairs_mut()
            .append_pair("utm_campaign", &format!("message{index}"));

        Ok(BannerMessage {
            index,
            image_url,
            link_url,
        })
    }

    /// Build the `<a><img></a>` markup for this message.
    pub fn to_element(&self) -> Element {
        let image = Element::new("img")
            .with_attribute("id", BANNER_IMAGE_ID)
            .with_attribute("src", self.image_url.as_str())
            .with_attribute("style", BANNER_IMAGE_STYLE);
        Element::new("a")
            .with_attribute("id", BANNER_LINK_ID)
            .with_attribute("href", self.link_url.as_str())
            .with_child(image)
    }
}
