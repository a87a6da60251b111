use serde::{Deserialize, Serialize};
use url::Url;

/// Body of a tag hit: the page being viewed and the creator tagged on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagHit {
    pub uri: String,
    pub creator: String,
}

/// The page identity a hit is recorded against: origin followed by path.
///
/// Query string and fragment are not part of it, so `?ref=x` links count towards the same page.
pub fn page_uri(url: &Url) -> String {
    format!("{}{}", url.origin().ascii_serialization(), url.path())
}
