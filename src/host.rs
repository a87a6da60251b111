//! The host page environment the client runs in.
//!
//! The client never reaches for a global document or window. Everything it needs from the page
//! goes through [`HostPage`], so a browser binding, a headless renderer or a test double can all
//! host it.
use std::sync::Mutex;

use url::Url;

use crate::navigation::NavigationCommand;

/// Capabilities the client needs from the page that embeds it.
pub trait HostPage: Send + Sync {
    /// Full URL of the current page, including query and fragment.
    fn current_url(&self) -> Url;

    /// All elements with the given tag name, in document order.
    fn query_elements(&self, tag_name: &str) -> Vec<Element>;

    /// Append `child` to the element with the given id.
    ///
    /// Returns `false` (and leaves the page untouched) if there is no such element.
    fn append_to_element(&self, id: &str, child: Element) -> bool;

    /// Perform a navigation. Implementations must not wait for the navigation to finish.
    fn navigate(&self, command: &NavigationCommand);
}

/// A detached element snapshot, as created by the client or returned by a page query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    tag_name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
}

impl Element {
    /// Create an element with the given tag name and no attributes.
    pub fn new(tag_name: impl Into<String>) -> Element {
        Element {
            tag_name: tag_name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Element {
        self.set_attribute(name, value);
        self
    }

    /// Builder-style child append.
    pub fn with_child(mut self, child: Element) -> Element {
        self.children.push(child);
        self
    }

    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    /// Attribute lookup. Names are matched ASCII case-insensitively, as in HTML documents.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .attributes
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(&name))
        {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.attribute("id")
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    fn collect_by_tag(&self, tag_name: &str, found: &mut Vec<Element>) {
        if self.tag_name.eq_ignore_ascii_case(tag_name) {
            found.push(self.clone());
        }
        for child in &self.children {
            child.collect_by_tag(tag_name, found);
        }
    }

    fn find_by_id_mut(&mut self, id: &str) -> Option<&mut Element> {
        if self.id() == Some(id) {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|child| child.find_by_id_mut(id))
    }
}

/// An in-memory page: a URL, an element tree and a log of requested navigations.
///
/// Useful for headless hosts and for exercising the client without a browser.
///
/// ```
/// # use subless::{Element, HostPage, InMemoryPage};
/// let page = InMemoryPage::new("https://partner.example/articles/42".parse().unwrap())
///     .with_element(Element::new("subless").with_attribute("creatorName", "alice"));
/// assert_eq!(page.query_elements("subless").len(), 1);
/// ```
#[derive(Debug)]
pub struct InMemoryPage {
    url: Url,
    body: Mutex<Vec<Element>>,
    navigations: Mutex<Vec<NavigationCommand>>,
}

impl InMemoryPage {
    pub fn new(url: Url) -> InMemoryPage {
        InMemoryPage {
            url,
            body: Mutex::new(Vec::new()),
            navigations: Mutex::new(Vec::new()),
        }
    }

    /// Append a top-level element to the page body.
    pub fn with_element(self, element: Element) -> InMemoryPage {
        if let Ok(mut body) = self.body.lock() {
            body.push(element);
        }
        self
    }

    /// Snapshot of the element with the given id.
    pub fn element_by_id(&self, id: &str) -> Option<Element> {
        let mut body = self.body.lock().ok()?;
        let element = body
            .iter_mut()
            .find_map(|element| element.find_by_id_mut(id))?
            .clone();
        Some(element)
    }

    /// Navigations requested so far, oldest first.
    pub fn navigations(&self) -> Vec<NavigationCommand> {
        self.navigations
            .lock()
            .map(|navigations| navigations.clone())
            .unwrap_or_default()
    }
}

impl HostPage for InMemoryPage {
    fn current_url(&self) -> Url {
        self.url.clone()
    }

    fn query_elements(&self, tag_name: &str) -> Vec<Element> {
        let mut found = Vec::new();
        if let Ok(body) = self.body.lock() {
            for element in body.iter() {
                element.collect_by_tag(tag_name, &mut found);
            }
        }
        found
    }

    fn append_to_element(&self, id: &str, child: Element) -> bool {
        let Ok(mut body) = self.body.lock() else {
            return false;
        };
        if let Some(parent) = body.iter_mut().find_map(|element| element.find_by_id_mut(id)) {
            parent.children.push(child);
            return true;
        }
        false
    }

    fn navigate(&self, command: &NavigationCommand) {
        if let Ok(mut navigations) = self.navigations.lock() {
            navigations.push(command.clone());
        }
    }
}
