use crate::host::HostPage;

/// Tag name of the elements partners use to mark creator content.
pub const CREATOR_TAG: &str = "subless";

/// Attribute of [`CREATOR_TAG`] elements holding the creator identifier.
pub const CREATOR_ATTRIBUTE: &str = "creatorName";

/// Collect creator identifiers from all `<subless creatorName="...">` elements on the page.
///
/// Elements without the attribute, or with an empty value, are skipped. Document order is kept and
/// duplicates are not removed. The page is re-scanned on every call.
pub fn scan_tags(page: &dyn HostPage) -> Vec<String> {
    page.query_elements(CREATOR_TAG)
        .iter()
        .filter_map(|element| element.attribute(CREATOR_ATTRIBUTE))
        .filter(|creator| !creator.is_empty())
        .map(str::to_owned)
        .collect()
}
