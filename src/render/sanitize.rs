use ammonia::{Builder, UrlRelative};
use std::collections::{HashMap, HashSet};

/// Tags an HTML ad may use
pub const ALLOWED_TAGS: &[&str] = &[
    "a", "b", "i", "em", "strong", "u", "p", "br", "span", "div", "img", "ul", "ol", "li", "h1",
    "h2", "h3", "h4", "small",
];

const LINK_ATTRIBUTES: &[&str] = &["href", "target"];
const IMAGE_ATTRIBUTES: &[&str] = &["src", "alt", "width", "height"];
const GENERIC_ATTRIBUTES: &[&str] = &["class", "title"];
const URL_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Reduce an HTML ad payload to the allow-listed subset
///
/// Script and style elements are dropped together with their contents, event
/// handler attributes and non-http(s)/mailto URLs are removed, and links get
/// `rel="noopener noreferrer"`.
pub fn sanitize_html(payload: &str) -> String {
    let mut tag_attributes = HashMap::new();
    tag_attributes.insert("a", LINK_ATTRIBUTES.iter().copied().collect::<HashSet<_>>());
    tag_attributes.insert("img", IMAGE_ATTRIBUTES.iter().copied().collect());

    Builder::default()
        .tags(ALLOWED_TAGS.iter().copied().collect())
        .tag_attributes(tag_attributes)
        .generic_attributes(GENERIC_ATTRIBUTES.iter().copied().collect())
        .url_schemes(URL_SCHEMES.iter().copied().collect())
        .url_relative(UrlRelative::Deny)
        .link_rel(Some("noopener noreferrer"))
        .clean(payload)
        .to_string()
}
