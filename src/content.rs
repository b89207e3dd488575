//! Announcement pipeline: admin markdown to embeddable HTML, plus a short
//! version string the browser uses to remember which announcement it has
//! already dismissed.

use ammonia::{Builder, UrlRelative};
use comrak::{markdown_to_html, Options};
use sha1::{Digest, Sha1};
use std::collections::{HashMap, HashSet};

/// Hex characters of the SHA-1 digest used as the announcement version.
const FINGERPRINT_LEN: usize = 10;

const ALLOWED_TAGS: &[&str] = &[
    "b", "strong", "i", "em", "u", "s", "p", "br", "hr", "blockquote", "ul", "ol", "li", "h1",
    "h2", "h3", "h4", "code", "pre", "a", "img", "span",
];

/// Rendered announcement ready for the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Announcement {
    pub html: String,
    pub version: String,
}

impl Announcement {
    /// Both parts are empty while the announcement is switched off,
    /// whatever markdown is stored.
    pub fn resolve(markdown: &str, enabled: bool) -> Self {
        if !enabled {
            return Self::default();
        }
        Self {
            html: markdown_to_safe_html(markdown),
            version: fingerprint(markdown),
        }
    }
}

/// Render markdown to HTML. Soft line breaks become `<br>` and bare
/// `http(s)://` or `www.` URLs become links. Raw HTML passes through for
/// [`sanitize_html`] to filter.
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::default();
    options.extension.autolink = true;
    options.render.hardbreaks = true;
    options.render.unsafe_ = true;
    markdown_to_html(markdown, &options)
}

/// Filter HTML down to the announcement allowlist.
///
/// Disallowed tags are dropped (their text is kept, except for `script` and
/// `style` whose content goes too). Only absolute `http`/`https` URLs
/// survive, and every link opens in a new tab without opener or referrer.
pub fn sanitize_html(raw: &str) -> String {
    let tag_attributes: HashMap<&str, HashSet<&str>> = HashMap::from([
        ("a", HashSet::from(["href"])),
        ("img", HashSet::from(["src", "alt", "title"])),
        ("span", HashSet::from(["class"])),
    ]);

    let mut builder = Builder::default();
    builder
        .tags(ALLOWED_TAGS.iter().copied().collect())
        .generic_attributes(HashSet::new())
        .clean_content_tags(HashSet::from(["script", "style"]))
        .tag_attributes(tag_attributes)
        .url_schemes(HashSet::from(["http", "https"]))
        .url_relative(UrlRelative::Deny)
        .link_rel(Some("noopener noreferrer"))
        .set_tag_attribute_value("a", "target", "_blank");

    builder.clean(raw).to_string()
}

/// Markdown straight to sanitized HTML.
pub fn markdown_to_safe_html(markdown: &str) -> String {
    sanitize_html(&render_markdown(markdown))
}

/// First 10 hex characters of SHA-1 over the raw markdown. A cache-busting
/// marker, not a security control.
pub fn fingerprint(markdown: &str) -> String {
    let digest = Sha1::digest(markdown.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(FINGERPRINT_LEN);
    hex
}
