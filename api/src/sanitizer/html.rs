//! HTML cleaning
//!
//! Removes scripts, event handlers, unsafe URLs and unsupported markup with
//! ammonia, strips Microsoft Word artifacts, and reports what changed along
//! with template problems (unknown merge fields, missing images alt text).

use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};

use ammonia::Builder;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::Serialize;

use super::merge::{self, Token};
use crate::error::SanitizeError;

const ALLOWED_TAGS: &[&str] = &[
    "a", "abbr", "address", "article", "aside", "b", "blockquote", "br", "caption", "center",
    "cite", "code", "col", "colgroup", "dd", "div", "dl", "dt", "em", "figcaption", "figure",
    "font", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "i", "img", "li",
    "main", "mark", "nav", "ol", "p", "pre", "s", "section", "small", "span", "strike",
    "strong", "sub", "sup", "table", "tbody", "td", "tfoot", "th", "thead", "tr", "u", "ul",
];

/// Elements that are never reported as unsupported: the document shell is
/// always unwrapped and `script` has its own warning.
const SHELL_TAGS: &[&str] = &["html", "head", "body", "script", "title", "meta", "link"];

const URL_SCHEMES: &[&str] = &["http", "https", "mailto", "tel", "data"];

const URL_ATTRIBUTES: &[&str] = &[
    "href", "src", "action", "formaction", "background", "poster", "xlink:href", "cite",
];

const SAFE_CSS_PROPERTIES: &[&str] = &[
    "color",
    "font-family",
    "font-size",
    "font-weight",
    "font-style",
    "text-decoration",
    "text-transform",
    "letter-spacing",
    "line-height",
    "text-align",
    "vertical-align",
    "white-space",
    "background-color",
    "padding",
    "padding-top",
    "padding-right",
    "padding-bottom",
    "padding-left",
    "margin",
    "margin-top",
    "margin-right",
    "margin-bottom",
    "margin-left",
    "border",
    "border-top",
    "border-right",
    "border-bottom",
    "border-left",
    "border-width",
    "border-style",
    "border-color",
    "border-radius",
    "border-collapse",
    "border-spacing",
    "width",
    "height",
    "max-width",
    "min-width",
    "display",
    "float",
    "clear",
    "list-style-type",
];

static CONDITIONAL_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<!--\[if[^\]]*\]>.*?<!\[endif\]-->").unwrap());
static OFFICE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</?[ovwx]:[a-z]+[^>]*>").unwrap());
static START_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<[A-Za-z](?:[^<>"']|"[^"]*"|'[^']*')*>"#).unwrap());
static CLASS_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\sclass\s*=\s*("([^"]*)"|'([^']*)')"#).unwrap());
static MSO_STYLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)mso-[a-z-]+\s*:[^;\x22']*;?\s*").unwrap());
static ESCAPED_PARTIAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{(\s*)&gt;").unwrap());

static ANY_ELEMENT: Lazy<Selector> = Lazy::new(|| Selector::parse("*").unwrap());

static WITH_STYLE_BLOCKS: Lazy<Builder<'static>> = Lazy::new(|| build_cleaner(true));
static WITHOUT_STYLE_BLOCKS: Lazy<Builder<'static>> = Lazy::new(|| build_cleaner(false));

fn build_cleaner(allow_style_blocks: bool) -> Builder<'static> {
    let mut cleaner = Builder::default();

    let mut tags: HashSet<&'static str> = ALLOWED_TAGS.iter().copied().collect();
    if allow_style_blocks {
        cleaner.rm_clean_content_tags(&["style"]);
        tags.insert("style");
    }
    cleaner.tags(tags);

    cleaner.filter_style_properties(SAFE_CSS_PROPERTIES.iter().copied().collect());

    cleaner.add_generic_attributes(&[
        "style", "class", "id", "title", "lang", "dir", "width", "height", "align", "valign",
        "bgcolor", "border",
    ]);
    cleaner.add_tag_attributes("a", &["href", "title", "target", "name"]);
    cleaner.add_tag_attributes("img", &["src", "alt", "title", "width", "height", "border"]);
    cleaner.add_tag_attributes("font", &["color", "size", "face"]);
    cleaner.add_tag_attributes(
        "table",
        &["cellpadding", "cellspacing", "width", "border", "align", "role"],
    );
    cleaner.add_tag_attributes("td", &["colspan", "rowspan", "nowrap"]);
    cleaner.add_tag_attributes("th", &["colspan", "rowspan", "nowrap", "scope"]);
    cleaner.add_tag_attributes("ol", &["start", "type"]);

    cleaner.url_schemes(URL_SCHEMES.iter().copied().collect());
    cleaner.attribute_filter(|element, attribute, value| {
        if URL_ATTRIBUTES.contains(&attribute) && is_unsafe_url(element, attribute, value) {
            None
        } else {
            Some(Cow::Borrowed(value))
        }
    });

    cleaner
}

/// Sanitizer switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SanitizeOptions {
    /// Keep `<style>` blocks (their contents are not rewritten)
    pub allow_style_blocks: bool,
    /// Strip `Mso*` classes, `mso-*` styles, conditional comments and Office tags
    pub strip_word_artifacts: bool,
}

impl Default for SanitizeOptions {
    fn default() -> Self {
        Self {
            allow_style_blocks: true,
            strip_word_artifacts: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    ScriptRemoved,
    EventHandlerRemoved,
    UnsafeUrlRemoved,
    UnsupportedElementRemoved,
    WordArtifactsRemoved,
    InsecureImage,
    ImageMissingAlt,
    UnknownMergeField,
    UnknownPartial,
    MalformedMergeToken,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SanitizeWarning {
    pub kind: WarningKind,
    pub message: String,
    pub count: usize,
}

/// Cleaned HTML plus everything worth telling the author
#[derive(Debug, Clone, Serialize)]
pub struct SanitizeReport {
    pub html: String,
    pub warnings: Vec<SanitizeWarning>,
}

impl SanitizeReport {
    pub fn has(&self, kind: WarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }
}

/// Known merge keys and partial names, used to flag unknown tokens
#[derive(Debug, Default)]
pub struct Catalog<'a> {
    pub merge_keys: HashSet<&'a str>,
    pub partials: HashSet<&'a str>,
}

#[derive(Default)]
struct Findings {
    counts: BTreeMap<WarningKind, usize>,
    details: BTreeMap<WarningKind, Vec<String>>,
}

impl Findings {
    fn add(&mut self, kind: WarningKind, n: usize) {
        if n > 0 {
            *self.counts.entry(kind).or_default() += n;
        }
    }

    fn note(&mut self, kind: WarningKind, detail: &str) {
        self.add(kind, 1);
        let details = self.details.entry(kind).or_default();
        if !details.iter().any(|d| d == detail) {
            details.push(detail.to_string());
        }
    }

    fn into_warnings(self) -> Vec<SanitizeWarning> {
        let Findings {
            counts,
            mut details,
        } = self;

        counts
            .into_iter()
            .map(|(kind, count)| SanitizeWarning {
                kind,
                message: message_for(kind, details.remove(&kind).unwrap_or_default()),
                count,
            })
            .collect()
    }
}

fn message_for(kind: WarningKind, details: Vec<String>) -> String {
    let base = match kind {
        WarningKind::ScriptRemoved => "Script elements were removed",
        WarningKind::EventHandlerRemoved => "Inline event handler attributes were removed",
        WarningKind::UnsafeUrlRemoved => "Links or sources with unsafe URLs were removed",
        WarningKind::UnsupportedElementRemoved => "Unsupported elements were removed",
        WarningKind::WordArtifactsRemoved => "Microsoft Word formatting artifacts were removed",
        WarningKind::InsecureImage => "Images are loaded over plain http",
        WarningKind::ImageMissingAlt => "Images are missing alt text",
        WarningKind::UnknownMergeField => "Unknown merge fields",
        WarningKind::UnknownPartial => "Unknown layout partials",
        WarningKind::MalformedMergeToken => "Malformed merge tokens",
    };

    if details.is_empty() {
        base.to_string()
    } else {
        format!("{}: {}", base, details.join(", "))
    }
}

/// Reject input over `limit` bytes
pub fn check_size(len: usize, limit: usize) -> Result<(), SanitizeError> {
    if len > limit {
        return Err(SanitizeError::TooLarge { size: len, limit });
    }
    Ok(())
}

/// Clean `input` and report what was changed.
///
/// When `catalog` is given, merge tokens are also checked against it.
pub fn sanitize(
    input: &str,
    options: &SanitizeOptions,
    catalog: Option<&Catalog<'_>>,
) -> SanitizeReport {
    let mut findings = Findings::default();

    let prepared = if options.strip_word_artifacts {
        let (stripped, removed) = strip_word_artifacts(input);
        findings.add(WarningKind::WordArtifactsRemoved, removed);
        stripped
    } else {
        Cow::Borrowed(input)
    };

    inspect(&prepared, options, &mut findings);

    let cleaner = if options.allow_style_blocks {
        &*WITH_STYLE_BLOCKS
    } else {
        &*WITHOUT_STYLE_BLOCKS
    };
    let cleaned = cleaner.clean(&prepared).to_string();
    // The serializer escapes '>' in text, which would break `{{> partial}}`
    let html = ESCAPED_PARTIAL.replace_all(&cleaned, "{{$1>").into_owned();

    check_tokens(&html, catalog, &mut findings);

    SanitizeReport {
        html,
        warnings: findings.into_warnings(),
    }
}

/// Remove Word markup, returning the result and how many artifacts were dropped
fn strip_word_artifacts(input: &str) -> (Cow<'_, str>, usize) {
    let mut removed = CONDITIONAL_COMMENT.find_iter(input).count();
    let mut html = CONDITIONAL_COMMENT.replace_all(input, "");

    let office_tags = OFFICE_TAG.find_iter(&html).count();
    if office_tags > 0 {
        removed += office_tags;
        html = Cow::Owned(OFFICE_TAG.replace_all(&html, "").into_owned());
    }

    let (stripped, attributes) = strip_mso_attributes(&html);
    if attributes > 0 {
        removed += attributes;
        html = Cow::Owned(stripped.into_owned());
    }

    (html, removed)
}

/// Drop `mso-*` declarations and `Mso*` classes inside start tags. Text
/// content is left alone.
fn strip_mso_attributes(html: &str) -> (Cow<'_, str>, usize) {
    let mut removed = 0;

    let replaced = START_TAG.replace_all(html, |caps: &regex::Captures<'_>| {
        let tag = &caps[0];
        let styles = MSO_STYLE.find_iter(tag).count();
        removed += styles;
        let tag = if styles > 0 {
            MSO_STYLE.replace_all(tag, "")
        } else {
            Cow::Borrowed(tag)
        };

        CLASS_ATTR
            .replace_all(&tag, |caps: &regex::Captures<'_>| {
                let value = caps
                    .get(2)
                    .or_else(|| caps.get(3))
                    .map_or("", |m| m.as_str());
                let kept: Vec<&str> = value
                    .split_whitespace()
                    .filter(|class| {
                        let is_mso = has_prefix_ignore_case(class, "mso");
                        if is_mso {
                            removed += 1;
                        }
                        !is_mso
                    })
                    .collect();

                if kept.is_empty() {
                    String::new()
                } else {
                    format!(" class=\"{}\"", kept.join(" "))
                }
            })
            .into_owned()
    });

    if removed == 0 {
        return (Cow::Borrowed(html), 0);
    }
    (Cow::Owned(replaced.into_owned()), removed)
}

/// Walk the parsed input and record what the cleaner is about to remove
fn inspect(input: &str, options: &SanitizeOptions, findings: &mut Findings) {
    let fragment = Html::parse_fragment(input);

    for element in fragment.select(&ANY_ELEMENT) {
        let name = element.value().name();

        if name == "script" {
            findings.add(WarningKind::ScriptRemoved, 1);
            continue;
        }
        if name == "style" && !options.allow_style_blocks {
            findings.note(WarningKind::UnsupportedElementRemoved, "style");
            continue;
        }
        if name != "style" && !SHELL_TAGS.contains(&name) && !ALLOWED_TAGS.contains(&name) {
            findings.note(WarningKind::UnsupportedElementRemoved, name);
        }

        for (attribute, value) in element.value().attrs() {
            let attribute = attribute.to_ascii_lowercase();
            if attribute.starts_with("on") {
                findings.add(WarningKind::EventHandlerRemoved, 1);
            } else if URL_ATTRIBUTES.contains(&attribute.as_str())
                && is_unsafe_url(name, &attribute, value)
            {
                findings.add(WarningKind::UnsafeUrlRemoved, 1);
            }
        }

        if name == "img" {
            let src = element.value().attr("src").unwrap_or_default().trim();
            if has_prefix_ignore_case(src, "http://") {
                findings.add(WarningKind::InsecureImage, 1);
            }
            if element.value().attr("alt").is_none() {
                findings.add(WarningKind::ImageMissingAlt, 1);
            }
        }
    }
}

fn check_tokens(html: &str, catalog: Option<&Catalog<'_>>, findings: &mut Findings) {
    for span in merge::scan(html) {
        match span.token {
            Token::Malformed(raw) => findings.note(WarningKind::MalformedMergeToken, raw.trim()),
            Token::Field(key) => {
                if catalog.is_some_and(|c| !c.merge_keys.contains(key)) {
                    findings.note(WarningKind::UnknownMergeField, key);
                }
            }
            Token::Partial(name) => {
                if catalog.is_some_and(|c| !c.partials.contains(name)) {
                    findings.note(WarningKind::UnknownPartial, name);
                }
            }
        }
    }
}

/// Extract the scheme of an absolute URL, if it has one
fn url_scheme(value: &str) -> Option<String> {
    let (scheme, _) = value.trim().split_once(':')?;
    // Browsers ignore whitespace embedded in a scheme
    let scheme: String = scheme.chars().filter(|c| !c.is_whitespace()).collect();
    let valid = scheme
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then(|| scheme.to_ascii_lowercase())
}

fn has_prefix_ignore_case(value: &str, prefix: &str) -> bool {
    value
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

fn is_data_image(value: &str) -> bool {
    has_prefix_ignore_case(value.trim(), "data:image/")
}

fn is_unsafe_url(element: &str, attribute: &str, value: &str) -> bool {
    match url_scheme(value).as_deref() {
        None => false,
        Some("data") => !(element == "img" && attribute == "src" && is_data_image(value)),
        Some(scheme) => !URL_SCHEMES.contains(&scheme),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean(input: &str) -> SanitizeReport {
        sanitize(input, &SanitizeOptions::default(), None)
    }

    fn count(report: &SanitizeReport, kind: WarningKind) -> usize {
        report
            .warnings
            .iter()
            .find(|w| w.kind == kind)
            .map_or(0, |w| w.count)
    }

    #[test]
    fn removes_scripts_and_handlers() {
        let report = clean(r#"<p onclick="steal()">Hi</p><script>alert(1)</script>"#);
        assert_eq!(report.html, "<p>Hi</p>");
        assert_eq!(count(&report, WarningKind::ScriptRemoved), 1);
        assert_eq!(count(&report, WarningKind::EventHandlerRemoved), 1);
    }

    #[test]
    fn removes_javascript_urls() {
        let report = clean(r#"<a href="javascript:alert(1)">x</a>"#);
        assert!(!report.html.contains("javascript"));
        assert_eq!(count(&report, WarningKind::UnsafeUrlRemoved), 1);
    }

    #[test]
    fn keeps_allowed_schemes_and_relative_urls() {
        let report = clean(
            r#"<a href="https://example.com">a</a><a href="mailto:x@example.com">b</a><a href="tel:+15550100">c</a><a href="/listings/1">d</a>"#,
        );
        for url in [
            "https://example.com",
            "mailto:x@example.com",
            "tel:+15550100",
            "/listings/1",
        ] {
            assert!(report.html.contains(url), "{} missing from {}", url, report.html);
        }
        assert!(!report.has(WarningKind::UnsafeUrlRemoved));
    }

    #[test]
    fn data_urls_only_survive_on_images() {
        let report = clean(
            r#"<img src="data:image/png;base64,AAAA" alt="logo"><a href="data:text/html,boom">x</a>"#,
        );
        assert!(report.html.contains("data:image/png;base64,AAAA"));
        assert!(!report.html.contains("data:text/html"));
        assert_eq!(count(&report, WarningKind::UnsafeUrlRemoved), 1);
    }

    #[test]
    fn merge_tokens_in_attributes_pass_through() {
        let report = clean(r#"<a href="{{ listing.url }}">View</a><img src="{{ agent.photo }}" alt="">"#);
        assert!(report.html.contains(r#"href="{{ listing.url }}""#));
        assert!(report.html.contains(r#"src="{{ agent.photo }}""#));
    }

    #[test]
    fn partial_tokens_survive_serialization() {
        let report = clean("<div>{{> footer }}</div><p>{{>legal}}</p>");
        assert_eq!(report.html, "<div>{{> footer }}</div><p>{{>legal}}</p>");
    }

    #[test]
    fn filters_style_properties() {
        let report = clean(r#"<p style="color: red; position: fixed">x</p>"#);
        assert!(report.html.contains("color"));
        assert!(!report.html.contains("position"));
    }

    #[test]
    fn style_blocks_follow_options() {
        let input = "<style>p { color: red; }</style><p>x</p>";

        let kept = sanitize(input, &SanitizeOptions::default(), None);
        assert!(kept.html.contains("<style>"));

        let options = SanitizeOptions {
            allow_style_blocks: false,
            ..Default::default()
        };
        let dropped = sanitize(input, &options, None);
        assert!(!dropped.html.contains("style"));
        assert_eq!(count(&dropped, WarningKind::UnsupportedElementRemoved), 1);
    }

    #[test]
    fn reports_unsupported_elements() {
        let report = clean(r#"<iframe src="https://example.com"></iframe><form><input></form>"#);
        assert!(!report.html.contains("iframe"));
        let warning = report
            .warnings
            .iter()
            .find(|w| w.kind == WarningKind::UnsupportedElementRemoved)
            .unwrap();
        assert!(warning.message.contains("iframe"));
        assert!(warning.message.contains("form"));
    }

    #[test]
    fn strips_word_artifacts() {
        let input = concat!(
            r#"<!--[if gte mso 9]><xml><o:OfficeDocumentSettings/></xml><![endif]-->"#,
            r#"<p class="MsoNormal intro" style="mso-line-height-rule: exactly; color: blue">"#,
            r#"Hello<o:p></o:p></p>"#,
        );
        let report = clean(input);
        assert!(!report.html.contains("Mso"));
        assert!(!report.html.contains("mso-"));
        assert!(!report.html.contains("o:p"));
        assert!(report.html.contains(r#"class="intro""#));
        assert!(report.html.contains("Hello"));
        assert!(count(&report, WarningKind::WordArtifactsRemoved) >= 4);
    }

    #[test]
    fn word_artifact_patterns_in_text_are_kept() {
        let input = concat!(
            r#"<pre>mso-foo: bar; class="MsoX"</pre>"#,
            r#"<p class="MsoNormal" style="mso-bidi-font-size: 11pt">Body</p>"#,
        );
        let report = clean(input);
        assert!(report.html.contains("mso-foo: bar;"));
        assert!(report.html.contains("MsoX"));
        assert!(!report.html.contains("MsoNormal"));
        assert!(!report.html.contains("mso-bidi"));
        assert_eq!(count(&report, WarningKind::WordArtifactsRemoved), 2);
    }

    #[test]
    fn word_artifacts_can_be_kept() {
        let options = SanitizeOptions {
            strip_word_artifacts: false,
            ..Default::default()
        };
        let report = sanitize(r#"<p class="MsoNormal">x</p>"#, &options, None);
        assert!(report.html.contains("MsoNormal"));
        assert!(!report.has(WarningKind::WordArtifactsRemoved));
    }

    #[test]
    fn flags_image_problems() {
        let report = clean(r#"<img src="http://cdn.example.com/a.png"><img src="https://x/b.png" alt="b">"#);
        assert_eq!(count(&report, WarningKind::InsecureImage), 1);
        assert_eq!(count(&report, WarningKind::ImageMissingAlt), 1);
    }

    #[test]
    fn checks_tokens_against_catalog() {
        let catalog = Catalog {
            merge_keys: ["listing.price"].into_iter().collect(),
            partials: ["footer"].into_iter().collect(),
        };
        let report = sanitize(
            "<p>{{ listing.price }} {{ listing.pirce }} {{> header }} {{> footer }} {{ Bad Token }}</p>",
            &SanitizeOptions::default(),
            Some(&catalog),
        );

        let unknown = report
            .warnings
            .iter()
            .find(|w| w.kind == WarningKind::UnknownMergeField)
            .unwrap();
        assert_eq!(unknown.count, 1);
        assert!(unknown.message.contains("listing.pirce"));
        assert_eq!(count(&report, WarningKind::UnknownPartial), 1);
        assert_eq!(count(&report, WarningKind::MalformedMergeToken), 1);
    }

    #[test]
    fn without_catalog_only_malformed_tokens_are_reported() {
        let report = clean("<p>{{ anything.goes }} {{ nope nope }}</p>");
        assert!(!report.has(WarningKind::UnknownMergeField));
        assert!(report.has(WarningKind::MalformedMergeToken));
    }

    #[test]
    fn clean_input_has_no_warnings() {
        let report = clean(r#"<h1>Open House</h1><p><strong>Saturday</strong></p>"#);
        assert!(report.warnings.is_empty());
        assert_eq!(report.html, "<h1>Open House</h1><p><strong>Saturday</strong></p>");
    }

    #[test]
    fn size_limit_is_enforced() {
        assert!(check_size(10, 10).is_ok());
        assert!(matches!(
            check_size(11, 10),
            Err(SanitizeError::TooLarge { size: 11, limit: 10 })
        ));
    }
}
