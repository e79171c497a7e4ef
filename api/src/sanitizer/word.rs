//! Word (.docx) to HTML conversion
//!
//! Reads `word/document.xml` and its relationships out of the zip container
//! and emits plain structural HTML. The output still goes through
//! [`super::html::sanitize`] before anyone sees it.

use std::borrow::Cow;
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;
use zip::result::ZipError;
use zip::ZipArchive;

use super::html::check_size;
use super::merge::escape_html;
use crate::error::SanitizeError;

const DOCUMENT_PART: &str = "word/document.xml";
const RELATIONSHIPS_PART: &str = "word/_rels/document.xml.rels";

/// Most uncompressed bytes read out of one container, across all parts
const MAX_EXPANDED_BYTES: u64 = 64 * 1024 * 1024;

static XML_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<\?.*?\?>|<!--.*?-->|<(/?)([A-Za-z][\w:.-]*)([^>]*?)(/?)>|([^<]+)").unwrap()
});
static XML_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([A-Za-z_][\w:.-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap());
static RELATIONSHIP: Lazy<Regex> = Lazy::new(|| Regex::new(r"<Relationship\b([^>]*?)/?>").unwrap());
static CHAR_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"&(#x[0-9A-Fa-f]+|#[0-9]+|[a-z]+);").unwrap());

/// Convert a `.docx` file to unsanitized HTML.
///
/// Fails with [`SanitizeError::TooLarge`] once the HTML would exceed
/// `max_html_bytes` or the container expands past its read budget.
pub fn docx_to_html(bytes: &[u8], max_html_bytes: usize) -> Result<String, SanitizeError> {
    let archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| SanitizeError::InvalidDocument(e.to_string()))?;
    let mut parts = Parts::new(archive, MAX_EXPANDED_BYTES);

    let document = parts
        .read(DOCUMENT_PART)?
        .ok_or_else(|| SanitizeError::MissingPart(DOCUMENT_PART.to_string()))?;
    let document = String::from_utf8(document)
        .map_err(|_| SanitizeError::MalformedXml(format!("{} is not UTF-8", DOCUMENT_PART)))?;

    let relationships = match parts.read(RELATIONSHIPS_PART)? {
        Some(raw) => {
            let raw = String::from_utf8_lossy(&raw).into_owned();
            Relationships::load(&raw, &mut parts)?
        }
        None => Relationships::default(),
    };

    let html = Converter::new(&relationships, max_html_bytes).run(&document)?;
    tracing::debug!(
        bytes = bytes.len(),
        expanded = parts.read_bytes,
        html_bytes = html.len(),
        images = relationships.images.len(),
        "Converted Word document"
    );

    Ok(html)
}

/// Zip reader that charges every part against one shared budget
struct Parts<R> {
    archive: ZipArchive<R>,
    budget: u64,
    read_bytes: u64,
}

impl<R: Read + Seek> Parts<R> {
    fn new(archive: ZipArchive<R>, budget: u64) -> Self {
        Self {
            archive,
            budget,
            read_bytes: 0,
        }
    }

    fn read(&mut self, name: &str) -> Result<Option<Vec<u8>>, SanitizeError> {
        let remaining = self.budget.saturating_sub(self.read_bytes);
        let limit = usize::try_from(self.budget).unwrap_or(usize::MAX);
        let too_large = |size: u64| SanitizeError::TooLarge {
            size: usize::try_from(size).unwrap_or(usize::MAX),
            limit,
        };

        let file = match self.archive.by_name(name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(SanitizeError::InvalidDocument(e.to_string())),
        };
        if file.size() > remaining {
            return Err(too_large(self.read_bytes.saturating_add(file.size())));
        }

        // The declared size can lie, so read one byte past the budget to notice
        let mut buf = Vec::with_capacity(file.size() as usize);
        file.take(remaining + 1)
            .read_to_end(&mut buf)
            .map_err(|e| SanitizeError::InvalidDocument(format!("{}: {}", name, e)))?;
        if buf.len() as u64 > remaining {
            return Err(too_large(self.read_bytes.saturating_add(buf.len() as u64)));
        }

        self.read_bytes += buf.len() as u64;
        Ok(Some(buf))
    }
}

/// Hyperlink targets and inlined images keyed by relationship id
#[derive(Debug, Default)]
struct Relationships {
    links: HashMap<String, String>,
    images: HashMap<String, String>,
}

impl Relationships {
    fn load<R: Read + Seek>(xml: &str, parts: &mut Parts<R>) -> Result<Self, SanitizeError> {
        let mut relationships = Self::default();

        for caps in RELATIONSHIP.captures_iter(xml) {
            let attrs = &caps[1];
            let (Some(id), Some(kind), Some(target)) = (
                attr(attrs, "Id"),
                attr(attrs, "Type"),
                attr(attrs, "Target"),
            ) else {
                continue;
            };

            if kind.ends_with("/hyperlink") {
                relationships.links.insert(id, target);
            } else if kind.ends_with("/image") {
                let Some(mime) = image_mime(&target) else {
                    tracing::debug!(target = %target, "Skipping image in unsupported format");
                    continue;
                };
                if relationships.images.contains_key(&id) {
                    continue;
                }
                if let Some(data) = parts.read(&part_path(&target))? {
                    let uri = format!("data:{};base64,{}", mime, STANDARD.encode(data));
                    relationships.images.insert(id, uri);
                }
            }
        }

        Ok(relationships)
    }
}

/// Resolve a relationship target against the `word/` folder
fn part_path(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("word/{}", target.trim_start_matches("./")),
    }
}

fn image_mime(target: &str) -> Option<&'static str> {
    let extension = target.rsplit('.').next()?.to_ascii_lowercase();
    match extension.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Look up an attribute value in the raw attribute text of a tag
fn attr(attrs: &str, name: &str) -> Option<String> {
    XML_ATTR
        .captures_iter(attrs)
        .find(|caps| &caps[1] == name)
        .and_then(|caps| caps.get(2).or_else(|| caps.get(3)))
        .map(|m| decode_entities(m.as_str()).into_owned())
}

fn decode_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }

    CHAR_REF.replace_all(text, |caps: &regex::Captures<'_>| {
        let reference = &caps[1];
        let decoded = match reference {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => {
                let code = if let Some(hex) = reference.strip_prefix("#x") {
                    u32::from_str_radix(hex, 16).ok()
                } else {
                    reference.strip_prefix('#').and_then(|d| d.parse().ok())
                };
                code.and_then(char::from_u32)
            }
        };
        decoded.map_or_else(|| caps[0].to_string(), String::from)
    })
}

/// Whether a toggle property like `<w:b w:val="0"/>` is switched on
fn toggle_on(attrs: &str) -> bool {
    !matches!(
        attr(attrs, "w:val").as_deref(),
        Some("0" | "false" | "none" | "off")
    )
}

/// Heading level for a paragraph style id such as `Heading2` or `Title`
fn heading_level(style: &str) -> Option<u8> {
    let style: String = style
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    if style == "title" {
        return Some(1);
    }
    let level: u8 = style.strip_prefix("heading")?.parse().ok()?;
    (1..=6).contains(&level).then_some(level)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Format {
    bold: bool,
    italic: bool,
    underline: bool,
}

impl Format {
    fn wrap(&self, html: &str) -> String {
        let mut out = String::with_capacity(html.len() + 32);
        if self.bold {
            out.push_str("<strong>");
        }
        if self.italic {
            out.push_str("<em>");
        }
        if self.underline {
            out.push_str("<u>");
        }
        out.push_str(html);
        if self.underline {
            out.push_str("</u>");
        }
        if self.italic {
            out.push_str("</em>");
        }
        if self.bold {
            out.push_str("</strong>");
        }
        out
    }
}

#[derive(Debug, Default)]
struct Run {
    format: Format,
    html: String,
}

#[derive(Debug, Default)]
struct Paragraph {
    style: Option<String>,
    list: bool,
    html: String,
    /// Adjacent runs with identical formatting are merged so merge tokens
    /// split across runs stay contiguous
    pending: Option<Run>,
    /// Text-box paragraphs anchored inside this one, emitted after it
    trailing: String,
}

impl Paragraph {
    fn push_run(&mut self, run: Run) {
        match &mut self.pending {
            Some(pending) if pending.format == run.format => pending.html.push_str(&run.html),
            _ => {
                self.flush();
                self.pending = Some(run);
            }
        }
    }

    fn push_raw(&mut self, html: &str) {
        self.flush();
        self.html.push_str(html);
    }

    fn flush(&mut self) {
        if let Some(run) = self.pending.take() {
            if !run.html.is_empty() {
                self.html.push_str(&run.format.wrap(&run.html));
            }
        }
    }

    fn tag(&self) -> Cow<'static, str> {
        match self.style.as_deref().and_then(heading_level) {
            Some(level) => Cow::Owned(format!("h{}", level)),
            None if self.list => Cow::Borrowed("li"),
            None => Cow::Borrowed("p"),
        }
    }
}

struct Converter<'a> {
    relationships: &'a Relationships,
    out: String,
    list_open: bool,
    paragraphs: Vec<Paragraph>,
    runs: Vec<Run>,
    in_paragraph_props: bool,
    in_run_props: bool,
    in_text: bool,
    /// Whether each open `w:hyperlink` emitted an `<a>`
    hyperlinks: Vec<bool>,
    image_alt: Option<String>,
    /// Nesting depth inside `mc:Fallback`, whose content repeats `mc:Choice`
    fallback_depth: usize,
    max_html_bytes: usize,
    /// Image bytes already handed to runs or paragraphs
    image_bytes: usize,
    overflow: Option<usize>,
}

impl<'a> Converter<'a> {
    fn new(relationships: &'a Relationships, max_html_bytes: usize) -> Self {
        Self {
            relationships,
            out: String::new(),
            list_open: false,
            paragraphs: Vec::new(),
            runs: Vec::new(),
            in_paragraph_props: false,
            in_run_props: false,
            in_text: false,
            hyperlinks: Vec::new(),
            image_alt: None,
            fallback_depth: 0,
            max_html_bytes,
            image_bytes: 0,
            overflow: None,
        }
    }

    fn run(mut self, xml: &str) -> Result<String, SanitizeError> {
        for caps in XML_TOKEN.captures_iter(xml) {
            if let Some(size) = self.overflow {
                return Err(SanitizeError::TooLarge {
                    size,
                    limit: self.max_html_bytes,
                });
            }
            if let Some(text) = caps.get(5) {
                self.text(text.as_str());
                continue;
            }
            let Some(name) = caps.get(2).map(|m| m.as_str()) else {
                continue;
            };
            let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
            let self_closing = caps.get(4).is_some_and(|m| !m.as_str().is_empty());
            let attrs = caps.get(3).map_or("", |m| m.as_str());

            if name == "mc:Fallback" {
                if closing {
                    self.fallback_depth = self.fallback_depth.saturating_sub(1);
                } else if !self_closing {
                    self.fallback_depth += 1;
                }
                continue;
            }
            if self.fallback_depth > 0 {
                continue;
            }

            if closing {
                self.end(name);
            } else {
                self.start(name, attrs);
                if self_closing {
                    self.end(name);
                }
            }
        }

        self.close_list();
        if let Some(size) = self.overflow {
            return Err(SanitizeError::TooLarge {
                size,
                limit: self.max_html_bytes,
            });
        }
        check_size(self.out.len(), self.max_html_bytes)?;
        Ok(self.out)
    }

    fn start(&mut self, name: &str, attrs: &str) {
        match name {
            "w:p" => self.paragraphs.push(Paragraph::default()),
            "w:pPr" => self.in_paragraph_props = true,
            "w:pStyle" if self.in_paragraph_props => {
                if let Some(paragraph) = self.paragraphs.last_mut() {
                    paragraph.style = attr(attrs, "w:val");
                }
            }
            "w:numPr" if self.in_paragraph_props => {
                if let Some(paragraph) = self.paragraphs.last_mut() {
                    paragraph.list = true;
                }
            }
            "w:r" => self.runs.push(Run::default()),
            "w:rPr" => self.in_run_props = true,
            "w:b" | "w:i" | "w:u" if self.in_run_props && !self.in_paragraph_props => {
                if let Some(run) = self.runs.last_mut() {
                    let on = toggle_on(attrs);
                    match name {
                        "w:b" => run.format.bold = on,
                        "w:i" => run.format.italic = on,
                        _ => run.format.underline = on,
                    }
                }
            }
            "w:t" => self.in_text = true,
            "w:br" => self.push_inline("<br>"),
            // Tab stops in paragraph properties share the element name
            "w:tab" if !self.in_paragraph_props => self.push_inline("&emsp;"),
            "w:hyperlink" => self.open_hyperlink(attrs),
            "wp:docPr" => self.image_alt = attr(attrs, "descr").filter(|d| !d.trim().is_empty()),
            "a:blip" => self.push_image(attrs),
            "w:tbl" => {
                self.close_list();
                self.out.push_str("<table>");
            }
            "w:tr" => self.out.push_str("<tr>"),
            "w:tc" => self.out.push_str("<td>"),
            _ => {}
        }
    }

    fn end(&mut self, name: &str) {
        match name {
            "w:p" => self.finish_paragraph(),
            "w:pPr" => self.in_paragraph_props = false,
            "w:rPr" => self.in_run_props = false,
            "w:r" => {
                if let Some(run) = self.runs.pop() {
                    if let Some(paragraph) = self.paragraphs.last_mut() {
                        paragraph.push_run(run);
                    }
                }
            }
            "w:t" => self.in_text = false,
            "w:hyperlink" => {
                if self.hyperlinks.pop() == Some(true) {
                    if let Some(paragraph) = self.paragraphs.last_mut() {
                        paragraph.push_raw("</a>");
                    }
                }
            }
            "w:tc" => {
                self.close_list();
                self.out.push_str("</td>");
            }
            "w:tr" => self.out.push_str("</tr>"),
            "w:tbl" => self.out.push_str("</table>"),
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if !self.in_text || self.fallback_depth > 0 {
            return;
        }
        if let Some(run) = self.runs.last_mut() {
            run.html.push_str(&escape_html(&decode_entities(text)));
        }
    }

    fn push_inline(&mut self, html: &str) {
        if let Some(run) = self.runs.last_mut() {
            run.html.push_str(html);
        } else if let Some(paragraph) = self.paragraphs.last_mut() {
            paragraph.push_raw(html);
        }
    }

    fn open_hyperlink(&mut self, attrs: &str) {
        let href = attr(attrs, "r:id")
            .and_then(|id| self.relationships.links.get(&id).cloned())
            .or_else(|| attr(attrs, "w:anchor").map(|anchor| format!("#{}", anchor)));

        match (href, self.paragraphs.last_mut()) {
            (Some(href), Some(paragraph)) => {
                paragraph.push_raw(&format!("<a href=\"{}\">", escape_html(&href)));
                self.hyperlinks.push(true);
            }
            _ => self.hyperlinks.push(false),
        }
    }

    fn push_image(&mut self, attrs: &str) {
        let alt = self.image_alt.take();
        let relationships = self.relationships;
        let Some(src) = attr(attrs, "r:embed").and_then(|id| relationships.images.get(&id))
        else {
            return;
        };

        // Every reference inlines the whole image again. Text is bounded by
        // the document part and checked once at the end.
        let projected = self.image_bytes + src.len();
        if projected > self.max_html_bytes {
            self.overflow = Some(projected);
            return;
        }
        self.image_bytes += src.len();

        let tag = match alt {
            Some(alt) => format!("<img src=\"{}\" alt=\"{}\">", src, escape_html(&alt)),
            None => format!("<img src=\"{}\">", src),
        };
        self.push_inline(&tag);
    }

    fn finish_paragraph(&mut self) {
        let Some(mut paragraph) = self.paragraphs.pop() else {
            return;
        };
        paragraph.flush();
        let tag = paragraph.tag();

        // A text box paragraph closes while its anchor paragraph is still open
        if let Some(parent) = self.paragraphs.last_mut() {
            if !paragraph.html.trim().is_empty() {
                let tag = if tag == "li" { Cow::Borrowed("p") } else { tag };
                parent
                    .trailing
                    .push_str(&format!("<{0}>{1}</{0}>", tag, paragraph.html));
            }
            parent.trailing.push_str(&paragraph.trailing);
            return;
        }

        if tag == "li" {
            if !self.list_open {
                self.out.push_str("<ul>");
                self.list_open = true;
            }
        } else {
            self.close_list();
        }

        if !paragraph.html.trim().is_empty() {
            self.out
                .push_str(&format!("<{0}>{1}</{0}>", tag, paragraph.html));
        }
        self.out.push_str(&paragraph.trailing);
    }

    fn close_list(&mut self) {
        if self.list_open {
            self.out.push_str("</ul>");
            self.list_open = false;
        }
    }
}
