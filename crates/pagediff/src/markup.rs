//! Page structure model used by the accessibility rules.
//!
//! A [`Document`] is a flat arena of [`Element`]s in document order, built
//! either from HTML source by a small lenient tokenizer or from a JSON DOM
//! snapshot taken by a browser (which can also carry rendered bounds and
//! computed styles).

use crate::capture::PageMarkup;
use crate::detector::{BoundingBox, ElementBox};
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Index of an element in its [`Document`]
pub type NodeId = usize;

/// Elements that never have children or a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose content is not markup
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Elements closed implicitly by an opening sibling of the same tag
const SELF_NESTING_CLOSES: &[&str] = &["p", "li", "option", "tr", "td", "th", "dt", "dd"];

/// Deepest element nesting accepted from HTML source
pub const MAX_NESTING_DEPTH: usize = 512;

const ATTRIBUTE_PATTERN: &str =
    r#"([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#;

/// Why markup could not be turned into a [`Document`]
#[derive(Debug, Error)]
pub enum MarkupError {
    /// Nothing but whitespace
    #[error("markup is empty")]
    Empty,

    /// Input ended inside a tag or comment
    #[error("unterminated {construct} starting at byte {offset}")]
    Unterminated {
        /// What was left open
        construct: &'static str,
        /// Byte offset where it began
        offset: usize,
    },

    /// Elements nested deeper than [`MAX_NESTING_DEPTH`]
    #[error("elements nested deeper than {limit} levels at byte {offset}")]
    TooDeep {
        /// Nesting limit
        limit: usize,
        /// Byte offset of the offending tag
        offset: usize,
    },

    /// Parsed cleanly but produced no elements
    #[error("markup contains no elements")]
    NoElements,

    /// DOM snapshot is not valid JSON for the expected shape
    #[error("invalid DOM snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// Internal pattern failed to compile
    #[error("attribute pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// One element of a page
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    /// Lowercase tag name
    pub tag: String,
    /// Attributes with lowercase names; the first occurrence wins
    pub attributes: BTreeMap<String, String>,
    /// Text directly inside this element (not inside children)
    pub text: String,
    /// Child element ids in document order
    pub children: Vec<NodeId>,
    /// Parent element id
    pub parent: Option<NodeId>,
    /// Rendered bounds, when known
    pub bounds: Option<BoundingBox>,
    /// Style declarations (inline, overridden by computed styles from a snapshot)
    pub styles: BTreeMap<String, String>,
}

impl Element {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Self::default()
        }
    }

    /// Attribute value
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Attribute value with surrounding whitespace removed, if non-empty
    #[must_use]
    pub fn non_empty_attr(&self, name: &str) -> Option<&str> {
        self.attr(name).map(str::trim).filter(|v| !v.is_empty())
    }

    /// Whether an attribute is present (even if empty)
    #[must_use]
    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Style value
    #[must_use]
    pub fn style(&self, property: &str) -> Option<&str> {
        self.styles.get(property).map(String::as_str)
    }

    /// Whether the element is one of `tags`
    #[must_use]
    pub fn is_any(&self, tags: &[&str]) -> bool {
        tags.contains(&self.tag.as_str())
    }

    fn set_attribute(&mut self, name: &str, value: String) {
        let name = name.to_ascii_lowercase();
        if name == "style" {
            for (property, declared) in parse_style(&value) {
                self.styles.entry(property).or_insert(declared);
            }
        }
        self.attributes.entry(name).or_insert(value);
    }
}

/// Parsed page
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    elements: Vec<Element>,
    roots: Vec<NodeId>,
}

impl Document {
    /// Parse either markup flavour
    pub fn parse(markup: &PageMarkup) -> Result<Self, MarkupError> {
        match markup {
            PageMarkup::Html(text) => Self::parse_html(text),
            PageMarkup::DomSnapshot(text) => Self::from_snapshot(text),
        }
    }

    /// Parse HTML source.
    ///
    /// Mismatched closing tags are tolerated. Input that ends inside a tag,
    /// comment or raw-text element is rejected.
    pub fn parse_html(source: &str) -> Result<Self, MarkupError> {
        if source.trim().is_empty() {
            return Err(MarkupError::Empty);
        }
        let mut builder = HtmlBuilder::new(source)?;
        builder.run()?;
        let document = builder.document;
        if document.elements.is_empty() {
            return Err(MarkupError::NoElements);
        }
        Ok(document)
    }

    /// Load a JSON DOM snapshot
    pub fn from_snapshot(json: &str) -> Result<Self, MarkupError> {
        if json.trim().is_empty() {
            return Err(MarkupError::Empty);
        }
        let root: SnapshotNode = serde_json::from_str(json)?;
        let mut document = Self::default();
        document.insert_snapshot(root, None);
        Ok(document)
    }

    fn insert_snapshot(&mut self, node: SnapshotNode, parent: Option<NodeId>) {
        let mut element = Element::new(&node.tag);
        for (name, value) in node.attributes {
            element.set_attribute(&name, value);
        }
        // Computed styles override inline declarations
        for (property, value) in node.styles {
            element.styles.insert(property.to_ascii_lowercase(), value);
        }
        element.text = decode_entities(&node.text);
        element.bounds = node.bounds;
        let id = self.push(element, parent);
        for child in node.children {
            self.insert_snapshot(child, Some(id));
        }
    }

    fn push(&mut self, mut element: Element, parent: Option<NodeId>) -> NodeId {
        let id = self.elements.len();
        element.parent = parent;
        self.elements.push(element);
        match parent {
            Some(p) => self.elements[p].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    /// Number of elements
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the document has no elements
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Element by id
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Element> {
        self.elements.get(id)
    }

    /// All elements with their ids, in document order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Element)> {
        self.elements.iter().enumerate()
    }

    /// Elements with the given tag
    pub fn by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = (NodeId, &'a Element)> + 'a {
        self.iter().filter(move |(_, e)| e.tag == tag)
    }

    /// Top-level elements
    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// The `<html>` element, if any
    #[must_use]
    pub fn html_element(&self) -> Option<&Element> {
        self.by_tag("html").next().map(|(_, e)| e)
    }

    /// Parent chain from the element's parent up to the root
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &Element)> {
        let mut next = self.get(id).and_then(|e| e.parent);
        std::iter::from_fn(move || {
            let current = next?;
            let element = self.get(current)?;
            next = element.parent;
            Some((current, element))
        })
    }

    /// Concatenated text of the element and its descendants, whitespace-collapsed
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        self.collect_text(id, &mut parts);
        parts.join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn collect_text<'a>(&'a self, id: NodeId, parts: &mut Vec<&'a str>) {
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            let Some(element) = self.get(node) else {
                continue;
            };
            if element.is_any(RAW_TEXT_ELEMENTS) {
                continue;
            }
            if !element.text.trim().is_empty() {
                parts.push(&element.text);
            }
            stack.extend(element.children.iter().rev());
        }
    }

    /// Descendants of `id` in document order, not including `id` itself
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &Element)> {
        let mut stack: Vec<NodeId> = self
            .get(id)
            .map(|e| e.children.iter().rev().copied().collect())
            .unwrap_or_default();
        std::iter::from_fn(move || {
            let current = stack.pop()?;
            let element = self.get(current)?;
            stack.extend(element.children.iter().rev());
            Some((current, element))
        })
    }

    /// First value of `property` on the element or its ancestors
    #[must_use]
    pub fn inherited_style(&self, id: NodeId, property: &str) -> Option<&str> {
        self.get(id)
            .and_then(|e| e.style(property))
            .or_else(|| self.ancestors(id).find_map(|(_, e)| e.style(property)))
    }

    /// Whether the element or any ancestor is `aria-hidden="true"`
    #[must_use]
    pub fn is_aria_hidden(&self, id: NodeId) -> bool {
        let hidden = |e: &Element| e.attr("aria-hidden").is_some_and(|v| v.trim() == "true");
        self.get(id).is_some_and(hidden) || self.ancestors(id).any(|(_, e)| hidden(e))
    }

    /// Stable key for pairing elements across pages: `#id` when present,
    /// otherwise the tag path with sibling indexes (`html>body>div[2]`)
    #[must_use]
    pub fn element_key(&self, id: NodeId) -> String {
        if let Some(element_id) = self.get(id).and_then(|e| e.non_empty_attr("id")) {
            return format!("#{element_id}");
        }
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            let Some(element) = self.get(node) else {
                break;
            };
            let siblings = element
                .parent
                .and_then(|p| self.get(p))
                .map_or(self.roots.as_slice(), |p| p.children.as_slice());
            let index = siblings
                .iter()
                .filter(|&&s| s < node && self.elements[s].tag == element.tag)
                .count();
            segments.push(format!("{}[{index}]", element.tag));
            current = element.parent;
        }
        segments.reverse();
        segments.join(">")
    }

    /// Boxes of elements that carry rendered bounds
    #[must_use]
    pub fn element_boxes(&self) -> Vec<ElementBox> {
        self.iter()
            .filter_map(|(id, element)| {
                element.bounds.map(|bounds| ElementBox {
                    key: self.element_key(id),
                    tag: element.tag.clone(),
                    bounds,
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct SnapshotNode {
    tag: String,
    #[serde(default)]
    attributes: BTreeMap<String, String>,
    #[serde(default)]
    text: String,
    #[serde(default)]
    children: Vec<SnapshotNode>,
    #[serde(default)]
    bounds: Option<BoundingBox>,
    #[serde(default)]
    styles: BTreeMap<String, String>,
}

struct HtmlBuilder<'a> {
    source: &'a str,
    pos: usize,
    open: Vec<NodeId>,
    attribute_pattern: Regex,
    document: Document,
}

impl<'a> HtmlBuilder<'a> {
    fn new(source: &'a str) -> Result<Self, MarkupError> {
        Ok(Self {
            source,
            pos: 0,
            open: Vec::new(),
            attribute_pattern: Regex::new(ATTRIBUTE_PATTERN)?,
            document: Document::default(),
        })
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn run(&mut self) -> Result<(), MarkupError> {
        while self.pos < self.source.len() {
            let Some(lt) = self.rest().find('<') else {
                self.push_text(self.source.len());
                break;
            };
            self.push_text(self.pos + lt);

            let rest = self.rest();
            if rest.starts_with("<!--") {
                let end = rest
                    .find("-->")
                    .ok_or(self.unterminated("comment"))?;
                self.pos += end + 3;
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                let end = rest.find('>').ok_or(self.unterminated("declaration"))?;
                self.pos += end + 1;
            } else if rest.starts_with("</") {
                let end = rest.find('>').ok_or(self.unterminated("closing tag"))?;
                let name = rest[2..end].trim().to_ascii_lowercase();
                self.close(&name);
                self.pos += end + 1;
            } else if rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
                self.open_tag()?;
            } else {
                // Stray '<' is plain text
                self.append_text("<");
                self.pos += 1;
            }
        }
        Ok(())
    }

    fn unterminated(&self, construct: &'static str) -> MarkupError {
        MarkupError::Unterminated {
            construct,
            offset: self.pos,
        }
    }

    fn push_text(&mut self, end: usize) {
        if end > self.pos {
            let text = decode_entities(&self.source[self.pos..end]);
            self.append_text(&text);
        }
        self.pos = end;
    }

    fn append_text(&mut self, text: &str) {
        if let Some(&top) = self.open.last() {
            self.document.elements[top].text.push_str(text);
        }
    }

    fn open_tag(&mut self) -> Result<(), MarkupError> {
        let start = self.pos;
        let end = tag_end(self.rest()).ok_or(self.unterminated("tag"))?;
        let inner = &self.source[start + 1..start + end];
        self.pos = start + end + 1;

        let self_closing = inner.trim_end().ends_with('/');
        let inner = inner.trim_end().trim_end_matches('/');
        let name_len = inner
            .find(|c: char| c.is_whitespace() || c == '/')
            .unwrap_or(inner.len());
        let mut element = Element::new(&inner[..name_len]);

        for capture in self.attribute_pattern.captures_iter(&inner[name_len..]) {
            let Some(name) = capture.get(1) else {
                continue;
            };
            let value = capture
                .get(2)
                .or_else(|| capture.get(3))
                .or_else(|| capture.get(4))
                .map(|m| decode_entities(m.as_str()))
                .unwrap_or_default();
            element.set_attribute(name.as_str(), value);
        }

        if element.is_any(SELF_NESTING_CLOSES) {
            if let Some(&top) = self.open.last() {
                if self.document.elements[top].tag == element.tag {
                    self.open.pop();
                }
            }
        }

        if self.open.len() >= MAX_NESTING_DEPTH {
            return Err(MarkupError::TooDeep {
                limit: MAX_NESTING_DEPTH,
                offset: start,
            });
        }

        let tag = element.tag.clone();
        let id = self.document.push(element, self.open.last().copied());

        if RAW_TEXT_ELEMENTS.contains(&tag.as_str()) {
            let closing = format!("</{tag}");
            let body_end = self
                .rest()
                .to_ascii_lowercase()
                .find(&closing)
                .ok_or(MarkupError::Unterminated {
                    construct: "raw text element",
                    offset: start,
                })?;
            let body = &self.source[self.pos..self.pos + body_end];
            self.document.elements[id].text.push_str(body);
            self.pos += body_end;
            let close_end = self.rest().find('>').ok_or(self.unterminated("closing tag"))?;
            self.pos += close_end + 1;
        } else if !self_closing && !VOID_ELEMENTS.contains(&tag.as_str()) {
            self.open.push(id);
        }
        Ok(())
    }

    fn close(&mut self, name: &str) {
        if let Some(depth) = self
            .open
            .iter()
            .rposition(|&id| self.document.elements[id].tag == name)
        {
            self.open.truncate(depth);
        }
    }
}

/// Offset of the `>` that ends the tag starting at `text[0] == '<'`, skipping quoted values
fn tag_end(text: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in text.char_indices().skip(1) {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => return Some(i),
            (None, '<') => return None,
            _ => {}
        }
    }
    None
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Split `a: b; c: d` into lowercase property names and trimmed values
#[must_use]
pub fn parse_style(declarations: &str) -> Vec<(String, String)> {
    declarations
        .split(';')
        .filter_map(|declaration| {
            let (property, value) = declaration.split_once(':')?;
            let property = property.trim().to_ascii_lowercase();
            let value = value.trim().trim_end_matches("!important").trim();
            (!property.is_empty() && !value.is_empty()).then(|| (property, value.to_string()))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod html_tests {
        use super::*;

        #[test]
        fn test_basic_tree() {
            let doc = Document::parse_html(
                "<!DOCTYPE html><html lang=\"en\"><head><title>Home</title></head>\
                 <body><h1>Hi</h1><p>One <b>two</b></p></body></html>",
            )
            .unwrap();
            let html = doc.html_element().unwrap();
            assert_eq!(html.attr("lang"), Some("en"));
            assert_eq!(doc.roots().len(), 1);
            let (title_id, _) = doc.by_tag("title").next().unwrap();
            assert_eq!(doc.text_content(title_id), "Home");
            let (p_id, _) = doc.by_tag("p").next().unwrap();
            assert_eq!(doc.text_content(p_id), "One two");
        }

        #[test]
        fn test_attribute_forms() {
            let doc = Document::parse_html(
                "<input type=checkbox checked id='agree' data-x=\"a > b\" ID=\"dup\">",
            )
            .unwrap();
            let (_, input) = doc.by_tag("input").next().unwrap();
            assert_eq!(input.attr("type"), Some("checkbox"));
            assert_eq!(input.attr("checked"), Some(""));
            assert_eq!(input.attr("id"), Some("agree"));
            assert_eq!(input.attr("data-x"), Some("a > b"));
        }

        #[test]
        fn test_void_and_self_closing() {
            let doc =
                Document::parse_html("<div><img src=a.png><br/><span>x</span></div>").unwrap();
            let (div_id, div) = doc.by_tag("div").next().unwrap();
            assert_eq!(div.children.len(), 3);
            let (span_id, span) = doc.by_tag("span").next().unwrap();
            assert_eq!(span.parent, Some(div_id));
            assert_eq!(doc.text_content(span_id), "x");
        }

        #[test]
        fn test_implicit_paragraph_close() {
            let doc = Document::parse_html("<body><p>one<p>two</body>").unwrap();
            let paragraphs: Vec<_> = doc.by_tag("p").collect();
            assert_eq!(paragraphs.len(), 2);
            assert_eq!(paragraphs[0].1.parent, paragraphs[1].1.parent);
        }

        #[test]
        fn test_script_content_is_raw() {
            let doc = Document::parse_html(
                "<body><script>if (a < b) { x = '<img>'; }</script><p>ok</p></body>",
            )
            .unwrap();
            assert_eq!(doc.by_tag("img").count(), 0);
            let (body_id, _) = doc.by_tag("body").next().unwrap();
            assert_eq!(doc.text_content(body_id), "ok");
        }

        #[test]
        fn test_entities_and_comments() {
            let doc = Document::parse_html("<p>Fish &amp; chips<!-- <img> --></p>").unwrap();
            assert_eq!(doc.by_tag("img").count(), 0);
            assert_eq!(doc.text_content(0), "Fish & chips");
        }

        #[test]
        fn test_inline_styles() {
            let html = "<p style=\"Color: #333; background-color: white !important\">t</p>";
            let doc = Document::parse_html(html).unwrap();
            let p = doc.get(0).unwrap();
            assert_eq!(p.style("color"), Some("#333"));
            assert_eq!(p.style("background-color"), Some("white"));
        }

        #[test]
        fn test_walks_at_nesting_limit() {
            // div, then spans, then the img at exactly the limit
            let depth = MAX_NESTING_DEPTH - 2;
            let html = format!(
                "<div>{}<img src=\"a.png\" alt=\"Logo\">deep{}</div>",
                "<span>".repeat(depth),
                "</span>".repeat(depth)
            );
            let doc = Document::parse_html(&html).unwrap();
            assert_eq!(doc.text_content(0), "deep");
            let last = doc.descendants(0).last().unwrap();
            assert_eq!(last.1.tag, "img");
            assert_eq!(doc.descendants(0).count(), depth + 1);
            assert_eq!(doc.ancestors(last.0).count(), depth + 1);
        }

        #[test]
        fn test_descendants_in_document_order() {
            let doc = Document::parse_html("<ul><li>a<b>x</b></li><li>b</li></ul>").unwrap();
            let tags: Vec<_> = doc.descendants(0).map(|(_, e)| e.tag.as_str()).collect();
            assert_eq!(tags, vec!["li", "b", "li"]);
            assert_eq!(doc.descendants(3).count(), 0);
        }

        #[test]
        fn test_inherited_style_and_hidden() {
            let doc = Document::parse_html(
                "<div style=\"color: red\" aria-hidden=\"true\"><span>x</span></div>",
            )
            .unwrap();
            assert_eq!(doc.inherited_style(1, "color"), Some("red"));
            assert!(doc.is_aria_hidden(1));
            assert_eq!(doc.inherited_style(1, "background-color"), None);
        }
    }

    mod failure_tests {
        use super::*;

        #[test]
        fn test_blank_input() {
            assert!(matches!(Document::parse_html("  \n"), Err(MarkupError::Empty)));
        }

        #[test]
        fn test_unterminated_tag() {
            let err = Document::parse_html("<html><body><img src=\"a.png\"").unwrap_err();
            assert!(matches!(err, MarkupError::Unterminated { construct: "tag", .. }));
        }

        #[test]
        fn test_unterminated_comment() {
            let err = Document::parse_html("<p>x</p><!-- never closed").unwrap_err();
            assert!(err.to_string().contains("comment"));
        }

        #[test]
        fn test_nesting_limit() {
            let deep = format!("<body>{}x</body>", "<span>".repeat(50_000));
            let err = Document::parse_html(&deep).unwrap_err();
            assert!(matches!(
                err,
                MarkupError::TooDeep {
                    limit: MAX_NESTING_DEPTH,
                    ..
                }
            ));

            // Void elements never stay open, so they do not count
            let wide = format!("<body>{}</body>", "<br>".repeat(5_000));
            assert!(Document::parse_html(&wide).is_ok());
        }

        #[test]
        fn test_text_only() {
            assert!(matches!(
                Document::parse_html("just words"),
                Err(MarkupError::NoElements)
            ));
        }

        #[test]
        fn test_bad_snapshot() {
            assert!(matches!(
                Document::from_snapshot("{\"tag\": "),
                Err(MarkupError::Snapshot(_))
            ));
        }
    }

    mod snapshot_tests {
        use super::*;

        const SNAPSHOT: &str = r##"{
            "tag": "html",
            "attributes": {"lang": "en"},
            "children": [{
                "tag": "body",
                "children": [
                    {"tag": "div", "attributes": {"id": "hero"}, "bounds": [0, 0, 800, 200]},
                    {"tag": "p", "text": "Hello", "bounds": [10, 220, 300, 20],
                     "styles": {"color": "#777", "background-color": "#fff"}},
                    {"tag": "p", "text": "World", "bounds": [10, 250, 300, 20]}
                ]
            }]
        }"##;

        #[test]
        fn test_snapshot_tree() {
            let doc = Document::from_snapshot(SNAPSHOT).unwrap();
            assert_eq!(doc.len(), 5);
            assert_eq!(doc.html_element().unwrap().attr("lang"), Some("en"));
            let (p_id, p) = doc.by_tag("p").next().unwrap();
            assert_eq!(p.style("color"), Some("#777"));
            assert_eq!(doc.text_content(p_id), "Hello");
        }

        #[test]
        fn test_element_boxes_and_keys() {
            let doc = Document::from_snapshot(SNAPSHOT).unwrap();
            let boxes = doc.element_boxes();
            assert_eq!(boxes.len(), 3);
            assert_eq!(boxes[0].key, "#hero");
            assert_eq!(boxes[1].key, "html[0]>body[0]>p[0]");
            assert_eq!(boxes[2].key, "html[0]>body[0]>p[1]");
            assert_eq!(boxes[2].bounds, BoundingBox::new(10, 250, 300, 20));
        }

        #[test]
        fn test_parse_dispatch() {
            let doc = Document::parse(&PageMarkup::detect(SNAPSHOT)).unwrap();
            assert_eq!(doc.by_tag("p").count(), 2);
        }
    }

    #[test]
    fn test_parse_style_skips_garbage() {
        let parsed = parse_style("color:red;;nonsense; :x; font-size : 18px");
        assert_eq!(
            parsed,
            vec![
                ("color".to_string(), "red".to_string()),
                ("font-size".to_string(), "18px".to_string())
            ]
        );
    }
}
