//! WCAG rule set.
//!
//! Every rule is a plain function over a parsed [`Document`] that returns one
//! [`Finding`] per violation. The table in [`RULES`] tags each rule with its
//! success criterion, category and severity.

use super::color::Color;
use super::{IssueSeverity, WcagCategory};
use crate::config::AccessibilityConfig;
use crate::markup::{Document, Element, NodeId};
use std::collections::BTreeMap;

/// Version of [`RULES`]; bump when rules are added, removed or retuned
pub const RULE_SET_VERSION: &str = "2024.1";

/// Inputs available to a rule
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    /// Parsed page
    pub document: &'a Document,
    /// Thresholds
    pub config: &'a AccessibilityConfig,
}

/// One violation reported by a rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    /// What is wrong
    pub description: String,
    /// Offending element, when there is one
    pub element_ref: Option<String>,
}

impl Finding {
    fn page(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            element_ref: None,
        }
    }

    fn at(document: &Document, id: NodeId, description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            element_ref: Some(document.element_key(id)),
        }
    }
}

/// A single accessibility check
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    /// Stable identifier
    pub id: &'static str,
    /// WCAG success criterion
    pub criterion: &'static str,
    /// Principle the rule belongs to
    pub category: WcagCategory,
    /// Severity of each violation
    pub severity: IssueSeverity,
    /// Check implementation
    pub check: fn(&RuleContext<'_>) -> Vec<Finding>,
}

macro_rules! rule {
    ($id:literal, $criterion:literal, $category:ident, $severity:ident, $check:path) => {
        Rule {
            id: $id,
            criterion: $criterion,
            category: WcagCategory::$category,
            severity: IssueSeverity::$severity,
            check: $check,
        }
    };
}

/// The built-in rule set
pub const RULES: &[Rule] = &[
    rule!("image-alt", "1.1.1", Perceivable, Critical, image_alt),
    rule!("input-image-alt", "1.1.1", Perceivable, Critical, input_image_alt),
    rule!("area-alt", "1.1.1", Perceivable, Serious, area_alt),
    rule!("video-caption", "1.2.2", Perceivable, Serious, video_caption),
    rule!("heading-order", "1.3.1", Perceivable, Moderate, heading_order),
    rule!("color-contrast", "1.4.3", Perceivable, Serious, color_contrast),
    rule!("document-title", "2.4.2", Operable, Serious, document_title),
    rule!("link-name", "2.4.4", Operable, Serious, link_name),
    rule!("link-purpose", "2.4.4", Operable, Minor, link_purpose),
    rule!("tabindex-positive", "2.4.3", Operable, Moderate, tabindex_positive),
    rule!("click-focusable", "2.1.1", Operable, Serious, click_focusable),
    rule!("bypass-blocks", "2.4.1", Operable, Moderate, bypass_blocks),
    rule!("meta-refresh", "2.2.1", Operable, Serious, meta_refresh),
    rule!("html-lang", "3.1.1", Understandable, Serious, html_lang),
    rule!("html-lang-valid", "3.1.1", Understandable, Moderate, html_lang_valid),
    rule!("form-label", "3.3.2", Understandable, Critical, form_label),
    rule!("select-name", "3.3.2", Understandable, Serious, select_name),
    rule!("duplicate-id", "4.1.1", Robust, Minor, duplicate_id),
    rule!("aria-role", "4.1.2", Robust, Serious, aria_role),
    rule!("aria-attr", "4.1.2", Robust, Moderate, aria_attr),
    rule!("button-name", "4.1.2", Robust, Critical, button_name),
    rule!("aria-hidden-focus", "4.1.2", Robust, Serious, aria_hidden_focus),
    rule!("frame-title", "4.1.2", Robust, Serious, frame_title),
];

const VALID_ROLES: &[&str] = &[
    "alert", "alertdialog", "application", "article", "banner", "blockquote", "button", "caption",
    "cell", "checkbox", "code", "columnheader", "combobox", "complementary", "contentinfo",
    "definition", "deletion", "dialog", "directory", "document", "emphasis", "feed", "figure",
    "form", "generic", "grid", "gridcell", "group", "heading", "img", "insertion", "link", "list",
    "listbox", "listitem", "log", "main", "marquee", "math", "menu", "menubar", "menuitem",
    "menuitemcheckbox", "menuitemradio", "meter", "navigation", "none", "note", "option",
    "paragraph", "presentation", "progressbar", "radio", "radiogroup", "region", "row",
    "rowgroup", "rowheader", "scrollbar", "search", "searchbox", "separator", "slider",
    "spinbutton", "status", "strong", "subscript", "superscript", "switch", "tab", "table",
    "tablist", "tabpanel", "term", "textbox", "time", "timer", "toolbar", "tooltip", "tree",
    "treegrid", "treeitem",
];

const VALID_ARIA_ATTRIBUTES: &[&str] = &[
    "aria-activedescendant", "aria-atomic", "aria-autocomplete", "aria-busy", "aria-checked",
    "aria-colcount", "aria-colindex", "aria-colspan", "aria-controls", "aria-current",
    "aria-describedby", "aria-description", "aria-details", "aria-disabled", "aria-dropeffect",
    "aria-errormessage", "aria-expanded", "aria-flowto", "aria-grabbed", "aria-haspopup",
    "aria-hidden", "aria-invalid", "aria-keyshortcuts", "aria-label", "aria-labelledby",
    "aria-level", "aria-live", "aria-modal", "aria-multiline", "aria-multiselectable",
    "aria-orientation", "aria-owns", "aria-placeholder", "aria-posinset", "aria-pressed",
    "aria-readonly", "aria-relevant", "aria-required", "aria-roledescription", "aria-rowcount",
    "aria-rowindex", "aria-rowspan", "aria-selected", "aria-setsize", "aria-sort",
    "aria-valuemax", "aria-valuemin", "aria-valuenow", "aria-valuetext",
];

const GENERIC_LINK_TEXT: &[&str] = &[
    "click here", "here", "more", "read more", "learn more", "link", "this", "go",
];

const NATIVELY_FOCUSABLE: &[&str] = &["button", "input", "select", "textarea", "summary"];

const LABEL_EXEMPT_INPUT_TYPES: &[&str] = &["hidden", "submit", "reset", "button", "image"];

fn has_aria_name(element: &Element) -> bool {
    element.non_empty_attr("aria-label").is_some()
        || element.non_empty_attr("aria-labelledby").is_some()
}

fn is_presentational(element: &Element) -> bool {
    matches!(element.attr("role").map(str::trim), Some("presentation" | "none"))
}

fn input_type(element: &Element) -> String {
    element
        .attr("type")
        .map_or_else(|| "text".to_string(), |t| t.trim().to_ascii_lowercase())
}

fn is_focusable(element: &Element) -> bool {
    if element.has_attr("disabled") {
        return false;
    }
    if let Some(index) = element.attr("tabindex").and_then(|t| t.trim().parse::<i32>().ok()) {
        return index >= 0;
    }
    (element.tag == "a" && element.has_attr("href"))
        || (element.tag == "input" && input_type(element) != "hidden")
        || element.is_any(&["button", "select", "textarea", "summary", "iframe"])
}

/// Whether any descendant image supplies a text alternative
fn has_labelled_image(document: &Document, id: NodeId) -> bool {
    document
        .descendants(id)
        .any(|(_, e)| e.tag == "img" && e.non_empty_attr("alt").is_some())
}

fn has_accessible_name(document: &Document, id: NodeId, element: &Element) -> bool {
    has_aria_name(element)
        || element.non_empty_attr("title").is_some()
        || !document.text_content(id).is_empty()
        || has_labelled_image(document, id)
}

fn image_alt(ctx: &RuleContext<'_>) -> Vec<Finding> {
    let doc = ctx.document;
    doc.by_tag("img")
        .filter(|&(id, img)| {
            !img.has_attr("alt")
                && !has_aria_name(img)
                && img.non_empty_attr("title").is_none()
                && !is_presentational(img)
                && !doc.is_aria_hidden(id)
        })
        .map(|(id, img)| {
            let src = img.attr("src").unwrap_or("(no src)");
            Finding::at(doc, id, format!("Image {src} has no alt text"))
        })
        .collect()
}

fn input_image_alt(ctx: &RuleContext<'_>) -> Vec<Finding> {
    let doc = ctx.document;
    doc.by_tag("input")
        .filter(|(_, input)| input_type(input) == "image")
        .filter(|(_, input)| input.non_empty_attr("alt").is_none() && !has_aria_name(input))
        .map(|(id, _)| Finding::at(doc, id, "Image button has no alt text"))
        .collect()
}

fn area_alt(ctx: &RuleContext<'_>) -> Vec<Finding> {
    let doc = ctx.document;
    doc.by_tag("area")
        .filter(|(_, area)| area.has_attr("href"))
        .filter(|(_, area)| area.non_empty_attr("alt").is_none() && !has_aria_name(area))
        .map(|(id, _)| Finding::at(doc, id, "Image map area has no alt text"))
        .collect()
}

fn video_caption(ctx: &RuleContext<'_>) -> Vec<Finding> {
    let doc = ctx.document;
    doc.by_tag("video")
        .filter(|(_, video)| {
            !video.children.iter().any(|&child| {
                doc.get(child).is_some_and(|track| {
                    track.tag == "track"
                        && matches!(
                            track.attr("kind").map(str::trim),
                            Some("captions" | "subtitles")
                        )
                })
            })
        })
        .map(|(id, _)| Finding::at(doc, id, "Video has no captions track"))
        .collect()
}

fn heading_level(element: &Element) -> Option<u8> {
    let mut chars = element.tag.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some('h'), Some(level @ '1'..='6'), None) => {
            level.to_digit(10).and_then(|d| u8::try_from(d).ok())
        }
        _ => None,
    }
}

fn heading_order(ctx: &RuleContext<'_>) -> Vec<Finding> {
    let doc = ctx.document;
    let mut findings = Vec::new();
    let mut previous: Option<u8> = None;
    for (id, element) in doc.iter() {
        let Some(level) = heading_level(element) else {
            continue;
        };
        if let Some(prev) = previous {
            if level > prev + 1 {
                findings.push(Finding::at(
                    doc,
                    id,
                    format!("Heading level skips from h{prev} to h{level}"),
                ));
            }
        }
        previous = Some(level);
    }
    findings
}

/// Font size in CSS pixels
fn font_size_px(value: &str) -> Option<f32> {
    let value = value.trim();
    if let Some(px) = value.strip_suffix("px") {
        px.trim().parse().ok()
    } else if let Some(pt) = value.strip_suffix("pt") {
        pt.trim().parse::<f32>().ok().map(|pt| pt * 4.0 / 3.0)
    } else {
        None
    }
}

fn is_large_text(doc: &Document, id: NodeId, element: &Element) -> bool {
    let size = doc
        .inherited_style(id, "font-size")
        .and_then(font_size_px)
        .or_else(|| match heading_level(element) {
            Some(1) => Some(32.0),
            Some(2) => Some(24.0),
            Some(3) => Some(18.72),
            _ => None,
        });
    let bold = doc
        .inherited_style(id, "font-weight")
        .map(str::trim)
        .is_some_and(|w| w == "bold" || w == "bolder" || w.parse::<u32>().is_ok_and(|n| n >= 700))
        || element.is_any(&["b", "strong", "h1", "h2", "h3", "h4", "h5", "h6"]);
    size.is_some_and(|px| px >= 24.0 || (bold && px >= 18.66))
}

fn own_background(element: &Element) -> Option<&str> {
    element
        .style("background-color")
        .or_else(|| element.style("background"))
}

fn background_of(doc: &Document, id: NodeId) -> Option<&str> {
    doc.get(id)
        .and_then(own_background)
        .or_else(|| doc.ancestors(id).find_map(|(_, e)| own_background(e)))
}

fn color_contrast(ctx: &RuleContext<'_>) -> Vec<Finding> {
    let doc = ctx.document;
    let mut findings = Vec::new();
    for (id, element) in doc.iter() {
        if element.text.trim().is_empty()
            || element.is_any(&["script", "style", "title", "head", "html", "option"])
            || doc.is_aria_hidden(id)
        {
            continue;
        }
        let foreground = doc.inherited_style(id, "color");
        let background = background_of(doc, id);
        if foreground.is_none() && background.is_none() {
            continue;
        }
        // Unparseable values (gradients, variables) are skipped rather than guessed
        let fg = match foreground {
            Some(value) => match Color::parse(value) {
                Some(color) => color,
                None => continue,
            },
            None => Color::BLACK,
        };
        let bg = match background {
            Some(value) => match Color::parse(value) {
                Some(color) => color,
                None => continue,
            },
            None => Color::WHITE,
        };

        let ratio = fg.contrast_ratio(&bg);
        let required = if is_large_text(doc, id, element) {
            ctx.config.min_contrast_large
        } else {
            ctx.config.min_contrast_normal
        };
        if ratio < required {
            findings.push(Finding::at(
                doc,
                id,
                format!("Text contrast {ratio:.2}:1 is below the required {required:.1}:1"),
            ));
        }
    }
    findings
}

fn is_full_document(doc: &Document) -> bool {
    doc.html_element().is_some() || doc.by_tag("head").next().is_some()
}

fn document_title(ctx: &RuleContext<'_>) -> Vec<Finding> {
    let doc = ctx.document;
    if !is_full_document(doc) {
        return Vec::new();
    }
    let titled = doc
        .by_tag("title")
        .any(|(id, _)| !doc.text_content(id).is_empty());
    if titled {
        Vec::new()
    } else {
        vec![Finding::page("Document has no title")]
    }
}

fn link_name(ctx: &RuleContext<'_>) -> Vec<Finding> {
    let doc = ctx.document;
    doc.by_tag("a")
        .filter(|&(id, link)| {
            link.has_attr("href") && !doc.is_aria_hidden(id) && !has_accessible_name(doc, id, link)
        })
        .map(|(id, _)| Finding::at(doc, id, "Link has no discernible text"))
        .collect()
}

fn link_purpose(ctx: &RuleContext<'_>) -> Vec<Finding> {
    let doc = ctx.document;
    doc.by_tag("a")
        .filter(|(_, link)| link.has_attr("href") && !has_aria_name(link))
        .filter_map(|(id, _)| {
            let text = doc.text_content(id).to_lowercase();
            let text = text.trim_end_matches(['.', '!', '>', '»']).trim();
            GENERIC_LINK_TEXT.contains(&text).then(|| {
                let description = format!("Link text \"{text}\" does not describe its purpose");
                Finding::at(doc, id, description)
            })
        })
        .collect()
}

fn tabindex_positive(ctx: &RuleContext<'_>) -> Vec<Finding> {
    let doc = ctx.document;
    doc.iter()
        .filter_map(|(id, element)| {
            let index = element.attr("tabindex")?.trim().parse::<i32>().ok()?;
            (index > 0).then(|| {
                let description = format!("tabindex=\"{index}\" overrides the natural focus order");
                Finding::at(doc, id, description)
            })
        })
        .collect()
}

fn click_focusable(ctx: &RuleContext<'_>) -> Vec<Finding> {
    let doc = ctx.document;
    doc.iter()
        .filter(|(_, element)| element.has_attr("onclick"))
        .filter(|(_, element)| {
            !element.has_attr("tabindex")
                && !element.is_any(NATIVELY_FOCUSABLE)
                && !(element.tag == "a" && element.has_attr("href"))
        })
        .map(|(id, element)| {
            Finding::at(
                doc,
                id,
                format!("Clickable <{}> cannot be reached with the keyboard", element.tag),
            )
        })
        .collect()
}

fn bypass_blocks(ctx: &RuleContext<'_>) -> Vec<Finding> {
    let doc = ctx.document;
    if doc.by_tag("body").next().is_none() {
        return Vec::new();
    }
    let has_main = doc.iter().any(|(_, e)| {
        e.tag == "main" || e.attr("role").map(str::trim) == Some("main")
    });
    let has_skip_link = doc
        .by_tag("a")
        .any(|(_, a)| a.attr("href").is_some_and(|href| href.len() > 1 && href.starts_with('#')));
    if has_main || has_skip_link {
        Vec::new()
    } else {
        vec![Finding::page(
            "Page has no main landmark or skip link to bypass repeated content",
        )]
    }
}

fn meta_refresh(ctx: &RuleContext<'_>) -> Vec<Finding> {
    let doc = ctx.document;
    doc.by_tag("meta")
        .filter(|(_, meta)| {
            meta.attr("http-equiv")
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("refresh"))
        })
        .filter_map(|(id, meta)| {
            let content = meta.attr("content")?;
            let delay: f64 = content.split([';', ',']).next()?.trim().parse().ok()?;
            (delay > 0.0).then(|| {
                Finding::at(doc, id, format!("Page refreshes automatically after {delay}s"))
            })
        })
        .collect()
}

fn html_lang(ctx: &RuleContext<'_>) -> Vec<Finding> {
    match ctx.document.html_element() {
        Some(html) if html.non_empty_attr("lang").is_none() => {
            vec![Finding::page("<html> element has no lang attribute")]
        }
        _ => Vec::new(),
    }
}

/// BCP 47 shape check: a 2-3 letter primary subtag followed by 1-8 character subtags
fn is_valid_language_tag(tag: &str) -> bool {
    let mut subtags = tag.split('-');
    let primary_ok = subtags.next().is_some_and(|p| {
        (2..=3).contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphabetic())
    });
    primary_ok
        && subtags.all(|s| {
            (1..=8).contains(&s.len()) && s.chars().all(|c| c.is_ascii_alphanumeric())
        })
}

fn html_lang_valid(ctx: &RuleContext<'_>) -> Vec<Finding> {
    match ctx.document.html_element().and_then(|h| h.non_empty_attr("lang")) {
        Some(lang) if !is_valid_language_tag(lang) => {
            vec![Finding::page(format!("lang=\"{lang}\" is not a valid language tag"))]
        }
        _ => Vec::new(),
    }
}

fn is_labelled(doc: &Document, id: NodeId, control: &Element) -> bool {
    if has_aria_name(control) || control.non_empty_attr("title").is_some() {
        return true;
    }
    let explicit = control.non_empty_attr("id").is_some_and(|control_id| {
        doc.by_tag("label")
            .any(|(_, label)| label.attr("for").map(str::trim) == Some(control_id))
    });
    explicit || doc.ancestors(id).any(|(_, e)| e.tag == "label")
}

fn form_label(ctx: &RuleContext<'_>) -> Vec<Finding> {
    let doc = ctx.document;
    doc.iter()
        .filter(|(_, e)| {
            e.tag == "textarea"
                || (e.tag == "input" && !LABEL_EXEMPT_INPUT_TYPES.contains(&input_type(e).as_str()))
        })
        .filter(|&(id, e)| !is_labelled(doc, id, e))
        .map(|(id, e)| Finding::at(doc, id, format!("Form field <{}> has no label", e.tag)))
        .collect()
}

fn select_name(ctx: &RuleContext<'_>) -> Vec<Finding> {
    let doc = ctx.document;
    doc.by_tag("select")
        .filter(|&(id, e)| !is_labelled(doc, id, e))
        .map(|(id, _)| Finding::at(doc, id, "Select box has no accessible name"))
        .collect()
}

fn duplicate_id(ctx: &RuleContext<'_>) -> Vec<Finding> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for (_, element) in ctx.document.iter() {
        if let Some(id) = element.non_empty_attr("id") {
            *counts.entry(id).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .filter(|&(_, count)| count > 1)
        .map(|(id, count)| Finding {
            description: format!("id \"{id}\" is used {count} times"),
            element_ref: Some(format!("#{id}")),
        })
        .collect()
}

fn aria_role(ctx: &RuleContext<'_>) -> Vec<Finding> {
    let doc = ctx.document;
    doc.iter()
        .filter_map(|(id, element)| {
            let roles = element.attr("role")?;
            // Fallback role lists are allowed; the first recognised role wins
            let valid = roles
                .split_whitespace()
                .any(|role| VALID_ROLES.contains(&role.to_ascii_lowercase().as_str()));
            (!valid).then(|| {
                let description = format!("role=\"{}\" is not a valid ARIA role", roles.trim());
                Finding::at(doc, id, description)
            })
        })
        .collect()
}

fn aria_attr(ctx: &RuleContext<'_>) -> Vec<Finding> {
    let doc = ctx.document;
    doc.iter()
        .flat_map(|(id, element)| {
            element
                .attributes
                .keys()
                .filter(|name| {
                    name.starts_with("aria-") && !VALID_ARIA_ATTRIBUTES.contains(&name.as_str())
                })
                .map(move |name| {
                    Finding::at(doc, id, format!("{name} is not a valid ARIA attribute"))
                })
        })
        .collect()
}

fn button_name(ctx: &RuleContext<'_>) -> Vec<Finding> {
    let doc = ctx.document;
    doc.iter()
        .filter(|&(id, e)| {
            if doc.is_aria_hidden(id) {
                return false;
            }
            if e.tag == "input" {
                // submit and reset have a browser-supplied default label
                return input_type(e) == "button"
                    && e.non_empty_attr("value").is_none()
                    && !has_aria_name(e)
                    && e.non_empty_attr("title").is_none();
            }
            let is_button =
                e.tag == "button" || e.attr("role").map(str::trim) == Some("button");
            is_button && !has_accessible_name(doc, id, e)
        })
        .map(|(id, _)| Finding::at(doc, id, "Button has no accessible name"))
        .collect()
}

fn aria_hidden_focus(ctx: &RuleContext<'_>) -> Vec<Finding> {
    let doc = ctx.document;
    doc.iter()
        .filter(|&(id, element)| is_focusable(element) && doc.is_aria_hidden(id))
        .map(|(id, _)| {
            Finding::at(doc, id, "Focusable element is hidden from assistive technology")
        })
        .collect()
}

fn frame_title(ctx: &RuleContext<'_>) -> Vec<Finding> {
    let doc = ctx.document;
    doc.iter()
        .filter(|(_, e)| e.is_any(&["iframe", "frame"]))
        .filter(|(_, e)| e.non_empty_attr("title").is_none() && !has_aria_name(e))
        .map(|(id, e)| Finding::at(doc, id, format!("<{}> has no title", e.tag)))
        .collect()
}
