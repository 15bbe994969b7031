//! Render-tree capture: a presentation-independent copy of the visible
//! transcript that can be sanitized and serialized to markup.

use serde::{Deserialize, Serialize};

/// Elements whose markup has no closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose text content is emitted verbatim.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub children: Vec<RenderNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RenderNode {
    Element(Element),
    Text { text: String },
}

impl RenderNode {
    pub fn element(tag: &str) -> Element {
        Element {
            tag: tag.to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        RenderNode::Text { text: text.into() }
    }
}

impl Element {
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.push(Attribute {
            name: name.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn class(self, classes: &str) -> Self {
        self.attr("class", classes)
    }

    pub fn child(mut self, node: impl Into<RenderNode>) -> Self {
        self.children.push(node.into());
        self
    }

    pub fn has_any_class(&self, classes: &[String]) -> bool {
        self.attributes
            .iter()
            .filter(|attr| attr.name.eq_ignore_ascii_case("class"))
            .flat_map(|attr| attr.value.split_whitespace())
            .any(|class| classes.iter().any(|wanted| wanted == class))
    }
}

impl From<Element> for RenderNode {
    fn from(element: Element) -> Self {
        RenderNode::Element(element)
    }
}

/// Copy `root` without descendants carrying any of `strip_classes`.
/// The root itself is always kept; the live tree is never touched.
pub fn sanitize(root: &RenderNode, strip_classes: &[String]) -> RenderNode {
    match root {
        RenderNode::Text { .. } => root.clone(),
        RenderNode::Element(element) => RenderNode::Element(Element {
            tag: element.tag.clone(),
            attributes: element.attributes.clone(),
            children: element
                .children
                .iter()
                .filter(|child| match child {
                    RenderNode::Element(el) => !el.has_any_class(strip_classes),
                    RenderNode::Text { .. } => true,
                })
                .map(|child| sanitize(child, strip_classes))
                .collect(),
        }),
    }
}

pub fn serialize(root: &RenderNode) -> String {
    let mut out = String::new();
    write_node(&mut out, root, false);
    out
}

fn write_node(out: &mut String, node: &RenderNode, raw_text: bool) {
    match node {
        RenderNode::Text { text } if raw_text => out.push_str(text),
        RenderNode::Text { text } => push_escaped(out, text, false),
        RenderNode::Element(element) => {
            let tag = element.tag.to_ascii_lowercase();
            out.push('<');
            out.push_str(&tag);
            for attr in &element.attributes {
                out.push(' ');
                out.push_str(&attr.name);
                out.push_str("=\"");
                push_escaped(out, &attr.value, true);
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&tag.as_str()) {
                return;
            }
            let raw_children = RAW_TEXT_ELEMENTS.contains(&tag.as_str());
            for child in &element.children {
                write_node(out, child, raw_children);
            }
            out.push_str("</");
            out.push_str(&tag);
            out.push('>');
        }
    }
}

fn push_escaped(out: &mut String, text: &str, attribute: bool) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

/// One entry of the page's presentation layer, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StyleElement {
    /// `<link rel="stylesheet">`; elements without an address are skipped.
    Link { href: Option<String> },
    /// `<style>` block.
    Inline { css: String },
}

/// Linked stylesheet URLs first, then inline blocks, each group in
/// document order. Replaying in this order reproduces the live cascade.
pub fn collect_stylesheets(elements: &[StyleElement]) -> Vec<String> {
    let links = elements.iter().filter_map(|element| match element {
        StyleElement::Link { href: Some(href) } if !href.is_empty() => Some(href.clone()),
        _ => None,
    });
    let inline = elements.iter().filter_map(|element| match element {
        StyleElement::Inline { css } => Some(format!("<style>{css}</style>")),
        _ => None,
    });
    links.chain(inline).collect()
}
