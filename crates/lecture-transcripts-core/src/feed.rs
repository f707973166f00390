//! Generic XML document tree for provider feeds.
//!
//! The timed-text response is small (a few thousand elements at most), so it
//! is parsed eagerly into an owned tree with `quick-xml`. The extractor then
//! walks the tree as many times as it likes.
//!
//! Attribute values and text are XML-unescaped once while parsing, the same
//! way a DOM parser would present them. CDATA sections become plain text
//! nodes. Comments, processing instructions, and the XML declaration are
//! dropped.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Result, TranscriptError};

/// A parsed feed: one root element and everything beneath it.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedDocument {
    pub root: XmlElement,
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    pub name: String,
    /// Attributes in source order, values unescaped.
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

impl FeedDocument {
    /// Parse a complete XML document.
    ///
    /// # Errors
    ///
    /// [`TranscriptError::Parse`] for syntax errors, mismatched or unclosed
    /// tags, undefined entities, text outside the root, more than one root,
    /// or a body with no root element at all.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut open: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => open.push(element_from_start(&e)?),
                Ok(Event::Empty(e)) => {
                    let element = element_from_start(&e)?;
                    attach(&mut open, &mut root, element)?;
                }
                Ok(Event::End(_)) => {
                    let element = open
                        .pop()
                        .ok_or_else(|| parse_error("closing tag without an open element"))?;
                    attach(&mut open, &mut root, element)?;
                }
                Ok(Event::Text(t)) => {
                    let text = t.unescape().map_err(|e| parse_error(e.to_string()))?;
                    push_text(&mut open, text.into_owned())?;
                }
                Ok(Event::CData(c)) => {
                    let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                    push_text(&mut open, text)?;
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(parse_error(format!(
                        "at byte {}: {}",
                        reader.buffer_position(),
                        e
                    )))
                }
            }
        }

        if let Some(unclosed) = open.last() {
            return Err(parse_error(format!(
                "document ends inside <{}>",
                unclosed.name
            )));
        }

        root.map(|root| FeedDocument { root })
            .ok_or_else(|| parse_error("document has no root element"))
    }

    /// All elements named `name`, in document order.
    pub fn elements_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.root.descendants().filter(move |e| e.name == name)
    }
}

impl XmlElement {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Concatenated text of this element and all of its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// Pre-order walk starting with this element itself.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }
}

/// Pre-order iterator over an element subtree.
pub struct Descendants<'a> {
    stack: Vec<&'a XmlElement>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a XmlElement;

    fn next(&mut self) -> Option<Self::Item> {
        let element = self.stack.pop()?;
        for child in element.children.iter().rev() {
            if let XmlNode::Element(child) = child {
                self.stack.push(child);
            }
        }
        Some(element)
    }
}

fn collect_text(element: &XmlElement, out: &mut String) {
    for child in &element.children {
        match child {
            XmlNode::Text(text) => out.push_str(text),
            XmlNode::Element(child) => collect_text(child, out),
        }
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<XmlElement> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| parse_error(format!("element name is not utf-8: {}", e)))?
        .to_string();

    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| parse_error(format!("in <{}>: {}", name, e)))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| parse_error(format!("attribute name is not utf-8: {}", e)))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| parse_error(format!("in <{}> attribute `{}`: {}", name, key, e)))?
            .into_owned();
        attributes.push((key, value));
    }

    Ok(XmlElement {
        name,
        attributes,
        children: Vec::new(),
    })
}

fn attach(
    open: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<()> {
    match open.last_mut() {
        Some(parent) => {
            parent.children.push(XmlNode::Element(element));
            Ok(())
        }
        None if root.is_some() => Err(parse_error(format!(
            "second root element <{}>",
            element.name
        ))),
        None => {
            *root = Some(element);
            Ok(())
        }
    }
}

fn push_text(open: &mut [XmlElement], text: String) -> Result<()> {
    match open.last_mut() {
        Some(parent) => {
            parent.children.push(XmlNode::Text(text));
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(parse_error("text outside the root element")),
    }
}

fn parse_error(message: impl Into<String>) -> TranscriptError {
    TranscriptError::Parse(message.into())
}
