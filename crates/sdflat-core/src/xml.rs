//! Minimal element tree built from `quick-xml` events.
//!
//! SDF loading walks elements in document order and needs to know which
//! tag sits where, so the source is read into a small owned tree first
//! instead of being deserialized into fixed structs.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// An XML element with its attributes, child elements, and text content
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    /// Raw text content, including surrounding whitespace
    pub text: String,
}

impl Element {
    /// Parse a document and return its root element
    pub fn parse(xml: &str) -> Result<Element, String> {
        // Text is kept untrimmed: a comment can split a value into several
        // text events and the whitespace between them is significant
        let mut reader = Reader::from_str(xml);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => stack.push(start_element(e)?),
                Ok(Event::Empty(ref e)) => {
                    let element = start_element(e)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Ok(Event::End(_)) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| "unbalanced closing tag".to_string())?;
                    attach(&mut stack, &mut root, element)?;
                }
                Ok(Event::Text(ref t)) => {
                    if let Some(top) = stack.last_mut() {
                        let text = t.unescape().map_err(|e| e.to_string())?;
                        top.text.push_str(&text);
                    }
                }
                Ok(Event::CData(c)) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(format!(
                        "error at position {}: {e}",
                        reader.buffer_position()
                    ))
                }
            }
        }

        if let Some(open) = stack.last() {
            return Err(format!("unexpected end of document inside <{}>", open.name));
        }
        root.ok_or_else(|| "document has no root element".to_string())
    }

    /// Get an attribute value by name
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First child element with the given tag
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All child elements with the given tag, in document order
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Trimmed text of the first child element with the given tag
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.trim())
    }
}

fn start_element(e: &BytesStart) -> Result<Element, String> {
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|e| e.to_string())?.into_owned();
        attributes.push((key, value));
    }
    Ok(Element {
        name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
        attributes,
        children: Vec::new(),
        text: String::new(),
    })
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), String> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        Ok(())
    } else if root.is_none() {
        *root = Some(element);
        Ok(())
    } else {
        Err(format!("multiple root elements (second is <{}>)", element.name))
    }
}
