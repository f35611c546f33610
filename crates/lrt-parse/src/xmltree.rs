//! A minimal in-memory XML element tree, used by [`crate::lat`] so the
//! hierarchical walk can look at a node's children and text without
//! re-driving a `quick_xml` event stream for every recursive step.

use crate::error::ParseResult;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct XmlNode {
    pub name: String,
    pub attrs: HashMap<String, String>,
    pub children: Vec<XmlNode>,
    /// Text content found as a direct child of this element (not of any
    /// descendant element).
    pub own_text: String,
}

impl XmlNode {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }
}

fn local_name(name: &[u8]) -> String {
    let s = String::from_utf8_lossy(name);
    match s.find(':') {
        Some(idx) => s[idx + 1..].to_string(),
        None => s.into_owned(),
    }
}

/// Parses `xml` into a single root node (synthesizing a `__root__` wrapper
/// if the document has multiple top-level elements after the prolog).
pub fn parse_tree(xml: &[u8]) -> ParseResult<XmlNode> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlNode> = vec![XmlNode {
        name: "__root__".to_string(),
        ..Default::default()
    }];
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(e) => {
                let mut node = XmlNode {
                    name: local_name(&e.name().into_inner()),
                    ..Default::default()
                };
                for attr in e.attributes() {
                    let attr = attr?;
                    node.attrs.insert(
                        local_name(attr.key.as_ref()),
                        attr.unescape_value()?.into_owned(),
                    );
                }
                stack.push(node);
            }
            Event::Empty(e) => {
                let mut node = XmlNode {
                    name: local_name(&e.name().into_inner()),
                    ..Default::default()
                };
                for attr in e.attributes() {
                    let attr = attr?;
                    node.attrs.insert(
                        local_name(attr.key.as_ref()),
                        attr.unescape_value()?.into_owned(),
                    );
                }
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(node);
                }
            }
            Event::Text(e) => {
                let text = e.unescape()?.into_owned();
                if let Some(top) = stack.last_mut() {
                    if !top.own_text.is_empty() {
                        top.own_text.push(' ');
                    }
                    top.own_text.push_str(text.trim());
                }
            }
            Event::End(_) => {
                if stack.len() > 1 {
                    let finished = stack.pop().unwrap();
                    stack.last_mut().unwrap().children.push(finished);
                }
            }
            _ => {}
        }
        buf.clear();
    }

    let mut root = stack.pop().unwrap();
    if root.children.len() == 1 {
        return Ok(root.children.remove(0));
    }
    Ok(root)
}
