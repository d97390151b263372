//! Small owned XML tree over `quick-xml` events.
//!
//! WordprocessingML parts are edited structurally (remove runs, insert a
//! run), which the streaming API does not do on its own. Elements keep their
//! qualified names and attribute order so untouched markup serialises back
//! equivalently.

use std::io::Write;

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::DocumentError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct XmlElement {
    /// Qualified name as written, e.g. `w:p`.
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

fn local(qualified: &str) -> &str {
    qualified.rsplit(':').next().unwrap_or(qualified)
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    pub fn local_name(&self) -> &str {
        local(&self.name)
    }

    /// Namespace prefix of this element, if it has one.
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(p, _)| p)
    }

    /// Qualified name for a sibling element sharing this element's prefix.
    pub fn qualify(&self, local_name: &str) -> String {
        match self.prefix() {
            Some(p) => format!("{p}:{local_name}"),
            None => local_name.to_string(),
        }
    }

    pub fn is(&self, local_name: &str) -> bool {
        self.local_name() == local_name
    }

    /// Attribute value matched by local name, so `w:val` and `val` both hit.
    pub fn attr(&self, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| local(k) == local_name)
            .map(|(_, v)| v.as_str())
    }

    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|c| match c {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|c| match c {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn children_named<'a>(
        &'a self,
        local_name: &'a str,
    ) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.elements().filter(move |e| e.is(local_name))
    }

    pub fn child(&self, local_name: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.is(local_name))
    }

    /// The `n`th element child with this local name.
    pub fn nth_child_mut(&mut self, local_name: &str, n: usize) -> Option<&mut XmlElement> {
        self.elements_mut().filter(|e| e.is(local_name)).nth(n)
    }

    /// Concatenated text and CDATA of direct children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|c| match c {
                XmlNode::Text(t) | XmlNode::CData(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }
}

fn utf8(bytes: &[u8]) -> Result<String, DocumentError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| DocumentError::Xml(e.to_string()))
}

fn element_from(start: &BytesStart<'_>) -> Result<XmlElement, DocumentError> {
    let mut el = XmlElement::new(utf8(start.name().as_ref())?);
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = utf8(attr.key.as_ref())?;
        let value = attr.unescape_value()?.into_owned();
        el.attributes.push((key, value));
    }
    Ok(el)
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    node: XmlNode,
) -> Result<(), DocumentError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(node);
            Ok(())
        }
        None => match node {
            XmlNode::Element(el) if root.is_none() => {
                *root = Some(el);
                Ok(())
            }
            XmlNode::Element(_) => {
                Err(DocumentError::Malformed("more than one root element".into()))
            }
            // Prolog and epilog whitespace or comments are not kept.
            _ => Ok(()),
        },
    }
}

/// Parse a complete XML part into its root element.
pub fn parse_document(xml: &str) -> Result<XmlElement, DocumentError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => stack.push(element_from(&e)?),
            Event::Empty(e) => {
                let el = element_from(&e)?;
                attach(&mut stack, &mut root, XmlNode::Element(el))?;
            }
            Event::End(_) => {
                let el = stack
                    .pop()
                    .ok_or_else(|| DocumentError::Malformed("unbalanced end tag".into()))?;
                attach(&mut stack, &mut root, XmlNode::Element(el))?;
            }
            Event::Text(e) => {
                let text = e.unescape()?.into_owned();
                attach(&mut stack, &mut root, XmlNode::Text(text))?;
            }
            Event::CData(e) => {
                let text = utf8(&e.into_inner())?;
                attach(&mut stack, &mut root, XmlNode::CData(text))?;
            }
            Event::Comment(e) => {
                let text = utf8(&e)?;
                attach(&mut stack, &mut root, XmlNode::Comment(text))?;
            }
            Event::PI(e) => {
                let text = utf8(&e)?;
                attach(&mut stack, &mut root, XmlNode::ProcessingInstruction(text))?;
            }
            Event::Decl(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
    }

    if !stack.is_empty() {
        return Err(DocumentError::Malformed("unclosed element at end of part".into()));
    }
    root.ok_or_else(|| DocumentError::Malformed("part has no root element".into()))
}

fn write_element<W: Write>(writer: &mut Writer<W>, el: &XmlElement) -> Result<(), DocumentError> {
    let mut start = BytesStart::new(el.name.as_str());
    for (k, v) in &el.attributes {
        start.push_attribute((k.as_str(), v.as_str()));
    }
    if el.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for child in &el.children {
        match child {
            XmlNode::Element(e) => write_element(writer, e)?,
            XmlNode::Text(t) => writer.write_event(Event::Text(BytesText::new(t)))?,
            XmlNode::CData(t) => writer.write_event(Event::CData(BytesCData::new(t.as_str())))?,
            XmlNode::Comment(t) => {
                writer.write_event(Event::Comment(BytesText::from_escaped(t.as_str())))?
            }
            XmlNode::ProcessingInstruction(t) => {
                write!(writer.get_mut(), "<?{t}?>")
                    .map_err(|e| DocumentError::Xml(e.to_string()))?;
            }
        }
    }
    writer.write_event(Event::End(BytesEnd::new(el.name.as_str())))?;
    Ok(())
}

/// Serialise `root` as a standalone UTF-8 part.
pub fn write_document(root: &XmlElement) -> Result<Vec<u8>, DocumentError> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    writer.get_mut().push(b'\n');
    write_element(&mut writer, root)?;
    Ok(writer.into_inner())
}
