//! A small owned XML element tree, read and written with `quick-xml`.
//!
//! Both the backing document and the property-tree export/update payloads
//! are handled through [`XmlElement`]. Leaf text is kept verbatim. Mixed
//! content is not preserved: text directly inside an element with children is
//! concatenated and trimmed, and dropped when only whitespace remains.

use std::borrow::Cow;
use std::fs;
use std::io::Write;
use std::path::Path;

use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;


#[derive(Debug, Error)]
pub enum XmlError {
    #[error("malformed XML: {0}")]
    Malformed(#[from] quick_xml::Error),

    #[error("malformed XML attribute: {0}")]
    Attribute(#[from] AttrError),

    #[error("unexpected closing tag </{found}>")]
    UnexpectedEnd { found: String },

    #[error("element <{name}> is never closed")]
    Unclosed { name: String },

    #[error("the document has no root element")]
    NoRootElement,

    #[error("the document has more than one root element (second one is <{name}>)")]
    MultipleRoots { name: String },

    #[error("the written document is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}


#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    pub text: Option<String>,
}

impl XmlElement {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_attribute<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.set_attribute(key, value);
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_text<S: Into<String>>(mut self, text: S) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Sets an attribute, replacing an existing one with the same name in place.
    pub fn set_attribute<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        let key = key.into();
        let value = value.into();

        match self.attributes.iter_mut().find(|(name, _)| *name == key) {
            Some(existing) => existing.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        self.children.iter_mut().find(|child| child.name == name)
    }

    pub fn children_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Returns the first child with the given name, appending an empty one if
    /// there is none yet.
    pub fn ensure_child(&mut self, name: &str) -> &mut XmlElement {
        let position = match self.children.iter().position(|child| child.name == name) {
            Some(position) => position,
            None => {
                self.children.push(XmlElement::new(name));
                self.children.len() - 1
            }
        };

        &mut self.children[position]
    }

    /// All text of this element and its descendants, in document order of
    /// the elements.
    pub fn inner_text(&self) -> Cow<'_, str> {
        if self.children.is_empty() {
            return Cow::Borrowed(self.text.as_deref().unwrap_or_default());
        }

        let mut text = self.text.clone().unwrap_or_default();
        for child in &self.children {
            text.push_str(&child.inner_text());
        }

        Cow::Owned(text)
    }

    /// Replaces the whole content of this element with the given text.
    pub fn set_inner_text<S: Into<String>>(&mut self, text: S) {
        self.children.clear();
        self.text = Some(text.into());
    }

    pub fn has_content(&self) -> bool {
        !self.children.is_empty() || self.text.as_deref().is_some_and(|text| !text.is_empty())
    }


    pub fn parse(document: &str) -> Result<Self, XmlError> {
        let mut reader = Reader::from_str(document);

        let mut open_elements: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => open_elements.push(Self::from_start(&start)?),
                Event::Empty(start) => {
                    let element = Self::from_start(&start)?;
                    Self::attach(&mut open_elements, &mut root, element)?;
                }
                Event::End(end) => {
                    let element = open_elements.pop().ok_or_else(|| XmlError::UnexpectedEnd {
                        found: String::from_utf8_lossy(end.name().as_ref()).into_owned(),
                    })?;
                    Self::attach(&mut open_elements, &mut root, element.finish())?;
                }
                Event::Text(text) => {
                    if let Some(current) = open_elements.last_mut() {
                        current.append_text(&text.unescape()?);
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = open_elements.last_mut() {
                        current.append_text(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(unclosed) = open_elements.pop() {
            return Err(XmlError::Unclosed {
                name: unclosed.name,
            });
        }

        root.ok_or(XmlError::NoRootElement)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, XmlError> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    fn from_start(start: &BytesStart) -> Result<Self, XmlError> {
        let mut element = XmlElement::new(String::from_utf8_lossy(start.name().as_ref()));

        for attribute in start.attributes() {
            let attribute = attribute?;
            element.attributes.push((
                String::from_utf8_lossy(attribute.key.as_ref()).into_owned(),
                attribute.unescape_value()?.into_owned(),
            ));
        }

        Ok(element)
    }

    fn attach(
        open_elements: &mut [XmlElement],
        root: &mut Option<XmlElement>,
        element: XmlElement,
    ) -> Result<(), XmlError> {
        match open_elements.last_mut() {
            Some(parent) => parent.children.push(element),
            None if root.is_some() => {
                return Err(XmlError::MultipleRoots { name: element.name });
            }
            None => *root = Some(element),
        }

        Ok(())
    }

    /// Drops the indentation between child elements once an element is closed.
    fn finish(mut self) -> Self {
        if !self.children.is_empty() {
            self.text = self
                .text
                .take()
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty());
        }

        self
    }

    fn append_text(&mut self, text: &str) {
        match self.text.as_mut() {
            Some(existing) => existing.push_str(text),
            None => self.text = Some(text.to_string()),
        }
    }


    /// Serializes the element as a complete document, with an XML declaration
    /// and two-space indentation.
    pub fn to_document_string(&self) -> Result<String, XmlError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        self.write_to(&mut writer)?;

        Ok(String::from_utf8(writer.into_inner())?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), XmlError> {
        let document = self.to_document_string()?;
        fs::write(path, document)?;

        Ok(())
    }

    fn write_to<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), XmlError> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() && self.text.is_none() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;

        if let Some(text) = &self.text {
            writer.write_event(Event::Text(BytesText::new(text)))?;
        }

        for child in &self.children {
            child.write_to(writer)?;
        }

        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;

        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_nested_elements_attributes_and_text() {
        let element = XmlElement::parse(
            r#"<?xml version="1.0"?>
            <Root version="2">
              <Count>9</Count>
              <property name="Door" read-only="false">
                <property name="OpenTimeout" value="3 &amp; more"/>
              </property>
            </Root>"#,
        )
        .unwrap();

        assert_eq!(element.name, "Root");
        assert_eq!(element.attribute("version"), Some("2"));
        assert_eq!(element.child("Count").unwrap().inner_text(), "9");

        let door = element.child("property").unwrap();
        assert_eq!(door.children.len(), 1);
        assert_eq!(door.children[0].attribute("value"), Some("3 & more"));
    }

    #[test]
    fn empty_and_malformed_documents_are_errors() {
        assert!(matches!(XmlElement::parse(""), Err(XmlError::NoRootElement)));
        assert!(XmlElement::parse("<a><b></a>").is_err());
        assert!(matches!(
            XmlElement::parse("<a/><b/>"),
            Err(XmlError::MultipleRoots { .. })
        ));
    }

    #[test]
    fn written_documents_parse_back() {
        let element = XmlElement::new("Root")
            .with_child(XmlElement::new("Count").with_text("12"))
            .with_child(XmlElement::new("valid").with_attribute("value", "<x>"));

        let written = element.to_document_string().unwrap();

        assert!(written.starts_with("<?xml"));
        assert!(written.contains("<Count>12</Count>"));
        assert_eq!(XmlElement::parse(&written).unwrap(), element);
    }

    #[test]
    fn leaf_text_keeps_its_whitespace() {
        let element = XmlElement::new("Root")
            .with_child(XmlElement::new("PortName").with_text("  COM3 "))
            .with_child(XmlElement::new("Door").with_child(XmlElement::new("Open")));

        let parsed = XmlElement::parse(&element.to_document_string().unwrap()).unwrap();

        assert_eq!(parsed.child("PortName").unwrap().inner_text(), "  COM3 ");
        assert_eq!(parsed.text, None);
        assert_eq!(parsed.child("Door").unwrap().text, None);
    }

    #[test]
    fn ensure_child_reuses_existing_elements() {
        let mut element = XmlElement::new("Root");

        element.ensure_child("A").set_inner_text("1");
        element.ensure_child("A").set_inner_text("2");

        assert_eq!(element.children.len(), 1);
        assert_eq!(element.child("A").unwrap().inner_text(), "2");
    }
}
