use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("document is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("malformed XML: {0}")]
    Syntax(#[from] quick_xml::Error),
    #[error("malformed attribute: {0}")]
    Attribute(#[from] AttrError),
    #[error("malformed escape sequence: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),
    #[error("failed to write XML: {0}")]
    Write(#[from] std::io::Error),
    #[error("unclosed or unbalanced element")]
    Unbalanced,
    #[error("document has no root element")]
    Empty,
    #[error("document has more than one root element")]
    MultipleRoots,
    #[error("expected <{expected}> root element, found <{found}>")]
    UnexpectedRoot { expected: &'static str, found: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
}

/// Owned XML element. Attribute order and CDATA sections survive a decode/encode cycle.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        match self.name.split_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key.to_string(), value)),
        }
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a Element> {
        self.elements().filter(move |el| el.local_name() == local)
    }

    pub fn children_named_mut<'a>(
        &'a mut self,
        local: &'a str,
    ) -> impl Iterator<Item = &'a mut Element> {
        self.elements_mut().filter(move |el| el.local_name() == local)
    }

    pub fn child(&self, local: &str) -> Option<&Element> {
        self.elements().find(|el| el.local_name() == local)
    }

    pub fn child_mut(&mut self, local: &str) -> Option<&mut Element> {
        self.elements_mut().find(|el| el.local_name() == local)
    }

    /// Concatenated text and CDATA content, trimmed.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            match node {
                Node::Text(t) | Node::CData(t) => out.push_str(t),
                Node::Element(_) => {}
            }
        }
        out.trim().to_string()
    }

    /// Replaces all text content with a single CDATA section, keeping child elements.
    pub fn set_cdata(&mut self, value: impl Into<String>) {
        self.children.retain(|node| matches!(node, Node::Element(_)));
        self.children.push(Node::CData(value.into()));
    }

    pub fn parse(bytes: &[u8]) -> Result<Element, XmlError> {
        let xml = std::str::from_utf8(bytes)?;
        let mut reader = Reader::from_str(xml);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => stack.push(Self::from_start(&start)?),
                Event::Empty(start) => {
                    let el = Self::from_start(&start)?;
                    attach(&mut stack, &mut root, el)?;
                }
                Event::End(_) => {
                    let el = stack.pop().ok_or(XmlError::Unbalanced)?;
                    attach(&mut stack, &mut root, el)?;
                }
                Event::Text(text) => {
                    if let Some(parent) = stack.last_mut() {
                        let value = text.unescape()?;
                        // Indentation between elements is dropped; real text keeps its spacing.
                        if !value.trim().is_empty() {
                            parent.children.push(Node::Text(value.into_owned()));
                        }
                    }
                }
                Event::CData(data) => {
                    if let Some(parent) = stack.last_mut() {
                        let value = String::from_utf8_lossy(&data.into_inner()).into_owned();
                        parent.children.push(Node::CData(value));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(XmlError::Unbalanced);
        }
        root.ok_or(XmlError::Empty)
    }

    pub fn to_xml(&self) -> Result<Vec<u8>, XmlError> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        write_element(&mut writer, self)?;
        Ok(writer.into_inner())
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Element, XmlError> {
        let mut el = Element::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
        for attr in start.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            el.attributes.push((key, value));
        }
        Ok(el)
    }
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    el: Element,
) -> Result<(), XmlError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(el));
        return Ok(());
    }
    if root.is_some() {
        return Err(XmlError::MultipleRoots);
    }
    *root = Some(el);
    Ok(())
}

fn write_element(writer: &mut Writer<Vec<u8>>, el: &Element) -> Result<(), XmlError> {
    let mut start = BytesStart::new(el.name.as_str());
    for (key, value) in &el.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if el.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for node in &el.children {
        match node {
            Node::Element(child) => write_element(writer, child)?,
            Node::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
            Node::CData(data) => writer.write_event(Event::CData(BytesCData::new(data.as_str())))?,
        }
    }
    writer.write_event(Event::End(BytesEnd::new(el.name.as_str())))?;
    Ok(())
}
