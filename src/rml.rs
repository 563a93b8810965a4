//! RML beamline descriptions: an ordered tree of `<object>` and `<group>`
//! nodes under `<lab>/<beamline>`, each carrying a list of `<param>`
//! entries that hold scalar text, an `<x>/<y>/<z>` vector or nested params.
//!
//! Vector components are kept as raw text so that parameters this tool does
//! not touch serialize back byte-identically; numeric interpretation happens
//! at the pose-extraction boundary.

use std::io;
use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

#[derive(thiserror::Error, Debug)]
pub enum RmlError {
    #[error("failed to read or write the beamline file")]
    Io(#[from] io::Error),
    #[error("failed to parse the beamline XML")]
    Xml(#[from] quick_xml::Error),
    #[error("malformed XML attribute")]
    Attr(#[from] quick_xml::events::attributes::AttrError),
    #[error("failed to unescape XML text")]
    Escape(#[from] quick_xml::escape::EscapeError),
    #[error("serialized beamline is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("unexpected `<{0}>` element")]
    UnexpectedElement(String),
    #[error("`<{element}>` element is missing the `{attribute}` attribute")]
    MissingAttribute { element: String, attribute: String },
    #[error("vector parameter `{id}` is missing its `{component}` component")]
    MissingComponent { id: String, component: String },
    #[error("the document has no <lab>/<beamline> structure")]
    NotABeamline,
    #[error("premature end of the document")]
    Truncated,
}

/// Value of a single `<param>` entry
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Scalar(String),
    Vec3([String; 3]),
    Nested(Vec<Param>),
}

/// A named parameter with its auxiliary attributes (`enabled`, `comment`,
/// `auto`, ...) preserved in source order
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub id: String,
    pub attrs: Vec<(String, String)>,
    pub value: ParamValue,
}

/// A beamline object: one optical element or light source
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub name: String,
    pub kind: String,
    pub params: Vec<Param>,
}
impl Object {
    pub fn param(&self, id: &str) -> Option<&Param> {
        self.params.iter().find(|param| param.id == id)
    }
    pub fn param_mut(&mut self, id: &str) -> Option<&mut Param> {
        self.params.iter_mut().find(|param| param.id == id)
    }
}

/// A container node with its own pose parameters and owned objects
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub params: Vec<Param>,
    pub objects: Vec<Object>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Object(Object),
    Group(Group),
}

/// An RML document: the `<version>` text and the ordered `<beamline>` nodes
#[derive(Debug, Clone, PartialEq)]
pub struct Beamline {
    pub version: String,
    pub nodes: Vec<Node>,
}
impl Beamline {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RmlError> {
        log::info!("Loading {:?}...", path.as_ref());
        let xml = std::fs::read_to_string(path)?;
        Self::parse(&xml)
    }
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), RmlError> {
        log::info!("Writing {:?}...", path.as_ref());
        std::fs::write(path, self.to_xml()?)?;
        Ok(())
    }
    /// First top-level object with an exact name match
    pub fn object(&self, name: &str) -> Option<&Object> {
        self.nodes.iter().find_map(|node| match node {
            Node::Object(object) if object.name == name => Some(object),
            _ => None,
        })
    }

    pub fn parse(xml: &str) -> Result<Self, RmlError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);
        let mut version = String::new();
        let mut nodes = None;
        loop {
            match reader.read_event()? {
                Event::Start(start) => match start.name().as_ref() {
                    b"lab" => (),
                    b"version" => version = read_text(&mut reader, "version")?,
                    b"beamline" => nodes = Some(parse_nodes(&mut reader)?),
                    _ => return Err(unexpected(&start)),
                },
                Event::Empty(start) if start.name().as_ref() == b"beamline" => {
                    nodes = Some(Vec::new())
                }
                Event::End(_) => (),
                Event::Eof => break,
                _ => (),
            }
        }
        Ok(Self {
            version,
            nodes: nodes.ok_or(RmlError::NotABeamline)?,
        })
    }

    pub fn to_xml(&self) -> Result<String, RmlError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        writer.write_event(Event::Start(BytesStart::new("lab")))?;
        if !self.version.is_empty() {
            write_text_element(&mut writer, "version", &self.version)?;
        }
        writer.write_event(Event::Start(BytesStart::new("beamline")))?;
        for node in &self.nodes {
            match node {
                Node::Object(object) => write_object(&mut writer, object)?,
                Node::Group(group) => write_group(&mut writer, group)?,
            }
        }
        writer.write_event(Event::End(BytesEnd::new("beamline")))?;
        writer.write_event(Event::End(BytesEnd::new("lab")))?;
        let mut xml = String::from_utf8(writer.into_inner())?;
        xml.push('\n');
        Ok(xml)
    }
}

fn unexpected(start: &BytesStart) -> RmlError {
    RmlError::UnexpectedElement(String::from_utf8_lossy(start.name().as_ref()).into_owned())
}

fn attribute(start: &BytesStart, key: &str) -> Result<Option<String>, RmlError> {
    for attr in start.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key.as_bytes() {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn required_attribute(start: &BytesStart, key: &str) -> Result<String, RmlError> {
    attribute(start, key)?.ok_or_else(|| RmlError::MissingAttribute {
        element: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
        attribute: key.to_owned(),
    })
}

/// Text content of an element whose children are plain text only
fn read_text(reader: &mut Reader<&[u8]>, tag: &str) -> Result<String, RmlError> {
    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(t) => text.push_str(&t.unescape()?),
            Event::End(end) if end.name().as_ref() == tag.as_bytes() => return Ok(text),
            Event::Eof => return Err(RmlError::Truncated),
            Event::Start(start) => return Err(unexpected(&start)),
            _ => (),
        }
    }
}

fn parse_nodes(reader: &mut Reader<&[u8]>) -> Result<Vec<Node>, RmlError> {
    let mut nodes = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(start) => match start.name().as_ref() {
                b"object" => nodes.push(Node::Object(parse_object(reader, &start)?)),
                b"group" => nodes.push(Node::Group(parse_group(reader)?)),
                _ => return Err(unexpected(&start)),
            },
            Event::Empty(start) => match start.name().as_ref() {
                b"object" => nodes.push(Node::Object(Object {
                    name: required_attribute(&start, "name")?,
                    kind: required_attribute(&start, "type")?,
                    params: Vec::new(),
                })),
                b"group" => nodes.push(Node::Group(Group {
                    params: Vec::new(),
                    objects: Vec::new(),
                })),
                _ => return Err(unexpected(&start)),
            },
            Event::End(end) if end.name().as_ref() == b"beamline" => return Ok(nodes),
            Event::Eof => return Err(RmlError::Truncated),
            _ => (),
        }
    }
}

fn parse_object(reader: &mut Reader<&[u8]>, start: &BytesStart) -> Result<Object, RmlError> {
    let mut object = Object {
        name: required_attribute(start, "name")?,
        kind: required_attribute(start, "type")?,
        params: Vec::new(),
    };
    loop {
        match reader.read_event()? {
            Event::Start(start) if start.name().as_ref() == b"param" => {
                object.params.push(parse_param(reader, &start)?)
            }
            Event::Empty(start) if start.name().as_ref() == b"param" => {
                object.params.push(empty_param(&start)?)
            }
            Event::Start(start) => return Err(unexpected(&start)),
            Event::End(end) if end.name().as_ref() == b"object" => return Ok(object),
            Event::Eof => return Err(RmlError::Truncated),
            _ => (),
        }
    }
}

fn parse_group(reader: &mut Reader<&[u8]>) -> Result<Group, RmlError> {
    let mut group = Group {
        params: Vec::new(),
        objects: Vec::new(),
    };
    loop {
        match reader.read_event()? {
            Event::Start(start) => match start.name().as_ref() {
                b"param" => group.params.push(parse_param(reader, &start)?),
                b"object" => group.objects.push(parse_object(reader, &start)?),
                _ => return Err(unexpected(&start)),
            },
            Event::Empty(start) if start.name().as_ref() == b"param" => {
                group.params.push(empty_param(&start)?)
            }
            Event::End(end) if end.name().as_ref() == b"group" => return Ok(group),
            Event::Eof => return Err(RmlError::Truncated),
            _ => (),
        }
    }
}

/// Attributes of a `<param>` tag: the `id` plus everything else verbatim
fn param_attributes(start: &BytesStart) -> Result<(String, Vec<(String, String)>), RmlError> {
    let mut id = None;
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        if key == "id" {
            id = Some(value);
        } else {
            attrs.push((key, value));
        }
    }
    let id = id.ok_or_else(|| RmlError::MissingAttribute {
        element: "param".to_owned(),
        attribute: "id".to_owned(),
    })?;
    Ok((id, attrs))
}

fn empty_param(start: &BytesStart) -> Result<Param, RmlError> {
    let (id, attrs) = param_attributes(start)?;
    Ok(Param {
        id,
        attrs,
        value: ParamValue::Scalar(String::new()),
    })
}

fn parse_param(reader: &mut Reader<&[u8]>, start: &BytesStart) -> Result<Param, RmlError> {
    let (id, attrs) = param_attributes(start)?;
    let mut text = String::new();
    let mut components: [Option<String>; 3] = [None, None, None];
    let mut nested = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Text(t) => text.push_str(&t.unescape()?),
            Event::Start(start) => match start.name().as_ref() {
                b"x" => components[0] = Some(read_text(reader, "x")?),
                b"y" => components[1] = Some(read_text(reader, "y")?),
                b"z" => components[2] = Some(read_text(reader, "z")?),
                b"param" => nested.push(parse_param(reader, &start)?),
                _ => return Err(unexpected(&start)),
            },
            Event::Empty(start) if start.name().as_ref() == b"param" => {
                nested.push(empty_param(&start)?)
            }
            Event::End(end) if end.name().as_ref() == b"param" => break,
            Event::Eof => return Err(RmlError::Truncated),
            _ => (),
        }
    }
    let value = if components.iter().any(Option::is_some) {
        let [x, y, z] = components;
        let component = |axis: &str, value: Option<String>| {
            value.ok_or_else(|| RmlError::MissingComponent {
                id: id.clone(),
                component: axis.to_owned(),
            })
        };
        ParamValue::Vec3([
            component("x", x)?,
            component("y", y)?,
            component("z", z)?,
        ])
    } else if !nested.is_empty() {
        ParamValue::Nested(nested)
    } else {
        ParamValue::Scalar(text)
    };
    Ok(Param { id, attrs, value })
}

fn write_text_element<W: io::Write>(
    writer: &mut Writer<W>,
    tag: &str,
    text: &str,
) -> Result<(), RmlError> {
    if text.is_empty() {
        writer.write_event(Event::Empty(BytesStart::new(tag)))?;
        return Ok(());
    }
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

fn write_object<W: io::Write>(writer: &mut Writer<W>, object: &Object) -> Result<(), RmlError> {
    let mut start = BytesStart::new("object");
    start.push_attribute(("name", object.name.as_str()));
    start.push_attribute(("type", object.kind.as_str()));
    writer.write_event(Event::Start(start))?;
    for param in &object.params {
        write_param(writer, param)?;
    }
    writer.write_event(Event::End(BytesEnd::new("object")))?;
    Ok(())
}

fn write_group<W: io::Write>(writer: &mut Writer<W>, group: &Group) -> Result<(), RmlError> {
    writer.write_event(Event::Start(BytesStart::new("group")))?;
    for param in &group.params {
        write_param(writer, param)?;
    }
    for object in &group.objects {
        write_object(writer, object)?;
    }
    writer.write_event(Event::End(BytesEnd::new("group")))?;
    Ok(())
}

fn write_param<W: io::Write>(writer: &mut Writer<W>, param: &Param) -> Result<(), RmlError> {
    let mut start = BytesStart::new("param");
    start.push_attribute(("id", param.id.as_str()));
    for (key, value) in &param.attrs {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    match &param.value {
        ParamValue::Scalar(text) if text.is_empty() => {
            writer.write_event(Event::Empty(start))?
        }
        ParamValue::Scalar(text) => {
            writer.write_event(Event::Start(start))?;
            writer.write_event(Event::Text(BytesText::new(text)))?;
            writer.write_event(Event::End(BytesEnd::new("param")))?
        }
        ParamValue::Vec3([x, y, z]) => {
            writer.write_event(Event::Start(start))?;
            write_text_element(writer, "x", x)?;
            write_text_element(writer, "y", y)?;
            write_text_element(writer, "z", z)?;
            writer.write_event(Event::End(BytesEnd::new("param")))?
        }
        ParamValue::Nested(children) => {
            writer.write_event(Event::Start(start))?;
            for child in children {
                write_param(writer, child)?;
            }
            writer.write_event(Event::End(BytesEnd::new("param")))?
        }
    }
    Ok(())
}
