//! Schema snapshot types
//!
//! A [`Snapshot`] is everything the comparison engine knows about one version of a
//! schema: a name-ordered index of messages, each holding its elements in
//! declaration order.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Field multiplicity / presence qualifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Required,
    Optional,
    Repeated,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Required => "Required",
            Label::Optional => "Optional",
            Label::Repeated => "Repeated",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normal (non-map, non-oneof) message field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    /// Wire number; the field's identity on the wire
    pub tag: u32,
    pub label: Label,
    /// Type as written in the source (`int32`, `Address`, `.acme.Address`)
    pub type_name: String,
    /// Resolved name of the referenced message or enum, `None` for scalars.
    /// Types in the field's own package are named without the package.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referenced_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, tag: u32, label: Label, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag,
            label,
            type_name: type_name.into(),
            referenced_type: None,
            default_value: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_referenced_type(mut self, name: impl Into<String>) -> Self {
        self.referenced_type = Some(name.into());
        self
    }
}

/// A `map<K, V>` field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapField {
    pub name: String,
    pub tag: u32,
    pub key_type: String,
    pub value_type: String,
}

/// One named enum constant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValue {
    pub name: String,
    pub number: i64,
}

/// An enum declared inside a message or at file level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumType {
    pub name: String,
    pub values: Vec<EnumValue>,
}

/// Everything that may appear in a message body.
///
/// Only [`Element::Field`] takes part in comparison. Map fields, oneofs, nested
/// types, enums, extension ranges, reserved ranges, extend blocks and options are
/// carried for inspection but are not compared yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Element {
    Field(Field),
    MapField(MapField),
    OneOf { name: String, fields: Vec<Field> },
    /// Nested message; its definition is indexed separately under its qualified name
    Message { name: String },
    Enum(EnumType),
    Extensions { ranges: String },
    Reserved { entries: String },
    Extend { target: String, fields: Vec<Field> },
    Option { name: String, value: String },
}

/// A message definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Nesting-qualified name without the package, e.g. `Outer.Inner`
    pub name: String,
    pub elements: Vec<Element>,
}

impl Message {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            elements: Vec::new(),
        }
    }

    /// Append a normal field (builder style, mostly for tests and fixtures)
    pub fn field(mut self, field: Field) -> Self {
        self.elements.push(Element::Field(field));
        self
    }

    pub fn element(mut self, element: Element) -> Self {
        self.elements.push(element);
        self
    }

    /// Normal fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.elements.iter().filter_map(|e| match e {
            Element::Field(f) => Some(f),
            _ => None,
        })
    }
}

/// Name-keyed, name-ordered index of the messages in one schema version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    messages: BTreeMap<String, Message>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a message, returning the one it replaced (if any)
    pub fn insert(&mut self, message: Message) -> Option<Message> {
        self.messages.insert(message.name.clone(), message)
    }

    pub fn get(&self, name: &str) -> Option<&Message> {
        self.messages.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.messages.contains_key(name)
    }

    /// Messages sorted by name
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.messages.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl FromIterator<Message> for Snapshot {
    fn from_iter<I: IntoIterator<Item = Message>>(iter: I) -> Self {
        let mut snapshot = Snapshot::new();
        for message in iter {
            snapshot.insert(message);
        }
        snapshot
    }
}
