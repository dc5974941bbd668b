//! Schema loader
//!
//! Turns `.proto` sources into a [`Snapshot`]. A snapshot can come from one file
//! or from every matching file under a directory; type references are resolved
//! across all files of the snapshot once everything has been parsed.
//!
//! The loader owns the structural contracts the comparison engine relies on:
//! message names are unique within a snapshot and field tags are unique within
//! a message.

pub mod parser;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use nom::error::convert_error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::checksum::Checksum;
use crate::config::LoaderConfig;
use crate::error::{CompatError, Result};
use crate::schema::{Element, Field, Message, Snapshot};

use parser::{MessageDecl, MessageItem, Statement};

const SCALAR_TYPES: &[&str] = &[
    "double", "float", "int32", "int64", "uint32", "uint64", "sint32", "sint64", "fixed32",
    "fixed64", "sfixed32", "sfixed64", "bool", "string", "bytes",
];

/// A snapshot together with where it came from
#[derive(Debug, Clone)]
pub struct LoadedSchema {
    pub snapshot: Snapshot,
    /// Source files in load order
    pub files: Vec<PathBuf>,
    /// Checksum over all source texts, in load order
    pub checksum: Checksum,
}

/// Parse a single source text into a snapshot
pub fn parse_source(source: &str, origin: &str) -> Result<Snapshot> {
    let mut builder = SnapshotBuilder::default();
    builder.add_source(source, origin)?;
    Ok(builder.finish())
}

/// Load one `.proto` file
pub fn load_file(path: &Path) -> Result<LoadedSchema> {
    load_files(vec![path.to_path_buf()])
}

/// Load a file, or every file with the configured extension under a directory
pub fn load_path(path: &Path, config: &LoaderConfig) -> Result<LoadedSchema> {
    if !path.is_dir() {
        return load_file(path);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path)
        .follow_links(config.follow_symlinks)
        .sort_by_file_name()
    {
        let entry = entry?;
        let matches = entry.file_type().is_file()
            && entry.path().extension().and_then(|e| e.to_str()) == Some(config.extension.as_str());
        if matches {
            files.push(entry.into_path());
        }
    }

    if files.is_empty() {
        return Err(CompatError::NoSchemaFiles(path.to_path_buf()));
    }
    load_files(files)
}

fn load_files(files: Vec<PathBuf>) -> Result<LoadedSchema> {
    let mut builder = SnapshotBuilder::default();
    let mut sources = Vec::with_capacity(files.len());

    for file in &files {
        let source = fs::read_to_string(file)?;
        builder.add_source(&source, &file.display().to_string())?;
        sources.push(source);
    }

    let checksum = Checksum::combined(sources.iter().map(String::as_str));
    let snapshot = builder.finish();
    info!(files = files.len(), messages = snapshot.len(), "loaded schema");

    Ok(LoadedSchema {
        snapshot,
        files,
        checksum,
    })
}

/// A message waiting for type resolution, with the scope its fields resolve in
struct PendingMessage {
    /// Package components followed by the message nesting path
    scope: Vec<String>,
    package_len: usize,
    message: Message,
}

/// Collects messages from one or more sources, then resolves type references
#[derive(Default)]
struct SnapshotBuilder {
    pending: Vec<PendingMessage>,
    names: HashSet<String>,
    /// Fully qualified (package included) message and enum names
    known_types: HashSet<String>,
}

impl SnapshotBuilder {
    fn add_source(&mut self, source: &str, origin: &str) -> Result<()> {
        let statements = parser::parse_proto(source).map_err(|e| CompatError::Parse {
            origin: origin.to_string(),
            message: convert_error(source, e),
        })?;

        let package: Vec<String> = statements
            .iter()
            .find_map(|s| match s {
                Statement::Package(p) => Some(p.split('.').map(str::to_string).collect()),
                _ => None,
            })
            .unwrap_or_default();

        for statement in statements {
            match statement {
                Statement::Syntax(syntax) => debug!(origin, syntax = %syntax, "schema syntax"),
                Statement::Message(decl) => self.add_message(decl, None, &package, origin)?,
                Statement::Enum(e) => {
                    self.known_types.insert(qualify(&package, &e.name));
                }
                Statement::Extend { target, .. } => {
                    debug!(origin, target = %target, "extend blocks are not compared")
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn add_message(
        &mut self,
        decl: MessageDecl,
        parent: Option<&str>,
        package: &[String],
        origin: &str,
    ) -> Result<()> {
        let name = match parent {
            Some(parent) => format!("{}.{}", parent, decl.name),
            None => decl.name,
        };
        if !self.names.insert(name.clone()) {
            return Err(CompatError::DuplicateMessage {
                name,
                origin: origin.to_string(),
            });
        }

        let mut message = Message::new(&name);
        let mut nested = Vec::new();

        for item in decl.items {
            let element = match item {
                MessageItem::Field(f) => Element::Field(f.into_field()),
                MessageItem::Map(m) => Element::MapField(m),
                MessageItem::OneOf { name, fields } => Element::OneOf {
                    name,
                    fields: fields.into_iter().map(|f| f.into_field()).collect(),
                },
                MessageItem::Message(inner) => {
                    let element = Element::Message {
                        name: format!("{}.{}", name, inner.name),
                    };
                    nested.push(inner);
                    element
                }
                MessageItem::Enum(e) => {
                    self.known_types
                        .insert(qualify(package, &format!("{}.{}", name, e.name)));
                    Element::Enum(e)
                }
                MessageItem::Extend { target, fields } => Element::Extend {
                    target,
                    fields: fields.into_iter().map(|f| f.into_field()).collect(),
                },
                MessageItem::Extensions(ranges) => Element::Extensions { ranges },
                MessageItem::Reserved(entries) => Element::Reserved { entries },
                MessageItem::Option(name, value) => Element::Option { name, value },
                MessageItem::Empty => continue,
            };
            message.elements.push(element);
        }

        check_unique_tags(&message)?;
        self.known_types.insert(qualify(package, &name));

        let mut scope = package.to_vec();
        scope.extend(name.split('.').map(str::to_string));
        self.pending.push(PendingMessage {
            scope,
            package_len: package.len(),
            message,
        });

        for inner in nested {
            self.add_message(inner, Some(&name), package, origin)?;
        }
        Ok(())
    }

    fn finish(self) -> Snapshot {
        let mut snapshot = Snapshot::new();
        for PendingMessage {
            scope,
            package_len,
            mut message,
        } in self.pending
        {
            let package = &scope[..package_len];
            for element in &mut message.elements {
                let fields: &mut [Field] = match element {
                    Element::Field(f) => std::slice::from_mut(f),
                    Element::OneOf { fields, .. } | Element::Extend { fields, .. } => {
                        fields.as_mut_slice()
                    }
                    _ => continue,
                };
                for field in fields {
                    let resolved = resolve_type(&self.known_types, &scope, &field.type_name);
                    field.referenced_type = resolved.map(|name| strip_package(package, name));
                }
            }
            snapshot.insert(message);
        }
        snapshot
    }
}

fn qualify(package: &[String], name: &str) -> String {
    if package.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", package.join("."), name)
    }
}

/// Resolve a type reference the way protoc does: innermost scope first.
///
/// References that match nothing known (imports outside the snapshot) resolve to
/// the name as written.
fn resolve_type(known: &HashSet<String>, scope: &[String], type_name: &str) -> Option<String> {
    if SCALAR_TYPES.contains(&type_name) {
        return None;
    }
    if let Some(absolute) = type_name.strip_prefix('.') {
        return Some(absolute.to_string());
    }
    for depth in (0..=scope.len()).rev() {
        let candidate = qualify(&scope[..depth], type_name);
        if known.contains(&candidate) {
            return Some(candidate);
        }
    }
    Some(type_name.to_string())
}

/// Drop the file's own package from a resolved name, matching how messages are
/// keyed in the snapshot. Types from other packages keep their full name.
fn strip_package(package: &[String], resolved: String) -> String {
    if package.is_empty() {
        return resolved;
    }
    let prefix = format!("{}.", package.join("."));
    match resolved.strip_prefix(&prefix) {
        Some(relative) => relative.to_string(),
        None => resolved,
    }
}

fn check_unique_tags(message: &Message) -> Result<()> {
    let mut seen = HashSet::new();
    for element in &message.elements {
        let tags: Vec<u32> = match element {
            Element::Field(f) => vec![f.tag],
            Element::MapField(m) => vec![m.tag],
            Element::OneOf { fields, .. } => fields.iter().map(|f| f.tag).collect(),
            _ => continue,
        };
        for tag in tags {
            if !seen.insert(tag) {
                return Err(CompatError::DuplicateTag {
                    message: message.name.clone(),
                    tag,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Label;

    const ORDERS: &str = r#"
        syntax = "proto2";
        package acme;

        enum Currency { EUR = 0; USD = 1; }

        message Order {
            message Line {
                required string sku = 1;
                optional Currency currency = 2 [default = EUR];
            }
            required int64 id = 1;
            repeated Line lines = 2;
            optional Customer customer = 3;
            optional google.protobuf.Timestamp placed_at = 4;
            map<string, string> labels = 5;
        }

        message Customer { optional string email = 1; }
    "#;

    fn field<'a>(snapshot: &'a Snapshot, message: &str, name: &str) -> &'a Field {
        snapshot
            .get(message)
            .and_then(|m| m.fields().find(|f| f.name == name))
            .unwrap()
    }

    #[test]
    fn test_nested_messages_are_indexed_by_qualified_name() {
        let snapshot = parse_source(ORDERS, "orders.proto").unwrap();
        let names: Vec<_> = snapshot.names().collect();
        assert_eq!(names, vec!["Customer", "Order", "Order.Line"]);

        let order = snapshot.get("Order").unwrap();
        assert!(order
            .elements
            .iter()
            .any(|e| matches!(e, Element::Message { name } if name == "Order.Line")));
        assert_eq!(order.fields().count(), 4);
    }

    #[test]
    fn test_type_references_resolve_innermost_first() {
        let snapshot = parse_source(ORDERS, "orders.proto").unwrap();

        assert_eq!(field(&snapshot, "Order", "id").referenced_type, None);
        assert_eq!(
            field(&snapshot, "Order", "lines").referenced_type.as_deref(),
            Some("Order.Line")
        );
        assert_eq!(
            field(&snapshot, "Order", "customer").referenced_type.as_deref(),
            Some("Customer")
        );
        assert_eq!(
            field(&snapshot, "Order", "placed_at").referenced_type.as_deref(),
            Some("google.protobuf.Timestamp")
        );
        assert_eq!(
            field(&snapshot, "Order.Line", "currency").referenced_type.as_deref(),
            Some("Currency")
        );
    }

    #[test]
    fn test_labels_and_defaults() {
        let snapshot = parse_source(ORDERS, "orders.proto").unwrap();
        let currency = field(&snapshot, "Order.Line", "currency");
        assert_eq!(currency.label, Label::Optional);
        assert_eq!(currency.default_value.as_deref(), Some("EUR"));
        assert_eq!(field(&snapshot, "Order", "lines").label, Label::Repeated);
    }

    #[test]
    fn test_proto3_singular_fields_load_as_optional() {
        let snapshot = parse_source(
            "syntax = \"proto3\"; message Ping { int64 sent_at = 1; }",
            "ping.proto",
        )
        .unwrap();
        assert_eq!(field(&snapshot, "Ping", "sent_at").label, Label::Optional);
    }

    #[test]
    fn test_duplicate_tag_is_rejected() {
        let err = parse_source(
            "message M { optional int32 a = 1; oneof choice { string b = 1; } }",
            "dup.proto",
        )
        .unwrap_err();
        assert!(matches!(err, CompatError::DuplicateTag { ref message, tag: 1 } if message == "M"));
    }

    #[test]
    fn test_duplicate_message_is_rejected() {
        let err = parse_source("message M {} message M {}", "dup.proto").unwrap_err();
        assert!(matches!(err, CompatError::DuplicateMessage { ref name, .. } if name == "M"));
    }

    #[test]
    fn test_parse_error_names_origin() {
        let err = parse_source("message M { required int32 = 1; }", "broken.proto").unwrap_err();
        match err {
            CompatError::Parse { origin, message } => {
                assert_eq!(origin, "broken.proto");
                assert!(!message.is_empty());
            }
            other => panic!("Expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_directory_resolves_across_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("common")).unwrap();
        fs::write(
            dir.path().join("common/money.proto"),
            "package acme; message Money { required int64 cents = 1; }",
        )
        .unwrap();
        fs::write(
            dir.path().join("invoice.proto"),
            "package acme; message Invoice { required Money total = 1; }",
        )
        .unwrap();
        fs::write(dir.path().join("README.md"), "not a schema").unwrap();

        let loaded = load_path(dir.path(), &LoaderConfig::default()).unwrap();
        assert_eq!(loaded.files.len(), 2);
        assert_eq!(loaded.snapshot.len(), 2);
        assert_eq!(
            field(&loaded.snapshot, "Invoice", "total").referenced_type.as_deref(),
            Some("Money")
        );
    }

    #[test]
    fn test_own_package_is_dropped_from_references() {
        let source = "package billing.v1; message Money { required int64 cents = 1; }
            message Invoice {
                required Money total = 1;
                optional .billing.v1.Money tax = 2;
                optional other.Rate rate = 3;
            }";
        let snapshot = parse_source(source, "invoice.proto").unwrap();

        let reference = |name: &str| field(&snapshot, "Invoice", name).referenced_type.clone();
        assert_eq!(reference("total").as_deref(), Some("Money"));
        assert_eq!(reference("tax").as_deref(), Some("Money"));
        assert_eq!(reference("rate").as_deref(), Some("other.Rate"));
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_path(dir.path(), &LoaderConfig::default()).unwrap_err();
        assert!(matches!(err, CompatError::NoSchemaFiles(_)));
    }
}
