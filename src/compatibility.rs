//! Schema compatibility checking
//!
//! Compares two snapshots of the same schema and classifies every structural
//! delta. Messages are matched by name, fields by wire tag. Only the wire tag
//! decides field identity, so a renamed field with a stable tag is a warning
//! while a stable name with a moved tag is an error.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::difference::{Condition, Difference, DifferenceList, Severity};
use crate::schema::{Field, Label, Message, Snapshot};

/// Compare an older snapshot against a newer one
pub fn compare(older: &Snapshot, newer: &Snapshot) -> DifferenceList {
    CompatibilityChecker::new().compare(older, newer)
}

/// Compatibility checker for schema versions
#[derive(Debug, Clone, Copy, Default)]
pub struct CompatibilityChecker;

impl CompatibilityChecker {
    /// Create a new compatibility checker
    pub fn new() -> Self {
        Self
    }

    /// Check every message of `newer` against `older`.
    ///
    /// Added and removed messages are warnings: a new or dropped message type
    /// cannot by itself break decoding of existing data.
    pub fn compare(&self, older: &Snapshot, newer: &Snapshot) -> DifferenceList {
        let mut output = DifferenceList::new();

        for message in newer.messages() {
            match older.get(&message.name) {
                Some(old) => output.merge(self.compare_message_fields(old, message)),
                None => output.add_warning(Difference::non_field(format!(
                    "Added message {}",
                    message.name
                ))),
            }
        }

        for message in older.messages() {
            if !newer.contains(&message.name) {
                output.add_warning(Difference::non_field(format!(
                    "Removed message {}",
                    message.name
                )));
            }
        }

        info!(
            errors = output.errors().len(),
            warnings = output.warnings().len(),
            "compatibility check finished"
        );
        output
    }

    /// Correlate the fields of one matched message pair by tag
    pub fn compare_message_fields(&self, old: &Message, new: &Message) -> DifferenceList {
        let mut output = DifferenceList::new();
        let path = old.name.as_str();

        let old_by_tag: BTreeMap<u32, &Field> = old.fields().map(|f| (f.tag, f)).collect();
        let new_by_tag: BTreeMap<u32, &Field> = new.fields().map(|f| (f.tag, f)).collect();

        for field in new.fields() {
            match old_by_tag.get(&field.tag) {
                Some(previous) => output.merge(self.compare_fields(previous, field, path)),
                None => {
                    // Repeated additions are not reported. Whether they should be is
                    // still undecided; see DESIGN.md before changing this.
                    let severity = match field.label {
                        Label::Required => Severity::Error,
                        Label::Optional => Severity::Warning,
                        Label::Repeated => continue,
                    };
                    output.record(
                        severity,
                        Difference::new(
                            Condition::AddedField,
                            "",
                            field.label.as_str(),
                            path,
                            field.tag.to_string(),
                            "",
                        ),
                    );
                }
            }
        }

        for field in old.fields().filter(|f| !new_by_tag.contains_key(&f.tag)) {
            let severity = if field.label == Label::Required {
                Severity::Error
            } else {
                Severity::Warning
            };
            output.record(
                severity,
                Difference::new(
                    Condition::RemovedField,
                    field.label.as_str(),
                    "",
                    path,
                    field.tag.to_string(),
                    "",
                ),
            );
        }

        for field in new.fields() {
            for previous in old.fields() {
                if field.name == previous.name && field.tag != previous.tag {
                    output.add_error(Difference::new(
                        Condition::ChangedNumber,
                        previous.tag.to_string(),
                        field.tag.to_string(),
                        path,
                        field.name.as_str(),
                        "semantics may be changed for this field",
                    ));
                }
            }
        }

        debug!(
            message = path,
            errors = output.errors().len(),
            warnings = output.warnings().len(),
            "compared message fields"
        );
        output
    }

    /// Compare the attributes of two fields sharing one tag.
    ///
    /// Every finding here is a warning; the tag match means the wire layout of
    /// the field itself is intact.
    pub fn compare_fields(&self, old: &Field, new: &Field, path: &str) -> DifferenceList {
        let mut output = DifferenceList::new();
        let tag = old.tag.to_string();

        if old.label != new.label {
            output.add_warning(Difference::new(
                Condition::ChangedLabel,
                old.label.as_str(),
                new.label.as_str(),
                path,
                &tag,
                "",
            ));
        }

        if old.name != new.name {
            output.add_warning(Difference::new(
                Condition::ChangedName,
                &old.name,
                &new.name,
                path,
                &tag,
                "",
            ));
        }

        if old.type_name != new.type_name {
            output.add_warning(Difference::new(
                Condition::ChangedType,
                &old.type_name,
                &new.type_name,
                path,
                &tag,
                "",
            ));
        }

        // Only a reference that resolves elsewhere under the same written type;
        // a plain retype is already covered by ChangedType.
        if old.type_name == new.type_name && old.referenced_type != new.referenced_type {
            output.add_warning(Difference::new(
                Condition::ChangedTypeName,
                display_optional(&old.referenced_type),
                display_optional(&new.referenced_type),
                path,
                &tag,
                "manually compare the referenced message types",
            ));
        }

        if old.default_value != new.default_value {
            output.add_warning(Difference::new(
                Condition::ChangedDefault,
                display_optional(&old.default_value),
                display_optional(&new.default_value),
                path,
                &tag,
                "this is generally OK",
            ));
        }

        output
    }
}

fn display_optional(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("<none>")
}
