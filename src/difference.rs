//! Findings produced by a compatibility check
//!
//! A [`Difference`] records one structural delta between two schema versions. A
//! [`DifferenceList`] partitions findings into wire-breaking errors and
//! non-breaking warnings, each kept in discovery order.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of structural delta
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Field label changed (required, optional, repeated)
    ChangedLabel,
    /// New tag in a matched message
    AddedField,
    /// Tag no longer present in a matched message
    RemovedField,
    /// Same tag, different field name
    ChangedName,
    /// Same tag, different declared type
    ChangedType,
    /// Same field name, different tag
    ChangedNumber,
    /// Same tag, different default value
    ChangedDefault,
    /// Same declared type, resolved to a different message or enum
    ChangedTypeName,
    /// Message-level finding, e.g. an added or removed message
    NonFieldIncompatibility,
}

/// Which partition a finding lands in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Wire-breaking
    Error,
    /// Source or behavior affecting, wire-safe
    Warning,
}

/// A single detected delta
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Difference {
    condition: Condition,
    old_value: String,
    new_value: String,
    path: String,
    qualifier: String,
    message: String,
}

impl Difference {
    /// Create a finding; `qualifier` is the tag, or the field name for
    /// [`Condition::ChangedNumber`]
    pub fn new(
        condition: Condition,
        old_value: impl Into<String>,
        new_value: impl Into<String>,
        path: impl Into<String>,
        qualifier: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            condition,
            old_value: old_value.into(),
            new_value: new_value.into(),
            path: path.into(),
            qualifier: qualifier.into(),
            message: message.into(),
        }
    }

    /// A message-level finding that carries only free-form text
    pub fn non_field(message: impl Into<String>) -> Self {
        Self::new(Condition::NonFieldIncompatibility, "", "", "", "", message)
    }

    pub fn condition(&self) -> Condition {
        self.condition
    }

    pub fn old_value(&self) -> &str {
        &self.old_value
    }

    pub fn new_value(&self) -> &str {
        &self.new_value
    }

    /// Enclosing message, `"."` when there is none
    pub fn path(&self) -> &str {
        if self.path.is_empty() {
            "."
        } else {
            &self.path
        }
    }

    /// Tag or field name, depending on the condition
    pub fn qualifier(&self) -> &str {
        &self.qualifier
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (q, path, old, new) = (&self.qualifier, self.path(), &self.old_value, &self.new_value);
        match self.condition {
            Condition::NonFieldIncompatibility => return f.write_str(&self.message),
            Condition::ChangedLabel => {
                write!(f, "Changed label of field nr {q} in {path} from {old} to {new}")?
            }
            Condition::AddedField => write!(f, "Added field {q} in {path} of label {new}")?,
            Condition::RemovedField => write!(f, "Removed field {q} in {path} of label {old}")?,
            Condition::ChangedName => {
                write!(f, "Changed name of field {q} in {path} from {old} to {new}")?
            }
            Condition::ChangedType => {
                write!(f, "Changed type of field {q} in {path} from {old} to {new}")?
            }
            Condition::ChangedNumber => write!(
                f,
                "Changed numeric tag of field named \"{q}\" in {path} from {old} to {new}"
            )?,
            Condition::ChangedDefault => {
                write!(f, "Changed default value of field {q} in {path} from {old} to {new}")?
            }
            Condition::ChangedTypeName => {
                write!(f, "Changed type name of field {q} in {path} from {old} to {new}")?
            }
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

/// Findings of one comparison, split by severity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifferenceList {
    errors: Vec<Difference>,
    warnings: Vec<Difference>,
}

impl DifferenceList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, difference: Difference) {
        self.errors.push(difference);
    }

    pub fn add_warning(&mut self, difference: Difference) {
        self.warnings.push(difference);
    }

    pub fn record(&mut self, severity: Severity, difference: Difference) {
        match severity {
            Severity::Error => self.add_error(difference),
            Severity::Warning => self.add_warning(difference),
        }
    }

    /// Append `other`'s findings after ours, partition by partition
    pub fn merge(&mut self, other: DifferenceList) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn errors(&self) -> &[Difference] {
        &self.errors
    }

    pub fn warnings(&self) -> &[Difference] {
        &self.warnings
    }

    /// No wire-breaking findings
    pub fn is_compatible(&self) -> bool {
        self.errors.is_empty()
    }

    /// Whether a check with these findings fails: any error does, and so does
    /// any warning when `strict` is set
    pub fn fails(&self, strict: bool) -> bool {
        !self.is_compatible() || (strict && !self.warnings.is_empty())
    }

    /// No findings at all
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len() + self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.is_clean()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} Warnings, {} Incompatibility Errors",
            self.warnings.len(),
            self.errors.len()
        )
    }

    /// Render the findings as text.
    ///
    /// Warnings come first unless suppressed, then errors, then a one-line summary.
    /// The summary always counts warnings, suppressed or not.
    pub fn render(&self, suppress_warnings: bool) -> String {
        let mut output = String::new();
        if !suppress_warnings && !self.warnings.is_empty() {
            output.push_str("WARNING\n");
            for warning in &self.warnings {
                output.push_str(&warning.to_string());
                output.push('\n');
            }
        }
        if !self.errors.is_empty() {
            output.push_str("INCOMPATIBILITIES\n");
            for error in &self.errors {
                output.push_str(&error.to_string());
                output.push('\n');
            }
        }
        output.push_str(&self.summary());
        output.push('\n');
        output
    }
}
