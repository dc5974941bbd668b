//! proto-compat
//!
//! Checks whether a new version of a protobuf schema is still wire-compatible
//! with the previous one.
//!
//! ## Features
//!
//! - **Tag-based matching**: fields are correlated by wire number, not by name
//! - **Severity split**: wire-breaking errors vs source-level warnings
//! - **Deterministic reports**: messages are compared in name order
//! - **Loader**: `.proto` files or whole directory trees
//!
//! ## Example
//!
//! ```
//! use proto_compat::{compare, loader};
//!
//! let old = loader::parse_source("message User { required int32 id = 1; }", "old.proto").unwrap();
//! let new = loader::parse_source(
//!     "message User { required int32 id = 1; required int32 age = 2; }",
//!     "new.proto",
//! )
//! .unwrap();
//!
//! let differences = compare(&old, &new);
//! assert!(!differences.is_compatible());
//! print!("{}", differences.render(false));
//! ```

pub mod checksum;
pub mod compatibility;
pub mod config;
pub mod difference;
pub mod error;
pub mod loader;
pub mod report;
pub mod schema;

pub use checksum::Checksum;
pub use compatibility::{compare, CompatibilityChecker};
pub use config::{CompatConfig, OutputFormat};
pub use difference::{Condition, Difference, DifferenceList, Severity};
pub use error::{CompatError, Result};
pub use loader::LoadedSchema;
pub use report::CompatibilityReport;
pub use schema::{Element, Field, Label, Message, Snapshot};
