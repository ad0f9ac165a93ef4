//! Parsing and editing of Xcode `project.pbxproj` files.
//!
//! The pbxproj format is the OpenStep property-list dialect Xcode still
//! writes: a dictionary tree of bare or quoted strings, arrays, and nested
//! dictionaries, decorated with `/* ... */` annotation comments next to
//! object identifiers.
//!
//! Responsibilities:
//! - Parse a pbxproj document into an order-preserving value tree
//!   ([`PbxValue`]) that keeps annotations, so untouched objects round-trip.
//! - Write the tree back in Xcode's layout.
//! - Expose a typed layer ([`Project`]) over the object graph: targets,
//!   build phases, build files, file references, build settings.

mod parser;
mod project;
mod value;
mod writer;

pub use project::Project;
pub use value::{PbxDict, PbxString, PbxValue};

#[derive(Debug, thiserror::Error)]
pub enum PbxError {
    #[error("pbxproj parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("pbxproj structure error: {0}")]
    Structure(String),
}

impl PbxError {
    pub(crate) fn structure(msg: impl Into<String>) -> Self {
        PbxError::Structure(msg.into())
    }
}

/// Parse a pbxproj document into its root value (always a dictionary).
pub fn parse_document(text: &str) -> Result<PbxValue, PbxError> {
    parser::parse(text)
}

/// Serialize a value tree in Xcode's pbxproj layout, including the
/// `// !$*UTF8*$!` header.
pub fn write_document(root: &PbxValue) -> String {
    writer::write(root)
}
