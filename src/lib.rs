/// The `stream` module provides the copy loop shared by every reader and
/// extractor, plus a quiet release helper for writable handles.
pub mod stream;

/// The `resource` module defines the `ResourceRoot` lookup that maps
/// slash-separated identifiers to byte streams, together with in-memory,
/// directory-backed and `include_dir!`-embedded roots.
pub mod resource;

/// The `charset` module lists the text encodings accepted when resources are
/// read as strings.
pub mod charset;

/// The `lines` module splits text on any of the common line terminators.
pub mod lines;

/// The `properties` module parses `key=value` properties text, including
/// comments, line continuations and unicode escapes.
pub mod properties;

/// The `content` module reads whole resources into memory as bytes, strings,
/// lines, properties or JSON documents.
///
/// Failures are logged before they are returned.
pub mod content;

/// The `filesystem` module prepares extraction destinations: idempotent
/// directory creation and `~` expansion.
pub mod filesystem;

/// The `extractor` module copies resources onto disk, recreating the
/// subdirectories of the requested entries.
pub mod extractor;

#[cfg(test)]
mod test_support;

pub use charset::Charset;
pub use content::{ContentError, ContentReader};
pub use extractor::{ExtractError, ExtractOptions, Extractor};
pub use properties::{Properties, PropertiesError};
pub use resource::{DirectoryRoot, MemoryRoot, ResourceRoot};
