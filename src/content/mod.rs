use crate::charset::{Charset, DecodeError};
use crate::lines::lines;
use crate::properties::{Properties, PropertiesError, parse_properties_bytes};
use crate::resource::{ResourceRoot, normalize};
use crate::stream;
use serde::de::DeserializeOwned;
use std::io;
use thiserror::Error;
use tracing::{debug, error};

/// Errors returned by the [`ContentReader`] operations.
///
/// Every variant carries the identifier of the resource involved.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("resource not found: {resource}")]
    NotFound { resource: String },
    #[error("failed to read resource {resource}: {source}")]
    Read {
        resource: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to decode resource {resource}: {source}")]
    Decode {
        resource: String,
        #[source]
        source: DecodeError,
    },
    #[error("failed to parse properties resource {resource}: {source}")]
    Properties {
        resource: String,
        #[source]
        source: PropertiesError,
    },
    #[error("failed to parse JSON resource {resource}: {source}")]
    Json {
        resource: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ContentError {
    /// The identifier of the resource the operation was working on.
    pub fn resource(&self) -> &str {
        match self {
            ContentError::NotFound { resource }
            | ContentError::Read { resource, .. }
            | ContentError::Decode { resource, .. }
            | ContentError::Properties { resource, .. }
            | ContentError::Json { resource, .. } => resource,
        }
    }
}

/// Loads resources from a [`ResourceRoot`] into memory.
///
/// Failures are logged at `error` level before being returned, so callers that
/// only care whether a read worked can check the `Result` and move on.
#[derive(Debug, Clone)]
pub struct ContentReader<R> {
    root: R,
}

impl<R: ResourceRoot> ContentReader<R> {
    pub fn new(root: R) -> Self {
        Self { root }
    }

    /// The root every read goes through.
    pub fn root(&self) -> &R {
        &self.root
    }

    /// Returns all lines of the resource, decoded as UTF-8.
    ///
    /// Lines are split on `\n`, `\r\n` or `\r`; terminators are not included.
    ///
    /// # Errors
    ///
    /// Returns `ContentError` if the resource is missing, unreadable or not valid UTF-8.
    /// No partial result is returned.
    pub fn read_lines(&self, resource: &str) -> Result<Vec<String>, ContentError> {
        self.read_lines_with(resource, Charset::default())
    }

    /// Returns all lines of the resource, decoded with `charset`.
    pub fn read_lines_with(&self, resource: &str, charset: Charset) -> Result<Vec<String>, ContentError> {
        let text = self.read_string_with(resource, charset)?;
        Ok(lines(&text).map(str::to_owned).collect())
    }

    /// Returns the exact bytes of the resource.
    ///
    /// The resource is drained in 4 KiB chunks into a growable buffer.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::NotFound` if the root has no such resource, or
    /// `ContentError::Read` if reading fails part way.
    pub fn read_bytes(&self, resource: &str) -> Result<Vec<u8>, ContentError> {
        let id = normalize(resource);
        let result = self.load(&id);
        match &result {
            Ok(bytes) => debug!(resource = %id, len = bytes.len(), "read resource"),
            Err(e) => error!(resource = %id, error = %e, "failed to read bytes from resource"),
        }
        result
    }

    /// Returns the resource decoded as UTF-8.
    pub fn read_string(&self, resource: &str) -> Result<String, ContentError> {
        self.read_string_with(resource, Charset::default())
    }

    /// Returns the resource decoded with `charset`.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Decode` if the bytes are not valid in `charset`,
    /// in addition to the errors of [`ContentReader::read_bytes`].
    pub fn read_string_with(&self, resource: &str, charset: Charset) -> Result<String, ContentError> {
        let bytes = self.read_bytes(resource)?;
        charset.decode(&bytes).map_err(|source| {
            let err = ContentError::Decode {
                resource: normalize(resource),
                source,
            };
            error!(resource = %err.resource(), %charset, error = %err, "failed to read string from resource");
            err
        })
    }

    /// Parses the resource as a properties file.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Properties` for malformed text, in addition to the
    /// errors of [`ContentReader::read_bytes`].
    pub fn read_properties(&self, resource: &str) -> Result<Properties, ContentError> {
        let bytes = self.read_bytes(resource)?;
        parse_properties_bytes(&bytes).map_err(|source| {
            let err = ContentError::Properties {
                resource: normalize(resource),
                source,
            };
            error!(resource = %err.resource(), error = %err, "failed to read properties from resource");
            err
        })
    }

    /// Deserializes the resource as a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Json` if the content does not deserialize into `T`,
    /// in addition to the errors of [`ContentReader::read_bytes`].
    pub fn read_json<T: DeserializeOwned>(&self, resource: &str) -> Result<T, ContentError> {
        let bytes = self.read_bytes(resource)?;
        serde_json::from_slice(&bytes).map_err(|source| {
            let err = ContentError::Json {
                resource: normalize(resource),
                source,
            };
            error!(resource = %err.resource(), error = %err, "failed to read JSON from resource");
            err
        })
    }

    fn load(&self, id: &str) -> Result<Vec<u8>, ContentError> {
        let mut reader = self.root.open(id).ok_or_else(|| ContentError::NotFound {
            resource: id.to_string(),
        })?;
        let mut bytes = Vec::new();
        stream::copy(&mut reader, &mut bytes).map_err(|source| ContentError::Read {
            resource: id.to_string(),
            source,
        })?;
        Ok(bytes)
    }
}
