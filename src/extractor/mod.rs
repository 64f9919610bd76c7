use crate::filesystem::{self, FilesystemError};
use crate::resource::{ResourceRoot, is_contained, join, normalize, split_parent};
use crate::stream::{self, DEFAULT_BUFFER_SIZE};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

/// Options for extracting resources.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// If true, replaces destination files that already exist.
    pub overwrite: bool,
    /// Upper bound for a single read while copying.
    pub buffer_size: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            overwrite: true,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

/// Errors raised while extracting resources to disk.
///
/// Every variant names the resource and the destination involved.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to copy '{resource}' to '{}': resource not found", destination.display())]
    NotFound { resource: String, destination: PathBuf },
    #[error("failed to copy '{resource}' to '{}': {source}", destination.display())]
    Read {
        resource: String,
        destination: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to copy '{resource}' to '{}': {source}", destination.display())]
    Write {
        resource: String,
        destination: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to prepare '{}' for '{resource}': {source}", directory.display())]
    Directory {
        resource: String,
        directory: PathBuf,
        #[source]
        source: FilesystemError,
    },
    #[error("invalid resource name '{name}' under '{root}'")]
    InvalidName { root: String, name: String },
    #[error("failed to copy '{entry}' from '{root}' to '{}': {source}", output_dir.display())]
    Entry {
        entry: String,
        root: String,
        output_dir: PathBuf,
        #[source]
        source: Box<ExtractError>,
    },
}

/// Copies resources from a [`ResourceRoot`] onto the filesystem.
#[derive(Debug, Clone)]
pub struct Extractor<R> {
    root: R,
    options: ExtractOptions,
}

impl<R: ResourceRoot> Extractor<R> {
    pub fn new(root: R) -> Self {
        Self::with_options(root, ExtractOptions::default())
    }

    pub fn with_options(root: R, options: ExtractOptions) -> Self {
        Self { root, options }
    }

    /// The root resources are extracted from.
    pub fn root(&self) -> &R {
        &self.root
    }

    /// The options every extraction runs with.
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Extracts a single resource into `output_dir`.
    ///
    /// The resource `resource_root/name` is copied to `output_dir/<last element of name>`.
    /// `output_dir` and its parents are created when missing, and a leading `~` is
    /// expanded to the home directory.
    ///
    /// # Arguments
    ///
    /// * `resource_root` - Resource directory the name is relative to.
    /// * `name` - Name of the resource below `resource_root`.
    /// * `output_dir` - Directory receiving the file.
    ///
    /// # Returns
    ///
    /// * `Ok(PathBuf)` with the absolute path of the written file.
    /// * `Err(ExtractError)` naming the resource and destination, after the failure was logged.
    pub fn extract_one<P: AsRef<Path>>(
        &self,
        resource_root: &str,
        name: &str,
        output_dir: P,
    ) -> Result<PathBuf, ExtractError> {
        let result = self.try_extract_one(resource_root, name, output_dir.as_ref());
        if let Err(e) = &result {
            error!(
                root = resource_root,
                name,
                output_dir = %output_dir.as_ref().display(),
                error = %e,
                "failed to extract resource"
            );
        }
        result
    }

    /// Extracts several resources, recreating their subdirectories below `output_dir`.
    ///
    /// Entries are processed in order; `sub/a.txt` ends up in `output_dir/sub/a.txt`.
    /// The first failure stops the run.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<PathBuf>)` with the absolute paths written, in input order.
    /// * `Err(ExtractError::Entry)` identifying the failed entry and wrapping its cause.
    pub fn extract_many<S, P>(
        &self,
        resource_root: &str,
        entries: &[S],
        output_dir: P,
    ) -> Result<Vec<PathBuf>, ExtractError>
    where
        S: AsRef<str>,
        P: AsRef<Path>,
    {
        let output_dir = output_dir.as_ref();
        let mut written = Vec::with_capacity(entries.len());

        for entry in entries {
            let entry = entry.as_ref();
            match self.extract_entry(resource_root, entry, output_dir) {
                Ok(path) => written.push(path),
                Err(source) => {
                    let err = ExtractError::Entry {
                        entry: entry.to_string(),
                        root: resource_root.to_string(),
                        output_dir: output_dir.to_path_buf(),
                        source: Box::new(source),
                    };
                    error!(
                        entry,
                        root = resource_root,
                        output_dir = %output_dir.display(),
                        error = %err,
                        "failed to extract entry"
                    );
                    return Err(err);
                }
            }
        }

        Ok(written)
    }

    fn extract_entry(&self, resource_root: &str, entry: &str, output_dir: &Path) -> Result<PathBuf, ExtractError> {
        let id = normalize(entry);
        if !is_contained(&id) {
            return Err(ExtractError::InvalidName {
                root: resource_root.to_string(),
                name: entry.to_string(),
            });
        }

        let (parent, leaf) = split_parent(&id);
        let Some(parent) = parent else {
            return self.extract_one(resource_root, leaf, output_dir);
        };

        let resource = join(resource_root, &id);

        let base = filesystem::expand_home(output_dir).map_err(|source| ExtractError::Directory {
            resource: resource.clone(),
            directory: output_dir.to_path_buf(),
            source,
        })?;
        let entry_dir = parent.split('/').fold(base, |dir, segment| dir.join(segment));
        filesystem::create_if_not_exists(&entry_dir).map_err(|source| ExtractError::Directory {
            resource,
            directory: entry_dir.clone(),
            source,
        })?;

        self.extract_one(&join(resource_root, parent), leaf, &entry_dir)
    }

    fn try_extract_one(&self, resource_root: &str, name: &str, output_dir: &Path) -> Result<PathBuf, ExtractError> {
        let id = normalize(name);
        let (_, leaf) = split_parent(&id);
        if !is_contained(&id) {
            return Err(ExtractError::InvalidName {
                root: resource_root.to_string(),
                name: name.to_string(),
            });
        }

        let resource = join(resource_root, &id);
        let output_dir = filesystem::expand_home(output_dir).map_err(|source| ExtractError::Directory {
            resource: resource.clone(),
            directory: output_dir.to_path_buf(),
            source,
        })?;
        let destination = output_dir.join(leaf);
        info!(
            resource = %resource,
            destination = %destination.display(),
            "copying resource"
        );

        let reader = self.root.open(&resource).ok_or_else(|| ExtractError::NotFound {
            resource: resource.clone(),
            destination: destination.clone(),
        })?;

        filesystem::create_if_not_exists(&output_dir).map_err(|source| ExtractError::Directory {
            resource: resource.clone(),
            directory: output_dir.clone(),
            source,
        })?;

        let write_error = |source: io::Error| ExtractError::Write {
            resource: resource.clone(),
            destination: destination.clone(),
            source,
        };

        let file = if self.options.overwrite {
            File::create(&destination)
        } else {
            OpenOptions::new().write(true).create_new(true).open(&destination)
        }
        .map_err(write_error)?;
        let mut writer = BufWriter::new(file);
        let mut reader = TrackedRead::new(reader);

        let outcome = match stream::copy_with_buffer(&mut reader, &mut writer, self.options.buffer_size) {
            Ok(_) => writer.flush().map_err(write_error),
            Err(source) if reader.failed => Err(ExtractError::Read {
                resource: resource.clone(),
                destination: destination.clone(),
                source,
            }),
            Err(source) => Err(write_error(source)),
        };
        stream::close_quietly(writer);
        outcome?;

        std::path::absolute(&destination).map_err(write_error)
    }
}

/// Remembers whether the wrapped reader raised an error, so copy failures can
/// be attributed to the right side.
struct TrackedRead<R> {
    inner: R,
    failed: bool,
}

impl<R> TrackedRead<R> {
    fn new(inner: R) -> Self {
        Self { inner, failed: false }
    }
}

impl<R: Read> Read for TrackedRead<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inner.read(buf) {
            Err(e) if e.kind() != ErrorKind::Interrupted => {
                self.failed = true;
                Err(e)
            }
            other => other,
        }
    }
}
