use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

/// A lookup from slash-separated resource identifiers to readable byte streams.
///
/// Identifiers are logical: they never use the host's path separator and are
/// resolved relative to the root, not to the filesystem.
pub trait ResourceRoot {
    /// Opens the resource named `id` for reading.
    ///
    /// # Returns
    ///
    /// * `Some(reader)` positioned at the first byte of the resource.
    /// * `None` if the root has no such resource.
    fn open(&self, id: &str) -> Option<Box<dyn Read + '_>>;
}

impl<T: ResourceRoot + ?Sized> ResourceRoot for &T {
    fn open(&self, id: &str) -> Option<Box<dyn Read + '_>> {
        (**self).open(id)
    }
}

impl<T: ResourceRoot + ?Sized> ResourceRoot for Box<T> {
    fn open(&self, id: &str) -> Option<Box<dyn Read + '_>> {
        (**self).open(id)
    }
}

/// Resources embedded at compile time with `include_dir!`.
impl<'a> ResourceRoot for include_dir::Dir<'a> {
    fn open(&self, id: &str) -> Option<Box<dyn Read + '_>> {
        let file = self.get_file(normalize(id))?;
        Some(Box::new(file.contents()))
    }
}

/// Normalizes a resource identifier.
///
/// Empty segments and `.` segments are dropped, so leading, trailing and doubled
/// slashes do not matter.
///
/// # Arguments
///
/// * `id` - The identifier to normalize.
///
/// # Returns
///
/// The canonical form, e.g. `"data/a.txt"` for `"/data//./a.txt"`.
pub fn normalize(id: &str) -> String {
    segments(id).collect::<Vec<_>>().join("/")
}

/// Joins a resource root and a name relative to it, tolerating a missing or
/// present trailing slash on the root.
pub fn join(root: &str, name: &str) -> String {
    segments(root).chain(segments(name)).collect::<Vec<_>>().join("/")
}

/// Splits a normalized identifier into its parent component and final element.
///
/// `"sub/dir/a.txt"` becomes `(Some("sub/dir"), "a.txt")` and `"a.txt"` becomes
/// `(None, "a.txt")`.
pub fn split_parent(id: &str) -> (Option<&str>, &str) {
    match id.rsplit_once('/') {
        Some((parent, leaf)) => (Some(parent), leaf),
        None => (None, id),
    }
}

fn segments(id: &str) -> impl Iterator<Item = &str> {
    id.split('/').filter(|s| !s.is_empty() && *s != ".")
}

/// Whether every segment of `id` maps onto exactly one ordinary path element
/// on this host.
///
/// Rejects empty identifiers, `..`, backslashes and anything the host treats
/// as a root or drive prefix, so joining the segments below a directory can
/// never leave it.
pub fn is_contained(id: &str) -> bool {
    let mut any = false;
    for segment in segments(id) {
        if !is_plain_segment(segment) {
            return false;
        }
        any = true;
    }
    any
}

fn is_plain_segment(segment: &str) -> bool {
    if segment.contains('\\') {
        return false;
    }
    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// An in-memory resource root, mostly useful for tests and for assets that
/// were pulled in with `include_bytes!`.
#[derive(Debug, Default, Clone)]
pub struct MemoryRoot {
    entries: BTreeMap<String, Cow<'static, [u8]>>,
}

impl MemoryRoot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a resource, replacing any previous content stored under the same identifier.
    ///
    /// # Returns
    ///
    /// The previous content, if there was one.
    pub fn insert<B>(&mut self, id: &str, bytes: B) -> Option<Cow<'static, [u8]>>
    where
        B: Into<Cow<'static, [u8]>>,
    {
        self.entries.insert(normalize(id), bytes.into())
    }

    /// Builder-style variant of [`MemoryRoot::insert`].
    pub fn with<B>(mut self, id: &str, bytes: B) -> Self
    where
        B: Into<Cow<'static, [u8]>>,
    {
        self.insert(id, bytes);
        self
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(&normalize(id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the stored identifiers in lexical order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl ResourceRoot for MemoryRoot {
    fn open(&self, id: &str) -> Option<Box<dyn Read + '_>> {
        let bytes = self.entries.get(&normalize(id))?;
        Some(Box::new(&bytes[..]))
    }
}

impl<S, B> FromIterator<(S, B)> for MemoryRoot
where
    S: AsRef<str>,
    B: Into<Cow<'static, [u8]>>,
{
    fn from_iter<I: IntoIterator<Item = (S, B)>>(iter: I) -> Self {
        let mut root = MemoryRoot::new();
        for (id, bytes) in iter {
            root.insert(id.as_ref(), bytes);
        }
        root
    }
}

/// A resource root backed by a directory on disk, e.g. assets shipped next to
/// the executable.
///
/// Because [`ResourceRoot::open`] can only say "absent", any failure to open
/// the file (a permission error included) is reported the same way as a
/// missing file.
#[derive(Debug, Clone)]
pub struct DirectoryRoot {
    base: PathBuf,
}

impl DirectoryRoot {
    pub fn new<P: AsRef<Path>>(base: P) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
        }
    }

    /// The directory identifiers are resolved against.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Maps an identifier onto a path below the base directory.
    ///
    /// # Returns
    ///
    /// `None` for an empty identifier or one with a segment that is not a plain
    /// file name (`..`, a backslash, a drive or root), since those cannot name a
    /// resource inside the root.
    pub fn resolve(&self, id: &str) -> Option<PathBuf> {
        if !is_contained(id) {
            return None;
        }
        Some(segments(id).fold(self.base.clone(), |path, segment| path.join(segment)))
    }
}

impl ResourceRoot for DirectoryRoot {
    fn open(&self, id: &str) -> Option<Box<dyn Read + '_>> {
        let path = self.resolve(id)?;
        if !path.is_file() {
            return None;
        }
        // open errors cannot be told apart from absence here
        let file = File::open(&path).ok()?;
        Some(Box::new(BufReader::new(file)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn read_all(root: &dyn ResourceRoot, id: &str) -> Option<Vec<u8>> {
        let mut reader = root.open(id)?;
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        Some(out)
    }

    #[test]
    fn normalizes_slashes_and_dots() {
        assert_eq!(normalize("/data//./a.txt"), "data/a.txt");
        assert_eq!(normalize("data/a.txt/"), "data/a.txt");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("///"), "");
    }

    #[test]
    fn joins_root_with_and_without_trailing_slash() {
        assert_eq!(join("data", "a.txt"), "data/a.txt");
        assert_eq!(join("data/", "a.txt"), "data/a.txt");
        assert_eq!(join("", "a.txt"), "a.txt");
        assert_eq!(join("data", "sub/a.txt"), "data/sub/a.txt");
    }

    #[test]
    fn splits_parent_and_leaf() {
        assert_eq!(split_parent("sub/dir/a.txt"), (Some("sub/dir"), "a.txt"));
        assert_eq!(split_parent("a.txt"), (None, "a.txt"));
    }

    #[test]
    fn memory_root_opens_by_normalized_id() {
        let root = MemoryRoot::new().with("data/a.txt", &b"alpha"[..]);
        assert_eq!(read_all(&root, "data/a.txt").unwrap(), b"alpha");
        assert_eq!(read_all(&root, "/data//a.txt").unwrap(), b"alpha");
        assert!(root.open("data/b.txt").is_none());
        assert!(root.contains("./data/a.txt"));
    }

    #[test]
    fn memory_root_insert_replaces_previous_content() {
        let mut root = MemoryRoot::new();
        assert!(root.insert("a", b"one".to_vec()).is_none());
        let previous = root.insert("a", b"two".to_vec()).unwrap();
        assert_eq!(&previous[..], b"one");
        assert_eq!(read_all(&root, "a").unwrap(), b"two");
        assert_eq!(root.len(), 1);
    }

    #[test]
    fn memory_root_collects_from_pairs() {
        let root: MemoryRoot = vec![("b", b"2".to_vec()), ("a", b"1".to_vec())]
            .into_iter()
            .collect();
        assert_eq!(root.ids().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn directory_root_reads_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("data").join("sub")).unwrap();
        fs::write(dir.path().join("data").join("sub").join("a.txt"), b"nested").unwrap();

        let root = DirectoryRoot::new(dir.path());
        assert_eq!(read_all(&root, "data/sub/a.txt").unwrap(), b"nested");
    }

    #[test]
    fn directory_root_treats_directories_and_missing_files_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("data")).unwrap();

        let root = DirectoryRoot::new(dir.path());
        assert!(root.open("data").is_none());
        assert!(root.open("data/missing.txt").is_none());
        assert!(root.open("").is_none());
    }

    #[test]
    fn directory_root_refuses_parent_segments() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("inner")).unwrap();
        fs::write(dir.path().join("secret.txt"), b"x").unwrap();

        let root = DirectoryRoot::new(dir.path().join("inner"));
        assert!(root.resolve("../secret.txt").is_none());
        assert!(root.open("../secret.txt").is_none());
        assert!(root.resolve("..\\secret.txt").is_none());
        assert!(root.resolve("C:\\secret.txt").is_none());
    }

    #[test]
    fn directory_root_resolves_below_its_base() {
        let root = DirectoryRoot::new("/srv/assets");
        assert_eq!(root.base(), Path::new("/srv/assets"));
        assert_eq!(
            root.resolve("/data//a.txt").unwrap(),
            Path::new("/srv/assets").join("data").join("a.txt")
        );
    }

    #[test]
    fn containment_requires_plain_segments() {
        assert!(is_contained("data/sub/a.txt"));
        assert!(is_contained("./data/a.txt"));
        assert!(!is_contained(""));
        assert!(!is_contained("/"));
        assert!(!is_contained("data/../a.txt"));
        assert!(!is_contained("..\\x"));
        assert!(!is_contained("C:\\evil"));
        assert!(!is_contained("data/sub\\..\\..\\x"));
    }

    #[test]
    fn references_and_boxes_are_roots() {
        let root = MemoryRoot::new().with("a", &b"x"[..]);
        let boxed: Box<dyn ResourceRoot> = Box::new(root.clone());
        assert_eq!(read_all(&&root, "a").unwrap(), b"x");
        assert_eq!(read_all(&boxed, "a").unwrap(), b"x");
    }
}
