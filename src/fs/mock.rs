use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir(Vec<String>), // List of child names
}

/// In-memory filesystem for tests.
///
/// Unlike [`MockFileSystem::add_file`], [`FileSystem::write`] is strict: the
/// parent directory has to exist, just like on a real disk. Every successful
/// `write` is also recorded so tests can assert on what the engine emitted.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
    writes: Arc<Mutex<Vec<PathBuf>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut files = HashMap::new();
        // Ensure root exists
        files.insert(PathBuf::from("."), MockEntry::Dir(Vec::new()));

        Self {
            files: Arc::new(Mutex::new(files)),
            writes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Seed a file, creating its parent directories implicitly.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let mut files = lock(&self.files);
        insert_file(&mut files, path.as_ref(), content.into());
    }

    /// Paths passed to successful `write` calls, in call order.
    pub fn writes(&self) -> Vec<PathBuf> {
        lock(&self.writes).clone()
    }

    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        match lock(&self.files).get(path.as_ref()) {
            Some(MockEntry::File(bytes)) => Some(bytes.clone()),
            _ => None,
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn parent_of(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn link_child(files: &mut HashMap<PathBuf, MockEntry>, parent: &Path, child: &Path) {
    if let Some(MockEntry::Dir(children)) = files.get_mut(parent) {
        if let Some(name) = child.file_name().and_then(|n| n.to_str()) {
            if !children.iter().any(|c| c == name) {
                children.push(name.to_string());
            }
        }
    }
}

fn ensure_dir_entry(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    if files.contains_key(path) {
        return;
    }
    files.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
    let parent = parent_of(path);
    if parent != path {
        // Avoid infinite loop at root
        ensure_dir_entry(files, parent);
        link_child(files, parent, path);
    }
}

fn insert_file(files: &mut HashMap<PathBuf, MockEntry>, path: &Path, content: Vec<u8>) {
    files.insert(path.to_path_buf(), MockEntry::File(content));
    let parent = parent_of(path);
    ensure_dir_entry(files, parent);
    link_child(files, parent, path);
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let files = lock(&self.files);
        match files.get(path) {
            Some(MockEntry::File(content)) => Ok(content.clone()),
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let mut files = lock(&self.files);
        let parent = parent_of(path);
        if !matches!(files.get(parent), Some(MockEntry::Dir(_))) {
            return Err(anyhow!("Parent directory does not exist: {:?}", parent));
        }
        insert_file(&mut files, path, contents.to_vec());
        lock(&self.writes).push(path.to_path_buf());
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut files = lock(&self.files);
        if let Some(MockEntry::File(_)) = files.get(path) {
            return Err(anyhow!("Is a file: {:?}", path));
        }
        ensure_dir_entry(&mut files, path);
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        let mut files = lock(&self.files);
        if !matches!(files.get(path), Some(MockEntry::Dir(_))) {
            return Err(anyhow!("Not a directory or not found: {:?}", path));
        }
        files.retain(|p, _| !p.starts_with(path));
        if let Some(MockEntry::Dir(children)) = files.get_mut(parent_of(path)) {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                children.retain(|c| c != name);
            }
        }
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        lock(&self.files).contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(lock(&self.files).get(path), Some(MockEntry::File(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(lock(&self.files).get(path), Some(MockEntry::Dir(_)))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let files = lock(&self.files);
        match files.get(path) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_requires_existing_parent() {
        let fs = MockFileSystem::new();
        let target = Path::new("out/posts/a.html");

        assert!(fs.write(target, b"x").is_err());
        fs.create_dir_all(Path::new("out/posts")).unwrap();
        fs.write(target, b"x").unwrap();

        assert_eq!(fs.contents(target), Some(b"x".to_vec()));
        assert_eq!(fs.writes(), vec![target.to_path_buf()]);
        assert_eq!(fs.read_dir(Path::new("out")).unwrap(), vec![PathBuf::from("out/posts")]);
    }

    #[test]
    fn remove_dir_all_drops_the_subtree() {
        let fs = MockFileSystem::new();
        fs.add_file("site/a/b.txt", "b");
        fs.add_file("keep.txt", "k");

        fs.remove_dir_all(Path::new("site")).unwrap();
        assert!(!fs.exists(Path::new("site/a/b.txt")));
        assert!(!fs.exists(Path::new("site")));
        assert!(fs.is_file(Path::new("keep.txt")));
        assert_eq!(fs.read_dir(Path::new(".")).unwrap(), vec![PathBuf::from("./keep.txt")]);
    }
}
