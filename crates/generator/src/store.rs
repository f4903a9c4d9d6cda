use anyhow::{Context, Result};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::fingerprint::FINGERPRINT_LEN;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "webp"];

/// An image already present in the output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingImage {
    pub file_name: String,
    /// File name without extension and fingerprint suffix
    pub slug: String,
}

/// Flat directory of generated OG images and the web path it is served under
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
    public_path: String,
}

impl ImageStore {
    /// Open the store, creating the directory if it does not exist yet
    pub fn open(dir: impl Into<PathBuf>, public_path: impl Into<String>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        Ok(Self {
            dir,
            public_path: public_path.into(),
        })
    }

    /// Same as [`ImageStore::open`] but never touches the filesystem
    pub fn at(dir: impl Into<PathBuf>, public_path: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            public_path: public_path.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    pub fn contains(&self, file_name: &str) -> bool {
        self.path_of(file_name).is_file()
    }

    pub fn web_path(&self, file_name: &str) -> String {
        format!("{}/{}", self.public_path, file_name)
    }

    /// Map a linked web path (e.g. "/og-images/foo-1a2b3c4d.png") back to a file
    pub fn file_for_web_path(&self, web_path: &str) -> Option<PathBuf> {
        let file_name = web_path
            .strip_prefix(&self.public_path)?
            .strip_prefix('/')?;
        if file_name.is_empty() || file_name.contains('/') || file_name.contains("..") {
            return None;
        }
        Some(self.path_of(file_name))
    }

    /// Images currently on disk, sorted by file name
    pub fn existing(&self) -> Result<Vec<ExistingImage>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", self.dir.display()));
            }
        };

        let mut images: Vec<ExistingImage> = entries
            .flatten()
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| {
                let file_name = entry.file_name().to_str()?.to_string();
                let slug = image_slug(&file_name)?;
                Some(ExistingImage { file_name, slug })
            })
            .collect();
        images.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(images)
    }

    /// Write through a temp file in the same directory, then rename, so a
    /// crash never leaves a truncated image that later looks cached.
    pub fn write_atomic(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let target = self.path_of(file_name);
        write_file_atomic(&target, bytes)?;
        Ok(target)
    }
}

/// Replace `target` in one step: temp file in the same directory, then rename.
///
/// The result keeps the mode of the file it replaces. New files get 0644
/// rather than the temp file's owner-only mode.
pub fn write_file_atomic(target: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    temp.write_all(bytes)
        .with_context(|| format!("Failed to write {}", target.display()))?;

    let permissions = match fs::metadata(target) {
        Ok(metadata) => Some(metadata.permissions()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => new_file_permissions(),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to stat {}", target.display()));
        }
    };
    if let Some(permissions) = permissions {
        temp.as_file()
            .set_permissions(permissions)
            .with_context(|| format!("Failed to set permissions for {}", target.display()))?;
    }

    temp.persist(target)
        .with_context(|| format!("Failed to persist {}", target.display()))?;
    Ok(())
}

#[cfg(unix)]
fn new_file_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<fs::Permissions> {
    None
}

/// "foo-1a2b3c4d.png" → "foo"; "foo.webp" → "foo"; non-images → None
pub fn image_slug(file_name: &str) -> Option<String> {
    let (stem, extension) = file_name.rsplit_once('.')?;
    if !IMAGE_EXTENSIONS.contains(&extension) {
        return None;
    }

    let slug = match stem.rsplit_once('-') {
        Some((slug, suffix))
            if suffix.len() == FINGERPRINT_LEN
                && suffix.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')) =>
        {
            slug
        }
        _ => stem,
    };
    Some(slug.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_image_slug() {
        assert_eq!(image_slug("foo-1a2b3c4d.png").as_deref(), Some("foo"));
        assert_eq!(image_slug("my-post-00ff00ff.jpg").as_deref(), Some("my-post"));
        assert_eq!(image_slug("legacy.webp").as_deref(), Some("legacy"));
        // Not a fingerprint: wrong length or uppercase
        assert_eq!(image_slug("foo-bar.png").as_deref(), Some("foo-bar"));
        assert_eq!(image_slug("foo-1A2B3C4D.png").as_deref(), Some("foo-1A2B3C4D"));
        assert_eq!(image_slug("notes.txt"), None);
        assert_eq!(image_slug("no-extension"), None);
    }

    #[test]
    fn test_open_creates_directory() {
        let dir = TempDir::new().unwrap();
        let store = ImageStore::open(dir.path().join("public/og-images"), "/og-images").unwrap();
        assert!(store.dir().is_dir());
        assert!(store.existing().unwrap().is_empty());
    }

    #[test]
    fn test_existing_lists_images_only_sorted() {
        let dir = TempDir::new().unwrap();
        for name in ["b-11111111.png", "a-22222222.webp", "readme.md"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("nested.png")).unwrap();

        let store = ImageStore::at(dir.path(), "/og-images");
        let existing = store.existing().unwrap();
        assert_eq!(
            existing,
            vec![
                ExistingImage {
                    file_name: "a-22222222.webp".to_string(),
                    slug: "a".to_string()
                },
                ExistingImage {
                    file_name: "b-11111111.png".to_string(),
                    slug: "b".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_web_path_round_trip() {
        let store = ImageStore::at("/site/public/og-images", "/og-images");
        let web = store.web_path("foo-1a2b3c4d.png");
        assert_eq!(web, "/og-images/foo-1a2b3c4d.png");
        assert_eq!(
            store.file_for_web_path(&web),
            Some(PathBuf::from("/site/public/og-images/foo-1a2b3c4d.png"))
        );
        assert_eq!(store.file_for_web_path("/elsewhere/foo.png"), None);
        assert_eq!(store.file_for_web_path("/og-images/../secret.png"), None);
        assert_eq!(store.file_for_web_path("/og-images/"), None);
    }

    #[test]
    fn test_write_atomic() {
        let dir = TempDir::new().unwrap();
        let store = ImageStore::at(dir.path(), "/og-images");
        let path = store.write_atomic("foo-1a2b3c4d.png", b"png bytes").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"png bytes");
        assert!(store.contains("foo-1a2b3c4d.png"));
        // Only the final file remains
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[cfg(unix)]
    fn mode(path: &Path) -> u32 {
        use std::os::unix::fs::PermissionsExt;
        fs::metadata(path).unwrap().permissions().mode() & 0o777
    }

    #[cfg(unix)]
    #[test]
    fn test_write_atomic_new_file_is_world_readable() {
        let dir = TempDir::new().unwrap();
        let store = ImageStore::at(dir.path(), "/og-images");
        let path = store.write_atomic("foo-1a2b3c4d.png", b"png bytes").unwrap();
        assert_eq!(mode(&path), 0o644);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_file_atomic_keeps_existing_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("posts.toml");
        fs::write(&path, "old").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

        write_file_atomic(&path, b"new").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        assert_eq!(mode(&path), 0o640);
    }
}
