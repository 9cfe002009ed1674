//! Local cache of item images, one file per image reference.

use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ImageCache {
    dir: PathBuf,
}

impl ImageCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path for an image reference. Only the final path component is used so
    /// a reference cannot point outside the cache directory.
    pub fn path(&self, image: &str) -> Option<PathBuf> {
        Path::new(image).file_name().map(|name| self.dir.join(name))
    }

    pub async fn save(&self, image: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = self
            .path(image)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty image name"))?;
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Deletes the cached file; returns false if there was nothing to delete.
    pub async fn remove(&self, image: &str) -> io::Result<bool> {
        let Some(path) = self.path(image) else {
            return Ok(false);
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_save_and_remove() {
        let temp_dir = tempdir().unwrap();
        let cache = ImageCache::new(temp_dir.path().join("images"));

        let path = cache.save("cola.png", b"png").await.unwrap();
        assert!(path.exists());

        assert!(cache.remove("cola.png").await.unwrap());
        assert!(!path.exists());
        assert!(!cache.remove("cola.png").await.unwrap());
    }

    #[test]
    fn test_path_strips_directories() {
        let cache = ImageCache::new("/cache");
        assert_eq!(
            cache.path("../../etc/passwd"),
            Some(PathBuf::from("/cache/passwd"))
        );
        assert_eq!(cache.path(".."), None);
    }
}
