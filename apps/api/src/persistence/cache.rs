use std::io;
use std::path::PathBuf;

use async_trait::async_trait;

/// Well-known key holding the serialized CV document.
pub const CV_DATA_KEY: &str = "cvBuilderData";
/// Well-known key holding the serialized template selection.
pub const TEMPLATE_KEY: &str = "cvBuilderTemplate";

/// Local key-value cache used only as a fallback for the remote store.
#[async_trait]
pub trait LocalCache: Send + Sync {
    async fn get(&self, key: &str) -> io::Result<Option<String>>;
    async fn put(&self, key: &str, value: &str) -> io::Result<()>;
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl LocalCache for FileCache {
    async fn get(&self, key: &str) -> io::Result<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn put(&self, key: &str, value: &str) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        // Write-then-rename so a crash never leaves a half-written file behind.
        let target = self.path_for(key);
        let staging = self.dir.join(format!(".{key}.json.tmp"));
        tokio::fs::write(&staging, value).await?;
        tokio::fs::rename(&staging, &target).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());
        assert_eq!(cache.get(CV_DATA_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path().join("nested"));
        cache.put(TEMPLATE_KEY, "\"modern\"").await.unwrap();
        assert_eq!(
            cache.get(TEMPLATE_KEY).await.unwrap().as_deref(),
            Some("\"modern\"")
        );
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());
        cache.put(CV_DATA_KEY, "{}").await.unwrap();
        cache.put(CV_DATA_KEY, "{\"skills\":[]}").await.unwrap();
        assert_eq!(
            cache.get(CV_DATA_KEY).await.unwrap().as_deref(),
            Some("{\"skills\":[]}")
        );
    }
}
