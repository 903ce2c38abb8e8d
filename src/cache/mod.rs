//! On-disk page cache keyed by (shop, date, url).

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::slug::slugify;

/// Longest URL slug kept verbatim in a cache file name.
const MAX_SLUG_LEN: usize = 150;

#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// `root` is the page cache directory; one sub-directory per shop.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `{root}/{slug(shop)}/{date}_{slug(url)}.html`
    pub fn path_for(&self, shop: &str, date: &str, url: &str) -> PathBuf {
        let mut slug = slugify(url);
        if slug.len() > MAX_SLUG_LEN {
            slug.truncate(MAX_SLUG_LEN);
            slug = format!("{slug}-{:x}", md5::compute(url));
        }
        self.root
            .join(slugify(shop))
            .join(format!("{date}_{slug}.html"))
    }

    /// Cached payload, or `None` when the file does not exist.
    pub async fn load(&self, path: &Path) -> std::io::Result<Option<String>> {
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => {
                debug!("Cache hit: {}", path.display());
                Ok(Some(raw))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn store(&self, path: &Path, raw: &str) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            if !tokio::fs::try_exists(parent).await? {
                info!("Creating cache directory {}", parent.display());
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, raw).await
    }
}
