use anyhow::Result;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use std::path::{Path, PathBuf};
use tokio::{fs, io::AsyncWriteExt};

/// One row per stored photo: the namespace-relative filename and the
/// perceptual hash computed at upload time.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PhotoRecord {
    pub filename: String,
    pub ahash: String,
}

/// Name a photo is stored under: hex sha256 of the original name plus the
/// original extension. Deterministic, so the same original name always maps
/// to the same stored file.
pub fn stored_filename(original_name: &str) -> String {
    let digest = Sha256::digest(original_name.as_bytes());
    let ext = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    format!("{}{}", hex::encode(digest), ext)
}

/// Photo metadata rows, scoped per user.
#[derive(Clone)]
pub struct PhotoStore {
    pool: PgPool,
}

impl PhotoStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The user's storage namespace.
    pub async fn user_hash(&self, user_id: i32) -> Result<String> {
        let userhash = sqlx::query_scalar("SELECT userhash FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(userhash)
    }

    /// Upsert keyed on (user, filename): re-uploading the same original name
    /// replaces the earlier record instead of failing the unique index.
    pub async fn insert_photo(&self, user_id: i32, filename: &str, ahash: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO photos (user_id, filename, ahash) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, filename) DO UPDATE SET ahash = EXCLUDED.ahash",
        )
        .bind(user_id)
        .bind(filename)
        .bind(ahash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn photos_for_user(&self, user_id: i32) -> Result<Vec<PhotoRecord>> {
        let records = sqlx::query_as::<_, PhotoRecord>(
            "SELECT filename, ahash FROM photos WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }
}

/// Image bytes on disk, one subdirectory per user namespace.
#[derive(Clone)]
pub struct ImageStore {
    resource_dir: PathBuf,
}

impl ImageStore {
    pub fn new(resource_dir: PathBuf) -> Self {
        Self { resource_dir }
    }

    pub fn resource_dir(&self) -> &Path {
        &self.resource_dir
    }

    pub fn image_path(&self, userhash: &str, filename: &str) -> PathBuf {
        self.resource_dir.join(userhash).join(filename)
    }

    /// Write via tmp file + rename so a crashed upload never leaves a partial
    /// image at the final path.
    pub async fn write_image(&self, userhash: &str, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        let dir = self.resource_dir.join(userhash);
        fs::create_dir_all(&dir).await?;

        let tmp = dir.join(format!("{filename}.tmp"));
        let dst = dir.join(filename);
        {
            let mut f = fs::File::create(&tmp).await?;
            f.write_all(bytes).await?;
            let _ = f.sync_all().await; // best-effort
        }
        fs::rename(&tmp, &dst).await?;
        Ok(dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_filename_is_deterministic() {
        assert_eq!(stored_filename("IMG_0001.jpg"), stored_filename("IMG_0001.jpg"));
        assert_ne!(stored_filename("IMG_0001.jpg"), stored_filename("IMG_0002.jpg"));
    }

    #[test]
    fn stored_filename_keeps_extension() {
        let name = stored_filename("holiday.png");
        assert!(name.ends_with(".png"));
        assert_eq!(name.len(), 64 + ".png".len());
    }

    #[test]
    fn stored_filename_without_extension() {
        let name = stored_filename("rawfile");
        assert_eq!(name.len(), 64);
        assert!(name.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn write_image_lands_under_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path().to_path_buf());

        let path = store.write_image("u123", "abc.jpg", b"pixels").await.unwrap();
        assert_eq!(path, dir.path().join("u123").join("abc.jpg"));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"pixels");
        assert!(!dir.path().join("u123").join("abc.jpg.tmp").exists());
    }

    #[tokio::test]
    async fn write_image_overwrites_existing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path().to_path_buf());

        store.write_image("u123", "abc.jpg", b"old").await.unwrap();
        let path = store.write_image("u123", "abc.jpg", b"new").await.unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"new");
    }
}
