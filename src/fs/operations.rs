use std::{
    ffi::OsString,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::Result;
use fs4::tokio::AsyncFileExt;
use serde::{de::DeserializeOwned, Serialize};
use tokio::{
    fs::{File, OpenOptions},
    io::{AsyncReadExt, AsyncWriteExt},
};
use tracing::debug;

/// Result of reading a JSON document that might not be there or might have been cut off.
#[derive(Debug)]
pub enum JsonFile<T> {
    Missing,
    Corrupt(serde_json::Error),
    Loaded(T),
}

impl<T> JsonFile<T> {
    /// Missing and corrupt documents both count as absent data.
    pub fn into_option(self) -> Option<T> {
        match self {
            JsonFile::Loaded(v) => Some(v),
            JsonFile::Missing | JsonFile::Corrupt(_) => None,
        }
    }
}

/// Reads a whole JSON document under a shared lock. Only unexpected I/O errors are returned as
/// errors, parse failures are reported through [JsonFile::Corrupt].
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<JsonFile<T>> {
    debug!("Reading {path:?}");
    let mut file = match File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(JsonFile::Missing),
        Err(e) => return Err(e.into()),
    };

    file.lock_shared()?;
    let mut content = Vec::new();
    let read = file.read_to_end(&mut content).await;
    file.unlock_async().await?;
    read?;

    Ok(match serde_json::from_slice::<T>(&content) {
        Ok(v) => JsonFile::Loaded(v),
        Err(e) => JsonFile::Corrupt(e),
    })
}

/// Replaces the document at `path` as a whole. The data is written into a sibling file first and
/// then renamed over the target, so readers either see the old or the new document.
///
/// Writers from different processes are serialized through an exclusive lock on a stable
/// `<name>.lock` sibling, taken before anything is created or truncated.
pub async fn write_json_atomically<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|v| !v.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut buffer = serde_json::to_vec_pretty(value)?;
    buffer.push(b'\n');

    let lock = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(sibling_path(path, "lock"))
        .await?;
    lock.lock_exclusive()?;
    let written = replace_with(path, &buffer).await;
    lock.unlock_async().await?;
    written
}

async fn replace_with(path: &Path, buffer: &[u8]) -> Result<()> {
    let temporary = temporary_path(path);
    let mut file = File::create(&temporary).await?;
    file.write_all(buffer).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&temporary, path).await?;
    Ok(())
}

/// Unique per process, so concurrent writers never truncate each other's data.
fn temporary_path(path: &Path) -> PathBuf {
    sibling_path(path, &format!("{}.tmp", std::process::id()))
}

fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("document"));
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use serde::{Deserialize, Serialize};
    use tempfile::tempdir;

    use super::{read_json, sibling_path, temporary_path, write_json_atomically, JsonFile};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Document {
        value: u32,
    }

    #[tokio::test]
    async fn test_read_missing() -> Result<()> {
        let dir = tempdir()?;
        let result = read_json::<Document>(&dir.path().join("nothing.json")).await?;
        assert!(matches!(result, JsonFile::Missing));
        Ok(())
    }

    #[tokio::test]
    async fn test_read_corrupt() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{\"value\": 1")?;
        let result = read_json::<Document>(&path).await?;
        assert!(matches!(result, JsonFile::Corrupt(_)));
        Ok(())
    }

    #[tokio::test]
    async fn test_write_then_read() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("doc.json");
        write_json_atomically(&path, &Document { value: 3 }).await?;
        write_json_atomically(&path, &Document { value: 4 }).await?;

        let result = read_json::<Document>(&path).await?.into_option();
        assert_eq!(result, Some(Document { value: 4 }));
        assert!(!temporary_path(&path).exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_write_ignores_stale_temporary_files() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("doc.json");
        // Left behind by a writer that crashed halfway.
        std::fs::write(temporary_path(&path), "{\"val")?;
        std::fs::write(sibling_path(&path, "lock"), "")?;

        write_json_atomically(&path, &Document { value: 5 }).await?;

        let result = read_json::<Document>(&path).await?.into_option();
        assert_eq!(result, Some(Document { value: 5 }));
        assert!(!temporary_path(&path).exists());
        assert!(sibling_path(&path, "lock").exists());
        assert!(temporary_path(&path)
            .to_string_lossy()
            .ends_with(&format!("doc.json.{}.tmp", std::process::id())));
        Ok(())
    }
}
