use std::io::ErrorKind;
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};

use super::StoreError;

/// Ids become file names, so anything that could escape the directory is refused.
pub fn validate_id(id: &str) -> Result<(), StoreError> {
    let bad = id.is_empty()
        || id.starts_with('.')
        || id.contains("..")
        || id.contains(['/', '\\', '\0']);
    if bad {
        return Err(StoreError::InvalidId(id.to_string()));
    }
    Ok(())
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// `Ok(None)` when the file does not exist.
pub async fn read_text(path: &Path) -> Result<Option<String>, StoreError> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_error(path, err)),
    }
}

pub async fn write_text(path: &Path, contents: &str) -> Result<(), StoreError> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|err| io_error(path, err))
}

pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let Some(contents) = read_text(path).await? else {
        return Ok(None);
    };
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })
}

pub async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let contents = serde_json::to_string_pretty(value).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    write_text(path, &contents).await
}
