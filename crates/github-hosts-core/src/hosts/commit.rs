// # Atomic Commit
//
// Replace a file so that readers see either the old content or the new
// content, never a partial write.
//
// 1. Write the new content to a temporary file in the same directory
// 2. Flush and sync it
// 3. Copy the permissions of the file being replaced
// 4. Rename the temporary file over the target
//
// The rename is atomic only within a single filesystem, which is why the
// temporary file sits next to the target.

use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};

/// Atomically replace `path` with `content`.
///
/// On any failure the temporary file is removed and `path` is untouched.
pub async fn commit(path: &Path, content: impl AsRef<[u8]>) -> Result<()> {
    let temp_path = temp_path(path);

    if let Err(e) = write_temp(path, &temp_path, content.as_ref()).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e);
    }

    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(Error::write(path, e));
    }

    tracing::debug!(path = %path.display(), "Committed file");
    Ok(())
}

async fn write_temp(target: &Path, temp_path: &Path, content: &[u8]) -> Result<()> {
    let mut file = fs::File::create(temp_path)
        .await
        .map_err(|e| Error::write(temp_path, e))?;

    file.write_all(content)
        .await
        .map_err(|e| Error::write(temp_path, e))?;
    file.flush().await.map_err(|e| Error::write(temp_path, e))?;
    file.sync_all().await.map_err(|e| Error::write(temp_path, e))?;
    drop(file);

    // Keep the mode of the file being replaced (hosts is usually 0644)
    match fs::metadata(target).await {
        Ok(metadata) => fs::set_permissions(temp_path, metadata.permissions())
            .await
            .map_err(|e| Error::write(temp_path, e))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(Error::read(target, e)),
    }

    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    path.with_file_name(format!(".{name}.github-hosts.tmp"))
}
