//! File copy helpers.

use std::path::Path;
use tokio::io::AsyncReadExt;

use crate::error::{QuarryError, QuarryResult};

/// Options controlling `copy_file`
#[derive(Debug, Clone, Copy)]
pub struct CopyOptions {
    /// Compare contents before overwriting an existing destination
    pub check_content: bool,
    /// Only files up to this size are compared; 0 disables comparison
    pub file_check_content: u64,
    /// Read size used while comparing
    pub chunk_size: usize,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            check_content: true,
            file_check_content: 262_144,
            chunk_size: 4096,
        }
    }
}

/// Copy `source` to `dest`, skipping the write when `dest` already holds
/// identical content below the comparison threshold.
///
/// Returns `true` when bytes were written.
pub async fn copy_file(source: &Path, dest: &Path, options: &CopyOptions) -> QuarryResult<bool> {
    if options.check_content && options.file_check_content > 0 {
        if let Ok(dest_meta) = tokio::fs::metadata(dest).await {
            let src_meta = tokio::fs::metadata(source).await.map_err(|e| {
                QuarryError::io(format!("Failed to stat {}", source.display()), e)
            })?;
            let size = src_meta.len();
            if dest_meta.is_file()
                && dest_meta.len() == size
                && size <= options.file_check_content
                && same_content(source, dest, options.chunk_size).await?
            {
                tracing::debug!("{} already up to date", dest.display());
                return Ok(false);
            }
        }
    }

    tokio::fs::copy(source, dest).await.map_err(|e| {
        QuarryError::io(
            format!("Failed to copy {} to {}", source.display(), dest.display()),
            e,
        )
    })?;
    Ok(true)
}

async fn same_content(a: &Path, b: &Path, chunk_size: usize) -> QuarryResult<bool> {
    let open = |path: &Path| {
        let path = path.to_path_buf();
        async move {
            tokio::fs::File::open(&path)
                .await
                .map_err(|e| QuarryError::io(format!("Failed to open {}", path.display()), e))
        }
    };
    let mut left = open(a).await?;
    let mut right = open(b).await?;

    let chunk_size = chunk_size.max(1);
    let mut left_buf = vec![0u8; chunk_size];
    let mut right_buf = vec![0u8; chunk_size];
    loop {
        let n = read_full(&mut left, &mut left_buf, a).await?;
        let m = read_full(&mut right, &mut right_buf, b).await?;
        if n != m || left_buf[..n] != right_buf[..m] {
            return Ok(false);
        }
        if n == 0 {
            return Ok(true);
        }
    }
}

// Fill as much of `buf` as the file allows so both sides stay aligned
async fn read_full(file: &mut tokio::fs::File, buf: &mut [u8], path: &Path) -> QuarryResult<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let read = file
            .read(&mut buf[filled..])
            .await
            .map_err(|e| QuarryError::io(format!("Failed to read {}", path.display()), e))?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    Ok(filled)
}
