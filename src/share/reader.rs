//! Byte-range reads.

use std::io::SeekFrom;
use std::path::Path;

use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Read `[from, to)` of the file at `path`.
///
/// `to` is clamped to the file size and defaults to it. An empty or inverted
/// range, or an empty file, yields no bytes.
pub async fn read_range(path: &Path, from: u64, to: Option<u64>) -> std::io::Result<Vec<u8>> {
    let mut file = tokio::fs::File::open(path).await?;
    let size = file.metadata().await?.len();
    if size == 0 {
        return Ok(Vec::new());
    }

    let to = to.map_or(size, |to| to.min(size));
    let Some(len) = to.checked_sub(from).filter(|len| *len > 0) else {
        return Ok(Vec::new());
    };

    if from > 0 {
        file.seek(SeekFrom::Start(from)).await?;
    }
    let mut data = Vec::with_capacity(usize::try_from(len).unwrap_or(0));
    file.take(len).read_to_end(&mut data).await?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_read_ranges() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.a.txt");
        std::fs::write(&path, b"0123456789").unwrap();

        assert_eq!(read_range(&path, 0, None).await.unwrap(), b"0123456789");
        assert_eq!(read_range(&path, 2, Some(5)).await.unwrap(), b"234");
        assert_eq!(read_range(&path, 7, Some(100)).await.unwrap(), b"789");
        assert!(read_range(&path, 10, None).await.unwrap().is_empty());
        assert!(read_range(&path, 5, Some(5)).await.unwrap().is_empty());
        assert!(read_range(&path, 6, Some(3)).await.unwrap().is_empty());
        assert!(read_range(&path, 20, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.empty.txt");
        std::fs::write(&path, b"").unwrap();

        assert!(read_range(&path, 0, None).await.unwrap().is_empty());
        assert!(read_range(&path, 0, Some(10)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(read_range(&dir.path().join("nope"), 0, None).await.is_err());
    }
}
