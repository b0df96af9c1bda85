//! I/O helpers for asset persistence.

use std::io::{ErrorKind, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::RttiError;

/// Maps an I/O error onto the persistence error variants.
pub fn classify_io_error(error: std::io::Error, context: &str) -> RttiError {
    match error.kind() {
        ErrorKind::StorageFull | ErrorKind::OutOfMemory => {
            RttiError::DiskFull(format!("{}: {}", context, error))
        }
        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted => {
            RttiError::TransientIoError(format!("{}: {}", context, error))
        }
        _ => RttiError::IoError(format!("{}: {}", context, error)),
    }
}

/// Runs `operation`, retrying transient I/O errors up to `max_retries` times.
pub fn retry_io_operation<F, T>(
    operation: F,
    max_retries: u32,
    retry_delay_ms: u64,
    context: &str,
) -> Result<T, RttiError>
where
    F: Fn() -> Result<T, RttiError>,
{
    let mut attempt = 0;
    loop {
        match operation() {
            Ok(result) => return Ok(result),
            Err(RttiError::TransientIoError(message)) if attempt < max_retries => {
                attempt += 1;
                tracing::warn!(
                    "Transient I/O error in {} (attempt {}/{}): {}",
                    context,
                    attempt,
                    max_retries,
                    message
                );
                if retry_delay_ms > 0 {
                    std::thread::sleep(std::time::Duration::from_millis(retry_delay_ms));
                }
            }
            Err(err) => return Err(err),
        }
    }
}

/// Writes `bytes` to `path` through a synced temporary file and a rename.
///
/// Each call writes its own uniquely named temporary file in the target
/// directory, so concurrent writers never share one.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), RttiError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)
        .map_err(|e| classify_io_error(e, "Failed to create temp file"))?;
    file.write_all(bytes)
        .map_err(|e| classify_io_error(e, "Failed to write temp file"))?;
    file.as_file()
        .sync_all()
        .map_err(|e| classify_io_error(e, "Failed to sync temp file"))?;

    file.persist(path)
        .map_err(|e| classify_io_error(e.error, "Failed to rename temp file"))?;
    Ok(())
}

/// CRC32 of `bytes`.
pub fn checksum(bytes: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(bytes);
    hasher.finalize()
}
