use std::fs;
use std::io::{self, BufWriter, Read, Write};

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::MefError;

/// Size of each slice written while streaming an archive to disk.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Copies `reader` into `writer` one fixed-size chunk at a time, then flushes.
pub fn copy_chunked<R: Read + ?Sized, W: Write + ?Sized>(
    reader: &mut R,
    writer: &mut W,
) -> Result<u64, MefError> {
    let mut writer = BufWriter::with_capacity(CHUNK_SIZE, writer);
    let mut chunk = vec![0u8; CHUNK_SIZE];
    let mut written = 0u64;
    loop {
        let read = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(MefError::CatalogHttp(format!("read archive stream: {err}"))),
        };
        writer
            .write_all(&chunk[..read])
            .map_err(|err| MefError::Filesystem(err.to_string()))?;
        written += read as u64;
    }
    writer
        .flush()
        .map_err(|err| MefError::Filesystem(err.to_string()))?;
    Ok(written)
}

/// Creates the output directory if needed.
pub fn ensure_dir(dir: &Utf8Path) -> Result<Utf8PathBuf, MefError> {
    fs::create_dir_all(dir.as_std_path())
        .map_err(|err| MefError::Filesystem(format!("create {dir}: {err}")))?;
    Ok(dir.to_path_buf())
}
