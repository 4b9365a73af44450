//! tar.gz archival of the registry storage directory.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};

use imgsync_core::error::io_err;
use imgsync_core::{ArchiveInfo, Archiver, SourceError};

#[derive(Debug, Clone)]
pub struct TarGzArchiver {
    source: PathBuf,
    out_dir: PathBuf,
}

impl TarGzArchiver {
    /// Archive `source` into files under `out_dir`.
    pub fn new(source: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            out_dir: out_dir.into(),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}

/// Name of the top-level directory inside the archive.
fn archive_root(source: &Path) -> PathBuf {
    source
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("registry"))
}

/// Write `source` as a gzip-compressed tarball at `output`.
pub fn write_tar_gz(source: &Path, output: &Path) -> Result<(), SourceError> {
    if !source.is_dir() {
        return Err(io_err(
            source,
            io::Error::new(io::ErrorKind::NotFound, "archive source is not a directory"),
        ));
    }
    let file = File::create(output).map_err(|e| io_err(output, e))?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);
    builder
        .append_dir_all(archive_root(source), source)
        .map_err(|e| io_err(source, e))?;
    let encoder = builder.into_inner().map_err(|e| io_err(output, e))?;
    encoder.finish().map_err(|e| io_err(output, e))?;
    Ok(())
}

/// Hex SHA-256 digest of a file's contents.
pub fn sha256_file(path: &Path) -> Result<String, SourceError> {
    let mut file = File::open(path).map_err(|e| io_err(path, e))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|e| io_err(path, e))?;
    Ok(hex::encode(hasher.finalize()))
}

fn archive_blocking(
    source: &Path,
    out_dir: &Path,
    file_name: &str,
) -> Result<ArchiveInfo, SourceError> {
    std::fs::create_dir_all(out_dir).map_err(|e| io_err(out_dir, e))?;
    let path = out_dir.join(file_name);
    write_tar_gz(source, &path)?;
    let size_bytes = std::fs::metadata(&path).map_err(|e| io_err(&path, e))?.len();
    let sha256 = sha256_file(&path)?;
    Ok(ArchiveInfo {
        path,
        file_name: file_name.to_string(),
        size_bytes,
        sha256,
    })
}

#[async_trait]
impl Archiver for TarGzArchiver {
    async fn archive(&self, file_name: &str) -> Result<ArchiveInfo, SourceError> {
        let source = self.source.clone();
        let out_dir = self.out_dir.clone();
        let name = file_name.to_string();
        tracing::info!(source = %source.display(), file = %name, "archiving");

        let info = tokio::task::spawn_blocking(move || archive_blocking(&source, &out_dir, &name))
            .await
            .map_err(|e| io_err(&self.source, io::Error::other(e)))??;

        tracing::info!(
            file = %info.path.display(),
            size_bytes = info.size_bytes,
            sha256 = %info.sha256,
            "archive written",
        );
        Ok(info)
    }
}
