//! Persisting rendered tables
//!
//! Overwrite permission is checked for every destination before the first
//! byte is written. Each table then goes through its own scoped file handle;
//! an I/O failure midway leaves the tables written before it on disk.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::core::error::{Error, Result};
use crate::core::export::RenderedTable;

/// Overwrite behavior for existing output files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwriteBehavior {
    /// Replace existing files
    Force,
    /// Never overwrite, fail if a file exists (default)
    #[default]
    NeverOverwrite,
}

/// Write every table into `dir`, returning the written paths in table order
pub fn write_tables(
    dir: &Path,
    tables: &[RenderedTable],
    overwrite: OverwriteBehavior,
) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::InvalidOutput(dir.to_path_buf()));
    }

    let paths: Vec<PathBuf> = tables.iter().map(|t| dir.join(t.file_name)).collect();
    for path in &paths {
        check_overwrite_permission(path, overwrite)?;
    }

    for (path, table) in paths.iter().zip(tables) {
        write_table(path, &table.contents)?;
        info!("Wrote {} ({} bytes)", path.display(), table.contents.len());
    }
    Ok(paths)
}

fn check_overwrite_permission(path: &Path, behavior: OverwriteBehavior) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    match behavior {
        OverwriteBehavior::Force => {
            warn!("Overwriting existing file: {}", path.display());
            Ok(())
        }
        OverwriteBehavior::NeverOverwrite => Err(Error::AlreadyExists(path.to_path_buf())),
    }
}

fn write_table(path: &Path, contents: &str) -> Result<()> {
    let to_write_error = |source: std::io::Error| Error::Write {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(to_write_error)?;
    let mut out = BufWriter::new(file);
    out.write_all(contents.as_bytes()).map_err(to_write_error)?;
    out.flush().map_err(to_write_error)
}
