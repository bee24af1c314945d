//! File-level collaborators: the line source and the CSV sink.

use std::{
    fs::{self, File, Permissions},
    io::{self, BufRead, BufReader, Write},
    path::Path,
};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::{
    core::reducer::AveragePrice,
    error::{Error, Result},
};

/// Physical line number of the first data line (the header is line 1).
pub const FIRST_DATA_LINE: usize = 2;

pub const OUTPUT_HEADER: [&str; 3] = ["make", "model", "avg_price"];

/// Reads every line after the header, in file order.
///
/// Lines are returned as raw bytes without the trailing `\n`; decoding is
/// left to the map units so a bad line is reported with its line number.
pub fn read_lines(path: &Path) -> Result<Vec<Vec<u8>>> {
    let read_err = |source: io::Error| {
        if source.kind() == io::ErrorKind::NotFound {
            Error::InputNotFound {
                path: path.to_path_buf(),
            }
        } else {
            Error::InputRead {
                path: path.to_path_buf(),
                source,
            }
        }
    };

    let file = File::open(path).map_err(read_err)?;
    let lines = BufReader::new(file)
        .split(b'\n')
        .skip(1)
        .collect::<io::Result<Vec<_>>>()
        .map_err(read_err)?;
    debug!(path = %path.display(), lines = lines.len(), "input read");
    Ok(lines)
}

/// Writes the header and one row per group, prices with two decimals.
///
/// Rows go to a temporary file next to `path` which then replaces `path`,
/// so a failure never leaves a half-written output behind.
pub fn write_averages(path: &Path, rows: &[AveragePrice]) -> Result<()> {
    let write_err = |source: io::Error| Error::OutputWrite {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let tmp = NamedTempFile::new_in(dir).map_err(write_err)?;

    let mut writer = csv::Writer::from_writer(tmp);
    writer.write_record(OUTPUT_HEADER)?;
    for row in rows {
        let avg_price = format!("{:.2}", row.avg_price);
        writer.write_record([row.make.as_str(), row.model.as_str(), avg_price.as_str()])?;
    }
    let mut tmp = writer
        .into_inner()
        .map_err(|e| write_err(e.into_error()))?;
    tmp.flush().map_err(write_err)?;
    if let Some(permissions) = output_permissions(path) {
        tmp.as_file()
            .set_permissions(permissions)
            .map_err(write_err)?;
    }
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    debug!(path = %path.display(), rows = rows.len(), "output written");
    Ok(())
}

/// Mode the output should end up with: the replaced file's, or 0644 for a
/// new one. Temp files are created owner-only.
fn output_permissions(path: &Path) -> Option<Permissions> {
    match fs::metadata(path) {
        Ok(meta) => Some(meta.permissions()),
        Err(_) => new_file_permissions(),
    }
}

#[cfg(unix)]
fn new_file_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<Permissions> {
    None
}
