use crate::{
    error::{Error, Result},
    fetch::Transport,
};
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Read, Seek, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};
use url::Url;
use zip::ZipArchive;

/// Download `url` into a fresh `<prefix>-*.zip` file under `dir`.
///
/// The file is deleted when the returned handle drops, so an error anywhere
/// downstream never leaves an archive behind.
#[instrument(level = "debug", skip(transport, dir))]
pub fn download_archive<T: Transport>(
    transport: &T,
    url: &Url,
    dir: &Path,
    prefix: &str,
) -> Result<(NamedTempFile, u64)> {
    let mut archive = tempfile::Builder::new()
        .prefix(&format!("{prefix}-"))
        .suffix(".zip")
        .tempfile_in(dir)
        .map_err(Error::io(dir))?;

    let bytes = {
        let mut writer = BufWriter::new(archive.as_file_mut());
        let bytes = transport.download(url, &mut writer)?;
        writer.flush().map_err(Error::io(dir))?;
        bytes
    };
    debug!(bytes, path = %archive.path().display(), "archive written");
    Ok((archive, bytes))
}

/// Relative path of the first member whose name ends in `.csv`, any case.
/// Members whose names would escape the extraction directory are ignored.
pub fn find_csv_member<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> zip::result::ZipResult<Option<PathBuf>> {
    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i)?;
        if !entry.is_dir() && entry.name().to_lowercase().ends_with(".csv") {
            if let Some(path) = entry.enclosed_name() {
                return Ok(Some(path));
            }
        }
    }
    Ok(None)
}

/// Extract every member of `archive_path` into `entry_dir`, placing the first
/// CSV member at `target`. Returns that member's name inside the archive.
///
/// Members are unpacked into a staging directory first and the CSV is renamed
/// into place last, so `target` never exists half-written.
#[instrument(level = "info", skip_all, fields(archive = %archive_path.display()))]
pub fn extract_csv(
    archive_path: &Path,
    entry_dir: &Path,
    target: &Path,
    table_id: &str,
) -> Result<String> {
    let archive_err = |source| Error::Archive {
        path: archive_path.to_path_buf(),
        source,
    };
    let file = File::open(archive_path).map_err(Error::io(archive_path))?;
    let mut archive = ZipArchive::new(BufReader::new(file)).map_err(archive_err)?;

    let member = find_csv_member(&mut archive)
        .map_err(archive_err)?
        .ok_or_else(|| Error::NoCsvMember {
            table_id: table_id.to_string(),
        })?;

    let staging = tempfile::Builder::new()
        .prefix(".staging-")
        .tempdir_in(entry_dir)
        .map_err(Error::io(entry_dir))?;
    archive.extract(staging.path()).map_err(archive_err)?;

    let staged = staging.path().join(&member);
    fs::rename(&staged, target).map_err(Error::io(target))?;
    info!(member = %member.display(), target = %target.display(), "extracted");

    // Whatever else shipped in the archive (e.g. the metadata CSV) sits
    // alongside the canonical file.
    for item in fs::read_dir(staging.path()).map_err(Error::io(staging.path()))? {
        let item = item.map_err(Error::io(staging.path()))?;
        if is_empty_dir(&item.path()) {
            continue;
        }
        let dest = entry_dir.join(item.file_name());
        if let Err(e) = replace(&item.path(), &dest) {
            warn!(member = %dest.display(), error = %e, "could not keep archive member");
        }
    }

    staging.close().map_err(Error::io(entry_dir))?;
    Ok(member.to_string_lossy().into_owned())
}

fn is_empty_dir(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}

fn replace(from: &Path, to: &Path) -> std::io::Result<()> {
    if to.is_file() {
        fs::remove_file(to)?;
    } else if to.is_dir() {
        fs::remove_dir_all(to)?;
    }
    fs::rename(from, to)
}
