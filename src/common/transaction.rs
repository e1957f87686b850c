use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

/// An all-or-nothing replacement of one file.
///
/// Bytes go to a temporary file in the destination's directory; [`commit`]
/// syncs it and renames it over the destination. Until then the destination
/// is untouched, and dropping an uncommitted write deletes the temporary file.
///
/// [`commit`]: AtomicWrite::commit
#[derive(Debug)]
pub struct AtomicWrite {
    dest: PathBuf,
    temp: NamedTempFile,
}

impl AtomicWrite {
    /// Create the temporary file next to `dest`.
    ///
    /// A `dest` that is a symlink is resolved first, so the link keeps
    /// pointing at the file that gets replaced.
    pub fn begin(dest: &Path) -> io::Result<Self> {
        let resolved = resolve_link(dest)?;
        let dest = resolved.as_path();
        let dir = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let prefix = match dest.file_name() {
            Some(name) => format!(".{}.", name.to_string_lossy()),
            None => ".id3-mutate.".to_string(),
        };
        let temp = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".tmp")
            .tempfile_in(dir)?;
        log::debug!("Staging {} in {}", dest.display(), temp.path().display());
        Ok(AtomicWrite {
            dest: dest.to_path_buf(),
            temp,
        })
    }

    pub fn dest(&self) -> &Path {
        &self.dest
    }

    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    /// Flush, sync and rename the temporary file onto the destination.
    ///
    /// An existing destination's permissions carry over to the new file.
    /// On error the temporary file is removed and the destination is left as
    /// it was.
    pub fn commit(mut self) -> io::Result<()> {
        self.temp.flush()?;
        self.temp.as_file().sync_all()?;

        match fs::metadata(&self.dest) {
            Ok(meta) => fs::set_permissions(self.temp.path(), meta.permissions())?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        let AtomicWrite { dest, temp } = self;
        // PersistError hands the temp file back; dropping it deletes it
        temp.persist(&dest).map_err(|e| e.error)?;
        sync_parent_dir(&dest);
        Ok(())
    }
}

impl Write for AtomicWrite {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.temp.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.temp.flush()
    }
}

fn resolve_link(path: &Path) -> io::Result<PathBuf> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => {
            let target = fs::canonicalize(path)?;
            log::debug!("Writing through symlink {} to {}", path.display(), target.display());
            Ok(target)
        }
        _ => Ok(path.to_path_buf()),
    }
}

/// Make the rename itself durable. Best effort: not every platform or
/// filesystem supports syncing a directory.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) {
    let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return;
    };
    if let Err(e) = fs::File::open(dir).and_then(|d| d.sync_all()) {
        log::debug!("Could not sync directory {}: {}", dir.display(), e);
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) {}
