//! The mutation engine: read a file, merge artist/title/album into its ID3v2
//! tag and commit the result atomically, in place or as an export copy.
//!
//! Every call is independent. The engine keeps no state between calls and
//! takes no locks; callers that edit the same path concurrently must
//! serialize those calls themselves ([`Mutator::mutate_batch`] refuses such
//! requests instead of racing them).

pub mod options;
pub mod request;

use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use rayon::prelude::*;

pub use options::{ExportNaming, MutatorOptions};
pub use request::{Field, MutationRequest, MutationResult, TagFields};

use crate::common::error::{MutationError, TagError};
use crate::common::transaction::AtomicWrite;
use crate::common::util::{artist_title_file_name, is_blank};
use crate::id3;
use crate::id3::frames::FrameId;
use crate::id3::tags::{split_tag, TagBlock};
use crate::id3::writer::render_tag;
use crate::mp3::probe_audio;

#[derive(Debug, Clone, Default)]
pub struct Mutator {
    options: MutatorOptions,
}

impl Mutator {
    pub fn new(options: MutatorOptions) -> Self {
        Mutator { options }
    }

    pub fn options(&self) -> &MutatorOptions {
        &self.options
    }

    /// Apply one request.
    ///
    /// The audio payload is copied through unchanged; only its offset moves
    /// when the tag size changes. The output is written to a temporary file
    /// and renamed into place, so on any error the destination is exactly as
    /// it was.
    ///
    /// A file without a tag and a request without changes is left as it is:
    /// no empty tag is added, and an export copy gets the source bytes.
    pub fn mutate(&self, request: &MutationRequest) -> Result<MutationResult, MutationError> {
        self.mutate_with(request, plain_sink)
    }

    fn mutate_with(
        &self,
        request: &MutationRequest,
        sink: SinkFn,
    ) -> Result<MutationResult, MutationError> {
        let source = request.source_path.as_path();
        let data = read_source(source)?;

        let split = split_tag(&data).map_err(|e| MutationError::CorruptTag {
            path: source.to_path_buf(),
            source: e,
        })?;
        let audio = &data[split.audio_offset..];
        let had_existing_tag = split.tag.is_some();

        let audio_confirmed = probe_audio(audio).is_some();
        if !audio_confirmed {
            if self.options.require_mpeg_sync {
                return Err(MutationError::NotAnMp3 {
                    path: source.to_path_buf(),
                });
            }
            log::warn!(
                "No MPEG audio frame found in {}; writing tag anyway",
                source.display()
            );
        }

        let mut tag = self.base_tag(split.tag);
        let mut fields_written = Vec::new();
        for (field, value) in request.changes() {
            log::debug!("Setting {} ({}) to {:?}", field, field.frame_id(), value);
            tag.upsert_text(field.frame_id(), value);
            fields_written.push(field);
        }

        let exporting = request.export_dir().is_some();
        let outcome_path = self.outcome_path(request, &tag)?;

        if fields_written.is_empty() && !had_existing_tag {
            if exporting {
                commit(&outcome_path, exporting, &[data.as_slice()], sink)?;
            }
            log::debug!("Nothing to change in untagged {}", source.display());
        } else {
            let rendered = render_tag(&tag, self.options.padding).map_err(|e| {
                MutationError::WriteFailed {
                    path: source.to_path_buf(),
                    source: io::Error::new(io::ErrorKind::InvalidData, e),
                }
            })?;
            commit(&outcome_path, exporting, &[rendered.as_slice(), audio], sink)?;
            log::debug!(
                "Wrote ID3v2.{} tag ({} frames, {} bytes) to {}",
                tag.version.0,
                tag.len(),
                rendered.len(),
                outcome_path.display()
            );
        }

        Ok(MutationResult {
            outcome_path,
            had_existing_tag,
            audio_confirmed,
            fields_written,
        })
    }

    /// Apply independent requests in parallel.
    ///
    /// Results come back in request order. A request that would write a file
    /// an earlier request reads or writes, or read a file an earlier request
    /// writes, fails with [`MutationError::DuplicateTarget`] without touching
    /// anything.
    pub fn mutate_batch(
        &self,
        requests: &[MutationRequest],
    ) -> Vec<Result<MutationResult, MutationError>> {
        let conflicts = self.claim_targets(requests);
        requests
            .par_iter()
            .zip(conflicts.into_par_iter())
            .map(|(request, conflict)| match conflict {
                Some(path) => Err(MutationError::DuplicateTarget { path }),
                None => self.mutate(request),
            })
            .collect()
    }

    fn new_tag_version(&self) -> u8 {
        if self.options.new_tag_version == 3 {
            3
        } else {
            4
        }
    }

    /// The tag to merge into. v2.3/v2.4 tags keep their version so untouched
    /// frames stay byte-exact; v2.2 cannot be written and is upgraded.
    fn base_tag(&self, existing: Option<TagBlock>) -> TagBlock {
        match existing {
            Some(tag) if tag.version.0 >= 3 => tag,
            Some(mut tag) => {
                let version = self.new_tag_version();
                log::debug!("Upgrading ID3v2.2 tag to ID3v2.{}", version);
                tag.upgrade_to(version);
                tag
            }
            None => TagBlock::new(self.new_tag_version()),
        }
    }

    fn outcome_path(
        &self,
        request: &MutationRequest,
        tag: &TagBlock,
    ) -> Result<PathBuf, MutationError> {
        let source = request.source_path.as_path();
        let Some(dir) = request.export_dir() else {
            return Ok(source.to_path_buf());
        };
        self.prepare_export_dir(dir)?;

        let file_name = match self.options.export_naming {
            ExportNaming::ArtistTitle => {
                match (tag.text(FrameId::ARTIST), tag.text(FrameId::TITLE)) {
                    (Some(artist), Some(title)) if !is_blank(&artist) && !is_blank(&title) => {
                        Some(OsString::from(artist_title_file_name(&artist, &title, source)))
                    }
                    _ => None,
                }
            }
            ExportNaming::SourceName => None,
        };
        let file_name = match file_name {
            Some(name) => name,
            None => source_file_name(source)?,
        };
        Ok(dir.join(file_name))
    }

    fn prepare_export_dir(&self, dir: &Path) -> Result<(), MutationError> {
        let unwritable = |source| MutationError::DestDirUnwritable {
            path: dir.to_path_buf(),
            source,
        };
        match fs::metadata(dir) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(unwritable(io::Error::new(
                io::ErrorKind::Other,
                "export path is not a directory",
            ))),
            Err(e) if e.kind() == io::ErrorKind::NotFound && self.options.create_export_dir => {
                log::debug!("Creating export directory {}", dir.display());
                fs::create_dir_all(dir).map_err(unwritable)
            }
            Err(e) => Err(unwritable(e)),
        }
    }

    /// Mark every request that touches a path claimed by an earlier request.
    fn claim_targets(&self, requests: &[MutationRequest]) -> Vec<Option<PathBuf>> {
        let mut written = HashSet::new();
        let mut read = HashSet::new();
        requests
            .iter()
            .map(|request| {
                let source = normalize(&request.source_path);
                let target = self.planned_target(request).map(|t| normalize(&t));

                let conflict = if written.contains(&source) {
                    Some(source.clone())
                } else {
                    target
                        .as_ref()
                        .filter(|t| written.contains(*t) || read.contains(*t))
                        .cloned()
                };
                if conflict.is_none() {
                    read.insert(source);
                    written.extend(target);
                }
                conflict
            })
            .collect()
    }

    /// Output path as far as it can be known before reading the file.
    fn planned_target(&self, request: &MutationRequest) -> Option<PathBuf> {
        let source = request.source_path.as_path();
        let Some(dir) = request.export_dir() else {
            return Some(source.to_path_buf());
        };
        match self.options.export_naming {
            ExportNaming::SourceName => source.file_name().map(|name| dir.join(name)),
            ExportNaming::ArtistTitle => {
                let artist = request.artist.as_deref().filter(|v| !is_blank(v))?;
                let title = request.title.as_deref().filter(|v| !is_blank(v))?;
                Some(dir.join(artist_title_file_name(artist.trim(), title.trim(), source)))
            }
        }
    }
}

/// Apply one request with default options.
pub fn mutate(request: &MutationRequest) -> Result<MutationResult, MutationError> {
    Mutator::default().mutate(request)
}

/// Caller-facing entry point taking plain strings, as a form would supply
/// them. A missing or blank `export_dir` edits the file in place; blank field
/// values leave the corresponding frame unchanged.
pub fn update_id3_tag(
    file_path: &str,
    export_dir: Option<&str>,
    artist: &str,
    title: &str,
    album: &str,
) -> Result<MutationResult, MutationError> {
    let mut request = MutationRequest::new(file_path)
        .artist(artist)
        .title(title)
        .album(album);
    if let Some(dir) = export_dir.filter(|d| !is_blank(d)) {
        request = request.export_to(dir);
    }
    mutate(&request)
}

/// Current artist/title/album of a file. Reads only the tag bytes.
///
/// A damaged tag reads as empty fields, matching how [`Mutator::mutate`]
/// recovers from it.
pub fn read_fields(path: &Path) -> Result<TagFields, MutationError> {
    check_source(path)?;
    match id3::load_tag(path) {
        Ok(Some(tag)) => Ok(TagFields {
            version: Some(tag.version),
            artist: tag.text(FrameId::ARTIST),
            title: tag.text(FrameId::TITLE),
            album: tag.text(FrameId::ALBUM),
        }),
        Ok(None) => Ok(TagFields::default()),
        Err(TagError::Io(e)) => Err(MutationError::SourceUnreadable {
            path: path.to_path_buf(),
            source: e,
        }),
        Err(e) => {
            log::warn!("Ignoring unreadable ID3v2 tag in {}: {}", path.display(), e);
            Ok(TagFields::default())
        }
    }
}

fn check_source(path: &Path) -> Result<(), MutationError> {
    let meta = fs::metadata(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            MutationError::SourceNotFound {
                path: path.to_path_buf(),
            }
        } else {
            MutationError::SourceUnreadable {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    if !meta.is_file() {
        return Err(MutationError::SourceUnreadable {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
        });
    }
    Ok(())
}

fn read_source(path: &Path) -> Result<Vec<u8>, MutationError> {
    check_source(path)?;
    fs::read(path).map_err(|e| MutationError::SourceUnreadable {
        path: path.to_path_buf(),
        source: e,
    })
}

fn source_file_name(source: &Path) -> Result<OsString, MutationError> {
    source
        .file_name()
        .map(|n| n.to_os_string())
        .ok_or_else(|| MutationError::SourceUnreadable {
            path: source.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "source path has no file name"),
        })
}

/// Wraps the staged file before the output is streamed into it. Tests use
/// it to make writes fail partway.
type SinkFn = for<'a> fn(&'a mut AtomicWrite) -> Box<dyn Write + 'a>;

fn plain_sink(write: &mut AtomicWrite) -> Box<dyn Write + '_> {
    Box::new(write)
}

fn commit(
    dest: &Path,
    exporting: bool,
    chunks: &[&[u8]],
    sink: SinkFn,
) -> Result<(), MutationError> {
    let mut write = AtomicWrite::begin(dest).map_err(|e| {
        if exporting {
            MutationError::DestDirUnwritable {
                path: dest.parent().unwrap_or(dest).to_path_buf(),
                source: e,
            }
        } else {
            MutationError::WriteFailed {
                path: dest.to_path_buf(),
                source: e,
            }
        }
    })?;

    let failed = |source| MutationError::WriteFailed {
        path: dest.to_path_buf(),
        source,
    };
    {
        let mut out = sink(&mut write);
        for chunk in chunks {
            out.write_all(chunk).map_err(failed)?;
        }
        out.flush().map_err(failed)?;
    }
    write.commit().map_err(failed)
}

/// Best-effort canonical form for comparing paths, including ones that do
/// not exist yet.
fn normalize(path: &Path) -> PathBuf {
    if let Ok(p) = fs::canonicalize(path) {
        return p;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => fs::canonicalize(parent)
            .map(|p| p.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}
