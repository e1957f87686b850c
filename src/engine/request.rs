use std::fmt;
use std::path::{Path, PathBuf};

use crate::common::util::is_blank;
use crate::id3::frames::FrameId;

/// The text fields the engine edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Artist,
    Title,
    Album,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Artist, Field::Title, Field::Album];

    pub fn frame_id(self) -> FrameId {
        match self {
            Field::Artist => FrameId::ARTIST,
            Field::Title => FrameId::TITLE,
            Field::Album => FrameId::ALBUM,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::Artist => "artist",
            Field::Title => "title",
            Field::Album => "album",
        })
    }
}

/// One edit: where to read, where to write, and the new field values.
///
/// Blank values (empty after trimming) mean "leave unchanged".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRequest {
    pub source_path: PathBuf,
    pub dest_dir: Option<PathBuf>,
    pub artist: Option<String>,
    pub title: Option<String>,
    pub album: Option<String>,
}

impl MutationRequest {
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        MutationRequest {
            source_path: source_path.into(),
            dest_dir: None,
            artist: None,
            title: None,
            album: None,
        }
    }

    pub fn export_to(mut self, dest_dir: impl Into<PathBuf>) -> Self {
        self.dest_dir = Some(dest_dir.into());
        self
    }

    pub fn artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    /// The export directory, if one was given and is not empty.
    pub fn export_dir(&self) -> Option<&Path> {
        self.dest_dir
            .as_deref()
            .filter(|d| !d.as_os_str().is_empty())
    }

    pub fn value(&self, field: Field) -> Option<&str> {
        match field {
            Field::Artist => self.artist.as_deref(),
            Field::Title => self.title.as_deref(),
            Field::Album => self.album.as_deref(),
        }
    }

    /// Fields to write, with trimmed values. Blank fields are skipped.
    pub fn changes(&self) -> impl Iterator<Item = (Field, &str)> + '_ {
        Field::ALL.into_iter().filter_map(move |field| {
            self.value(field)
                .filter(|v| !is_blank(v))
                .map(|v| (field, v.trim()))
        })
    }
}

/// Outcome of a successful mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationResult {
    /// The file that now holds the updated tag.
    pub outcome_path: PathBuf,
    /// Whether a readable tag existed before, as opposed to a new one being created.
    pub had_existing_tag: bool,
    /// Whether MPEG audio was found after the tag. `false` is a low-confidence
    /// result, not a failure.
    pub audio_confirmed: bool,
    pub fields_written: Vec<Field>,
}

impl MutationResult {
    pub fn outcome_path(&self) -> &Path {
        &self.outcome_path
    }
}

impl fmt::Display for MutationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Successfully saved to {}", self.outcome_path.display())
    }
}

/// Current values of the edited fields, for pre-filling a form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFields {
    pub version: Option<(u8, u8)>,
    pub artist: Option<String>,
    pub title: Option<String>,
    pub album: Option<String>,
}

impl TagFields {
    pub fn get(&self, field: Field) -> Option<&str> {
        match field {
            Field::Artist => self.artist.as_deref(),
            Field::Title => self.title.as_deref(),
            Field::Album => self.album.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_are_not_changes() {
        let request = MutationRequest::new("a.mp3")
            .artist("  Someone  ")
            .title("   ")
            .album("");
        let changes: Vec<_> = request.changes().collect();
        assert_eq!(changes, vec![(Field::Artist, "Someone")]);
    }

    #[test]
    fn display_names_outcome() {
        let result = MutationResult {
            outcome_path: PathBuf::from("/out/a.mp3"),
            had_existing_tag: true,
            audio_confirmed: true,
            fields_written: vec![],
        };
        assert_eq!(result.to_string(), "Successfully saved to /out/a.mp3");
    }
}
