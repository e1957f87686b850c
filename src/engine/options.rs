/// How an export copy is named inside the export directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportNaming {
    /// Same file name as the source.
    #[default]
    SourceName,
    /// `"<artist> - <title>.<ext>"` from the merged tag, falling back to the
    /// source name when either value is missing.
    ArtistTitle,
}

/// Knobs for a [`Mutator`](super::Mutator). Nothing here is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutatorOptions {
    /// Major version for tags created from scratch or upgraded from v2.2.
    /// Tags that already are v2.3 or v2.4 keep their version.
    pub new_tag_version: u8,
    /// Zero bytes appended after the frames.
    pub padding: usize,
    pub export_naming: ExportNaming,
    /// Create a missing export directory instead of failing.
    pub create_export_dir: bool,
    /// Fail with `NotAnMp3` when no MPEG frame follows the tag. Off by
    /// default: the result is only flagged low-confidence.
    pub require_mpeg_sync: bool,
}

impl Default for MutatorOptions {
    fn default() -> Self {
        MutatorOptions {
            new_tag_version: 4,
            padding: 0,
            export_naming: ExportNaming::SourceName,
            create_export_dir: true,
            require_mpeg_sync: false,
        }
    }
}

impl MutatorOptions {
    pub fn with_new_tag_version(mut self, version: u8) -> Self {
        // Only versions the writer can produce
        self.new_tag_version = if version == 3 { 3 } else { 4 };
        self
    }

    pub fn with_padding(mut self, padding: usize) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_export_naming(mut self, naming: ExportNaming) -> Self {
        self.export_naming = naming;
        self
    }

    pub fn with_create_export_dir(mut self, create: bool) -> Self {
        self.create_export_dir = create;
        self
    }

    pub fn with_require_mpeg_sync(mut self, require: bool) -> Self {
        self.require_mpeg_sync = require;
        self
    }
}
