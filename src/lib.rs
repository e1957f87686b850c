//! In-place and export editing of ID3v2 artist/title/album fields in MP3
//! files. Frames that are not edited are carried through byte for byte, and
//! the audio payload is never modified.

pub mod common;
pub mod engine;
pub mod id3;
pub mod mp3;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub use common::error::{MutationError, TagError};
pub use engine::{
    mutate, read_fields, update_id3_tag, ExportNaming, Field, MutationRequest, MutationResult,
    Mutator, MutatorOptions, TagFields,
};
pub use id3::tags::{split_tag, SplitTag, TagBlock};

#[cfg(feature = "python")]
mod python_bindings {
use super::*;
use pyo3::prelude::*;
use pyo3::types::PyDict;
use std::path::PathBuf;

/// Update artist/title/album of `file_path`. Blank values leave a field
/// unchanged; a blank `export_dir` edits in place. Returns the path that now
/// holds the updated tag.
#[pyfunction]
#[pyo3(signature = (file_path, export_dir=None, artist="", title="", album=""))]
fn update_id3_tag(
    py: Python<'_>,
    file_path: &str,
    export_dir: Option<&str>,
    artist: &str,
    title: &str,
    album: &str,
) -> PyResult<String> {
    let result = py.allow_threads(|| {
        engine::update_id3_tag(file_path, export_dir, artist, title, album)
    })?;
    Ok(result.outcome_path.to_string_lossy().into_owned())
}

/// Current artist/title/album as a dict; missing fields are `None`.
#[pyfunction]
fn read_fields<'py>(py: Python<'py>, file_path: &str) -> PyResult<Bound<'py, PyDict>> {
    let path = PathBuf::from(file_path);
    let fields = py.allow_threads(|| engine::read_fields(&path))?;

    let dict = PyDict::new(py);
    dict.set_item("artist", fields.artist)?;
    dict.set_item("title", fields.title)?;
    dict.set_item("album", fields.album)?;
    dict.set_item("version", fields.version)?;
    Ok(dict)
}

/// Apply several `(file_path, export_dir, artist, title, album)` edits in
/// parallel. Returns one outcome path or error message per edit, in order.
#[pyfunction]
fn batch_update(
    py: Python<'_>,
    edits: Vec<(String, Option<String>, String, String, String)>,
) -> PyResult<Vec<(bool, String)>> {
    let requests: Vec<MutationRequest> = edits
        .into_iter()
        .map(|(path, dir, artist, title, album)| {
            let request = MutationRequest::new(path).artist(artist).title(title).album(album);
            match dir {
                Some(dir) => request.export_to(dir),
                None => request,
            }
        })
        .collect();

    let results = py.allow_threads(|| Mutator::default().mutate_batch(&requests));
    Ok(results
        .into_iter()
        .map(|r| match r {
            Ok(result) => (true, result.outcome_path.to_string_lossy().into_owned()),
            Err(e) => (false, e.to_string()),
        })
        .collect())
}

// ---- Module registration ----

#[pymodule]
fn id3_mutate(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(update_id3_tag, m)?)?;
    m.add_function(wrap_pyfunction!(read_fields, m)?)?;
    m.add_function(wrap_pyfunction!(batch_update, m)?)?;

    m.add("MutationError", m.py().get_type::<common::error::MutationPyError>())?;
    m.add("SourceNotFoundError", m.py().get_type::<common::error::SourceNotFoundError>())?;
    m.add("SourceUnreadableError", m.py().get_type::<common::error::SourceUnreadableError>())?;
    m.add("NotAnMp3Error", m.py().get_type::<common::error::NotAnMp3Error>())?;
    m.add("DestDirUnwritableError", m.py().get_type::<common::error::DestDirUnwritableError>())?;
    m.add("WriteFailedError", m.py().get_type::<common::error::WriteFailedError>())?;
    m.add("CorruptTagError", m.py().get_type::<common::error::CorruptTagError>())?;

    Ok(())
}
} // mod python_bindings
