pub mod header;

use crate::mp3::header::find_sync;

/// How far into the payload to look for the first MPEG frame. Encoders
/// sometimes leave junk between the tag and the audio.
const SYNC_SEARCH_WINDOW: usize = 64 * 1024;

/// Check whether `audio` looks like an MPEG audio stream.
///
/// Returns the offset of the first confirmed frame. `None` is a low-confidence
/// signal, not an error: ID3 tags also precede non-standard payloads.
pub fn probe_audio(audio: &[u8]) -> Option<usize> {
    let window = &audio[..audio.len().min(SYNC_SEARCH_WINDOW)];
    find_sync(window, 0).map(|(offset, _)| offset)
}
