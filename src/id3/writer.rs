use crate::common::error::{Result, TagError};
use crate::id3::frames::{encode_frame, Frame};
use crate::id3::header::{TagHeader, HEADER_LEN, MAX_SYNCSAFE};
use crate::id3::tags::TagBlock;

/// Serialize `frames` into a complete ID3v2 tag (header + frames) with no
/// padding. The declared size is exactly the length of the frame data.
pub fn write_tag(frames: &[Frame], version: u8) -> Result<Vec<u8>> {
    render(frames, version, 0)
}

/// Serialize a tag at its own version, followed by `padding` zero bytes.
pub fn render_tag(tag: &TagBlock, padding: usize) -> Result<Vec<u8>> {
    render(&tag.frames, tag.version.0, padding)
}

fn render(frames: &[Frame], version: u8, padding: usize) -> Result<Vec<u8>> {
    if version != 3 && version != 4 {
        return Err(TagError::UnsupportedTagVersion(format!(
            "cannot write ID3v2.{}",
            version
        )));
    }

    let mut body = Vec::with_capacity(4096);
    for frame in frames {
        body.extend_from_slice(&encode_frame(frame, version)?);
    }

    let total = body.len() + padding;
    let size = u32::try_from(total)
        .ok()
        .filter(|&s| s <= MAX_SYNCSAFE)
        .ok_or_else(|| TagError::TooLarge {
            id: "ID3".into(),
            size: total,
        })?;

    let mut tag = Vec::with_capacity(HEADER_LEN + total);
    tag.extend_from_slice(&TagHeader::render(version, size));
    tag.extend_from_slice(&body);
    tag.resize(HEADER_LEN + total, 0);
    Ok(tag)
}
