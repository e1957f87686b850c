pub mod frames;
pub mod header;
pub mod specs;
pub mod tags;
pub mod unsynch;
pub mod writer;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::common::error::{Result, TagError};
use crate::id3::header::{TagHeader, HEADER_LEN};
use crate::id3::tags::TagBlock;

/// Load only the ID3v2 tag of a file: the 10-byte header first, then exactly
/// the declared tag bytes. The audio payload is never read.
pub fn load_tag(path: &Path) -> Result<Option<TagBlock>> {
    let mut file = File::open(path)?;

    let mut header_buf = [0u8; HEADER_LEN];
    let n = read_up_to(&mut file, &mut header_buf)?;
    let header = match TagHeader::parse(&header_buf[..n]) {
        Ok(h) => h,
        Err(TagError::NoHeader) => return Ok(None),
        Err(e) => return Err(e),
    };

    let mut data = header_buf.to_vec();
    let body_len = header.tag_len() - HEADER_LEN;
    let read = file.take(body_len as u64).read_to_end(&mut data)?;
    if read < body_len {
        return Err(TagError::PayloadBoundary {
            declared: header.tag_len(),
            available: HEADER_LEN + read,
        });
    }
    tags::read_tag(&data)
}

/// `read` until `buf` is full or EOF; returns the byte count.
fn read_up_to(file: &mut File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}
