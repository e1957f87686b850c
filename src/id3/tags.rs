use std::io::Read;

use crate::common::error::{Result, TagError};
use crate::id3::frames::{self, Frame, FrameId, TextFrame};
use crate::id3::header::{self, TagFlags, TagHeader, HEADER_LEN};
use crate::id3::specs::Encoding;
use crate::id3::unsynch;

/// A decoded ID3v2 tag: header fields plus the ordered frame sequence.
/// Trailing padding is not represented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagBlock {
    pub version: (u8, u8),
    pub flags: TagFlags,
    /// Body size declared by the header this tag was read from (0 for new tags).
    pub declared_size: u32,
    pub frames: Vec<Frame>,
}

impl TagBlock {
    pub fn new(major: u8) -> Self {
        TagBlock {
            version: (major, 0),
            flags: TagFlags::default(),
            declared_size: 0,
            frames: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// First frame with the given id.
    pub fn get(&self, id: FrameId) -> Option<&Frame> {
        self.frames.iter().find(|f| f.id() == id)
    }

    /// Current value of a text frame.
    ///
    /// Text frames stored compressed or unsynchronised are decoded on the fly;
    /// the stored frame itself is left untouched.
    pub fn text(&self, id: FrameId) -> Option<String> {
        match self.get(id)? {
            Frame::Text(f) => Some(f.value().to_string()),
            Frame::Raw(raw) if id.is_text() => {
                let version = self.version.0;
                let payload = plain_payload(raw.flags, &raw.payload, version)
                    .map_err(|e| log::debug!("Cannot read {} frame: {}", id, e))
                    .ok()?;
                frames::decode_text_payload(&payload).ok()
            }
            Frame::Raw(_) => None,
        }
    }

    /// Encoding of the first decoded text frame, used as the tag's convention
    /// for frames added to it.
    fn text_convention(&self) -> Option<Encoding> {
        self.frames
            .iter()
            .find_map(|f| f.as_text().map(TextFrame::encoding))
    }

    /// Set a text frame's value: replace the first frame with `id` in place,
    /// or append a new one at the end. Later frames with the same id are
    /// removed so the tag holds a single value.
    ///
    /// A replaced text frame keeps its encoding (and status flags) when that
    /// encoding can carry `value` in this tag version; a new frame follows the
    /// encoding of the tag's other text frames under the same rule.
    pub fn upsert_text(&mut self, id: FrameId, value: &str) {
        let version = self.version.0;
        let convention = self.text_convention();
        self.drop_duplicates(id);

        let Some(index) = self.frames.iter().position(|f| f.id() == id) else {
            let encoding = pick_encoding(convention, value, version);
            self.frames.push(Frame::Text(TextFrame::new(id, value, encoding)));
            return;
        };

        if let Frame::Text(text) = &mut self.frames[index] {
            let encoding = pick_encoding(Some(text.encoding()), value, version);
            text.set_value(value, encoding);
            return;
        }
        // Payload could not be decoded or is transformed; the new value
        // replaces it with plain flags.
        let encoding = pick_encoding(convention, value, version);
        self.frames[index] = Frame::Text(TextFrame::new(id, value, encoding));
    }
}

impl TagBlock {
    /// Keep only the first frame with `id`.
    fn drop_duplicates(&mut self, id: FrameId) {
        let before = self.frames.len();
        let mut seen = false;
        self.frames.retain(|f| {
            if f.id() != id {
                return true;
            }
            let first = !seen;
            seen = true;
            first
        });
        if self.frames.len() != before {
            log::debug!("Removed {} duplicate {} frames", before - self.frames.len(), id);
        }
    }

    /// Re-target a tag read as v2.2 at `major` (3 or 4).
    ///
    /// v2.2 ids were already mapped to their v2.3 names on read. For v2.4 the
    /// v2.3-only frames are converted: TYER/TDAT/TIME merge into TDRC, TORY
    /// becomes TDOR and IPLS becomes TIPL. TRDA and TSIZ have no v2.4
    /// counterpart and are dropped.
    pub fn upgrade_to(&mut self, major: u8) {
        self.version = (major, 0);
        if major < 4 {
            return;
        }

        let recording_time = match self.get(TDRC) {
            Some(_) => None,
            None => self.v23_recording_time(),
        };
        let had_year = self.get(TYER).is_some();

        self.frames = std::mem::take(&mut self.frames)
            .into_iter()
            .filter_map(|frame| match frame.id().as_bytes() {
                b"TORY" => Some(frame.with_id(TDOR)),
                b"IPLS" => Some(frame.with_id(TIPL)),
                b"TYER" | b"TDAT" | b"TIME" | b"TRDA" | b"TSIZ" => {
                    log::debug!("Dropping {} frame, not part of ID3v2.4", frame.id());
                    None
                }
                _ => Some(frame),
            })
            .collect();

        match recording_time {
            Some(time) => self.upsert_text(TDRC, &time),
            None if had_year => log::warn!("Dropped TYER frame without a usable year"),
            None => {}
        }
    }

    /// TDRC timestamp (`yyyy[-MM-dd[THH:mm]]`) from the v2.3 date frames.
    fn v23_recording_time(&self) -> Option<String> {
        fn digits(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| v.len() == 4 && v.bytes().all(|b| b.is_ascii_digit()))
        }

        let mut time = digits(self.text(TYER))?;
        // TDAT is DDMM, TIME is HHMM
        if let Some(date) = digits(self.text(TDAT)) {
            time.push_str(&format!("-{}-{}", &date[2..], &date[..2]));
            if let Some(clock) = digits(self.text(TIME)) {
                time.push_str(&format!("T{}:{}", &clock[..2], &clock[2..]));
            }
        }
        Some(time)
    }
}

const TYER: FrameId = FrameId::from_static(b"TYER");
const TDAT: FrameId = FrameId::from_static(b"TDAT");
const TIME: FrameId = FrameId::from_static(b"TIME");
const TDRC: FrameId = FrameId::from_static(b"TDRC");
const TDOR: FrameId = FrameId::from_static(b"TDOR");
const TIPL: FrameId = FrameId::from_static(b"TIPL");

/// Choose the text encoding for a written value.
///
/// `preferred` wins when it is legal for `version` and can represent `value`.
/// Otherwise ASCII text uses ISO-8859-1 and anything else the version's
/// Unicode default (UTF-8 for v2.4, UTF-16 for v2.3).
pub fn pick_encoding(preferred: Option<Encoding>, value: &str, version: u8) -> Encoding {
    match preferred {
        Some(e) if e.is_legal_for(version) && e.can_encode(value) => e,
        _ if value.is_ascii() => Encoding::Latin1,
        _ => Encoding::default_for_version(version),
    }
}

/// Undo the payload transformations announced by frame flags.
fn plain_payload(flags: frames::FrameFlags, payload: &[u8], version: u8) -> Result<Vec<u8>> {
    if flags.encrypted(version) {
        return Err(TagError::MalformedHeader("encrypted frame".into()));
    }
    // Extra header bytes follow the frame header in flag order, which
    // differs between versions
    let mut data = payload;
    if version == 3 {
        if flags.compressed(version) {
            data = data.get(4..).unwrap_or_default();
        }
        if flags.grouped(version) {
            data = data.get(1..).unwrap_or_default();
        }
    } else {
        if flags.grouped(version) {
            data = data.get(1..).unwrap_or_default();
        }
        if flags.has_data_length(version) {
            data = data.get(4..).unwrap_or_default();
        }
    }
    let mut data = if flags.unsynchronised(version) {
        unsynch::decode(data)
    } else {
        data.to_vec()
    };
    if flags.compressed(version) {
        data = decompress_zlib(&data)?;
    }
    Ok(data)
}

fn decompress_zlib(data: &[u8]) -> Result<Vec<u8>> {
    use flate2::read::ZlibDecoder;

    let mut decoder = ZlibDecoder::new(data);
    let mut result = Vec::new();
    decoder
        .read_to_end(&mut result)
        .map_err(|_| TagError::BadCompressedData)?;
    Ok(result)
}

/// Read the ID3v2 tag at the start of `data`.
///
/// Returns `Ok(None)` when there is no `ID3` magic. Frames are decoded until
/// the declared size is consumed or padding starts.
pub fn read_tag(data: &[u8]) -> Result<Option<TagBlock>> {
    let header = match TagHeader::parse(data) {
        Ok(h) => h,
        Err(TagError::NoHeader) => return Ok(None),
        Err(e) => return Err(e),
    };
    check_boundary(&header, data.len())?;
    read_body(&header, data).map(Some)
}

fn check_boundary(header: &TagHeader, available: usize) -> Result<()> {
    let declared = header.tag_len();
    if declared > available {
        return Err(TagError::PayloadBoundary {
            declared,
            available,
        });
    }
    Ok(())
}

fn read_body(header: &TagHeader, data: &[u8]) -> Result<TagBlock> {
    let major = header.version.0;
    if header.flags.compressed_v22 {
        return Err(TagError::MalformedHeader("compressed v2.2 tag".into()));
    }

    let raw_body = &data[HEADER_LEN..HEADER_LEN + header.size as usize];
    // v2.4 signals unsynchronisation per frame instead
    let body = if header.flags.unsynchronisation && major < 4 {
        unsynch::decode(raw_body)
    } else {
        raw_body.to_vec()
    };

    let mut offset = if header.flags.extended {
        header::extended_header_len(&body, major)?
    } else {
        0
    };

    let mut tag = TagBlock {
        version: header.version,
        flags: header.flags,
        declared_size: header.size,
        frames: Vec::with_capacity(16),
    };

    if major == 2 {
        while offset < body.len() {
            match frames::decode_frame_v22(&body, offset) {
                Ok((frame, consumed)) => {
                    tag.frames.extend(frame);
                    offset += consumed;
                }
                Err(TagError::MalformedFrame { .. }) => break,
                Err(e) => return Err(e),
            }
        }
        return Ok(tag);
    }

    let size_bits = if major == 4 {
        header::determine_bpi(&body[offset..])
    } else {
        8
    };
    if size_bits == 8 && major == 4 {
        log::debug!("ID3v2.4 tag uses non-syncsafe frame sizes");
    }

    // In v2.4 the header flag means every frame is unsynchronised
    let all_unsynchronised = major == 4 && header.flags.unsynchronisation;
    while offset < body.len() {
        match frames::decode_frame(&body, offset, major, size_bits) {
            Ok((frame, consumed)) => {
                tag.frames.push(if all_unsynchronised {
                    frame.into_unsynchronised()
                } else {
                    frame
                });
                offset += consumed;
            }
            Err(TagError::MalformedFrame { .. }) => break,
            Err(e) => return Err(e),
        }
    }
    Ok(tag)
}

/// A file split into its (optional) tag and the offset of the audio payload.
#[derive(Debug)]
pub struct SplitTag {
    pub tag: Option<TagBlock>,
    /// Offset of the first audio byte.
    pub audio_offset: usize,
    /// Format problem that was recovered from, if any.
    pub recovered: Option<TagError>,
}

/// Split `data` into tag and audio payload, recovering from format errors
/// wherever the payload boundary is still known.
///
/// Headers that cannot be trusted (unsupported version, bad size field) leave
/// the file as untagged so that no byte is discarded. A damaged tag body is
/// dropped, with the payload starting after the declared tag size. Only a
/// declared size running past the end of the data is fatal.
pub fn split_tag(data: &[u8]) -> Result<SplitTag> {
    let header = match TagHeader::parse(data) {
        Ok(h) => h,
        Err(TagError::NoHeader) => {
            return Ok(SplitTag {
                tag: None,
                audio_offset: 0,
                recovered: None,
            })
        }
        Err(e) => {
            log::warn!("Treating file as untagged: {}", e);
            return Ok(SplitTag {
                tag: None,
                audio_offset: 0,
                recovered: Some(e),
            });
        }
    };

    check_boundary(&header, data.len())?;
    let audio_offset = header.tag_len();

    match read_body(&header, data) {
        Ok(tag) => Ok(SplitTag {
            tag: Some(tag),
            audio_offset,
            recovered: None,
        }),
        Err(e) => {
            log::warn!("Discarding unreadable ID3v2 tag ({} bytes): {}", audio_offset, e);
            Ok(SplitTag {
                tag: None,
                audio_offset,
                recovered: Some(e),
            })
        }
    }
}
