use byteorder::{BigEndian, ByteOrder};
use memchr::memchr;

/// MPEG audio version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MPEGVersion {
    V1,
    V2,
    V25,
}

/// MPEG audio layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MPEGLayer {
    Layer1,
    Layer2,
    Layer3,
}

// Bitrate tables [version_index][layer_index][bitrate_index]
// version_index: 0=V1, 1=V2/V2.5
// layer_index: 0=Layer1, 1=Layer2, 2=Layer3
const BITRATES: [[[u32; 16]; 3]; 2] = [
    [
        [0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448, 0],
        [0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384, 0],
        [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 0],
    ],
    [
        [0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256, 0],
        [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0],
        [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0],
    ],
];

// Sample rate tables [version_index][srate_index]
const SAMPLE_RATES: [[u32; 4]; 3] = [
    [44100, 48000, 32000, 0],
    [22050, 24000, 16000, 0],
    [11025, 12000, 8000, 0],
];

// Samples per frame [version_index][layer_index]
const SAMPLES_PER_FRAME: [[u32; 3]; 2] = [[384, 1152, 1152], [384, 1152, 576]];

/// A parsed MPEG audio frame header. Only what is needed to recognise a
/// frame and find the next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MPEGFrame {
    pub version: MPEGVersion,
    pub layer: MPEGLayer,
    pub bitrate: u32,     // kbps
    pub sample_rate: u32, // Hz
    pub frame_length: u32, // bytes
}

impl MPEGFrame {
    /// Parse a 4-byte MPEG frame header; `None` if it is not one.
    pub fn parse(header_bytes: &[u8]) -> Option<Self> {
        if header_bytes.len() < 4 {
            return None;
        }
        let h = BigEndian::read_u32(header_bytes);

        // Sync: 11 bits of 1s
        if h & 0xFFE0_0000 != 0xFFE0_0000 {
            return None;
        }

        let version = match (h >> 19) & 0x03 {
            0 => MPEGVersion::V25,
            2 => MPEGVersion::V2,
            3 => MPEGVersion::V1,
            _ => return None,
        };
        let layer = match (h >> 17) & 0x03 {
            1 => MPEGLayer::Layer3,
            2 => MPEGLayer::Layer2,
            3 => MPEGLayer::Layer1,
            _ => return None,
        };

        let version_idx = usize::from(version != MPEGVersion::V1);
        let layer_idx = match layer {
            MPEGLayer::Layer1 => 0,
            MPEGLayer::Layer2 => 1,
            MPEGLayer::Layer3 => 2,
        };

        let bitrate = BITRATES[version_idx][layer_idx][((h >> 12) & 0x0F) as usize];
        if bitrate == 0 {
            return None;
        }

        let srate_version_idx = match version {
            MPEGVersion::V1 => 0,
            MPEGVersion::V2 => 1,
            MPEGVersion::V25 => 2,
        };
        let sample_rate = SAMPLE_RATES[srate_version_idx][((h >> 10) & 0x03) as usize];
        if sample_rate == 0 {
            return None;
        }

        let padding = u32::from((h >> 9) & 0x01 != 0);
        let spf = SAMPLES_PER_FRAME[version_idx][layer_idx];
        let frame_length = match layer {
            MPEGLayer::Layer1 => (12 * bitrate * 1000 / sample_rate + padding) * 4,
            _ => spf / 8 * bitrate * 1000 / sample_rate + padding,
        };

        Some(MPEGFrame {
            version,
            layer,
            bitrate,
            sample_rate,
            frame_length,
        })
    }
}

/// Scan for the first valid MPEG sync frame in data.
/// A candidate counts only if the next frame also syncs. The one exception
/// is a candidate at `start` whose next frame would lie past the end of
/// `data`, i.e. a stream of a single frame.
pub fn find_sync(data: &[u8], start: usize) -> Option<(usize, MPEGFrame)> {
    let mut pos = start;
    while pos + 4 <= data.len() {
        pos += memchr(0xFF, &data[pos..])?;
        if pos + 4 > data.len() {
            return None;
        }
        if data[pos + 1] & 0xE0 == 0xE0 {
            if let Some(frame) = MPEGFrame::parse(&data[pos..pos + 4]) {
                let next = pos + frame.frame_length as usize;
                let confirmed = if next + 4 > data.len() {
                    pos == start
                } else {
                    data[next] == 0xFF && data[next + 1] & 0xE0 == 0xE0
                };
                if confirmed {
                    return Some((pos, frame));
                }
            }
        }
        pos += 1;
    }
    None
}
