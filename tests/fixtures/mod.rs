//! Synthetic MP3 files for the integration tests.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

/// MPEG-1 Layer III, 128 kbit/s, 44.1 kHz: 417-byte frames.
const FRAME_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0x00];
const FRAME_LEN: usize = 417;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// `frames` MPEG frames with a filler that never contains 0xFF.
pub fn mpeg_audio(frames: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(frames * FRAME_LEN);
    for n in 0..frames {
        out.extend_from_slice(&FRAME_HEADER);
        out.extend((4..FRAME_LEN).map(|i| ((i + n) % 251) as u8));
    }
    out
}

fn syncsafe(value: usize) -> [u8; 4] {
    let v = value as u32;
    [
        ((v >> 21) & 0x7F) as u8,
        ((v >> 14) & 0x7F) as u8,
        ((v >> 7) & 0x7F) as u8,
        (v & 0x7F) as u8,
    ]
}

pub fn latin1_text(value: &str) -> Vec<u8> {
    let mut out = vec![0u8];
    out.extend_from_slice(value.as_bytes());
    out
}

/// A v2.3 or v2.4 frame with clear flags.
pub fn frame(major: u8, id: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = id.to_vec();
    if major == 4 {
        out.extend_from_slice(&syncsafe(payload.len()));
    } else {
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    }
    out.extend_from_slice(&[0, 0]);
    out.extend_from_slice(payload);
    out
}

/// A v2.2 frame: 3-byte id and 3-byte size.
pub fn frame_v22(id: &[u8; 3], payload: &[u8]) -> Vec<u8> {
    let mut out = id.to_vec();
    let len = payload.len() as u32;
    out.extend_from_slice(&len.to_be_bytes()[1..]);
    out.extend_from_slice(payload);
    out
}

pub fn tag(major: u8, frames: &[Vec<u8>], padding: usize) -> Vec<u8> {
    let body_len = frames.iter().map(Vec::len).sum::<usize>() + padding;
    let mut out = b"ID3".to_vec();
    out.extend_from_slice(&[major, 0, 0]);
    out.extend_from_slice(&syncsafe(body_len));
    for f in frames {
        out.extend_from_slice(f);
    }
    out.resize(out.len() + padding, 0);
    out
}

/// Picture and comment frames that must survive every edit untouched.
pub fn apic(major: u8) -> Vec<u8> {
    let mut payload = vec![0u8];
    payload.extend_from_slice(b"image/png\0");
    payload.push(3);
    payload.extend_from_slice(b"cover\0");
    payload.extend_from_slice(&[0x89, b'P', b'N', b'G', 0xFF, 0x00, 0xFF, 0xE0]);
    frame(major, b"APIC", &payload)
}

pub fn comm(major: u8) -> Vec<u8> {
    frame(major, b"COMM", b"\x00engdesc\x00a comment")
}

pub fn write_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, data).unwrap();
    path
}

/// File names in `dir`, sorted.
pub fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
