mod fixtures;

use std::fs;

use fixtures::*;
use id3_mutate::id3::frames::FrameId;
use id3_mutate::id3::tags::read_tag;
use id3_mutate::id3::writer::render_tag;
use id3_mutate::{split_tag, MutationRequest, Mutator, MutatorOptions, TagBlock};
use proptest::prelude::*;

fn field_value() -> impl Strategy<Value = String> {
    prop_oneof![
        "[ a-zA-Z0-9]{0,24}",
        "[a-zA-Z]{1,8} [À-ÿ]{1,6}",
        "[ぁ-ヶ]{1,10}",
    ]
}

fn source_file(major: u8, tagged: bool, audio_frames: usize) -> (Vec<u8>, Vec<u8>) {
    let audio = mpeg_audio(audio_frames);
    let mut data = if tagged {
        tag(
            major,
            &[
                frame(major, b"TIT2", &latin1_text("Title")),
                apic(major),
                frame(major, b"TALB", &latin1_text("Album")),
                comm(major),
            ],
            32,
        )
    } else {
        Vec::new()
    };
    data.extend_from_slice(&audio);
    (data, audio)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn audio_payload_is_never_modified(
        major in prop_oneof![Just(3u8), Just(4u8)],
        tagged in any::<bool>(),
        audio_frames in 1usize..6,
        artist in field_value(),
        title in field_value(),
        album in field_value(),
        padding in 0usize..512,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let (data, audio) = source_file(major, tagged, audio_frames);
        let path = write_file(dir.path(), "song.mp3", &data);

        let request = MutationRequest::new(&path).artist(&artist).title(&title).album(&album);
        let result = Mutator::new(MutatorOptions::default().with_padding(padding))
            .mutate(&request)
            .unwrap();
        prop_assert_eq!(result.had_existing_tag, tagged);

        let out = fs::read(&path).unwrap();
        let split = split_tag(&out).unwrap();
        prop_assert_eq!(&out[split.audio_offset..], &audio[..]);
        prop_assert_eq!(list_dir(dir.path()), vec!["song.mp3".to_string()]);
    }

    #[test]
    fn written_values_read_back_trimmed(
        major in prop_oneof![Just(3u8), Just(4u8)],
        tagged in any::<bool>(),
        artist in field_value(),
        title in field_value(),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let (data, _) = source_file(major, tagged, 2);
        let path = write_file(dir.path(), "song.mp3", &data);

        let request = MutationRequest::new(&path).artist(&artist).title(&title);
        Mutator::default().mutate(&request).unwrap();

        let out = fs::read(&path).unwrap();
        // An untagged file with nothing to write stays untagged
        let tag = split_tag(&out).unwrap().tag.unwrap_or_else(|| TagBlock::new(4));
        let expected_title = if title.trim().is_empty() && tagged {
            Some("Title".to_string())
        } else if title.trim().is_empty() {
            None
        } else {
            Some(title.trim().to_string())
        };
        let expected_artist = Some(artist.trim().to_string()).filter(|a| !a.is_empty());
        prop_assert_eq!(tag.text(FrameId::TITLE), expected_title);
        prop_assert_eq!(tag.text(FrameId::ARTIST), expected_artist);
        if tagged {
            let album = tag.text(FrameId::ALBUM);
            prop_assert_eq!(album.as_deref(), Some("Album"));
            prop_assert!(tag.frames.iter().any(|f| f.id().as_str() == "APIC"));
            prop_assert!(tag.frames.iter().any(|f| f.id().as_str() == "COMM"));
        }
    }

    #[test]
    fn reading_then_rendering_is_stable(
        major in prop_oneof![Just(3u8), Just(4u8)],
        padding in 0usize..128,
    ) {
        let (data, _) = source_file(major, true, 1);
        let tag = read_tag(&data).unwrap().unwrap();
        let rendered = render_tag(&tag, padding).unwrap();
        let again = read_tag(&rendered).unwrap().unwrap();
        prop_assert_eq!(&again.frames, &tag.frames);
        prop_assert_eq!(render_tag(&again, padding).unwrap(), rendered);
    }
}
