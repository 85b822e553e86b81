use std::io::Cursor;

use super::*;
use crate::config::Pacing;
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::ReelError;
use crate::progress::RenderStatus;
use crate::scene::model::{Animation, MediaPayload, SceneId};

fn lens(ranges: &[SubRange]) -> Vec<usize> {
    ranges.iter().map(|r| r.len()).collect()
}

#[test]
fn halves_round_odd_counts_per_rule() {
    let items = [(); 29];
    assert_eq!(lens(&split_scenes(&items, &SplitRule::halves())), vec![15, 14]);
    let floor = SplitRule::Halves {
        first: HalfRounding::Floor,
    };
    assert_eq!(lens(&split_scenes(&items, &floor)), vec![14, 15]);
    assert_eq!(lens(&split_scenes(&[(); 1], &floor)), vec![1]);
}

#[test]
fn splits_are_contiguous_and_cover_everything() {
    let rules = [
        SplitRule::Whole,
        SplitRule::halves(),
        SplitRule::MaxScenesPerPart(4),
        SplitRule::MaxScenesPerPart(0),
        SplitRule::Parts(3),
        SplitRule::Parts(50),
    ];
    for n in 1..=12usize {
        let items = vec![0u8; n];
        for rule in &rules {
            let ranges = split_scenes(&items, rule);
            assert_eq!(ranges.first().unwrap().start, 0);
            assert_eq!(ranges.last().unwrap().end, n);
            assert!(ranges.iter().all(|r| !r.is_empty()));
            assert!(ranges.windows(2).all(|w| w[0].end == w[1].start));
            assert_eq!(lens(&ranges).iter().sum::<usize>(), n, "{rule:?} n={n}");
        }
    }
}

#[test]
fn parts_give_remainder_to_earlier_parts() {
    assert_eq!(lens(&split_scenes(&[(); 10], &SplitRule::Parts(3))), vec![4, 3, 3]);
    assert_eq!(
        lens(&split_scenes(&[(); 10], &SplitRule::MaxScenesPerPart(4))),
        vec![4, 4, 2]
    );
    assert!(split_scenes::<u8>(&[], &SplitRule::Whole).is_empty());
}

fn png() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([1, 2, 3, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn scenes(n: usize) -> Vec<SceneDescriptor> {
    let bytes = png();
    (0..n)
        .map(|i| SceneDescriptor {
            id: SceneId::new(format!("s{i}")),
            sequence_index: i as u32 + 7,
            duration_secs: 0.2,
            image: MediaPayload::new(bytes.clone(), "image/png"),
            narration_audio: None,
            caption_text: None,
            animation: Animation::default(),
        })
        .collect()
}

fn controller() -> ExportController {
    ExportController::new(
        RenderConfig {
            canvas: Canvas {
                width: 16,
                height: 8,
            },
            fps: Fps::new(10, 1).unwrap(),
            ..RenderConfig::default()
        }
        .with_pacing(Pacing::Offline),
    )
}

#[test]
fn export_renders_each_part_sequentially_with_labels() {
    let scenes = scenes(5);
    let mut seen = Vec::new();
    let outcome = controller().export(
        &scenes,
        &SplitRule::halves(),
        &InMemoryEncoderFactory::default(),
        &mut |label, ev| seen.push((label.part_index, ev.status)),
    );

    assert!(outcome.is_success());
    assert_eq!(outcome.parts.len(), 2);
    assert_eq!(outcome.parts[0].label.scene_range, 0..3);
    assert_eq!(outcome.parts[1].label.scene_range, 3..5);
    assert_eq!(outcome.parts[0].result.scene_count, 3);
    assert_eq!(outcome.parts[1].result.frame_count, 4);
    assert!(outcome.parts.iter().all(|p| p.result.success));

    // Part 0 finishes before part 1 starts.
    let first_p1 = seen.iter().position(|(p, _)| *p == 1).unwrap();
    assert_eq!(seen[first_p1 - 1], (0, RenderStatus::Complete));
    assert!(seen[first_p1..].iter().all(|(p, _)| *p == 1));
}

struct BrokenSecondPart;

impl EncoderFactory for BrokenSecondPart {
    fn create(&self, label: &SubRangeLabel) -> ReelResult<Box<dyn StreamEncoder>> {
        if label.part_index == 1 {
            return Err(ReelError::encode("no encoder for part 2"));
        }
        Ok(Box::new(InMemoryEncoder::indices_only()))
    }
}

#[test]
fn export_stops_after_first_failed_part() {
    let outcome = controller().export(
        &scenes(6),
        &SplitRule::Parts(3),
        &BrokenSecondPart,
        &mut |_, _| {},
    );
    assert!(!outcome.is_success());
    assert_eq!(outcome.parts.len(), 2);
    assert!(outcome.parts[0].result.success);
    assert!(!outcome.parts[1].result.success);
    assert_eq!(outcome.error.as_deref(), Some("encode error: no encoder for part 2"));
}

#[test]
fn export_of_nothing_is_an_error() {
    let outcome = controller().export(
        &[],
        &SplitRule::Whole,
        &InMemoryEncoderFactory::default(),
        &mut |_, _| {},
    );
    assert!(outcome.parts.is_empty());
    let expected = ReelError::validation("export requires at least one scene").to_string();
    assert_eq!(outcome.error.as_deref(), Some(expected.as_str()));
    assert!(expected.starts_with("validation error:"));
}
