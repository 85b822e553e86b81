use super::*;

fn fps30() -> Fps {
    Fps::new(30, 1).unwrap()
}

#[test]
fn frame_counts_and_offsets_accumulate() {
    let tl = Timeline::from_durations([5.0, 2.5, 0.01], fps30()).unwrap();
    assert_eq!(tl.scene_count(), 3);
    assert_eq!(tl.scene_frames(0), Some(150));
    assert_eq!(tl.scene_frames(1), Some(75));
    // Very short scenes still get one frame.
    assert_eq!(tl.scene_frames(2), Some(1));
    assert_eq!(tl.total_frames(), 226);
    assert!((tl.total_duration_secs() - 7.51).abs() < 1e-9);

    let r1 = tl.scene_range(1).unwrap();
    assert_eq!((r1.start.0, r1.end.0), (150, 225));
    assert_eq!(tl.scene_start_secs(2), Some(7.5));
}

#[test]
fn locate_maps_boundaries_and_rejects_past_end() {
    let tl = Timeline::from_durations([1.0, 1.0], fps30()).unwrap();

    let p = tl.locate(FrameIndex(0)).unwrap();
    assert_eq!((p.scene_index, p.frame_in_scene, p.scene_frames), (0, 0, 30));

    let p = tl.locate(FrameIndex(29)).unwrap();
    assert_eq!((p.scene_index, p.frame_in_scene), (0, 29));

    let p = tl.locate(FrameIndex(30)).unwrap();
    assert_eq!((p.scene_index, p.frame_in_scene), (1, 0));
    assert_eq!(p.progress(), 0.0);

    assert!(tl.locate(FrameIndex(59)).is_some());
    assert!(tl.locate(FrameIndex(60)).is_none());
}

#[test]
fn every_frame_in_range_locates() {
    let tl = Timeline::from_durations([0.7, 1.3, 2.0], fps30()).unwrap();
    let range = tl.frame_range();
    for f in range.start.0..range.end.0 {
        assert!(tl.locate(FrameIndex(f)).is_some(), "frame {f} unmapped");
    }
}

#[test]
fn scene_start_sample_rounds_cumulative_seconds() {
    let tl = Timeline::from_durations([5.0, 5.0], fps30()).unwrap();
    assert_eq!(tl.scene_start_sample(0, 48_000), Some(0));
    assert_eq!(tl.scene_start_sample(1, 48_000), Some(240_000));
    assert_eq!(tl.scene_start_sample(2, 48_000), None);

    let tl = Timeline::from_durations([1.00001], fps30()).unwrap();
    assert_eq!(tl.scene_start_sample(0, 44_100), Some(0));
}

#[test]
fn rejects_empty_and_invalid_durations() {
    assert!(Timeline::from_durations(Vec::<f64>::new(), fps30()).is_err());
    assert!(Timeline::from_durations([1.0, 0.0], fps30()).is_err());
    assert!(Timeline::from_durations([f64::NAN], fps30()).is_err());
    assert!(Timeline::from_durations([1.0], Fps { num: 30, den: 0 }).is_err());
}

#[test]
fn fractional_durations_do_not_accumulate_drift() {
    let fps = fps30();
    let tl = Timeline::from_durations(vec![2.55; 29], fps).unwrap();
    let declared = 2.55 * 29.0;
    let video_secs = fps.frames_to_secs(tl.total_frames());
    assert!(
        (video_secs - declared).abs() <= fps.frame_duration_secs(),
        "video {video_secs} vs declared {declared}"
    );

    // Video scene starts stay within half a frame of the narration offsets.
    for i in 0..tl.scene_count() {
        let video_start = fps.frames_to_secs(tl.scene_range(i).unwrap().start.0);
        let audio_start = tl.scene_start_sample(i, 48_000).unwrap() as f64 / 48_000.0;
        assert!(
            (video_start - audio_start).abs() <= fps.frame_duration_secs() / 2.0 + 1.0 / 48_000.0,
            "scene {i}: video {video_start} audio {audio_start}"
        );
    }

    // 2.55 s is 76.5 frames: scenes alternate between 77 and 76 frames.
    let counts: Vec<u64> = (0..4).map(|i| tl.scene_frames(i).unwrap()).collect();
    assert_eq!(counts.iter().sum::<u64>(), 306);
}

#[test]
fn one_frame_minimum_snaps_back_onto_grid() {
    let tl = Timeline::from_durations([0.001, 0.001, 1.0], fps30()).unwrap();
    assert_eq!(tl.scene_frames(0), Some(1));
    assert_eq!(tl.scene_frames(1), Some(1));
    // Boundary after scene 2 is round(1.002 * 30) = 30.
    assert_eq!(tl.scene_frames(2), Some(28));
    assert_eq!(tl.total_frames(), 30);
}
