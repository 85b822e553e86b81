use super::*;

#[test]
fn virtual_clock_jumps_to_deadlines_and_never_rewinds() {
    let mut c = VirtualClock::new();
    c.start();
    assert_eq!(c.elapsed_secs(), 0.0);
    c.sleep_until(1.5);
    assert_eq!(c.elapsed_secs(), 1.5);
    c.sleep_until(0.5);
    assert_eq!(c.elapsed_secs(), 1.5);
    c.sleep_until(f64::NAN);
    assert_eq!(c.elapsed_secs(), 1.5);
}

#[test]
fn wall_clock_sleeps_until_deadline() {
    let mut c = WallClock::new();
    c.start();
    c.sleep_until(0.02);
    assert!(c.elapsed_secs() >= 0.02);
}

#[test]
fn audio_clock_is_sample_quantized() {
    let mut c = AudioClock::new(100);
    c.start();
    c.sleep_until(0.035);
    let t = c.elapsed_secs();
    assert!(t >= 0.035);
    let samples = t * 100.0;
    assert!((samples - samples.round()).abs() < 1e-9);
}

#[test]
fn clock_selection_follows_pacing_and_audio() {
    assert_eq!(clock_for(Pacing::Offline, Some(48_000)).name(), "virtual");
    assert_eq!(clock_for(Pacing::Realtime, Some(48_000)).name(), "audio");
    assert_eq!(clock_for(Pacing::Realtime, None).name(), "wall");
}
