//! Mixdown Integration Tests
//!
//! Tests for:
//! - Additive summation and effective gain (track × clip volume)
//! - Mix length = longest clip, silence past shorter clips
//! - Mono-to-stereo fan-out in the exported WAV
//! - Sample rate policies (resample / reject)
//! - Live render parity with the offline mixdown
//! - Export presets and writing to disk

use approx::assert_abs_diff_eq;
use tm_core::{
    AudioBuffer, ExportBitDepth, MixConfig, MixError, SampleRatePolicy, SourceKind, TrackId,
};
use tm_engine::{MixSession, MixdownEngine};
use tm_file::{LoadedClip, decode_bytes};

// ═══════════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

const TEST_SAMPLE_RATE: u32 = 8000;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Deterministic mono test signal: `seconds` long, shaped by `seed`
fn create_test_signal(seconds: f64, rate: u32, seed: f64) -> AudioBuffer {
    let frames = (seconds * rate as f64).round() as usize;
    let samples = (0..frames)
        .map(|i| (i as f64 * 0.01 + seed).sin() * 0.4)
        .collect();
    AudioBuffer::mono(samples, rate)
}

fn loaded(name: &str, buffer: AudioBuffer) -> LoadedClip {
    LoadedClip {
        name: name.to_string(),
        kind: SourceKind::File,
        buffer,
    }
}

/// Session with one track per buffer
fn create_test_session(config: MixConfig, buffers: Vec<AudioBuffer>) -> (MixSession, Vec<TrackId>) {
    let mut session = MixSession::new(config);
    let tracks = buffers
        .into_iter()
        .enumerate()
        .map(|(i, buffer)| {
            let track = session.create_track();
            session
                .attach_loaded(track, loaded(&format!("clip{i}"), buffer))
                .unwrap();
            track
        })
        .collect();
    (session, tracks)
}

fn render_offline(session: &MixSession) -> AudioBuffer {
    MixdownEngine::new(session.config().clone())
        .render(&session.mix_inputs().unwrap())
        .unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════════
// SUMMATION
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_equal_clips_sum_sample_by_sample() {
    init_logging();
    let signals: Vec<AudioBuffer> = (0..3)
        .map(|i| create_test_signal(1.0, TEST_SAMPLE_RATE, i as f64))
        .collect();
    let (session, _) = create_test_session(MixConfig::default(), signals.clone());

    let mixed = render_offline(&session);

    assert_eq!(mixed.num_frames(), TEST_SAMPLE_RATE as usize);
    for i in (0..mixed.num_frames()).step_by(97) {
        let expected: f64 = signals.iter().map(|s| s.channels[0][i]).sum();
        assert_abs_diff_eq!(mixed.channels[0][i], expected, epsilon = 1e-12);
        assert_abs_diff_eq!(mixed.channels[1][i], expected, epsilon = 1e-12);
    }
}

#[test]
fn test_duration_follows_longest_clip() {
    let long = create_test_signal(2.0, TEST_SAMPLE_RATE, 0.0);
    let short = create_test_signal(0.5, TEST_SAMPLE_RATE, 1.0);
    let (session, _) = create_test_session(MixConfig::default(), vec![short.clone(), long.clone()]);

    let mixed = render_offline(&session);
    assert_eq!(mixed.num_frames(), long.num_frames());
    assert_abs_diff_eq!(mixed.duration(), 2.0, epsilon = 1e-9);

    // Past the short clip only the long one is audible
    let i = short.num_frames() + 10;
    assert_abs_diff_eq!(mixed.channels[0][i], long.channels[0][i], epsilon = 1e-12);
}

#[test]
fn test_empty_session_is_empty_mix() {
    let mut session = MixSession::default();
    session.create_track();

    assert_eq!(session.export_mix().unwrap_err(), MixError::EmptyMix);
}

#[test]
fn test_track_volume_scales_clips() {
    let signal = create_test_signal(0.25, TEST_SAMPLE_RATE, 0.3);
    let (mut session, tracks) = create_test_session(MixConfig::default(), vec![signal.clone()]);
    session.set_track_volume(tracks[0], 0.5).unwrap();

    let clip = session.track(tracks[0]).unwrap().clips()[0].id;
    session.set_clip_volume(tracks[0], clip, 0.5).unwrap();

    let mixed = render_offline(&session);
    assert_abs_diff_eq!(
        mixed.channels[0][100],
        signal.channels[0][100] * 0.25,
        epsilon = 1e-12
    );
}

#[test]
fn test_loop_flag_does_not_extend_mix() {
    let short = create_test_signal(0.5, TEST_SAMPLE_RATE, 0.0);
    let long = create_test_signal(1.0, TEST_SAMPLE_RATE, 0.0);
    let (mut session, tracks) = create_test_session(MixConfig::default(), vec![short, long]);

    let clip = session.track(tracks[0]).unwrap().clips()[0].id;
    session.set_clip_loop(clip, true).unwrap();

    let mixed = render_offline(&session);
    assert_eq!(mixed.num_frames(), TEST_SAMPLE_RATE as usize);
    let i = TEST_SAMPLE_RATE as usize * 3 / 4;
    assert_abs_diff_eq!(
        mixed.channels[0][i],
        session.track(tracks[1]).unwrap().clips()[0].buffer().channels[0][i],
        epsilon = 1e-12
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXPORT
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_two_mono_clips_export_to_stereo_wav() {
    init_logging();
    let clip1 = create_test_signal(4.0, TEST_SAMPLE_RATE, 0.0);
    let clip2 = create_test_signal(4.0, TEST_SAMPLE_RATE, 2.0);
    let (mut session, tracks) =
        create_test_session(MixConfig::default(), vec![clip1.clone(), clip2.clone()]);

    let second = session.track(tracks[1]).unwrap().clips()[0].id;
    session.set_clip_volume(tracks[1], second, 0.5).unwrap();

    let export = session.export_mix().unwrap();
    assert_eq!(export.filename, "mixed-audio.wav");
    assert_eq!(export.channels, 2);
    assert_eq!(export.sample_rate, TEST_SAMPLE_RATE);
    assert_abs_diff_eq!(export.duration(), 4.0, epsilon = 1e-9);

    let decoded = decode_bytes(export.bytes, Some("wav")).unwrap();
    assert_eq!(decoded.num_channels(), 2);
    assert_eq!(decoded.num_frames(), clip1.num_frames());

    for i in (0..decoded.num_frames()).step_by(211) {
        let expected = clip1.channels[0][i] + 0.5 * clip2.channels[0][i];
        assert_abs_diff_eq!(decoded.channels[0][i], expected, epsilon = 1e-6);
        assert_abs_diff_eq!(decoded.channels[1][i], expected, epsilon = 1e-6);
    }
}

#[test]
fn test_float_export_keeps_overs() {
    let loud = AudioBuffer::mono(vec![0.9; 800], TEST_SAMPLE_RATE);
    let (session, _) = create_test_session(MixConfig::default(), vec![loud.clone(), loud]);

    let export = session.export_mix().unwrap();
    assert_abs_diff_eq!(export.peak, 1.8, epsilon = 1e-12);

    let decoded = decode_bytes(export.bytes, Some("wav")).unwrap();
    assert_abs_diff_eq!(decoded.peak(), 1.8, epsilon = 1e-6);
}

#[test]
fn test_cd_quality_preset() {
    let loud = AudioBuffer::mono(vec![0.9; 4410], 44100);
    let (session, _) = create_test_session(MixConfig::cd_quality(), vec![loud.clone(), loud]);

    let export = session.export_mix().unwrap();
    assert_eq!(export.bit_depth, ExportBitDepth::Int16);
    assert_eq!(export.sample_rate, 44100);
    assert_abs_diff_eq!(export.peak, 0.988, epsilon = 1e-9);
}

#[test]
fn test_write_to_directory() {
    let dir = tempfile::tempdir().unwrap();
    let (session, _) = create_test_session(
        MixConfig::default(),
        vec![create_test_signal(0.1, TEST_SAMPLE_RATE, 0.0)],
    );

    let export = session.export_mix().unwrap();
    let path = export.write_to(dir.path()).unwrap();

    assert_eq!(path, dir.path().join("mixed-audio.wav"));
    assert_eq!(std::fs::read(&path).unwrap(), export.bytes);
}

// ═══════════════════════════════════════════════════════════════════════════════
// SAMPLE RATES
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_reject_policy_mismatch() {
    let config = MixConfig::default().with_policy(SampleRatePolicy::Reject);
    let (session, _) = create_test_session(
        config,
        vec![
            create_test_signal(0.1, 44100, 0.0),
            create_test_signal(0.1, 48000, 0.0),
        ],
    );

    assert_eq!(
        session.export_mix().unwrap_err(),
        MixError::SampleRateMismatch {
            expected: 44100,
            found: 48000
        }
    );
}

#[test]
fn test_resample_policy_uses_highest_rate() {
    let (session, _) = create_test_session(
        MixConfig::default(),
        vec![
            create_test_signal(1.0, 22050, 0.0),
            create_test_signal(0.5, 44100, 0.0),
        ],
    );

    let mixed = render_offline(&session);
    assert_eq!(mixed.sample_rate, 44100);
    assert_abs_diff_eq!(mixed.duration(), 1.0, epsilon = 1e-3);
}

// ═══════════════════════════════════════════════════════════════════════════════
// LIVE PARITY
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_live_render_matches_mixdown() {
    let config = MixConfig::default().with_sample_rate(TEST_SAMPLE_RATE);
    let (mut session, tracks) = create_test_session(
        config,
        vec![
            create_test_signal(1.0, TEST_SAMPLE_RATE, 0.0),
            create_test_signal(0.5, TEST_SAMPLE_RATE, 1.5),
        ],
    );
    session.set_track_volume(tracks[1], 0.7).unwrap();

    let offline = render_offline(&session);

    session.play_all();
    let block = TEST_SAMPLE_RATE as usize / 8;
    let mut live = vec![Vec::new(), Vec::new()];
    while live[0].len() < offline.num_frames() {
        let rendered = session.render(block);
        for (out, ch) in live.iter_mut().zip(rendered.channels) {
            out.extend(ch);
        }
    }

    assert_eq!(live[0].len(), offline.num_frames());
    for ch in 0..2 {
        for (a, b) in live[ch].iter().zip(&offline.channels[ch]) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    // Everything ran to its end
    assert!(!session.is_playing());
}
