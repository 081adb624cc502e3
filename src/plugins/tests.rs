use super::onset::{DETECTION_FUNCTION, ONSETS, PARAM_ONSET_TYPE, PARAM_PEAK_PICK_THRESHOLD};
use super::region::{NOISY, SILENCE_END, SILENCE_START, SILENT};
use super::silence::{PARAM_SILENCE_THRESHOLD, SILENCE_LEVEL};
use super::*;
use crate::analysis::OnsetFunctionType;
use crate::config::OnsetConfig;
use crate::error::PluginError;
use crate::plugin::{FeatureSet, Plugin, RealTime};

const RATE: u32 = 48000;

/// Deterministic low-level noise so that nothing is vetoed as silent
fn noise(len: usize, amplitude: f32) -> Vec<f32> {
    let mut state = 0x2545_f491_u32;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            ((state >> 8) as f32 / (1 << 24) as f32 * 2.0 - 1.0) * amplitude
        })
        .collect()
}

/// Noise with a full-scale click at the start of each listed step
fn clicks(steps: usize, step: usize, at: &[usize]) -> Vec<f32> {
    let mut signal = noise(steps * step, 0.001);
    for &s in at {
        signal[s * step] = 1.0;
    }
    signal
}

fn run<P: Plugin>(plugin: &mut P, signal: &[f32], step: usize) -> Vec<FeatureSet> {
    signal
        .chunks_exact(step)
        .enumerate()
        .map(|(i, block)| {
            let timestamp = RealTime::from_frames((i * step) as i64, RATE);
            plugin.process(&[block], timestamp).unwrap()
        })
        .collect()
}

fn onset_steps(blocks: &[FeatureSet]) -> Vec<usize> {
    blocks
        .iter()
        .enumerate()
        .filter(|(_, features)| !features.get(ONSETS).is_empty())
        .map(|(i, _)| i)
        .collect()
}

fn stamps(blocks: &[FeatureSet], output: &str) -> Vec<i64> {
    blocks
        .iter()
        .flat_map(|features| features.get(output).iter())
        .map(|feature| feature.timestamp.unwrap().to_frames(RATE))
        .collect()
}

fn silent_then_loud(pattern: &[bool], step: usize) -> Vec<f32> {
    let loud = noise(step, 0.5);
    pattern
        .iter()
        .flat_map(|&silent| {
            if silent {
                vec![0.0; step]
            } else {
                loud.clone()
            }
        })
        .collect()
}

// ============================================================================
// Onset detector
// ============================================================================

#[test]
fn test_onset_process_before_initialise() {
    let mut plugin = OnsetPlugin::new(RATE as f32);
    let block = [0.0f32; 512];
    assert_eq!(
        plugin.process(&[&block], RealTime::ZERO),
        Err(PluginError::NotInitialised)
    );
}

#[test]
fn test_onset_rejects_wrong_channel_count() {
    let mut plugin = OnsetPlugin::new(RATE as f32);
    plugin.initialise(2, 512, 512).unwrap();
    let block = [0.0f32; 512];
    assert!(matches!(
        plugin.process(&[&block], RealTime::ZERO),
        Err(PluginError::ChannelCountMismatch { .. })
    ));
}

#[test]
fn test_onset_one_detection_value_per_step() {
    let mut plugin = OnsetPlugin::new(RATE as f32);
    plugin.initialise(2, 256, 256).unwrap();

    let left = clicks(40, 256, &[20]);
    let right = noise(40 * 256, 0.01);
    for (i, (l, r)) in left.chunks_exact(256).zip(right.chunks_exact(256)).enumerate() {
        let timestamp = RealTime::from_frames((i * 256) as i64, RATE);
        let features = plugin.process(&[l, r], timestamp).unwrap();

        let detection = features.get(DETECTION_FUNCTION);
        assert_eq!(detection.len(), 1);
        assert_eq!(detection[0].values.len(), 2);
        assert!(detection[0].timestamp.is_none());
        assert!(features.get(ONSETS).len() <= 1);
    }
}

#[test]
fn test_onsets_follow_clicks() {
    let config = OnsetConfig {
        function: OnsetFunctionType::Energy,
        ..OnsetConfig::default()
    };
    let mut plugin = OnsetPlugin::with_config(RATE as f32, config);
    plugin.initialise(1, 512, 512).unwrap();

    let signal = clicks(120, 512, &[30, 60, 90]);
    let onsets = onset_steps(&run(&mut plugin, &signal, 512));

    assert!(!onsets.is_empty());
    // Nothing between the startup transient and the first click
    assert!(onsets.iter().all(|&i| i < 9 || i >= 30));
    assert!(onsets.iter().filter(|&&i| i >= 30).count() >= 1);
}

#[test]
fn test_onset_silence_veto() {
    let mut plugin = OnsetPlugin::new(RATE as f32);
    plugin.initialise(1, 512, 512).unwrap();

    let signal = vec![0.0f32; 64 * 512];
    let blocks = run(&mut plugin, &signal, 512);

    assert!(onset_steps(&blocks).is_empty());
    assert!(blocks
        .iter()
        .all(|features| features.get(DETECTION_FUNCTION).len() == 1));
}

#[test]
fn test_onset_reset_replays_identically() {
    let mut plugin = OnsetPlugin::new(RATE as f32);
    plugin.initialise(1, 128, 128).unwrap();

    let signal = clicks(80, 128, &[20, 50]);
    let first = run(&mut plugin, &signal, 128);
    plugin.reset();
    let second = run(&mut plugin, &signal, 128);

    assert_eq!(first, second);
}

#[test]
fn test_all_detection_functions_differ() {
    let signal = clicks(60, 512, &[10, 25, 40]);
    let mut curves: Vec<Vec<f32>> = Vec::new();

    for function in OnsetFunctionType::ALL {
        let config = OnsetConfig {
            function,
            ..OnsetConfig::default()
        };
        let mut plugin = OnsetPlugin::with_config(RATE as f32, config);
        plugin.initialise(1, 512, 512).unwrap();

        let curve: Vec<f32> = run(&mut plugin, &signal, 512)
            .iter()
            .map(|features| features.get(DETECTION_FUNCTION)[0].values[0])
            .collect();
        assert!(curve.iter().all(|v| v.is_finite()), "{}", function);
        curves.push(curve);
    }

    for i in 0..curves.len() {
        for j in i + 1..curves.len() {
            assert_ne!(curves[i], curves[j]);
        }
    }
}

#[test]
fn test_onset_parameters() {
    let mut plugin = OnsetPlugin::new(RATE as f32);
    assert_eq!(plugin.parameter(PARAM_ONSET_TYPE), Some(6.0));
    assert_eq!(plugin.preferred_step_size(), 128);

    plugin.set_parameter(PARAM_ONSET_TYPE, 2.0).unwrap();
    assert_eq!(plugin.config().function, OnsetFunctionType::HighFrequencyContent);
    assert_eq!(plugin.preferred_step_size(), 512);

    assert!(matches!(
        plugin.set_parameter(PARAM_PEAK_PICK_THRESHOLD, 1.5),
        Err(PluginError::ParameterOutOfRange { .. })
    ));
    assert!(matches!(
        plugin.set_parameter("gain", 1.0),
        Err(PluginError::UnknownParameter { .. })
    ));
    assert_eq!(plugin.parameter("gain"), None);
}

#[test]
fn test_onset_type_change_applies_at_next_initialise() {
    let mut plugin = OnsetPlugin::new(RATE as f32);
    plugin.initialise(1, 512, 512).unwrap();
    assert_eq!(
        plugin.active_function(),
        Some(OnsetFunctionType::ModifiedKullbackLeibler)
    );

    plugin.set_parameter(PARAM_ONSET_TYPE, 0.0).unwrap();
    assert_eq!(
        plugin.active_function(),
        Some(OnsetFunctionType::ModifiedKullbackLeibler)
    );

    plugin.initialise(1, 512, 512).unwrap();
    assert_eq!(plugin.active_function(), Some(OnsetFunctionType::Energy));
}

#[test]
fn test_onset_outputs() {
    let mut plugin = OnsetPlugin::new(RATE as f32);
    plugin.initialise(3, 512, 512).unwrap();

    let outputs = plugin.output_descriptors();
    assert_eq!(outputs[0].identifier, ONSETS);
    assert_eq!(outputs[1].identifier, DETECTION_FUNCTION);
    assert_eq!(outputs[1].bin_count, 3);
    assert!(plugin.remaining_features().is_empty());
}

// ============================================================================
// Silence detector
// ============================================================================

#[test]
fn test_silence_process_before_initialise() {
    let mut plugin = SilencePlugin::new(RATE as f32, 2);
    let block = [0.0f32; 1024];
    assert_eq!(
        plugin.process(&[&block], RealTime::ZERO),
        Err(PluginError::NotInitialised)
    );
}

#[test]
fn test_silence_first_block_reports_level_only() {
    for silent in [true, false] {
        let mut plugin = SilencePlugin::new(RATE as f32, 2);
        plugin.initialise(1, 1024, 1024).unwrap();

        let signal = silent_then_loud(&[silent], 1024);
        let blocks = run(&mut plugin, &signal, 1024);

        assert_eq!(blocks[0].len(), 1);
        let level = blocks[0].get(SILENCE_LEVEL);
        assert_eq!(level[0].values, vec![if silent { 0.0 } else { 1.0 }]);
        assert_eq!(level[0].timestamp, Some(RealTime::ZERO));
    }
}

#[test]
fn test_silence_intervals() {
    let mut plugin = SilencePlugin::new(RATE as f32, 2);
    plugin.initialise(1, 1024, 1024).unwrap();

    let signal = silent_then_loud(&[false, false, true, true, false, false], 1024);
    let blocks = run(&mut plugin, &signal, 1024);

    assert_eq!(stamps(&blocks, SILENCE_LEVEL), vec![0, 2048, 4096]);

    let noisy: Vec<_> = blocks.iter().flat_map(|f| f.get(NOISY).to_vec()).collect();
    let silent: Vec<_> = blocks.iter().flat_map(|f| f.get(SILENT).to_vec()).collect();
    assert_eq!(noisy.len(), 1);
    assert_eq!(silent.len(), 1);
    assert_eq!(noisy[0].timestamp.unwrap().to_frames(RATE), 0);
    assert_eq!(noisy[0].duration.unwrap().to_frames(RATE), 2048);
    assert_eq!(silent[0].timestamp.unwrap().to_frames(RATE), 2048);
    assert_eq!(silent[0].duration.unwrap().to_frames(RATE), 2048);

    // The trailing noisy region is never reported
    assert!(plugin.remaining_features().is_empty());
}

#[test]
fn test_silence_markers_for_api_version_1() {
    let mut plugin = SilencePlugin::new(RATE as f32, 1);
    assert_eq!(plugin.plugin_version(), 2);
    plugin.initialise(1, 1024, 1024).unwrap();

    let signal = silent_then_loud(&[false, true, true, false], 1024);
    let blocks = run(&mut plugin, &signal, 1024);

    assert_eq!(stamps(&blocks, SILENCE_START), vec![1024]);
    assert_eq!(stamps(&blocks, SILENCE_END), vec![0, 3072]);
    assert!(blocks.iter().all(|f| f.get(SILENT).is_empty()));
}

#[test]
fn test_silence_outputs_by_api_version() {
    let ids = |api| -> Vec<&'static str> {
        SilencePlugin::new(RATE as f32, api)
            .output_descriptors()
            .iter()
            .map(|o| o.identifier)
            .collect()
    };
    assert_eq!(ids(1), vec![SILENCE_START, SILENCE_END, SILENCE_LEVEL]);
    assert_eq!(ids(2), vec![SILENT, NOISY, SILENCE_LEVEL]);
    let v2 = SilencePlugin::new(RATE as f32, 2);
    assert_eq!(v2.api_version(), 2);
    assert_eq!(v2.plugin_version(), 3);
}

#[test]
fn test_silence_refined_into_sound() {
    let mut plugin = SilencePlugin::new(RATE as f32, 2);
    plugin.initialise(1, 1024, 1024).unwrap();

    let mut signal = vec![0.0f32; 3 * 1024];
    signal[2 * 1024 + 300..].fill(0.5);
    let blocks = run(&mut plugin, &signal, 1024);

    // Window 288..304 is the first to contain sound
    assert_eq!(stamps(&blocks, SILENCE_LEVEL), vec![0, 2048 + 288]);
}

#[test]
fn test_silence_refined_before_block_boundary() {
    let mut plugin = SilencePlugin::new(RATE as f32, 2);
    plugin.initialise(1, 1024, 1024).unwrap();

    // Sound ends 300 frames before the third block starts
    let mut signal = vec![0.0f32; 4 * 1024];
    signal[..2 * 1024 - 300].fill(0.5);
    let blocks = run(&mut plugin, &signal, 1024);

    let levels = stamps(&blocks, SILENCE_LEVEL);
    assert_eq!(levels.len(), 2);
    let transition = levels[1];
    assert!(transition < 2048);
    assert!((transition - (2048 - 300)).abs() < 16);
}

#[test]
fn test_silence_threshold_applies_immediately() {
    let mut plugin = SilencePlugin::new(RATE as f32, 2);
    plugin.initialise(1, 1024, 1024).unwrap();

    // About -65 dB
    let quiet = noise(1024, 0.001);
    let first = plugin.process(&[&quiet], RealTime::ZERO).unwrap();
    assert_eq!(first.get(SILENCE_LEVEL)[0].values, vec![1.0]);

    plugin.set_parameter(PARAM_SILENCE_THRESHOLD, -40.0).unwrap();
    assert_eq!(plugin.threshold_db(), -40.0);
    let second = plugin
        .process(&[&quiet], RealTime::from_frames(1024, RATE))
        .unwrap();
    assert_eq!(second.get(SILENCE_LEVEL)[0].values, vec![0.0]);

    assert!(plugin.set_parameter(PARAM_SILENCE_THRESHOLD, 5.0).is_err());
    assert!(plugin.set_parameter("onsettype", 1.0).is_err());
}

#[test]
fn test_silence_trailing_region_not_reported() {
    let mut plugin = SilencePlugin::new(RATE as f32, 2);
    plugin.initialise(1, 1024, 1024).unwrap();

    let signal = silent_then_loud(&[false, true, true, true], 1024);
    run(&mut plugin, &signal, 1024);

    assert!(plugin.remaining_features().is_empty());
}

#[test]
fn test_silence_reset_replays_identically() {
    let mut plugin = SilencePlugin::new(RATE as f32, 2);
    plugin.initialise(1, 512, 512).unwrap();

    let mut signal = silent_then_loud(&[true, false, false, true, false, true], 512);
    signal[700] = 0.0;
    let first = run(&mut plugin, &signal, 512);
    plugin.reset();
    let second = run(&mut plugin, &signal, 512);

    assert_eq!(first, second);
}
