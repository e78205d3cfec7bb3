//! Session configuration: layout, filter tuning, finger table, MIDI output.
//!
//! Defaults are compiled in (and mirrored by the embedded
//! `default_config.toml`).  A user TOML file may override any section;
//! sections it leaves out keep their defaults.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::bellows::BellowsTracker;
use crate::button::{ButtonDefinition, ButtonLayout};
use crate::engine::InputMode;
use crate::estimator::{self, ScalarEstimator};
use crate::pitch::{Organ, Pitch};
use crate::pose::{Hand, JointName, TrackedPoint};
use crate::proximity::{FingerStatus, ProximityTrigger, DEFAULT_TRIGGER_DISTANCE};
use crate::reconcile::StablePolicy;

/// The embedded default configuration, as TOML text.
pub const DEFAULT_CONFIG: &str = include_str!("../default_config.toml");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {path}: {source}")]
    Io {
        path:   String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ════════════════════════════════════════════════════════════════════════════
// Config
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub struct EstimatorConfig {
    pub process_noise:      f32,
    pub measurement_noise:  f32,
    pub initial_value:      f32,
    pub initial_covariance: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MidiConfig {
    pub program:  u8,
    pub velocity: u8,
    pub channel:  u8,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct FingerConfig {
    pub hand:    Hand,
    pub tip:     JointName,
    pub knuckle: JointName,
    pub note:    Pitch,
    #[serde(default = "default_trigger_distance")]
    pub trigger_distance: f32,
}

fn default_trigger_distance() -> f32 { DEFAULT_TRIGGER_DISTANCE }

/// Everything a session needs to start.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub estimator:     EstimatorConfig,
    pub stable_band:   f32,
    pub stable_policy: StablePolicy,
    pub mode:          InputMode,
    pub midi:          MidiConfig,
    pub layout:        Vec<ButtonDefinition>,
    pub fingers:       Vec<FingerConfig>,
}

impl Default for Config {
    fn default() -> Self {
        let finger = |tip, knuckle, note| FingerConfig {
            hand: Hand::Left,
            tip,
            knuckle,
            note,
            trigger_distance: DEFAULT_TRIGGER_DISTANCE,
        };
        Config {
            estimator: EstimatorConfig {
                process_noise:      estimator::DEFAULT_PROCESS_NOISE,
                measurement_noise:  estimator::DEFAULT_MEASUREMENT_NOISE,
                initial_value:      estimator::DEFAULT_INITIAL_VALUE,
                initial_covariance: estimator::DEFAULT_INITIAL_COVARIANCE,
            },
            stable_band:   0.0,
            stable_policy: StablePolicy::Silence,
            mode:          InputMode::Buttons,
            midi: MidiConfig {
                program:  Organ::Accordion.program(),
                velocity: 100,
                channel:  0,
            },
            layout:  ButtonLayout::default().buttons().to_vec(),
            fingers: vec![
                finger(JointName::IndexFingerTip,  JointName::IndexFingerKnuckle,  69),
                finger(JointName::MiddleFingerTip, JointName::MiddleFingerKnuckle, 71),
            ],
        }
    }
}

impl Config {
    /// Defaults, overridden by the file at `path` when one is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut cfg = Config::default();
        if let Some(path) = path {
            let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
            let file = parse(&text, &path.display().to_string())?;
            cfg.apply(file);
            log::info!(target: "config", "loaded {}", path.display());
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Defaults overridden by TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let mut cfg = Config::default();
        cfg.apply(parse(text, "<string>")?);
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        let e = &self.estimator;
        if !(e.process_noise >= 0.0) {
            return invalid(format!("process_noise must be >= 0, got {}", e.process_noise));
        }
        if !(e.measurement_noise > 0.0) {
            return invalid(format!("measurement_noise must be > 0, got {}", e.measurement_noise));
        }
        if !(e.initial_covariance >= 0.0) {
            return invalid(format!("initial_covariance must be >= 0, got {}", e.initial_covariance));
        }
        if !(self.stable_band >= 0.0) {
            return invalid(format!("stable_band must be >= 0, got {}", self.stable_band));
        }

        if self.midi.program > 127 || self.midi.velocity > 127 || self.midi.channel > 15 {
            return invalid(format!(
                "midi out of range: program {} velocity {} channel {}",
                self.midi.program, self.midi.velocity, self.midi.channel
            ));
        }

        if self.layout.is_empty() {
            return invalid("layout has no buttons".to_string());
        }
        for (i, b) in self.layout.iter().enumerate() {
            if b.in_note > 127 || b.out_note > 127 {
                return invalid(format!("button {} has a pitch above 127: {:?}", i, b));
            }
            if self.layout[..i].contains(b) {
                return invalid(format!("button {} duplicates an earlier button: {:?}", i, b));
            }
        }

        for (i, f) in self.fingers.iter().enumerate() {
            if f.note > 127 {
                return invalid(format!("finger {} note {} is above 127", i, f.note));
            }
            if !(f.trigger_distance > 0.0) {
                return invalid(format!(
                    "finger {} trigger_distance must be > 0, got {}",
                    i, f.trigger_distance
                ));
            }
        }
        Ok(())
    }

    // ── builders for the engine's parts ───────────────────────────────────

    pub fn button_layout(&self) -> ButtonLayout {
        ButtonLayout::register(self.layout.clone())
    }

    pub fn estimator(&self) -> ScalarEstimator {
        let e = &self.estimator;
        ScalarEstimator::with_params(
            e.process_noise, e.measurement_noise, e.initial_value, e.initial_covariance,
        )
    }

    pub fn bellows_tracker(&self) -> BellowsTracker {
        BellowsTracker::new(self.estimator(), self.stable_band)
    }

    pub fn proximity_trigger(&self) -> ProximityTrigger {
        ProximityTrigger::new(
            self.fingers
                .iter()
                .map(|f| FingerStatus::new(
                    TrackedPoint::Joint(f.hand, f.tip),
                    TrackedPoint::Joint(f.hand, f.knuckle),
                    f.note,
                    f.trigger_distance,
                ))
                .collect(),
        )
    }

    fn apply(&mut self, file: ConfigFile) {
        let ConfigFile { estimator, bellows, input, midi, layout, fingers } = file;

        if let Some(v) = estimator.process_noise      { self.estimator.process_noise = v; }
        if let Some(v) = estimator.measurement_noise  { self.estimator.measurement_noise = v; }
        if let Some(v) = estimator.initial_value      { self.estimator.initial_value = v; }
        if let Some(v) = estimator.initial_covariance { self.estimator.initial_covariance = v; }

        if let Some(v) = bellows.stable_band   { self.stable_band = v; }
        if let Some(v) = bellows.stable_policy { self.stable_policy = v; }

        if let Some(v) = input.mode { self.mode = v; }

        if let Some(v) = midi.program  { self.midi.program = v; }
        if let Some(v) = midi.velocity { self.midi.velocity = v; }
        if let Some(v) = midi.channel  { self.midi.channel = v; }

        if let Some(pairs) = layout.buttons {
            self.layout = pairs.into_iter().map(ButtonDefinition::from).collect();
        }
        if let Some(fingers) = fingers {
            self.fingers = fingers;
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// On-disk shape
// ════════════════════════════════════════════════════════════════════════════

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    estimator: EstimatorSection,
    #[serde(default)]
    bellows:   BellowsSection,
    #[serde(default)]
    input:     InputSection,
    #[serde(default)]
    midi:      MidiSection,
    #[serde(default)]
    layout:    LayoutSection,
    fingers:   Option<Vec<FingerConfig>>,
}

#[derive(Deserialize, Default)]
struct EstimatorSection {
    process_noise:      Option<f32>,
    measurement_noise:  Option<f32>,
    initial_value:      Option<f32>,
    initial_covariance: Option<f32>,
}

#[derive(Deserialize, Default)]
struct BellowsSection {
    stable_band:   Option<f32>,
    stable_policy: Option<StablePolicy>,
}

#[derive(Deserialize, Default)]
struct InputSection {
    mode: Option<InputMode>,
}

#[derive(Deserialize, Default)]
struct MidiSection {
    program:  Option<u8>,
    velocity: Option<u8>,
    channel:  Option<u8>,
}

#[derive(Deserialize, Default)]
struct LayoutSection {
    buttons: Option<Vec<(Pitch, Pitch)>>,
}

fn parse(text: &str, origin: &str) -> Result<ConfigFile, ConfigError> {
    toml::from_str(text).map_err(|source| ConfigError::Parse {
        origin: origin.to_string(),
        source,
    })
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn embedded_default_matches_compiled_default() {
        let parsed = Config::from_toml_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn empty_text_is_all_defaults() {
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn partial_override_keeps_other_sections() {
        let cfg = Config::from_toml_str(
            "[bellows]\nstable_band = 0.002\nstable_policy = \"hold\"\n",
        )
        .unwrap();
        assert_eq!(cfg.stable_band, 0.002);
        assert_eq!(cfg.stable_policy, StablePolicy::Hold);
        assert_eq!(cfg.layout.len(), 20);
        assert_eq!(cfg.midi.program, 21);
    }

    #[test]
    fn layout_override_replaces_table() {
        let cfg = Config::from_toml_str("[layout]\nbuttons = [[60, 62], [64, 65]]\n").unwrap();
        assert_eq!(cfg.button_layout().len(), 2);
        assert_eq!(cfg.layout[1], ButtonDefinition::new(64, 65));
    }

    #[test]
    fn proximity_mode_and_fingers() {
        let cfg = Config::from_toml_str(
            r#"
            [input]
            mode = "proximity"

            [[fingers]]
            hand    = "right"
            tip     = "ring_finger_tip"
            knuckle = "ring_finger_knuckle"
            note    = 60
            "#,
        )
        .unwrap();
        assert_eq!(cfg.mode, InputMode::Proximity);
        let trig = cfg.proximity_trigger();
        assert_eq!(trig.fingers().len(), 1);
        let f = &trig.fingers()[0];
        assert_eq!(f.tip, TrackedPoint::Joint(Hand::Right, JointName::RingFingerTip));
        assert_eq!(f.trigger_distance, DEFAULT_TRIGGER_DISTANCE);
    }

    #[test]
    fn rejects_duplicate_buttons() {
        let err = Config::from_toml_str("[layout]\nbuttons = [[60, 62], [60, 62]]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "{}", err);
    }

    #[test]
    fn rejects_empty_layout_and_bad_pitch() {
        assert!(Config::from_toml_str("[layout]\nbuttons = []\n").is_err());
        assert!(Config::from_toml_str("[layout]\nbuttons = [[60, 128]]\n").is_err());
    }

    #[test]
    fn rejects_bad_numbers() {
        assert!(Config::from_toml_str("[estimator]\nmeasurement_noise = 0.0\n").is_err());
        assert!(Config::from_toml_str("[bellows]\nstable_band = -1.0\n").is_err());
        assert!(Config::from_toml_str("[midi]\nchannel = 16\n").is_err());
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = Config::from_toml_str("[bellows\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        let err = Config::from_toml_str("[nonsense]\nx = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn load_reads_user_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[midi]\nprogram = 23\nvelocity = 90").unwrap();
        let cfg = Config::load(Some(file.path())).unwrap();
        assert_eq!(cfg.midi.program, Organ::TangoAccordion.program());
        assert_eq!(cfg.midi.velocity, 90);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn load_without_path_is_default() {
        assert_eq!(Config::load(None).unwrap(), Config::default());
    }
}
