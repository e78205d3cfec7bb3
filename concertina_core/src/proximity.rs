//! Finger-curl triggering: the simpler of the two input modes.
//!
//! Each tracked finger owns a note.  Curling the finger so its tip comes
//! within `trigger_distance` of its knuckle starts the note; straightening
//! it stops the note.  The `is_playing` latch keeps a held curl from
//! re-triggering every frame.

use crate::pitch::Pitch;
use crate::pose::{Hand, JointName, PoseFrame, TrackedPoint};
use crate::synth::{NoteCommand, Synthesizer};

/// Tip-to-knuckle distance (metres) below which a finger counts as curled.
pub const DEFAULT_TRIGGER_DISTANCE: f32 = 0.05;

// ════════════════════════════════════════════════════════════════════════════
// FingerStatus
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub struct FingerStatus {
    pub tip:              TrackedPoint,
    pub knuckle:          TrackedPoint,
    pub is_playing:       bool,
    pub note:             Pitch,
    pub trigger_distance: f32,
}

impl FingerStatus {
    pub fn new(tip: TrackedPoint, knuckle: TrackedPoint, note: Pitch, trigger_distance: f32) -> Self {
        FingerStatus { tip, knuckle, is_playing: false, note, trigger_distance }
    }

    /// Advance the latch with this tick's tip-to-knuckle distance.
    ///
    /// Returns the command to emit, if any.
    pub fn step(&mut self, distance: f32) -> Option<NoteCommand> {
        if distance < self.trigger_distance {
            if self.is_playing {
                return None;
            }
            self.is_playing = true;
            Some(NoteCommand::On(self.note))
        } else if self.is_playing {
            self.is_playing = false;
            Some(NoteCommand::Off(self.note))
        } else {
            None
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ProximityTrigger
// ════════════════════════════════════════════════════════════════════════════

/// The table of tracked fingers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProximityTrigger {
    fingers: Vec<FingerStatus>,
}

impl ProximityTrigger {
    pub fn new(fingers: Vec<FingerStatus>) -> Self {
        ProximityTrigger { fingers }
    }

    /// Left index finger on A4 and left middle finger on B4.
    pub fn default_fingers() -> Self {
        let left = |j| TrackedPoint::Joint(Hand::Left, j);
        ProximityTrigger::new(vec![
            FingerStatus::new(
                left(JointName::IndexFingerTip),
                left(JointName::IndexFingerKnuckle),
                69,
                DEFAULT_TRIGGER_DISTANCE,
            ),
            FingerStatus::new(
                left(JointName::MiddleFingerTip),
                left(JointName::MiddleFingerKnuckle),
                71,
                DEFAULT_TRIGGER_DISTANCE,
            ),
        ])
    }

    pub fn fingers(&self) -> &[FingerStatus] { &self.fingers }

    /// Evaluate every finger against this tick's pose.  Fingers whose tip or
    /// knuckle is missing from the frame keep their state.
    pub fn update(&mut self, pose: &PoseFrame, synth: &mut dyn Synthesizer) {
        for finger in &mut self.fingers {
            let Some(d) = pose.distance_between(finger.tip, finger.knuckle) else {
                continue;
            };
            if let Some(cmd) = finger.step(d) {
                log::debug!("finger {:?} at {:.3} → {:?}", finger.tip, d, cmd);
                cmd.send_to(synth);
            }
        }
    }

    /// Release every latched note.
    pub fn silence_all(&mut self, synth: &mut dyn Synthesizer) {
        for finger in &mut self.fingers {
            if finger.is_playing {
                finger.is_playing = false;
                synth.note_off(finger.note);
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
