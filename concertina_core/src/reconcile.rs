//! Turns changes in (pressed buttons × bellows direction) into note commands.
//!
//! For every pressed button at most one of its two pitches sounds, and it is
//! the one the current direction selects.  The pitch each button is
//! sounding is recorded when it starts, so a release always silences the
//! right pitch even after the direction has changed.
//!
//! Several buttons can share a pitch (the default layout has many), so the
//! synthesizer only hears `note_on` when a pitch gains its first holder and
//! `note_off` when it loses its last.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::bellows::BellowsDirection;
use crate::button::{ActiveButtonSet, ButtonDefinition};
use crate::pitch::Pitch;
use crate::synth::Synthesizer;

/// What to do with sounding notes when the bellows stop moving.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StablePolicy {
    /// Leave whatever is sounding untouched.
    Hold,
    /// Release every sounding pitch; no air, no sound.
    #[default]
    Silence,
}

/// Tracks the sounding pitch per pressed button and emits the commands
/// needed to keep it consistent with the bellows.
#[derive(Clone, Debug, Default)]
pub struct NoteReconciler {
    sounding: Vec<(ButtonDefinition, Pitch)>,
    /// Number of buttons currently sounding each pitch.
    holders:  HashMap<Pitch, usize>,
    policy:   StablePolicy,
}

impl NoteReconciler {
    pub fn new(policy: StablePolicy) -> Self {
        NoteReconciler { sounding: Vec::new(), holders: HashMap::new(), policy }
    }

    /// Pitch currently sounding for `button`, if any.
    pub fn sounding(&self, button: ButtonDefinition) -> Option<Pitch> {
        self.sounding.iter().find(|(b, _)| *b == button).map(|&(_, p)| p)
    }

    /// A button was just pressed: sound the pitch for the current direction.
    ///
    /// A button that has never sounded has nothing to hold, so `Stable`
    /// is treated as `PushIn` here.
    pub fn on_activate(
        &mut self,
        button:    ButtonDefinition,
        direction: BellowsDirection,
        synth:     &mut dyn Synthesizer,
    ) {
        if self.sounding(button).is_some() {
            return;
        }
        let pitch = match direction {
            BellowsDirection::PullOut => button.out_note,
            BellowsDirection::PushIn | BellowsDirection::Stable => button.in_note,
        };
        log::debug!("press {} → on {}", button.label(), pitch);
        self.start(button, pitch, synth);
    }

    /// A button was released: silence whatever it was sounding.
    ///
    /// Returns the pitch the button was holding.  The synthesizer only
    /// hears the note-off if no other pressed button holds the same pitch.
    pub fn on_deactivate(
        &mut self,
        button: ButtonDefinition,
        synth:  &mut dyn Synthesizer,
    ) -> Option<Pitch> {
        let pitch = self.stop(button, synth)?;
        log::debug!("release {} → off {}", button.label(), pitch);
        Some(pitch)
    }

    /// The bellows changed direction: re-map every pressed button.
    ///
    /// All outgoing pitches are released before any incoming pitch starts,
    /// so a pitch that moves from one button to another keeps sounding.
    pub fn on_direction_change(
        &mut self,
        direction: BellowsDirection,
        active:    &ActiveButtonSet,
        synth:     &mut dyn Synthesizer,
    ) {
        let changes: Vec<(ButtonDefinition, Option<Pitch>)> = active
            .iter()
            .filter_map(|button| {
                let current = self.sounding(button);
                let target = match (direction, self.policy) {
                    (BellowsDirection::PushIn,  _)                     => Some(button.in_note),
                    (BellowsDirection::PullOut, _)                     => Some(button.out_note),
                    (BellowsDirection::Stable,  StablePolicy::Hold)    => current,
                    (BellowsDirection::Stable,  StablePolicy::Silence) => None,
                };
                (current != target).then_some((button, target))
            })
            .collect();

        for &(button, _) in &changes {
            self.stop(button, synth);
        }
        for &(button, target) in &changes {
            if let Some(pitch) = target {
                self.start(button, pitch, synth);
            }
        }
    }

    /// Release every sounding pitch.
    pub fn silence_all(&mut self, synth: &mut dyn Synthesizer) {
        for (_, pitch) in self.sounding.drain(..) {
            if self.holders.remove(&pitch).is_some() {
                synth.note_off(pitch);
            }
        }
    }

    fn start(&mut self, button: ButtonDefinition, pitch: Pitch, synth: &mut dyn Synthesizer) {
        self.sounding.push((button, pitch));
        let count = self.holders.entry(pitch).or_insert(0);
        *count += 1;
        if *count == 1 {
            synth.note_on(pitch);
        }
    }

    fn stop(&mut self, button: ButtonDefinition, synth: &mut dyn Synthesizer) -> Option<Pitch> {
        let i = self.sounding.iter().position(|(b, _)| *b == button)?;
        let (_, pitch) = self.sounding.remove(i);
        match self.holders.get_mut(&pitch) {
            Some(count) if *count > 1 => *count -= 1,
            _ => {
                self.holders.remove(&pitch);
                synth.note_off(pitch);
            }
        }
        Some(pitch)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
