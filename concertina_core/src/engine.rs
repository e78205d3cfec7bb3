//! The per-frame tick: pose in, note commands out.
//!
//! Order within one tracked tick:
//!
//! 1. drain queued collision events into the active set (FIFO), sounding or
//!    releasing each button immediately;
//! 2. filter the bellows distance and classify its trend;
//! 3. on a direction change, re-map every pressed button.
//!
//! In proximity mode step 3 is replaced by the finger table.  An untracked
//! tick does nothing at all: queued collisions wait for the next tracked
//! tick and no state moves.

use std::sync::mpsc::{self, Receiver, Sender};

use serde::{Deserialize, Serialize};

use crate::bellows::{BellowsDirection, BellowsTracker};
use crate::button::{ActiveButtonSet, ButtonDefinition, ButtonId, ButtonLayout};
use crate::config::Config;
use crate::pose::PoseFrame;
use crate::proximity::ProximityTrigger;
use crate::reconcile::NoteReconciler;
use crate::synth::{CommandLog, NoteCommand, Synthesizer, Tee};

/// Which input path drives the synthesizer.  Only one is live at a time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// Buttons pressed by collision, pitch chosen by the bellows.
    #[default]
    Buttons,
    /// Finger curl triggers a fixed note per finger.
    Proximity,
}

/// Contact events from the physics collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollisionEvent {
    Began(ButtonId),
    Ended(ButtonId),
}

/// What one tick did.
#[derive(Clone, Debug, PartialEq)]
pub struct TickReport {
    /// False when the tick was skipped for lack of tracking data.
    pub tracked:           bool,
    pub direction:         BellowsDirection,
    pub direction_changed: bool,
    /// Commands sent to the synthesizer during this tick, in order.
    pub commands:          Vec<NoteCommand>,
}

/// Display state of one layout button.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ButtonState {
    pub id:      ButtonId,
    pub button:  ButtonDefinition,
    pub pressed: bool,
    /// The push pitch is sounding.
    pub in_lit:  bool,
    /// The pull pitch is sounding.
    pub out_lit: bool,
}

// ════════════════════════════════════════════════════════════════════════════
// ConcertinaEngine
// ════════════════════════════════════════════════════════════════════════════

pub struct ConcertinaEngine {
    layout:     ButtonLayout,
    active:     ActiveButtonSet,
    bellows:    BellowsTracker,
    reconciler: NoteReconciler,
    proximity:  ProximityTrigger,
    mode:       InputMode,

    collision_tx: Sender<CollisionEvent>,
    collision_rx: Receiver<CollisionEvent>,
}

impl ConcertinaEngine {
    pub fn new(config: &Config) -> Self {
        let (collision_tx, collision_rx) = mpsc::channel();
        log::info!(
            "engine: {} buttons, {} fingers, mode {:?}, stable {:?}",
            config.layout.len(), config.fingers.len(), config.mode, config.stable_policy
        );
        ConcertinaEngine {
            layout:     config.button_layout(),
            active:     ActiveButtonSet::new(),
            bellows:    config.bellows_tracker(),
            reconciler: NoteReconciler::new(config.stable_policy),
            proximity:  config.proximity_trigger(),
            mode:       config.mode,
            collision_tx,
            collision_rx,
        }
    }

    /// A handle the collision source can send events through.  Events are
    /// applied at the start of the next tracked tick.
    pub fn collision_sender(&self) -> Sender<CollisionEvent> {
        self.collision_tx.clone()
    }

    /// Queue a collision event from the engine's own thread.
    pub fn push_collision(&self, event: CollisionEvent) {
        // The engine holds the receiver, so the channel cannot be closed.
        let _ = self.collision_tx.send(event);
    }

    /// Run one frame.  `None` means the pose source reported "untracked".
    pub fn tick(&mut self, pose: Option<&PoseFrame>, synth: &mut dyn Synthesizer) -> TickReport {
        let Some(pose) = pose else {
            log::trace!("untracked tick skipped");
            return TickReport {
                tracked:           false,
                direction:         self.bellows.direction(),
                direction_changed: false,
                commands:          Vec::new(),
            };
        };

        let mut log = CommandLog::new();
        let mut direction_changed = false;
        {
            let mut out = Tee { first: &mut *synth, second: &mut log };

            self.drain_collisions(&mut out);

            if let Some(raw) = pose.bellows_distance() {
                if let Some(direction) = self.bellows.update(raw) {
                    direction_changed = true;
                    if self.mode == InputMode::Buttons {
                        self.reconciler.on_direction_change(direction, &self.active, &mut out);
                    }
                }
            }

            if self.mode == InputMode::Proximity {
                self.proximity.update(pose, &mut out);
            }
        }

        TickReport {
            tracked: true,
            direction: self.bellows.direction(),
            direction_changed,
            commands: log.drain(),
        }
    }

    fn drain_collisions(&mut self, synth: &mut dyn Synthesizer) {
        while let Ok(event) = self.collision_rx.try_recv() {
            let (id, began) = match event {
                CollisionEvent::Began(id) => (id, true),
                CollisionEvent::Ended(id) => (id, false),
            };
            let Some(button) = self.layout.get(id) else {
                log::warn!("collision for unknown button {:?} ignored", id);
                continue;
            };
            if began {
                if self.active.activate(button) && self.mode == InputMode::Buttons {
                    self.reconciler.on_activate(button, self.bellows.direction(), synth);
                }
            } else if self.active.deactivate(button) {
                self.reconciler.on_deactivate(button, synth);
            }
        }
    }

    /// Switch input paths, releasing whatever the old path was sounding.
    /// Buttons still pressed start sounding when switching to `Buttons`.
    pub fn set_mode(&mut self, mode: InputMode, synth: &mut dyn Synthesizer) {
        if mode == self.mode {
            return;
        }
        log::info!("input mode {:?} → {:?}", self.mode, mode);
        match mode {
            InputMode::Proximity => self.reconciler.silence_all(synth),
            InputMode::Buttons => {
                self.proximity.silence_all(synth);
                let direction = self.bellows.direction();
                for button in self.active.iter() {
                    self.reconciler.on_activate(button, direction, synth);
                }
            }
        }
        self.mode = mode;
    }

    /// Release every sounding note, e.g. before the session ends.
    pub fn silence_all(&mut self, synth: &mut dyn Synthesizer) {
        self.reconciler.silence_all(synth);
        self.proximity.silence_all(synth);
    }

    // ── accessors ─────────────────────────────────────────────────────────

    pub fn mode(&self) -> InputMode { self.mode }
    pub fn direction(&self) -> BellowsDirection { self.bellows.direction() }
    pub fn filtered_distance(&self) -> Option<f32> { self.bellows.filtered_distance() }
    pub fn layout(&self) -> &ButtonLayout { &self.layout }
    pub fn active(&self) -> &ActiveButtonSet { &self.active }
    pub fn proximity(&self) -> &ProximityTrigger { &self.proximity }

    /// Per-button display state, in layout order.
    pub fn button_states(&self) -> Vec<ButtonState> {
        self.layout
            .iter()
            .map(|(id, button)| {
                let sounding = self.reconciler.sounding(button);
                ButtonState {
                    id,
                    button,
                    pressed: self.active.contains(button),
                    in_lit:  sounding == Some(button.in_note),
                    out_lit: sounding == Some(button.out_note),
                }
            })
            .collect()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Hand, JointName, TrackedPoint};
    use crate::reconcile::StablePolicy;
    use BellowsDirection::*;

    fn faces(gap: f32) -> PoseFrame {
        PoseFrame::new()
            .with(TrackedPoint::BellowsFace(Hand::Left),  [0.0, 1.0, -0.3])
            .with(TrackedPoint::BellowsFace(Hand::Right), [gap, 1.0, -0.3])
    }

    /// Engine whose filter starts at `gap`, so the first ticks are quiet.
    fn engine_at(gap: f32, policy: StablePolicy) -> ConcertinaEngine {
        let mut cfg = Config::default();
        cfg.estimator.initial_value = gap;
        cfg.stable_policy = policy;
        ConcertinaEngine::new(&cfg)
    }

    #[test]
    fn untracked_tick_does_nothing() {
        let mut eng = engine_at(0.4, StablePolicy::Silence);
        let mut log = CommandLog::new();
        eng.push_collision(CollisionEvent::Began(ButtonId(1)));
        let report = eng.tick(None, &mut log);
        assert!(!report.tracked);
        assert!(report.commands.is_empty());
        assert!(log.is_empty());
        assert!(eng.active().is_empty());
        assert_eq!(eng.filtered_distance(), None);

        // The queued press is applied on the next tracked tick.
        let report = eng.tick(Some(&faces(0.4)), &mut log);
        assert_eq!(report.commands, vec![NoteCommand::On(60)]);
        assert_eq!(log.commands, report.commands);
    }

    #[test]
    fn collisions_apply_in_fifo_order() {
        let mut eng = engine_at(0.4, StablePolicy::Silence);
        let mut log = CommandLog::new();
        let tx = eng.collision_sender();
        tx.send(CollisionEvent::Began(ButtonId(1))).unwrap();
        tx.send(CollisionEvent::Ended(ButtonId(1))).unwrap();
        let report = eng.tick(Some(&faces(0.4)), &mut log);
        assert_eq!(report.commands, vec![NoteCommand::On(60), NoteCommand::Off(60)]);
        assert!(eng.active().is_empty());
    }

    #[test]
    fn unknown_button_is_ignored() {
        let mut eng = engine_at(0.4, StablePolicy::Silence);
        let mut log = CommandLog::new();
        eng.push_collision(CollisionEvent::Began(ButtonId(99)));
        eng.push_collision(CollisionEvent::Ended(ButtonId(3)));
        let report = eng.tick(Some(&faces(0.4)), &mut log);
        assert!(report.commands.is_empty());
    }

    #[test]
    fn squeezing_then_pulling_switches_pitch() {
        let mut eng = engine_at(0.4, StablePolicy::Silence);
        let mut log = CommandLog::new();
        eng.push_collision(CollisionEvent::Began(ButtonId(1)));
        eng.tick(Some(&faces(0.4)), &mut log);
        assert_eq!(log.drain(), vec![NoteCommand::On(60)]);

        let report = eng.tick(Some(&faces(0.3)), &mut log);
        assert!(report.direction_changed);
        assert_eq!(report.direction, PushIn);
        // Already sounding the push pitch: nothing to change.
        assert!(log.drain().is_empty());

        let mut changed = false;
        for _ in 0..10 {
            let r = eng.tick(Some(&faces(0.6)), &mut log);
            if r.direction_changed {
                changed = true;
                assert_eq!(r.direction, PullOut);
                break;
            }
        }
        assert!(changed);
        assert_eq!(log.drain(), vec![NoteCommand::Off(60), NoteCommand::On(62)]);

        let states = eng.button_states();
        assert!(states[1].pressed && states[1].out_lit && !states[1].in_lit);
        assert!(!states[0].pressed && !states[0].in_lit);
    }

    #[test]
    fn missing_anchors_skip_bellows_but_apply_collisions() {
        let mut eng = engine_at(0.4, StablePolicy::Silence);
        let mut log = CommandLog::new();
        eng.push_collision(CollisionEvent::Began(ButtonId(0)));
        let report = eng.tick(Some(&PoseFrame::new()), &mut log);
        assert_eq!(report.commands, vec![NoteCommand::On(55)]);
        assert_eq!(eng.filtered_distance(), None);
    }

    #[test]
    fn proximity_mode_ignores_buttons() {
        let mut cfg = Config::default();
        cfg.mode = InputMode::Proximity;
        let mut eng = ConcertinaEngine::new(&cfg);
        let mut log = CommandLog::new();

        eng.push_collision(CollisionEvent::Began(ButtonId(1)));
        let left = |j| TrackedPoint::Joint(Hand::Left, j);
        let curled = faces(0.4)
            .with(left(JointName::IndexFingerKnuckle), [0.0, 0.0, 0.0])
            .with(left(JointName::IndexFingerTip),     [0.0, 0.02, 0.0]);
        let report = eng.tick(Some(&curled), &mut log);
        assert_eq!(report.commands, vec![NoteCommand::On(69)]);
        assert_eq!(eng.active().len(), 1);

        // Switching to buttons releases the finger and sounds the held button.
        eng.set_mode(InputMode::Buttons, &mut log);
        assert_eq!(
            &log.commands[1..],
            &[NoteCommand::Off(69), NoteCommand::On(60)]
        );
        assert_eq!(eng.mode(), InputMode::Buttons);

        log.drain();
        eng.set_mode(InputMode::Proximity, &mut log);
        assert_eq!(log.commands, vec![NoteCommand::Off(60)]);
    }

    #[test]
    fn silence_all_clears_sounding_notes() {
        let mut eng = engine_at(0.4, StablePolicy::Hold);
        let mut log = CommandLog::new();
        eng.push_collision(CollisionEvent::Began(ButtonId(2)));
        eng.tick(Some(&faces(0.4)), &mut log);
        log.drain();
        eng.silence_all(&mut log);
        assert_eq!(log.commands, vec![NoteCommand::Off(64)]);
        assert!(eng.button_states().iter().all(|s| !s.in_lit && !s.out_lit));
    }

    /// Pull the bellows open until the engine reports `PullOut`.
    fn pull_out(eng: &mut ConcertinaEngine, log: &mut CommandLog) {
        for _ in 0..10 {
            if eng.tick(Some(&faces(0.6)), log).direction_changed {
                break;
            }
        }
        assert_eq!(eng.direction(), PullOut);
    }

    #[test]
    fn pull_pitch_shared_with_neighbour_push_keeps_sounding() {
        // Button 4 is (72, 71) and button 9 is (71, 69).
        let mut eng = engine_at(0.4, StablePolicy::Silence);
        let mut log = CommandLog::new();
        eng.push_collision(CollisionEvent::Began(ButtonId(4)));
        eng.push_collision(CollisionEvent::Began(ButtonId(9)));
        eng.tick(Some(&faces(0.4)), &mut log);
        eng.tick(Some(&faces(0.3)), &mut log);
        assert_eq!(eng.direction(), PushIn);
        assert_eq!(log.drain(), vec![NoteCommand::On(72), NoteCommand::On(71)]);

        pull_out(&mut eng, &mut log);
        let mut heard = std::collections::HashSet::new();
        for cmd in log.drain() {
            match cmd {
                NoteCommand::On(p)  => { heard.insert(p); }
                NoteCommand::Off(p) => { heard.remove(&p); }
            }
        }
        assert_eq!(heard, std::collections::HashSet::from([71, 69]));
        let states = eng.button_states();
        assert!(states[4].out_lit && states[9].out_lit);
    }

    #[test]
    fn releasing_one_of_two_buttons_sharing_a_pitch() {
        // Buttons 0 and 5 both push 55.
        let mut eng = engine_at(0.4, StablePolicy::Silence);
        let mut log = CommandLog::new();
        eng.push_collision(CollisionEvent::Began(ButtonId(0)));
        eng.push_collision(CollisionEvent::Began(ButtonId(5)));
        eng.push_collision(CollisionEvent::Ended(ButtonId(0)));
        let report = eng.tick(Some(&faces(0.4)), &mut log);
        assert_eq!(report.commands, vec![NoteCommand::On(55)]);
        assert!(eng.button_states()[5].in_lit);

        eng.push_collision(CollisionEvent::Ended(ButtonId(5)));
        let report = eng.tick(Some(&faces(0.4)), &mut log);
        assert_eq!(report.commands, vec![NoteCommand::Off(55)]);
    }
}
