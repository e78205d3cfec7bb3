//! Top-level application state machine.
//!
//! `AppState` owns the `ConcertinaEngine`, the synthesizer it drives, and
//! the `PanelState` the visualizer draws.  It processes `PoseEvent`s and is
//! ticked once per display frame.

use std::sync::mpsc::{self, Receiver, TryRecvError};

use concertina_core::bellows::BellowsDirection;
use concertina_core::config::Config;
use concertina_core::engine::{ConcertinaEngine, InputMode, TickReport};
use concertina_core::pitch::label;
use concertina_core::pose::Point3;
use concertina_core::synth::{NoteCommand, Synthesizer};

use crate::gesture::{spawn_pose_source, PoseEvent, SimInput, SimPoseSource};
use crate::panel::PanelState;
use crate::player::Player;
use crate::visualizer::{View, Visualizer};

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

/// Configuration for the full application.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Engine, layout and MIDI settings.
    pub core:      Config,
    /// Number of filtered-gap samples kept for the trace.
    pub trace_len: usize,
    /// Amplitude (metres) of the wobble the simulator adds to the gap.
    pub sim_jitter: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            core:       Config::default(),
            trace_len:  240,
            sim_jitter: 0.0,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// AppState
// ════════════════════════════════════════════════════════════════════════════

pub struct AppState<S: Synthesizer> {
    engine: ConcertinaEngine,
    synth:  S,
    panel:  PanelState,

    /// Instrument faces from the last tracked pose.
    faces:  Option<(Point3, Point3)>,

    pub status: String,
}

impl<S: Synthesizer> AppState<S> {
    pub fn new(cfg: &AppConfig, synth: S) -> Self {
        let engine = ConcertinaEngine::new(&cfg.core);
        let panel  = PanelState::new(engine.layout().len(), cfg.trace_len);
        AppState {
            engine,
            synth,
            panel,
            faces:  None,
            status: format!("READY  {} BUTTONS", cfg.core.layout.len()),
        }
    }

    // ── process one PoseEvent ─────────────────────────────────────────────

    /// Returns false when the application should quit.
    pub fn handle_event(&mut self, event: PoseEvent) -> bool {
        match event {
            PoseEvent::Frame(pose) => {
                let report = self.engine.tick(pose.as_ref(), &mut self.synth);
                if report.tracked {
                    self.faces = pose.as_ref().and_then(|p| p.bellows_anchors());
                    self.panel.mark_tracked();
                    self.panel.update(
                        &self.engine.button_states(),
                        report.direction,
                        self.engine.filtered_distance(),
                    );
                } else {
                    self.faces = None;
                    self.panel.mark_untracked();
                }
                self.report_status(&report);
            }

            PoseEvent::ToggleMode => {
                let next = match self.engine.mode() {
                    InputMode::Buttons   => InputMode::Proximity,
                    InputMode::Proximity => InputMode::Buttons,
                };
                self.engine.set_mode(next, &mut self.synth);
                self.panel.update(&self.engine.button_states(), self.engine.direction(), None);
                self.status = match next {
                    InputMode::Buttons   => "BUTTONS  PRESS KEYS AND WORK THE BELLOWS".to_string(),
                    InputMode::Proximity => "FINGERS  CURL F OR G TO PLAY".to_string(),
                };
            }

            PoseEvent::Quit => {
                self.shutdown();
                return false;
            }
        }
        true
    }

    /// Keep the status line for frames that did something worth showing.
    fn report_status(&mut self, report: &TickReport) {
        if !report.tracked {
            self.status = "UNTRACKED  WAITING FOR HANDS".to_string();
            return;
        }
        if report.commands.is_empty() && !report.direction_changed {
            return;
        }
        let direction = match report.direction {
            BellowsDirection::Stable  => "STABLE",
            BellowsDirection::PushIn  => "PUSH IN",
            BellowsDirection::PullOut => "PULL OUT",
        };
        let notes: Vec<String> = report.commands.iter()
            .map(|c| match *c {
                NoteCommand::On(p)  => format!("+{}", label(p)),
                NoteCommand::Off(p) => format!("-{}", label(p)),
            })
            .collect();
        self.status = format!("{}  {}", direction, notes.join(" "));
    }

    // ── Per-frame tick ────────────────────────────────────────────────────

    pub fn tick(&mut self) {
        self.panel.tick(&self.engine.button_states());
    }

    /// Release every sounding note.
    pub fn shutdown(&mut self) {
        self.engine.silence_all(&mut self.synth);
    }

    // ── Accessors for the render loop ─────────────────────────────────────

    pub fn engine(&self) -> &ConcertinaEngine { &self.engine }
    pub fn panel(&self)  -> &PanelState       { &self.panel }
    pub fn faces(&self)  -> Option<(Point3, Point3)> { self.faces }
    pub fn synth(&self)  -> &S                { &self.synth }
}

// ════════════════════════════════════════════════════════════════════════════
// run(): the main application loop
// ════════════════════════════════════════════════════════════════════════════

/// Run the full application.
///
/// This is the entry point called from `main.rs`.  It creates the visualizer,
/// the pose sources (keyboard simulation, plus LeapMotion hardware with
/// `--features leap`), and drives the event/render loop at ~60 fps.
pub fn run(cfg: AppConfig) -> Result<(), String> {
    // ── App state and MIDI output ─────────────────────────────────────────
    let player  = Player::spawn(cfg.core.midi.clone());
    let mut app = AppState::new(&cfg, player);

    // ── Pose sources ──────────────────────────────────────────────────────
    let (sim_tx, sim_rx) = mpsc::channel::<SimInput>();
    let mut sim = SimPoseSource::new(sim_rx, app.engine().collision_sender());
    sim.hands.jitter = cfg.sim_jitter;

    #[cfg(feature = "leap")]
    {
        // Hands come from the hardware; the keyboard still presses buttons.
        sim.emit_frames = false;
    }

    #[allow(unused_mut)]
    let mut sources: Vec<Receiver<PoseEvent>> = vec![spawn_pose_source(sim)];
    #[cfg(feature = "leap")]
    sources.push(spawn_pose_source(crate::gesture::LeapPoseSource));

    // ── Visualizer (owns the window and the sim input sender) ────────────
    let mut vis = Visualizer::new(sim_tx)?;
    log::info!("visualizer open, {} pose source(s)", sources.len());

    // ── Main loop ─────────────────────────────────────────────────────────
    while vis.is_open() {
        // 1. Poll window input → SimInput
        if !vis.poll_input() { break; }

        // 2. Drain pose events
        for rx in &sources {
            loop {
                match rx.try_recv() {
                    Ok(event) => {
                        if !app.handle_event(event) { return Ok(()); }
                    }
                    Err(TryRecvError::Empty)        => break,
                    Err(TryRecvError::Disconnected) => {
                        app.shutdown();
                        return Ok(());
                    }
                }
            }
        }

        // 3. Per-frame animation
        app.tick();

        // 4. Render
        let buttons = app.engine().button_states();
        vis.render(&View {
            buttons: &buttons,
            panel:   app.panel(),
            mode:    app.engine().mode(),
            faces:   app.faces(),
            status:  &app.status,
        });
    }

    app.shutdown();
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use concertina_core::button::ButtonId;
    use concertina_core::engine::CollisionEvent;
    use concertina_core::pose::{Hand, JointName, PoseFrame, TrackedPoint};
    use concertina_core::synth::CommandLog;
    use crate::gesture::SimHands;

    fn make_app() -> AppState<CommandLog> {
        let mut cfg = AppConfig::default();
        cfg.core.estimator.initial_value = 0.4;
        AppState::new(&cfg, CommandLog::new())
    }

    fn frame(gap: f32) -> PoseEvent {
        PoseEvent::Frame(Some(
            PoseFrame::new()
                .with(TrackedPoint::BellowsFace(Hand::Left),  [0.0, 1.0, -0.3])
                .with(TrackedPoint::BellowsFace(Hand::Right), [gap, 1.0, -0.3]),
        ))
    }

    #[test]
    fn pressed_button_sounds_and_lights() {
        let mut app = make_app();
        app.engine().push_collision(CollisionEvent::Began(ButtonId(1)));
        assert!(app.handle_event(frame(0.4)));
        assert_eq!(app.synth().commands, vec![NoteCommand::On(60)]);
        assert_eq!(app.panel().buttons[1].in_glow, 1.0);
        assert!(app.status.contains("+C4"), "{}", app.status);
        assert!(app.faces().is_some());
    }

    #[test]
    fn untracked_frame_marks_panel() {
        let mut app = make_app();
        app.handle_event(PoseEvent::Frame(None));
        app.handle_event(PoseEvent::Frame(None));
        assert_eq!(app.panel().untracked_frames, 2);
        assert!(app.faces().is_none());
        assert!(app.status.starts_with("UNTRACKED"));

        app.handle_event(frame(0.4));
        assert_eq!(app.panel().untracked_frames, 0);
    }

    #[test]
    fn toggle_mode_releases_buttons() {
        let mut app = make_app();
        app.engine().push_collision(CollisionEvent::Began(ButtonId(2)));
        app.handle_event(frame(0.4));
        app.handle_event(PoseEvent::ToggleMode);
        assert_eq!(app.engine().mode(), InputMode::Proximity);
        assert_eq!(app.synth().commands, vec![NoteCommand::On(64), NoteCommand::Off(64)]);

        app.handle_event(PoseEvent::ToggleMode);
        assert_eq!(app.engine().mode(), InputMode::Buttons);
        assert_eq!(app.synth().commands.last(), Some(&NoteCommand::On(64)));
    }

    #[test]
    fn quit_silences_everything() {
        let mut app = make_app();
        app.engine().push_collision(CollisionEvent::Began(ButtonId(0)));
        app.handle_event(frame(0.4));
        assert!(!app.handle_event(PoseEvent::Quit));
        assert_eq!(app.synth().commands.last(), Some(&NoteCommand::Off(55)));
    }

    #[test]
    fn curled_sim_finger_plays_in_proximity_mode() {
        let mut app = make_app();
        app.handle_event(PoseEvent::ToggleMode);
        let hands = SimHands { index_curled: true, ..SimHands::default() };
        app.handle_event(PoseEvent::Frame(Some(hands.pose())));
        assert_eq!(app.synth().commands, vec![NoteCommand::On(69)]);

        let mut straight = hands.pose();
        let left = |j| TrackedPoint::Joint(Hand::Left, j);
        let knuckle = straight.get(left(JointName::IndexFingerKnuckle)).unwrap();
        straight.set(left(JointName::IndexFingerTip), [knuckle[0], knuckle[1] + 0.1, knuckle[2]]);
        app.handle_event(PoseEvent::Frame(Some(straight)));
        assert_eq!(app.synth().commands.last(), Some(&NoteCommand::Off(69)));
    }

    #[test]
    fn tick_fades_released_button() {
        let mut app = make_app();
        app.engine().push_collision(CollisionEvent::Began(ButtonId(1)));
        app.handle_event(frame(0.4));
        app.engine().push_collision(CollisionEvent::Ended(ButtonId(1)));
        app.handle_event(frame(0.4));
        for _ in 0..60 { app.tick(); }
        assert_eq!(app.panel().buttons[1].in_glow, 0.0);
    }
}
