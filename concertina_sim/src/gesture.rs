//! Pose sources: LeapMotion hardware and keyboard simulation.
//!
//! The public interface is [`PoseEvent`] delivered over a `mpsc` channel.
//! Consumers don't need to know whether frames came from real hardware or
//! the keyboard simulator.  Button contacts do not travel on this channel:
//! a source that produces them sends [`CollisionEvent`]s straight into the
//! engine's collision queue.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use concertina_core::button::ButtonId;
use concertina_core::engine::CollisionEvent;
use concertina_core::pose::{Hand, JointName, Point3, PoseFrame, TrackedPoint};

// ════════════════════════════════════════════════════════════════════════════
// PoseEvent
// ════════════════════════════════════════════════════════════════════════════

/// Something the host loop must act on.
#[derive(Clone, Debug, PartialEq)]
pub enum PoseEvent {
    /// One tracking frame.  `None` means the hands are not tracked.
    Frame(Option<PoseFrame>),

    /// Switch between button and finger-curl input.
    ToggleMode,

    /// Quit the application.
    Quit,
}

// ════════════════════════════════════════════════════════════════════════════
// PoseSource trait: unified interface for hw and sim
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver [`PoseEvent`]s over a channel.
pub trait PoseSource: Send + 'static {
    fn run(self: Box<Self>, tx: Sender<PoseEvent>);
}

// ════════════════════════════════════════════════════════════════════════════
// Spawn helper
// ════════════════════════════════════════════════════════════════════════════

/// Spawn a pose source on its own thread and return the receiving end.
pub fn spawn_pose_source<P: PoseSource>(source: P) -> Receiver<PoseEvent> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || Box::new(source).run(tx));
    rx
}

// ════════════════════════════════════════════════════════════════════════════
// LeapPoseSource: real hardware (feature = "leap")
// ════════════════════════════════════════════════════════════════════════════

/// Pose source backed by a real LeapMotion controller.
///
/// Requires the `leap` feature flag and the LeapC shared library installed.
///
/// Each tracking frame becomes one [`PoseFrame`]: the palm stands in for the
/// wrist (the bellows faces are derived from it), and every digit reports
/// its tip and knuckle.  Positions are converted from millimetres to metres.
/// A frame without both hands is reported as untracked.
#[cfg(feature = "leap")]
pub struct LeapPoseSource;

#[cfg(feature = "leap")]
impl PoseSource for LeapPoseSource {
    fn run(self: Box<Self>, tx: Sender<PoseEvent>) {
        use leaprs::*;

        let mut connection = match Connection::create(ConnectionConfig::default()) {
            Ok(c)  => c,
            Err(e) => {
                log::error!("failed to create LeapC connection: {:?}", e);
                let _ = tx.send(PoseEvent::Quit);
                return;
            }
        };
        if let Err(e) = connection.open() {
            log::error!("failed to open LeapMotion device: {:?}", e);
            let _ = tx.send(PoseEvent::Quit);
            return;
        }
        log::info!("LeapMotion connection open");

        loop {
            let msg = match connection.poll(100) {
                Ok(m)  => m,
                Err(_) => continue,
            };

            if let Event::Tracking(frame) = msg.event() {
                let hands: Vec<_> = frame.hands().collect();
                let left  = hands.iter().find(|h| h.hand_type() == HandType::Left);
                let right = hands.iter().find(|h| h.hand_type() == HandType::Right);

                let pose = match (left, right) {
                    (Some(lh), Some(rh)) => {
                        let mut pose = PoseFrame::new();
                        add_leap_hand(&mut pose, Hand::Left,  lh);
                        add_leap_hand(&mut pose, Hand::Right, rh);
                        Some(pose)
                    }
                    _ => None,
                };
                if tx.send(PoseEvent::Frame(pose)).is_err() { return; }
            }
        }
    }
}

#[cfg(feature = "leap")]
fn add_leap_hand(pose: &mut PoseFrame, hand: Hand, lh: &leaprs::Hand) {
    const MM: f32 = 0.001;

    let p = lh.palm().position();
    pose.set(TrackedPoint::Joint(hand, JointName::Wrist), [p.x * MM, p.y * MM, p.z * MM]);

    // Leap orders digits thumb, index, middle, ring, pinky.
    const JOINTS: [(JointName, JointName); 5] = [
        (JointName::ThumbTip,        JointName::ThumbKnuckle),
        (JointName::IndexFingerTip,  JointName::IndexFingerKnuckle),
        (JointName::MiddleFingerTip, JointName::MiddleFingerKnuckle),
        (JointName::RingFingerTip,   JointName::RingFingerKnuckle),
        (JointName::LittleFingerTip, JointName::LittleFingerKnuckle),
    ];
    for (digit, (tip_name, knuckle_name)) in lh.digits().zip(JOINTS) {
        let tip     = digit.distal().next_joint();
        let knuckle = digit.proximal().prev_joint();
        pose.set(TrackedPoint::Joint(hand, tip_name),     [tip.x * MM, tip.y * MM, tip.z * MM]);
        pose.set(TrackedPoint::Joint(hand, knuckle_name), [knuckle.x * MM, knuckle.y * MM, knuckle.z * MM]);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SimPoseSource: keyboard simulation (always available)
// ════════════════════════════════════════════════════════════════════════════

/// Raw input event from the simulation window.
#[derive(Clone, Debug, PartialEq)]
pub enum SimInput {
    KeyDown(SimKey),
    KeyUp(SimKey),
    /// One display frame elapsed; emit a pose.
    Tick,
}

/// Simulated key codes (mapped from minifb Key by the visualizer).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimKey {
    /// Touch the button with this layout index.
    Button(usize),
    Squeeze,        // Left arrow, hands move together
    Stretch,        // Right arrow, hands move apart
    CurlIndex,      // F
    CurlMiddle,     // G
    ToggleTracking, // U
    ToggleMode,     // Tab
    Quit,           // Escape
}

/// Resting gap between the two instrument faces (metres).
pub const REST_GAP: f32 = 0.40;
/// Gap change per frame while a squeeze/stretch key is held.
pub const GAP_STEP: f32 = 0.004;
pub const MIN_GAP:  f32 = 0.15;
pub const MAX_GAP:  f32 = 0.80;

/// Tip-to-knuckle distance of a straight and a curled simulated finger.
const STRAIGHT_FINGER: f32 = 0.08;
const CURLED_FINGER:   f32 = 0.02;

/// Simulated hands holding the instrument.
///
/// The instrument hangs centred at `CENTRE`; the faces sit `gap / 2` either
/// side of it along x.  Finger knuckles ride on the left face.
#[derive(Clone, Debug, PartialEq)]
pub struct SimHands {
    pub gap:           f32,
    pub squeezing:     bool,
    pub stretching:    bool,
    pub index_curled:  bool,
    pub middle_curled: bool,
    pub tracked:       bool,
    /// Amplitude of the deterministic wobble added to the gap.
    pub jitter:        f32,
    pub(crate) frame:  u64,
}

const CENTRE: Point3 = [0.0, 1.0, -0.3];

impl Default for SimHands {
    fn default() -> Self {
        SimHands {
            gap:           REST_GAP,
            squeezing:     false,
            stretching:    false,
            index_curled:  false,
            middle_curled: false,
            tracked:       true,
            jitter:        0.0,
            frame:         0,
        }
    }
}

impl SimHands {
    /// Advance one frame of motion and return the pose, or `None` when the
    /// simulated tracker has lost the hands.
    pub fn step(&mut self) -> Option<PoseFrame> {
        self.frame += 1;
        if self.squeezing  { self.gap -= GAP_STEP; }
        if self.stretching { self.gap += GAP_STEP; }
        self.gap = self.gap.clamp(MIN_GAP, MAX_GAP);

        if !self.tracked {
            return None;
        }
        Some(self.pose())
    }

    /// The pose for the current hand state, without advancing time.
    pub fn pose(&self) -> PoseFrame {
        let wobble = self.jitter * (self.frame as f32 * 0.9).sin();
        let half   = (self.gap + wobble) / 2.0;
        let [cx, cy, cz] = CENTRE;
        let left_face  = [cx - half, cy, cz];
        let right_face = [cx + half, cy, cz];

        let finger = |curled: bool, dy: f32| {
            let knuckle = [left_face[0] + 0.05, cy + dy, cz];
            let reach   = if curled { CURLED_FINGER } else { STRAIGHT_FINGER };
            (knuckle, [knuckle[0], knuckle[1] + reach, cz])
        };
        let (index_knuckle,  index_tip)  = finger(self.index_curled,  0.02);
        let (middle_knuckle, middle_tip) = finger(self.middle_curled, 0.0);

        let left = |j| TrackedPoint::Joint(Hand::Left, j);
        PoseFrame::new()
            .with(TrackedPoint::BellowsFace(Hand::Left),  left_face)
            .with(TrackedPoint::BellowsFace(Hand::Right), right_face)
            .with(left(JointName::IndexFingerKnuckle),  index_knuckle)
            .with(left(JointName::IndexFingerTip),      index_tip)
            .with(left(JointName::MiddleFingerKnuckle), middle_knuckle)
            .with(left(JointName::MiddleFingerTip),     middle_tip)
    }
}

/// Pose source driven by [`SimInput`] events (from the visualizer's window).
///
/// The visualizer sends `SimInput` events here; this translator keeps the
/// simulated hands, emits one [`PoseEvent::Frame`] per `Tick`, and turns
/// button keys into collision events on the engine's queue.  With
/// `emit_frames` off only the button keys and commands are forwarded, so
/// the keyboard can press buttons while another source tracks the hands.
pub struct SimPoseSource {
    pub rx:          Receiver<SimInput>,
    pub collisions:  Sender<CollisionEvent>,
    pub hands:       SimHands,
    pub emit_frames: bool,
}

impl SimPoseSource {
    pub fn new(rx: Receiver<SimInput>, collisions: Sender<CollisionEvent>) -> Self {
        SimPoseSource { rx, collisions, hands: SimHands::default(), emit_frames: true }
    }
}

impl PoseSource for SimPoseSource {
    fn run(self: Box<Self>, tx: Sender<PoseEvent>) {
        let SimPoseSource { rx, collisions, mut hands, emit_frames } = *self;

        for input in rx {
            let event = match input {
                SimInput::Tick if emit_frames => PoseEvent::Frame(hands.step()),
                SimInput::Tick => continue,

                SimInput::KeyDown(SimKey::Button(i)) => {
                    let _ = collisions.send(CollisionEvent::Began(ButtonId(i)));
                    continue;
                }
                SimInput::KeyUp(SimKey::Button(i)) => {
                    let _ = collisions.send(CollisionEvent::Ended(ButtonId(i)));
                    continue;
                }

                SimInput::KeyDown(SimKey::Squeeze)    => { hands.squeezing     = true;  continue; }
                SimInput::KeyUp(SimKey::Squeeze)      => { hands.squeezing     = false; continue; }
                SimInput::KeyDown(SimKey::Stretch)    => { hands.stretching    = true;  continue; }
                SimInput::KeyUp(SimKey::Stretch)      => { hands.stretching    = false; continue; }
                SimInput::KeyDown(SimKey::CurlIndex)  => { hands.index_curled  = true;  continue; }
                SimInput::KeyUp(SimKey::CurlIndex)    => { hands.index_curled  = false; continue; }
                SimInput::KeyDown(SimKey::CurlMiddle) => { hands.middle_curled = true;  continue; }
                SimInput::KeyUp(SimKey::CurlMiddle)   => { hands.middle_curled = false; continue; }

                SimInput::KeyDown(SimKey::ToggleTracking) => {
                    hands.tracked = !hands.tracked;
                    log::info!("sim tracking {}", if hands.tracked { "restored" } else { "lost" });
                    continue;
                }
                SimInput::KeyDown(SimKey::ToggleMode) => PoseEvent::ToggleMode,
                SimInput::KeyDown(SimKey::Quit) => {
                    let _ = tx.send(PoseEvent::Quit);
                    return;
                }
                SimInput::KeyUp(_) => continue,
            };
            if tx.send(event).is_err() { return; }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn run_sim(inputs: Vec<SimInput>) -> (Vec<PoseEvent>, Vec<CollisionEvent>) {
        let (sim_tx, sim_rx) = mpsc::channel();
        let (col_tx, col_rx) = mpsc::channel();
        let events = spawn_pose_source(SimPoseSource::new(sim_rx, col_tx));
        for input in inputs {
            let _ = sim_tx.send(input);
        }
        drop(sim_tx);
        // The source thread ends when its input closes, closing `events`.
        (events.iter().collect(), col_rx.try_iter().collect())
    }

    #[test]
    fn each_tick_emits_one_frame() {
        let (events, _) = run_sim(vec![SimInput::Tick, SimInput::Tick]);
        assert_eq!(events.len(), 2);
        match &events[0] {
            PoseEvent::Frame(Some(pose)) => {
                let d = pose.bellows_distance().unwrap();
                assert!((d - REST_GAP).abs() < 1e-6);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn button_keys_become_collisions() {
        let (events, collisions) = run_sim(vec![
            SimInput::KeyDown(SimKey::Button(3)),
            SimInput::KeyUp(SimKey::Button(3)),
        ]);
        assert!(events.is_empty());
        assert_eq!(
            collisions,
            vec![CollisionEvent::Began(ButtonId(3)), CollisionEvent::Ended(ButtonId(3))]
        );
    }

    #[test]
    fn untracked_toggle_yields_empty_frames() {
        let (events, _) = run_sim(vec![
            SimInput::KeyDown(SimKey::ToggleTracking),
            SimInput::Tick,
            SimInput::KeyDown(SimKey::ToggleTracking),
            SimInput::Tick,
        ]);
        assert_eq!(events[0], PoseEvent::Frame(None));
        assert!(matches!(events[1], PoseEvent::Frame(Some(_))));
    }

    #[test]
    fn quit_ends_the_stream() {
        let (events, _) = run_sim(vec![
            SimInput::KeyDown(SimKey::ToggleMode),
            SimInput::KeyDown(SimKey::Quit),
            SimInput::Tick,
        ]);
        assert_eq!(events, vec![PoseEvent::ToggleMode, PoseEvent::Quit]);
    }

    #[test]
    fn squeeze_narrows_gap_and_clamps() {
        let mut hands = SimHands { squeezing: true, ..SimHands::default() };
        let d0 = hands.step().unwrap().bellows_distance().unwrap();
        let d1 = hands.step().unwrap().bellows_distance().unwrap();
        assert!(d1 < d0);
        for _ in 0..500 { hands.step(); }
        assert_eq!(hands.gap, MIN_GAP);
    }

    #[test]
    fn curled_finger_is_within_trigger_distance() {
        let hands = SimHands { index_curled: true, ..SimHands::default() };
        let pose  = hands.pose();
        let left  = |j| TrackedPoint::Joint(Hand::Left, j);
        let index = pose
            .distance_between(left(JointName::IndexFingerTip), left(JointName::IndexFingerKnuckle))
            .unwrap();
        let middle = pose
            .distance_between(left(JointName::MiddleFingerTip), left(JointName::MiddleFingerKnuckle))
            .unwrap();
        assert!(index < 0.05);
        assert!(middle > 0.05);
    }
}
