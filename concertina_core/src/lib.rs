//! # concertina_core
//!
//! Gesture-to-note decision engine for a hand-tracked diatonic button
//! concertina.  Noisy per-frame hand poses go in; note-on / note-off
//! commands come out.
//!
//! ## Pipeline
//!
//! | Stage | Module | Role |
//! |---|---|---|
//! | Smooth | [`estimator`] | Scalar Kalman filter over the anchor distance |
//! | Classify | [`bellows`] | Filtered-distance trend → push / pull / stable |
//! | Press | [`button`] | Layout table and the set of pressed buttons |
//! | Reconcile | [`reconcile`] | Keep each pressed button on the right pitch |
//! | Curl | [`proximity`] | Alternative mode: finger curl plays a note |
//! | Drive | [`engine`] | One tick: collisions, bellows, commands |
//!
//! Everything runs on the caller's thread.  Collision events may be sent
//! from anywhere through [`engine::ConcertinaEngine::collision_sender`];
//! they are applied at the start of the next tracked tick.
//!
//! ## Quick start
//!
//! ```rust
//! use concertina_core::config::Config;
//! use concertina_core::engine::{CollisionEvent, ConcertinaEngine};
//! use concertina_core::button::ButtonId;
//! use concertina_core::pose::{Hand, PoseFrame, TrackedPoint};
//! use concertina_core::synth::{CommandLog, NoteCommand};
//!
//! let mut engine = ConcertinaEngine::new(&Config::default());
//! let mut synth  = CommandLog::new();
//!
//! engine.push_collision(CollisionEvent::Began(ButtonId(1)));
//! let pose = PoseFrame::new()
//!     .with(TrackedPoint::BellowsFace(Hand::Left),  [-0.2, 1.0, -0.3])
//!     .with(TrackedPoint::BellowsFace(Hand::Right), [ 0.2, 1.0, -0.3]);
//! let report = engine.tick(Some(&pose), &mut synth);
//! assert_eq!(report.commands, vec![NoteCommand::On(60)]);
//! ```

pub mod estimator;
pub mod bellows;
pub mod button;
pub mod reconcile;
pub mod proximity;
pub mod pose;
pub mod pitch;
pub mod synth;
pub mod config;
pub mod engine;

pub use bellows::BellowsDirection;
pub use button::{ButtonDefinition, ButtonId};
pub use engine::{CollisionEvent, ConcertinaEngine, InputMode};
pub use synth::{NoteCommand, Synthesizer};
