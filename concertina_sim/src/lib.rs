//! # concertina_sim
//!
//! Interactive host for [`concertina_core`]: feeds hand poses into the
//! engine, sends its note commands to a MIDI port, and draws the button
//! panel with the bellows in between.
//!
//! ## Input → Action mapping
//!
//! | Input | Action |
//! |---|---|
//! | Hands move together | Bellows push in: pressed buttons play their push pitch |
//! | Hands move apart | Bellows pull out: pressed buttons play their pull pitch |
//! | Touch a button | Button pressed; released when contact ends |
//! | Curl a mapped finger (finger mode) | Play that finger's note |
//!
//! ## Feature flags
//!
//! * (default): **Simulation mode**: the keyboard drives both hands.
//! * `leap`: **Hardware mode**: hands come from a LeapMotion controller via
//!   LeapC; the keyboard still presses buttons.
//!
//! ### Simulation keyboard shortcuts
//!
//! | Key | Action |
//! |---|---|
//! | `1`–`0` | Left-hand buttons 0–9 |
//! | `Z` `X` `C` `V` `B` `N` `M` `,` `.` `/` | Right-hand buttons 10–19 |
//! | `←` / hold | Squeeze the bellows |
//! | `→` / hold | Stretch the bellows |
//! | `F` / `G` hold | Curl left index / middle finger |
//! | `U` | Toggle hand tracking (simulate loss) |
//! | `Tab` | Switch buttons ↔ finger mode |
//! | `Escape` | Quit |

pub mod gesture;
pub mod panel;
pub mod player;
pub mod visualizer;
pub mod app;
