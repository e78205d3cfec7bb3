//! Button-panel visualization state.
//!
//! Holds the animated quantities the visualizer draws: per-button glow with
//! a short afterglow, a scrolling trace of the filtered bellows gap, and a
//! flash on every bellows direction change.  Nothing here touches pixels.

use std::collections::VecDeque;

use concertina_core::bellows::BellowsDirection;
use concertina_core::engine::ButtonState;
use concertina_core::pitch::{pitch_class, Pitch};

/// Number of pleats drawn between the two instrument faces.
pub const PLEAT_COUNT: usize = 10;

// ════════════════════════════════════════════════════════════════════════════
// Color palette: pitch class → RGB
// ════════════════════════════════════════════════════════════════════════════

/// Map a MIDI note to an ARGB color by pitch class, so every C shares a hue.
pub fn pitch_color(note: Pitch) -> u32 {
    let hue = pitch_class(note) as f32 / 12.0 * 360.0;
    hsv_to_argb(hue, 0.78, 0.92)
}

/// Convert HSV → packed ARGB (0xAARRGGBB, A=0xFF).
pub fn hsv_to_argb(h: f32, s: f32, v: f32) -> u32 {
    let h  = h.rem_euclid(360.0);
    let hi = (h / 60.0) as u32;
    let f  = h / 60.0 - hi as f32;
    let p  = v * (1.0 - s);
    let q  = v * (1.0 - s * f);
    let t  = v * (1.0 - s * (1.0 - f));
    let (r, g, b) = match hi {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    let ri = (r * 255.0) as u32;
    let gi = (g * 255.0) as u32;
    let bi = (b * 255.0) as u32;
    0xFF000000 | (ri << 16) | (gi << 8) | bi
}

// ════════════════════════════════════════════════════════════════════════════
// ButtonGlow: one button's two halves
// ════════════════════════════════════════════════════════════════════════════

/// Brightness of a button's push (in) and pull (out) halves, 0.0–1.0.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ButtonGlow {
    pub pressed:  bool,
    pub in_glow:  f32,
    pub out_glow: f32,
}

const GLOW_DECAY: f32 = 0.80;
const GLOW_FLOOR: f32 = 0.02;

fn decay(level: &mut f32) {
    *level *= GLOW_DECAY;
    if *level < GLOW_FLOOR { *level = 0.0; }
}

// ════════════════════════════════════════════════════════════════════════════
// GapTrace: recent filtered distances
// ════════════════════════════════════════════════════════════════════════════

/// Bounded history of the filtered bellows gap, oldest first.
#[derive(Clone, Debug)]
pub struct GapTrace {
    pub samples:  VecDeque<f32>,
    pub capacity: usize,
}

impl GapTrace {
    pub fn new(capacity: usize) -> Self {
        GapTrace { samples: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn push(&mut self, gap: f32) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(gap);
    }

    /// (min, max) of the retained samples, widened so a flat trace still
    /// has a drawable range.
    pub fn range(&self) -> Option<(f32, f32)> {
        let first = *self.samples.front()?;
        let (lo, hi) = self.samples.iter().fold((first, first), |(lo, hi), &s| {
            (lo.min(s), hi.max(s))
        });
        if hi - lo < 0.01 {
            let mid = (hi + lo) / 2.0;
            return Some((mid - 0.005, mid + 0.005));
        }
        Some((lo, hi))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// PanelState
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct PanelState {
    pub buttons:   Vec<ButtonGlow>,
    pub trace:     GapTrace,
    pub direction: BellowsDirection,
    /// 1.0 right after a direction change, fading to 0.0.
    pub flash:     f32,
    /// Frames since the last tracked pose.
    pub untracked_frames: u32,
}

impl PanelState {
    pub fn new(button_count: usize, trace_len: usize) -> Self {
        PanelState {
            buttons:   vec![ButtonGlow::default(); button_count],
            trace:     GapTrace::new(trace_len),
            direction: BellowsDirection::Stable,
            flash:     0.0,
            untracked_frames: 0,
        }
    }

    /// Take in the engine's state after a frame.
    ///
    /// Lit halves jump to full brightness; unlit halves keep their current
    /// level and fade in [`tick`](Self::tick).
    pub fn update(&mut self, states: &[ButtonState], direction: BellowsDirection, gap: Option<f32>) {
        if states.len() != self.buttons.len() {
            self.buttons.resize(states.len(), ButtonGlow::default());
        }
        for (glow, s) in self.buttons.iter_mut().zip(states) {
            glow.pressed = s.pressed;
            if s.in_lit  { glow.in_glow  = 1.0; }
            if s.out_lit { glow.out_glow = 1.0; }
        }
        if direction != self.direction {
            self.direction = direction;
            self.flash = 1.0;
        }
        if let Some(g) = gap {
            self.trace.push(g);
        }
    }

    /// Mark a frame in which the tracker saw no hands.
    pub fn mark_untracked(&mut self) {
        self.untracked_frames = self.untracked_frames.saturating_add(1);
    }

    pub fn mark_tracked(&mut self) {
        self.untracked_frames = 0;
    }

    /// Advance the fade animations by one frame.  `states` says which halves
    /// are still lit; those stay at full brightness.
    pub fn tick(&mut self, states: &[ButtonState]) {
        for (glow, s) in self.buttons.iter_mut().zip(states) {
            if !s.in_lit  { decay(&mut glow.in_glow); }
            if !s.out_lit { decay(&mut glow.out_glow); }
        }
        self.flash = (self.flash - 0.08).max(0.0);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use concertina_core::button::{ButtonDefinition, ButtonId};

    fn state(i: usize, in_lit: bool, out_lit: bool) -> ButtonState {
        ButtonState {
            id:      ButtonId(i),
            button:  ButtonDefinition::new(60, 62),
            pressed: in_lit || out_lit,
            in_lit,
            out_lit,
        }
    }

    #[test]
    fn octaves_share_a_color() {
        assert_eq!(pitch_color(60), pitch_color(72));
        assert_ne!(pitch_color(60), pitch_color(62));
    }

    #[test]
    fn colors_are_opaque() {
        for n in 0..128u8 {
            assert_eq!(pitch_color(n) >> 24, 0xFF, "note {} color should be opaque", n);
        }
    }

    #[test]
    fn trace_capacity() {
        let mut t = GapTrace::new(5);
        for i in 0..8 { t.push(i as f32); }
        assert_eq!(t.samples, vec![3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_eq!(t.range(), Some((3.0, 7.0)));
    }

    #[test]
    fn long_trace_stays_bounded() {
        let mut t = GapTrace::new(240);
        for i in 0..10_000 { t.push(i as f32 * 1e-4); }
        assert_eq!(t.samples.len(), 240);
        assert_eq!(t.samples.front(), Some(&(9_760.0 * 1e-4)));
    }

    #[test]
    fn flat_trace_has_nonzero_range() {
        let mut t = GapTrace::new(4);
        assert_eq!(t.range(), None);
        t.push(0.4);
        t.push(0.4);
        let (lo, hi) = t.range().unwrap();
        assert!(hi > lo);
    }

    #[test]
    fn released_button_fades_out() {
        let mut p = PanelState::new(1, 8);
        p.update(&[state(0, true, false)], BellowsDirection::PushIn, Some(0.4));
        assert_eq!(p.buttons[0].in_glow, 1.0);
        assert!(p.buttons[0].pressed);

        let off = [state(0, false, false)];
        p.update(&off, BellowsDirection::PushIn, Some(0.4));
        p.tick(&off);
        assert!(p.buttons[0].in_glow < 1.0 && p.buttons[0].in_glow > 0.0);
        for _ in 0..50 { p.tick(&off); }
        assert_eq!(p.buttons[0].in_glow, 0.0);
    }

    #[test]
    fn held_button_stays_lit() {
        let mut p = PanelState::new(1, 8);
        let on = [state(0, false, true)];
        p.update(&on, BellowsDirection::PullOut, None);
        for _ in 0..10 { p.tick(&on); }
        assert_eq!(p.buttons[0].out_glow, 1.0);
    }

    #[test]
    fn direction_change_flashes() {
        let mut p = PanelState::new(0, 4);
        p.update(&[], BellowsDirection::PullOut, Some(0.5));
        assert_eq!(p.flash, 1.0);
        for _ in 0..20 { p.tick(&[]); }
        assert_eq!(p.flash, 0.0);
        p.update(&[], BellowsDirection::PullOut, Some(0.5));
        assert_eq!(p.flash, 0.0);
    }
}
