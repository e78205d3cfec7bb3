//! Software-rendered visualizer using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────┬───────────────────────────────┬──────────────┐
//! │  LEFT HAND   │        [ IN ]  [ OUT ]        │  RIGHT HAND  │
//! │  C row G row │                               │  C row G row │
//! │  ┌──┐  ┌──┐  │   |  |  |  |  |  |  |  |  |   │  ┌──┐  ┌──┐  │
//! │  │in│  │in│  │   pleats between the faces    │  │in│  │in│  │
//! │  │ou│  │ou│  │                               │  │ou│  │ou│  │
//! │  └──┘  └──┘  │   ~~~~ filtered gap trace ~~~ │  └──┘  └──┘  │
//! │  status bar                                                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::sync::mpsc::Sender;

use minifb::{Key, KeyRepeat, Window, WindowOptions};

use concertina_core::bellows::BellowsDirection;
use concertina_core::button::BUTTONS_PER_ROW;
use concertina_core::engine::{ButtonState, InputMode};
use concertina_core::pitch::label;
use concertina_core::pose::{bellows_segments, Point3};

use crate::gesture::{SimInput, SimKey};
use crate::panel::{pitch_color, PanelState, PLEAT_COUNT};

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

pub const WIN_W:     usize = 1000;
pub const WIN_H:     usize = 460;
const HAND_W:        usize = 280;
const CENTRE_X0:     usize = HAND_W + 20;
const CENTRE_W:      usize = WIN_W - 2 * CENTRE_X0;
const BUTTON_W:      usize = 100;
const BUTTON_H:      usize = 64;
const BUTTON_GAP:    usize = 10;
const PANEL_Y:       usize = 40;
const PLEAT_Y:       usize = 110;
const PLEAT_H:       usize = 110;
const TRACE_Y:       usize = 260;
const TRACE_H:       usize = 100;
const STATUS_Y:      usize = WIN_H - 40;
/// Screen pixels per metre of instrument width.
const PX_PER_M:      f32   = 700.0;

const BG_COLOR:      u32   = 0xFF1A1A2E;
const BUTTON_BG:     u32   = 0xFF2B2B44;
const LIT_COLOR:     u32   = 0xFF3DDC84;  // green, as on a lit reed
const PRESS_BORDER:  u32   = 0xFFFFFFFF;
const IDLE_BORDER:   u32   = 0xFF000000;
const PLEAT_COLOR:   u32   = 0xFF8A6A4A;
const FACE_COLOR:    u32   = 0xFFD9B98C;
const FLASH_COLOR:   u32   = 0xFFFFD700;
const TRACE_COLOR:   u32   = 0xFF6EC6FF;
const TEXT_BG:       u32   = 0xFF0F3460;

/// Keys that touch buttons, in layout order.
const BUTTON_KEYS: [Key; 20] = [
    Key::Key1, Key::Key2, Key::Key3, Key::Key4, Key::Key5,
    Key::Key6, Key::Key7, Key::Key8, Key::Key9, Key::Key0,
    Key::Z, Key::X, Key::C, Key::V, Key::B,
    Key::N, Key::M, Key::Comma, Key::Period, Key::Slash,
];

/// Map a window key to a simulated key.
pub fn sim_key(key: Key) -> Option<SimKey> {
    if let Some(i) = BUTTON_KEYS.iter().position(|&k| k == key) {
        return Some(SimKey::Button(i));
    }
    Some(match key {
        Key::Left   => SimKey::Squeeze,
        Key::Right  => SimKey::Stretch,
        Key::F      => SimKey::CurlIndex,
        Key::G      => SimKey::CurlMiddle,
        Key::U      => SimKey::ToggleTracking,
        Key::Tab    => SimKey::ToggleMode,
        Key::Escape => SimKey::Quit,
        _ => return None,
    })
}

/// Everything drawn in one frame.
pub struct View<'a> {
    pub buttons: &'a [ButtonState],
    pub panel:   &'a PanelState,
    pub mode:    InputMode,
    /// Instrument faces from the latest tracked pose.
    pub faces:   Option<(Point3, Point3)>,
    pub status:  &'a str,
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window: Window,
    buf:    Vec<u32>,
    sim_tx: Sender<SimInput>,
}

impl Visualizer {
    pub fn new(sim_tx: Sender<SimInput>) -> Result<Self, String> {
        let mut window = Window::new(
            "Concertina",
            WIN_W, WIN_H,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        ).map_err(|e| e.to_string())?;

        window.limit_update_rate(Some(std::time::Duration::from_millis(16))); // ~60fps

        Ok(Visualizer {
            window,
            buf: vec![BG_COLOR; WIN_W * WIN_H],
            sim_tx,
        })
    }

    /// Returns false when the window should close.
    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// Forward key transitions to the simulator, then one `Tick`.
    ///
    /// Returns false once the window is closed or Escape was pressed.
    pub fn poll_input(&mut self) -> bool {
        if !self.window.is_open() {
            let _ = self.sim_tx.send(SimInput::KeyDown(SimKey::Quit));
            return false;
        }

        let mut open = true;
        for key in self.window.get_keys_pressed(KeyRepeat::No) {
            if let Some(k) = sim_key(key) {
                if k == SimKey::Quit { open = false; }
                let _ = self.sim_tx.send(SimInput::KeyDown(k));
            }
        }
        for key in self.window.get_keys_released() {
            if let Some(k) = sim_key(key) {
                let _ = self.sim_tx.send(SimInput::KeyUp(k));
            }
        }
        let _ = self.sim_tx.send(SimInput::Tick);
        open
    }

    /// Render one frame.
    pub fn render(&mut self, view: &View) {
        self.buf.fill(BG_COLOR);

        // ── Button columns ────────────────────────────────────────────────
        let columns = view.buttons.len().div_ceil(BUTTONS_PER_ROW);
        let left_columns = columns.div_ceil(2);
        self.draw_label("LEFT HAND",  20,                  PANEL_Y - 20, 0xFFAADDFF);
        self.draw_label("RIGHT HAND", WIN_W - HAND_W + 20, PANEL_Y - 20, 0xFFFFBBAA);

        for (i, state) in view.buttons.iter().enumerate() {
            let col = i / BUTTONS_PER_ROW;
            let row = i % BUTTONS_PER_ROW;
            let x = if col < left_columns {
                20 + col * (BUTTON_W + BUTTON_GAP)
            } else {
                WIN_W - HAND_W + 20 + (col - left_columns) * (BUTTON_W + BUTTON_GAP)
            };
            let y = PANEL_Y + row * (BUTTON_H + BUTTON_GAP);
            let glow = view.panel.buttons.get(i).copied().unwrap_or_default();
            self.draw_button(state, glow.in_glow, glow.out_glow, x, y);
        }

        // ── Direction indicator ───────────────────────────────────────────
        let ix = CENTRE_X0 + CENTRE_W / 2 - BUTTON_W - 5;
        let push = view.panel.direction == BellowsDirection::PushIn;
        let pull = view.panel.direction == BellowsDirection::PullOut;
        self.draw_indicator("IN",  ix,                PANEL_Y, push);
        self.draw_indicator("OUT", ix + BUTTON_W + 10, PANEL_Y, pull);

        // ── Bellows ───────────────────────────────────────────────────────
        if let Some((left, right)) = view.faces {
            self.draw_bellows(left, right, view.panel.flash);
        } else {
            self.draw_label("NO HANDS TRACKED", CENTRE_X0 + CENTRE_W / 2 - 32, PLEAT_Y + PLEAT_H / 2, 0xFFFF6666);
        }

        // ── Filtered gap trace ────────────────────────────────────────────
        self.draw_trace(view.panel);

        // ── Status bar ────────────────────────────────────────────────────
        self.fill_rect(0, STATUS_Y, WIN_W, WIN_H - STATUS_Y, TEXT_BG);
        let mode = match view.mode {
            InputMode::Buttons   => "MODE: BUTTONS",
            InputMode::Proximity => "MODE: FINGERS",
        };
        self.draw_label(mode, 10, STATUS_Y + 8, 0xFFFFD700);
        self.draw_label(view.status, 90, STATUS_Y + 8, 0xFFEEEEEE);

        // ── Key legend ────────────────────────────────────────────────────
        self.draw_label(
            "1-0 Z-/=buttons  LEFT/RIGHT=squeeze/stretch  F/G=curl  U=tracking  TAB=mode  ESC=quit",
            10, WIN_H - 14, 0xFF888888,
        );

        self.window.update_with_buffer(&self.buf, WIN_W, WIN_H).ok();
    }

    // ── Buttons ───────────────────────────────────────────────────────────

    fn draw_button(&mut self, state: &ButtonState, in_glow: f32, out_glow: f32, x: usize, y: usize) {
        let half = BUTTON_H / 2;
        let b = state.button;

        self.fill_rect(x, y,        BUTTON_W, half,            blend(BUTTON_BG, LIT_COLOR, in_glow));
        self.fill_rect(x, y + half, BUTTON_W, BUTTON_H - half, blend(BUTTON_BG, LIT_COLOR, out_glow));

        // Pitch-class swatches on the left edge.
        self.fill_rect(x + 2, y + 2,        6, half - 4, pitch_color(b.in_note));
        self.fill_rect(x + 2, y + half + 2, 6, half - 4, pitch_color(b.out_note));

        let text = |lit: f32| if lit > 0.5 { 0xFF000000 } else { 0xFFDDDDDD };
        self.draw_label(&label(b.in_note),  x + 14, y + half / 2 - 2,        text(in_glow));
        self.draw_label(&label(b.out_note), x + 14, y + half + half / 2 - 2, text(out_glow));

        let border = if state.pressed { PRESS_BORDER } else { IDLE_BORDER };
        self.draw_border(x, y, BUTTON_W, BUTTON_H, border);
        self.draw_border(x, y + half, BUTTON_W, 1, IDLE_BORDER);
    }

    fn draw_indicator(&mut self, text: &str, x: usize, y: usize, lit: bool) {
        let color = if lit { LIT_COLOR } else { BUTTON_BG };
        self.fill_rect(x, y, BUTTON_W, 40, color);
        self.draw_border(x, y, BUTTON_W, 40, IDLE_BORDER);
        let fg = if lit { 0xFF000000 } else { 0xFFDDDDDD };
        self.draw_label(text, x + BUTTON_W / 2 - text.len() * 2, y + 17, fg);
    }

    // ── Bellows ───────────────────────────────────────────────────────────

    fn draw_bellows(&mut self, left: Point3, right: Point3, flash: f32) {
        let mid_x = (left[0] + right[0]) / 2.0;
        let screen_x = |x: f32| -> usize {
            let cx = (CENTRE_X0 + CENTRE_W / 2) as f32;
            (cx + (x - mid_x) * PX_PER_M).clamp(CENTRE_X0 as f32, (CENTRE_X0 + CENTRE_W - 1) as f32) as usize
        };

        let pleat = blend(PLEAT_COLOR, FLASH_COLOR, flash);
        for p in bellows_segments(left, right, PLEAT_COUNT) {
            let x = screen_x(p[0]);
            self.fill_rect(x.saturating_sub(2), PLEAT_Y + 10, 4, PLEAT_H - 20, pleat);
        }
        for face in [left, right] {
            let x = screen_x(face[0]);
            self.fill_rect(x.saturating_sub(4), PLEAT_Y, 8, PLEAT_H, FACE_COLOR);
        }
    }

    // ── Gap trace ─────────────────────────────────────────────────────────

    fn draw_trace(&mut self, panel: &PanelState) {
        self.draw_border(CENTRE_X0, TRACE_Y, CENTRE_W, TRACE_H, 0xFF444466);
        self.draw_label("FILTERED GAP", CENTRE_X0 + 4, TRACE_Y - 10, 0xFF888888);

        let Some((lo, hi)) = panel.trace.range() else { return };
        let n = panel.trace.samples.len();
        let cap = panel.trace.capacity.max(2);
        for (i, &g) in panel.trace.samples.iter().enumerate() {
            // Newest sample sits at the right edge.
            let slot = cap - n + i;
            let x = CENTRE_X0 + 2 + slot * (CENTRE_W - 4) / (cap - 1);
            let t = (g - lo) / (hi - lo);
            let y = TRACE_Y + TRACE_H - 3 - (t * (TRACE_H - 6) as f32) as usize;
            self.set_pixel(x, y, TRACE_COLOR);
            self.set_pixel(x, y + 1, TRACE_COLOR);
        }
        if let Some(&last) = panel.trace.samples.back() {
            let text = format!("{:.3} M", last);
            self.draw_label(&text, CENTRE_X0 + CENTRE_W - 40, TRACE_Y - 10, TRACE_COLOR);
        }
    }

    // ── Primitive drawing helpers ─────────────────────────────────────────

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y+h).min(WIN_H) {
            for col in x..(x+w).min(WIN_W) {
                self.buf[row * WIN_W + col] = color;
            }
        }
    }

    fn draw_border(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        if w == 0 || h == 0 { return; }
        for col in x..(x+w).min(WIN_W) {
            if y < WIN_H           { self.buf[y           * WIN_W + col] = color; }
            if y+h-1 < WIN_H       { self.buf[(y+h-1)     * WIN_W + col] = color; }
        }
        for row in y..(y+h).min(WIN_H) {
            if x < WIN_W           { self.buf[row * WIN_W + x    ] = color; }
            if x+w-1 < WIN_W       { self.buf[row * WIN_W + x+w-1] = color; }
        }
    }

    fn set_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x < WIN_W && y < WIN_H {
            self.buf[y * WIN_W + x] = color;
        }
    }

    /// Minimal bitmap font: 3×5 characters for labels.
    /// Each character is encoded as 5 rows × 3 bits.
    fn draw_label(&mut self, text: &str, x: usize, y: usize, color: u32) {
        let mut cx = x;
        for ch in text.chars() {
            let glyph = char_glyph(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        self.set_pixel(cx + col, y + row, color);
                    }
                }
            }
            cx += 4; // 3 wide + 1 gap
            if cx + 4 > WIN_W { break; }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' | 'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' | 'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' | 'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' | 'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' | 'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' | 'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' | 'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' | 'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' | 'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' | 'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'k' | 'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' | 'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' | 'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'n' | 'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'o' | 'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' | 'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'q' | 'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'r' | 'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' | 'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' | 'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' | 'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'w' | 'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'x' | 'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' | 'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'z' | 'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '#' => [0b101, 0b111, 0b101, 0b111, 0b101],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        '>' => [0b100, 0b010, 0b001, 0b010, 0b100],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}

/// Alpha-blend two ARGB colors. `t` = 0.0 → all `a`, `t` = 1.0 → all `b`.
fn blend(a: u32, b: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    let lerp = |ca: u32, cb: u32| (ca as f32 * (1.0-t) + cb as f32 * t) as u32;
    let ar = (a >> 16) & 0xFF; let br = (b >> 16) & 0xFF;
    let ag = (a >>  8) & 0xFF; let bg = (b >>  8) & 0xFF;
    let ab =  a        & 0xFF; let bb =  b        & 0xFF;
    0xFF000000 | (lerp(ar,br) << 16) | (lerp(ag,bg) << 8) | lerp(ab,bb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_layout_slot_has_a_key() {
        for i in 0..20 {
            assert!(BUTTON_KEYS.iter().filter_map(|&k| sim_key(k)).any(|k| k == SimKey::Button(i)));
        }
        assert_eq!(sim_key(Key::Escape), Some(SimKey::Quit));
        assert_eq!(sim_key(Key::Q), None);
    }

    #[test]
    fn blend_endpoints() {
        assert_eq!(blend(0xFF000000, 0xFFFFFFFF, 0.0), 0xFF000000);
        assert_eq!(blend(0xFF000000, 0xFFFFFFFF, 1.0), 0xFFFFFFFF);
        assert_eq!(blend(0xFF102030, 0xFF102030, 0.5), 0xFF102030);
    }

    #[test]
    fn note_labels_are_drawable() {
        for n in [54u8, 61, 66, 70] {
            for ch in label(n).chars() {
                assert_ne!(char_glyph(ch), char_glyph('\u{1}'), "no glyph for {:?}", ch);
            }
        }
    }
}
