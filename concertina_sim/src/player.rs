//! Real-time MIDI output thread.
//!
//! The engine's note commands are forwarded over a channel to a thread that
//! owns the MIDI connection, so a slow or missing port never stalls the
//! frame loop.  [`Player`] implements [`Synthesizer`]; sends are
//! fire-and-forget.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use concertina_core::config::MidiConfig;
use concertina_core::pitch::Pitch;
use concertina_core::synth::Synthesizer;

// ════════════════════════════════════════════════════════════════════════════
// PlayerCommand: sent to the output thread
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerCommand {
    NoteOn(Pitch),
    NoteOff(Pitch),
    /// Release everything and terminate the thread.
    Quit,
}

// ════════════════════════════════════════════════════════════════════════════
// MidiOut: abstraction over midir / null (for testing)
// ════════════════════════════════════════════════════════════════════════════

trait MidiOut: Send {
    fn program_change(&mut self, channel: u8, program: u8);
    fn note_on(&mut self,  channel: u8, note: u8, velocity: u8);
    fn note_off(&mut self, channel: u8, note: u8);
}

// ── midir backend ─────────────────────────────────────────────────────────

struct MidirOut {
    conn: midir::MidiOutputConnection,
}

impl MidirOut {
    fn send(&mut self, msg: &[u8]) {
        if let Err(e) = self.conn.send(msg) {
            log::warn!(target: "player", "MIDI send failed: {}", e);
        }
    }
}

impl MidiOut for MidirOut {
    fn program_change(&mut self, channel: u8, program: u8) {
        self.send(&[0xC0 | (channel & 0x0F), program & 0x7F]);
    }
    fn note_on(&mut self, channel: u8, note: u8, velocity: u8) {
        self.send(&[0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]);
    }
    fn note_off(&mut self, channel: u8, note: u8) {
        self.send(&[0x80 | (channel & 0x0F), note & 0x7F, 0]);
    }
}

// ── null backend (used when no MIDI port is available) ────────────────────

struct NullOut;
impl MidiOut for NullOut {
    fn program_change(&mut self, _ch: u8, _p: u8)   {}
    fn note_on(&mut self, _ch: u8, _n: u8, _v: u8)  {}
    fn note_off(&mut self, _ch: u8, _n: u8)          {}
}

// ════════════════════════════════════════════════════════════════════════════
// open_midi_output: enumerate ports and pick first available
// ════════════════════════════════════════════════════════════════════════════

/// Try to open a MIDI output port, preferring a software synthesiser.
/// Falls back to `NullOut` with a warning if none found.
fn open_midi_output() -> Box<dyn MidiOut> {
    let midi_out = match midir::MidiOutput::new("concertina") {
        Ok(m)  => m,
        Err(e) => {
            log::warn!(target: "player", "MIDI init error: {}; using null output", e);
            return Box::new(NullOut);
        }
    };

    let ports = midi_out.ports();
    if ports.is_empty() {
        log::warn!(
            target: "player",
            "no MIDI output ports found; using null output. \
             Start a synthesiser such as `fluidsynth` or `timidity -iA`."
        );
        return Box::new(NullOut);
    }

    let port_idx = ports.iter().enumerate()
        .find(|(_, p)| {
            midi_out.port_name(p).map(|n| {
                let n = n.to_lowercase();
                n.contains("fluid") || n.contains("timidity") ||
                n.contains("microsoft") || n.contains("gm") ||
                n.contains("synth")
            }).unwrap_or(false)
        })
        .map(|(i, _)| i)
        .unwrap_or(0);

    let port = &ports[port_idx];
    let name = midi_out.port_name(port)
        .unwrap_or_else(|_| "Unknown".to_string());
    log::info!(target: "player", "opening MIDI port: {}", name);

    match midi_out.connect(port, "concertina-out") {
        Ok(conn) => Box::new(MidirOut { conn }),
        Err(e) => {
            log::warn!(target: "player", "failed to connect: {}; using null output", e);
            Box::new(NullOut)
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Player: handle to the output thread
// ════════════════════════════════════════════════════════════════════════════

pub struct Player {
    cmd_tx: Sender<PlayerCommand>,
    handle: Option<JoinHandle<()>>,
}

impl Player {
    /// Spawn the output thread.  The port is opened on the thread itself.
    pub fn spawn(midi: MidiConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel::<PlayerCommand>();
        let handle = thread::spawn(move || {
            let mut out = open_midi_output();
            player_loop(out.as_mut(), &midi, cmd_rx);
        });
        Player { cmd_tx, handle: Some(handle) }
    }

    fn send(&self, cmd: PlayerCommand) {
        let _ = self.cmd_tx.send(cmd);
    }

    /// Release everything, stop the thread, and wait for it.
    pub fn quit(&mut self) {
        self.send(PlayerCommand::Quit);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Synthesizer for Player {
    fn note_on(&mut self, note: Pitch)  { self.send(PlayerCommand::NoteOn(note)); }
    fn note_off(&mut self, note: Pitch) { self.send(PlayerCommand::NoteOff(note)); }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.quit();
    }
}

// ════════════════════════════════════════════════════════════════════════════
// player_loop: the actual loop
// ════════════════════════════════════════════════════════════════════════════

/// Forward commands until `Quit` or until every sender is gone.
///
/// Notes started here are remembered so that shutdown can release them
/// individually; some synthesisers ignore the MIDI all-notes-off
/// controller.
fn player_loop(midi: &mut dyn MidiOut, cfg: &MidiConfig, cmd_rx: Receiver<PlayerCommand>) {
    let channel = cfg.channel;
    let mut sounding: Vec<Pitch> = Vec::new();

    midi.program_change(channel, cfg.program);

    for cmd in cmd_rx {
        log::trace!(target: "player", "{:?}", cmd);
        match cmd {
            PlayerCommand::NoteOn(n) => {
                midi.note_on(channel, n, cfg.velocity);
                if !sounding.contains(&n) { sounding.push(n); }
            }
            PlayerCommand::NoteOff(n) => {
                midi.note_off(channel, n);
                sounding.retain(|&s| s != n);
            }
            PlayerCommand::Quit => {
                release(midi, channel, &mut sounding);
                return;
            }
        }
    }
    release(midi, channel, &mut sounding);
}

fn release(midi: &mut dyn MidiOut, channel: u8, sounding: &mut Vec<Pitch>) {
    for note in sounding.drain(..) {
        midi.note_off(channel, note);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
