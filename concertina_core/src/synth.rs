//! The seam between the decision engine and whatever makes sound.
//!
//! The engine only ever calls [`Synthesizer::note_on`] and
//! [`Synthesizer::note_off`].  Both are fire-and-forget: implementations
//! must not block the frame loop.

use crate::pitch::Pitch;

/// Anything that can start and stop notes.
pub trait Synthesizer {
    fn note_on(&mut self, note: Pitch);
    fn note_off(&mut self, note: Pitch);
}

/// One emitted command, in the order it was sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NoteCommand {
    On(Pitch),
    Off(Pitch),
}

impl NoteCommand {
    pub fn pitch(self) -> Pitch {
        match self {
            NoteCommand::On(p) | NoteCommand::Off(p) => p,
        }
    }

    pub fn is_on(self) -> bool {
        matches!(self, NoteCommand::On(_))
    }

    /// Replay this command against a synthesizer.
    pub fn send_to(self, synth: &mut dyn Synthesizer) {
        match self {
            NoteCommand::On(p)  => synth.note_on(p),
            NoteCommand::Off(p) => synth.note_off(p),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// CommandLog: records instead of playing
// ════════════════════════════════════════════════════════════════════════════

/// A synthesizer that only records what it was asked to do.
///
/// Used by tests, and by the engine to report each tick's commands.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandLog {
    pub commands: Vec<NoteCommand>,
}

impl CommandLog {
    pub fn new() -> Self { Self::default() }

    /// Take the recorded commands, leaving the log empty.
    pub fn drain(&mut self) -> Vec<NoteCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn is_empty(&self) -> bool { self.commands.is_empty() }
    pub fn len(&self) -> usize { self.commands.len() }
}

impl Synthesizer for CommandLog {
    fn note_on(&mut self, note: Pitch)  { self.commands.push(NoteCommand::On(note));  }
    fn note_off(&mut self, note: Pitch) { self.commands.push(NoteCommand::Off(note)); }
}

/// Forwards every command to two synthesizers.  The engine uses this to
/// record a tick's output while still driving the real synthesizer.
pub(crate) struct Tee<'a> {
    pub first:  &'a mut dyn Synthesizer,
    pub second: &'a mut dyn Synthesizer,
}

impl Synthesizer for Tee<'_> {
    fn note_on(&mut self, note: Pitch) {
        self.first.note_on(note);
        self.second.note_on(note);
    }
    fn note_off(&mut self, note: Pitch) {
        self.first.note_off(note);
        self.second.note_off(note);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_records_in_order() {
        let mut log = CommandLog::new();
        log.note_on(60);
        log.note_off(60);
        log.note_on(62);
        assert_eq!(
            log.commands,
            vec![NoteCommand::On(60), NoteCommand::Off(60), NoteCommand::On(62)]
        );
        assert_eq!(log.drain().len(), 3);
        assert!(log.is_empty());
    }

    #[test]
    fn tee_forwards_to_both() {
        let mut a = CommandLog::new();
        let mut b = CommandLog::new();
        {
            let mut tee = Tee { first: &mut a, second: &mut b };
            NoteCommand::On(64).send_to(&mut tee);
            NoteCommand::Off(64).send_to(&mut tee);
        }
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
        assert!(a.commands[0].is_on());
        assert_eq!(a.commands[1].pitch(), 64);
    }
}
