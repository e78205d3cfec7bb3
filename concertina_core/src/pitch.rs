//! Pitch numbers and the small amount of MIDI vocabulary the engine needs.

/// A MIDI note number (0–127).  Range is not enforced here; the
/// synthesizer is responsible for rejecting out-of-range values.
pub type Pitch = u8;

const NOTE_LETTERS: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Scientific pitch name of a MIDI note, e.g. `60 → "C4"`, `69 → "A4"`.
///
/// Returns `None` outside 0–127.
pub fn note_name(note: Pitch) -> Option<String> {
    if note > 127 {
        return None;
    }
    let letter = NOTE_LETTERS[(note % 12) as usize];
    let octave = (note as i32 / 12) - 1;
    Some(format!("{}{}", letter, octave))
}

/// Like [`note_name`] but never fails; out-of-range notes render as `"none"`.
pub fn label(note: Pitch) -> String {
    note_name(note).unwrap_or_else(|| "none".to_string())
}

/// Pitch class 0–11 (C = 0).
pub fn pitch_class(note: Pitch) -> u8 {
    note % 12
}

// ════════════════════════════════════════════════════════════════════════════
// General MIDI: organ family (programs 16–23)
// ════════════════════════════════════════════════════════════════════════════

/// The General MIDI organ family, which holds the free-reed instruments.
///
/// Use [`Organ::program`] to get the raw Program Change value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Organ {
    DrawbarOrgan     = 16,
    PercussiveOrgan  = 17,
    RockOrgan        = 18,
    ChurchOrgan      = 19,
    ReedOrgan        = 20,
    Accordion        = 21,
    Harmonica        = 22,
    TangoAccordion   = 23,
}

impl Organ {
    pub const ALL: [Organ; 8] = [
        Organ::DrawbarOrgan,
        Organ::PercussiveOrgan,
        Organ::RockOrgan,
        Organ::ChurchOrgan,
        Organ::ReedOrgan,
        Organ::Accordion,
        Organ::Harmonica,
        Organ::TangoAccordion,
    ];

    /// Raw MIDI program number.
    pub fn program(self) -> u8 { self as u8 }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Organ::DrawbarOrgan    => "Drawbar Organ",
            Organ::PercussiveOrgan => "Percussive Organ",
            Organ::RockOrgan       => "Rock Organ",
            Organ::ChurchOrgan     => "Church Organ",
            Organ::ReedOrgan       => "Reed Organ",
            Organ::Accordion       => "Accordion",
            Organ::Harmonica       => "Harmonica",
            Organ::TangoAccordion  => "Tango Accordion",
        }
    }

    /// Look up a program number within the organ family.
    pub fn from_program(program: u8) -> Option<Self> {
        Some(match program {
            16 => Organ::DrawbarOrgan,
            17 => Organ::PercussiveOrgan,
            18 => Organ::RockOrgan,
            19 => Organ::ChurchOrgan,
            20 => Organ::ReedOrgan,
            21 => Organ::Accordion,
            22 => Organ::Harmonica,
            23 => Organ::TangoAccordion,
            _  => return None,
        })
    }
}
