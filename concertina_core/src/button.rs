//! Buttons, the layout that registers them, and the set currently pressed.

use serde::{Deserialize, Serialize};

use crate::pitch::{self, Pitch};

// ════════════════════════════════════════════════════════════════════════════
// ButtonDefinition
// ════════════════════════════════════════════════════════════════════════════

/// One concertina button: the pitch it sounds on push and on pull.
///
/// Identity is the value itself: two definitions with the same pair of
/// pitches are the same button as far as the engine is concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ButtonDefinition {
    pub in_note:  Pitch,
    pub out_note: Pitch,
}

impl ButtonDefinition {
    pub const fn new(in_note: Pitch, out_note: Pitch) -> Self {
        ButtonDefinition { in_note, out_note }
    }

    /// `"C4/D4"` style label, push pitch first.
    pub fn label(&self) -> String {
        format!("{}/{}", pitch::label(self.in_note), pitch::label(self.out_note))
    }
}

impl From<(Pitch, Pitch)> for ButtonDefinition {
    fn from((in_note, out_note): (Pitch, Pitch)) -> Self {
        ButtonDefinition { in_note, out_note }
    }
}

/// Index of a button within the registered [`ButtonLayout`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ButtonId(pub usize);

// ════════════════════════════════════════════════════════════════════════════
// ButtonLayout
// ════════════════════════════════════════════════════════════════════════════

/// Buttons per row in the default layout.
pub const BUTTONS_PER_ROW: usize = 5;

/// The fixed table of playable buttons for a session.
///
/// The default layout is a 20-button C/G instrument: buttons 0–9 belong to
/// the left hand (C row then G row), 10–19 to the right hand.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ButtonLayout {
    buttons: Vec<ButtonDefinition>,
}

const DEFAULT_PAIRS: [(Pitch, Pitch); 20] = [
    // Left hand, C row
    (55, 59), (60, 62), (64, 65), (67, 69), (72, 71),
    // Left hand, G row
    (55, 57), (59, 60), (62, 64), (67, 66), (71, 69),
    // Right hand, C row
    (64, 67), (67, 71), (72, 74), (76, 77), (79, 81),
    // Right hand, G row
    (66, 69), (71, 72), (74, 76), (79, 78), (81, 79),
];

impl ButtonLayout {
    /// Register a layout.  Order is preserved; ids are positions.
    pub fn register(buttons: Vec<ButtonDefinition>) -> Self {
        ButtonLayout { buttons }
    }

    pub fn get(&self, id: ButtonId) -> Option<ButtonDefinition> {
        self.buttons.get(id.0).copied()
    }

    /// Id of the first button equal to `button`.
    pub fn id_of(&self, button: ButtonDefinition) -> Option<ButtonId> {
        self.buttons.iter().position(|b| *b == button).map(ButtonId)
    }

    pub fn buttons(&self) -> &[ButtonDefinition] { &self.buttons }
    pub fn len(&self) -> usize { self.buttons.len() }
    pub fn is_empty(&self) -> bool { self.buttons.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (ButtonId, ButtonDefinition)> + '_ {
        self.buttons.iter().enumerate().map(|(i, b)| (ButtonId(i), *b))
    }
}

impl Default for ButtonLayout {
    fn default() -> Self {
        ButtonLayout::register(DEFAULT_PAIRS.iter().copied().map(ButtonDefinition::from).collect())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ActiveButtonSet
// ════════════════════════════════════════════════════════════════════════════

/// Buttons currently pressed, in the order they were pressed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActiveButtonSet {
    buttons: Vec<ButtonDefinition>,
}

impl ActiveButtonSet {
    pub fn new() -> Self { Self::default() }

    /// Mark `button` as pressed.  Returns `false` (and changes nothing) if it
    /// already is.
    pub fn activate(&mut self, button: ButtonDefinition) -> bool {
        if self.contains(button) {
            return false;
        }
        self.buttons.push(button);
        true
    }

    /// Release the first entry equal to `button`.  Returns `false` if it was
    /// not pressed.
    pub fn deactivate(&mut self, button: ButtonDefinition) -> bool {
        match self.buttons.iter().position(|b| *b == button) {
            Some(i) => {
                self.buttons.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, button: ButtonDefinition) -> bool {
        self.buttons.contains(&button)
    }

    pub fn iter(&self) -> impl Iterator<Item = ButtonDefinition> + '_ {
        self.buttons.iter().copied()
    }

    pub fn len(&self) -> usize { self.buttons.len() }
    pub fn is_empty(&self) -> bool { self.buttons.is_empty() }

    pub fn clear(&mut self) { self.buttons.clear(); }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn default_layout_has_twenty_distinct_buttons() {
        let layout = ButtonLayout::default();
        assert_eq!(layout.len(), 20);
        let distinct: HashSet<_> = layout.buttons().iter().collect();
        assert_eq!(distinct.len(), 20);
    }

    #[test]
    fn default_layout_stays_in_range() {
        for (_, b) in ButtonLayout::default().iter() {
            assert!((53..=82).contains(&b.in_note),  "{:?}", b);
            assert!((53..=82).contains(&b.out_note), "{:?}", b);
        }
    }

    #[test]
    fn lookup_by_id_and_value() {
        let layout = ButtonLayout::default();
        let b = layout.get(ButtonId(1)).unwrap();
        assert_eq!(b, ButtonDefinition::new(60, 62));
        assert_eq!(layout.id_of(b), Some(ButtonId(1)));
        assert_eq!(layout.get(ButtonId(20)), None);
    }

    #[test]
    fn value_identity() {
        assert_eq!(ButtonDefinition::new(60, 62), ButtonDefinition::from((60, 62)));
        assert_ne!(ButtonDefinition::new(60, 62), ButtonDefinition::new(62, 60));
    }

    #[test]
    fn label_names_both_pitches() {
        assert_eq!(ButtonDefinition::new(60, 62).label(), "C4/D4");
    }

    #[test]
    fn activate_preserves_insertion_order() {
        let mut set = ActiveButtonSet::new();
        let a = ButtonDefinition::new(60, 62);
        let b = ButtonDefinition::new(55, 59);
        assert!(set.activate(a));
        assert!(set.activate(b));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn repeated_activation_is_idempotent() {
        let mut set = ActiveButtonSet::new();
        let a = ButtonDefinition::new(60, 62);
        assert!(set.activate(a));
        assert!(!set.activate(a));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn deactivate_missing_is_noop() {
        let mut set = ActiveButtonSet::new();
        set.activate(ButtonDefinition::new(60, 62));
        assert!(!set.deactivate(ButtonDefinition::new(64, 65)));
        assert_eq!(set.len(), 1);
        assert!(set.deactivate(ButtonDefinition::new(60, 62)));
        assert!(set.is_empty());
        assert!(!set.deactivate(ButtonDefinition::new(60, 62)));
    }
}
