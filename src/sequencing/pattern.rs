/*
Pattern API
===========

A pattern is the declarative step list of one track. Each top-level slot
occupies exactly one step (one `subdivision` of the track), so timing is
implicit in position:

    [F1, F2, [F1, F2], [_, F2]]  at 4n = four quarter steps, the last two
                                        split into eighths

Slots nest:
- a note plays one pitch
- a rest plays nothing
- a chord plays several pitches at the same instant
- a subdivision splits its step into equal (or weighted) parts
- an alternation plays one child per loop cycle, round-robin

Expansion turns one step into tick-stamped `SequenceEvent`s; the scheduler
asks for them lazily, one step at a time.
*/

use super::sequence::SequenceEvent;
use crate::note::Velocity;

/// A slot in a pattern
#[derive(Debug, Clone, PartialEq)]
pub enum PatternSlot {
    /// A single note
    Note(NoteSlot),
    /// Silence for this slot
    Rest,
    /// Several notes sounding together
    Chord(Vec<NoteSlot>),
    /// Subdivide this slot into smaller parts
    Subdivision(Vec<PatternSlot>),
    /// One child per loop cycle: cycle 0 plays the first, cycle 1 the second...
    Alternation(Vec<PatternSlot>),
}

/// A note with optional velocity override and weight for uneven subdivisions
#[derive(Debug, Clone, PartialEq)]
pub struct NoteSlot {
    /// MIDI note number
    pub note: u8,
    /// Overrides the track velocity when set
    pub velocity: Option<Velocity>,
    /// Weight for uneven subdivisions (default 1)
    /// In a subdivision like [C4@2, E4], C4 gets 2/3 of the time
    pub weight: u8,
}

impl NoteSlot {
    pub fn new(note: u8) -> Self {
        Self {
            note,
            velocity: None,
            weight: 1,
        }
    }

    pub fn with_velocity(mut self, velocity: f32) -> Self {
        self.velocity = Some(Velocity::new(velocity));
        self
    }

    pub fn with_weight(mut self, weight: u8) -> Self {
        self.weight = weight.max(1);
        self
    }
}

/// Convenient conversion from u8 (MIDI note) to PatternSlot
impl From<u8> for PatternSlot {
    fn from(note: u8) -> Self {
        PatternSlot::Note(NoteSlot::new(note))
    }
}

impl From<NoteSlot> for PatternSlot {
    fn from(note: NoteSlot) -> Self {
        PatternSlot::Note(note)
    }
}

/// Convenient conversion from `Option<u8>`: `None` is a rest
impl From<Option<u8>> for PatternSlot {
    fn from(note: Option<u8>) -> Self {
        note.map_or(PatternSlot::Rest, PatternSlot::from)
    }
}

/// Why a slot cannot be expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotFault {
    /// A subdivision or alternation with no children
    Empty,
    /// A note with weight 0
    ZeroWeight,
}

impl PatternSlot {
    /// First fault in this slot or its children.
    pub fn fault(&self) -> Option<SlotFault> {
        match self {
            PatternSlot::Note(n) if n.weight == 0 => Some(SlotFault::ZeroWeight),
            // Chord weights are never read
            PatternSlot::Note(_) | PatternSlot::Rest | PatternSlot::Chord(_) => None,
            PatternSlot::Subdivision(slots) | PatternSlot::Alternation(slots) if slots.is_empty() => {
                Some(SlotFault::Empty)
            }
            PatternSlot::Subdivision(slots) | PatternSlot::Alternation(slots) => {
                slots.iter().find_map(PatternSlot::fault)
            }
        }
    }

    fn weight(&self) -> u64 {
        match self {
            PatternSlot::Note(n) => n.weight as u64,
            _ => 1,
        }
    }

    fn has_alternation(&self) -> bool {
        match self {
            PatternSlot::Alternation(_) => true,
            PatternSlot::Subdivision(slots) => slots.iter().any(PatternSlot::has_alternation),
            _ => false,
        }
    }
}

/// The ordered steps of one track
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pattern {
    pub steps: Vec<PatternSlot>,
}

impl Pattern {
    pub fn new(steps: Vec<PatternSlot>) -> Self {
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The first step that cannot be expanded, and why.
    pub fn fault(&self) -> Option<(usize, SlotFault)> {
        self.steps
            .iter()
            .enumerate()
            .find_map(|(step, slot)| slot.fault().map(|fault| (step, fault)))
    }

    /// True when expansion depends on the loop cycle.
    pub fn varies_by_cycle(&self) -> bool {
        self.steps.iter().any(PatternSlot::has_alternation)
    }

    /// Expand one step into events, appended to `events`.
    ///
    /// `start_tick` is where the step begins and `step_ticks` how long it
    /// lasts. Steps past the end of the pattern are silent, and so are
    /// slots with a `fault`.
    pub fn expand_step(
        &self,
        step: usize,
        start_tick: u64,
        step_ticks: u64,
        cycle: u64,
        events: &mut Vec<SequenceEvent>,
    ) {
        if let Some(slot) = self.steps.get(step) {
            Self::expand_slot(slot, step, start_tick, step_ticks, cycle, events);
        }
    }

    /// Recursively expand a slot into sequence events
    fn expand_slot(
        slot: &PatternSlot,
        step: usize,
        start_tick: u64,
        duration: u64,
        cycle: u64,
        events: &mut Vec<SequenceEvent>,
    ) {
        match slot {
            PatternSlot::Note(note_slot) => {
                events.push(SequenceEvent::from_slot(note_slot, step, start_tick, duration));
            }
            PatternSlot::Rest => {
                // Rests don't create events, just consume time
            }
            PatternSlot::Chord(notes) => {
                // Listed order is kept; the notes are simultaneous in musical time
                for note_slot in notes {
                    events.push(SequenceEvent::from_slot(note_slot, step, start_tick, duration));
                }
            }
            PatternSlot::Subdivision(sub_slots) => {
                let total_weight: u64 = sub_slots.iter().map(PatternSlot::weight).sum();
                if total_weight == 0 {
                    return;
                }

                // Distribute time according to weights
                let mut sub_cursor = start_tick;
                for sub_slot in sub_slots {
                    let sub_duration = (duration * sub_slot.weight()) / total_weight;
                    Self::expand_slot(sub_slot, step, sub_cursor, sub_duration, cycle, events);
                    sub_cursor += sub_duration;
                }
            }
            PatternSlot::Alternation(choices) => {
                if choices.is_empty() {
                    return;
                }
                let pick = &choices[(cycle % choices.len() as u64) as usize];
                Self::expand_slot(pick, step, start_tick, duration, cycle, events);
            }
        }
    }
}

impl From<Vec<PatternSlot>> for Pattern {
    fn from(steps: Vec<PatternSlot>) -> Self {
        Pattern::new(steps)
    }
}

/// Macro for writing patterns with a concise syntax
///
/// # Examples
///
/// ```
/// use tonebridge::pattern;
/// use tonebridge::sequencing::notes::*;
///
/// // Four steps
/// let arp = pattern![C4, E4, G4, C5];
///
/// // Rests (use _)
/// let sparse = pattern![C4, _, G4, _];
///
/// // Subdivisions with brackets
/// let bass = pattern![F1, F2, [F1, F2], [_, F2]];
///
/// // Chords with braces
/// let stabs = pattern![{C4, E4, G4}, _, {F4, A4, C5}, _];
/// ```
#[macro_export]
macro_rules! pattern {
    [$($slot:tt),* $(,)?] => {
        $crate::sequencing::Pattern::new(vec![$($crate::pattern!(@slot $slot)),*])
    };

    // Rest slot
    (@slot _) => {
        $crate::sequencing::PatternSlot::Rest
    };

    // Subdivision slot (brackets)
    (@slot [$($inner:tt),* $(,)?]) => {
        $crate::sequencing::PatternSlot::Subdivision(
            vec![$($crate::pattern!(@slot $inner)),*]
        )
    };

    // Chord slot (braces)
    (@slot {$($note:expr),* $(,)?}) => {
        $crate::sequencing::PatternSlot::Chord(
            vec![$($crate::sequencing::NoteSlot::new($note)),*]
        )
    };

    // Note slot (any other identifier/expression)
    (@slot $note:expr) => {
        $crate::sequencing::PatternSlot::from($note)
    };
}

/// Helper functions for building pattern slots
pub mod slot {
    use super::*;

    /// Create a note slot
    pub fn note(midi_note: u8) -> PatternSlot {
        PatternSlot::Note(NoteSlot::new(midi_note))
    }

    /// Create a note slot with velocity
    pub fn note_vel(midi_note: u8, velocity: f32) -> PatternSlot {
        PatternSlot::Note(NoteSlot::new(midi_note).with_velocity(velocity))
    }

    /// Create a note slot with weight (for swing)
    pub fn note_weight(midi_note: u8, weight: u8) -> PatternSlot {
        PatternSlot::Note(NoteSlot::new(midi_note).with_weight(weight))
    }

    /// Create a rest slot
    pub fn rest() -> PatternSlot {
        PatternSlot::Rest
    }

    /// Create a chord
    pub fn chord(midi_notes: &[u8]) -> PatternSlot {
        PatternSlot::Chord(midi_notes.iter().copied().map(NoteSlot::new).collect())
    }

    /// Create a subdivision
    pub fn sub(slots: Vec<PatternSlot>) -> PatternSlot {
        PatternSlot::Subdivision(slots)
    }

    /// Create an alternation
    pub fn alt(slots: Vec<PatternSlot>) -> PatternSlot {
        PatternSlot::Alternation(slots)
    }
}

#[cfg(test)]
mod tests {
    use super::slot::*;
    use super::*;
    use crate::sequencing::notes::*;

    const QUARTER: u64 = 480;

    fn expand(pattern: &Pattern, step: usize, cycle: u64) -> Vec<SequenceEvent> {
        let mut events = Vec::new();
        pattern.expand_step(step, step as u64 * QUARTER, QUARTER, cycle, &mut events);
        events
    }

    #[test]
    fn test_one_note_per_step() {
        let pattern = pattern![C4, E4, G4, C5];
        assert_eq!(pattern.len(), 4);

        let events = expand(&pattern, 2, 0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].note, G4);
        assert_eq!(events[0].tick_offset, 960);
        assert_eq!(events[0].duration_ticks, 480);
        assert_eq!(events[0].step, 2);
    }

    #[test]
    fn test_rest_and_past_end_are_silent() {
        let pattern = pattern![C4, _];
        assert!(expand(&pattern, 1, 0).is_empty());
        assert!(expand(&pattern, 7, 0).is_empty());
    }

    #[test]
    fn test_subdivision() {
        // The bass figure from the demo song: [F1, F2] inside one quarter
        let pattern = pattern![F1, F2, [F1, F2], [_, F2]];

        let third = expand(&pattern, 2, 0);
        assert_eq!(third.len(), 2);
        assert_eq!((third[0].note, third[0].tick_offset), (F1, 960));
        assert_eq!((third[1].note, third[1].tick_offset), (F2, 1200));
        assert_eq!(third[0].duration_ticks, 240);

        let fourth = expand(&pattern, 3, 0);
        assert_eq!(fourth.len(), 1);
        assert_eq!((fourth[0].note, fourth[0].tick_offset), (F2, 1440 + 240));
    }

    #[test]
    fn test_chord_notes_share_a_start() {
        let pattern = pattern![{C4, E4, G4}];
        let events = expand(&pattern, 0, 0);

        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.tick_offset == 0));
        let notes: Vec<u8> = events.iter().map(|e| e.note).collect();
        assert_eq!(notes, vec![C4, E4, G4]);
    }

    #[test]
    fn test_alternation_round_robins_by_cycle() {
        let pattern = Pattern::new(vec![alt(vec![note(C4), note(E4), rest()])]);
        assert!(pattern.varies_by_cycle());

        assert_eq!(expand(&pattern, 0, 0)[0].note, C4);
        assert_eq!(expand(&pattern, 0, 1)[0].note, E4);
        assert!(expand(&pattern, 0, 2).is_empty());
        assert_eq!(expand(&pattern, 0, 3)[0].note, C4);
    }

    #[test]
    fn test_nested_alternation_inside_subdivision() {
        let pattern = Pattern::new(vec![sub(vec![note(C4), alt(vec![note(E4), note(G4)])])]);
        assert!(pattern.varies_by_cycle());
        assert_eq!(expand(&pattern, 0, 1)[1].note, G4);
        assert!(!pattern![C4, [E4, G4]].varies_by_cycle());
    }

    #[test]
    fn test_swing_with_weights() {
        // Swing: first note gets 2 parts, second gets 1 (2:1 ratio)
        let pattern = Pattern::new(vec![sub(vec![note_weight(C4, 2), note(E4)])]);
        let events = expand(&pattern, 0, 0);

        assert_eq!(events[0].duration_ticks, 320);
        assert_eq!(events[1].tick_offset, 320);
        assert_eq!(events[1].duration_ticks, 160);
    }

    #[test]
    fn test_velocity_override() {
        let pattern = Pattern::new(vec![note_vel(C4, 0.05), note(C4)]);
        assert_eq!(expand(&pattern, 0, 0)[0].velocity, Some(Velocity::new(0.05)));
        assert_eq!(expand(&pattern, 1, 0)[0].velocity, None);
    }

    #[test]
    fn test_option_slots() {
        let pattern = Pattern::new(vec![Some(F2).into(), None::<u8>.into(), chord(&[F3])]);
        assert_eq!(pattern.steps[1], PatternSlot::Rest);
        assert_eq!(expand(&pattern, 2, 0)[0].note, F3);
    }

    #[test]
    fn test_pattern_macro_trailing_comma() {
        let p = pattern![C4, E4, G4, C5,];
        assert_eq!(p.steps.len(), 4);
    }

    #[test]
    fn test_faults_are_found_and_play_silent() {
        let empty_sub = Pattern::new(vec![note(C4), sub(vec![])]);
        assert_eq!(empty_sub.fault(), Some((1, SlotFault::Empty)));
        assert!(expand(&empty_sub, 1, 0).is_empty());

        let empty_alt = Pattern::new(vec![sub(vec![note(C4), alt(vec![])])]);
        assert_eq!(empty_alt.fault(), Some((0, SlotFault::Empty)));
        assert_eq!(expand(&empty_alt, 0, 3).len(), 1);

        let mut weightless = NoteSlot::new(C4);
        weightless.weight = 0;
        let zero = Pattern::new(vec![sub(vec![weightless.into()])]);
        assert_eq!(zero.fault(), Some((0, SlotFault::ZeroWeight)));
        assert!(expand(&zero, 0, 0).is_empty());

        assert_eq!(pattern![C4, [E4, _], {G4, B4}].fault(), None);
    }
}
