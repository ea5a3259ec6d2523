use super::pattern::NoteSlot;
use crate::note::Velocity;

/// A single note in a sequence
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceEvent {
    /// When this event occurs (in ticks from pattern position 0)
    pub tick_offset: u64,
    /// Span of the slot that produced it (in ticks)
    pub duration_ticks: u64,
    /// MIDI note number
    pub note: u8,
    /// Per-note velocity; `None` falls back to the track velocity
    pub velocity: Option<Velocity>,
    /// Top-level step this event belongs to
    pub step: usize,
}

impl SequenceEvent {
    pub(crate) fn from_slot(slot: &NoteSlot, step: usize, tick_offset: u64, duration_ticks: u64) -> Self {
        Self {
            tick_offset,
            duration_ticks,
            note: slot.note,
            velocity: slot.velocity,
            step,
        }
    }
}

/// One loop of a track compiled to ticks.
///
/// Events are sorted by `tick_offset`. `start_tick..end_tick` is the loop
/// window in pattern positions; events of the last step may run past
/// `end_tick` when a subdivision is cut by the loop end.
#[derive(Debug, Clone, Default)]
pub struct Sequence {
    /// List of events in this sequence
    pub events: Vec<SequenceEvent>,
    pub start_tick: u64,
    pub end_tick: u64,
}

impl Sequence {
    pub fn new(mut events: Vec<SequenceEvent>, start_tick: u64, end_tick: u64) -> Self {
        events.sort_by_key(|e| e.tick_offset);
        Self {
            events,
            start_tick,
            end_tick,
        }
    }

    /// Events belonging to one top-level step, in time order.
    pub fn step_events(&self, step: usize) -> impl Iterator<Item = &SequenceEvent> {
        self.events.iter().filter(move |e| e.step == step)
    }

    /// Get the total duration of this sequence in ticks
    pub fn duration_ticks(&self) -> u64 {
        self.end_tick - self.start_tick
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
