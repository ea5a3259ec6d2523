pub mod duration;
pub mod notes;
pub mod pattern;
pub mod sequence;
pub mod song;
pub mod time_signature;
pub mod track;

pub use duration::Duration;
pub use pattern::{NoteSlot, Pattern, PatternSlot, SlotFault};
pub use sequence::{Sequence, SequenceEvent};
pub use song::{song1, Song, SongError};
pub use time_signature::TimeSignature;
pub use track::{StepPosition, Track, TrackBuilder, TrackError, TrackTicks};
