// Purpose: the shared clock, the audio context that owns it, and the song
// scheduler that registers track cues against it

pub mod clock;
pub mod context;
pub mod scheduler;

pub use clock::{Cue, EventId, Fired, Transport, TransportState};
pub use context::{AudioContext, NullOutput, OutputDevice, OutputState};
pub use scheduler::{ScheduleConflict, SongScheduler, Trigger};
