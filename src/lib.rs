pub mod engine; // Shared clock, audio context, song scheduling
pub mod io; // Wire formats
pub mod note;
pub mod patch;
pub mod runtime; // Playback session
pub mod sequencing; // Musical timing and patterns
pub mod synth; // Uniform synth contract and adapters
pub mod voices;
