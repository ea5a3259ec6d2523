// Purpose: the uniform synth contract, its adapters, and the registry
// This layer sits between the playback session and the voice/engine backends

pub mod adapter;
pub mod bridge;
pub mod factory;
pub mod message;
pub mod param;
pub mod poly;
pub mod registry;
pub mod voice;

use std::fmt;

use crate::engine::clock::Transport;
use crate::io::midi::MidiEvent;
use crate::note::{NoteEvent, Pitch};

pub use adapter::VoiceAdapter;
pub use bridge::{EngineBridge, ExternalEngine};
pub use factory::{BackendKind, SynthConfig};
pub use param::{Control, Domain, ParamCatalog, ParamSpec, ParamValue, Parameter};
pub use poly::{PolyEngine, PolySynth};
pub use registry::SynthRegistry;

/// Stable name of one configured backend instance.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SynthId(String);

impl SynthId {
    pub fn new(id: impl Into<String>) -> Self {
        SynthId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SynthId {
    fn from(id: &str) -> Self {
        SynthId(id.to_string())
    }
}

impl From<String> for SynthId {
    fn from(id: String) -> Self {
        SynthId(id)
    }
}

impl fmt::Display for SynthId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynthError {
    #[error("unknown synth id {0:?}")]
    UnknownSynthId(SynthId),
    #[error("unknown parameter {name:?}")]
    UnknownParameter { name: String },
    #[error("invalid value {value:?} for parameter {name:?}")]
    InvalidParameterValue { name: String, value: String },
    #[error("audio backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("invalid synth configuration: {0}")]
    InvalidConfig(String),
}

/// One backend behind the common note and parameter contract.
///
/// Times are absolute context seconds; `None` means "now" on the given
/// clock. Triggers after `dispose` are ignored.
pub trait SynthAdapter {
    fn id(&self) -> &SynthId;

    /// Short backend label for listings.
    fn kind(&self) -> &'static str;

    fn trigger_attack(&mut self, clock: &mut Transport, note: NoteEvent);

    /// Stop the note sounding for `pitch`. Monophonic backends ignore the
    /// pitch and release whatever is playing.
    fn trigger_release(&mut self, clock: &mut Transport, pitch: Option<Pitch>, time: Option<f64>);

    /// Attack now (or at `note.time`) and release `duration` seconds later.
    fn trigger_attack_release(&mut self, clock: &mut Transport, note: NoteEvent, duration: f64);

    /// Handle a wire message that was deferred on the clock. Backends with
    /// no wire input ignore it.
    fn deliver(&mut self, _event: MidiEvent) {}

    /// Housekeeping at context time `now`.
    fn process(&mut self, _now: f64) {}

    fn is_sounding(&self, at: f64) -> bool;

    /// Every parameter, read live.
    fn parameters(&self) -> Vec<Parameter>;

    fn parameter(&self, name: &str) -> Result<Parameter, SynthError>;

    /// Returns the value actually applied.
    fn set_parameter(&mut self, name: &str, value: ParamValue) -> Result<ParamValue, SynthError>;

    /// Names of loadable patches, for backends that have them.
    fn patch_names(&self) -> Option<Vec<String>> {
        None
    }

    /// Silence and release backend resources. Idempotent.
    fn dispose(&mut self);

    fn is_disposed(&self) -> bool;
}
