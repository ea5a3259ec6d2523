use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::adapter::VoiceAdapter;
use super::bridge::EngineBridge;
use super::poly::PolyEngine;
use super::{SynthAdapter, SynthId};
use crate::patch::PatchLibrary;
use crate::voices::{DuoSynth, MembraneSynth, MetalSynth, MonoSynth};

/// The closed set of backends a registry can be built from.
///
/// This is the "instrument design" layer: pick a kind once in the session
/// configuration and the registry creates the adapter for it.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendKind {
    /// Single oscillator with an amplitude envelope
    Simple,
    /// Pitch-swept sine for kicks and toms
    Membrane,
    /// Inharmonic FM partials for hats and cymbals
    Metal,
    /// Two detunable sub-voices with shared vibrato
    DualOscillator,
    /// The hosted polyphonic engine
    Engine {
        voices: usize,
        /// Index into the factory patch library loaded at start
        default_patch: usize,
        /// Capacity of the engine's message ring
        inlet_capacity: usize,
    },
}

impl BackendKind {
    /// Engine with 16 voices that starts on factory patch 2.
    pub fn engine() -> Self {
        BackendKind::Engine {
            voices: 16,
            default_patch: 2,
            inlet_capacity: 256,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BackendKind::Simple => "simple",
            BackendKind::Membrane => "membrane",
            BackendKind::Metal => "metal",
            BackendKind::DualOscillator => "dual",
            BackendKind::Engine { .. } => "engine",
        }
    }

    pub fn create_adapter(&self, id: SynthId) -> Box<dyn SynthAdapter> {
        debug!(synth = %id, kind = self.label(), "creating adapter");
        let label = self.label();
        match self {
            BackendKind::Simple => Box::new(VoiceAdapter::new(id, label, MonoSynth::default())),
            BackendKind::Membrane => Box::new(VoiceAdapter::new(id, label, MembraneSynth::default())),
            BackendKind::Metal => Box::new(VoiceAdapter::new(id, label, MetalSynth::default())),
            BackendKind::DualOscillator => Box::new(VoiceAdapter::new(id, label, DuoSynth::default())),
            BackendKind::Engine {
                voices,
                default_patch,
                inlet_capacity,
            } => {
                let library = PatchLibrary::factory();
                let engine = PolyEngine::new(*voices, *inlet_capacity, library.selected().settings.clone());
                Box::new(EngineBridge::new(id, Box::new(engine), library, *default_patch))
            }
        }
    }
}

/// One configured backend instance.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthConfig {
    pub id: SynthId,
    pub backend: BackendKind,
}

impl SynthConfig {
    pub fn new(id: impl Into<SynthId>, backend: BackendKind) -> Self {
        Self {
            id: id.into(),
            backend,
        }
    }

    pub fn build(&self) -> Box<dyn SynthAdapter> {
        self.backend.create_adapter(self.id.clone())
    }
}
