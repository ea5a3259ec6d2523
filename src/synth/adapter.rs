use tracing::debug;

use super::param::{ParamCatalog, ParamValue, Parameter};
use super::{SynthAdapter, SynthError, SynthId};
use crate::engine::clock::Transport;
use crate::note::{NoteEvent, Pitch};
use crate::voices::VoiceBackend;

/// Adapter for the built-in monophonic voices.
///
/// Release is global: `trigger_release` closes whatever note the voice is
/// playing, regardless of the pitch passed in. A `None` pitch on attack is
/// silence for pitched voices and is ignored by fixed-pitch ones.
pub struct VoiceAdapter<B: VoiceBackend> {
    id: SynthId,
    kind: &'static str,
    backend: B,
    catalog: ParamCatalog<B>,
    disposed: bool,
}

impl<B: VoiceBackend> VoiceAdapter<B> {
    pub fn new(id: impl Into<SynthId>, kind: &'static str, backend: B) -> Self {
        Self {
            id: id.into(),
            kind,
            backend,
            catalog: B::params(),
            disposed: false,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Direct access for out-of-band changes; parameter reads stay live.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: VoiceBackend> SynthAdapter for VoiceAdapter<B> {
    fn id(&self) -> &SynthId {
        &self.id
    }

    fn kind(&self) -> &'static str {
        self.kind
    }

    fn trigger_attack(&mut self, clock: &mut Transport, note: NoteEvent) {
        if self.disposed {
            return;
        }
        let time = note.time.unwrap_or_else(|| clock.now());
        debug!(synth = %self.id, pitch = ?note.pitch, time, "attack");
        self.backend
            .trigger_attack(note.pitch.map(Pitch::to_frequency), time, note.velocity);
    }

    fn trigger_release(&mut self, clock: &mut Transport, _pitch: Option<Pitch>, time: Option<f64>) {
        if self.disposed {
            return;
        }
        let time = time.unwrap_or_else(|| clock.now());
        debug!(synth = %self.id, time, "release");
        self.backend.trigger_release(time);
    }

    fn trigger_attack_release(&mut self, clock: &mut Transport, note: NoteEvent, duration: f64) {
        if self.disposed {
            return;
        }
        let time = note.time.unwrap_or_else(|| clock.now());
        self.backend
            .trigger_attack_release(note.pitch.map(Pitch::to_frequency), duration, time, note.velocity);
    }

    fn process(&mut self, now: f64) {
        self.backend.prune(now);
    }

    fn is_sounding(&self, at: f64) -> bool {
        !self.disposed && self.backend.is_sounding(at)
    }

    fn parameters(&self) -> Vec<Parameter> {
        self.catalog.read(&self.backend)
    }

    fn parameter(&self, name: &str) -> Result<Parameter, SynthError> {
        self.catalog.value(&self.backend, name)
    }

    fn set_parameter(&mut self, name: &str, value: ParamValue) -> Result<ParamValue, SynthError> {
        self.catalog.apply(&mut self.backend, name, value)
    }

    fn dispose(&mut self) {
        if !self.disposed {
            self.backend.dispose();
            self.disposed = true;
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}
