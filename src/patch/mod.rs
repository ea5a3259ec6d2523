//! Patches for the external engine: named snapshots of its instrument
//! settings, plus the library the engine loads them from.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Triangle,
    Square,
    Sawtooth,
}

impl Waveform {
    pub const ALL: [Waveform; 4] = [Waveform::Sine, Waveform::Triangle, Waveform::Square, Waveform::Sawtooth];

    pub fn name(self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Triangle => "triangle",
            Waveform::Square => "square",
            Waveform::Sawtooth => "sawtooth",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|w| w.name() == name)
    }

    /// Names in declaration order, for discrete parameter domains.
    pub fn names() -> Vec<String> {
        Self::ALL.iter().map(|w| w.name().to_string()).collect()
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    LowPass,
    HighPass,
    BandPass,
    Notch,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OscillatorDescriptor {
    pub waveform: Waveform,
    pub detune_cents: f32,
    pub gain: f32,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeDescriptor {
    pub attack_ms: f32,
    pub decay_ms: f32,
    pub sustain_level: f32,
    pub release_ms: f32,
}

impl EnvelopeDescriptor {
    pub fn release_seconds(&self) -> f64 {
        self.release_ms as f64 / 1000.0
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterDescriptor {
    pub filter_type: FilterType,
    pub cutoff_hz: f32,
    pub resonance: f32,
}

/// The engine's live settings. Exposed by value: callers read the whole
/// object, change a field and write it back.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentSettings {
    pub oscillators: Vec<OscillatorDescriptor>,
    pub envelope: EnvelopeDescriptor,
    pub filter: FilterDescriptor,
    /// Linear output gain, 0..=1
    pub master_volume: f32,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    pub name: String,
    pub description: Option<String>,
    pub settings: InstrumentSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no patch named {0:?} in the library")]
pub struct UnknownPatch(pub String);

/// Ordered patch collection with one selected entry.
#[derive(Debug, Clone)]
pub struct PatchLibrary {
    patches: Vec<Patch>,
    selected: usize,
}

impl PatchLibrary {
    /// Returns `None` for an empty list; a library always has a selection.
    pub fn new(patches: Vec<Patch>) -> Option<Self> {
        (!patches.is_empty()).then_some(Self { patches, selected: 0 })
    }

    /// The built-in patches.
    pub fn factory() -> Self {
        Self {
            patches: factory_patches(),
            selected: 0,
        }
    }

    pub fn list_names(&self) -> Vec<&str> {
        self.patches.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Select by name. An unknown name leaves the selection as it was.
    pub fn select(&mut self, name: &str) -> Result<&Patch, UnknownPatch> {
        let index = self
            .patches
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| UnknownPatch(name.to_string()))?;
        self.selected = index;
        Ok(&self.patches[index])
    }

    /// Select by position in `list_names`, clamped to the last patch.
    pub fn select_index(&mut self, index: usize) -> &Patch {
        self.selected = index.min(self.patches.len() - 1);
        &self.patches[self.selected]
    }

    pub fn selected(&self) -> &Patch {
        &self.patches[self.selected]
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }
}

fn osc(waveform: Waveform, detune_cents: f32, gain: f32) -> OscillatorDescriptor {
    OscillatorDescriptor {
        waveform,
        detune_cents,
        gain,
    }
}

fn env(attack_ms: f32, decay_ms: f32, sustain_level: f32, release_ms: f32) -> EnvelopeDescriptor {
    EnvelopeDescriptor {
        attack_ms,
        decay_ms,
        sustain_level,
        release_ms,
    }
}

fn lowpass(cutoff_hz: f32, resonance: f32) -> FilterDescriptor {
    FilterDescriptor {
        filter_type: FilterType::LowPass,
        cutoff_hz,
        resonance,
    }
}

fn patch(name: &str, description: &str, settings: InstrumentSettings) -> Patch {
    Patch {
        name: name.to_string(),
        description: Some(description.to_string()),
        settings,
    }
}

fn factory_patches() -> Vec<Patch> {
    vec![
        patch(
            "Init",
            "Single saw, filter open",
            InstrumentSettings {
                oscillators: vec![osc(Waveform::Sawtooth, 0.0, 1.0), osc(Waveform::Sawtooth, 0.0, 0.0)],
                envelope: env(5.0, 0.0, 1.0, 50.0),
                filter: lowpass(20_000.0, 0.0),
                master_volume: 0.8,
            },
        ),
        patch(
            "Brass",
            "Detuned saws with a slow filter",
            InstrumentSettings {
                oscillators: vec![osc(Waveform::Sawtooth, -7.0, 0.8), osc(Waveform::Sawtooth, 7.0, 0.8)],
                envelope: env(60.0, 300.0, 0.7, 200.0),
                filter: lowpass(2_400.0, 0.3),
                master_volume: 0.7,
            },
        ),
        patch(
            "Hollow Lead",
            "Square over triangle, bright and short",
            InstrumentSettings {
                oscillators: vec![osc(Waveform::Square, 0.0, 0.7), osc(Waveform::Triangle, 1_200.0, 0.4)],
                envelope: env(10.0, 150.0, 0.6, 120.0),
                filter: lowpass(4_000.0, 0.4),
                master_volume: 0.7,
            },
        ),
        patch(
            "Soft Pad",
            "Slow sines",
            InstrumentSettings {
                oscillators: vec![osc(Waveform::Sine, -4.0, 0.8), osc(Waveform::Triangle, 4.0, 0.6)],
                envelope: env(800.0, 500.0, 0.8, 1_500.0),
                filter: lowpass(1_800.0, 0.1),
                master_volume: 0.6,
            },
        ),
        patch(
            "Pluck Bass",
            "Saw and sub, tight envelope",
            InstrumentSettings {
                oscillators: vec![osc(Waveform::Sawtooth, 0.0, 0.9), osc(Waveform::Sine, -1_200.0, 0.7)],
                envelope: env(2.0, 180.0, 0.0, 80.0),
                filter: lowpass(900.0, 0.5),
                master_volume: 0.8,
            },
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_names_are_unique() {
        let library = PatchLibrary::factory();
        let mut names = library.list_names();
        let count = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), count);
        assert!(count >= 3);
    }

    #[test]
    fn select_by_name() {
        let mut library = PatchLibrary::factory();
        let patch = library.select("Soft Pad").unwrap();
        assert_eq!(patch.name, "Soft Pad");
        assert_eq!(library.selected().name, "Soft Pad");
    }

    #[test]
    fn unknown_name_keeps_selection() {
        let mut library = PatchLibrary::factory();
        library.select_index(2);
        assert_eq!(library.select("Nope"), Err(UnknownPatch("Nope".into())));
        assert_eq!(library.selected_index(), 2);
    }

    #[test]
    fn select_index_clamps() {
        let mut library = PatchLibrary::factory();
        let last = library.len() - 1;
        library.select_index(99);
        assert_eq!(library.selected_index(), last);
    }

    #[test]
    fn empty_library_is_rejected() {
        assert!(PatchLibrary::new(Vec::new()).is_none());
    }

    #[test]
    fn waveform_names() {
        assert_eq!(Waveform::from_name("triangle"), Some(Waveform::Triangle));
        assert_eq!(Waveform::from_name("noise"), None);
        assert_eq!(Waveform::names().len(), 4);
    }
}
