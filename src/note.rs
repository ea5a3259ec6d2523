//! Note events: what gets triggered, how hard, and when.

use std::fmt;
use std::str::FromStr;

use crate::io::converter::{freq_to_midi, midi_note_to_freq, velocity_to_midi};
use crate::sequencing::notes::{note_name, parse_note};

/// Pitch of a note, either as a MIDI note number or a raw frequency.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pitch {
    Midi(u8),
    Hz(f32),
}

impl Pitch {
    /// Nearest MIDI note number (0..=127).
    pub fn to_midi(self) -> u8 {
        match self {
            Pitch::Midi(note) => note.min(127),
            Pitch::Hz(freq) => freq_to_midi(freq),
        }
    }

    pub fn to_frequency(self) -> f32 {
        match self {
            Pitch::Midi(note) => midi_note_to_freq(note),
            Pitch::Hz(freq) => freq,
        }
    }
}

impl From<u8> for Pitch {
    fn from(note: u8) -> Self {
        Pitch::Midi(note)
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pitch::Midi(note) => f.write_str(&note_name(*note)),
            Pitch::Hz(freq) => write!(f, "{freq}Hz"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a note name or frequency: {0:?}")]
pub struct ParsePitchError(pub String);

/// Parses note names (`"F1"`, `"C#4"`) and frequencies (`"440"`, `"440hz"`).
impl FromStr for Pitch {
    type Err = ParsePitchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(note) = parse_note(s) {
            return Ok(Pitch::Midi(note));
        }
        let trimmed = s.trim();
        let number = trimmed
            .strip_suffix("hz")
            .or_else(|| trimmed.strip_suffix("Hz"))
            .unwrap_or(trimmed);
        match number.trim().parse::<f32>() {
            Ok(freq) if freq.is_finite() && freq > 0.0 => Ok(Pitch::Hz(freq)),
            _ => Err(ParsePitchError(s.to_string())),
        }
    }
}

/// Note intensity in 0..=1. Out-of-range input is clamped; NaN becomes 0.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Velocity(f32);

impl Velocity {
    pub const FULL: Velocity = Velocity(1.0);
    pub const SILENT: Velocity = Velocity(0.0);

    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            Velocity(0.0)
        } else {
            Velocity(value.clamp(0.0, 1.0))
        }
    }

    pub fn get(self) -> f32 {
        self.0
    }

    /// Scaled to 0..=127 for MIDI-style consumers.
    pub fn to_midi(self) -> u8 {
        velocity_to_midi(self.0)
    }
}

impl Default for Velocity {
    fn default() -> Self {
        Velocity::FULL
    }
}

impl From<f32> for Velocity {
    fn from(value: f32) -> Self {
        Velocity::new(value)
    }
}

/// One trigger. `pitch: None` is silence for pitched voices; fixed-pitch
/// percussion ignores the pitch either way. `time: None` means "now".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEvent {
    pub pitch: Option<Pitch>,
    pub velocity: Velocity,
    pub time: Option<f64>,
}

impl NoteEvent {
    pub fn new(pitch: impl Into<Pitch>) -> Self {
        Self {
            pitch: Some(pitch.into()),
            velocity: Velocity::FULL,
            time: None,
        }
    }

    pub fn silence() -> Self {
        Self {
            pitch: None,
            velocity: Velocity::FULL,
            time: None,
        }
    }

    pub fn with_velocity(mut self, velocity: f32) -> Self {
        self.velocity = Velocity::new(velocity);
        self
    }

    pub fn at(mut self, time: f64) -> Self {
        self.time = Some(time);
        self
    }
}
