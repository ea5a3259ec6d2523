//! Songs: a tempo plus a set of tracks sharing one transport.

use super::pattern::slot::{note, note_vel, rest, sub};
use super::{notes::*, Duration, Pattern, TimeSignature, Track, TrackError, TrackTicks};
use crate::pattern;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SongError {
    #[error("song {song:?}: tempo must be a positive number of beats per minute, got {bpm}")]
    InvalidTempo { song: String, bpm: f64 },
    #[error(transparent)]
    Track(#[from] TrackError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    pub name: String,
    /// Quarter-note beats per minute
    pub bpm: f64,
    pub time_signature: TimeSignature,
    pub tracks: Vec<Track>,
}

impl Song {
    pub fn new(name: impl Into<String>, bpm: f64) -> Self {
        Self {
            name: name.into(),
            bpm,
            time_signature: TimeSignature::FOUR_FOUR,
            tracks: Vec::new(),
        }
    }

    pub fn time_signature(mut self, time_signature: TimeSignature) -> Self {
        self.time_signature = time_signature;
        self
    }

    pub fn track(mut self, track: Track) -> Self {
        self.tracks.push(track);
        self
    }

    /// Check the tempo and resolve every track against `ppq`, in track order.
    pub fn ticks(&self, ppq: u32) -> Result<Vec<TrackTicks>, SongError> {
        if !(self.bpm.is_finite() && self.bpm > 0.0) {
            return Err(SongError::InvalidTempo {
                song: self.name.clone(),
                bpm: self.bpm,
            });
        }
        Ok(self
            .tracks
            .iter()
            .map(|t| t.ticks(ppq))
            .collect::<Result<Vec<_>, _>>()?)
    }

    /// `n` bars in this song's meter.
    pub fn measures(&self, n: u32) -> Duration {
        self.time_signature.measures(n)
    }
}

/// The built-in demo: bass, kick, hi-hat and an engine line at 140 bpm.
///
/// Targets the default synth ids ("Tone Synth", "Tone MembraneSynth",
/// "Tone MetalSynth", "Viktor").
pub fn song1() -> Result<Song, TrackError> {
    let bar = TimeSignature::FOUR_FOUR.measures(1);

    let bass = Track::builder("bass", "Tone Synth", pattern![F1, F2, [F1, F2], [_, F2]])
        .loop_end(bar)
        .build()?;

    let kick = Track::builder("kick", "Tone MembraneSynth", Pattern::new(vec![note_vel(C4, 0.05)]))
        .loop_end(Duration::QUARTER)
        .build()?;

    // Accented then ghosted; the metal voice ignores pitch
    let hihat = Track::builder(
        "hihat",
        "Tone MetalSynth",
        Pattern::new(vec![note_vel(C4, 0.015), note_vel(C4, 0.008)]),
    )
    .subdivision(Duration::EIGHTH)
    .loop_end(Duration::QUARTER)
    .build()?;

    let lead = Track::builder(
        "viktor",
        "Viktor",
        Pattern::new(vec![note(F2), rest(), sub(vec![note(F3)]), rest()]),
    )
    .loop_end(bar)
    .velocity(0.3)
    .build()?;

    Ok(Song::new("Song 1", 140.0)
        .track(bass)
        .track(kick)
        .track(hihat)
        .track(lead))
}
