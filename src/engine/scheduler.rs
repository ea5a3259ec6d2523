/*
Song scheduler
==============

Turns a song's tracks into repeat cues on the shared transport and turns
fired cues back into note triggers.

Every track gets exactly one repeat cue. Its interval is the track's grid,
the largest tick step that lands on every step start and on the loop
boundary. When it fires at transport tick `t`, the track is at pattern
position `loop_start + t % loop_len`; if that is a step start the step's
events are triggered, otherwise nothing happens.

    load(song)      cancel every cue, bump the generation, one cue per track
    on_step(fired)  Step cue -> the triggers for that step
    unload()        cancel every cue, bump the generation

Cues carry the generation they were scheduled under. A step cue from an
older generation means a cancelled callback survived, which is a logic
error and is reported as `ScheduleConflict`.
*/

use tracing::{debug, info};

use super::clock::{Cue, Fired, Transport};
use crate::note::NoteEvent;
use crate::sequencing::{Sequence, Song, SongError, Track, TrackError, TrackTicks};
use crate::synth::SynthId;

/// A step cue fired that does not belong to the loaded song.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("step cue for track {track} from generation {found} fired while generation {expected} is loaded")]
pub struct ScheduleConflict {
    pub track: usize,
    pub found: u64,
    pub expected: u64,
}

/// One note a fired step asks for.
#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    /// Index of the track in the song
    pub track: usize,
    pub synth: SynthId,
    /// Pitch, velocity and absolute start time
    pub note: NoteEvent,
    /// Seconds until release
    pub duration: f64,
}

struct LoadedTrack {
    track: Track,
    ticks: TrackTicks,
    /// Loop expansion and the cycle it was built for
    cached: Option<(u64, Sequence)>,
}

impl LoadedTrack {
    fn sequence(&mut self, ppq: u32, cycle: u64) -> Result<&Sequence, TrackError> {
        // Patterns without alternation expand the same on every cycle
        let key = if self.track.pattern.varies_by_cycle() { cycle } else { 0 };
        let sequence = match self.cached.take() {
            Some((cycle, sequence)) if cycle == key => sequence,
            _ => self.track.loop_sequence(ppq, key)?,
        };
        Ok(&self.cached.insert((key, sequence)).1)
    }
}

pub struct SongScheduler {
    ppq: u32,
    generation: u64,
    tracks: Vec<LoadedTrack>,
}

impl SongScheduler {
    pub fn new(ppq: u32) -> Self {
        Self {
            ppq,
            generation: 0,
            tracks: Vec::new(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_loaded(&self) -> bool {
        !self.tracks.is_empty()
    }

    /// Replace whatever was scheduled with `song`. Calling it twice leaves
    /// one cue per track, never two. Sets the transport tempo but does not
    /// start it. A song that fails to resolve leaves the old schedule alone.
    pub fn load(&mut self, transport: &mut Transport, song: &Song) -> Result<(), SongError> {
        let ticks = song.ticks(self.ppq)?;

        self.unload(transport);
        transport.set_bpm(song.bpm);

        let generation = self.generation;
        for (index, (track, ticks)) in song.tracks.iter().zip(ticks).enumerate() {
            transport.schedule_repeat(
                Cue::Step {
                    track: index,
                    generation,
                },
                ticks.grid,
                0,
            );
            debug!(track = %track.name, synth = %track.target, grid = ticks.grid, "track scheduled");
            self.tracks.push(LoadedTrack {
                track: track.clone(),
                ticks,
                cached: None,
            });
        }
        info!(song = %song.name, tracks = self.tracks.len(), bpm = song.bpm, "song loaded");
        Ok(())
    }

    /// Cancel every cue on the transport and forget the song.
    pub fn unload(&mut self, transport: &mut Transport) {
        transport.cancel();
        self.tracks.clear();
        self.generation += 1;
    }

    /// Resolve a fired step cue. Other cues yield no triggers.
    pub fn on_step(&mut self, fired: &Fired, transport: &Transport) -> Result<Vec<Trigger>, ScheduleConflict> {
        let Cue::Step { track, generation } = fired.cue else {
            return Ok(Vec::new());
        };
        if generation != self.generation || track >= self.tracks.len() {
            return Err(ScheduleConflict {
                track,
                found: generation,
                expected: self.generation,
            });
        }

        let ppq = self.ppq;
        let loaded = &mut self.tracks[track];
        let Some(at) = loaded.ticks.step_at(fired.tick.unwrap_or(0)) else {
            return Ok(Vec::new());
        };

        let velocity = loaded.track.velocity;
        let note_length = loaded.track.note_length.to_ticks(ppq);
        let synth = loaded.track.target.clone();
        // Validated on load, so expansion cannot fail here
        let Ok(sequence) = loaded.sequence(ppq, at.cycle) else {
            return Ok(Vec::new());
        };

        let triggers = sequence
            .step_events(at.step)
            .map(|event| {
                let offset = event.tick_offset.saturating_sub(at.position);
                let mut note = NoteEvent::new(event.note).at(fired.time + transport.ticks_to_seconds(offset));
                note.velocity = event.velocity.unwrap_or(velocity);
                Trigger {
                    track,
                    synth: synth.clone(),
                    note,
                    duration: transport.ticks_to_seconds(note_length.min(event.duration_ticks)),
                }
            })
            .collect();
        Ok(triggers)
    }
}
