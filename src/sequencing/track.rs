use super::{duration::gcd, Duration, Pattern, Sequence, SlotFault};
use crate::note::Velocity;
use crate::synth::SynthId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackError {
    #[error("track {track:?}: subdivision must be longer than zero ticks")]
    ZeroSubdivision { track: String },
    #[error("track {track:?}: loop end ({end} ticks) must come after loop start ({start} ticks)")]
    EmptyLoop { track: String, start: u64, end: u64 },
    #[error("track {track:?}: {field} has a zero denominator")]
    ZeroDenominator { track: String, field: &'static str },
    #[error("track {track:?}: step {step} has an empty subdivision or alternation")]
    EmptySlot { track: String, step: usize },
    #[error("track {track:?}: step {step} has a note with weight 0")]
    ZeroWeight { track: String, step: usize },
}

/// One independently looping pattern aimed at one synth.
///
/// Each pattern step lasts one `subdivision`. The track plays pattern
/// positions `loop_start..loop_end` and then wraps, so two tracks with
/// different loop ends drift against each other.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub name: String,
    pub pattern: Pattern,
    pub subdivision: Duration,
    pub loop_start: Duration,
    pub loop_end: Duration,
    /// Length of each triggered note, capped to the slot it plays in
    pub note_length: Duration,
    /// Velocity for notes without their own
    pub velocity: Velocity,
    pub target: SynthId,
}

/// A track's timing resolved against a tick resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackTicks {
    pub subdivision: u64,
    pub loop_start: u64,
    pub loop_end: u64,
    /// Spacing of the track's repeat cue: the coarsest grid that still
    /// lands on every step and every wrap.
    pub grid: u64,
}

impl TrackTicks {
    pub fn loop_len(&self) -> u64 {
        self.loop_end - self.loop_start
    }

    /// Resolve `tick` (since the transport started) to a step, if one
    /// begins exactly there.
    pub fn step_at(&self, tick: u64) -> Option<StepPosition> {
        let loop_len = self.loop_len();
        let position = self.loop_start + tick % loop_len;
        (position % self.subdivision == 0).then(|| StepPosition {
            step: (position / self.subdivision) as usize,
            cycle: tick / loop_len,
            position,
        })
    }
}

/// Where a track is when one of its steps fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPosition {
    /// Index into the pattern
    pub step: usize,
    /// Completed loops of this track
    pub cycle: u64,
    /// Pattern position in ticks
    pub position: u64,
}

impl Track {
    /// Start building a track. Defaults: quarter-note steps, loop over the
    /// whole pattern, eighth-note notes, full velocity.
    pub fn builder(name: impl Into<String>, target: impl Into<SynthId>, pattern: Pattern) -> TrackBuilder {
        TrackBuilder {
            name: name.into(),
            target: target.into(),
            pattern,
            subdivision: Duration::QUARTER,
            loop_start: Duration::ZERO,
            loop_end: None,
            note_length: Duration::EIGHTH,
            velocity: Velocity::FULL,
        }
    }

    /// Resolve timing against `ppq` and check the pattern can be expanded.
    pub fn ticks(&self, ppq: u32) -> Result<TrackTicks, TrackError> {
        for (field, duration) in [
            ("subdivision", self.subdivision),
            ("loop start", self.loop_start),
            ("loop end", self.loop_end),
            ("note length", self.note_length),
        ] {
            if duration.denominator == 0 {
                return Err(TrackError::ZeroDenominator {
                    track: self.name.clone(),
                    field,
                });
            }
        }
        match self.pattern.fault() {
            Some((step, SlotFault::Empty)) => {
                return Err(TrackError::EmptySlot {
                    track: self.name.clone(),
                    step,
                })
            }
            Some((step, SlotFault::ZeroWeight)) => {
                return Err(TrackError::ZeroWeight {
                    track: self.name.clone(),
                    step,
                })
            }
            None => {}
        }

        let subdivision = self.subdivision.to_ticks(ppq);
        let loop_start = self.loop_start.to_ticks(ppq);
        let loop_end = self.loop_end.to_ticks(ppq);

        if subdivision == 0 {
            return Err(TrackError::ZeroSubdivision {
                track: self.name.clone(),
            });
        }
        if loop_end <= loop_start {
            return Err(TrackError::EmptyLoop {
                track: self.name.clone(),
                start: loop_start,
                end: loop_end,
            });
        }

        let grid = gcd(gcd(subdivision, loop_start), loop_end - loop_start);
        Ok(TrackTicks {
            subdivision,
            loop_start,
            loop_end,
            grid,
        })
    }

    /// Expand one pass through the loop window for loop `cycle`.
    pub fn loop_sequence(&self, ppq: u32, cycle: u64) -> Result<Sequence, TrackError> {
        let ticks = self.ticks(ppq)?;
        let first_step = ticks.loop_start.div_ceil(ticks.subdivision);

        let mut events = Vec::new();
        let mut step = first_step;
        while step * ticks.subdivision < ticks.loop_end {
            self.pattern.expand_step(
                step as usize,
                step * ticks.subdivision,
                ticks.subdivision,
                cycle,
                &mut events,
            );
            step += 1;
        }

        Ok(Sequence::new(events, ticks.loop_start, ticks.loop_end))
    }
}

pub struct TrackBuilder {
    name: String,
    target: SynthId,
    pattern: Pattern,
    subdivision: Duration,
    loop_start: Duration,
    loop_end: Option<Duration>,
    note_length: Duration,
    velocity: Velocity,
}

impl TrackBuilder {
    pub fn subdivision(mut self, subdivision: Duration) -> Self {
        self.subdivision = subdivision;
        self
    }

    pub fn loop_start(mut self, loop_start: Duration) -> Self {
        self.loop_start = loop_start;
        self
    }

    pub fn loop_end(mut self, loop_end: Duration) -> Self {
        self.loop_end = Some(loop_end);
        self
    }

    pub fn note_length(mut self, note_length: Duration) -> Self {
        self.note_length = note_length;
        self
    }

    pub fn velocity(mut self, velocity: f32) -> Self {
        self.velocity = Velocity::new(velocity);
        self
    }

    pub fn build(self) -> Result<Track, TrackError> {
        let loop_end = self
            .loop_end
            .unwrap_or_else(|| self.subdivision.times(self.pattern.len() as u32));

        let track = Track {
            name: self.name,
            pattern: self.pattern,
            subdivision: self.subdivision,
            loop_start: self.loop_start,
            loop_end,
            note_length: self.note_length,
            velocity: self.velocity,
            target: self.target,
        };
        // Any resolution catches a bad track; 480 is the session default
        track.ticks(480)?;
        Ok(track)
    }
}
