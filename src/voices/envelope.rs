//! Envelope and gate bookkeeping shared by the voice backends.
//!
//! Voices here never render samples. They keep a timeline of scheduled
//! attacks and releases and answer questions about it ("is anything
//! sounding at t?", "how loud?") with a linear ADSR model.

use crate::note::Velocity;

/// Attack, decay and release in seconds; sustain as a 0..=1 level.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adsr {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl Adsr {
    pub const fn new(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            attack,
            decay,
            sustain,
            release,
        }
    }

    /// Level `held` seconds after the attack with the gate still open.
    pub fn held_level(&self, held: f64) -> f32 {
        let held = held.max(0.0) as f32;
        if held < self.attack {
            return held / self.attack;
        }
        let decaying = held - self.attack;
        if decaying < self.decay {
            1.0 - (1.0 - self.sustain) * decaying / self.decay
        } else {
            self.sustain
        }
    }

    /// Level `held` seconds after the attack when the gate closed `released`
    /// seconds ago.
    pub fn released_level(&self, held: f64, released: f64) -> f32 {
        let start = self.held_level(held - released);
        let released = released.max(0.0) as f32;
        if released >= self.release {
            0.0
        } else {
            start * (1.0 - released / self.release)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum GateEvent {
    Attack {
        time: f64,
        frequency: Option<f32>,
        velocity: Velocity,
    },
    Release {
        time: f64,
    },
}

impl GateEvent {
    fn time(&self) -> f64 {
        match self {
            GateEvent::Attack { time, .. } | GateEvent::Release { time } => *time,
        }
    }
}

/// The note a monophonic gate is playing at some instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateState {
    pub attack_time: f64,
    pub release_time: Option<f64>,
    pub frequency: Option<f32>,
    pub velocity: Velocity,
}

/// Time-ordered attacks and releases of one monophonic voice.
///
/// A release closes whatever attack precedes it; a new attack retriggers
/// without waiting for the previous release.
#[derive(Debug, Clone, Default)]
pub struct Gate {
    events: Vec<GateEvent>,
}

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, event: GateEvent) {
        // After any event at the same instant, so attack-then-release at t keeps its order
        let index = self.events.partition_point(|e| e.time() <= event.time());
        self.events.insert(index, event);
    }

    pub fn attack(&mut self, time: f64, frequency: Option<f32>, velocity: Velocity) {
        self.insert(GateEvent::Attack {
            time,
            frequency,
            velocity,
        });
    }

    pub fn release(&mut self, time: f64) {
        self.insert(GateEvent::Release { time });
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of attacks scheduled so far (past or future).
    pub fn attack_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, GateEvent::Attack { .. }))
            .count()
    }

    /// The most recent attack at or before `at`, with the first release that
    /// follows it (if that release is also at or before `at`).
    pub fn state_at(&self, at: f64) -> Option<GateState> {
        let upto = self.events.partition_point(|e| e.time() <= at);
        let past = &self.events[..upto];

        let attack_index = past.iter().rposition(|e| matches!(e, GateEvent::Attack { .. }))?;
        let GateEvent::Attack {
            time,
            frequency,
            velocity,
        } = past[attack_index]
        else {
            return None;
        };
        let release_time = past[attack_index + 1..].iter().map(GateEvent::time).next();

        Some(GateState {
            attack_time: time,
            release_time,
            frequency,
            velocity,
        })
    }

    /// Envelope level at `at`, scaled by velocity.
    pub fn level_at(&self, at: f64, envelope: &Adsr) -> f32 {
        let Some(state) = self.state_at(at) else {
            return 0.0;
        };
        let held = at - state.attack_time;
        let level = match state.release_time {
            Some(release) => envelope.released_level(held, at - release),
            None => envelope.held_level(held),
        };
        level * state.velocity.get()
    }

    pub fn is_sounding(&self, at: f64, envelope: &Adsr) -> bool {
        let Some(state) = self.state_at(at) else {
            return false;
        };
        let held = at - state.attack_time;
        let level = match state.release_time {
            Some(release) => envelope.released_level(held, at - release),
            None => envelope.held_level(held),
        };
        // Zero attack still counts as sounding on the attack instant
        level > 0.0 || (held == 0.0 && state.release_time.is_none())
    }

    /// Drop history that can no longer affect anything at or after `now`:
    /// everything before the last attack at or before `now`.
    pub fn prune(&mut self, now: f64) {
        let upto = self.events.partition_point(|e| e.time() <= now);
        if let Some(keep_from) = self.events[..upto]
            .iter()
            .rposition(|e| matches!(e, GateEvent::Attack { .. }))
        {
            self.events.drain(..keep_from);
        } else {
            // Only stray releases in the past
            self.events.drain(..upto);
        }
    }
}
