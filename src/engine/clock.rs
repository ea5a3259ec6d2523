/*
Transport
=========

The shared musical clock. It runs in context seconds (`now`) and, once
started, in transport ticks (`position`, `ppq` ticks per quarter note).

Two kinds of cue can be scheduled against it:

- repeat cues, keyed by transport tick: fire at `start_tick`,
  `start_tick + interval`, ... while the transport is started. Track steps
  use these.
- once cues, keyed by context seconds: fire once when the clock passes
  them, whether or not the transport is started. Deferred engine releases
  use these.

Nothing fires on its own. The owner calls `advance(seconds)` and dispatches
whatever comes back, in time order. `cancel` removes every cue, so nothing
scheduled before it can fire after it.

    start(0.1)      starts_at = now + 0.1, position = 0
    advance(dt)     fires cues in [now, now + dt), moves now and position
    stop()          position back to 0, repeat cues rewind
*/

use tracing::debug;

use crate::io::midi::MidiEvent;
use crate::synth::SynthId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Started,
}

/// What a scheduled callback should do when it fires.
#[derive(Debug, Clone, PartialEq)]
pub enum Cue {
    /// Play the next step of a song track
    Step { track: usize, generation: u64 },
    /// Send a wire message to a synth
    Deliver { synth: SynthId, event: MidiEvent },
}

/// A cue that came due.
#[derive(Debug, Clone, PartialEq)]
pub struct Fired {
    pub id: EventId,
    /// Context seconds the cue was scheduled for
    pub time: f64,
    /// Transport tick for repeat cues
    pub tick: Option<u64>,
    pub cue: Cue,
}

#[derive(Debug, Clone)]
struct Repeat {
    id: EventId,
    cue: Cue,
    interval: u64,
    start_tick: u64,
    next_tick: u64,
}

#[derive(Debug, Clone)]
struct Once {
    id: EventId,
    cue: Cue,
    at: f64,
}

#[derive(Debug, Clone)]
pub struct Transport {
    ppq: u32,
    bpm: f64,
    now: f64,
    state: TransportState,
    /// Context time of tick 0
    starts_at: f64,
    /// Tick position at `now` while started
    position: f64,
    /// Tempo changes re-anchor here so earlier ticks keep their times
    anchor_time: f64,
    anchor_tick: f64,
    repeats: Vec<Repeat>,
    once: Vec<Once>,
    next_id: u64,
}

impl Transport {
    pub const DEFAULT_BPM: f64 = 120.0;

    pub fn new(ppq: u32) -> Self {
        Self {
            ppq: ppq.max(1),
            bpm: Self::DEFAULT_BPM,
            now: 0.0,
            state: TransportState::Stopped,
            starts_at: 0.0,
            position: 0.0,
            anchor_time: 0.0,
            anchor_tick: 0.0,
            repeats: Vec::new(),
            once: Vec::new(),
            next_id: 0,
        }
    }

    pub fn ppq(&self) -> u32 {
        self.ppq
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Current context time in seconds.
    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    /// Transport position in ticks (0 while stopped).
    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn seconds_per_tick(&self) -> f64 {
        60.0 / (self.bpm * self.ppq as f64)
    }

    pub fn ticks_to_seconds(&self, ticks: u64) -> f64 {
        ticks as f64 * self.seconds_per_tick()
    }

    /// Change tempo. Ticks already passed keep their times.
    pub fn set_bpm(&mut self, bpm: f64) {
        if !(bpm.is_finite() && bpm > 0.0) {
            debug!(bpm, "ignoring invalid tempo");
            return;
        }
        if self.state == TransportState::Started && self.now > self.starts_at {
            self.anchor_time = self.now;
            self.anchor_tick = self.position;
        }
        self.bpm = bpm;
    }

    fn tick_at(&self, time: f64) -> f64 {
        if time <= self.anchor_time {
            return self.anchor_tick;
        }
        self.anchor_tick + (time - self.anchor_time) / self.seconds_per_tick()
    }

    fn time_of_tick(&self, tick: u64) -> f64 {
        self.anchor_time + (tick as f64 - self.anchor_tick) * self.seconds_per_tick()
    }

    /// Start the transport `offset` seconds from now.
    pub fn start(&mut self, offset: f64) {
        self.state = TransportState::Started;
        self.starts_at = self.now + offset.max(0.0);
        self.position = 0.0;
        self.anchor_time = self.starts_at;
        self.anchor_tick = 0.0;
        self.rewind_repeats();
        debug!(starts_at = self.starts_at, bpm = self.bpm, "transport started");
    }

    /// Stop and return to tick 0. Scheduled cues stay registered.
    pub fn stop(&mut self) {
        self.state = TransportState::Stopped;
        self.position = 0.0;
        self.rewind_repeats();
        debug!(now = self.now, "transport stopped");
    }

    fn rewind_repeats(&mut self) {
        for repeat in &mut self.repeats {
            repeat.next_tick = repeat.start_tick;
        }
    }

    /// Remove every scheduled cue.
    pub fn cancel(&mut self) {
        debug!(repeats = self.repeats.len(), once = self.once.len(), "transport cancel");
        self.repeats.clear();
        self.once.clear();
    }

    /// Remove one cue. Returns false if it was not scheduled.
    pub fn clear(&mut self, id: EventId) -> bool {
        let before = self.repeats.len() + self.once.len();
        self.repeats.retain(|r| r.id != id);
        self.once.retain(|o| o.id != id);
        before != self.repeats.len() + self.once.len()
    }

    fn next_id(&mut self) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Fire `cue` every `interval` ticks from `start_tick` while started.
    pub fn schedule_repeat(&mut self, cue: Cue, interval: u64, start_tick: u64) -> EventId {
        let id = self.next_id();
        self.repeats.push(Repeat {
            id,
            cue,
            interval: interval.max(1),
            start_tick,
            next_tick: start_tick,
        });
        id
    }

    /// Fire `cue` once when the clock reaches context time `at`.
    pub fn schedule_once(&mut self, cue: Cue, at: f64) -> EventId {
        let id = self.next_id();
        self.once.push(Once { id, cue, at });
        id
    }

    /// Remove all once cues and hand them back for immediate dispatch.
    pub fn drain_pending(&mut self) -> Vec<Fired> {
        let mut pending: Vec<Once> = std::mem::take(&mut self.once);
        pending.sort_by(|a, b| a.at.total_cmp(&b.at).then(a.id.cmp(&b.id)));
        pending
            .into_iter()
            .map(|o| Fired {
                id: o.id,
                time: self.now,
                tick: None,
                cue: o.cue,
            })
            .collect()
    }

    /// Cues currently registered, of both kinds.
    pub fn scheduled_count(&self) -> usize {
        self.repeats.len() + self.once.len()
    }

    pub fn repeat_count(&self) -> usize {
        self.repeats.len()
    }

    /// Repeat cues currently registered.
    pub fn repeat_cues(&self) -> impl Iterator<Item = &Cue> {
        self.repeats.iter().map(|r| &r.cue)
    }

    /// Move the clock forward and return every cue that came due, ordered by
    /// time (ties by scheduling order).
    pub fn advance(&mut self, seconds: f64) -> Vec<Fired> {
        let end = self.now + seconds.max(0.0);
        let mut fired = self.take_once_before(end);

        if self.state == TransportState::Started && end > self.starts_at {
            let to_tick = self.tick_at(end);
            let mut due = Vec::new();
            for repeat in &mut self.repeats {
                while (repeat.next_tick as f64) < to_tick {
                    due.push((repeat.id, repeat.next_tick, repeat.cue.clone()));
                    repeat.next_tick += repeat.interval;
                }
            }
            fired.extend(due.into_iter().map(|(id, tick, cue)| Fired {
                id,
                time: self.time_of_tick(tick),
                tick: Some(tick),
                cue,
            }));
            self.position = to_tick;
        }

        self.now = end;
        fired.sort_by(|a, b| a.time.total_cmp(&b.time).then(a.id.cmp(&b.id)));
        fired
    }

    /// Once cues whose time has already passed; for cues scheduled while
    /// dispatching an `advance`.
    pub fn take_due(&mut self) -> Vec<Fired> {
        let mut due = self.take_once_before(self.now);
        due.sort_by(|a, b| a.time.total_cmp(&b.time).then(a.id.cmp(&b.id)));
        due
    }

    fn take_once_before(&mut self, end: f64) -> Vec<Fired> {
        let (due, keep): (Vec<Once>, Vec<Once>) = std::mem::take(&mut self.once).into_iter().partition(|o| o.at < end);
        self.once = keep;
        due.into_iter()
            .map(|o| Fired {
                id: o.id,
                time: o.at,
                tick: None,
                cue: o.cue,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PPQ: u32 = 480;

    fn step(track: usize) -> Cue {
        Cue::Step { track, generation: 0 }
    }

    fn note_off(note: u8) -> Cue {
        Cue::Deliver {
            synth: SynthId::from("Viktor"),
            event: MidiEvent::note_off(note),
        }
    }

    fn steps(fired: &[Fired]) -> Vec<u64> {
        fired.iter().filter_map(|f| f.tick).collect()
    }

    #[test]
    fn repeats_wait_for_start() {
        let mut transport = Transport::new(PPQ);
        transport.schedule_repeat(step(0), 480, 0);
        assert!(transport.advance(1.0).is_empty());

        transport.start(0.1);
        // Just past tick 0
        let fired = transport.advance(0.15);
        assert_eq!(steps(&fired), vec![0]);
        assert!((fired[0].time - 1.1).abs() < 1e-9);
    }

    #[test]
    fn quarter_repeats_at_120_bpm() {
        let mut transport = Transport::new(PPQ);
        transport.schedule_repeat(step(0), 480, 0);
        transport.start(0.0);

        // Four quarters are 2s; stop mid-way through the fifth
        let fired = transport.advance(2.25);
        assert_eq!(steps(&fired), vec![0, 480, 960, 1440, 1920]);
        let times: Vec<f64> = fired.iter().map(|f| f.time).collect();
        for (i, t) in times.iter().enumerate() {
            assert!((t - 0.5 * i as f64).abs() < 1e-9);
        }
    }

    #[test]
    fn split_advances_do_not_repeat_ticks() {
        let mut transport = Transport::new(PPQ);
        transport.schedule_repeat(step(0), 240, 0);
        transport.start(0.0);

        let mut all = Vec::new();
        for _ in 0..9 {
            all.extend(steps(&transport.advance(0.1)));
        }
        // 0.9s at 120 bpm covers eighths at 0, .25, .5, .75
        assert_eq!(all, vec![0, 240, 480, 720]);
    }

    #[test]
    fn once_cues_fire_without_transport() {
        let mut transport = Transport::new(PPQ);
        transport.schedule_once(note_off(60), 0.3);
        assert!(transport.advance(0.2).is_empty());
        let fired = transport.advance(0.2);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].time, 0.3);
        assert_eq!(transport.scheduled_count(), 0);
    }

    #[test]
    fn fired_cues_are_time_ordered() {
        let mut transport = Transport::new(PPQ);
        transport.schedule_repeat(step(0), 480, 0);
        transport.schedule_once(note_off(60), 0.25);
        transport.start(0.0);

        let fired = transport.advance(0.75);
        let kinds: Vec<bool> = fired.iter().map(|f| matches!(f.cue, Cue::Step { .. })).collect();
        assert_eq!(kinds, vec![true, false, true]);
    }

    #[test]
    fn cancel_is_exhaustive() {
        let mut transport = Transport::new(PPQ);
        transport.schedule_repeat(step(0), 480, 0);
        transport.schedule_repeat(step(1), 240, 0);
        transport.schedule_once(note_off(60), 0.1);
        transport.start(0.0);
        transport.cancel();

        assert_eq!(transport.scheduled_count(), 0);
        assert!(transport.advance(5.0).is_empty());
    }

    #[test]
    fn clear_removes_one_cue() {
        let mut transport = Transport::new(PPQ);
        let a = transport.schedule_repeat(step(0), 480, 0);
        transport.schedule_repeat(step(1), 480, 0);
        assert!(transport.clear(a));
        assert!(!transport.clear(a));
        assert_eq!(transport.repeat_count(), 1);
    }

    #[test]
    fn stop_rewinds() {
        let mut transport = Transport::new(PPQ);
        transport.schedule_repeat(step(0), 480, 0);
        transport.start(0.0);
        transport.advance(1.1);
        transport.stop();
        assert_eq!(transport.position(), 0.0);
        assert!(transport.advance(1.0).is_empty());

        transport.start(0.0);
        let fired = transport.advance(0.1);
        assert_eq!(steps(&fired), vec![0]);
    }

    #[test]
    fn tempo_change_keeps_past_ticks() {
        let mut transport = Transport::new(PPQ);
        transport.schedule_repeat(step(0), 480, 0);
        transport.start(0.0);
        transport.advance(0.6); // ticks 0 and 480 (at 0.5s)
        transport.set_bpm(60.0);

        // 96 ticks passed at the old tempo, the other 384 take 0.8s at 60 bpm
        let fired = transport.advance(1.0);
        assert_eq!(steps(&fired), vec![960]);
        assert!((fired[0].time - 1.4).abs() < 1e-9);
    }

    #[test]
    fn drain_pending_empties_once_queue() {
        let mut transport = Transport::new(PPQ);
        transport.schedule_repeat(step(0), 480, 0);
        transport.schedule_once(note_off(62), 2.0);
        transport.schedule_once(note_off(60), 1.0);

        let drained = transport.drain_pending();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].cue, note_off(60));
        assert_eq!(transport.scheduled_count(), 1);
    }

    #[test]
    fn take_due_collects_late_cues() {
        let mut transport = Transport::new(PPQ);
        transport.advance(1.0);
        transport.schedule_once(note_off(60), 0.5);
        transport.schedule_once(note_off(61), 3.0);
        assert_eq!(transport.take_due().len(), 1);
        assert_eq!(transport.scheduled_count(), 1);
    }

    #[test]
    fn invalid_tempo_is_ignored() {
        let mut transport = Transport::new(PPQ);
        transport.set_bpm(0.0);
        transport.set_bpm(f64::NAN);
        assert_eq!(transport.bpm(), Transport::DEFAULT_BPM);
    }
}
