//! The playback session: the one owner of the audio context, the synth
//! registry and the song scheduler, and the control surface callers use.
//!
//! Nothing here runs on its own. The caller feeds elapsed time through
//! `advance`, which fires due cues and dispatches them to the adapters.

use tracing::{debug, error, info, warn};

use super::config::SessionConfig;
use crate::engine::clock::{Cue, Fired};
use crate::engine::context::{AudioContext, NullOutput, OutputDevice, OutputState};
use crate::engine::scheduler::{ScheduleConflict, SongScheduler, Trigger};
use crate::io::midi::MidiEvent;
use crate::note::{NoteEvent, Pitch};
use crate::sequencing::{song1, Song, SongError, TrackError};
use crate::synth::{ParamValue, Parameter, SynthError, SynthId, SynthRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Running,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Synth(#[from] SynthError),
    #[error(transparent)]
    Track(#[from] TrackError),
    #[error(transparent)]
    Song(#[from] SongError),
    #[error(transparent)]
    Schedule(#[from] ScheduleConflict),
}

pub struct PlaybackSession {
    context: AudioContext,
    registry: SynthRegistry,
    scheduler: SongScheduler,
    song: Song,
    state: PlaybackState,
    start_offset: f64,
    lookahead: f64,
    torn_down: bool,
}

impl PlaybackSession {
    /// Session on a `NullOutput`, for tests and headless use.
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        Self::with_output(config, Box::new(NullOutput::default()))
    }

    pub fn with_output(config: SessionConfig, output: Box<dyn OutputDevice>) -> Result<Self, SessionError> {
        config.validate()?;
        let registry = SynthRegistry::from_configs(&config.synths, &config.default_synth)?;
        info!(
            synths = registry.len(),
            selected = %registry.selected_id(),
            ppq = config.ppq,
            "session created"
        );
        Ok(Self {
            context: AudioContext::new(config.ppq, output),
            registry,
            scheduler: SongScheduler::new(config.ppq),
            song: song1()?,
            state: PlaybackState::Stopped,
            start_offset: config.start_offset,
            lookahead: config.note_on_lookahead,
            torn_down: false,
        })
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn output_state(&self) -> OutputState {
        self.context.state()
    }

    /// Context time in seconds.
    pub fn now(&self) -> f64 {
        self.context.now()
    }

    pub fn context(&self) -> &AudioContext {
        &self.context
    }

    pub fn registry(&self) -> &SynthRegistry {
        &self.registry
    }

    pub fn song(&self) -> &Song {
        &self.song
    }

    /// Replace the song. Takes effect on the next `start_song`.
    pub fn set_song(&mut self, song: Song) {
        info!(song = %song.name, "song set");
        self.song = song;
    }

    fn ensure_alive(&self) -> Result<(), SynthError> {
        if self.torn_down || self.context.is_closed() {
            return Err(SynthError::BackendUnavailable("session has been shut down".to_string()));
        }
        Ok(())
    }

    /// Resume a suspended output. Never blocks; a no-op when already running.
    pub fn activate_audio_if_needed(&mut self) {
        if self.context.resume_if_suspended() {
            debug!(state = ?self.context.state(), "audio activation requested");
        }
    }

    /// Start `pitch` on the selected synth, slightly ahead of now.
    pub fn note_on(&mut self, pitch: impl Into<Pitch>, velocity: f32) -> Result<(), SessionError> {
        self.ensure_alive()?;
        self.activate_audio_if_needed();
        let at = self.context.now() + self.lookahead;
        let note = NoteEvent::new(pitch).with_velocity(velocity).at(at);
        debug!(synth = %self.registry.selected_id(), pitch = ?note.pitch, at, "note on");
        self.registry
            .current_mut()
            .trigger_attack(self.context.transport_mut(), note);
        Ok(())
    }

    /// Release `pitch` on the selected synth. Uses the same lookahead as
    /// `note_on` so a quick tap never releases before it attacks.
    pub fn note_off(&mut self, pitch: impl Into<Pitch>) -> Result<(), SessionError> {
        self.ensure_alive()?;
        let at = self.context.now() + self.lookahead;
        let pitch = pitch.into();
        debug!(synth = %self.registry.selected_id(), %pitch, at, "note off");
        self.registry
            .current_mut()
            .trigger_release(self.context.transport_mut(), Some(pitch), Some(at));
        Ok(())
    }

    /// (Re)start the current song from its first step. A running song is
    /// stopped first, so there is only ever one schedule.
    pub fn start_song(&mut self) -> Result<(), SessionError> {
        self.ensure_alive()?;
        self.activate_audio_if_needed();
        if self.state == PlaybackState::Running {
            self.stop_song();
        }

        if let Some(track) = self
            .song
            .tracks
            .iter()
            .find(|t| !self.registry.contains(&t.target))
        {
            warn!(track = %track.name, synth = %track.target, "song targets an unknown synth");
            return Err(SynthError::UnknownSynthId(track.target.clone()).into());
        }

        self.flush_pending();
        self.scheduler.load(self.context.transport_mut(), &self.song)?;
        self.context.transport_mut().start(self.start_offset);
        self.state = PlaybackState::Running;
        info!(song = %self.song.name, bpm = self.song.bpm, "song started");
        Ok(())
    }

    /// Stop the song. Deferred releases are sent right away; attacks the
    /// transport had not reached yet are dropped, and no step fires after
    /// this returns.
    pub fn stop_song(&mut self) {
        self.context.transport_mut().stop();
        self.flush_pending();
        self.scheduler.unload(self.context.transport_mut());
        if self.state == PlaybackState::Running {
            info!(song = %self.song.name, "song stopped");
        }
        self.state = PlaybackState::Stopped;
    }

    /// Send parked releases now instead of later. Parked attacks belong to
    /// steps that never sounded, so they are discarded.
    fn flush_pending(&mut self) {
        let pending = self.context.transport_mut().drain_pending();
        if !pending.is_empty() {
            debug!(count = pending.len(), "flushing deferred messages");
        }
        for fired in pending {
            match fired.cue {
                Cue::Deliver {
                    event: MidiEvent::NoteOn { key, .. },
                    synth,
                } => debug!(%synth, key, "discarding unplayed attack"),
                Cue::Deliver { synth, event } => self.deliver(&synth, event),
                Cue::Step { .. } => {}
            }
        }
    }

    fn deliver(&mut self, synth: &SynthId, event: MidiEvent) {
        match self.registry.get_mut(synth) {
            Ok(adapter) => adapter.deliver(event),
            Err(err) => warn!(%err, ?event, "dropping message"),
        }
    }

    pub fn select_synth(&mut self, id: impl Into<SynthId>) -> Result<(), SessionError> {
        Ok(self.registry.select(&id.into())?)
    }

    pub fn selected_synth(&self) -> &SynthId {
        self.registry.selected_id()
    }

    pub fn synth_ids(&self) -> Vec<&SynthId> {
        self.registry.ids()
    }

    pub fn parameters(&self, id: &SynthId) -> Result<Vec<Parameter>, SessionError> {
        Ok(self.registry.parameters(id)?)
    }

    /// Safe in any playback state; a rejection leaves the old value in place.
    pub fn set_parameter(&mut self, id: &SynthId, name: &str, value: ParamValue) -> Result<ParamValue, SessionError> {
        Ok(self.registry.set_parameter(id, name, value)?)
    }

    /// Patch names of synth `id`.
    pub fn patch_names(&self, id: &SynthId) -> Result<Vec<String>, SessionError> {
        self.registry.get(id)?.patch_names().ok_or_else(|| {
            SessionError::from(SynthError::UnknownParameter {
                name: "patch".to_string(),
            })
        })
    }

    pub fn select_patch(&mut self, id: &SynthId, name: &str) -> Result<(), SessionError> {
        self.set_parameter(id, "patch", ParamValue::from(name))?;
        Ok(())
    }

    /// Move the clock forward by `seconds`, play whatever came due, and
    /// return the song triggers that were played.
    pub fn advance(&mut self, seconds: f64) -> Result<Vec<Trigger>, SessionError> {
        let mut played = Vec::new();
        let fired = self.context.transport_mut().advance(seconds);
        self.dispatch(fired, &mut played)?;

        // Releases that already fell due while dispatching
        loop {
            let late = self.context.transport_mut().take_due();
            if late.is_empty() {
                break;
            }
            self.dispatch(late, &mut played)?;
        }

        self.registry.process(self.context.now());
        Ok(played)
    }

    fn dispatch(&mut self, fired: Vec<Fired>, played: &mut Vec<Trigger>) -> Result<(), ScheduleConflict> {
        for cue in fired {
            match &cue.cue {
                Cue::Step { .. } => {
                    let triggers = self
                        .scheduler
                        .on_step(&cue, self.context.transport())
                        .inspect_err(|err| error!(%err, "stale step cue fired"))?;
                    for trigger in triggers {
                        match self.registry.get_mut(&trigger.synth) {
                            Ok(adapter) => adapter.trigger_attack_release(
                                self.context.transport_mut(),
                                trigger.note,
                                trigger.duration,
                            ),
                            Err(err) => warn!(%err, track = trigger.track, "skipping step"),
                        }
                        played.push(trigger);
                    }
                }
                Cue::Deliver { synth, event } => self.deliver(synth, *event),
            }
        }
        Ok(())
    }

    /// Cancel everything, release every backend and close the output.
    /// Idempotent; also runs on drop.
    pub fn shutdown(&mut self) {
        if self.torn_down {
            return;
        }
        let transport = self.context.transport_mut();
        transport.cancel();
        transport.stop();
        self.scheduler.unload(self.context.transport_mut());
        self.registry.dispose_all();
        self.context.close();
        self.state = PlaybackState::Stopped;
        self.torn_down = true;
        info!("session shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.torn_down
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}
