use tonebridge::engine::Trigger;
use tonebridge::note::Pitch;
use tonebridge::pattern;
use tonebridge::runtime::{PlaybackSession, PlaybackState, SessionConfig, SessionError};
use tonebridge::sequencing::notes::*;
use tonebridge::sequencing::pattern::slot::alt;
use tonebridge::sequencing::{Duration, Pattern, Song, SongError, Track, TrackError};
use tonebridge::synth::{BackendKind, Control, Domain, ParamValue, SynthError, SynthId};

/// Seconds per quarter note at 120 bpm.
const QUARTER: f64 = 0.5;
const START_OFFSET: f64 = 0.1;

fn session() -> PlaybackSession {
    PlaybackSession::new(SessionConfig::default()).unwrap()
}

fn two_track_song() -> Song {
    let a = Track::builder("a", "Tone Synth", pattern![C1, C2])
        .loop_end(Duration::HALF)
        .build()
        .unwrap();
    let b = Track::builder("b", "Tone MembraneSynth", pattern![C4])
        .loop_end(Duration::QUARTER)
        .build()
        .unwrap();
    Song::new("two tracks", 120.0).track(a).track(b)
}

fn notes_of(triggers: &[Trigger], track: usize) -> Vec<u8> {
    triggers
        .iter()
        .filter(|t| t.track == track)
        .filter_map(|t| t.note.pitch.map(Pitch::to_midi))
        .collect()
}

/// Advance in callback-sized chunks, the way an output device would.
fn play(session: &mut PlaybackSession, seconds: f64) -> Vec<Trigger> {
    let chunk = 128.0 / 48_000.0;
    let mut played = Vec::new();
    let mut elapsed = 0.0;
    while elapsed + chunk <= seconds {
        played.extend(session.advance(chunk).unwrap());
        elapsed += chunk;
    }
    played.extend(session.advance(seconds - elapsed).unwrap());
    played
}

#[test]
fn two_tracks_over_four_quarters() {
    let mut session = session();
    session.set_song(two_track_song());
    session.start_song().unwrap();

    // Tick 0 lands at START_OFFSET; stop just short of the fifth quarter
    let played = play(&mut session, START_OFFSET + 4.0 * QUARTER - 0.01);

    // Track A loops every two steps, so four quarters are two full cycles
    assert_eq!(notes_of(&played, 0), vec![C1, C2, C1, C2]);
    assert_eq!(notes_of(&played, 1), vec![C4; 4]);
}

#[test]
fn restart_keeps_one_schedule() {
    let mut session = session();
    session.set_song(two_track_song());
    session.start_song().unwrap();
    play(&mut session, 0.7);
    session.start_song().unwrap();
    session.start_song().unwrap();

    assert_eq!(session.context().transport().repeat_count(), 2);
    assert_eq!(session.state(), PlaybackState::Running);

    // A doubled schedule would fire track B twice per quarter
    let played = play(&mut session, START_OFFSET + QUARTER - 0.01);
    assert_eq!(notes_of(&played, 1), vec![C4]);
    assert_eq!(notes_of(&played, 0), vec![C1]);
}

#[test]
fn nothing_fires_after_stop() {
    let mut session = session();
    session.start_song().unwrap();
    play(&mut session, 1.0);
    session.stop_song();
    assert!(play(&mut session, 3.0).is_empty());
    assert_eq!(session.context().transport().scheduled_count(), 0);
}

#[test]
fn shorter_loop_repeats_proportionally() {
    // Both tracks step every quarter; A loops every 3 steps, B every step
    let a = Track::builder("a", "Tone Synth", pattern![C2, E2, G2])
        .build()
        .unwrap();
    let b = Track::builder("b", "Tone MetalSynth", pattern![C4])
        .build()
        .unwrap();
    let mut session = session();
    session.set_song(Song::new("poly", 120.0).track(a).track(b));
    session.start_song().unwrap();

    // Five cycles of A: fifteen quarters
    let played = play(&mut session, START_OFFSET + 15.0 * QUARTER - 0.01);
    let a_steps = notes_of(&played, 0).len();
    let b_steps = notes_of(&played, 1).len();
    assert_eq!(a_steps, 15);
    assert_eq!(b_steps, 15);

    let a_cycles = notes_of(&played, 0).iter().filter(|&&n| n == C2).count();
    assert_eq!(a_cycles, 5);
    assert_eq!(b_steps / a_cycles, 3);
}

#[test]
fn eighth_and_dotted_quarter_loops() {
    // Hats every eighth looping each quarter against a line looping every
    // dotted quarter: 2 hats per quarter, 1 line step per quarter
    let hats = Track::builder("hats", "Tone MetalSynth", pattern![C4, C4])
        .subdivision(Duration::EIGHTH)
        .loop_end(Duration::QUARTER)
        .build()
        .unwrap();
    let line = Track::builder("line", "Tone Synth", pattern![F2, A2])
        .loop_end(Duration::DOTTED_QUARTER)
        .build()
        .unwrap();
    let mut session = session();
    session.set_song(Song::new("drift", 120.0).track(hats).track(line));
    session.start_song().unwrap();

    // Three quarters; the line's second step is cut short by its loop end
    // so it replays from the top every dotted quarter
    let played = play(&mut session, START_OFFSET + 3.0 * QUARTER - 0.01);
    assert_eq!(notes_of(&played, 0).len(), 6);
    assert_eq!(notes_of(&played, 1), vec![F2, A2, F2, A2]);
}

#[test]
fn unknown_synth_keeps_selection() {
    let mut session = session();
    session.select_synth("Tone MetalSynth").unwrap();
    let err = session.select_synth("Moog").unwrap_err();
    assert_eq!(err, SessionError::Synth(SynthError::UnknownSynthId(SynthId::from("Moog"))));
    assert_eq!(session.selected_synth().as_str(), "Tone MetalSynth");
}

#[test]
fn invalid_patch_keeps_previous_patch() {
    let mut session = session();
    let viktor = SynthId::from("Viktor");
    session.select_patch(&viktor, "Brass").unwrap();

    let err = session.select_patch(&viktor, "Not A Patch").unwrap_err();
    assert!(matches!(
        err,
        SessionError::Synth(SynthError::InvalidParameterValue { .. })
    ));
    let patch = session
        .parameters(&viktor)
        .unwrap()
        .into_iter()
        .find(|p| p.name() == "patch")
        .unwrap();
    assert_eq!(patch.value, ParamValue::Choice("Brass".to_string()));
    assert_eq!(patch.control(), Control::Discrete);
}

#[test]
fn range_parameters_clamp() {
    let mut session = session();
    let synth = SynthId::from("Tone Synth");
    let attack = session
        .parameters(&synth)
        .unwrap()
        .into_iter()
        .find(|p| p.name() == "envelope.attack")
        .unwrap();
    let Domain::Range { min, max } = attack.spec.domain else {
        panic!("envelope.attack should be a range");
    };

    for (input, expected) in [(min - 1.0, min), (max + 1.0, max), ((min + max) / 2.0, (min + max) / 2.0)] {
        let applied = session
            .set_parameter(&synth, "envelope.attack", ParamValue::Number(input))
            .unwrap();
        assert_eq!(applied, ParamValue::Number(expected));
        let read = session
            .parameters(&synth)
            .unwrap()
            .into_iter()
            .find(|p| p.name() == "envelope.attack")
            .unwrap();
        assert_eq!(read.value, ParamValue::Number(expected));
    }
}

#[test]
fn parameter_edits_do_not_interrupt_the_song() {
    let mut session = session();
    session.start_song().unwrap();
    play(&mut session, 0.5);

    let bad = session.set_parameter(&SynthId::from("Tone Synth"), "no.such.thing", ParamValue::Number(1.0));
    assert!(matches!(bad, Err(SessionError::Synth(SynthError::UnknownParameter { .. }))));
    assert_eq!(session.state(), PlaybackState::Running);
    assert!(!play(&mut session, 0.5).is_empty());
}

#[test]
fn every_backend_retriggers() {
    let mut session = session();
    let ids: Vec<SynthId> = session.synth_ids().into_iter().cloned().collect();
    for id in ids {
        session.select_synth(id.clone()).unwrap();
        session.note_on(A2, 1.0).unwrap();
        play(&mut session, 0.05);
        session.note_off(A2).unwrap();
        play(&mut session, 3.0);
        session.note_on(B2, 1.0).unwrap();
        play(&mut session, 0.05);
        assert!(session.registry().current().is_sounding(session.now()), "{id} did not retrigger");
    }
}

#[test]
fn custom_configuration() {
    let config = SessionConfig::new()
        .start_offset(0.0)
        .synth("drums", BackendKind::Membrane)
        .synth("keys", BackendKind::engine())
        .default_synth("keys");
    let mut session = PlaybackSession::new(config).unwrap();
    assert_eq!(session.selected_synth().as_str(), "keys");

    let kick = Track::builder("kick", "drums", pattern![C1]).build().unwrap();
    session.set_song(Song::new("beat", 120.0).track(kick));
    session.start_song().unwrap();
    assert_eq!(notes_of(&session.advance(0.01).unwrap(), 0), vec![C1]);
}

#[test]
fn unplayable_songs_fail_before_playback() {
    let mut session = session();
    let mut song = two_track_song();
    song.tracks[0].pattern = Pattern::new(vec![alt(vec![])]);
    session.set_song(song);
    let err = session.start_song().unwrap_err();
    assert!(matches!(err, SessionError::Song(SongError::Track(TrackError::EmptySlot { step: 0, .. }))));
    assert_eq!(session.state(), PlaybackState::Stopped);
    assert!(play(&mut session, 1.0).is_empty());

    let mut song = two_track_song();
    song.bpm = f64::NAN;
    session.set_song(song);
    assert!(matches!(
        session.start_song(),
        Err(SessionError::Song(SongError::InvalidTempo { .. }))
    ));
    assert_eq!(session.state(), PlaybackState::Stopped);
}
