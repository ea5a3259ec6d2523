//! Terminal player: keyboard notes, song transport, synth and patch cycling.

use std::io::Write;
use std::time::{Duration, Instant};

use color_eyre::eyre::{Result as EyreResult, WrapErr};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal;
use tracing::warn;

use tonebridge::runtime::{PlaybackSession, PlaybackState, SessionConfig, SessionError};
use tonebridge::sequencing::notes::*;
use tonebridge::synth::SynthId;

use super::output::{CpalOutput, FrameClock};

/// Keys are taps: each note is released this long after its press.
const TAP_LENGTH: Duration = Duration::from_millis(250);

const KEY_VELOCITY: f32 = 0.8;

/// Home row plays the white keys from C4, the row above the black keys.
fn key_note(key: char) -> Option<u8> {
    let note = match key {
        'a' => C4,
        'w' => Cs4,
        's' => D4,
        'e' => Ds4,
        'd' => E4,
        'f' => F4,
        't' => Fs4,
        'g' => G4,
        'y' => Gs4,
        'h' => A4,
        'u' => As4,
        'j' => B4,
        'k' => C5,
        'o' => Cs5,
        'l' => D5,
        _ => return None,
    };
    Some(note)
}

pub struct Player {
    config: SessionConfig,
}

impl Player {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    pub fn run(self) -> EyreResult<()> {
        let (output, clock) = CpalOutput::open()?;
        let session = PlaybackSession::with_output(self.config, Box::new(output))
            .wrap_err("failed to build the playback session")?;

        println!("=== tonebridge ===");
        println!("keys a..l play, space starts/stops the song");
        println!("tab cycles synths, p cycles patches, q quits");
        println!();

        terminal::enable_raw_mode().wrap_err("failed to enter raw mode")?;
        let result = Controls::new(session, clock).run();
        terminal::disable_raw_mode()?;
        println!();
        result
    }
}

struct Controls {
    session: PlaybackSession,
    clock: FrameClock,
    /// Notes waiting for their tap release
    held: Vec<(u8, Instant)>,
    quit: bool,
}

impl Controls {
    fn new(session: PlaybackSession, clock: FrameClock) -> Self {
        Self {
            session,
            clock,
            held: Vec::new(),
            quit: false,
        }
    }

    fn run(&mut self) -> EyreResult<()> {
        self.status(&format!("synth: {}", self.session.selected_synth()));
        while !self.quit {
            let elapsed = self.clock.elapsed();
            if elapsed > 0.0 {
                // A stale step is a scheduling bug: stop rather than play on
                self.session.advance(elapsed)?;
            }
            self.release_taps()?;

            // Handle keyboard input (non-blocking, ~60fps)
            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code)?;
                    }
                }
            }
        }
        self.session.shutdown();
        Ok(())
    }

    fn release_taps(&mut self) -> Result<(), SessionError> {
        let now = Instant::now();
        let (due, keep): (Vec<_>, Vec<_>) = self.held.drain(..).partition(|(_, at)| now >= *at);
        self.held = keep;
        for (note, _) in due {
            self.session.note_off(note)?;
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyCode) -> EyreResult<()> {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => self.quit = true,
            KeyCode::Char(' ') => self.toggle_song()?,
            KeyCode::Tab => self.next_synth(),
            KeyCode::Char('p') => self.next_patch(),
            KeyCode::Char(c) => {
                if let Some(note) = key_note(c) {
                    self.session.note_on(note, KEY_VELOCITY)?;
                    self.held.push((note, Instant::now() + TAP_LENGTH));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn toggle_song(&mut self) -> Result<(), SessionError> {
        match self.session.state() {
            PlaybackState::Running => {
                self.session.stop_song();
                self.status("song stopped");
            }
            PlaybackState::Stopped => {
                self.session.start_song()?;
                let message = format!("playing {} at {} bpm", self.session.song().name, self.session.song().bpm);
                self.status(&message);
            }
        }
        Ok(())
    }

    fn next_synth(&mut self) {
        let ids = self.session.synth_ids();
        let current = ids.iter().position(|id| *id == self.session.selected_synth()).unwrap_or(0);
        let next = ids[(current + 1) % ids.len()].clone();
        match self.session.select_synth(next.clone()) {
            Ok(()) => self.status(&format!("synth: {next}")),
            Err(err) => warn!(%err, "synth selection failed"),
        }
    }

    fn next_patch(&mut self) {
        let id: SynthId = self.session.selected_synth().clone();
        let Ok(names) = self.session.patch_names(&id) else {
            self.status(&format!("{id} has no patches"));
            return;
        };
        let current = self
            .session
            .parameters(&id)
            .ok()
            .and_then(|params| params.into_iter().find(|p| p.name() == "patch"))
            .and_then(|p| p.value.as_choice().map(str::to_string));
        let index = current
            .and_then(|name| names.iter().position(|n| *n == name))
            .map_or(0, |i| (i + 1) % names.len());
        match self.session.select_patch(&id, &names[index]) {
            Ok(()) => self.status(&format!("patch: {}", names[index])),
            Err(err) => warn!(%err, "patch change failed"),
        }
    }

    /// One line of output; raw mode needs the explicit carriage return.
    fn status(&self, line: &str) {
        print!("{line}\r\n");
        let _ = std::io::stdout().flush();
    }
}
