//! The audio context: the shared transport plus the output device it is
//! paced by. One session owns one context and hands it to whoever needs the
//! clock, so nothing looks it up globally.

use tracing::{debug, info};

use super::clock::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputState {
    /// Initial state; most platforms need a user action to leave it
    Suspended,
    Running,
    Closed,
}

/// The platform audio output.
pub trait OutputDevice {
    fn state(&self) -> OutputState;

    /// Request playback. Must not block: the device may still report
    /// `Suspended` when this returns.
    fn resume(&mut self);

    /// Release the device. Terminal.
    fn close(&mut self);
}

/// Output that goes nowhere. Resumes immediately; for tests and headless runs.
#[derive(Debug, Clone)]
pub struct NullOutput {
    state: OutputState,
}

impl Default for NullOutput {
    fn default() -> Self {
        Self {
            state: OutputState::Suspended,
        }
    }
}

impl OutputDevice for NullOutput {
    fn state(&self) -> OutputState {
        self.state
    }

    fn resume(&mut self) {
        if self.state == OutputState::Suspended {
            self.state = OutputState::Running;
        }
    }

    fn close(&mut self) {
        self.state = OutputState::Closed;
    }
}

pub struct AudioContext {
    transport: Transport,
    output: Box<dyn OutputDevice>,
}

impl AudioContext {
    pub fn new(ppq: u32, output: Box<dyn OutputDevice>) -> Self {
        Self {
            transport: Transport::new(ppq),
            output,
        }
    }

    /// Context on a `NullOutput`.
    pub fn offline(ppq: u32) -> Self {
        Self::new(ppq, Box::new(NullOutput::default()))
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut Transport {
        &mut self.transport
    }

    /// Context time in seconds.
    pub fn now(&self) -> f64 {
        self.transport.now()
    }

    pub fn state(&self) -> OutputState {
        self.output.state()
    }

    pub fn is_closed(&self) -> bool {
        self.output.state() == OutputState::Closed
    }

    /// Ask a suspended output to start. Returns true if a resume was requested.
    pub fn resume_if_suspended(&mut self) -> bool {
        match self.output.state() {
            OutputState::Suspended => {
                debug!("resuming audio output");
                self.output.resume();
                if self.output.state() == OutputState::Running {
                    info!("playback resumed");
                }
                true
            }
            OutputState::Running | OutputState::Closed => false,
        }
    }

    pub fn close(&mut self) {
        if !self.is_closed() {
            self.output.close();
            debug!("audio output closed");
        }
    }
}
