//! cpal output that paces the session clock.
//!
//! The stream writes silence; its only job is to report how many frames the
//! device consumed. Frame counts go through an rtrb ring to the control
//! thread, which turns them into clock time.

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{Consumer, RingBuffer};
use tracing::{error, warn};

use tonebridge::engine::{OutputDevice, OutputState};

/// Frame-count messages the ring can hold before the callback starts dropping.
const FRAME_RING_CAPACITY: usize = 1024;

pub struct CpalOutput {
    stream: Option<cpal::Stream>,
    state: OutputState,
}

/// Control-thread end of the frame ring.
pub struct FrameClock {
    frames_rx: Consumer<u32>,
    sample_rate: f64,
}

impl FrameClock {
    /// Seconds of audio played since the last call.
    pub fn elapsed(&mut self) -> f64 {
        let mut frames = 0u64;
        while let Ok(n) = self.frames_rx.pop() {
            frames += n as u64;
        }
        frames as f64 / self.sample_rate
    }
}

impl CpalOutput {
    /// Open the default device, paused.
    pub fn open() -> EyreResult<(Self, FrameClock)> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| eyre!("no default output device available"))?;
        let config = device
            .default_output_config()
            .wrap_err("failed to fetch default output config")?;

        let sample_rate = config.sample_rate().0 as f64;
        let channels = config.channels().max(1) as usize;
        let (mut frames_tx, frames_rx) = RingBuffer::<u32>::new(FRAME_RING_CAPACITY);

        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _| {
                data.fill(0.0);
                // A full ring means the control thread stalled; the clock
                // loses those frames
                let _ = frames_tx.push((data.len() / channels) as u32);
            },
            |err| error!(%err, "audio stream error"),
            None,
        )?;
        if let Err(err) = stream.pause() {
            warn!(%err, "could not pause new stream");
        }

        Ok((
            Self {
                stream: Some(stream),
                state: OutputState::Suspended,
            },
            FrameClock { frames_rx, sample_rate },
        ))
    }
}

impl OutputDevice for CpalOutput {
    fn state(&self) -> OutputState {
        self.state
    }

    fn resume(&mut self) {
        if self.state != OutputState::Suspended {
            return;
        }
        if let Some(stream) = &self.stream {
            match stream.play() {
                Ok(()) => self.state = OutputState::Running,
                Err(err) => warn!(%err, "audio output did not start"),
            }
        }
    }

    fn close(&mut self) {
        // Dropping the stream stops the callback
        self.stream = None;
        self.state = OutputState::Closed;
    }
}
