#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Free,      // Available for allocation
    Active,    // Key held
    Releasing, // Key released, release tail still sounding
}

/// One slot of the engine's voice pool.
#[derive(Debug, Clone)]
pub struct Voice {
    note: u8,
    velocity: u8,
    state: VoiceState,
    age: u64,
    released_at: Option<f64>,
}

impl Default for Voice {
    fn default() -> Self {
        Self::new()
    }
}

impl Voice {
    pub fn new() -> Self {
        Self {
            note: 0,
            velocity: 0,
            state: VoiceState::Free,
            age: 0,
            released_at: None,
        }
    }

    pub fn start(&mut self, note: u8, velocity: u8, age: u64) {
        self.note = note;
        self.velocity = velocity;
        self.state = VoiceState::Active;
        self.age = age;
        self.released_at = None;
    }

    pub fn release(&mut self, now: f64) {
        if self.state == VoiceState::Active {
            self.state = VoiceState::Releasing;
            self.released_at = Some(now);
        }
    }

    /// Free the voice once its release tail of `release` seconds is over.
    pub fn finish_release(&mut self, now: f64, release: f64) {
        if let (VoiceState::Releasing, Some(at)) = (self.state, self.released_at) {
            if now - at >= release {
                self.free();
            }
        }
    }

    pub fn is_free(&self) -> bool {
        self.state == VoiceState::Free
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, VoiceState::Active | VoiceState::Releasing)
    }

    pub fn free(&mut self) {
        self.state = VoiceState::Free;
        self.note = 0;
        self.velocity = 0;
        self.released_at = None;
    }

    pub fn note(&self) -> u8 {
        self.note
    }

    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    pub fn age(&self) -> u64 {
        self.age
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle() {
        let mut voice = Voice::new();
        assert!(voice.is_free());

        voice.start(60, 100, 1);
        assert_eq!(voice.state(), VoiceState::Active);

        voice.release(1.0);
        assert_eq!(voice.state(), VoiceState::Releasing);
        assert!(voice.is_active());

        voice.finish_release(1.1, 0.5);
        assert!(voice.is_active());
        voice.finish_release(1.5, 0.5);
        assert!(voice.is_free());
        assert_eq!(voice.note(), 0);
    }

    #[test]
    fn release_only_from_active() {
        let mut voice = Voice::new();
        voice.release(1.0);
        assert!(voice.is_free());
    }
}
