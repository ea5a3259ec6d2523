use super::duration::Duration;

/// Time signature of a song. Only its bar length matters to the transport:
/// loop points written in measures (`"1m"`) resolve through it.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSignature {
    /// Number of beats per bar
    pub numerator: u8,
    /// Note value that gets one beat (4 = quarter, 8 = eighth)
    pub denominator: u8,
}

impl TimeSignature {
    pub const FOUR_FOUR: TimeSignature = TimeSignature::new(4, 4);
    pub const THREE_FOUR: TimeSignature = TimeSignature::new(3, 4);
    pub const SIX_EIGHT: TimeSignature = TimeSignature::new(6, 8);

    pub const fn new(numerator: u8, denominator: u8) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// One bar as a note-value fraction.
    pub const fn bar(&self) -> Duration {
        Duration::new(self.numerator as u32, self.denominator as u32).reduce()
    }

    /// `n` bars, e.g. `measures(1)` for Tone-style `"1m"`.
    pub const fn measures(&self, n: u32) -> Duration {
        self.bar().times(n)
    }

    /// One bar in ticks
    /// Formula: (numerator * 4 * ppq) / denominator
    pub fn bar_ticks(&self, ppq: u32) -> u64 {
        self.bar().to_ticks(ppq)
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::FOUR_FOUR
    }
}
