/// Musical time span represented as a rational fraction of a whole note.
/// All operations preserve exact ratios, so loop points never drift.
///
/// Used for track subdivisions (`4n`, `8n`), note lengths, and loop points
/// (`loop_end = 1m` is `TimeSignature::measures(1)`).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Duration {
    /// Numerator: how many parts
    pub numerator: u32,
    /// Denominator: of what size (4 = quarter, 8 = eighth, etc.)
    pub denominator: u32,
}

impl Duration {
    /// No time at all; the usual `loop_start`.
    pub const ZERO: Duration = Duration {
        numerator: 0,
        denominator: 1,
    };
    pub const WHOLE: Duration = Duration {
        numerator: 1,
        denominator: 1,
    };
    pub const HALF: Duration = Duration {
        numerator: 1,
        denominator: 2,
    };
    pub const QUARTER: Duration = Duration {
        numerator: 1,
        denominator: 4,
    };
    pub const EIGHTH: Duration = Duration {
        numerator: 1,
        denominator: 8,
    };
    pub const SIXTEENTH: Duration = Duration {
        numerator: 1,
        denominator: 16,
    };

    pub const DOTTED_QUARTER: Duration = Duration::QUARTER.dotted();
    pub const EIGHTH_TRIPLET: Duration = Duration::EIGHTH.triplet();

    /// `n` whole notes over `d`, e.g. `Duration::new(3, 8)`.
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Duration {
            numerator,
            denominator,
        }
    }

    /// Apply a dot: multiply duration by 3/2
    pub const fn dotted(self) -> Self {
        Duration {
            numerator: self.numerator * 3,
            denominator: self.denominator * 2,
        }
    }

    /// Three notes in the time of two
    pub const fn triplet(self) -> Self {
        Duration {
            numerator: self.numerator * 2,
            denominator: self.denominator * 3,
        }
    }

    /// Repeat this span `n` times (`4n * 3` = dotted half).
    pub const fn times(self, n: u32) -> Self {
        Duration {
            numerator: self.numerator * n,
            denominator: self.denominator,
        }
        .reduce()
    }

    pub const fn is_zero(&self) -> bool {
        self.numerator == 0
    }

    /// Reduce the fraction to lowest terms using GCD
    pub const fn reduce(self) -> Self {
        if self.numerator == 0 {
            return Duration::ZERO;
        }
        let gcd = gcd(self.numerator as u64, self.denominator as u64) as u32;
        Duration {
            numerator: self.numerator / gcd,
            denominator: self.denominator / gcd,
        }
    }

    /// Convert this duration to integer ticks
    /// ppq = pulses per quarter note
    /// Formula: ticks = (numerator * 4 * ppq) / denominator
    pub fn to_ticks(&self, ppq: u32) -> u64 {
        (self.numerator as u64 * 4 * ppq as u64) / self.denominator as u64
    }

    /// Length in seconds at a tempo given in quarter-note beats per minute.
    pub fn to_seconds(&self, bpm: f64) -> f64 {
        let quarters = self.numerator as f64 * 4.0 / self.denominator as f64;
        quarters * 60.0 / bpm
    }

    /// Add two durations (finds common denominator)
    pub const fn add(self, other: Self) -> Self {
        Duration {
            numerator: self.numerator * other.denominator + other.numerator * self.denominator,
            denominator: self.denominator * other.denominator,
        }
        .reduce()
    }
}

/// Greatest common divisor (Euclidean algorithm).
/// Shared with the scheduler, which grids tracks on the gcd of their loop points.
pub const fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let temp = b;
        b = a % b;
        a = temp;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    const PPQ: u32 = 480;

    #[test]
    fn test_standard_durations_to_ticks() {
        assert_eq!(Duration::WHOLE.to_ticks(PPQ), 1920);
        assert_eq!(Duration::HALF.to_ticks(PPQ), 960);
        assert_eq!(Duration::QUARTER.to_ticks(PPQ), 480);
        assert_eq!(Duration::EIGHTH.to_ticks(PPQ), 240);
        assert_eq!(Duration::SIXTEENTH.to_ticks(PPQ), 120);
        assert_eq!(Duration::ZERO.to_ticks(PPQ), 0);
    }

    #[test]
    fn test_dotted_and_triplet() {
        assert_eq!(Duration::DOTTED_QUARTER.to_ticks(PPQ), 720);
        assert_eq!(Duration::EIGHTH_TRIPLET.to_ticks(PPQ), 160);
    }

    #[test]
    fn test_times() {
        assert_eq!(Duration::QUARTER.times(4), Duration::WHOLE);
        assert_eq!(Duration::EIGHTH.times(3).to_ticks(PPQ), 720);
        assert!(Duration::QUARTER.times(0).is_zero());
    }

    #[test]
    fn test_reduce() {
        assert_eq!(Duration::new(4, 8).reduce(), Duration::HALF);
        assert_eq!(Duration::new(6, 9).reduce(), Duration::new(2, 3));
        assert_eq!(Duration::new(0, 7).reduce(), Duration::ZERO);
    }

    #[test]
    fn test_to_seconds_at_song_tempo() {
        // 140 bpm: one quarter = 60/140 s
        let quarter = Duration::QUARTER.to_seconds(140.0);
        assert!((quarter - 60.0 / 140.0).abs() < 1e-12);

        // An eighth at 120 bpm is a quarter second
        assert!((Duration::EIGHTH.to_seconds(120.0) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_duration_addition() {
        let sum = Duration::QUARTER.add(Duration::EIGHTH);
        assert_eq!(sum, Duration::new(3, 8));
        assert_eq!(sum.to_ticks(PPQ), 720);
        assert_eq!(Duration::ZERO.add(Duration::QUARTER), Duration::QUARTER);
    }

    #[test]
    fn test_gcd() {
        assert_eq!(gcd(480, 1920), 480);
        assert_eq!(gcd(240, 480), 240);
        assert_eq!(gcd(0, 480), 480);
        assert_eq!(gcd(320, 480), 160);
    }
}
