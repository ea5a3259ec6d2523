/*
Note Names
==========

Readable names for MIDI note numbers plus a parser for scientific pitch
notation, which is how songs and callers usually spell notes ("F1", "C#4",
"Bb2").

Middle C (C4) = MIDI 60, A4 = MIDI 69 = 440 Hz.

    note_number = 12 * (octave + 1) + semitone

Constants cover octaves 0-6 with sharps; flats parse fine through `parse_note`.
*/

#![allow(non_upper_case_globals)]

// Octave 0
pub const C0: u8 = 12;
pub const Cs0: u8 = 13;
pub const D0: u8 = 14;
pub const Ds0: u8 = 15;
pub const E0: u8 = 16;
pub const F0: u8 = 17;
pub const Fs0: u8 = 18;
pub const G0: u8 = 19;
pub const Gs0: u8 = 20;
pub const A0: u8 = 21;
pub const As0: u8 = 22;
pub const B0: u8 = 23;

// Octave 1
pub const C1: u8 = 24;
pub const Cs1: u8 = 25;
pub const D1: u8 = 26;
pub const Ds1: u8 = 27;
pub const E1: u8 = 28;
pub const F1: u8 = 29;
pub const Fs1: u8 = 30;
pub const G1: u8 = 31;
pub const Gs1: u8 = 32;
pub const A1: u8 = 33;
pub const As1: u8 = 34;
pub const B1: u8 = 35;

// Octave 2
pub const C2: u8 = 36;
pub const Cs2: u8 = 37;
pub const D2: u8 = 38;
pub const Ds2: u8 = 39;
pub const E2: u8 = 40;
pub const F2: u8 = 41;
pub const Fs2: u8 = 42;
pub const G2: u8 = 43;
pub const Gs2: u8 = 44;
pub const A2: u8 = 45;
pub const As2: u8 = 46;
pub const B2: u8 = 47;

// Octave 3
pub const C3: u8 = 48;
pub const Cs3: u8 = 49;
pub const D3: u8 = 50;
pub const Ds3: u8 = 51;
pub const E3: u8 = 52;
pub const F3: u8 = 53;
pub const Fs3: u8 = 54;
pub const G3: u8 = 55;
pub const Gs3: u8 = 56;
pub const A3: u8 = 57;
pub const As3: u8 = 58;
pub const B3: u8 = 59;

// Octave 4
pub const C4: u8 = 60;
pub const Cs4: u8 = 61;
pub const D4: u8 = 62;
pub const Ds4: u8 = 63;
pub const E4: u8 = 64;
pub const F4: u8 = 65;
pub const Fs4: u8 = 66;
pub const G4: u8 = 67;
pub const Gs4: u8 = 68;
pub const A4: u8 = 69;
pub const As4: u8 = 70;
pub const B4: u8 = 71;

// Octave 5
pub const C5: u8 = 72;
pub const Cs5: u8 = 73;
pub const D5: u8 = 74;
pub const Ds5: u8 = 75;
pub const E5: u8 = 76;
pub const F5: u8 = 77;
pub const Fs5: u8 = 78;
pub const G5: u8 = 79;
pub const Gs5: u8 = 80;
pub const A5: u8 = 81;
pub const As5: u8 = 82;
pub const B5: u8 = 83;

// Octave 6
pub const C6: u8 = 84;
pub const Cs6: u8 = 85;
pub const D6: u8 = 86;
pub const Ds6: u8 = 87;
pub const E6: u8 = 88;
pub const F6: u8 = 89;
pub const Fs6: u8 = 90;
pub const G6: u8 = 91;
pub const Gs6: u8 = 92;
pub const A6: u8 = 93;
pub const As6: u8 = 94;
pub const B6: u8 = 95;

const SHARP_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

/// Parse scientific pitch notation into a MIDI note number.
///
/// Accepts a letter (`A`-`G`, either case), any number of `#`/`s` or `b`
/// accidentals, and a signed octave. Returns `None` for malformed names and
/// for pitches outside 0..=127.
pub fn parse_note(name: &str) -> Option<u8> {
    let name = name.trim();
    let mut chars = name.chars();
    let semitone: i32 = match chars.next()?.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let rest = chars.as_str();
    let octave_start = rest
        .find(|c: char| c == '-' || c.is_ascii_digit())
        .unwrap_or(rest.len());
    let (accidentals, octave) = rest.split_at(octave_start);

    let mut shift = 0i32;
    for c in accidentals.chars() {
        match c {
            '#' | 's' => shift += 1,
            'b' => shift -= 1,
            _ => return None,
        }
    }

    let octave: i32 = octave.parse().ok()?;
    let note = 12 * (octave + 1) + semitone + shift;
    u8::try_from(note).ok().filter(|n| *n <= 127)
}

/// Name a MIDI note with sharps, e.g. 42 → "F#2".
pub fn note_name(note: u8) -> String {
    let octave = note as i32 / 12 - 1;
    format!("{}{}", SHARP_NAMES[(note % 12) as usize], octave)
}
