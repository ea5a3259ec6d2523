/// Status byte of a note-on message on channel 1.
pub const NOTE_ON: u8 = 0x90;
/// Status byte of a note-off message on channel 1.
pub const NOTE_OFF: u8 = 0x80;
/// Status byte of a control-change message on channel 1.
pub const CONTROL_CHANGE: u8 = 0xB0;
/// Controller number for "all notes off".
pub const ALL_NOTES_OFF: u8 = 123;

/// A channel message in the three-byte form the external engine's inlet
/// accepts: `{status, note, value}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8, velocity: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
}

impl MidiEvent {
    pub fn note_on(key: u8, velocity: u8) -> Self {
        MidiEvent::NoteOn {
            channel: 0,
            key: key & 0x7F,
            velocity: velocity & 0x7F,
        }
    }

    /// Note-off with value 0, which is what the engine expects.
    pub fn note_off(key: u8) -> Self {
        MidiEvent::NoteOff {
            channel: 0,
            key: key & 0x7F,
            velocity: 0,
        }
    }

    pub fn all_notes_off() -> Self {
        MidiEvent::ControlChange {
            channel: 0,
            controller: ALL_NOTES_OFF,
            value: 0,
        }
    }

    /// Encode as `[status, data1, data2]`.
    pub fn to_bytes(self) -> [u8; 3] {
        match self {
            MidiEvent::NoteOn {
                channel,
                key,
                velocity,
            } => [NOTE_ON | (channel & 0x0F), key, velocity],
            MidiEvent::NoteOff {
                channel,
                key,
                velocity,
            } => [NOTE_OFF | (channel & 0x0F), key, velocity],
            MidiEvent::ControlChange {
                channel,
                controller,
                value,
            } => [CONTROL_CHANGE | (channel & 0x0F), controller, value],
        }
    }

    /// Decode `[status, data1, data2]`. A note-on with velocity 0 is a
    /// note-off, as in running-status MIDI streams. Unsupported statuses
    /// yield `None`.
    pub fn from_bytes(bytes: [u8; 3]) -> Option<Self> {
        let [status, data1, data2] = bytes;
        let channel = status & 0x0F;
        let (key, value) = (data1 & 0x7F, data2 & 0x7F);
        match status & 0xF0 {
            NOTE_ON if value == 0 => Some(MidiEvent::NoteOff {
                channel,
                key,
                velocity: 0,
            }),
            NOTE_ON => Some(MidiEvent::NoteOn {
                channel,
                key,
                velocity: value,
            }),
            NOTE_OFF => Some(MidiEvent::NoteOff {
                channel,
                key,
                velocity: value,
            }),
            CONTROL_CHANGE => Some(MidiEvent::ControlChange {
                channel,
                controller: key,
                value,
            }),
            _ => None,
        }
    }
}
