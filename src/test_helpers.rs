use crate::{error::Result, playback::Connection};
use midly::{
    num::{u15, u24, u28, u7},
    Format, Header, MetaMessage,
    MidiMessage::{NoteOff, NoteOn},
    Smf, Timing, TrackEvent,
    TrackEventKind::{self, Meta, Midi},
};
use std::{
    path::Path,
    sync::{Arc, Mutex},
};

pub const TICKS_PER_BEAT: u16 = 480;

pub fn note_on(channel: u8, key: u8) -> TrackEventKind<'static> {
    Midi {
        channel: channel.into(),
        message: NoteOn {
            key: u7::from(key),
            vel: u7::from(100),
        },
    }
}

pub fn note_off(channel: u8, key: u8) -> TrackEventKind<'static> {
    Midi {
        channel: channel.into(),
        message: NoteOff {
            key: u7::from(key),
            vel: u7::from(0),
        },
    }
}

/// Writes a single track MIDI file at 120 BPM and 480 ticks per beat. Events are given
/// with absolute tick positions and are sorted before writing.
pub fn write_midi_file(path: &Path, mut events: Vec<(u32, TrackEventKind<'static>)>) {
    events.sort_by_key(|(ticks, _)| *ticks);
    let mut track = vec![TrackEvent {
        delta: u28::from(0),
        kind: Meta(MetaMessage::Tempo(u24::from(500_000))),
    }];
    let mut previous = 0;
    for (ticks, kind) in events {
        track.push(TrackEvent {
            delta: u28::from(ticks - previous),
            kind,
        });
        previous = ticks;
    }
    track.push(TrackEvent {
        delta: u28::from(0),
        kind: Meta(MetaMessage::EndOfTrack),
    });
    let mut smf = Smf::new(Header {
        format: Format::SingleTrack,
        timing: Timing::Metrical(u15::from(TICKS_PER_BEAT)),
    });
    smf.tracks.push(track);
    smf.save(path).unwrap();
}

/// Writes a short song playing the given keys one after another, 20 ticks each
pub fn write_short_song(path: &Path, keys: &[u8]) {
    let events = keys
        .iter()
        .enumerate()
        .flat_map(|(i, key)| {
            let start = 20 * i as u32;
            [(start, note_on(0, *key)), (start + 20, note_off(0, *key))]
        })
        .collect();
    write_midi_file(path, events);
}

/// A MIDI output which just remembers everything sent to it
#[derive(Clone, Default)]
pub struct RecordingConnection {
    messages: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl RecordingConnection {
    pub fn messages(&self) -> Vec<Vec<u8>> {
        self.messages.lock().unwrap().clone()
    }

    /// Keys of all sent note on messages with a non-zero velocity
    pub fn played_keys(&self) -> Vec<u8> {
        self.messages()
            .iter()
            .filter_map(|message| match message[..] {
                [status, key, vel] if status & 0xf0 == 0x90 && vel > 0 => Some(key),
                _ => None,
            })
            .collect()
    }
}

impl Connection for RecordingConnection {
    fn send(&mut self, message: &[u8]) -> Result<()> {
        self.messages.lock().unwrap().push(message.to_vec());
        Ok(())
    }
}
