use crate::{
    error::{Error, Result},
    info::MidiInfo,
};
use midi_reader_writer::{midly_0_5::merge_tracks, ConvertTicksToMicroseconds};
use midly::{
    live::LiveEvent,
    num::u4,
    MidiMessage::{self, Controller, PitchBend, ProgramChange},
    Smf,
    TrackEventKind::{self, Midi},
};
use std::{collections::BTreeMap, path::Path, time::Duration};

/// Controllers from 120 up are channel mode messages and aren't part of the channel state
const FIRST_CHANNEL_MODE_CONTROLLER: u8 = 120;

/// A channel message at a given moment of a song
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimedMessage {
    pub time: Duration,
    pub channel: u4,
    pub message: MidiMessage,
}

impl TimedMessage {
    pub fn encode(&self) -> Vec<u8> {
        encode(self.channel, self.message)
    }
}

/// All channel messages of a song, merged from all tracks, in playing order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Timeline {
    events: Vec<TimedMessage>,
    length: Duration,
}

impl Timeline {
    pub fn from_events(events: &[(Duration, TrackEventKind)]) -> Self {
        let length = events
            .iter()
            .map(|(time, _)| *time)
            .max()
            .unwrap_or_default();
        let events = events
            .iter()
            .filter_map(|(time, event)| match *event {
                Midi { channel, message } => Some(TimedMessage {
                    time: *time,
                    channel,
                    message,
                }),
                _ => None,
            })
            .collect();
        Self { events, length }
    }

    pub fn events(&self) -> &[TimedMessage] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Time of the last event of the song, meta events included
    pub fn length(&self) -> Duration {
        self.length
    }

    /// Index of the first event to play when starting from `position`
    pub fn index_at(&self, position: Duration) -> usize {
        self.events.partition_point(|event| event.time < position)
    }

    /// Collects the channel state which was set up by the events before `index`, i.e.
    /// the last value of each controller, the last program change and the last pitch
    /// bend on every channel. Sending these after a jump makes the song continue with
    /// the right instruments.
    ///
    /// Controllers come before the program change of their channel so that a bank select
    /// applies to it.
    pub fn chase(&self, index: usize) -> Vec<(u4, MidiMessage)> {
        let mut state = BTreeMap::new();
        for event in &self.events[..index.min(self.events.len())] {
            let key = match event.message {
                Controller { controller, .. }
                    if controller.as_int() < FIRST_CHANNEL_MODE_CONTROLLER =>
                {
                    (0, controller.as_int())
                }
                ProgramChange { .. } => (1, 0),
                PitchBend { .. } => (2, 0),
                _ => continue,
            };
            state.insert((event.channel.as_int(), key), (event.channel, event.message));
        }
        state.into_values().collect()
    }
}

/// Encodes a channel message into the bytes sent to a MIDI output port
pub fn encode(channel: u4, message: MidiMessage) -> Vec<u8> {
    let mut buf = Vec::with_capacity(3);
    let _ = LiveEvent::Midi { channel, message }.write(&mut buf);
    buf
}

/// Merges all tracks of a parsed MIDI file into one list of events with their wall
/// clock times. Tempo changes on any track affect the timing of all tracks.
///
/// Returns `None` if the time division of the file isn't supported.
pub fn timed_events<'a>(smf: &Smf<'a>) -> Option<Vec<(Duration, TrackEventKind<'a>)>> {
    let mut ticks_to_microseconds = ConvertTicksToMicroseconds::try_from(smf.header).ok()?;
    Some(
        merge_tracks(&smf.tracks)
            .map(|(ticks, _track_index, event)| {
                let microseconds = ticks_to_microseconds.convert(ticks, &event);
                (Duration::from_micros(microseconds), event)
            })
            .collect(),
    )
}

/// Reads and parses a MIDI file into a playable timeline and a summary of its meta
/// information
pub fn load_midi_file(path: &Path) -> Result<(Timeline, MidiInfo)> {
    let data = std::fs::read(path).map_err(|source| Error::Io {
        path: path.to_owned(),
        source,
    })?;
    let smf = Smf::parse(&data).map_err(|source| Error::Parse {
        path: path.to_owned(),
        source,
    })?;
    let events = timed_events(&smf).ok_or_else(|| Error::UnsupportedTiming {
        path: path.to_owned(),
    })?;
    Ok((Timeline::from_events(&events), MidiInfo::from_events(&events)))
}
