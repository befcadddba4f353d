use crate::{
    error::Result,
    format_position,
    score::load_midi_file,
};
use midly::{MetaMessage, TrackEventKind};
use std::{collections::BTreeMap, fmt, path::Path, time::Duration};

const MAJOR_KEYS: [&str; 15] = [
    "Cb", "Gb", "Db", "Ab", "Eb", "Bb", "F", "C", "G", "D", "A", "E", "B", "F#", "C#",
];
const MINOR_KEYS: [&str; 15] = [
    "Ab", "Eb", "Bb", "F", "C", "G", "D", "A", "E", "B", "F#", "C#", "G#", "D#", "A#",
];

/// Kinds of meta information shown for a song, in display order
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum MetaField {
    TrackName,
    Copyright,
    Text,
    InstrumentName,
    Lyric,
    Marker,
    CuePoint,
    Tempo,
    TimeSignature,
    KeySignature,
}

impl MetaField {
    pub fn readable_name(&self) -> &'static str {
        match self {
            MetaField::TrackName => "Track Name",
            MetaField::Copyright => "Copyright Notice",
            MetaField::Text => "Text",
            MetaField::InstrumentName => "Instrument Name",
            MetaField::Lyric => "Lyrics",
            MetaField::Marker => "Marker",
            MetaField::CuePoint => "Cue Point",
            MetaField::Tempo => "Tempo",
            MetaField::TimeSignature => "Time Signature",
            MetaField::KeySignature => "Key Signature",
        }
    }

    fn separator(&self) -> &'static str {
        match self {
            // lyrics are stored syllable by syllable
            MetaField::Lyric => "",
            _ => "\n",
        }
    }
}

/// Length and meta information of a MIDI file
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MidiInfo {
    length: Duration,
    meta: BTreeMap<MetaField, Vec<String>>,
}

impl MidiInfo {
    pub fn load(path: &Path) -> Result<Self> {
        let (_, info) = load_midi_file(path)?;
        Ok(info)
    }

    pub fn from_events(events: &[(Duration, TrackEventKind)]) -> Self {
        let mut info = Self {
            length: events
                .iter()
                .map(|(time, _)| *time)
                .max()
                .unwrap_or_default(),
            meta: BTreeMap::new(),
        };
        for (_, event) in events {
            if let TrackEventKind::Meta(meta) = event {
                if let Some((field, value)) = describe_meta(meta) {
                    info.push(field, value);
                }
            }
        }
        info
    }

    fn push(&mut self, field: MetaField, value: String) {
        let values = self.meta.entry(field).or_default();
        if field == MetaField::Lyric || !values.contains(&value) {
            values.push(value);
        }
    }

    pub fn length(&self) -> Duration {
        self.length
    }

    pub fn get(&self, field: MetaField) -> Option<String> {
        self.meta
            .get(&field)
            .map(|values| values.join(field.separator()))
    }

    pub fn fields(&self) -> impl Iterator<Item = MetaField> + '_ {
        self.meta.keys().copied()
    }
}

impl fmt::Display for MidiInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Length: {}\n\n", format_position(self.length))?;
        for (field, values) in &self.meta {
            write!(
                f,
                "{}\n{}\n\n",
                field.readable_name(),
                values.join(field.separator())
            )?;
        }
        Ok(())
    }
}

fn text(bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(bytes).trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn describe_meta(meta: &MetaMessage) -> Option<(MetaField, String)> {
    match *meta {
        MetaMessage::TrackName(bytes) => Some((MetaField::TrackName, text(bytes)?)),
        MetaMessage::Copyright(bytes) => Some((MetaField::Copyright, text(bytes)?)),
        MetaMessage::Text(bytes) => Some((MetaField::Text, text(bytes)?)),
        MetaMessage::InstrumentName(bytes) => Some((MetaField::InstrumentName, text(bytes)?)),
        MetaMessage::Lyric(bytes) => {
            let lyric = String::from_utf8_lossy(bytes).to_string();
            if lyric.is_empty() {
                None
            } else {
                Some((MetaField::Lyric, lyric))
            }
        }
        MetaMessage::Marker(bytes) => Some((MetaField::Marker, text(bytes)?)),
        MetaMessage::CuePoint(bytes) => Some((MetaField::CuePoint, text(bytes)?)),
        MetaMessage::Tempo(microseconds_per_beat) => Some((
            MetaField::Tempo,
            tempo_to_bpm(microseconds_per_beat.as_int()),
        )),
        MetaMessage::TimeSignature(numerator, denominator_power, _, _) => Some((
            MetaField::TimeSignature,
            format!("{}/{}", numerator, 1u32 << denominator_power.min(31)),
        )),
        MetaMessage::KeySignature(sharps, minor) => {
            Some((MetaField::KeySignature, key_signature_name(sharps, minor)))
        }
        _ => None,
    }
}

pub fn tempo_to_bpm(microseconds_per_beat: u32) -> String {
    if microseconds_per_beat == 0 {
        return "? BPM".to_string();
    }
    let bpm = 60_000_000.0 / microseconds_per_beat as f64;
    if (bpm - bpm.round()).abs() < 0.005 {
        format!("{:.0} BPM", bpm)
    } else {
        format!("{:.2} BPM", bpm)
    }
}

/// Names a key signature given as the number of sharps (positive) or flats (negative)
pub fn key_signature_name(sharps: i8, minor: bool) -> String {
    let names = if minor { &MINOR_KEYS } else { &MAJOR_KEYS };
    let mode = if minor { "minor" } else { "major" };
    match usize::try_from(sharps as i16 + 7)
        .ok()
        .and_then(|index| names.get(index))
    {
        Some(name) => format!("{} {}", name, mode),
        None => format!("{} sharps ({})", sharps, mode),
    }
}
