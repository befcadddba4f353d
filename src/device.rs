use crate::{
    error::{Error, Result},
    playback::Connection,
};
use midir::{MidiOutput, MidiOutputConnection, MidiOutputPort as Port};
use std::fmt;

const CLIENT_NAME: &str = "floppy-midi-player";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceSelector {
    Number(usize),
    NameSubstring(String),
}

impl fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceSelector::Number(number) => write!(f, "number {}", number),
            DeviceSelector::NameSubstring(name) => write!(f, "'{}'", name),
        }
    }
}

/// Picks the index of a port from the names of the available ports. Without a selector
/// the first port is used.
pub fn select_port(port_names: &[String], device: Option<&DeviceSelector>) -> Result<usize> {
    let Some(device) = device else {
        return if port_names.is_empty() {
            Err(Error::NoOutputPorts)
        } else {
            Ok(0)
        };
    };
    let matches = port_names
        .iter()
        .enumerate()
        .filter(|(i, name)| match device {
            DeviceSelector::NameSubstring(name_substring) => name.contains(name_substring),
            DeviceSelector::Number(number) => i == number,
        })
        .map(|(i, _)| i)
        .collect::<Vec<usize>>();
    match matches[..] {
        [] => Err(Error::NoMatchingPort(device.to_string())),
        [port_number] => Ok(port_number),
        _ => Err(Error::AmbiguousPort(device.to_string())),
    }
}

fn new_output() -> Result<MidiOutput> {
    MidiOutput::new(CLIENT_NAME).map_err(|err| Error::Midi(err.to_string()))
}

fn port_names(midi_output: &MidiOutput, ports: &[Port]) -> Vec<String> {
    ports
        .iter()
        .map(|port| {
            midi_output
                .port_name(port)
                .unwrap_or_else(|_| "<unknown>".to_string())
        })
        .collect()
}

pub fn list_output_ports() -> Result<Vec<String>> {
    let midi_output = new_output()?;
    Ok(port_names(&midi_output, &midi_output.ports()))
}

pub fn open_midi_output(device: Option<&DeviceSelector>) -> Result<MidiOutputConnection> {
    let midi_output = new_output()?;
    let ports = midi_output.ports();
    let names = port_names(&midi_output, &ports);
    let port_number = select_port(&names, device)?;
    log::info!(
        "Selecting MIDI output port {} {}",
        port_number,
        names[port_number]
    );
    midi_output
        .connect(&ports[port_number], CLIENT_NAME)
        .map_err(|err| Error::Midi(err.to_string()))
}

/// Something which can open a connection to play songs on
pub trait Connect {
    type Connection: Connection;

    fn connect(&mut self) -> Result<Self::Connection>;
}

/// A MIDI output port of the system
pub struct MidiOutputPort {
    device: Option<DeviceSelector>,
}

impl MidiOutputPort {
    pub fn new(device: Option<DeviceSelector>) -> Self {
        Self { device }
    }
}

impl Connect for MidiOutputPort {
    type Connection = MidiOutputConnection;

    fn connect(&mut self) -> Result<MidiOutputConnection> {
        open_midi_output(self.device.as_ref())
    }
}
