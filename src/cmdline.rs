use crate::{device::DeviceSelector, player::Settings};
use std::{num::ParseIntError, path::PathBuf, time::Duration};

use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "floppy-midi-player",
    about = "Plays the MIDI files of a floppy disk",
    after_help = "KEYS:\n    space, 5           pause / resume\n    up, 8              next song\n    down, 2            previous song\n    left, 4, z         jump back\n    right, 6, x        jump forward\n    esc, delete        quit"
)]
pub struct Cli {
    /// Play from this directory instead of looking for a floppy drive
    #[structopt(short = "d", long = "drive", parse(from_os_str))]
    pub drive: Option<PathBuf>,
    #[structopt(
        short = "p",
        long = "play-device-num",
        conflicts_with = "play_device_name"
    )]
    pub play_device_num: Option<usize>,
    #[structopt(
        short = "P",
        long = "play-device-name",
        conflicts_with = "play_device_num"
    )]
    pub play_device_name: Option<String>,
    /// How far to jump when seeking, in milliseconds
    #[structopt(
        long = "seek-step",
        parse(try_from_str = parse_duration),
        default_value = "5000"
    )]
    pub seek_step: Duration,
    /// How long to wait before reading the drive again after the last song, in milliseconds
    #[structopt(
        long = "rescan-interval",
        parse(try_from_str = parse_duration),
        default_value = "2500"
    )]
    pub rescan_interval: Duration,
    /// List the MIDI output ports and exit
    #[structopt(long = "list-ports")]
    pub list_ports: bool,
    /// Also write the log to this file
    #[structopt(long = "log-file", parse(from_os_str))]
    pub log_file: Option<PathBuf>,
    /// Log debug messages
    #[structopt(short = "v", long = "verbose")]
    pub verbose: bool,
}

impl Cli {
    pub fn device(&self) -> Option<DeviceSelector> {
        match (self.play_device_num, &self.play_device_name) {
            (Some(play_device_num), _) => Some(DeviceSelector::Number(play_device_num)),
            (None, Some(play_device_name)) => {
                Some(DeviceSelector::NameSubstring(play_device_name.clone()))
            }
            (None, None) => None,
        }
    }

    pub fn settings(&self) -> Settings {
        Settings {
            seek_step: self.seek_step,
            rescan_interval: self.rescan_interval,
        }
    }
}

fn parse_duration(src: &str) -> Result<Duration, ParseIntError> {
    let millis = src.parse()?;
    Ok(Duration::from_millis(millis))
}

pub fn parse_args() -> Cli {
    Cli::from_args()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::from_iter_safe(std::iter::once("floppy-midi-player").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.drive, None);
        assert_eq!(cli.device(), None);
        assert_eq!(cli.settings(), Settings::default());
        assert!(!cli.list_ports);
        assert!(!cli.verbose);
    }

    #[test]
    fn all_options() {
        let cli = parse(&[
            "--drive",
            "/media/floppy",
            "-P",
            "FLUID",
            "--seek-step",
            "10000",
            "--rescan-interval",
            "1000",
            "--log-file",
            "player.log",
            "-v",
        ]);
        assert_eq!(cli.drive, Some(PathBuf::from("/media/floppy")));
        assert_eq!(
            cli.device(),
            Some(DeviceSelector::NameSubstring("FLUID".to_string()))
        );
        assert_eq!(cli.settings().seek_step, Duration::from_secs(10));
        assert_eq!(cli.settings().rescan_interval, Duration::from_secs(1));
        assert_eq!(cli.log_file, Some(PathBuf::from("player.log")));
        assert!(cli.verbose);
    }

    #[test]
    fn device_by_number() {
        let cli = parse(&["-p", "2"]);
        assert_eq!(cli.device(), Some(DeviceSelector::Number(2)));
    }

    #[test]
    fn device_number_and_name_conflict() {
        let result = Cli::from_iter_safe(["floppy-midi-player", "-p", "1", "-P", "FLUID"]);
        assert!(result.is_err());
    }

    #[test]
    fn invalid_seek_step() {
        let result = Cli::from_iter_safe(["floppy-midi-player", "--seek-step", "five"]);
        assert!(result.is_err());
    }
}
