use floppy_midi_player::{info::MidiInfo, playlist::list_midi_files};
use std::path::PathBuf;
use structopt::StructOpt;

/// Shows the length and meta information of MIDI files
#[derive(StructOpt)]
struct Cli {
    /// MIDI files, or directories to show all MIDI files of
    #[structopt(parse(from_os_str), required = true)]
    paths: Vec<PathBuf>,
}

fn main() {
    let args = Cli::from_args();
    let files = args.paths.into_iter().flat_map(|path| {
        if path.is_dir() {
            list_midi_files(&path)
        } else {
            vec![path]
        }
    });
    let mut failed = false;
    for file in files {
        match MidiInfo::load(&file) {
            Ok(info) => print!("== {}\n{}", file.display(), info),
            Err(err) => {
                eprintln!("Error: {}", err);
                failed = true;
            }
        }
    }
    if failed {
        std::process::exit(1);
    }
}
