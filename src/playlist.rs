use std::path::{Path, PathBuf};

/// How playing a song ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Finished,
    Next,
    Previous,
    Quit,
}

/// Whether a file name looks like a MIDI file, i.e. has a `.mid` or `.midi` extension
/// (in any case) and something in front of it
pub fn is_midi_file_name(name: &str) -> bool {
    let name = name.to_lowercase();
    [".mid", ".midi"]
        .iter()
        .any(|extension| name.len() > extension.len() && name.ends_with(extension))
}

/// Lists the MIDI files in a directory, sorted by name. A missing or unreadable
/// directory, which is what an empty drive looks like, gives an empty list. Names which
/// aren't valid Unicode are listed too.
pub fn list_midi_files(dir: impl AsRef<Path>) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir.as_ref()) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            let name = path.file_name()?.to_string_lossy();
            if path.is_file() && is_midi_file_name(&name) {
                Some(path)
            } else {
                None
            }
        })
        .collect();
    files.sort();
    files
}

/// A diskette counts as changed when any of the files seen before is gone
pub fn disk_changed(previous: &[PathBuf], current: &[PathBuf]) -> bool {
    !previous.iter().all(|file| current.contains(file))
}

/// The MIDI files of a diskette and the one to play next
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Playlist {
    files: Vec<PathBuf>,
    position: usize,
}

impl Playlist {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self { files, position: 0 }
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// The file to play, or `None` once every file has been played
    pub fn current(&self) -> Option<&Path> {
        self.files.get(self.position).map(PathBuf::as_path)
    }

    /// Moves on according to how the current song ended. Going back from the first song
    /// plays it again.
    pub fn advance(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Finished | Outcome::Next => self.position += 1,
            Outcome::Previous => self.position = self.position.saturating_sub(1),
            Outcome::Quit => {}
        }
    }

    /// Takes a fresh listing of the drive into use if the diskette has been changed, and
    /// starts over from its first file. Returns whether that happened.
    pub fn refresh(&mut self, rescanned: Vec<PathBuf>) -> bool {
        if !disk_changed(&self.files, &rescanned) {
            return false;
        }
        self.files = rescanned;
        self.position = 0;
        true
    }
}
