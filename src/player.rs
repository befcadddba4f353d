use crate::{
    controls::Action,
    device::Connect,
    format_position,
    playback::Playback,
    playlist::{list_midi_files, Outcome, Playlist},
    score::load_midi_file,
};
use anyhow::Result;
use crossbeam_channel::{select, Receiver, RecvTimeoutError};
use std::{
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settings {
    /// How far the seek keys jump
    pub seek_step: Duration,
    /// How long to wait before reading the drive again once all songs have been played
    pub rescan_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            seek_step: Duration::from_secs(5),
            rescan_interval: Duration::from_millis(2500),
        }
    }
}

/// Plays the MIDI files of a drive one after another, forever, reacting to the user's
/// actions and to diskettes being swapped.
pub struct Player<O: Connect> {
    drive: PathBuf,
    output: O,
    connection: Option<O::Connection>,
    actions: Receiver<Action>,
    settings: Settings,
}

impl<O: Connect> Player<O> {
    pub fn new(drive: PathBuf, output: O, actions: Receiver<Action>, settings: Settings) -> Self {
        Self {
            drive,
            output,
            connection: None,
            actions,
            settings,
        }
    }

    /// Runs until the user quits. Fails only if the MIDI output can't be opened at all.
    pub fn run(&mut self) -> Result<()> {
        let connection = self.take_connection()?;
        self.connection = Some(connection);
        loop {
            let mut playlist = Playlist::new(list_midi_files(&self.drive));
            log::debug!(
                "Found {} Midi files in {}",
                playlist.files().len(),
                self.drive.display()
            );
            while let Some(file) = playlist.current().map(Path::to_path_buf) {
                let outcome = self.play_file(&file);
                if outcome == Outcome::Quit {
                    return Ok(());
                }
                playlist.advance(outcome);
                if playlist.refresh(list_midi_files(&self.drive)) {
                    log::info!("Diskette was changed");
                    log::debug!(
                        "Found the following Midi files ({}): ",
                        playlist.files().len()
                    );
                    for file in playlist.files() {
                        log::debug!("{}", file_name(file));
                    }
                }
            }
            if self.wait_for_quit(self.settings.rescan_interval) {
                return Ok(());
            }
        }
    }

    /// Plays one file until it ends or the user moves elsewhere. A file which can't be
    /// played counts as finished.
    pub fn play_file(&mut self, path: &Path) -> Outcome {
        log::info!("Playing: {}", path.display());
        match self.play(path) {
            Ok(outcome) => outcome,
            Err(err) => {
                log::error!(
                    "Exception while attempting to play Midi file :: {} :: {:#}",
                    path.display(),
                    err
                );
                Outcome::Finished
            }
        }
    }

    fn play(&mut self, path: &Path) -> Result<Outcome> {
        let (timeline, info) = load_midi_file(path)?;
        log::info!("{}", info);
        let playback = Playback::start(timeline, self.take_connection()?);
        let outcome = self.control(&playback);
        // a lost connection is opened again for the next song
        match playback.finish() {
            Ok(connection) => self.connection = Some(connection),
            Err(err) => log::error!("MIDI output failed: {:#}", err),
        }
        Ok(outcome)
    }

    fn take_connection(&mut self) -> Result<O::Connection> {
        match self.connection.take() {
            Some(connection) => Ok(connection),
            None => Ok(self.output.connect()?),
        }
    }

    fn control(&self, playback: &Playback<O::Connection>) -> Outcome {
        let done = playback.done();
        loop {
            select! {
                recv(done) -> _ => return Outcome::Finished,
                recv(self.actions) -> action => match action {
                    Ok(action) => {
                        if let Some(outcome) = self.apply(playback, action) {
                            return outcome;
                        }
                    }
                    Err(_) => {
                        // nobody can interrupt the song anymore
                        let _ = done.recv();
                        return Outcome::Finished;
                    }
                },
            }
        }
    }

    fn apply(&self, playback: &Playback<O::Connection>, action: Action) -> Option<Outcome> {
        match action {
            Action::TogglePause => {
                log::info!("Paused: {}", playback.toggle_pause());
                None
            }
            Action::Next => {
                playback.stop();
                log::info!("Jumping to the next song");
                Some(Outcome::Next)
            }
            Action::Previous => {
                playback.stop();
                log::info!("Jumping to the previous song");
                Some(Outcome::Previous)
            }
            Action::SeekBackward => {
                let position = playback.seek_backward(self.settings.seek_step);
                log::info!("Navigated to: {}", format_position(position));
                None
            }
            Action::SeekForward => {
                let position = playback.seek_forward(self.settings.seek_step);
                log::info!("Navigated to: {}", format_position(position));
                None
            }
            Action::Quit => {
                playback.stop();
                log::info!("Shutting down, goodbye");
                Some(Outcome::Quit)
            }
        }
    }

    /// Waits for `duration` while nothing is playing. Returns whether the user quit.
    fn wait_for_quit(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            match self.actions.recv_deadline(deadline) {
                Ok(Action::Quit) => {
                    log::info!("Shutting down, goodbye");
                    return true;
                }
                Ok(action) => log::debug!("Nothing is playing, ignoring {:?}", action),
                Err(RecvTimeoutError::Timeout) => return false,
                Err(RecvTimeoutError::Disconnected) => {
                    thread::sleep(deadline.saturating_duration_since(Instant::now()));
                    return false;
                }
            }
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
