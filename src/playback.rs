use crate::{
    cleanup::silence,
    error::{Error, Result},
    score::{encode, Timeline},
};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use midir::MidiOutputConnection;
use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

/// Anything raw MIDI messages can be sent to
pub trait Connection: Send + 'static {
    fn send(&mut self, message: &[u8]) -> Result<()>;
}

impl Connection for MidiOutputConnection {
    fn send(&mut self, message: &[u8]) -> Result<()> {
        MidiOutputConnection::send(self, message).map_err(|err| Error::Midi(err.to_string()))
    }
}

/// Transport state of a song: where it is, whether it's moving, and whether it's been
/// told to stop.
///
/// All methods take the current moment as an argument, which keeps the arithmetic
/// independent of the wall clock.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Clock {
    length: Duration,
    /// song position at `resumed_at`, or the frozen position while paused
    offset: Duration,
    resumed_at: Option<Instant>,
    seeks: u64,
    stopped: bool,
}

impl Clock {
    /// A clock at the start of a song, paused
    pub fn new(length: Duration) -> Self {
        Self {
            length,
            offset: Duration::ZERO,
            resumed_at: None,
            seeks: 0,
            stopped: false,
        }
    }

    /// A clock at the start of a song, running since `now`
    pub fn started(length: Duration, now: Instant) -> Self {
        Self {
            resumed_at: Some(now),
            ..Self::new(length)
        }
    }

    pub fn length(&self) -> Duration {
        self.length
    }

    pub fn position_at(&self, now: Instant) -> Duration {
        match self.resumed_at {
            Some(resumed_at) => self.offset + now.saturating_duration_since(resumed_at),
            None => self.offset,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.resumed_at.is_none()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Number of jumps made so far. Lets the playback thread notice a jump even if it
    /// landed on the same position.
    pub fn seeks(&self) -> u64 {
        self.seeks
    }

    pub fn pause_at(&mut self, now: Instant) {
        if !self.is_paused() {
            self.offset = self.position_at(now);
            self.resumed_at = None;
        }
    }

    pub fn resume_at(&mut self, now: Instant) {
        if self.is_paused() {
            self.resumed_at = Some(now);
        }
    }

    /// Returns whether the clock is paused afterwards
    pub fn toggle_pause_at(&mut self, now: Instant) -> bool {
        if self.is_paused() {
            self.resume_at(now);
        } else {
            self.pause_at(now);
        }
        self.is_paused()
    }

    /// Jumps to `target`, or to the end of the song if `target` is beyond it. Returns
    /// the new position.
    pub fn seek_at(&mut self, target: Duration, now: Instant) -> Duration {
        self.offset = target.min(self.length);
        if !self.is_paused() {
            self.resumed_at = Some(now);
        }
        self.seeks += 1;
        self.offset
    }

    pub fn stop(&mut self) {
        self.stopped = true;
    }
}

fn lock(clock: &Mutex<Clock>) -> MutexGuard<'_, Clock> {
    clock.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A song being played on a separate thread.
///
/// The control loop changes the shared [`Clock`] and wakes the playback thread up, which
/// then catches up with the new transport state. [`Playback::done`] disconnects as soon
/// as the song has ended or has been stopped.
pub struct Playback<C: Connection> {
    clock: Arc<Mutex<Clock>>,
    wake: Sender<()>,
    done: Receiver<()>,
    thread: JoinHandle<Result<C>>,
}

impl<C: Connection> Playback<C> {
    pub fn start(timeline: Timeline, connection: C) -> Self {
        let clock = Arc::new(Mutex::new(Clock::started(
            timeline.length(),
            Instant::now(),
        )));
        let (wake, wake_rx) = bounded(1);
        let (done_tx, done) = bounded(0);
        let sequencer = Sequencer {
            timeline,
            clock: clock.clone(),
            wake: wake_rx,
            connection,
        };
        let thread = thread::spawn(move || {
            // dropping the sender tells the control loop that the song is over
            let _done = done_tx;
            sequencer.run()
        });
        Self {
            clock,
            wake,
            done,
            thread,
        }
    }

    fn clock(&self) -> MutexGuard<'_, Clock> {
        lock(&self.clock)
    }

    fn wake(&self) {
        // a pending wake-up is as good as a new one
        let _ = self.wake.try_send(());
    }

    pub fn position(&self) -> Duration {
        let clock = self.clock();
        clock.position_at(Instant::now()).min(clock.length())
    }

    pub fn is_paused(&self) -> bool {
        self.clock().is_paused()
    }

    /// Pauses a running song or resumes a paused one. Returns whether the song is now
    /// paused.
    pub fn toggle_pause(&self) -> bool {
        let paused = self.clock().toggle_pause_at(Instant::now());
        self.wake();
        paused
    }

    /// Jumps `step` forward, at most to the end of the song. Returns the new position.
    pub fn seek_forward(&self, step: Duration) -> Duration {
        self.seek(|position| position + step)
    }

    /// Jumps `step` back, at most to the start of the song. Returns the new position.
    pub fn seek_backward(&self, step: Duration) -> Duration {
        self.seek(|position| position.saturating_sub(step))
    }

    fn seek(&self, target: impl FnOnce(Duration) -> Duration) -> Duration {
        let now = Instant::now();
        let position = {
            let mut clock = self.clock();
            let current = clock.position_at(now).min(clock.length());
            clock.seek_at(target(current), now)
        };
        self.wake();
        position
    }

    pub fn stop(&self) {
        self.clock().stop();
        self.wake();
    }

    /// Disconnects when playback has ended
    pub fn done(&self) -> &Receiver<()> {
        &self.done
    }

    /// Stops the song if it's still playing and hands back the connection for the next one
    pub fn finish(self) -> Result<C> {
        self.stop();
        self.thread.join().map_err(|_| Error::PlaybackPanicked)?
    }
}

struct Sequencer<C: Connection> {
    timeline: Timeline,
    clock: Arc<Mutex<Clock>>,
    wake: Receiver<()>,
    connection: C,
}

impl<C: Connection> Sequencer<C> {
    fn run(self) -> Result<C> {
        let Sequencer {
            timeline,
            clock,
            wake,
            mut connection,
        } = self;
        let events = timeline.events();
        let mut next = 0;
        let mut seeks = 0;
        let mut sounding = false;
        loop {
            let state = *lock(&clock);
            if state.is_stopped() {
                break;
            }
            let position = state.position_at(Instant::now());

            if state.seeks() != seeks {
                seeks = state.seeks();
                if sounding {
                    silence(&mut connection)?;
                    sounding = false;
                }
                next = timeline.index_at(position);
                for (channel, message) in timeline.chase(next) {
                    connection.send(&encode(channel, message))?;
                }
            }

            if state.is_paused() {
                if sounding {
                    silence(&mut connection)?;
                    sounding = false;
                }
                if wake.recv().is_err() {
                    break;
                }
                continue;
            }

            while let Some(event) = events.get(next) {
                if event.time > position {
                    break;
                }
                connection.send(&event.encode())?;
                sounding = true;
                next += 1;
            }

            let due = match events.get(next) {
                Some(event) => event.time,
                None if position >= timeline.length() => break,
                None => timeline.length(),
            };
            match wake.recv_timeout(due.saturating_sub(position)) {
                Ok(()) | Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        silence(&mut connection)?;
        Ok(connection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cleanup::silence_messages,
        test_helpers::{note_off, note_on, RecordingConnection},
    };
    use midly::{
        num::{u4, u7},
        MidiMessage::ProgramChange,
        TrackEventKind,
    };

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn wait_until_done<C: Connection>(playback: &Playback<C>) {
        assert_eq!(
            playback.done().recv_timeout(Duration::from_secs(5)),
            Err(RecvTimeoutError::Disconnected)
        );
    }

    #[test]
    fn clock_runs_pauses_and_resumes() {
        let t0 = Instant::now();
        let mut clock = Clock::started(ms(60_000), t0);
        assert_eq!(clock.position_at(t0 + ms(2000)), ms(2000));
        clock.pause_at(t0 + ms(2000));
        assert!(clock.is_paused());
        assert_eq!(clock.position_at(t0 + ms(10_000)), ms(2000));
        clock.resume_at(t0 + ms(10_000));
        assert_eq!(clock.position_at(t0 + ms(11_000)), ms(3000));
    }

    #[test]
    fn clock_toggle_pause() {
        let t0 = Instant::now();
        let mut clock = Clock::started(ms(60_000), t0);
        assert!(clock.toggle_pause_at(t0 + ms(100)));
        assert!(!clock.toggle_pause_at(t0 + ms(500)));
        assert_eq!(clock.position_at(t0 + ms(600)), ms(200));
    }

    #[test]
    fn clock_seek_is_clamped_to_song_length() {
        let t0 = Instant::now();
        let mut clock = Clock::started(ms(60_000), t0);
        assert_eq!(clock.seek_at(ms(100_000), t0 + ms(1000)), ms(60_000));
        assert_eq!(clock.seeks(), 1);
        assert_eq!(clock.seek_at(ms(5000), t0 + ms(1000)), ms(5000));
        assert_eq!(clock.position_at(t0 + ms(1500)), ms(5500));
        assert_eq!(clock.seeks(), 2);
    }

    #[test]
    fn clock_seek_while_paused_stays_paused() {
        let t0 = Instant::now();
        let mut clock = Clock::new(ms(60_000));
        clock.seek_at(ms(30_000), t0);
        assert!(clock.is_paused());
        assert_eq!(clock.position_at(t0 + ms(5000)), ms(30_000));
    }

    #[test]
    fn plays_all_events_and_silences() {
        let events = [
            (ms(0), note_on(0, 60)),
            (ms(5), note_off(0, 60)),
            (ms(5), note_on(0, 62)),
            (ms(10), note_off(0, 62)),
        ];
        let connection = RecordingConnection::default();
        let playback = Playback::start(Timeline::from_events(&events), connection.clone());
        wait_until_done(&playback);
        playback.finish().unwrap();

        assert_eq!(connection.played_keys(), vec![60, 62]);
        let messages = connection.messages();
        assert_eq!(
            messages[..4],
            [[0x90, 60, 100], [0x80, 60, 0], [0x90, 62, 100], [0x80, 62, 0]]
        );
        assert_eq!(messages[4..], silence_messages()[..]);
    }

    #[test]
    fn waits_for_the_end_of_the_song() {
        let events = [
            (ms(0), note_on(0, 60)),
            (ms(300), TrackEventKind::Meta(midly::MetaMessage::EndOfTrack)),
        ];
        let started = Instant::now();
        let playback = Playback::start(
            Timeline::from_events(&events),
            RecordingConnection::default(),
        );
        wait_until_done(&playback);
        assert!(started.elapsed() >= ms(300));
        playback.finish().unwrap();
    }

    #[test]
    fn seek_forward_skips_events_and_chases_channel_state() {
        let events = [
            (ms(0), note_on(0, 60)),
            (
                ms(1000),
                TrackEventKind::Midi {
                    channel: u4::from(0),
                    message: ProgramChange {
                        program: u7::from(5),
                    },
                },
            ),
            (ms(5000), note_on(0, 62)),
            (ms(10_000), note_on(0, 64)),
        ];
        let connection = RecordingConnection::default();
        let playback = Playback::start(Timeline::from_events(&events), connection.clone());
        let position = playback.seek_forward(ms(9_900));
        assert!(position >= ms(9_900) && position < ms(10_000));
        wait_until_done(&playback);
        playback.finish().unwrap();

        let keys = connection.played_keys();
        assert!(!keys.contains(&62));
        assert!(keys.contains(&64));
        let program_changes = connection
            .messages()
            .iter()
            .filter(|message| message[0] == 0xc0)
            .count();
        assert_eq!(program_changes, 1);
    }

    #[test]
    fn seek_backward_stops_at_start() {
        let events = [(ms(60_000), note_on(0, 60))];
        let playback = Playback::start(
            Timeline::from_events(&events),
            RecordingConnection::default(),
        );
        assert_eq!(playback.seek_backward(ms(5000)), Duration::ZERO);
        playback.finish().unwrap();
    }

    #[test]
    fn pause_holds_the_song() {
        let events = [(ms(200), note_on(0, 60))];
        let connection = RecordingConnection::default();
        let playback = Playback::start(Timeline::from_events(&events), connection.clone());
        assert!(playback.toggle_pause());
        assert!(playback.is_paused());
        thread::sleep(ms(400));
        assert!(playback.position() < ms(200));
        assert!(connection.played_keys().is_empty());

        assert!(!playback.toggle_pause());
        wait_until_done(&playback);
        playback.finish().unwrap();
        assert_eq!(connection.played_keys(), vec![60]);
    }

    #[test]
    fn finish_stops_a_long_song() {
        let events = [(ms(0), note_on(0, 60)), (ms(600_000), note_off(0, 60))];
        let connection = RecordingConnection::default();
        let playback = Playback::start(Timeline::from_events(&events), connection.clone());
        let started = Instant::now();
        playback.finish().unwrap();
        assert!(started.elapsed() < ms(5000));
        assert!(connection.messages().ends_with(&silence_messages()));
    }

    #[test]
    fn empty_song_ends_immediately() {
        let playback = Playback::start(Timeline::default(), RecordingConnection::default());
        wait_until_done(&playback);
        let connection = playback.finish().unwrap();
        assert_eq!(connection.messages(), silence_messages());
    }
}
