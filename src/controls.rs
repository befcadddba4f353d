use crossbeam_channel::Sender;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Transport commands a user can give while songs are playing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    TogglePause,
    Next,
    Previous,
    SeekBackward,
    SeekForward,
    Quit,
}

impl Action {
    /// Maps a key to its action. The digits mirror the arrows on a numeric keypad.
    pub fn from_key(key: KeyEvent) -> Option<Self> {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::Quit)
            }
            KeyCode::Char(' ') | KeyCode::Char('5') => Some(Action::TogglePause),
            KeyCode::Up | KeyCode::Char('8') => Some(Action::Next),
            KeyCode::Down | KeyCode::Char('2') => Some(Action::Previous),
            KeyCode::Left | KeyCode::Char('4') | KeyCode::Char('z') | KeyCode::Char('Z') => {
                Some(Action::SeekBackward)
            }
            KeyCode::Right | KeyCode::Char('6') | KeyCode::Char('x') | KeyCode::Char('X') => {
                Some(Action::SeekForward)
            }
            KeyCode::Esc | KeyCode::Delete => Some(Action::Quit),
            _ => None,
        }
    }
}

pub mod terminal {
    pub fn acquire() -> anyhow::Result<()> {
        crossterm::terminal::enable_raw_mode()?;
        Ok(())
    }

    pub fn release() -> anyhow::Result<()> {
        crossterm::terminal::disable_raw_mode()?;
        Ok(())
    }

    pub fn set_panic_hook() {
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic| {
            let _ = release();
            original_hook(panic);
        }));
    }
}

/// Reads single key presses from the terminal and forwards them as actions.
///
/// The terminal stays in raw mode until this is dropped.
pub struct Keyboard {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Keyboard {
    pub fn spawn(actions: Sender<Action>) -> anyhow::Result<Self> {
        terminal::acquire()?;
        terminal::set_panic_hook();
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = running.clone();
        let thread = thread::spawn(move || {
            if let Err(err) = read_keys(&thread_running, &actions) {
                log::error!("Keyboard control stopped: {err}");
            }
        });
        Ok(Self {
            running,
            thread: Some(thread),
        })
    }
}

impl Drop for Keyboard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        if let Err(err) = terminal::release() {
            log::error!("Can't restore the terminal: {err}");
        }
    }
}

fn read_keys(running: &AtomicBool, actions: &Sender<Action>) -> anyhow::Result<()> {
    while running.load(Ordering::SeqCst) {
        if !event::poll(POLL_INTERVAL)? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if let Some(action) = Action::from_key(key) {
                log::debug!("{:?} pressed, {:?}", key.code, action);
                if actions.send(action).is_err() {
                    break;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest(
        code,
        expect,
        case(KeyCode::Char(' '), Some(Action::TogglePause)),
        case(KeyCode::Char('5'), Some(Action::TogglePause)),
        case(KeyCode::Up, Some(Action::Next)),
        case(KeyCode::Char('8'), Some(Action::Next)),
        case(KeyCode::Down, Some(Action::Previous)),
        case(KeyCode::Char('2'), Some(Action::Previous)),
        case(KeyCode::Left, Some(Action::SeekBackward)),
        case(KeyCode::Char('4'), Some(Action::SeekBackward)),
        case(KeyCode::Char('z'), Some(Action::SeekBackward)),
        case(KeyCode::Right, Some(Action::SeekForward)),
        case(KeyCode::Char('6'), Some(Action::SeekForward)),
        case(KeyCode::Char('x'), Some(Action::SeekForward)),
        case(KeyCode::Esc, Some(Action::Quit)),
        case(KeyCode::Delete, Some(Action::Quit)),
        case(KeyCode::Char('c'), None),
        case(KeyCode::Enter, None),
        case(KeyCode::Char('q'), None)
    )]
    fn test_from_key(code: KeyCode, expect: Option<Action>) {
        let key = KeyEvent::new(code, KeyModifiers::NONE);
        assert_eq!(Action::from_key(key), expect);
    }

    #[test]
    fn ctrl_c_quits() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(Action::from_key(key), Some(Action::Quit));
    }
}
