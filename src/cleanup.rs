use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crossbeam_channel::Sender;
use midly::{
    num::{u4, u7},
    MidiMessage,
};
use once_cell::sync::Lazy;

use crate::{controls::Action, error::Result, playback::Connection, score::encode};

const ALL_SOUND_OFF: u8 = 120;
const ALL_NOTES_OFF: u8 = 123;

static SILENCE: Lazy<Vec<Vec<u8>>> = Lazy::new(|| {
    (0..16)
        .flat_map(|channel| {
            [ALL_SOUND_OFF, ALL_NOTES_OFF].map(|controller| {
                encode(
                    u4::from(channel),
                    MidiMessage::Controller {
                        controller: u7::from(controller),
                        value: u7::from(0),
                    },
                )
            })
        })
        .collect()
});

/// All Sound Off and All Notes Off for each of the 16 channels
pub fn silence_messages() -> Vec<Vec<u8>> {
    SILENCE.clone()
}

pub fn silence<C: Connection>(connection: &mut C) -> Result<()> {
    for message in SILENCE.iter() {
        connection.send(message)?;
    }
    Ok(())
}

/// Turns Ctrl+C into a quit action. The terminal delivers Ctrl+C as a key press while
/// keyboard control is active, so this only matters outside of raw mode.
pub fn attach_ctrl_c_handler(actions: Sender<Action>) -> anyhow::Result<()> {
    let caught_ctrl_c = Arc::new(AtomicBool::new(false));
    ctrlc::set_handler(move || {
        if caught_ctrl_c.swap(true, Ordering::SeqCst) {
            log::warn!("Multiple ctrl+c caught, force-exiting...");
            std::process::exit(-1);
        }
        log::info!("Caught interrupt signal, cleaning up...");
        let _ = actions.send(Action::Quit);
    })?;
    Ok(())
}
