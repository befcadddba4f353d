use std::{
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Once,
    },
};

static INIT: Once = Once::new();
static IS_INITIALIZED: AtomicBool = AtomicBool::new(false);

pub fn is_active() -> bool {
    IS_INITIALIZED.load(Ordering::SeqCst)
}

/// Logs plain messages to the console, and with timestamps to `file` if given.
///
/// Console lines end with `\r\n` so they stay readable while the terminal is in raw
/// mode for keyboard control.
pub fn start(file: Option<&Path>, verbose: bool) -> anyhow::Result<()> {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    if is_active() {
        anyhow::bail!("attempted to setup logger more than once");
    }

    let console = fern::Dispatch::new()
        .format(|out, msg, _record| out.finish(format_args!("{msg}")))
        .chain(fern::Output::stdout("\r\n"));

    let mut dispatch = fern::Dispatch::new()
        .level(level)
        .level_for("midir", log::LevelFilter::Warn)
        .chain(console);

    if let Some(file) = file {
        dispatch = dispatch.chain(
            fern::Dispatch::new()
                .format(|out, msg, record| {
                    let time = humantime::format_rfc3339_seconds(std::time::SystemTime::now());
                    out.finish(format_args!(
                        "[ {time} ] : [ {} {} ] : {msg}",
                        record.target(),
                        record.level(),
                    ))
                })
                .chain(fern::log_file(file)?),
        );
    }

    dispatch.apply()?;

    log::trace!("started");

    INIT.call_once(|| IS_INITIALIZED.store(true, Ordering::SeqCst));
    Ok(())
}
