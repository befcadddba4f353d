use anyhow::Context;
use crossbeam_channel::unbounded;
use floppy_midi_player::{
    cleanup::attach_ctrl_c_handler,
    cmdline::{parse_args, Cli},
    controls::Keyboard,
    device::{list_output_ports, MidiOutputPort},
    drive::{check_drive, find_floppy_drive},
    logger,
    player::Player,
};

fn main() {
    let args = parse_args();
    if let Err(err) = run(args) {
        if logger::is_active() {
            log::error!("{:#}", err);
        } else {
            eprintln!("Error: {:#}", err);
        }
        std::process::exit(1);
    }
}

fn run(args: Cli) -> anyhow::Result<()> {
    logger::start(args.log_file.as_deref(), args.verbose).context("can't set up logging")?;

    if args.list_ports {
        for (i, name) in list_output_ports()?.iter().enumerate() {
            println!("{}: {}", i, name);
        }
        return Ok(());
    }

    log::info!("Floppy Midi Player Starting...");

    let drive = match &args.drive {
        Some(drive) => check_drive(drive)?,
        None => match find_floppy_drive() {
            Some(drive) => drive,
            None => {
                log::error!("No floppy drive found, exiting...");
                return Ok(());
            }
        },
    };

    let (actions, actions_rx) = unbounded();
    attach_ctrl_c_handler(actions.clone())?;
    // _keyboard keeps the terminal in raw mode until the end of the scope
    let _keyboard = match Keyboard::spawn(actions) {
        Ok(keyboard) => Some(keyboard),
        Err(err) => {
            log::warn!("No keyboard control: {:#}", err);
            None
        }
    };

    let mut player = Player::new(
        drive,
        MidiOutputPort::new(args.device()),
        actions_rx,
        args.settings(),
    );
    player.run()
}
