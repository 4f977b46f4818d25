//! Entry point for the **vdindicator** daemon.
//!
//! Spawns all configured [`CommandSource`](vdindicator::traits::CommandSource)s
//! on background threads and hands incoming commands to the tracker on the
//! main thread.  Tracker events are written to stdout as JSON lines, one per
//! event, for whatever front-end draws the indicator.

use log::{error, info};
use std::path::PathBuf;
use vdindicator::config::Config;

/// `--config <path>` from the command line, if given.
fn config_path() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return Some(PathBuf::from(path));
        }
    }
    None
}

/// Load the config named on the command line, falling back to compiled-in
/// defaults.
fn load_config() -> Config {
    let Some(path) = config_path() else {
        info!("no --config given, using defaults");
        return Config::default();
    };
    match Config::load(&path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            info!("{}, using defaults", e);
            Config::default()
        }
    }
}

//  Main

fn main() {
    env_logger::init();
    let config = load_config();
    run(config);
}

#[cfg(not(windows))]
fn run(_config: Config) {
    error!("virtual desktops are only tracked on Windows");
    std::process::exit(1);
}

#[cfg(windows)]
fn run(config: Config) {
    use std::sync::mpsc;
    use vdindicator::command::Command;

    let tracker = vdindicator::win32::build_tracker(&config);
    let snapshot = tracker.snapshot();
    info!(
        "desktop {} of {} ({})",
        snapshot.current(),
        snapshot.count(),
        snapshot.current_name()
    );

    spawn_event_writer(tracker.subscribe());

    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
    spawn_command_sources(cmd_tx, &config);

    tracker.start_monitoring();
    info!("vdindicator running");
    for cmd in cmd_rx {
        tracker.handle(cmd);
    }
    info!("all command sources closed, exiting");
    tracker.stop_monitoring();
}

//  Helpers

#[cfg(windows)]
fn spawn_event_writer(events: std::sync::mpsc::Receiver<vdindicator::traits::TrackerEvent>) {
    use std::io::Write;

    std::thread::spawn(move || {
        let stdout = std::io::stdout();
        for event in events {
            let line = match serde_json::to_string(&event) {
                Ok(line) => line,
                Err(e) => {
                    error!("failed to encode event: {}", e);
                    continue;
                }
            };
            let mut out = stdout.lock();
            if writeln!(out, "{}", line).and_then(|_| out.flush()).is_err() {
                info!("stdout closed, no longer writing events");
                break;
            }
        }
    });
}

/// Spawn every command source on its own thread.
///
/// Closing stdin means the front-end is gone, so the stdin thread also stops
/// the hotkey source; once both have dropped their senders the command loop
/// in [`run`] ends.
#[cfg(windows)]
fn spawn_command_sources(
    tx: std::sync::mpsc::Sender<vdindicator::command::Command>,
    config: &Config,
) {
    use vdindicator::ipc::listener::LineListener;
    use vdindicator::traits::CommandSource;
    use vdindicator::win32::hotkey::GlobalHotkeySource;

    let hotkey = config.hotkeys.next_desktop_hotkey.then(GlobalHotkeySource::new);
    let stopper = hotkey.as_ref().map(GlobalHotkeySource::stopper);

    if let Some(mut source) = hotkey {
        let tx = tx.clone();
        std::thread::spawn(move || {
            if let Err(e) = source.run(tx) {
                error!("hotkey source error: {}", e);
            }
        });
    }

    {
        let tx = tx.clone();
        std::thread::spawn(move || {
            let mut source = LineListener::new(std::io::BufReader::new(std::io::stdin()));
            if let Err(e) = source.run(tx) {
                error!("stdin listener error: {}", e);
            }
            if let Some(stopper) = stopper {
                info!("stdin closed, stopping hotkey source");
                stopper.stop();
            }
        });
    }

    drop(tx);
}
