pub mod config;
pub mod hal;
pub mod switch;
pub mod topics;

use color_eyre::Result;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::config::Config;
use crate::switch::{CommandBridge, DeviceError, Profile, Switch};

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = Config::load()?;
    info!("starting relaypilot {}", env!("CARGO_PKG_VERSION"));

    // The bridge exists before the GPIO layer so interrupt callbacks can be
    // wired straight to it.
    let bridge = CommandBridge::new();
    let io = hal::build(&config, &bridge)?;
    let device = Switch::create(Profile::from_config(&config), bridge, io);

    let shutdown = CancellationToken::new();
    let loop_token = shutdown.clone();

    // All control logic is synchronous and single-threaded by design; it
    // lives on a blocking worker while this task only waits for Ctrl-C.
    let mut worker = task::spawn_blocking(move || -> Result<(), DeviceError> {
        let mut running = device.bring_up(&loop_token)?;
        running.run(loop_token)
    });

    tokio::select! {
        result = &mut worker => {
            result??;
            info!("control loop ended");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, shutting down");
            shutdown.cancel();
            worker.await??;
        }
    }

    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
