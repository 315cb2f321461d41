mod checksum;
mod cli;
mod commands;
mod config;
mod context;
mod download;
mod error;
mod installer;
mod manifest;
mod paths;
mod platform;
mod progress;
mod prompt;
mod record;
mod shortcut;
#[cfg(test)]
mod testing;
mod ui;
mod uninstaller;

use anyhow::Result;
use log::debug;

use cli::{Args, Command};
use commands::App;
use config::Config;
use error::PackageError;
use platform::Platform;

fn main() {
    // Quiet by default; RUST_LOG overrides
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{} {} {}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let args = Args::parse_args();

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            ui::error(&format!("Failed to create Tokio runtime: {e}"));
            std::process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(real_main(args)) {
        if let Some(kind) = e.downcast_ref::<PackageError>().map(PackageError::kind) {
            debug!("Command aborted: {kind:?}");
        }
        ui::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn real_main(args: Args) -> Result<()> {
    let command = match args.command {
        None | Some(Command::Help) => {
            Args::print_help();
            return Ok(());
        }
        Some(command) => command,
    };

    let config = Config::load_or_default()?;
    let platform = Platform::detect();
    debug!("Running {command:?} on {platform}");

    let app = App::from_config(&config, platform, args.yes)?;
    app.run(command, args.package.as_deref()).await
}
