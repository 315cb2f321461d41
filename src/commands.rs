//! Top-level command dispatch
//!
//! Core operations return typed errors; this layer turns outcomes into
//! terminal output and leaves the exit code to `main`.

use std::io::IsTerminal;

use anyhow::{Context, Result};

use crate::cli::{Args, Command};
use crate::config::Config;
use crate::context::InstallContext;
use crate::download::{Downloader, HttpDownloader};
use crate::installer::{InstallOptions, InstallOutcome, Installer, ShortcutStatus};
use crate::manifest::UpdateSource;
use crate::paths::Paths;
use crate::platform::Platform;
use crate::prompt::{InteractivePrompt, Prompt};
use crate::shortcut::DesktopShortcut;
use crate::ui;
use crate::uninstaller::{UninstallOutcome, Uninstaller};

pub struct App<D, P> {
    ctx: InstallContext<D>,
    prompt: P,
    /// Desktop shortcuts enabled in config
    shortcuts: bool,
    assume_yes: bool,
}

impl App<HttpDownloader, InteractivePrompt> {
    /// Production wiring: HTTP downloads and terminal prompts
    pub fn from_config(config: &Config, platform: Platform, assume_yes: bool) -> Result<Self> {
        let downloader = HttpDownloader::new(&config.user_agent, config.connect_timeout())
            .context("Failed to initialise HTTP client")?;
        let paths = Paths::new(config.data_root());
        log::debug!("Data root {}, platform {platform}", paths.root().display());
        let ctx = InstallContext::new(
            paths,
            platform,
            downloader,
            &config.bootstrap_url,
            &config.update_url,
        );
        log::debug!("Installation record at {}", ctx.records.path().display());

        Ok(Self::new(ctx, InteractivePrompt, config.shortcuts, assume_yes))
    }
}

impl<D: Downloader, P: Prompt> App<D, P> {
    pub fn new(ctx: InstallContext<D>, prompt: P, shortcuts: bool, assume_yes: bool) -> Self {
        Self {
            ctx,
            prompt,
            shortcuts,
            assume_yes,
        }
    }

    pub async fn run(&self, command: Command, package: Option<&str>) -> Result<()> {
        match command {
            Command::List => self.list().await,
            Command::Install => {
                let name = package.context("You must specify the package name to install.")?;
                self.install(name).await
            }
            Command::Uninstall => {
                let name =
                    package.context("You must specify the package name to uninstall.")?;
                self.uninstall(name)
            }
            Command::Update => self.update().await,
            Command::Json => {
                println!("{}", self.ctx.manifests.path().display());
                Ok(())
            }
            Command::Help => {
                Args::print_help();
                Ok(())
            }
        }
    }

    async fn ensure_manifest(&self) -> Result<()> {
        let path = self.ctx.manifests.path();
        if !path.exists() {
            ui::warning(&format!(
                "Package list not found at {}. Downloading...",
                path.display()
            ));
        }
        if self
            .ctx
            .manifests
            .ensure()
            .await
            .context("Failed to download package list")?
        {
            ui::success(&format!(
                "Package list downloaded successfully to {}.",
                path.display()
            ));
        }
        Ok(())
    }

    async fn list(&self) -> Result<()> {
        self.ensure_manifest().await?;
        let manifest = self.ctx.manifests.load()?;
        let record = self.ctx.records.read();

        ui::info("Available Packages:\n");
        for package in &manifest.packages {
            ui::heading(&format!("Name: {}", package.name));
            println!("Version: {}", package.version);
            println!("Description: {}", package.description);
            println!("Available for: {}", package.os.join(", "));
            println!("Requires Path: {}", yes_no(package.requirepath));
            println!("Creates Shortcut: {}", yes_no(package.shortcut));
            if let Some(entry) = record.get(&package.name) {
                println!(
                    "Installed: v{} on {}",
                    entry.version,
                    entry.installed_on.format("%Y-%m-%d %H:%M")
                );
            }
            ui::separator();
        }
        Ok(())
    }

    async fn install(&self, name: &str) -> Result<()> {
        self.ensure_manifest().await?;

        let shortcuts = DesktopShortcut::new();
        let mut installer = Installer::new(&self.ctx, &self.prompt).with_options(InstallOptions {
            assume_yes: self.assume_yes,
            show_progress: std::io::stderr().is_terminal(),
        });
        if self.shortcuts {
            installer = installer.with_shortcuts(&shortcuts);
        }

        installer.install(name, report_install).await?;
        Ok(())
    }

    fn uninstall(&self, name: &str) -> Result<()> {
        let uninstaller = Uninstaller::new(
            &self.ctx.paths,
            &self.ctx.records,
            &self.prompt,
            self.assume_yes,
        );

        match uninstaller.uninstall(name)? {
            UninstallOutcome::Removed {
                name,
                record_removed,
            } => {
                if !record_removed {
                    log::debug!("'{name}' had no record entry");
                }
                ui::success(&format!("'{name}' has been successfully uninstalled."));
            }
            UninstallOutcome::Cancelled { name } => {
                ui::info(&format!("Uninstallation of '{name}' cancelled."));
            }
        }
        Ok(())
    }

    async fn update(&self) -> Result<()> {
        let source = self
            .ctx
            .manifests
            .update()
            .await
            .context("Failed to update package list")?;

        if let UpdateSource::Default(url) = &source {
            ui::info(&format!("Using default update URL: {url}"));
        }
        ui::success(&format!(
            "Package list updated successfully from {}!",
            source.url()
        ));
        Ok(())
    }
}

fn report_install(outcome: &InstallOutcome) {
    match outcome {
        InstallOutcome::Installed {
            name,
            version,
            artifact,
            shortcut,
        } => {
            ui::info(&format!("Downloaded {name} to {}", artifact.display()));
            ui::success(&format!("{name} (v{version}) installed successfully!"));
            match shortcut {
                ShortcutStatus::Created(path) => {
                    ui::info(&format!("Shortcut created at {}", path.display()));
                }
                ShortcutStatus::Failed(_) => ui::warning(&format!(
                    "Could not create a shortcut for '{name}'. This will NOT affect the installation."
                )),
                ShortcutStatus::NotRequested => {}
            }
        }
        InstallOutcome::Cancelled { name } => {
            ui::info(&format!("Installation of '{name}' cancelled."));
        }
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}
