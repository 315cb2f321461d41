//! Package installation state machine
//!
//! Each package moves through
//! `Idle → Resolved → Confirmed → Downloaded → Verified → Finalized`,
//! or stops at `Aborted` on the first error. A declined confirmation is a
//! clean cancellation with no side effects. The record entry is written only
//! in the final transition, so an aborted install is never marked installed.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use log::{debug, info, warn};
use url::Url;

use crate::checksum;
use crate::context::InstallContext;
use crate::download::Downloader;
use crate::error::{PackageError, PackageResult};
use crate::manifest::Package;
use crate::paths::is_valid_package_name;
use crate::progress::DownloadProgress;
use crate::prompt::Prompt;
use crate::shortcut::ShortcutCreator;

/// Target name that expands to every package in the manifest
pub const ALL_PACKAGES: &str = "*";

pub type Clock = fn() -> NaiveDateTime;

fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    Idle,
    Resolved,
    Confirmed,
    Downloaded,
    Verified,
    Finalized,
    Aborted,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InstallOptions {
    /// Skip the confirmation prompt (`-y/--yes`)
    pub assume_yes: bool,
    /// Draw a progress bar while downloading
    pub show_progress: bool,
}

/// Result of the optional shortcut step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShortcutStatus {
    NotRequested,
    Created(PathBuf),
    /// Non-fatal; the install still finalized
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed {
        name: String,
        version: String,
        artifact: PathBuf,
        shortcut: ShortcutStatus,
    },
    Cancelled {
        name: String,
    },
}

/// Tracks one package's progress through the state machine
struct InstallRun<'p> {
    package: &'p str,
    state: InstallState,
}

impl<'p> InstallRun<'p> {
    fn start(package: &'p str) -> Self {
        Self {
            package,
            state: InstallState::Idle,
        }
    }

    fn advance(&mut self, next: InstallState) {
        debug!("install {}: {:?} -> {:?}", self.package, self.state, next);
        self.state = next;
    }

    fn abort(&mut self, err: PackageError) -> PackageError {
        debug!(
            "install {}: {:?} -> {:?} ({err})",
            self.package,
            self.state,
            InstallState::Aborted
        );
        self.state = InstallState::Aborted;
        err
    }
}

/// Installs packages described by the cached manifest
pub struct Installer<'a, D> {
    ctx: &'a InstallContext<D>,
    prompt: &'a dyn Prompt,
    shortcuts: Option<&'a dyn ShortcutCreator>,
    options: InstallOptions,
    clock: Clock,
}

impl<'a, D: Downloader> Installer<'a, D> {
    pub fn new(ctx: &'a InstallContext<D>, prompt: &'a dyn Prompt) -> Self {
        Self {
            ctx,
            prompt,
            shortcuts: None,
            options: InstallOptions::default(),
            clock: local_now,
        }
    }

    pub fn with_shortcuts(mut self, shortcuts: &'a dyn ShortcutCreator) -> Self {
        self.shortcuts = Some(shortcuts);
        self
    }

    pub fn with_options(mut self, options: InstallOptions) -> Self {
        self.options = options;
        self
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Install `target` (case-insensitive name, or `*` for every package in manifest order)
    ///
    /// `report` is called after each package finishes. The first failing package
    /// aborts the whole batch; packages after it are not attempted.
    pub async fn install(
        &self,
        target: &str,
        mut report: impl FnMut(&InstallOutcome),
    ) -> PackageResult<Vec<InstallOutcome>> {
        self.ctx.manifests.ensure().await?;
        let manifest = self.ctx.manifests.load()?;

        let packages: Vec<&Package> = if target == ALL_PACKAGES {
            manifest.packages.iter().collect()
        } else {
            let package = manifest.find(target).ok_or_else(|| {
                PackageError::NotFound(format!(
                    "Package '{target}' not found in the package list."
                ))
            })?;
            vec![package]
        };

        let mut outcomes = Vec::with_capacity(packages.len());
        for package in packages {
            let outcome = self.install_package(package).await?;
            report(&outcome);
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Run the state machine for a single resolved package
    pub async fn install_package(&self, package: &Package) -> PackageResult<InstallOutcome> {
        let name = package.name.as_str();
        let mut run = InstallRun::start(name);
        run.advance(InstallState::Resolved);

        if !is_valid_package_name(name) {
            return Err(run.abort(PackageError::NotFound(format!(
                "Package name '{name}' cannot be used as an install directory."
            ))));
        }

        let artifact = package
            .artifact_for(self.ctx.platform)
            .map_err(|e| run.abort(e))?;

        if !self.options.assume_yes {
            let question = format!("Are you sure you want to install '{name}'?");
            if !self.prompt.confirm(&question).map_err(|e| run.abort(e))? {
                info!("Installation of '{name}' cancelled");
                return Ok(InstallOutcome::Cancelled {
                    name: name.to_string(),
                });
            }
        }
        run.advance(InstallState::Confirmed);

        if let Some(previous) = self.ctx.records.get(name) {
            info!(
                "Reinstalling {name}: v{} (installed {}) -> v{}",
                previous.version, previous.installed_on, package.version
            );
        }

        let install_dir = self.ctx.paths.install_dir(name);
        fs::create_dir_all(&install_dir).map_err(|e| {
            run.abort(PackageError::io(
                format!("Failed to create {}", install_dir.display()),
                e,
            ))
        })?;

        let dest = install_dir.join(artifact_file_name(name, artifact.url));
        info!(
            "Installing {name} (v{}) for {} into {}",
            package.version,
            self.ctx.platform,
            dest.display()
        );

        let mut progress = DownloadProgress::new(
            self.options.show_progress,
            format!("{name} v{}", package.version),
        );
        let fetched = self
            .ctx
            .downloader
            .fetch(artifact.url, &dest, &mut |done, total| {
                progress.update(done, total)
            })
            .await;
        match fetched {
            Ok(_) => progress.finish(),
            Err(e) => {
                progress.abandon();
                return Err(run.abort(e));
            }
        }
        run.advance(InstallState::Downloaded);

        if !checksum::verify(&dest, artifact.sha256).map_err(|e| run.abort(e))? {
            // The artifact stays on disk; without a record entry it is not installed.
            return Err(run.abort(PackageError::Integrity {
                package: name.to_string(),
                expected: artifact.sha256.to_string(),
            }));
        }
        run.advance(InstallState::Verified);

        let shortcut = if package.shortcut {
            self.create_shortcut(&install_dir, name)
        } else {
            ShortcutStatus::NotRequested
        };

        self.ctx
            .records
            .set_entry(name, &package.version, (self.clock)())
            .map_err(|e| run.abort(e))?;
        run.advance(InstallState::Finalized);

        Ok(InstallOutcome::Installed {
            name: name.to_string(),
            version: package.version.clone(),
            artifact: dest,
            shortcut,
        })
    }

    fn create_shortcut(&self, install_dir: &Path, name: &str) -> ShortcutStatus {
        let Some(shortcuts) = self.shortcuts else {
            debug!("Shortcuts disabled, skipping shortcut for {name}");
            return ShortcutStatus::NotRequested;
        };

        let created = first_file(install_dir)
            .ok_or_else(|| anyhow::anyhow!("no file found in {}", install_dir.display()))
            .and_then(|target| shortcuts.create(&target, name));

        match created {
            Ok(path) => ShortcutStatus::Created(path),
            Err(e) => {
                warn!("Could not create a shortcut for '{name}': {e:#}");
                ShortcutStatus::Failed(format!("{e:#}"))
            }
        }
    }
}

/// `<name>.<ext>` using the extension of the URL's last path segment
pub fn artifact_file_name(name: &str, url: &str) -> String {
    let segment = match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .and_then(|path| path.rsplit('/').next())
            .unwrap_or_default()
            .to_string(),
    };

    match segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            if let Some((_, "tar")) = stem.rsplit_once('.') {
                format!("{name}.tar.{ext}")
            } else {
                format!("{name}.{ext}")
            }
        }
        _ => name.to_string(),
    }
}

/// First regular file in `dir`, by file name
fn first_file(dir: &Path) -> Option<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    files.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::paths::Paths;
    use crate::platform::Platform;
    use crate::testing::{MemoryDownloader, RecordingShortcuts, ScriptedPrompt};
    use chrono::NaiveDate;
    use serde_json::json;
    use sha2::{Digest, Sha256};
    use tempfile::TempDir;

    const BOOTSTRAP: &str = "https://example.test/packages.json";

    struct Fixture {
        _dir: TempDir,
        ctx: InstallContext<MemoryDownloader>,
        downloader: MemoryDownloader,
    }

    struct Spec {
        name: &'static str,
        os: &'static [&'static str],
        body: &'static [u8],
        bad_hash: bool,
        shortcut: bool,
    }

    impl Spec {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                os: &["Linux"],
                body: b"artifact bytes",
                bad_hash: false,
                shortcut: false,
            }
        }

        fn url(&self) -> String {
            format!("https://example.test/{}/release.zip", self.name)
        }
    }

    fn fixture(platform: Platform, specs: &[Spec]) -> Fixture {
        let dir = TempDir::new().unwrap();
        let mut downloader = MemoryDownloader::default();
        let mut packages = Vec::new();

        for spec in specs {
            let sha = if spec.bad_hash {
                "0".repeat(64)
            } else {
                hex::encode(Sha256::digest(spec.body))
            };
            let urls: serde_json::Map<_, _> = spec
                .os
                .iter()
                .map(|os| (os.to_string(), json!(spec.url())))
                .collect();
            let hashes: serde_json::Map<_, _> = spec
                .os
                .iter()
                .map(|os| (os.to_string(), json!(sha)))
                .collect();
            packages.push(json!({
                "name": spec.name,
                "version": "1.0.0",
                "description": "test package",
                "os": spec.os,
                "requirepath": false,
                "shortcut": spec.shortcut,
                "url": urls,
                "sha256": hashes,
            }));
            downloader = downloader.with(&spec.url(), spec.body);
        }

        let manifest = json!({ "packages": packages }).to_string();
        downloader = downloader.with(BOOTSTRAP, manifest);

        let ctx = InstallContext::new(
            Paths::new(dir.path()),
            platform,
            downloader.clone(),
            BOOTSTRAP,
            BOOTSTRAP,
        );
        Fixture {
            _dir: dir,
            ctx,
            downloader,
        }
    }

    fn yes() -> InstallOptions {
        InstallOptions {
            assume_yes: true,
            show_progress: false,
        }
    }

    fn first_clock() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn second_clock() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn installs_and_records_package() {
        let fx = fixture(Platform::Linux, &[Spec::new("Foo")]);
        let prompt = ScriptedPrompt::answering(&[true]);
        let installer = Installer::new(&fx.ctx, &prompt).with_clock(first_clock);

        let outcomes = installer.install("foo", |_| {}).await.unwrap();

        let artifact = fx.ctx.paths.install_dir("Foo").join("Foo.zip");
        assert_eq!(
            outcomes,
            vec![InstallOutcome::Installed {
                name: "Foo".into(),
                version: "1.0.0".into(),
                artifact: artifact.clone(),
                shortcut: ShortcutStatus::NotRequested,
            }]
        );
        assert_eq!(fs::read(&artifact).unwrap(), b"artifact bytes");
        assert_eq!(prompt.asked().len(), 1);

        let entry = fx.ctx.records.get("Foo").unwrap();
        assert_eq!(entry.version, "1.0.0");
        assert_eq!(entry.installed_on, first_clock());
    }

    #[tokio::test]
    async fn unsupported_platform_changes_nothing() {
        let fx = fixture(Platform::MacOs, &[Spec::new("Foo")]);
        let prompt = ScriptedPrompt::answering(&[true]);
        let installer = Installer::new(&fx.ctx, &prompt);

        let err = installer.install("Foo", |_| {}).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UnsupportedPlatform);
        assert!(!fx.ctx.paths.install_dir("Foo").exists());
        assert!(fx.ctx.records.read().is_empty());
        assert!(prompt.asked().is_empty());
        assert_eq!(fx.downloader.requests(), vec![BOOTSTRAP.to_string()]);
    }

    #[tokio::test]
    async fn checksum_mismatch_leaves_artifact_but_no_record() {
        let mut spec = Spec::new("Foo");
        spec.bad_hash = true;
        let fx = fixture(Platform::Linux, &[spec]);
        let prompt = ScriptedPrompt::default();
        let installer = Installer::new(&fx.ctx, &prompt).with_options(yes());

        let err = installer.install("Foo", |_| {}).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Integrity);
        assert!(fx.ctx.records.get("Foo").is_none());
        assert!(fx.ctx.paths.install_dir("Foo").join("Foo.zip").exists());
    }

    #[tokio::test]
    async fn reinstall_keeps_one_entry_with_latest_timestamp() {
        let fx = fixture(Platform::Linux, &[Spec::new("Foo")]);
        let prompt = ScriptedPrompt::default();

        Installer::new(&fx.ctx, &prompt)
            .with_options(yes())
            .with_clock(first_clock)
            .install("Foo", |_| {})
            .await
            .unwrap();
        Installer::new(&fx.ctx, &prompt)
            .with_options(yes())
            .with_clock(second_clock)
            .install("Foo", |_| {})
            .await
            .unwrap();

        let record = fx.ctx.records.read();
        assert_eq!(record.len(), 1);
        assert_eq!(record["Foo"].installed_on, second_clock());
    }

    #[tokio::test]
    async fn wildcard_installs_every_package_in_order() {
        let fx = fixture(
            Platform::Linux,
            &[Spec::new("Alpha"), Spec::new("Beta"), Spec::new("Gamma")],
        );
        let prompt = ScriptedPrompt::default();
        let installer = Installer::new(&fx.ctx, &prompt).with_options(yes());

        let mut reported = Vec::new();
        let outcomes = installer
            .install(ALL_PACKAGES, |outcome| {
                if let InstallOutcome::Installed { name, .. } = outcome {
                    reported.push(name.clone());
                }
            })
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 3);
        assert_eq!(reported, vec!["Alpha", "Beta", "Gamma"]);
        assert_eq!(fx.ctx.records.read().len(), 3);
    }

    #[tokio::test]
    async fn wildcard_stops_at_first_failure() {
        let mut beta = Spec::new("Beta");
        beta.bad_hash = true;
        let fx = fixture(
            Platform::Linux,
            &[Spec::new("Alpha"), beta, Spec::new("Gamma")],
        );
        let prompt = ScriptedPrompt::default();
        let installer = Installer::new(&fx.ctx, &prompt).with_options(yes());

        let mut reported = 0;
        let err = installer
            .install(ALL_PACKAGES, |_| reported += 1)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Integrity);
        assert_eq!(reported, 1);
        let record = fx.ctx.records.read();
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["Alpha"]);
        assert!(
            !fx.downloader
                .requests()
                .iter()
                .any(|url| url.contains("Gamma"))
        );
    }

    #[tokio::test]
    async fn wildcard_decline_skips_only_that_package() {
        let fx = fixture(
            Platform::Linux,
            &[Spec::new("Alpha"), Spec::new("Beta"), Spec::new("Gamma")],
        );
        let prompt = ScriptedPrompt::answering(&[true, false, true]);
        let installer = Installer::new(&fx.ctx, &prompt);

        let outcomes = installer.install(ALL_PACKAGES, |_| {}).await.unwrap();

        assert_eq!(prompt.asked().len(), 3);
        assert!(matches!(&outcomes[0], InstallOutcome::Installed { name, .. } if name == "Alpha"));
        assert_eq!(outcomes[1], InstallOutcome::Cancelled { name: "Beta".into() });
        assert!(matches!(&outcomes[2], InstallOutcome::Installed { name, .. } if name == "Gamma"));

        let record = fx.ctx.records.read();
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["Alpha", "Gamma"]);
        assert!(!fx.ctx.paths.install_dir("Beta").exists());
        assert!(
            !fx.downloader
                .requests()
                .iter()
                .any(|url| url.contains("Beta"))
        );
    }

    #[tokio::test]
    async fn declined_confirmation_is_a_clean_cancel() {
        let fx = fixture(Platform::Linux, &[Spec::new("Foo")]);
        let prompt = ScriptedPrompt::answering(&[false]);
        let installer = Installer::new(&fx.ctx, &prompt);

        let outcomes = installer.install("Foo", |_| {}).await.unwrap();

        assert_eq!(
            outcomes,
            vec![InstallOutcome::Cancelled { name: "Foo".into() }]
        );
        assert!(!fx.ctx.paths.install_dir("Foo").exists());
        assert!(fx.ctx.records.read().is_empty());
    }

    #[tokio::test]
    async fn unknown_package_is_not_found() {
        let fx = fixture(Platform::Linux, &[Spec::new("Foo")]);
        let prompt = ScriptedPrompt::default();
        let installer = Installer::new(&fx.ctx, &prompt).with_options(yes());

        let err = installer.install("Bar", |_| {}).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn missing_manifest_download_is_network_error() {
        let dir = TempDir::new().unwrap();
        let ctx = InstallContext::new(
            Paths::new(dir.path()),
            Platform::Linux,
            MemoryDownloader::default(),
            BOOTSTRAP,
            BOOTSTRAP,
        );
        let prompt = ScriptedPrompt::default();

        let err = Installer::new(&ctx, &prompt)
            .install("Foo", |_| {})
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
    }

    #[tokio::test]
    async fn failed_artifact_download_is_not_recorded() {
        let fx = fixture(Platform::Linux, &[Spec::new("Foo")]);
        fx.ctx.manifests.ensure().await.unwrap();
        let broken = InstallContext::new(
            fx.ctx.paths.clone(),
            Platform::Linux,
            MemoryDownloader::default(),
            BOOTSTRAP,
            BOOTSTRAP,
        );
        let prompt = ScriptedPrompt::default();

        let err = Installer::new(&broken, &prompt)
            .with_options(yes())
            .install("Foo", |_| {})
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(broken.records.read().is_empty());
    }

    #[tokio::test]
    async fn shortcut_failure_is_only_a_warning() {
        let mut spec = Spec::new("Foo");
        spec.shortcut = true;
        let fx = fixture(Platform::Linux, &[spec]);
        let prompt = ScriptedPrompt::default();
        let shortcuts = RecordingShortcuts::failing();
        let installer = Installer::new(&fx.ctx, &prompt)
            .with_shortcuts(&shortcuts)
            .with_options(yes());

        let outcomes = installer.install("Foo", |_| {}).await.unwrap();

        assert!(matches!(
            &outcomes[0],
            InstallOutcome::Installed {
                shortcut: ShortcutStatus::Failed(_),
                ..
            }
        ));
        assert!(fx.ctx.records.get("Foo").is_some());
    }

    #[tokio::test]
    async fn shortcut_points_at_installed_artifact() {
        let mut spec = Spec::new("Foo");
        spec.shortcut = true;
        let fx = fixture(Platform::Linux, &[spec]);
        let prompt = ScriptedPrompt::default();
        let shortcuts = RecordingShortcuts::default();
        let installer = Installer::new(&fx.ctx, &prompt)
            .with_shortcuts(&shortcuts)
            .with_options(yes());

        installer.install("Foo", |_| {}).await.unwrap();

        let artifact = fx.ctx.paths.install_dir("Foo").join("Foo.zip");
        assert_eq!(shortcuts.created(), vec![(artifact, "Foo".to_string())]);
    }

    #[test]
    fn artifact_names_follow_url_extension() {
        assert_eq!(
            artifact_file_name("Foo", "https://x.test/dl/foo-1.2.zip"),
            "Foo.zip"
        );
        assert_eq!(
            artifact_file_name("Foo", "https://x.test/dl/foo.tar.gz?token=1"),
            "Foo.tar.gz"
        );
        assert_eq!(artifact_file_name("Foo", "https://x.test/dl/foo"), "Foo");
        assert_eq!(artifact_file_name("Foo", "https://x.test/"), "Foo");
        assert_eq!(artifact_file_name("Foo", "relative/setup.exe"), "Foo.exe");
    }
}
