//! Shared state injected into the installer and uninstaller

use crate::download::Downloader;
use crate::manifest::ManifestStore;
use crate::paths::Paths;
use crate::platform::Platform;
use crate::record::RecordStore;

/// File-backed stores, network access and the detected platform for one invocation
#[derive(Debug)]
pub struct InstallContext<D> {
    pub paths: Paths,
    pub platform: Platform,
    pub manifests: ManifestStore<D>,
    pub records: RecordStore,
    pub downloader: D,
}

impl<D: Downloader + Clone> InstallContext<D> {
    pub fn new(
        paths: Paths,
        platform: Platform,
        downloader: D,
        bootstrap_url: &str,
        update_url: &str,
    ) -> Self {
        let manifests = ManifestStore::new(
            paths.manifest_path(),
            bootstrap_url,
            update_url,
            downloader.clone(),
        );
        let records = RecordStore::new(paths.record_path());

        Self {
            paths,
            platform,
            manifests,
            records,
            downloader,
        }
    }
}
