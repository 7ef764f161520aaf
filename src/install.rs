//! Install/update orchestration: locate, compare, ask, download, launch.

use std::env;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;

use crate::error::Result;
use crate::player;
use crate::process;
use crate::version::{self, VersionInfo};

/// Installer image name. Written to the current working directory and left
/// behind after the installer runs.
pub const INSTALLER_FILENAME: &str = "vlc_installer.exe";

/// Download location used when the status endpoint does not name one.
pub const FALLBACK_INSTALLER_URL: &str =
    "https://get.videolan.org/vlc/last/win64/vlc-3.0.18-win64.exe";

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Blocking client for installer downloads.
pub fn download_client() -> Result<Client> {
    Ok(Client::builder().timeout(DOWNLOAD_TIMEOUT).build()?)
}

/// Where the installer image lands.
pub fn installer_destination() -> PathBuf {
    env::current_dir()
        .map(|dir| dir.join(INSTALLER_FILENAME))
        .unwrap_or_else(|_| PathBuf::from(INSTALLER_FILENAME))
}

/// Questions the flow needs a human to answer.
pub trait UserPrompt {
    /// Yes/no consent question. `false` halts the flow with no side effects.
    fn confirm(&mut self, message: &str) -> bool;

    /// Manual fallback when the player is not in any known location.
    fn pick_player(&mut self) -> Option<PathBuf>;
}

/// The side-effecting operations behind the update flow.
///
/// [`LiveSetup`] wires these to the real network and process calls; tests
/// substitute scripted fakes.
pub trait SetupOps {
    fn locate_installed(&mut self) -> Option<PathBuf>;
    fn latest_version(&mut self) -> Option<VersionInfo>;
    fn installed_version(&mut self, path: &Path) -> Option<String>;
    fn download(&mut self, url: &str, dest: &Path) -> Result<()>;
    fn launch_installer(&mut self, path: &Path) -> Result<()>;
}

/// Terminal states of the update flow, rendered by the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupOutcome {
    /// The status endpoint could not be read; nothing else was attempted.
    CheckUnavailable,
    /// Fresh install consented; the vendor installer is running detached.
    InstallStarted,
    /// Update consented; the vendor installer is running detached.
    UpdateStarted { installed: String, latest: String },
    /// The user said no. Nothing was downloaded or launched.
    Declined,
    /// Installed version matches the published one, or could not be read.
    UpToDate { version: Option<String> },
    /// Download or launch failed partway through.
    Failed(String),
}

impl SetupOutcome {
    /// One-line rendering for status labels and logs.
    pub fn message(&self) -> String {
        match self {
            SetupOutcome::CheckUnavailable => {
                "could not determine the latest version".to_owned()
            }
            SetupOutcome::InstallStarted => {
                "installer downloaded and started".to_owned()
            }
            SetupOutcome::UpdateStarted { installed, latest } => {
                format!("updating {} -> {}, installer started", installed, latest)
            }
            SetupOutcome::Declined => "no changes made".to_owned(),
            SetupOutcome::UpToDate { version: Some(v) } => {
                format!("VLC {} is up to date", v)
            }
            SetupOutcome::UpToDate { version: None } => "VLC is up to date".to_owned(),
            SetupOutcome::Failed(e) => format!("setup failed: {}", e),
        }
    }
}

/// Walk the install/update decision once, from probe to installer handoff.
///
/// The sequence is strictly linear: locate, resolve latest, then either the
/// first-install branch or the update branch. Neither branch loops, retries,
/// or waits on the spawned installer.
pub fn ensure_up_to_date(ops: &mut dyn SetupOps, prompt: &mut dyn UserPrompt) -> SetupOutcome {
    let installed = ops.locate_installed().or_else(|| prompt.pick_player());

    let info = match ops.latest_version() {
        Some(info) => info,
        None => return SetupOutcome::CheckUnavailable,
    };

    match installed {
        // First install: consent, then hand off. The version probe is never
        // run on this path.
        None => {
            let question = format!(
                "VLC {} is available. Download and run the installer?",
                info.latest
            );
            if !prompt.confirm(&question) {
                return SetupOutcome::Declined;
            }
            match fetch_and_launch(ops, &info) {
                Ok(()) => SetupOutcome::InstallStarted,
                Err(e) => SetupOutcome::Failed(e.to_string()),
            }
        }
        Some(path) => match ops.installed_version(&path) {
            Some(have) if version::update_needed(&have, &info.latest) => {
                let question = format!(
                    "VLC {} is available (installed: {}). Download and run the installer?",
                    info.latest, have
                );
                if !prompt.confirm(&question) {
                    return SetupOutcome::Declined;
                }
                match fetch_and_launch(ops, &info) {
                    Ok(()) => SetupOutcome::UpdateStarted {
                        installed: have,
                        latest: info.latest,
                    },
                    Err(e) => SetupOutcome::Failed(e.to_string()),
                }
            }
            // An unreadable version reads as current; the log keeps a trace
            // so a broken install is not completely silent.
            have => {
                if have.is_none() {
                    log::warn!("could not read the installed version, reporting up to date");
                }
                SetupOutcome::UpToDate { version: have }
            }
        },
    }
}

fn fetch_and_launch(ops: &mut dyn SetupOps, info: &VersionInfo) -> Result<()> {
    let url = info.download_url.as_deref().unwrap_or(FALLBACK_INSTALLER_URL);
    let dest = installer_destination();
    ops.download(url, &dest)?;
    ops.launch_installer(&dest)
}

/// Stream the installer image to `dest`, reporting `(bytes, total)` after
/// each chunk.
///
/// The transfer blocks until it completes or errors; there is no
/// cancellation. Completion only means the connection did not fail; the
/// image is handed to the OS to execute as-is.
pub fn download_installer<F>(client: &Client, url: &str, dest: &Path, mut progress: F) -> Result<PathBuf>
where
    F: FnMut(u64, Option<u64>),
{
    log::info!("downloading {}", url);
    let mut response = client.get(url).send()?.error_for_status()?;
    let total = response.content_length();
    let mut file = File::create(dest)?;
    let mut buffer = [0u8; 8192];
    let mut downloaded: u64 = 0;
    loop {
        let read = response.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        file.write_all(&buffer[..read])?;
        downloaded += read as u64;
        progress(downloaded, total);
    }
    log::info!("saved installer to {}", dest.display());
    Ok(dest.to_path_buf())
}

/// Production wiring of [`SetupOps`].
pub struct LiveSetup {
    check: Client,
    download: Client,
    progress: Option<Box<dyn FnMut(u64, Option<u64>) + Send>>,
}

impl LiveSetup {
    pub fn new() -> Result<Self> {
        Ok(Self {
            check: version::http_client()?,
            download: download_client()?,
            progress: None,
        })
    }

    /// Install a download-progress hook, e.g. for a progress bar.
    pub fn with_progress(mut self, hook: impl FnMut(u64, Option<u64>) + Send + 'static) -> Self {
        self.progress = Some(Box::new(hook));
        self
    }
}

impl SetupOps for LiveSetup {
    fn locate_installed(&mut self) -> Option<PathBuf> {
        player::locate()
    }

    fn latest_version(&mut self) -> Option<VersionInfo> {
        version::fetch_latest(&self.check)
    }

    fn installed_version(&mut self, path: &Path) -> Option<String> {
        player::installed_version(path)
    }

    fn download(&mut self, url: &str, dest: &Path) -> Result<()> {
        match self.progress.as_mut() {
            Some(hook) => {
                download_installer(&self.download, url, dest, |done, total| hook(done, total))
            }
            None => download_installer(&self.download, url, dest, |_, _| {}),
        }
        .map(|_| ())
    }

    fn launch_installer(&mut self, path: &Path) -> Result<()> {
        process::spawn_detached(path, std::iter::empty::<&str>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[derive(Default)]
    struct ScriptedPrompt {
        answer: bool,
        picked: Option<PathBuf>,
        questions: Vec<String>,
    }

    impl UserPrompt for ScriptedPrompt {
        fn confirm(&mut self, message: &str) -> bool {
            self.questions.push(message.to_owned());
            self.answer
        }

        fn pick_player(&mut self) -> Option<PathBuf> {
            self.picked.clone()
        }
    }

    #[derive(Default)]
    struct FakeOps {
        located: Option<PathBuf>,
        latest: Option<VersionInfo>,
        installed: Option<String>,
        fail_download: bool,
        version_probes: usize,
        downloads: Vec<String>,
        launches: Vec<PathBuf>,
    }

    impl SetupOps for FakeOps {
        fn locate_installed(&mut self) -> Option<PathBuf> {
            self.located.clone()
        }

        fn latest_version(&mut self) -> Option<VersionInfo> {
            self.latest.clone()
        }

        fn installed_version(&mut self, _path: &Path) -> Option<String> {
            self.version_probes += 1;
            self.installed.clone()
        }

        fn download(&mut self, url: &str, _dest: &Path) -> Result<()> {
            if self.fail_download {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "dropped").into());
            }
            self.downloads.push(url.to_owned());
            Ok(())
        }

        fn launch_installer(&mut self, path: &Path) -> Result<()> {
            self.launches.push(path.to_owned());
            Ok(())
        }
    }

    fn published(latest: &str, url: Option<&str>) -> VersionInfo {
        VersionInfo {
            latest: latest.to_owned(),
            download_url: url.map(str::to_owned),
        }
    }

    #[test]
    fn fresh_install_downloads_once_and_never_probes() {
        let mut ops = FakeOps {
            latest: Some(published("3.0.20", Some("http://x/y.exe"))),
            ..FakeOps::default()
        };
        let mut prompt = ScriptedPrompt {
            answer: true,
            ..ScriptedPrompt::default()
        };

        let outcome = ensure_up_to_date(&mut ops, &mut prompt);

        assert_eq!(outcome, SetupOutcome::InstallStarted);
        assert_eq!(ops.downloads, vec!["http://x/y.exe".to_owned()]);
        assert_eq!(ops.launches.len(), 1);
        assert_eq!(ops.version_probes, 0);
    }

    #[test]
    fn declined_install_touches_nothing() {
        let mut ops = FakeOps {
            latest: Some(published("3.0.20", Some("http://x/y.exe"))),
            ..FakeOps::default()
        };
        let mut prompt = ScriptedPrompt::default();

        assert_eq!(ensure_up_to_date(&mut ops, &mut prompt), SetupOutcome::Declined);
        assert!(ops.downloads.is_empty());
        assert!(ops.launches.is_empty());
    }

    #[test]
    fn unavailable_check_halts_before_any_side_effect() {
        let mut ops = FakeOps {
            located: Some(PathBuf::from("/usr/bin/vlc")),
            ..FakeOps::default()
        };
        let mut prompt = ScriptedPrompt::default();

        let outcome = ensure_up_to_date(&mut ops, &mut prompt);

        assert_eq!(outcome, SetupOutcome::CheckUnavailable);
        assert_eq!(ops.version_probes, 0);
        assert!(ops.downloads.is_empty());
        assert!(prompt.questions.is_empty());
    }

    #[test]
    fn different_version_string_offers_an_update() {
        let mut ops = FakeOps {
            located: Some(PathBuf::from("/usr/bin/vlc")),
            latest: Some(published("3.0.20", Some("http://x/y.exe"))),
            installed: Some("3.0.18".to_owned()),
            ..FakeOps::default()
        };
        let mut prompt = ScriptedPrompt {
            answer: true,
            ..ScriptedPrompt::default()
        };

        let outcome = ensure_up_to_date(&mut ops, &mut prompt);

        assert_eq!(
            outcome,
            SetupOutcome::UpdateStarted {
                installed: "3.0.18".to_owned(),
                latest: "3.0.20".to_owned(),
            }
        );
        assert_eq!(ops.downloads.len(), 1);
        assert_eq!(ops.launches.len(), 1);
    }

    #[test]
    fn refused_update_downloads_nothing() {
        let mut ops = FakeOps {
            located: Some(PathBuf::from("/usr/bin/vlc")),
            latest: Some(published("3.0.20", None)),
            installed: Some("3.0.18".to_owned()),
            ..FakeOps::default()
        };
        let mut prompt = ScriptedPrompt::default();

        assert_eq!(ensure_up_to_date(&mut ops, &mut prompt), SetupOutcome::Declined);
        assert!(ops.downloads.is_empty());
        assert!(ops.launches.is_empty());
    }

    #[test]
    fn matching_version_is_up_to_date() {
        let mut ops = FakeOps {
            located: Some(PathBuf::from("/usr/bin/vlc")),
            latest: Some(published("3.0.20", None)),
            installed: Some("3.0.20".to_owned()),
            ..FakeOps::default()
        };
        let mut prompt = ScriptedPrompt::default();

        let outcome = ensure_up_to_date(&mut ops, &mut prompt);

        assert_eq!(
            outcome,
            SetupOutcome::UpToDate {
                version: Some("3.0.20".to_owned())
            }
        );
        assert!(prompt.questions.is_empty());
        assert!(ops.downloads.is_empty());
    }

    #[test]
    fn unreadable_version_reads_as_current() {
        let mut ops = FakeOps {
            located: Some(PathBuf::from("/usr/bin/vlc")),
            latest: Some(published("3.0.20", None)),
            ..FakeOps::default()
        };
        let mut prompt = ScriptedPrompt::default();

        let outcome = ensure_up_to_date(&mut ops, &mut prompt);

        assert_eq!(outcome, SetupOutcome::UpToDate { version: None });
        assert_eq!(ops.version_probes, 1);
        assert!(ops.downloads.is_empty());
    }

    #[test]
    fn fallback_url_covers_a_bare_status_body() {
        let mut ops = FakeOps {
            latest: Some(published("3.0.20", None)),
            ..FakeOps::default()
        };
        let mut prompt = ScriptedPrompt {
            answer: true,
            ..ScriptedPrompt::default()
        };

        ensure_up_to_date(&mut ops, &mut prompt);

        assert_eq!(ops.downloads, vec![FALLBACK_INSTALLER_URL.to_owned()]);
    }

    #[test]
    fn manually_picked_player_feeds_the_update_path() {
        let mut ops = FakeOps {
            latest: Some(published("3.0.20", None)),
            installed: Some("3.0.20".to_owned()),
            ..FakeOps::default()
        };
        let mut prompt = ScriptedPrompt {
            picked: Some(PathBuf::from("/opt/vlc/vlc")),
            ..ScriptedPrompt::default()
        };

        let outcome = ensure_up_to_date(&mut ops, &mut prompt);

        assert_eq!(ops.version_probes, 1);
        assert_eq!(
            outcome,
            SetupOutcome::UpToDate {
                version: Some("3.0.20".to_owned())
            }
        );
    }

    #[test]
    fn failed_download_surfaces_and_skips_the_launch() {
        let mut ops = FakeOps {
            latest: Some(published("3.0.20", Some("http://x/y.exe"))),
            fail_download: true,
            ..FakeOps::default()
        };
        let mut prompt = ScriptedPrompt {
            answer: true,
            ..ScriptedPrompt::default()
        };

        let outcome = ensure_up_to_date(&mut ops, &mut prompt);

        assert!(matches!(outcome, SetupOutcome::Failed(_)));
        assert!(ops.launches.is_empty());
    }
}
