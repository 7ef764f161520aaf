//! Locating the VLC executable and probing its version.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::process;

/// Fixed budget for the `--version` probe.
pub const VERSION_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Known install locations for the current platform.
pub fn candidate_paths() -> Vec<PathBuf> {
    match env::consts::OS {
        "windows" => vec![
            PathBuf::from(r"C:\Program Files\VideoLAN\VLC\vlc.exe"),
            PathBuf::from(r"C:\Program Files (x86)\VideoLAN\VLC\vlc.exe"),
        ],
        "macos" => {
            let mut paths = vec![PathBuf::from("/Applications/VLC.app/Contents/MacOS/VLC")];
            if let Some(home) = dirs::home_dir() {
                paths.push(home.join("Applications/VLC.app/Contents/MacOS/VLC"));
            }
            paths
        }
        _ => vec![
            PathBuf::from("/usr/bin/vlc"),
            PathBuf::from("/usr/local/bin/vlc"),
            PathBuf::from("/snap/bin/vlc"),
        ],
    }
}

/// First candidate present on disk, or `None` when the executable has to be
/// pointed out manually. Probed fresh on every call, never cached.
pub fn locate() -> Option<PathBuf> {
    let found = candidate_paths().into_iter().find(|path| path.exists());
    match &found {
        Some(path) => log::debug!("found player at {}", path.display()),
        None => log::debug!("player not present in any known location"),
    }
    found
}

/// Ask the player for its version.
///
/// Runs `<path> --version` under [`VERSION_PROBE_TIMEOUT`] and extracts the
/// version number from the first line of combined output. A failed launch,
/// a timeout, or output with no version token all yield `None`.
pub fn installed_version(path: &Path) -> Option<String> {
    let output = process::capture_with_timeout(path, ["--version"], VERSION_PROBE_TIMEOUT)?;
    parse_version_token(&output)
}

/// First whitespace-delimited token of the first line that starts with a
/// digit: `"vlc version 3.0.18 Vetinari"` yields `"3.0.18"`.
pub fn parse_version_token(output: &str) -> Option<String> {
    output
        .lines()
        .next()?
        .split_whitespace()
        .find(|token| token.starts_with(|c: char| c.is_ascii_digit()))
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_digit_leading_token() {
        assert_eq!(
            parse_version_token("vlc version 3.0.18 Vetinari"),
            Some("3.0.18".to_owned())
        );
    }

    #[test]
    fn only_the_first_line_counts() {
        let probe = "VLC media player 3.0.20 Vetinari\nCopyright 1996-2023 the VideoLAN team";
        assert_eq!(parse_version_token(probe), Some("3.0.20".to_owned()));
        assert_eq!(parse_version_token("no digits here\n4.0.0 below"), None);
    }

    #[test]
    fn no_version_token_is_absent() {
        assert_eq!(parse_version_token(""), None);
        assert_eq!(parse_version_token("command not understood"), None);
    }

    #[test]
    fn candidate_list_is_never_empty() {
        assert!(!candidate_paths().is_empty());
    }
}
