//! Launching and stopping the HTTP re-broadcast through the player.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command};

use uuid::Uuid;

use crate::error::{Error, Result};

/// Default HTTP port offered by the broadcaster UI.
pub const DEFAULT_PORT: u16 = 8080;

/// Viewer token shown next to a running stream.
///
/// Eight hex characters, regenerated on demand. Display-only: the token is
/// never handed to the player, and the HTTP output accepts connections
/// without it. It exists so the broadcaster has something to share with
/// viewers out of band, nothing more.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn generate() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        AccessToken(hex[..8].to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mux directive asking the player to keep its local display output while
/// duplicating the stream to an HTTP transport-stream sink on `port`.
pub fn sout_directive(port: u16) -> String {
    format!(
        "#duplicate{{dst=display,dst=std{{access=http,mux=ts,dst=:{}}}}}",
        port
    )
}

/// Argument vector handed to the player binary.
pub fn stream_args(source: &Path, port: u16) -> Vec<OsString> {
    vec![
        source.as_os_str().to_owned(),
        OsString::from("--sout"),
        OsString::from(sout_directive(port)),
    ]
}

/// Parse the port field of the UI. Zero is rejected along with anything
/// that is not a u16.
pub fn parse_port(input: &str) -> Result<u16> {
    input
        .trim()
        .parse::<u16>()
        .ok()
        .filter(|port| *port != 0)
        .ok_or_else(|| Error::InvalidPort(input.trim().to_owned()))
}

/// A running re-broadcast: the source being streamed, the display token,
/// the HTTP port, and the player process serving it.
#[derive(Debug)]
pub struct StreamSession {
    source: PathBuf,
    token: AccessToken,
    port: u16,
    child: Child,
}

impl StreamSession {
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn token(&self) -> &AccessToken {
        &self.token
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Local URL viewers connect to.
    pub fn url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }
}

impl Drop for StreamSession {
    // Closing the app or dropping the launcher ends the stream.
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Owns the single active session.
///
/// Starting is rejected while a session is tracked (liveness of the child
/// is not checked, the player is unsupervised after launch); stopping with
/// nothing active is a no-op.
#[derive(Debug, Default)]
pub struct StreamLauncher {
    active: Option<StreamSession>,
}

impl StreamLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&StreamSession> {
        self.active.as_ref()
    }

    /// Spawn the player against `source`, duplicating its output to HTTP on
    /// `port`. The caller supplies the token it is already displaying.
    pub fn start(
        &mut self,
        player: &Path,
        source: &Path,
        token: AccessToken,
        port: u16,
    ) -> Result<&StreamSession> {
        if source.as_os_str().is_empty() {
            return Err(Error::MissingSource);
        }
        if self.active.is_some() {
            return Err(Error::StreamActive);
        }
        let child = Command::new(player)
            .args(stream_args(source, port))
            .spawn()
            .map_err(|e| Error::Launch {
                program: player.to_path_buf(),
                source: e,
            })?;
        log::info!("streaming {} on port {}", source.display(), port);
        Ok(self.active.insert(StreamSession {
            source: source.to_path_buf(),
            token,
            port,
            child,
        }))
    }

    /// Terminate the tracked process, if any. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if self.active.take().is_some() {
            log::info!("stream stopped");
        }
    }
}
