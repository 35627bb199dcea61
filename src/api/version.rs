//! Session validation against the remote's version and stream start.

use std::fmt;

use super::commands::Commands;
use crate::codec::{Decode, WireBuffer};
use crate::error::Result;
use crate::transport::{BoxFuture, Rejection, SessionValidator, Transport};

/// Protocol version this client speaks.
pub const CLIENT_VERSION: Version = Version::new(1, 4, 0);

/// A `major.minor.patch` protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Versions are compatible when their majors match.
    pub fn is_compatible_with(&self, other: &Version) -> bool {
        self.major == other.major
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Decode for Version {
    fn decode(buf: &mut WireBuffer) -> Result<Self> {
        Ok(Self::new(buf.read()?, buf.read()?, buf.read()?))
    }
}

/// Viewport and frame rate requested when the stream starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 30,
        }
    }
}

/// Validator that checks the remote version and optionally starts the stream.
///
/// Runs while the connection is `Validating`. A major version mismatch is
/// a compatibility rejection; a remote that cannot start rendering is a
/// stream rejection.
#[derive(Debug, Clone, Copy)]
pub struct VersionGate {
    local: Version,
    stream: Option<StreamSettings>,
}

impl VersionGate {
    pub fn new(local: Version) -> Self {
        Self {
            local,
            stream: None,
        }
    }

    /// Also call `startStream` once the version is accepted.
    pub fn start_stream(mut self, settings: StreamSettings) -> Self {
        self.stream = Some(settings);
        self
    }

    pub fn local(&self) -> Version {
        self.local
    }
}

impl Default for VersionGate {
    fn default() -> Self {
        Self::new(CLIENT_VERSION)
    }
}

impl SessionValidator for VersionGate {
    fn validate(&self, transport: Transport) -> BoxFuture<'static, std::result::Result<(), Rejection>> {
        let local = self.local;
        let stream = self.stream;

        Box::pin(async move {
            let commands = Commands::new(transport);

            // An unreadable reply is a broken session, not a version verdict.
            let remote = commands
                .get_version()
                .await
                .map_err(|e| Rejection::Stream(format!("version query failed: {}", e)))?;
            if !remote.is_compatible_with(&local) {
                return Err(Rejection::Compatibility(format!(
                    "remote version {} is incompatible with client version {}",
                    remote, local
                )));
            }
            tracing::debug!("Remote version {} accepted", remote);

            if let Some(s) = stream {
                let started = commands
                    .start_stream(s.width, s.height, s.fps)
                    .await
                    .map_err(|e| Rejection::Stream(format!("stream start failed: {}", e)))?;
                if !started {
                    return Err(Rejection::Stream(format!(
                        "remote could not start a {}x{}@{} stream",
                        s.width, s.height, s.fps
                    )));
                }
            }
            Ok(())
        })
    }
}
