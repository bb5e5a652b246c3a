use crate::error::{DeviceError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Configuration for the external device bridge tool
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdbConfig {
    #[serde(default = "default_adb_path")]
    pub adb_path: PathBuf,

    /// Remote directory the library is mirrored into
    #[serde(default = "default_music_dir")]
    pub device_music_dir: String,

    /// Ceiling on retained command output; recursive pushes can emit a lot
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
}

fn default_adb_path() -> PathBuf {
    PathBuf::from("adb")
}

fn default_music_dir() -> String {
    "/sdcard/Music/aria".to_string()
}

fn default_max_output_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for AdbConfig {
    fn default() -> Self {
        Self {
            adb_path: default_adb_path(),
            device_music_dir: default_music_dir(),
            max_output_bytes: default_max_output_bytes(),
        }
    }
}

/// Connection state of an enumerated device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceState {
    /// Connected and authorized
    Device,
    /// Connected but the pairing prompt has not been accepted
    Unauthorized,
    /// Known to the tool but not reachable
    Offline,
    /// Any other state word reported by the tool
    Other(String),
}

impl DeviceState {
    fn parse(word: &str) -> Self {
        match word {
            "device" => Self::Device,
            "unauthorized" => Self::Unauthorized,
            "offline" => Self::Offline,
            other => Self::Other(other.to_string()),
        }
    }
}

/// One row of the tool's device table
#[derive(Debug, Clone)]
pub struct DeviceEntry {
    pub serial: String,
    pub state: DeviceState,
}

/// Seam over the external device tool, faked in tests
#[async_trait]
pub trait DeviceCommander: Send + Sync {
    /// Verify the tool itself is present and runnable
    async fn version(&self) -> Result<String>;

    /// Enumerate connected devices
    async fn devices(&self) -> Result<Vec<DeviceEntry>>;

    /// Run a shell command on the device, returning its stdout
    async fn shell(&self, command: &str) -> Result<String>;

    /// Recursively push a local directory to a remote path
    async fn push(&self, local: &Path, remote: &str) -> Result<()>;

    /// Remove a remote file or directory tree
    async fn delete_remote(&self, remote: &str) -> Result<()>;
}

/// Real [`DeviceCommander`] driving the `adb` binary
#[derive(Debug, Clone)]
pub struct AdbCommander {
    config: AdbConfig,
}

impl AdbCommander {
    pub fn new(config: AdbConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AdbConfig {
        &self.config
    }

    /// Run the tool with the given arguments and capture its output
    async fn run(&self, args: &[&str]) -> Result<String> {
        debug!("adb {}", args.join(" "));

        let output = Command::new(&self.config.adb_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    DeviceError::ToolMissing(self.config.adb_path.display().to_string())
                } else {
                    DeviceError::Io(e)
                }
            })?;

        if !output.status.success() {
            let stderr = truncated_lossy(&output.stderr, self.config.max_output_bytes);
            return Err(DeviceError::CommandFailed {
                command: format!("adb {}", args.join(" ")),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(truncated_lossy(&output.stdout, self.config.max_output_bytes))
    }
}

#[async_trait]
impl DeviceCommander for AdbCommander {
    async fn version(&self) -> Result<String> {
        self.run(&["version"]).await
    }

    async fn devices(&self) -> Result<Vec<DeviceEntry>> {
        let stdout = self.run(&["devices"]).await?;
        Ok(parse_device_table(&stdout))
    }

    async fn shell(&self, command: &str) -> Result<String> {
        self.run(&["shell", command]).await
    }

    async fn push(&self, local: &Path, remote: &str) -> Result<()> {
        let local = local.to_string_lossy().to_string();
        self.run(&["push", &local, remote]).await?;
        Ok(())
    }

    async fn delete_remote(&self, remote: &str) -> Result<()> {
        self.shell(&format!("rm -rf \"{}\"", remote)).await?;
        Ok(())
    }
}

/// Parse the `adb devices` table, skipping the banner line
fn parse_device_table(stdout: &str) -> Vec<DeviceEntry> {
    stdout
        .lines()
        .skip(1)
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let serial = parts.next()?;
            let state = parts.next()?;
            Some(DeviceEntry {
                serial: serial.to_string(),
                state: DeviceState::parse(state),
            })
        })
        .collect()
}

fn truncated_lossy(bytes: &[u8], max: usize) -> String {
    if bytes.len() <= max {
        String::from_utf8_lossy(bytes).into_owned()
    } else {
        String::from_utf8_lossy(&bytes[..max]).into_owned()
    }
}
