use crate::adb::{DeviceCommander, DeviceState};
use tracing::{info, warn};

/// Stage at which the connection probe gave up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStage {
    ToolMissing,
    NoDevice,
    Unauthorized,
    WrongState,
    DestinationUnwritable,
}

impl ProbeStage {
    /// Actionable text rendered to the user for this failure
    pub fn advice(self) -> &'static str {
        match self {
            Self::ToolMissing => "Install the device bridge tool and make sure it is on PATH",
            Self::NoDevice => "Connect the device over USB and enable file transfer",
            Self::Unauthorized => "Accept the pairing prompt on the device screen",
            Self::WrongState => "Reconnect the device; it is attached but not ready",
            Self::DestinationUnwritable => {
                "The music folder on the device cannot be created or listed"
            }
        }
    }
}

impl std::fmt::Display for ProbeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ToolMissing => "tool missing",
            Self::NoDevice => "no device connected",
            Self::Unauthorized => "device unauthorized",
            Self::WrongState => "device in wrong state",
            Self::DestinationUnwritable => "destination unwritable",
        };
        f.write_str(name)
    }
}

/// Probe failure, tagged with the stage that produced it
#[derive(Debug, Clone, thiserror::Error)]
#[error("Device probe failed ({stage}): {message}")]
pub struct ProbeError {
    pub stage: ProbeStage,
    pub message: String,
}

impl ProbeError {
    fn new(stage: ProbeStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

/// Successful probe result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    /// Serial of the device the probe settled on
    pub serial: String,
    /// The destination directory was missing and had to be created
    pub created_destination: bool,
}

/// Linear, short-circuiting diagnostic chain run before any sync session.
///
/// Stages: tool presence, device reachability, authorization, device state,
/// writable destination. The first failing stage is returned immediately;
/// later stages are never attempted.
pub struct ConnectionProbe<'a> {
    commander: &'a dyn DeviceCommander,
    destination: &'a str,
}

impl<'a> ConnectionProbe<'a> {
    pub fn new(commander: &'a dyn DeviceCommander, destination: &'a str) -> Self {
        Self {
            commander,
            destination,
        }
    }

    pub async fn run(&self) -> Result<ProbeReport, ProbeError> {
        // Stage 1: tool presence
        if let Err(e) = self.commander.version().await {
            warn!("Device tool check failed: {}", e);
            return Err(ProbeError::new(ProbeStage::ToolMissing, e.to_string()));
        }

        // Stage 2: device reachability
        let devices = self
            .commander
            .devices()
            .await
            .map_err(|e| ProbeError::new(ProbeStage::NoDevice, e.to_string()))?;
        let Some(device) = devices.first() else {
            return Err(ProbeError::new(
                ProbeStage::NoDevice,
                "no devices reported by the tool",
            ));
        };

        // Stage 3 and 4: authorization, then readiness
        match &device.state {
            DeviceState::Device => {}
            DeviceState::Unauthorized => {
                return Err(ProbeError::new(
                    ProbeStage::Unauthorized,
                    format!("device {} is unauthorized", device.serial),
                ));
            }
            state => {
                return Err(ProbeError::new(
                    ProbeStage::WrongState,
                    format!("device {} is in state {:?}", device.serial, state),
                ));
            }
        }

        // Stage 5: writable destination, with a single create fallback
        let created = match self
            .commander
            .shell(&format!("ls \"{}\"", self.destination))
            .await
        {
            Ok(_) => false,
            Err(list_err) => {
                info!(
                    "Destination {} not listable ({}), attempting to create it",
                    self.destination, list_err
                );
                self.commander
                    .shell(&format!("mkdir -p \"{}\"", self.destination))
                    .await
                    .map_err(|e| {
                        ProbeError::new(ProbeStage::DestinationUnwritable, e.to_string())
                    })?;
                true
            }
        };

        info!("Device {} ready (destination created: {})", device.serial, created);
        Ok(ProbeReport {
            serial: device.serial.clone(),
            created_destination: created,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adb::DeviceEntry;
    use crate::error::{DeviceError, Result};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;

    /// Scripted commander recording every call it receives
    struct FakeCommander {
        version_ok: bool,
        devices: Vec<DeviceEntry>,
        listable: bool,
        creatable: bool,
        calls: Mutex<Vec<String>>,
    }

    impl FakeCommander {
        fn new() -> Self {
            Self {
                version_ok: true,
                devices: vec![DeviceEntry {
                    serial: "serial-1".to_string(),
                    state: DeviceState::Device,
                }],
                listable: true,
                creatable: true,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DeviceCommander for FakeCommander {
        async fn version(&self) -> Result<String> {
            self.record("version");
            if self.version_ok {
                Ok("Android Debug Bridge version 1.0.41".to_string())
            } else {
                Err(DeviceError::ToolMissing("adb".to_string()))
            }
        }

        async fn devices(&self) -> Result<Vec<DeviceEntry>> {
            self.record("devices");
            Ok(self.devices.clone())
        }

        async fn shell(&self, command: &str) -> Result<String> {
            self.record(format!("shell {}", command));
            let ok = if command.starts_with("ls") {
                self.listable
            } else if command.starts_with("mkdir") {
                self.creatable
            } else {
                true
            };
            if ok {
                Ok(String::new())
            } else {
                Err(DeviceError::CommandFailed {
                    command: command.to_string(),
                    stderr: "denied".to_string(),
                })
            }
        }

        async fn push(&self, local: &Path, remote: &str) -> Result<()> {
            self.record(format!("push {} {}", local.display(), remote));
            Ok(())
        }

        async fn delete_remote(&self, remote: &str) -> Result<()> {
            self.record(format!("rm {}", remote));
            Ok(())
        }
    }

    #[tokio::test]
    async fn ready_device_passes_all_stages() {
        let fake = FakeCommander::new();
        let report = ConnectionProbe::new(&fake, "/sdcard/Music")
            .run()
            .await
            .unwrap();
        assert_eq!(report.serial, "serial-1");
        assert!(!report.created_destination);
    }

    #[tokio::test]
    async fn missing_tool_short_circuits() {
        let mut fake = FakeCommander::new();
        fake.version_ok = false;
        let err = ConnectionProbe::new(&fake, "/sdcard/Music")
            .run()
            .await
            .unwrap_err();
        assert_eq!(err.stage, ProbeStage::ToolMissing);
        assert_eq!(fake.calls(), vec!["version"]);
    }

    #[tokio::test]
    async fn no_devices_reported() {
        let mut fake = FakeCommander::new();
        fake.devices.clear();
        let err = ConnectionProbe::new(&fake, "/sdcard/Music")
            .run()
            .await
            .unwrap_err();
        assert_eq!(err.stage, ProbeStage::NoDevice);
    }

    #[tokio::test]
    async fn unauthorized_device_skips_destination_check() {
        let mut fake = FakeCommander::new();
        fake.devices[0].state = DeviceState::Unauthorized;
        let err = ConnectionProbe::new(&fake, "/sdcard/Music")
            .run()
            .await
            .unwrap_err();
        assert_eq!(err.stage, ProbeStage::Unauthorized);
        assert!(fake.calls().iter().all(|c| !c.starts_with("shell")));
    }

    #[tokio::test]
    async fn offline_device_is_wrong_state() {
        let mut fake = FakeCommander::new();
        fake.devices[0].state = DeviceState::Offline;
        let err = ConnectionProbe::new(&fake, "/sdcard/Music")
            .run()
            .await
            .unwrap_err();
        assert_eq!(err.stage, ProbeStage::WrongState);
    }

    #[tokio::test]
    async fn missing_destination_is_created() {
        let mut fake = FakeCommander::new();
        fake.listable = false;
        let report = ConnectionProbe::new(&fake, "/sdcard/Music")
            .run()
            .await
            .unwrap();
        assert!(report.created_destination);
        assert!(fake
            .calls()
            .iter()
            .any(|c| c.starts_with("shell mkdir -p")));
    }

    #[tokio::test]
    async fn uncreatable_destination_fails_final_stage() {
        let mut fake = FakeCommander::new();
        fake.listable = false;
        fake.creatable = false;
        let err = ConnectionProbe::new(&fake, "/sdcard/Music")
            .run()
            .await
            .unwrap_err();
        assert_eq!(err.stage, ProbeStage::DestinationUnwritable);
    }
}
