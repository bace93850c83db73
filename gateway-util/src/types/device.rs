use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::ops::Deref;

/// Broker-side identifier of a device, used as the MQTT username
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId(String);

impl Deref for DeviceId {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for DeviceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for DeviceId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Broker-side secret of a device, used as the MQTT password
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct DeviceKey(String);

impl Deref for DeviceKey {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// keep the secret out of logs
impl std::fmt::Debug for DeviceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DeviceKey(***)")
    }
}

impl From<String> for DeviceKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for DeviceKey {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}
