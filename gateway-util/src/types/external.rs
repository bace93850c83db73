use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::ops::Deref;

/// Identifier the provisioning service knows a device by
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExternalId(String);

impl Deref for ExternalId {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for ExternalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ExternalId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ExternalId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Secret sent to the provisioning service alongside the [ExternalId]
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct ExternalKey(String);

impl Deref for ExternalKey {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Debug for ExternalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ExternalKey(***)")
    }
}

impl From<String> for ExternalKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ExternalKey {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}
