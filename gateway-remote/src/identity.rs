use serde::Deserialize;

use crate::util::types::{DeviceId, DeviceKey};

/*
    response {
        mainflux_id,
        mainflux_key,
        mainflux_channels: [{ id, name }],
        content,
    }
*/
/// Device identity as returned by the provisioning service
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct DeviceIdentity {
    #[serde(rename = "mainflux_id")]
    pub device_id: DeviceId,

    #[serde(rename = "mainflux_key")]
    pub device_key: DeviceKey,

    #[serde(rename = "mainflux_channels", default)]
    pub channels: Vec<Channel>,

    #[serde(default)]
    pub content: String,
}

impl DeviceIdentity {
    /// The channel the gateway talks on by default
    pub fn first_channel(&self) -> Option<&Channel> {
        self.channels.first()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Channel {
    pub id: String,

    #[serde(default)]
    pub name: String,
}
