/*
This crate is home to everything related to the provisioning service that
hands out broker credentials to the device we're running on.

Given the external identifier and key the device was shipped with, it looks
up the device identity (broker username, password and the channels the
device is allowed to talk on). There is a single lookup per run and no retry.
*/

mod config;
mod identity;
mod resolve;

pub use config::ProvisioningConfig;
pub use identity::{Channel, DeviceIdentity};
pub use resolve::{ResolveError, resolve};

use gateway_util as util;
