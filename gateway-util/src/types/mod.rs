mod device;
mod external;

pub use device::{DeviceId, DeviceKey};
pub use external::{ExternalId, ExternalKey};
