use std::time::Duration;

use crate::util::http::{InvalidUriError, Uri};
use crate::util::types::{ExternalId, ExternalKey};

/// Provisioning service configuration
#[derive(Clone, Debug)]
pub struct ProvisioningConfig {
    /// Base URL of the provisioning service. The external id is appended
    /// verbatim, so this usually ends with a `/`.
    pub server_url: String,

    pub external_id: ExternalId,
    pub external_key: ExternalKey,

    pub timeout: Duration,
}

impl ProvisioningConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(server_url: String, external_id: ExternalId, external_key: ExternalKey) -> Self {
        Self {
            server_url,
            external_id,
            external_key,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    /// The identity lookup endpoint, `{server_url}{external_id}`
    pub fn endpoint(&self) -> Result<Uri, InvalidUriError> {
        Uri::from_string(format!("{}{}", self.server_url, self.external_id))
    }
}
