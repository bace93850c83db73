use thiserror::Error;
use tracing::{Span, debug, field, info, instrument};

use crate::util::http::{Auth, Client, ClientError, InvalidUriError, Method, StatusCode};

use super::config::ProvisioningConfig;
use super::identity::DeviceIdentity;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Invalid provisioning endpoint URI: {0}")]
    InvalidUri(#[from] InvalidUriError),

    #[error("Provisioning request failed: {0}")]
    Transport(#[from] ClientError),

    #[error("Provisioning service returned error: ({0}) {1}")]
    Status(StatusCode, String),

    #[error("Response decoding failed: {0}")]
    Decoding(#[from] serde_json::Error),
}

/// Look up the device identity for the configured external id.
///
/// A body that cannot be decoded into a [DeviceIdentity] is an error, there
/// is no partially filled or empty identity.
#[instrument(skip_all, fields(external_id = %config.external_id, status = field::Empty), err)]
pub async fn resolve(config: &ProvisioningConfig) -> Result<DeviceIdentity, ResolveError> {
    let endpoint = config.endpoint()?;
    let client = Client::new(Some(config.timeout)).auth(Some(Auth::Plain {
        token: config.external_key.as_str().to_owned(),
    }));

    debug!("calling provisioning service");
    let response = client.request(Method::GET, &endpoint, |req| req).await?;

    let status = response.status();
    Span::current().record("status", field::display(status));
    info!("response status: {status}");

    if !status.is_success() {
        let err_msg = response.text().await.unwrap_or_default();
        return Err(ResolveError::Status(status, err_msg));
    }

    let body = response.text().await?;
    let identity: DeviceIdentity = serde_json::from_str(&body)?;

    Ok(identity)
}
