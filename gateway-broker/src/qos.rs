use rumqttc::QoS;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid QoS '{0}', expected one of 0, 1 or 2")]
pub struct InvalidQosError(String);

/// Parse a numeric QoS level
pub fn parse_qos(s: &str) -> Result<QoS, InvalidQosError> {
    match s.trim().parse::<u8>() {
        Ok(0) => Ok(QoS::AtMostOnce),
        Ok(1) => Ok(QoS::AtLeastOnce),
        Ok(2) => Ok(QoS::ExactlyOnce),
        _ => Err(InvalidQosError(s.to_owned())),
    }
}
