use std::fmt::Display;
use std::str::FromStr;

use thiserror::Error;

const DEFAULT_PORT: u16 = 1883;

#[derive(Debug, Error)]
#[error("invalid broker address '{0}', expected '[tcp://]<host>[:<port>]' or '[tcp://][<ipv6>][:<port>]'")]
pub struct InvalidAddressError(String);

/// Plain TCP address of an MQTT broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddress {
    host: String,
    port: u16,
}

impl BrokerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Host as it goes in front of `:<port>`, with IPv6 literals bracketed
    pub fn authority_host(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        }
    }
}

impl Default for BrokerAddress {
    fn default() -> Self {
        Self::new("localhost", DEFAULT_PORT)
    }
}

impl Display for BrokerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.authority_host(), self.port)
    }
}

impl FromStr for BrokerAddress {
    type Err = InvalidAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidAddressError(s.to_owned());

        let addr = s.trim();
        let addr = addr
            .strip_prefix("tcp://")
            .or_else(|| addr.strip_prefix("mqtt://"))
            .unwrap_or(addr);

        let parse_port = |port: &str| port.parse::<u16>().map_err(|_| invalid());

        let (host, port) = if let Some(rest) = addr.strip_prefix('[') {
            let (host, rest) = rest.split_once(']').ok_or_else(invalid)?;
            let port = match rest {
                "" => DEFAULT_PORT,
                rest => parse_port(rest.strip_prefix(':').ok_or_else(invalid)?)?,
            };
            if !host.contains(':') {
                return Err(invalid());
            }
            (host, port)
        } else if addr.matches(':').count() > 1 {
            // bare IPv6 literal, no room for a port
            (addr, DEFAULT_PORT)
        } else {
            match addr.rsplit_once(':') {
                Some((host, port)) => (host, parse_port(port)?),
                None => (addr, DEFAULT_PORT),
            }
        };

        if host.is_empty() || host.contains(['/', ' ', '[', ']']) {
            return Err(invalid());
        }

        Ok(Self::new(host, port))
    }
}
