use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::remote::ProvisioningConfig;
use crate::util::types::{ExternalId, ExternalKey};

/*
    [server]
    URL = "http://localhost:8202/things/bootstrap/"

    [thing]
    external_ID = "..."
    external_key = "..."
*/
#[derive(Debug, Deserialize)]
struct ConfigFile {
    server: ServerSection,
    thing: ThingSection,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
    #[serde(rename = "URL")]
    url: String,
}

#[derive(Debug, Deserialize)]
struct ThingSection {
    #[serde(rename = "external_ID")]
    external_id: ExternalId,
    external_key: ExternalKey,
}

impl From<ConfigFile> for ProvisioningConfig {
    fn from(value: ConfigFile) -> Self {
        ProvisioningConfig::new(
            value.server.url,
            value.thing.external_id,
            value.thing.external_key,
        )
    }
}

/// Read the provisioning configuration from a TOML file
pub fn load(path: &Path) -> Result<ProvisioningConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    parse(&contents).with_context(|| format!("failed to parse config file {}", path.display()))
}

fn parse(contents: &str) -> Result<ProvisioningConfig> {
    let file: ConfigFile = toml::from_str(contents)?;
    Ok(file.into())
}
