//! Community configuration as published by citizen wallet communities. Only
//! the parts needed to locate and resolve profiles are read.

use anyhow::{anyhow, Context as _, Result};
use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path, str::FromStr};
use url::Url;

#[derive(Clone, Debug, Deserialize)]
pub struct CommunityConfig {
    pub community: Community,
    #[serde(default)]
    pub chains: HashMap<String, Chain>,
    pub ipfs: Ipfs,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Community {
    pub profile: ProfileContract,
}

/// The profile registry contract of a community.
#[derive(Clone, Debug, Deserialize)]
pub struct ProfileContract {
    pub address: String,
    pub chain_id: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Chain {
    pub id: u64,
    pub node: Node,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Node {
    pub url: Url,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Ipfs {
    pub url: Url,
}

impl CommunityConfig {
    /// Reads the configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read community config {}", path.display()))?;
        contents
            .parse()
            .with_context(|| format!("invalid community config {}", path.display()))
    }

    /// The address of the monitored profile registry contract.
    pub fn profile_address(&self) -> &str {
        &self.community.profile.address
    }

    /// The node URL of the chain the profile registry is deployed on.
    pub fn profile_rpc_url(&self) -> Result<&Url> {
        let chain_id = self.community.profile.chain_id;
        self.chains
            .values()
            .find(|chain| chain.id == chain_id)
            .map(|chain| &chain.node.url)
            .ok_or_else(|| anyhow!("no chain configured for profile chain id {}", chain_id))
    }
}

impl FromStr for CommunityConfig {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let config: CommunityConfig = serde_json::from_str(value)?;
        config.profile_rpc_url()?;
        Ok(config)
    }
}
