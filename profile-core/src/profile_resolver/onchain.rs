use super::ProfileResolving;
use crate::{
    config::CommunityConfig,
    http::{HttpClient, HttpFactory, HttpLabel},
    models::{Profile, TokenId},
    transport::{web3_provider, Web3},
};
use anyhow::{anyhow, Context as _, Result};
use ethcontract::{
    common::{
        abi::{self, ParamType, Token},
        hash,
    },
    jsonrpc::types::Error as RpcError,
    web3::{
        types::{BlockId, BlockNumber, Bytes, CallRequest, H160},
        Error as Web3Error,
    },
    U256,
};
use url::Url;

/// Resolves profiles by reading the token URI from the profile registry
/// contract and downloading the metadata document it points to.
#[derive(Debug)]
pub struct OnchainProfileResolver {
    profile_address: H160,
    web3: Web3,
    ipfs_url: Url,
    client: HttpClient,
}

impl OnchainProfileResolver {
    pub fn new(http_factory: &HttpFactory, config: &CommunityConfig) -> Result<Self> {
        let address = config.profile_address();
        let profile_address = address
            .trim_start_matches("0x")
            .parse()
            .with_context(|| format!("invalid profile contract address '{}'", address))?;
        let web3 = web3_provider(http_factory, config.profile_rpc_url()?.as_str())
            .context("failed to initialize web3 transport")?;
        let client = http_factory
            .create()
            .context("failed to initialize HTTP client")?;
        Ok(OnchainProfileResolver {
            profile_address,
            web3,
            ipfs_url: config.ipfs.url.clone(),
            client,
        })
    }

    /// Calls `tokenURI` on the profile contract. Resolves to `None` if the call
    /// reverts, which is what happens for tokens that were never minted or
    /// have been burned.
    async fn token_uri(&self, token_id: U256) -> Result<Option<String>> {
        let request = CallRequest {
            from: None,
            to: Some(self.profile_address),
            gas: None,
            gas_price: None,
            value: None,
            data: Some(encode_token_uri_call(token_id)),
        };
        let block = Some(BlockId::Number(BlockNumber::Latest));
        match self.web3.eth().call(request, block).await {
            Ok(output) => decode_token_uri(&output.0).map(Some),
            Err(Web3Error::Rpc(err)) if is_revert(&err) => {
                log::debug!("tokenURI({}) reverted: {}", token_id, err.message);
                Ok(None)
            }
            Err(err) => Err(err).context("eth_call to profile contract failed"),
        }
    }

    async fn download_profile(&self, uri: &str) -> Result<Option<Profile>> {
        let url = match metadata_url(&self.ipfs_url, uri)? {
            Some(url) => url,
            None => {
                log::warn!("refusing to download profile metadata from '{}'", uri);
                return Ok(None);
            }
        };
        self.client
            .get_json_optional_async(url.as_str(), HttpLabel::Ipfs)
            .await
            .with_context(|| format!("failed to download profile metadata from {}", url))
    }
}

#[async_trait::async_trait]
impl ProfileResolving for OnchainProfileResolver {
    async fn resolve_profile(&self, token_id: &TokenId) -> Result<Option<Profile>> {
        let token_id = match token_id.as_u256() {
            Some(token_id) => token_id,
            None => {
                log::warn!("token id '{}' is not a uint256", token_id);
                return Ok(None);
            }
        };

        let uri = match self.token_uri(token_id).await? {
            Some(uri) if !uri.trim().is_empty() => uri,
            _ => {
                log::debug!("no token URI for profile token {}", token_id);
                return Ok(None);
            }
        };

        log::debug!("downloading profile {} from '{}'", token_id, uri);
        self.download_profile(&uri).await
    }
}

fn encode_token_uri_call(token_id: U256) -> Bytes {
    let mut data = hash::function_selector("tokenURI(uint256)").to_vec();
    data.extend(abi::encode(&[Token::Uint(token_id)]));
    Bytes(data)
}

fn decode_token_uri(output: &[u8]) -> Result<String> {
    let mut tokens = abi::decode(&[ParamType::String], output)
        .map_err(|err| anyhow!("invalid tokenURI output: {:?}", err))?;
    match tokens.pop() {
        Some(Token::String(uri)) => Ok(uri),
        token => Err(anyhow!("unexpected tokenURI output {:?}", token)),
    }
}

/// Geth uses code 3 for reverts with data, other nodes only mention it in the
/// message.
fn is_revert(err: &RpcError) -> bool {
    err.code.code() == 3 || err.message.to_lowercase().contains("revert")
}

/// Maps a token URI to the URL its metadata can be downloaded from. IPFS URIs
/// and bare CIDs go through the configured gateway, as do HTTP URIs pointing
/// at some other gateway's `/ipfs/` path. Any other HTTP location has no
/// downloadable profile.
fn metadata_url(ipfs_url: &Url, uri: &str) -> Result<Option<Url>> {
    let uri = uri.trim();
    let path = if uri.starts_with("http://") || uri.starts_with("https://") {
        let url = match Url::parse(uri) {
            Ok(url) => url,
            Err(_) => return Ok(None),
        };
        if url.origin() == ipfs_url.origin() {
            return Ok(Some(url));
        }
        match url.path().find("/ipfs/") {
            Some(index) => url.path()[index + "/ipfs/".len()..].to_owned(),
            None => return Ok(None),
        }
    } else {
        uri.strip_prefix("ipfs://").unwrap_or(uri).to_owned()
    };

    let path = path.trim_start_matches('/');
    let mut gateway = ipfs_url.clone();
    if !gateway.path().ends_with('/') {
        let prefix = format!("{}/", gateway.path());
        gateway.set_path(&prefix);
    }
    gateway
        .join(path)
        .map(Some)
        .with_context(|| format!("invalid IPFS path '{}'", path))
}
