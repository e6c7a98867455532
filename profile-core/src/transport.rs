//! A `web3` transport sending JSON RPC requests through the shared HTTP client
//! so node calls are measured with the other outgoing requests.

use crate::http::{HttpClient, HttpFactory, HttpLabel};
use anyhow::Result;
use ethcontract::jsonrpc::types::{Call, Output, Request};
use ethcontract::web3::helpers;
use ethcontract::web3::{Error as Web3Error, RequestId, Transport};
use futures::future::{BoxFuture, FutureExt};
use serde::Deserialize;
use serde_json::Value;
use std::fmt::{self, Debug, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub type Web3 = ethcontract::web3::api::Web3<HttpTransport>;

/// Creates a web3 instance talking to the node at `url`.
pub fn web3_provider(http_factory: &HttpFactory, url: &str) -> Result<Web3> {
    let transport = HttpTransport::new(http_factory, url)?;
    Ok(Web3::new(transport))
}

#[derive(Clone)]
pub struct HttpTransport(Arc<HttpTransportInner>);

struct HttpTransportInner {
    url: String,
    client: HttpClient,
    id: AtomicUsize,
}

impl HttpTransport {
    pub fn new(http_factory: &HttpFactory, url: impl Into<String>) -> Result<HttpTransport> {
        Ok(HttpTransport(Arc::new(HttpTransportInner {
            url: url.into(),
            client: http_factory.create()?,
            id: AtomicUsize::default(),
        })))
    }
}

type RpcResult = Result<Value, Web3Error>;

impl HttpTransportInner {
    async fn execute(self: Arc<Self>, id: RequestId, call: Call) -> RpcResult {
        let request = serde_json::to_string(&Request::Single(call))?;
        log::debug!("[id:{}] sending request: '{}'", id, request);

        let content = self
            .client
            .post_raw_json_async(self.url.as_str(), request, HttpLabel::Rpc)
            .await
            .map_err(|err| {
                log::warn!("[id:{}] returned an error: '{}'", id, err);
                Web3Error::Transport(err.to_string())
            })?;
        log::debug!("[id:{}] received response: '{}'", id, content.trim());

        let output = Output::deserialize(serde_json::from_str::<Value>(&content)?)?;
        helpers::to_result_from_output(output)
    }
}

impl Debug for HttpTransport {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_tuple("HttpTransport").field(&self.0.url).finish()
    }
}

impl Transport for HttpTransport {
    type Out = BoxFuture<'static, RpcResult>;

    fn prepare(&self, method: &str, params: Vec<Value>) -> (RequestId, Call) {
        let id = self.0.id.fetch_add(1, Ordering::SeqCst);
        (id, helpers::build_request(id, method, params))
    }

    fn send(&self, id: RequestId, request: Call) -> Self::Out {
        self.0.clone().execute(id, request).boxed()
    }
}
