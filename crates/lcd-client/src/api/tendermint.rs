//! Node and block information

use super::{de_u64, decode, ModuleApi, QueryApi};
use crate::dispatcher::Dispatcher;
use crate::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

/// `default_node_info` as reported by the node
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NodeInfo {
    /// Chain id the node is serving
    pub network: String,
    #[serde(default)]
    pub moniker: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Deserialize)]
struct NodeInfoResponse {
    default_node_info: NodeInfo,
}

#[derive(Deserialize)]
struct Header {
    #[serde(deserialize_with = "de_u64")]
    height: u64,
}

#[derive(Deserialize)]
struct Block {
    header: Header,
}

#[derive(Deserialize)]
struct BlockResponse {
    block: Block,
}

#[derive(Deserialize)]
struct SyncingResponse {
    syncing: bool,
}

#[derive(Clone, Debug)]
pub struct TendermintApi {
    inner: ModuleApi,
}

impl TendermintApi {
    pub fn new(dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            inner: ModuleApi::new("tendermint", "/cosmos/base/tendermint/v1beta1", dispatcher),
        }
    }

    pub async fn node_info(&self) -> Result<NodeInfo> {
        let response = self.get("node_info", &[]).await?;
        let parsed: NodeInfoResponse = decode(response, "node info")?;
        Ok(parsed.default_node_info)
    }

    pub async fn latest_height(&self) -> Result<u64> {
        let response = self.get("blocks/latest", &[]).await?;
        let parsed: BlockResponse = decode(response, "latest block")?;
        Ok(parsed.block.header.height)
    }

    pub async fn syncing(&self) -> Result<bool> {
        let response = self.get("syncing", &[]).await?;
        let parsed: SyncingResponse = decode(response, "syncing")?;
        Ok(parsed.syncing)
    }
}

#[async_trait]
impl QueryApi for TendermintApi {
    fn module(&self) -> &str {
        self.inner.module()
    }

    fn base_path(&self) -> &str {
        self.inner.base_path()
    }

    fn dispatcher(&self) -> &Arc<dyn Dispatcher> {
        self.inner.dispatcher()
    }
}
