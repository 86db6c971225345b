use reqwest;
use reqwest::StatusCode;

use super::models::Header;
use super::models::NodeInfo;
use super::NodeError;
use crate::core::types::HeaderID;
use crate::core::types::Height;

#[derive(Debug, Clone)]
pub struct NodeAPI {
    url: String,
    qry_info: String,
}

impl NodeAPI {
    pub fn new(url: &str) -> Self {
        tracing::event!(tracing::Level::INFO, url);
        Self {
            url: String::from(url),
            qry_info: format!("{}/info", url),
        }
    }

    /// Get current node info (trimmed down version)
    pub async fn info(&self) -> Result<NodeInfo, NodeError> {
        let response = self.get(&self.qry_info).await?;
        response
            .json()
            .await
            .map_err(|_| NodeError::DeserializationError)
    }

    /// Get header ID's of blocks at given `height`
    ///
    /// Main chain block comes first, if any.
    pub async fn blocks_at(&self, height: Height) -> Result<Vec<HeaderID>, NodeError> {
        let url = format!("{}/blocks/at/{}", self.url, height);
        let response = self.get(&url).await?;
        response
            .json()
            .await
            .map_err(|_| NodeError::DeserializationError)
    }

    /// Get raw block json from `header_id`
    ///
    /// Parsing the block body is the extractor's job, so pass it on as is.
    pub async fn block_raw(&self, header_id: &HeaderID) -> Result<String, NodeError> {
        let url = format!("{}/blocks/{}", self.url, header_id);
        let response = self.get(&url).await?;
        response
            .text()
            .await
            .map_err(|_| NodeError::DeserializationError)
    }

    /// Get full header from `header_id`
    pub async fn header(&self, header_id: &HeaderID) -> Result<Header, NodeError> {
        let url = format!("{}/blocks/{}/header", self.url, header_id);
        let response = self.get(&url).await?;
        response
            .json()
            .await
            .map_err(|_| NodeError::DeserializationError)
    }
}

impl NodeAPI {
    /// Send a GET request
    async fn get(&self, url: &str) -> Result<reqwest::Response, NodeError> {
        let response = reqwest::get(url)
            .await
            .map_err(|_| NodeError::NodeUnreachable)?;

        match response.status() {
            StatusCode::OK => Ok(response),
            StatusCode::BAD_REQUEST => Err(NodeError::API400BadRequest(url.to_string())),
            StatusCode::NOT_FOUND => Err(NodeError::API404NotFound(url.to_string())),
            _ => Err(NodeError::APIError(url.to_string())),
        }
    }
}
