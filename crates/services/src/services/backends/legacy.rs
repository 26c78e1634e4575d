use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{BackendError, check_status, join_url, segment_url};

const SERVICE: &str = "legacy agent service";

/// Native input shape of the legacy agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyAgentInput {
    pub task: String,
    pub user_id: String,
    pub campaign_context: Option<Value>,
    pub icp: Option<Value>,
    pub brand: Option<Value>,
    pub constraints: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_context: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyUsage {
    #[serde(default)]
    pub tokens: u64,
    #[serde(default)]
    pub cost_usd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyAgentOutput {
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub usage: Option<LegacyUsage>,
}

/// Direct invocation of a single legacy agent.
#[async_trait]
pub trait LegacyAgentBackend: Send + Sync {
    async fn invoke(
        &self,
        agent: &str,
        input: &LegacyAgentInput,
    ) -> Result<LegacyAgentOutput, BackendError>;

    async fn ping(&self) -> Result<(), BackendError>;
}

#[derive(Debug, Clone)]
pub struct HttpLegacyBackend {
    client: Client,
    base_url: String,
}

impl HttpLegacyBackend {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl LegacyAgentBackend for HttpLegacyBackend {
    async fn invoke(
        &self,
        agent: &str,
        input: &LegacyAgentInput,
    ) -> Result<LegacyAgentOutput, BackendError> {
        let url = segment_url(&self.base_url, "agents", &[agent, "invoke"]);
        tracing::debug!("Invoking legacy agent '{}' at {}", agent, url);

        let response = self.client.post(&url).json(input).send().await?;
        let response = check_status(SERVICE, response).await?;
        response
            .json::<LegacyAgentOutput>()
            .await
            .map_err(|e| BackendError::Malformed {
                service: SERVICE,
                detail: e.to_string(),
            })
    }

    async fn ping(&self) -> Result<(), BackendError> {
        let response = self
            .client
            .get(join_url(&self.base_url, "health"))
            .send()
            .await?;
        check_status(SERVICE, response).await.map(|_| ())
    }
}
