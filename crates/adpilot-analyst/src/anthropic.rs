//! Anthropic-backed analyst. One request kind, a fixed response schema,
//! and a hard deadline around the whole round-trip.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use adpilot_config::AnalystConfig;
use adpilot_core::{PilotError, Result};

use crate::client::{parse_response, AnalysisRequest, AnalysisResponse, Analyst};

pub struct AnthropicAnalyst {
    client: reqwest::Client,
    config: AnalystConfig,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

impl AnthropicAnalyst {
    pub fn new(config: AnalystConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| PilotError::Config("analyst.api_key is not set".into()))?;
        Ok(Self {
            client: reqwest::Client::new(),
            config,
            api_key,
        })
    }

    fn build_prompt(request: &AnalysisRequest) -> String {
        // The request is already redacted by construction; it serialises to
        // exactly the fields the analyst needs.
        let payload = serde_json::to_string_pretty(request).unwrap_or_default();
        format!(
            "You are an expert advertising budget analyst. Review the campaign \
             performance data below and propose optimization actions.\n\n\
             Input:\n{payload}\n\n\
             Rules:\n\
             - Only propose kinds from: PAUSE, RESUME, INCREASE_BUDGET, \
             DECREASE_BUDGET, REALLOCATE.\n\
             - Do not repeat proposals already listed under \"pending\".\n\
             - Respect the guardrails given; low-confidence ideas are wasted.\n\n\
             Return a single JSON object, no extra text:\n\
             {{\n\
             \"overall_health\": \"EXCELLENT\" | \"GOOD\" | \"FAIR\" | \"POOR\" | \"CRITICAL\",\n\
             \"proposals\": [{{\n\
             \"platform\": \"<platform id>\",\n\
             \"campaign_id\": \"<id>\",\n\
             \"kind\": \"<kind>\",\n\
             \"current_daily_budget\": <usd>,\n\
             \"proposed_daily_budget\": <usd, for budget kinds>,\n\
             \"confidence\": <0.0-1.0>,\n\
             \"reasoning\": \"<why>\",\n\
             \"expected_impact\": {{\"metric\": \"<metric>\", \"change_percent\": <number>}}\n\
             }}]\n\
             }}"
        )
    }

    async fn call_model(&self, request: &AnalysisRequest) -> Result<String> {
        let body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "messages": [{ "role": "user", "content": Self::build_prompt(request) }],
        });

        let response = self
            .client
            .post(format!("{}/messages", self.config.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await
            .map_err(|e| PilotError::AnalystTransport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PilotError::AnalystTransport(format!(
                "status {status}: {body}"
            )));
        }

        let reply: MessagesResponse = response
            .json()
            .await
            .map_err(|e| PilotError::AnalystMalformed(format!("undecodable envelope: {e}")))?;
        reply
            .content
            .first()
            .map(|block| block.text.clone())
            .ok_or_else(|| PilotError::AnalystMalformed("empty response content".into()))
    }
}

#[async_trait]
impl Analyst for AnthropicAnalyst {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse> {
        let fingerprint = request.fingerprint();
        debug!(
            fingerprint,
            campaigns = request.current.len(),
            pending = request.pending.len(),
            "sending analysis request"
        );

        let deadline = std::time::Duration::from_secs(self.config.timeout_secs);
        let raw = tokio::time::timeout(deadline, self.call_model(request))
            .await
            .map_err(|_| PilotError::AnalystTimeout(self.config.timeout_secs))??;

        let response = parse_response(&raw)?;
        info!(
            fingerprint,
            health = %response.overall_health,
            proposals = response.proposals.len(),
            "analysis complete"
        );
        Ok(response)
    }
}
