//! Mock analyst for deterministic testing.
//!
//! Returns pre-configured responses without making any HTTP calls.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use adpilot_core::{PilotError, Proposal, Result};

use crate::client::{AnalysisRequest, AnalysisResponse, Analyst, OverallHealth};

/// A pre-configured reply from the mock analyst.
#[derive(Clone)]
pub enum MockReply {
    Response(AnalysisResponse),
    Timeout,
    Malformed(String),
}

/// A mock analyst that replays queued replies in order.
pub struct MockAnalyst {
    replies: Arc<Mutex<Vec<MockReply>>>,
    /// Every request received, for assertions in tests.
    pub requests: Arc<Mutex<Vec<AnalysisRequest>>>,
}

impl Default for MockAnalyst {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAnalyst {
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a successful response with the given proposals.
    pub fn with_proposals(self, health: OverallHealth, proposals: Vec<Proposal>) -> Self {
        self.replies.lock().unwrap().push(MockReply::Response(
            AnalysisResponse {
                proposals,
                overall_health: health,
            },
        ));
        self
    }

    /// Queue an empty healthy response.
    pub fn with_quiet_response(self) -> Self {
        self.with_proposals(OverallHealth::Good, vec![])
    }

    /// Queue a timeout.
    pub fn with_timeout(self) -> Self {
        self.replies.lock().unwrap().push(MockReply::Timeout);
        self
    }

    /// Queue a malformed-response failure.
    pub fn with_malformed(self, reason: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push(MockReply::Malformed(reason.to_string()));
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn next_reply(&self) -> MockReply {
        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            MockReply::Response(AnalysisResponse {
                proposals: vec![],
                overall_health: OverallHealth::Good,
            })
        } else {
            replies.remove(0)
        }
    }
}

#[async_trait]
impl Analyst for MockAnalyst {
    fn name(&self) -> &str {
        "mock"
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse> {
        self.requests.lock().unwrap().push(request.clone());
        match self.next_reply() {
            MockReply::Response(response) => Ok(response),
            MockReply::Timeout => Err(PilotError::AnalystTimeout(60)),
            MockReply::Malformed(reason) => Err(PilotError::AnalystMalformed(reason)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::GuardrailSummary;

    fn request() -> AnalysisRequest {
        AnalysisRequest {
            current: vec![],
            trailing: vec![],
            guardrails: GuardrailSummary {
                confidence_threshold: 0.85,
                major_change_fraction: 0.2,
                max_single_budget_increase_fraction: 0.3,
                min_campaign_runtime_hours_before_pause: 72,
                automation_level: "semi".into(),
            },
            pending: vec![],
        }
    }

    #[tokio::test]
    async fn replays_in_order() {
        let analyst = MockAnalyst::new()
            .with_quiet_response()
            .with_timeout();
        assert!(analyst.analyze(&request()).await.is_ok());
        assert!(matches!(
            analyst.analyze(&request()).await,
            Err(PilotError::AnalystTimeout(_))
        ));
        assert_eq!(analyst.request_count(), 2);
    }

    #[tokio::test]
    async fn defaults_to_quiet_response() {
        let analyst = MockAnalyst::new();
        let response = analyst.analyze(&request()).await.unwrap();
        assert!(response.proposals.is_empty());
        assert_eq!(response.overall_health, OverallHealth::Good);
    }
}
