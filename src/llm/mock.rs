//! Mock LLM 客户端（无需 API）
//!
//! - MockLlmClient：按请求的 Schema 名返回固定的合法 JSON，便于离线跑通整场演练
//! - ScriptedLlmClient：按顺序吐出预设结果（含错误），供测试断言调用次数与请求内容

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{CompletionRequest, LlmClient, LlmError, PromptRole};
use crate::proctor::schema::{DEBRIEF_SCHEMA_NAME, SCENARIO_SCHEMA_NAME, TURN_SCHEMA_NAME};

const MOCK_SCENARIO: &str = r#"{
  "title": "Respiratory Distress (Severe Asthma)",
  "dispatchMessage": "Medic 51, respond to 14 Elm Street for a 24-year-old female with difficulty breathing.",
  "difficulty": "Medium",
  "type": "MEDICAL",
  "initialVitals": {
    "hr": 118, "bpSystolic": 142, "bpDiastolic": 88, "rr": 30, "spo2": 89,
    "etco2": 48, "bgl": 104, "temp": 98.9,
    "skin": "Pale, diaphoretic", "pupils": "PERRL", "loc": "Alert, speaking in 2-word sentences"
  },
  "environment": "Second floor apartment, cat hair everywhere",
  "patientGender": "Female",
  "patientAge": 24
}"#;

const MOCK_DEBRIEF: &str = r#"{
  "passed": true,
  "score": 80,
  "criticalFailures": [],
  "feedbackSummary": "Offline practice run: no proctor was available to grade this session in detail.",
  "clinicalReasoning": "The mock backend accepts every completed session."
}"#;

/// 离线 Mock：回显用户最后一条消息作为叙述
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let last_user = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == PromptRole::User)
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");

        let reply = match request.schema_name() {
            Some(SCENARIO_SCHEMA_NAME) => MOCK_SCENARIO.to_string(),
            Some(DEBRIEF_SCHEMA_NAME) => MOCK_DEBRIEF.to_string(),
            Some(TURN_SCHEMA_NAME) => {
                let lower = last_user.to_lowercase();
                let vitals = if lower.contains("vital") {
                    r#"{"hr":116,"bpSystolic":140,"bpDiastolic":86,"rr":28,"spo2":90}"#
                } else {
                    "{}"
                };
                serde_json::json!({
                    "narrative": format!("(mock) The scene responds to: {last_user}"),
                    "updatedVitals": serde_json::from_str::<serde_json::Value>(vitals)
                        .unwrap_or_default(),
                    "feedback": "",
                    "phase": "Assessment",
                    "criticalFail": "",
                    "isComplete": lower.contains("transferring care"),
                })
                .to_string()
            }
            _ => "Have you considered the airway?".to_string(),
        };
        Ok(reply)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// 脚本化客户端：每次 complete 弹出队首结果并记录请求；队列耗尽时返回 EmptyResponse
#[derive(Debug, Default)]
pub struct ScriptedLlmClient {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()));
        self
    }

    pub fn fail(self, err: LlmError) -> Self {
        self.push(Err(err));
        self
    }

    pub fn push(&self, result: Result<String, LlmError>) {
        if let Ok(mut q) = self.replies.lock() {
            q.push_back(result);
        }
    }

    /// 已收到的请求（按调用顺序）
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        if let Ok(mut r) = self.requests.lock() {
            r.push(request.clone());
        }
        self.replies
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or(Err(LlmError::EmptyResponse))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ResponseSchema;

    #[tokio::test]
    async fn test_scripted_client_pops_in_order() {
        let client = ScriptedLlmClient::new()
            .reply("first")
            .fail(LlmError::api("503"));
        let req = CompletionRequest::prompt("x");
        assert_eq!(client.complete(&req).await, Ok("first".to_string()));
        assert!(client.complete(&req).await.is_err());
        assert_eq!(client.complete(&req).await, Err(LlmError::EmptyResponse));
        assert_eq!(client.call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_scenario_is_valid_json() {
        let req = CompletionRequest::prompt("generate").with_schema(ResponseSchema {
            name: SCENARIO_SCHEMA_NAME.into(),
            description: String::new(),
            schema: serde_json::Value::Null,
        });
        let text = MockLlmClient.complete(&req).await.unwrap();
        let scenario: crate::scenario::Scenario = serde_json::from_str(&text).unwrap();
        assert_eq!(scenario.patient_age, 24);
    }
}
