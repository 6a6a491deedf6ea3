//! 考官层：四个远端协作者
//!
//! - 场景生成（Scenario Content Provider）
//! - 逐轮裁决（Turn Resolver）
//! - 讲评生成（Debrief Generator）
//! - 提示（Hint）
//!
//! 负责拼装提示词与输出 Schema、调用 LlmClient、把返回文本解析为领域类型。
//! 空响应与无法解析的响应都是硬失败，不会被当作合法数据接受。

pub mod prompts;
pub mod schema;

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::llm::{CompletionRequest, LlmClient, LlmError, PromptMessage};
use crate::memory::{recent_turns, HistoryRole, HistoryTurn};
use crate::scenario::{pick_pathology, DebriefReport, Scenario, ScenarioType, TurnResult};

/// 模型给出空提示时的回退文本
pub const HINT_FALLBACK: &str = "Review your NREMT skill sheets for the next step.";

/// 逐轮裁决请求
#[derive(Clone, Debug, PartialEq)]
pub struct TurnRequest {
    pub scenario: Scenario,
    pub history: Vec<HistoryTurn>,
    pub action: String,
}

/// 讲评请求：history 不含系统通知
#[derive(Clone, Debug, PartialEq)]
pub struct DebriefRequest {
    pub scenario: Scenario,
    pub history: Vec<HistoryTurn>,
    pub is_timeout: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HintRequest {
    pub scenario: Scenario,
    pub history: Vec<HistoryTurn>,
}

/// 从模型输出中取出 JSON：兼容 ```json 代码块与前后多余文字
fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();
    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        return rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim());
    }
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

/// 解析结构化输出；空文本为 EmptyResponse，解析失败为 Malformed
pub fn parse_structured<T: DeserializeOwned>(text: &str) -> Result<T, LlmError> {
    if text.trim().is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    let json = extract_json(text);
    serde_json::from_str(json).map_err(|e| LlmError::Malformed(format!("{e}: {json}")))
}

/// 考官：持有 LLM 与上下文窗口大小
pub struct Proctor {
    llm: Arc<dyn LlmClient>,
    history_window: usize,
    hint_window: usize,
}

impl Proctor {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            history_window: 12,
            hint_window: 10,
        }
    }

    /// 逐轮裁决与提示各自回放的最近消息条数
    pub fn with_windows(mut self, history_window: usize, hint_window: usize) -> Self {
        self.history_window = history_window;
        self.hint_window = hint_window;
        self
    }

    pub async fn generate_scenario(&self, scenario_type: ScenarioType) -> Result<Scenario, LlmError> {
        let pathology = pick_pathology(scenario_type, &mut rand::thread_rng());
        tracing::info!("Generating {} scenario: {}", scenario_type.as_str(), pathology);

        let request = CompletionRequest::prompt(prompts::scenario_prompt(scenario_type, pathology))
            .with_schema(schema::scenario_schema());
        let text = self.llm.complete(&request).await?;
        parse_structured(&text)
    }

    pub async fn resolve_turn(&self, req: &TurnRequest) -> Result<TurnResult, LlmError> {
        let mut messages: Vec<PromptMessage> = recent_turns(&req.history, self.history_window)
            .into_iter()
            .map(|h| match h.role {
                HistoryRole::User => PromptMessage::user(h.text),
                HistoryRole::Model => PromptMessage::assistant(h.text),
            })
            .collect();
        messages.push(PromptMessage::user(req.action.clone()));

        let request = CompletionRequest::new(messages)
            .with_system(prompts::turn_system_prompt(&req.scenario))
            .with_schema(schema::turn_schema());
        let text = self.llm.complete(&request).await?;
        parse_structured(&text)
    }

    pub async fn generate_debrief(&self, req: &DebriefRequest) -> Result<DebriefReport, LlmError> {
        let request = CompletionRequest::prompt(prompts::debrief_prompt(
            &req.scenario,
            &req.history,
            req.is_timeout,
        ))
        .with_schema(schema::debrief_schema());
        let text = self.llm.complete(&request).await?;
        let mut report: DebriefReport = parse_structured(&text)?;
        report.score = report.score.clamp(0.0, 100.0);
        Ok(report)
    }

    /// 自由文本提示；空回复回退为固定文本
    pub async fn hint(&self, req: &HintRequest) -> Result<String, LlmError> {
        let recent = recent_turns(&req.history, self.hint_window);
        let request = CompletionRequest::prompt(prompts::hint_prompt(&req.scenario, &recent));
        let text = self.llm.complete(&request).await?;
        let hint = text.trim();
        if hint.is_empty() {
            Ok(HINT_FALLBACK.to_string())
        } else {
            Ok(hint.to_string())
        }
    }
}
