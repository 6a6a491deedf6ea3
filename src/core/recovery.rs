//! 错误归一化与讲评兜底
//!
//! 远端错误先尝试拆出内嵌的 JSON 错误描述，再按失败分类表映射为友好提示；
//! 无法识别时回退到原始描述。归一化本身从不失败。

use crate::llm::{classify, FailureCategory, LlmError};
use crate::scenario::DebriefReport;

/// 若描述中内嵌 `{"error": {"message": ...}}`，取出其中的 message；否则原样返回
pub fn unwrap_nested_message(raw: &str) -> String {
    let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) else {
        return raw.to_string();
    };
    if start >= end {
        return raw.to_string();
    }
    serde_json::from_str::<serde_json::Value>(&raw[start..=end])
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| raw.to_string())
}

/// 无可用描述时的兜底文本
pub const UNKNOWN_ERROR_MESSAGE: &str = "The AI service returned an error without details.";

/// 面向用户的错误描述；从不返回空串
pub fn user_facing_message(err: &LlmError) -> String {
    let raw = err.to_string();
    let message = unwrap_nested_message(&raw);
    let category = match err.category() {
        FailureCategory::Unclassified if matches!(err, LlmError::Api { .. }) => {
            classify(None, &message)
        }
        other => other,
    };
    match category.friendly_message() {
        Some(friendly) => friendly.to_string(),
        None if message.trim().is_empty() => UNKNOWN_ERROR_MESSAGE.to_string(),
        None => message,
    }
}

/// 讲评生成失败时的本地兜底报告：保证会话总能到达 Debrief
pub fn fallback_debrief(err: &LlmError) -> DebriefReport {
    DebriefReport {
        passed: false,
        score: 0.0,
        critical_failures: vec!["Error generating report".to_string()],
        feedback_summary: user_facing_message(err),
        clinical_reasoning: "N/A".to_string(),
    }
}
