//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / DeepSeek / Mock / 脚本化测试客户端）实现 LlmClient：
//! 给定结构化请求（system、对话、可选 JSON Schema），返回模型输出文本或 LlmError。

use async_trait::async_trait;
use thiserror::Error;

use crate::llm::failure::{classify, FailureCategory};

/// 远端调用失败
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    /// 传输或 API 层错误；status 为可识别的 HTTP 状态码（若有）
    #[error("{message}")]
    Api { status: Option<u16>, message: String },

    /// 服务端 5xx，响应体不是可解析的错误描述（可能为空或 HTML）
    #[error("Server error: {0}")]
    Server(String),

    /// 调用「成功」但无内容：不能当作合法数据接受
    #[error("No response from AI")]
    EmptyResponse,

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl LlmError {
    pub fn api(message: impl Into<String>) -> Self {
        LlmError::Api {
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        LlmError::Api {
            status: Some(status),
            message: message.into(),
        }
    }

    /// 按失败分类表归类；只有 Api 与 Server 错误可能是瞬时的
    pub fn category(&self) -> FailureCategory {
        match self {
            LlmError::Api { status, message } => classify(*status, message),
            // 未命中标记的 5xx 视为网关 / 网络不稳定
            LlmError::Server(body) => match classify(None, body) {
                FailureCategory::Unclassified => FailureCategory::Connectivity,
                other => other,
            },
            _ => FailureCategory::Unclassified,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.category().is_transient()
    }
}

/// 提示消息角色（与 Chat API 一致）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromptRole {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: String,
}

impl PromptMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::Assistant,
            content: content.into(),
        }
    }
}

/// 期望的输出 JSON Schema（由 schemars 生成）
#[derive(Clone, Debug, PartialEq)]
pub struct ResponseSchema {
    pub name: String,
    pub description: String,
    pub schema: serde_json::Value,
}

/// 一次补全请求
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub messages: Vec<PromptMessage>,
    pub schema: Option<ResponseSchema>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<PromptMessage>) -> Self {
        Self {
            system: None,
            messages,
            schema: None,
        }
    }

    /// 单条 user 提示
    pub fn prompt(text: impl Into<String>) -> Self {
        Self::new(vec![PromptMessage::user(text)])
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_schema(mut self, schema: ResponseSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn schema_name(&self) -> Option<&str> {
        self.schema.as_ref().map(|s| s.name.as_str())
    }
}

/// LLM 客户端 trait：非流式完成
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;

    /// 后端名（日志用）
    fn name(&self) -> &str {
        "llm"
    }
}
