//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url）。
//! 结构化输出两种方式：原生 json_schema，或 json_object + 将 Schema 拼入 system（供不支持 json_schema 的后端）。

use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::error::{ApiError, OpenAIError};
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs, ResponseFormat, ResponseFormatJsonSchema,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::llm::{CompletionRequest, LlmClient, LlmError, PromptRole};

/// 结构化输出方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuredOutput {
    /// response_format = json_schema
    JsonSchema,
    /// response_format = json_object，Schema 以文本形式写入 system
    JsonObject,
}

/// OpenAI 兼容客户端：持有 Client、model 名与结构化输出方式，complete 时取首条 choice 的 content
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    output: StructuredOutput,
}

impl OpenAiClient {
    pub fn new(base_url: Option<&str>, model: &str, api_key: Option<&str>) -> Self {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_else(|| "sk-placeholder".to_string());

        let config = if let Some(url) = base_url {
            OpenAIConfig::new().with_api_base(url).with_api_key(api_key)
        } else {
            OpenAIConfig::new().with_api_key(api_key)
        };

        Self {
            client: Client::with_config(config).with_backoff(no_backoff()),
            model: model.to_string(),
            output: StructuredOutput::JsonSchema,
        }
    }

    pub fn with_structured_output(mut self, output: StructuredOutput) -> Self {
        self.output = output;
        self
    }

    /// 合成 system 文本：JsonObject 模式下附上 Schema
    fn system_text(&self, request: &CompletionRequest) -> Option<String> {
        match (self.output, &request.schema) {
            (StructuredOutput::JsonObject, Some(schema)) => {
                let schema_text =
                    serde_json::to_string_pretty(&schema.schema).unwrap_or_default();
                let base = request.system.clone().unwrap_or_default();
                Some(format!(
                    "{base}\n\nRespond ONLY with a single JSON object ({}) that matches this JSON Schema:\n{schema_text}",
                    schema.description
                ))
            }
            _ => request.system.clone(),
        }
    }

    fn to_openai_messages(
        &self,
        request: &CompletionRequest,
    ) -> Result<Vec<ChatCompletionRequestMessage>, LlmError> {
        let invalid = |e: OpenAIError| LlmError::InvalidRequest(e.to_string());
        let mut out = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = self.system_text(request) {
            out.push(ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system)
                    .build()
                    .map_err(invalid)?,
            ));
        }
        for m in &request.messages {
            let msg = match m.role {
                PromptRole::System => ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .map_err(invalid)?,
                ),
                PromptRole::User => ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .map_err(invalid)?,
                ),
                PromptRole::Assistant => ChatCompletionRequestMessage::Assistant(
                    ChatCompletionRequestAssistantMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .map_err(invalid)?,
                ),
            };
            out.push(msg);
        }
        Ok(out)
    }

    fn response_format(&self, request: &CompletionRequest) -> Option<ResponseFormat> {
        let schema = request.schema.as_ref()?;
        Some(match self.output {
            StructuredOutput::JsonSchema => ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    description: Some(schema.description.clone()),
                    name: schema.name.clone(),
                    schema: Some(schema.schema.clone()),
                    strict: Some(false),
                },
            },
            StructuredOutput::JsonObject => ResponseFormat::JsonObject,
        })
    }
}

/// 关闭 async-openai 内置的退避：首个瞬时错误即返回，重试只由 RetryingLlmClient 负责
fn no_backoff() -> backoff::ExponentialBackoff {
    backoff::ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}

/// async-openai 对 5xx 不解析响应体，原样放进 ApiError.message 且不带 type/code；
/// 4xx 的 message 则是解析出的错误描述
fn is_raw_server_body(err: &ApiError) -> bool {
    if err.r#type.is_some() || err.code.is_some() {
        return false;
    }
    let body = err.message.trim_start();
    body.is_empty() || body.starts_with('{') || body.starts_with('<')
}

fn map_openai_error(err: OpenAIError) -> LlmError {
    match err {
        OpenAIError::ApiError(api) if is_raw_server_body(&api) => LlmError::Server(api.message),
        OpenAIError::InvalidArgument(msg) => LlmError::InvalidRequest(msg),
        other => LlmError::api(other.to_string()),
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model)
            .messages(self.to_openai_messages(request)?);
        if let Some(format) = self.response_format(request) {
            args.response_format(format);
        }
        let body = args
            .build()
            .map_err(|e| LlmError::InvalidRequest(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(body)
            .await
            .map_err(map_openai_error)?;

        if let Some(usage) = &response.usage {
            tracing::debug!(
                "{} usage: prompt={} completion={}",
                self.model,
                usage.prompt_tokens,
                usage.completion_tokens
            );
        }

        Ok(response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        &self.model
    }
}
