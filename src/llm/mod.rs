//! LLM 层：客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock），失败分类与重试

pub mod deepseek;
pub mod failure;
pub mod mock;
pub mod openai;
pub mod retry;
pub mod traits;

pub use deepseek::{create_deepseek_client, DEEPSEEK_CHAT};
pub use failure::{classify, FailureCategory};
pub use mock::{MockLlmClient, ScriptedLlmClient};
pub use openai::{OpenAiClient, StructuredOutput};
pub use retry::{retry_async, RetryConfig, RetryingLlmClient};
pub use traits::{
    CompletionRequest, LlmClient, LlmError, PromptMessage, PromptRole, ResponseSchema,
};
