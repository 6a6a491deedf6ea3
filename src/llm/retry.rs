//! 有界重试与指数退避
//!
//! 瞬时失败（限流 / 过载 / 网络）按 initial_delay * multiplier^n 等待后重试，最多 max_retries 次；
//! 非瞬时失败立即返回，不等待。

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::llm::{CompletionRequest, LlmClient, LlmError};

/// 重试策略；默认 3 次重试、首次 2 秒、每次翻倍（2s / 4s / 8s）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_multiplier: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(2000),
            backoff_multiplier: 2,
        }
    }
}

impl RetryConfig {
    /// 不重试
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// 第 retry 次重试（从 0 起）之前的等待时间
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.initial_delay
            .saturating_mul(self.backoff_multiplier.saturating_pow(retry))
    }
}

/// 按策略执行异步操作；只有 LlmError::is_transient 的错误会被重试，最终错误原样返回
pub async fn retry_async<T, Op, Fut>(config: &RetryConfig, mut operation: Op) -> Result<T, LlmError>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut retry = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && retry < config.max_retries => {
                let delay = config.delay_for(retry);
                tracing::warn!(
                    "LLM error ({}). Retrying in {}ms... ({} attempts left)",
                    err,
                    delay.as_millis(),
                    config.max_retries - retry
                );
                tokio::time::sleep(delay).await;
                retry += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// 为任意 LlmClient 加上重试
pub struct RetryingLlmClient {
    inner: Arc<dyn LlmClient>,
    config: RetryConfig,
}

impl RetryingLlmClient {
    pub fn new(inner: Arc<dyn LlmClient>, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl LlmClient for RetryingLlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        retry_async(&self.config, || self.inner.complete(request)).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
