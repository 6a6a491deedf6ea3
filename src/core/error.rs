//! 会话错误类型
//!
//! 用户意图被拒绝时返回；被拒绝的意图不产生任何副作用。

use thiserror::Error;

use crate::core::Lifecycle;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// 已有一轮裁决在途，不排队
    #[error("A turn is already being resolved")]
    Busy,

    #[error("Action text is empty")]
    EmptyAction,

    #[error("No active scenario")]
    NoScenario,

    #[error("Cannot {action} while in {state:?}")]
    InvalidTransition {
        action: &'static str,
        state: Lifecycle,
    },

    #[error("A hint is already being fetched")]
    HintPending,

    #[error("A scenario is already being generated")]
    ScenarioPending,
}
