//! 核心层：会话状态机、计时器、状态投影、错误归一化与主控循环

pub mod countdown;
pub mod error;
pub mod orchestrator;
pub mod recovery;
pub mod session;
pub mod state;

pub use countdown::{format_clock, Countdown, Tick};
pub use error::SessionError;
pub use orchestrator::{create_llm_from_config, create_session_runtime, spawn_session_runtime, Command};
pub use recovery::{fallback_debrief, user_facing_message};
pub use session::{Completion, Effect, Session, SessionSettings};
pub use state::{HintState, Lifecycle, UiState};
