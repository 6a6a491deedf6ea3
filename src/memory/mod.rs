//! 记忆层：会话记录（只追加）与免责声明确认标记

pub mod conversation;
pub mod persistence;

pub use conversation::{recent_turns, HistoryRole, HistoryTurn, Message, Role, Transcript};
pub use persistence::{DisclaimerGate, DISCLAIMER_TEXT};
