//! 会话记录：只追加的消息序列
//!
//! 每条消息带角色（用户 / 叙述者 / 系统通知）、内容与时间戳；插入顺序有意义，
//! 会被回放给远端作为对话上下文（系统通知除外）。

use serde::{Deserialize, Serialize};

/// 消息角色
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    /// 场景 / 患者的叙述（远端的 model 角色）
    Narrator,
    /// 本地系统通知，不回放给远端
    Notice,
}

/// 单条消息
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    /// 毫秒时间戳
    pub timestamp: i64,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn narrator(content: impl Into<String>) -> Self {
        Self::new(Role::Narrator, content)
    }

    pub fn notice(content: impl Into<String>) -> Self {
        Self::new(Role::Notice, content)
    }
}

/// 回放给远端的对话角色
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryRole {
    User,
    Model,
}

impl HistoryRole {
    pub fn label(&self) -> &'static str {
        match self {
            HistoryRole::User => "USER",
            HistoryRole::Model => "MODEL",
        }
    }
}

/// 回放给远端的一轮对话
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryTurn {
    pub role: HistoryRole,
    pub text: String,
}

/// 只追加的会话记录；会话内不修改、不删除已有消息，只有 reset 时整体丢弃
#[derive(Clone, Debug, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// 去掉系统通知后的对话，按原顺序
    pub fn conversation(&self) -> Vec<HistoryTurn> {
        self.messages
            .iter()
            .filter_map(|m| {
                let role = match m.role {
                    Role::User => HistoryRole::User,
                    Role::Narrator => HistoryRole::Model,
                    Role::Notice => return None,
                };
                Some(HistoryTurn {
                    role,
                    text: m.content.clone(),
                })
            })
            .collect()
    }
}

/// 去掉空白条目后保留最近 limit 条
pub fn recent_turns(history: &[HistoryTurn], limit: usize) -> Vec<HistoryTurn> {
    let non_empty: Vec<&HistoryTurn> = history
        .iter()
        .filter(|h| !h.text.trim().is_empty())
        .collect();
    let skip = non_empty.len().saturating_sub(limit);
    non_empty.into_iter().skip(skip).cloned().collect()
}
