//! 状态定义：生命周期与 UiState 投影
//!
//! UI 只持有轻量的 UiState 快照；完整状态由 Session 维护并投影到 UiState。

use serde::Serialize;

use crate::memory::Message;
use crate::scenario::{DebriefReport, Scenario, Vitals};

/// 会话生命周期：Lobby → Dispatch → Active → Transport → Evaluating → Debrief
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Lifecycle {
    Lobby,
    Dispatch,
    /// 现场处置（计时器只在此阶段走）
    Active,
    /// 转运途中
    Transport,
    /// 讲评生成中
    Evaluating,
    Debrief,
}

impl Lifecycle {
    /// 是否接受自由文本操作
    pub fn accepts_actions(&self) -> bool {
        matches!(self, Lifecycle::Active | Lifecycle::Transport)
    }
}

/// 提示面板状态
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum HintState {
    Hidden,
    Loading,
    Ready(String),
}

/// UI 看到的「投影」状态
#[derive(Clone, Debug, Serialize)]
pub struct UiState {
    pub lifecycle: Lifecycle,
    pub scenario: Option<Scenario>,
    pub transcript: Vec<Message>,
    pub vitals: Vitals,
    pub phase_label: String,
    /// 剩余秒数；None 表示不计时
    pub time_left: Option<u32>,
    /// 用户正在输入，计时暂停
    pub timer_paused: bool,
    pub turn_pending: bool,
    pub scenario_pending: bool,
    pub hint: HintState,
    pub report_aid_open: bool,
    pub debrief: Option<DebriefReport>,
    pub timed_mode: bool,
    /// 大厅提示（如场景生成失败）
    pub alert: Option<String>,
    pub show_disclaimer: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            lifecycle: Lifecycle::Lobby,
            scenario: None,
            transcript: Vec::new(),
            vitals: Vitals::default(),
            phase_label: String::new(),
            time_left: None,
            timer_paused: false,
            turn_pending: false,
            scenario_pending: false,
            hint: HintState::Hidden,
            report_aid_open: false,
            debrief: None,
            timed_mode: false,
            alert: None,
            show_disclaimer: false,
        }
    }
}

impl UiState {
    /// 输入框是否锁定（等待回复或不在可操作阶段）
    pub fn input_locked(&self) -> bool {
        self.turn_pending || !self.lifecycle.accepts_actions()
    }
}
