//! TUI 应用主循环
//!
//! 进入全屏/原始模式，轮询 state_rx 与键盘事件，把按键按当前生命周期转成 Command 发送给编排器，
//! 每帧用 draw 渲染 UiState 与本地输入状态（输入缓冲、弹窗、滚动）。
//!
//! 快捷键：F1 提示 │ F2 开始转运 / 联系医院 │ F3 到达 │ F4 器材包 │ F5 快捷操作 │ F6 静音
//! │ Esc 关闭弹窗 │ Ctrl+R 重新开始 │ Ctrl+Q 退出

use std::io::{self, Stdout};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::core::{Command, HintState, Lifecycle, UiState};
use crate::memory::Role;
use crate::scenario::{
    equipment_prefill, ScenarioCategory, EQUIPMENT_BAGS, QUICK_ACTIONS, RADIO_REPORT_OPENER,
};
use crate::ui::event::EventHandler;
use crate::ui::render::draw;

/// 本地弹窗
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Popup {
    None,
    Equipment { bag: usize, item: usize },
    QuickActions { index: usize },
}

/// UI 本地状态：不经过编排器
pub struct App {
    pub input: String,
    pub popup: Popup,
    pub scroll: usize,
    pub should_quit: bool,
    last_transcript_len: usize,
    /// 已发送、尚未在记录中出现的行动；出现后才清空输入框
    submitted: Option<String>,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self {
            input: String::new(),
            popup: Popup::None,
            scroll: 0,
            should_quit: false,
            last_transcript_len: 0,
            submitted: None,
        }
    }

    /// 有新消息时滚到底部；已提交的行动进入记录后清空输入
    pub fn follow(&mut self, state: &UiState) {
        if let Some(text) = &self.submitted {
            let accepted = state
                .transcript
                .iter()
                .skip(self.last_transcript_len)
                .any(|m| m.role == Role::User && m.content == *text);
            if accepted {
                if self.input.trim() == text {
                    self.input.clear();
                }
                self.submitted = None;
            }
        }
        if state.transcript.len() != self.last_transcript_len {
            self.last_transcript_len = state.transcript.len();
            self.scroll = usize::MAX;
        }
    }

    fn prefill(&mut self, text: impl Into<String>) -> Vec<Command> {
        self.input = text.into();
        self.popup = Popup::None;
        vec![Command::Typing]
    }

    pub fn handle_key(&mut self, key: KeyEvent, state: &UiState) -> Vec<Command> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('q') if ctrl => {
                self.should_quit = true;
                return vec![Command::Quit];
            }
            KeyCode::Char('r') if ctrl => {
                self.input.clear();
                self.submitted = None;
                self.popup = Popup::None;
                self.scroll = 0;
                return vec![Command::Reset];
            }
            KeyCode::F(6) => return vec![Command::ToggleMute],
            _ => {}
        }

        if state.show_disclaimer {
            return match key.code {
                KeyCode::Enter => vec![Command::AcknowledgeDisclaimer],
                _ => Vec::new(),
            };
        }

        match state.lifecycle {
            Lifecycle::Lobby => self.lobby_key(key, state),
            Lifecycle::Dispatch => match key.code {
                KeyCode::Enter => vec![Command::AcknowledgeDispatch],
                _ => Vec::new(),
            },
            Lifecycle::Active | Lifecycle::Transport => self.scene_key(key, state),
            Lifecycle::Evaluating => Vec::new(),
            Lifecycle::Debrief => match key.code {
                KeyCode::Enter => {
                    self.input.clear();
                    vec![Command::Reset]
                }
                _ => {
                    self.scroll_key(key.code);
                    Vec::new()
                }
            },
        }
    }

    fn lobby_key(&mut self, key: KeyEvent, state: &UiState) -> Vec<Command> {
        let category = match key.code {
            KeyCode::Char('1') | KeyCode::Char('m') => ScenarioCategory::Medical,
            KeyCode::Char('2') | KeyCode::Char('t') => ScenarioCategory::Trauma,
            KeyCode::Char('3') | KeyCode::Char('r') => ScenarioCategory::Random,
            KeyCode::Char('x') => return vec![Command::ToggleTimedMode],
            _ => return Vec::new(),
        };
        if state.scenario_pending {
            return Vec::new();
        }
        vec![Command::SelectCategory(category)]
    }

    fn scene_key(&mut self, key: KeyEvent, state: &UiState) -> Vec<Command> {
        match self.popup {
            Popup::Equipment { bag, item } => return self.equipment_key(key.code, bag, item),
            Popup::QuickActions { index } => return self.quick_action_key(key.code, index),
            Popup::None => {}
        }

        match key.code {
            KeyCode::Esc => {
                if state.hint != HintState::Hidden {
                    vec![Command::DismissHint]
                } else if state.report_aid_open {
                    vec![Command::CloseReportAid]
                } else {
                    Vec::new()
                }
            }
            KeyCode::F(1) => vec![Command::RequestHint],
            KeyCode::F(2) if state.lifecycle == Lifecycle::Active => vec![Command::BeginTransport],
            KeyCode::F(2) => {
                let mut cmds = vec![Command::CallHospital];
                cmds.extend(self.prefill(RADIO_REPORT_OPENER));
                cmds
            }
            KeyCode::F(3) if state.lifecycle == Lifecycle::Transport => vec![Command::Arrive],
            KeyCode::F(4) => {
                self.popup = Popup::Equipment { bag: 0, item: 0 };
                Vec::new()
            }
            KeyCode::F(5) => {
                self.popup = Popup::QuickActions { index: 0 };
                Vec::new()
            }
            KeyCode::Enter => {
                if state.turn_pending || self.input.trim().is_empty() {
                    return Vec::new();
                }
                let text = self.input.trim().to_string();
                self.submitted = Some(text.clone());
                vec![Command::Submit(text)]
            }
            KeyCode::Backspace => {
                self.input.pop();
                vec![Command::Typing]
            }
            KeyCode::Char(c) => {
                self.input.push(c);
                vec![Command::Typing]
            }
            other => {
                self.scroll_key(other);
                Vec::new()
            }
        }
    }

    fn equipment_key(&mut self, code: KeyCode, bag: usize, item: usize) -> Vec<Command> {
        let items = EQUIPMENT_BAGS[bag].items;
        match code {
            KeyCode::Esc => self.popup = Popup::None,
            KeyCode::Left => {
                let bag = (bag + EQUIPMENT_BAGS.len() - 1) % EQUIPMENT_BAGS.len();
                self.popup = Popup::Equipment { bag, item: 0 };
            }
            KeyCode::Right | KeyCode::Tab => {
                let bag = (bag + 1) % EQUIPMENT_BAGS.len();
                self.popup = Popup::Equipment { bag, item: 0 };
            }
            KeyCode::Up => {
                self.popup = Popup::Equipment { bag, item: item.saturating_sub(1) };
            }
            KeyCode::Down => {
                let item = (item + 1).min(items.len().saturating_sub(1));
                self.popup = Popup::Equipment { bag, item };
            }
            KeyCode::Enter => {
                if let Some(name) = items.get(item) {
                    return self.prefill(equipment_prefill(name));
                }
            }
            _ => {}
        }
        Vec::new()
    }

    fn quick_action_key(&mut self, code: KeyCode, index: usize) -> Vec<Command> {
        match code {
            KeyCode::Esc => self.popup = Popup::None,
            KeyCode::Up => self.popup = Popup::QuickActions { index: index.saturating_sub(1) },
            KeyCode::Down => {
                let index = (index + 1).min(QUICK_ACTIONS.len() - 1);
                self.popup = Popup::QuickActions { index };
            }
            KeyCode::Enter => {
                if let Some((_, text)) = QUICK_ACTIONS.get(index) {
                    return self.prefill(*text);
                }
            }
            _ => {}
        }
        Vec::new()
    }

    fn scroll_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Up => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::Down => self.scroll = self.scroll.saturating_add(1),
            KeyCode::PageUp => self.scroll = self.scroll.saturating_sub(10),
            KeyCode::PageDown => self.scroll = self.scroll.saturating_add(10),
            KeyCode::Home => self.scroll = 0,
            KeyCode::End => self.scroll = usize::MAX,
            _ => {}
        }
    }
}

/// 运行 TUI：启用原始模式与全屏，循环 poll 事件 + 渲染，退出时恢复终端
pub async fn run_app(
    state_rx: watch::Receiver<UiState>,
    cmd_tx: mpsc::UnboundedSender<Command>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, state_rx, cmd_tx, &shutdown).await;
    restore_terminal(&mut terminal)?;
    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    state_rx: watch::Receiver<UiState>,
    cmd_tx: mpsc::UnboundedSender<Command>,
    shutdown: &CancellationToken,
) -> anyhow::Result<()> {
    let events = EventHandler::new(cmd_tx);
    let mut app = App::new();

    while !app.should_quit && !shutdown.is_cancelled() {
        let state = state_rx.borrow().clone();
        app.follow(&state);

        if let Some(key) = events.poll()? {
            for cmd in app.handle_key(key, &state) {
                if !events.send(cmd) {
                    app.should_quit = true;
                }
            }
        }

        let mut scroll_info = (0usize, 0usize);
        terminal.draw(|f| draw(f, &state, &app, &mut scroll_info))?;
        let (total_lines, viewport_height) = scroll_info;
        app.scroll = app.scroll.min(total_lines.saturating_sub(viewport_height));

        tokio::task::yield_now().await;
    }
    Ok(())
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Message;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn state(lifecycle: Lifecycle) -> UiState {
        UiState {
            lifecycle,
            ..UiState::default()
        }
    }

    #[test]
    fn test_disclaimer_blocks_lobby_keys() {
        let mut app = App::new();
        let mut s = state(Lifecycle::Lobby);
        s.show_disclaimer = true;
        assert!(app.handle_key(key(KeyCode::Char('1')), &s).is_empty());
        assert_eq!(
            app.handle_key(key(KeyCode::Enter), &s),
            vec![Command::AcknowledgeDisclaimer]
        );
    }

    #[test]
    fn test_lobby_selects_category() {
        let mut app = App::new();
        let mut s = state(Lifecycle::Lobby);
        assert_eq!(
            app.handle_key(key(KeyCode::Char('2')), &s),
            vec![Command::SelectCategory(ScenarioCategory::Trauma)]
        );
        s.scenario_pending = true;
        assert!(app.handle_key(key(KeyCode::Char('1')), &s).is_empty());
    }

    #[test]
    fn test_typing_and_submit() {
        let mut app = App::new();
        let mut s = state(Lifecycle::Active);
        for c in "BSI".chars() {
            assert_eq!(app.handle_key(key(KeyCode::Char(c)), &s), vec![Command::Typing]);
        }
        s.turn_pending = true;
        assert!(app.handle_key(key(KeyCode::Enter), &s).is_empty());
        s.turn_pending = false;
        assert_eq!(
            app.handle_key(key(KeyCode::Enter), &s),
            vec![Command::Submit("BSI".into())]
        );
        // 会话接受之前保留输入
        assert_eq!(app.input, "BSI");
        s.transcript.push(Message::user("BSI"));
        s.turn_pending = true;
        app.follow(&s);
        assert!(app.input.is_empty());
    }

    #[test]
    fn test_rejected_submit_keeps_input() {
        let mut app = App::new();
        let mut s = state(Lifecycle::Active);
        s.transcript.push(Message::narrator("You arrive on scene."));
        app.follow(&s);
        app.input = "check pulse".into();
        // 快照滞后：会话其实正忙，提交被拒，记录没有新的用户消息
        assert_eq!(
            app.handle_key(key(KeyCode::Enter), &s),
            vec![Command::Submit("check pulse".into())]
        );
        s.turn_pending = true;
        app.follow(&s);
        assert_eq!(app.input, "check pulse");
    }

    #[test]
    fn test_equipment_prefills_input() {
        let mut app = App::new();
        let s = state(Lifecycle::Active);
        app.handle_key(key(KeyCode::F(4)), &s);
        app.handle_key(key(KeyCode::Right), &s);
        app.handle_key(key(KeyCode::Down), &s);
        let cmds = app.handle_key(key(KeyCode::Enter), &s);
        assert_eq!(cmds, vec![Command::Typing]);
        assert_eq!(app.popup, Popup::None);
        assert_eq!(app.input, equipment_prefill(EQUIPMENT_BAGS[1].items[1]));
    }

    #[test]
    fn test_f2_depends_on_lifecycle() {
        let mut app = App::new();
        assert_eq!(
            app.handle_key(key(KeyCode::F(2)), &state(Lifecycle::Active)),
            vec![Command::BeginTransport]
        );
        assert_eq!(
            app.handle_key(key(KeyCode::F(2)), &state(Lifecycle::Transport)),
            vec![Command::CallHospital, Command::Typing]
        );
        assert_eq!(app.input, RADIO_REPORT_OPENER);
        // Active 中不能直接到达
        assert!(app.handle_key(key(KeyCode::F(3)), &state(Lifecycle::Active)).is_empty());
    }

    #[test]
    fn test_ctrl_shortcuts() {
        let mut app = App::new();
        let s = state(Lifecycle::Evaluating);
        let ctrl_r = KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL);
        assert_eq!(app.handle_key(ctrl_r, &s), vec![Command::Reset]);
        let ctrl_q = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL);
        assert_eq!(app.handle_key(ctrl_q, &s), vec![Command::Quit]);
        assert!(app.should_quit);
    }
}
