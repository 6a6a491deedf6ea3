//! 会话状态机
//!
//! 所有状态变更都是同步的：用户意图经校验后修改状态，并返回需要执行的远端调用（Effect）；
//! 远端调用的结果以 Completion 的形式经 [`Session::apply`] 回灌。
//! 每个 Effect 带上发出时的 epoch，reset 或开启新场景后 epoch 改变，旧结果被丢弃。

use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::countdown::{Countdown, Tick};
use crate::core::recovery::{fallback_debrief, user_facing_message};
use crate::core::{HintState, Lifecycle, SessionError, UiState};
use crate::llm::LlmError;
use crate::memory::{Message, Transcript};
use crate::proctor::{DebriefRequest, HintRequest, TurnRequest};
use crate::scenario::{DebriefReport, Scenario, ScenarioCategory, ScenarioType, TurnResult, Vitals};

pub const ARRIVAL_PROMPT: &str = "You arrive on scene. What do you do?";
pub const TIMEOUT_NOTICE: &str =
    "TIME EXPIRED: You failed to initiate transport within the required time limit.";
pub const TRANSPORT_NOTICE: &str =
    "You load the patient and initiate transport to the nearest facility.";
pub const RADIO_NOTICE: &str = "RADIO CONNECTED: You are now speaking to the receiving facility (Nurse/Physician). Please provide your report.";
pub const ARRIVAL_HANDOVER: &str =
    "We are arriving at the ED bay. Transferring care to nursing staff.";
pub const EN_ROUTE_PHASE: &str = "En Route";
pub const INITIAL_PHASE: &str = "Dispatch";

/// 需要运行时执行的远端调用
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    GenerateScenario {
        epoch: Uuid,
        scenario_type: ScenarioType,
    },
    ResolveTurn {
        epoch: Uuid,
        request: TurnRequest,
    },
    GenerateDebrief {
        epoch: Uuid,
        request: DebriefRequest,
    },
    FetchHint {
        epoch: Uuid,
        request: HintRequest,
    },
}

impl Effect {
    pub fn epoch(&self) -> Uuid {
        match self {
            Effect::GenerateScenario { epoch, .. }
            | Effect::ResolveTurn { epoch, .. }
            | Effect::GenerateDebrief { epoch, .. }
            | Effect::FetchHint { epoch, .. } => *epoch,
        }
    }
}

/// 远端调用的结果
#[derive(Clone, Debug)]
pub enum Completion {
    Scenario(Result<Scenario, LlmError>),
    Turn(Result<TurnResult, LlmError>),
    Debrief(Result<DebriefReport, LlmError>),
    Hint(Result<String, LlmError>),
}

/// 会话参数（来自配置）
#[derive(Clone, Debug)]
pub struct SessionSettings {
    pub timed_mode: bool,
    pub medical_time_limit: u32,
    pub trauma_time_limit: u32,
    pub typing_grace: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            timed_mode: false,
            medical_time_limit: 720,
            trauma_time_limit: 600,
            typing_grace: Duration::from_millis(1500),
        }
    }
}

impl SessionSettings {
    /// 计时上限取决于远端返回的场景类型，而非用户选择的类别
    pub fn time_limit(&self, scenario_type: ScenarioType) -> u32 {
        match scenario_type {
            ScenarioType::Trauma => self.trauma_time_limit,
            ScenarioType::Medical => self.medical_time_limit,
        }
    }
}

pub struct Session {
    settings: SessionSettings,
    epoch: Uuid,
    lifecycle: Lifecycle,
    scenario: Option<Scenario>,
    transcript: Transcript,
    vitals: Vitals,
    phase_label: String,
    countdown: Countdown,
    debrief: Option<DebriefReport>,
    feedback_log: Vec<String>,
    turn_in_flight: bool,
    scenario_in_flight: bool,
    hint_in_flight: bool,
    hint: HintState,
    report_aid_open: bool,
    alert: Option<String>,
}

impl Session {
    pub fn new(settings: SessionSettings) -> Self {
        let countdown = Countdown::new(settings.typing_grace);
        Self {
            settings,
            epoch: Uuid::new_v4(),
            lifecycle: Lifecycle::Lobby,
            scenario: None,
            transcript: Transcript::new(),
            vitals: Vitals::default(),
            phase_label: String::new(),
            countdown,
            debrief: None,
            feedback_log: Vec::new(),
            turn_in_flight: false,
            scenario_in_flight: false,
            hint_in_flight: false,
            hint: HintState::Hidden,
            report_aid_open: false,
            alert: None,
        }
    }

    pub fn epoch(&self) -> Uuid {
        self.epoch
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn scenario(&self) -> Option<&Scenario> {
        self.scenario.as_ref()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn vitals(&self) -> &Vitals {
        &self.vitals
    }

    pub fn phase_label(&self) -> &str {
        &self.phase_label
    }

    pub fn time_left(&self) -> Option<u32> {
        self.countdown.remaining()
    }

    pub fn debrief(&self) -> Option<&DebriefReport> {
        self.debrief.as_ref()
    }

    /// 隐藏的逐轮反馈，只供内部使用，会话中不展示
    pub fn feedback_log(&self) -> &[String] {
        &self.feedback_log
    }

    pub fn is_turn_pending(&self) -> bool {
        self.turn_in_flight
    }

    pub fn hint(&self) -> &HintState {
        &self.hint
    }

    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    pub fn timed_mode(&self) -> bool {
        self.settings.timed_mode
    }

    /// 只影响下一次开启的场景
    pub fn set_timed_mode(&mut self, on: bool) {
        self.settings.timed_mode = on;
    }

    fn require_scenario(&self) -> Result<Scenario, SessionError> {
        self.scenario.clone().ok_or(SessionError::NoScenario)
    }

    fn reject(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            action,
            state: self.lifecycle,
        }
    }

    fn transition(&mut self, to: Lifecycle) {
        info!("Session {:?} -> {:?}", self.lifecycle, to);
        self.lifecycle = to;
    }

    // ===== 用户意图 =====

    /// Lobby：选择场景类别，发起场景生成
    pub fn select_category<R: Rng + ?Sized>(
        &mut self,
        category: ScenarioCategory,
        rng: &mut R,
    ) -> Result<Effect, SessionError> {
        if self.lifecycle != Lifecycle::Lobby {
            return Err(self.reject("start a scenario"));
        }
        if self.scenario_in_flight {
            return Err(SessionError::ScenarioPending);
        }
        let scenario_type = category.resolve(rng);
        self.epoch = Uuid::new_v4();
        self.scenario_in_flight = true;
        self.alert = None;
        info!("Requesting {} scenario", scenario_type.as_str());
        Ok(Effect::GenerateScenario {
            epoch: self.epoch,
            scenario_type,
        })
    }

    /// Dispatch：确认调度，到达现场
    pub fn acknowledge_dispatch(&mut self) -> Result<(), SessionError> {
        if self.lifecycle != Lifecycle::Dispatch {
            return Err(self.reject("acknowledge dispatch"));
        }
        let scenario = self.require_scenario()?;
        self.transcript.push(Message::narrator(format!(
            "DISPATCH: {}\n\n{}",
            scenario.dispatch_message, ARRIVAL_PROMPT
        )));
        self.transition(Lifecycle::Active);
        Ok(())
    }

    /// 记录一次输入，计时进入宽限期
    pub fn note_typing(&mut self, now: Instant) {
        self.countdown.note_input(now);
    }

    /// Active / Transport：提交自由文本操作
    pub fn submit_action(&mut self, text: &str) -> Result<Effect, SessionError> {
        if !self.lifecycle.accepts_actions() {
            return Err(self.reject("submit an action"));
        }
        if self.turn_in_flight {
            return Err(SessionError::Busy);
        }
        let action = text.trim();
        if action.is_empty() {
            return Err(SessionError::EmptyAction);
        }
        let scenario = self.require_scenario()?;

        // 先取历史再追加本轮操作：本轮操作单独作为最新一条发送
        let history = self.transcript.conversation();
        self.countdown.clear_input();
        self.transcript.push(Message::user(action));
        self.turn_in_flight = true;
        Ok(Effect::ResolveTurn {
            epoch: self.epoch,
            request: TurnRequest {
                scenario,
                history,
                action: action.to_string(),
            },
        })
    }

    /// 请求提示；与逐轮裁决互相独立，但同一时间只允许一个提示请求在途
    pub fn request_hint(&mut self) -> Result<Effect, SessionError> {
        if !self.lifecycle.accepts_actions() {
            return Err(self.reject("request a hint"));
        }
        if self.hint_in_flight {
            return Err(SessionError::HintPending);
        }
        let scenario = self.require_scenario()?;
        self.hint_in_flight = true;
        self.hint = HintState::Loading;
        Ok(Effect::FetchHint {
            epoch: self.epoch,
            request: HintRequest {
                scenario,
                history: self.transcript.conversation(),
            },
        })
    }

    pub fn dismiss_hint(&mut self) {
        self.hint = HintState::Hidden;
    }

    /// Active → Transport：之后计时不再构成失败条件
    pub fn begin_transport(&mut self) -> Result<(), SessionError> {
        if self.lifecycle != Lifecycle::Active {
            return Err(self.reject("begin transport"));
        }
        if self.turn_in_flight {
            return Err(SessionError::Busy);
        }
        self.transcript.push(Message::notice(TRANSPORT_NOTICE));
        self.phase_label = EN_ROUTE_PHASE.to_string();
        self.transition(Lifecycle::Transport);
        Ok(())
    }

    /// Transport：联系医院，打开无线电报告清单
    pub fn call_hospital(&mut self) -> Result<(), SessionError> {
        if self.lifecycle != Lifecycle::Transport {
            return Err(self.reject("contact the hospital"));
        }
        self.transcript.push(Message::notice(RADIO_NOTICE));
        self.report_aid_open = true;
        Ok(())
    }

    pub fn close_report_aid(&mut self) {
        self.report_aid_open = false;
    }

    /// Transport → Evaluating：到达并交接
    pub fn arrive(&mut self) -> Result<Effect, SessionError> {
        if self.lifecycle != Lifecycle::Transport {
            return Err(self.reject("arrive"));
        }
        if self.turn_in_flight {
            return Err(SessionError::Busy);
        }
        self.transcript.push(Message::user(ARRIVAL_HANDOVER));
        self.finalize(false)
    }

    /// 进入 Evaluating 并发起讲评；状态在远端返回前即已切换
    pub fn finalize(&mut self, is_timeout: bool) -> Result<Effect, SessionError> {
        if !self.lifecycle.accepts_actions() {
            return Err(self.reject("finalize"));
        }
        let scenario = self.require_scenario()?;
        self.report_aid_open = false;
        self.transition(Lifecycle::Evaluating);
        Ok(Effect::GenerateDebrief {
            epoch: self.epoch,
            request: DebriefRequest {
                scenario,
                history: self.transcript.conversation(),
                is_timeout,
            },
        })
    }

    /// 每秒一次；Active 中计时归零时触发唯一一次超时
    pub fn tick(&mut self, now: Instant) -> Option<Effect> {
        let active = self.lifecycle == Lifecycle::Active;
        match self.countdown.tick(now, active) {
            Tick::Expired => {
                warn!("Scenario timed out before transport");
                self.transcript.push(Message::notice(TIMEOUT_NOTICE));
                self.finalize(true).ok()
            }
            Tick::Idle | Tick::Counted(_) => None,
        }
    }

    /// 回到 Lobby，丢弃全部会话状态；在途调用的结果会因 epoch 不匹配被丢弃
    pub fn reset(&mut self) {
        let timed_mode = self.settings.timed_mode;
        *self = Session::new(SessionSettings {
            timed_mode,
            ..self.settings.clone()
        });
        info!("Session reset");
    }

    // ===== 远端结果 =====

    pub fn apply(&mut self, epoch: Uuid, completion: Completion) -> Option<Effect> {
        if epoch != self.epoch {
            debug!("Discarding stale completion from epoch {}", epoch);
            return None;
        }
        match completion {
            Completion::Scenario(result) => {
                self.apply_scenario(result);
                None
            }
            Completion::Turn(result) => self.apply_turn(result),
            Completion::Debrief(result) => {
                self.apply_debrief(result);
                None
            }
            Completion::Hint(result) => {
                self.apply_hint(result);
                None
            }
        }
    }

    fn apply_scenario(&mut self, result: Result<Scenario, LlmError>) {
        self.scenario_in_flight = false;
        if self.lifecycle != Lifecycle::Lobby {
            return;
        }
        match result {
            Ok(scenario) => {
                info!("Scenario ready: {}", scenario.title);
                let limit = self
                    .settings
                    .timed_mode
                    .then(|| self.settings.time_limit(scenario.scenario_type));
                self.transcript = Transcript::new();
                self.vitals = Vitals::default();
                self.debrief = None;
                self.feedback_log.clear();
                self.phase_label = INITIAL_PHASE.to_string();
                self.hint = HintState::Hidden;
                self.report_aid_open = false;
                self.countdown.arm(limit);
                self.scenario = Some(scenario);
                self.transition(Lifecycle::Dispatch);
            }
            Err(e) => {
                warn!("Scenario generation failed: {}", e);
                self.alert = Some(format!(
                    "Failed to start scenario: {}",
                    user_facing_message(&e)
                ));
            }
        }
    }

    fn apply_turn(&mut self, result: Result<TurnResult, LlmError>) -> Option<Effect> {
        self.turn_in_flight = false;
        if !self.lifecycle.accepts_actions() {
            debug!("Discarding turn result received in {:?}", self.lifecycle);
            return None;
        }
        match result {
            Ok(turn) => {
                if !turn.narrative.trim().is_empty() {
                    self.transcript.push(Message::narrator(turn.narrative));
                }
                self.vitals.merge(&turn.updated_vitals);
                if !turn.phase.trim().is_empty() {
                    self.phase_label = turn.phase;
                }
                if !turn.feedback.trim().is_empty() {
                    self.feedback_log.push(turn.feedback);
                }
                if !turn.critical_fail.trim().is_empty() {
                    warn!("Critical fail flagged: {}", turn.critical_fail);
                    self.feedback_log
                        .push(format!("CRITICAL FAIL: {}", turn.critical_fail));
                }
                if turn.is_complete {
                    info!("Scenario signalled completion");
                    return self.finalize(false).ok();
                }
                None
            }
            Err(e) => {
                warn!("Turn failed: {}", e);
                self.transcript.push(Message::notice(format!(
                    "Connection error: {}",
                    user_facing_message(&e)
                )));
                None
            }
        }
    }

    fn apply_debrief(&mut self, result: Result<DebriefReport, LlmError>) {
        if self.lifecycle != Lifecycle::Evaluating {
            return;
        }
        let report = result.unwrap_or_else(|e| {
            warn!("Debrief generation failed, using fallback report: {}", e);
            fallback_debrief(&e)
        });
        info!("Debrief ready: passed={} score={}", report.passed, report.score);
        self.debrief = Some(report);
        self.transition(Lifecycle::Debrief);
    }

    fn apply_hint(&mut self, result: Result<String, LlmError>) {
        self.hint_in_flight = false;
        // 面板已关闭则丢弃
        if self.hint != HintState::Loading {
            return;
        }
        self.hint = HintState::Ready(match result {
            Ok(text) => text,
            Err(e) => format!("Unable to retrieve a hint: {}", user_facing_message(&e)),
        });
    }

    /// 投影为 UI 状态
    pub fn project(&self, now: Instant) -> UiState {
        UiState {
            lifecycle: self.lifecycle,
            scenario: self.scenario.clone(),
            transcript: self.transcript.messages().to_vec(),
            vitals: self.vitals.clone(),
            phase_label: self.phase_label.clone(),
            time_left: self.countdown.remaining(),
            timer_paused: self.lifecycle == Lifecycle::Active && self.countdown.is_paused(now),
            turn_pending: self.turn_in_flight,
            scenario_pending: self.scenario_in_flight,
            hint: self.hint.clone(),
            report_aid_open: self.report_aid_open,
            debrief: self.debrief.clone(),
            timed_mode: self.settings.timed_mode,
            alert: self.alert.clone(),
            show_disclaimer: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Role;
    use crate::scenario::{BaselineVitals, Difficulty};

    fn scenario(scenario_type: ScenarioType) -> Scenario {
        Scenario {
            title: "Anaphylaxis".into(),
            dispatch_message: "Respond to a restaurant for a female with difficulty breathing".into(),
            difficulty: Difficulty::Medium,
            scenario_type,
            initial_vitals: BaselineVitals {
                hr: 120.0,
                bp_systolic: 84.0,
                bp_diastolic: 50.0,
                rr: 28.0,
                spo2: 89.0,
                etco2: 30.0,
                bgl: 98.0,
                temp: 98.6,
                skin: "Flushed, hives".into(),
                pupils: "PERRL".into(),
                loc: "Alert".into(),
            },
            environment: "Busy restaurant".into(),
            patient_gender: "Female".into(),
            patient_age: 34,
        }
    }

    fn turn(narrative: &str, vitals: Vitals, complete: bool) -> TurnResult {
        TurnResult {
            narrative: narrative.into(),
            updated_vitals: vitals,
            feedback: String::new(),
            phase: "Primary".into(),
            critical_fail: String::new(),
            is_complete: complete,
        }
    }

    fn report() -> DebriefReport {
        DebriefReport {
            passed: true,
            score: 88.0,
            critical_failures: vec![],
            feedback_summary: "Solid".into(),
            clinical_reasoning: "Good".into(),
        }
    }

    fn timed_settings() -> SessionSettings {
        SessionSettings {
            timed_mode: true,
            ..SessionSettings::default()
        }
    }

    /// 建立一个处于 Active 的会话
    fn active_session(settings: SessionSettings, scenario_type: ScenarioType) -> Session {
        let mut session = Session::new(settings);
        let effect = session
            .select_category(ScenarioCategory::Medical, &mut rand::thread_rng())
            .unwrap();
        session.apply(effect.epoch(), Completion::Scenario(Ok(scenario(scenario_type))));
        session.acknowledge_dispatch().unwrap();
        session
    }

    #[test]
    fn test_scenario_success_enters_dispatch() {
        let mut session = Session::new(SessionSettings::default());
        let effect = session
            .select_category(ScenarioCategory::Trauma, &mut rand::thread_rng())
            .unwrap();
        assert!(matches!(
            effect,
            Effect::GenerateScenario { scenario_type: ScenarioType::Trauma, .. }
        ));
        assert_eq!(
            session.select_category(ScenarioCategory::Trauma, &mut rand::thread_rng()),
            Err(SessionError::ScenarioPending)
        );

        session.apply(effect.epoch(), Completion::Scenario(Ok(scenario(ScenarioType::Trauma))));
        assert_eq!(session.lifecycle(), Lifecycle::Dispatch);
        assert_eq!(session.phase_label(), INITIAL_PHASE);
        assert_eq!(session.time_left(), None);
    }

    #[test]
    fn test_scenario_failure_stays_in_lobby_with_alert() {
        let mut session = Session::new(SessionSettings::default());
        let effect = session
            .select_category(ScenarioCategory::Medical, &mut rand::thread_rng())
            .unwrap();
        session.apply(
            effect.epoch(),
            Completion::Scenario(Err(LlmError::with_status(503, "unavailable"))),
        );
        assert_eq!(session.lifecycle(), Lifecycle::Lobby);
        assert!(session.alert().unwrap().starts_with("Failed to start scenario: AI Service"));
        // 可以重试
        assert!(session
            .select_category(ScenarioCategory::Medical, &mut rand::thread_rng())
            .is_ok());
    }

    #[test]
    fn test_time_limit_follows_returned_type() {
        let medical = active_session(timed_settings(), ScenarioType::Medical);
        assert_eq!(medical.time_left(), Some(720));
        let trauma = active_session(timed_settings(), ScenarioType::Trauma);
        assert_eq!(trauma.time_left(), Some(600));
    }

    #[test]
    fn test_acknowledge_appends_arrival_narration() {
        let session = active_session(SessionSettings::default(), ScenarioType::Medical);
        assert_eq!(session.lifecycle(), Lifecycle::Active);
        let first = session.transcript().last().unwrap();
        assert_eq!(first.role, Role::Narrator);
        assert!(first.content.starts_with("DISPATCH: Respond to a restaurant"));
        assert!(first.content.ends_with(ARRIVAL_PROMPT));
    }

    #[test]
    fn test_submit_merges_vitals_without_unsetting() {
        let mut session = active_session(SessionSettings::default(), ScenarioType::Medical);
        let effect = session.submit_action("  check vitals ").unwrap();
        let Effect::ResolveTurn { ref request, .. } = effect else {
            panic!("expected turn effect");
        };
        assert_eq!(request.action, "check vitals");
        assert_eq!(request.history.len(), 1);

        session.apply(
            effect.epoch(),
            Completion::Turn(Ok(turn(
                "BP 84/50",
                Vitals { bp_systolic: Some(84.0), spo2: Some(89.0), ..Vitals::default() },
                false,
            ))),
        );
        let effect = session.submit_action("reassess").unwrap();
        session.apply(
            effect.epoch(),
            Completion::Turn(Ok(turn(
                "HR 110",
                Vitals { hr: Some(110.0), ..Vitals::default() },
                false,
            ))),
        );

        assert_eq!(session.vitals().hr, Some(110.0));
        assert_eq!(session.vitals().bp_systolic, Some(84.0));
        assert_eq!(session.vitals().spo2, Some(89.0));
        assert_eq!(session.lifecycle(), Lifecycle::Active);
        assert_eq!(session.phase_label(), "Primary");
    }

    #[test]
    fn test_single_turn_in_flight() {
        let mut session = active_session(SessionSettings::default(), ScenarioType::Medical);
        let before = session.transcript().len();
        assert_eq!(session.submit_action("   "), Err(SessionError::EmptyAction));
        let effect = session.submit_action("BSI").unwrap();
        assert_eq!(session.submit_action("scene safe"), Err(SessionError::Busy));
        assert_eq!(session.begin_transport(), Err(SessionError::Busy));
        // 被拒绝的提交不追加消息
        assert_eq!(session.transcript().len(), before + 1);

        session.apply(effect.epoch(), Completion::Turn(Ok(turn("", Vitals::default(), false))));
        assert!(!session.is_turn_pending());
        // 空叙述不追加
        assert_eq!(session.transcript().len(), before + 1);
    }

    #[test]
    fn test_turn_failure_appends_notice_and_keeps_state() {
        let mut session = active_session(SessionSettings::default(), ScenarioType::Medical);
        let effect = session.submit_action("check pulse").unwrap();
        session.apply(effect.epoch(), Completion::Turn(Err(LlmError::api("status 429"))));

        let last = session.transcript().last().unwrap();
        assert_eq!(last.role, Role::Notice);
        assert_eq!(
            last.content,
            "Connection error: System is currently busy (Rate Limit Reached). Please wait a few moments and try again."
        );
        assert_eq!(session.lifecycle(), Lifecycle::Active);
        assert!(session.submit_action("check pulse").is_ok());
    }

    #[test]
    fn test_feedback_is_hidden_but_logged() {
        let mut session = active_session(SessionSettings::default(), ScenarioType::Medical);
        let effect = session.submit_action("give nitro").unwrap();
        let mut result = turn("Patient is hypotensive.", Vitals::default(), false);
        result.feedback = "Check BP before nitro".into();
        result.critical_fail = "Dangerous intervention".into();
        session.apply(effect.epoch(), Completion::Turn(Ok(result)));

        assert_eq!(
            session.feedback_log(),
            &["Check BP before nitro", "CRITICAL FAIL: Dangerous intervention"]
        );
        assert!(session
            .transcript()
            .messages()
            .iter()
            .all(|m| !m.content.contains("CRITICAL FAIL")));
    }

    #[test]
    fn test_complete_in_transport_finalizes() {
        let mut session = active_session(SessionSettings::default(), ScenarioType::Medical);
        session.begin_transport().unwrap();
        assert_eq!(session.phase_label(), EN_ROUTE_PHASE);

        let effect = session.submit_action("reassess en route").unwrap();
        let next = session
            .apply(effect.epoch(), Completion::Turn(Ok(turn("Stable.", Vitals::default(), true))))
            .unwrap();
        assert_eq!(session.lifecycle(), Lifecycle::Evaluating);
        match next {
            Effect::GenerateDebrief { request, .. } => assert!(!request.is_timeout),
            other => panic!("unexpected effect {:?}", other),
        }
    }

    #[test]
    fn test_countdown_timeout_fires_once() {
        let mut settings = timed_settings();
        settings.medical_time_limit = 2;
        let mut session = active_session(settings, ScenarioType::Medical);
        let now = Instant::now();

        assert!(session.tick(now).is_none());
        let effect = session.tick(now).unwrap();
        match effect {
            Effect::GenerateDebrief { ref request, .. } => {
                assert!(request.is_timeout);
                // 超时通知不回放给讲评
                assert!(request.history.iter().all(|h| h.text != TIMEOUT_NOTICE));
            }
            ref other => panic!("unexpected effect {:?}", other),
        }
        assert_eq!(session.lifecycle(), Lifecycle::Evaluating);
        assert_eq!(session.transcript().last().unwrap().content, TIMEOUT_NOTICE);
        assert!(session.tick(now).is_none());

        session.apply(effect.epoch(), Completion::Debrief(Ok(report())));
        assert_eq!(session.lifecycle(), Lifecycle::Debrief);
    }

    #[test]
    fn test_transport_stops_countdown() {
        let mut settings = timed_settings();
        settings.medical_time_limit = 1;
        let mut session = active_session(settings, ScenarioType::Medical);
        session.begin_transport().unwrap();
        for _ in 0..5 {
            assert!(session.tick(Instant::now()).is_none());
        }
        assert_eq!(session.lifecycle(), Lifecycle::Transport);
        assert_eq!(session.time_left(), Some(1));
    }

    #[test]
    fn test_typing_pauses_countdown() {
        let mut session = active_session(timed_settings(), ScenarioType::Medical);
        let now = Instant::now();
        session.note_typing(now);
        session.tick(now + Duration::from_millis(500));
        assert_eq!(session.time_left(), Some(720));
        assert!(session.project(now + Duration::from_millis(500)).timer_paused);
        session.tick(now + Duration::from_secs(2));
        assert_eq!(session.time_left(), Some(719));
    }

    #[test]
    fn test_call_hospital_and_arrive() {
        let mut session = active_session(SessionSettings::default(), ScenarioType::Medical);
        assert!(session.call_hospital().is_err());
        session.begin_transport().unwrap();
        session.call_hospital().unwrap();
        assert!(session.project(Instant::now()).report_aid_open);
        assert_eq!(session.transcript().last().unwrap().content, RADIO_NOTICE);

        let effect = session.arrive().unwrap();
        let Effect::GenerateDebrief { ref request, .. } = effect else {
            panic!("expected debrief effect");
        };
        assert_eq!(request.history.last().unwrap().text, ARRIVAL_HANDOVER);
        assert_eq!(session.lifecycle(), Lifecycle::Evaluating);
        assert!(!session.project(Instant::now()).report_aid_open);
    }

    #[test]
    fn test_debrief_failure_uses_fallback() {
        let mut session = active_session(SessionSettings::default(), ScenarioType::Medical);
        session.begin_transport().unwrap();
        let effect = session.arrive().unwrap();
        session.apply(effect.epoch(), Completion::Debrief(Err(LlmError::EmptyResponse)));
        let report = session.debrief().unwrap();
        assert!(!report.passed);
        assert_eq!(report.critical_failures, vec!["Error generating report"]);
        assert_eq!(session.lifecycle(), Lifecycle::Debrief);
    }

    #[test]
    fn test_late_turn_after_timeout_is_ignored() {
        let mut settings = timed_settings();
        settings.medical_time_limit = 1;
        let mut session = active_session(settings, ScenarioType::Medical);
        let turn_effect = session.submit_action("check airway").unwrap();
        let debrief_effect = session.tick(Instant::now()).unwrap();

        let again = session.apply(
            turn_effect.epoch(),
            Completion::Turn(Ok(turn("late", Vitals::default(), true))),
        );
        assert!(again.is_none());
        assert_eq!(session.transcript().last().unwrap().content, TIMEOUT_NOTICE);

        session.apply(debrief_effect.epoch(), Completion::Debrief(Ok(report())));
        assert_eq!(session.debrief().unwrap().score, 88.0);
    }

    #[test]
    fn test_stale_completion_after_reset_is_discarded() {
        let mut session = active_session(timed_settings(), ScenarioType::Medical);
        let effect = session.submit_action("check pulse").unwrap();
        session.reset();
        assert_eq!(session.lifecycle(), Lifecycle::Lobby);
        assert!(session.timed_mode());

        session.apply(
            effect.epoch(),
            Completion::Turn(Ok(turn("stale", Vitals { hr: Some(1.0), ..Vitals::default() }, false))),
        );
        assert!(session.transcript().is_empty());
        assert_eq!(session.vitals().hr, None);
    }

    #[test]
    fn test_hint_lifecycle() {
        let mut session = active_session(SessionSettings::default(), ScenarioType::Medical);
        let turn_effect = session.submit_action("BSI").unwrap();
        // 逐轮裁决在途时仍可请求提示
        let hint_effect = session.request_hint().unwrap();
        assert_eq!(session.request_hint(), Err(SessionError::HintPending));
        assert_eq!(session.hint(), &HintState::Loading);

        session.apply(hint_effect.epoch(), Completion::Hint(Err(LlmError::api("Proxying failed"))));
        match session.hint() {
            HintState::Ready(text) => assert!(text.starts_with("Unable to retrieve a hint: Connection")),
            other => panic!("unexpected hint state {:?}", other),
        }
        assert!(session.is_turn_pending());
        let len = session.transcript().len();

        let hint_effect = session.request_hint().unwrap();
        session.dismiss_hint();
        session.apply(hint_effect.epoch(), Completion::Hint(Ok("Check the airway".into())));
        assert_eq!(session.hint(), &HintState::Hidden);
        assert_eq!(session.transcript().len(), len);

        session.apply(turn_effect.epoch(), Completion::Turn(Ok(turn("ok", Vitals::default(), false))));
        assert_eq!(session.lifecycle(), Lifecycle::Active);
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        let mut session = Session::new(SessionSettings::default());
        assert!(matches!(
            session.submit_action("BSI"),
            Err(SessionError::InvalidTransition { state: Lifecycle::Lobby, .. })
        ));
        assert!(session.acknowledge_dispatch().is_err());
        assert!(session.arrive().is_err());
        assert!(session.finalize(false).is_err());
        assert!(session.request_hint().is_err());
        assert!(session.transcript().is_empty());
    }
}
