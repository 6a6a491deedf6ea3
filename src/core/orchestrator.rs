//! 会话编排器：主控循环
//!
//! 负责：根据配置创建 LLM、考官与播报器，建立 cmd/state 两通道，
//! 并在后台任务中独占 Session：消费用户命令、回灌远端结果、每秒驱动计时器，并发布 UiState 投影。
//! 远端调用各自在独立任务中执行，结果带 epoch 经完成通道送回；epoch 不匹配的结果被丢弃。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::core::session::{Completion, Effect, Session};
use crate::core::{Lifecycle, SessionError, UiState};
use crate::llm::{
    create_deepseek_client, LlmClient, MockLlmClient, OpenAiClient, RetryingLlmClient,
    DEEPSEEK_CHAT,
};
use crate::memory::{DisclaimerGate, Role};
use crate::proctor::Proctor;
use crate::scenario::ScenarioCategory;
use crate::voice::{LogSynthesizer, Speaker, SpeechSynthesizer, VoiceRole};

/// 从 UI 发往编排器的用户命令
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AcknowledgeDisclaimer,
    /// 切换计时模式（对下一个场景生效）
    ToggleTimedMode,
    SelectCategory(ScenarioCategory),
    AcknowledgeDispatch,
    /// 一次按键或快捷填充，计时进入宽限期
    Typing,
    Submit(String),
    RequestHint,
    DismissHint,
    BeginTransport,
    CallHospital,
    CloseReportAid,
    Arrive,
    ToggleMute,
    /// 回到 Lobby
    Reset,
    Quit,
}

/// 根据配置与环境变量选择 LLM 后端（OpenAI / DeepSeek / Mock），远端后端外包一层重试
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    let has_openai = std::env::var("OPENAI_API_KEY").is_ok();
    let has_deepseek = std::env::var("DEEPSEEK_API_KEY").is_ok();

    let remote: Arc<dyn LlmClient> = match provider.as_str() {
        "mock" => {
            tracing::info!("Using Mock LLM");
            return Arc::new(MockLlmClient);
        }
        "deepseek" if has_deepseek || has_openai => {
            let model = if cfg.llm.model.starts_with("deepseek") {
                cfg.llm.model.as_str()
            } else {
                DEEPSEEK_CHAT
            };
            tracing::info!("Using DeepSeek LLM ({})", model);
            Arc::new(create_deepseek_client(Some(model)))
        }
        _ if has_openai => {
            tracing::info!("Using OpenAI LLM ({})", cfg.llm.model);
            Arc::new(OpenAiClient::new(
                cfg.llm.base_url.as_deref(),
                &cfg.llm.model,
                None,
            ))
        }
        _ if has_deepseek => {
            tracing::info!("Only DEEPSEEK_API_KEY set, using DeepSeek LLM ({})", DEEPSEEK_CHAT);
            Arc::new(create_deepseek_client(None))
        }
        _ => {
            tracing::warn!("No API key set, using Mock LLM");
            return Arc::new(MockLlmClient);
        }
    };
    Arc::new(RetryingLlmClient::new(remote, cfg.retry_config()))
}

/// 用默认后端与静默播报器启动运行时
pub fn create_session_runtime(
    cfg: &AppConfig,
) -> (mpsc::UnboundedSender<Command>, watch::Receiver<UiState>, CancellationToken) {
    spawn_session_runtime(cfg, create_llm_from_config(cfg), Arc::new(LogSynthesizer))
}

/// 启动会话运行时：返回命令发送端、状态接收端与退出信号。须在 tokio 运行时内调用。
pub fn spawn_session_runtime(
    cfg: &AppConfig,
    llm: Arc<dyn LlmClient>,
    synth: Arc<dyn SpeechSynthesizer>,
) -> (mpsc::UnboundedSender<Command>, watch::Receiver<UiState>, CancellationToken) {
    let proctor = Arc::new(
        Proctor::new(llm).with_windows(cfg.session.history_window, cfg.session.hint_window),
    );
    let mut runtime = Runtime {
        session: Session::new(cfg.session_settings()),
        disclaimer: DisclaimerGate::load(&cfg.app.state_dir),
        speaker: Speaker::new(synth, cfg.voice.muted),
        spoken: 0,
        last_lifecycle: Lifecycle::Lobby,
    };

    // 两通道：UI -> Core 命令；Core -> UI 状态快照
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<Command>();
    let (state_tx, state_rx) = watch::channel(runtime.project());
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<(Uuid, Completion)>();
    let shutdown = CancellationToken::new();
    let token = shutdown.clone();

    tokio::spawn(async move {
        let period = Duration::from_secs(1);
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let effects: Vec<Effect> = tokio::select! {
                _ = token.cancelled() => break,
                cmd = cmd_rx.recv() => match cmd {
                    Some(Command::Quit) | None => {
                        token.cancel();
                        break;
                    }
                    Some(cmd) => runtime.handle(cmd),
                },
                Some((epoch, completion)) = done_rx.recv() => {
                    runtime.session.apply(epoch, completion).into_iter().collect()
                }
                _ = ticker.tick() => runtime.session.tick(now()).into_iter().collect(),
            };

            for effect in effects {
                spawn_effect(proctor.clone(), effect, done_tx.clone());
            }
            runtime.announce();
            let _ = state_tx.send(runtime.project());
        }
        tracing::info!("Session runtime stopped");
    });

    (cmd_tx, state_rx, shutdown)
}

/// 跟随 tokio 时钟（测试中可暂停）
fn now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}

/// 在独立任务中执行远端调用，结果带 epoch 送回
fn spawn_effect(
    proctor: Arc<Proctor>,
    effect: Effect,
    done_tx: mpsc::UnboundedSender<(Uuid, Completion)>,
) {
    tokio::spawn(async move {
        let epoch = effect.epoch();
        let completion = match effect {
            Effect::GenerateScenario { scenario_type, .. } => {
                Completion::Scenario(proctor.generate_scenario(scenario_type).await)
            }
            Effect::ResolveTurn { request, .. } => {
                Completion::Turn(proctor.resolve_turn(&request).await)
            }
            Effect::GenerateDebrief { request, .. } => {
                Completion::Debrief(proctor.generate_debrief(&request).await)
            }
            Effect::FetchHint { request, .. } => Completion::Hint(proctor.hint(&request).await),
        };
        let _ = done_tx.send((epoch, completion));
    });
}

/// 运行时独占的状态
struct Runtime {
    session: Session,
    disclaimer: DisclaimerGate,
    speaker: Speaker,
    /// 已播报到的消息下标
    spoken: usize,
    last_lifecycle: Lifecycle,
}

impl Runtime {
    fn handle(&mut self, cmd: Command) -> Vec<Effect> {
        let session = &mut self.session;
        let result: Result<Option<Effect>, SessionError> = match cmd {
            Command::AcknowledgeDisclaimer => {
                if let Err(e) = self.disclaimer.acknowledge() {
                    tracing::warn!("Failed to persist disclaimer acknowledgement: {:#}", e);
                }
                Ok(None)
            }
            Command::ToggleTimedMode => {
                let on = !session.timed_mode();
                session.set_timed_mode(on);
                Ok(None)
            }
            Command::SelectCategory(_) if self.disclaimer.needs_acknowledgement() => {
                tracing::debug!("Ignoring scenario selection before disclaimer acknowledgement");
                Ok(None)
            }
            Command::SelectCategory(category) => session
                .select_category(category, &mut rand::thread_rng())
                .map(Some),
            Command::AcknowledgeDispatch => session.acknowledge_dispatch().map(|_| None),
            Command::Typing => {
                session.note_typing(now());
                Ok(None)
            }
            Command::Submit(text) => session.submit_action(&text).map(Some),
            Command::RequestHint => session.request_hint().map(Some),
            Command::DismissHint => {
                session.dismiss_hint();
                Ok(None)
            }
            Command::BeginTransport => session.begin_transport().map(|_| None),
            Command::CallHospital => session.call_hospital().map(|_| None),
            Command::CloseReportAid => {
                session.close_report_aid();
                Ok(None)
            }
            Command::Arrive => session.arrive().map(Some),
            Command::ToggleMute => {
                let muted = !self.speaker.is_muted();
                self.speaker.set_muted(muted);
                Ok(None)
            }
            Command::Reset => {
                session.reset();
                Ok(None)
            }
            Command::Quit => Ok(None),
        };
        match result {
            Ok(effect) => effect.into_iter().collect(),
            Err(e) => {
                tracing::info!("Intent rejected: {}", e);
                Vec::new()
            }
        }
    }

    /// 播报新进入的调度文本与新增的叙述 / 通知
    fn announce(&mut self) {
        let lifecycle = self.session.lifecycle();
        if lifecycle == Lifecycle::Dispatch && self.last_lifecycle != Lifecycle::Dispatch {
            if let Some(scenario) = self.session.scenario() {
                self.speaker.say(&scenario.dispatch_message, VoiceRole::Dispatch);
            }
        }
        self.last_lifecycle = lifecycle;

        let messages = self.session.transcript().messages();
        if messages.len() < self.spoken {
            self.spoken = 0;
        }
        let female = self
            .session
            .scenario()
            .map(|s| s.patient_is_female())
            .unwrap_or(false);
        for (idx, msg) in messages.iter().enumerate().skip(self.spoken) {
            // 第一条是到达现场的叙述，用调度音色
            let role = match msg.role {
                Role::User => continue,
                Role::Notice => VoiceRole::Dispatch,
                Role::Narrator if idx == 0 => VoiceRole::Dispatch,
                Role::Narrator => VoiceRole::Patient { female },
            };
            self.speaker.say(&msg.content, role);
        }
        self.spoken = messages.len();
    }

    fn project(&self) -> UiState {
        let mut state = self.session.project(now());
        state.show_disclaimer = self.disclaimer.needs_acknowledgement();
        state
    }
}
