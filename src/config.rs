//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `EMTSIM__*` 覆盖（双下划线表示嵌套，如 `EMTSIM__LLM__PROVIDER=mock`）。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::core::SessionSettings;
use crate::llm::RetryConfig;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub session: SessionSection,
    pub llm: LlmSection,
    pub voice: VoiceSection,
}

/// [app] 段：应用名、状态目录（日志与免责声明标记）、是否默认计时
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    pub name: Option<String>,
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
    #[serde(default)]
    pub timed_mode: bool,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            state_dir: default_state_dir(),
            timed_mode: false,
        }
    }
}

fn default_state_dir() -> PathBuf {
    std::env::temp_dir().join("emtsim")
}

/// [session] 段：上下文窗口、输入宽限期、计时上限
#[derive(Debug, Clone, Deserialize)]
pub struct SessionSection {
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    #[serde(default = "default_hint_window")]
    pub hint_window: usize,
    #[serde(default = "default_typing_grace_ms")]
    pub typing_grace_ms: u64,
    #[serde(default = "default_medical_limit")]
    pub medical_time_limit_secs: u32,
    #[serde(default = "default_trauma_limit")]
    pub trauma_time_limit_secs: u32,
}

fn default_history_window() -> usize {
    12
}

fn default_hint_window() -> usize {
    10
}

fn default_typing_grace_ms() -> u64 {
    1500
}

fn default_medical_limit() -> u32 {
    720
}

fn default_trauma_limit() -> u32 {
    600
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            hint_window: default_hint_window(),
            typing_grace_ms: default_typing_grace_ms(),
            medical_time_limit_secs: default_medical_limit(),
            trauma_time_limit_secs: default_trauma_limit(),
        }
    }
}

/// [llm] 段：后端选择与重试
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：openai / deepseek / mock；无 API Key 时一律回退到 mock
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default)]
    pub retry: LlmRetrySection,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            retry: LlmRetrySection::default(),
        }
    }
}

/// [llm.retry] 段：默认 3 次重试，初始 2 秒，每次翻倍
#[derive(Debug, Clone, Deserialize)]
pub struct LlmRetrySection {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: u32,
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    2000
}

fn default_backoff_multiplier() -> u32 {
    2
}

impl Default for LlmRetrySection {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

/// [voice] 段
#[derive(Debug, Clone, Deserialize)]
pub struct VoiceSection {
    #[serde(default = "default_muted")]
    pub muted: bool,
}

fn default_muted() -> bool {
    true
}

impl Default for VoiceSection {
    fn default() -> Self {
        Self {
            muted: default_muted(),
        }
    }
}

impl AppConfig {
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.llm.retry.max_retries,
            initial_delay: Duration::from_millis(self.llm.retry.initial_delay_ms),
            backoff_multiplier: self.llm.retry.backoff_multiplier,
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            timed_mode: self.app.timed_mode,
            medical_time_limit: self.session.medical_time_limit_secs,
            trauma_time_limit: self.session.trauma_time_limit_secs,
            typing_grace: Duration::from_millis(self.session.typing_grace_ms),
        }
    }
}

/// 从 config 目录加载配置，环境变量 EMTSIM__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 EMTSIM__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("EMTSIM")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
