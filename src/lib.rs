//! EmtSim - NREMT 场景演练模拟器
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 会话状态机、计时器、状态投影、错误归一化、主控循环
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）、失败分类与重试
//! - **memory**: 会话记录与免责声明确认标记
//! - **observability**: 日志初始化
//! - **proctor**: 考官：场景生成、逐轮裁决、讲评、提示
//! - **scenario**: 领域类型与静态目录（病种、关键标准、器材包）
//! - **ui**: Ratatui TUI 界面
//! - **voice**: 语音播报接口与音色选择

pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod proctor;
pub mod scenario;
pub mod ui;
pub mod voice;
