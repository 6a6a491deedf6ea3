//! EmtSim - NREMT 场景演练模拟器
//!
//! 入口：加载配置、初始化日志、启动会话运行时与 TUI，并运行主循环。
//! 可选的第一个参数为额外的配置文件路径。

use std::path::PathBuf;

use anyhow::Context;
use emtsim::{
    config::{load_config, AppConfig},
    core::create_session_runtime,
    observability,
    ui::run_app,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let (cfg, config_error) = match load_config(config_path) {
        Ok(cfg) => (cfg, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    // 日志写入 <state_dir>/emtsim.log：终端由 TUI 占用
    observability::init(&cfg.app.state_dir).context("Failed to initialize logging")?;
    if let Some(e) = config_error {
        tracing::warn!("Config load failed ({}), using defaults", e);
    }
    tracing::info!(
        "Starting {}",
        cfg.app.name.as_deref().unwrap_or("NREMT Scenario Emulator")
    );

    let (cmd_tx, state_rx, shutdown) = create_session_runtime(&cfg);

    run_app(state_rx, cmd_tx, shutdown.clone())
        .await
        .context("App run failed")?;

    shutdown.cancel();
    Ok(())
}
