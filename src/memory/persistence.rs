//! 免责声明确认标记
//!
//! 以 state_dir 下的一个标记文件记录「已阅读免责声明」。初始化时读取一次；
//! 标记所在目录（默认系统临时目录）被清理后自动失效，再次启动会重新展示免责声明。

use std::path::{Path, PathBuf};

const MARKER_FILE: &str = "disclaimer_seen";

pub const DISCLAIMER_TEXT: &str = "The NREMT Scenario Emulator is not meant to replace actual EMT instructor monitored patient assessments. The AI used to generate, respond and critique the sample assessments is not a certified EMT instructor. Always defer to your instructor or local EMS protocols whenever there is a question regarding the assessment results.";

#[derive(Debug)]
pub struct DisclaimerGate {
    path: PathBuf,
    acknowledged: bool,
}

impl DisclaimerGate {
    /// 读取 state_dir 下的标记
    pub fn load(state_dir: impl AsRef<Path>) -> Self {
        let path = state_dir.as_ref().join(MARKER_FILE);
        let acknowledged = path.exists();
        Self { path, acknowledged }
    }

    pub fn needs_acknowledgement(&self) -> bool {
        !self.acknowledged
    }

    /// 写入标记；父目录不存在时自动创建
    pub fn acknowledge(&mut self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, "true")?;
        self.acknowledged = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acknowledgement_persists() {
        let dir = tempfile::tempdir().unwrap();
        let state_dir = dir.path().join("nested");

        let mut gate = DisclaimerGate::load(&state_dir);
        assert!(gate.needs_acknowledgement());
        gate.acknowledge().unwrap();
        assert!(!gate.needs_acknowledgement());

        let reloaded = DisclaimerGate::load(&state_dir);
        assert!(!reloaded.needs_acknowledgement());
    }

    #[test]
    fn test_cleared_storage_shows_disclaimer_again() {
        let dir = tempfile::tempdir().unwrap();
        let mut gate = DisclaimerGate::load(dir.path());
        gate.acknowledge().unwrap();
        std::fs::remove_file(dir.path().join(MARKER_FILE)).unwrap();
        assert!(DisclaimerGate::load(dir.path()).needs_acknowledgement());
    }
}
