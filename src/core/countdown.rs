//! 现场计时器
//!
//! 每秒 tick 一次；只在 Active、剩余 > 0 且最近一次输入已超过宽限期时递减。
//! 在 Active 中减到 0 时恰好触发一次超时，之后重复 tick 不再触发。

use std::time::{Duration, Instant};

/// 一次 tick 的结果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    /// 未计时、非 Active 或输入宽限期内
    Idle,
    Counted(u32),
    Expired,
}

#[derive(Debug, Clone)]
pub struct Countdown {
    remaining: Option<u32>,
    grace: Duration,
    last_input: Option<Instant>,
    expired: bool,
}

impl Countdown {
    pub fn new(grace: Duration) -> Self {
        Self {
            remaining: None,
            grace,
            last_input: None,
            expired: false,
        }
    }

    /// 设定剩余秒数；None 为不计时
    pub fn arm(&mut self, seconds: Option<u32>) {
        self.remaining = seconds;
        self.last_input = None;
        self.expired = false;
    }

    pub fn remaining(&self) -> Option<u32> {
        self.remaining
    }

    /// 记录一次输入（按键、快捷填充），进入宽限期
    pub fn note_input(&mut self, now: Instant) {
        self.last_input = Some(now);
    }

    /// 提交后立即结束宽限期
    pub fn clear_input(&mut self) {
        self.last_input = None;
    }

    pub fn is_paused(&self, now: Instant) -> bool {
        self.last_input
            .map(|t| now.saturating_duration_since(t) < self.grace)
            .unwrap_or(false)
    }

    pub fn tick(&mut self, now: Instant, active: bool) -> Tick {
        if !active {
            return Tick::Idle;
        }
        match self.remaining {
            None => Tick::Idle,
            Some(0) => self.expire(),
            Some(_) if self.is_paused(now) => Tick::Idle,
            Some(n) => {
                let left = n - 1;
                self.remaining = Some(left);
                if left == 0 {
                    self.expire()
                } else {
                    Tick::Counted(left)
                }
            }
        }
    }

    fn expire(&mut self) -> Tick {
        if self.expired {
            Tick::Idle
        } else {
            self.expired = true;
            Tick::Expired
        }
    }
}

/// 计时显示：MM:SS
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRACE: Duration = Duration::from_millis(1500);

    #[test]
    fn test_does_not_tick_outside_active() {
        let mut c = Countdown::new(GRACE);
        c.arm(Some(10));
        assert_eq!(c.tick(Instant::now(), false), Tick::Idle);
        assert_eq!(c.remaining(), Some(10));
    }

    #[test]
    fn test_typing_grace_pauses_countdown() {
        let mut c = Countdown::new(GRACE);
        c.arm(Some(10));
        let t0 = Instant::now();
        c.note_input(t0);
        assert_eq!(c.tick(t0 + Duration::from_millis(1000), true), Tick::Idle);
        assert_eq!(c.remaining(), Some(10));
        assert_eq!(c.tick(t0 + Duration::from_millis(1600), true), Tick::Counted(9));

        c.note_input(t0 + Duration::from_millis(1700));
        c.clear_input();
        assert_eq!(c.tick(t0 + Duration::from_millis(1800), true), Tick::Counted(8));
    }

    #[test]
    fn test_expires_exactly_once() {
        let mut c = Countdown::new(GRACE);
        c.arm(Some(2));
        let now = Instant::now();
        assert_eq!(c.tick(now, true), Tick::Counted(1));
        assert_eq!(c.tick(now, true), Tick::Expired);
        assert_eq!(c.tick(now, true), Tick::Idle);
        assert_eq!(c.tick(now, true), Tick::Idle);
        assert_eq!(c.remaining(), Some(0));
    }

    #[test]
    fn test_untimed_never_expires() {
        let mut c = Countdown::new(GRACE);
        for _ in 0..5 {
            assert_eq!(c.tick(Instant::now(), true), Tick::Idle);
        }
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(720), "12:00");
        assert_eq!(format_clock(65), "01:05");
    }
}
