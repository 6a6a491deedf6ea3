//! 远端失败分类表
//!
//! 状态码与错误描述中的标记子串映射到有限的几类；重试判定与用户提示共用同一张表。
//! 标记匹配不区分大小写，未命中任何标记时为 Unclassified。

/// 可识别的失败类别
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureCategory {
    /// 限流 / 配额耗尽
    RateLimited,
    /// 服务过载
    Overloaded,
    /// 网关 / 网络不稳定
    Connectivity,
    Unclassified,
}

const STATUS_TABLE: &[(u16, FailureCategory)] = &[
    (429, FailureCategory::RateLimited),
    (503, FailureCategory::Overloaded),
    (502, FailureCategory::Connectivity),
    (504, FailureCategory::Connectivity),
];

/// 按顺序匹配，先命中者优先；标记均为小写
const MARKER_TABLE: &[(FailureCategory, &[&str])] = &[
    (
        FailureCategory::RateLimited,
        &["429", "resource_exhausted", "quota", "exhausted", "rate limit", "rate_limit"],
    ),
    (
        FailureCategory::Overloaded,
        &["503", "overloaded", "service unavailable"],
    ),
    (
        FailureCategory::Connectivity,
        &[
            "502",
            "504",
            "bad gateway",
            "gateway timeout",
            "proxying failed",
            "fetch failed",
            "networkerror",
            "error sending request",
        ],
    ),
];

/// 先看结构化状态码，再扫描描述中的标记
pub fn classify(status: Option<u16>, message: &str) -> FailureCategory {
    if let Some(code) = status {
        if let Some((_, category)) = STATUS_TABLE.iter().find(|(c, _)| *c == code) {
            return *category;
        }
    }
    let lower = message.to_lowercase();
    MARKER_TABLE
        .iter()
        .find(|(_, markers)| markers.iter().any(|m| lower.contains(m)))
        .map(|(category, _)| *category)
        .unwrap_or(FailureCategory::Unclassified)
}

impl FailureCategory {
    pub fn is_transient(&self) -> bool {
        !matches!(self, FailureCategory::Unclassified)
    }

    /// 面向用户的提示；Unclassified 返回 None，由调用方回退到原始描述
    pub fn friendly_message(&self) -> Option<&'static str> {
        match self {
            FailureCategory::RateLimited => Some(
                "System is currently busy (Rate Limit Reached). Please wait a few moments and try again.",
            ),
            FailureCategory::Overloaded => {
                Some("AI Service is temporarily overloaded. Please try again in a moment.")
            }
            FailureCategory::Connectivity => Some(
                "Connection instability detected (Proxy/Network Error). Retrying usually fixes this.",
            ),
            FailureCategory::Unclassified => None,
        }
    }
}
