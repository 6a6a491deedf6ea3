//! 场景领域类型：场景、体征、单轮结果、讲评报告
//!
//! 字段名与远端 JSON 一致（camelCase），由 serde 直接反序列化模型输出。

use rand::Rng;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// 用户在大厅选择的类别；Random 在本地解析为 Medical / Trauma 之一后再请求
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScenarioCategory {
    Medical,
    Trauma,
    Random,
}

impl ScenarioCategory {
    pub fn resolve<R: Rng + ?Sized>(self, rng: &mut R) -> ScenarioType {
        match self {
            ScenarioCategory::Medical => ScenarioType::Medical,
            ScenarioCategory::Trauma => ScenarioType::Trauma,
            ScenarioCategory::Random => {
                if rng.gen_bool(0.5) {
                    ScenarioType::Medical
                } else {
                    ScenarioType::Trauma
                }
            }
        }
    }
}

/// 场景类型（已解析，不含 Random）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScenarioType {
    #[serde(alias = "Medical")]
    Medical,
    #[serde(alias = "Trauma")]
    Trauma,
}

impl ScenarioType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioType::Medical => "MEDICAL",
            ScenarioType::Trauma => "TRAUMA",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// 当前已揭示的体征：稀疏映射，未揭示的字段为 None（不是 0）
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Vitals {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hr: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bp_systolic: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bp_diastolic: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rr: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spo2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etco2: Option<f64>,
    /// 血糖
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bgl: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp: Option<f64>,
    /// 如 "Pale, cool, diaphoretic"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skin: Option<String>,
    /// 如 "PERRL"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pupils: Option<String>,
    /// AVPU 或 GCS
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<String>,
}

impl Vitals {
    /// 逐字段合并：update 中存在的字段覆盖，缺失的字段保留原值（已揭示的体征不会被清空）
    pub fn merge(&mut self, update: &Vitals) {
        fn take<T: Clone>(slot: &mut Option<T>, incoming: &Option<T>) {
            if let Some(v) = incoming {
                *slot = Some(v.clone());
            }
        }
        take(&mut self.hr, &update.hr);
        take(&mut self.bp_systolic, &update.bp_systolic);
        take(&mut self.bp_diastolic, &update.bp_diastolic);
        take(&mut self.rr, &update.rr);
        take(&mut self.spo2, &update.spo2);
        take(&mut self.etco2, &update.etco2);
        take(&mut self.bgl, &update.bgl);
        take(&mut self.temp, &update.temp);
        take(&mut self.skin, &update.skin);
        take(&mut self.pupils, &update.pupils);
        take(&mut self.loc, &update.loc);
    }

    pub fn is_empty(&self) -> bool {
        *self == Vitals::default()
    }

    /// 血压需收缩压与舒张压同时存在才显示
    pub fn blood_pressure(&self) -> Option<String> {
        match (self.bp_systolic, self.bp_diastolic) {
            (Some(s), Some(d)) => Some(format!("{s:.0}/{d:.0}")),
            _ => None,
        }
    }
}

/// 场景生成时的基线体征：全部字段必填
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BaselineVitals {
    pub hr: f64,
    pub bp_systolic: f64,
    pub bp_diastolic: f64,
    pub rr: f64,
    pub spo2: f64,
    pub etco2: f64,
    pub bgl: f64,
    pub temp: f64,
    pub skin: String,
    pub pupils: String,
    pub loc: String,
}

/// 一次会话的场景描述，开始后只读
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub title: String,
    pub dispatch_message: String,
    pub difficulty: Difficulty,
    #[serde(rename = "type")]
    pub scenario_type: ScenarioType,
    pub initial_vitals: BaselineVitals,
    pub environment: String,
    pub patient_gender: String,
    pub patient_age: u32,
}

impl Scenario {
    /// 患者是否为女性（用于语音选择）
    pub fn patient_is_female(&self) -> bool {
        let g = self.patient_gender.trim().to_lowercase();
        g.contains("female") || g == "f"
    }
}

/// Turn Resolver 的结构化结果；字符串字段必须出现（可为空串），用于区分「无更新」与「格式错误」
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TurnResult {
    /// 接下来发生了什么、患者说了什么、EMT 看到了什么
    pub narrative: String,
    /// 仅包含本轮检查到的体征
    #[serde(default)]
    pub updated_vitals: Vitals,
    /// 依据 NREMT 标准对上一步操作的点评；无需点评时为空串
    pub feedback: String,
    /// 当前评估阶段（Scene Size-up、Primary、History、Transport 等）
    pub phase: String,
    /// 用户做了立即危险的操作时描述之，否则为空串
    pub critical_fail: String,
    /// 仅当已到达医院并完成交接时为 true
    pub is_complete: bool,
}

/// 讲评报告：通过与否、分数、违反的关键标准、总结与理由
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DebriefReport {
    pub passed: bool,
    /// 0-100
    pub score: f64,
    /// 违反的 NREMT 关键标准
    pub critical_failures: Vec<String>,
    pub feedback_summary: String,
    pub clinical_reasoning: String,
}
