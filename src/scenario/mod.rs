//! 场景层：领域类型与静态目录

pub mod catalog;
pub mod types;

pub use catalog::{
    equipment_prefill, pick_pathology, EquipmentBag, CRITICAL_CRITERIA, EQUIPMENT_BAGS,
    QUICK_ACTIONS, RADIO_REPORT_CHECKLIST, RADIO_REPORT_OPENER,
};
pub use types::{
    BaselineVitals, DebriefReport, Difficulty, Scenario, ScenarioCategory, ScenarioType,
    TurnResult, Vitals,
};
