//! 输出 JSON Schema 生成（schemars 由领域类型自动生成）
//!
//! 子 Schema 全部内联，避免 $ref 在部分后端不被支持。

use schemars::gen::SchemaSettings;
use schemars::JsonSchema;

use crate::llm::ResponseSchema;
use crate::scenario::{DebriefReport, Scenario, TurnResult};

pub const SCENARIO_SCHEMA_NAME: &str = "scenario";
pub const TURN_SCHEMA_NAME: &str = "turn_result";
pub const DEBRIEF_SCHEMA_NAME: &str = "debrief_report";

fn schema_value<T: JsonSchema>() -> serde_json::Value {
    let generator = SchemaSettings::draft07()
        .with(|s| {
            s.inline_subschemas = true;
        })
        .into_generator();
    let root = generator.into_root_schema_for::<T>();
    serde_json::to_value(root).unwrap_or(serde_json::Value::Null)
}

pub fn scenario_schema() -> ResponseSchema {
    ResponseSchema {
        name: SCENARIO_SCHEMA_NAME.to_string(),
        description: "An EMT Basic training scenario".to_string(),
        schema: schema_value::<Scenario>(),
    }
}

pub fn turn_schema() -> ResponseSchema {
    ResponseSchema {
        name: TURN_SCHEMA_NAME.to_string(),
        description: "The result of one EMT action during the scenario".to_string(),
        schema: schema_value::<TurnResult>(),
    }
}

pub fn debrief_schema() -> ResponseSchema {
    ResponseSchema {
        name: DEBRIEF_SCHEMA_NAME.to_string(),
        description: "Pass/fail report against the NREMT critical criteria".to_string(),
        schema: schema_value::<DebriefReport>(),
    }
}
