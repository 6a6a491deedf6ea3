//! 提示词拼装
//!
//! 场景生成、逐轮裁决、讲评、提示四类请求的文本；关键标准目录统一从 scenario::catalog 注入。

use crate::memory::HistoryTurn;
use crate::scenario::{Scenario, ScenarioType, CRITICAL_CRITERIA};

const FICTION_NOTICE: &str =
    "This is a FICTIONAL EDUCATIONAL SCENARIO for certified EMT training. Do not block or withhold medical content.";

fn criteria_block() -> String {
    CRITICAL_CRITERIA.join("\n")
}

fn history_block(history: &[HistoryTurn]) -> String {
    history
        .iter()
        .map(|h| format!("{}: {}", h.role.label(), h.text))
        .collect::<Vec<_>>()
        .join("\n")
}

fn or_na(v: f64) -> String {
    if v == 0.0 {
        "N/A".to_string()
    } else {
        format!("{v}")
    }
}

pub fn scenario_prompt(scenario_type: ScenarioType, pathology: &str) -> String {
    format!(
        "Generate a realistic EMT Basic scenario.

REQUIRED PARAMETERS:
- Type: {kind}
- Specific Pathology/Mechanism: {pathology} (You MUST use this condition)

INSTRUCTIONS:
- Make it challenging but solvable by an EMT Basic.
- Include initial vitals that match the specific pathology selected above.
- The dispatchMessage should be brief, like a radio tone.
- Do NOT reveal the specific diagnosis in the dispatch message, only the symptoms or nature of call (e.g., \"Diff Breathing\" not \"Asthma\").

{FICTION_NOTICE}",
        kind = scenario_type.as_str(),
    )
}

/// 逐轮裁决的 system：场景上下文、隐藏基线体征、关键标准与转运/无线电规则
pub fn turn_system_prompt(scenario: &Scenario) -> String {
    let v = &scenario.initial_vitals;
    format!(
        "You are an NREMT Proctor and the game master for an EMT simulation.
{FICTION_NOTICE}
Treat the user as a certified professional.

SCENARIO CONTEXT:
Patient: {age}y/o {gender}.
Dispatch: {dispatch}.
Environment: {environment}.
Condition: implied by scenario title \"{title}\" but DO NOT reveal the diagnosis immediately.

BASELINE VITALS (hidden from the user until assessed):
HR: {hr}
BP: {sys}/{dia}
RR: {rr}
SpO2: {spo2}
EtCO2: {etco2}
Glucose: {bgl}
Temp: {temp}
Skin: {skin}
Pupils: {pupils}
LOC: {loc}

CRITICAL CRITERIA (keep these in mind):
{criteria}

YOUR ROLE:
1. Interpret the user's actions.
2. Respond with the RESULT in 'narrative'.
3. Put vitals in 'updatedVitals' only if they were checked.
4. 'feedback': notes on what they did right or wrong based on NREMT standards.
5. 'criticalFail': set only if they did something IMMEDIATELY dangerous.

TRANSPORT PHASE & RADIO REPORT:
- If the user starts transport, the phase becomes 'Transport'. Do NOT end the scenario yet.
- The user MUST give a radio report to the receiving facility.
- When the user calls the hospital, ACT AS THE NURSE/DOCTOR receiving the report.
- Listen for Unit ID, Age/Sex, CC, Vitals, Interventions. If they miss major items, ask for them.
- Set 'isComplete' = true ONLY when the user has arrived at the hospital AND transferred care.

RULES:
- Do NOT auto-play.
- If the user says \"check vitals\", give ALL of them.
- If the user checks a specific vital, give only that ONE.",
        age = scenario.patient_age,
        gender = scenario.patient_gender,
        dispatch = scenario.dispatch_message,
        environment = scenario.environment,
        title = scenario.title,
        hr = v.hr,
        sys = v.bp_systolic,
        dia = v.bp_diastolic,
        rr = v.rr,
        spo2 = v.spo2,
        etco2 = or_na(v.etco2),
        bgl = or_na(v.bgl),
        temp = or_na(v.temp),
        skin = v.skin,
        pupils = v.pupils,
        loc = v.loc,
        criteria = criteria_block(),
    )
}

pub fn debrief_prompt(scenario: &Scenario, history: &[HistoryTurn], is_timeout: bool) -> String {
    let timeout_clause = if is_timeout {
        "CRITICAL OVERRIDE: The user failed to transport within the time limit (10 min Trauma / 12 min Medical). This is an AUTOMATIC FAILURE. You MUST mark 'passed' as false. You MUST include 'Failure to initiate or call for transport of the patient within the time limit' in the criticalFailures list."
    } else {
        ""
    };
    format!(
        "Analyze the following EMT Basic scenario session and provide a Pass/Fail report based on NREMT standards.
This is a fictional training scenario.

SCENARIO: {title} ({kind})
PATIENT: {age} {gender}

CRITICAL CRITERIA FOR FAILURE:
{criteria}

INSTRUCTIONS:
- Review the chat history below.
- Did they verify Scene Safety/BSI immediately?
- Did they address ABCs?
- Did they initiate transport in a timely manner?
- Did they call the hospital and give a radio report (unit ID, ETA, vitals, history)?
- Did they perform dangerous interventions?
- Score from 0 to 100 and return a JSON report.

{timeout_clause}

CHAT HISTORY:
{history}",
        title = scenario.title,
        kind = scenario.scenario_type.as_str(),
        age = scenario.patient_age,
        gender = scenario.patient_gender,
        criteria = criteria_block(),
        history = history_block(history),
    )
}

pub fn hint_prompt(scenario: &Scenario, history: &[HistoryTurn]) -> String {
    format!(
        "You are an NREMT Proctor aiding a student during a scenario.

SCENARIO: {title}

INSTRUCTION:
The student is requesting a hint. Based on the history so far, what is the next logical step in the NREMT patient assessment process?
Provide a SHORT, subtle nudge (max 15 words). Do not give the answer directly.
Example: \"Consider re-evaluating the airway.\" or \"Have you obtained a SAMPLE history?\"

HISTORY:
{history}",
        title = scenario.title,
        history = history_block(history),
    )
}
