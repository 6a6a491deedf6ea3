//! 静态目录：病种、NREMT 关键标准、装备包、快捷操作、无线电报告清单

use rand::seq::SliceRandom;
use rand::Rng;

use crate::scenario::ScenarioType;

pub const MEDICAL_PATHOLOGIES: &[&str] = &[
    "Chest Pain (Possible Acute Myocardial Infarction)",
    "Chest Pain (Angina Pectoris)",
    "Congestive Heart Failure (CHF) / Pulmonary Edema",
    "Respiratory Distress (COPD Exacerbation)",
    "Respiratory Distress (Severe Asthma)",
    "Respiratory Distress (Pneumonia)",
    "Stroke / CVA (Ischemic)",
    "Stroke / CVA (Hemorrhagic)",
    "Altered Mental Status (Opioid Overdose)",
    "Altered Mental Status (Hypoglycemia)",
    "Altered Mental Status (Sepsis)",
    "Acute Abdominal Pain (Appendicitis)",
    "Acute Abdominal Pain (GI Bleed)",
    "Acute Abdominal Pain (Ectopic Pregnancy - Female)",
    "Acute Abdominal Pain (Abdominal Aortic Aneurysm)",
    "Anaphylaxis / Severe Allergic Reaction",
    "Seizure (Status Epilepticus)",
    "Seizure (Post-ictal state)",
    "Heat Stroke / Heat Exhaustion",
    "Hypothermia",
    "Diabetic Ketoacidosis (DKA)",
    "Syncope (Cardiac origin)",
];

pub const TRAUMA_PATHOLOGIES: &[&str] = &[
    "Head Injury (Traumatic Brain Injury / Subdural Hematoma)",
    "Chest Injury (Tension Pneumothorax)",
    "Chest Injury (Flail Chest)",
    "Abdominal Injury (Evisceration)",
    "Abdominal Injury (Blunt Trauma/Internal Bleeding)",
    "Extremity Trauma (Open Femur Fracture)",
    "Extremity Trauma (Amputation)",
    "Penetrating Trauma (Gunshot Wound to Chest)",
    "Penetrating Trauma (Stab wound to Abdomen)",
    "Multi-system Trauma (Fall from height)",
    "Burn Injury (Thermal - High BSA)",
    "Neck Injury (Laceration with bleeding control)",
];

/// 按类型均匀抽取一个病种，保证场景多样性
pub fn pick_pathology<R: Rng + ?Sized>(scenario_type: ScenarioType, rng: &mut R) -> &'static str {
    let pool = match scenario_type {
        ScenarioType::Medical => MEDICAL_PATHOLOGIES,
        ScenarioType::Trauma => TRAUMA_PATHOLOGIES,
    };
    pool.choose(rng).copied().unwrap_or(pool[0])
}

pub const CRITICAL_CRITERIA: &[&str] = &[
    "Failure to initiate or call for transport of the patient within the 10 min. (trauma) or 12 min. (medical) time limit.",
    "Failure to take or verbalize appropriate PPE precautions.",
    "Failure to determine scene safety.",
    "Failure to assess for and provide spinal protection when indicated.",
    "Failure to voice (required) and ultimately provide (dependant on patient status) oxygen.",
    "Failure to assess/provide adequate ventilation.",
    "Failure to find or appropriately manage problems asociated with airway, breathing, hemorrhage or shock.",
    "Failure to differentiate patient's need for immediate transportation versus continued assessment/treatment at the scene.",
    "Failure to determine the patient's primary problem.",
    "Performs other assessments before assessing/treating threats to airway, breathing and circulation.",
    "Failure to manage the patient as a competent EMT.",
    "Exhibits unacceptable affect with patient or other personnel.",
    "Uses or orders a dangerous or inappropriate intervention.",
];

/// 装备包
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EquipmentBag {
    pub id: &'static str,
    pub label: &'static str,
    pub title: &'static str,
    pub items: &'static [&'static str],
}

pub const EQUIPMENT_BAGS: &[EquipmentBag] = &[
    EquipmentBag {
        id: "jump",
        label: "Jump Bag",
        title: "Primary Jump Bag",
        items: &[
            "BP Cuff", "Stethoscope", "Glucometer", "Penlight", "Trauma Shears",
            "Oral Glucose", "Aspirin", "EpiPen", "Narcan", "Tourniquet", "4x4 Gauze",
            "Abd. Pad", "Occlusive Dressing", "SAM Splint", "Gauze", "Albuterol",
            "Hemostatic Bandage", "Trauma Pad", "Antiseptic Wipe", "Cold Pack",
            "Heat Pack", "4x9 Dressing", "8x10 Dressing", "Sterile Eye Pads",
            "Cloth Tape", "Cravat", "Thermal Blanket",
        ],
    },
    EquipmentBag {
        id: "airway",
        label: "Airway / O2",
        title: "Airway & O2 Kit",
        items: &[
            "O2 Cylinder", "O2 Regulator", "Nasal Cannula", "NRB Mask", "BVM (Adult)",
            "OPA Kit", "NPA Kit", "Suction Unit", "Pulse Oximeter", "BVM (Pediatric)",
            "IGel", "King Tube", "Nasal Cannula (Ped)", "NRB Mask (Ped)",
            "Nebulizer (Adult)", "Nebulizer (Ped)", "CPAP", "CO2 Sampling Cannula",
        ],
    },
    EquipmentBag {
        id: "splint",
        label: "Splint / Trauma",
        title: "Splint & Trauma Bag",
        items: &[
            "C-Collar", "SAM Splint", "Triangle Bandage", "Cold Pack", "Hot Pack",
            "Traction Splint", "Board Splint", "Occlusive Dressing", "Burn Sheet",
        ],
    },
];

/// 从装备包取出物品后预填到输入框的文本
pub fn equipment_prefill(item: &str) -> String {
    format!("I am retrieving the {item} to ")
}

/// 快捷操作：(按钮标签, 预填文本)
pub const QUICK_ACTIONS: &[(&str, &str)] = &[
    ("Scene Safety / BSI", "I am checking scene safety and putting on my BSI."),
    ("General Impression", "What is my general impression of the patient?"),
    ("Check Pulse", "I am checking the radial pulse."),
    ("Lung Sounds", "I am listening to lung sounds."),
    ("SAMPLE History", "I am asking for SAMPLE history."),
    ("Vitals", "I am taking a full set of vitals."),
];

/// 无线电报告结构清单（静态，不经 AI 生成）
pub const RADIO_REPORT_CHECKLIST: &[&str] = &[
    "Unit identification and level of provider",
    "Estimated time of arrival (ETA)",
    "Patient's age and sex",
    "Chief complaint",
    "Brief, pertinent history of present illness (HPI)",
    "Major past illnesses",
    "Mental Status (AVPU/GCS)",
    "Baseline vital signs",
    "Pertinent findings of the physical exam",
    "Emergency medical care given",
    "Request further orders (if applicable)",
];

/// 接通医院后预填的报告开头
pub const RADIO_REPORT_OPENER: &str = "This is Unit 51 en route to your facility...";

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_pick_pathology_stays_within_type() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let p = pick_pathology(ScenarioType::Trauma, &mut rng);
            assert!(TRAUMA_PATHOLOGIES.contains(&p));
            let m = pick_pathology(ScenarioType::Medical, &mut rng);
            assert!(MEDICAL_PATHOLOGIES.contains(&m));
        }
    }

    #[test]
    fn test_catalog_sizes() {
        assert_eq!(MEDICAL_PATHOLOGIES.len(), 22);
        assert_eq!(TRAUMA_PATHOLOGIES.len(), 12);
        assert_eq!(CRITICAL_CRITERIA.len(), 13);
        assert_eq!(EQUIPMENT_BAGS.len(), 3);
        assert_eq!(RADIO_REPORT_CHECKLIST.len(), 11);
    }

    #[test]
    fn test_equipment_prefill() {
        assert_eq!(equipment_prefill("NRB Mask"), "I am retrieving the NRB Mask to ");
    }
}
