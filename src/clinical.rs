use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};

/// Structured consultation note. Both the AI path and the curated fallback
/// path produce this shape; it is built per request and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalAssessment {
    pub chief_complaint: String,
    pub differential_diagnosis: Vec<Differential>,
    pub severity_assessment: SeverityAssessment,
    pub immediate_care: ImmediateCare,
    pub recommended_tests: Vec<RecommendedTest>,
    pub emergency_signs: Vec<String>,
    pub preventive_advice: Vec<String>,
    pub specialist: String,
    pub consultation_reason: String,
    pub confidence: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Differential {
    pub condition: String,
    pub probability: Probability,
    pub explanation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Probability {
    High,
    Moderate,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeverityAssessment {
    pub level: Severity,
    pub emergency_risk: bool,
    pub red_flag_symptoms: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImmediateCare {
    pub lifestyle_remedies: Vec<String>,
    pub otc_medications: Vec<OtcMedication>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtcMedication {
    pub generic_name: String,
    pub brand_name: String,
    pub standard_dose: String,
    pub frequency: String,
    pub max_daily_dose: String,
    pub contraindications: String,
    pub side_effects: String,
    pub avoid_if: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedTest {
    pub test_name: String,
    pub reason: String,
}

const FALLBACK_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/fallback.json"));

/// Reserved keyword for the entry returned when nothing else matches.
const DEFAULT_KEYWORD: &str = "default";

#[derive(Debug, Deserialize)]
struct FallbackEntry {
    keyword: String,
    assessment: ClinicalAssessment,
}

/// Curated clinical knowledge base used when no AI credential is usable.
/// Loaded once at startup from an embedded JSON document; entry order in
/// that document is the match order.
pub struct FallbackTable {
    entries: Vec<FallbackEntry>,
    default_ix: usize,
}

impl FallbackTable {
    pub fn load() -> anyhow::Result<Self> {
        let entries: Vec<FallbackEntry> =
            serde_json::from_str(FALLBACK_JSON).context("parse embedded fallback table")?;
        let default_ix = entries
            .iter()
            .position(|e| e.keyword == DEFAULT_KEYWORD)
            .ok_or_else(|| anyhow!("fallback table has no '{DEFAULT_KEYWORD}' entry"))?;
        Ok(Self {
            entries,
            default_ix,
        })
    }

    /// First entry whose keyword is a substring of the lowercased symptom
    /// text, in table order; the `default` entry otherwise. Total: always
    /// returns an assessment.
    pub fn lookup(&self, symptoms: &str) -> &ClinicalAssessment {
        let lower = symptoms.to_lowercase();
        for entry in &self.entries {
            if entry.keyword != DEFAULT_KEYWORD && lower.contains(&entry.keyword) {
                return &entry.assessment;
            }
        }
        &self.entries[self.default_ix].assessment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> FallbackTable {
        FallbackTable::load().unwrap()
    }

    #[test]
    fn fever_substring_matches_fever_entry() {
        let t = table();
        let a = t.lookup("I have had a FEVER and chills since yesterday");
        assert!(a.chief_complaint.contains("elevated body temperature"));
        assert_eq!(a.specialist, "General Physician");
    }

    #[test]
    fn first_match_wins_in_table_order() {
        let t = table();
        // Both keywords present; "headache" is declared before "fever".
        let a = t.lookup("headache with mild fever");
        assert_eq!(a.specialist, "General Physician / Neurologist");
    }

    #[test]
    fn unmatched_input_returns_default_with_confidence_70() {
        let t = table();
        let a = t.lookup("my elbow itches");
        assert_eq!(a.confidence, 70);
        assert!(a.chief_complaint.contains("professional assessment"));
    }

    #[test]
    fn default_keyword_is_not_matched_literally() {
        let t = table();
        let a = t.lookup("default settings made me sick");
        assert_eq!(a.confidence, 70);
    }

    #[test]
    fn headache_example_from_symptom_checker() {
        let t = table();
        let a = t.lookup("I have a severe headache and sensitivity to light");
        assert_eq!(a.specialist, "General Physician / Neurologist");
        assert_eq!(a.severity_assessment.level, Severity::Mild);
        assert!(!a.severity_assessment.emergency_risk);
    }

    #[test]
    fn every_entry_is_fully_populated() {
        let t = table();
        for entry in &t.entries {
            let a = &entry.assessment;
            assert!(!a.chief_complaint.is_empty());
            assert!(!a.differential_diagnosis.is_empty());
            assert!(!a.immediate_care.lifestyle_remedies.is_empty());
            assert!(!a.immediate_care.otc_medications.is_empty());
            assert!(!a.recommended_tests.is_empty());
            assert!(!a.emergency_signs.is_empty());
            assert!(!a.preventive_advice.is_empty());
            assert!(!a.specialist.is_empty());
            assert!(!a.consultation_reason.is_empty());
            assert!(a.confidence < 100);
        }
    }

    #[test]
    fn assessment_serializes_camel_case() {
        let t = table();
        let v = serde_json::to_value(t.lookup("fever")).unwrap();
        assert!(v.get("chiefComplaint").is_some());
        assert!(v.get("differentialDiagnosis").is_some());
        assert!(v["severityAssessment"].get("emergencyRisk").is_some());
        assert!(v["immediateCare"]["otcMedications"][0].get("avoidIf").is_some());
    }
}
