use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::clinical::ClinicalAssessment;

const GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const GEMINI_MODEL: &str = "gemini-2.5-flash-preview-05-20";
const GEMINI_TIMEOUT: Duration = Duration::from_secs(30);

const CLINICAL_SYSTEM_PROMPT: &str = r#"You are an AI Clinical Decision Support Assistant trained to generate structured, physician-style consultation notes using evidence-based clinical reasoning. Analyze the reported symptoms and produce a medically coherent, differential-based assessment that prioritizes patient safety, pharmacological accuracy, and diagnostic relevance.

CLINICAL REASONING REQUIREMENTS:
- Perform structured symptom analysis (onset, duration, severity, associated symptoms, risk factors) before generating output.
- Construct a probability-ranked differential diagnosis from epidemiology, symptom clustering, typical disease progression, and red-flag exclusion.
- Red flags must directly relate to the listed differentials; tests must map logically to them; preventive advice must address their recurrence mechanisms.

SAFETY RULES:
- NEVER claim a definitive diagnosis or certainty. Use language like "could suggest," "possibilities include," "may indicate."
- NEVER recommend restricted or controlled medications, steroids, antibiotics, or Schedule H/H1 medicines. Suggest only safe OTC options.
- For each OTC medication give generic name, one common brand name, standard adult dose, frequency, maximum daily dose, contraindications, common side effects, and a clear avoid-if condition. If dosage is uncertain, state "Consult physician for exact dosage."
- If symptoms match emergency patterns (chest pain with shortness of breath, stroke signs, severe bleeding, breathing difficulty, altered consciousness), set emergencyRisk to true and prioritize emergency escalation.
- If the patient is a child, pregnant, elderly, or chronically ill, add extra caution.

TONE: Clinical, professional, reassuring, precise. No emojis, no casual language, no generic filler.

OUTPUT FORMAT: Respond ONLY with valid JSON matching this schema. No markdown, no commentary outside the JSON.

{
"chiefComplaint": "string",
"differentialDiagnosis": [{"condition": "string", "probability": "High|Moderate|Low", "explanation": "Pathophysiologic reasoning specific to this symptom cluster."}],
"severityAssessment": {"level": "Mild|Moderate|Severe", "emergencyRisk": false, "redFlagSymptoms": ["Specific warning sign tied to listed differentials."]},
"immediateCare": {"lifestyleRemedies": ["Evidence-based action specific to symptom mechanism."], "otcMedications": [{"genericName": "string", "brandName": "string", "standardDose": "string", "frequency": "string", "maxDailyDose": "string", "contraindications": "string", "sideEffects": "string", "avoidIf": "string"}]},
"recommendedTests": [{"testName": "string", "reason": "Diagnostic value tied to specific differential."}],
"emergencySigns": ["Condition-specific deterioration pattern."],
"preventiveAdvice": ["Evidence-based recurrence prevention specific to listed diagnoses."],
"specialist": "Most appropriate specialty if escalation required.",
"consultationReason": "Why in-person physician evaluation is medically necessary for this symptom pattern.",
"confidence": 0
}

CONFIDENCE SCORING: use 80-90 for common, clear symptom patterns; 60-75 if information is incomplete; below 60 for highly nonspecific presentations. Never use 100."#;

/// Failure classes for the AI analysis call. Only `InvalidCredential` is
/// ever surfaced to the caller as the specific reason; everything else is
/// logged and treated as "fall through to the next analysis step".
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid API key")]
    InvalidCredential,
    #[error("AI service error: {0}")]
    Upstream(String),
    #[error("could not parse AI response: {0}")]
    ResponseParse(String),
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: String,
}

/// Client for the Gemini generateContent endpoint. One request per analysis,
/// fixed sampling settings, no retries, no caching.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
}

impl GeminiClient {
    pub fn new() -> Self {
        Self::with_base_url(GEMINI_BASE.to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    pub async fn analyze(
        &self,
        api_key: &str,
        symptoms: &str,
    ) -> Result<ClinicalAssessment, AnalysisError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, GEMINI_MODEL, api_key
        );
        let payload = json!({
            "contents": [{"parts": [{"text": build_prompt(symptoms)}]}],
            "generationConfig": {
                "temperature": 0.3,
                "maxOutputTokens": 4096,
                "responseMimeType": "application/json",
            },
        });

        let resp = self
            .http
            .post(&url)
            .json(&payload)
            .timeout(GEMINI_TIMEOUT)
            .send()
            .await
            .map_err(|e| AnalysisError::Upstream(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AnalysisError::InvalidCredential);
        }
        if status == reqwest::StatusCode::BAD_REQUEST {
            let body = resp.text().await.unwrap_or_default();
            let lower = body.to_lowercase();
            if lower.contains("api_key_invalid") || lower.contains("api key not valid") {
                return Err(AnalysisError::InvalidCredential);
            }
            return Err(AnalysisError::Upstream(format!("status 400: {lower}")));
        }
        if !status.is_success() {
            return Err(AnalysisError::Upstream(format!("status {status}")));
        }

        let body: GenerateContentResponse = resp
            .json()
            .await
            .map_err(|e| AnalysisError::Upstream(e.to_string()))?;
        let text = body
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.first())
            .map(|p| p.text.as_str())
            .ok_or_else(|| AnalysisError::ResponseParse("no candidate text".to_string()))?;

        let cleaned = strip_code_fences(text);
        let assessment: ClinicalAssessment =
            serde_json::from_str(cleaned).map_err(|e| AnalysisError::ResponseParse(e.to_string()))?;
        Ok(normalize(assessment))
    }
}

impl Default for GeminiClient {
    fn default() -> Self {
        Self::new()
    }
}

fn build_prompt(symptoms: &str) -> String {
    format!(
        "{CLINICAL_SYSTEM_PROMPT}\n\nPatient's reported symptoms: \"{symptoms}\"\n\n\
         IMPORTANT: Analyze ONLY the symptoms described above. Every field must be \
         uniquely relevant to these specific symptoms. Do not use generic filler."
    )
}

/// The model sometimes wraps its JSON in markdown fences despite the prompt.
fn strip_code_fences(text: &str) -> &str {
    let mut t = text.trim();
    t = t.strip_prefix("```json").unwrap_or(t);
    t = t.strip_prefix("```").unwrap_or(t);
    t = t.strip_suffix("```").unwrap_or(t);
    t.trim()
}

/// Enforce the assessment invariant that confidence is never exactly 100,
/// rather than trusting the model to follow the prompt.
fn normalize(mut assessment: ClinicalAssessment) -> ClinicalAssessment {
    if assessment.confidence >= 100 {
        assessment.confidence = 99;
    }
    assessment
}
