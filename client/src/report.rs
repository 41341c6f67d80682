use chrono::{DateTime, Utc};

use crate::prediction::PredictionResult;
use crate::session::Session;

pub const DISCLAIMER: &str = "This report was generated by an automated screening system and is \
not a medical diagnosis. Please consult a qualified ophthalmologist to confirm these findings.";

const PATIENT_ID_LEN: usize = 10;
const UNKNOWN_PATIENT: &str = "Unknown patient";

/// Everything the report modal shows for one prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub patient_name: String,
    pub patient_age: Option<u32>,
    pub patient_gender: Option<String>,
    pub patient_email: Option<String>,
    pub patient_id: String,
    pub diagnosis: String,
    pub confidence: String,
    pub referral_recommended: bool,
    pub generated_at: DateTime<Utc>,
    pub disclaimer: &'static str,
}

impl Report {
    /// `None` without a signed-in user.
    pub fn new(session: &Session, result: &PredictionResult, generated_at: DateTime<Utc>) -> Option<Self> {
        let identity = session.identity()?;
        let profile = session.profile();

        Some(Self {
            patient_name: profile
                .map(|p| p.name.clone())
                .unwrap_or_else(|| UNKNOWN_PATIENT.to_string()),
            patient_age: profile.map(|p| p.age),
            patient_gender: profile
                .map(|p| p.gender.clone())
                .filter(|gender| !gender.is_empty()),
            patient_email: session.email().map(str::to_string),
            patient_id: identity
                .uid
                .chars()
                .take(PATIENT_ID_LEN)
                .collect::<String>()
                .to_uppercase(),
            diagnosis: result.diagnosis_class().to_string(),
            confidence: result.confidence_percent(),
            referral_recommended: result.class().is_some_and(|class| class.requires_referral()),
            generated_at,
            disclaimer: DISCLAIMER,
        })
    }

    /// Download name: `dr-report-<name>-<YYYY-MM-DD>.txt`.
    pub fn file_name(&self) -> String {
        let name = if self.patient_name == UNKNOWN_PATIENT {
            "report".to_string()
        } else {
            self.patient_name.split_whitespace().collect::<Vec<_>>().join("_")
        };
        format!("dr-report-{}-{}.txt", name, self.generated_at.format("%Y-%m-%d"))
    }

    /// Plain-text rendition for download.
    pub fn to_text(&self) -> String {
        let dash = || "-".to_string();
        let rows = [
            ("Name", self.patient_name.clone()),
            ("Patient ID", self.patient_id.clone()),
            ("Age", self.patient_age.map(|age| age.to_string()).unwrap_or_else(dash)),
            ("Gender", self.patient_gender.clone().unwrap_or_else(dash)),
            ("Email", self.patient_email.clone().unwrap_or_else(dash)),
        ];
        let findings = [
            ("Diagnosis", self.diagnosis.clone()),
            ("Confidence", self.confidence.clone()),
            (
                "Referral",
                if self.referral_recommended { "Recommended" } else { "Not required" }.to_string(),
            ),
            ("Generated", self.generated_at.format("%Y-%m-%d %H:%M UTC").to_string()),
        ];

        let mut text = String::from("Diabetic Retinopathy Screening Report\n\nPatient\n");
        for (label, value) in rows {
            text.push_str(&format!("  {:<11} {}\n", format!("{}:", label), value));
        }
        text.push_str("\nFindings\n");
        for (label, value) in findings {
            text.push_str(&format!("  {:<11} {}\n", format!("{}:", label), value));
        }
        text.push('\n');
        text.push_str(self.disclaimer);
        text.push('\n');
        text
    }
}
