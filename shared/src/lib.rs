use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

pub mod de;

/// Body of `POST /predict`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PredictRequest {
    pub image_base64: String,
}

/// Body of a successful `POST /predict`. Both fields are optional here so the
/// client can tell a malformed success apart from a transport failure.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PredictResponse {
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default, deserialize_with = "de::option_f64_or_string")]
    pub confidence: Option<f64>,
}

/// Body of any non-2xx response from the prediction/history service.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}

/// One entry of `GET /history`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HistoryItem {
    #[serde(deserialize_with = "de::string_or_number")]
    pub id: String,
    pub date: String,
    pub class: String,
    #[serde(deserialize_with = "de::f64_or_string")]
    pub confidence: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    #[serde(deserialize_with = "de::u32_or_string")]
    pub age: u32,
    /// Empty when an older record never stored it.
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub email: String,
}

/// Shape stored under `users/{uid}` in the realtime database.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ProfileRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(flatten)]
    pub profile: Profile,
}

/// Grades reported by the screening model, mildest first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, EnumIter, AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum DiagnosisClass {
    #[strum(serialize = "No DR")]
    NoDr,
    Mild,
    Moderate,
    Severe,
    #[strum(serialize = "Proliferative DR")]
    Proliferative,
}

impl DiagnosisClass {
    pub fn severity(self) -> u8 {
        match self {
            DiagnosisClass::NoDr => 0,
            DiagnosisClass::Mild => 1,
            DiagnosisClass::Moderate => 2,
            DiagnosisClass::Severe => 3,
            DiagnosisClass::Proliferative => 4,
        }
    }

    /// Moderate and worse should be seen by an ophthalmologist.
    pub fn requires_referral(self) -> bool {
        self >= DiagnosisClass::Moderate
    }
}
