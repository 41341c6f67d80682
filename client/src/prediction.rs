use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use shared::{DiagnosisClass, ErrorBody, PredictRequest, PredictResponse};
use std::rc::Rc;
use std::str::FromStr;

use crate::config::ClientConfig;
use crate::identity::{AuthError, Credential};
use crate::transport::{ApiRequest, ApiResponse, HttpTransport, TransportError, endpoint};

/// A validated classification. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    diagnosis_class: String,
    confidence: f64,
    produced_at: DateTime<Utc>,
    source_image: Option<Rc<str>>,
}

impl PredictionResult {
    /// Rejects an empty class or a confidence outside `[0, 1]`.
    pub fn new(
        diagnosis_class: impl Into<String>,
        confidence: f64,
        produced_at: DateTime<Utc>,
    ) -> Result<Self, PredictionError> {
        let diagnosis_class = diagnosis_class.into().trim().to_string();
        if diagnosis_class.is_empty() {
            return Err(PredictionError::Malformed(
                "missing diagnosis class".to_string(),
            ));
        }
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return Err(PredictionError::Malformed(format!(
                "confidence {} is outside [0, 1]",
                confidence
            )));
        }
        Ok(Self {
            diagnosis_class,
            confidence,
            produced_at,
            source_image: None,
        })
    }

    pub fn with_source_image(mut self, image: Rc<str>) -> Self {
        self.source_image = Some(image);
        self
    }

    pub fn diagnosis_class(&self) -> &str {
        &self.diagnosis_class
    }

    /// `None` for labels the app does not know; those still display verbatim.
    pub fn class(&self) -> Option<DiagnosisClass> {
        DiagnosisClass::from_str(&self.diagnosis_class).ok()
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn confidence_percent(&self) -> String {
        format!("{:.2}%", self.confidence * 100.0)
    }

    pub fn produced_at(&self) -> DateTime<Utc> {
        self.produced_at
    }

    pub fn source_image(&self) -> Option<&str> {
        self.source_image.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PredictionError {
    #[error("Unsupported image: {0}")]
    InvalidImage(String),
    #[error("Could not obtain a credential: {0}")]
    Credential(#[from] AuthError),
    #[error("Prediction service returned {status}: {message}")]
    Server { status: u16, message: String },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("Malformed prediction: {0}")]
    Malformed(String),
}

const GENERIC_FAILURE: &str = "Prediction failed. Please check your connection and try again.";

impl PredictionError {
    pub fn user_message(&self) -> String {
        match self {
            PredictionError::InvalidImage(_) => {
                "Please upload a PNG or JPEG retinal image.".to_string()
            }
            PredictionError::Credential(_) => {
                "Your session has expired. Please log in again.".to_string()
            }
            PredictionError::Server { message, .. } => format!("Prediction failed: {}", message),
            PredictionError::Transport(_) => GENERIC_FAILURE.to_string(),
            PredictionError::Malformed(_) => {
                "The prediction service returned an incomplete result.".to_string()
            }
        }
    }
}

/// Encodes raw image bytes as the `data:` URL the prediction service expects.
pub fn encode_image(bytes: &[u8], mime: &str) -> Result<String, PredictionError> {
    let mime = mime.trim().to_ascii_lowercase();
    if !mime.starts_with("image/") {
        return Err(PredictionError::InvalidImage(format!(
            "{} is not an image type",
            if mime.is_empty() { "(none)" } else { &mime }
        )));
    }
    if bytes.is_empty() {
        return Err(PredictionError::InvalidImage("file is empty".to_string()));
    }
    Ok(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
}

pub struct PredictionClient<T> {
    transport: T,
    api_base_url: String,
}

impl<T: HttpTransport> PredictionClient<T> {
    pub fn new(config: &ClientConfig, transport: T) -> Self {
        Self {
            transport,
            api_base_url: config.api_base_url.clone(),
        }
    }

    /// One attempt, no retry. The caller mints `bearer` right before calling.
    pub async fn predict(
        &self,
        image_base64: &str,
        bearer: &Credential,
    ) -> Result<PredictionResult, PredictionError> {
        let url = endpoint(&self.api_base_url, &["predict"], &[])?;
        let body = serde_json::to_value(PredictRequest {
            image_base64: image_base64.to_string(),
        })
        .map_err(|e| PredictionError::Malformed(e.to_string()))?;

        let response = self
            .transport
            .send(ApiRequest::post(url, body).bearer(bearer.as_str()))
            .await
            .map_err(|e| {
                log::error!("Prediction request failed: {}", e);
                PredictionError::from(e)
            })?;

        if !response.is_success() {
            let error = server_error(&response);
            log::error!("{}", error);
            return Err(error);
        }

        let parsed: PredictResponse = response.json().map_err(|e| {
            log::error!("Unreadable prediction body: {}", e);
            PredictionError::Malformed(e.to_string())
        })?;
        let class = parsed
            .class
            .ok_or_else(|| PredictionError::Malformed("missing class".to_string()))?;
        let confidence = parsed
            .confidence
            .ok_or_else(|| PredictionError::Malformed("missing confidence".to_string()))?;

        let result = PredictionResult::new(class, confidence, Utc::now())?
            .with_source_image(Rc::from(image_base64));
        log::info!(
            "Prediction: {} ({})",
            result.diagnosis_class(),
            result.confidence_percent()
        );
        Ok(result)
    }
}

fn server_error(response: &ApiResponse) -> PredictionError {
    let message = response
        .json::<ErrorBody>()
        .map(|body| body.error)
        .ok()
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| GENERIC_FAILURE.to_string());
    PredictionError::Server {
        status: response.status,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTransport;
    use crate::transport::Method;
    use futures::executor::block_on;

    fn client() -> (Rc<FakeTransport>, PredictionClient<Rc<FakeTransport>>) {
        let transport = Rc::new(FakeTransport::new());
        let config = ClientConfig {
            api_base_url: "http://api.test".to_string(),
            ..ClientConfig::default()
        };
        (Rc::clone(&transport), PredictionClient::new(&config, transport))
    }

    fn predict(client: &PredictionClient<Rc<FakeTransport>>) -> Result<PredictionResult, PredictionError> {
        block_on(client.predict("data:image/png;base64,AAAA", &Credential::new("tok")))
    }

    #[test]
    fn moderate_result_is_normalized() {
        let (transport, client) = client();
        transport.reply(200, r#"{"class":"Moderate","confidence":0.73}"#);

        let result = predict(&client).unwrap();
        assert_eq!(result.diagnosis_class(), "Moderate");
        assert_eq!(result.confidence(), 0.73);
        assert_eq!(result.class(), Some(DiagnosisClass::Moderate));
        assert_eq!(result.confidence_percent(), "73.00%");
        assert_eq!(result.source_image(), Some("data:image/png;base64,AAAA"));

        let request = &transport.requests()[0];
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.url, "http://api.test/predict");
        assert_eq!(request.bearer.as_deref(), Some("tok"));
        assert_eq!(
            request.body.as_ref().unwrap()["image_base64"],
            "data:image/png;base64,AAAA"
        );
    }

    #[test]
    fn server_message_is_surfaced() {
        let (transport, client) = client();
        transport.reply(500, r#"{"error":"model unavailable"}"#);

        let error = predict(&client).unwrap_err();
        assert_eq!(
            error,
            PredictionError::Server {
                status: 500,
                message: "model unavailable".to_string()
            }
        );
        assert!(error.user_message().contains("model unavailable"));
    }

    #[test]
    fn failure_without_body_gets_generic_message() {
        let (transport, client) = client();
        transport.reply(502, "<html>Bad Gateway</html>");

        match predict(&client) {
            Err(PredictionError::Server { status, message }) => {
                assert_eq!(status, 502);
                assert_eq!(message, GENERIC_FAILURE);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn success_status_without_fields_is_an_error() {
        let (transport, client) = client();
        transport.reply(200, r#"{"class":"Mild"}"#);
        transport.reply(200, r#"{"confidence":0.5}"#);
        transport.reply(200, r#"{"class":"","confidence":0.5}"#);
        transport.reply(200, r#"{"class":"Mild","confidence":"high"}"#);
        transport.reply(200, r#"{"class":"Mild","confidence":1.7}"#);

        for _ in 0..5 {
            assert!(matches!(predict(&client), Err(PredictionError::Malformed(_))));
        }
    }

    #[test]
    fn string_confidence_is_accepted() {
        let (transport, client) = client();
        transport.reply(200, r#"{"class":"No DR","confidence":"0.91"}"#);

        let result = predict(&client).unwrap();
        assert_eq!(result.class(), Some(DiagnosisClass::NoDr));
        assert_eq!(result.confidence(), 0.91);
    }

    #[test]
    fn unknown_labels_stay_valid() {
        let (transport, client) = client();
        transport.reply(200, r#"{"class":"Ungradable","confidence":0.4}"#);

        let result = predict(&client).unwrap();
        assert_eq!(result.diagnosis_class(), "Ungradable");
        assert_eq!(result.class(), None);
    }

    #[test]
    fn network_failure_is_typed() {
        let (transport, client) = client();
        transport.fail(TransportError::Network("offline".to_string()));
        let error = predict(&client).unwrap_err();
        assert!(matches!(error, PredictionError::Transport(_)));
        assert_eq!(error.user_message(), GENERIC_FAILURE);
    }

    #[test]
    fn encode_image_builds_data_url() {
        assert_eq!(
            encode_image(b"hi", "image/PNG").unwrap(),
            "data:image/png;base64,aGk="
        );
        assert!(matches!(
            encode_image(b"%PDF", "application/pdf"),
            Err(PredictionError::InvalidImage(_))
        ));
        assert!(matches!(
            encode_image(b"", "image/jpeg"),
            Err(PredictionError::InvalidImage(_))
        ));
    }
}
