use crate::prompt::{build_prompt, PromptConfig};
use crate::state::camera::CameraSettings;
use crate::state::data::{to_data_url, SourceImage, DEFAULT_MIME_TYPE};

use super::types::{
    Content, ErrorEnvelope, GenerateContentRequest, GenerateContentResponse, GenerationSettings,
    GoogleSearch, ImageConfig, Part, Tool,
};

/// Upstream message that means the API key does not resolve to a usable
/// project. It is reported as a credential error, not a generic failure.
pub const CREDENTIAL_ERROR_MARKER: &str = "Requested entity was not found";

/// Endpoint and sampling options for the generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    /// Base URL, e.g. `https://generativelanguage.googleapis.com`.
    pub api_url: String,
    pub model: String,
    /// Low fixed temperature for limited creative variance.
    pub temperature: f32,
    /// Ask the service to consult search grounding for materials and lighting.
    pub grounding: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-3-pro-image-preview".to_string(),
            temperature: 0.4,
            grounding: true,
        }
    }
}

/// An image returned by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub mime_type: String,
    /// Raw base64 payload.
    pub base64: String,
}

impl GeneratedImage {
    pub fn data_url(&self) -> String {
        to_data_url(&self.mime_type, &self.base64)
    }
}

/// Errors from the generation layer.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The service rejected the API key.
    #[error("API key rejected: {0}")]
    Credential(String),

    /// The call succeeded but carried no inline image.
    #[error("no image data returned by the model")]
    NoImage,

    /// The HTTP request itself failed (network, DNS, TLS, body decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("generation API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Upstream error message, or the raw body when it was not JSON.
        message: String,
    },
}

impl GenerationError {
    /// Whether the user has to pick a different API key
    pub fn is_credential(&self) -> bool {
        matches!(self, GenerationError::Credential(_))
    }
}

/// REST client for the Gemini `generateContent` endpoint.
///
/// Wraps a single image-to-image request using [`reqwest`]. There are no
/// retries and no client-side timeout: a request ends when the model answers
/// or the transport gives up. Cheap to clone; clones share the underlying
/// connection pool.
#[derive(Debug, Clone)]
pub struct GenerationClient {
    client: reqwest::Client,
    config: GenerationConfig,
    prompt: PromptConfig,
}

impl GenerationClient {
    pub fn new(config: GenerationConfig, prompt: PromptConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config, prompt)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: GenerationConfig, prompt: PromptConfig) -> Self {
        Self {
            client,
            config,
            prompt,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.api_url.trim_end_matches('/'),
            self.config.model
        )
    }

    /// Build the request body for `image` seen through `settings`.
    pub fn build_request(&self, image: &SourceImage, settings: &CameraSettings) -> GenerateContentRequest {
        let prompt = build_prompt(settings, &self.prompt);

        let tools = if self.config.grounding {
            vec![Tool {
                google_search: GoogleSearch::default(),
            }]
        } else {
            Vec::new()
        };

        GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::inline(image.mime_type.clone(), image.base64.clone()),
                    Part::text(prompt),
                ],
            }],
            tools,
            generation_config: GenerationSettings {
                temperature: self.config.temperature,
                response_modalities: vec!["TEXT", "IMAGE"],
                image_config: ImageConfig {
                    aspect_ratio: settings.aspect_ratio.as_str(),
                    image_size: settings.image_size.as_str(),
                },
            },
        }
    }

    /// Generate a new view of `image` from the camera described by `settings`.
    ///
    /// Sends one `POST .../models/{model}:generateContent` request and returns
    /// the first inline image of the answer.
    pub async fn generate(
        &self,
        api_key: &str,
        image: &SourceImage,
        settings: &CameraSettings,
    ) -> Result<GeneratedImage, GenerationError> {
        let body = self.build_request(image, settings);

        log::info!(
            "🎬 Generating view: az={} el={} zoom={:.2} fov={} ({} {})",
            settings.azimuth,
            settings.elevation,
            settings.zoom,
            settings.fov,
            settings.aspect_ratio,
            settings.image_size
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            let error = api_error(status.as_u16(), &text);
            log::error!("Generation request failed: {}", error);
            return Err(error);
        }

        let parsed: GenerateContentResponse = response.json().await?;
        extract_image(&parsed)
    }
}

/// Turn a non-2xx answer into a typed error.
pub fn api_error(status: u16, body: &str) -> GenerationError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.to_string());

    if message.contains(CREDENTIAL_ERROR_MARKER) {
        GenerationError::Credential(message)
    } else {
        GenerationError::Api { status, message }
    }
}

/// Pick the first inline image out of a successful answer.
pub fn extract_image(response: &GenerateContentResponse) -> Result<GeneratedImage, GenerationError> {
    let inline = response.first_inline_image().ok_or_else(|| {
        let reason = response
            .candidates
            .first()
            .and_then(|c| c.finish_reason.as_deref())
            .unwrap_or("none");
        log::warn!("Model answered without an image (finish reason: {})", reason);
        GenerationError::NoImage
    })?;

    let mime_type = if inline.mime_type.is_empty() {
        DEFAULT_MIME_TYPE.to_string()
    } else {
        inline.mime_type.clone()
    };

    Ok(GeneratedImage {
        mime_type,
        base64: inline.data.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::camera::{AspectRatio, ImageSize};

    fn client() -> GenerationClient {
        GenerationClient::new(GenerationConfig::default(), PromptConfig::default())
    }

    #[test]
    fn test_endpoint_uses_model() {
        let mut config = GenerationConfig::default();
        config.api_url = "http://localhost:9000/".into();
        config.model = "test-model".into();
        let client = GenerationClient::new(config, PromptConfig::default());
        assert_eq!(
            client.endpoint(),
            "http://localhost:9000/v1beta/models/test-model:generateContent"
        );
    }

    #[test]
    fn test_request_carries_image_prompt_and_output_options() {
        let image = SourceImage {
            base64: "AAEC".into(),
            mime_type: "image/webp".into(),
        };
        let settings = CameraSettings {
            azimuth: 180,
            aspect_ratio: AspectRatio::Wide16x9,
            image_size: ImageSize::FourK,
            ..CameraSettings::default()
        };

        let json = serde_json::to_value(client().build_request(&image, &settings)).unwrap();

        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/webp");
        assert_eq!(parts[0]["inlineData"]["data"], "AAEC");
        let prompt = parts[1]["text"].as_str().unwrap();
        assert!(prompt.contains("ENVIRONMENT REVERSAL"));

        let config = &json["generationConfig"];
        assert_eq!(config["imageConfig"]["aspectRatio"], "16:9");
        assert_eq!(config["imageConfig"]["imageSize"], "4K");
        assert!((config["temperature"].as_f64().unwrap() - 0.4).abs() < 1e-6);
        assert!(json["tools"][0].get("googleSearch").is_some());
    }

    #[test]
    fn test_grounding_can_be_disabled() {
        let config = GenerationConfig {
            grounding: false,
            ..GenerationConfig::default()
        };
        let client = GenerationClient::new(config, PromptConfig::default());
        let image = SourceImage::from_bytes(b"x", "image/png");
        let json = serde_json::to_value(client.build_request(&image, &CameraSettings::default())).unwrap();
        assert!(json.get("tools").is_none());
    }

    #[test]
    fn test_entity_not_found_is_credential_error() {
        let body = r#"{"error":{"code":404,"message":"Requested entity was not found.","status":"NOT_FOUND"}}"#;
        let error = api_error(404, body);
        assert!(matches!(error, GenerationError::Credential(_)));
        assert!(error.is_credential());
    }

    #[test]
    fn test_other_api_errors_are_generic() {
        let body = r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#;
        let error = api_error(429, body);
        match &error {
            GenerationError::Api { status, message } => {
                assert_eq!(*status, 429);
                assert_eq!(message, "Resource has been exhausted");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!error.is_credential());
    }

    #[test]
    fn test_non_json_error_body_kept_verbatim() {
        let error = api_error(502, "Bad Gateway");
        assert!(error.to_string().contains("Bad Gateway"));

        // The marker is honoured even without the JSON envelope
        let error = api_error(404, "Requested entity was not found.");
        assert!(matches!(error, GenerationError::Credential(_)));
    }

    #[test]
    fn test_extract_image_builds_data_url() {
        let body = r#"{"candidates":[{"content":{"parts":[
            {"inlineData":{"mimeType":"image/jpeg","data":"AAEC"}}]}}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(body).unwrap();
        let image = extract_image(&response).unwrap();
        assert_eq!(image.data_url(), "data:image/jpeg;base64,AAEC");
    }

    #[test]
    fn test_extract_image_defaults_mime_type() {
        let body = r#"{"candidates":[{"content":{"parts":[{"inlineData":{"data":"AAEC"}}]}}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(body).unwrap();
        assert_eq!(extract_image(&response).unwrap().mime_type, "image/png");
    }

    #[test]
    fn test_missing_image_is_no_image_error() {
        let response: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates":[{"content":{"parts":[{"text":"sorry"}]}}]}"#).unwrap();
        let error = extract_image(&response).unwrap_err();
        assert!(matches!(error, GenerationError::NoImage));
        assert!(!error.is_credential());
    }
}
