use std::time::Duration;

use newsroom_core::Language;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::{json, Value};

use crate::settings::{GenerativeCredentials, TranslationCredentials};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("service not configured")]
    NotConfigured,
    #[error("request failed: {0}")]
    Request(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("http status {0}")]
    Status(u16),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("empty response")]
    EmptyResponse,
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        ServiceError::Request(err.to_string())
    }
}

/// Everything the generative service gets to see about an entry.
#[derive(Debug, Clone, Copy)]
pub struct RewriteRequest<'a> {
    pub title: &'a str,
    pub text: &'a str,
    /// Localized attribution line the article must end with.
    pub attribution: &'a str,
}

#[async_trait::async_trait]
pub trait RewriteService: Send + Sync {
    async fn rewrite(
        &self,
        request: &RewriteRequest<'_>,
        language: Language,
    ) -> Result<String, ServiceError>;
}

#[async_trait::async_trait]
pub trait TranslationService: Send + Sync {
    /// False when credentials are absent; callers then skip translation.
    fn is_configured(&self) -> bool;

    async fn translate(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> Result<String, ServiceError>;
}

/// Stand-in for a service without credentials.
///
/// Rewrites always fail with `NotConfigured`; translations pass the text
/// through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unconfigured;

#[async_trait::async_trait]
impl RewriteService for Unconfigured {
    async fn rewrite(&self, _: &RewriteRequest<'_>, _: Language) -> Result<String, ServiceError> {
        Err(ServiceError::NotConfigured)
    }
}

#[async_trait::async_trait]
impl TranslationService for Unconfigured {
    fn is_configured(&self) -> bool {
        false
    }

    async fn translate(&self, text: &str, _: Language, _: Language) -> Result<String, ServiceError> {
        Ok(text.to_string())
    }
}

const NEWSROOM_STYLE: &str = "You are a professional sports news writer. \
Rewrite the provided feed content into an original, newsroom-quality article.\n\
Constraints:\n\
1) Use fresh wording; never copy sentences verbatim.\n\
2) Write 3 to 7 short paragraphs.\n\
3) Keep a neutral, informative tone.\n\
4) Do not speculate beyond the feed content.\n\
5) Prefer cohesive paragraphs over bullet lists.\n\
6) Finish with the exact source line you are given, on its own line.";

/// JSON pointers to the generated text, in the order they are tried. The
/// service answers in more than one shape depending on the model.
pub const GENERATED_TEXT_SHAPES: &[&str] = &[
    "/result/response",
    "/result/output/0/content/0/text",
    "/choices/0/message/content",
    "/response",
];

/// First non-empty text found at any known response shape.
pub fn extract_generated_text(response: &Value) -> Option<String> {
    GENERATED_TEXT_SHAPES.iter().find_map(|pointer| {
        response
            .pointer(pointer)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    })
}

pub fn build_rewrite_payload(request: &RewriteRequest<'_>, language: Language) -> Value {
    let user = format!(
        "{instruction}\n\nTitle: {title}\n\nFeed content:\n{text}\n\nUse this exact source line at the end:\n{attribution}",
        instruction = language.writing_instruction(),
        title = request.title,
        text = request.text,
        attribution = request.attribution,
    );
    json!({
        "messages": [
            { "role": "system", "content": NEWSROOM_STYLE },
            { "role": "user", "content": user },
        ]
    })
}

/// Generative rewrite over the Workers AI `ai/run` endpoint.
pub struct WorkersAiRewriter {
    client: reqwest::Client,
    endpoint: String,
    api_token: String,
}

impl WorkersAiRewriter {
    pub fn new(credentials: &GenerativeCredentials, timeout: Duration) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let endpoint = format!(
            "{}/accounts/{}/ai/run/{}",
            credentials.api_base.trim_end_matches('/'),
            credentials.account_id,
            credentials.model
        );
        Ok(Self {
            client,
            endpoint,
            api_token: credentials.api_token.clone(),
        })
    }
}

#[async_trait::async_trait]
impl RewriteService for WorkersAiRewriter {
    async fn rewrite(
        &self,
        request: &RewriteRequest<'_>,
        language: Language,
    ) -> Result<String, ServiceError> {
        let payload = build_rewrite_payload(request, language);
        let body = serde_json::to_vec(&payload)
            .map_err(|e| ServiceError::InvalidResponse(e.to_string()))?;
        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_token))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Status(status.as_u16()));
        }
        let bytes = response.bytes().await?;
        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|e| ServiceError::InvalidResponse(e.to_string()))?;
        extract_generated_text(&value).ok_or(ServiceError::EmptyResponse)
    }
}

/// Translation over the DeepL v2 `translate` endpoint.
pub struct DeepLTranslator {
    client: reqwest::Client,
    endpoint: String,
    auth_key: String,
}

impl DeepLTranslator {
    pub fn new(credentials: &TranslationCredentials, timeout: Duration) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: credentials.endpoint.clone(),
            auth_key: credentials.auth_key.clone(),
        })
    }
}

#[async_trait::async_trait]
impl TranslationService for DeepLTranslator {
    fn is_configured(&self) -> bool {
        true
    }

    async fn translate(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> Result<String, ServiceError> {
        let form = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("text", text)
            .append_pair("source_lang", source.service_code())
            .append_pair("target_lang", target.service_code())
            .finish();
        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("DeepL-Auth-Key {}", self.auth_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Status(status.as_u16()));
        }
        let bytes = response.bytes().await?;
        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|e| ServiceError::InvalidResponse(e.to_string()))?;
        value
            .pointer("/translations/0/text")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
            .ok_or(ServiceError::EmptyResponse)
    }
}
