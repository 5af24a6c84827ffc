use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info};
use newsroom_core::{ensure_attribution, fallback_body, strip_attribution, Language};

use crate::services::{RewriteRequest, RewriteService, ServiceError, TranslationService};

/// Which tier produced a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Generative = 1,
    Translation = 2,
    Fallback = 3,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Generative => "generative",
            Tier::Translation => "translation",
            Tier::Fallback => "fallback",
        };
        write!(f, "tier {} ({name})", *self as u8)
    }
}

/// Never-empty body for one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteResult {
    pub language: Language,
    pub body: String,
    pub tier: Tier,
}

/// What the chain needs to know about one entry.
#[derive(Debug, Clone, Copy)]
pub struct RewriteInput<'a> {
    pub title: &'a str,
    pub text: &'a str,
    pub source_name: &'a str,
    pub link: &'a str,
}

/// Ordered fallback: generative rewrite, then translation (secondary
/// languages only), then the local fallback body.
#[derive(Clone)]
pub struct RewriteChain {
    rewriter: Arc<dyn RewriteService>,
    translator: Arc<dyn TranslationService>,
    generation_timeout: Duration,
    translation_timeout: Duration,
}

impl RewriteChain {
    pub fn new(
        rewriter: Arc<dyn RewriteService>,
        translator: Arc<dyn TranslationService>,
        generation_timeout: Duration,
        translation_timeout: Duration,
    ) -> Self {
        Self {
            rewriter,
            translator,
            generation_timeout,
            translation_timeout,
        }
    }

    /// Render one language. `primary_generated` is the primary language's
    /// tier 1 body, when there is one; it feeds the translation tier.
    pub async fn render(
        &self,
        input: &RewriteInput<'_>,
        language: Language,
        primary_generated: Option<&str>,
    ) -> RewriteResult {
        let attribution = newsroom_core::attribution_line(language, input.source_name, input.link);
        let request = RewriteRequest {
            title: input.title,
            text: input.text,
            attribution: &attribution,
        };

        match bounded(self.generation_timeout, self.rewriter.rewrite(&request, language)).await {
            Ok(body) => {
                return RewriteResult {
                    language,
                    body: ensure_attribution(language, &body, &attribution),
                    tier: Tier::Generative,
                };
            }
            Err(ServiceError::NotConfigured) => {
                engine_debug!("{language}: generative rewrite not configured");
            }
            Err(err) => {
                engine_info!("{language}: generative rewrite failed for {}: {err}", input.link);
            }
        }

        if !language.is_primary() {
            if let Some(body) = self.translate(input, language, primary_generated).await {
                return RewriteResult {
                    language,
                    body: ensure_attribution(language, &body, &attribution),
                    tier: Tier::Translation,
                };
            }
        }

        engine_info!("{language}: using fallback body for {}", input.link);
        RewriteResult {
            language,
            body: fallback_body(language, input.title, input.text, &attribution),
            tier: Tier::Fallback,
        }
    }

    /// Render every language, primary first.
    pub async fn render_all(&self, input: &RewriteInput<'_>) -> Vec<RewriteResult> {
        let mut results: Vec<RewriteResult> = Vec::with_capacity(Language::ALL.len());
        let primary = self.render(input, Language::primary(), None).await;
        let primary_generated = (primary.tier == Tier::Generative)
            .then(|| strip_attribution(primary.language, &primary.body));
        results.push(primary);

        for language in Language::ALL.into_iter().filter(|l| !l.is_primary()) {
            let result = self
                .render(input, language, primary_generated.as_deref())
                .await;
            results.push(result);
        }
        results
    }

    async fn translate(
        &self,
        input: &RewriteInput<'_>,
        language: Language,
        primary_generated: Option<&str>,
    ) -> Option<String> {
        if !self.translator.is_configured() {
            engine_debug!("{language}: translation not configured, skipping tier");
            return None;
        }
        let source_text = primary_generated.unwrap_or(input.text);
        if source_text.trim().is_empty() {
            return None;
        }
        let call = self
            .translator
            .translate(source_text, Language::primary(), language);
        match bounded(self.translation_timeout, call).await {
            Ok(text) => Some(text),
            Err(err) => {
                engine_info!("{language}: translation failed for {}: {err}", input.link);
                None
            }
        }
    }
}

/// Apply the timeout and treat blank output as a failure.
async fn bounded<F>(limit: Duration, call: F) -> Result<String, ServiceError>
where
    F: Future<Output = Result<String, ServiceError>>,
{
    let text = tokio::time::timeout(limit, call)
        .await
        .map_err(|_| ServiceError::Timeout(limit))??;
    let text = text.trim();
    if text.is_empty() {
        return Err(ServiceError::EmptyResponse);
    }
    Ok(text.to_string())
}
