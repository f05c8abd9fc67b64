//! Top-level analysis flow: fetch → prompt → dispatch → normalize, or fallback.
//!
//! Only a failed page fetch is reported as an error. Everything after the page
//! is in hand resolves to a valid result, real or fallback.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::analysis::{AiProvider, AnalysisResult, ComponentSpec};
use crate::dispatch::Dispatcher;
use crate::fallback::{fallback_analysis, fallback_components};
use crate::normalize::{normalize_analysis, normalize_components};
use crate::prompt::{build_analysis_request, build_components_request};
use crate::scrape::{FetchError, PageFetcher, ScreenshotSource};
use crate::signals::PageSignals;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeOutcome {
    pub success: bool,
    pub analysis: AnalysisResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentsOutcome {
    pub success: bool,
    pub components: Vec<ComponentSpec>,
    pub ai_provider: AiProvider,
}

pub struct Analyzer {
    fetcher: Arc<dyn PageFetcher>,
    screenshots: Option<Arc<dyn ScreenshotSource>>,
    dispatcher: Dispatcher,
}

impl Analyzer {
    pub fn new(fetcher: Arc<dyn PageFetcher>, dispatcher: Dispatcher) -> Self {
        Self {
            fetcher,
            screenshots: None,
            dispatcher,
        }
    }

    pub fn with_screenshots(mut self, source: Arc<dyn ScreenshotSource>) -> Self {
        self.screenshots = Some(source);
        self
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn fetcher(&self) -> &dyn PageFetcher {
        self.fetcher.as_ref()
    }

    /// Fetch a page and analyze it. Fails only when the page can't be fetched.
    pub async fn analyze(&self, url: &str) -> Result<AnalyzeOutcome, FetchError> {
        let signals = self.fetcher.fetch(url).await?;
        let image = self.capture(&signals.url).await;
        let analysis = self.analyze_signals(&signals, image.as_deref()).await;
        Ok(AnalyzeOutcome {
            success: true,
            analysis,
        })
    }

    /// Analyze already-fetched signals. Never fails.
    pub async fn analyze_signals(&self, signals: &PageSignals, image: Option<&str>) -> AnalysisResult {
        let request = build_analysis_request(signals, image, None);

        let (raw, provider) = match self.dispatcher.dispatch(&request).await {
            Ok(found) => found,
            Err(e) => {
                log::warn!("Using fallback analysis for {}: {e}", signals.url);
                return fallback_analysis(signals, unix_now());
            }
        };

        match normalize_analysis(&raw, provider, unix_now()) {
            Ok(analysis) => {
                log::info!("AI analysis parsed ({provider})");
                analysis
            }
            Err(e) => {
                log::warn!("{provider} response unusable, using fallback analysis: {e}");
                log::debug!("Raw response: {}", crate::signals::truncate_chars(&raw, 500));
                fallback_analysis(signals, unix_now())
            }
        }
    }

    /// Second pass: turn an analysis into components. Never fails.
    pub async fn generate_components(&self, analysis: &AnalysisResult) -> ComponentsOutcome {
        let request = build_components_request(analysis);

        let fallback = || ComponentsOutcome {
            success: true,
            components: fallback_components(),
            ai_provider: AiProvider::Fallback,
        };

        let (raw, provider) = match self.dispatcher.dispatch(&request).await {
            Ok(found) => found,
            Err(e) => {
                log::warn!("Using fallback components: {e}");
                return fallback();
            }
        };

        match normalize_components(&raw) {
            Ok(components) => {
                log::info!("Generated {} components with {provider}", components.len());
                ComponentsOutcome {
                    success: true,
                    components,
                    ai_provider: provider.into(),
                }
            }
            Err(e) => {
                log::warn!("{provider} component response unusable, using fallback: {e}");
                fallback()
            }
        }
    }

    async fn capture(&self, url: &str) -> Option<String> {
        let source = self.screenshots.as_ref()?;
        match source.capture(url).await {
            Ok(image) => Some(image),
            Err(e) => {
                log::info!("Continuing without screenshot: {e}");
                None
            }
        }
    }
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
