#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use component_forge::prompt::GenerationRequest;
use component_forge::scrape::{FetchError, PageFetcher, ScreenshotError, ScreenshotSource};
use component_forge::{
    Analyzer, Dispatcher, PageSignals, Provider, ProviderDescriptor, ProviderError, ProviderName,
    ProviderRegistry, RetryPolicy,
};

/// Provider that replays a fixed script of results, repeating the last one.
pub struct ScriptedProvider {
    descriptor: ProviderDescriptor,
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    last: Result<String, ProviderError>,
    calls: AtomicUsize,
    seen: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedProvider {
    pub fn new(
        name: ProviderName,
        priority: u32,
        supports_vision: bool,
        script: Vec<Result<String, ProviderError>>,
    ) -> Arc<Self> {
        let last = script
            .last()
            .cloned()
            .unwrap_or(Err(ProviderError::EmptyResponse));
        Arc::new(Self {
            descriptor: ProviderDescriptor::new(name, supports_vision, priority),
            script: Mutex::new(script.into()),
            last,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn always(name: ProviderName, priority: u32, result: Result<String, ProviderError>) -> Arc<Self> {
        Self::new(name, priority, false, vec![result])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.clone());
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.last.clone())
    }
}

/// Fetcher returning fixed signals, or an error.
pub struct StaticFetcher(pub Result<PageSignals, FetchError>);

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, _url: &str) -> Result<PageSignals, FetchError> {
        self.0.clone()
    }
}

pub struct StaticScreenshot(pub Result<String, ScreenshotError>);

#[async_trait]
impl ScreenshotSource for StaticScreenshot {
    async fn capture(&self, _url: &str) -> Result<String, ScreenshotError> {
        self.0.clone()
    }
}

pub fn registry(providers: Vec<Arc<ScriptedProvider>>) -> ProviderRegistry {
    ProviderRegistry::new(
        providers
            .into_iter()
            .map(|p| p as Arc<dyn Provider>)
            .collect(),
    )
}

pub fn dispatcher(providers: Vec<Arc<ScriptedProvider>>) -> Dispatcher {
    Dispatcher::new(registry(providers), RetryPolicy::immediate(3))
}

pub fn acme() -> PageSignals {
    PageSignals::new("https://acme.test/")
        .with_title("Acme Inc")
        .with_description("Rockets and more")
}

pub fn analyzer(signals: PageSignals, providers: Vec<Arc<ScriptedProvider>>) -> Analyzer {
    Analyzer::new(Arc::new(StaticFetcher(Ok(signals))), dispatcher(providers))
}
