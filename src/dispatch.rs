use crate::prompt::GenerationRequest;
use crate::provider::{ProviderError, ProviderName, ProviderRegistry};
use crate::retry::RetryPolicy;

/// Every active provider failed (or none is configured).
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchError {
    AllProvidersExhausted {
        failures: Vec<(ProviderName, ProviderError)>,
    },
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchError::AllProvidersExhausted { failures } if failures.is_empty() => {
                write!(f, "no AI providers configured")
            }
            DispatchError::AllProvidersExhausted { failures } => {
                write!(f, "all AI providers failed:")?;
                for (name, e) in failures {
                    write!(f, " [{name}: {e}]")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for DispatchError {}

/// Tries providers in priority order, each under the retry policy.
#[derive(Clone)]
pub struct Dispatcher {
    registry: ProviderRegistry,
    retry: RetryPolicy,
}

impl Dispatcher {
    pub fn new(registry: ProviderRegistry, retry: RetryPolicy) -> Self {
        Self { registry, retry }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Return the first successful raw response and the provider that made it.
    ///
    /// Providers without vision support receive the request with its image
    /// removed. Calls are strictly sequential.
    pub async fn dispatch(
        &self,
        request: &GenerationRequest,
    ) -> Result<(String, ProviderName), DispatchError> {
        let mut failures = Vec::new();

        for provider in self.registry.providers() {
            let descriptor = provider.descriptor();
            let name = descriptor.name;

            let effective = if request.image.is_some() && !descriptor.supports_vision {
                log::debug!("{name} has no vision support; sending text-only request");
                request.text_only()
            } else {
                request.clone()
            };

            log::info!("Trying AI provider {name}");
            let label = format!("provider {name}");
            let provider = provider.as_ref();
            let effective = &effective;
            let result = self
                .retry
                .run(&label, move |_| provider.generate(effective))
                .await;

            match result {
                Ok(text) => {
                    log::info!("AI provider {name} responded ({} chars)", text.len());
                    log::debug!(
                        "{name} response preview: {}",
                        crate::signals::truncate_chars(&text, 500)
                    );
                    return Ok((text, name));
                }
                Err(e) => {
                    log::warn!("AI provider {name} failed: {e}");
                    failures.push((name, e));
                }
            }
        }

        Err(DispatchError::AllProvidersExhausted { failures })
    }
}
