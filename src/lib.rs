//! Turns a web page into a catalog of generated UI components.
//!
//! A page is fetched into [`signals::PageSignals`], rendered into a prompt,
//! sent to the first available AI provider, and the reply is normalized into
//! an [`analysis::AnalysisResult`]. When no provider answers usefully the
//! deterministic [`fallback`] data is returned instead.

pub mod analysis;
pub mod client;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod fallback;
pub mod normalize;
pub mod pipeline;
pub mod prompt;
pub mod provider;
pub mod ratelimit;
pub mod retry;
pub mod scrape;
pub mod server;
pub mod signals;
pub mod types;

pub use analysis::{AiProvider, AnalysisResult, ComponentSpec};
pub use config::Config;
pub use dispatch::{DispatchError, Dispatcher};
pub use pipeline::{AnalyzeOutcome, Analyzer, ComponentsOutcome};
pub use provider::{Provider, ProviderDescriptor, ProviderError, ProviderName, ProviderRegistry};
pub use retry::RetryPolicy;
pub use signals::PageSignals;
