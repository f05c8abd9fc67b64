mod common;

use std::sync::Arc;

use common::{acme, analyzer, dispatcher, ScriptedProvider, StaticFetcher, StaticScreenshot};
use component_forge::scrape::{FetchError, ScreenshotError};
use component_forge::{AiProvider, Analyzer, ProviderError, ProviderName};

#[tokio::test]
async fn test_no_providers_falls_back_with_page_title() {
    let outcome = analyzer(acme(), vec![]).analyze("acme.test").await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.analysis.ai_provider, AiProvider::Fallback);
    assert_eq!(outcome.analysis.title, "Acme Inc");
    assert!(!outcome.analysis.structure.sections.is_empty());
}

#[tokio::test]
async fn test_fenced_reply_is_parsed_and_stamped() {
    let groq = ScriptedProvider::always(
        ProviderName::Groq,
        1,
        Ok("Sure! ```json\n{\"title\":\"X\",\"components\":[],\"aiProvider\":\"openai\",\"timestamp\":1}\n```".into()),
    );

    let outcome = analyzer(acme(), vec![groq]).analyze("acme.test").await.unwrap();

    assert_eq!(outcome.analysis.title, "X");
    assert!(outcome.analysis.components.is_empty());
    assert_eq!(outcome.analysis.ai_provider, AiProvider::Groq);
    assert!(outcome.analysis.timestamp > 1);
}

#[tokio::test]
async fn test_refusal_uses_fallback_without_retrying() {
    let groq = ScriptedProvider::always(ProviderName::Groq, 1, Ok("I cannot help with that.".into()));
    let openai = ScriptedProvider::always(ProviderName::Openai, 2, Ok("{\"title\":\"never\"}".into()));

    let outcome = analyzer(acme(), vec![groq.clone(), openai.clone()])
        .analyze("acme.test")
        .await
        .unwrap();

    assert_eq!(outcome.analysis.ai_provider, AiProvider::Fallback);
    assert_eq!(outcome.analysis.title, "Acme Inc");
    assert_eq!(groq.calls(), 1);
    assert_eq!(openai.calls(), 0);
}

#[tokio::test]
async fn test_fetch_failure_is_the_only_error() {
    let analyzer = Analyzer::new(
        Arc::new(StaticFetcher(Err(FetchError::Status(404)))),
        dispatcher(vec![]),
    );
    assert_eq!(analyzer.analyze("acme.test").await.unwrap_err(), FetchError::Status(404));
}

#[tokio::test]
async fn test_screenshot_reaches_vision_provider() {
    let openai = ScriptedProvider::new(ProviderName::Openai, 2, true, vec![Ok("{\"title\":\"Shot\"}".into())]);
    let analyzer = analyzer(acme(), vec![openai.clone()])
        .with_screenshots(Arc::new(StaticScreenshot(Ok("QUJD".into()))));

    let outcome = analyzer.analyze("acme.test").await.unwrap();

    assert_eq!(outcome.analysis.title, "Shot");
    assert_eq!(openai.requests()[0].image.as_deref(), Some("QUJD"));
}

#[tokio::test]
async fn test_text_only_provider_is_not_told_about_screenshot() {
    let groq = ScriptedProvider::new(ProviderName::Groq, 1, false, vec![Err(ProviderError::Auth("bad key".into()))]);
    let openai = ScriptedProvider::new(ProviderName::Openai, 2, true, vec![Ok("{\"title\":\"Shot\"}".into())]);
    let analyzer = analyzer(acme(), vec![groq.clone(), openai.clone()])
        .with_screenshots(Arc::new(StaticScreenshot(Ok("QUJD".into()))));

    analyzer.analyze("acme.test").await.unwrap();

    let blind = &groq.requests()[0];
    assert!(blind.image.is_none());
    assert!(!blind.user_prompt.contains("screenshot"));
    let sighted = &openai.requests()[0];
    assert_eq!(sighted.image.as_deref(), Some("QUJD"));
    assert!(sighted.user_prompt.contains("screenshot"));
}

#[tokio::test]
async fn test_failed_screenshot_means_no_image() {
    let openai = ScriptedProvider::new(ProviderName::Openai, 2, true, vec![Ok("{}".into())]);
    let analyzer = analyzer(acme(), vec![openai.clone()])
        .with_screenshots(Arc::new(StaticScreenshot(Err(ScreenshotError("no browser".into())))));

    let outcome = analyzer.analyze("acme.test").await.unwrap();

    assert_eq!(outcome.analysis.ai_provider, AiProvider::Openai);
    assert!(openai.requests()[0].image.is_none());
}

#[tokio::test]
async fn test_generate_components_from_model() {
    let groq = ScriptedProvider::always(
        ProviderName::Groq,
        1,
        Ok("Here are the components:\n{\"components\":[{\"name\":\"Hero\",\"type\":\"feature\",\"tsx_code\":\"export const Hero = () => <section/>;\"}]}".into()),
    );
    let analyzer = analyzer(acme(), vec![groq.clone()]);
    let analysis = component_forge::fallback::fallback_analysis(&acme(), 0);

    let outcome = analyzer.generate_components(&analysis).await;

    assert!(outcome.success);
    assert_eq!(outcome.ai_provider, AiProvider::Groq);
    assert_eq!(outcome.components[0].name, "Hero");
    assert!(groq.requests()[0].user_prompt.contains("Acme Inc"));
}

#[tokio::test]
async fn test_generate_components_falls_back_to_templates() {
    let groq = ScriptedProvider::always(ProviderName::Groq, 1, Err(ProviderError::Auth("revoked".into())));
    let analysis = component_forge::fallback::fallback_analysis(&acme(), 0);

    let outcome = analyzer(acme(), vec![groq]).generate_components(&analysis).await;

    assert!(outcome.success);
    assert_eq!(outcome.ai_provider, AiProvider::Fallback);
    assert_eq!(outcome.components.len(), 5);
    assert!(outcome.components.iter().all(|c| c.code.is_some()));
}
