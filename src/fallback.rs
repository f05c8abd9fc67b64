//! Deterministic results used when no provider answers or the answer is unusable.
//!
//! Nothing here touches the network, the clock or randomness, and nothing can
//! fail: every function returns a complete, schema-valid value for any input.

use crate::analysis::{
    AiProvider, AnalysisResult, ComponentSpec, DesignSystem, DesignToken, LayoutType, SectionSpec,
    Structure,
};
use crate::signals::PageSignals;

const UNTITLED: &str = "Untitled Website";
const DEFAULT_DESCRIPTION: &str = "Website analysis completed";

const HEADER_TSX: &str = include_str!("../templates/header.tsx");
const HERO_TSX: &str = include_str!("../templates/hero_section.tsx");
const CARD_TSX: &str = include_str!("../templates/feature_card.tsx");
const FORM_TSX: &str = include_str!("../templates/contact_form.tsx");
const FOOTER_TSX: &str = include_str!("../templates/footer.tsx");

const REACT_DEPS: &[&str] = &["react", "@types/react", "lucide-react"];

/// Analysis built from page signals plus generic Header/MainContent/Footer placeholders.
pub fn fallback_analysis(signals: &PageSignals, timestamp: u64) -> AnalysisResult {
    AnalysisResult {
        title: non_blank(&signals.title, UNTITLED),
        description: non_blank(&signals.description, DEFAULT_DESCRIPTION),
        structure: Structure {
            layout: LayoutType::SingleColumn,
            sections: vec![
                SectionSpec::new("header", "header", "Header", "Site header with navigation"),
                SectionSpec::new("main", "content", "Main Content", "Primary page content"),
                SectionSpec::new("footer", "footer", "Footer", "Site footer"),
            ],
        },
        components: vec![
            ComponentSpec::new("Header", "navigation", "Main website header with navigation"),
            ComponentSpec::new("MainContent", "layout", "Main page content area"),
            ComponentSpec::new("Footer", "layout", "Website footer"),
        ],
        design_system: DesignSystem {
            tokens: vec![
                DesignToken::new("primary", "color", "#3B82F6"),
                DesignToken::new("secondary", "color", "#64748B"),
                DesignToken::new("fontFamily", "typography", "Inter, sans-serif"),
                DesignToken::new("spacingUnit", "spacing", "8px"),
            ],
        },
        metadata: signals.meta_data.clone(),
        ai_provider: AiProvider::Fallback,
        timestamp,
    }
}

/// The static template catalog.
pub fn fallback_components() -> Vec<ComponentSpec> {
    vec![
        ComponentSpec::new(
            "Header",
            "layout",
            "Responsive header with navigation and mobile menu",
        )
        .with_code(HEADER_TSX)
        .with_prop("logo", "string", false)
        .with_prop("navigationItems", "NavigationItem[]", true)
        .with_prop("onMenuToggle", "() => void", false)
        .with_prop("isMenuOpen", "boolean", false)
        .with_dependencies(REACT_DEPS),
        ComponentSpec::new("HeroSection", "feature", "Hero section with call-to-action buttons")
            .with_code(HERO_TSX)
            .with_prop("title", "string", true)
            .with_prop("subtitle", "string", false)
            .with_prop("description", "string", false)
            .with_prop("primaryAction", "ButtonProps", false)
            .with_prop("secondaryAction", "ButtonProps", false)
            .with_prop("backgroundImage", "string", false)
            .with_dependencies(REACT_DEPS),
        ComponentSpec::new("FeatureCard", "ui", "Feature card with multiple variants")
            .with_code(CARD_TSX)
            .with_prop("icon", "React.ComponentType", false)
            .with_prop("title", "string", true)
            .with_prop("description", "string", true)
            .with_prop("href", "string", false)
            .with_prop("variant", "'default' | 'highlighted' | 'minimal'", false)
            .with_dependencies(&["react", "@types/react"]),
        ComponentSpec::new("ContactForm", "feature", "Contact form with validation and loading state")
            .with_code(FORM_TSX)
            .with_prop("onSubmit", "(data: ContactFormData) => Promise<void>", true)
            .with_prop("isLoading", "boolean", false)
            .with_prop("className", "string", false)
            .with_dependencies(REACT_DEPS),
        ComponentSpec::new("Footer", "layout", "Footer with social links and navigation sections")
            .with_code(FOOTER_TSX)
            .with_prop("companyName", "string", true)
            .with_prop("socialLinks", "SocialLink[]", false)
            .with_prop("footerSections", "FooterSection[]", false)
            .with_dependencies(&["react", "@types/react"]),
    ]
}

fn non_blank(value: &str, default: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}
