//! Turns page signals or a prior analysis into a provider-agnostic request.
//!
//! Output is a pure function of the inputs: no clock, no randomness. Every
//! embedded field is capped on its own before concatenation. The output
//! schema and closing instructions are always kept whole; only the page data
//! in front of them can be cut to fit [`MAX_PROMPT_CHARS`].

use std::collections::BTreeMap;

use serde::Serialize;

use crate::analysis::{analysis_typedef, components_typedef, AnalysisResult};
use crate::signals::{truncate_chars, PageSignals};
use crate::types::describe_schema;

pub const MAX_PROMPT_CHARS: usize = 24_000;

const HTML_CAP: usize = 4_000;
const TEXT_CAP: usize = 1_500;
const META_CAP: usize = 2_000;
const CSS_CAP: usize = 2_000;
const FIELD_CAP: usize = 300;
const URL_CAP: usize = 150;
const LABEL_CAP: usize = 60;
const LINK_LIMIT: usize = 10;
const IMAGE_LIMIT: usize = 10;
const SHEET_LIMIT: usize = 10;
const META_ENTRY_LIMIT: usize = 30;
const ANALYSIS_CAP: usize = 3_000;

const SCREENSHOT_NOTE: &str =
    "\nA screenshot of the page is attached. Use it to refine layout and colors.\n";

const ANALYSIS_SYSTEM: &str = "You are a senior UI/UX architect and React TypeScript expert. \
You analyze websites and describe their layout, sections, reusable components and design tokens. \
Return ONLY one valid JSON object: no markdown code fences, no explanations, no text before or after it.";

const COMPONENTS_SYSTEM: &str = "You are a senior React TypeScript architect. \
You turn website analyses into production-ready, accessible, responsive components styled with Tailwind CSS. \
Return ONLY one valid JSON object that starts with { and ends with }: no markdown code fences, no explanations.";

/// Provider-agnostic instruction packet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub system_instruction: String,
    pub user_prompt: String,
    /// Base64 or data URL. Ignored by providers without vision support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl GenerationRequest {
    /// Same request with the image and any mention of it removed.
    pub fn text_only(&self) -> Self {
        let mut user_prompt = self.user_prompt.clone();
        if self.image.is_some() {
            if let Some(at) = user_prompt.rfind(SCREENSHOT_NOTE) {
                user_prompt.replace_range(at..at + SCREENSHOT_NOTE.len(), "");
            }
        }
        Self {
            system_instruction: self.system_instruction.clone(),
            user_prompt,
            image: None,
        }
    }
}

/// Build the analysis request for a page.
pub fn build_analysis_request(
    signals: &PageSignals,
    image: Option<&str>,
    prior: Option<&AnalysisResult>,
) -> GenerationRequest {
    let mut s = String::new();

    s.push_str("Analyze this website for React component generation.\n\n");
    s.push_str("=== WEBSITE DATA ===\n");
    s.push_str(&format!("URL: {}\n", capped(&signals.url, FIELD_CAP)));
    s.push_str(&format!("Title: {}\n", capped(&signals.title, FIELD_CAP)));
    s.push_str(&format!(
        "Description: {}\n\n",
        capped(&signals.description, FIELD_CAP)
    ));

    s.push_str(&format!("HTML STRUCTURE (first {HTML_CAP} chars):\n"));
    s.push_str(capped(&signals.html_excerpt, HTML_CAP));
    s.push_str(&format!("\n\nTEXT CONTENT (first {TEXT_CAP} chars):\n"));
    s.push_str(capped(&signals.text_content, TEXT_CAP));

    s.push_str("\n\nMETA DATA:\n");
    let meta: BTreeMap<&str, &str> = signals
        .meta_data
        .iter()
        .take(META_ENTRY_LIMIT)
        .map(|(k, v)| (capped(k, LABEL_CAP), capped(v, FIELD_CAP)))
        .collect();
    s.push_str(capped(&to_json(&meta), META_CAP));

    let links = &signals.links[..signals.links.len().min(LINK_LIMIT)];
    s.push_str(&format!("\n\nLINKS ({} total, first {}):\n", signals.links.len(), links.len()));
    for link in links {
        s.push_str(&format!(
            "- {} -> {}{}\n",
            capped(&link.text, LABEL_CAP),
            capped(&link.absolute_url, URL_CAP),
            if link.is_external { " (external)" } else { "" }
        ));
    }

    let images = &signals.images[..signals.images.len().min(IMAGE_LIMIT)];
    s.push_str(&format!("\nIMAGES ({} total, first {}):\n", signals.images.len(), images.len()));
    for img in images {
        s.push_str(&format!(
            "- {} alt=\"{}\"\n",
            capped(&img.absolute_url, URL_CAP),
            capped(&img.alt, LABEL_CAP)
        ));
    }

    s.push_str("\nSTYLES:\n");
    if let Some(css) = &signals.style_hints.inline_css {
        s.push_str(&format!("Inline CSS (first {CSS_CAP} chars):\n"));
        s.push_str(capped(css, CSS_CAP));
        s.push('\n');
    }
    let sheets = &signals.style_hints.external_sheet_urls;
    for sheet in sheets.iter().take(SHEET_LIMIT) {
        s.push_str(&format!("- stylesheet {}\n", capped(sheet, URL_CAP)));
    }
    if sheets.len() > SHEET_LIMIT {
        s.push_str(&format!("- ... {} more stylesheets\n", sheets.len() - SHEET_LIMIT));
    }

    if let Some(prior) = prior {
        s.push_str("\n=== PREVIOUS ANALYSIS (refine it) ===\n");
        s.push_str(capped(&to_json(prior), ANALYSIS_CAP));
        s.push('\n');
    }

    let mut tail = String::new();
    if image.is_some() {
        tail.push_str(SCREENSHOT_NOTE);
    }
    tail.push_str("\n=== OUTPUT ===\n");
    tail.push_str("You must produce a JSON object that matches this schema:\n\n");
    tail.push_str(&describe_schema(&analysis_typedef(), 0));
    tail.push_str("\nIdentify the layout, every page section, the reusable components and the design tokens ");
    tail.push_str("(colors, typography, spacing). Use the exact key names above.\n");
    tail.push_str(CLOSING);

    GenerationRequest {
        system_instruction: ANALYSIS_SYSTEM.to_string(),
        user_prompt: assemble(&s, &tail),
        image: image.map(str::to_string),
    }
}

/// Build the component generation request from a finished analysis.
pub fn build_components_request(analysis: &AnalysisResult) -> GenerationRequest {
    let mut s = String::new();

    s.push_str("Generate a React TypeScript component library for the website analyzed below.\n\n");
    s.push_str("=== WEBSITE ANALYSIS ===\n");
    s.push_str(capped(&to_json(analysis), ANALYSIS_CAP));
    s.push_str("\n\n=== REQUIREMENTS ===\n");
    s.push_str("- 5 to 8 components: layout (Header, Hero, sections, Footer) and reusable UI pieces\n");
    s.push_str("- functional components with hooks and full TypeScript prop interfaces\n");
    s.push_str("- Tailwind CSS, mobile-first, hover and focus states\n");
    s.push_str("- semantic HTML, ARIA labels, keyboard navigation\n");
    s.push_str("- no placeholder comments\n");

    let mut tail = String::from("\n=== OUTPUT ===\n");
    tail.push_str("You must produce a JSON object that matches this schema:\n\n");
    tail.push_str(&describe_schema(&components_typedef(), 0));
    tail.push_str("\nPut the full TSX source of each component in \"code\" as a JSON string.\n");
    tail.push_str(CLOSING);

    GenerationRequest {
        system_instruction: COMPONENTS_SYSTEM.to_string(),
        user_prompt: assemble(&s, &tail),
        image: None,
    }
}

const CLOSING: &str = "Return ONLY valid JSON. Start with { and end with }.\n";

/// Page data first, then the instructions, which are never truncated.
fn assemble(body: &str, tail: &str) -> String {
    let room = MAX_PROMPT_CHARS.saturating_sub(tail.chars().count());
    let mut prompt = capped(body, room).to_string();
    prompt.push_str(tail);
    prompt
}

fn capped(s: &str, max: usize) -> &str {
    truncate_chars(s, max)
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}
