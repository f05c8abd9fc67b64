use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::types::{FieldDef, TypeDef};

/// Which backend produced a result. `Fallback` marks deterministic output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    Groq,
    Openai,
    Anthropic,
    Google,
    Fallback,
}

impl AiProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiProvider::Groq => "groq",
            AiProvider::Openai => "openai",
            AiProvider::Anthropic => "anthropic",
            AiProvider::Google => "google",
            AiProvider::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for AiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutType {
    #[default]
    SingleColumn,
    MultiColumn,
    Dashboard,
    #[serde(other)]
    Unknown,
}

pub const LAYOUT_NAMES: &[&str] = &["single-column", "multi-column", "dashboard"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub structure: Structure,
    #[serde(default)]
    pub components: Vec<ComponentSpec>,
    #[serde(default)]
    pub design_system: DesignSystem,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    pub ai_provider: AiProvider,
    pub timestamp: u64,
}

impl AnalysisResult {
    pub fn is_fallback(&self) -> bool {
        self.ai_provider == AiProvider::Fallback
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Structure {
    #[serde(default)]
    pub layout: LayoutType,
    #[serde(default)]
    pub sections: Vec<SectionSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionSpec {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl SectionSpec {
    pub fn new(id: &str, kind: &str, name: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: kind.to_string(),
            name: name.to_string(),
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default)]
    pub props: Vec<PropSpec>,
    #[serde(default)]
    pub dependencies: BTreeSet<String>,
}

impl ComponentSpec {
    pub fn new(name: &str, kind: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            description: description.to_string(),
            ..Self::default()
        }
    }

    pub fn with_code(mut self, code: &str) -> Self {
        self.code = Some(code.to_string());
        self
    }

    pub fn with_prop(mut self, name: &str, ty: &str, required: bool) -> Self {
        self.props.push(PropSpec {
            name: name.to_string(),
            kind: ty.to_string(),
            required,
            description: None,
        });
        self
    }

    pub fn with_dependencies(mut self, deps: &[&str]) -> Self {
        self.dependencies.extend(deps.iter().map(|d| d.to_string()));
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropSpec {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesignSystem {
    #[serde(default)]
    pub tokens: Vec<DesignToken>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesignToken {
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub value: String,
}

impl DesignToken {
    pub fn new(name: &str, category: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            value: value.to_string(),
        }
    }
}

fn section_typedef() -> TypeDef {
    TypeDef::Object(vec![
        FieldDef::required("id", TypeDef::Text),
        FieldDef::required("type", TypeDef::Text),
        FieldDef::required("name", TypeDef::Text),
        FieldDef::optional("description", TypeDef::Text),
    ])
}

fn component_typedef(with_code: bool) -> TypeDef {
    let mut fields = vec![
        FieldDef::required("name", TypeDef::Text),
        FieldDef::optional("type", TypeDef::Text),
        FieldDef::optional("description", TypeDef::Text),
    ];
    if with_code {
        fields.push(FieldDef::optional("code", TypeDef::Code));
    }
    fields.push(FieldDef::optional(
        "props",
        TypeDef::List(Box::new(TypeDef::Object(vec![
            FieldDef::required("name", TypeDef::Text),
            FieldDef::optional("type", TypeDef::Text),
            FieldDef::optional("required", TypeDef::Bool),
            FieldDef::optional("description", TypeDef::Text),
        ]))),
    ));
    fields.push(FieldDef::optional(
        "dependencies",
        TypeDef::List(Box::new(TypeDef::Text)),
    ));
    TypeDef::Object(fields)
}

/// TypeDef for AnalysisResult as returned by a model. Everything is optional
/// so partial answers still parse; types are still enforced when present.
pub fn analysis_typedef() -> TypeDef {
    TypeDef::Object(vec![
        FieldDef::optional("title", TypeDef::Text),
        FieldDef::optional("description", TypeDef::Text),
        FieldDef::optional(
            "structure",
            TypeDef::Object(vec![
                FieldDef::optional("layout", TypeDef::OneOf(LAYOUT_NAMES)),
                FieldDef::optional("sections", TypeDef::List(Box::new(section_typedef()))),
            ]),
        ),
        FieldDef::optional("components", TypeDef::List(Box::new(component_typedef(false)))),
        FieldDef::optional(
            "designSystem",
            TypeDef::Object(vec![FieldDef::optional(
                "tokens",
                TypeDef::List(Box::new(TypeDef::Object(vec![
                    FieldDef::required("name", TypeDef::Text),
                    FieldDef::optional("category", TypeDef::Text),
                    FieldDef::optional("value", TypeDef::Text),
                ]))),
            )]),
        ),
        FieldDef::optional("metadata", TypeDef::Map(Box::new(TypeDef::Text))),
    ])
}

/// TypeDef for the component generation pass. `components` is mandatory.
pub fn components_typedef() -> TypeDef {
    TypeDef::Object(vec![FieldDef::required(
        "components",
        TypeDef::List(Box::new(component_typedef(true))),
    )])
}
