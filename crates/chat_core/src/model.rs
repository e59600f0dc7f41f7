use serde::{Deserialize, Serialize};

/// USD per 1000 tokens.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Pricing {
    pub input: f64,
    pub output: f64,
}

/// One entry of the closed model catalog. Resolved once at selection time;
/// everything downstream reads capabilities and pricing from here instead of
/// probing loosely-typed provider config.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpec {
    pub id: &'static str,
    pub display_name: &'static str,
    pub max_tokens: u32,
    pub supports_streaming: bool,
    pub supports_web_search: bool,
    pub supports_reasoning: bool,
    pub pricing: Option<Pricing>,
}

pub const DEFAULT_MODEL: &str = "openai/chatgpt-4o-latest";

const fn spec(
    id: &'static str,
    display_name: &'static str,
    max_tokens: u32,
    supports_web_search: bool,
    supports_reasoning: bool,
    input: f64,
    output: f64,
) -> ModelSpec {
    ModelSpec {
        id,
        display_name,
        max_tokens,
        supports_streaming: true,
        supports_web_search,
        supports_reasoning,
        pricing: Some(Pricing { input, output }),
    }
}

static CATALOG: &[ModelSpec] = &[
    spec("openai/gpt-5", "GPT-5", 16000, true, true, 0.005, 0.015),
    spec(
        "openai/gpt-4.5-preview",
        "GPT-4.5 preview",
        16000,
        true,
        false,
        0.0005,
        0.0015,
    ),
    spec(
        "openai/chatgpt-4o-latest",
        "chatgpt-4o-latest",
        16000,
        true,
        true,
        0.003,
        0.015,
    ),
    spec(
        "openrouter/polaris-alpha",
        "GPT-5.1 Beta",
        16000,
        true,
        false,
        0.015,
        0.075,
    ),
    spec(
        "google/gemini-2.5-pro",
        "Gemini 2.5 Pro",
        64000,
        true,
        true,
        0.00025,
        0.00125,
    ),
    spec(
        "google/gemini-2.5-flash",
        "Gemini 2.5 Flash",
        64000,
        true,
        true,
        0.00025,
        0.0005,
    ),
    spec(
        "anthropic/claude-haiku-4.5",
        "Claude Haiku 4.5",
        64000,
        true,
        true,
        0.0025,
        0.0075,
    ),
    spec(
        "anthropic/claude-sonnet-4.5",
        "Claude Sonnet 4.5",
        64000,
        true,
        true,
        0.003,
        0.009,
    ),
    spec(
        "anthropic/claude-opus-4.1",
        "Claude Opus 4.1",
        16000,
        true,
        true,
        0.0008,
        0.0024,
    ),
    spec(
        "nousresearch/hermes-3-llama-3.1-70b",
        "nousresearch",
        16000,
        true,
        false,
        0.00024,
        0.00024,
    ),
    spec(
        "deepseek/deepseek-v3.2-exp",
        "DeepSeek v3.2-exp",
        16000,
        true,
        false,
        0.00014,
        0.00028,
    ),
];

pub fn catalog() -> &'static [ModelSpec] {
    CATALOG
}

pub fn lookup(id: &str) -> Option<&'static ModelSpec> {
    CATALOG.iter().find(|model| model.id == id)
}
