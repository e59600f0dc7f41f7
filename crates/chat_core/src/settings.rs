use serde::{Deserialize, Serialize};

/// Bundled system prompt presets carried over from the original client.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PromptPreset {
    #[default]
    Default,
    Creative,
    Technical,
    Tutor,
    Custom,
}

impl PromptPreset {
    pub fn text(self) -> &'static str {
        match self {
            PromptPreset::Default => "You are a helpful AI assistant.",
            PromptPreset::Creative => {
                "You are a creative and imaginative AI assistant. Think outside the box and \
                 provide unique, innovative solutions."
            }
            PromptPreset::Technical => {
                "You are a technical expert AI assistant. Provide detailed, accurate technical \
                 information and code examples."
            }
            PromptPreset::Tutor => {
                "You are a patient and knowledgeable tutor. Explain concepts clearly and help \
                 users learn effectively."
            }
            PromptPreset::Custom => "",
        }
    }
}

/// Per-user sampling and prompt settings, persisted alongside conversations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: u32,
    pub system_prompt: String,
    #[serde(default)]
    pub prompt_preset: PromptPreset,
    #[serde(default)]
    pub web_search: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            temperature: 0.6,
            top_p: 0.93,
            max_tokens: 16000,
            system_prompt: PromptPreset::Default.text().to_string(),
            prompt_preset: PromptPreset::Default,
            web_search: false,
        }
    }
}

impl Settings {
    /// Switch presets, replacing the prompt text unless the preset is custom
    /// (custom keeps whatever the user typed).
    pub fn apply_preset(&mut self, preset: PromptPreset) {
        self.prompt_preset = preset;
        if preset != PromptPreset::Custom {
            self.system_prompt = preset.text().to_string();
        }
    }
}
