use serde::{Deserialize, Serialize};

use crate::model::Pricing;

/// Token accounting for one completed assistant turn. Computed once from the
/// provider's usage report and the model's price table; immutable afterwards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct UsageSummary {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    /// USD. Zero when the model has no pricing defined.
    pub cost: f64,
}

impl UsageSummary {
    pub fn from_counts(
        input_tokens: u64,
        output_tokens: u64,
        total_tokens: Option<u64>,
        pricing: Option<&Pricing>,
    ) -> Self {
        let total_tokens = total_tokens.unwrap_or(input_tokens + output_tokens);
        let cost = pricing
            .map(|p| {
                (input_tokens as f64 / 1000.0) * p.input
                    + (output_tokens as f64 / 1000.0) * p.output
            })
            .unwrap_or(0.0);

        Self {
            input_tokens,
            output_tokens,
            total_tokens,
            cost,
        }
    }
}
