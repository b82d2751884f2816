//! Turns raw extraction output into a single [`ExtractedRecipe`].
//!
//! Models sometimes wrap the JSON in a Markdown code fence and sometimes
//! return a one-element array instead of an object. Both are accepted; the
//! first element of an array wins.

use crate::error::SkipReason;
use crate::models::ExtractedRecipe;

/// Removes surrounding whitespace and a ```` ```json ```` / ```` ``` ```` fence.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Parses a response into exactly one record.
pub fn normalize_response(raw: &str) -> Result<ExtractedRecipe, SkipReason> {
    let text = strip_code_fence(raw);

    if text.starts_with('[') {
        let recipes: Vec<ExtractedRecipe> =
            serde_json::from_str(text).map_err(|e| SkipReason::Decode {
                shape: "array",
                message: e.to_string(),
                text: text.to_string(),
            })?;
        return recipes.into_iter().next().ok_or(SkipReason::EmptyArray);
    }

    serde_json::from_str(text).map_err(|e| SkipReason::Decode {
        shape: "object",
        message: e.to_string(),
        text: text.to_string(),
    })
}
