// Shared prompt fragments and prompt-building utilities.
// Each operation defines its own system instruction and template alongside it;
// this file holds the cross-cutting pieces.

use serde_json::Value;

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Instruction shared by every operation that reports a numeric score.
pub const SCORE_SENTINEL_INSTRUCTION: &str = "\
    If a score cannot be determined from the material provided, return exactly -1 \
    for it. Never return null and never omit a score field.";

/// Builds the full system prompt for a structured-output call: the operation's
/// own instruction, the JSON-only rule, and the output JSON Schema.
pub fn structured_output_system(operation_system: &str, output_schema: &Value) -> String {
    let schema = serde_json::to_string_pretty(output_schema).unwrap_or_default();
    format!(
        "{operation_system}\n\n{JSON_ONLY_SYSTEM}\n\n\
         The JSON object MUST conform to this JSON Schema:\n{schema}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_output_system_embeds_schema() {
        let schema = serde_json::json!({"type": "object", "required": ["coverLetter"]});
        let system = structured_output_system("You write cover letters.", &schema);
        assert!(system.starts_with("You write cover letters."));
        assert!(system.contains(JSON_ONLY_SYSTEM));
        assert!(system.contains("\"coverLetter\""));
    }
}
