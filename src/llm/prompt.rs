//! llm/prompt.rs
//!
//! Prompt text for AI test generation.

/* ============================================================
   Fixed instructions
   ============================================================ */

const INSTRUCTIONS: &str = "Generate comprehensive PHPUnit tests for the following PHP class. \
The tests should cover all public methods, edge cases, and follow Laravel testing best practices. \
Use Pest PHP syntax and include proper setup, teardown, and assertions.";

const OUTPUT_RULE: &str = "Generate only the test code, no explanations or markdown formatting.";

/// Used by the connection probe.
pub const PROBE_PROMPT: &str = "Generate a simple PHP test for a basic class.";

/* ============================================================
   Builders
   ============================================================ */

pub fn build_prompt(source: &str, custom: Option<&str>) -> String {
    let mut out = String::new();
    out.push_str(INSTRUCTIONS);
    out.push_str("\n\n");

    if let Some(custom) = custom.filter(|c| !c.is_empty()) {
        out.push_str(&format!("Additional requirements: {custom}\n\n"));
    }

    out.push_str(&format!("Class to test:\n```php\n{source}\n```\n\n"));
    out.push_str(OUTPUT_RULE);
    out
}

/// `build_prompt` plus one `- key: value` line per context entry, in the
/// order given. No context section when `context` is empty.
pub fn build_context_prompt(
    source: &str,
    context: &[(String, String)],
    custom: Option<&str>,
) -> String {
    let mut out = build_prompt(source, custom);
    if context.is_empty() {
        return out;
    }

    out.push_str("\n\nAdditional context:\n");

    for (key, value) in context {
        out.push_str(&format!("- {key}: {value}\n"));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_source_in_a_php_fence() {
        let p = build_prompt("<?php class A {}", None);
        assert!(p.starts_with("Generate comprehensive PHPUnit tests"));
        assert!(p.contains("Class to test:\n```php\n<?php class A {}\n```\n\n"));
        assert!(p.ends_with(OUTPUT_RULE));
        assert!(!p.contains("Additional requirements"));
    }

    #[test]
    fn custom_requirements_come_before_the_class() {
        let p = build_prompt("class A {}", Some("Test edge cases"));
        let req = p.find("Additional requirements: Test edge cases\n\n").unwrap();
        let class = p.find("Class to test:").unwrap();
        assert!(req < class);
    }

    #[test]
    fn empty_custom_prompt_is_ignored() {
        assert_eq!(build_prompt("x", Some("")), build_prompt("x", None));
    }

    #[test]
    fn context_lines_follow_insertion_order() {
        let ctx = vec![
            ("framework".to_string(), "laravel".to_string()),
            ("database".to_string(), "mysql".to_string()),
        ];
        let p = build_context_prompt("class A {}", &ctx, None);

        assert!(p.ends_with(
            "\n\nAdditional context:\n- framework: laravel\n- database: mysql\n"
        ));
    }

    #[test]
    fn empty_context_adds_nothing() {
        assert_eq!(build_context_prompt("x", &[], None), build_prompt("x", None));
    }
}
