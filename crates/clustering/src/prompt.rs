pub fn build_label_prompt(phrases: &[String]) -> String {
    let mut listed = String::new();
    for phrase in phrases {
        listed.push_str(&format!("- {}\n", phrase));
    }

    format!(
        r#"You are analyzing app store reviews.
The following phrases were extracted from different reviews and refer to the same subject:

{}
TASK:
1. Pick a short descriptive label that best summarizes the phrases
2. List all input phrases, unchanged, as synonyms
3. Classify the subject as one of: issue, request, feedback
4. Output ONLY valid JSON in the format below

{{
  "canonical_label": "<short descriptive label>",
  "synonyms": ["<phrase>", "..."],
  "topic_type": "<issue|request|feedback>"
}}

Output ONLY the JSON object, no markdown, no explanations.

JSON OUTPUT:"#,
        listed
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_prompt_lists_every_phrase() {
        let prompt = build_label_prompt(&["app crashes".to_string(), "app is crashing".to_string()]);
        assert!(prompt.contains("- app crashes\n- app is crashing\n"));
        assert!(prompt.contains("\"topic_type\""));
    }
}
