pub fn build_extraction_prompt(review_text: &str) -> String {
    format!(
        r#"Extract topics from the following user review.

INSTRUCTIONS:
1. Identify the subjects the reviewer talks about (problems, requests, praise)
2. Phrase each topic as a short noun phrase, e.g. "app crashes", "dark mode"
3. Output ONLY valid JSON, nothing else
4. Use the exact schema below

SCHEMA:
{{
  "topics": ["topic one", "topic two"]
}}

RULES:
- Use between 1 and 5 topics
- An empty list is allowed when the review has no clear subject
- Output ONLY the JSON object, no markdown, no explanations

REVIEW:
"""{}"""

JSON OUTPUT:"#,
        review_text
    )
}

pub fn build_retry_prompt(invalid_json: &str) -> String {
    format!(
        r#"The following JSON is invalid:

{}

Fix this JSON. Output only valid JSON with no markdown formatting, no code blocks, no explanations. Just the raw JSON object."#,
        invalid_json
    )
}
