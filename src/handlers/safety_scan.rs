//! Handler for `safety_scan` jobs: classify message content.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::llm::{ChatMessage, CompletionClient, CompletionRequest};
use crate::types::{Job, JobPayload};

use super::{HandlerError, JobHandler};

/// Guard model used for classification.
const GUARD_MODEL: &str = "meta-llama/llama-guard-4-12b";

const MAX_TOKENS: u32 = 300;

const SYSTEM_PROMPT: &str = "You are a strict safety classifier. Analyze the provided chat \
     message content. Respond with compact JSON using the following shape: \
     {\"verdict\":\"safe\"|\"unsafe\",\"categories\":[\"...\"],\"details\":\"...\"}. \
     Mark any harassment, hate, self-harm, sexual, or violent content as unsafe.";

/// Classifies message content for safety violations.
///
/// Payload: `content`. Result: `{"verdict": {verdict, categories,
/// details?} | null}`. The verdict is null when the content is empty or the classifier
/// output is unusable, which downstream treats as "nothing to act on".
pub struct SafetyScanHandler {
    client: Arc<dyn CompletionClient>,
}

impl SafetyScanHandler {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        SafetyScanHandler { client }
    }
}

/// Parses the classifier's raw output into a structured verdict.
///
/// The model is asked for compact JSON but does not always comply, so two
/// fallbacks cover the common drift: a bare leading "safe", and any output
/// mentioning "unsafe" or "flag". Anything else is unusable.
fn parse_verdict(raw: &str) -> Option<Value> {
    let raw = raw.trim();

    if let Ok(parsed) = serde_json::from_str::<Value>(raw) {
        if parsed.is_object() && parsed.get("verdict").is_some() {
            return Some(parsed);
        }
    }

    let lowered = raw.to_lowercase();
    if lowered.starts_with("safe") {
        return Some(json!({"verdict": "safe", "categories": [], "details": raw}));
    }
    if lowered.contains("unsafe") || lowered.contains("flag") {
        return Some(json!({"verdict": "unsafe", "categories": [], "details": raw}));
    }
    None
}

#[async_trait]
impl JobHandler for SafetyScanHandler {
    fn job_type(&self) -> &str {
        super::job_types::SAFETY_SCAN
    }

    async fn run(&self, job: &Job) -> Result<JobPayload, HandlerError> {
        let content = job
            .payload
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default();

        let mut fields = JobPayload::new();
        if content.is_empty() {
            fields.insert("verdict".into(), Value::Null);
            return Ok(fields);
        }

        let request = CompletionRequest::new(
            GUARD_MODEL,
            vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(format!(
                    "Message:\n{content}\nReturn only the JSON verdict."
                )),
            ],
        )
        .with_max_tokens(MAX_TOKENS)
        .with_temperature(0.0);

        let raw = self.client.complete(request).await?;
        fields.insert(
            "verdict".into(),
            parse_verdict(&raw).unwrap_or(Value::Null),
        );
        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;

    struct CannedClient(String);

    #[async_trait]
    impl CompletionClient for CannedClient {
        async fn complete(&self, _request: CompletionRequest) -> Result<String, LlmError> {
            Ok(self.0.clone())
        }
    }

    fn payload_of(value: Value) -> JobPayload {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    // ─── Verdict parsing ───

    #[test]
    fn parses_compliant_json_verdict() {
        let raw = r#"{"verdict": "unsafe", "categories": ["harassment"], "details": "insult"}"#;
        let verdict = parse_verdict(raw).unwrap();
        assert_eq!(verdict["verdict"], "unsafe");
        assert_eq!(verdict["categories"][0], "harassment");
    }

    #[test]
    fn bare_safe_prefix_falls_back_to_safe_verdict() {
        let verdict = parse_verdict("Safe. No issues found.").unwrap();
        assert_eq!(verdict["verdict"], "safe");
    }

    #[test]
    fn mention_of_unsafe_falls_back_to_unsafe_verdict() {
        let verdict = parse_verdict("This content is UNSAFE because...").unwrap();
        assert_eq!(verdict["verdict"], "unsafe");
    }

    #[test]
    fn json_without_verdict_key_is_unusable() {
        assert!(parse_verdict(r#"{"category": "none"}"#).is_none());
    }

    #[test]
    fn unrelated_prose_is_unusable() {
        assert!(parse_verdict("I am a large language model.").is_none());
    }

    // ─── Handler behavior ───

    #[tokio::test]
    async fn empty_content_short_circuits_to_null_verdict() {
        let handler = SafetyScanHandler::new(Arc::new(CannedClient("unused".into())));
        let job = Job::new("safety_scan", payload_of(json!({"content": ""})));

        let fields = handler.run(&job).await.unwrap();
        assert_eq!(fields.get("verdict"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn classifier_verdict_is_returned_structured() {
        let handler = SafetyScanHandler::new(Arc::new(CannedClient(
            r#"{"verdict":"safe","categories":[]}"#.into(),
        )));
        let job = Job::new("safety_scan", payload_of(json!({"content": "hello"})));

        let fields = handler.run(&job).await.unwrap();
        assert_eq!(fields["verdict"]["verdict"], "safe");
    }

    #[tokio::test]
    async fn unusable_classifier_output_becomes_null_verdict() {
        let handler = SafetyScanHandler::new(Arc::new(CannedClient("no comment".into())));
        let job = Job::new("safety_scan", payload_of(json!({"content": "hello"})));

        let fields = handler.run(&job).await.unwrap();
        assert_eq!(fields.get("verdict"), Some(&Value::Null));
    }
}
