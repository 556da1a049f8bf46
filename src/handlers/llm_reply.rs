//! Handler for `llm_reply` jobs: generate a conversational reply.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::llm::{ChatMessage, CompletionClient, CompletionRequest};
use crate::types::{Job, JobPayload};

use super::{HandlerError, JobHandler};

/// Chat model used for reply generation.
const REPLY_MODEL: &str = "llama-3.1-8b-instant";

const MAX_TOKENS: u32 = 512;
const TEMPERATURE: f32 = 0.7;

/// Cap on how many context lines are folded into the prompt.
const MAX_CONTEXT_LINES: usize = 30;

/// Generates a reply to a chat message via the completion API.
///
/// Payload: `prompt` (or legacy `message`), `username`, optional
/// `guild_name`, optional `channel_context`: an array of
/// `[username, user_id, content]` triples in chronological order.
/// Result: `{"reply": <generated text>}`.
pub struct LlmReplyHandler {
    client: Arc<dyn CompletionClient>,
}

impl LlmReplyHandler {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        LlmReplyHandler { client }
    }
}

fn system_prompt(guild_name: Option<&str>) -> String {
    let mut prompt = String::from(
        "You are a friendly, professional assistant in a community chat \
         server. Reply conversationally and concisely to the user's \
         message, staying on topic. Never insult, harass, or attack any \
         person or group, and never encourage harm.",
    );
    if let Some(name) = guild_name {
        prompt.push_str(&format!(" The server is called \"{name}\"."));
    }
    prompt
}

/// Renders `channel_context` triples into prompt lines, newest last.
///
/// Entries that are not `[username, user_id, content]` string triples are
/// skipped rather than failing the job.
fn context_lines(context: &Value) -> Vec<String> {
    let Some(entries) = context.as_array() else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let triple = entry.as_array()?;
            let username = triple.first()?.as_str()?;
            let content = triple.get(2)?.as_str()?;
            Some(format!("{username}: {content}"))
        })
        .rev()
        .take(MAX_CONTEXT_LINES)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect()
}

#[async_trait]
impl JobHandler for LlmReplyHandler {
    fn job_type(&self) -> &str {
        super::job_types::LLM_REPLY
    }

    async fn run(&self, job: &Job) -> Result<JobPayload, HandlerError> {
        let payload = &job.payload;

        let prompt = payload
            .get("prompt")
            .or_else(|| payload.get("message"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        if prompt.is_empty() {
            return Err(HandlerError::InvalidPayload("empty prompt".into()));
        }

        let username = payload
            .get("username")
            .and_then(Value::as_str)
            .unwrap_or("friend");
        let guild_name = payload.get("guild_name").and_then(Value::as_str);

        let mut system = system_prompt(guild_name);
        if let Some(context) = payload.get("channel_context") {
            let lines = context_lines(context);
            if !lines.is_empty() {
                system.push_str("\n\nRecent channel messages, oldest first:\n");
                system.push_str(&lines.join("\n"));
            }
        }

        let request = CompletionRequest::new(
            REPLY_MODEL,
            vec![
                ChatMessage::system(system),
                ChatMessage::user(format!("{username}: {prompt}")),
            ],
        )
        .with_max_tokens(MAX_TOKENS)
        .with_temperature(TEMPERATURE);

        let reply = self.client.complete(request).await?;

        let mut fields = JobPayload::new();
        fields.insert("reply".into(), json!(reply));
        Ok(fields)
    }
}
