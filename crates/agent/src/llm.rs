use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

use bookline_core::dialog::{ReplyError, ReplyGenerator};
use bookline_core::domain::BusinessContext;

use crate::prompt::build_system_prompt;
use crate::sanitize::dedupe_repeats;

const MAX_HISTORY: usize = 16;
const UNCLEAR_REPLY: &str = "I could not quite catch that, could you say it again?";

#[derive(Clone, Debug)]
pub struct LlmSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct HistoryEntry {
    role: Role,
    content: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Role {
    User,
    Assistant,
}

/// Completion-endpoint client. Keeps a trimmed per-session history and
/// rebuilds the system prompt every turn so business edits apply
/// immediately.
pub struct HttpLlmClient {
    settings: LlmSettings,
    api_key: Option<SecretString>,
    client: reqwest::Client,
    histories: Mutex<HashMap<String, Vec<HistoryEntry>>>,
}

impl HttpLlmClient {
    pub fn new(mut settings: LlmSettings) -> Result<Self, ReplyError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|error| ReplyError(error.to_string()))?;
        // Move the key out of the plain settings so it only lives wrapped.
        let api_key = settings.api_key.take().map(SecretString::from);

        Ok(Self { settings, api_key, client, histories: Mutex::new(HashMap::new()) })
    }

    pub fn clear_history(&self, session_id: &str) {
        let mut histories =
            self.histories.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        histories.remove(session_id);
    }

    fn render_prompt(&self, session_id: &str, utterance: &str, business: &BusinessContext) -> String {
        let system = build_system_prompt(business, Local::now().naive_local());

        let mut histories =
            self.histories.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let history = histories.entry(session_id.to_string()).or_default();
        history.push(HistoryEntry { role: Role::User, content: utterance.to_string() });
        trim_history(history);

        let mut parts = vec![format!("System: {system}")];
        for entry in history.iter() {
            let role = match entry.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            parts.push(format!("{role}: {}", entry.content));
        }
        parts.push("Assistant:".to_string());
        parts.join("\n")
    }

    fn record_reply(&self, session_id: &str, reply: &str) {
        let mut histories =
            self.histories.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let history = histories.entry(session_id.to_string()).or_default();
        history.push(HistoryEntry { role: Role::Assistant, content: reply.to_string() });
        trim_history(history);
    }
}

#[async_trait]
impl ReplyGenerator for HttpLlmClient {
    async fn generate_reply(
        &self,
        utterance: &str,
        session_id: &str,
        business: &BusinessContext,
    ) -> Result<String, ReplyError> {
        let prompt = self.render_prompt(session_id, utterance, business);

        let body = json!({
            "prompt": prompt,
            "model": self.settings.model,
            "max_tokens": self.settings.max_tokens,
            "temperature": self.settings.temperature,
            "stop": ["\nUser:", "\nUser", "User:", "\nSystem:", "System:"],
        });

        let mut request = self.client.post(&self.settings.base_url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request.send().await.map_err(|error| ReplyError(error.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ReplyError(format!("completion endpoint returned {status}")));
        }

        let payload: Value =
            response.json().await.map_err(|error| ReplyError(error.to_string()))?;
        let Some(raw) = extract_completion(&payload) else {
            return Ok(UNCLEAR_REPLY.to_string());
        };

        let reply = dedupe_repeats(&raw);
        if reply.is_empty() {
            return Ok(UNCLEAR_REPLY.to_string());
        }

        self.record_reply(session_id, &reply);
        tracing::debug!(
            event_name = "agent.reply_generated",
            session_id,
            business_id = %business.id,
            length = reply.len(),
            "reply generated"
        );
        Ok(reply)
    }
}

/// Deployments without a completion endpoint still answer chit-chat turns
/// with a useful nudge toward the booking flow.
#[derive(Clone, Debug, Default)]
pub struct CannedReplyGenerator;

#[async_trait]
impl ReplyGenerator for CannedReplyGenerator {
    async fn generate_reply(
        &self,
        _utterance: &str,
        _session_id: &str,
        business: &BusinessContext,
    ) -> Result<String, ReplyError> {
        Ok(format!(
            "Hello, this is {} from {}. I can help you book an appointment; for example, \
             say \"an appointment on Friday at 14:00\".",
            business.agent_name, business.name
        ))
    }
}

fn trim_history(history: &mut Vec<HistoryEntry>) {
    if history.len() > MAX_HISTORY {
        let excess = history.len() - MAX_HISTORY;
        history.drain(..excess);
    }
}

/// Pull the completion text out of the usual response shapes:
/// `choices[0].text`, `choices[0].message.content`, or a handful of
/// well-known top-level keys.
fn extract_completion(payload: &Value) -> Option<String> {
    if let Some(text) = payload.as_str() {
        return non_empty(text);
    }

    if let Some(first_choice) = payload.get("choices").and_then(|choices| choices.get(0)) {
        if let Some(text) = first_choice.get("text").and_then(Value::as_str) {
            return non_empty(text);
        }
        if let Some(content) = first_choice
            .get("message")
            .and_then(|message| message.get("content"))
            .and_then(Value::as_str)
        {
            return non_empty(content);
        }
    }

    for key in ["output", "text", "content", "response", "result", "generated_text"] {
        if let Some(text) = payload.get(key).and_then(Value::as_str) {
            if let Some(text) = non_empty(text) {
                return Some(text);
            }
        }
    }
    None
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
