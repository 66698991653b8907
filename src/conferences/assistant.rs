use uuid::Uuid;

use crate::config::AssistantConfig;
use crate::{AppResult, AppState, GetField};

use super::chat::ChatEntry;

const TRIGGER_KEYWORDS: [&str; 2] = ["ai", "help"];

/// A question mark or a trigger word anywhere in the message asks the
/// assistant in, at most one call per triggering message. The keywords match
/// as bare substrings, so ordinary words like "again" or "wait" also fire;
/// that loose surface is part of the contract, not something to tighten to
/// word boundaries.
pub fn wants_reply(text: &str) -> bool {
    if text.contains('?') {
        return true;
    }
    let lower = text.to_lowercase();
    TRIGGER_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

fn build_prompt(config: &AssistantConfig, user_text: &str) -> serde_json::Value {
    serde_json::json!({
        "model": config.model,
        "contents": format!(
            "You are ChronoNexus AI, a helpful study assistant sitting in a \
             course conference. The participant says: \"{user_text}\". \
             Reply concisely, politely and usefully for a student."
        ),
    })
}

/// One single-turn call to the text-generation endpoint. No streaming, no
/// retries, no conversation memory.
pub async fn generate(
    http: &reqwest::Client,
    config: &AssistantConfig,
    user_text: &str,
) -> AppResult<String> {
    let value: serde_json::Value = http
        .post(&config.url)
        .bearer_auth(&config.api_key)
        .json(&build_prompt(config, user_text))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    value.get_str_field("text")
}

/// Fire the call and append the reply to the room's chat. Failures are logged
/// and dropped; chat participants see nothing.
pub(crate) async fn reply_round(state: AppState, room_id: Uuid, user_text: String) {
    let Some(config) = state.config.assistant.clone() else {
        return;
    };
    match generate(&state.http, &config, &user_text).await {
        Ok(text) => state.chats.append(room_id, ChatEntry::assistant(&text)),
        Err(err) => tracing::warn!(%room_id, "assistant call failed: {:#}", err.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_mark_triggers() {
        assert!(wants_reply("what is the homework?"));
        assert!(wants_reply("?"));
    }

    #[test]
    fn keywords_trigger_case_insensitively() {
        assert!(wants_reply("the AI should know"));
        assert!(wants_reply("HELP me with this"));
    }

    #[test]
    fn keywords_match_as_bare_substrings() {
        assert!(wants_reply("wait for me"));
        assert!(wants_reply("never again"));
    }

    #[test]
    fn plain_chatter_does_not_trigger() {
        assert!(!wants_reply("good morning everyone"));
        assert!(!wants_reply("see you tomorrow"));
    }

    #[test]
    fn prompt_carries_model_and_message() {
        let config = AssistantConfig {
            url: "http://localhost/generate".to_owned(),
            api_key: "k".to_owned(),
            model: "nexus-text-1".to_owned(),
        };
        let body = build_prompt(&config, "when is the exam?");
        assert_eq!(body["model"], "nexus-text-1");
        assert!(body["contents"].as_str().unwrap().contains("when is the exam?"));
    }
}
