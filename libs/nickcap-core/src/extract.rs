use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use nickcap_api::event::RawPayload;

/// First `@` followed by a run of non-whitespace.
static MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@(\S+)").expect("mention pattern is valid"));

/// Extract the quoted/replied-to display name from a raw payload.
///
/// Descends `parallel_message` → `msg_nodes` → first node's `content` and
/// captures the first `@name` token. Every missing step is a normal
/// "no match", never an error. Pure: no state, no side effects.
pub fn quoted_mention(context: Option<&RawPayload>) -> Option<String> {
    let context = context?;
    let reply = context.get("parallel_message")?.as_object()?;
    let nodes = reply.get("msg_nodes")?.as_array()?;
    let content = nodes
        .first()?
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or("");

    let caps = MENTION.captures(content)?;
    Some(caps[1].trim().to_string())
}
