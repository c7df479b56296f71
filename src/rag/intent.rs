//! Keyword/intent extraction on the fast model tier.
//!
//! The model's reply is untrusted text. It is parsed into an
//! [`IntentDecision`]; nothing here fails on a bad reply, only on a failed
//! completion.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::core::config::defaults::DEFAULT_NUM_RESULTS;
use crate::core::errors::ApiError;
use crate::llm::{ChatMessage, LlmService, ModelTier};
use crate::session::{Artifact, Exchange};

const SYSTEM_ROLE: &str = "\
You are the keyword identifier for a university course search system.
Given the student's latest message and their earlier messages, decide whether the latest message \
starts a NEW course search, continues the previous search, or is not a course search at all.
- Keep every word that could help identify a course: subjects, topics, instructor names, days, levels.
- Remove common words that could appear in the description of any course.
- When the latest message narrows or refines an earlier search, combine the relevant keywords.
- Expand subject abbreviations to the full subject name (for example bio -> Biology, stat -> Statistics, cs -> Computer Science).
- Use the number of courses the student asks for as num_results; default to 3.
Reply with JSON only: {\"keywords\": \"<keywords>\", \"num_results\": <integer>}.
Reply with null when the message is small talk, a question about you, or otherwise not a course search.";

struct FewShot {
    prior: &'static [&'static str],
    query: &'static str,
    reply: &'static str,
}

const FEW_SHOTS: [FewShot; 5] = [
    FewShot {
        prior: &[],
        query: "Please tell me about any classes that discuss algorithms and data structures, or perhaps differential privacy.",
        reply: r#"{"keywords": "algorithms data structures differential privacy", "num_results": 3}"#,
    },
    FewShot {
        prior: &["I'm looking for courses about machine learning"],
        query: "Only ones that focus on neural networks, and show me 5",
        reply: r#"{"keywords": "machine learning neural networks", "num_results": 5}"#,
    },
    FewShot {
        prior: &[],
        query: "any intro bio classes taught by John Clarkson on Mondays?",
        reply: r#"{"keywords": "introductory Biology John Clarkson Mondays", "num_results": 3}"#,
    },
    FewShot {
        prior: &["find me an upper level stat course"],
        query: "something about bayesian methods",
        reply: r#"{"keywords": "upper level Statistics bayesian methods", "num_results": 3}"#,
    },
    FewShot {
        prior: &["find me an upper level stat course"],
        query: "thanks! what's your name?",
        reply: "null",
    },
];

/// What the extractor made of the model's reply.
#[derive(Debug, Clone, PartialEq)]
pub enum IntentDecision {
    Search(SearchIntent),
    /// The model said this is not a course search.
    NotASearch,
    /// The reply could not be read; treated like [`IntentDecision::NotASearch`].
    Unparseable(String),
}

impl IntentDecision {
    pub fn search_intent(&self) -> Option<&SearchIntent> {
        match self {
            IntentDecision::Search(intent) => Some(intent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchIntent {
    pub keywords: String,
    pub num_results: usize,
}

#[derive(Clone)]
pub struct IntentExtractor {
    llm: LlmService,
    history_window: usize,
    max_results: usize,
}

impl IntentExtractor {
    pub fn new(llm: LlmService, history_window: usize, max_results: usize) -> Self {
        Self {
            llm,
            history_window,
            max_results: max_results.max(1),
        }
    }

    /// Runs one extraction. The returned artifact holds this call's
    /// prompt/response pair and becomes the exchange's audit record.
    pub async fn extract(
        &self,
        query: &str,
        prior_user_messages: &[String],
    ) -> Result<(IntentDecision, Artifact), ApiError> {
        let start = prior_user_messages.len().saturating_sub(self.history_window);
        let recent: Vec<&str> = prior_user_messages[start..]
            .iter()
            .map(String::as_str)
            .collect();

        let prompt = render_prompt(&recent, query);
        let completion = self
            .llm
            .complete(ModelTier::Fast, build_messages(&prompt))
            .await?;

        let decision = parse_intent(&completion.content, self.max_results);
        match &decision {
            IntentDecision::Search(intent) => tracing::info!(
                "Search intent: keywords='{}', num_results={}",
                intent.keywords,
                intent.num_results
            ),
            IntentDecision::NotASearch => tracing::debug!("No search intent for query"),
            IntentDecision::Unparseable(reason) => {
                tracing::warn!("Unparseable intent reply, skipping retrieval: {}", reason)
            }
        }

        let mut artifact = Artifact::new(query);
        artifact.append(Exchange::new(prompt, completion.raw, completion.content))?;
        Ok((decision, artifact))
    }
}

fn render_prompt(prior: &[&str], query: &str) -> String {
    let mut prompt = String::new();
    if prior.is_empty() {
        prompt.push_str("Earlier messages: none\n\n");
    } else {
        prompt.push_str("Earlier messages (oldest first):\n```\n");
        for message in prior {
            prompt.push_str(message.trim());
            prompt.push('\n');
        }
        prompt.push_str("```\n\n");
    }
    prompt.push_str("Latest message:\n```\n");
    prompt.push_str(query.trim());
    prompt.push_str("\n```");
    prompt
}

fn build_messages(prompt: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(2 + FEW_SHOTS.len() * 2);
    messages.push(ChatMessage::system(SYSTEM_ROLE));
    for shot in &FEW_SHOTS {
        messages.push(ChatMessage::user(render_prompt(shot.prior, shot.query)));
        messages.push(ChatMessage::assistant(shot.reply));
    }
    messages.push(ChatMessage::user(prompt));
    messages
}

fn code_fence() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?s)^```[A-Za-z]*\s*(.*?)\s*```$").ok())
        .as_ref()
}

/// Reads the extractor reply. Never fails; anything unexpected becomes
/// [`IntentDecision::Unparseable`].
pub fn parse_intent(raw: &str, max_results: usize) -> IntentDecision {
    let trimmed = raw.trim();
    let body = code_fence()
        .and_then(|fence| fence.captures(trimmed))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or(trimmed);

    if body.is_empty() {
        return IntentDecision::NotASearch;
    }

    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(err) => return IntentDecision::Unparseable(format!("malformed reply: {}", err)),
    };

    let object = match value {
        Value::Null => return IntentDecision::NotASearch,
        Value::Object(object) => object,
        other => {
            return IntentDecision::Unparseable(format!("expected object, got {}", other))
        }
    };

    let keywords = match object.get("keywords") {
        Some(Value::String(keywords)) => keywords.trim().to_string(),
        Some(Value::Null) => return IntentDecision::NotASearch,
        Some(other) => {
            return IntentDecision::Unparseable(format!("keywords is not a string: {}", other))
        }
        None => return IntentDecision::Unparseable("missing keywords".to_string()),
    };
    if keywords.is_empty() {
        return IntentDecision::NotASearch;
    }

    let num_results = match object.get("num_results") {
        None | Some(Value::Null) => DEFAULT_NUM_RESULTS,
        Some(value) => match value.as_u64() {
            Some(n) if n > 0 => usize::try_from(n).unwrap_or(usize::MAX),
            _ => {
                return IntentDecision::Unparseable(format!(
                    "num_results is not a positive integer: {}",
                    value
                ))
            }
        },
    };

    IntentDecision::Search(SearchIntent {
        keywords,
        num_results: num_results.min(max_results.max(1)),
    })
}
