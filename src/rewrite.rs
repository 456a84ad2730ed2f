//! Paragraph rewriting through a chat-completion endpoint.
//!
//! One blocking POST per paragraph. There is no retry and no streaming; a
//! failed call leaves the caller with the original text.

use std::fmt;
use std::sync::LazyLock;

use log::{debug, error, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::model::DEFAULT_AI_PROBABILITY;

pub const DEFAULT_ENDPOINT: &str = "https://api.deepseek.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "deepseek-chat";

#[derive(Clone)]
pub struct EndpointConfig {
    pub url: String,
    pub model: String,
    pub api_key: String,
}

impl EndpointConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        EndpointConfig {
            url: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.into(),
        }
    }
}

// The key stays out of logs and panics.
impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromptMode {
    /// Static humanization prompt; the reply is the rewritten text.
    Fixed,
    /// Strategy chosen from the paragraph's AI-probability; the reply is a
    /// JSON object carrying a fresh probability and the rewritten text.
    Graduated,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intensity {
    Deep,
    Moderate,
    Light,
    KeepAsIs,
}

impl Intensity {
    pub fn for_probability(probability: u8) -> Self {
        match probability {
            71.. => Intensity::Deep,
            60..=70 => Intensity::Moderate,
            50..=59 => Intensity::Light,
            _ => Intensity::KeepAsIs,
        }
    }

    fn strategy(self) -> &'static str {
        match self {
            Intensity::Deep => DEEP_STRATEGY,
            Intensity::Moderate => MODERATE_STRATEGY,
            Intensity::Light => LIGHT_STRATEGY,
            Intensity::KeepAsIs => KEEP_STRATEGY,
        }
    }
}

const FIXED_PROMPT: &str = "\
You are revising paragraphs from an academic thesis. Make them sound natural, as if a real person \
wrote them carefully, and less like machine output, while every academic idea stays perfectly clear.

Part 1: General style (making it sound human)

1. Keep the important content safe.
* No information left behind: every professional term, every proper noun (people, places, specific \
things), the basic academic formatting such as reference style, the main points of the paper and all \
original facts and data must stay.
* Facts are facts: change how it is written, not what it says.

2. Voice and subject.
* Go active: turn sentences into the active voice whenever it makes sense. Instead of \"The results \
were interpreted by the study\", write \"This article interprets the results\".
* Spotlight on \"this article\": where it fits naturally, let \"this article\", \"this study\" or \
\"this research\" carry the action of the sentence.

3. Natural sentence flow.
* Untangle overly complex sentences: break a long, winding sentence into shorter, clearer ones, or \
simplify its structure so the point is easy to follow.
* A bit more detail in each sentence: add a few words that explain a little more or give a small, \
relevant detail. Sentences may grow slightly longer but must not become confusing.
* Vary sentence openings and structures. Avoid long runs of compound sentences (joined by and, but, \
or) and of perfectly parallel sentences.
* No numbered explanations for nouns: when the text explains something with (1) ... (2) ... or \
bracketed numbers, blend those explanations into the sentences so the text flows.

4. Word choice: smart, not stuffy.
* Drop robotic transitions: replace stiff, overused connectives such as \"furthermore\", \
\"moreover\", \"consequently\" and \"in addition to\". Let ideas connect smoothly and logically, like \
a clear explanation.
* Cut clutter and fluff: remove words that take up space without adding meaning or that sound formal \
for its own sake (\"due to the fact that\" becomes \"because\").
* Avoid old-fashioned, needlessly complicated words and tired academic phrases such as \"it is \
paramount to consider\" or \"this serves to illustrate\".
* Less lecturing: avoid phrasing that sounds like a formal lecture.
* Do not overdo adjectives: thin out long pile-ups of adjectives before a noun.
* Embrace natural imperfection: the writing need not be polished in a robotic way. Slight, natural \
variation or minor apparent flaws make it sound more human, but it must stay correct and professional.

5. Adding a little extra, carefully.
* Slight expansion is fine: while lengthening sentences, gently expand supporting details or \
background where it helps the flow or clarifies a point, without drifting off topic or shifting the \
main focus.

Part 2: Content and structure upgrades

* Strengthen the background and literature review: make the literature review thorough and up to \
date, drawing on sources through 2024-2025 and discussing recent publication trends.

Rewrite the provided text following these guidelines so it sounds natural and human-written while \
preserving all academic content and meaning. Reply with the rewritten paragraph only.";

const DEEP_STRATEGY: &str = "\
Deep rewrite: restructure most sentences, change sentence openings and order of clauses, replace \
formulaic connectives, and merge or split sentences freely while keeping every fact.";

const MODERATE_STRATEGY: &str = "\
Moderate rewrite: rework the sentences that read as templated, vary length and rhythm, and \
replace stock transitions, leaving sentences that already read naturally mostly untouched.";

const LIGHT_STRATEGY: &str = "\
Light rewrite: adjust word choice and a few sentence openings only; keep the structure of the \
paragraph as it is.";

const KEEP_STRATEGY: &str = "\
Keep as is: the paragraph already reads as human-written. Return it unchanged apart from fixing \
obvious typos.";

const RESPONSE_CONTRACT: &str = "\
Estimate how likely the paragraph you return would be judged machine-generated, as an integer from \
0 to 100. Respond with a single JSON object and nothing else:
{\"ai_probability\": <integer>, \"optimized_text\": \"<rewritten paragraph>\"}";

/// System prompt for `mode`. `probability` only matters for
/// [`PromptMode::Graduated`].
pub fn system_prompt(mode: PromptMode, probability: u8) -> String {
    match mode {
        PromptMode::Fixed => FIXED_PROMPT.to_string(),
        PromptMode::Graduated => {
            let intensity = Intensity::for_probability(probability);
            format!(
                "You are revising a paragraph so it reads as written by a person, keeping all academic \
                 content and meaning.\nThe paragraph's current AI-probability is {probability}/100.\n\n\
                 {}\n\n{RESPONSE_CONTRACT}",
                intensity.strategy()
            )
        }
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

/// Sends one JSON body with a bearer credential and returns the raw reply.
pub trait Transport {
    fn post_json(&self, url: &str, api_key: &str, body: String) -> Result<HttpReply, Error>;
}

pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        HttpTransport { client: reqwest::blocking::Client::new() }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn post_json(&self, url: &str, api_key: &str, body: String) -> Result<HttpReply, Error> {
        let response = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        Ok(HttpReply { status, body })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    pub ai_probability: u8,
    pub optimized_text: String,
}

#[derive(Deserialize)]
struct RawAssessment {
    ai_probability: serde_json::Value,
    optimized_text: String,
}

static JSON_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("invalid regex"));
static PROBABILITY_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""?ai_probability"?\s*:\s*"?(\d{1,3})"#).expect("invalid regex")
});
static TEXT_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)"?optimized_text"?\s*:\s*"((?:[^"\\]|\\.)*)(?:"|$)"#).expect("invalid regex")
});

fn probability_value(value: &serde_json::Value) -> Option<u8> {
    let number = match value {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok()?,
        _ => return None,
    };
    Some(number.round().clamp(0.0, 100.0) as u8)
}

fn strict_assessment(content: &str) -> Option<Assessment> {
    let object = JSON_OBJECT.find(content)?;
    let raw: RawAssessment = serde_json::from_str(object.as_str()).ok()?;
    let ai_probability = probability_value(&raw.ai_probability)?;
    Some(Assessment { ai_probability, optimized_text: raw.optimized_text })
}

fn unescape_json_fragment(fragment: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{fragment}\""))
        .unwrap_or_else(|_| fragment.replace("\\n", "\n").replace("\\\"", "\""))
}

/// Reads `{"ai_probability", "optimized_text"}` out of an assistant reply.
///
/// Strict JSON first; then field-by-field pattern matching. The probability
/// defaults to 50 and the text to the whole reply (or `original` when the
/// reply is blank), so the result is never empty.
pub fn parse_assessment(content: &str, original: &str) -> Assessment {
    if let Some(assessment) = strict_assessment(content)
        && !assessment.optimized_text.trim().is_empty()
    {
        return assessment;
    }
    warn!("completion was not a clean JSON object, falling back to pattern extraction");

    let ai_probability = PROBABILITY_FIELD
        .captures(content)
        .and_then(|caps| caps[1].parse::<u16>().ok())
        .map(|p| p.min(100) as u8)
        .unwrap_or(DEFAULT_AI_PROBABILITY);

    let optimized_text = match TEXT_FIELD.captures(content) {
        Some(caps) => unescape_json_fragment(&caps[1]),
        None => content.trim().to_string(),
    };
    let optimized_text = if optimized_text.trim().is_empty() {
        original.to_string()
    } else {
        optimized_text
    };

    Assessment { ai_probability, optimized_text }
}

/// Result of [`Rewriter::rewrite`]. On failure `text` is the input,
/// unchanged, and `error` says why.
#[derive(Debug)]
pub struct RewriteOutcome {
    pub text: String,
    pub ai_probability: Option<u8>,
    pub error: Option<Error>,
}

impl RewriteOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

pub struct Rewriter<T: Transport = HttpTransport> {
    config: EndpointConfig,
    transport: T,
}

impl Rewriter<HttpTransport> {
    pub fn new(config: EndpointConfig) -> Self {
        Self::with_transport(config, HttpTransport::new())
    }
}

impl<T: Transport> Rewriter<T> {
    pub fn with_transport(config: EndpointConfig, transport: T) -> Self {
        Rewriter { config, transport }
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// One chat completion: `system` as the system message, `text` as the
    /// user message. Returns the assistant content.
    pub fn complete(&self, system: &str, text: &str) -> Result<String, Error> {
        if self.config.api_key.trim().is_empty() {
            return Err(Error::MissingApiKey);
        }

        let request = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: text },
            ],
        };
        let body = serde_json::to_string(&request)?;

        debug!("requesting completion for {} chars from {}", text.chars().count(), self.config.url);
        let reply = self.transport.post_json(&self.config.url, &self.config.api_key, body)?;
        if reply.status != 200 {
            return Err(Error::Api { status: reply.status, body: reply.body });
        }

        let response: ChatResponse = serde_json::from_str(&reply.body)?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::MalformedResponse("no message content in choices".into()))
    }

    /// Rewrites `text` with the fixed humanization prompt.
    pub fn humanize(&self, text: &str) -> Result<String, Error> {
        let content = self.complete(&system_prompt(PromptMode::Fixed, DEFAULT_AI_PROBABILITY), text)?;
        if content.trim().is_empty() {
            return Err(Error::MalformedResponse("empty completion".into()));
        }
        Ok(content)
    }

    /// Rewrites `text` with the strategy for `probability` and reads the
    /// model's own probability estimate back.
    pub fn assess(&self, text: &str, probability: u8) -> Result<Assessment, Error> {
        let content = self.complete(&system_prompt(PromptMode::Graduated, probability), text)?;
        Ok(parse_assessment(&content, text))
    }

    /// Never fails: errors are logged and reported in the outcome, and the
    /// original text is handed back. In graduated mode a failed call
    /// reports the default probability.
    pub fn rewrite(&self, text: &str, mode: PromptMode, probability: u8) -> RewriteOutcome {
        let result = match mode {
            PromptMode::Fixed => self.humanize(text).map(|t| (t, None)),
            PromptMode::Graduated => self
                .assess(text, probability)
                .map(|a| (a.optimized_text, Some(a.ai_probability))),
        };

        match result {
            Ok((text, ai_probability)) => RewriteOutcome { text, ai_probability, error: None },
            Err(e) => {
                error!("rewrite failed, keeping the original text: {e}");
                let ai_probability = match mode {
                    PromptMode::Fixed => None,
                    PromptMode::Graduated => Some(DEFAULT_AI_PROBABILITY),
                };
                RewriteOutcome { text: text.to_string(), ai_probability, error: Some(e) }
            }
        }
    }
}
