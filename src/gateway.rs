//! AI gateway: tag suggestion, translation, article generation, and image
//! generation over a shared HTTP client. Every operation degrades to a safe
//! default on failure -- callers never see an `Err`, and retrying is the
//! caller's business, not the gateway's.

use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{AiSection, LanguageSection};

/// A record carries at most this many tags in total.
pub const MAX_TAGS: usize = 7;

const TAGS_MAX_TOKENS: u32 = 1000;
const TRANSLATE_MAX_TOKENS: u32 = 4000;
const ARTICLE_MAX_TOKENS: u32 = 3000;
const IMAGE_SIZE: &str = "1024x1024";

/// Which backend handles a translation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    /// Plain HTTP translation service.
    #[default]
    Machine,
    /// Chat-completion prompt against the generative provider.
    Generative,
}

/// Everything the article prompt is built from.
#[derive(Debug, Clone)]
pub struct ArticleRequest<'a> {
    pub title: &'a str,
    pub source: &'a str,
    pub url: &'a str,
    pub date: DateTime<Utc>,
    pub body: &'a str,
    pub keywords: &'a [String],
}

pub struct AiGateway {
    http: reqwest::Client,
    ai: AiSection,
    language: LanguageSection,
}

fn record_failure(op: &'static str) {
    counter!("gateway_failures_total", "op" => op).increment(1);
}

impl AiGateway {
    pub fn new(ai: AiSection, language: LanguageSection) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("newsdesk/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(60))
            .build()
            .expect("reqwest client");
        Self { http, ai, language }
    }

    // ------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------

    /// Up to [`MAX_TAGS`] tags total: `existing` preserved in order, model
    /// suggestions appended up to the remaining budget. The prompt lists the
    /// existing tags so replies do not repeat them. Existing tags come back
    /// unchanged when the budget is spent, the content is empty, or the
    /// call fails.
    pub async fn suggest_tags(&self, content: &str, existing: &[String]) -> Vec<String> {
        let budget = MAX_TAGS.saturating_sub(existing.len());
        if budget == 0 || content.trim().is_empty() {
            return existing.to_vec();
        }

        let mut prompt = format!(
            "Give at most {budget} short tags describing this news text. \
             Answer with the tags only, separated by commas.\n\ntext: {content}"
        );
        if !existing.is_empty() {
            prompt.push_str(&format!("\n\nExisting tags: {}", existing.join(", ")));
        }
        let Some(reply) = self.chat("tags", &prompt, TAGS_MAX_TOKENS).await else {
            return existing.to_vec();
        };

        let mut tags = existing.to_vec();
        for tag in reply.split(',') {
            let tag = tag.trim();
            if tag.is_empty() {
                continue;
            }
            if tags.len() == MAX_TAGS {
                break;
            }
            tags.push(tag.to_string());
        }
        tags
    }

    /// Translate `text` from `src` to `dest`, keeping embedded markup intact.
    /// Empty string on failure; empty input never leaves the process.
    pub async fn translate(
        &self,
        text: &str,
        src: &str,
        dest: &str,
        provider: TranslationProvider,
    ) -> String {
        if text.trim().is_empty() {
            return String::new();
        }
        match provider {
            TranslationProvider::Machine => self.translate_machine(text, src, dest).await,
            TranslationProvider::Generative => self.translate_generative(text, src, dest).await,
        }
    }

    /// Long-form article in the configured target language. `None` is the
    /// "no article" answer, returned on any failure.
    pub async fn generate_article(&self, req: &ArticleRequest<'_>) -> Option<String> {
        use std::fmt::Write as _;

        let mut prompt = format!(
            "Write a complete news article in {} based on this source item.\n\
             title: {}\nsource: {}\nurl: {}\ndate: {}\n",
            self.language.target_name,
            req.title,
            req.source,
            req.url,
            req.date.format("%Y-%m-%d"),
        );
        if !req.keywords.is_empty() {
            let _ = writeln!(prompt, "focus keywords: {}", req.keywords.join(", "));
        }
        let _ = write!(prompt, "\ncontent: {}", req.body);

        self.chat("article", &prompt, ARTICLE_MAX_TOKENS).await
    }

    /// One request per image, sequentially; a failed request is skipped, so
    /// the result can be shorter than `count`. Blank prompts make no calls.
    pub async fn generate_images(&self, prompt: &str, count: u32) -> Vec<String> {
        if prompt.trim().is_empty() {
            return Vec::new();
        }
        if self.ai.api_key.is_empty() {
            warn!("image generation skipped: no api key configured");
            return Vec::new();
        }

        #[derive(Serialize)]
        struct Req<'a> {
            prompt: &'a str,
            n: u32,
            size: &'a str,
        }
        #[derive(Deserialize)]
        struct Resp {
            data: Vec<Item>,
        }
        #[derive(Deserialize)]
        struct Item {
            url: String,
        }

        let mut urls = Vec::with_capacity(count as usize);
        for i in 0..count {
            counter!("gateway_requests_total", "op" => "images").increment(1);
            let req = Req {
                prompt,
                n: 1,
                size: IMAGE_SIZE,
            };
            let resp = match self
                .http
                .post(&self.ai.image_url)
                .bearer_auth(&self.ai.api_key)
                .json(&req)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    warn!(i, error = %e, "image request failed");
                    record_failure("images");
                    continue;
                }
            };
            if !resp.status().is_success() {
                warn!(i, status = %resp.status(), "image endpoint returned an error status");
                record_failure("images");
                continue;
            }
            match resp.json::<Resp>().await {
                Ok(body) => match body.data.into_iter().next() {
                    Some(item) => urls.push(item.url),
                    None => {
                        warn!(i, "image response carried no url");
                        record_failure("images");
                    }
                },
                Err(e) => {
                    warn!(i, error = %e, "image response was not the expected shape");
                    record_failure("images");
                }
            }
        }
        urls
    }

    // ------------------------------------------------------------
    // Wire plumbing
    // ------------------------------------------------------------

    /// One chat-completion round trip. `None` on any transport, status, or
    /// shape failure; the cause is logged and counted.
    async fn chat(&self, op: &'static str, prompt: &str, max_tokens: u32) -> Option<String> {
        if self.ai.api_key.is_empty() {
            warn!(op, "chat skipped: no api key configured");
            record_failure(op);
            return None;
        }

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let req = Req {
            model: &self.ai.chat_model,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
            temperature: 0.2,
            max_tokens,
        };

        counter!("gateway_requests_total", "op" => op).increment(1);
        let resp = match self
            .http
            .post(&self.ai.chat_url)
            .bearer_auth(&self.ai.api_key)
            .json(&req)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(op, error = %e, "chat request failed");
                record_failure(op);
                return None;
            }
        };

        if !resp.status().is_success() {
            warn!(op, status = %resp.status(), "chat endpoint returned an error status");
            record_failure(op);
            return None;
        }

        let body: Resp = match resp.json().await {
            Ok(b) => b,
            Err(e) => {
                warn!(op, error = %e, "chat response was not the expected shape");
                record_failure(op);
                return None;
            }
        };

        let content = body
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .unwrap_or_default();
        if content.is_empty() {
            warn!(op, "chat response carried no content");
            record_failure(op);
            return None;
        }
        Some(content)
    }

    /// Plain HTTP translation endpoint (gtx wire format: the first element is
    /// a segment list, each segment leads with its translated chunk).
    async fn translate_machine(&self, text: &str, src: &str, dest: &str) -> String {
        counter!("gateway_requests_total", "op" => "translate").increment(1);
        let resp = match self
            .http
            .get(&self.ai.translate_url)
            .query(&[
                ("client", "gtx"),
                ("sl", src),
                ("tl", dest),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "machine translation request failed");
                record_failure("translate");
                return String::new();
            }
        };
        if !resp.status().is_success() {
            warn!(status = %resp.status(), "machine translation returned an error status");
            record_failure("translate");
            return String::new();
        }
        let value: serde_json::Value = match resp.json().await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "machine translation body was not JSON");
                record_failure("translate");
                return String::new();
            }
        };

        let mut out = String::new();
        if let Some(segments) = value.get(0).and_then(|v| v.as_array()) {
            for seg in segments {
                if let Some(chunk) = seg.get(0).and_then(|v| v.as_str()) {
                    out.push_str(chunk);
                }
            }
        }
        if out.is_empty() {
            warn!("machine translation yielded no segments");
            record_failure("translate");
        }
        out
    }

    async fn translate_generative(&self, text: &str, src: &str, dest: &str) -> String {
        let prompt = format!(
            "Translate this text from {src} to {dest}. Keep the html structure \
             unchanged and answer with the translation only.\n\ntext: {text}"
        );
        self.chat("translate", &prompt, TRANSLATE_MAX_TOKENS)
            .await
            .unwrap_or_default()
    }
}

/* ----------------------------
Tests
---------------------------- */
