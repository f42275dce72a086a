//! Generative-language API client.
//!
//! Wraps the `generateContent` endpoint with search grounding and the
//! retry policy the API expects: rate-limited (429) responses and transport
//! failures back off exponentially with jitter, anything else fails fast.

use std::time::Duration;

use ody_core::config::GeminiConfig;
use ody_core::{Error, Result};
use ody_db::models::ChatTurn;
use rand::Rng;
use serde::Serialize;
use serde_json::{json, Value};

const SERVICE: &str = "gemini";

/// Longest upstream error body echoed back to callers.
const MAX_ERROR_BODY: usize = 500;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub contents: Vec<ChatTurn>,
    pub system_instruction: Option<String>,
    /// Attach the search tool so answers carry grounding sources.
    pub grounded: bool,
}

impl GenerateRequest {
    /// A single user prompt with no history or tools.
    pub fn prompt(text: impl Into<String>) -> Self {
        Self {
            contents: vec![ChatTurn::user(text)],
            system_instruction: None,
            grounded: false,
        }
    }
}

/// A web source cited by a grounded answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct Source {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    pub sources: Vec<Source>,
    pub model: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct GeminiClient {
    http: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn is_configured(&self) -> bool {
        self.config
            .api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }

    /// Default system instruction for the chat assistant.
    pub fn system_instruction(&self) -> &str {
        &self.config.system_instruction
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    /// Call `generateContent`, retrying per the configured policy.
    pub async fn generate(&self, req: &GenerateRequest) -> Result<Generation> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Config("generation API key is not configured".into()))?;

        let payload = build_payload(req);
        let url = self.endpoint();
        let attempts = self.config.max_attempts.max(1);

        let mut attempt = 0;
        loop {
            let last = attempt + 1 >= attempts;
            let sent = self
                .http
                .post(&url)
                .query(&[("key", api_key)])
                .json(&payload)
                .send()
                .await;

            let retry_reason = match sent {
                Ok(resp) if resp.status().is_success() => {
                    let body: Value = resp.json().await.map_err(|e| {
                        Error::upstream(SERVICE, None, format!("invalid response body: {e}"))
                    })?;
                    return Ok(parse_generation(&body, &self.config.model));
                }
                Ok(resp) if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS => {
                    if last {
                        return Err(Error::upstream(
                            SERVICE,
                            Some(429),
                            format!("rate limited after {attempts} attempt(s)"),
                        ));
                    }
                    "rate limited".to_string()
                }
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    let body = resp.text().await.unwrap_or_default();
                    return Err(Error::upstream(SERVICE, Some(status), truncate(&body)));
                }
                Err(e) => {
                    if last {
                        return Err(Error::upstream(SERVICE, None, format!("request failed: {e}")));
                    }
                    e.to_string()
                }
            };

            let delay = backoff_delay(attempt, self.config.retry_base_ms);
            tracing::warn!(
                attempt = attempt + 1,
                max_attempts = attempts,
                delay_ms = delay.as_millis() as u64,
                reason = %retry_reason,
                "Generation request failed; retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

fn build_payload(req: &GenerateRequest) -> Value {
    let mut payload = json!({ "contents": req.contents });
    if req.grounded {
        payload["tools"] = json!([{ "google_search": {} }]);
    }
    if let Some(instruction) = req.system_instruction.as_deref().filter(|s| !s.is_empty()) {
        payload["systemInstruction"] = json!({ "parts": [{ "text": instruction }] });
    }
    payload
}

/// Extract the reply text and grounding sources from a response body.
///
/// Missing fields yield an empty reply rather than an error; callers decide
/// whether an empty reply is acceptable.
pub fn parse_generation(body: &Value, model: &str) -> Generation {
    let candidate = &body["candidates"][0];
    let text = candidate["content"]["parts"][0]["text"]
        .as_str()
        .unwrap_or_default()
        .to_string();

    let grounding = &candidate["groundingMetadata"];
    let webs = grounding["groundingAttributions"]
        .as_array()
        .into_iter()
        .chain(grounding["groundingChunks"].as_array())
        .flatten()
        .map(|entry| &entry["web"]);

    let mut sources: Vec<Source> = Vec::new();
    for web in webs {
        let source = Source {
            uri: web["uri"].as_str().map(String::from),
            title: web["title"].as_str().map(String::from),
        };
        if source.uri.is_none() && source.title.is_none() {
            continue;
        }
        if !sources.contains(&source) {
            sources.push(source);
        }
    }

    Generation {
        text,
        sources,
        model: model.to_string(),
    }
}

/// `2^attempt * base + jitter(0..base)`.
pub fn backoff_delay(attempt: u32, base_ms: u64) -> Duration {
    let exp = base_ms.saturating_mul(1u64 << attempt.min(16));
    let jitter = if base_ms > 0 {
        rand::thread_rng().gen_range(0..base_ms)
    } else {
        0
    };
    Duration::from_millis(exp.saturating_add(jitter))
}

fn truncate(body: &str) -> String {
    if body.chars().count() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut s: String = body.chars().take(MAX_ERROR_BODY).collect();
    s.push_str("...");
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str) -> GeminiConfig {
        GeminiConfig {
            api_key: Some("test-key".into()),
            base_url: base_url.into(),
            max_attempts: 3,
            retry_base_ms: 1,
            ..GeminiConfig::default()
        }
    }

    fn reply(text: &str) -> Value {
        json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": text}]},
                "groundingMetadata": {
                    "groundingAttributions": [
                        {"web": {"uri": "https://a.example", "title": "A"}},
                        {"web": {}}
                    ],
                    "groundingChunks": [
                        {"web": {"uri": "https://a.example", "title": "A"}},
                        {"web": {"uri": "https://b.example"}}
                    ]
                }
            }]
        })
    }

    #[test]
    fn parses_text_and_dedupes_sources() {
        let g = parse_generation(&reply("hello"), "m");
        assert_eq!(g.text, "hello");
        assert_eq!(
            g.sources,
            vec![
                Source { uri: Some("https://a.example".into()), title: Some("A".into()) },
                Source { uri: Some("https://b.example".into()), title: None },
            ]
        );
    }

    #[test]
    fn missing_candidates_is_empty_reply() {
        let g = parse_generation(&json!({}), "m");
        assert!(g.text.is_empty());
        assert!(g.sources.is_empty());
    }

    #[test]
    fn payload_shape() {
        let req = GenerateRequest {
            contents: vec![ChatTurn::user("q")],
            system_instruction: Some("be nice".into()),
            grounded: true,
        };
        let p = build_payload(&req);
        assert_eq!(p["contents"][0]["parts"][0]["text"], "q");
        assert_eq!(p["tools"][0]["google_search"], json!({}));
        assert_eq!(p["systemInstruction"]["parts"][0]["text"], "be nice");

        let plain = build_payload(&GenerateRequest::prompt("x"));
        assert!(plain.get("tools").is_none());
        assert!(plain.get("systemInstruction").is_none());
    }

    #[test]
    fn backoff_grows() {
        for attempt in 0..4 {
            let d = backoff_delay(attempt, 100).as_millis() as u64;
            let floor = 100 * (1 << attempt);
            assert!(d >= floor && d < floor + 100, "attempt {attempt}: {d}");
        }
        assert_eq!(backoff_delay(3, 0), Duration::ZERO);
    }

    #[tokio::test]
    async fn missing_key_is_config_error() {
        let client = GeminiClient::new(GeminiConfig::default());
        let err = client.generate(&GenerateRequest::prompt("x")).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn success_sends_key_and_model() {
        let server = MockServer::start().await;
        let cfg = config(&server.uri());
        Mock::given(method("POST"))
            .and(path(format!("/v1beta/models/{}:generateContent", cfg.model)))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(json!({"contents": [{"role": "user"}]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("hi")))
            .expect(1)
            .mount(&server)
            .await;

        let client = GeminiClient::new(cfg);
        let g = client.generate(&GenerateRequest::prompt("x")).await.unwrap();
        assert_eq!(g.text, "hi");
    }

    #[tokio::test]
    async fn retries_on_429_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("finally")))
            .expect(1)
            .mount(&server)
            .await;

        let client = GeminiClient::new(config(&server.uri()));
        let g = client.generate(&GenerateRequest::prompt("x")).await.unwrap();
        assert_eq!(g.text, "finally");
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let client = GeminiClient::new(config(&server.uri()));
        let err = client.generate(&GenerateRequest::prompt("x")).await.unwrap_err();
        assert!(matches!(err, Error::Upstream { status: Some(429), .. }));
    }

    #[tokio::test]
    async fn other_errors_fail_fast() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .expect(1)
            .mount(&server)
            .await;

        let client = GeminiClient::new(config(&server.uri()));
        let err = client.generate(&GenerateRequest::prompt("x")).await.unwrap_err();
        match err {
            Error::Upstream { status, message, .. } => {
                assert_eq!(status, Some(400));
                assert_eq!(message, "bad request");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
