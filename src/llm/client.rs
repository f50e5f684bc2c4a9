// src/llm/client.rs

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};
use url::Url;

use crate::config::AiConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Anthropic,
}

impl Provider {
    pub fn name(self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
        }
    }

    fn default_base(self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com",
            Provider::Anthropic => "https://api.anthropic.com",
        }
    }

    fn path(self) -> &'static str {
        match self {
            Provider::OpenAi => "v1/chat/completions",
            Provider::Anthropic => "v1/messages",
        }
    }
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "anthropic" => Ok(Provider::Anthropic),
            _ => Err(Error::UnsupportedProvider(s.to_string())),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/* ============================================================
   Transport
   ============================================================ */

/// One outgoing chat request, already fully shaped for the provider.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Value,
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// The only seam that touches the network.
pub trait ChatTransport {
    /// `Err` means the request never produced an HTTP response.
    fn post(&self, request: &ChatRequest) -> std::result::Result<TransportResponse, String>;
}

pub struct HttpTransport {
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl ChatTransport for HttpTransport {
    fn post(&self, request: &ChatRequest) -> std::result::Result<TransportResponse, String> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| e.to_string())?;

        let mut req = client.post(&request.url).json(&request.body);
        for (k, v) in &request.headers {
            req = req.header(*k, v);
        }

        let resp = req.send().map_err(|e| e.to_string())?;
        let status = resp.status().as_u16();
        let body = resp.text().map_err(|e| e.to_string())?;

        Ok(TransportResponse { status, body })
    }
}

/* ============================================================
   Responses
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicBlock>,
}

#[derive(Debug, Deserialize)]
struct AnthropicBlock {
    text: Option<String>,
}

#[derive(Debug)]
pub enum ChatResponse {
    OpenAi(OpenAiResponse),
    Anthropic(AnthropicResponse),
}

impl ChatResponse {
    pub fn decode(provider: Provider, body: &str) -> Result<Self> {
        Ok(match provider {
            Provider::OpenAi => ChatResponse::OpenAi(serde_json::from_str(body)?),
            Provider::Anthropic => ChatResponse::Anthropic(serde_json::from_str(body)?),
        })
    }

    /// `choices[0].message.content` / `content[0].text`.
    pub fn into_content(self) -> Option<String> {
        match self {
            ChatResponse::OpenAi(r) => r.choices.into_iter().next()?.message.content,
            ChatResponse::Anthropic(r) => r.content.into_iter().next()?.text,
        }
    }
}

/* ============================================================
   Client
   ============================================================ */

#[derive(Debug, Clone, Copy)]
pub struct CompletionOptions {
    pub max_tokens: u32,
    pub temperature: f64,
}

impl CompletionOptions {
    pub fn from_config(cfg: &AiConfig) -> Self {
        Self {
            max_tokens: cfg.max_tokens,
            temperature: cfg.temperature,
        }
    }
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            max_tokens: 4000,
            temperature: 0.7,
        }
    }
}

pub struct LlmClient {
    provider: Provider,
    model: String,
    api_key: String,
    endpoint: String,
    transport: Rc<dyn ChatTransport>,
}

impl LlmClient {
    pub fn from_config(cfg: &AiConfig) -> Result<Self> {
        let transport = HttpTransport::new(Duration::from_secs(cfg.timeout_secs));
        Self::with_transport(cfg, Rc::new(transport))
    }

    pub fn with_transport(cfg: &AiConfig, transport: Rc<dyn ChatTransport>) -> Result<Self> {
        let provider: Provider = cfg.provider.parse()?;
        let endpoint = endpoint(provider, cfg.base_url.as_deref())?;

        Ok(Self {
            provider,
            model: cfg.model.clone(),
            api_key: cfg.api_key.clone(),
            endpoint,
            transport,
        })
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one user message. `Ok(None)` means the provider answered but
    /// the expected content field was absent or null.
    pub fn complete(&self, prompt: &str, opts: CompletionOptions) -> Result<Option<String>> {
        let request = self.build_request(prompt, opts);
        debug!(provider = %self.provider, url = %request.url, "sending chat request");

        let response = self
            .transport
            .post(&request)
            .map_err(|message| Error::Connection {
                provider: self.provider.name().to_string(),
                message,
            })?;

        if !(200..300).contains(&response.status) {
            return Err(Error::ProviderCallFailed {
                provider: self.provider.name().to_string(),
                status: response.status,
                body: response.body,
            });
        }

        match ChatResponse::decode(self.provider, &response.body) {
            Ok(decoded) => Ok(decoded.into_content()),
            Err(e) => {
                warn!(provider = %self.provider, error = %e, "unreadable provider response");
                Ok(None)
            }
        }
    }

    pub fn build_request(&self, prompt: &str, opts: CompletionOptions) -> ChatRequest {
        let messages = json!([{ "role": "user", "content": prompt }]);

        match self.provider {
            Provider::OpenAi => ChatRequest {
                url: self.endpoint.clone(),
                headers: vec![("Authorization", format!("Bearer {}", self.api_key))],
                body: json!({
                    "model": self.model,
                    "messages": messages,
                    "max_tokens": opts.max_tokens,
                    "temperature": opts.temperature,
                }),
            },

            Provider::Anthropic => ChatRequest {
                url: self.endpoint.clone(),
                headers: vec![
                    ("x-api-key", self.api_key.clone()),
                    ("anthropic-version", "2023-06-01".into()),
                ],
                body: json!({
                    "model": self.model,
                    "max_tokens": opts.max_tokens,
                    "messages": messages,
                }),
            },
        }
    }
}

fn endpoint(provider: Provider, base_url: Option<&str>) -> Result<String> {
    let base = base_url
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .unwrap_or(provider.default_base());

    let parsed = Url::parse(base).map_err(|e| Error::Config(format!("ai.base_url `{base}`: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::Config(format!(
            "ai.base_url `{base}` must use http or https"
        )));
    }

    Ok(format!("{}/{}", base.trim_end_matches('/'), provider.path()))
}

/* ============================================================
   Output cleanup
   ============================================================ */

fn open_fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```php\s*").unwrap())
}

fn close_fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```\s*$").unwrap())
}

/// Drop markdown fences the model was told not to send.
pub fn clean_code(raw: &str) -> String {
    let without_open = open_fence_re().replace_all(raw, "");
    let without_close = close_fence_re().replace(&without_open, "");
    without_close.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Recorder {
        requests: Rc<RefCell<Vec<ChatRequest>>>,
    }

    struct FakeTransport {
        recorder: Recorder,
        reply: std::result::Result<TransportResponse, String>,
    }

    impl ChatTransport for FakeTransport {
        fn post(&self, request: &ChatRequest) -> std::result::Result<TransportResponse, String> {
            self.recorder.requests.borrow_mut().push(request.clone());
            self.reply.clone()
        }
    }

    fn client(provider: &str, status: u16, body: &str) -> (LlmClient, Recorder) {
        let recorder = Recorder::default();
        let cfg = AiConfig {
            provider: provider.into(),
            api_key: "secret".into(),
            ..AiConfig::default()
        };
        let transport = FakeTransport {
            recorder: recorder.clone(),
            reply: Ok(TransportResponse {
                status,
                body: body.into(),
            }),
        };
        (
            LlmClient::with_transport(&cfg, Rc::new(transport)).unwrap(),
            recorder,
        )
    }

    #[test]
    fn provider_names() {
        assert_eq!("OpenAI".parse::<Provider>().unwrap(), Provider::OpenAi);
        assert_eq!("anthropic".parse::<Provider>().unwrap(), Provider::Anthropic);
        let err = "claude".parse::<Provider>().unwrap_err();
        assert_eq!(err.to_string(), "Unsupported AI provider: claude");
    }

    #[test]
    fn openai_request_shape_and_content() {
        let (c, rec) = client(
            "openai",
            200,
            r#"{"choices":[{"message":{"role":"assistant","content":"<?php test"}}]}"#,
        );

        let out = c.complete("hello", CompletionOptions::default()).unwrap();
        assert_eq!(out.as_deref(), Some("<?php test"));

        let reqs = rec.requests.borrow();
        let req = &reqs[0];
        assert_eq!(req.url, "https://api.openai.com/v1/chat/completions");
        assert_eq!(req.headers, vec![("Authorization", "Bearer secret".to_string())]);
        assert_eq!(req.body["model"], "gpt-4");
        assert_eq!(req.body["max_tokens"], 4000);
        assert_eq!(req.body["temperature"], 0.7);
        assert_eq!(req.body["messages"][0]["role"], "user");
        assert_eq!(req.body["messages"][0]["content"], "hello");
    }

    #[test]
    fn anthropic_request_shape_and_content() {
        let (c, rec) = client(
            "anthropic",
            200,
            r#"{"content":[{"type":"text","text":"<?php claude"}]}"#,
        );

        let out = c.complete("hi", CompletionOptions::default()).unwrap();
        assert_eq!(out.as_deref(), Some("<?php claude"));

        let reqs = rec.requests.borrow();
        let req = &reqs[0];
        assert_eq!(req.url, "https://api.anthropic.com/v1/messages");
        assert!(req.headers.contains(&("x-api-key", "secret".to_string())));
        assert!(req.headers.contains(&("anthropic-version", "2023-06-01".to_string())));
        assert!(req.body.get("temperature").is_none());
    }

    #[test]
    fn null_content_is_none() {
        let (c, _) = client("openai", 200, r#"{"choices":[{"message":{"content":null}}]}"#);
        assert_eq!(c.complete("x", CompletionOptions::default()).unwrap(), None);

        let (c, _) = client("anthropic", 200, r#"{"content":[]}"#);
        assert_eq!(c.complete("x", CompletionOptions::default()).unwrap(), None);

        let (c, _) = client("openai", 200, "not json");
        assert_eq!(c.complete("x", CompletionOptions::default()).unwrap(), None);
    }

    #[test]
    fn non_success_status_is_provider_failure() {
        let (c, _) = client("openai", 401, r#"{"error":"bad key"}"#);
        match c.complete("x", CompletionOptions::default()) {
            Err(Error::ProviderCallFailed { status, body, .. }) => {
                assert_eq!(status, 401);
                assert!(body.contains("bad key"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn transport_error_is_connection_failure() {
        let cfg = AiConfig::default();
        let transport = FakeTransport {
            recorder: Recorder::default(),
            reply: Err("connection refused".into()),
        };
        let c = LlmClient::with_transport(&cfg, Rc::new(transport)).unwrap();

        assert!(matches!(
            c.complete("x", CompletionOptions::default()),
            Err(Error::Connection { .. })
        ));
    }

    #[test]
    fn base_url_override_is_validated() {
        assert_eq!(
            endpoint(Provider::OpenAi, Some("http://localhost:8080/")).unwrap(),
            "http://localhost:8080/v1/chat/completions"
        );
        assert!(matches!(
            endpoint(Provider::OpenAi, Some("not a url")),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            endpoint(Provider::Anthropic, Some("ftp://example.com")),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn clean_code_strips_fences() {
        assert_eq!(
            clean_code("```php\n<?php\nclass ATest {}\n```\n"),
            "<?php\nclass ATest {}"
        );
        assert_eq!(clean_code("  <?php echo 1;  "), "<?php echo 1;");
        assert_eq!(clean_code("```php a ```php b"), "a b");
    }
}
