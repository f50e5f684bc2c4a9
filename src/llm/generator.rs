//! llm/generator.rs
//!
//! AI-backed test generation: the model writes the whole test file, we
//! only clean it up and put it in place.

use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::Config;
use crate::detectors::SourceUnit;
use crate::error::{Error, Result};
use crate::llm::client::{
    clean_code, ChatTransport, CompletionOptions, HttpTransport, LlmClient, Provider,
};
use crate::llm::prompt::{build_context_prompt, build_prompt, PROBE_PROMPT};
use crate::testgen::file::{destination_for, TestArtifact, TestFileWriter};
use crate::testgen::TestType;

#[derive(Debug, Clone, Default)]
pub struct AiGenerateOptions {
    pub force: bool,
    pub test_type: Option<TestType>,
    /// Extra instructions appended to the fixed prompt.
    pub prompt: Option<String>,
}

pub struct AiTestGenerator {
    config: Config,
    root: PathBuf,
    transport: Rc<dyn ChatTransport>,
    writer: TestFileWriter,
}

impl AiTestGenerator {
    pub fn new(config: &Config, root: &Path) -> Self {
        let transport = HttpTransport::new(Duration::from_secs(config.ai.timeout_secs));
        Self::with_transport(config, root, Rc::new(transport))
    }

    pub fn with_transport(config: &Config, root: &Path, transport: Rc<dyn ChatTransport>) -> Self {
        Self {
            config: config.clone(),
            root: root.to_path_buf(),
            transport,
            writer: TestFileWriter::new(),
        }
    }

    /// Human-readable problems; empty when the configuration is usable.
    pub fn validate_configuration(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.config.ai.api_key.trim().is_empty() {
            errors.push(missing_key().to_string());
        }

        if let Err(e) = self.config.ai.provider.parse::<Provider>() {
            errors.push(e.to_string());
        }

        errors
    }

    /// Sends a trivial prompt. Any failure is reported as `false`.
    pub fn test_connection(&self) -> bool {
        let result = self
            .client()
            .and_then(|c| c.complete(PROBE_PROMPT, self.completion_options()));

        match result {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "AI connection test failed");
                false
            }
        }
    }

    /// `Err` only for configuration and provider failures; a file without
    /// a class, an empty answer or a blocked destination give `Ok(false)`.
    pub fn generate(&mut self, path: &Path, opts: &AiGenerateOptions) -> Result<bool> {
        self.run(path, &[], opts)
    }

    pub fn generate_with_context(
        &mut self,
        path: &Path,
        context: &[(String, String)],
        opts: &AiGenerateOptions,
    ) -> Result<bool> {
        self.run(path, context, opts)
    }

    pub fn written_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self.writer.written().map(Path::to_path_buf).collect();
        files.sort();
        files
    }

    /* ============================================================
       Internals
       ============================================================ */

    fn run(
        &mut self,
        path: &Path,
        context: &[(String, String)],
        opts: &AiGenerateOptions,
    ) -> Result<bool> {
        let client = self.client()?;

        let unit = SourceUnit::read(path)?;
        let Some(class) = unit.class_name.clone() else {
            warn!(path = %path.display(), "no class declaration; nothing to generate");
            return Ok(false);
        };

        let destination = destination_for(
            &self.destination_dir(opts.test_type),
            &class,
            &self.config.generation.extension,
        );

        if let Err(e) = self.writer.ensure_writable(&destination, opts.force) {
            warn!(error = %e, "skipping AI generation");
            return Ok(false);
        }

        let custom = opts.prompt.as_deref();
        let prompt = if context.is_empty() {
            build_prompt(&unit.raw_text, custom)
        } else {
            build_context_prompt(&unit.raw_text, context, custom)
        };

        info!(class = %class, provider = %client.provider(), "requesting AI test generation");

        let Some(raw) = client.complete(&prompt, self.completion_options())? else {
            warn!(class = %class, "provider returned no content");
            return Ok(false);
        };

        let content = clean_code(&raw);
        if content.is_empty() {
            warn!(class = %class, "provider returned only whitespace");
            return Ok(false);
        }

        let artifact = TestArtifact {
            destination_path: destination,
            content,
        };

        match self.writer.write(&artifact, opts.force) {
            Ok(_) => Ok(true),
            Err(Error::DestinationExists(p)) => {
                warn!(path = %p.display(), "test file exists; use --force to overwrite");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Key check first, then provider and endpoint.
    fn client(&self) -> Result<LlmClient> {
        if self.config.ai.api_key.trim().is_empty() {
            return Err(missing_key());
        }
        LlmClient::with_transport(&self.config.ai, Rc::clone(&self.transport))
    }

    fn completion_options(&self) -> CompletionOptions {
        CompletionOptions::from_config(&self.config.ai)
    }

    fn destination_dir(&self, test_type: Option<TestType>) -> PathBuf {
        match test_type {
            Some(TestType::Feature) | Some(TestType::Controller) => {
                self.config.feature_test_dir(&self.root)
            }
            _ => self.config.unit_test_dir(&self.root),
        }
    }
}

fn missing_key() -> Error {
    Error::MissingConfiguration("AI API key is not configured".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::{ChatRequest, TransportResponse};
    use std::cell::RefCell;
    use std::fs;

    struct Canned {
        reply: std::result::Result<TransportResponse, String>,
        seen: RefCell<Vec<ChatRequest>>,
    }

    impl ChatTransport for Canned {
        fn post(&self, request: &ChatRequest) -> std::result::Result<TransportResponse, String> {
            self.seen.borrow_mut().push(request.clone());
            self.reply.clone()
        }
    }

    fn canned(status: u16, body: &str) -> Rc<Canned> {
        Rc::new(Canned {
            reply: Ok(TransportResponse {
                status,
                body: body.into(),
            }),
            seen: RefCell::new(Vec::new()),
        })
    }

    fn openai_reply(content: &str) -> String {
        serde_json::json!({ "choices": [{ "message": { "content": content } }] }).to_string()
    }

    fn config(key: &str, provider: &str) -> Config {
        let mut c = Config::default();
        c.ai.api_key = key.into();
        c.ai.provider = provider.into();
        c
    }

    fn source(root: &Path) -> PathBuf {
        let p = root.join("app/Services/PaymentService.php");
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(&p, "<?php\nclass PaymentService { public function charge() {} }\n").unwrap();
        p
    }

    #[test]
    fn validate_reports_every_problem() {
        let dir = tempfile::tempdir().unwrap();
        let gen = AiTestGenerator::with_transport(&config("", "mistral"), dir.path(), canned(200, "{}"));

        assert_eq!(
            gen.validate_configuration(),
            vec![
                "AI API key is not configured".to_string(),
                "Unsupported AI provider: mistral".to_string(),
            ]
        );

        let ok = AiTestGenerator::with_transport(&config("k", "anthropic"), dir.path(), canned(200, "{}"));
        assert!(ok.validate_configuration().is_empty());
    }

    #[test]
    fn missing_key_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let src = source(dir.path());
        let mut gen = AiTestGenerator::with_transport(&config("", "openai"), dir.path(), canned(200, "{}"));

        assert!(matches!(
            gen.generate(&src, &AiGenerateOptions::default()),
            Err(Error::MissingConfiguration(_))
        ));
    }

    #[test]
    fn unsupported_provider_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let src = source(dir.path());
        let mut gen = AiTestGenerator::with_transport(&config("k", "claude"), dir.path(), canned(200, "{}"));

        assert!(matches!(
            gen.generate(&src, &AiGenerateOptions::default()),
            Err(Error::UnsupportedProvider(_))
        ));
    }

    #[test]
    fn writes_cleaned_reply_to_unit_dir() {
        let dir = tempfile::tempdir().unwrap();
        let src = source(dir.path());
        let transport = canned(200, &openai_reply("```php\n<?php\ntest('charges', fn () => true);\n```"));
        let mut gen = AiTestGenerator::with_transport(&config("k", "openai"), dir.path(), transport.clone());

        let opts = AiGenerateOptions {
            prompt: Some("Focus on refunds".into()),
            ..Default::default()
        };
        assert!(gen.generate(&src, &opts).unwrap());

        let out = fs::read_to_string(dir.path().join("tests/Unit/PaymentServiceTest.php")).unwrap();
        assert_eq!(out, "<?php\ntest('charges', fn () => true);");

        let seen = transport.seen.borrow();
        let prompt = seen[0].body["messages"][0]["content"].as_str().unwrap();
        assert!(prompt.contains("Additional requirements: Focus on refunds"));
        assert!(prompt.contains("class PaymentService"));
    }

    #[test]
    fn feature_type_goes_to_feature_dir_with_context() {
        let dir = tempfile::tempdir().unwrap();
        let src = source(dir.path());
        let transport = canned(200, &openai_reply("<?php // feature"));
        let mut gen = AiTestGenerator::with_transport(&config("k", "openai"), dir.path(), transport.clone());

        let opts = AiGenerateOptions {
            test_type: Some(TestType::Feature),
            ..Default::default()
        };
        let ctx = vec![("gateway".to_string(), "stripe".to_string())];
        assert!(gen.generate_with_context(&src, &ctx, &opts).unwrap());
        assert!(dir.path().join("tests/Feature/PaymentServiceTest.php").exists());

        let seen = transport.seen.borrow();
        let prompt = seen[0].body["messages"][0]["content"].as_str().unwrap();
        assert!(prompt.ends_with("Additional context:\n- gateway: stripe\n"));
    }

    #[test]
    fn null_content_gives_false() {
        let dir = tempfile::tempdir().unwrap();
        let src = source(dir.path());
        let body = r#"{"choices":[{"message":{"content":null}}]}"#;
        let mut gen = AiTestGenerator::with_transport(&config("k", "openai"), dir.path(), canned(200, body));

        assert!(!gen.generate(&src, &AiGenerateOptions::default()).unwrap());
        assert!(!dir.path().join("tests").exists());
    }

    #[test]
    fn existing_destination_skips_the_call() {
        let dir = tempfile::tempdir().unwrap();
        let src = source(dir.path());
        let dest = dir.path().join("tests/Unit/PaymentServiceTest.php");
        fs::create_dir_all(dest.parent().unwrap()).unwrap();
        fs::write(&dest, "keep").unwrap();

        let transport = canned(200, &openai_reply("<?php // new"));
        let mut gen = AiTestGenerator::with_transport(&config("k", "openai"), dir.path(), transport.clone());

        assert!(!gen.generate(&src, &AiGenerateOptions::default()).unwrap());
        assert!(transport.seen.borrow().is_empty());
        assert_eq!(fs::read_to_string(&dest).unwrap(), "keep");
    }

    #[test]
    fn provider_error_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let src = source(dir.path());
        let mut gen = AiTestGenerator::with_transport(&config("k", "openai"), dir.path(), canned(500, "boom"));

        assert!(matches!(
            gen.generate(&src, &AiGenerateOptions::default()),
            Err(Error::ProviderCallFailed { status: 500, .. })
        ));
    }

    #[test]
    fn connection_probe_never_raises() {
        let dir = tempfile::tempdir().unwrap();

        let ok = AiTestGenerator::with_transport(&config("k", "anthropic"), dir.path(), canned(200, r#"{"content":[{"text":"ok"}]}"#));
        assert!(ok.test_connection());

        let down = Rc::new(Canned {
            reply: Err("dns failure".into()),
            seen: RefCell::new(Vec::new()),
        });
        let bad = AiTestGenerator::with_transport(&config("k", "openai"), dir.path(), down);
        assert!(!bad.test_connection());

        let no_key = AiTestGenerator::with_transport(&config("", "openai"), dir.path(), canned(200, "{}"));
        assert!(!no_key.test_connection());
    }
}
