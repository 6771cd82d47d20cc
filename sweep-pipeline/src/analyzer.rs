//! Analysis engine client.
//!
//! `ChunkAnalyzer` is the seam between the pipeline and whatever engine
//! does the actual vulnerability reasoning; `OpenAiAnalyzer` is the
//! production implementation against the OpenAI chat completions API.
//! Engine output is text that usually, but not always, contains JSON, so
//! parsing degrades in stages instead of failing hard.

use crate::report::Finding;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const MAX_ATTEMPTS: u32 = 3;

const SYSTEM_PROMPT: &str = "You are a security code reviewer. Analyze the annotated source \
chunk for vulnerabilities. Respond with JSON: {\"vulnerabilities\": [{\"vulnerability_type\", \
\"severity\" (Critical|High|Medium|Low|Info), \"description\", \"file_path\", \"start_line\", \
\"end_line\", \"code_snippet\", \"cwe_id\", \"category\", \"recommendation\"}]}. Cite line \
numbers from the chunk annotations. Respond with {\"vulnerabilities\": []} when the chunk is \
clean.";

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("analysis API returned status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("analysis request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("analysis API returned an empty response")]
    EmptyResponse,
}

/// What the engine produced for one chunk.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineOutput {
    /// Findings parsed out of the engine's response.
    Structured(Vec<Finding>),
    /// The engine answered but nothing JSON-shaped could be recovered.
    RawText(String),
}

/// Analyzes one annotated chunk of source code.
#[async_trait]
pub trait ChunkAnalyzer: Send + Sync {
    async fn analyze(&self, annotated_text: &str) -> Result<EngineOutput, AnalyzeError>;
}

/// OpenAI-backed analyzer with retry on rate limiting.
pub struct OpenAiAnalyzer {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiAnalyzer {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    pub(crate) async fn request_completion(
        &self,
        system_prompt: &str,
        user_content: &str,
    ) -> Result<String, AnalyzeError> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_content},
            ],
            "temperature": 0.1,
        });

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let response = self
                .http
                .post(COMPLETIONS_URL)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let parsed: CompletionResponse = response.json().await?;
                        return parsed
                            .choices
                            .into_iter()
                            .next()
                            .map(|c| c.message.content)
                            .filter(|c| !c.trim().is_empty())
                            .ok_or(AnalyzeError::EmptyResponse);
                    }
                    let body_text = response.text().await.unwrap_or_default();
                    if status.as_u16() == 429 && attempt < MAX_ATTEMPTS {
                        let delay = Duration::from_secs(1 << attempt);
                        warn!("rate limited, retrying in {:?} (attempt {})", delay, attempt);
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(AnalyzeError::Api {
                        status: status.as_u16(),
                        body: body_text,
                    });
                }
                Err(err) if attempt < MAX_ATTEMPTS => {
                    let delay = Duration::from_millis(200 * u64::from(attempt));
                    warn!("transport error, retrying in {:?}: {}", delay, err);
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(AnalyzeError::Transport(err)),
            }
        }
    }
}

#[async_trait]
impl ChunkAnalyzer for OpenAiAnalyzer {
    async fn analyze(&self, annotated_text: &str) -> Result<EngineOutput, AnalyzeError> {
        let content = self.request_completion(SYSTEM_PROMPT, annotated_text).await?;
        Ok(parse_engine_output(&content))
    }
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: String,
}

#[derive(Deserialize)]
struct AnalysisEnvelope {
    #[serde(alias = "findings")]
    vulnerabilities: Option<Vec<Finding>>,
}

/// Recover findings from engine text.
///
/// Tries, in order: the whole text as a `{"vulnerabilities": [...]}`
/// envelope, the whole text as a bare findings array, then the same two
/// shapes on a JSON fragment dug out of markdown fences or the outermost
/// brace pair. Anything still unparseable is returned as raw text.
pub fn parse_engine_output(content: &str) -> EngineOutput {
    if let Some(findings) = try_parse(content) {
        return EngineOutput::Structured(findings);
    }
    if let Some(fragment) = extract_json_fragment(content) {
        if let Some(findings) = try_parse(&fragment) {
            return EngineOutput::Structured(findings);
        }
    }
    debug!("engine response was not parseable as findings");
    EngineOutput::RawText(content.to_string())
}

fn try_parse(text: &str) -> Option<Vec<Finding>> {
    let trimmed = text.trim();
    if let Ok(envelope) = serde_json::from_str::<AnalysisEnvelope>(trimmed) {
        if let Some(findings) = envelope.vulnerabilities {
            return Some(findings);
        }
    }
    serde_json::from_str::<Vec<Finding>>(trimmed).ok()
}

/// Pull a JSON object or array out of surrounding prose.
fn extract_json_fragment(content: &str) -> Option<String> {
    // Fenced block first.
    for fence in ["```json", "```"] {
        if let Some(start) = content.find(fence) {
            let rest = &content[start + fence.len()..];
            if let Some(end) = rest.find("```") {
                let candidate = rest[..end].trim();
                if !candidate.is_empty() {
                    return Some(candidate.to_string());
                }
            }
        }
    }

    // Outermost balanced braces, tracking strings and escapes.
    let open = content.find(['{', '['])?;
    let bytes = content.as_bytes();
    let (open_ch, close_ch) = if bytes[open] == b'{' {
        (b'{', b'}')
    } else {
        (b'[', b']')
    };
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b if b == open_ch && !in_string => depth += 1,
            b if b == close_ch && !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(content[open..=i].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Severity;

    fn structured(output: EngineOutput) -> Vec<Finding> {
        match output {
            EngineOutput::Structured(findings) => findings,
            EngineOutput::RawText(text) => panic!("expected structured output, got: {text}"),
        }
    }

    #[test]
    fn test_parse_envelope() {
        let text = r#"{"vulnerabilities": [{"vulnerability_type": "SQLi", "severity": "Critical", "description": "d"}]}"#;
        let findings = structured(parse_engine_output(text));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
    }

    #[test]
    fn test_parse_findings_alias() {
        let text = r#"{"findings": [{"title": "t", "severity": "Low", "description": "d"}]}"#;
        assert_eq!(structured(parse_engine_output(text)).len(), 1);
    }

    #[test]
    fn test_parse_bare_array() {
        let text = r#"[{"title": "t", "severity": "Medium", "description": "d"}]"#;
        assert_eq!(structured(parse_engine_output(text)).len(), 1);
    }

    #[test]
    fn test_parse_fenced_json() {
        let text = "Here is my analysis:\n```json\n{\"vulnerabilities\": []}\n```\nDone.";
        assert!(structured(parse_engine_output(text)).is_empty());
    }

    #[test]
    fn test_parse_embedded_object() {
        let text = r#"I found one issue. {"vulnerabilities": [{"title": "XSS", "severity": "High", "description": "quote: \"}\" inside"}]} Hope that helps."#;
        let findings = structured(parse_engine_output(text));
        assert_eq!(findings[0].vulnerability_type, "XSS");
    }

    #[test]
    fn test_unparseable_is_raw_text() {
        let output = parse_engine_output("The code looks fine to me.");
        assert_eq!(
            output,
            EngineOutput::RawText("The code looks fine to me.".to_string())
        );
    }

    #[test]
    fn test_empty_vulnerabilities_key_is_structured_empty() {
        let output = parse_engine_output(r#"{"vulnerabilities": []}"#);
        assert!(structured(output).is_empty());
    }
}
