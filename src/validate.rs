//! W3C markup and stylesheet validation over HTTP.

use crate::config::Validation;
use crate::stage::{FailureKind, StageOutcome};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

pub trait MarkupValidator {
    fn validate_html(&self, content: &str) -> StageOutcome;
    fn validate_css(&self, content: &str) -> StageOutcome;
}

/// One diagnostic, located when the service tells us where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: Option<u64>,
    pub column: Option<u64>,
    pub message: String,
}

impl Diagnostic {
    fn render(&self) -> String {
        let line = self.line.map_or("N/A".to_string(), |l| l.to_string());
        match self.column {
            Some(col) => format!("Line {line}, Column {col}: {}", self.message),
            None => format!("Line {line}: {}", self.message),
        }
    }
}

#[derive(Debug, Deserialize)]
struct NuResponse {
    #[serde(default)]
    messages: Vec<NuMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NuMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    last_line: Option<u64>,
    #[serde(default)]
    last_column: Option<u64>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct JigsawResponse {
    cssvalidation: JigsawBody,
}

#[derive(Debug, Deserialize)]
struct JigsawBody {
    #[serde(default)]
    errors: Vec<JigsawError>,
}

#[derive(Debug, Deserialize)]
struct JigsawError {
    #[serde(default)]
    line: Option<u64>,
    #[serde(default)]
    message: String,
}

/// Error-severity diagnostics from a Nu HTML checker JSON body.
pub fn parse_nu_errors(body: &str) -> Result<Vec<Diagnostic>> {
    let resp: NuResponse = serde_json::from_str(body).context("parsing HTML validator JSON")?;
    Ok(resp
        .messages
        .into_iter()
        .filter(|m| m.kind == "error" || m.kind == "non-document-error")
        .map(|m| Diagnostic {
            line: m.last_line,
            column: m.last_column,
            message: m.message.trim().to_string(),
        })
        .collect())
}

/// Errors from a Jigsaw CSS validator JSON body.
pub fn parse_jigsaw_errors(body: &str) -> Result<Vec<Diagnostic>> {
    let resp: JigsawResponse =
        serde_json::from_str(body).context("parsing CSS validator JSON")?;
    Ok(resp
        .cssvalidation
        .errors
        .into_iter()
        .map(|e| Diagnostic {
            line: e.line,
            column: None,
            message: e.message.trim().to_string(),
        })
        .collect())
}

/// Maps parsed diagnostics to the stage outcome for `kind` ("HTML" / "CSS").
pub fn outcome_from_diagnostics(kind: &str, diags: &[Diagnostic]) -> StageOutcome {
    if diags.is_empty() {
        return StageOutcome::ok(format!("{kind} validation passed successfully"));
    }
    let rendered: Vec<String> = diags.iter().map(Diagnostic::render).collect();
    StageOutcome::failed(
        FailureKind::ValidationErrors,
        format!("{kind} validation issues found: {}", rendered.join("; ")),
    )
}

pub struct W3cValidator {
    client: reqwest::blocking::Client,
    html_endpoint: String,
    css_endpoint: String,
}

impl W3cValidator {
    pub fn new(cfg: &Validation) -> Result<Self> {
        let mut builder = reqwest::blocking::Client::builder().user_agent(cfg.user_agent.as_str());
        if cfg.http_timeout_seconds > 0 {
            builder = builder.timeout(Duration::from_secs(cfg.http_timeout_seconds));
        }
        let client = builder.build().context("building HTTP client")?;
        Ok(Self {
            client,
            html_endpoint: cfg.html_endpoint.clone(),
            css_endpoint: cfg.css_endpoint.clone(),
        })
    }

    fn finish(
        kind: &str,
        sent: reqwest::Result<reqwest::blocking::Response>,
        parse: fn(&str) -> Result<Vec<Diagnostic>>,
    ) -> StageOutcome {
        let resp = match sent {
            Ok(r) => r,
            Err(err) => {
                warn!(error = %err, "{kind} validator unreachable");
                return StageOutcome::failed(
                    FailureKind::ValidationUnreachable,
                    format!("Failed to validate {kind}: {err}"),
                );
            }
        };
        let status = resp.status();
        let body = match resp.text() {
            Ok(b) => b,
            Err(err) => {
                return StageOutcome::failed(
                    FailureKind::ValidationUnreachable,
                    format!("Failed to validate {kind}: reading response: {err}"),
                );
            }
        };
        if !status.is_success() {
            debug!(%status, "{kind} validator returned an error status");
            return StageOutcome::failed(
                FailureKind::ValidationStatus,
                format!("Failed to validate {kind}: HTTP {}", status.as_u16()),
            );
        }
        match parse(&body) {
            Ok(diags) => outcome_from_diagnostics(kind, &diags),
            Err(err) => StageOutcome::failed(
                FailureKind::ValidationStatus,
                format!("Failed to validate {kind}: {err:#}"),
            ),
        }
    }
}

impl MarkupValidator for W3cValidator {
    fn validate_html(&self, content: &str) -> StageOutcome {
        let sent = self
            .client
            .post(self.html_endpoint.as_str())
            .query(&[("out", "json")])
            .header(reqwest::header::CONTENT_TYPE, "text/html; charset=utf-8")
            .body(content.to_string())
            .send();
        Self::finish("HTML", sent, parse_nu_errors)
    }

    fn validate_css(&self, content: &str) -> StageOutcome {
        let sent = self
            .client
            .get(self.css_endpoint.as_str())
            .query(&[("output", "json"), ("text", content)])
            .send();
        Self::finish("CSS", sent, parse_jigsaw_errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nu_errors_keep_location_and_skip_info() {
        let body = r#"{"messages":[
            {"type":"info","message":"Trailing slash on void elements"},
            {"type":"error","lastLine":4,"lastColumn":12,"message":"Stray end tag “div”."},
            {"type":"error","message":" Document is empty "}
        ]}"#;
        let diags = parse_nu_errors(body).unwrap();
        assert_eq!(diags.len(), 2);
        let out = outcome_from_diagnostics("HTML", &diags);
        assert!(!out.succeeded);
        assert!(out.is_kind(FailureKind::ValidationErrors));
        assert_eq!(
            out.message,
            "HTML validation issues found: Line 4, Column 12: Stray end tag “div”.; Line N/A: Document is empty"
        );
    }

    #[test]
    fn jigsaw_without_errors_passes() {
        let body = r#"{"cssvalidation":{"validity":true,"result":{"errorcount":0}}}"#;
        let out = outcome_from_diagnostics("CSS", &parse_jigsaw_errors(body).unwrap());
        assert_eq!(out, StageOutcome::ok("CSS validation passed successfully"));
    }

    #[test]
    fn jigsaw_errors_render_line() {
        let body = r#"{"cssvalidation":{"errors":[{"line":2,"message":"Property colr doesn't exist"}]}}"#;
        let out = outcome_from_diagnostics("CSS", &parse_jigsaw_errors(body).unwrap());
        assert_eq!(
            out.message,
            "CSS validation issues found: Line 2: Property colr doesn't exist"
        );
    }

    #[test]
    fn unreachable_service_is_reported_not_raised() {
        let cfg = Validation {
            html_endpoint: "http://127.0.0.1:9/nu/".into(),
            css_endpoint: "http://127.0.0.1:9/css".into(),
            http_timeout_seconds: 5,
            ..Validation::default()
        };
        let v = W3cValidator::new(&cfg).unwrap();
        let out = v.validate_html("<!doctype html><title>x</title>");
        assert!(out.is_kind(FailureKind::ValidationUnreachable));
        assert!(out.message.starts_with("Failed to validate HTML:"));
    }
}
