use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::{ContentRedactor, RedactionError, Result};

/// Replacement for every redacted value. No rule matches it, so a second
/// pass over redacted content is a no-op.
pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Key names (normalized: lowercase, alphanumerics only) whose values are
/// redacted. A key is sensitive when it equals or ends with one of these.
const BUILTIN_SENSITIVE_KEYS: &[&str] = &[
    "apikey",
    "accesskey",
    "secretkey",
    "privatekey",
    "token",
    "secret",
    "password",
    "passwd",
    "pwd",
    "authorization",
    "auth",
    "cookie",
    "credential",
    "credentials",
    "sessionid",
    "signature",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactionInfo {
    pub artifact_id: String,
    pub redaction_type: String,
    pub count: usize,
}

lazy_static! {
    // {"key": "Authorization", "value": "..."} as written for Postman headers,
    // and {"name": "password", "value": "..."} for report parameters.
    static ref NAMED_VALUE: Regex = Regex::new(
        r#""(?:key|name)"\s*:\s*"(?P<key>[^"\\]{1,128})"\s*,\s*"value"\s*:\s*"(?P<secret>(?:[^"\\]|\\.)*)""#
    ).unwrap();
    static ref VALUE_NAMED: Regex = Regex::new(
        r#""value"\s*:\s*"(?P<secret>(?:[^"\\]|\\.)*)"\s*,\s*"(?:key|name)"\s*:\s*"(?P<key>[^"\\]{1,128})""#
    ).unwrap();
    // "<key>": "<string>" at any nesting depth. Non-string values never match.
    static ref JSON_PAIR: Regex = Regex::new(
        r#""(?P<key>[^"\\]{1,128})"\s*:\s*"(?P<secret>(?:[^"\\]|\\.)*)""#
    ).unwrap();
    // Header value up to the end of the line, a tag or a quote, without
    // trailing whitespace. HTML attachments often hold a whole page per line.
    static ref HEADER_LINE: Regex = Regex::new(concat!(
        r"(?im)^[ \t]*(?P<key>proxy-authorization|authorization|set-cookie|cookie|x-api-key|api-key|x-auth-token)",
        r#"[ \t]*:[ \t]*(?P<secret>[^\r\n<"']*[^\s<"'])"#
    )).unwrap();

    static ref BEARER: Regex =
        Regex::new(r"(?i)\bbearer\s+(?P<secret>[A-Za-z0-9\-._~+/]{8,}=*)").unwrap();
    static ref JWT: Regex = Regex::new(
        r"\b(?P<secret>eyJ[A-Za-z0-9_-]{5,}\.[A-Za-z0-9_-]{5,}\.[A-Za-z0-9_-]{5,})"
    ).unwrap();
    static ref POSTMAN_API_KEY: Regex =
        Regex::new(r"\b(?P<secret>PMAK-[A-Za-z0-9-]{20,})").unwrap();
    static ref AWS_ACCESS_KEY: Regex = Regex::new(r"\b(?P<secret>AKIA[0-9A-Z]{16})\b").unwrap();
    static ref GITHUB_TOKEN: Regex =
        Regex::new(r"\b(?P<secret>gh[pousr]_[A-Za-z0-9_]{36,})").unwrap();
    static ref SLACK_TOKEN: Regex =
        Regex::new(r"\b(?P<secret>xox[baprs]-[A-Za-z0-9-]{10,})").unwrap();
    static ref SECRET_KEY: Regex =
        Regex::new(r"\b(?P<secret>sk-(?:ant-)?[A-Za-z0-9_-]{20,})").unwrap();
    static ref PASSWORD_ASSIGNMENT: Regex = Regex::new(
        r#"(?i)\b(?:password|passwd|pwd)\s*[=:]\s*(?P<secret>[^\s&"',;<>]+)"#
    ).unwrap();
    static ref URL_CREDENTIALS: Regex = Regex::new(
        r#"(?i)\b[a-z][a-z0-9+.\-]*://[^:/\s@"']+:(?P<secret>[^@/\s"']+)@"#
    ).unwrap();
    static ref HIGH_ENTROPY: Regex = Regex::new(r"\b(?P<secret>[A-Za-z0-9]{32,})\b").unwrap();
}

enum Rule {
    /// Redacts `secret` when the captured `key` is sensitive.
    Keyed {
        kind: &'static str,
        regex: &'static Regex,
    },
    /// Redacts `secret` when `accept` agrees.
    Shape {
        kind: &'static str,
        regex: &'static Regex,
        accept: fn(&str) -> bool,
    },
}

/// Regex redaction over raw artifact text
///
/// Rules run in a fixed order: key-driven rules first, so a value under a
/// sensitive key is replaced whole, then value shapes, then custom patterns.
pub struct Redactor {
    sensitive_keys: Vec<String>,
    rules: Vec<Rule>,
    custom: Vec<Regex>,
}

impl Redactor {
    pub fn new() -> Self {
        let rules = vec![
            Rule::Keyed {
                kind: "SENSITIVE_PARAMETER",
                regex: &NAMED_VALUE,
            },
            Rule::Keyed {
                kind: "SENSITIVE_PARAMETER",
                regex: &VALUE_NAMED,
            },
            Rule::Keyed {
                kind: "SENSITIVE_KEY",
                regex: &JSON_PAIR,
            },
            Rule::Keyed {
                kind: "SENSITIVE_HEADER",
                regex: &HEADER_LINE,
            },
            Rule::Shape {
                kind: "BEARER_TOKEN",
                regex: &BEARER,
                accept: always,
            },
            Rule::Shape {
                kind: "JWT",
                regex: &JWT,
                accept: always,
            },
            Rule::Shape {
                kind: "POSTMAN_API_KEY",
                regex: &POSTMAN_API_KEY,
                accept: always,
            },
            Rule::Shape {
                kind: "AWS_ACCESS_KEY",
                regex: &AWS_ACCESS_KEY,
                accept: always,
            },
            Rule::Shape {
                kind: "GITHUB_TOKEN",
                regex: &GITHUB_TOKEN,
                accept: always,
            },
            Rule::Shape {
                kind: "SLACK_TOKEN",
                regex: &SLACK_TOKEN,
                accept: always,
            },
            Rule::Shape {
                kind: "SECRET_KEY",
                regex: &SECRET_KEY,
                accept: always,
            },
            Rule::Shape {
                kind: "PASSWORD_ASSIGNMENT",
                regex: &PASSWORD_ASSIGNMENT,
                accept: always,
            },
            Rule::Shape {
                kind: "URL_CREDENTIALS",
                regex: &URL_CREDENTIALS,
                accept: always,
            },
            Rule::Shape {
                kind: "HIGH_ENTROPY",
                regex: &HIGH_ENTROPY,
                accept: mixed_alphanumeric,
            },
        ];

        Self {
            sensitive_keys: BUILTIN_SENSITIVE_KEYS.iter().map(|s| s.to_string()).collect(),
            rules,
            custom: Vec::new(),
        }
    }

    /// Built-in rules plus extra key names and custom regexes.
    pub fn with_rules(extra_keys: &[String], custom_patterns: &[String]) -> Result<Self> {
        let mut redactor = Self::new();

        for key in extra_keys {
            let key = normalize_key(key);
            if !key.is_empty() && !redactor.sensitive_keys.contains(&key) {
                redactor.sensitive_keys.push(key);
            }
        }

        for pattern in custom_patterns {
            let regex = Regex::new(pattern).map_err(|source| RedactionError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
            if regex.is_match(REDACTION_MARKER) {
                return Err(RedactionError::MatchesMarker(pattern.clone()));
            }
            redactor.custom.push(regex);
        }

        Ok(redactor)
    }

    pub fn is_sensitive_key(&self, key: &str) -> bool {
        let key = normalize_key(key);
        !key.is_empty()
            && self
                .sensitive_keys
                .iter()
                .any(|name| key == *name || key.ends_with(name.as_str()))
    }

    fn apply_rule(&self, rule: &Rule, content: &str) -> (&'static str, String, usize) {
        match rule {
            Rule::Keyed { kind, regex } => {
                let (out, count) = replace_secrets(regex, content, |caps| {
                    caps.name("key")
                        .is_some_and(|key| self.is_sensitive_key(key.as_str()))
                });
                (*kind, out, count)
            }
            Rule::Shape {
                kind,
                regex,
                accept,
            } => {
                let (out, count) = replace_secrets(regex, content, |caps| {
                    caps.name("secret").is_some_and(|s| accept(s.as_str()))
                });
                (*kind, out, count)
            }
        }
    }
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentRedactor for Redactor {
    fn redact(&self, artifact_id: &str, content: &str) -> (String, Vec<RedactionInfo>) {
        let mut result = content.to_string();
        let mut redactions: Vec<RedactionInfo> = Vec::new();

        let mut record = |kind: &str, count: usize| {
            if count == 0 {
                return;
            }
            match redactions.iter_mut().find(|r| r.redaction_type == kind) {
                Some(info) => info.count += count,
                None => redactions.push(RedactionInfo {
                    artifact_id: artifact_id.to_string(),
                    redaction_type: kind.to_string(),
                    count,
                }),
            }
        };

        for rule in &self.rules {
            let (kind, out, count) = self.apply_rule(rule, &result);
            result = out;
            record(kind, count);
        }

        for regex in &self.custom {
            let markers: Vec<(usize, usize)> = result
                .match_indices(REDACTION_MARKER)
                .map(|(start, m)| (start, start + m.len()))
                .collect();
            // A custom match touching a marker would rewrite it on the next pass
            let (out, count) = replace_secrets(regex, &result, |caps| {
                caps.get(0).is_some_and(|m| {
                    !markers
                        .iter()
                        .any(|&(start, end)| m.start() < end && start < m.end())
                })
            });
            result = out;
            record("CUSTOM", count);
        }

        (result, redactions)
    }
}

/// Replace the `secret` group (or the whole match when the pattern has none)
/// with the marker, leaving the rest of the match intact.
fn replace_secrets<F>(regex: &Regex, content: &str, mut should_redact: F) -> (String, usize)
where
    F: FnMut(&Captures<'_>) -> bool,
{
    let mut count = 0;
    let out = regex.replace_all(content, |caps: &Captures<'_>| {
        let Some(whole) = caps.get(0) else {
            return String::new();
        };
        let secret = caps.name("secret").unwrap_or(whole);

        if secret.as_str() == REDACTION_MARKER || !should_redact(caps) {
            return whole.as_str().to_string();
        }

        count += 1;
        let text = whole.as_str();
        let start = secret.start() - whole.start();
        let end = secret.end() - whole.start();
        format!("{}{}{}", &text[..start], REDACTION_MARKER, &text[end..])
    });
    (out.into_owned(), count)
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn always(_: &str) -> bool {
    true
}

/// Upper case, lower case and digits together: rules out hex digests.
fn mixed_alphanumeric(s: &str) -> bool {
    s.chars().any(|c| c.is_ascii_uppercase())
        && s.chars().any(|c| c.is_ascii_lowercase())
        && s.chars().any(|c| c.is_ascii_digit())
}
