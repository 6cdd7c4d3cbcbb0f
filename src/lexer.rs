//! Line classification for the keyword deck format.
//!
//! `**` starts a comment, `*` starts a keyword line carrying comma separated
//! options, and every other non-blank line is a comma separated data record
//! belonging to the most recent keyword.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{DeckError, DeckResult, Location};

fn keyword_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_\-]*(?:\s+[A-Za-z0-9_\-]+)*$").unwrap())
}

/// A keyword line such as `*ELEMENT, TYPE=C3D8, ELSET=Eall`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordLine {
    /// Upper-cased name with internal whitespace collapsed, e.g. `SOLID SECTION`
    pub name: String,
    /// Options in declaration order; keys are upper-cased
    pub options: Vec<(String, Option<String>)>,
}

impl KeywordLine {
    /// Value of a `KEY=VALUE` option, looked up case-insensitively
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .and_then(|(_, v)| v.as_deref())
    }

    /// Whether a bare flag (or a keyed option) is present
    pub fn has(&self, key: &str) -> bool {
        self.options.iter().any(|(k, _)| k.eq_ignore_ascii_case(key))
    }

    pub fn require(&self, key: &'static str, at: &Location) -> DeckResult<&str> {
        self.option(key).ok_or_else(|| DeckError::MissingOption {
            at: at.clone(),
            keyword: self.name.clone(),
            option: key,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LineKind {
    Keyword(KeywordLine),
    Data {
        fields: Vec<String>,
        /// The record ended with a comma and may continue on the next line
        continued: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub at: Location,
    pub kind: LineKind,
    /// Original text, kept for blocks that are passed through verbatim
    pub raw: String,
}

/// Split deck text into keyword and data lines, dropping comments and blanks
pub fn lex(text: &str, source: Arc<str>) -> DeckResult<Vec<Line>> {
    let mut lines = Vec::new();
    let mut physical = text.lines().enumerate().peekable();

    while let Some((idx, raw)) = physical.next() {
        let at = Location::new(source.clone(), idx + 1);
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with("**") {
            continue;
        }

        if let Some(body) = trimmed.strip_prefix('*') {
            let mut body = body.to_string();
            let mut raw_text = raw.trim_end().to_string();
            // A keyword line ending in a comma continues on the next line when
            // that line carries further options; data records never contain '='
            while body.trim_end().ends_with(',') {
                match physical.peek() {
                    Some((_, next)) if !next.trim().starts_with('*') && next.contains('=') => {
                        body.push_str(next.trim());
                        raw_text.push('\n');
                        raw_text.push_str(next.trim_end());
                        physical.next();
                    }
                    _ => break,
                }
            }
            let keyword = parse_keyword(&body, &at)?;
            lines.push(Line {
                at,
                kind: LineKind::Keyword(keyword),
                raw: raw_text,
            });
        } else {
            let continued = trimmed.ends_with(',');
            let mut fields: Vec<String> = trimmed.split(',').map(|f| f.trim().to_string()).collect();
            if continued {
                fields.pop();
            }
            lines.push(Line {
                at,
                kind: LineKind::Data { fields, continued },
                raw: raw.trim_end().to_string(),
            });
        }
    }

    Ok(lines)
}

fn parse_keyword(body: &str, at: &Location) -> DeckResult<KeywordLine> {
    let mut parts = body.split(',');
    let name_raw = parts.next().unwrap_or_default().trim();
    if !keyword_name_re().is_match(name_raw) {
        return Err(DeckError::Syntax {
            at: at.clone(),
            message: format!("malformed keyword '*{}'", name_raw),
        });
    }
    let name = name_raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase();

    let mut options = Vec::new();
    for part in parts {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part.split_once('=') {
            Some((key, value)) => {
                let key = normalize_key(key);
                let value = value.trim().trim_matches('"').trim().to_string();
                if key.is_empty() {
                    return Err(DeckError::Syntax {
                        at: at.clone(),
                        message: format!("option without a name in *{}", name),
                    });
                }
                options.push((key, Some(value)));
            }
            None => options.push((normalize_key(part), None)),
        }
    }

    Ok(KeywordLine { name, options })
}

fn normalize_key(key: &str) -> String {
    key.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}
