//! Mention extraction from serialized editor content
//!
//! The editor serializes a mention as an inline element flagged with a
//! `data-type="mention"` attribute whose text is the target title prefixed by a
//! single sigil, optionally stamped with the target's stable id:
//!
//! ```html
//! <p>See <span data-type="mention" data-id="5f0c...">@Reading list</span></p>
//! ```
//!
//! Parsing tokenizes the markup into a tag stream and walks it as a tree. It never
//! fails: markup it cannot make sense of contributes no mentions.

use crate::config::ParserConfig;
use crate::models::MentionToken;
use regex::Regex;
use std::sync::LazyLock;

/// Opening, closing or self-closing tag.
/// Groups: 1 closing slash, 2 name, 3 attributes, 4 self-closing slash
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"<(/)?([A-Za-z][A-Za-z0-9:-]*)"#,
        r#"((?:\s+[^\s"'=/<>]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'=<>`]+))?)*)"#,
        r#"\s*(/)?>"#,
    ))
    .unwrap()
});

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s"'=/<>]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#).unwrap()
});

static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

static ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]+);").unwrap());

/// Elements that never have a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Attribute carrying the stable id of the mentioned note
const MENTION_ID_ATTR: &str = "data-id";
const MENTION_TYPE_ATTR: &str = "data-type";

#[derive(Debug)]
enum Token<'a> {
    Open {
        name: String,
        attrs: &'a str,
        self_closing: bool,
    },
    Close {
        name: String,
    },
    Text(&'a str),
}

/// An open mention element whose text is still being collected
struct OpenMention {
    /// Tag name of the mention element itself
    tag: String,
    /// Elements opened inside the mention and not yet closed, innermost last
    inner: Vec<String>,
    text: String,
    note_id: Option<String>,
}

impl OpenMention {
    /// Apply a closing tag; returns true when it ends the mention element
    ///
    /// Closers match by name like a browser's tree builder: a closer for an
    /// inner element pops it and anything left open above it, a closer for the
    /// mention's own tag ends the mention even with inner elements still open,
    /// and any other closer is ignored.
    fn close(&mut self, name: &str) -> bool {
        if let Some(pos) = self.inner.iter().rposition(|open| open == name) {
            self.inner.truncate(pos);
            return false;
        }
        name == self.tag
    }
}

/// Extract mention tokens with the default `@` sigil and `mention` marker
///
/// Returns tokens in document order with duplicates preserved. An empty vector
/// means the content holds no mention elements.
///
/// # Examples
///
/// ```
/// # use notelink_core::utils::extract_mentions;
/// let content = concat!(
///     r#"<p><span data-type="mention">@Alpha</span> and "#,
///     r#"<span data-type="mention">@Beta</span></p>"#,
/// );
/// let labels: Vec<_> = extract_mentions(content).into_iter().map(|m| m.label).collect();
/// assert_eq!(labels, vec!["Alpha", "Beta"]);
/// ```
pub fn extract_mentions(content: &str) -> Vec<MentionToken> {
    extract_mentions_with(content, &ParserConfig::default())
}

/// Display strings of every mention, in document order
pub fn extract_mention_labels(content: &str) -> Vec<String> {
    extract_mentions(content).into_iter().map(|m| m.label).collect()
}

/// Extract mention tokens using a custom sigil and marker
pub fn extract_mentions_with(content: &str, config: &ParserConfig) -> Vec<MentionToken> {
    if content.is_empty() {
        return Vec::new();
    }

    let stripped = COMMENT_RE.replace_all(content, "");
    let mut mentions = Vec::new();
    let mut open: Option<OpenMention> = None;

    for token in tokenize(&stripped) {
        match token {
            Token::Open {
                name,
                attrs,
                self_closing,
            } => {
                let is_void = self_closing || VOID_ELEMENTS.contains(&name.as_str());

                if let Some(current) = open.as_mut() {
                    if !is_void {
                        current.inner.push(name);
                    }
                    continue;
                }

                let attributes = parse_attributes(attrs);
                let is_mention = attributes
                    .iter()
                    .any(|(k, v)| k == MENTION_TYPE_ATTR && v == &config.marker);
                if !is_mention || is_void {
                    continue;
                }

                let note_id = attributes
                    .into_iter()
                    .find(|(k, v)| k == MENTION_ID_ATTR && !v.trim().is_empty())
                    .map(|(_, v)| v);

                open = Some(OpenMention {
                    tag: name,
                    inner: Vec::new(),
                    text: String::new(),
                    note_id,
                });
            }
            Token::Close { name } => {
                let finished = open.as_mut().is_some_and(|current| current.close(&name));

                if finished {
                    if let Some(done) = open.take() {
                        mentions.push(finish_mention(done, config.sigil));
                    }
                }
            }
            Token::Text(text) => {
                if let Some(current) = open.as_mut() {
                    current.text.push_str(&decode_entities(text));
                }
            }
        }
    }

    if open.is_some() {
        tracing::debug!("Discarding unterminated mention element");
    }

    mentions
}

fn finish_mention(open: OpenMention, sigil: char) -> MentionToken {
    let label = open
        .text
        .strip_prefix(sigil)
        .map(str::to_string)
        .unwrap_or(open.text);

    MentionToken {
        label,
        note_id: open.note_id,
    }
}

fn tokenize(content: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut cursor = 0;

    for caps in TAG_RE.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };

        if whole.start() > cursor {
            tokens.push(Token::Text(&content[cursor..whole.start()]));
        }
        cursor = whole.end();

        if caps.get(1).is_some() {
            tokens.push(Token::Close {
                name: caps[2].to_ascii_lowercase(),
            });
        } else {
            tokens.push(Token::Open {
                name: caps[2].to_ascii_lowercase(),
                attrs: caps.get(3).map_or("", |m| m.as_str()),
                self_closing: caps.get(4).is_some(),
            });
        }
    }

    if cursor < content.len() {
        tokens.push(Token::Text(&content[cursor..]));
    }

    tokens
}

fn parse_attributes(attrs: &str) -> Vec<(String, String)> {
    ATTR_RE
        .captures_iter(attrs)
        .map(|caps| {
            let name = caps[1].to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or(String::new(), |m| decode_entities(m.as_str()));
            (name, value)
        })
        .collect()
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    ENTITY_RE
        .replace_all(text, |caps: &regex::Captures| {
            let entity = &caps[1];
            let decoded = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity.strip_prefix('#').and_then(|num| {
                    let code = match num.strip_prefix(['x', 'X']) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => num.parse::<u32>().ok(),
                    };
                    code.and_then(char::from_u32)
                }),
            };
            decoded.map_or_else(|| caps[0].to_string(), |c| c.to_string())
        })
        .into_owned()
}
