//! A minimal reader/writer for the subset of the gettext PO format this
//! repository needs: `msgctxt`/`msgid`/`msgstr` stanzas with `#:` (reference)
//! and `#.` (extracted comment) comment lines. This is explicitly not a
//! conformant `msgfmt`/`msgmerge` implementation — no plural forms, no
//! fuzzy/obsolete flags, no header metadata beyond what round-trips through
//! a blank first stanza if present (read and otherwise ignored).

use std::path::Path;

use itstool_core::extractor::Position;

use crate::error::CatalogError;
use crate::message::Message;

/// Serializes `messages` as a PO-subset document. Each message becomes one
/// stanza: a `#:` reference line, an optional `#.` comment line, an optional
/// `msgctxt`, then `msgid`/`msgstr`.
pub fn write(messages: &[Message]) -> String {
    let mut out = String::new();
    for message in messages {
        if let Some(comment) = &message.comment {
            for line in comment.lines() {
                out.push_str("#. ");
                out.push_str(line);
                out.push('\n');
            }
        }
        out.push_str(&format!("#: {}:{}\n", message.marker, message.position.line));
        if let Some(ctx) = &message.msgctxt {
            out.push_str("msgctxt ");
            out.push_str(&quote(ctx));
            out.push('\n');
        }
        out.push_str("msgid ");
        out.push_str(&quote(&message.msgid));
        out.push('\n');
        out.push_str("msgstr ");
        out.push_str(&quote(&message.msgstr));
        out.push('\n');
        out.push('\n');
    }
    out
}

pub fn write_to_file(messages: &[Message], path: impl AsRef<Path>) -> Result<(), CatalogError> {
    std::fs::write(path, write(messages))?;
    Ok(())
}

/// Parses a PO-subset document into `Message`s. Reference comments (`#:`)
/// are parsed back into `marker`/`position.line` on a best-effort basis
/// (`marker:line`, split on the last `:`); anything that doesn't fit that
/// shape is kept verbatim as the marker with line 0, since it is only ever
/// used for diagnostics, never for lookup.
pub fn parse(input: &str) -> Result<Vec<Message>, CatalogError> {
    let mut messages = Vec::new();
    let mut comment_lines: Vec<String> = Vec::new();
    let mut reference: Option<String> = None;
    let mut msgctxt: Option<String> = None;
    let mut msgid: Option<String> = None;
    let mut msgstr: Option<String> = None;

    let mut line_no = 0usize;
    macro_rules! flush {
        () => {
            if let (Some(id), Some(str_)) = (msgid.take(), msgstr.take()) {
                let (marker, line) = reference
                    .take()
                    .and_then(|r| r.rsplit_once(':'))
                    .map(|(m, l)| (m.to_string(), l.parse().unwrap_or(0)))
                    .unwrap_or_else(|| (String::new(), 0));
                messages.push(Message {
                    msgctxt: msgctxt.take(),
                    msgid: id,
                    msgstr: str_,
                    position: Position { line, column: 0 },
                    comment: (!comment_lines.is_empty()).then(|| comment_lines.join("\n")),
                    marker,
                });
            }
            comment_lines.clear();
            reference = None;
        };
    }

    for raw_line in input.lines() {
        line_no += 1;
        let line = raw_line.trim_end();
        if line.is_empty() {
            flush!();
            continue;
        }
        if let Some(rest) = line.strip_prefix("#. ") {
            comment_lines.push(rest.to_string());
        } else if let Some(rest) = line.strip_prefix("#:") {
            reference = Some(rest.trim().to_string());
        } else if line.starts_with('#') {
            // Unrecognized comment kind (flags, obsolete, translator notes
            // without the "#." marker): ignored, not an error.
        } else if let Some(rest) = line.strip_prefix("msgctxt ") {
            msgctxt = Some(unquote(rest, line_no)?);
        } else if let Some(rest) = line.strip_prefix("msgid ") {
            msgid = Some(unquote(rest, line_no)?);
        } else if let Some(rest) = line.strip_prefix("msgstr ") {
            msgstr = Some(unquote(rest, line_no)?);
        } else {
            return Err(CatalogError::MalformedEntry {
                line: line_no,
                reason: format!("unrecognized line: {line}"),
            });
        }
    }
    flush!();
    Ok(messages)
}

pub fn parse_file(path: impl AsRef<Path>) -> Result<Vec<Message>, CatalogError> {
    let text = std::fs::read_to_string(path)?;
    parse(&text)
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

fn unquote(s: &str, line: usize) -> Result<String, CatalogError> {
    let inner = s
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(|| CatalogError::MalformedEntry {
            line,
            reason: "expected a double-quoted string".to_string(),
        })?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some(other) => out.push(other),
                None => {
                    return Err(CatalogError::MalformedEntry {
                        line,
                        reason: "trailing backslash in quoted string".to_string(),
                    });
                }
            }
        } else {
            out.push(c);
        }
    }
    Ok(out)
}
