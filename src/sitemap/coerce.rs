//! Field coercers: turn resolved document values into the textual forms
//! sitemap elements require.
//!
//! Path expressions come in two flavors. A plain expression is a dotted path
//! (`meta.updated_at`). A piped expression either joins several resolved
//! paths (`title|subtitle` -> "title subtitle") or, for resource locations,
//! interpolates one resolved value into a literal prefix/suffix
//! (`image_id|https://cdn.example.com/images` ->
//! `https://cdn.example.com/images/<id>`).

use crate::document::{resolve_in, Document};
use anyhow::{bail, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

/// Output layout for every timestamp written into a sitemap.
pub const DATETIME_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// Resolve a path, treating JSON `null` the same as an absent field.
pub fn present<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    resolve_in(doc, path).filter(|v| !v.is_null())
}

/// Format a resolved scalar the way it reads in the document.
pub fn format_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Coerce a path expression into a text value.
///
/// A piped expression resolves every segment as a path and joins the
/// formatted values with a single space; any absent segment fails naming
/// that segment.
pub fn string_value(expr: &str, doc: &Document) -> Result<String> {
    if expr.contains('|') {
        let mut parts = Vec::new();
        for segment in expr.split('|') {
            let Some(value) = present(doc, segment) else {
                bail!("missing field for key: {segment}");
            };
            parts.push(format_scalar(value));
        }
        return Ok(parts.join(" "));
    }

    let Some(value) = present(doc, expr) else {
        bail!("missing field for key: {expr}");
    };
    Ok(format_scalar(value))
}

/// Coerce a path expression into a resource location URL.
///
/// The templated form is `key|prefix` or `key|prefix|suffix`: the resolved
/// value of `key` is interpolated between the literal prefix and suffix. A
/// prefix ending in `=` concatenates directly; otherwise the value joins as
/// a path segment. A plain expression must resolve to a string.
pub fn resource_loc(expr: &str, doc: &Document) -> Result<String> {
    if expr.contains('|') {
        let parts: Vec<&str> = expr.split('|').collect();

        let key = parts[0];
        let Some(value) = present(doc, key) else {
            bail!("missing field for key: {key}");
        };
        let value = format_scalar(value);

        return match parts.as_slice() {
            [_, prefix] => Ok(interpolate(prefix, &value, "")),
            [_, prefix, suffix] => Ok(interpolate(prefix, &value, suffix)),
            _ => bail!("invalid location expression: {expr}"),
        };
    }

    let Some(value) = present(doc, expr) else {
        bail!("missing field for key: {expr}");
    };
    match value {
        Value::String(s) => Ok(s.clone()),
        _ => bail!("value is not a string for key: {expr}"),
    }
}

fn interpolate(prefix: &str, value: &str, suffix: &str) -> String {
    if prefix.ends_with('=') {
        format!("{prefix}{value}{suffix}")
    } else {
        format!("{prefix}/{value}{suffix}")
    }
}

/// Coerce a boolean value to `yes` / `no`.
pub fn bool_yes_no(key: &str, value: &Value) -> Result<&'static str> {
    match value.as_bool() {
        Some(true) => Ok("yes"),
        Some(false) => Ok("no"),
        None => bail!("value for key {key} is not a boolean"),
    }
}

/// Coerce a boolean value to `0` / `1`.
pub fn bool_zero_one(key: &str, value: &Value) -> Result<&'static str> {
    match value.as_bool() {
        Some(true) => Ok("1"),
        Some(false) => Ok("0"),
        None => bail!("value for key {key} is not a boolean"),
    }
}

/// Coerce a document value into the fixed timestamp layout.
///
/// Accepts an RFC 3339 string (its offset is preserved) or integer epoch
/// seconds (formatted in UTC).
pub fn datetime_value(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => {
            let parsed = DateTime::parse_from_rfc3339(s)?;
            Ok(parsed.format(DATETIME_LAYOUT).to_string())
        }
        Value::Number(n) => {
            let Some(secs) = n.as_i64() else {
                bail!("unsupported datetime format");
            };
            let Some(ts) = Utc.timestamp_opt(secs, 0).single() else {
                bail!("epoch seconds out of range: {secs}");
            };
            Ok(ts.format(DATETIME_LAYOUT).to_string())
        }
        _ => bail!("unsupported datetime format"),
    }
}

/// Coerce a sequence of strings into a `", "`-joined list.
pub fn string_array(value: &Value) -> Result<String> {
    let Some(seq) = value.as_array() else {
        bail!("unsupported array format");
    };

    let mut items = Vec::with_capacity(seq.len());
    for item in seq {
        match item {
            Value::String(s) => items.push(s.as_str()),
            _ => bail!("unsupported array format"),
        }
    }

    Ok(items.join(", "))
}

/// Turn free text into a URL slug: lower-case, letters and digits kept,
/// whitespace and hyphen runs collapsed to a single `-`, everything else
/// dropped, leading and trailing `-` trimmed. Idempotent on its own output.
pub fn slug(text: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for ch in text.to_lowercase().chars() {
        if ch == '-' || ch.is_whitespace() {
            if !out.ends_with('-') {
                out.push('-');
            }
        } else if ch.is_alphanumeric() {
            out.push(ch);
        }
    }

    out.trim_matches('-').to_string()
}
