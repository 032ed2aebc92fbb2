//! Notion JSON <-> `Record` / `PropertyChanges`.
//!
//! # 読み取り
//! ページの各プロパティは `type` で形が決まります。claim プロトコルが読む形だけ対応し、
//! それ以外（relation, people など）は読み飛ばします。
//!
//! # 書き込み
//! `Field::kind()` に従ってエンコードします。`PropertyValue::Empty` はクリア。

use serde_json::{Map, Value, json};

use taskclaim_core::domain::{Field, FieldKind, PropertyChanges, PropertyValue, Record, RecordId, TaskId};
use taskclaim_core::ports::{RecordFilter, StoreError};

/// Decodes `db query --results-only` output: a JSON array of pages.
///
/// An object with a `results` array is accepted too.
pub fn decode_pages(stdout: &str) -> Result<Vec<Record>, StoreError> {
    let value = parse(stdout)?;
    let pages = match &value {
        Value::Array(pages) => pages,
        Value::Object(obj) => obj
            .get("results")
            .and_then(Value::as_array)
            .ok_or_else(|| StoreError::Malformed("expected an array of pages".into()))?,
        _ => return Err(StoreError::Malformed("expected an array of pages".into())),
    };
    pages.iter().map(decode_page).collect()
}

/// Decodes `page get` / `page create` output.
pub fn decode_single(stdout: &str) -> Result<Record, StoreError> {
    decode_page(&parse(stdout)?)
}

fn parse(stdout: &str) -> Result<Value, StoreError> {
    serde_json::from_str(stdout).map_err(|e| StoreError::Malformed(format!("invalid JSON: {e}")))
}

pub fn decode_page(page: &Value) -> Result<Record, StoreError> {
    let id = page
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::Malformed("page without id".into()))?;

    let mut record = Record::new(RecordId::new(id));
    record.last_edited_time = page
        .get("last_edited_time")
        .and_then(Value::as_str)
        .map(str::to_string);

    if let Some(properties) = page.get("properties").and_then(Value::as_object) {
        for (name, property) in properties {
            if let Some(value) = decode_property(property) {
                record.properties.insert(name.clone(), value);
            }
        }
    }
    Ok(record)
}

/// One property by its `type`. `None` for shapes the protocol never reads.
fn decode_property(property: &Value) -> Option<PropertyValue> {
    let kind = property.get("type").and_then(Value::as_str)?;
    let body = property.get(kind).unwrap_or(&Value::Null);

    let value = match kind {
        "title" | "rich_text" => {
            let text = plain_text(body);
            if text.is_empty() {
                PropertyValue::Empty
            } else {
                PropertyValue::Text(text)
            }
        }
        "select" | "status" => match body.get("name").and_then(Value::as_str) {
            Some(name) => PropertyValue::Select(name.to_string()),
            None => PropertyValue::Empty,
        },
        "number" => number(body),
        "date" => match body.get("start").and_then(Value::as_str) {
            Some(start) => PropertyValue::Date(start.to_string()),
            None => PropertyValue::Empty,
        },
        "unique_id" => {
            let n = body.get("number").and_then(Value::as_i64)?;
            match body.get("prefix").and_then(Value::as_str) {
                Some(prefix) if !prefix.is_empty() => PropertyValue::Text(format!("{prefix}-{n}")),
                _ => PropertyValue::Text(n.to_string()),
            }
        }
        "rollup" => number(body.get("number").unwrap_or(&Value::Null)),
        _ => return None,
    };
    Some(value)
}

fn plain_text(items: &Value) -> String {
    items
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("plain_text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default()
}

fn number(value: &Value) -> PropertyValue {
    match value.as_i64().or_else(|| value.as_f64().map(|f| f as i64)) {
        Some(n) => PropertyValue::Number(n),
        None => PropertyValue::Empty,
    }
}

/// Encodes a batched update as the `--properties` object.
///
/// Read-only fields (rollups, unique ids) are skipped.
pub fn encode_properties(changes: &PropertyChanges) -> Value {
    let mut out = Map::new();
    for (field, value) in changes.iter() {
        if let Some(encoded) = encode_property(field, value) {
            out.insert(field.as_str().to_string(), encoded);
        }
    }
    Value::Object(out)
}

fn encode_property(field: Field, value: &PropertyValue) -> Option<Value> {
    let text = value.as_text();
    let encoded = match field.kind() {
        FieldKind::Title => json!({ "title": rich_text(text) }),
        FieldKind::RichText => json!({ "rich_text": rich_text(text) }),
        FieldKind::Select => match text {
            Some(name) => json!({ "select": { "name": name } }),
            None => json!({ "select": null }),
        },
        FieldKind::Date => match text {
            Some(start) => json!({ "date": { "start": start } }),
            None => json!({ "date": null }),
        },
        FieldKind::Number => json!({ "number": value.as_number() }),
        FieldKind::Rollup | FieldKind::UniqueId => return None,
    };
    Some(encoded)
}

fn rich_text(text: Option<&str>) -> Value {
    match text {
        Some(content) => json!([{ "text": { "content": content } }]),
        None => json!([]),
    }
}

/// `--filter` argument for a query, or `None` to match everything.
pub fn encode_filter(filter: &RecordFilter) -> Result<Option<Value>, StoreError> {
    let mut clauses = Vec::new();
    if let Some(status) = filter.status {
        clauses.push(json!({
            "property": Field::Status.as_str(),
            "select": { "equals": status.as_str() },
        }));
    }
    if let Some(task_id) = &filter.task_id {
        clauses.push(json!({
            "property": Field::TaskId.as_str(),
            "unique_id": { "equals": unique_id_number(task_id)? },
        }));
    }
    Ok(match clauses.len() {
        0 => None,
        1 => clauses.pop(),
        _ => Some(json!({ "and": clauses })),
    })
}

/// `TASK-42` -> 42. The store filters unique ids by number only.
fn unique_id_number(task_id: &TaskId) -> Result<i64, StoreError> {
    let raw = task_id.as_str().trim();
    let digits = raw.rsplit('-').next().unwrap_or(raw);
    digits
        .parse()
        .map_err(|_| StoreError::NotFound(format!("{task_id} (not a valid task id)")))
}
