// src/ports/json.rs
use crate::domain::{Color, ListItem, Note, NoteType, SpanRepresentation};
use serde::Serialize;
use std::collections::BTreeSet;

/// Export document for one note. Field order is the serialized key order.
#[derive(Debug, Serialize)]
struct NoteDocument<'a> {
    #[serde(rename = "type")]
    note_type: NoteType,
    color: Color,
    title: &'a str,
    pinned: bool,
    #[serde(rename = "date-created")]
    date_created: i64,
    labels: &'a BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    spans: Option<&'a [SpanRepresentation]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    items: Option<&'a [ListItem]>,
}

/// Render a note as a two-space indented JSON object
pub fn render(note: &Note) -> serde_json::Result<String> {
    let (body, spans, items) = match note.note_type {
        NoteType::Note => (Some(note.body.as_str()), Some(note.spans.as_slice()), None),
        NoteType::List => (None, None, Some(note.items.as_slice())),
    };

    serde_json::to_string_pretty(&NoteDocument {
        note_type: note.note_type,
        color: note.color,
        title: &note.title,
        pinned: note.pinned,
        date_created: note.timestamp,
        labels: &note.labels,
        body,
        spans,
        items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ListItem;

    #[test]
    fn given_text_note_when_rendering_then_matches_exact_layout() {
        let note = Note::text("T", "B", 1_600_000_000_000)
            .with_labels(["L"])
            .with_spans(vec![SpanRepresentation {
                italic: true,
                start: 0,
                end: 1,
                ..Default::default()
            }]);

        let json = render(&note).unwrap();

        assert_eq!(
            json,
            r#"{
  "type": "NOTE",
  "color": "DEFAULT",
  "title": "T",
  "pinned": false,
  "date-created": 1600000000000,
  "labels": [
    "L"
  ],
  "body": "B",
  "spans": [
    {
      "bold": false,
      "link": false,
      "italic": true,
      "monospace": false,
      "strikethrough": false,
      "start": 0,
      "end": 1
    }
  ]
}"#
        );
    }

    #[test]
    fn given_checklist_when_rendering_then_has_items_and_no_body() {
        let note = Note::checklist("Shop", vec![ListItem::new("Buy milk", true)], 9);

        let value: serde_json::Value = serde_json::from_str(&render(&note).unwrap()).unwrap();

        assert_eq!(value["type"], "LIST");
        assert_eq!(value["items"][0]["body"], "Buy milk");
        assert_eq!(value["items"][0]["checked"], true);
        assert!(value.get("body").is_none());
        assert!(value.get("spans").is_none());
        assert_eq!(value["labels"], serde_json::json!([]));
    }
}
