// src/ports/text.rs
use crate::domain::{ListItem, Note, NoteType};
use crate::util::date::DateFormatter;

/// Checklist items as plain lines, `[x]` marking checked ones
pub fn checklist_body(items: &[ListItem]) -> String {
    items
        .iter()
        .map(|item| {
            let mark = if item.checked { "[x]" } else { "[ ]" };
            format!("{mark} {}", item.body)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone)]
pub struct TextPresenter {
    formatter: DateFormatter,
}

impl TextPresenter {
    pub fn new(formatter: DateFormatter) -> Self {
        Self { formatter }
    }

    pub fn render(&self, note: &Note, show_date_created: bool) -> String {
        let mut text = String::new();
        if !note.title.is_empty() {
            text.push_str(&note.title);
            text.push_str("\n\n");
        }
        if show_date_created {
            text.push_str(&self.formatter.format(note.timestamp));
            text.push_str("\n\n");
        }
        match note.note_type {
            NoteType::Note => text.push_str(&note.body),
            NoteType::List => text.push_str(&checklist_body(&note.items)),
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn presenter() -> TextPresenter {
        TextPresenter::new(DateFormatter::new("en", FixedOffset::east_opt(0).unwrap()))
    }

    #[test]
    fn given_checklist_with_date_when_rendering_then_lists_items_after_header() {
        let note = Note::checklist(
            "Errands",
            vec![ListItem::new("Buy milk", false), ListItem::new("Call Bob", true)],
            0,
        );

        let text = presenter().render(&note, true);

        assert_eq!(text, "Errands\n\nThu 1 Jan 1970\n\n[ ] Buy milk\n[x] Call Bob");
    }

    #[test]
    fn given_untitled_note_without_date_when_rendering_then_returns_body_only() {
        let note = Note::text("", "just the body", 0);

        assert_eq!(presenter().render(&note, false), "just the body");
    }

    #[test]
    fn given_empty_checklist_when_formatting_body_then_returns_empty_string() {
        assert_eq!(checklist_body(&[]), "");
    }
}
