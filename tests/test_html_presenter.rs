use chrono::FixedOffset;
use notekeep::domain::{ListItem, Note, SpanRepresentation};
use notekeep::ports::HtmlPresenter;
use notekeep::util::date::DateFormatter;

const WEDNESDAY: i64 = 1_791_979_200_000;

fn presenter(locale: &str) -> HtmlPresenter {
    HtmlPresenter::new(DateFormatter::new(locale, FixedOffset::east_opt(0).unwrap()))
}

#[test]
fn given_formatted_note_with_date_when_rendering_then_builds_standalone_document() {
    // Arrange
    let note = Note::text("Plan", "Read <docs> now", WEDNESDAY).with_spans(vec![
        SpanRepresentation {
            italic: true,
            start: 5,
            end: 11,
            ..Default::default()
        },
    ]);

    // Act
    let html = presenter("en").render(&note, true);

    // Assert
    assert!(html.starts_with("<!DOCTYPE html><html><head><meta charset=\"UTF-8\"><title>Plan</title>"));
    assert!(html.contains("<h2>Plan</h2><p>Wed 14 Oct 2026</p>"));
    assert!(html.contains("<p dir=\"ltr\">Read <i>&lt;docs&gt;</i> now</p>"));
    assert!(html.ends_with("</body></html>"));
}

#[test]
fn given_chinese_locale_when_rendering_date_then_uses_localised_format() {
    let note = Note::text("T", "", WEDNESDAY);

    let html = presenter("zh-CN").render(&note, true);

    assert!(html.contains("<p>2026年 10月 14日 (周三)</p>"));
}

#[test]
fn given_checklist_when_rendering_then_lists_items_in_order() {
    let note = Note::checklist(
        "Errands",
        vec![ListItem::new("Buy milk", false), ListItem::new("Call Bob", true)],
        0,
    );

    let html = presenter("en").render(&note, false);

    assert!(html.contains("<h2>Errands</h2><ol><li>Buy milk</li><li>Call Bob</li></ol>"));
    assert!(!html.contains("<p>"));
}
