// src/ports/html.rs
use crate::domain::{Note, NoteType, SpanRepresentation};
use crate::util::date::DateFormatter;
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::collections::BTreeSet;
use tracing::instrument;

/// Escape text and turn line breaks into `<br>`
fn escape_segment(text: &str, out: &mut String) {
    let mut lines = text.split('\n');
    if let Some(first) = lines.next() {
        out.push_str(&encode_text(first));
    }
    for line in lines {
        out.push_str("<br>\n");
        out.push_str(&encode_text(line));
    }
}

type ClampedSpan<'a> = (usize, usize, &'a SpanRepresentation);

/// Re-apply formatting spans to a body and render it as paragraphs.
///
/// Offsets count characters and are clamped to the body. A run of two or
/// more newlines starts a new paragraph, with `<br>` for every newline past
/// the second. Overlapping spans are split at every boundary so the emitted
/// tags always nest.
pub fn spans_to_html(body: &str, spans: &[SpanRepresentation]) -> String {
    if body.is_empty() {
        return String::new();
    }

    let chars: Vec<char> = body.chars().collect();
    let len = chars.len();
    let spans: Vec<ClampedSpan> = spans
        .iter()
        .map(|span| (span.start.min(len), span.end.min(len), span))
        .filter(|(start, end, _)| start < end)
        .collect();

    let mut html = String::from("<p dir=\"ltr\">");
    let mut paragraph_start = 0;
    let mut i = 0;
    while i < len {
        if chars[i] != '\n' {
            i += 1;
            continue;
        }
        let run_start = i;
        while i < len && chars[i] == '\n' {
            i += 1;
        }
        let run = i - run_start;
        if run < 2 {
            continue;
        }
        render_paragraph(&chars, paragraph_start, run_start, &spans, &mut html);
        for _ in 2..run {
            html.push_str("<br>");
        }
        if i < len {
            html.push_str("</p>\n<p dir=\"ltr\">");
        }
        paragraph_start = i;
    }
    render_paragraph(&chars, paragraph_start, len, &spans, &mut html);
    html.push_str("</p>\n");
    html
}

/// Render `chars[from..to]` with the spans clipped to that range
fn render_paragraph(
    chars: &[char],
    from: usize,
    to: usize,
    spans: &[ClampedSpan],
    html: &mut String,
) {
    if from >= to {
        return;
    }

    let mut boundaries: BTreeSet<usize> = BTreeSet::from([from, to]);
    for (start, end, _) in spans {
        for offset in [*start, *end] {
            if from < offset && offset < to {
                boundaries.insert(offset);
            }
        }
    }
    let boundaries: Vec<usize> = boundaries.into_iter().collect();

    for window in boundaries.windows(2) {
        let (from, to) = (window[0], window[1]);
        let active: Vec<&ClampedSpan> = spans
            .iter()
            .filter(|(start, end, _)| *start <= from && to <= *end)
            .collect();

        let link = active
            .iter()
            .find(|(_, _, span)| span.link)
            .map(|(start, end, _)| chars[*start..*end].iter().collect::<String>());
        let bold = active.iter().any(|(_, _, span)| span.bold);
        let italic = active.iter().any(|(_, _, span)| span.italic);
        let monospace = active.iter().any(|(_, _, span)| span.monospace);
        let strikethrough = active.iter().any(|(_, _, span)| span.strikethrough);

        let mut closing: Vec<&str> = Vec::new();
        if let Some(href) = &link {
            html.push_str(&format!("<a href=\"{}\">", encode_double_quoted_attribute(href)));
            closing.push("</a>");
        }
        if bold {
            html.push_str("<b>");
            closing.push("</b>");
        }
        if italic {
            html.push_str("<i>");
            closing.push("</i>");
        }
        if monospace {
            html.push_str("<tt>");
            closing.push("</tt>");
        }
        if strikethrough {
            html.push_str("<span style=\"text-decoration:line-through;\">");
            closing.push("</span>");
        }

        let segment: String = chars[from..to].iter().collect();
        escape_segment(&segment, html);

        for tag in closing.iter().rev() {
            html.push_str(tag);
        }
    }
}

#[derive(Debug, Clone)]
pub struct HtmlPresenter {
    formatter: DateFormatter,
}

impl HtmlPresenter {
    pub fn new(formatter: DateFormatter) -> Self {
        Self { formatter }
    }

    #[instrument(level = "debug", skip(self, note), fields(id = note.id))]
    pub fn render(&self, note: &Note, show_date_created: bool) -> String {
        let title = encode_text(&note.title);

        let mut html = String::from("<!DOCTYPE html>");
        html.push_str("<html><head>");
        html.push_str(&format!("<meta charset=\"UTF-8\"><title>{title}</title>"));
        html.push_str("</head><body>");
        html.push_str(&format!("<h2>{title}</h2>"));

        if show_date_created {
            let date = self.formatter.format(note.timestamp);
            html.push_str(&format!("<p>{}</p>", encode_text(&date)));
        }

        match note.note_type {
            NoteType::Note => html.push_str(&spans_to_html(&note.body, &note.spans)),
            NoteType::List => {
                html.push_str("<ol>");
                for item in &note.items {
                    html.push_str(&format!("<li>{}</li>", encode_text(&item.body)));
                }
                html.push_str("</ol>");
            }
        }
        html.push_str("</body></html>");
        html
    }
}
