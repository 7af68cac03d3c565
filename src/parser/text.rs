use regex::Regex;

/// Remainder of the line after the first `marker`, trimmed.
///
/// Text after a second `marker` on the same line is not part of the title.
pub fn extract_title(body_text: &str, marker: &str) -> Option<String> {
    let start = body_text.find(marker)? + marker.len();
    let line = body_text[start..].split('\n').next().unwrap_or_default();
    let title = line.split(marker).next().unwrap_or_default().trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

/// Cut the raw cell text at the signature separator, then at the edit footer.
pub fn strip_footer<'a>(raw: &'a str, signature: &str, edited: &str) -> &'a str {
    let text = raw.split(signature).next().unwrap_or_default();
    text.split(edited).next().unwrap_or_default()
}

/// Post date and body of a message cell.
#[derive(Debug, PartialEq, Eq)]
pub struct DatedBody {
    pub date: String,
    pub body: String,
}

/// Split a footer-stripped cell at the first date marker.
///
/// The date is what follows the first `": "` of the match; the body runs from
/// the end of the match to the next match (or the end of the text), trimmed.
/// Returns `None` when the marker is absent or carries no `": "`.
pub fn split_dated_body(text: &str, date_re: &Regex) -> Option<DatedBody> {
    let mut matches = date_re.find_iter(text);
    let first = matches.next()?;
    let date = first.as_str().split(": ").nth(1)?;
    let body_end = matches.next().map(|m| m.start()).unwrap_or(text.len());

    Some(DatedBody {
        date: date.to_string(),
        body: text[first.end()..body_end].trim().to_string(),
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn date_re() -> Regex {
        Regex::new("Escrito el:.*[0-9]{2}:[0-9]{2}").unwrap()
    }

    #[test]
    fn title_is_line_remainder() {
        let text = "Foro General\nTema: Cómo dejar de jugar  \nEscrito por Ana";
        assert_eq!(
            extract_title(text, "Tema:").as_deref(),
            Some("Cómo dejar de jugar")
        );
    }

    #[test]
    fn title_stops_at_second_marker() {
        let text = "Tema: Primero Tema: Segundo\n";
        assert_eq!(extract_title(text, "Tema:").as_deref(), Some("Primero"));
    }

    #[test]
    fn missing_or_empty_title() {
        assert_eq!(extract_title("sin marcador", "Tema:"), None);
        assert_eq!(extract_title("Tema:   \nresto", "Tema:"), None);
    }

    #[test]
    fn footer_markers_truncate() {
        let raw = "Hola Editado por Ana __________________ firma";
        assert_eq!(
            strip_footer(raw, "__________________", "Editado por"),
            "Hola "
        );
        let raw = "Hola __________________ firma Editado por Ana";
        assert_eq!(
            strip_footer(raw, "__________________", "Editado por"),
            "Hola "
        );
        assert_eq!(strip_footer("sin pie", "___", "Editado por"), "sin pie");
    }

    #[test]
    fn date_and_body() {
        let text = "Escrito el: 12/03/2010 a las 14:35 Hola a todos.  ";
        let parsed = split_dated_body(text, &date_re()).unwrap();
        assert_eq!(parsed.date, "12/03/2010 a las 14:35");
        assert_eq!(parsed.body, "Hola a todos.");
    }

    #[test]
    fn greedy_match_extends_to_last_time_on_line() {
        let text = "Escrito el: 12/03/2010 a las 14:35 quedamos a las 18:00 en la puerta\nmañana";
        let parsed = split_dated_body(text, &date_re()).unwrap();
        assert_eq!(parsed.date, "12/03/2010 a las 14:35 quedamos a las 18:00");
        assert_eq!(parsed.body, "en la puerta\nmañana");
    }

    #[test]
    fn body_ends_at_next_date_marker() {
        let text = "Escrito el: 01/01/2011 a las 10:00\nprimero\nEscrito el: 02/01/2011 a las 11:00\nsegundo";
        let parsed = split_dated_body(text, &date_re()).unwrap();
        assert_eq!(parsed.date, "01/01/2011 a las 10:00");
        assert_eq!(parsed.body, "primero");
    }

    #[test]
    fn no_date_marker() {
        assert_eq!(split_dated_body("texto sin fecha", &date_re()), None);
        // marker without ": " separator
        assert_eq!(
            split_dated_body("Escrito el:12/03/2010 14:35 hola", &date_re()),
            None
        );
    }

    #[test]
    fn body_may_be_empty() {
        let parsed = split_dated_body("Escrito el: 12/03/2010 a las 14:35   ", &date_re()).unwrap();
        assert!(parsed.body.is_empty());
    }
}
