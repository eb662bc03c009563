use super::{DocumentFormat, ExtractionError};
use quick_xml::Reader;
use quick_xml::events::Event;

/// Join the trimmed text of every element with single spaces.
pub(super) fn extract_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let corrupt = |reason: String| ExtractionError::corrupt(DocumentFormat::Xml, reason);

    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut parts: Vec<String> = Vec::new();
    let mut depth = 0usize;
    let mut saw_element = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(_)) => {
                depth += 1;
                saw_element = true;
            }
            Ok(Event::Empty(_)) => saw_element = true,
            Ok(Event::End(_)) => depth = depth.saturating_sub(1),
            Ok(Event::Text(text)) => {
                let text = text
                    .unescape()
                    .map_err(|error| corrupt(error.to_string()))?;
                push_trimmed(&mut parts, &text);
            }
            Ok(Event::CData(data)) => {
                push_trimmed(&mut parts, &String::from_utf8_lossy(&data.into_inner()));
            }
            Ok(Event::Eof) => break,
            Err(error) => {
                return Err(corrupt(format!(
                    "{error} at byte {}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    if !saw_element {
        return Err(corrupt("no element found".into()));
    }
    if depth != 0 {
        return Err(corrupt("unexpected end of document".into()));
    }
    Ok(parts.join(" "))
}

fn push_trimmed(parts: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        parts.push(trimmed.to_string());
    }
}
