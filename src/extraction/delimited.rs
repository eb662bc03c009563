use super::{DocumentFormat, ExtractionError, render_rows};

/// Render a CSV file, header included, one record per line.
pub(super) fn extract_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|error| ExtractionError::corrupt(DocumentFormat::Csv, error))?;
        rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }
    Ok(render_rows(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_header_and_records() {
        let csv = b"city,population\n\"Lima, PE\",9751000\nQuito,2800000\n";
        assert_eq!(
            extract_text(csv).unwrap(),
            "city  population\nLima, PE  9751000\nQuito  2800000"
        );
    }

    #[test]
    fn tolerates_ragged_rows() {
        let csv = b"a,b,c\n1,2\n";
        assert_eq!(extract_text(csv).unwrap(), "a  b  c\n1  2");
    }

    #[test]
    fn invalid_utf8_is_corrupt() {
        let error = extract_text(b"name\n\xff\xfe\n").unwrap_err();
        assert!(matches!(
            error,
            ExtractionError::Corrupt {
                format: DocumentFormat::Csv,
                ..
            }
        ));
    }

    #[test]
    fn empty_file_yields_empty_text() {
        assert_eq!(extract_text(b"").unwrap(), "");
    }
}
