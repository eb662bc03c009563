//! XLSX reading on top of `zip` and `quick-xml`.
//!
//! Only the first worksheet (workbook order) is read. Cell values are resolved against the
//! shared string table; formulas contribute their cached value.

use super::{DocumentFormat, ExtractionError, render_rows};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::io::{Cursor, Read, Seek};
use zip::ZipArchive;
use zip::result::ZipError;

const WORKBOOK: &str = "xl/workbook.xml";
const WORKBOOK_RELS: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS: &str = "xl/sharedStrings.xml";
const FALLBACK_SHEET: &str = "xl/worksheets/sheet1.xml";
/// Column count of an XLSX sheet (`A` through `XFD`).
const MAX_COLUMNS: usize = 16_384;

fn corrupt(reason: impl std::fmt::Display) -> ExtractionError {
    ExtractionError::corrupt(DocumentFormat::Xlsx, reason)
}

/// Render the first worksheet one row per line.
pub(super) fn extract_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(corrupt)?;

    let shared = match read_entry(&mut archive, SHARED_STRINGS)? {
        Some(xml) => parse_shared_strings(&xml)?,
        None => Vec::new(),
    };
    let sheet_path = first_sheet_path(&mut archive)?;
    let sheet = read_entry(&mut archive, &sheet_path)?
        .ok_or_else(|| corrupt(format!("worksheet '{sheet_path}' is missing")))?;

    let rows = parse_sheet(&sheet, &shared)?;
    Ok(render_rows(rows))
}

fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<String>, ExtractionError> {
    match archive.by_name(name) {
        Ok(mut entry) => {
            let mut contents = String::new();
            entry.read_to_string(&mut contents).map_err(corrupt)?;
            Ok(Some(contents))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(error) => Err(corrupt(error)),
    }
}

/// Resolve the first `<sheet>` of the workbook through its relationship target.
fn first_sheet_path<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<String, ExtractionError> {
    let Some(workbook) = read_entry(archive, WORKBOOK)? else {
        return Ok(FALLBACK_SHEET.to_string());
    };
    let Some(relationship_id) = find_attribute(&workbook, b"sheet", b"r:id")? else {
        return Ok(FALLBACK_SHEET.to_string());
    };
    let Some(rels) = read_entry(archive, WORKBOOK_RELS)? else {
        return Ok(FALLBACK_SHEET.to_string());
    };

    let mut reader = Reader::from_str(&rels);
    loop {
        match reader.read_event().map_err(corrupt)? {
            Event::Start(element) | Event::Empty(element)
                if element.local_name().as_ref() == b"Relationship" =>
            {
                if attribute(&element, b"Id").as_deref() == Some(relationship_id.as_str()) {
                    let target = attribute(&element, b"Target")
                        .ok_or_else(|| corrupt("relationship without target"))?;
                    return Ok(normalize_target(&target));
                }
            }
            Event::Eof => return Ok(FALLBACK_SHEET.to_string()),
            _ => {}
        }
    }
}

fn normalize_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{target}"),
    }
}

fn find_attribute(
    xml: &str,
    element_name: &[u8],
    attribute_name: &[u8],
) -> Result<Option<String>, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event().map_err(corrupt)? {
            Event::Start(element) | Event::Empty(element)
                if element.local_name().as_ref() == element_name =>
            {
                return Ok(attribute(&element, attribute_name));
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

fn attribute(element: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == name)
        .and_then(|attr| attr.unescape_value().ok().map(|value| value.into_owned()))
}

/// Collect every `<si>` entry, concatenating rich-text runs and skipping phonetic hints.
fn parse_shared_strings(xml: &str) -> Result<Vec<String>, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut in_phonetic = false;

    loop {
        match reader.read_event().map_err(corrupt)? {
            Event::Start(element) => match element.local_name().as_ref() {
                b"si" => current.clear(),
                b"t" => in_text = true,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::End(element) => match element.local_name().as_ref() {
                b"si" => strings.push(std::mem::take(&mut current)),
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Event::Empty(element) if element.local_name().as_ref() == b"si" => {
                strings.push(String::new());
            }
            Event::Text(text) if in_text && !in_phonetic => {
                current.push_str(&text.unescape().map_err(corrupt)?);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(strings)
}

#[derive(Default)]
struct PendingCell {
    column: usize,
    kind: Option<String>,
    value: String,
}

/// Parse `<sheetData>` into dense rows, placing cells by their `r` reference.
fn parse_sheet(xml: &str, shared: &[String]) -> Result<Vec<Vec<String>>, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell: Option<PendingCell> = None;
    let mut capture = false;

    loop {
        match reader.read_event().map_err(corrupt)? {
            Event::Start(element) => match element.local_name().as_ref() {
                b"row" => row.clear(),
                b"c" => cell = Some(start_cell(&element, row.len())?),
                b"v" | b"t" => capture = cell.is_some(),
                _ => {}
            },
            Event::Empty(element) if element.local_name().as_ref() == b"row" => {
                rows.push(Vec::new());
            }
            Event::Text(text) if capture => {
                if let Some(pending) = cell.as_mut() {
                    pending.value.push_str(&text.unescape().map_err(corrupt)?);
                }
            }
            Event::End(element) => match element.local_name().as_ref() {
                b"v" | b"t" => capture = false,
                b"c" => {
                    if let Some(pending) = cell.take() {
                        place_cell(&mut row, pending, shared)?;
                    }
                }
                b"row" => rows.push(std::mem::take(&mut row)),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rows)
}

fn start_cell(
    element: &BytesStart<'_>,
    next_column: usize,
) -> Result<PendingCell, ExtractionError> {
    let column = match attribute(element, b"r") {
        Some(reference) => column_index(&reference)?.unwrap_or(next_column),
        None => next_column,
    };
    Ok(PendingCell {
        column,
        kind: attribute(element, b"t"),
        value: String::new(),
    })
}

fn place_cell(
    row: &mut Vec<String>,
    cell: PendingCell,
    shared: &[String],
) -> Result<(), ExtractionError> {
    let value = match cell.kind.as_deref() {
        Some("s") => {
            let index: usize = cell
                .value
                .trim()
                .parse()
                .map_err(|_| corrupt(format!("invalid shared string index '{}'", cell.value)))?;
            shared
                .get(index)
                .cloned()
                .ok_or_else(|| corrupt(format!("shared string {index} out of range")))?
        }
        Some("b") => match cell.value.trim() {
            "1" => "TRUE".to_string(),
            _ => "FALSE".to_string(),
        },
        _ => cell.value,
    };
    if cell.column >= MAX_COLUMNS {
        return Err(corrupt(format!("row has more than {MAX_COLUMNS} columns")));
    }
    if row.len() <= cell.column {
        row.resize(cell.column + 1, String::new());
    }
    row[cell.column] = value;
    Ok(())
}

/// Zero-based column of an A1-style reference (`"C7"` -> 2).
///
/// `None` when the reference carries no column letters; references past `XFD` are corrupt.
fn column_index(reference: &str) -> Result<Option<usize>, ExtractionError> {
    let mut number = 0usize;
    let mut seen_letter = false;
    for byte in reference.bytes().take_while(u8::is_ascii_alphabetic) {
        seen_letter = true;
        number = number
            .checked_mul(26)
            .and_then(|acc| acc.checked_add(usize::from(byte.to_ascii_uppercase() - b'A' + 1)))
            .filter(|&column| column <= MAX_COLUMNS)
            .ok_or_else(|| corrupt(format!("cell reference '{reference}' is past column XFD")))?;
    }
    Ok(seen_letter.then(|| number - 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn build_xlsx(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for (name, contents) in entries {
            writer.start_file(*name, options).expect("start entry");
            writer.write_all(contents.as_bytes()).expect("write entry");
        }
        writer.finish().expect("finish archive").into_inner()
    }

    const WORKBOOK_XML: &str = r#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Ventas" sheetId="1" r:id="rId2"/><sheet name="Otra" sheetId="2" r:id="rId1"/></sheets></workbook>"#;
    const RELS_XML: &str = r#"<Relationships><Relationship Id="rId1" Target="worksheets/sheet2.xml"/><Relationship Id="rId2" Target="/xl/worksheets/sales.xml"/></Relationships>"#;
    const SHARED_XML: &str = r#"<sst><si><t>Product</t></si><si><r><t>Uni</t></r><r><t>ts</t></r></si><si><t>Café &amp; té</t><rPh><t>ignored</t></rPh></si></sst>"#;
    const SHEET_XML: &str = r#"<worksheet><sheetData>
        <row r="1"><c r="A1" t="s"><v>0</v></c><c r="C1" t="s"><v>1</v></c></row>
        <row r="2"><c r="A2" t="s"><v>2</v></c><c r="B2" t="b"><v>1</v></c><c r="C2"><f>SUM(1,2)</f><v>3</v></c></row>
        <row r="3"><c r="B3" t="inlineStr"><is><t>inline</t></is></c></row>
    </sheetData></worksheet>"#;

    #[test]
    fn renders_first_sheet_in_workbook_order() {
        let bytes = build_xlsx(&[
            (WORKBOOK, WORKBOOK_XML),
            (WORKBOOK_RELS, RELS_XML),
            (SHARED_STRINGS, SHARED_XML),
            ("xl/worksheets/sales.xml", SHEET_XML),
            (
                "xl/worksheets/sheet2.xml",
                r#"<worksheet><sheetData><row><c><v>wrong</v></c></row></sheetData></worksheet>"#,
            ),
        ]);

        let text = extract_text(&bytes).expect("xlsx text");
        assert_eq!(text, "Product    Units\nCafé & té  TRUE  3\n  inline");
    }

    #[test]
    fn falls_back_to_sheet_one_without_workbook() {
        let bytes = build_xlsx(&[(
            FALLBACK_SHEET,
            r#"<worksheet><sheetData><row><c r="A1"><v>42</v></c><c r="B1" t="str"><v>ok</v></c></row></sheetData></worksheet>"#,
        )]);
        assert_eq!(extract_text(&bytes).unwrap(), "42  ok");
    }

    #[test]
    fn non_zip_bytes_are_corrupt() {
        let error = extract_text(b"plain text, not a workbook").unwrap_err();
        assert!(matches!(
            error,
            ExtractionError::Corrupt {
                format: DocumentFormat::Xlsx,
                ..
            }
        ));
    }

    #[test]
    fn out_of_range_shared_string_is_corrupt() {
        let bytes = build_xlsx(&[(
            FALLBACK_SHEET,
            r#"<worksheet><sheetData><row><c r="A1" t="s"><v>9</v></c></row></sheetData></worksheet>"#,
        )]);
        assert!(extract_text(&bytes).is_err());
    }

    #[test]
    fn column_index_handles_multi_letter_references() {
        assert_eq!(column_index("A1").expect("column"), Some(0));
        assert_eq!(column_index("Z9").expect("column"), Some(25));
        assert_eq!(column_index("AA10").expect("column"), Some(26));
        assert_eq!(column_index("xfd3").expect("column"), Some(MAX_COLUMNS - 1));
        assert_eq!(column_index("7").expect("no letters"), None);
    }

    #[test]
    fn column_index_rejects_references_past_last_column() {
        assert!(matches!(
            column_index("XFE1"),
            Err(ExtractionError::Corrupt { .. })
        ));
        assert!(matches!(
            column_index("ZZZZZZZZZZZZZZZ1"),
            Err(ExtractionError::Corrupt { .. })
        ));
    }

    #[test]
    fn oversized_cell_reference_is_corrupt() {
        let bytes = build_xlsx(&[(
            FALLBACK_SHEET,
            r#"<worksheet><sheetData><row><c r="ZZZZZZZ1" t="inlineStr"><is><t>x</t></is></c></row></sheetData></worksheet>"#,
        )]);
        assert!(matches!(
            extract_text(&bytes),
            Err(ExtractionError::Corrupt {
                format: DocumentFormat::Xlsx,
                ..
            })
        ));
    }
}
