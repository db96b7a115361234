//! CSV reader.

use ::csv::ByteRecord;

use crate::error::{ImportError, ImportResult};
use crate::types::Sheet;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

const INVALID_UTF8_ROW: &str = "row is not valid UTF-8 text";

/// Read CSV bytes into a [`Sheet`].
///
/// Rules:
///
/// - The first non-blank record is the header row.
/// - Records may be shorter or longer than the header (`flexible`); the pipeline decides what a
///   short record means for the fields it needs.
/// - Cells are kept as raw text; a leading UTF-8 BOM is dropped.
/// - A header that is not valid UTF-8 fails the document. A data record that is not valid UTF-8
///   is kept with its cells decoded lossily and a defect, so only that row is rejected.
pub fn read_csv(bytes: &[u8]) -> ImportResult<Sheet> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut rdr = ::csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    read_csv_from_reader(&mut rdr)
}

/// Read CSV data from an existing CSV reader (configured without headers).
pub fn read_csv_from_reader<R: std::io::Read>(rdr: &mut ::csv::Reader<R>) -> ImportResult<Sheet> {
    let mut header: Option<Vec<String>> = None;
    let mut data: Vec<(Vec<String>, Option<String>)> = Vec::new();

    for result in rdr.byte_records() {
        let record = result?;
        match header {
            None => {
                let cells = decode(&record).map_err(|e| ImportError::UnsupportedDocument {
                    message: format!("header row is not valid UTF-8 ({e})"),
                })?;
                if cells.iter().any(|c| !c.trim().is_empty()) {
                    header = Some(cells.iter().map(|c| c.trim().to_owned()).collect());
                }
            }
            Some(_) => data.push(match decode(&record) {
                Ok(cells) => (cells, None),
                Err(_) => (decode_lossy(&record), Some(INVALID_UTF8_ROW.to_string())),
            }),
        }
    }

    let header = header.ok_or(ImportError::EmptyDocument)?;
    Ok(Sheet::from_records(None, header, data))
}

fn decode(record: &ByteRecord) -> Result<Vec<String>, std::str::Utf8Error> {
    record
        .iter()
        .map(|cell| std::str::from_utf8(cell).map(str::to_owned))
        .collect()
}

fn decode_lossy(record: &ByteRecord) -> Vec<String> {
    record
        .iter()
        .map(|cell| String::from_utf8_lossy(cell).into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::read_csv;
    use crate::error::ImportError;

    #[test]
    fn header_is_first_non_blank_record() {
        let sheet = read_csv(b"\n,,\nFirstName,Email\nAda,ada@example.org\n").unwrap();
        assert_eq!(sheet.columns().collect::<Vec<_>>(), vec!["FirstName", "Email"]);
        assert_eq!(sheet.row_count(), 1);
        assert_eq!(sheet.row(0).unwrap().index, 1);
    }

    #[test]
    fn bom_is_stripped_from_first_header() {
        let sheet = read_csv(b"\xEF\xBB\xBFStudentId,Class\nS1,Grade 1\n").unwrap();
        assert_eq!(sheet.columns().next(), Some("StudentId"));
    }

    #[test]
    fn short_records_are_kept() {
        let sheet = read_csv(b"a,b,c\n1,2\n").unwrap();
        assert_eq!(sheet.row(0).unwrap().width(), 2);
    }

    #[test]
    fn empty_input_is_an_empty_document() {
        assert!(matches!(read_csv(b"").unwrap_err(), ImportError::EmptyDocument));
    }

    #[test]
    fn invalid_utf8_row_is_kept_with_a_defect() {
        let bytes = b"Name,Email\nAda,ada@x.org\nBa\xFF\xFEd,b@x.org\nCy,cy@x.org\n";
        let sheet = read_csv(bytes).unwrap();
        assert_eq!(sheet.row_count(), 3);
        assert_eq!(sheet.row(0).unwrap().defect(), None);

        let bad = sheet.row(1).unwrap();
        assert_eq!(bad.index, 2);
        assert_eq!(bad.defect(), Some("row is not valid UTF-8 text"));
        assert_eq!(bad.get_by_name("Email"), Some("b@x.org"));
    }

    #[test]
    fn invalid_utf8_header_fails_the_document() {
        let err = read_csv(b"Na\xFFme,Email\nAda,ada@x.org\n").unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedDocument { .. }));
    }
}
