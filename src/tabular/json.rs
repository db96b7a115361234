//! JSON reader.
//!
//! Supported inputs:
//! - A JSON array of objects: `[{"FirstName":"Ada"}, {"FirstName":"Grace"}]`
//! - An object whose values are arrays of objects; each key acts as a named sheet, and sheets
//!   are ordered by key:
//!   `{"Students": [...], "Staff": [...]}`
//!
//! The header is the union of object keys in order of first appearance. Scalars are rendered as
//! text; `null` becomes an empty cell; nested values keep their JSON text.

use serde_json::{Map, Value};

use crate::error::{ImportError, ImportResult};
use crate::types::Sheet;

use super::SheetSelection;

/// Read JSON bytes into a [`Sheet`].
pub fn read_json(bytes: &[u8], selection: &SheetSelection) -> ImportResult<Sheet> {
    let root: Value = serde_json::from_slice(bytes)?;

    let (name, items) = match root {
        Value::Array(items) => match selection {
            SheetSelection::First | SheetSelection::Index(0) => (None, items),
            _ => {
                return Err(ImportError::NoReadableSheet {
                    sheet: selection.label(),
                });
            }
        },
        Value::Object(map) => pick_sheet(map, selection)?,
        _ => {
            return Err(ImportError::UnsupportedDocument {
                message: "json must be an array of objects or an object of named arrays"
                    .to_string(),
            });
        }
    };

    sheet_from_objects(name, &items)
}

fn pick_sheet(
    map: Map<String, Value>,
    selection: &SheetSelection,
) -> ImportResult<(Option<String>, Vec<Value>)> {
    let mut sheets = map
        .into_iter()
        .filter_map(|(k, v)| match v {
            Value::Array(items) => Some((k, items)),
            _ => None,
        })
        .collect::<Vec<_>>();

    let position = match selection {
        SheetSelection::First => (!sheets.is_empty()).then_some(0),
        SheetSelection::Named(name) => sheets.iter().position(|(k, _)| k == name),
        SheetSelection::Index(idx) => (*idx < sheets.len()).then_some(*idx),
    };

    match position {
        Some(pos) => {
            let (name, items) = sheets.swap_remove(pos);
            Ok((Some(name), items))
        }
        None => Err(ImportError::NoReadableSheet {
            sheet: selection.label(),
        }),
    }
}

fn sheet_from_objects(name: Option<String>, items: &[Value]) -> ImportResult<Sheet> {
    let mut columns: Vec<String> = Vec::new();
    for (idx0, item) in items.iter().enumerate() {
        let obj = item.as_object().ok_or_else(|| ImportError::UnsupportedDocument {
            message: format!("row {} is not a json object", idx0 + 1),
        })?;
        for key in obj.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }

    if columns.is_empty() {
        return Err(ImportError::EmptyDocument);
    }

    let data = items
        .iter()
        .filter_map(Value::as_object)
        .map(|obj| {
            columns
                .iter()
                .map(|c| obj.get(c).map(value_to_text).unwrap_or_default())
                .collect()
        })
        .collect();

    Ok(Sheet::from_cells(name, columns, data))
}

fn value_to_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::read_json;
    use crate::error::ImportError;
    use crate::tabular::SheetSelection;

    #[test]
    fn array_of_objects_unions_keys() {
        let input = br#"[{"StudentId":"S1","RollNumber":4},{"StudentId":"S2","Email":null}]"#;
        let sheet = read_json(input, &SheetSelection::First).unwrap();

        assert_eq!(sheet.row_count(), 2);
        assert_eq!(sheet.row(0).unwrap().get_by_name("RollNumber"), Some("4"));
        assert_eq!(sheet.row(1).unwrap().get_by_name("Email"), Some(""));
        assert_eq!(sheet.row(1).unwrap().get_by_name("RollNumber"), Some(""));
    }

    #[test]
    fn object_of_arrays_selects_named_sheet() {
        let input = br#"{"Staff":[{"EmployeeId":"E1"}],"Rooms":[{"HostelName":"North"}]}"#;
        let sheet = read_json(input, &SheetSelection::Named("Rooms".to_string())).unwrap();
        assert_eq!(sheet.name.as_deref(), Some("Rooms"));
        assert_eq!(sheet.row(0).unwrap().get_by_name("HostelName"), Some("North"));

        let err = read_json(input, &SheetSelection::Named("Fees".to_string())).unwrap_err();
        assert!(matches!(err, ImportError::NoReadableSheet { .. }));
    }

    #[test]
    fn empty_array_is_an_empty_document() {
        let err = read_json(b"[]", &SheetSelection::First).unwrap_err();
        assert!(matches!(err, ImportError::EmptyDocument));
    }
}
