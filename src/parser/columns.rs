use std::collections::HashMap;

use crate::parser::types::Field;

/// Maps column names to their index in a CSV record.
pub struct ColumnMap {
    indices: HashMap<String, usize>,
    headers: Vec<String>,
}

impl ColumnMap {
    /// Header fields are trimmed of surrounding whitespace.
    pub fn from_headers(headers: &csv::StringRecord) -> Self {
        let mut indices = HashMap::new();
        let mut header_list = Vec::new();
        for (i, field) in headers.iter().enumerate() {
            let name = field.trim().to_string();
            // First occurrence wins on duplicated headers
            indices.entry(name.clone()).or_insert(i);
            header_list.push(name);
        }
        ColumnMap {
            indices,
            headers: header_list,
        }
    }

    pub fn get<'a>(&self, record: &'a csv::StringRecord, col: &str) -> Option<&'a str> {
        self.indices.get(col).and_then(|&i| record.get(i))
    }

    pub fn has(&self, col: &str) -> bool {
        self.indices.contains_key(col)
    }

    pub fn all_headers(&self) -> &[String] {
        &self.headers
    }

    /// Header names not mapped to a logical field, with their index.
    pub fn passthrough(&self) -> Vec<(usize, String)> {
        self.headers
            .iter()
            .enumerate()
            .filter(|(i, name)| {
                !name.is_empty()
                    && self.indices.get(name.as_str()) == Some(i)
                    && !Field::ALL.iter().any(|f| f.column() == name.as_str())
            })
            .map(|(i, name)| (i, name.clone()))
            .collect()
    }
}

#[derive(Debug)]
pub struct ColumnValidation {
    pub present: Vec<Field>,
    pub missing_optional: Vec<String>,
}

/// Every column is optional; an absent one turns the panels reading it
/// into "no data".
pub fn validate_columns(col_map: &ColumnMap) -> ColumnValidation {
    let missing_optional = Field::ALL
        .iter()
        .filter(|f| !col_map.has(f.column()))
        .map(|f| f.column().to_string())
        .collect();

    let present = Field::ALL
        .iter()
        .copied()
        .filter(|f| col_map.has(f.column()))
        .collect();

    ColumnValidation {
        present,
        missing_optional,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_headers(cols: &[&str]) -> csv::StringRecord {
        csv::StringRecord::from(cols.to_vec())
    }

    #[test]
    fn test_column_map_get() {
        let cm = ColumnMap::from_headers(&make_headers(&["Services", "Tags"]));
        let record = csv::StringRecord::from(vec!["Issue", "bug"]);
        assert_eq!(cm.get(&record, "Services"), Some("Issue"));
        assert_eq!(cm.get(&record, "Tags"), Some("bug"));
        assert_eq!(cm.get(&record, "Company"), None);
    }

    #[test]
    fn test_column_map_trim_whitespace() {
        let cm = ColumnMap::from_headers(&make_headers(&[" Services ", " Created Date"]));
        assert!(cm.has("Services"));
        assert!(cm.has("Created Date"));
    }

    #[test]
    fn test_validate_columns_without_created_date() {
        let cm = ColumnMap::from_headers(&make_headers(&["Services", "Tags"]));
        let val = validate_columns(&cm);
        assert_eq!(val.present, vec![Field::Services, Field::Tags]);
        assert_eq!(
            val.missing_optional,
            vec!["Company", "Created Date", "Finish Date"]
        );
    }

    #[test]
    fn test_validate_columns_reports_missing_optional() {
        let cm = ColumnMap::from_headers(&make_headers(&["Created Date", "Services"]));
        let val = validate_columns(&cm);
        assert_eq!(val.present, vec![Field::Services, Field::CreatedDate]);
        assert!(val.missing_optional.contains(&"Tags".to_string()));
        assert!(val.missing_optional.contains(&"Company".to_string()));
        assert!(val.missing_optional.contains(&"Finish Date".to_string()));
    }

    #[test]
    fn test_passthrough_skips_known_columns() {
        let cm = ColumnMap::from_headers(&make_headers(&[
            "No", "Services", "Subject", "Created Date",
        ]));
        assert_eq!(
            cm.passthrough(),
            vec![(0, "No".to_string()), (2, "Subject".to_string())]
        );
    }
}
