//! In-memory columnar table
//!
//! A `Frame` is the interchange format between parquet files and the typed
//! feature tables. Columns keep their order; numeric cells are `Option<f64>`
//! with NaN normalised to `None`.

use crate::error::{PipelineError, Result};
use chrono::{DateTime, Utc};

/// Typed column storage
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
    Timestamp(Vec<Option<DateTime<Utc>>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) => v.len(),
            ColumnData::Timestamp(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keep only the rows at `indices`, in that order
    fn take(&self, indices: &[usize]) -> ColumnData {
        match self {
            ColumnData::Numeric(v) => ColumnData::Numeric(indices.iter().map(|&i| v[i]).collect()),
            ColumnData::Text(v) => {
                ColumnData::Text(indices.iter().map(|&i| v[i].clone()).collect())
            }
            ColumnData::Timestamp(v) => {
                ColumnData::Timestamp(indices.iter().map(|&i| v[i]).collect())
            }
        }
    }
}

/// A named column
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

/// Result of coercing a column to numbers
#[derive(Debug, Clone, PartialEq)]
pub struct Coerced {
    pub values: Vec<Option<f64>>,
    /// Non-empty cells that could not be read as a number
    pub failures: usize,
}

/// Ordered collection of equally long columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    columns: Vec<Column>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows (zero for a frame without columns)
    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|c| c.data.len()).unwrap_or(0)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Append a column; names must be unique and lengths must agree
    pub fn push_column(&mut self, name: impl Into<String>, data: ColumnData) -> Result<()> {
        let name = name.into();
        if self.has_column(&name) {
            return Err(PipelineError::Schema(format!("duplicate column `{}`", name)));
        }
        if !self.columns.is_empty() && data.len() != self.num_rows() {
            return Err(PipelineError::Schema(format!(
                "column `{}` has {} rows, expected {}",
                name,
                data.len(),
                self.num_rows()
            )));
        }
        self.columns.push(Column { name, data });
        Ok(())
    }

    /// Builder-style `push_column`
    pub fn with_column(mut self, name: impl Into<String>, data: ColumnData) -> Result<Self> {
        self.push_column(name, data)?;
        Ok(self)
    }

    /// Rows at `indices`, in that order
    pub fn take_rows(&self, indices: &[usize]) -> Frame {
        Frame {
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    data: c.data.take(indices),
                })
                .collect(),
        }
    }

    /// Numeric view of a column, parsing text cells where needed
    pub fn numeric(&self, name: &str) -> Option<Coerced> {
        self.column(name).map(|c| coerce_numeric(&c.data))
    }

    /// Text view of a column; numbers are rendered without a trailing `.0`
    pub fn text(&self, name: &str) -> Option<Vec<Option<String>>> {
        self.column(name).map(|c| match &c.data {
            ColumnData::Text(v) => v.clone(),
            ColumnData::Numeric(v) => v.iter().map(|x| x.map(format_number)).collect(),
            ColumnData::Timestamp(v) => v.iter().map(|t| t.map(|t| t.to_rfc3339())).collect(),
        })
    }

    /// Timestamp view of a column; text cells are parsed as RFC 3339
    pub fn timestamps(&self, name: &str) -> Option<Vec<Option<DateTime<Utc>>>> {
        self.column(name).map(|c| match &c.data {
            ColumnData::Timestamp(v) => v.clone(),
            ColumnData::Text(v) => v
                .iter()
                .map(|s| {
                    s.as_deref()
                        .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
                        .map(|t| t.with_timezone(&Utc))
                })
                .collect(),
            ColumnData::Numeric(v) => vec![None; v.len()],
        })
    }

    /// Numeric column or a descriptive missing-column error
    pub fn require_numeric(
        &self,
        name: &str,
        table: &'static str,
        producer: &'static str,
    ) -> Result<Coerced> {
        self.numeric(name).ok_or_else(|| PipelineError::MissingColumn {
            table,
            column: name.to_string(),
            producer,
        })
    }

    /// Text column or a descriptive missing-column error
    pub fn require_text(
        &self,
        name: &str,
        table: &'static str,
        producer: &'static str,
    ) -> Result<Vec<Option<String>>> {
        self.text(name).ok_or_else(|| PipelineError::MissingColumn {
            table,
            column: name.to_string(),
            producer,
        })
    }
}

/// Coerce any column to numbers; unparseable text is counted and becomes null
pub fn coerce_numeric(data: &ColumnData) -> Coerced {
    match data {
        ColumnData::Numeric(v) => Coerced {
            values: v.iter().map(|x| x.filter(|x| !x.is_nan())).collect(),
            failures: 0,
        },
        ColumnData::Text(v) => {
            let mut failures = 0;
            let values = v
                .iter()
                .map(|cell| {
                    let s = cell.as_deref()?.trim();
                    if s.is_empty() || s.eq_ignore_ascii_case("na") || s.eq_ignore_ascii_case("nan")
                    {
                        return None;
                    }
                    match s.parse::<f64>() {
                        Ok(x) if !x.is_nan() => Some(x),
                        Ok(_) => None,
                        Err(_) => {
                            failures += 1;
                            None
                        }
                    }
                })
                .collect();
            Coerced { values, failures }
        }
        ColumnData::Timestamp(v) => Coerced {
            values: vec![None; v.len()],
            failures: v.iter().filter(|t| t.is_some()).count(),
        },
    }
}

fn format_number(x: f64) -> String {
    if x.fract() == 0.0 && x.abs() < 1e15 {
        format!("{}", x as i64)
    } else {
        format!("{}", x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_column_length_mismatch() {
        let mut frame = Frame::new();
        frame
            .push_column("a", ColumnData::Numeric(vec![Some(1.0), None]))
            .unwrap();
        let err = frame
            .push_column("b", ColumnData::Numeric(vec![Some(1.0)]))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Schema(_)));
    }

    #[test]
    fn test_push_column_duplicate() {
        let mut frame = Frame::new();
        frame.push_column("a", ColumnData::Numeric(vec![])).unwrap();
        assert!(frame.push_column("a", ColumnData::Numeric(vec![])).is_err());
    }

    #[test]
    fn test_coerce_text_counts_failures() {
        let data = ColumnData::Text(vec![
            Some("1.5".to_string()),
            Some(" -2 ".to_string()),
            Some("abc".to_string()),
            Some("".to_string()),
            Some("NA".to_string()),
            None,
        ]);
        let coerced = coerce_numeric(&data);
        assert_eq!(
            coerced.values,
            vec![Some(1.5), Some(-2.0), None, None, None, None]
        );
        assert_eq!(coerced.failures, 1);
    }

    #[test]
    fn test_coerce_numeric_nan_is_null() {
        let coerced = coerce_numeric(&ColumnData::Numeric(vec![Some(f64::NAN), Some(f64::INFINITY)]));
        assert_eq!(coerced.values[0], None);
        assert_eq!(coerced.values[1], Some(f64::INFINITY));
        assert_eq!(coerced.failures, 0);
    }

    #[test]
    fn test_text_view_of_numbers() {
        let frame = Frame::new()
            .with_column("season", ColumnData::Numeric(vec![Some(2025.0), Some(1.5), None]))
            .unwrap();
        assert_eq!(
            frame.text("season").unwrap(),
            vec![Some("2025".to_string()), Some("1.5".to_string()), None]
        );
    }

    #[test]
    fn test_take_rows() {
        let frame = Frame::new()
            .with_column("x", ColumnData::Numeric(vec![Some(1.0), Some(2.0), Some(3.0)]))
            .unwrap()
            .with_column(
                "t",
                ColumnData::Text(vec![Some("a".into()), Some("b".into()), Some("c".into())]),
            )
            .unwrap();
        let taken = frame.take_rows(&[2, 0]);
        assert_eq!(taken.num_rows(), 2);
        assert_eq!(taken.numeric("x").unwrap().values, vec![Some(3.0), Some(1.0)]);
    }

    #[test]
    fn test_require_missing_column() {
        let frame = Frame::new();
        let err = frame.require_numeric("week", "schedule", "fetch").unwrap_err();
        assert!(err.to_string().contains("week"));
    }
}
