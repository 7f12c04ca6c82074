//! Record model and cell normalization.
//!
//! A record is one CSV row keyed by column name. Missing values are mapped to
//! JSON `null` here so that nothing NaN-like ever reaches the store.

use std::collections::HashSet;

use serde_json::{Map, Number, Value};

/// One source row as an ordered field-name-to-value mapping.
pub type Record = Map<String, Value>;

/// Cell contents treated as a missing value.
pub const NULL_MARKERS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub fn is_null_marker(cell: &str) -> bool {
    NULL_MARKERS.contains(&cell)
}

fn parse_bool(cell: &str) -> Option<bool> {
    match cell {
        "True" | "TRUE" | "true" => Some(true),
        "False" | "FALSE" | "false" => Some(false),
        _ => None,
    }
}

fn parse_float(cell: &str) -> Option<f64> {
    cell.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Value type shared by every non-null cell of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Boolean,
    Integer,
    Float,
    Text,
}

impl ColumnKind {
    /// Narrowest kind that represents every non-null cell.
    pub fn infer<'a>(cells: impl IntoIterator<Item = &'a str>) -> Self {
        let mut kind = None;
        for cell in cells.into_iter().filter(|cell| !is_null_marker(cell)) {
            let cell_kind = Self::of_cell(cell);
            let widened = match kind {
                None => cell_kind,
                Some(current) => Self::widen(current, cell_kind),
            };
            if widened == ColumnKind::Text {
                return ColumnKind::Text;
            }
            kind = Some(widened);
        }
        kind.unwrap_or(ColumnKind::Text)
    }

    fn of_cell(cell: &str) -> Self {
        if parse_bool(cell).is_some() {
            ColumnKind::Boolean
        } else if cell.parse::<i64>().is_ok() {
            ColumnKind::Integer
        } else if parse_float(cell).is_some() {
            ColumnKind::Float
        } else {
            ColumnKind::Text
        }
    }

    fn widen(a: Self, b: Self) -> Self {
        match (a, b) {
            (a, b) if a == b => a,
            (ColumnKind::Integer, ColumnKind::Float) | (ColumnKind::Float, ColumnKind::Integer) => {
                ColumnKind::Float
            }
            _ => ColumnKind::Text,
        }
    }

    /// Convert a raw cell. Null markers always become `null`.
    pub fn convert(self, cell: &str) -> Value {
        if is_null_marker(cell) {
            return Value::Null;
        }
        let typed = match self {
            ColumnKind::Boolean => parse_bool(cell).map(Value::Bool),
            ColumnKind::Integer => cell.parse::<i64>().ok().map(Value::from),
            ColumnKind::Float => parse_float(cell).and_then(Number::from_f64).map(Value::Number),
            ColumnKind::Text => None,
        };
        typed.unwrap_or_else(|| Value::String(cell.to_string()))
    }
}

/// Field names for a header row.
///
/// Blank headers become `Unnamed: <index>` and repeats get `.1`, `.2`, ...
/// so every column keeps its own field.
pub fn column_names<'a>(headers: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();

    for (index, header) in headers.into_iter().enumerate() {
        let base = if header.trim().is_empty() {
            format!("Unnamed: {index}")
        } else {
            header.to_string()
        };

        let mut name = base.clone();
        let mut suffix = 1;
        while !seen.insert(name.clone()) {
            name = format!("{base}.{suffix}");
            suffix += 1;
        }
        names.push(name);
    }

    names
}
