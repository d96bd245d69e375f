use std::io::Read;

use camino::Utf8Path;
use serde::Serialize;

use crate::error::SitisError;
use crate::normalize::normalize_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Utf8Lossy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
}

#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub columns: Option<Vec<String>>,
    pub encoding: Encoding,
    pub types: Vec<(String, ColumnType)>,
    pub normalize: Vec<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            columns: None,
            encoding: Encoding::Utf8Lossy,
            types: Vec::new(),
            normalize: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Text(String),
}

impl Value {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

#[derive(Debug, Clone)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|col| col == name)
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|cells| cells.get(idx))
    }
}

pub fn parse_csv(bytes: &[u8], file: &str, options: &ParseOptions) -> Result<Table, SitisError> {
    parse_reader(bytes, file, options)
}

pub fn parse_csv_path(
    path: &Utf8Path,
    file: &str,
    options: &ParseOptions,
) -> Result<Table, SitisError> {
    let reader = std::fs::File::open(path.as_std_path()).map_err(|err| SitisError::CsvParse {
        file: file.to_string(),
        message: format!("open {path}: {err}"),
    })?;
    parse_reader(reader, file, options)
}

fn parse_reader<R: Read>(
    reader: R,
    file: &str,
    options: &ParseOptions,
) -> Result<Table, SitisError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader
        .byte_headers()
        .map_err(|err| SitisError::CsvParse {
            file: file.to_string(),
            message: err.to_string(),
        })?
        .clone();
    let header_names: Vec<String> = headers
        .iter()
        .map(|raw| decode_field(raw, options.encoding, file))
        .collect::<Result<_, _>>()?;

    // Which source columns survive, in output order.
    let selected: Vec<usize> = match &options.columns {
        Some(subset) => subset
            .iter()
            .map(|name| {
                header_names
                    .iter()
                    .position(|col| col == name)
                    .ok_or_else(|| SitisError::MissingColumn {
                        file: file.to_string(),
                        column: name.clone(),
                    })
            })
            .collect::<Result<_, _>>()?,
        None => (0..header_names.len()).collect(),
    };
    let columns: Vec<String> = selected.iter().map(|&i| header_names[i].clone()).collect();

    let require = |name: &String| -> Result<(), SitisError> {
        if columns.iter().any(|col| col == name) {
            Ok(())
        } else {
            Err(SitisError::MissingColumn {
                file: file.to_string(),
                column: name.clone(),
            })
        }
    };
    for (name, _) in &options.types {
        require(name)?;
    }
    for name in &options.normalize {
        require(name)?;
    }

    let types: Vec<Option<ColumnType>> = columns
        .iter()
        .map(|col| {
            options
                .types
                .iter()
                .find(|(name, _)| name == col)
                .map(|(_, ty)| *ty)
        })
        .collect();
    let normalized: Vec<bool> = columns
        .iter()
        .map(|col| options.normalize.iter().any(|name| name == col))
        .collect();

    let mut rows = Vec::new();
    for record in csv_reader.byte_records() {
        let record = record.map_err(|err| SitisError::CsvParse {
            file: file.to_string(),
            message: err.to_string(),
        })?;
        let mut cells = Vec::with_capacity(selected.len());
        for (out_idx, &src_idx) in selected.iter().enumerate() {
            let raw = record.get(src_idx).unwrap_or(b"");
            let mut text = decode_field(raw, options.encoding, file)?;
            if normalized[out_idx] {
                text = normalize_text(&text);
            }
            cells.push(coerce(text, types[out_idx]));
        }
        rows.push(cells);
    }

    Ok(Table { columns, rows })
}

fn decode_field(raw: &[u8], encoding: Encoding, file: &str) -> Result<String, SitisError> {
    match encoding {
        Encoding::Utf8 => std::str::from_utf8(raw)
            .map(|s| s.to_string())
            .map_err(|err| SitisError::CsvParse {
                file: file.to_string(),
                message: format!("invalid utf-8: {err}"),
            }),
        Encoding::Utf8Lossy => Ok(String::from_utf8_lossy(raw).into_owned()),
    }
}

fn coerce(text: String, ty: Option<ColumnType>) -> Value {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    match ty {
        None | Some(ColumnType::Text) => Value::Text(text),
        Some(ColumnType::Integer) => parse_integer(trimmed)
            .map(Value::Integer)
            .unwrap_or(Value::Null),
    }
}

// Integer columns arrive both as "123" and, after a spreadsheet round trip,
// as "123.0"; accept either.
fn parse_integer(text: &str) -> Option<i64> {
    if let Ok(value) = text.parse::<i64>() {
        return Some(value);
    }
    let float = text.parse::<f64>().ok()?;
    if float.fract() == 0.0 && float >= i64::MIN as f64 && float <= i64::MAX as f64 {
        Some(float as i64)
    } else {
        None
    }
}
