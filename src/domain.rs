use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::SitisError;
use crate::table::{ColumnType, Encoding, ParseOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum DatasetKey {
    PatientMaster,
    CareHistory,
    InvoiceHeaders,
    ActivityCatalog,
}

impl DatasetKey {
    pub const ALL: [DatasetKey; 4] = [
        DatasetKey::PatientMaster,
        DatasetKey::CareHistory,
        DatasetKey::InvoiceHeaders,
        DatasetKey::ActivityCatalog,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            DatasetKey::PatientMaster => "DAT_PER.csv",
            DatasetKey::CareHistory => "HISTORICO_PYP.csv",
            DatasetKey::InvoiceHeaders => "CAB_FAC.csv",
            DatasetKey::ActivityCatalog => "ACTXPROG.csv",
        }
    }

    pub fn parse_options(self) -> ParseOptions {
        match self {
            DatasetKey::PatientMaster => ParseOptions {
                columns: None,
                encoding: Encoding::Utf8Lossy,
                types: vec![
                    ("ID_PACIENTE".to_string(), ColumnType::Integer),
                    ("IDE_PAC".to_string(), ColumnType::Text),
                ],
                normalize: vec![
                    "NM1_PAC".to_string(),
                    "NM2_PAC".to_string(),
                    "AP1_PAC".to_string(),
                    "AP2_PAC".to_string(),
                ],
            },
            DatasetKey::CareHistory => ParseOptions {
                columns: None,
                encoding: Encoding::Utf8Lossy,
                types: vec![
                    ("ID_PACIENTE".to_string(), ColumnType::Integer),
                    ("ID_ACTPYP".to_string(), ColumnType::Integer),
                    ("IDCAB_FAC".to_string(), ColumnType::Integer),
                ],
                normalize: Vec::new(),
            },
            DatasetKey::InvoiceHeaders => ParseOptions {
                columns: Some(vec!["IDCAB_FAC".to_string(), "FAC_FEC".to_string()]),
                encoding: Encoding::Utf8Lossy,
                types: vec![("IDCAB_FAC".to_string(), ColumnType::Integer)],
                normalize: Vec::new(),
            },
            DatasetKey::ActivityCatalog => ParseOptions {
                columns: None,
                encoding: Encoding::Utf8Lossy,
                types: vec![("ID_ACTXPROG".to_string(), ColumnType::Integer)],
                normalize: vec!["DES_ACTXPROG".to_string()],
            },
        }
    }
}

impl fmt::Display for DatasetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DatasetKey::PatientMaster => "patient_master",
            DatasetKey::CareHistory => "care_history",
            DatasetKey::InvoiceHeaders => "invoice_headers",
            DatasetKey::ActivityCatalog => "activity_catalog",
        };
        write!(f, "{name}")
    }
}

impl FromStr for DatasetKey {
    type Err = SitisError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "patient_master" => Ok(DatasetKey::PatientMaster),
            "care_history" => Ok(DatasetKey::CareHistory),
            "invoice_headers" => Ok(DatasetKey::InvoiceHeaders),
            "activity_catalog" => Ok(DatasetKey::ActivityCatalog),
            other => Err(SitisError::InvalidDatasetKey(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn key_roundtrip() {
        for key in DatasetKey::ALL {
            let parsed: DatasetKey = key.to_string().parse().unwrap();
            assert_eq!(parsed, key);
        }
    }

    #[test]
    fn key_invalid() {
        let err = "patients".parse::<DatasetKey>().unwrap_err();
        assert_matches!(err, SitisError::InvalidDatasetKey(_));
    }

    #[test]
    fn file_names_are_distinct() {
        let mut names: Vec<_> = DatasetKey::ALL.iter().map(|k| k.file_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 4);
    }

    #[test]
    fn invoice_headers_restrict_columns() {
        let options = DatasetKey::InvoiceHeaders.parse_options();
        assert_eq!(
            options.columns.as_deref(),
            Some(&["IDCAB_FAC".to_string(), "FAC_FEC".to_string()][..])
        );
    }
}
