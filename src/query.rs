use std::collections::{HashMap, HashSet};
use std::cmp::Ordering;
use std::sync::{Arc, OnceLock};

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::Serialize;

use crate::domain::DatasetKey;
use crate::error::SitisError;
use crate::graph::RemoteSource;
use crate::loader::DatasetLoader;
use crate::table::{Table, Value};

pub struct Datasets {
    pub patients: Arc<Table>,
    pub history: Arc<Table>,
    pub invoices: Arc<Table>,
    pub activities: Arc<Table>,
}

impl Datasets {
    pub fn load<R: RemoteSource>(loader: &mut DatasetLoader<R>) -> Result<Self, SitisError> {
        Ok(Self {
            patients: loader.load(DatasetKey::PatientMaster)?,
            history: loader.load(DatasetKey::CareHistory)?,
            invoices: loader.load(DatasetKey::InvoiceHeaders)?,
            activities: loader.load(DatasetKey::ActivityCatalog)?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Patient {
    pub patient_id: i64,
    pub document: String,
    pub document_type: Option<String>,
    pub full_name: String,
    pub sex: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Attendance {
    pub activity_code: i64,
    pub activity_description: String,
    pub date: Option<String>,
    pub invoice_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityAttendance {
    pub document: Option<String>,
    pub document_type: Option<String>,
    pub full_name: Option<String>,
    pub sex: Option<String>,
    pub date: Option<String>,
    pub invoice_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatientReport {
    pub patient: Patient,
    pub attendances: Vec<Attendance>,
    pub total_attendances: usize,
    pub distinct_activities: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityReport {
    pub activity_code: i64,
    pub activity_description: String,
    pub attendances: Vec<ActivityAttendance>,
    pub total_attendances: usize,
    pub unique_patients: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub activity_code: i64,
    pub description: String,
}

pub fn find_patient(datasets: &Datasets, document: &str) -> Option<Patient> {
    let table = &datasets.patients;
    for row in 0..table.len() {
        let matches = table
            .get(row, "IDE_PAC")
            .and_then(Value::as_text)
            .map(|doc| doc.trim() == document.trim())
            .unwrap_or(false);
        if !matches {
            continue;
        }
        let patient_id = table.get(row, "ID_PACIENTE").and_then(Value::as_integer)?;
        return Some(Patient {
            patient_id,
            document: document.trim().to_string(),
            document_type: text_cell(table, row, "COD_TID"),
            full_name: full_name(table, row),
            sex: text_cell(table, row, "SEX_PAC"),
        });
    }
    None
}

pub fn patient_attendances(
    datasets: &Datasets,
    patient_id: i64,
    activity_filter: Option<i64>,
) -> Vec<Attendance> {
    let descriptions = activity_descriptions(&datasets.activities);
    let invoice_dates = invoice_dates(&datasets.invoices);

    let history = &datasets.history;
    let mut rows = Vec::new();
    for row in 0..history.len() {
        if history.get(row, "ID_PACIENTE").and_then(Value::as_integer) != Some(patient_id) {
            continue;
        }
        let Some(code) = history.get(row, "ID_ACTPYP").and_then(Value::as_integer) else {
            continue;
        };
        // Only activities mapped in the catalog count as attendances.
        let Some(description) = descriptions.get(&code) else {
            continue;
        };
        if activity_filter.is_some_and(|wanted| wanted != code) {
            continue;
        }
        let invoice_id = history.get(row, "IDCAB_FAC").and_then(Value::as_integer);
        let date = attendance_date(&invoice_dates, invoice_id, history, row);
        rows.push(Attendance {
            activity_code: code,
            activity_description: description.clone(),
            date,
            invoice_id,
        });
    }

    rows.sort_by(|a, b| compare_dates_desc(a.date.as_deref(), b.date.as_deref()));
    rows
}

pub fn patients_for_activity(
    datasets: &Datasets,
    activity_code: i64,
) -> Result<ActivityReport, SitisError> {
    let descriptions = activity_descriptions(&datasets.activities);
    let description = descriptions
        .get(&activity_code)
        .cloned()
        .ok_or(SitisError::UnknownActivity(activity_code))?;

    let invoice_dates = invoice_dates(&datasets.invoices);
    let patients_by_id = patients_by_id(&datasets.patients);

    let history = &datasets.history;
    let mut rows = Vec::new();
    let mut seen = HashSet::new();
    for row in 0..history.len() {
        if history.get(row, "ID_ACTPYP").and_then(Value::as_integer) != Some(activity_code) {
            continue;
        }
        let patient_id = history.get(row, "ID_PACIENTE").and_then(Value::as_integer);
        let patient = patient_id.and_then(|id| patients_by_id.get(&id));
        if let Some(id) = patient_id {
            seen.insert(id);
        }
        let invoice_id = history.get(row, "IDCAB_FAC").and_then(Value::as_integer);
        let date = attendance_date(&invoice_dates, invoice_id, history, row);
        rows.push(ActivityAttendance {
            document: patient.map(|p| p.document.clone()),
            document_type: patient.and_then(|p| p.document_type.clone()),
            full_name: patient.map(|p| p.full_name.clone()),
            sex: patient.and_then(|p| p.sex.clone()),
            date,
            invoice_id,
        });
    }

    rows.sort_by(|a, b| compare_dates_desc(a.date.as_deref(), b.date.as_deref()));
    let total = rows.len();
    Ok(ActivityReport {
        activity_code,
        activity_description: description,
        attendances: rows,
        total_attendances: total,
        unique_patients: seen.len(),
    })
}

pub fn activity_catalog(datasets: &Datasets) -> Vec<CatalogEntry> {
    let mut entries: Vec<CatalogEntry> = activity_descriptions(&datasets.activities)
        .into_iter()
        .map(|(activity_code, description)| CatalogEntry {
            activity_code,
            description,
        })
        .collect();
    entries.sort_by_key(|entry| entry.activity_code);
    entries
}

fn activity_descriptions(activities: &Table) -> HashMap<i64, String> {
    let mut map = HashMap::new();
    for row in 0..activities.len() {
        let code = activities.get(row, "ID_ACTXPROG").and_then(Value::as_integer);
        let description = activities
            .get(row, "DES_ACTXPROG")
            .and_then(Value::as_text)
            .unwrap_or_default()
            .to_string();
        if let Some(code) = code {
            map.insert(code, description);
        }
    }
    map
}

fn invoice_dates(invoices: &Table) -> HashMap<i64, String> {
    let mut map = HashMap::new();
    for row in 0..invoices.len() {
        let id = invoices.get(row, "IDCAB_FAC").and_then(Value::as_integer);
        let date = invoices.get(row, "FAC_FEC").and_then(Value::as_text);
        if let (Some(id), Some(date)) = (id, date) {
            map.insert(id, date.to_string());
        }
    }
    map
}

fn patients_by_id(patients: &Table) -> HashMap<i64, Patient> {
    let mut map = HashMap::new();
    for row in 0..patients.len() {
        let Some(id) = patients.get(row, "ID_PACIENTE").and_then(Value::as_integer) else {
            continue;
        };
        map.insert(
            id,
            Patient {
                patient_id: id,
                document: text_cell(patients, row, "IDE_PAC").unwrap_or_default(),
                document_type: text_cell(patients, row, "COD_TID"),
                full_name: full_name(patients, row),
                sex: text_cell(patients, row, "SEX_PAC"),
            },
        );
    }
    map
}

fn attendance_date(
    invoice_dates: &HashMap<i64, String>,
    invoice_id: Option<i64>,
    history: &Table,
    row: usize,
) -> Option<String> {
    invoice_id
        .and_then(|id| invoice_dates.get(&id).cloned())
        .or_else(|| text_cell(history, row, "FECHA"))
}

fn text_cell(table: &Table, row: usize, column: &str) -> Option<String> {
    table
        .get(row, column)
        .and_then(Value::as_text)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn full_name(table: &Table, row: usize) -> String {
    let parts = ["NM1_PAC", "NM2_PAC", "AP1_PAC", "AP2_PAC"]
        .iter()
        .filter_map(|col| text_cell(table, row, col))
        .collect::<Vec<_>>()
        .join(" ");
    collapse_whitespace(&parts)
}

fn collapse_whitespace(text: &str) -> String {
    static SPACES: OnceLock<Regex> = OnceLock::new();
    let spaces = SPACES.get_or_init(|| Regex::new(r"\s+").expect("valid regex"));
    spaces.replace_all(text.trim(), " ").into_owned()
}

fn compare_dates_desc(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a.and_then(parse_when), b.and_then(parse_when)) {
        (Some(da), Some(db)) => db.cmp(&da),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.unwrap_or("").cmp(a.unwrap_or("")),
    }
}

fn parse_when(text: &str) -> Option<NaiveDateTime> {
    let trimmed = text.trim();
    for format in ["%Y-%m-%d %H:%M:%S", "%d/%m/%Y %H:%M:%S"] {
        if let Ok(when) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(when);
        }
    }
    for format in ["%Y-%m-%d", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapse_whitespace_examples() {
        assert_eq!(collapse_whitespace("  MARIA  JOSE   PEREZ "), "MARIA JOSE PEREZ");
        assert_eq!(collapse_whitespace(""), "");
    }

    #[test]
    fn date_ordering() {
        assert_eq!(
            compare_dates_desc(Some("2024-05-01"), Some("2023-05-01")),
            Ordering::Less
        );
        assert_eq!(compare_dates_desc(Some("2023-05-01"), None), Ordering::Less);
        assert_eq!(compare_dates_desc(None, Some("1999-01-01")), Ordering::Greater);
    }

    #[test]
    fn parse_when_formats() {
        assert!(parse_when("2024-03-09").is_some());
        assert!(parse_when("09/03/2024").is_some());
        assert!(parse_when("2024-03-09 13:45:00").is_some());
        assert!(parse_when("not a date").is_none());
    }
}
