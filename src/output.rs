use std::io::{self, Write};

use serde::Serialize;

use crate::loader::LoadSummary;
use crate::query::{ActivityReport, CatalogEntry, PatientReport};

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_fetch(result: &[LoadSummary]) -> io::Result<()> {
        Self::print_json(&result)
    }

    pub fn print_patient(result: &PatientReport) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_activity(result: &ActivityReport) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_catalog(result: &[CatalogEntry]) -> io::Result<()> {
        Self::print_json(&result)
    }

    pub fn print_cache_cleared() -> io::Result<()> {
        Self::print_json(&serde_json::json!({ "cleared": true }))
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
