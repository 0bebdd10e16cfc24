//! Roster rows and typed employee records.
//!
//! A roster arrives as a table with the source column names listed in
//! [`columns`]. [`Roster::from_frame`] lifts it into [`RawEmployeeRow`]s; the
//! preprocessor then turns those into [`EmployeeRecord`]s.

use crate::{Result, WorkforceError, period::PERIOD_FORMAT};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Source column names of the roster table.
pub mod columns {
    /// Employee identifier
    pub const EMPLOYEE_ID: &str = "ID_EMPLEADO";
    /// Hire date
    pub const HIRE_DATE: &str = "FECHA_INGRESO";
    /// Termination date (nullable)
    pub const TERMINATION_DATE: &str = "FECHA_SALIDA";
    /// Department
    pub const DEPARTMENT: &str = "AREA";
    /// Job title
    pub const JOB_TITLE: &str = "CARGO";
    /// Termination reason (nullable)
    pub const TERMINATION_REASON: &str = "MOTIVO_SALIDA";
    /// Contract type
    pub const CONTRACT_TYPE: &str = "TIPO_CONTRATO";

    /// Every column a roster table must provide.
    pub const REQUIRED: [&str; 7] = [
        EMPLOYEE_ID,
        HIRE_DATE,
        TERMINATION_DATE,
        DEPARTMENT,
        JOB_TITLE,
        TERMINATION_REASON,
        CONTRACT_TYPE,
    ];
}

/// One untyped roster row, dates still as text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEmployeeRow {
    /// Employee identifier
    #[serde(rename = "ID_EMPLEADO", deserialize_with = "de::id")]
    pub employee_id: String,
    /// Hire date as supplied
    #[serde(rename = "FECHA_INGRESO", default)]
    pub hire_date: Option<String>,
    /// Termination date as supplied
    #[serde(rename = "FECHA_SALIDA", default)]
    pub termination_date: Option<String>,
    /// Department
    #[serde(rename = "AREA", default)]
    pub department: Option<String>,
    /// Job title
    #[serde(rename = "CARGO", default)]
    pub job_title: Option<String>,
    /// Termination reason
    #[serde(rename = "MOTIVO_SALIDA", default)]
    pub termination_reason: Option<String>,
    /// Contract type
    #[serde(rename = "TIPO_CONTRATO", default)]
    pub contract_type: Option<String>,
}

mod de {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
        Float(f64),
    }

    /// Identifiers show up as numbers in JSON exports; keep them as text.
    pub(super) fn id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(match Id::deserialize(deserializer)? {
            Id::Text(s) => s,
            Id::Int(i) => i.to_string(),
            Id::Float(f) => f.to_string(),
        })
    }
}

/// A validated employee with derived tenure and calendar fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmployeeRecord {
    /// Employee identifier
    pub employee_id: String,
    /// Hire date
    pub hire_date: NaiveDate,
    /// Termination date; `None` means currently employed
    pub termination_date: Option<NaiveDate>,
    /// Department
    pub department: String,
    /// Contract type
    pub contract_type: String,
    /// Job title, when supplied
    pub job_title: Option<String>,
    /// Termination reason, only kept for terminated employees
    pub termination_reason: Option<String>,
    /// Days employed up to termination or the reference date
    pub tenure_days: i64,
    /// Hire month (1-12)
    pub hire_month: u32,
    /// Hire year
    pub hire_year: i32,
    /// Termination month (1-12)
    pub termination_month: Option<u32>,
    /// Termination year
    pub termination_year: Option<i32>,
}

impl EmployeeRecord {
    /// Whether the employee has a termination date.
    pub const fn is_terminated(&self) -> bool {
        self.termination_date.is_some()
    }

    /// Whether the employee counts toward head count on `date`.
    pub fn is_employed_on(&self, date: NaiveDate) -> bool {
        self.hire_date <= date && self.termination_date.is_none_or(|end| end > date)
    }
}

/// Entry points for moving roster tables in and out of the typed model.
#[derive(Debug, Clone, Copy)]
pub struct Roster;

impl Roster {
    /// Read raw rows from a frame carrying the source roster columns.
    ///
    /// Every column is read as text, so numeric identifiers and parsed dates
    /// are both accepted.
    pub fn from_frame(frame: &DataFrame) -> Result<Vec<RawEmployeeRow>> {
        let ids = string_column(frame, columns::EMPLOYEE_ID)?;
        let hires = string_column(frame, columns::HIRE_DATE)?;
        let terminations = string_column(frame, columns::TERMINATION_DATE)?;
        let departments = string_column(frame, columns::DEPARTMENT)?;
        let titles = string_column(frame, columns::JOB_TITLE)?;
        let reasons = string_column(frame, columns::TERMINATION_REASON)?;
        let contracts = string_column(frame, columns::CONTRACT_TYPE)?;

        let rows = (0..frame.height())
            .map(|i| RawEmployeeRow {
                employee_id: ids[i].clone().unwrap_or_else(|| format!("row-{i}")),
                hire_date: hires[i].clone(),
                termination_date: terminations[i].clone(),
                department: departments[i].clone(),
                job_title: titles[i].clone(),
                termination_reason: reasons[i].clone(),
                contract_type: contracts[i].clone(),
            })
            .collect();

        Ok(rows)
    }

    /// Render processed records as a frame, dates formatted as ISO strings.
    pub fn to_frame(records: &[EmployeeRecord]) -> Result<DataFrame> {
        let fmt = |d: NaiveDate| d.format(PERIOD_FORMAT).to_string();

        let frame = df![
            "employee_id" => records.iter().map(|r| r.employee_id.clone()).collect::<Vec<_>>(),
            "hire_date" => records.iter().map(|r| fmt(r.hire_date)).collect::<Vec<_>>(),
            "termination_date" => records
                .iter()
                .map(|r| r.termination_date.map(fmt))
                .collect::<Vec<_>>(),
            "department" => records.iter().map(|r| r.department.clone()).collect::<Vec<_>>(),
            "contract_type" => records.iter().map(|r| r.contract_type.clone()).collect::<Vec<_>>(),
            "job_title" => records.iter().map(|r| r.job_title.clone()).collect::<Vec<_>>(),
            "termination_reason" => records
                .iter()
                .map(|r| r.termination_reason.clone())
                .collect::<Vec<_>>(),
            "tenure_days" => records.iter().map(|r| r.tenure_days).collect::<Vec<_>>(),
            "hire_month" => records.iter().map(|r| r.hire_month).collect::<Vec<_>>(),
            "hire_year" => records.iter().map(|r| r.hire_year).collect::<Vec<_>>(),
            "termination_month" => records.iter().map(|r| r.termination_month).collect::<Vec<_>>(),
            "termination_year" => records.iter().map(|r| r.termination_year).collect::<Vec<_>>(),
        ]?;

        Ok(frame)
    }
}

fn string_column(frame: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = frame
        .column(name)
        .map_err(|_| WorkforceError::MissingColumn(name.to_string()))?;
    let text = column.cast(&DataType::String)?;
    let values = text
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(values)
}

/// Subset selection applied before a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterFilter {
    /// Keep employees hired on or after this date
    pub start: Option<NaiveDate>,
    /// Keep employees hired on or before this date
    pub end: Option<NaiveDate>,
    /// Keep only these departments; empty keeps all
    pub departments: Vec<String>,
}

impl RosterFilter {
    /// Whether the filter keeps every record.
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none() && self.departments.is_empty()
    }

    /// Whether `record` passes the filter.
    pub fn matches(&self, record: &EmployeeRecord) -> bool {
        // The hire window only applies when both ends are given.
        let in_window = match (self.start, self.end) {
            (Some(start), Some(end)) => record.hire_date >= start && record.hire_date <= end,
            _ => true,
        };
        let in_department =
            self.departments.is_empty() || self.departments.contains(&record.department);
        in_window && in_department
    }

    /// Copy the records that pass the filter.
    pub fn apply(&self, records: &[EmployeeRecord]) -> Vec<EmployeeRecord> {
        records.iter().filter(|r| self.matches(r)).cloned().collect()
    }
}
