//! Roster preprocessing.
//!
//! Turns raw rows into [`EmployeeRecord`]s: dates are parsed, tenure is
//! measured against an injected reference date, and calendar parts are split
//! out. Rows that cannot be typed are reported as [`DataQualityIssue`]s rather
//! than failing the whole run.

use crate::{
    Result, WorkforceError,
    roster::{EmployeeRecord, RawEmployeeRow},
};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use derive_more::Display;
use serde::Serialize;
use tracing::{debug, warn};

/// Field names used in issue reports.
const HIRE_DATE_FIELD: &str = "hire_date";
const TERMINATION_DATE_FIELD: &str = "termination_date";

/// Label used when a categorical field is absent.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Severity of a data-quality finding.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    /// The row was kept, with the noted interpretation
    #[display("warning")]
    Warning,
    /// The row was excluded from every aggregate
    #[display("excluded")]
    Excluded,
}

/// A row-level problem found while preprocessing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataQualityIssue {
    /// Zero-based row position in the input
    pub row: usize,
    /// Employee identifier of the row
    pub employee_id: String,
    /// Affected field
    pub field: &'static str,
    /// What happened to the row
    pub severity: IssueSeverity,
    /// Description of the problem
    pub message: String,
}

/// Records that survived preprocessing plus everything that was reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreprocessOutput {
    /// Typed records
    pub records: Vec<EmployeeRecord>,
    /// Row-level findings, in input order
    pub issues: Vec<DataQualityIssue>,
}

impl PreprocessOutput {
    /// Number of rows excluded from the record set.
    pub fn excluded(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Excluded)
            .count()
    }
}

/// Typed conversion of roster rows.
///
/// `as_of` stands in for the termination date of active employees, so two
/// runs with the same rows and the same `as_of` give identical output.
#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    as_of: NaiveDate,
    strict: bool,
}

impl Preprocessor {
    /// Create a preprocessor measuring open tenures up to `as_of`.
    pub const fn new(as_of: NaiveDate) -> Self {
        Self {
            as_of,
            strict: false,
        }
    }

    /// Fail on the first excluded row instead of reporting it.
    pub const fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Reference date used for active employees.
    pub const fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    /// Process every row.
    ///
    /// In strict mode the first excluded row becomes an error; otherwise the
    /// row is dropped and listed in [`PreprocessOutput::issues`].
    pub fn process(&self, rows: &[RawEmployeeRow]) -> Result<PreprocessOutput> {
        let mut output = PreprocessOutput::default();

        for (index, row) in rows.iter().enumerate() {
            match self.process_row(index, row, &mut output.issues) {
                Ok(record) => output.records.push(record),
                Err(err) if self.strict => return Err(err),
                Err(err) => {
                    warn!(row = index, employee_id = %row.employee_id, "{err}");
                    output.issues.push(DataQualityIssue {
                        row: index,
                        employee_id: row.employee_id.clone(),
                        field: match &err {
                            WorkforceError::InvalidDate { field, .. } => *field,
                            _ => TERMINATION_DATE_FIELD,
                        },
                        severity: IssueSeverity::Excluded,
                        message: err.to_string(),
                    });
                }
            }
        }

        debug!(
            rows = rows.len(),
            records = output.records.len(),
            issues = output.issues.len(),
            "preprocessed roster"
        );
        Ok(output)
    }

    fn process_row(
        &self,
        index: usize,
        row: &RawEmployeeRow,
        issues: &mut Vec<DataQualityIssue>,
    ) -> Result<EmployeeRecord> {
        let hire_date = row
            .hire_date
            .as_deref()
            .and_then(parse_date)
            .ok_or_else(|| WorkforceError::InvalidDate {
                employee_id: row.employee_id.clone(),
                field: HIRE_DATE_FIELD,
                value: row.hire_date.clone().unwrap_or_default(),
            })?;

        let termination_date = match non_blank(row.termination_date.as_deref()) {
            None => None,
            Some(raw) => {
                let parsed = parse_date(raw);
                if parsed.is_none() {
                    // Unreadable exit dates leave the employee active.
                    warn!(row = index, employee_id = %row.employee_id, value = raw,
                        "unparseable termination date, treating employee as active");
                    issues.push(DataQualityIssue {
                        row: index,
                        employee_id: row.employee_id.clone(),
                        field: TERMINATION_DATE_FIELD,
                        severity: IssueSeverity::Warning,
                        message: format!("unparseable termination date {raw:?}; treated as active"),
                    });
                }
                parsed
            }
        };

        if let Some(end) = termination_date.filter(|end| *end < hire_date) {
            return Err(WorkforceError::InvalidRecord {
                employee_id: row.employee_id.clone(),
                reason: format!("termination date {end} precedes hire date {hire_date}"),
            });
        }

        let tenure_end = termination_date.unwrap_or(self.as_of);
        let tenure_days = (tenure_end - hire_date).num_days().max(0);

        Ok(EmployeeRecord {
            employee_id: row.employee_id.clone(),
            hire_date,
            termination_date,
            department: category(row.department.as_deref()),
            contract_type: category(row.contract_type.as_deref()),
            job_title: non_blank(row.job_title.as_deref()).map(str::to_string),
            termination_reason: termination_date
                .and(non_blank(row.termination_reason.as_deref()))
                .map(str::to_string),
            tenure_days,
            hire_month: hire_date.month(),
            hire_year: hire_date.year(),
            termination_month: termination_date.map(|d| d.month()),
            termination_year: termination_date.map(|d| d.year()),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn category(value: Option<&str>) -> String {
    non_blank(value).unwrap_or(UNKNOWN_CATEGORY).to_string()
}

/// Parse an ISO-8601 date or date-time, keeping the calendar date.
///
/// Returns `None` for blank or unreadable input.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn row(id: &str, hire: Option<&str>, termination: Option<&str>) -> RawEmployeeRow {
        RawEmployeeRow {
            employee_id: id.to_string(),
            hire_date: hire.map(str::to_string),
            termination_date: termination.map(str::to_string),
            department: Some("Ventas".to_string()),
            job_title: Some("Vendedor".to_string()),
            termination_reason: Some("Renuncia".to_string()),
            contract_type: Some("Permanente".to_string()),
        }
    }

    #[test]
    fn test_preprocess_derives_calendar_fields() {
        let output = Preprocessor::new(as_of())
            .process(&[row("1", Some("2022-01-01"), None)])
            .unwrap();

        assert!(output.issues.is_empty());
        let record = &output.records[0];
        assert_eq!(record.hire_month, 1);
        assert_eq!(record.hire_year, 2022);
        assert_eq!(record.termination_month, None);
        assert_eq!(record.termination_year, None);
        // 2022-01-01 .. 2024-01-01
        assert_eq!(record.tenure_days, 730);
        // Active employees carry no exit reason.
        assert_eq!(record.termination_reason, None);
    }

    #[test]
    fn test_tenure_uses_termination_date() {
        let output = Preprocessor::new(as_of())
            .process(&[row("2", Some("2022-02-20"), Some("2023-01-10"))])
            .unwrap();

        let record = &output.records[0];
        assert_eq!(record.tenure_days, 324);
        assert_eq!(record.termination_month, Some(1));
        assert_eq!(record.termination_year, Some(2023));
        assert_eq!(record.termination_reason.as_deref(), Some("Renuncia"));
    }

    #[test]
    fn test_tenure_is_deterministic_for_fixed_reference() {
        let rows = [row("1", Some("2022-01-01"), None)];
        let first = Preprocessor::new(as_of()).process(&rows).unwrap();
        let second = Preprocessor::new(as_of()).process(&rows).unwrap();
        assert_eq!(first, second);

        let later = Preprocessor::new(as_of() + chrono::Days::new(10))
            .process(&rows)
            .unwrap();
        assert_eq!(later.records[0].tenure_days, 740);
    }

    #[test]
    fn test_invalid_hire_date_is_excluded_and_reported() {
        let output = Preprocessor::new(as_of())
            .process(&[
                row("1", Some("not a date"), None),
                row("2", None, None),
                row("3", Some("2022-05-01"), None),
            ])
            .unwrap();

        assert_eq!(output.records.len(), 1);
        assert_eq!(output.records[0].employee_id, "3");
        assert_eq!(output.excluded(), 2);
        assert_eq!(output.issues[0].field, "hire_date");
        assert_eq!(output.issues[1].row, 1);
    }

    #[test]
    fn test_strict_mode_fails_on_invalid_hire_date() {
        let err = Preprocessor::new(as_of())
            .strict(true)
            .process(&[row("1", Some("2022-13-45"), None)])
            .unwrap_err();
        assert!(matches!(err, WorkforceError::InvalidDate { field: "hire_date", .. }));
    }

    #[test]
    fn test_unparseable_termination_means_active() {
        let output = Preprocessor::new(as_of())
            .process(&[row("1", Some("2022-01-01"), Some("someday"))])
            .unwrap();

        let record = &output.records[0];
        assert!(!record.is_terminated());
        assert_eq!(record.tenure_days, 730);
        assert_eq!(output.issues.len(), 1);
        assert_eq!(output.issues[0].severity, IssueSeverity::Warning);
        assert_eq!(output.excluded(), 0);
    }

    #[test]
    fn test_termination_before_hire_is_excluded() {
        let output = Preprocessor::new(as_of())
            .process(&[row("1", Some("2022-05-01"), Some("2022-04-01"))])
            .unwrap();
        assert!(output.records.is_empty());
        assert_eq!(output.issues[0].field, "termination_date");
        assert_eq!(output.issues[0].severity, IssueSeverity::Excluded);
    }

    #[test]
    fn test_future_hire_has_zero_tenure() {
        let output = Preprocessor::new(as_of())
            .process(&[row("1", Some("2024-03-01"), None)])
            .unwrap();
        assert_eq!(output.records[0].tenure_days, 0);
    }

    #[test]
    fn test_missing_categories_become_unknown() {
        let mut raw = row("1", Some("2022-01-01"), None);
        raw.department = None;
        raw.contract_type = Some("  ".to_string());
        let output = Preprocessor::new(as_of()).process(&[raw]).unwrap();
        assert_eq!(output.records[0].department, UNKNOWN_CATEGORY);
        assert_eq!(output.records[0].contract_type, UNKNOWN_CATEGORY);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2022, 1, 15);
        assert_eq!(parse_date("2022-01-15"), expected);
        assert_eq!(parse_date(" 2022-01-15 "), expected);
        assert_eq!(parse_date("2022-01-15 08:30:00"), expected);
        assert_eq!(parse_date("2022-01-15T08:30:00.250"), expected);
        assert_eq!(parse_date("2022-01-15T08:30:00+02:00"), expected);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("15/01/2022"), None);
    }
}
