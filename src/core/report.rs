//! Report rendering and parsing
//!
//! Three artifacts leave the engine:
//! - `principal_action_detail.csv`: one row per action record
//! - `service_access_matrix.csv` / `.jsonl`: one row per matrix key
//! - `service_access_drift_report.csv`: one row per drift record
//!
//! CSV fields are quoted per RFC 4180 when they contain a separator, quote or
//! line break. Booleans are written `True`/`False`.

use crate::error::{IamDriftError, Result};
use crate::iam::{
    parse_flag, render_flag, AccessMatrix, ActionRecord, DriftRecord, MatrixRow, PrincipalType,
    ResourceScope,
};
use crate::validation::PrincipalName;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// Matrix columns, in persisted order
pub const MATRIX_COLUMNS: [&str; 7] = [
    "Principal",
    "PrincipalType",
    "Service",
    "AccessLevels",
    "ResourceScope",
    "HasExplicitDeny",
    "Sources",
];

/// Drift columns, in persisted order
pub const DRIFT_COLUMNS: [&str; 6] = [
    "Principal",
    "PrincipalType",
    "Service",
    "ChangeType",
    "Day1",
    "Day2",
];

/// Action detail columns, in persisted order
pub const DETAIL_COLUMNS: [&str; 12] = [
    "Principal",
    "PrincipalType",
    "PolicyName",
    "PolicyType",
    "PolicyArn",
    "TagValue",
    "Effect",
    "Action",
    "Service",
    "AccessLevel",
    "Resources",
    "Condition",
];

/// Body written in place of a drift CSV when nothing changed
pub const NO_DRIFT_BODY: &str = "No drift detected\n";

/// Quote a CSV field if needed
pub fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Render a header plus rows as CSV text
pub fn write_csv<R, F>(columns: &[&str], rows: R) -> String
where
    R: IntoIterator<Item = F>,
    F: IntoIterator<Item = String>,
{
    let mut out = String::new();
    out.push_str(&columns.join(","));
    out.push('\n');
    for row in rows {
        let fields: Vec<String> = row.into_iter().map(|f| escape_field(&f)).collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

/// Parse CSV text into records of fields
///
/// Handles quoted fields with embedded separators, doubled quotes and line
/// breaks. Blank lines are skipped.
pub fn parse_csv(text: &str) -> Result<Vec<Vec<String>>> {
    Ok(parse_csv_lines(text)?
        .into_iter()
        .map(|(_, fields)| fields)
        .collect())
}

/// Parse CSV text into (1-based starting line, fields) pairs
///
/// A record whose quoted field spans lines reports the line it starts on.
pub fn parse_csv_lines(text: &str) -> Result<Vec<(usize, Vec<String>)>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut start = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                line += 1;
                record.push(std::mem::take(&mut field));
                if !(record.len() == 1 && record[0].is_empty()) {
                    records.push((start, std::mem::take(&mut record)));
                } else {
                    record.clear();
                }
                start = line;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(IamDriftError::MalformedRecord {
            line: start,
            reason: "unterminated quoted field".to_string(),
        });
    }

    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push((start, record));
    }

    Ok(records)
}

/// CSV rows addressed by header name
struct CsvTable {
    collection: String,
    columns: HashMap<String, usize>,
    /// (line, fields) for every data row
    rows: Vec<(usize, Vec<String>)>,
}

impl CsvTable {
    fn parse(collection: &str, text: &str) -> Result<Self> {
        let mut records = parse_csv_lines(text)?.into_iter();
        let (_, header) = records.next().unwrap_or_default();
        let columns = header
            .into_iter()
            .enumerate()
            .map(|(i, name)| (name.trim_start_matches('\u{feff}').to_string(), i))
            .collect();
        Ok(CsvTable {
            collection: collection.to_string(),
            columns,
            rows: records.collect(),
        })
    }

    fn require(&self, names: &[&str]) -> Result<()> {
        for name in names {
            if !self.columns.contains_key(*name) {
                return Err(IamDriftError::MissingColumn {
                    collection: self.collection.clone(),
                    column: name.to_string(),
                });
            }
        }
        Ok(())
    }

    fn field<'a>(&self, row: &'a [String], name: &str) -> &'a str {
        self.columns
            .get(name)
            .and_then(|&i| row.get(i))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Render a matrix as CSV
pub fn matrix_to_csv(matrix: &AccessMatrix) -> String {
    write_csv(
        &MATRIX_COLUMNS,
        matrix.rows().map(|row| {
            vec![
                row.principal.to_string(),
                row.principal_type.to_string(),
                row.service.clone(),
                row.access_levels.clone(),
                row.resource_scope.to_string(),
                render_flag(row.has_explicit_deny).to_string(),
                row.sources.clone(),
            ]
        }),
    )
}

/// Parse a matrix CSV written by this crate or by the earlier report tooling
pub fn matrix_from_csv(collection: &str, text: &str) -> Result<AccessMatrix> {
    let table = CsvTable::parse(collection, text)?;
    if table.rows.is_empty() && table.columns.is_empty() {
        return Ok(AccessMatrix::new());
    }
    table.require(&MATRIX_COLUMNS[..6])?;

    let rows = table
        .rows
        .iter()
        .map(|(line, row)| -> Result<MatrixRow> {
            let principal = PrincipalName::new(table.field(row, "Principal"))?;
            let principal_type: PrincipalType = table.field(row, "PrincipalType").parse()?;
            let resource_scope: ResourceScope = table.field(row, "ResourceScope").parse()?;
            let deny_text = table.field(row, "HasExplicitDeny");
            let has_explicit_deny =
                parse_flag(deny_text).ok_or_else(|| IamDriftError::MalformedRecord {
                    line: *line,
                    reason: format!("HasExplicitDeny is not a boolean: '{}'", deny_text),
                })?;

            Ok(MatrixRow {
                principal,
                principal_type,
                service: table.field(row, "Service").to_string(),
                access_levels: table.field(row, "AccessLevels").to_string(),
                resource_scope,
                has_explicit_deny,
                sources: table.field(row, "Sources").to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    AccessMatrix::from_rows(rows)
}

/// Render drift records as CSV, or the no-drift marker when there are none
pub fn drift_to_csv(records: &[DriftRecord]) -> String {
    if records.is_empty() {
        return NO_DRIFT_BODY.to_string();
    }

    write_csv(
        &DRIFT_COLUMNS,
        records.iter().map(|r| {
            vec![
                r.principal.to_string(),
                r.principal_type.to_string(),
                r.service.clone(),
                r.change_type.to_string(),
                r.day1.clone(),
                r.day2.clone(),
            ]
        }),
    )
}

/// Render action records as the detail CSV
pub fn action_detail_to_csv(records: &[ActionRecord]) -> String {
    write_csv(
        &DETAIL_COLUMNS,
        records.iter().map(|r| {
            vec![
                r.principal.to_string(),
                r.principal_type.to_string(),
                r.policy_name.clone(),
                r.policy_type.clone(),
                r.policy_arn.clone().unwrap_or_default(),
                r.tag_value.clone().unwrap_or_default(),
                r.effect.to_string(),
                r.action.clone(),
                r.service.clone(),
                r.access_level.to_string(),
                compact_json(&Value::from(r.resources.clone())),
                compact_json(&r.condition),
            ]
        }),
    )
}

fn compact_json(value: &Value) -> String {
    // Value's Display impl is compact JSON and cannot fail
    value.to_string()
}

/// Non-blank JSONL lines as (1-based line number, value)
pub fn jsonl_values(text: &str) -> Result<Vec<(usize, Value)>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line)
                .map(|value| (index + 1, value))
                .map_err(|e| IamDriftError::MalformedRecord {
                    line: index + 1,
                    reason: e.to_string(),
                })
        })
        .collect()
}

/// Parse JSONL into typed records, skipping blank lines
pub fn read_jsonl<T: DeserializeOwned>(text: &str) -> Result<Vec<T>> {
    jsonl_values(text)?
        .into_iter()
        .map(|(line, value)| {
            serde_json::from_value(value).map_err(|e| IamDriftError::MalformedRecord {
                line,
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Render records as JSONL, one compact object per line
pub fn write_jsonl<'a, T: Serialize + 'a>(
    records: impl IntoIterator<Item = &'a T>,
) -> Result<String> {
    let mut out = String::new();
    for record in records {
        out.push_str(&serde_json::to_string(record)?);
        out.push('\n');
    }
    Ok(out)
}

/// Render a matrix as JSONL
pub fn matrix_to_jsonl(matrix: &AccessMatrix) -> Result<String> {
    write_jsonl(matrix.rows())
}

/// Parse a matrix from JSONL rows
pub fn matrix_from_jsonl(text: &str) -> Result<AccessMatrix> {
    AccessMatrix::from_rows(read_jsonl::<MatrixRow>(text)?)
}
