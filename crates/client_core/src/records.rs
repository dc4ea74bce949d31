//! Records page projection: filtering, today's summary and CSV export.

use std::collections::HashMap;

use chrono::NaiveDate;
use shared::{
    domain::{AttendanceOutcome, SubjectId},
    protocol::{AttendanceRow, Student},
};

const CSV_HEADERS: [&str; 6] = [
    "Student Name",
    "Student ID",
    "Class",
    "Date",
    "Time",
    "Status",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub search: String,
    /// Accepted for parity with the records page; rows carry no class, so it matches everything.
    pub class_name: String,
    pub status: String,
}

impl RecordFilter {
    fn matches(&self, row: &AttendanceRow, lookup: &HashMap<SubjectId, Student>) -> bool {
        let search = self.search.trim().to_lowercase();
        if !search.is_empty() {
            let id = row.person_id.to_lowercase();
            let name = lookup
                .get(&SubjectId::new(row.person_id.as_str()))
                .map(|student| student.name.to_lowercase())
                .unwrap_or_default();
            if !id.contains(&search) && !name.contains(&search) {
                return false;
            }
        }

        let status = self.status.trim();
        status.is_empty() || row.status.eq_ignore_ascii_case(status)
    }
}

pub fn filter<'a>(
    rows: &'a [AttendanceRow],
    lookup: &HashMap<SubjectId, Student>,
    filter: &RecordFilter,
) -> Vec<&'a AttendanceRow> {
    rows.iter().filter(|row| filter.matches(row, lookup)).collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DailySummary {
    pub present: usize,
    pub late: usize,
    pub absent: usize,
}

pub fn daily_summary(rows: &[AttendanceRow], today: NaiveDate) -> DailySummary {
    rows.iter()
        .filter(|row| row.recorded_on(today))
        .fold(DailySummary::default(), |mut summary, row| {
            match row.status.trim().parse::<AttendanceOutcome>() {
                Ok(AttendanceOutcome::Present) => summary.present += 1,
                Ok(AttendanceOutcome::Late) => summary.late += 1,
                Ok(AttendanceOutcome::Absent) => summary.absent += 1,
                Err(_) => {}
            }
            summary
        })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLine {
    pub name: String,
    pub id: String,
    pub class_name: String,
    pub date: String,
    pub time: String,
    pub status: String,
}

impl RecordLine {
    pub fn from_row(row: &AttendanceRow, lookup: &HashMap<SubjectId, Student>) -> Self {
        let name = match lookup.get(&SubjectId::new(row.person_id.as_str())) {
            Some(student) => student.name.clone(),
            None if !row.person_id.is_empty() => row.person_id.clone(),
            None => "Unknown".to_string(),
        };
        let parsed = row.parsed_timestamp();
        Self {
            name,
            id: row.person_id.clone(),
            class_name: String::new(),
            date: parsed
                .map(|ts| ts.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            time: parsed
                .map(|ts| ts.format("%H:%M").to_string())
                .unwrap_or_default(),
            status: if row.status.is_empty() {
                AttendanceOutcome::Present.to_string()
            } else {
                row.status.clone()
            },
        }
    }

    fn fields(&self) -> [&str; 6] {
        [
            &self.name,
            &self.id,
            &self.class_name,
            &self.date,
            &self.time,
            &self.status,
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordsView {
    pub lines: Vec<RecordLine>,
    pub summary: DailySummary,
}

impl RecordsView {
    pub fn build(
        rows: &[AttendanceRow],
        lookup: &HashMap<SubjectId, Student>,
        record_filter: &RecordFilter,
        today: NaiveDate,
    ) -> Self {
        Self {
            lines: filter(rows, lookup, record_filter)
                .into_iter()
                .map(|row| RecordLine::from_row(row, lookup))
                .collect(),
            summary: daily_summary(rows, today),
        }
    }
}

/// Every field is quoted; embedded quotes are doubled.
pub fn export_csv(lines: &[RecordLine]) -> String {
    let header = CSV_HEADERS.map(quote).join(",");
    let mut out = header;
    for line in lines {
        out.push('\n');
        out.push_str(&line.fields().map(quote).join(","));
    }
    out
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}
