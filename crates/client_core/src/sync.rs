use std::{collections::HashMap, sync::Arc};

use chrono::NaiveDate;
use shared::{
    domain::SubjectId,
    protocol::{AttendanceRow, AttendanceStats, Student},
};
use tracing::{info, warn};

use crate::{backend::AttendanceBackend, error::ClientResult};

/// Last successfully fetched view of the remote data.
#[derive(Debug, Clone, Default)]
pub struct DataSnapshot {
    pub students: Vec<Student>,
    pub lookup: HashMap<SubjectId, Student>,
    pub records: Vec<AttendanceRow>,
    pub records_date: Option<String>,
    pub stats: AttendanceStats,
}

impl DataSnapshot {
    pub fn new(
        students: Vec<Student>,
        records: Vec<AttendanceRow>,
        records_date: Option<String>,
        stats: AttendanceStats,
    ) -> Self {
        let lookup = students
            .iter()
            .map(|student| (student.roll_no.clone(), student.clone()))
            .collect();
        Self {
            students,
            lookup,
            records,
            records_date,
            stats,
        }
    }

    pub fn student(&self, id: &SubjectId) -> Option<&Student> {
        self.lookup.get(id)
    }
}

pub struct DataSync {
    backend: Arc<dyn AttendanceBackend>,
    snapshot: Arc<DataSnapshot>,
    records_date: Option<NaiveDate>,
}

impl DataSync {
    pub fn new(backend: Arc<dyn AttendanceBackend>) -> Self {
        Self {
            backend,
            snapshot: Arc::new(DataSnapshot::default()),
            records_date: None,
        }
    }

    pub fn snapshot(&self) -> Arc<DataSnapshot> {
        Arc::clone(&self.snapshot)
    }

    /// Restricts the fetched records to one day; `None` lets the server pick.
    pub fn set_records_date(&mut self, date: Option<NaiveDate>) {
        self.records_date = date;
    }

    /// Fetches students, records and stats together. Any failure leaves the
    /// previous snapshot in place.
    pub async fn refresh(&mut self) -> ClientResult<Arc<DataSnapshot>> {
        let backend = Arc::clone(&self.backend);
        let fetched = tokio::try_join!(
            backend.list_students(),
            backend.list_records(self.records_date),
            backend.stats(),
        );

        let (students, records, stats) = match fetched {
            Ok(parts) => parts,
            Err(err) => {
                warn!(%err, "data refresh failed; keeping previous snapshot");
                return Err(err);
            }
        };

        let snapshot = DataSnapshot::new(students, records.rows, records.date, stats);
        info!(
            students = snapshot.students.len(),
            records = snapshot.records.len(),
            "data refreshed"
        );
        self.snapshot = Arc::new(snapshot);
        Ok(self.snapshot())
    }
}
