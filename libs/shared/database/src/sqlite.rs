use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, params_from_iter, types::Value, Connection, Row};
use tracing::{debug, info};

use shared_models::appointment::{Appointment, NewAppointment};

use crate::error::{DatabaseError, Result};
use crate::gateway::{AppointmentChanges, AppointmentFilter, AppointmentGateway, AppointmentOrder};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
const TIMESTAMP_PARSE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Range checks and ordering compare both sides in SQLite's canonical form, so
/// rows written by other tools without a fraction still compare by time.
const START_TIME_KEY: &str = "strftime('%Y-%m-%d %H:%M:%f', start_time)";
const PARAM_KEY: &str = "strftime('%Y-%m-%d %H:%M:%f', ?)";

const COLUMNS: &str = "id, patient_name, reason, start_time, canceled, created_at";

/// Create the `appointments` table and its lookup indexes (idempotent).
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS appointments (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            patient_name TEXT    NOT NULL,
            reason       TEXT,
            start_time   TEXT    NOT NULL,
            canceled     INTEGER NOT NULL DEFAULT 0,
            created_at   TEXT    NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_appointments_start_time ON appointments (start_time);
        CREATE INDEX IF NOT EXISTS idx_appointments_patient_name ON appointments (patient_name);
        ",
    )?;
    Ok(())
}

/// Appointment gateway over a single SQLite connection.
///
/// rusqlite is blocking, so every call runs on the blocking pool and holds the
/// connection for the whole transaction. A transaction that is dropped without
/// `commit` rolls back, so early returns never leave partial writes behind.
#[derive(Clone)]
pub struct SqliteGateway {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteGateway {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            // an interrupted call's transaction was already rolled back on drop
            let mut guard = conn.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut guard)
        })
        .await
        .map_err(|e| DatabaseError::Unavailable(e.to_string()))?
    }
}

fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_PARSE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_appointment(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    let start_time: String = row.get(3)?;
    let created_at: String = row.get(5)?;
    Ok(Appointment {
        id: row.get(0)?,
        patient_name: row.get(1)?,
        reason: row.get(2)?,
        start_time: parse_timestamp(3, &start_time)?,
        canceled: row.get(4)?,
        created_at: parse_timestamp(5, &created_at)?.and_utc(),
    })
}

fn where_clause(filter: &AppointmentFilter) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut values = Vec::new();

    if let Some(name) = &filter.patient_name {
        clauses.push("patient_name = ?".to_string());
        values.push(Value::Text(name.clone()));
    }
    if let Some(start) = &filter.starts_at_or_after {
        clauses.push(format!("{START_TIME_KEY} >= {PARAM_KEY}"));
        values.push(Value::Text(format_timestamp(start)));
    }
    if let Some(end) = &filter.starts_before {
        clauses.push(format!("{START_TIME_KEY} < {PARAM_KEY}"));
        values.push(Value::Text(format_timestamp(end)));
    }
    if let Some(canceled) = filter.canceled {
        clauses.push("canceled = ?".to_string());
        values.push(Value::Integer(canceled as i64));
    }

    if clauses.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), values)
    }
}

fn order_clause(order: AppointmentOrder) -> String {
    // id breaks ties so equal start times keep insertion order
    match order {
        AppointmentOrder::StartTimeAsc => format!(" ORDER BY {START_TIME_KEY} ASC, start_time ASC, id ASC"),
    }
}

#[async_trait]
impl AppointmentGateway for SqliteGateway {
    async fn create(&self, record: NewAppointment) -> Result<Appointment> {
        self.with_connection(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO appointments (patient_name, reason, start_time, canceled, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.patient_name,
                    record.reason,
                    format_timestamp(&record.start_time),
                    record.canceled,
                    format_timestamp(&Utc::now().naive_utc()),
                ],
            )?;
            let id = tx.last_insert_rowid();
            let appointment = tx.query_row(
                &format!("SELECT {} FROM appointments WHERE id = ?1", COLUMNS),
                [id],
                row_to_appointment,
            )?;
            tx.commit()?;

            info!(appointment_id = appointment.id, "appointment created");
            Ok(appointment)
        })
        .await
    }

    async fn query(&self, filter: AppointmentFilter, order: AppointmentOrder) -> Result<Vec<Appointment>> {
        self.with_connection(move |conn| {
            let (clause, values) = where_clause(&filter);
            let sql = format!("SELECT {} FROM appointments{}{}", COLUMNS, clause, order_clause(order));
            debug!("Running appointment query: {}", sql);

            let tx = conn.transaction()?;
            let appointments = {
                let mut stmt = tx.prepare(&sql)?;
                let rows = stmt.query_map(params_from_iter(values.iter()), row_to_appointment)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            };
            tx.commit()?;

            Ok(appointments)
        })
        .await
    }

    async fn update_matching(&self, filter: AppointmentFilter, changes: AppointmentChanges) -> Result<u64> {
        if changes.is_empty() {
            return Err(DatabaseError::InvalidUpdate("no field changes supplied".to_string()));
        }

        self.with_connection(move |conn| {
            let mut assignments = Vec::new();
            let mut values = Vec::new();
            if let Some(canceled) = changes.canceled {
                assignments.push("canceled = ?");
                values.push(Value::Integer(canceled as i64));
            }

            let (clause, filter_values) = where_clause(&filter);
            values.extend(filter_values);
            let sql = format!("UPDATE appointments SET {}{}", assignments.join(", "), clause);
            debug!("Running appointment update: {}", sql);

            let tx = conn.transaction()?;
            let changed = tx.execute(&sql, params_from_iter(values.iter()))?;
            tx.commit()?;

            info!(changed, "appointments updated");
            Ok(changed as u64)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn day_filter(day: u32) -> AppointmentFilter {
        AppointmentFilter::new().starting_between(at(day, 0, 0), at(day + 1, 0, 0))
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_created_at() {
        let gateway = SqliteGateway::in_memory().unwrap();
        let before = Utc::now();

        let created = gateway
            .create(NewAppointment::new(
                "John Doe".to_string(),
                Some("Checkup".to_string()),
                at(24, 14, 30),
            ))
            .await
            .unwrap();

        assert_eq!(created.id, 1);
        assert_eq!(created.patient_name, "John Doe");
        assert_eq!(created.reason.as_deref(), Some("Checkup"));
        assert_eq!(created.start_time, at(24, 14, 30));
        assert!(!created.canceled);
        assert!(created.created_at >= before - chrono::Duration::seconds(1));
    }

    #[tokio::test]
    async fn test_ids_are_never_reused() {
        let gateway = SqliteGateway::in_memory().unwrap();
        let first = gateway
            .create(NewAppointment::new("A".to_string(), None, at(24, 9, 0)))
            .await
            .unwrap();
        let second = gateway
            .create(NewAppointment::new("A".to_string(), None, at(24, 9, 0)))
            .await
            .unwrap();

        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_query_orders_by_start_time() {
        let gateway = SqliteGateway::in_memory().unwrap();
        for (name, hour) in [("Late", 16), ("Early", 8), ("Middle", 12)] {
            gateway
                .create(NewAppointment::new(name.to_string(), None, at(24, hour, 0)))
                .await
                .unwrap();
        }

        let rows = gateway
            .query(day_filter(24), AppointmentOrder::StartTimeAsc)
            .await
            .unwrap();
        let names: Vec<_> = rows.iter().map(|a| a.patient_name.as_str()).collect();
        assert_eq!(names, vec!["Early", "Middle", "Late"]);
    }

    #[tokio::test]
    async fn test_window_excludes_next_midnight() {
        let gateway = SqliteGateway::in_memory().unwrap();
        gateway
            .create(NewAppointment::new("A".to_string(), None, at(24, 0, 0)))
            .await
            .unwrap();
        gateway
            .create(NewAppointment::new("B".to_string(), None, at(25, 0, 0)))
            .await
            .unwrap();

        let rows = gateway
            .query(day_filter(24), AppointmentOrder::StartTimeAsc)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].patient_name, "A");
    }

    #[tokio::test]
    async fn test_update_matching_counts_changed_rows() {
        let gateway = SqliteGateway::in_memory().unwrap();
        for hour in [9, 11] {
            gateway
                .create(NewAppointment::new("John Doe".to_string(), None, at(24, hour, 0)))
                .await
                .unwrap();
        }
        gateway
            .create(NewAppointment::new("Jane Roe".to_string(), None, at(24, 10, 0)))
            .await
            .unwrap();

        let filter = day_filter(24).patient_name("John Doe").canceled(false);
        let changed = gateway
            .update_matching(filter.clone(), AppointmentChanges::cancel())
            .await
            .unwrap();
        assert_eq!(changed, 2);

        let again = gateway
            .update_matching(filter, AppointmentChanges::cancel())
            .await
            .unwrap();
        assert_eq!(again, 0);

        let active = gateway
            .query(day_filter(24).canceled(false), AppointmentOrder::StartTimeAsc)
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].patient_name, "Jane Roe");
    }

    #[tokio::test]
    async fn test_update_without_changes_is_rejected() {
        let gateway = SqliteGateway::in_memory().unwrap();
        let result = gateway
            .update_matching(AppointmentFilter::new(), AppointmentChanges::default())
            .await;
        assert!(matches!(result, Err(DatabaseError::InvalidUpdate(_))));
    }

    #[tokio::test]
    async fn test_reads_rows_written_without_fraction() {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        conn.execute(
            "INSERT INTO appointments (patient_name, reason, start_time, canceled, created_at)
             VALUES ('John Doe', 'Checkup', '2026-01-24 14:30:00', 0, '2026-01-01 08:00:00')",
            [],
        )
        .unwrap();
        let gateway = SqliteGateway::from_connection(conn).unwrap();

        let rows = gateway
            .query(day_filter(24), AppointmentOrder::StartTimeAsc)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].start_time, at(24, 14, 30));
    }

    #[tokio::test]
    async fn test_midnight_row_without_fraction_belongs_to_its_own_day() {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        conn.execute(
            "INSERT INTO appointments (patient_name, reason, start_time, canceled, created_at)
             VALUES ('John Doe', NULL, '2026-01-24 00:00:00', 0, '2026-01-01 08:00:00')",
            [],
        )
        .unwrap();
        let gateway = SqliteGateway::from_connection(conn).unwrap();

        let on_day = gateway
            .query(day_filter(24), AppointmentOrder::StartTimeAsc)
            .await
            .unwrap();
        assert_eq!(on_day.len(), 1);
        assert_eq!(on_day[0].start_time, at(24, 0, 0));

        let day_before = gateway
            .query(day_filter(23), AppointmentOrder::StartTimeAsc)
            .await
            .unwrap();
        assert!(day_before.is_empty());

        let canceled = gateway
            .update_matching(
                day_filter(24).patient_name("John Doe").canceled(false),
                AppointmentChanges::cancel(),
            )
            .await
            .unwrap();
        assert_eq!(canceled, 1);
    }

    #[tokio::test]
    async fn test_connection_survives_a_panicked_caller() {
        let gateway = SqliteGateway::in_memory().unwrap();
        gateway
            .create(NewAppointment::new("John Doe".to_string(), None, at(24, 9, 0)))
            .await
            .unwrap();

        let conn = Arc::clone(&gateway.conn);
        let result = std::thread::spawn(move || {
            let _guard = conn.lock().unwrap();
            panic!("caller failed while holding the connection");
        })
        .join();
        assert!(result.is_err());
        assert!(gateway.conn.is_poisoned());

        let rows = gateway
            .query(day_filter(24), AppointmentOrder::StartTimeAsc)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }
}
