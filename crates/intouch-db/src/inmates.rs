//! Roster persistence.
//!
//! Reads the persisted roster and applies reconciliation batches. A batch is
//! applied inside a single transaction: either every statement commits or
//! none does.

use crate::error::{DatabaseError, Result};
use chrono::Utc;
use intouch_core::{Inmate, InmateId, NaturalKey, ScrapedRecord, StateCode};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};

/// Changes produced by one reconciliation, applied atomically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterBatch {
    /// Jurisdiction the upserted records belong to
    pub state: StateCode,
    /// Natural keys to flip to `active = false`
    pub deactivate: Vec<NaturalKey>,
    /// Records to insert, or to refresh facility and re-activate if present
    pub upserts: Vec<ScrapedRecord>,
}

impl RosterBatch {
    /// Whether the batch contains no statements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deactivate.is_empty() && self.upserts.is_empty()
    }
}

/// Row counts reported by [`apply_roster_batch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Rows flipped to inactive
    pub deactivated: u64,
    /// Rows inserted or updated
    pub upserted: u64,
}

/// List persisted inmates, optionally filtered by a case-insensitive
/// substring of `"first last"`.
///
/// # Errors
/// Returns `DatabaseError` if the query fails or a stored value is invalid.
pub async fn list_inmates(pool: &Pool<Sqlite>, filter: Option<&str>) -> Result<Vec<Inmate>> {
    let pattern = filter.map(|f| format!("%{}%", escape_like(&f.to_uppercase())));

    let rows = sqlx::query(
        r"SELECT id, state, inmate_number, first_name, last_name, date_of_birth, facility, active
          FROM inmates
          WHERE ?1 IS NULL OR UPPER(first_name || ' ' || last_name) LIKE ?1 ESCAPE '\'
          ORDER BY state, inmate_number",
    )
    .bind(pattern)
    .fetch_all(pool)
    .await?;

    rows.iter().map(inmate_from_row).collect()
}

/// Apply a reconciliation batch in one transaction.
///
/// Deactivations run first, then upserts. Any failing statement rolls back the
/// whole batch.
///
/// # Errors
/// Returns `DatabaseError` if any statement or the commit fails; nothing is
/// persisted in that case.
pub async fn apply_roster_batch(pool: &Pool<Sqlite>, batch: &RosterBatch) -> Result<BatchOutcome> {
    let now = Utc::now().to_rfc3339();
    let mut outcome = BatchOutcome::default();
    let mut tx = pool.begin().await?;

    for key in &batch.deactivate {
        let result = sqlx::query(
            "UPDATE inmates SET active = 0, updated_at = ? WHERE state = ? AND inmate_number = ?",
        )
        .bind(&now)
        .bind(key.state.as_str())
        .bind(&key.inmate_number)
        .execute(&mut *tx)
        .await?;
        outcome.deactivated += result.rows_affected();
    }

    for record in &batch.upserts {
        let result = sqlx::query(
            "INSERT INTO inmates (id, state, inmate_number, first_name, last_name, date_of_birth,
                                  facility, active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
             ON CONFLICT(state, inmate_number) DO UPDATE
             SET facility = excluded.facility, active = 1, updated_at = excluded.updated_at",
        )
        .bind(InmateId::generate().as_str())
        .bind(batch.state.as_str())
        .bind(&record.inmate_number)
        .bind(&record.first_name)
        .bind(&record.last_name)
        .bind(&record.date_of_birth)
        .bind(&record.facility)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
        outcome.upserted += result.rows_affected();
    }

    tx.commit().await?;

    tracing::debug!(
        deactivated = outcome.deactivated,
        upserted = outcome.upserted,
        "Roster batch committed"
    );
    Ok(outcome)
}

fn inmate_from_row(row: &SqliteRow) -> Result<Inmate> {
    let state: String = row.try_get("state")?;
    let state = StateCode::new(state).map_err(|e| DatabaseError::Decode(e.to_string()))?;
    let active: i64 = row.try_get("active")?;

    Ok(Inmate {
        id: InmateId::from_stored(row.try_get::<String, _>("id")?),
        state,
        inmate_number: row.try_get("inmate_number")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        date_of_birth: row.try_get("date_of_birth")?,
        facility: row.try_get("facility")?,
        active: active != 0,
    })
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facilities::insert_facility;
    use crate::Database;
    use intouch_core::Facility;

    async fn setup_test_db() -> Database {
        let db = Database::open_in_memory()
            .await
            .expect("create test database");
        for (name, short) in [("Facility One", "F1"), ("Facility Two", "F2")] {
            insert_facility(
                db.pool(),
                &Facility {
                    name: name.to_string(),
                    short_name: short.to_string(),
                    address_line1: String::new(),
                    address_line2: None,
                    city: String::new(),
                    state: "CT".to_string(),
                    postal_code: String::new(),
                    test_address_id: None,
                    live_address_id: None,
                },
            )
            .await
            .expect("seed facility");
        }
        db
    }

    fn record(number: &str, first: &str, last: &str, facility: &str) -> ScrapedRecord {
        ScrapedRecord {
            inmate_number: number.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            date_of_birth: "01/02/1980".to_string(),
            facility: facility.to_string(),
        }
    }

    fn key(number: &str) -> NaturalKey {
        NaturalKey::new(StateCode::default(), number)
    }

    #[tokio::test]
    async fn test_upsert_inserts_new_rows() {
        let db = setup_test_db().await;
        let batch = RosterBatch {
            state: StateCode::default(),
            deactivate: vec![],
            upserts: vec![
                record("111", "Ann", "Lee", "Facility One"),
                record("222", "Bob", "Ray", "Facility Two"),
            ],
        };

        let outcome = apply_roster_batch(db.pool(), &batch)
            .await
            .expect("apply batch");
        assert_eq!(outcome.upserted, 2);

        let inmates = list_inmates(db.pool(), None).await.expect("list inmates");
        assert_eq!(inmates.len(), 2);
        assert!(inmates.iter().all(|i| i.active));
        assert_eq!(inmates[0].inmate_number, "111");
        assert_eq!(inmates[0].state.as_str(), "CT");
    }

    #[tokio::test]
    async fn test_upsert_existing_keeps_id_and_refreshes_facility() {
        let db = setup_test_db().await;
        let mut batch = RosterBatch {
            state: StateCode::default(),
            deactivate: vec![],
            upserts: vec![record("111", "Ann", "Lee", "Facility One")],
        };
        apply_roster_batch(db.pool(), &batch).await.expect("insert");
        let original = list_inmates(db.pool(), None).await.expect("list")[0].clone();

        apply_roster_batch(
            db.pool(),
            &RosterBatch {
                state: StateCode::default(),
                deactivate: vec![key("111")],
                upserts: vec![],
            },
        )
        .await
        .expect("deactivate");

        batch.upserts = vec![record("111", "Annie", "Leigh", "Facility Two")];
        apply_roster_batch(db.pool(), &batch).await.expect("update");

        let inmates = list_inmates(db.pool(), None).await.expect("list");
        assert_eq!(inmates.len(), 1);
        let updated = &inmates[0];
        assert_eq!(updated.id, original.id);
        assert_eq!(updated.facility, "Facility Two");
        assert!(updated.active);
        // Only facility and active are refreshed on conflict
        assert_eq!(updated.first_name, "Ann");
        assert_eq!(updated.last_name, "Lee");
    }

    #[tokio::test]
    async fn test_deactivate_leaves_other_fields() {
        let db = setup_test_db().await;
        apply_roster_batch(
            db.pool(),
            &RosterBatch {
                state: StateCode::default(),
                deactivate: vec![],
                upserts: vec![record("111", "Ann", "Lee", "Facility One")],
            },
        )
        .await
        .expect("insert");
        let before = list_inmates(db.pool(), None).await.expect("list")[0].clone();

        let outcome = apply_roster_batch(
            db.pool(),
            &RosterBatch {
                state: StateCode::default(),
                deactivate: vec![key("111"), key("999")],
                upserts: vec![],
            },
        )
        .await
        .expect("deactivate");
        assert_eq!(outcome.deactivated, 1);

        let after = list_inmates(db.pool(), None).await.expect("list")[0].clone();
        assert!(!after.active);
        assert_eq!(Inmate { active: true, ..after }, before);
    }

    #[tokio::test]
    async fn test_failed_batch_rolls_back_everything() {
        let db = setup_test_db().await;
        apply_roster_batch(
            db.pool(),
            &RosterBatch {
                state: StateCode::default(),
                deactivate: vec![],
                upserts: vec![record("100", "Old", "Timer", "Facility One")],
            },
        )
        .await
        .expect("seed roster");
        let before = list_inmates(db.pool(), None).await.expect("list");

        // The fifth upsert references an unknown facility and violates the foreign key
        let mut upserts: Vec<_> = (1..=10)
            .map(|n| record(&format!("{n}"), "New", "Person", "Facility Two"))
            .collect();
        upserts[4].facility = "No Such Facility".to_string();

        let result = apply_roster_batch(
            db.pool(),
            &RosterBatch {
                state: StateCode::default(),
                deactivate: vec![key("100")],
                upserts,
            },
        )
        .await;
        assert!(result.is_err());

        let after = list_inmates(db.pool(), None).await.expect("list");
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn test_list_inmates_filter() {
        let db = setup_test_db().await;
        apply_roster_batch(
            db.pool(),
            &RosterBatch {
                state: StateCode::default(),
                deactivate: vec![],
                upserts: vec![
                    record("111", "Ann", "Lee", "Facility One"),
                    record("222", "Bob", "Ray", "Facility One"),
                    record("333", "Lee", "Park", "Facility One"),
                ],
            },
        )
        .await
        .expect("insert");

        let matches = list_inmates(db.pool(), Some("lee")).await.expect("filter");
        let numbers: Vec<_> = matches.iter().map(|i| i.inmate_number.as_str()).collect();
        assert_eq!(numbers, vec!["111", "333"]);

        let matches = list_inmates(db.pool(), Some("ann lee")).await.expect("filter");
        assert_eq!(matches.len(), 1);

        // LIKE wildcards in the filter are literal
        let matches = list_inmates(db.pool(), Some("%")).await.expect("filter");
        assert!(matches.is_empty());
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }
}
