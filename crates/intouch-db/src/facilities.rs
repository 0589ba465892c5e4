//! Facility reference data.
//!
//! The roster sync only reads this table. [`insert_facility`] exists for
//! seeding reference data.

use intouch_core::Facility;
use sqlx::{Pool, Row, Sqlite};

/// List every facility in directory order (by canonical name).
///
/// # Errors
/// Returns `sqlx::Error` if the query fails.
pub async fn list_facilities(pool: &Pool<Sqlite>) -> Result<Vec<Facility>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT name, short_name, address_line1, address_line2, city, state, postal_code,
                test_address_id, live_address_id
         FROM facilities
         ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(Facility {
                name: row.try_get("name")?,
                short_name: row.try_get("short_name")?,
                address_line1: row.try_get("address_line1")?,
                address_line2: row.try_get("address_line2")?,
                city: row.try_get("city")?,
                state: row.try_get("state")?,
                postal_code: row.try_get("postal_code")?,
                test_address_id: row.try_get("test_address_id")?,
                live_address_id: row.try_get("live_address_id")?,
            })
        })
        .collect()
}

/// Insert a facility reference record.
///
/// # Errors
/// Returns `sqlx::Error` if the insert fails (e.g. duplicate name).
pub async fn insert_facility(pool: &Pool<Sqlite>, facility: &Facility) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO facilities (name, short_name, address_line1, address_line2, city, state,
                                 postal_code, test_address_id, live_address_id)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&facility.name)
    .bind(&facility.short_name)
    .bind(&facility.address_line1)
    .bind(&facility.address_line2)
    .bind(&facility.city)
    .bind(&facility.state)
    .bind(&facility.postal_code)
    .bind(&facility.test_address_id)
    .bind(&facility.live_address_id)
    .execute(pool)
    .await?;

    Ok(())
}
