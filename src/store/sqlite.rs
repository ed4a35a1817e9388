//! SQLite listing store.
//!
//! One `listings` table keyed by URL. Exit marking is a single conditional
//! `UPDATE`, which is what keeps `date_exited` from ever being overwritten.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};

use super::ListingStore;
use crate::error::{StoreError, StoreResult};
use crate::listing::Listing;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS listings (
    url TEXT PRIMARY KEY,
    brand TEXT,
    model TEXT,
    year INTEGER,
    body_style TEXT,
    passengers INTEGER,
    fuel_type TEXT,
    transmission TEXT,
    condition TEXT,
    exterior_color TEXT,
    interior_color TEXT,
    doors INTEGER,
    province TEXT,
    battery_range_km INTEGER,
    battery_capacity TEXT,
    price_colones INTEGER,
    price_dollars INTEGER,
    negotiable INTEGER,
    taxes_paid INTEGER,
    accepts_trade_in INTEGER,
    engine_displacement TEXT,
    mileage_km INTEGER,
    date_entered TEXT,
    date_exited TEXT
);

-- Liveness pass reads the unexited set
CREATE INDEX IF NOT EXISTS idx_listings_date_exited ON listings(date_exited);
"#;

const INSERT_SQL: &str = r#"
INSERT INTO listings (
    url, brand, model, year, body_style, passengers, fuel_type,
    transmission, condition, exterior_color, interior_color, doors,
    province, battery_range_km, battery_capacity, price_colones,
    price_dollars, negotiable, taxes_paid, accepts_trade_in,
    engine_displacement, mileage_km, date_entered, date_exited
) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

/// Listing store on a local SQLite file in WAL mode.
#[derive(Clone, Debug)]
pub struct SqliteListingStore {
    pool: SqlitePool,
}

impl SqliteListingStore {
    /// Open the database at `path`, creating file and schema if missing.
    pub async fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Open(format!("{}: {e}", parent.display())))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        sqlx::query(SCHEMA_SQL).execute(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn parse_date(url: &str, column: &str, value: Option<String>) -> StoreResult<Option<NaiveDate>> {
    value
        .map(|text| {
            NaiveDate::parse_from_str(&text, "%Y-%m-%d").map_err(|e| StoreError::Corrupt {
                url: url.to_string(),
                message: format!("{column} = {text:?}: {e}"),
            })
        })
        .transpose()
}

fn narrow<T: TryFrom<i64>>(url: &str, column: &str, value: Option<i64>) -> StoreResult<Option<T>> {
    value
        .map(|v| {
            T::try_from(v).map_err(|_| StoreError::Corrupt {
                url: url.to_string(),
                message: format!("{column} = {v} is out of range"),
            })
        })
        .transpose()
}

fn listing_from_row(row: &SqliteRow) -> StoreResult<Listing> {
    let url: String = row.try_get("url")?;
    Ok(Listing {
        brand: row.try_get("brand")?,
        model: row.try_get("model")?,
        year: narrow(&url, "year", row.try_get("year")?)?,
        body_style: row.try_get("body_style")?,
        passengers: narrow(&url, "passengers", row.try_get("passengers")?)?,
        fuel_type: row.try_get("fuel_type")?,
        transmission: row.try_get("transmission")?,
        condition: row.try_get("condition")?,
        exterior_color: row.try_get("exterior_color")?,
        interior_color: row.try_get("interior_color")?,
        doors: narrow(&url, "doors", row.try_get("doors")?)?,
        province: row.try_get("province")?,
        battery_range_km: row.try_get("battery_range_km")?,
        battery_capacity: row.try_get("battery_capacity")?,
        price_colones: row.try_get("price_colones")?,
        price_dollars: row.try_get("price_dollars")?,
        negotiable: row.try_get("negotiable")?,
        taxes_paid: row.try_get("taxes_paid")?,
        accepts_trade_in: row.try_get("accepts_trade_in")?,
        engine_displacement: row.try_get("engine_displacement")?,
        mileage_km: row.try_get("mileage_km")?,
        date_entered: parse_date(&url, "date_entered", row.try_get("date_entered")?)?,
        date_exited: parse_date(&url, "date_exited", row.try_get("date_exited")?)?,
        url,
    })
}

#[async_trait]
impl ListingStore for SqliteListingStore {
    async fn list_all_urls(&self) -> StoreResult<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT url FROM listings")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(url,)| url).collect())
    }

    async fn list_unexited_urls(&self) -> StoreResult<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT url FROM listings WHERE date_exited IS NULL")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(url,)| url).collect())
    }

    async fn exists(&self, url: &str) -> StoreResult<bool> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM listings WHERE url = ?")
            .bind(url)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn fetch(&self, url: &str) -> StoreResult<Option<Listing>> {
        let row = sqlx::query("SELECT * FROM listings WHERE url = ?")
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(listing_from_row).transpose()
    }

    async fn insert(&self, listing: &Listing) -> StoreResult<()> {
        sqlx::query(INSERT_SQL)
            .bind(&listing.url)
            .bind(&listing.brand)
            .bind(&listing.model)
            .bind(listing.year.map(i64::from))
            .bind(&listing.body_style)
            .bind(listing.passengers.map(i64::from))
            .bind(&listing.fuel_type)
            .bind(&listing.transmission)
            .bind(&listing.condition)
            .bind(&listing.exterior_color)
            .bind(&listing.interior_color)
            .bind(listing.doors.map(i64::from))
            .bind(&listing.province)
            .bind(listing.battery_range_km)
            .bind(&listing.battery_capacity)
            .bind(listing.price_colones)
            .bind(listing.price_dollars)
            .bind(listing.negotiable)
            .bind(listing.taxes_paid)
            .bind(listing.accepts_trade_in)
            .bind(&listing.engine_displacement)
            .bind(listing.mileage_km)
            .bind(listing.date_entered.map(|d| d.to_string()))
            .bind(listing.date_exited.map(|d| d.to_string()))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_exited(&self, url: &str, date: NaiveDate) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE listings SET date_exited = ? WHERE url = ? AND date_exited IS NULL")
                .bind(date.to_string())
                .bind(url)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
