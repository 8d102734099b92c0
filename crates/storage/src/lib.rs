use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use skyserve_core::{NewBooking, NotificationSettings, PaymentMethod, StoredBooking};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

pub trait BookingRepository: Send + Sync {
    async fn insert_booking(&self, booking: NewBooking) -> Result<StoredBooking>;
    /// Newest first.
    async fn list_bookings(&self, user_id: &str) -> Result<Vec<StoredBooking>>;
}

pub trait NotificationSettingsRepository: Send + Sync {
    /// Defaults when the user has never saved settings.
    async fn load_settings(&self, user_id: &str) -> Result<NotificationSettings>;
    async fn save_settings(&self, user_id: &str, settings: NotificationSettings) -> Result<()>;
}

fn stamp(booking: NewBooking) -> StoredBooking {
    StoredBooking {
        id: Uuid::new_v4().to_string(),
        created_at: Utc::now(),
        booking,
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    bookings: Arc<RwLock<HashMap<String, Vec<StoredBooking>>>>,
    settings: Arc<RwLock<HashMap<String, NotificationSettings>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BookingRepository for MemoryStore {
    async fn insert_booking(&self, booking: NewBooking) -> Result<StoredBooking> {
        let stored = stamp(booking);
        self.bookings
            .write()
            .entry(stored.booking.user_id.clone())
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }

    async fn list_bookings(&self, user_id: &str) -> Result<Vec<StoredBooking>> {
        let bookings = self
            .bookings
            .read()
            .get(user_id)
            .map(|rows| rows.iter().rev().cloned().collect())
            .unwrap_or_default();
        Ok(bookings)
    }
}

impl NotificationSettingsRepository for MemoryStore {
    async fn load_settings(&self, user_id: &str) -> Result<NotificationSettings> {
        Ok(self
            .settings
            .read()
            .get(user_id)
            .copied()
            .unwrap_or_default())
    }

    async fn save_settings(&self, user_id: &str, settings: NotificationSettings) -> Result<()> {
        self.settings.write().insert(user_id.to_string(), settings);
        Ok(())
    }
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .with_context(|| format!("failed connecting to sqlite at {}", database_url))?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bookings (
              id TEXT PRIMARY KEY,
              user_id TEXT NOT NULL,
              flight_id TEXT NOT NULL,
              passenger_name TEXT NOT NULL,
              passenger_email TEXT NOT NULL,
              passenger_phone TEXT NOT NULL,
              special_assistance TEXT,
              payment_method TEXT NOT NULL,
              payment_status TEXT NOT NULL,
              total_amount INTEGER NOT NULL,
              booking_reference TEXT NOT NULL,
              created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS notification_settings (
              user_id TEXT PRIMARY KEY,
              email_enabled INTEGER NOT NULL,
              whatsapp_enabled INTEGER NOT NULL,
              sms_enabled INTEGER NOT NULL,
              web_enabled INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(name)
        .with_context(|| format!("failed reading column {name}"))
}

fn booking_from_row(row: &SqliteRow) -> Result<StoredBooking> {
    let id: String = column(row, "id")?;
    let method: String = column(row, "payment_method")?;
    let created_at: String = column(row, "created_at")?;

    let payment_method = PaymentMethod::parse(&method)
        .ok_or_else(|| anyhow!("booking {id} has unknown payment method {method:?}"))?;
    let created_at = created_at
        .parse::<DateTime<Utc>>()
        .with_context(|| format!("booking {id} has invalid created_at {created_at:?}"))?;

    Ok(StoredBooking {
        created_at,
        booking: NewBooking {
            user_id: column(row, "user_id")?,
            flight_id: column(row, "flight_id")?,
            passenger_name: column(row, "passenger_name")?,
            passenger_email: column(row, "passenger_email")?,
            passenger_phone: column(row, "passenger_phone")?,
            special_assistance: column(row, "special_assistance")?,
            payment_method,
            payment_status: column(row, "payment_status")?,
            total_amount: column(row, "total_amount")?,
            booking_reference: column(row, "booking_reference")?,
        },
        id,
    })
}

impl BookingRepository for SqliteStore {
    async fn insert_booking(&self, booking: NewBooking) -> Result<StoredBooking> {
        let stored = stamp(booking);
        let row = &stored.booking;

        sqlx::query(
            r#"
            INSERT INTO bookings (
              id, user_id, flight_id, passenger_name, passenger_email, passenger_phone,
              special_assistance, payment_method, payment_status, total_amount,
              booking_reference, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&stored.id)
        .bind(&row.user_id)
        .bind(&row.flight_id)
        .bind(&row.passenger_name)
        .bind(&row.passenger_email)
        .bind(&row.passenger_phone)
        .bind(&row.special_assistance)
        .bind(row.payment_method.as_code())
        .bind(&row.payment_status)
        .bind(row.total_amount)
        .bind(&row.booking_reference)
        .bind(stored.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("failed inserting booking")?;

        debug!(booking_reference = %row.booking_reference, "booking row inserted");
        Ok(stored)
    }

    async fn list_bookings(&self, user_id: &str) -> Result<Vec<StoredBooking>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, flight_id, passenger_name, passenger_email, passenger_phone,
                   special_assistance, payment_method, payment_status, total_amount,
                   booking_reference, created_at
            FROM bookings
            WHERE user_id = ?1
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(booking_from_row).collect()
    }
}

impl NotificationSettingsRepository for SqliteStore {
    async fn load_settings(&self, user_id: &str) -> Result<NotificationSettings> {
        let row = sqlx::query(
            r#"
            SELECT email_enabled, whatsapp_enabled, sms_enabled, web_enabled
            FROM notification_settings
            WHERE user_id = ?1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(NotificationSettings::default());
        };

        Ok(NotificationSettings {
            email_enabled: column(&row, "email_enabled")?,
            whatsapp_enabled: column(&row, "whatsapp_enabled")?,
            sms_enabled: column(&row, "sms_enabled")?,
            web_enabled: column(&row, "web_enabled")?,
        })
    }

    async fn save_settings(&self, user_id: &str, settings: NotificationSettings) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notification_settings (
              user_id, email_enabled, whatsapp_enabled, sms_enabled, web_enabled
            )
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(user_id) DO UPDATE SET
              email_enabled=excluded.email_enabled,
              whatsapp_enabled=excluded.whatsapp_enabled,
              sms_enabled=excluded.sms_enabled,
              web_enabled=excluded.web_enabled
            "#,
        )
        .bind(user_id)
        .bind(settings.email_enabled)
        .bind(settings.whatsapp_enabled)
        .bind(settings.sms_enabled)
        .bind(settings.web_enabled)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[derive(Clone)]
pub enum Store {
    Memory(MemoryStore),
    Sqlite(SqliteStore),
}

impl Store {
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    pub async fn sqlite(database_url: &str) -> Result<Self> {
        let sqlite = SqliteStore::connect(database_url).await?;
        Ok(Self::Sqlite(sqlite))
    }

    pub fn backend(&self) -> &'static str {
        match self {
            Store::Memory(_) => "memory",
            Store::Sqlite(_) => "sqlite",
        }
    }
}

impl BookingRepository for Store {
    async fn insert_booking(&self, booking: NewBooking) -> Result<StoredBooking> {
        match self {
            Store::Memory(store) => store.insert_booking(booking).await,
            Store::Sqlite(store) => store.insert_booking(booking).await,
        }
    }

    async fn list_bookings(&self, user_id: &str) -> Result<Vec<StoredBooking>> {
        match self {
            Store::Memory(store) => store.list_bookings(user_id).await,
            Store::Sqlite(store) => store.list_bookings(user_id).await,
        }
    }
}

impl NotificationSettingsRepository for Store {
    async fn load_settings(&self, user_id: &str) -> Result<NotificationSettings> {
        match self {
            Store::Memory(store) => store.load_settings(user_id).await,
            Store::Sqlite(store) => store.load_settings(user_id).await,
        }
    }

    async fn save_settings(&self, user_id: &str, settings: NotificationSettings) -> Result<()> {
        match self {
            Store::Memory(store) => store.save_settings(user_id, settings).await,
            Store::Sqlite(store) => store.save_settings(user_id, settings).await,
        }
    }
}
