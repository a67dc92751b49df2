//! [`SqliteStore`]: the SQLite implementation of [`DeliveryStore`].

use std::{path::Path, time::Duration};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::OptionalExtension as _;

use mealpass_core::{
  delivery::{DeliveryRecord, InsertOutcome, NewDelivery},
  person::{Person, PersonCategory},
  store::DeliveryStore,
  user::{Role, UserAccount},
  window::AccessConfig,
};

use crate::{
  Result,
  encode::{RawDelivery, RawPerson, RawUser, encode_date, encode_dt},
  schema::SCHEMA,
};

/// How long a writer waits on another connection's lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const PERSON_COLUMNS: &str =
  "id, full_name, email, category, active, valid_from, valid_to";

const DELIVERY_COLUMNS: &str =
  "id, person_id, date, meal_type, created_at, created_by_user_id";

fn person_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawPerson> {
  Ok(RawPerson {
    id:         row.get(0)?,
    full_name:  row.get(1)?,
    email:      row.get(2)?,
    category:   row.get(3)?,
    active:     row.get(4)?,
    valid_from: row.get(5)?,
    valid_to:   row.get(6)?,
  })
}

fn delivery_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawDelivery> {
  Ok(RawDelivery {
    id:                 row.get(0)?,
    person_id:          row.get(1)?,
    date:               row.get(2)?,
    meal_type:          row.get(3)?,
    created_at:         row.get(4)?,
    created_by_user_id: row.get(5)?,
  })
}

/// What the conditional insert found inside the connection thread.
enum InsertAttempt {
  Inserted(i64),
  Existing(RawDelivery),
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _)
      if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

// ─── Seeding input ───────────────────────────────────────────────────────────

/// Input to [`SqliteStore::add_person`].
#[derive(Debug, Clone)]
pub struct NewPerson {
  pub full_name:  String,
  pub email:      Option<String>,
  pub category:   PersonCategory,
  pub active:     bool,
  pub valid_from: Option<NaiveDate>,
  pub valid_to:   Option<NaiveDate>,
}

impl NewPerson {
  /// An active, open-ended staff member.
  pub fn new(full_name: impl Into<String>) -> Self {
    Self {
      full_name:  full_name.into(),
      email:      None,
      category:   PersonCategory::Staff,
      active:     true,
      valid_from: None,
      valid_to:   None,
    }
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A record store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. Several
/// stores (or processes) may open the same file; the `(person_id, date)`
/// constraint holds across all of them.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open the database file at `path`, creating it and its tables if needed.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let conn = tokio_rusqlite::Connection::open(path).await?;
    tracing::debug!(path = %path.display(), "opened sqlite store");
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Administrative writes ─────────────────────────────────────────────
  //
  // Record management lives outside this service; these exist so operators
  // and tests can seed a database.

  /// Insert a staff account. `password_hash` must be an argon2 PHC string.
  pub async fn add_user(
    &self,
    username:      &str,
    password_hash: &str,
    role:          Role,
    active:        bool,
  ) -> Result<UserAccount> {
    let username_owned = username.to_owned();
    let hash_owned     = password_hash.to_owned();
    let role_str       = role.as_str();
    let created_at     = encode_dt(Utc::now());

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (username, password_hash, role, active, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![username_owned, hash_owned, role_str, active, created_at],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(UserAccount {
      id,
      username: username.to_owned(),
      password_hash: password_hash.to_owned(),
      role,
      active,
      last_login_at: None,
    })
  }

  pub async fn add_person(&self, input: NewPerson) -> Result<Person> {
    let full_name  = input.full_name.clone();
    let email      = input.email.clone();
    let category   = input.category.as_str();
    let active     = input.active;
    let valid_from = input.valid_from.map(encode_date);
    let valid_to   = input.valid_to.map(encode_date);

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO persons (full_name, email, category, active, valid_from, valid_to)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![full_name, email, category, active, valid_from, valid_to],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Person {
      id,
      full_name:  input.full_name,
      email:      input.email,
      category:   input.category,
      active:     input.active,
      valid_from: input.valid_from,
      valid_to:   input.valid_to,
    })
  }

  /// Replace the access configuration row.
  pub async fn set_access_config(&self, config: &AccessConfig) -> Result<()> {
    let config = config.clone();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO access_config
             (id, window_start, window_end, closed_message, fallback_notify_address)
           VALUES (1, ?1, ?2, ?3, ?4)
           ON CONFLICT (id) DO UPDATE SET
             window_start            = excluded.window_start,
             window_end              = excluded.window_end,
             closed_message          = excluded.closed_message,
             fallback_notify_address = excluded.fallback_notify_address",
          rusqlite::params![
            config.window_start,
            config.window_end,
            config.closed_message,
            config.fallback_notify_address,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── DeliveryStore impl ──────────────────────────────────────────────────────

impl DeliveryStore for SqliteStore {
  type Error = crate::Error;

  // ── Users ─────────────────────────────────────────────────────────────

  async fn find_user(&self, username: &str) -> Result<Option<UserAccount>> {
    let username = username.to_owned();

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT id, username, password_hash, role, active, last_login_at
             FROM users WHERE username = ?1",
            rusqlite::params![username],
            |row| {
              Ok(RawUser {
                id:            row.get(0)?,
                username:      row.get(1)?,
                password_hash: row.get(2)?,
                role:          row.get(3)?,
                active:        row.get(4)?,
                last_login_at: row.get(5)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn record_login(&self, user_id: i64, at: DateTime<Utc>) -> Result<()> {
    let at_str = encode_dt(at);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE users SET last_login_at = ?1 WHERE id = ?2",
          rusqlite::params![at_str, user_id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Persons ───────────────────────────────────────────────────────────

  async fn get_person(&self, id: i64) -> Result<Option<Person>> {
    let raw: Option<RawPerson> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {PERSON_COLUMNS} FROM persons WHERE id = ?1"),
            rusqlite::params![id],
            person_from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawPerson::into_person).transpose()
  }

  async fn list_persons(&self) -> Result<Vec<Person>> {
    let raws: Vec<RawPerson> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PERSON_COLUMNS} FROM persons ORDER BY full_name COLLATE NOCASE, id"
        ))?;
        let rows = stmt
          .query_map([], person_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPerson::into_person).collect()
  }

  // ── Configuration ─────────────────────────────────────────────────────

  async fn access_config(&self) -> Result<AccessConfig> {
    let config: Option<AccessConfig> = self
      .conn
      .call(|conn| {
        Ok(conn
          .query_row(
            "SELECT window_start, window_end, closed_message, fallback_notify_address
             FROM access_config WHERE id = 1",
            [],
            |row| {
              Ok(AccessConfig {
                window_start:            row.get(0)?,
                window_end:              row.get(1)?,
                closed_message:          row.get(2)?,
                fallback_notify_address: row.get(3)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    Ok(config.unwrap_or_default())
  }

  // ── Deliveries ────────────────────────────────────────────────────────

  async fn insert_delivery(&self, input: NewDelivery) -> Result<InsertOutcome> {
    let date_str       = encode_date(input.date);
    let created_at_str = encode_dt(input.created_at);
    let meal_type      = input.meal_type.clone();

    let attempt = self
      .conn
      .call(move |conn| {
        let result = conn.execute(
          "INSERT INTO deliveries (person_id, date, meal_type, created_at, created_by_user_id)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            input.person_id,
            date_str,
            meal_type,
            created_at_str,
            input.created_by_user_id,
          ],
        );
        match result {
          Ok(_) => Ok(InsertAttempt::Inserted(conn.last_insert_rowid())),
          // The constraint has decided; read back the row that won.
          Err(e) if is_unique_violation(&e) => {
            let existing = conn.query_row(
              &format!(
                "SELECT {DELIVERY_COLUMNS} FROM deliveries WHERE person_id = ?1 AND date = ?2"
              ),
              rusqlite::params![input.person_id, date_str],
              delivery_from_row,
            )?;
            Ok(InsertAttempt::Existing(existing))
          }
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    Ok(match attempt {
      InsertAttempt::Inserted(id) => InsertOutcome::Inserted(DeliveryRecord {
        id,
        person_id:          input.person_id,
        date:               input.date,
        meal_type:          input.meal_type,
        created_at:         input.created_at,
        created_by_user_id: input.created_by_user_id,
      }),
      InsertAttempt::Existing(raw) => InsertOutcome::AlreadyRegistered(raw.into_record()?),
    })
  }

  async fn deliveries_on(&self, date: NaiveDate) -> Result<Vec<DeliveryRecord>> {
    let date_str = encode_date(date);

    let raws: Vec<RawDelivery> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {DELIVERY_COLUMNS} FROM deliveries WHERE date = ?1 ORDER BY created_at, id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![date_str], delivery_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDelivery::into_record).collect()
  }
}
