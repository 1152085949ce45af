// SQLite cookie jar.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::session::Cookie;

/// SQLite-backed cookie storage. Expired cookies are never returned.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure the schema
    /// exists. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS cookies (
                name         TEXT NOT NULL,
                path         TEXT NOT NULL,
                value        TEXT NOT NULL,
                max_age_secs INTEGER NOT NULL,
                created_at   TEXT NOT NULL,
                expires_at   TEXT NOT NULL,
                PRIMARY KEY (name, path)
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Store a cookie, replacing any cookie with the same name and path.
    pub fn set_cookie(&self, cookie: &Cookie) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT OR REPLACE INTO cookies
                (name, path, value, max_age_secs, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                cookie.name,
                cookie.path,
                cookie.value,
                cookie.max_age_secs,
                timestamp(cookie.created_at),
                timestamp(cookie.expires_at()),
            ],
        )
        .context("failed to store cookie")?;
        Ok(())
    }

    /// Load the cookie `name` stored for exactly `path`, unless it has
    /// expired by `now`.
    pub fn cookie(&self, name: &str, path: &str, now: DateTime<Utc>) -> Result<Option<Cookie>> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT name, path, value, max_age_secs, created_at
                 FROM cookies WHERE name = ?1 AND path = ?2",
                params![name, path],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()
            .context("failed to query cookie")?;

        let Some((name, path, value, max_age_secs, created_at)) = row else {
            return Ok(None);
        };

        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .with_context(|| format!("invalid created_at for cookie {name}: {created_at}"))?
            .with_timezone(&Utc);

        let cookie = Cookie {
            name,
            value,
            path,
            max_age_secs,
            created_at,
        };

        if cookie.is_expired(now) {
            return Ok(None);
        }
        Ok(Some(cookie))
    }

    /// All unexpired cookies that apply to `request_path`, as a `Cookie`
    /// header value (`a=1; b=2`). `None` when nothing applies.
    pub fn cookie_header(&self, request_path: &str, now: DateTime<Utc>) -> Result<Option<String>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT name, path, value
                 FROM cookies WHERE expires_at > ?1 ORDER BY length(path) DESC, name",
            )
            .context("failed to prepare cookie_header query")?;

        let rows = stmt
            .query_map(params![timestamp(now)], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .context("failed to query cookies")?;

        let mut pairs = Vec::new();
        for row in rows {
            let (name, path, value) = row.context("failed to read cookie row")?;
            let cookie = Cookie {
                name,
                value,
                path,
                max_age_secs: 0,
                created_at: now,
            };
            if cookie.matches_path(request_path) {
                pairs.push(cookie.header_pair());
            }
        }

        if pairs.is_empty() {
            Ok(None)
        } else {
            Ok(Some(pairs.join("; ")))
        }
    }

    /// Delete expired cookies. Returns the number of rows removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn();
        let removed = conn
            .execute(
                "DELETE FROM cookies WHERE expires_at <= ?1",
                params![timestamp(now)],
            )
            .context("failed to purge expired cookies")?;
        Ok(removed)
    }
}

/// Fixed-width UTC timestamps so `expires_at` compares correctly as text.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
