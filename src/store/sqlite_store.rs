use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, Row, Transaction};
use tracing::info;

use crate::notifications::{CandidateNotification, Notification, NotificationStore, NotificationType};
use crate::preferences::{AccountRole, PreferenceCategory, PreferenceRecord, PreferenceStore};
use crate::sqlite_column;
use crate::sqlite_persistence::{
    open_versioned, Column, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};

/// V 0
///
/// user_id references the platform's externally-owned account table, so no
/// foreign key is declared here.
const NOTIFICATION_TABLE_V_0: Table = Table {
    name: "notification",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!("type", &SqlType::Text, non_null = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("message", &SqlType::Text, non_null = true),
        sqlite_column!("metadata", &SqlType::Text),
        sqlite_column!("is_read", &SqlType::Integer, non_null = true, default_value = Some("0")),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_notification_user_id", "user_id")],
    unique_constraints: &[],
};
const NOTIFICATION_SETTINGS_TABLE_V_0: Table = Table {
    name: "notification_settings",
    columns: &[
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!("role", &SqlType::Text, non_null = true),
        sqlite_column!("all_notifications", &SqlType::Integer, non_null = true),
        sqlite_column!("settings", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_notification_settings_user_id", "user_id")],
    unique_constraints: &[&["user_id", "role"]],
};

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[NOTIFICATION_TABLE_V_0, NOTIFICATION_SETTINGS_TABLE_V_0],
    migration: None,
}];

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open database at {:?}", db_path.as_ref()))?;
        open_versioned(&conn, VERSIONED_SCHEMAS)?;
        info!("Notification database ready at {:?}", db_path.as_ref());

        Ok(SqliteStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

const NOTIFICATION_COLUMNS: &str = "id, user_id, type, title, message, metadata, is_read, created";

fn read_notification(row: &Row<'_>) -> Result<Notification> {
    let raw_kind: String = row.get(2)?;
    let kind = NotificationType::from_str(&raw_kind)
        .ok_or_else(|| anyhow!("Unknown notification type in database: {}", raw_kind))?;

    let metadata = row
        .get::<_, Option<String>>(5)?
        .map(|raw| serde_json::from_str(&raw).context("Invalid metadata document"))
        .transpose()?;

    Ok(Notification {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind,
        title: row.get(3)?,
        message: row.get(4)?,
        metadata,
        is_read: row.get::<_, i64>(6)? != 0,
        created_at: row.get(7)?,
    })
}

fn insert_in_tx(tx: &Transaction<'_>, candidate: &CandidateNotification) -> Result<Notification> {
    let metadata = candidate
        .metadata
        .as_ref()
        .map(|value| value.to_string());

    tx.execute(
        &format!(
            "INSERT INTO {} (user_id, type, title, message, metadata) VALUES (?1, ?2, ?3, ?4, ?5)",
            NOTIFICATION_TABLE_V_0.name
        ),
        params![
            candidate.user_id,
            candidate.kind.as_str(),
            candidate.title,
            candidate.message,
            metadata
        ],
    )
    .with_context(|| {
        format!(
            "Failed to insert {} notification for user {}",
            candidate.kind.as_str(),
            candidate.user_id
        )
    })?;

    // Read the row back so the caller gets the db-assigned id and timestamp
    let id = tx.last_insert_rowid();
    let mut stmt = tx.prepare(&format!(
        "SELECT {} FROM {} WHERE id = ?1",
        NOTIFICATION_COLUMNS, NOTIFICATION_TABLE_V_0.name
    ))?;
    let mut rows = stmt.query(params![id])?;
    let row = rows
        .next()?
        .context("Inserted notification row is missing")?;
    read_notification(row)
}

impl NotificationStore for SqliteStore {
    fn insert_notification(&self, candidate: &CandidateNotification) -> Result<Notification> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let notification = insert_in_tx(&tx, candidate)?;
        tx.commit()?;
        Ok(notification)
    }

    fn insert_notifications(
        &self,
        candidates: &[CandidateNotification],
    ) -> Result<Vec<Notification>> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let mut notifications = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            notifications.push(insert_in_tx(&tx, candidate)?);
        }
        tx.commit()?;
        Ok(notifications)
    }

    fn list_notifications(&self, user_id: usize, unread_only: bool) -> Result<Vec<Notification>> {
        let conn = self.conn.lock().unwrap();
        let mut sql = format!(
            "SELECT {} FROM {} WHERE user_id = ?1",
            NOTIFICATION_COLUMNS, NOTIFICATION_TABLE_V_0.name
        );
        if unread_only {
            sql.push_str(" AND is_read = 0");
        }
        sql.push_str(" ORDER BY created DESC, id DESC");

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params![user_id])?;
        let mut notifications = Vec::new();
        while let Some(row) = rows.next()? {
            notifications.push(read_notification(row)?);
        }
        Ok(notifications)
    }

    fn mark_notification_read(&self, id: i64, user_id: usize) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            &format!(
                "UPDATE {} SET is_read = 1 WHERE id = ?1 AND user_id = ?2",
                NOTIFICATION_TABLE_V_0.name
            ),
            params![id, user_id],
        )?;
        Ok(updated > 0)
    }

    fn mark_all_notifications_read(&self, user_id: usize) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        Ok(conn.execute(
            &format!(
                "UPDATE {} SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
                NOTIFICATION_TABLE_V_0.name
            ),
            params![user_id],
        )?)
    }

    fn delete_notification(&self, id: i64, user_id: usize) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            &format!(
                "DELETE FROM {} WHERE id = ?1 AND user_id = ?2",
                NOTIFICATION_TABLE_V_0.name
            ),
            params![id, user_id],
        )?;
        Ok(deleted > 0)
    }

    fn delete_all_notifications(&self, user_id: usize) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        Ok(conn.execute(
            &format!(
                "DELETE FROM {} WHERE user_id = ?1",
                NOTIFICATION_TABLE_V_0.name
            ),
            params![user_id],
        )?)
    }

    fn delete_by_job_reference(&self, job_post_id: i64) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        Ok(conn.execute(
            &format!(
                "DELETE FROM {}
                 WHERE json_extract(metadata, '$.job_post_id') = ?1
                   AND type IN ('APPLICATION_STATUS_UPDATE', 'EMP_APPLICATION_RECEIVED')",
                NOTIFICATION_TABLE_V_0.name
            ),
            params![job_post_id],
        )?)
    }

    fn delete_by_inquiry_or_report_reference(&self, target_id: i64) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        Ok(conn.execute(
            &format!(
                "DELETE FROM {}
                 WHERE (json_extract(metadata, '$.inquiry_id') = ?1
                     OR json_extract(metadata, '$.report_id') = ?1)
                   AND type IN ('ADMIN_INQUIRY_CREATED', 'ADMIN_REPORT_CREATED', 'INQUIRY_REPORT_ANSWERED')",
                NOTIFICATION_TABLE_V_0.name
            ),
            params![target_id],
        )?)
    }

    fn prune_read_notifications(&self, cutoff: i64) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        Ok(conn.execute(
            &format!(
                "DELETE FROM {} WHERE is_read = 1 AND created < ?1",
                NOTIFICATION_TABLE_V_0.name
            ),
            params![cutoff],
        )?)
    }
}

impl PreferenceStore for SqliteStore {
    fn get_preferences(
        &self,
        user_id: usize,
        role: AccountRole,
    ) -> Result<Option<PreferenceRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT all_notifications, settings FROM {} WHERE user_id = ?1 AND role = ?2",
            NOTIFICATION_SETTINGS_TABLE_V_0.name
        ))?;

        let row = stmt
            .query_row(params![user_id, role.as_str()], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;

        let Some((all_notifications, raw_settings)) = row else {
            return Ok(None);
        };

        let categories: BTreeMap<PreferenceCategory, bool> =
            serde_json::from_str(&raw_settings).context("Invalid settings document")?;

        Ok(Some(PreferenceRecord {
            user_id,
            role,
            all_notifications: all_notifications != 0,
            categories,
        }))
    }

    fn upsert_preferences(&self, record: &PreferenceRecord) -> Result<()> {
        let settings = serde_json::to_string(&record.categories)?;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} (user_id, role, all_notifications, settings)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id, role) DO UPDATE SET
                    all_notifications = excluded.all_notifications,
                    settings = excluded.settings",
                NOTIFICATION_SETTINGS_TABLE_V_0.name
            ),
            params![
                record.user_id,
                record.role.as_str(),
                record.all_notifications as i64,
                settings
            ],
        )
        .with_context(|| {
            format!(
                "Failed to upsert {} preferences for user {}",
                record.role.as_str(),
                record.user_id
            )
        })?;
        Ok(())
    }
}
