use crate::models::MediaFileRow;
use crate::{now_rfc3339, Database};
use anyhow::Result;
use rusqlite::OptionalExtension;

impl Database {
    pub fn insert_media_file(&self, id: &str, owner_id: &str, size: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO media_files (id, owner_id, size, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, owner_id, size, now_rfc3339()],
            )?;
            Ok(())
        })
    }

    pub fn get_media_file(&self, id: &str) -> Result<Option<MediaFileRow>> {
        self.with_conn(|conn| {
            let row = conn
                .prepare("SELECT id, owner_id, size, created_at FROM media_files WHERE id = ?1")?
                .query_row([id], |row| {
                    Ok(MediaFileRow {
                        id: row.get(0)?,
                        owner_id: row.get(1)?,
                        size: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })
                .optional()?;
            Ok(row)
        })
    }
}
