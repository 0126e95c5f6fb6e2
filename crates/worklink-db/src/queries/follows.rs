use crate::models::UserSummaryRow;
use crate::queries::users::map_summary;
use crate::{now_rfc3339, Database};
use anyhow::Result;

impl Database {
    pub fn follow_exists(&self, follower_id: &str, following_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM follows WHERE follower_id = ?1 AND following_id = ?2",
                [follower_id, following_id],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    pub fn create_follow(&self, id: &str, follower_id: &str, following_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO follows (id, follower_id, following_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, follower_id, following_id, now_rfc3339()],
            )?;
            Ok(())
        })
    }

    /// Remove the edge; false when no edge existed.
    pub fn delete_follow(&self, follower_id: &str, following_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND following_id = ?2",
                [follower_id, following_id],
            )?;
            Ok(affected > 0)
        })
    }

    pub fn list_followers(&self, user_id: &str) -> Result<Vec<UserSummaryRow>> {
        self.with_conn(|conn| {
            let rows = conn
                .prepare(
                    "SELECT u.id, u.first_name, u.last_name, u.email, p.role
                     FROM follows f
                     JOIN users u ON u.id = f.follower_id
                     JOIN profiles p ON p.user_id = u.id
                     WHERE f.following_id = ?1
                     ORDER BY f.created_at DESC",
                )?
                .query_map([user_id], map_summary)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_following(&self, user_id: &str) -> Result<Vec<UserSummaryRow>> {
        self.with_conn(|conn| {
            let rows = conn
                .prepare(
                    "SELECT u.id, u.first_name, u.last_name, u.email, p.role
                     FROM follows f
                     JOIN users u ON u.id = f.following_id
                     JOIN profiles p ON p.user_id = u.id
                     WHERE f.follower_id = ?1
                     ORDER BY f.created_at DESC",
                )?
                .query_map([user_id], map_summary)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// (followers, following) counts.
    pub fn follow_counts(&self, user_id: &str) -> Result<(u64, u64)> {
        self.with_conn(|conn| {
            let followers: i64 = conn.query_row(
                "SELECT COUNT(*) FROM follows WHERE following_id = ?1",
                [user_id],
                |row| row.get(0),
            )?;
            let following: i64 = conn.query_row(
                "SELECT COUNT(*) FROM follows WHERE follower_id = ?1",
                [user_id],
                |row| row.get(0),
            )?;
            Ok((followers as u64, following as u64))
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::Database;

    fn seeded() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "a@x.com", "h", "A", "One", "employee", None)
            .unwrap();
        db.create_user("u2", "b@x.com", "h", "B", "Two", "employer", None)
            .unwrap();
        db
    }

    #[test]
    fn edge_is_unique() {
        let db = seeded();
        db.create_follow("f1", "u1", "u2").unwrap();
        assert!(db.create_follow("f2", "u1", "u2").is_err());
        assert!(db.follow_exists("u1", "u2").unwrap());
        // direction matters
        assert!(!db.follow_exists("u2", "u1").unwrap());
    }

    #[test]
    fn unfollow_removes_edge_once() {
        let db = seeded();
        db.create_follow("f1", "u1", "u2").unwrap();
        assert!(db.delete_follow("u1", "u2").unwrap());
        assert!(!db.delete_follow("u1", "u2").unwrap());
    }

    #[test]
    fn counts_and_lists() {
        let db = seeded();
        db.create_follow("f1", "u1", "u2").unwrap();

        let (followers, following) = db.follow_counts("u2").unwrap();
        assert_eq!((followers, following), (1, 0));

        let followers = db.list_followers("u2").unwrap();
        assert_eq!(followers.len(), 1);
        assert_eq!(followers[0].id, "u1");
        assert_eq!(followers[0].role, "employee");

        assert_eq!(db.list_following("u1").unwrap().len(), 1);
    }
}
