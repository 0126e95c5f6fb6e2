use crate::models::{
    CommentListingRow, CommentRow, PostImageRow, PostListingRow, PostRow, UserSummaryRow,
};
use crate::{now_rfc3339, Database};
use anyhow::Result;
use rusqlite::types::Value;
use rusqlite::OptionalExtension;

/// Partial post update. `None` leaves the stored value untouched.
#[derive(Debug, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub post_type: Option<String>,
}

const LISTING_SELECT: &str = "
    SELECT po.id, po.author_id, po.title, po.content, po.post_type,
           po.likes_count, po.comments_count, po.is_active, po.created_at, po.updated_at,
           u.first_name, u.last_name, u.email, pr.role,
           EXISTS(SELECT 1 FROM post_likes pl WHERE pl.post_id = po.id AND pl.user_id = ?1)
    FROM posts po
    JOIN users u ON u.id = po.author_id
    JOIN profiles pr ON pr.user_id = po.author_id";

fn map_listing(row: &rusqlite::Row<'_>) -> rusqlite::Result<PostListingRow> {
    Ok(PostListingRow {
        post: PostRow {
            id: row.get(0)?,
            author_id: row.get(1)?,
            title: row.get(2)?,
            content: row.get(3)?,
            post_type: row.get(4)?,
            likes_count: row.get::<_, i64>(5)? as u64,
            comments_count: row.get::<_, i64>(6)? as u64,
            is_active: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        },
        author: UserSummaryRow {
            id: row.get(1)?,
            first_name: row.get(10)?,
            last_name: row.get(11)?,
            email: row.get(12)?,
            role: row.get(13)?,
        },
        is_liked: row.get(14)?,
    })
}

impl Database {
    /// Insert a post and its image rows in one transaction.
    pub fn create_post(
        &self,
        id: &str,
        author_id: &str,
        title: Option<&str>,
        content: Option<&str>,
        post_type: &str,
        images: &[(String, String)],
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let now = now_rfc3339();
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO posts (id, author_id, title, content, post_type,
                                    likes_count, comments_count, is_active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, 0, 1, ?6, ?6)",
                rusqlite::params![id, author_id, title, content, post_type, now],
            )?;
            for (image_id, url) in images {
                tx.execute(
                    "INSERT INTO post_images (id, post_id, url, created_at) VALUES (?1, ?2, ?3, ?4)",
                    rusqlite::params![image_id, id, url, now],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_post(&self, id: &str) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let row = conn
                .prepare(
                    "SELECT id, author_id, title, content, post_type, likes_count,
                            comments_count, is_active, created_at, updated_at
                     FROM posts WHERE id = ?1",
                )?
                .query_row([id], |row| {
                    Ok(PostRow {
                        id: row.get(0)?,
                        author_id: row.get(1)?,
                        title: row.get(2)?,
                        content: row.get(3)?,
                        post_type: row.get(4)?,
                        likes_count: row.get::<_, i64>(5)? as u64,
                        comments_count: row.get::<_, i64>(6)? as u64,
                        is_active: row.get(7)?,
                        created_at: row.get(8)?,
                        updated_at: row.get(9)?,
                    })
                })
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_post_listing(&self, id: &str, viewer_id: &str) -> Result<Option<PostListingRow>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE po.id = ?2 AND po.is_active = 1", LISTING_SELECT);
            let row = conn
                .prepare(&sql)?
                .query_row([viewer_id, id], map_listing)
                .optional()?;
            Ok(row)
        })
    }

    /// Feed: own posts plus posts by followed authors, newest first.
    pub fn list_feed(&self, viewer_id: &str, post_type: Option<&str>) -> Result<Vec<PostListingRow>> {
        self.with_conn(|conn| {
            let mut sql = format!(
                "{} WHERE po.is_active = 1 AND (po.author_id = ?1 OR po.author_id IN \
                 (SELECT following_id FROM follows WHERE follower_id = ?1))",
                LISTING_SELECT
            );
            let mut params: Vec<Value> = vec![Value::Text(viewer_id.to_string())];
            if let Some(kind) = post_type {
                sql.push_str(" AND po.post_type = ?2");
                params.push(Value::Text(kind.to_string()));
            }
            sql.push_str(" ORDER BY po.created_at DESC");

            let rows = conn
                .prepare(&sql)?
                .query_map(rusqlite::params_from_iter(params.iter()), map_listing)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_posts_by_author(
        &self,
        author_id: &str,
        viewer_id: &str,
        post_type: Option<&str>,
    ) -> Result<Vec<PostListingRow>> {
        self.with_conn(|conn| {
            let mut sql = format!(
                "{} WHERE po.is_active = 1 AND po.author_id = ?2",
                LISTING_SELECT
            );
            let mut params: Vec<Value> = vec![
                Value::Text(viewer_id.to_string()),
                Value::Text(author_id.to_string()),
            ];
            if let Some(kind) = post_type {
                sql.push_str(" AND po.post_type = ?3");
                params.push(Value::Text(kind.to_string()));
            }
            sql.push_str(" ORDER BY po.created_at DESC");

            let rows = conn
                .prepare(&sql)?
                .query_map(rusqlite::params_from_iter(params.iter()), map_listing)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_post(&self, id: &str, changes: &PostChanges) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE posts SET
                    title      = COALESCE(?2, title),
                    content    = COALESCE(?3, content),
                    post_type  = COALESCE(?4, post_type),
                    updated_at = ?5
                 WHERE id = ?1",
                rusqlite::params![id, changes.title, changes.content, changes.post_type, now_rfc3339()],
            )?;
            Ok(())
        })
    }

    /// Hard delete; images, likes and comments go with it via ON DELETE CASCADE.
    pub fn delete_post(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    /// Toggle a like: removes if present, inserts if not. The counter moves in
    /// the same transaction with a relative update, so it always equals the
    /// row count. Returns (is_liked, likes_count).
    pub fn toggle_like(&self, like_id: &str, post_id: &str, user_id: &str) -> Result<(bool, u64)> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let existing: Option<String> = tx
                .query_row(
                    "SELECT id FROM post_likes WHERE post_id = ?1 AND user_id = ?2",
                    [post_id, user_id],
                    |row| row.get(0),
                )
                .optional()?;

            let liked = if let Some(existing_id) = existing {
                tx.execute("DELETE FROM post_likes WHERE id = ?1", [&existing_id])?;
                tx.execute(
                    "UPDATE posts SET likes_count = MAX(likes_count - 1, 0) WHERE id = ?1",
                    [post_id],
                )?;
                false
            } else {
                tx.execute(
                    "INSERT INTO post_likes (id, post_id, user_id, created_at) VALUES (?1, ?2, ?3, ?4)",
                    rusqlite::params![like_id, post_id, user_id, now_rfc3339()],
                )?;
                tx.execute(
                    "UPDATE posts SET likes_count = likes_count + 1 WHERE id = ?1",
                    [post_id],
                )?;
                true
            };

            let count: i64 = tx.query_row(
                "SELECT likes_count FROM posts WHERE id = ?1",
                [post_id],
                |row| row.get(0),
            )?;

            tx.commit()?;
            Ok((liked, count as u64))
        })
    }

    /// Insert a comment and bump the counter atomically. Returns the new
    /// comments_count.
    pub fn create_comment(
        &self,
        id: &str,
        post_id: &str,
        author_id: &str,
        content: &str,
    ) -> Result<u64> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO post_comments (id, post_id, author_id, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, post_id, author_id, content, now_rfc3339()],
            )?;
            tx.execute(
                "UPDATE posts SET comments_count = comments_count + 1 WHERE id = ?1",
                [post_id],
            )?;
            let count: i64 = tx.query_row(
                "SELECT comments_count FROM posts WHERE id = ?1",
                [post_id],
                |row| row.get(0),
            )?;
            tx.commit()?;
            Ok(count as u64)
        })
    }

    pub fn list_comments(&self, post_id: &str) -> Result<Vec<CommentListingRow>> {
        self.with_conn(|conn| {
            let rows = conn
                .prepare(
                    "SELECT c.id, c.post_id, c.author_id, c.content, c.created_at,
                            u.first_name, u.last_name, u.email, p.role
                     FROM post_comments c
                     JOIN users u ON u.id = c.author_id
                     JOIN profiles p ON p.user_id = c.author_id
                     WHERE c.post_id = ?1
                     ORDER BY c.created_at ASC",
                )?
                .query_map([post_id], |row| {
                    Ok(CommentListingRow {
                        comment: CommentRow {
                            id: row.get(0)?,
                            post_id: row.get(1)?,
                            author_id: row.get(2)?,
                            content: row.get(3)?,
                            created_at: row.get(4)?,
                        },
                        author: UserSummaryRow {
                            id: row.get(2)?,
                            first_name: row.get(5)?,
                            last_name: row.get(6)?,
                            email: row.get(7)?,
                            role: row.get(8)?,
                        },
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_post_images(&self, post_id: &str) -> Result<Vec<PostImageRow>> {
        self.with_conn(|conn| {
            let rows = conn
                .prepare(
                    "SELECT id, post_id, url, created_at FROM post_images
                     WHERE post_id = ?1 ORDER BY created_at ASC",
                )?
                .query_map([post_id], map_image)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Batch-fetch images for a page of posts.
    pub fn get_images_for_posts(&self, post_ids: &[String]) -> Result<Vec<PostImageRow>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (1..=post_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT id, post_id, url, created_at FROM post_images
                 WHERE post_id IN ({}) ORDER BY created_at ASC",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = post_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), map_image)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_image(&self, id: &str) -> Result<Option<PostImageRow>> {
        self.with_conn(|conn| {
            let row = conn
                .prepare("SELECT id, post_id, url, created_at FROM post_images WHERE id = ?1")?
                .query_row([id], map_image)
                .optional()?;
            Ok(row)
        })
    }

    pub fn delete_image(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM post_images WHERE id = ?1", [id])?;
            Ok(())
        })
    }
}

fn map_image(row: &rusqlite::Row<'_>) -> rusqlite::Result<PostImageRow> {
    Ok(PostImageRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        url: row.get(2)?,
        created_at: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::Database;

    fn seeded() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "a@x.com", "h", "A", "One", "employee", None)
            .unwrap();
        db.create_user("u2", "b@x.com", "h", "B", "Two", "employee", None)
            .unwrap();
        db.create_post("p1", "u1", Some("Shipped"), Some("v1 is out"), "milestone", &[])
            .unwrap();
        db
    }

    #[test]
    fn like_toggle_is_an_idempotent_two_call_cycle() {
        let db = seeded();

        let (liked, count) = db.toggle_like("l1", "p1", "u2").unwrap();
        assert!(liked);
        assert_eq!(count, 1);

        let (liked, count) = db.toggle_like("l2", "p1", "u2").unwrap();
        assert!(!liked);
        assert_eq!(count, 0);

        // counter equals the row count after the cycle
        let post = db.get_post("p1").unwrap().unwrap();
        assert_eq!(post.likes_count, 0);
    }

    #[test]
    fn comment_bumps_counter_with_row() {
        let db = seeded();
        let count = db.create_comment("c1", "p1", "u2", "congrats").unwrap();
        assert_eq!(count, 1);

        let comments = db.list_comments("p1").unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].author.id, "u2");
        assert_eq!(db.get_post("p1").unwrap().unwrap().comments_count, 1);
    }

    #[test]
    fn feed_contains_own_and_followed_posts_only() {
        let db = seeded();
        db.create_user("u3", "c@x.com", "h", "C", "Three", "employee", None)
            .unwrap();
        db.create_post("p2", "u2", None, Some("hello"), "update", &[])
            .unwrap();
        db.create_post("p3", "u3", None, Some("unrelated"), "update", &[])
            .unwrap();

        // u1 follows u2 but not u3
        db.create_follow("f1", "u1", "u2").unwrap();

        let feed = db.list_feed("u1", None).unwrap();
        let ids: Vec<&str> = feed.iter().map(|p| p.post.id.as_str()).collect();
        assert!(ids.contains(&"p1"));
        assert!(ids.contains(&"p2"));
        assert!(!ids.contains(&"p3"));
    }

    #[test]
    fn deleting_post_cascades_images() {
        let db = seeded();
        db.create_post(
            "p9",
            "u1",
            None,
            None,
            "update",
            &[("i1".into(), "/media/i1".into())],
        )
        .unwrap();
        assert_eq!(db.get_post_images("p9").unwrap().len(), 1);

        db.delete_post("p9").unwrap();
        assert!(db.get_image("i1").unwrap().is_none());
    }

    #[test]
    fn is_liked_is_viewer_specific() {
        let db = seeded();
        db.toggle_like("l1", "p1", "u2").unwrap();

        let as_liker = db.get_post_listing("p1", "u2").unwrap().unwrap();
        assert!(as_liker.is_liked);

        let as_author = db.get_post_listing("p1", "u1").unwrap().unwrap();
        assert!(!as_author.is_liked);
    }
}
