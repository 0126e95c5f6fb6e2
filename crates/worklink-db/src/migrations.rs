use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            first_name  TEXT NOT NULL,
            last_name   TEXT NOT NULL,
            is_active   INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS profiles (
            user_id            TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
            role               TEXT NOT NULL,
            is_email_verified  INTEGER NOT NULL DEFAULT 0,
            phone_number       TEXT,
            skills             TEXT,
            education          TEXT,
            experience         TEXT,
            profile_image      TEXT,
            company_name       TEXT,
            address            TEXT,
            company_image      TEXT
        );

        CREATE TABLE IF NOT EXISTS otps (
            id           TEXT PRIMARY KEY,
            user_id      TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            code         TEXT NOT NULL,
            kind         TEXT NOT NULL,
            created_at   TEXT NOT NULL,
            is_verified  INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_otps_user_kind
            ON otps(user_id, kind, is_verified);

        CREATE TABLE IF NOT EXISTS jobs (
            id                TEXT PRIMARY KEY,
            posted_by         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            title             TEXT NOT NULL,
            description       TEXT NOT NULL,
            company_name      TEXT NOT NULL,
            location          TEXT NOT NULL,
            job_type          TEXT NOT NULL,
            experience_level  TEXT NOT NULL,
            salary_min        REAL,
            salary_max        REAL,
            skills_required   TEXT NOT NULL,
            is_active         INTEGER NOT NULL DEFAULT 1,
            created_at        TEXT NOT NULL,
            updated_at        TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_jobs_active
            ON jobs(is_active, created_at);

        CREATE TABLE IF NOT EXISTS applications (
            id               TEXT PRIMARY KEY,
            job_id           TEXT NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
            applicant_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            status           TEXT NOT NULL DEFAULT 'applied',
            resume           TEXT,
            cover_letter     TEXT,
            applicant_phone  TEXT,
            expected_salary  REAL,
            available_from   TEXT,
            applied_at       TEXT NOT NULL,
            updated_at       TEXT NOT NULL,
            UNIQUE(job_id, applicant_id)
        );

        CREATE INDEX IF NOT EXISTS idx_applications_applicant
            ON applications(applicant_id, applied_at);

        CREATE TABLE IF NOT EXISTS follows (
            id            TEXT PRIMARY KEY,
            follower_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            following_id  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at    TEXT NOT NULL,
            UNIQUE(follower_id, following_id)
        );

        CREATE INDEX IF NOT EXISTS idx_follows_following
            ON follows(following_id, created_at);

        CREATE TABLE IF NOT EXISTS posts (
            id              TEXT PRIMARY KEY,
            author_id       TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            title           TEXT,
            content         TEXT,
            post_type       TEXT NOT NULL DEFAULT 'update',
            likes_count     INTEGER NOT NULL DEFAULT 0,
            comments_count  INTEGER NOT NULL DEFAULT 0,
            is_active       INTEGER NOT NULL DEFAULT 1,
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_posts_author
            ON posts(author_id, created_at);

        CREATE TABLE IF NOT EXISTS post_images (
            id          TEXT PRIMARY KEY,
            post_id     TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            url         TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS post_likes (
            id          TEXT PRIMARY KEY,
            post_id     TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL,
            UNIQUE(post_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS post_comments (
            id          TEXT PRIMARY KEY,
            post_id     TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            author_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            content     TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_comments_post
            ON post_comments(post_id, created_at);

        CREATE TABLE IF NOT EXISTS media_files (
            id          TEXT PRIMARY KEY,
            owner_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            size        INTEGER NOT NULL,
            created_at  TEXT NOT NULL
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
