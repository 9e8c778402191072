use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            email       TEXT NOT NULL,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS user_preferences (
            user_id      TEXT PRIMARY KEY REFERENCES users(id),
            avatar_url   TEXT,
            cover_url    TEXT,
            dark_mode    INTEGER NOT NULL DEFAULT 0,
            private_mode INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS refresh_tokens (
            token       TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at  TEXT NOT NULL DEFAULT (datetime('now')),
            expires_at  TEXT NOT NULL,
            revoked_at  TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_refresh_tokens_user
            ON refresh_tokens(user_id);

        -- One row per unordered pair: the key is always the normalized
        -- (low, high) ordering, the initiator column remembers direction.
        CREATE TABLE IF NOT EXISTS friendships (
            user_low_id  TEXT NOT NULL REFERENCES users(id),
            user_high_id TEXT NOT NULL REFERENCES users(id),
            status       TEXT NOT NULL DEFAULT 'pending'
                         CHECK (status IN ('pending', 'accepted', 'blocked')),
            initiator_id TEXT NOT NULL REFERENCES users(id),
            created_at   TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at   TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (user_low_id, user_high_id),
            CHECK (user_low_id < user_high_id)
        );

        CREATE INDEX IF NOT EXISTS idx_friendships_high
            ON friendships(user_high_id);

        CREATE TABLE IF NOT EXISTS posts (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            body        TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_posts_user
            ON posts(user_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
