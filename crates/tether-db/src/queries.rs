use crate::Database;
use crate::models::{
    FriendRow, FriendshipRow, PostRow, RefreshTokenRow, UserProfileRow, UserRow, UserSummaryRow,
};
use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;

impl Database {
    // -- Users --

    /// Create a user and its preference row in one transaction: both rows
    /// exist afterwards or neither does.
    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO users (id, username, email, password) VALUES (?1, ?2, ?3, ?4)",
                (id, username, email, password_hash),
            )?;
            tx.execute("INSERT INTO user_preferences (user_id) VALUES (?1)", [id])?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    /// Full profile for the user GET endpoint: preferences plus
    /// follower/following counts derived from friendship rows at read time.
    pub fn get_user_profile(&self, username: &str) -> Result<Option<UserProfileRow>> {
        self.with_conn(|conn| query_user_profile(conn, username))
    }

    pub fn set_avatar_url(&self, user_id: &str, avatar_url: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE user_preferences SET avatar_url = ?2 WHERE user_id = ?1",
                (user_id, avatar_url),
            )?;
            Ok(())
        })
    }

    // -- Refresh tokens --

    pub fn create_refresh_token(&self, token: &str, user_id: &str, expires_at: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO refresh_tokens (token, user_id, created_at, updated_at, expires_at)
                 VALUES (?1, ?2, ?3, ?3, ?4)",
                (token, user_id, &now, expires_at),
            )?;
            Ok(())
        })
    }

    pub fn get_refresh_token(&self, token: &str) -> Result<Option<RefreshTokenRow>> {
        self.with_conn(|conn| query_refresh_token(conn, token))
    }

    pub fn get_user_by_refresh_token(&self, token: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_refresh_token(conn, token))
    }

    /// Set `revoked_at` on a token. Idempotent: revoking an already-revoked
    /// token keeps the original revocation time and still reports `true`.
    /// `false` means no such token.
    pub fn revoke_refresh_token(&self, token: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let now = Utc::now().to_rfc3339();
            let n = conn.execute(
                "UPDATE refresh_tokens
                 SET revoked_at = COALESCE(revoked_at, ?2), updated_at = ?2
                 WHERE token = ?1",
                (token, &now),
            )?;
            Ok(n > 0)
        })
    }

    // -- Friendships --

    /// Insert a friendship row for an already-normalized pair. Returns
    /// `false` when a row for the pair exists; the pair primary key makes
    /// this race-safe against a concurrent opposite-direction request.
    pub fn create_friendship(&self, low_id: &str, high_id: &str, initiator_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "INSERT OR IGNORE INTO friendships (user_low_id, user_high_id, initiator_id)
                 VALUES (?1, ?2, ?3)",
                (low_id, high_id, initiator_id),
            )?;
            Ok(n > 0)
        })
    }

    pub fn get_friendship(&self, low_id: &str, high_id: &str) -> Result<Option<FriendshipRow>> {
        self.with_conn(|conn| query_friendship(conn, low_id, high_id))
    }

    /// Overwrite the status of an existing row. Transition legality is the
    /// caller's responsibility (`FriendshipStatus::can_transition_to`).
    pub fn update_friendship_status(&self, low_id: &str, high_id: &str, status: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let now = Utc::now().to_rfc3339();
            let n = conn.execute(
                "UPDATE friendships SET status = ?3, updated_at = ?4
                 WHERE user_low_id = ?1 AND user_high_id = ?2",
                (low_id, high_id, status, &now),
            )?;
            Ok(n > 0)
        })
    }

    pub fn list_friendships_for_user(&self, user_id: &str) -> Result<Vec<FriendRow>> {
        self.with_conn(|conn| query_friendships_for_user(conn, user_id))
    }

    pub fn list_non_friend_users(&self, user_id: &str) -> Result<Vec<UserSummaryRow>> {
        self.with_conn(|conn| query_non_friend_users(conn, user_id))
    }

    // -- Posts --

    pub fn create_post(&self, id: &str, user_id: &str, body: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO posts (id, user_id, body) VALUES (?1, ?2, ?3)",
                (id, user_id, body),
            )?;
            Ok(())
        })
    }

    pub fn get_posts_by_username(&self, username: &str) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| query_posts(conn, Some(username)))
    }

    pub fn get_all_posts(&self) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| query_posts(conn, None))
    }

    // -- Admin --

    /// Bulk wipe of every table, child tables first. Admin/testing only.
    pub fn reset_all_tables(&self) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute_batch(
                "DELETE FROM refresh_tokens;
                 DELETE FROM friendships;
                 DELETE FROM posts;
                 DELETE FROM user_preferences;
                 DELETE FROM users;",
            )?;
            Ok(())
        })
    }
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, username, email, password, created_at, updated_at
         FROM users WHERE username = ?1",
    )?;

    let row = stmt.query_row([username], map_user_row).optional()?;

    Ok(row)
}

fn query_user_by_id(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, username, email, password, created_at, updated_at
         FROM users WHERE id = ?1",
    )?;

    let row = stmt.query_row([id], map_user_row).optional()?;

    Ok(row)
}

fn map_user_row(row: &rusqlite::Row) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn query_user_profile(conn: &Connection, username: &str) -> Result<Option<UserProfileRow>> {
    // Blocked rows are invisible in the counts.
    let mut stmt = conn.prepare(
        "SELECT u.id, u.username, u.email, u.created_at, u.updated_at,
                p.avatar_url, p.cover_url, p.dark_mode, p.private_mode,
                (SELECT COUNT(*) FROM friendships f
                  WHERE (f.user_low_id = u.id OR f.user_high_id = u.id)
                    AND f.initiator_id != u.id AND f.status != 'blocked') AS followers,
                (SELECT COUNT(*) FROM friendships f
                  WHERE f.initiator_id = u.id AND f.status != 'blocked') AS following
         FROM users u
         LEFT JOIN user_preferences p ON p.user_id = u.id
         WHERE u.username = ?1",
    )?;

    let row = stmt
        .query_row([username], |row| {
            Ok(UserProfileRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                created_at: row.get(3)?,
                updated_at: row.get(4)?,
                avatar_url: row.get(5)?,
                cover_url: row.get(6)?,
                dark_mode: row.get::<_, Option<bool>>(7)?.unwrap_or(false),
                private_mode: row.get::<_, Option<bool>>(8)?.unwrap_or(false),
                followers: row.get(9)?,
                following: row.get(10)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_refresh_token(conn: &Connection, token: &str) -> Result<Option<RefreshTokenRow>> {
    let mut stmt = conn.prepare(
        "SELECT token, user_id, created_at, updated_at, expires_at, revoked_at
         FROM refresh_tokens WHERE token = ?1",
    )?;

    let row = stmt
        .query_row([token], |row| {
            Ok(RefreshTokenRow {
                token: row.get(0)?,
                user_id: row.get(1)?,
                created_at: row.get(2)?,
                updated_at: row.get(3)?,
                expires_at: row.get(4)?,
                revoked_at: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_user_by_refresh_token(conn: &Connection, token: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT u.id, u.username, u.email, u.password, u.created_at, u.updated_at
         FROM users u
         JOIN refresh_tokens rt ON rt.user_id = u.id
         WHERE rt.token = ?1",
    )?;

    let row = stmt.query_row([token], map_user_row).optional()?;

    Ok(row)
}

fn query_friendship(conn: &Connection, low_id: &str, high_id: &str) -> Result<Option<FriendshipRow>> {
    let mut stmt = conn.prepare(
        "SELECT user_low_id, user_high_id, status, initiator_id, created_at, updated_at
         FROM friendships WHERE user_low_id = ?1 AND user_high_id = ?2",
    )?;

    let row = stmt
        .query_row([low_id, high_id], |row| {
            Ok(FriendshipRow {
                user_low_id: row.get(0)?,
                user_high_id: row.get(1)?,
                status: row.get(2)?,
                initiator_id: row.get(3)?,
                created_at: row.get(4)?,
                updated_at: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_friendships_for_user(conn: &Connection, user_id: &str) -> Result<Vec<FriendRow>> {
    // JOIN picks the peer side of each row: whichever stored id is not the
    // caller's. Orientation is re-derived in the API layer the same way.
    let mut stmt = conn.prepare(
        "SELECT f.user_low_id, f.user_high_id, f.status, f.initiator_id,
                f.created_at, f.updated_at, u.username, p.avatar_url
         FROM friendships f
         JOIN users u
           ON u.id = CASE WHEN f.user_low_id = ?1 THEN f.user_high_id ELSE f.user_low_id END
         LEFT JOIN user_preferences p ON p.user_id = u.id
         WHERE f.user_low_id = ?1 OR f.user_high_id = ?1
         ORDER BY f.created_at DESC",
    )?;

    let rows = stmt
        .query_map([user_id], |row| {
            Ok(FriendRow {
                user_low_id: row.get(0)?,
                user_high_id: row.get(1)?,
                status: row.get(2)?,
                initiator_id: row.get(3)?,
                created_at: row.get(4)?,
                updated_at: row.get(5)?,
                friend_username: row.get(6)?,
                friend_avatar_url: row.get(7)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn query_non_friend_users(conn: &Connection, user_id: &str) -> Result<Vec<UserSummaryRow>> {
    let mut stmt = conn.prepare(
        "SELECT u.id, u.username, u.email, u.created_at, u.updated_at, p.avatar_url
         FROM users u
         LEFT JOIN user_preferences p ON p.user_id = u.id
         WHERE u.id != ?1
           AND NOT EXISTS (
             SELECT 1 FROM friendships f
             WHERE (f.user_low_id = ?1 AND f.user_high_id = u.id)
                OR (f.user_low_id = u.id AND f.user_high_id = ?1))
         ORDER BY u.username",
    )?;

    let rows = stmt
        .query_map([user_id], |row| {
            Ok(UserSummaryRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                created_at: row.get(3)?,
                updated_at: row.get(4)?,
                avatar_url: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn query_posts(conn: &Connection, username: Option<&str>) -> Result<Vec<PostRow>> {
    // JOIN users to fetch the author in a single query (eliminates N+1);
    // rowid breaks ties between same-second timestamps.
    let base = "SELECT po.id, po.body, po.created_at, po.updated_at, po.user_id,
                       u.username, p.avatar_url
                FROM posts po
                JOIN users u ON u.id = po.user_id
                LEFT JOIN user_preferences p ON p.user_id = u.id";

    let map = |row: &rusqlite::Row| -> rusqlite::Result<PostRow> {
        Ok(PostRow {
            id: row.get(0)?,
            body: row.get(1)?,
            created_at: row.get(2)?,
            updated_at: row.get(3)?,
            user_id: row.get(4)?,
            username: row.get(5)?,
            avatar_url: row.get(6)?,
        })
    };

    let rows = match username {
        Some(username) => {
            let sql = format!(
                "{base} WHERE u.username = ?1 ORDER BY po.created_at DESC, po.rowid DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            stmt.query_map([username], map)?
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
        None => {
            let sql = format!("{base} ORDER BY po.created_at DESC, po.rowid DESC");
            let mut stmt = conn.prepare(&sql)?;
            stmt.query_map([], map)?
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    Ok(rows)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn seed_user(db: &Database, username: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_user(&id, username, &format!("{username}@example.com"), "argon2-hash")
            .unwrap();
        id
    }

    fn normalized<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
        if a <= b { (a, b) } else { (b, a) }
    }

    fn count(db: &Database, table: &str) -> i64 {
        db.with_conn(|conn| {
            let n = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })?;
            Ok(n)
        })
        .unwrap()
    }

    #[test]
    fn create_user_also_creates_preferences() {
        let db = test_db();
        seed_user(&db, "alice");

        assert_eq!(count(&db, "users"), 1);
        assert_eq!(count(&db, "user_preferences"), 1);

        let user = db.get_user_by_username("alice").unwrap().unwrap();
        assert_eq!(user.email, "alice@example.com");
        assert!(db.get_user_by_username("nobody").unwrap().is_none());
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let db = test_db();
        seed_user(&db, "alice");

        let id = Uuid::new_v4().to_string();
        let result = db.create_user(&id, "alice", "other@example.com", "argon2-hash");
        assert!(result.is_err());
        assert_eq!(count(&db, "users"), 1);
        assert_eq!(count(&db, "user_preferences"), 1);
    }

    #[test]
    fn failed_preference_insert_rolls_back_the_user() {
        let db = test_db();
        db.with_conn(|conn| {
            conn.execute("DROP TABLE user_preferences", [])?;
            Ok(())
        })
        .unwrap();

        let id = Uuid::new_v4().to_string();
        let result = db.create_user(&id, "alice", "alice@example.com", "argon2-hash");
        assert!(result.is_err());
        assert!(db.get_user_by_username("alice").unwrap().is_none());
    }

    #[test]
    fn friendship_pair_has_at_most_one_row() {
        let db = test_db();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");
        let (low, high) = normalized(&alice, &bob);

        assert!(db.create_friendship(low, high, &alice).unwrap());
        // Opposite-direction request resolves to the same normalized pair.
        assert!(!db.create_friendship(low, high, &bob).unwrap());
        assert_eq!(count(&db, "friendships"), 1);

        let row = db.get_friendship(low, high).unwrap().unwrap();
        assert_eq!(row.status, "pending");
        assert_eq!(row.initiator_id, alice);
    }

    #[test]
    fn friendship_status_can_be_updated() {
        let db = test_db();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");
        let (low, high) = normalized(&alice, &bob);
        db.create_friendship(low, high, &alice).unwrap();

        assert!(db.update_friendship_status(low, high, "accepted").unwrap());
        let row = db.get_friendship(low, high).unwrap().unwrap();
        assert_eq!(row.status, "accepted");

        // Unknown pair updates nothing.
        let (low, high) = normalized(&alice, &alice);
        assert!(!db.update_friendship_status(low, high, "accepted").unwrap());
    }

    #[test]
    fn friend_listing_exposes_peer_and_initiator() {
        let db = test_db();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");
        let (low, high) = normalized(&alice, &bob);
        db.create_friendship(low, high, &alice).unwrap();

        let rows = db.list_friendships_for_user(&alice).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].friend_username, "bob");
        assert_eq!(rows[0].initiator_id, alice);

        let rows = db.list_friendships_for_user(&bob).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].friend_username, "alice");
        assert_eq!(rows[0].initiator_id, alice);
    }

    #[test]
    fn non_friend_listing_excludes_self_and_friends() {
        let db = test_db();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");
        seed_user(&db, "carol");
        let (low, high) = normalized(&alice, &bob);
        db.create_friendship(low, high, &alice).unwrap();

        let rows = db.list_non_friend_users(&alice).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].username, "carol");
    }

    #[test]
    fn profile_counts_follow_initiator_orientation() {
        let db = test_db();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");
        let (low, high) = normalized(&alice, &bob);
        db.create_friendship(low, high, &alice).unwrap();

        let profile = db.get_user_profile("alice").unwrap().unwrap();
        assert_eq!(profile.following, 1);
        assert_eq!(profile.followers, 0);

        let profile = db.get_user_profile("bob").unwrap().unwrap();
        assert_eq!(profile.following, 0);
        assert_eq!(profile.followers, 1);
    }

    #[test]
    fn refresh_token_lifecycle() {
        let db = test_db();
        let alice = seed_user(&db, "alice");
        let expires = "2099-01-01T00:00:00+00:00";

        db.create_refresh_token("tok-1", &alice, expires).unwrap();

        let row = db.get_refresh_token("tok-1").unwrap().unwrap();
        assert_eq!(row.user_id, alice);
        assert!(row.revoked_at.is_none());

        let user = db.get_user_by_refresh_token("tok-1").unwrap().unwrap();
        assert_eq!(user.username, "alice");

        assert!(db.revoke_refresh_token("tok-1").unwrap());
        let row = db.get_refresh_token("tok-1").unwrap().unwrap();
        let first_revocation = row.revoked_at.clone().unwrap();

        // Second revocation is not an error and keeps the original time.
        assert!(db.revoke_refresh_token("tok-1").unwrap());
        let row = db.get_refresh_token("tok-1").unwrap().unwrap();
        assert_eq!(row.revoked_at.unwrap(), first_revocation);

        assert!(!db.revoke_refresh_token("no-such-token").unwrap());
    }

    #[test]
    fn posts_join_author_details() {
        let db = test_db();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");
        db.set_avatar_url(&alice, "https://example.com/a.png").unwrap();

        db.create_post(&Uuid::new_v4().to_string(), &alice, "first").unwrap();
        db.create_post(&Uuid::new_v4().to_string(), &bob, "second").unwrap();

        let all = db.get_all_posts().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].body, "second");
        assert_eq!(all[1].body, "first");

        let alices = db.get_posts_by_username("alice").unwrap();
        assert_eq!(alices.len(), 1);
        assert_eq!(alices[0].username, "alice");
        assert_eq!(alices[0].avatar_url.as_deref(), Some("https://example.com/a.png"));
    }

    #[test]
    fn reset_wipes_every_table() {
        let db = test_db();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");
        let (low, high) = normalized(&alice, &bob);
        db.create_friendship(low, high, &alice).unwrap();
        db.create_post(&Uuid::new_v4().to_string(), &alice, "hello").unwrap();
        db.create_refresh_token("tok-1", &alice, "2099-01-01T00:00:00+00:00")
            .unwrap();

        db.reset_all_tables().unwrap();

        for table in ["users", "user_preferences", "refresh_tokens", "friendships", "posts"] {
            assert_eq!(count(&db, table), 0, "{table} not empty");
        }
    }
}
