use std::collections::HashSet;

use anyhow::{Result, anyhow};
use rusqlite::{Connection, Transaction, params};
use tracing::warn;
use uuid::Uuid;

use vouch_graph::{ConnectionReads, InviteError, MAX_CODE_ATTEMPTS, new_invite_code};
use vouch_types::models::EdgeOrigin;

use crate::models::InviteRow;
use crate::{Database, OptionalExt};

impl Database {
    /// Issue a new single-use invite code for this user. The `code`
    /// primary key enforces global uniqueness; a colliding insert is
    /// retried with a fresh code up to `MAX_CODE_ATTEMPTS` times.
    pub fn create_invite(&self, inviter_id: &str) -> Result<String, InviteError> {
        self.with_conn(|conn| {
            for attempt in 1..=MAX_CODE_ATTEMPTS {
                let code = new_invite_code();
                if insert_code(conn, &code, inviter_id)? {
                    return Ok(Ok(code));
                }
                warn!("Invite code collision on attempt {}", attempt);
            }
            Ok(Err(InviteError::CodeCollision))
        })
        .map_err(InviteError::Storage)?
    }

    /// Redeem a code for a freshly created user: marks the invite used
    /// and inserts both edge directions in one transaction. Under
    /// concurrent redemption of the same code exactly one caller wins;
    /// the rest see `AlreadyUsed`.
    pub fn redeem_invite(&self, code: &str, new_user_id: &str) -> Result<String, InviteError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let outcome = redeem_in_tx(&tx, code, new_user_id);
            if outcome.is_ok() {
                tx.commit()?;
            }
            Ok(outcome)
        })
        .map_err(InviteError::Storage)?
    }

    /// Manual/administrative edge between two existing users. Same
    /// insertion routine as redemption, so the symmetry and idempotence
    /// guarantees are identical; only the provenance differs.
    pub fn add_connection(&self, a: &str, b: &str, origin: EdgeOrigin) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            insert_edge_pair(&tx, a, b, origin)?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Friend ids of one user. O(degree) read off the primary key.
    pub fn friend_ids(&self, user_id: &str) -> Result<HashSet<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT friend_id FROM friendships WHERE user_id = ?1")?;
            let rows = stmt
                .query_map([user_id], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<HashSet<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Friends with their display names, for the connections surface.
    pub fn friends_with_names(&self, user_id: &str) -> Result<Vec<(String, String)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT f.friend_id, u.display_name
                 FROM friendships f
                 JOIN users u ON u.id = f.friend_id
                 WHERE f.user_id = ?1
                 ORDER BY u.display_name ASC",
            )?;
            let rows = stmt
                .query_map([user_id], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn invites_for_inviter(&self, inviter_id: &str) -> Result<Vec<InviteRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT code, inviter_id, used_by, created_at
                 FROM invites
                 WHERE inviter_id = ?1
                 ORDER BY created_at DESC",
            )?;
            let rows = stmt
                .query_map([inviter_id], |row| {
                    Ok(InviteRow {
                        code: row.get(0)?,
                        inviter_id: row.get(1)?,
                        used_by: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

/// The evaluator reads the graph through this impl in production.
impl ConnectionReads for Database {
    fn direct_connections(&self, user_id: Uuid) -> Result<HashSet<Uuid>> {
        let raw = self.friend_ids(&user_id.to_string())?;
        raw.into_iter()
            .map(|id| {
                id.parse::<Uuid>()
                    .map_err(|e| anyhow!("Corrupt friend id '{}': {}", id, e))
            })
            .collect()
    }
}

/// Compare-and-set redemption plus symmetric edge insert, inside the
/// caller's transaction. Marking the invite used and creating the edges
/// are one logical unit; a partial application of either is a bug, never
/// a state this function can leave behind.
pub(crate) fn redeem_in_tx(
    tx: &Transaction,
    code: &str,
    new_user_id: &str,
) -> Result<String, InviteError> {
    let updated = tx
        .execute(
            "UPDATE invites SET used_by = ?2 WHERE code = ?1 AND used_by IS NULL",
            params![code, new_user_id],
        )
        .map_err(|e| InviteError::Storage(e.into()))?;

    if updated == 0 {
        // Zero rows means the CAS lost: either the code was never issued
        // or someone redeemed it first.
        let exists = tx
            .query_row("SELECT 1 FROM invites WHERE code = ?1", [code], |_| Ok(()))
            .optional()
            .map_err(InviteError::Storage)?;
        return Err(match exists {
            Some(()) => InviteError::AlreadyUsed,
            None => InviteError::InvalidCode,
        });
    }

    let inviter_id: String = tx
        .query_row(
            "SELECT inviter_id FROM invites WHERE code = ?1",
            [code],
            |row| row.get(0),
        )
        .map_err(|e| InviteError::Storage(e.into()))?;

    insert_edge_pair(tx, &inviter_id, new_user_id, EdgeOrigin::Invite)
        .map_err(InviteError::Storage)?;

    Ok(inviter_id)
}

/// Insert both directed rows for one logical friendship. INSERT OR
/// IGNORE keeps retries from tripping the primary key.
fn insert_edge_pair(conn: &Connection, a: &str, b: &str, origin: EdgeOrigin) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO friendships (user_id, friend_id, origin) VALUES (?1, ?2, ?3)",
    )?;
    stmt.execute(params![a, b, origin.as_str()])?;
    stmt.execute(params![b, a, origin.as_str()])?;
    Ok(())
}

/// Returns false when the candidate code already exists. Other failures
/// (foreign keys, connectivity) propagate as errors.
fn insert_code(conn: &Connection, code: &str, inviter_id: &str) -> Result<bool> {
    match conn.execute(
        "INSERT INTO invites (code, inviter_id) VALUES (?1, ?2)",
        params![code, inviter_id],
    ) {
        Ok(_) => Ok(true),
        Err(e) if is_code_collision(&e) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn is_code_collision(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _)
        if e.code == rusqlite::ErrorCode::ConstraintViolation
            && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;

    fn seed_user(db: &Database, id: &str, email: &str) {
        db.with_conn(|conn| {
            crate::users::insert_user_row(
                conn,
                &NewUser {
                    id,
                    email,
                    password_hash: "hash",
                    display_name: "Test",
                    first_name: None,
                    last_name: None,
                    phone: None,
                },
            )
        })
        .unwrap();
    }

    #[test]
    fn fresh_invite_creates_symmetric_edges() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, "inviter", "a@example.com");
        seed_user(&db, "joiner", "b@example.com");

        let code = db.create_invite("inviter").unwrap();
        let inviter = db.redeem_invite(&code, "joiner").unwrap();
        assert_eq!(inviter, "inviter");

        assert!(db.friend_ids("inviter").unwrap().contains("joiner"));
        assert!(db.friend_ids("joiner").unwrap().contains("inviter"));
    }

    #[test]
    fn spent_code_stays_spent() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, "inviter", "a@example.com");
        seed_user(&db, "first", "b@example.com");
        seed_user(&db, "second", "c@example.com");

        let code = db.create_invite("inviter").unwrap();
        db.redeem_invite(&code, "first").unwrap();

        let err = db.redeem_invite(&code, "second").unwrap_err();
        assert!(matches!(err, InviteError::AlreadyUsed));

        // The loser must not have gained an edge.
        assert!(db.friend_ids("second").unwrap().is_empty());
        assert!(!db.friend_ids("inviter").unwrap().contains("second"));
    }

    #[test]
    fn unknown_code_is_invalid() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, "joiner", "a@example.com");

        let err = db.redeem_invite("notacode", "joiner").unwrap_err();
        assert!(matches!(err, InviteError::InvalidCode));
    }

    #[test]
    fn duplicate_code_insert_reports_collision_not_error() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, "inviter", "a@example.com");

        db.with_conn(|conn| {
            assert!(insert_code(conn, "SAMECODE", "inviter")?);
            assert!(!insert_code(conn, "SAMECODE", "inviter")?);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn edge_insert_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, "a", "a@example.com");
        seed_user(&db, "b", "b@example.com");

        db.add_connection("a", "b", EdgeOrigin::Manual).unwrap();
        db.add_connection("a", "b", EdgeOrigin::Manual).unwrap();
        db.add_connection("b", "a", EdgeOrigin::Manual).unwrap();

        let total: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM friendships", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(total, 2);

        assert_eq!(db.friend_ids("a").unwrap().len(), 1);
        assert_eq!(db.friend_ids("b").unwrap().len(), 1);
    }

    #[test]
    fn invites_listing_tracks_redemption() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, "inviter", "a@example.com");
        seed_user(&db, "joiner", "b@example.com");

        let spent = db.create_invite("inviter").unwrap();
        let open = db.create_invite("inviter").unwrap();
        db.redeem_invite(&spent, "joiner").unwrap();

        let invites = db.invites_for_inviter("inviter").unwrap();
        assert_eq!(invites.len(), 2);
        for invite in invites {
            if invite.code == spent {
                assert_eq!(invite.used_by.as_deref(), Some("joiner"));
            } else {
                assert_eq!(invite.code, open);
                assert!(invite.used_by.is_none());
            }
        }
    }
}
