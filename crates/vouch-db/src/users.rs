use anyhow::Result;
use rusqlite::{Connection, params};

use vouch_graph::InviteError;

use crate::models::{NewUser, UserRow};
use crate::{Database, OptionalExt};

impl Database {
    /// First-account bootstrap: succeeds only while the users table is
    /// empty, checked inside the transaction so two racing founders
    /// cannot both slip in. Returns false once any account exists.
    pub fn register_founder(&self, user: &NewUser) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let count: i64 = tx.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
            if count > 0 {
                return Ok(false);
            }
            insert_user_row(&tx, user)?;
            tx.commit()?;
            Ok(true)
        })
    }

    /// Create the user and redeem their invite as one transaction. If the
    /// code is invalid or already spent the user row rolls back with it,
    /// so no account ever exists without its trust edge. Returns the
    /// inviter's id on success.
    pub fn register_with_invite(&self, user: &NewUser, code: &str) -> Result<String, InviteError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            insert_user_row(&tx, user)?;
            let outcome = crate::graph::redeem_in_tx(&tx, code, user.id);
            if let Ok(inviter_id) = &outcome {
                tx.execute(
                    "UPDATE users SET invited_by = ?2 WHERE id = ?1",
                    params![user.id, inviter_id],
                )?;
                tx.commit()?;
            }
            Ok(outcome)
        })
        .map_err(InviteError::Storage)?
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Users who joined through this inviter's codes.
    pub fn users_invited_by(&self, inviter_id: &str) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE invited_by = ?1 ORDER BY created_at ASC"
            ))?;
            let rows = stmt
                .query_map([inviter_id], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_users(&self) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
        })
    }
}

const USER_COLUMNS: &str =
    "id, email, password, display_name, first_name, last_name, phone, invited_by, created_at";

pub(crate) fn insert_user_row(conn: &Connection, user: &NewUser) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, email, password, display_name, first_name, last_name, phone)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            user.id,
            user.email,
            user.password_hash,
            user.display_name,
            user.first_name,
            user.last_name,
            user.phone,
        ],
    )?;
    Ok(())
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let mut stmt =
        conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"))?;

    let row = stmt.query_row([value], user_from_row).optional()?;

    Ok(row)
}

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        password: row.get(2)?,
        display_name: row.get(3)?,
        first_name: row.get(4)?,
        last_name: row.get(5)?,
        phone: row.get(6)?,
        invited_by: row.get(7)?,
        created_at: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user<'a>(id: &'a str, email: &'a str) -> NewUser<'a> {
        NewUser {
            id,
            email,
            password_hash: "hash",
            display_name: "Test",
            first_name: None,
            last_name: None,
            phone: None,
        }
    }

    #[test]
    fn founder_only_while_table_empty() {
        let db = Database::open_in_memory().unwrap();

        assert!(db.register_founder(&new_user("u1", "a@example.com")).unwrap());
        assert!(!db.register_founder(&new_user("u2", "b@example.com")).unwrap());
        assert_eq!(db.count_users().unwrap(), 1);
    }

    #[test]
    fn bad_invite_rolls_back_the_user() {
        let db = Database::open_in_memory().unwrap();
        db.register_founder(&new_user("u1", "a@example.com")).unwrap();

        let err = db
            .register_with_invite(&new_user("u2", "b@example.com"), "nope1234")
            .unwrap_err();
        assert!(matches!(err, InviteError::InvalidCode));

        // The account must not exist without its trust edge.
        assert!(db.get_user_by_email("b@example.com").unwrap().is_none());
        assert_eq!(db.count_users().unwrap(), 1);
    }

    #[test]
    fn register_with_invite_links_inviter() {
        let db = Database::open_in_memory().unwrap();
        db.register_founder(&new_user("u1", "a@example.com")).unwrap();
        let code = db.create_invite("u1").unwrap();

        let inviter = db
            .register_with_invite(&new_user("u2", "b@example.com"), &code)
            .unwrap();
        assert_eq!(inviter, "u1");

        let joined = db.get_user_by_email("b@example.com").unwrap().unwrap();
        assert_eq!(joined.invited_by.as_deref(), Some("u1"));

        let invited = db.users_invited_by("u1").unwrap();
        assert_eq!(invited.len(), 1);
        assert_eq!(invited[0].id, "u2");
    }
}
