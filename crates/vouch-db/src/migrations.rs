use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              TEXT PRIMARY KEY,
            email           TEXT NOT NULL UNIQUE,
            password        TEXT NOT NULL,
            display_name    TEXT NOT NULL,
            first_name      TEXT,
            last_name       TEXT,
            phone           TEXT,
            invited_by      TEXT REFERENCES users(id),
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Symmetric trust graph: every logical friendship is two rows,
        -- (A,B) and (B,A). The primary key makes edge inserts idempotent
        -- under INSERT OR IGNORE.
        CREATE TABLE IF NOT EXISTS friendships (
            user_id     TEXT NOT NULL REFERENCES users(id),
            friend_id   TEXT NOT NULL REFERENCES users(id),
            origin      TEXT NOT NULL DEFAULT 'invite',
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (user_id, friend_id)
        );

        -- used_by is a single-use latch: set once at redemption, never
        -- cleared.
        CREATE TABLE IF NOT EXISTS invites (
            code        TEXT PRIMARY KEY,
            inviter_id  TEXT NOT NULL REFERENCES users(id),
            used_by     TEXT REFERENCES users(id),
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_invites_inviter
            ON invites(inviter_id);

        CREATE TABLE IF NOT EXISTS listings (
            id                  TEXT PRIMARY KEY,
            seller_id           TEXT NOT NULL REFERENCES users(id),
            title               TEXT NOT NULL,
            description         TEXT NOT NULL,
            price_cents         INTEGER NOT NULL,
            brand               TEXT,
            category            TEXT,
            condition           TEXT,
            retail_price_cents  INTEGER,
            status              TEXT NOT NULL DEFAULT 'published',
            created_at          TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_listings_seller
            ON listings(seller_id, created_at);

        CREATE TABLE IF NOT EXISTS orders (
            id                      TEXT PRIMARY KEY,
            buyer_id                TEXT NOT NULL REFERENCES users(id),
            seller_id               TEXT NOT NULL REFERENCES users(id),
            listing_id              TEXT NOT NULL REFERENCES listings(id),
            status                  TEXT NOT NULL,
            total_cents             INTEGER NOT NULL,
            shipping_name           TEXT NOT NULL,
            shipping_address1       TEXT NOT NULL,
            shipping_address2       TEXT,
            shipping_city           TEXT NOT NULL,
            shipping_state          TEXT NOT NULL,
            shipping_postal_code    TEXT NOT NULL,
            shipping_country        TEXT NOT NULL,
            shipping_phone          TEXT NOT NULL,
            payment_method          TEXT NOT NULL,
            buyer_note              TEXT,
            tracking_number         TEXT,
            carrier                 TEXT,
            created_at              TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at              TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_orders_buyer
            ON orders(buyer_id, created_at);

        CREATE INDEX IF NOT EXISTS idx_orders_seller
            ON orders(seller_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
