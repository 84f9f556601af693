use anyhow::Result;
use rusqlite::params;

use vouch_types::models::ListingStatus;

use crate::models::{ListingRow, NewListing};
use crate::{Database, OptionalExt};

const LISTING_COLUMNS: &str = "l.id, l.seller_id, u.display_name, l.title, l.description,
    l.price_cents, l.brand, l.category, l.condition, l.retail_price_cents, l.status, l.created_at";

impl Database {
    pub fn insert_listing(&self, listing: &NewListing) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO listings (
                    id, seller_id, title, description, price_cents,
                    brand, category, condition, retail_price_cents, status
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    listing.id,
                    listing.seller_id,
                    listing.title,
                    listing.description,
                    listing.price_cents,
                    listing.brand,
                    listing.category,
                    listing.condition,
                    listing.retail_price_cents,
                    listing.status,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_listing(&self, id: &str) -> Result<Option<ListingRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {LISTING_COLUMNS}
                 FROM listings l
                 JOIN users u ON u.id = l.seller_id
                 WHERE l.id = ?1"
            ))?;
            let row = stmt.query_row([id], listing_from_row).optional()?;
            Ok(row)
        })
    }

    /// All of one seller's listings, any status, newest first.
    pub fn listings_for_seller(&self, seller_id: &str) -> Result<Vec<ListingRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {LISTING_COLUMNS}
                 FROM listings l
                 JOIN users u ON u.id = l.seller_id
                 WHERE l.seller_id = ?1
                 ORDER BY l.created_at DESC"
            ))?;
            let rows = stmt
                .query_map([seller_id], listing_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Published listings from a set of sellers, newest first. The feed
    /// resolves the seller set from the trust graph before calling this.
    pub fn published_listings_by_sellers(&self, seller_ids: &[String]) -> Result<Vec<ListingRow>> {
        if seller_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (1..=seller_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT {LISTING_COLUMNS}
                 FROM listings l
                 JOIN users u ON u.id = l.seller_id
                 WHERE l.seller_id IN ({})
                   AND l.status = 'published'
                 ORDER BY l.created_at DESC",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let sql_params: Vec<&dyn rusqlite::types::ToSql> = seller_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(sql_params.as_slice(), listing_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Flip a listing's status, only if it belongs to this seller.
    /// Reserved listings are pinned by their pending order; cancelling
    /// the order is the only way back to published.
    pub fn update_listing_status(
        &self,
        seller_id: &str,
        listing_id: &str,
        status: ListingStatus,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE listings SET status = ?1
                 WHERE id = ?2 AND seller_id = ?3 AND status != 'reserved'",
                params![status.as_str(), listing_id, seller_id],
            )?;
            Ok(updated > 0)
        })
    }

    /// Permanently delete a listing, only if it belongs to this seller.
    pub fn delete_listing(&self, seller_id: &str, listing_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM listings WHERE id = ?1 AND seller_id = ?2",
                params![listing_id, seller_id],
            )?;
            Ok(deleted > 0)
        })
    }
}

fn listing_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ListingRow> {
    Ok(ListingRow {
        id: row.get(0)?,
        seller_id: row.get(1)?,
        seller_name: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        price_cents: row.get(5)?,
        brand: row.get(6)?,
        category: row.get(7)?,
        condition: row.get(8)?,
        retail_price_cents: row.get(9)?,
        status: row.get(10)?,
        created_at: row.get(11)?,
    })
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
                    display_name: "Seller",
                    first_name: None,
                    last_name: None,
                    phone: None,
                },
            )
        })
        .unwrap();
    }

    fn listing<'a>(id: &'a str, seller: &'a str, status: &'a str) -> NewListing<'a> {
        NewListing {
            id,
            seller_id: seller,
            title: "Leather bag",
            description: "Barely used",
            price_cents: 12_000,
            brand: Some("Acme"),
            category: None,
            condition: Some("Like new"),
            retail_price_cents: Some(30_000),
            status,
        }
    }

    #[test]
    fn feed_query_only_returns_published() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, "s1", "a@example.com");
        seed_user(&db, "s2", "b@example.com");

        db.insert_listing(&listing("l1", "s1", "published")).unwrap();
        db.insert_listing(&listing("l2", "s1", "draft")).unwrap();
        db.insert_listing(&listing("l3", "s2", "published")).unwrap();

        let rows = db
            .published_listings_by_sellers(&["s1".into()])
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "l1");
        assert_eq!(rows[0].seller_name, "Seller");

        let rows = db
            .published_listings_by_sellers(&["s1".into(), "s2".into()])
            .unwrap();
        assert_eq!(rows.len(), 2);

        assert!(db.published_listings_by_sellers(&[]).unwrap().is_empty());
    }

    #[test]
    fn status_and_delete_require_ownership() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, "s1", "a@example.com");
        db.insert_listing(&listing("l1", "s1", "published")).unwrap();

        assert!(!db
            .update_listing_status("intruder", "l1", ListingStatus::Inactive)
            .unwrap());
        assert!(db
            .update_listing_status("s1", "l1", ListingStatus::Inactive)
            .unwrap());
        assert_eq!(db.get_listing("l1").unwrap().unwrap().status, "inactive");

        assert!(!db.delete_listing("intruder", "l1").unwrap());
        assert!(db.delete_listing("s1", "l1").unwrap());
        assert!(db.get_listing("l1").unwrap().is_none());
    }
}
