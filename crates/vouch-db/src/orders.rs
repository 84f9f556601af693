use anyhow::Result;
use rusqlite::params;

use crate::models::{NewOrder, OrderRow};
use crate::{Database, OptionalExt};

const ORDER_COLUMNS: &str = "o.id, o.buyer_id, o.seller_id, o.listing_id, l.title, o.status,
    o.total_cents, o.shipping_name, o.shipping_address1, o.shipping_address2, o.shipping_city,
    o.shipping_state, o.shipping_postal_code, o.shipping_country, o.shipping_phone,
    o.payment_method, o.buyer_note, o.tracking_number, o.carrier, o.created_at, o.updated_at";

impl Database {
    /// Place an order and reserve its listing as one transaction. The
    /// reserve is a compare-and-set on `status = 'published'`, so two
    /// buyers racing for the same item cannot both get an order; the
    /// loser sees `false` and nothing is written.
    pub fn create_order_reserving_listing(&self, order: &NewOrder) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let reserved = tx.execute(
                "UPDATE listings SET status = 'reserved' WHERE id = ?1 AND status = 'published'",
                [order.listing_id],
            )?;
            if reserved == 0 {
                return Ok(false);
            }

            tx.execute(
                "INSERT INTO orders (
                    id, buyer_id, seller_id, listing_id, status, total_cents,
                    shipping_name, shipping_address1, shipping_address2, shipping_city,
                    shipping_state, shipping_postal_code, shipping_country, shipping_phone,
                    payment_method, buyer_note
                 ) VALUES (?1, ?2, ?3, ?4, 'pending', ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    order.id,
                    order.buyer_id,
                    order.seller_id,
                    order.listing_id,
                    order.total_cents,
                    order.shipping_name,
                    order.shipping_address1,
                    order.shipping_address2,
                    order.shipping_city,
                    order.shipping_state,
                    order.shipping_postal_code,
                    order.shipping_country,
                    order.shipping_phone,
                    order.payment_method,
                    order.buyer_note,
                ],
            )?;

            tx.commit()?;
            Ok(true)
        })
    }

    pub fn get_order(&self, id: &str) -> Result<Option<OrderRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ORDER_COLUMNS}
                 FROM orders o
                 JOIN listings l ON l.id = o.listing_id
                 WHERE o.id = ?1"
            ))?;
            let row = stmt.query_row([id], order_from_row).optional()?;
            Ok(row)
        })
    }

    pub fn orders_for_buyer(&self, buyer_id: &str) -> Result<Vec<OrderRow>> {
        self.query_orders("o.buyer_id", buyer_id)
    }

    pub fn orders_for_seller(&self, seller_id: &str) -> Result<Vec<OrderRow>> {
        self.query_orders("o.seller_id", seller_id)
    }

    fn query_orders(&self, column: &str, value: &str) -> Result<Vec<OrderRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ORDER_COLUMNS}
                 FROM orders o
                 JOIN listings l ON l.id = o.listing_id
                 WHERE {column} = ?1
                 ORDER BY o.created_at DESC"
            ))?;
            let rows = stmt
                .query_map([value], order_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Seller attaches tracking info; the order moves to `shipped`. Only
    /// valid while the order is pending and owned by this seller.
    pub fn ship_order(
        &self,
        order_id: &str,
        seller_id: &str,
        tracking_number: &str,
        carrier: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE orders
                 SET status = 'shipped', tracking_number = ?3, carrier = ?4,
                     updated_at = datetime('now')
                 WHERE id = ?1 AND seller_id = ?2 AND status = 'pending'",
                params![order_id, seller_id, tracking_number, carrier],
            )?;
            Ok(updated > 0)
        })
    }

    /// Seller confirms delivery of a shipped order.
    pub fn mark_order_delivered(&self, order_id: &str, seller_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE orders
                 SET status = 'delivered', updated_at = datetime('now')
                 WHERE id = ?1 AND seller_id = ?2 AND status = 'shipped'",
                params![order_id, seller_id],
            )?;
            Ok(updated > 0)
        })
    }

    /// Buyer or seller cancels a still-pending order; the reserved
    /// listing goes back on the market in the same transaction.
    pub fn cancel_order(&self, order_id: &str, actor_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let cancelled = tx.execute(
                "UPDATE orders
                 SET status = 'cancelled', updated_at = datetime('now')
                 WHERE id = ?1 AND status = 'pending'
                   AND (buyer_id = ?2 OR seller_id = ?2)",
                params![order_id, actor_id],
            )?;
            if cancelled == 0 {
                return Ok(false);
            }

            tx.execute(
                "UPDATE listings
                 SET status = 'published'
                 WHERE id = (SELECT listing_id FROM orders WHERE id = ?1)
                   AND status = 'reserved'",
                [order_id],
            )?;

            tx.commit()?;
            Ok(true)
        })
    }
}

fn order_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<OrderRow> {
    Ok(OrderRow {
        id: row.get(0)?,
        buyer_id: row.get(1)?,
        seller_id: row.get(2)?,
        listing_id: row.get(3)?,
        listing_title: row.get(4)?,
        status: row.get(5)?,
        total_cents: row.get(6)?,
        shipping_name: row.get(7)?,
        shipping_address1: row.get(8)?,
        shipping_address2: row.get(9)?,
        shipping_city: row.get(10)?,
        shipping_state: row.get(11)?,
        shipping_postal_code: row.get(12)?,
        shipping_country: row.get(13)?,
        shipping_phone: row.get(14)?,
        payment_method: row.get(15)?,
        buyer_note: row.get(16)?,
        tracking_number: row.get(17)?,
        carrier: row.get(18)?,
        created_at: row.get(19)?,
        updated_at: row.get(20)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewListing, NewUser};

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

    fn seed_listing(db: &Database, id: &str, seller: &str) {
        db.insert_listing(&NewListing {
            id,
            seller_id: seller,
            title: "Lamp",
            description: "Warm light",
            price_cents: 4_500,
            brand: None,
            category: None,
            condition: None,
            retail_price_cents: None,
            status: "published",
        })
        .unwrap();
    }

    fn order<'a>(id: &'a str, buyer: &'a str, seller: &'a str, listing: &'a str) -> NewOrder<'a> {
        NewOrder {
            id,
            buyer_id: buyer,
            seller_id: seller,
            listing_id: listing,
            total_cents: 4_500,
            shipping_name: "Pat Doe",
            shipping_address1: "1 Main St",
            shipping_address2: None,
            shipping_city: "Oakland",
            shipping_state: "CA",
            shipping_postal_code: "94601",
            shipping_country: "United States",
            shipping_phone: "(415) 555-1234",
            payment_method: "Venmo",
            buyer_note: None,
        }
    }

    #[test]
    fn placing_an_order_reserves_the_listing() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, "buyer", "a@example.com");
        seed_user(&db, "seller", "b@example.com");
        seed_listing(&db, "l1", "seller");

        assert!(db
            .create_order_reserving_listing(&order("o1", "buyer", "seller", "l1"))
            .unwrap());
        assert_eq!(db.get_listing("l1").unwrap().unwrap().status, "reserved");

        // Second buyer loses the race: listing is no longer published.
        assert!(!db
            .create_order_reserving_listing(&order("o2", "buyer", "seller", "l1"))
            .unwrap());
        assert!(db.get_order("o2").unwrap().is_none());
    }

    #[test]
    fn cancelling_pending_order_republishes() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, "buyer", "a@example.com");
        seed_user(&db, "seller", "b@example.com");
        seed_listing(&db, "l1", "seller");
        db.create_order_reserving_listing(&order("o1", "buyer", "seller", "l1"))
            .unwrap();

        // A stranger cannot cancel.
        assert!(!db.cancel_order("o1", "stranger").unwrap());

        assert!(db.cancel_order("o1", "buyer").unwrap());
        assert_eq!(db.get_order("o1").unwrap().unwrap().status, "cancelled");
        assert_eq!(db.get_listing("l1").unwrap().unwrap().status, "published");

        // Already cancelled: no-op.
        assert!(!db.cancel_order("o1", "buyer").unwrap());
    }

    #[test]
    fn shipping_lifecycle_is_seller_gated() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, "buyer", "a@example.com");
        seed_user(&db, "seller", "b@example.com");
        seed_listing(&db, "l1", "seller");
        db.create_order_reserving_listing(&order("o1", "buyer", "seller", "l1"))
            .unwrap();

        assert!(!db.ship_order("o1", "buyer", "1Z999", "UPS").unwrap());
        assert!(!db.mark_order_delivered("o1", "seller").unwrap());

        assert!(db.ship_order("o1", "seller", "1Z999", "UPS").unwrap());
        let row = db.get_order("o1").unwrap().unwrap();
        assert_eq!(row.status, "shipped");
        assert_eq!(row.tracking_number.as_deref(), Some("1Z999"));

        // Shipped orders cannot be cancelled.
        assert!(!db.cancel_order("o1", "buyer").unwrap());

        assert!(db.mark_order_delivered("o1", "seller").unwrap());
        assert_eq!(db.get_order("o1").unwrap().unwrap().status, "delivered");
    }
}
