use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orderly_core::{OrderRepository, PersistenceError};
use orderly_shared::{status, NewOrder, Order, OrderId, OrderUpdate};
use rust_decimal::Decimal;
use sqlx::PgPool;

const ORDER_COLUMNS: &str = "id, customer_id, product_id, quantity, total_price, status, created_at";

pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64,
    customer_id: i64,
    product_id: i64,
    quantity: i32,
    total_price: Decimal,
    status: String,
    created_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Order {
            id: row.id,
            customer_id: row.customer_id,
            product_id: row.product_id,
            quantity: row.quantity,
            total_price: row.total_price,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

fn db_error(e: sqlx::Error) -> PersistenceError {
    tracing::error!("Order query failed: {}", e);
    PersistenceError::Database(e.to_string())
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn insert_order(
        &self,
        order: &NewOrder,
        total_price: Decimal,
    ) -> Result<Order, PersistenceError> {
        let sql = format!(
            "INSERT INTO orders (customer_id, product_id, quantity, total_price, status) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            ORDER_COLUMNS
        );
        let row: OrderRow = sqlx::query_as(&sql)
            .bind(order.customer_id)
            .bind(order.product_id)
            .bind(order.quantity)
            .bind(total_price)
            .bind(status::PENDING)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(row.into())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, PersistenceError> {
        let sql = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(row.map(Order::from))
    }

    async fn list_orders(&self) -> Result<Vec<Order>, PersistenceError> {
        let sql = format!("SELECT {} FROM orders ORDER BY created_at DESC, id DESC", ORDER_COLUMNS);
        let rows: Vec<OrderRow> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(rows.into_iter().map(Order::from).collect())
    }

    async fn update_order(
        &self,
        id: OrderId,
        update: &OrderUpdate,
    ) -> Result<Order, PersistenceError> {
        let sql = format!(
            "UPDATE orders SET customer_id = $1, product_id = $2, quantity = $3, total_price = $4, status = $5 \
             WHERE id = $6 RETURNING {}",
            ORDER_COLUMNS
        );
        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(update.customer_id)
            .bind(update.product_id)
            .bind(update.quantity)
            .bind(update.total_price)
            .bind(&update.status)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.map(Order::from).ok_or(PersistenceError::NotFound(id))
    }

    async fn update_status(&self, id: OrderId, status: &str) -> Result<(), PersistenceError> {
        let result = sqlx::query("UPDATE orders SET status = $1 WHERE id = $2")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::NotFound(id));
        }
        Ok(())
    }

    async fn delete_order(&self, id: OrderId) -> Result<(), PersistenceError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::NotFound(id));
        }
        Ok(())
    }
}
