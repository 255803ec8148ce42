//! Repository for the `customer_profiles` table.

use servicematch_core::types::DbId;
use sqlx::PgPool;

use crate::models::profile::{CustomerProfile, UpsertCustomerProfile};

const COLUMNS: &str = "id, user_id, phone, address, postcode, created_at, updated_at";

pub struct CustomerProfileRepo;

impl CustomerProfileRepo {
    pub async fn find_by_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<CustomerProfile>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM customer_profiles WHERE user_id = $1");
        sqlx::query_as::<_, CustomerProfile>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Create the profile or replace its fields.
    pub async fn upsert(
        pool: &PgPool,
        user_id: DbId,
        input: &UpsertCustomerProfile,
    ) -> Result<CustomerProfile, sqlx::Error> {
        let query = format!(
            "INSERT INTO customer_profiles (user_id, phone, address, postcode)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT ON CONSTRAINT uq_customer_profiles_user_id DO UPDATE SET
                phone = EXCLUDED.phone,
                address = EXCLUDED.address,
                postcode = EXCLUDED.postcode
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CustomerProfile>(&query)
            .bind(user_id)
            .bind(&input.phone)
            .bind(&input.address)
            .bind(&input.postcode)
            .fetch_one(pool)
            .await
    }
}
