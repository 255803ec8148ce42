//! Repositories for the `price_checks` and `diagnoses` tables.

use servicematch_core::types::DbId;
use sqlx::PgPool;

use crate::models::ai::{CreateDiagnosis, CreatePriceCheck, DiagnosisRecord, PriceCheck};

const PRICE_CHECK_COLUMNS: &str = "id, user_id, category, region, description, quoted_cents, \
                                    low_cents, typical_cents, high_cents, verdict, source, \
                                    created_at";

const DIAGNOSIS_COLUMNS: &str = "id, user_id, description, image_url, likely_issue, category, \
                                  urgency, diy_possible, estimated_low_cents, \
                                  estimated_high_cents, source, created_at";

pub struct PriceCheckRepo;

impl PriceCheckRepo {
    pub async fn create(pool: &PgPool, input: &CreatePriceCheck) -> Result<PriceCheck, sqlx::Error> {
        let query = format!(
            "INSERT INTO price_checks
                (user_id, category, region, description, quoted_cents, low_cents,
                 typical_cents, high_cents, verdict, source)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {PRICE_CHECK_COLUMNS}"
        );
        sqlx::query_as::<_, PriceCheck>(&query)
            .bind(input.user_id)
            .bind(&input.category)
            .bind(&input.region)
            .bind(&input.description)
            .bind(input.quoted_cents)
            .bind(input.low_cents)
            .bind(input.typical_cents)
            .bind(input.high_cents)
            .bind(&input.verdict)
            .bind(&input.source)
            .fetch_one(pool)
            .await
    }

    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
    ) -> Result<Vec<PriceCheck>, sqlx::Error> {
        let query = format!(
            "SELECT {PRICE_CHECK_COLUMNS} FROM price_checks
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2"
        );
        sqlx::query_as::<_, PriceCheck>(&query)
            .bind(user_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}

pub struct DiagnosisRepo;

impl DiagnosisRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateDiagnosis,
    ) -> Result<DiagnosisRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO diagnoses
                (user_id, description, image_url, likely_issue, category, urgency,
                 diy_possible, estimated_low_cents, estimated_high_cents, source)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {DIAGNOSIS_COLUMNS}"
        );
        sqlx::query_as::<_, DiagnosisRecord>(&query)
            .bind(input.user_id)
            .bind(&input.description)
            .bind(&input.image_url)
            .bind(&input.likely_issue)
            .bind(&input.category)
            .bind(&input.urgency)
            .bind(input.diy_possible)
            .bind(input.estimated_low_cents)
            .bind(input.estimated_high_cents)
            .bind(&input.source)
            .fetch_one(pool)
            .await
    }

    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
    ) -> Result<Vec<DiagnosisRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {DIAGNOSIS_COLUMNS} FROM diagnoses
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2"
        );
        sqlx::query_as::<_, DiagnosisRecord>(&query)
            .bind(user_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
