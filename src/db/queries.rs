use crate::db::models::*;
use crate::error::{AppError, AppResult};
use crate::lifecycle::StoredStatus;
use chrono::Utc;
use sqlx::{Pool, Sqlite};
use tracing::info;

pub type DbPool = Pool<Sqlite>;

/// Database operations for provisioned keys
pub struct KeyRepo;

impl KeyRepo {
    /// Insert a validated key and return the stored record
    pub async fn insert(pool: &DbPool, key: &NewKey) -> AppResult<KeyRecord> {
        let result = sqlx::query(
            r#"
            INSERT INTO keys (key_type, region_name, region_flag, gb_limit, expire_date, key_string, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(key.key_type.as_str())
        .bind(&key.region_name)
        .bind(&key.region_flag)
        .bind(key.gb_limit)
        .bind(&key.expire_date)
        .bind(&key.key_string)
        .bind(key.status.as_str())
        .bind(Utc::now())
        .execute(pool)
        .await?;

        Self::get(pool, result.last_insert_rowid())
            .await?
            .ok_or_else(|| AppError::internal("Failed to retrieve created key"))
    }

    /// Get key by ID
    pub async fn get(pool: &DbPool, id: i64) -> AppResult<Option<KeyRecord>> {
        let key = sqlx::query_as::<_, KeyRecord>("SELECT * FROM keys WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(key)
    }

    /// Delete key. Returns whether a row was removed.
    pub async fn delete(pool: &DbPool, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM keys WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Flip the stored flag in one statement, following
    /// [`StoredStatus::toggle_target`]. Returns the new flag, or `None` for an
    /// unknown id.
    pub async fn toggle(pool: &DbPool, id: i64) -> AppResult<Option<StoredStatus>> {
        let next = sqlx::query_scalar::<_, String>(
            r#"
            UPDATE keys
            SET status = CASE
                WHEN upper(trim(status)) IN ('ACTIVE', '') THEN 'INACTIVE'
                ELSE 'ACTIVE'
            END
            WHERE id = ?
            RETURNING status
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(next.map(|status| StoredStatus::parse(&status)))
    }

    /// Keys matching the filter, newest first. Status ordering is applied by
    /// the caller because the effective status depends on today's date.
    pub async fn list(pool: &DbPool, filter: &KeyFilter) -> AppResult<Vec<KeyRecord>> {
        let key_type = filter.key_type.trim();
        let query = filter.query.trim();

        let keys = sqlx::query_as::<_, KeyRecord>(
            r#"
            SELECT * FROM keys
            WHERE
                (? = '' OR key_type = ?)
                AND (
                    ? = '' OR
                    lower(region_name) LIKE '%' || lower(?) || '%' OR
                    lower(key_type) LIKE '%' || lower(?) || '%'
                )
            ORDER BY id DESC
            "#,
        )
        .bind(key_type)
        .bind(key_type)
        .bind(query)
        .bind(query)
        .bind(query)
        .fetch_all(pool)
        .await?;

        Ok(keys)
    }

    /// Every key, newest first
    pub async fn list_all(pool: &DbPool) -> AppResult<Vec<KeyRecord>> {
        let keys = sqlx::query_as::<_, KeyRecord>("SELECT * FROM keys ORDER BY id DESC")
            .fetch_all(pool)
            .await?;

        Ok(keys)
    }
}

/// Database operations for settings overrides
pub struct SettingsRepo;

impl SettingsRepo {
    /// Get a setting value, or `default` when absent
    pub async fn get(pool: &DbPool, name: &str, default: &str) -> AppResult<String> {
        let entry = sqlx::query_as::<_, SettingEntry>("SELECT * FROM settings WHERE name = ?")
            .bind(name)
            .fetch_optional(pool)
            .await?;

        Ok(entry
            .map(|e| e.value.trim().to_string())
            .unwrap_or_else(|| default.to_string()))
    }

    /// Create or overwrite a setting
    pub async fn set(pool: &DbPool, name: &str, value: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (name, value) VALUES (?, ?)
            ON CONFLICT(name) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(name)
        .bind(value.trim())
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
pub async fn setup_test_db() -> DbPool {
    use sqlx::sqlite::SqlitePoolOptions;
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    init_db(&pool).await.expect("Failed to init database");
    pool
}

/// Initialize database with migrations
pub async fn init_db(pool: &DbPool) -> AppResult<()> {
    info!("Running database migrations");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS keys (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            key_type TEXT NOT NULL,
            region_name TEXT NOT NULL,
            region_flag TEXT NOT NULL DEFAULT '',
            gb_limit INTEGER NOT NULL DEFAULT 0,
            expire_date TEXT NOT NULL DEFAULT '',
            key_string TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'ACTIVE',
            created_at DATETIME NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            name TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_keys_type ON keys(key_type)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_keys_region ON keys(region_name)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_keys_status ON keys(status)")
        .execute(pool)
        .await?;

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::KeyType;

    fn new_key(key_type: KeyType, region: &str) -> NewKey {
        NewKey {
            key_type,
            region_name: region.to_string(),
            region_flag: String::new(),
            gb_limit: 100,
            expire_date: "2030-01-01".to_string(),
            key_string: "ss://secret-connection".to_string(),
            status: StoredStatus::Active,
        }
    }

    // --- KeyRepo tests ---

    #[tokio::test]
    async fn test_insert_and_get() {
        let pool = setup_test_db().await;
        let key = KeyRepo::insert(&pool, &new_key(KeyType::Outline, "Singapore"))
            .await
            .unwrap();
        assert_eq!(key.key_type, "OUTLINE");
        assert_eq!(key.region_name, "Singapore");
        assert_eq!(key.status, "ACTIVE");

        let fetched = KeyRepo::get(&pool, key.id).await.unwrap().unwrap();
        assert_eq!(fetched.key_string, "ss://secret-connection");
    }

    #[tokio::test]
    async fn test_ids_are_monotonic() {
        let pool = setup_test_db().await;
        let a = KeyRepo::insert(&pool, &new_key(KeyType::Outline, "A")).await.unwrap();
        let b = KeyRepo::insert(&pool, &new_key(KeyType::Outline, "B")).await.unwrap();
        assert!(b.id > a.id);
    }

    #[tokio::test]
    async fn test_get_nonexistent_returns_none() {
        let pool = setup_test_db().await;
        assert!(KeyRepo::get(&pool, 999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let pool = setup_test_db().await;
        let key = KeyRepo::insert(&pool, &new_key(KeyType::V2ray, "Tokyo")).await.unwrap();
        assert!(KeyRepo::delete(&pool, key.id).await.unwrap());
        assert!(!KeyRepo::delete(&pool, key.id).await.unwrap());
        assert!(KeyRepo::get(&pool, key.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_toggle_round_trip() {
        let pool = setup_test_db().await;
        let key = KeyRepo::insert(&pool, &new_key(KeyType::V2ray, "Tokyo")).await.unwrap();

        assert_eq!(KeyRepo::toggle(&pool, key.id).await.unwrap(), Some(StoredStatus::Inactive));
        assert_eq!(KeyRepo::get(&pool, key.id).await.unwrap().unwrap().status, "INACTIVE");
        assert_eq!(KeyRepo::toggle(&pool, key.id).await.unwrap(), Some(StoredStatus::Active));
        assert_eq!(KeyRepo::toggle(&pool, 999).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_toggle_matches_rule_for_raw_flags() {
        let pool = setup_test_db().await;
        for raw in ["active", " ACTIVE ", "", "inactive", "garbage"] {
            let key = KeyRepo::insert(&pool, &new_key(KeyType::Outline, "Raw")).await.unwrap();
            sqlx::query("UPDATE keys SET status = ? WHERE id = ?")
                .bind(raw)
                .bind(key.id)
                .execute(&pool)
                .await
                .unwrap();

            let expected = StoredStatus::toggle_target(raw);
            assert_eq!(KeyRepo::toggle(&pool, key.id).await.unwrap(), Some(expected), "flag {raw:?}");
            let stored = KeyRepo::get(&pool, key.id).await.unwrap().unwrap().status;
            assert_eq!(stored, expected.as_str());
        }
    }

    #[tokio::test]
    async fn test_list_filters() {
        let pool = setup_test_db().await;
        KeyRepo::insert(&pool, &new_key(KeyType::Outline, "Singapore")).await.unwrap();
        KeyRepo::insert(&pool, &new_key(KeyType::V2ray, "Tokyo")).await.unwrap();
        KeyRepo::insert(&pool, &new_key(KeyType::V2ray, "Singapore West")).await.unwrap();

        let all = KeyRepo::list(&pool, &KeyFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all[0].id > all[1].id);

        let v2ray = KeyFilter {
            key_type: "V2RAY".to_string(),
            ..Default::default()
        };
        assert_eq!(KeyRepo::list(&pool, &v2ray).await.unwrap().len(), 2);

        let sing = KeyFilter {
            query: "SINGA".to_string(),
            ..Default::default()
        };
        assert_eq!(KeyRepo::list(&pool, &sing).await.unwrap().len(), 2);

        let by_type_text = KeyFilter {
            query: "outl".to_string(),
            ..Default::default()
        };
        assert_eq!(KeyRepo::list(&pool, &by_type_text).await.unwrap().len(), 1);

        let both = KeyFilter {
            key_type: "V2RAY".to_string(),
            query: "singapore".to_string(),
        };
        let rows = KeyRepo::list(&pool, &both).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].region_name, "Singapore West");
    }

    // --- SettingsRepo tests ---

    #[tokio::test]
    async fn test_setting_default_when_absent() {
        let pool = setup_test_db().await;
        assert_eq!(SettingsRepo::get(&pool, "announce_md", "fallback").await.unwrap(), "fallback");
    }

    #[tokio::test]
    async fn test_setting_upsert_overwrites() {
        let pool = setup_test_db().await;
        SettingsRepo::set(&pool, "announce_md", " first ").await.unwrap();
        assert_eq!(SettingsRepo::get(&pool, "announce_md", "").await.unwrap(), "first");

        SettingsRepo::set(&pool, "announce_md", "second").await.unwrap();
        assert_eq!(SettingsRepo::get(&pool, "announce_md", "").await.unwrap(), "second");

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM settings")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }
}
