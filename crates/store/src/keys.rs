use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use musika_core::auth::entity::{ApiKey, IssuedKey, KEY_PREFIX_LEN, KEY_SCHEME, QuotaDecision};
use musika_core::common::Tier;
use musika_core::config::TierLimits;
use musika_core::store::error::StoreError;
use musika_core::store::port::{KeyStore, KeyUsageRow, KeyUsageStats, ResetWindow};
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use tracing::info;

type KeyRow = (
    i64,
    String,
    String,
    String,
    String,
    i64,
    i64,
    i64,
    i64,
    bool,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
);

const KEY_COLUMNS: &str = "id, key_hash, key_prefix, user_email, tier, requests_today, \
     requests_month, daily_limit, monthly_limit, is_active, created_at, last_used_at";

/// 使用统计中返回的持有者条数上限。
const TOP_USERS_LIMIT: i64 = 5;

/// # Summary
/// 生成一把明文密钥：固定方案前缀加 32 字节随机数的 URL 安全编码。
pub fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    format!("{}{}", KEY_SCHEME, URL_SAFE_NO_PAD.encode(bytes))
}

/// # Summary
/// 计算明文密钥的 SHA-256 十六进制摘要，即入库的 `key_hash`。
pub fn hash_secret(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

/// `KeyStore` 的 SQLite 实现。
///
/// # Summary
/// 密钥的明文绝不入库：只保存 SHA-256 摘要与用于检索的公开前缀。
///
/// # Invariants
/// * 配额检查与计数递增合并为单条条件更新，并发请求不会越过上限。
pub struct SqliteKeyStore {
    pool: SqlitePool,
}

impl SqliteKeyStore {
    /// 创建存储实例并确保表结构就绪。
    pub async fn new() -> Result<Self, StoreError> {
        Ok(Self {
            pool: crate::db::connect().await?,
        })
    }

    async fn fetch_by_id(&self, key_id: i64) -> Result<Option<ApiKey>, StoreError> {
        sqlx::query_as::<_, KeyRow>(&format!(
            "SELECT {KEY_COLUMNS} FROM api_keys WHERE id = ?"
        ))
        .bind(key_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?
        .map(key_from_row)
        .transpose()
    }
}

fn key_from_row(row: KeyRow) -> Result<ApiKey, StoreError> {
    Ok(ApiKey {
        id: row.0,
        key_hash: row.1,
        key_prefix: row.2,
        user_email: row.3,
        tier: row.4.parse().map_err(StoreError::Database)?,
        requests_today: row.5,
        requests_month: row.6,
        daily_limit: row.7,
        monthly_limit: row.8,
        is_active: row.9,
        created_at: row.10,
        last_used_at: row.11,
    })
}

#[async_trait]
impl KeyStore for SqliteKeyStore {
    /// # Summary
    /// 签发一把新密钥。
    ///
    /// # Logic
    /// 1. 生成随机明文并计算摘要与公开前缀。
    /// 2. 连同等级与配额上限插入 `api_keys`。
    /// 3. 明文只随返回值出现一次，之后无法再取回。
    ///
    /// # Arguments
    /// * `email` - 持有者邮箱。
    /// * `tier` - 服务等级。
    /// * `limits` - 该等级适用的配额上限。
    ///
    /// # Returns
    /// * `Result<IssuedKey, StoreError>` - 明文密钥与已入库的记录。
    async fn create_key(
        &self,
        email: &str,
        tier: Tier,
        limits: TierLimits,
    ) -> Result<IssuedKey, StoreError> {
        let secret = generate_secret();
        let key_hash = hash_secret(&secret);
        let key_prefix: String = secret.chars().take(KEY_PREFIX_LEN).collect();
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO api_keys
                (key_hash, key_prefix, user_email, tier, requests_today, requests_month,
                 daily_limit, monthly_limit, is_active, created_at, last_used_at)
            VALUES (?, ?, ?, ?, 0, 0, ?, ?, 1, ?, NULL)
            "#,
        )
        .bind(&key_hash)
        .bind(&key_prefix)
        .bind(email)
        .bind(tier.to_string())
        .bind(limits.daily)
        .bind(limits.monthly)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        info!(email = %email, tier = %tier, prefix = %key_prefix, "Issued new API key");

        Ok(IssuedKey {
            secret,
            record: ApiKey {
                id: result.last_insert_rowid(),
                key_hash,
                key_prefix,
                user_email: email.to_string(),
                tier,
                requests_today: 0,
                requests_month: 0,
                daily_limit: limits.daily,
                monthly_limit: limits.monthly,
                is_active: true,
                created_at: now,
                last_used_at: None,
            },
        })
    }

    /// # Summary
    /// 按公开前缀检索仍然有效的候选密钥。
    /// 摘要比对由调用方完成，前缀冲突时可能返回多行。
    async fn find_active_by_prefix(&self, prefix: &str) -> Result<Vec<ApiKey>, StoreError> {
        let rows = sqlx::query_as::<_, KeyRow>(&format!(
            "SELECT {KEY_COLUMNS} FROM api_keys WHERE key_prefix = ? AND is_active = 1"
        ))
        .bind(prefix)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        rows.into_iter().map(key_from_row).collect()
    }

    /// # Summary
    /// 原子地消费一次配额。
    ///
    /// # Logic
    /// 1. 单条条件更新：仅当密钥有效且两个计数均低于上限时，
    ///    同时递增两个计数并刷新 last_used_at。
    /// 2. 未命中时回读该行，区分吊销与具体耗尽的窗口。
    ///
    /// # Arguments
    /// * `key_id` - 密钥 ID。
    ///
    /// # Returns
    /// * `Result<QuotaDecision, StoreError>` - 裁决结果。
    async fn consume_quota(&self, key_id: i64) -> Result<QuotaDecision, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE api_keys
            SET requests_today = requests_today + 1,
                requests_month = requests_month + 1,
                last_used_at = ?
            WHERE id = ? AND is_active = 1
              AND requests_today < daily_limit
              AND requests_month < monthly_limit
            "#,
        )
        .bind(Utc::now())
        .bind(key_id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        if result.rows_affected() == 1 {
            let key = self.fetch_by_id(key_id).await?.ok_or(StoreError::NotFound)?;
            return Ok(QuotaDecision::Granted(key));
        }

        match self.fetch_by_id(key_id).await? {
            None => Ok(QuotaDecision::Revoked),
            Some(key) if !key.is_active => Ok(QuotaDecision::Revoked),
            Some(key) if key.requests_today >= key.daily_limit => Ok(QuotaDecision::DailyExhausted),
            Some(_) => Ok(QuotaDecision::MonthlyExhausted),
        }
    }

    /// # Summary
    /// 按签发时间倒序列出全部密钥。
    async fn list_keys(&self) -> Result<Vec<ApiKey>, StoreError> {
        let rows = sqlx::query_as::<_, KeyRow>(&format!(
            "SELECT {KEY_COLUMNS} FROM api_keys ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        rows.into_iter().map(key_from_row).collect()
    }

    /// # Summary
    /// 启用或吊销一把密钥。
    ///
    /// # Arguments
    /// * `key_id` - 密钥 ID。
    /// * `active` - 目标状态。
    ///
    /// # Returns
    /// * `Result<Option<String>, StoreError>` - 命中时返回持有者邮箱。
    async fn set_active(&self, key_id: i64, active: bool) -> Result<Option<String>, StoreError> {
        let email = sqlx::query_scalar::<_, String>(
            "UPDATE api_keys SET is_active = ? WHERE id = ? RETURNING user_email",
        )
        .bind(active)
        .bind(key_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        if let Some(email) = &email {
            info!(key_id, active, email = %email, "Changed API key status");
        }
        Ok(email)
    }

    /// # Summary
    /// 汇总密钥池的使用统计。
    ///
    /// # Logic
    /// 1. 聚合总数、有效数与两个窗口的请求总量。
    /// 2. 按当日用量取前几名持有者。
    async fn usage_stats(&self) -> Result<KeyUsageStats, StoreError> {
        let totals = sqlx::query_as::<_, (i64, i64, i64, i64)>(
            "SELECT COUNT(*), COALESCE(SUM(is_active), 0), COALESCE(SUM(requests_today), 0), \
             COALESCE(SUM(requests_month), 0) FROM api_keys",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        let top_users = sqlx::query_as::<_, (String, i64)>(
            "SELECT user_email, SUM(requests_today) AS used \
             FROM api_keys GROUP BY user_email ORDER BY used DESC LIMIT ?",
        )
        .bind(TOP_USERS_LIMIT)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(KeyUsageStats {
            total_keys: totals.0,
            active_keys: totals.1,
            requests_today: totals.2,
            requests_month: totals.3,
            top_users: top_users
                .into_iter()
                .map(|r| KeyUsageRow {
                    user_email: r.0,
                    requests_today: r.1,
                })
                .collect(),
        })
    }

    /// # Summary
    /// 滚动清零指定窗口的使用计数。
    ///
    /// # Arguments
    /// * `window` - 日窗口或月窗口。
    ///
    /// # Returns
    /// * `Result<u64, StoreError>` - 受影响的行数。
    async fn reset_counters(&self, window: ResetWindow) -> Result<u64, StoreError> {
        let sql = match window {
            ResetWindow::Daily => "UPDATE api_keys SET requests_today = 0",
            ResetWindow::Monthly => "UPDATE api_keys SET requests_month = 0",
        };

        let result = sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        info!(window = ?window, keys = result.rows_affected(), "Reset usage counters");
        Ok(result.rows_affected())
    }
}
