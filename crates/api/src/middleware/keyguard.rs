//! # 密钥鉴权中间件
//!
//! 校验 `X-API-Key` 请求头并完成配额消费。
//! 配额检查与计数递增由存储层的单条条件更新完成，本层只做密钥匹配与结果映射。

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use sha2::{Digest, Sha256};

use crate::error::ApiError;
use crate::server::AppState;
use musika_core::auth::entity::{ApiKey, KEY_PREFIX_LEN, QuotaDecision};
use musika_core::auth::error::AuthError;

/// 请求头名称
pub const API_KEY_HEADER: &str = "x-api-key";

/// # Summary
/// 提取并验证 `X-API-Key`，通过后把密钥行注入请求扩展。
///
/// # Logic
/// 1. 缺失或空白请求头直接拒绝。
/// 2. 对明文做 SHA-256 摘要，按公开前缀检索候选密钥行。
/// 3. 逐行做定长摘要比较，无匹配视同无效密钥。
/// 4. 命中后消费配额：耗尽返回 429，吊销返回 401，放行则转发请求。
pub async fn require_api_key(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = match req.headers().get(API_KEY_HEADER) {
        Some(value) => value
            .to_str()
            .map_err(|_| ApiError::Auth(AuthError::InvalidKey))?
            .trim()
            .to_string(),
        None => {
            tracing::warn!("Missing X-API-Key header");
            return Err(ApiError::Auth(AuthError::MissingKey));
        }
    };
    if token.is_empty() {
        return Err(ApiError::Auth(AuthError::MissingKey));
    }
    if token.len() < KEY_PREFIX_LEN {
        return Err(ApiError::Auth(AuthError::InvalidKey));
    }

    let prefix: String = token.chars().take(KEY_PREFIX_LEN).collect();
    let supplied_hash = hex::encode(Sha256::digest(token.as_bytes()));

    let candidates = state
        .key_store
        .find_active_by_prefix(&prefix)
        .await
        .map_err(|e| ApiError::Internal(format!("Key lookup failed: {}", e)))?;

    let Some(key) = candidates
        .into_iter()
        .find(|k| digests_match(&k.key_hash, &supplied_hash))
    else {
        tracing::warn!("No active key matches prefix {}", prefix);
        return Err(ApiError::Auth(AuthError::InvalidKey));
    };

    let decision = state
        .key_store
        .consume_quota(key.id)
        .await
        .map_err(|e| ApiError::Internal(format!("Quota update failed: {}", e)))?;

    let granted = match decision {
        QuotaDecision::Granted(current) => current,
        QuotaDecision::DailyExhausted => {
            tracing::warn!("Key {} exhausted its daily quota", key.key_prefix);
            return Err(ApiError::Auth(AuthError::DailyLimitExceeded));
        }
        QuotaDecision::MonthlyExhausted => {
            tracing::warn!("Key {} exhausted its monthly quota", key.key_prefix);
            return Err(ApiError::Auth(AuthError::MonthlyLimitExceeded));
        }
        QuotaDecision::Revoked => return Err(ApiError::Auth(AuthError::InvalidKey)),
    };

    // 注入密钥行，供 downstream handlers 用 `CurrentKey` 提取
    req.extensions_mut().insert(granted);

    Ok(next.run(req).await)
}

/// 摘要比较走满全长，不在首个差异字节提前返回。
fn digests_match(stored: &str, supplied: &str) -> bool {
    stored.len() == supplied.len()
        && stored
            .bytes()
            .zip(supplied.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

// 在提取器中获取当前密钥行的快捷方式
pub struct CurrentKey(pub ApiKey);

impl<S> FromRequestParts<S> for CurrentKey
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let key = parts
            .extensions
            .get::<ApiKey>()
            .cloned()
            .ok_or_else(|| ApiError::Internal("API key context missing".to_string()))?;
        Ok(CurrentKey(key))
    }
}

#[cfg(test)]
mod tests {
    use super::digests_match;

    #[test]
    fn test_digests_match() {
        let a = "a".repeat(64);
        let b = "a".repeat(64);
        assert!(digests_match(&a, &b));
        assert!(!digests_match(&a, &"b".repeat(64)));
        assert!(!digests_match(&a, &"a".repeat(63)));
    }
}
