use musika_core::auth::entity::QuotaDecision;
use musika_core::common::Tier;
use musika_core::config::TierLimits;
use musika_core::store::port::{KeyStore, ResetWindow};
use musika_store::config::set_root_dir;
use musika_store::keys::{SqliteKeyStore, hash_secret};
use tempfile::tempdir;

#[tokio::test]
async fn test_key_store_full_lifecycle() {
    // 1. 初始化临时测试环境
    let tmp_dir = tempdir().expect("Failed to create temp dir");
    set_root_dir(tmp_dir.path().to_path_buf());

    let store = SqliteKeyStore::new()
        .await
        .expect("Failed to create key store");

    // 2. 签发：明文只出现一次，库中仅有摘要与前缀
    let limits = TierLimits {
        daily: 2,
        monthly: 100,
    };
    let issued = store
        .create_key("alice@example.com", Tier::Free, limits)
        .await
        .unwrap();
    assert!(issued.secret.starts_with("zse_"));
    let expected_prefix: String = issued.secret.chars().take(8).collect();
    assert_eq!(issued.record.key_prefix, expected_prefix);
    assert_eq!(issued.record.tier, Tier::Free);
    assert_eq!(issued.record.daily_limit, 2);
    assert_eq!(issued.record.monthly_limit, 100);
    assert!(issued.record.is_active);
    assert!(issued.record.last_used_at.is_none());

    let candidates = store
        .find_active_by_prefix(&issued.record.key_prefix)
        .await
        .unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].key_hash, hash_secret(&issued.secret));

    // 3. 配额消费：两次放行后日配额耗尽，计数不再变化
    let key_id = issued.record.id;
    for expected in 1..=2 {
        match store.consume_quota(key_id).await.unwrap() {
            QuotaDecision::Granted(key) => {
                assert_eq!(key.requests_today, expected);
                assert_eq!(key.requests_month, expected);
                assert!(key.last_used_at.is_some());
            }
            other => panic!("Expected grant, got {:?}", other),
        }
    }
    assert!(matches!(
        store.consume_quota(key_id).await.unwrap(),
        QuotaDecision::DailyExhausted
    ));
    let after_reject = store
        .find_active_by_prefix(&issued.record.key_prefix)
        .await
        .unwrap();
    assert_eq!(after_reject[0].requests_today, 2);
    assert_eq!(after_reject[0].requests_month, 2);

    // 4. 日清零恢复放行，月计数不受影响
    assert_eq!(store.reset_counters(ResetWindow::Daily).await.unwrap(), 1);
    match store.consume_quota(key_id).await.unwrap() {
        QuotaDecision::Granted(key) => {
            assert_eq!(key.requests_today, 1);
            assert_eq!(key.requests_month, 3);
        }
        other => panic!("Expected grant after reset, got {:?}", other),
    }

    // 5. 月配额耗尽的独立密钥
    let tight = store
        .create_key(
            "bob@example.com",
            Tier::Pro,
            TierLimits {
                daily: 10,
                monthly: 1,
            },
        )
        .await
        .unwrap();
    assert!(matches!(
        store.consume_quota(tight.record.id).await.unwrap(),
        QuotaDecision::Granted(_)
    ));
    assert!(matches!(
        store.consume_quota(tight.record.id).await.unwrap(),
        QuotaDecision::MonthlyExhausted
    ));

    // 6. 吊销与重新启用
    let email = store.set_active(key_id, false).await.unwrap();
    assert_eq!(email.as_deref(), Some("alice@example.com"));
    assert!(matches!(
        store.consume_quota(key_id).await.unwrap(),
        QuotaDecision::Revoked
    ));
    assert!(
        store
            .find_active_by_prefix(&issued.record.key_prefix)
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(store.set_active(9999, false).await.unwrap(), None);

    store.set_active(key_id, true).await.unwrap();
    assert!(matches!(
        store.consume_quota(key_id).await.unwrap(),
        QuotaDecision::Granted(_)
    ));

    // 7. 列表与统计
    let keys = store.list_keys().await.unwrap();
    assert_eq!(keys.len(), 2);
    assert_eq!(keys[0].user_email, "bob@example.com");

    let stats = store.usage_stats().await.unwrap();
    assert_eq!(stats.total_keys, 2);
    assert_eq!(stats.active_keys, 2);
    assert_eq!(stats.requests_today, 3);
    assert_eq!(stats.requests_month, 5);
    assert_eq!(stats.top_users.len(), 2);
    assert_eq!(stats.top_users[0].user_email, "alice@example.com");
    assert_eq!(stats.top_users[0].requests_today, 2);
}
