mod common;

use std::{sync::Arc, time::Duration};

use common::MockAccounts;
use spotlink::error::AuthError;
use spotlink::management::{MIN_REFRESH_DELAY, MemoryTokenStore, TokenManager};
use spotlink::spotify::TokenGrant;
use tokio::time::{self, Instant};

const REDIRECT: &str = "http://127.0.0.1:8890/callback";

fn manager() -> (TokenManager, Arc<MockAccounts>, Arc<MemoryTokenStore>) {
    let accounts = Arc::new(MockAccounts::default());
    let store = Arc::new(MemoryTokenStore::new());
    let tokens = TokenManager::new(accounts.clone(), store.clone(), REDIRECT);
    (tokens, accounts, store)
}

#[tokio::test(start_paused = true)]
async fn test_exchange_code_installs_token_and_schedules_refresh() {
    let (mut tokens, accounts, store) = manager();
    accounts.push_token("A1", Some("R1"), 3600);

    let t0 = Instant::now();
    let token = tokens.exchange_code("AQA123").await.unwrap().clone();

    assert_eq!(token.access_token, "A1");
    assert_eq!(token.refresh_token, "R1");
    assert_eq!(token.expires_at, t0 + Duration::from_secs(3600));

    // Refresh fires one safety margin before expiry
    assert_eq!(
        tokens.refresh_deadline(),
        Some(t0 + Duration::from_secs(3540))
    );

    assert_eq!(
        accounts.grants(),
        vec![TokenGrant::AuthorizationCode {
            code: "AQA123".to_string(),
            redirect_uri: REDIRECT.to_string(),
        }]
    );
    assert_eq!(store.current().await.as_deref(), Some("R1"));
    assert!(tokens.is_authorized());
}

#[tokio::test(start_paused = true)]
async fn test_failed_exchange_leaves_manager_unauthorized() {
    let (mut tokens, accounts, store) = manager();
    accounts.push_failure();

    let err = tokens.exchange_code("AQA123").await.unwrap_err();
    assert!(matches!(err, AuthError::TokenExchange(_)));
    assert!(!tokens.is_authorized());
    assert!(tokens.refresh_deadline().is_none());
    assert!(store.current().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_scheduled_refresh_replaces_token() {
    let (mut tokens, accounts, _store) = manager();
    accounts.push_token("A1", Some("R1"), 3600);
    let first = tokens.exchange_code("AQA123").await.unwrap().clone();

    time::advance(Duration::from_secs(3540)).await;
    accounts.push_token("A2", None, 3600);
    tokens.on_refresh_timer().await.unwrap();

    let second = tokens.current_token().unwrap().clone();
    assert_eq!(second.access_token, "A2");
    assert!(second.expires_at > first.expires_at);

    // Spotify left out the refresh token, the previous one is kept
    assert_eq!(second.refresh_token, "R1");
    assert_eq!(
        accounts.grants().last(),
        Some(&TokenGrant::RefreshToken {
            refresh_token: "R1".to_string()
        })
    );
    assert_eq!(
        tokens.refresh_deadline(),
        Some(second.expires_at - Duration::from_secs(60))
    );
}

#[tokio::test(start_paused = true)]
async fn test_rotated_refresh_token_is_persisted() {
    let (mut tokens, accounts, store) = manager();
    accounts.push_token("A1", Some("R1"), 3600);
    tokens.exchange_code("AQA123").await.unwrap();

    accounts.push_token("A2", Some("R2"), 3600);
    tokens.refresh().await.unwrap();

    assert_eq!(tokens.refresh_token(), Some("R2"));
    assert_eq!(store.current().await.as_deref(), Some("R2"));
}

#[tokio::test(start_paused = true)]
async fn test_refresh_failure_retains_refresh_token() {
    let (mut tokens, accounts, _store) = manager();
    accounts.push_token("A1", Some("R1"), 3600);
    tokens.exchange_code("AQA123").await.unwrap();

    accounts.push_failure();
    let err = tokens.refresh().await.unwrap_err();

    assert!(matches!(err, AuthError::Refresh(_)));
    assert_eq!(tokens.refresh_token(), Some("R1"));
    assert_eq!(tokens.current_token().unwrap().access_token, "A1");

    // A later attempt uses the retained token and succeeds
    accounts.push_token("A2", None, 3600);
    tokens.refresh().await.unwrap();
    assert_eq!(tokens.current_token().unwrap().access_token, "A2");
}

#[tokio::test(start_paused = true)]
async fn test_failed_timer_refresh_is_retried_with_backoff() {
    let (mut tokens, accounts, _store) = manager();
    accounts.push_token("A1", Some("R1"), 3600);
    tokens.exchange_code("AQA123").await.unwrap();

    time::advance(Duration::from_secs(3540)).await;
    accounts.push_failure();
    assert!(tokens.on_refresh_timer().await.is_err());

    let now = Instant::now();
    let retry_at = tokens.refresh_deadline().unwrap();
    assert!(retry_at > now);
    assert!(retry_at <= now + Duration::from_secs(300));
}

#[tokio::test(start_paused = true)]
async fn test_timer_refresh_gives_up_after_bounded_retries() {
    let (mut tokens, accounts, _store) = manager();
    accounts.push_token("A1", Some("R1"), 3600);
    tokens.exchange_code("AQA123").await.unwrap();

    for _ in 0..5 {
        accounts.push_failure();
        assert!(tokens.on_refresh_timer().await.is_err());
        assert!(tokens.refresh_deadline().is_some());
    }

    accounts.push_failure();
    assert!(tokens.on_refresh_timer().await.is_err());
    assert!(tokens.refresh_deadline().is_none());

    // Still authorized: the next request refreshes lazily
    assert!(tokens.is_authorized());
    assert_eq!(tokens.refresh_token(), Some("R1"));
}

#[tokio::test(start_paused = true)]
async fn test_short_lived_token_refreshes_halfway() {
    let (mut tokens, accounts, _store) = manager();
    accounts.push_token("A1", Some("R1"), 30);

    let t0 = Instant::now();
    tokens.exchange_code("AQA123").await.unwrap();
    assert_eq!(tokens.refresh_deadline(), Some(t0 + Duration::from_secs(15)));
}

#[tokio::test(start_paused = true)]
async fn test_zero_lifetime_token_never_refreshes_immediately() {
    let (mut tokens, accounts, _store) = manager();
    accounts.push_token("A1", Some("R1"), 0);

    let t0 = Instant::now();
    let token = tokens.exchange_code("AQA123").await.unwrap().clone();
    assert!(token.expires_at > t0);
    assert_eq!(tokens.refresh_deadline(), Some(t0 + MIN_REFRESH_DELAY));

    // A refresh returning another zero lifetime pushes the deadline out again
    time::advance(MIN_REFRESH_DELAY).await;
    accounts.push_token("A2", None, 0);
    tokens.on_refresh_timer().await.unwrap();

    let t1 = Instant::now();
    assert!(t1 > t0);
    assert_eq!(tokens.refresh_deadline(), Some(t1 + MIN_REFRESH_DELAY));
    assert_eq!(accounts.grants().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_custom_safety_margin() {
    let accounts = Arc::new(MockAccounts::default());
    let mut tokens = TokenManager::new(accounts.clone(), Arc::new(MemoryTokenStore::new()), REDIRECT)
        .with_safety_margin(Duration::from_secs(300));
    accounts.push_token("A1", Some("R1"), 3600);

    let t0 = Instant::now();
    tokens.exchange_code("AQA123").await.unwrap();
    assert_eq!(tokens.refresh_deadline(), Some(t0 + Duration::from_secs(3300)));
}

#[tokio::test(start_paused = true)]
async fn test_valid_access_token_refreshes_expired_token() {
    let (mut tokens, accounts, _store) = manager();
    accounts.push_token("A1", Some("R1"), 3600);
    tokens.exchange_code("AQA123").await.unwrap();

    assert_eq!(tokens.valid_access_token().await.unwrap(), "A1");
    assert_eq!(accounts.grants().len(), 1);

    time::advance(Duration::from_secs(3600)).await;
    accounts.push_token("A2", None, 3600);
    assert_eq!(tokens.valid_access_token().await.unwrap(), "A2");
    assert_eq!(accounts.grants().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_restore_uses_persisted_refresh_token() {
    let accounts = Arc::new(MockAccounts::default());
    let store = Arc::new(MemoryTokenStore::with_token("R0"));
    let mut tokens = TokenManager::new(accounts.clone(), store, REDIRECT);

    assert!(tokens.restore().await.unwrap());
    assert!(tokens.is_authorized());
    assert!(tokens.current_token().is_none());

    accounts.push_token("A1", None, 3600);
    assert_eq!(tokens.valid_access_token().await.unwrap(), "A1");
    assert_eq!(
        accounts.grants(),
        vec![TokenGrant::RefreshToken {
            refresh_token: "R0".to_string()
        }]
    );
    assert!(tokens.refresh_deadline().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_restore_with_empty_store() {
    let (mut tokens, accounts, _store) = manager();

    assert!(!tokens.restore().await.unwrap());
    assert!(matches!(
        tokens.refresh().await.unwrap_err(),
        AuthError::NotAuthorized
    ));
    assert!(accounts.grants().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_refresh() {
    let (mut tokens, accounts, _store) = manager();
    accounts.push_token("A1", Some("R1"), 3600);
    tokens.exchange_code("AQA123").await.unwrap();

    tokens.cancel_refresh();
    assert!(tokens.refresh_deadline().is_none());
}
