//! Behavior of the auth manager against a scripted API.

use std::time::Duration;

use podium_api::ApiClient;
use podium_session::{
    AuthManager, CredentialStore, MemoryStore, RestoreOutcome, SessionError,
    TOKEN_KEY, USER_KEY,
};
use podium_transport::{Method, MockReply, MockTransport};

const USER_JSON: &str = r#"{"userId":"u1","email":"ada@example.com","username":"ada"}"#;

const LOGIN_OK: &str = r#"{
    "message": "Login successful",
    "tokens": {"accessToken": "acc", "refreshToken": "ref", "idToken": "id-1"},
    "expiresIn": 3600
}"#;

const PROFILE_OK: &str = r#"{
    "user": {"userId": "u1", "email": "ada@example.com", "username": "ada"},
    "gameStats": {"currentScore": 1500, "lastPlayed": "2024-01-01T00:00:00Z", "rank": 3, "totalPlayers": 40}
}"#;

const VERIFY_OK: &str = r#"{"message": "Token valid", "user": {"userId": "u1", "email": "ada@example.com", "username": "ada"}}"#;

fn manager(store: MemoryStore) -> (AuthManager<MockTransport, MemoryStore>, MockTransport) {
    let mock = MockTransport::new();
    let api = ApiClient::new(mock.clone(), "http://api.test");
    (AuthManager::new(api, store), mock)
}

fn stored(token: &str) -> MemoryStore {
    MemoryStore::with_entries([(TOKEN_KEY, token), (USER_KEY, USER_JSON)])
}

// ---------------------------------------------------------------------------
// login / logout
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_login_installs_and_persists_session() {
    let (auth, mock) = manager(MemoryStore::new());
    mock.on(Method::Post, "/api/auth/login", MockReply::json(200, LOGIN_OK));
    mock.on(Method::Get, "/api/auth/profile", MockReply::json(200, PROFILE_OK));

    let user = auth.login("ada@example.com", "Secret123").await.unwrap();
    assert_eq!(user.username, "ada");

    assert!(auth.is_authenticated());
    assert_eq!(auth.token().unwrap().as_str(), "id-1");
    assert_eq!(auth.game_stats().unwrap().rank, Some(3));
    assert!(!auth.is_loading());

    let store = auth.store();
    assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("id-1"));
    let persisted: serde_json::Value =
        serde_json::from_str(&store.get(USER_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(persisted["username"], "ada");

    let profile = &mock.requests()[1];
    assert_eq!(profile.header_value("authorization"), Some("Bearer id-1"));
}

#[tokio::test]
async fn test_login_rejection_clears_everything_and_keeps_message() {
    let (auth, mock) = manager(stored("old-token"));
    mock.on(
        Method::Post,
        "/api/auth/login",
        MockReply::json(401, r#"{"error":"Incorrect username or password."}"#),
    );

    let err = auth.login("ada@example.com", "wrong").await.unwrap_err();
    assert_eq!(err.to_string(), "Incorrect username or password.");
    assert!(!auth.is_authenticated());
    assert!(auth.store().is_empty());
}

#[tokio::test]
async fn test_login_profile_failure_leaves_no_half_session() {
    let (auth, mock) = manager(MemoryStore::new());
    mock.on(Method::Post, "/api/auth/login", MockReply::json(200, LOGIN_OK));
    mock.on(Method::Get, "/api/auth/profile", MockReply::empty(200));

    let err = auth.login("ada@example.com", "Secret123").await.unwrap_err();
    assert!(matches!(err, SessionError::Api(_)));
    assert!(auth.token().is_none());
    assert!(auth.user().is_none());
    assert!(auth.store().is_empty());
}

#[tokio::test]
async fn test_login_missing_fields_never_sends() {
    let (auth, mock) = manager(MemoryStore::new());
    let err = auth.login("  ", "Secret123").await.unwrap_err();
    assert!(matches!(err, SessionError::Validation(_)));
    assert!(mock.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_is_loading_while_login_in_flight() {
    let (auth, mock) = manager(MemoryStore::new());
    mock.on(
        Method::Post,
        "/api/auth/login",
        MockReply::json(200, LOGIN_OK).delayed(Duration::from_millis(100)),
    );
    mock.on(Method::Get, "/api/auth/profile", MockReply::json(200, PROFILE_OK));

    let task = {
        let auth = auth.clone();
        tokio::spawn(async move { auth.login("ada@example.com", "Secret123").await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(auth.snapshot().is_loading);

    task.await.unwrap().unwrap();
    assert!(!auth.snapshot().is_loading);
}

#[tokio::test]
async fn test_logout_twice_is_same_as_once() {
    let (auth, mock) = manager(MemoryStore::new());
    mock.on(Method::Post, "/api/auth/login", MockReply::json(200, LOGIN_OK));
    mock.on(Method::Get, "/api/auth/profile", MockReply::json(200, PROFILE_OK));
    auth.login("ada@example.com", "Secret123").await.unwrap();

    auth.logout();
    let once = auth.snapshot();
    auth.logout();
    let twice = auth.snapshot();

    assert_eq!(once, twice);
    assert!(twice.session.is_none());
    assert!(twice.game_stats.is_none());
    assert!(auth.store().is_empty());
}

#[tokio::test]
async fn test_subscribers_see_sign_out() {
    let (auth, mock) = manager(MemoryStore::new());
    mock.on(Method::Post, "/api/auth/login", MockReply::json(200, LOGIN_OK));
    mock.on(Method::Get, "/api/auth/profile", MockReply::json(200, PROFILE_OK));
    auth.login("ada@example.com", "Secret123").await.unwrap();

    let rx = auth.subscribe();
    auth.logout();
    assert!(rx.has_changed().unwrap());
    assert!(!rx.borrow().is_authenticated());
}

// ---------------------------------------------------------------------------
// restore
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_restore_with_nothing_stored() {
    let (auth, mock) = manager(MemoryStore::new());
    assert!(matches!(auth.restore(), RestoreOutcome::Empty));
    assert!(!auth.is_loading());
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn test_restore_verifies_and_loads_stats() {
    let (auth, mock) = manager(stored("id-7"));
    mock.on(Method::Post, "/api/auth/verify", MockReply::json(200, VERIFY_OK));
    mock.on(Method::Get, "/api/auth/profile", MockReply::json(200, PROFILE_OK));

    let outcome = auth.restore();
    assert!(matches!(outcome, RestoreOutcome::Verifying(_)));
    // Installed optimistically before the server answers.
    assert!(auth.is_authenticated());
    assert!(auth.is_loading());

    outcome.settled().await;
    assert!(auth.is_authenticated());
    assert!(!auth.is_loading());
    assert_eq!(auth.game_stats().unwrap().current_score, 1500);
    assert_eq!(
        mock.requests()[0].header_value("authorization"),
        Some("Bearer id-7")
    );
}

#[tokio::test]
async fn test_restore_with_rejected_token_fails_closed() {
    let (auth, mock) = manager(stored("expired"));
    mock.on(
        Method::Post,
        "/api/auth/verify",
        MockReply::json(401, r#"{"error":"Invalid token"}"#),
    );

    auth.restore().settled().await;

    assert!(!auth.is_authenticated());
    assert!(!auth.is_loading());
    assert!(auth.store().is_empty());
    assert_eq!(mock.count(Method::Get, "/api/auth/profile"), 0);
}

#[tokio::test]
async fn test_restore_with_half_stored_credentials_clears_storage() {
    let (auth, mock) = manager(MemoryStore::with_entries([(TOKEN_KEY, "orphan")]));
    assert!(matches!(auth.restore(), RestoreOutcome::Empty));
    assert!(auth.store().is_empty());
    assert!(!auth.is_authenticated());
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn test_restore_with_unreadable_user_clears_storage() {
    let store = MemoryStore::with_entries([(TOKEN_KEY, "tok"), (USER_KEY, "{not json")]);
    let (auth, _mock) = manager(store);
    assert!(matches!(auth.restore(), RestoreOutcome::Empty));
    assert!(auth.store().is_empty());
}

#[tokio::test]
async fn test_restore_runs_once() {
    let (auth, mock) = manager(stored("id-7"));
    mock.on(Method::Post, "/api/auth/verify", MockReply::json(200, VERIFY_OK));
    mock.on(Method::Get, "/api/auth/profile", MockReply::json(200, PROFILE_OK));

    auth.restore().settled().await;
    assert!(matches!(auth.restore(), RestoreOutcome::AlreadyRestored));
    assert_eq!(mock.count(Method::Post, "/api/auth/verify"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_logout_during_verification_wins() {
    let (auth, mock) = manager(stored("id-7"));
    mock.on(
        Method::Post,
        "/api/auth/verify",
        MockReply::json(200, VERIFY_OK).delayed(Duration::from_millis(200)),
    );
    mock.on(Method::Get, "/api/auth/profile", MockReply::json(200, PROFILE_OK));

    let outcome = auth.restore();
    auth.logout();
    outcome.settled().await;

    assert!(!auth.is_authenticated());
    assert!(auth.game_stats().is_none());
    assert!(auth.store().is_empty());
}

// ---------------------------------------------------------------------------
// profile refresh / account
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_refresh_profile_signed_out_is_noop() {
    let (auth, mock) = manager(MemoryStore::new());
    auth.refresh_profile().await;
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn test_refresh_profile_failure_signs_out_silently() {
    let (auth, mock) = manager(MemoryStore::new());
    mock.on(Method::Post, "/api/auth/login", MockReply::json(200, LOGIN_OK));
    mock.on(Method::Get, "/api/auth/profile", MockReply::json(200, PROFILE_OK));
    auth.login("ada@example.com", "Secret123").await.unwrap();

    mock.replace(
        Method::Get,
        "/api/auth/profile",
        MockReply::json(401, r#"{"error":"Token expired"}"#),
    );
    auth.refresh_profile().await;

    assert!(!auth.is_authenticated());
    assert!(auth.store().is_empty());
}

#[tokio::test]
async fn test_refresh_profile_updates_stats() {
    let (auth, mock) = manager(MemoryStore::new());
    mock.on(Method::Post, "/api/auth/login", MockReply::json(200, LOGIN_OK));
    mock.on(Method::Get, "/api/auth/profile", MockReply::json(200, PROFILE_OK));
    auth.login("ada@example.com", "Secret123").await.unwrap();

    mock.replace(
        Method::Get,
        "/api/auth/profile",
        MockReply::json(
            200,
            r#"{"user":{"userId":"u1","email":"ada@example.com","username":"ada"},
                "gameStats":{"currentScore":2000,"lastPlayed":null,"rank":1,"totalPlayers":41}}"#,
        ),
    );
    auth.refresh_profile().await;
    let stats = auth.game_stats().unwrap();
    assert_eq!(stats.current_score, 2000);
    assert_eq!(stats.rank, Some(1));
}

#[tokio::test]
async fn test_register_weak_password_never_sends() {
    let (auth, mock) = manager(MemoryStore::new());
    let err = auth
        .register("ada@example.com", "password", "ada")
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Validation(_)));
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn test_register_does_not_sign_in() {
    let (auth, mock) = manager(MemoryStore::new());
    mock.on(
        Method::Post,
        "/api/auth/register",
        MockReply::json(201, r#"{"message":"User registered","userSub":"sub-1"}"#),
    );
    let resp = auth
        .register("ada@example.com", "Secret123", "ada")
        .await
        .unwrap();
    assert_eq!(resp.user_sub, "sub-1");
    assert!(!auth.is_authenticated());
}

#[tokio::test]
async fn test_confirm_email_requires_code() {
    let (auth, mock) = manager(MemoryStore::new());
    assert!(auth.confirm_email("ada@example.com", "").await.is_err());
    assert!(mock.requests().is_empty());

    mock.on(
        Method::Post,
        "/api/auth/confirm",
        MockReply::json(200, r#"{"message":"Email confirmed"}"#),
    );
    let resp = auth.confirm_email("ada@example.com", "123456").await.unwrap();
    assert_eq!(resp.message, "Email confirmed");
}
