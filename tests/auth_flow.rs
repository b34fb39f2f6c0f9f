mod common;

use std::sync::Arc;

use biawak::backend::{Backend, MemoryBackend, Query, PROFILES_TABLE};
use biawak::models::{AuthEvent, UserMetadata, DEFAULT_USER_NAME};
use biawak::services::AuthClient;

use common::{as_backend, register_form, TestBackend};

#[tokio::test]
async fn short_password_is_rejected_before_the_network() {
    let backend = TestBackend::new();
    let auth = AuthClient::new(as_backend(&backend));

    let err = auth
        .sign_up(&register_form("Ani", "ani@biawak.id", "12345"))
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Password minimal 6 karakter!");
    assert_eq!(backend.calls("sign_up"), 0);

    let outcome = auth
        .sign_up(&register_form("Ani", "ani@biawak.id", "123456"))
        .await
        .unwrap();
    assert_eq!(backend.calls("sign_up"), 1);
    assert_eq!(outcome.message, "Registrasi berhasil!");
    assert_eq!(outcome.user.map(|u| u.name).as_deref(), Some("Ani"));
}

#[tokio::test]
async fn sign_in_without_full_name_uses_default_name() {
    let backend = TestBackend::new();
    backend
        .inner
        .sign_up("user@example.com", "secret1", UserMetadata::default())
        .await
        .unwrap();

    let auth = AuthClient::new(as_backend(&backend));
    let mut events = auth.subscribe();

    let user = auth.sign_in("user@example.com", "secret1").await.unwrap();
    assert_eq!(user.name, DEFAULT_USER_NAME);
    assert_eq!(user.name, "Pengguna");
    assert_eq!(user.email.as_deref(), Some("user@example.com"));

    let change = events.try_next().expect("SIGNED_IN notification");
    assert_eq!(change.event, AuthEvent::SignedIn);
    assert!(change.session.is_some());
    assert!(auth.get_session().await.is_some());
}

#[tokio::test]
async fn backend_errors_are_localized() {
    let backend = TestBackend::new();
    let auth = AuthClient::new(as_backend(&backend));
    auth.sign_up(&register_form("Ani", "ani@biawak.id", "rahasia"))
        .await
        .unwrap();

    let err = auth.sign_in("ani@biawak.id", "salah123").await.unwrap_err();
    assert_eq!(err.user_message(), "Email atau password salah!");

    let err = auth
        .sign_up(&register_form("Ani", "ani@biawak.id", "rahasia"))
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Email sudah terdaftar!");
}

#[tokio::test]
async fn sign_up_waiting_for_confirmation_has_no_session() {
    let backend: Arc<dyn Backend> = Arc::new(MemoryBackend::new().with_email_confirmation());
    let auth = AuthClient::new(backend);
    let mut events = auth.subscribe();

    let outcome = auth
        .sign_up(&register_form("Budi", "budi@biawak.id", "rahasia"))
        .await
        .unwrap();
    assert!(outcome.user.is_none());
    assert_eq!(
        outcome.message,
        "Registrasi berhasil! Silakan cek email untuk verifikasi"
    );

    let change = events.try_next().expect("SIGNED_UP notification");
    assert_eq!(change.event, AuthEvent::SignedUp);
    assert!(change.session.is_none());
    assert!(auth.get_session().await.is_none());

    let err = auth.sign_in("budi@biawak.id", "rahasia").await.unwrap_err();
    assert_eq!(
        err.user_message(),
        "Silakan konfirmasi email Anda terlebih dahulu!"
    );
}

#[tokio::test]
async fn unsubscribed_listeners_stop_receiving() {
    let backend = TestBackend::new();
    let auth = AuthClient::new(as_backend(&backend));

    let first = auth.subscribe();
    let mut second = auth.subscribe();
    assert_eq!(auth.listener_count(), 2);

    auth.unsubscribe(first);
    assert_eq!(auth.listener_count(), 1);

    auth.sign_out().await;
    assert_eq!(
        second.try_next().map(|c| c.event),
        Some(AuthEvent::SignedOut)
    );
}

#[tokio::test]
async fn sign_out_clears_session_and_notifies() {
    let backend = TestBackend::new();
    let auth = AuthClient::new(as_backend(&backend));
    auth.sign_up(&register_form("Citra", "citra@biawak.id", "rahasia"))
        .await
        .unwrap();
    let mut events = auth.subscribe();

    auth.sign_out().await;
    assert_eq!(backend.calls("sign_out"), 1);
    assert!(auth.get_session().await.is_none());
    assert_eq!(events.try_next().map(|c| c.event), Some(AuthEvent::SignedOut));

    // 세션이 없으면 원격 호출 없이 알림만
    auth.sign_out().await;
    assert_eq!(backend.calls("sign_out"), 1);
    assert_eq!(events.try_next().map(|c| c.event), Some(AuthEvent::SignedOut));
}

#[tokio::test]
async fn expired_session_is_refreshed() {
    let backend = TestBackend::new();
    let auth = AuthClient::new(as_backend(&backend));
    auth.sign_up(&register_form("Dewi", "dewi@biawak.id", "rahasia"))
        .await
        .unwrap();

    backend.set_expire_sessions(true);
    auth.sign_in("dewi@biawak.id", "rahasia").await.unwrap();
    let mut events = auth.subscribe();

    let session = auth.get_session().await.expect("refreshed session");
    assert_eq!(backend.calls("refresh_session"), 1);
    assert!(!session.is_expired(chrono::Utc::now().timestamp()));
    assert_eq!(
        events.try_next().map(|c| c.event),
        Some(AuthEvent::TokenRefreshed)
    );

    // 갱신된 세션은 다시 갱신하지 않습니다.
    auth.get_session().await.expect("cached session");
    assert_eq!(backend.calls("refresh_session"), 1);
}

#[tokio::test]
async fn display_name_update_touches_metadata_and_profile() {
    let backend = TestBackend::new();
    let auth = AuthClient::new(as_backend(&backend));
    auth.sign_up(&register_form("Eka", "eka@biawak.id", "rahasia"))
        .await
        .unwrap();
    let mut events = auth.subscribe();

    let user = auth.update_display_name("  Eka Putri ").await.unwrap();
    assert_eq!(user.name, "Eka Putri");
    assert_eq!(
        events.try_next().map(|c| c.event),
        Some(AuthEvent::UserUpdated)
    );
    assert_eq!(
        auth.current_user().await.map(|u| u.name).as_deref(),
        Some("Eka Putri")
    );

    let profiles = backend
        .inner
        .select(&Query::from(PROFILES_TABLE).eq("id", user.id.as_str()), None)
        .await
        .unwrap();
    assert_eq!(profiles[0]["full_name"], "Eka Putri");

    let err = auth.update_display_name("   ").await.unwrap_err();
    assert_eq!(err.user_message(), "Nama tidak boleh kosong!");
}

#[tokio::test]
async fn password_reset_validates_email_first() {
    let backend = TestBackend::new();
    let auth = AuthClient::new(as_backend(&backend));

    assert!(auth.reset_password("bukan-email").await.is_err());
    assert_eq!(backend.calls("reset_password_for_email"), 0);

    auth.reset_password("ani@biawak.id").await.unwrap();
    assert_eq!(backend.calls("reset_password_for_email"), 1);
}
