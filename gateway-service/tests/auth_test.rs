mod common;

use common::{Delivery, Harness, VALID_TOTP};
use gateway_service::models::{RolePolicy, SessionTrustPayload, UserProfile, UserUpdate, ADMIN_ROLE};
use gateway_service::providers::AuthCoreProvider;
use gateway_service::services::ServiceError;

#[tokio::test]
async fn test_login_selects_first_tenant_and_reports_trust_flags() {
    let h = Harness::new();
    let (admin, tenant, _) = h.tenant_admin("owner@acme.test").await;

    let res = h
        .state
        .auth_service
        .login("owner@acme.test", "Passw0rd!")
        .await
        .unwrap();

    assert_eq!(res.user.id, admin.id);
    assert_eq!(res.tenant.as_ref().map(|t| t.id.as_str()), Some(tenant.id.as_str()));
    assert_eq!(res.available_tenants.len(), 1);
    assert_eq!(res.available_tenants[0].name, "Acme");
    assert_eq!(res.role.as_deref(), Some(ADMIN_ROLE));
    assert_eq!(res.permissions, Some(RolePolicy::root_admin().permissions));
    assert!(res.mfa_enforced);
    assert!(!res.mfa_enabled);
    assert!(res.requires_mfa);
    assert!(!res.requires_password_change);

    let session = h
        .state
        .auth_service
        .verify_session(&res.tokens.access_token)
        .await
        .unwrap();
    assert_eq!(
        session.payload,
        SessionTrustPayload {
            mfa_enforced: true,
            ..Default::default()
        }
    );
}

#[tokio::test]
async fn test_login_without_tenant_has_no_role() {
    let h = Harness::new();
    h.identity.seed_user("solo@acme.test", "Passw0rd!");

    let res = h
        .state
        .auth_service
        .login("solo@acme.test", "Passw0rd!")
        .await
        .unwrap();
    assert!(res.tenant.is_none());
    assert!(res.available_tenants.is_empty());
    assert!(res.role.is_none());
    assert!(res.permissions.is_none());
    assert!(!res.requires_mfa);
}

#[tokio::test]
async fn test_global_enforcement_requires_mfa_at_login() {
    let h = Harness::with_global_mfa();
    h.identity.seed_user("solo@acme.test", "Passw0rd!");

    let res = h
        .state
        .auth_service
        .login("solo@acme.test", "Passw0rd!")
        .await
        .unwrap();
    assert!(!res.mfa_enforced);
    assert!(res.requires_mfa);
}

#[tokio::test]
async fn test_login_with_enrolled_device_requires_step_up() {
    let h = Harness::new();
    let user = h.identity.seed_user("ada@acme.test", "Passw0rd!");
    h.identity.seed_device(&user.id, "phone", true);
    h.identity.seed_device(&user.id, "draft", false);

    let res = h
        .state
        .auth_service
        .login("ada@acme.test", "Passw0rd!")
        .await
        .unwrap();
    assert!(res.mfa_enabled);
    assert!(res.requires_mfa);
}

#[tokio::test]
async fn test_bad_credentials_are_rejected() {
    let h = Harness::new();
    h.identity.seed_user("ada@acme.test", "Passw0rd!");

    let err = h
        .state
        .auth_service
        .login("ada@acme.test", "wrong-password")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidCredentials));

    let err = h
        .state
        .auth_service
        .login("nobody@acme.test", "Passw0rd!")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidCredentials));
}

#[tokio::test]
async fn test_register_stores_names_and_opens_session() {
    let h = Harness::new();

    let res = h
        .state
        .auth_service
        .register(
            "new@acme.test",
            "Passw0rd!",
            Some("Ada".to_string()),
            Some("Lovelace".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(res.user.profile.first_name.as_deref(), Some("Ada"));
    assert_eq!(res.user.profile.last_name.as_deref(), Some("Lovelace"));
    assert_eq!(h.identity.live_sessions(&res.user.id), 1);

    let err = h
        .state
        .auth_service
        .register("new@acme.test", "Passw0rd!", None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn test_refresh_rotates_and_detects_reuse() {
    let h = Harness::new();
    let user = h.identity.seed_user("ada@acme.test", "Passw0rd!");
    let (_, first) = h.context(&user.id, SessionTrustPayload::default(), None).await;
    // A second device stays logged in until theft is detected.
    h.context(&user.id, SessionTrustPayload::default(), None).await;

    let rotated = h
        .state
        .auth_service
        .refresh(&first.refresh_token)
        .await
        .unwrap();
    assert_ne!(rotated.refresh_token, first.refresh_token);
    assert_ne!(rotated.access_token, first.access_token);
    assert!(h
        .state
        .auth_service
        .verify_session(&rotated.access_token)
        .await
        .is_ok());

    let err = h
        .state
        .auth_service
        .refresh(&first.refresh_token)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::TokenTheftDetected { ref user_id } if *user_id == user.id));
    assert_eq!(h.identity.live_sessions(&user.id), 0);
}

#[tokio::test]
async fn test_unknown_refresh_token_fails() {
    let h = Harness::new();
    let err = h.state.auth_service.refresh("refresh-404").await.unwrap_err();
    assert!(matches!(err, ServiceError::SessionRefreshFailed(_)));
}

#[tokio::test]
async fn test_logout_revokes_every_session() {
    let h = Harness::new();
    let user = h.identity.seed_user("ada@acme.test", "Passw0rd!");
    h.context(&user.id, SessionTrustPayload::default(), None).await;
    let ctx = h.trusted(&user.id, None).await;
    assert_eq!(h.identity.live_sessions(&user.id), 2);

    h.state.auth_service.logout(&ctx).await.unwrap();
    assert_eq!(h.identity.live_sessions(&user.id), 0);

    let err = h
        .state
        .auth_service
        .logout(&gateway_service::context::RequestContext::anonymous())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Unauthenticated(_)));
}

#[tokio::test]
async fn test_password_reset_does_not_reveal_unknown_emails() {
    let h = Harness::new();

    h.state
        .auth_service
        .send_password_reset("nobody@acme.test")
        .await
        .unwrap();
    assert!(h.notifier.deliveries().is_empty());
}

#[tokio::test]
async fn test_password_reset_round_trip() {
    let h = Harness::new();
    let user = h.identity.seed_user("ada@acme.test", "Passw0rd!");

    h.state
        .auth_service
        .send_password_reset("ada@acme.test")
        .await
        .unwrap();
    let token = h.identity.reset_token_for(&user.id).unwrap();
    let deliveries = h.notifier.deliveries();
    assert_eq!(deliveries.len(), 1);
    match &deliveries[0] {
        Delivery::PasswordReset { email, link } => {
            assert_eq!(email, "ada@acme.test");
            assert_eq!(link, &format!("https://app.test/auth/reset-password?token={}", token));
        }
        other => panic!("unexpected delivery: {:?}", other),
    }

    h.state
        .auth_service
        .reset_password(&token, "N3wPassword!")
        .await
        .unwrap();
    assert_eq!(h.identity.password_of(&user.id).as_deref(), Some("N3wPassword!"));

    // Tokens are single use.
    let err = h
        .state
        .auth_service
        .reset_password(&token, "Another1!")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(_)));
}

#[tokio::test]
async fn test_password_reset_delivery_failure_is_hidden() {
    let h = Harness::new();
    h.identity.seed_user("ada@acme.test", "Passw0rd!");
    h.notifier.failures.fail("send_password_reset");

    assert!(h
        .state
        .auth_service
        .send_password_reset("ada@acme.test")
        .await
        .is_ok());
}

#[tokio::test]
async fn test_password_change_requires_current_password() {
    let h = Harness::new();
    let user = h.identity.seed_user("ada@acme.test", "Passw0rd!");
    let ctx = h.trusted(&user.id, None).await;
    let update = UserUpdate {
        password: Some("N3wPassword!".to_string()),
        ..Default::default()
    };

    let err = h
        .state
        .iam_service
        .update_me(&ctx, update.clone(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(msg) if msg.contains("required")));

    let err = h
        .state
        .iam_service
        .update_me(&ctx, update, Some("not-it"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(msg) if msg == "Current password is incorrect."));
    assert_eq!(h.identity.password_of(&user.id).as_deref(), Some("Passw0rd!"));
}

#[tokio::test]
async fn test_pending_password_change_blocks_until_changed() {
    let h = Harness::new();
    let user = h.identity.seed_user("ada@acme.test", "Passw0rd!");
    h.identity
        .set_requires_password_change(&user.id, true)
        .await
        .unwrap();
    let payload = SessionTrustPayload {
        requires_password_change: true,
        ..Default::default()
    };
    let (ctx, _) = h.context(&user.id, payload, None).await;

    let err = h.state.iam_service.my_tenants(&ctx).await.unwrap_err();
    assert!(matches!(err, ServiceError::PasswordChangeRequired));

    let update = UserUpdate {
        password: Some("N3wPassword!".to_string()),
        profile: UserProfile {
            timezone: Some("Europe/London".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    let res = h
        .state
        .iam_service
        .update_me(&ctx, update, Some("Passw0rd!"))
        .await
        .unwrap();
    assert_eq!(res.user.profile.timezone.as_deref(), Some("Europe/London"));
    assert_eq!(h.identity.password_of(&user.id).as_deref(), Some("N3wPassword!"));
    assert!(!h.identity.requires_password_change(&user.id));

    let tokens = res.tokens.expect("replacement session");
    let ctx = h.state.resolver.resolve(Some(&tokens.access_token), None).await;
    assert!(!ctx.session.as_ref().unwrap().payload.requires_password_change);
    assert!(h.state.iam_service.my_tenants(&ctx).await.is_ok());
}

#[tokio::test]
async fn test_password_change_does_not_skip_mfa_setup() {
    let h = Harness::new();
    let user = h.identity.seed_user("ada@acme.test", "Passw0rd!");
    h.identity
        .set_requires_password_change(&user.id, true)
        .await
        .unwrap();
    let payload = SessionTrustPayload {
        requires_password_change: true,
        mfa_enforced: true,
        ..Default::default()
    };
    let (ctx, _) = h.context(&user.id, payload, None).await;

    // Password change outranks MFA setup on ordinary operations.
    let err = h.state.iam_service.my_tenants(&ctx).await.unwrap_err();
    assert!(matches!(err, ServiceError::PasswordChangeRequired));

    let update = UserUpdate {
        password: Some("N3wPassword!".to_string()),
        ..Default::default()
    };
    let err = h
        .state
        .iam_service
        .update_me(&ctx, update.clone(), Some("Passw0rd!"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::MfaSetupRequired));
    assert_eq!(h.identity.password_of(&user.id).as_deref(), Some("Passw0rd!"));

    // Enrollment is allowed while the password change is pending.
    h.state
        .mfa_service
        .create_totp_device(&ctx, "phone")
        .await
        .unwrap();
    let enrolled = h
        .state
        .mfa_service
        .verify_totp_device(&ctx, "phone", VALID_TOTP)
        .await
        .unwrap();
    let access = enrolled.access_token.expect("replacement access token");
    let ctx = h.state.resolver.resolve(Some(&access), None).await;
    assert!(ctx.session.as_ref().unwrap().payload.requires_password_change);

    let res = h
        .state
        .iam_service
        .update_me(&ctx, update, Some("Passw0rd!"))
        .await
        .unwrap();
    assert!(!h.identity.requires_password_change(&user.id));

    let tokens = res.tokens.expect("replacement session");
    let ctx = h.state.resolver.resolve(Some(&tokens.access_token), None).await;
    let payload = &ctx.session.as_ref().unwrap().payload;
    assert!(!payload.requires_password_change);
    assert!(payload.mfa_verified);
    assert!(h.state.iam_service.my_tenants(&ctx).await.is_ok());
}

#[tokio::test]
async fn test_profile_update_keeps_session() {
    let h = Harness::new();
    let user = h.identity.seed_user("ada@acme.test", "Passw0rd!");
    let ctx = h.trusted(&user.id, None).await;
    let update = UserUpdate {
        profile: UserProfile {
            first_name: Some("Ada".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };

    let res = h.state.iam_service.update_me(&ctx, update, None).await.unwrap();
    assert!(res.tokens.is_none());
    assert_eq!(h.state.iam_service.me(&ctx).await.unwrap().profile.first_name.as_deref(), Some("Ada"));
}
