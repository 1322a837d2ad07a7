//! Integration tests for role resolution against a mock portal backend.
//!
//! # Purpose
//! Exercise the full path: config, HTTP identity source, resolver, session,
//! override controller and section gating.
//!
//! # How to use
//! Run with `cargo test -p portal-client --test resolver_http`.
mod common;

use axum::http::StatusCode;
use common::{EnvGuard, MockBackend, base_url, spawn, token_with_roles};
use portal_authz::{
    ClaimRules, EffectiveRole, NavigationSection, OrganizationId, Role, RoleSource, UserId,
};
use portal_client::credentials::{HEADER_ORG_ID, HEADER_ROLE, HEADER_USER_ID};
use portal_client::overrides::{clear_override, set_override};
use portal_client::{
    ClientConfig, Credentials, HttpIdentitySource, PortalHttp, RoleResolver, Session,
    SessionSnapshot,
};
use serde_json::json;
use serial_test::serial;
use std::sync::Arc;

fn resolver_for(addr: std::net::SocketAddr) -> RoleResolver {
    let http = PortalHttp::with_client(base_url(addr), reqwest::Client::new());
    RoleResolver::new(
        Arc::new(HttpIdentitySource::with_http(http)),
        ClaimRules::default(),
    )
}

#[tokio::test]
async fn backend_role_wins_and_bearer_is_sent() {
    let backend = Arc::new(MockBackend::new().with_identity(
        StatusCode::OK,
        json!({"role": "Owner", "user_id": 7, "org_id": 12}),
    ));
    let addr = spawn(backend.clone()).await;
    let token = token_with_roles(json!(["member"]));
    let creds = Credentials::bearer(token.clone());
    let session = Session::new();

    let outcome = resolver_for(addr).resolve(&session, Some(&creds)).await;

    assert_eq!(outcome.effective, EffectiveRole::Resolved(Role::Owner));
    assert_eq!(session.organization_id(), Some(OrganizationId::new(12)));
    assert_eq!(session.user_id(), Some(UserId::new(7)));
    let headers = backend.identity_headers();
    assert_eq!(headers.len(), 1);
    assert_eq!(
        headers[0]
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok()),
        Some(format!("Bearer {token}").as_str())
    );
    let sections = session.visible_sections();
    assert!(sections.contains(&NavigationSection::AdminDashboard));
    assert!(!sections.contains(&NavigationSection::MyRequests));
}

#[tokio::test]
async fn duplicate_org_keys_keep_backend_role() {
    let backend = Arc::new(MockBackend::new().with_identity(
        StatusCode::OK,
        json!({"role": "owner", "user_id": 7, "org_id": 12, "organization_id": 12}),
    ));
    let addr = spawn(backend).await;
    let creds = Credentials::bearer(token_with_roles(json!(["member"])));
    let session = Session::new();

    let outcome = resolver_for(addr).resolve(&session, Some(&creds)).await;

    assert_eq!(outcome.effective, EffectiveRole::Resolved(Role::Owner));
    assert_eq!(
        outcome.principal.map(|principal| principal.source),
        Some(RoleSource::Backend)
    );
    assert_eq!(session.organization_id(), Some(OrganizationId::new(12)));
}

#[tokio::test]
async fn non_numeric_org_id_keeps_backend_role() {
    let backend = Arc::new(MockBackend::new().with_identity(
        StatusCode::OK,
        json!({"role": "owner", "user_id": 7, "org_id": "org-12"}),
    ));
    let addr = spawn(backend).await;
    let creds = Credentials::bearer(token_with_roles(json!(["member"])));
    let session = Session::new();

    let outcome = resolver_for(addr).resolve(&session, Some(&creds)).await;

    assert_eq!(outcome.effective, EffectiveRole::Resolved(Role::Owner));
    assert_eq!(
        outcome.principal.map(|principal| principal.source),
        Some(RoleSource::Backend)
    );
    assert_eq!(session.organization_id(), None);
    assert_eq!(session.user_id(), Some(UserId::new(7)));
}

#[tokio::test]
async fn server_error_falls_back_to_token_claims() {
    let backend = Arc::new(
        MockBackend::new().with_identity(StatusCode::INTERNAL_SERVER_ERROR, json!({})),
    );
    let addr = spawn(backend.clone()).await;
    let creds = Credentials::bearer(token_with_roles(json!(["approve_requests"])));
    let session = Session::new();

    let outcome = resolver_for(addr).resolve(&session, Some(&creds)).await;

    assert_eq!(outcome.effective, EffectiveRole::Resolved(Role::Admin));
    let principal = outcome.principal.expect("principal");
    assert_eq!(principal.source, RoleSource::TokenClaims);
    assert_eq!(principal.organization_id, Some(OrganizationId::new(12)));
    assert_eq!(backend.identity_calls(), 1);
}

#[tokio::test]
async fn unreachable_backend_and_garbage_token_stay_resolving() {
    let resolver = RoleResolver::new(
        Arc::new(HttpIdentitySource::with_http(PortalHttp::with_client(
            "http://127.0.0.1:1",
            reqwest::Client::new(),
        ))),
        ClaimRules::default(),
    );
    let session = Session::new();
    let creds = Credentials::bearer("not.a.jwt");

    let outcome = resolver.resolve(&session, Some(&creds)).await;

    assert_eq!(outcome.effective, EffectiveRole::Resolving);
    assert_eq!(
        session.visible_sections().into_iter().collect::<Vec<_>>(),
        vec![NavigationSection::Main]
    );
}

#[tokio::test]
async fn header_credentials_reach_the_backend() {
    let backend =
        Arc::new(MockBackend::new().with_identity(StatusCode::OK, json!({"role": "member"})));
    let addr = spawn(backend.clone()).await;
    let creds = Credentials::headers(OrganizationId::new(12), UserId::new(7), Role::Member);
    let session = Session::new();

    let outcome = resolver_for(addr).resolve(&session, Some(&creds)).await;

    assert_eq!(outcome.effective, EffectiveRole::Resolved(Role::Member));
    assert_eq!(session.organization_id(), Some(OrganizationId::new(12)));
    let headers = backend.identity_headers();
    assert_eq!(headers[0].get(HEADER_ORG_ID).expect("org id"), "12");
    assert_eq!(headers[0].get(HEADER_USER_ID).expect("user id"), "7");
    assert_eq!(headers[0].get(HEADER_ROLE).expect("role"), "member");
}

#[tokio::test]
async fn base_role_is_fixed_for_the_session() {
    let backend =
        Arc::new(MockBackend::new().with_identity(StatusCode::OK, json!({"role": "admin"})));
    let addr = spawn(backend.clone()).await;
    let resolver = resolver_for(addr);
    let session = Session::new();

    resolver.resolve(&session, None).await;
    backend.set_identity(StatusCode::OK, json!({"role": "superadmin"}));
    let again = resolver.resolve(&session, None).await;

    assert_eq!(again.effective, EffectiveRole::Resolved(Role::Admin));
    assert_eq!(backend.identity_calls(), 1);
}

#[tokio::test]
async fn concurrent_mounts_issue_one_identity_call() {
    let backend =
        Arc::new(MockBackend::new().with_identity(StatusCode::OK, json!({"role": "owner"})));
    let addr = spawn(backend.clone()).await;
    let resolver = resolver_for(addr);
    let session = Session::new();

    let outcomes = futures::future::join_all(
        (0..8).map(|_| resolver.resolve(&session, None)),
    )
    .await;

    assert!(
        outcomes
            .iter()
            .all(|outcome| outcome.effective == EffectiveRole::Resolved(Role::Owner))
    );
    assert_eq!(backend.identity_calls(), 1);
}

#[tokio::test]
async fn superadmin_override_round_trip() {
    let backend =
        Arc::new(MockBackend::new().with_identity(StatusCode::OK, json!({"role": "superadmin"})));
    let addr = spawn(backend).await;
    let session = Session::new();
    resolver_for(addr).resolve(&session, None).await;

    assert_eq!(
        set_override(&session, Role::Member),
        EffectiveRole::Resolved(Role::Member)
    );
    assert!(
        session
            .visible_sections()
            .contains(&NavigationSection::MyRequests)
    );
    assert_eq!(session.snapshot().role, Some(Role::Superadmin));
    assert_eq!(
        clear_override(&session),
        EffectiveRole::Resolved(Role::Superadmin)
    );

    session.sign_out();
    assert_eq!(session.effective_role(), EffectiveRole::Resolving);
}

#[tokio::test]
async fn restored_session_prefers_live_backend() {
    let backend =
        Arc::new(MockBackend::new().with_identity(StatusCode::OK, json!({"role": "member"})));
    let addr = spawn(backend).await;
    let session = Session::restore(SessionSnapshot {
        organization_id: Some(OrganizationId::new(12)),
        user_id: Some(UserId::new(7)),
        role: Some(Role::Owner),
    });

    let outcome = resolver_for(addr).resolve(&session, None).await;

    assert_eq!(outcome.effective, EffectiveRole::Resolved(Role::Member));
}

#[tokio::test]
#[serial]
async fn env_config_drives_identity_source() {
    let backend =
        Arc::new(MockBackend::new().with_identity(StatusCode::OK, json!({"role": "owner"})));
    let addr = spawn(backend.clone()).await;
    let _url = EnvGuard::set("PORTAL_API_URL", &base_url(addr));
    let _aliases = EnvGuard::set("PORTAL_SUPERADMIN_ALIASES", "");

    let config = ClientConfig::from_env();
    let resolver = RoleResolver::new(
        Arc::new(HttpIdentitySource::new(&config).expect("http client")),
        config.claim_rules(),
    );
    let session = Session::new();
    let outcome = resolver.resolve(&session, None).await;

    assert_eq!(outcome.effective, EffectiveRole::Resolved(Role::Owner));
    assert!(config.claim_rules().superadmin_aliases().is_empty());
    assert_eq!(backend.identity_calls(), 1);
}
