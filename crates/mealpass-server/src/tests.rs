//! End-to-end router tests against an in-memory store.

use std::sync::{Arc, Mutex};

use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use axum::{
  body::Body,
  http::{HeaderMap, Request, StatusCode, header},
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use mealpass_core::{
  clock::{CivilClock, FixedClock},
  notify::{DeliveryNotice, Notifier, NotifyError},
  registrar::RegistrarPolicy,
  store::DeliveryStore,
  user::Role,
  window::AccessConfig,
};
use mealpass_store_sqlite::{NewPerson, SqliteStore};
use rand_core::OsRng;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use super::*;

// ─── Fixture ──────────────────────────────────────────────────────────────────

#[derive(Default)]
struct TestNotifier {
  sent: Mutex<Vec<DeliveryNotice>>,
  fail: bool,
}

impl Notifier for TestNotifier {
  async fn notify(&self, notice: &DeliveryNotice) -> Result<(), NotifyError> {
    if self.fail {
      return Err(NotifyError::Transport("connection refused".into()));
    }
    self.sent.lock().unwrap().push(notice.clone());
    Ok(())
  }
}

type State = AppState<SqliteStore, TestNotifier>;

struct Harness {
  state: State,
  clock: Arc<FixedClock>,
}

/// 12:00 in Santiago on 2024-05-01.
fn noon() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 5, 1, 16, 0, 0).unwrap() }

const PASSWORD: &str = "secret";
const ANA: i64 = 7;

/// Users `frontdesk` (operator), `auditor` (viewer) and `retired` (inactive
/// operator); persons 1-6 without email and person 7, Ana Rojas, with one.
/// The window is 08:00-14:00 and the clock reads 12:00.
async fn harness_with(roles: &[Role], fail_notify: bool) -> Harness {
  let store = SqliteStore::open_in_memory().await.unwrap();

  let salt = SaltString::generate(&mut OsRng);
  let hash = Argon2::default()
    .hash_password(PASSWORD.as_bytes(), &salt)
    .unwrap()
    .to_string();
  store.add_user("frontdesk", &hash, Role::Operator, true).await.unwrap();
  store.add_user("auditor", &hash, Role::Viewer, true).await.unwrap();
  store.add_user("retired", &hash, Role::Operator, false).await.unwrap();

  for i in 1..ANA {
    store.add_person(NewPerson::new(format!("Person {i}"))).await.unwrap();
  }
  let ana = store
    .add_person(NewPerson {
      email: Some("ana@example.com".into()),
      ..NewPerson::new("Ana Rojas")
    })
    .await
    .unwrap();
  assert_eq!(ana.id, ANA);

  store
    .set_access_config(&AccessConfig {
      window_start:            Some("08:00".into()),
      window_end:              Some("14:00".into()),
      closed_message:          Some("Kitchen closed".into()),
      fallback_notify_address: Some("admin@example.com".into()),
    })
    .await
    .unwrap();

  let clock = Arc::new(FixedClock::new(noon()));
  let state = AppState {
    store:    Arc::new(store),
    notifier: Arc::new(TestNotifier { fail: fail_notify, ..Default::default() }),
    sessions: Arc::new(SessionSigner::new("test-secret").unwrap()),
    clock:    CivilClock::with_zone_name(clock.clone(), "America/Santiago").unwrap(),
    policy:   Arc::new(RegistrarPolicy { roles: roles.to_vec(), ..Default::default() }),
    config:   Arc::new(ServerConfig {
      session_secret: "test-secret".to_string(),
      registrar_roles: roles.to_vec(),
      ..Default::default()
    }),
  };
  Harness { state, clock }
}

async fn harness() -> Harness { harness_with(&Role::ALL, false).await }

struct Reply {
  status:  StatusCode,
  headers: HeaderMap,
  body:    Value,
}

async fn send(
  state:  &State,
  method: &str,
  uri:    &str,
  cookie: Option<&str>,
  body:   Option<&str>,
) -> Reply {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(cookie) = cookie {
    builder = builder.header(header::COOKIE, cookie);
  }
  if body.is_some() {
    builder = builder.header(header::CONTENT_TYPE, "application/json");
  }
  let req = builder
    .body(Body::from(body.unwrap_or_default().to_string()))
    .unwrap();

  let resp = router(state.clone()).oneshot(req).await.unwrap();
  let status = resp.status();
  let headers = resp.headers().clone();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let body = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  Reply { status, headers, body }
}

fn set_cookie(reply: &Reply) -> &str {
  reply
    .headers
    .get(header::SET_COOKIE)
    .expect("Set-Cookie header")
    .to_str()
    .unwrap()
}

/// Log in and return the `session=...` pair for a `Cookie` header.
async fn login(state: &State, username: &str) -> String {
  let body = json!({ "username": username, "password": PASSWORD }).to_string();
  let reply = send(state, "POST", "/login", None, Some(&body)).await;
  assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
  set_cookie(&reply).split(';').next().unwrap().to_string()
}

async fn register(state: &State, cookie: &str, person_id: Value) -> Reply {
  let body = json!({ "personId": person_id }).to_string();
  send(state, "POST", "/deliveries", Some(cookie), Some(&body)).await
}

fn error_of(reply: &Reply) -> &str { reply.body["error"].as_str().unwrap_or_default() }

// ─── Login ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn login_sets_session_cookie_and_redirects_by_role() {
  let h = harness().await;

  let body = json!({ "username": "  frontdesk ", "password": PASSWORD }).to_string();
  let reply = send(&h.state, "POST", "/login", None, Some(&body)).await;
  assert_eq!(reply.status, StatusCode::OK);
  assert_eq!(reply.body["redirectTo"], "/queue");

  let cookie = set_cookie(&reply);
  assert!(cookie.starts_with("session="), "{cookie}");
  assert!(cookie.contains("HttpOnly"), "{cookie}");
  assert!(cookie.contains("SameSite=Lax"), "{cookie}");
  assert!(cookie.contains("Max-Age=43200"), "{cookie}");

  let user = h.state.store.find_user("frontdesk").await.unwrap().unwrap();
  assert_eq!(user.last_login_at, Some(noon()));

  let body = json!({ "username": "auditor", "password": PASSWORD }).to_string();
  let reply = send(&h.state, "POST", "/login", None, Some(&body)).await;
  assert_eq!(reply.body["redirectTo"], "/metrics");
}

#[tokio::test]
async fn login_with_blank_fields_is_bad_request() {
  let h = harness().await;
  for body in [
    json!({ "username": "   ", "password": PASSWORD }),
    json!({ "username": "frontdesk", "password": "" }),
    json!({}),
  ] {
    let reply = send(&h.state, "POST", "/login", None, Some(&body.to_string())).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{body}");
  }
}

#[tokio::test]
async fn login_with_bad_credentials_is_unauthorized() {
  let h = harness().await;
  for (username, password) in [("frontdesk", "wrong"), ("nobody", PASSWORD)] {
    let body = json!({ "username": username, "password": password }).to_string();
    let reply = send(&h.state, "POST", "/login", None, Some(&body)).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED, "{username}");
    assert!(!reply.headers.contains_key(header::SET_COOKIE));
  }
}

#[tokio::test]
async fn login_to_disabled_account_is_forbidden() {
  let h = harness().await;
  let body = json!({ "username": "retired", "password": PASSWORD }).to_string();
  let reply = send(&h.state, "POST", "/login", None, Some(&body)).await;
  assert_eq!(reply.status, StatusCode::FORBIDDEN);
}

// ─── Session & logout ─────────────────────────────────────────────────────────

#[tokio::test]
async fn session_endpoint_returns_claims() {
  let h = harness().await;
  let cookie = login(&h.state, "frontdesk").await;

  let reply = send(&h.state, "GET", "/session", Some(&cookie), None).await;
  assert_eq!(reply.status, StatusCode::OK);
  assert_eq!(reply.body["displayName"], "frontdesk");
  assert_eq!(reply.body["role"], "operator");
  assert_eq!(reply.body["expiresAt"], noon().timestamp() + 43_200);

  let reply = send(&h.state, "GET", "/session", None, None).await;
  assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_session_is_treated_as_signed_out() {
  let h = harness().await;
  let cookie = login(&h.state, "frontdesk").await;

  h.clock.set(noon() + chrono::TimeDelta::hours(13));
  let reply = send(&h.state, "GET", "/session", Some(&cookie), None).await;
  assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
  assert_eq!(error_of(&reply), "please sign in");
}

#[tokio::test]
async fn logout_clears_cookie_without_a_body() {
  let h = harness().await;
  let reply = send(&h.state, "POST", "/logout", None, None).await;

  assert_eq!(reply.status, StatusCode::NO_CONTENT);
  assert_eq!(reply.body, Value::Null);
  assert_eq!(
    reply.headers.get(header::CACHE_CONTROL).unwrap(),
    "no-store, no-cache, must-revalidate, proxy-revalidate"
  );
  let cookie = set_cookie(&reply);
  assert!(cookie.starts_with("session=;"), "{cookie}");
  assert!(cookie.contains("Max-Age=0"), "{cookie}");
}

// ─── Deliveries ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn first_registration_succeeds_and_second_conflicts() {
  let h = harness().await;
  let cookie = login(&h.state, "frontdesk").await;

  let reply = register(&h.state, &cookie, json!(ANA)).await;
  assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
  assert_eq!(reply.body["person"]["id"], ANA);
  assert_eq!(reply.body["person"]["fullName"], "Ana Rojas");
  assert_eq!(reply.body["person"]["email"], "ana@example.com");
  assert_eq!(reply.body["createdBy"], "frontdesk");
  assert_eq!(reply.body["emailSent"], true);
  assert_eq!(reply.body["emailFallback"], false);
  let delivery_id = reply.body["deliveryId"].as_i64().unwrap();

  let reply = register(&h.state, &cookie, json!(ANA)).await;
  assert_eq!(reply.status, StatusCode::CONFLICT);
  assert_eq!(error_of(&reply), "already registered today");
  assert_eq!(reply.body["deliveryId"], delivery_id);

  let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
  assert_eq!(h.state.store.deliveries_on(today).await.unwrap().len(), 1);
  assert_eq!(h.state.notifier.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn registration_requires_a_valid_session() {
  let h = harness().await;

  let reply = register(&h.state, "session=forged.token", json!(ANA)).await;
  assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
  assert_eq!(error_of(&reply), "please sign in");

  let body = json!({ "personId": ANA }).to_string();
  let reply = send(&h.state, "POST", "/deliveries", None, Some(&body)).await;
  assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn role_outside_registrar_set_is_forbidden() {
  let h = harness_with(&[Role::Operator], false).await;
  let cookie = login(&h.state, "auditor").await;

  let reply = register(&h.state, &cookie, json!(ANA)).await;
  assert_eq!(reply.status, StatusCode::FORBIDDEN);
  assert_eq!(error_of(&reply), "role not permitted");

  let reply = send(&h.state, "GET", "/queue", Some(&cookie), None).await;
  assert_eq!(reply.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn window_end_is_inclusive() {
  let h = harness().await;
  let cookie = login(&h.state, "frontdesk").await;

  // 14:00 local.
  h.clock.set(Utc.with_ymd_and_hms(2024, 5, 1, 18, 0, 0).unwrap());
  let reply = register(&h.state, &cookie, json!(ANA)).await;
  assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);

  // 14:01 local.
  h.clock.set(Utc.with_ymd_and_hms(2024, 5, 1, 18, 1, 0).unwrap());
  let reply = register(&h.state, &cookie, json!(1)).await;
  assert_eq!(reply.status, StatusCode::FORBIDDEN);
  assert_eq!(error_of(&reply), "Kitchen closed");
}

#[tokio::test]
async fn closed_window_is_reported_before_a_bad_body() {
  let h = harness().await;
  let cookie = login(&h.state, "frontdesk").await;
  h.clock.set(Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap());

  let reply = send(&h.state, "POST", "/deliveries", Some(&cookie), Some("not json")).await;
  assert_eq!(reply.status, StatusCode::FORBIDDEN);
  assert_eq!(error_of(&reply), "Kitchen closed");
}

#[tokio::test]
async fn malformed_person_id_is_bad_request() {
  let h = harness().await;
  let cookie = login(&h.state, "frontdesk").await;

  for body in ["not json", "{}", r#"{"personId":0}"#, r#"{"personId":"abc"}"#, r#"{"personId":-1}"#] {
    let reply = send(&h.state, "POST", "/deliveries", Some(&cookie), Some(body)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(error_of(&reply), "invalid person id", "{body}");
  }
}

#[tokio::test]
async fn whole_float_person_id_registers() {
  let h = harness().await;
  let cookie = login(&h.state, "frontdesk").await;

  let reply = send(&h.state, "POST", "/deliveries", Some(&cookie), Some(r#"{"personId":7.0}"#)).await;
  assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
  assert_eq!(reply.body["person"]["id"], ANA);
}

#[tokio::test]
async fn ineligible_person_is_bad_request_with_reason() {
  let h = harness().await;
  let cookie = login(&h.state, "frontdesk").await;

  let inactive = h
    .state
    .store
    .add_person(NewPerson { active: false, ..NewPerson::new("Luis Soto") })
    .await
    .unwrap();
  let expired = h
    .state
    .store
    .add_person(NewPerson {
      valid_to: NaiveDate::from_ymd_opt(2024, 4, 30),
      ..NewPerson::new("Marta Gil")
    })
    .await
    .unwrap();

  let cases = [
    (json!(inactive.id), "person not active"),
    (json!(expired.id), "person expired"),
    (json!(9999), "person not found"),
  ];
  for (id, message) in cases {
    let reply = register(&h.state, &cookie, id).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{message}");
    assert_eq!(error_of(&reply), message);
  }
}

#[tokio::test]
async fn notification_failure_does_not_fail_registration() {
  let h = harness_with(&Role::ALL, true).await;
  let cookie = login(&h.state, "frontdesk").await;

  let reply = register(&h.state, &cookie, json!(ANA)).await;
  assert_eq!(reply.status, StatusCode::OK);
  assert_eq!(reply.body["emailSent"], false);

  let reply = register(&h.state, &cookie, json!(ANA)).await;
  assert_eq!(reply.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn person_without_email_notifies_the_fallback_address() {
  let h = harness().await;
  let cookie = login(&h.state, "frontdesk").await;

  let reply = register(&h.state, &cookie, json!(1)).await;
  assert_eq!(reply.status, StatusCode::OK);
  assert_eq!(reply.body["person"]["email"], Value::Null);
  assert_eq!(reply.body["emailSent"], true);
  assert_eq!(reply.body["emailFallback"], true);

  let sent = h.state.notifier.sent.lock().unwrap();
  assert_eq!(sent[0].to, "admin@example.com");
  assert!(sent[0].subject().contains("Person 1"));
}

// ─── Queue ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn queue_lists_eligible_people_with_delivery_times() {
  let h = harness().await;
  let cookie = login(&h.state, "frontdesk").await;
  h.state
    .store
    .add_person(NewPerson { active: false, ..NewPerson::new("Zed Inactive") })
    .await
    .unwrap();
  register(&h.state, &cookie, json!(ANA)).await;

  let reply = send(&h.state, "GET", "/queue", Some(&cookie), None).await;
  assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
  assert_eq!(reply.body["date"], "2024-05-01");
  assert_eq!(reply.body["window"], json!({ "start": "08:00", "end": "14:00", "open": true }));

  let people = reply.body["people"].as_array().unwrap();
  assert_eq!(people.len(), ANA as usize);
  assert_eq!(people[0]["fullName"], "Ana Rojas");
  assert!(people[0]["deliveredAt"].is_string());
  assert!(people[1].get("deliveredAt").is_none());
  assert!(people.iter().all(|p| p["fullName"] != "Zed Inactive"));
}

#[tokio::test]
async fn queue_reports_closed_window() {
  let h = harness().await;
  let cookie = login(&h.state, "frontdesk").await;
  h.clock.set(Utc.with_ymd_and_hms(2024, 5, 1, 22, 0, 0).unwrap());

  let reply = send(&h.state, "GET", "/queue", Some(&cookie), None).await;
  assert_eq!(reply.status, StatusCode::OK);
  assert_eq!(reply.body["window"]["open"], false);
  assert_eq!(reply.body["window"]["closedMessage"], "Kitchen closed");
}
