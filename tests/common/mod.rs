#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use my_budget_client::cookies::find_cookie;
use my_budget_client::models::Credentials;
use my_budget_client::{App, Config};
use serde_json::{Value, json};
use tokio::sync::Notify;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "laravel_session";
pub const TEST_EMAIL: &str = "alice@example.com";
pub const TEST_PASSWORD: &str = "secret-password";

#[derive(Default)]
pub struct MockInner {
    /// session id -> logged-in user id
    pub sessions: HashMap<String, Option<i64>>,
    /// session id -> last issued anti-forgery token
    pub tokens: HashMap<String, String>,
    pub users: Vec<(String, Value)>,
    pub collections: HashMap<String, Vec<Value>>,
    pub next_id: i64,
    pub csrf_requests: usize,
    pub fail_csrf: bool,
    pub fail_next: Option<(StatusCode, Option<String>)>,
    pub hold: Option<Arc<Notify>>,
    pub xsrf_headers: Vec<Option<String>>,
    pub last_query: Option<HashMap<String, String>>,
}

/// In-process stand-in for the remote API, Sanctum-style: the handshake sets
/// `XSRF-TOKEN` and a session cookie, mutating calls must echo the token.
#[derive(Clone, Default)]
pub struct MockApi {
    inner: Arc<Mutex<MockInner>>,
}

impl MockApi {
    pub fn new() -> Self {
        let mock = Self::default();
        mock.lock().next_id = 100;
        mock
    }

    pub fn lock(&self) -> MutexGuard<'_, MockInner> {
        self.inner.lock().expect("mock state lock")
    }

    pub fn add_user(&self, email: &str, password: &str, name: &str) -> i64 {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.users.push((
            password.to_string(),
            json!({ "id": id, "name": name, "email": email, "avatar": null }),
        ));
        id
    }

    pub fn seed(&self, resource: &str, items: Vec<Value>) {
        self.lock().collections.insert(resource.to_string(), items);
    }

    pub fn collection(&self, resource: &str) -> Vec<Value> {
        self.lock()
            .collections
            .get(resource)
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_fail_csrf(&self, fail: bool) {
        self.lock().fail_csrf = fail;
    }

    /// The next API call (handshake excluded) fails with `status`.
    pub fn fail_next(&self, status: StatusCode, message: Option<&str>) {
        self.lock().fail_next = Some((status, message.map(str::to_string)));
    }

    /// Login, current-user and resource calls block until released.
    pub fn hold_requests(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.lock().hold = Some(notify.clone());
        notify
    }

    /// Lets held and future requests through.
    pub fn release(&self) {
        if let Some(notify) = self.lock().hold.take() {
            notify.notify_waiters();
            notify.notify_one();
        }
    }

    pub fn csrf_requests(&self) -> usize {
        self.lock().csrf_requests
    }

    pub fn xsrf_headers(&self) -> Vec<Option<String>> {
        self.lock().xsrf_headers.clone()
    }

    pub fn last_query(&self) -> Option<HashMap<String, String>> {
        self.lock().last_query.clone()
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/sanctum/csrf-cookie", get(csrf_cookie))
            .route("/login", post(login))
            .route("/register", post(register))
            .route("/logout", post(logout))
            .route("/api/user", get(current_user))
            .route("/api/user/profile", put(update_profile))
            .route("/api/user/password", put(update_password))
            .route("/api/statistics", get(statistics))
            .route("/api/{resource}", get(list_items).post(create_item))
            .route(
                "/api/{resource}/{id}",
                get(get_item).put(update_item).delete(delete_item),
            )
            .with_state(self.clone())
    }
}

fn singular(resource: &str) -> Option<&'static str> {
    match resource {
        "categories" => Some("category"),
        "deposits" => Some("deposit"),
        "expenses" => Some("expense"),
        _ => None,
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn session_id(headers: &HeaderMap) -> Option<String> {
    let header = headers.get("cookie")?.to_str().ok()?;
    find_cookie(header, SESSION_COOKIE).map(str::to_string)
}

fn record_xsrf(inner: &mut MockInner, headers: &HeaderMap) {
    let header = headers
        .get("x-xsrf-token")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    inner.xsrf_headers.push(header);
}

fn take_failure(inner: &mut MockInner) -> Option<Response> {
    inner.fail_next.take().map(|(status, message)| match message {
        Some(m) => error_response(status, &m),
        None => (status, "upstream failure").into_response(),
    })
}

fn check_csrf(inner: &mut MockInner, headers: &HeaderMap) -> Result<(), Response> {
    record_xsrf(inner, headers);
    let sent = headers.get("x-xsrf-token").and_then(|v| v.to_str().ok());
    let expected = session_id(headers).and_then(|sid| inner.tokens.get(&sid).cloned());
    match (sent, expected) {
        (Some(sent), Some(expected)) if sent == expected => Ok(()),
        _ => Err(error_response(
            StatusCode::from_u16(419).unwrap_or(StatusCode::FORBIDDEN),
            "CSRF token mismatch.",
        )),
    }
}

fn value_id(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

fn current_user_id(inner: &MockInner, headers: &HeaderMap) -> Option<i64> {
    let sid = session_id(headers)?;
    inner.sessions.get(&sid).copied().flatten()
}

fn user_by_id(inner: &MockInner, id: i64) -> Option<Value> {
    inner
        .users
        .iter()
        .map(|(_, u)| u)
        .find(|u| u["id"].as_i64() == Some(id))
        .cloned()
}

async fn wait_if_held(mock: &MockApi) {
    let hold = mock.lock().hold.clone();
    if let Some(notify) = hold {
        notify.notified().await;
    }
}

async fn csrf_cookie(State(mock): State<MockApi>, headers: HeaderMap) -> Response {
    let mut inner = mock.lock();
    inner.csrf_requests += 1;
    if inner.fail_csrf {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Handshake unavailable");
    }

    let sid = session_id(&headers).unwrap_or_else(|| Uuid::new_v4().to_string());
    inner.sessions.entry(sid.clone()).or_insert(None);

    // Characters that must survive URL-encoding in the cookie
    let token = format!("{}=+/", Uuid::new_v4());
    inner.tokens.insert(sid.clone(), token.clone());

    let mut response = StatusCode::NO_CONTENT.into_response();
    let cookies = [
        format!("XSRF-TOKEN={}; Path=/", urlencoding::encode(&token)),
        format!("{}={}; Path=/; HttpOnly", SESSION_COOKIE, sid),
    ];
    for cookie in cookies {
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    response
}

async fn login(
    State(mock): State<MockApi>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    wait_if_held(&mock).await;
    let mut inner = mock.lock();
    if let Err(r) = check_csrf(&mut inner, &headers) {
        return r;
    }
    if let Some(r) = take_failure(&mut inner) {
        return r;
    }

    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    let user_id = inner
        .users
        .iter()
        .find(|(pw, u)| u["email"] == email && pw == password)
        .and_then(|(_, u)| u["id"].as_i64());

    match (user_id, session_id(&headers)) {
        (Some(id), Some(sid)) => {
            inner.sessions.insert(sid, Some(id));
            StatusCode::NO_CONTENT.into_response()
        }
        _ => error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "These credentials do not match our records.",
        ),
    }
}

async fn register(
    State(mock): State<MockApi>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    {
        let mut inner = mock.lock();
        if let Err(r) = check_csrf(&mut inner, &headers) {
            return r;
        }
        if let Some(r) = take_failure(&mut inner) {
            return r;
        }
        let email = body["email"].as_str().unwrap_or_default();
        if inner.users.iter().any(|(_, u)| u["email"] == email) {
            return error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                "The email has already been taken.",
            );
        }
    }

    let id = mock.add_user(
        body["email"].as_str().unwrap_or_default(),
        body["password"].as_str().unwrap_or_default(),
        body["name"].as_str().unwrap_or_default(),
    );
    if let Some(sid) = session_id(&headers) {
        mock.lock().sessions.insert(sid, Some(id));
    }
    StatusCode::CREATED.into_response()
}

async fn logout(State(mock): State<MockApi>, headers: HeaderMap) -> Response {
    let mut inner = mock.lock();
    if let Err(r) = check_csrf(&mut inner, &headers) {
        return r;
    }
    if let Some(r) = take_failure(&mut inner) {
        return r;
    }
    if let Some(sid) = session_id(&headers) {
        inner.sessions.insert(sid, None);
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn current_user(State(mock): State<MockApi>, headers: HeaderMap) -> Response {
    wait_if_held(&mock).await;
    let mut inner = mock.lock();
    if let Some(r) = take_failure(&mut inner) {
        return r;
    }
    match current_user_id(&inner, &headers).and_then(|id| user_by_id(&inner, id)) {
        Some(user) => Json(user).into_response(),
        None => error_response(StatusCode::UNAUTHORIZED, "Unauthenticated."),
    }
}

async fn update_profile(
    State(mock): State<MockApi>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut inner = mock.lock();
    if let Err(r) = check_csrf(&mut inner, &headers) {
        return r;
    }
    if let Some(r) = take_failure(&mut inner) {
        return r;
    }
    let Some(id) = current_user_id(&inner, &headers) else {
        return error_response(StatusCode::UNAUTHORIZED, "Unauthenticated.");
    };

    let Some((_, user)) = inner
        .users
        .iter_mut()
        .find(|(_, u)| u["id"].as_i64() == Some(id))
    else {
        return error_response(StatusCode::NOT_FOUND, "User not found");
    };
    if let Some(fields) = body.as_object() {
        for (key, value) in fields {
            user[key.as_str()] = value.clone();
        }
    }
    let body = json!({ "message": "Profile updated", "user": user.clone() });
    Json(body).into_response()
}

async fn update_password(
    State(mock): State<MockApi>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut inner = mock.lock();
    if let Err(r) = check_csrf(&mut inner, &headers) {
        return r;
    }
    if let Some(r) = take_failure(&mut inner) {
        return r;
    }
    let Some(id) = current_user_id(&inner, &headers) else {
        return error_response(StatusCode::UNAUTHORIZED, "Unauthenticated.");
    };

    let current = body["current_password"].as_str().unwrap_or_default().to_string();
    let new_password = body["password"].as_str().unwrap_or_default().to_string();
    let Some((password, _)) = inner
        .users
        .iter_mut()
        .find(|(_, u)| u["id"].as_i64() == Some(id))
    else {
        return error_response(StatusCode::NOT_FOUND, "User not found");
    };
    if *password != current {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "The current password is incorrect.",
        );
    }
    *password = new_password;
    Json(json!({ "message": "Password updated" })).into_response()
}

async fn statistics(
    State(mock): State<MockApi>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let mut inner = mock.lock();
    if let Some(r) = take_failure(&mut inner) {
        return r;
    }
    if current_user_id(&inner, &headers).is_none() {
        return error_response(StatusCode::UNAUTHORIZED, "Unauthenticated.");
    }
    inner.last_query = Some(query.clone());
    Json(json!({
        "period": query.get("period"),
        "total_income": 1200.0,
        "total_expenses": "450.25",
        "balance": 749.75
    }))
    .into_response()
}

fn authorize(inner: &mut MockInner, headers: &HeaderMap) -> Result<(), Response> {
    if let Some(r) = take_failure(inner) {
        return Err(r);
    }
    if current_user_id(inner, headers).is_none() {
        return Err(error_response(StatusCode::UNAUTHORIZED, "Unauthenticated."));
    }
    Ok(())
}

fn filter_by_kind(items: Vec<Value>, kind: &str) -> Vec<Value> {
    let income = kind == "income";
    items
        .into_iter()
        .filter(|c| {
            let flag = &c["is_income"];
            let is_income = flag
                .as_bool()
                .or_else(|| flag.as_i64().map(|n| n != 0))
                .unwrap_or(false);
            is_income == income
        })
        .collect()
}

async fn list_items(
    State(mock): State<MockApi>,
    Path(resource): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    wait_if_held(&mock).await;
    let mut inner = mock.lock();
    if let Err(r) = authorize(&mut inner, &headers) {
        return r;
    }
    if singular(&resource).is_none() {
        return error_response(StatusCode::NOT_FOUND, "Not found");
    }
    inner.last_query = Some(query.clone());

    let mut items = inner.collections.get(&resource).cloned().unwrap_or_default();
    if let Some(kind) = query.get("type") {
        items = filter_by_kind(items, kind);
    }
    Json(json!({ resource.as_str(): items })).into_response()
}

async fn get_item(
    State(mock): State<MockApi>,
    Path((resource, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    wait_if_held(&mock).await;
    let mut inner = mock.lock();
    if let Err(r) = authorize(&mut inner, &headers) {
        return r;
    }
    let Some(key) = singular(&resource) else {
        return error_response(StatusCode::NOT_FOUND, "Not found");
    };

    let items = inner.collections.get(&resource).cloned().unwrap_or_default();
    if resource == "categories" && (id == "income" || id == "expense") {
        return Json(json!({ "categories": filter_by_kind(items, &id) })).into_response();
    }

    let id: i64 = id.parse().unwrap_or(-1);
    match items.into_iter().find(|i| value_id(&i["id"]) == Some(id)) {
        Some(item) => Json(json!({ key: item })).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Resource not found"),
    }
}

async fn create_item(
    State(mock): State<MockApi>,
    Path(resource): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    wait_if_held(&mock).await;
    let mut inner = mock.lock();
    if let Err(r) = check_csrf(&mut inner, &headers) {
        return r;
    }
    if let Err(r) = authorize(&mut inner, &headers) {
        return r;
    }
    let Some(key) = singular(&resource) else {
        return error_response(StatusCode::NOT_FOUND, "Not found");
    };

    inner.next_id += 1;
    let mut item = body;
    item["id"] = json!(inner.next_id);
    if resource == "categories" {
        let is_main = item["parent_id"].is_null();
        item["isMain"] = json!(is_main);
    }
    inner
        .collections
        .entry(resource.clone())
        .or_default()
        .push(item.clone());
    (StatusCode::CREATED, Json(json!({ key: item }))).into_response()
}

async fn update_item(
    State(mock): State<MockApi>,
    Path((resource, id)): Path<(String, i64)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    wait_if_held(&mock).await;
    let mut inner = mock.lock();
    if let Err(r) = check_csrf(&mut inner, &headers) {
        return r;
    }
    if let Err(r) = authorize(&mut inner, &headers) {
        return r;
    }
    let Some(key) = singular(&resource) else {
        return error_response(StatusCode::NOT_FOUND, "Not found");
    };

    let items = inner.collections.entry(resource.clone()).or_default();
    let Some(item) = items.iter_mut().find(|i| value_id(&i["id"]) == Some(id)) else {
        return error_response(StatusCode::NOT_FOUND, "Resource not found");
    };
    if let Some(fields) = body.as_object() {
        for (field, value) in fields {
            item[field.as_str()] = value.clone();
        }
    }
    Json(json!({ key: item.clone() })).into_response()
}

async fn delete_item(
    State(mock): State<MockApi>,
    Path((resource, id)): Path<(String, i64)>,
    headers: HeaderMap,
) -> Response {
    wait_if_held(&mock).await;
    let mut inner = mock.lock();
    if let Err(r) = check_csrf(&mut inner, &headers) {
        return r;
    }
    if let Err(r) = authorize(&mut inner, &headers) {
        return r;
    }
    if singular(&resource).is_none() {
        return error_response(StatusCode::NOT_FOUND, "Not found");
    }

    let items = inner.collections.entry(resource).or_default();
    let before = items.len();
    items.retain(|i| value_id(&i["id"]) != Some(id));
    if items.len() == before {
        return error_response(StatusCode::NOT_FOUND, "Resource not found");
    }
    StatusCode::NO_CONTENT.into_response()
}

pub struct TestApp {
    pub mock: MockApi,
    pub base_url: String,
    pub config: Config,
    pub app: App,
}

pub async fn spawn_mock(mock: &MockApi) -> anyhow::Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let router = mock.router();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(format!("http://{}", addr))
}

pub async fn setup_test_app() -> anyhow::Result<TestApp> {
    let mock = MockApi::new();
    mock.add_user(TEST_EMAIL, TEST_PASSWORD, "Alice");
    let base_url = spawn_mock(&mock).await?;
    let config = Config::new(&base_url).map_err(|e| anyhow::anyhow!(e))?;
    let app = App::new(&config)?;
    Ok(TestApp {
        mock,
        base_url,
        config,
        app,
    })
}

pub fn credentials(email: &str, password: &str) -> Credentials {
    Credentials {
        email: email.to_string(),
        password: password.to_string(),
        remember: None,
    }
}

/// A test app whose session is already authenticated.
pub async fn setup_logged_in() -> anyhow::Result<TestApp> {
    let test = setup_test_app().await?;
    test.app
        .session
        .login(&credentials(TEST_EMAIL, TEST_PASSWORD))
        .await
        .ok_or_else(|| anyhow::anyhow!("login failed: {:?}", test.mock.lock().fail_next))?;
    Ok(test)
}

/// Polls until `check` holds, giving up after roughly two seconds.
pub async fn wait_until<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
