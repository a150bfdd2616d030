use super::{app_router, AppState, RateLimiter};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tower::ServiceExt;
use watchkeep_core::{Action, ControlFile, RegistryHandle};

const CONTROL: &str = r#"{
    "id": "test-daemon",
    "credentials": [
        { "username": "admin", "password": "secret" },
        { "username": "viewer", "password": "look", "read_only": true }
    ],
    "services": [
        { "name": "localhost", "type": "system" },
        { "name": "nginx", "type": "process",
          "start": { "argv": ["/bin/true"] }, "stop": { "argv": ["/bin/true"] } },
        { "name": "rootfs", "type": "filesystem", "path": "/" },
        { "name": "postgres", "type": "process" }
    ]
}"#;

struct Harness {
    app: Router,
    registry: RegistryHandle,
    http_stop: watch::Receiver<bool>,
}

fn harness_from(raw: &str) -> Harness {
    let control = ControlFile::parse(raw).unwrap();
    let registry = RegistryHandle::new(control.build_registry().unwrap());
    let (tx, rx) = watch::channel(false);
    let state = AppState {
        registry: registry.clone(),
        policy: Arc::new(control.access_policy()),
        run: Arc::new(control.run_info(Path::new("watchkeep.json"), "127.0.0.1:2812".parse().unwrap())),
        auth_limiter: Arc::new(RateLimiter::new(3, Duration::from_secs(60))),
        http_shutdown: Arc::new(tx),
    };
    Harness {
        app: app_router(state),
        registry,
        http_stop: rx,
    }
}

fn harness() -> Harness {
    harness_from(CONTROL)
}

fn basic(user: &str, password: &str) -> String {
    format!("Basic {}", BASE64.encode(format!("{user}:{password}")))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, form: &str, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(form.to_string())).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn pending(registry: &RegistryHandle, name: &str) -> Option<Action> {
    registry.lock().await.find(name).unwrap().pending_action
}

#[tokio::test]
async fn dashboard_is_public() {
    let h = harness();
    let response = send(&h.app, get("/")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("nginx"));
    assert!(html.find("localhost").unwrap() < html.find("rootfs").unwrap());
    assert!(!html.contains("<th>Program</th>"));
}

#[tokio::test]
async fn read_only_user_cannot_stop() {
    let h = harness();
    let response = send(
        &h.app,
        post("/nginx", "action=stop", Some(&basic("viewer", "look"))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(pending(&h.registry, "nginx").await, None);
    assert_eq!(h.registry.wakeup_count(), 0);
}

#[tokio::test]
async fn action_queues_then_conflicts() {
    let h = harness();
    let admin = basic("admin", "secret");
    let response = send(&h.app, post("/nginx", "action=stop&token=abc", Some(&admin))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("stop pending"));
    assert_eq!(pending(&h.registry, "nginx").await, Some(Action::Stop));
    assert_eq!(h.registry.wakeup_count(), 1);

    let again = send(&h.app, post("/nginx", "action=start", Some(&admin))).await;
    assert_eq!(again.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(pending(&h.registry, "nginx").await, Some(Action::Stop));
}

#[tokio::test]
async fn invalid_action_and_unknown_service() {
    let h = harness();
    let response = send(&h.app, post("/nginx", "action=explode", None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&h.app, post("/ghost", "action=start", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&h.app, get("/ghost")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn service_page_without_action_renders() {
    let h = harness();
    let response = send(&h.app, post("/rootfs", "", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Filesystem status"));
    assert!(html.contains("Enable monitoring") || html.contains("Disable monitoring"));
    assert_eq!(h.registry.wakeup_count(), 0);
}

#[tokio::test]
async fn batch_applies_until_first_conflict() {
    let h = harness();
    h.registry
        .request_action("postgres", "restart", None)
        .await
        .unwrap();

    let response = send(
        &h.app,
        post(
            "/_doaction",
            "action=start&service=nginx&service=postgres&service=rootfs",
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(pending(&h.registry, "nginx").await, Some(Action::Start));
    assert_eq!(pending(&h.registry, "postgres").await, Some(Action::Restart));
    assert_eq!(pending(&h.registry, "rootfs").await, None);
}

#[tokio::test]
async fn batch_unknown_service_is_bad_request() {
    let h = harness();
    let response = send(
        &h.app,
        post("/_doaction", "action=monitor&service=ghost", None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let noop = send(&h.app, post("/_doaction", "", None)).await;
    assert_eq!(noop.status(), StatusCode::OK);
}

#[tokio::test]
async fn summary_status_lists_services_in_order() {
    let h = harness();
    let response = send(&h.app, get("/_status?level=summary")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE].to_str().unwrap(),
        "text/plain"
    );
    let text = body_text(response).await;
    let lines: Vec<&str> = text.lines().skip(2).collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("System 'localhost'"));
    assert!(lines[3].starts_with("Process 'postgres'"));

    let bad = send(&h.app, get("/_status?format=yaml")).await;
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn xml_status_v2_has_groups() {
    let h = harness_from(
        r#"{ "services": [ { "name": "app", "type": "program" } ],
             "groups": [ { "name": "apps", "members": ["app"] } ] }"#,
    );
    let response = send(&h.app, get("/_status2?format=xml")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let xml = body_text(response).await;
    assert!(xml.contains("<name>app</name>"));
    assert!(xml.contains("servicegroup"));
}

#[tokio::test]
async fn monitor_request_shows_pending_in_status() {
    let h = harness();
    let response = send(&h.app, post("/rootfs", "action=monitor", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let text = body_text(send(&h.app, get("/_status?level=summary")).await).await;
    let line = text
        .lines()
        .find(|l| l.starts_with("Filesystem 'rootfs'"))
        .unwrap();
    assert!(line.contains("monitor pending"));
}

#[tokio::test]
async fn informational_endpoints() {
    let h = harness();
    assert_eq!(body_text(send(&h.app, get("/_ping")).await).await, "pong");
    assert_eq!(
        body_text(send(&h.app, get("/_getid")).await).await,
        "test-daemon"
    );
    assert_eq!(send(&h.app, get("/_monit")).await.status(), StatusCode::OK);
    assert_eq!(send(&h.app, get("/_about")).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn bad_credentials_are_challenged_then_throttled() {
    let h = harness();
    let wrong = basic("admin", "nope");
    for _ in 0..3 {
        let response = send(&h.app, post("/nginx", "action=stop", Some(&wrong))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers()[header::WWW_AUTHENTICATE],
            "Basic realm=\"watchkeep\""
        );
    }
    let response = send(&h.app, post("/nginx", "action=stop", Some(&wrong))).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(pending(&h.registry, "nginx").await, None);
}

#[tokio::test]
async fn throttled_client_cannot_log_in_with_right_password() {
    let h = harness();
    let wrong = basic("admin", "nope");
    for _ in 0..3 {
        send(&h.app, post("/nginx", "action=stop", Some(&wrong))).await;
    }
    let right = basic("admin", "secret");
    let response = send(&h.app, post("/nginx", "action=stop", Some(&right))).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(pending(&h.registry, "nginx").await, None);

    // anonymous requests are not throttled
    assert_eq!(send(&h.app, get("/")).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn successful_logins_are_not_counted() {
    let h = harness();
    let right = basic("admin", "secret");
    for _ in 0..5 {
        let mut request = get("/_runtime");
        request
            .headers_mut()
            .insert(header::AUTHORIZATION, right.parse().unwrap());
        assert_eq!(send(&h.app, request).await.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn allow_list_rejects_other_hosts() {
    let h = harness_from(r#"{ "allow": ["10.1.1.1"] }"#);
    let denied = Request::builder()
        .uri("/")
        .header("X-Real-IP", "10.9.9.9")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&h.app, denied).await.status(), StatusCode::FORBIDDEN);

    let allowed = Request::builder()
        .uri("/")
        .header("X-Forwarded-For", "10.1.1.1, 192.168.0.1")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&h.app, allowed).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn view_log_requires_write_access() {
    let h = harness();
    let mut denied = get("/_viewlog");
    denied.headers_mut().insert(
        header::AUTHORIZATION,
        basic("viewer", "look").parse().unwrap(),
    );
    assert_eq!(send(&h.app, denied).await.status(), StatusCode::FORBIDDEN);

    let response = send(&h.app, get("/_viewlog")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Cannot view logfile"));
}

#[tokio::test]
async fn runtime_validate_and_stop() {
    let h = harness();
    let page = send(&h.app, get("/_runtime")).await;
    assert_eq!(page.status(), StatusCode::OK);
    assert!(body_text(page).await.contains("Basic Authentication"));

    let admin = basic("admin", "secret");
    let validate = send(&h.app, post("/_runtime", "action=validate", Some(&admin))).await;
    assert_eq!(validate.status(), StatusCode::OK);
    assert_eq!(h.registry.wakeup_count(), 1);

    let other = send(&h.app, post("/_runtime", "action=reload", Some(&admin))).await;
    assert_eq!(other.status(), StatusCode::OK);
    assert!(!*h.http_stop.borrow());

    let stop = send(&h.app, post("/_runtime", "action=stop", Some(&admin))).await;
    assert_eq!(stop.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(*h.http_stop.borrow());
}

#[tokio::test]
async fn view_log_shows_escaped_contents() {
    let dir = tempfile::TempDir::new().unwrap();
    let log = dir.path().join("watchkeep.log");
    std::fs::write(&log, "started <pid 42>\n").unwrap();
    let raw = format!(r#"{{ "log_file": {:?} }}"#, log.display().to_string());
    let h = harness_from(&raw);

    let response = send(&h.app, get("/_viewlog")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("started &lt;pid 42&gt;"));
    assert!(!html.contains("<pid 42>"));
}

#[tokio::test]
async fn service_names_are_escaped_on_pages() {
    let h = harness_from(r#"{ "services": [ { "name": "a<b>", "type": "program" } ] }"#);
    let html = body_text(send(&h.app, get("/")).await).await;
    assert!(html.contains("href=\"/a%3Cb%3E\""));
    assert!(html.contains("a&lt;b&gt;"));
    assert!(!html.contains("a<b>"));

    let detail = send(&h.app, get("/a%3Cb%3E")).await;
    assert_eq!(detail.status(), StatusCode::OK);
    assert!(body_text(detail).await.contains("Program status"));
}
