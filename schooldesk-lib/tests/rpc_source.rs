//! RPC source against a local fake backend.
//!
//! The server speaks just enough of the PostgREST RPC surface: paged
//! `get_students`, the two reference functions, a status update that
//! records its request bodies, and a function that always fails.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use http_body_util::BodyExt;
use http_body_util::Full;
use hyper::Request;
use hyper::Response;
use hyper::StatusCode;
use hyper::body::Bytes;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use serde_json::Value as Json;
use serde_json::json;
use tokio::net::TcpListener;

use schooldesk_lib::auth::StaticTokenProvider;
use schooldesk_lib::error::ApiError;
use schooldesk_lib::error::Error;
use schooldesk_lib::model::RecordId;
use schooldesk_lib::model::ReferenceKind;
use schooldesk_lib::source::DataSource;
use schooldesk_lib::source::FetchParams;
use schooldesk_lib::source::RetryConfig;
use schooldesk_lib::source::RpcConfig;
use schooldesk_lib::source::RpcSource;
use schooldesk_lib::view::BulkAction;

const API_KEY: &str = "anon-key";
const TOKEN: &str = "session-jwt";

#[derive(Default)]
struct Backend {
    calls: Mutex<Vec<(String, Json)>>,
    /// Requests to `get_flaky` that still fail before it recovers.
    flaky_failures: AtomicUsize,
}

impl Backend {
    fn calls_to(&self, function: &str) -> Vec<Json> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(f, _)| f == function)
            .map(|(_, body)| body.clone())
            .collect()
    }
}

fn students() -> Vec<Json> {
    (1..=5)
        .map(|n| {
            json!({
                "id": n,
                "first_name": format!("Student {}", n),
                "branch_id": if n % 2 == 0 { "A" } else { "B" },
                "program_names": ["Robotics"],
                "admission_date": "2024-09-01",
            })
        })
        .collect()
}

fn page_of_students(body: &Json) -> Json {
    let limit = body["limit"].as_u64().unwrap_or(1000) as usize;
    let offset = body["offset"].as_u64().unwrap_or(0) as usize;
    Json::Array(students().into_iter().skip(offset).take(limit).collect())
}

fn reply(status: StatusCode, body: Json) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

async fn handle(backend: Arc<Backend>, req: Request<Incoming>) -> Response<Full<Bytes>> {
    let authorized = req.headers().get("apikey").is_some_and(|v| v == API_KEY)
        && req
            .headers()
            .get("authorization")
            .is_some_and(|v| v == format!("Bearer {}", TOKEN).as_str());
    let function = req
        .uri()
        .path()
        .trim_start_matches("/rest/v1/rpc/")
        .to_string();
    let bytes = req.into_body().collect().await.unwrap().to_bytes();
    let body: Json = serde_json::from_slice(&bytes).unwrap_or(Json::Null);
    backend.calls.lock().unwrap().push((function.clone(), body.clone()));

    if !authorized {
        return reply(
            StatusCode::UNAUTHORIZED,
            json!({"message": "JWT invalid", "code": "PGRST301"}),
        );
    }

    match function.as_str() {
        "get_students" => reply(StatusCode::OK, page_of_students(&body)),
        "get_branches" => reply(
            StatusCode::OK,
            json!([{"id": "A", "name": "Northside"}, {"id": "B", "name": "Southside"}]),
        ),
        "get_programs" => reply(
            StatusCode::OK,
            json!([
                {"id": "p1", "name": "Robotics", "branch_id": "A"},
                {"id": "p2", "name": "Art", "branch_id": "B"},
            ]),
        ),
        "get_flaky" => {
            let remaining = backend.flaky_failures.load(Ordering::SeqCst);
            if remaining > 0 {
                backend.flaky_failures.store(remaining - 1, Ordering::SeqCst);
                return reply(StatusCode::SERVICE_UNAVAILABLE, json!({"message": "try again"}));
            }
            reply(StatusCode::OK, page_of_students(&body))
        }
        "unstable_update" => {
            reply(StatusCode::SERVICE_UNAVAILABLE, json!({"message": "try again"}))
        }
        "bulk_update_student_status" => reply(StatusCode::OK, json!({"data": null, "error": null})),
        "refuse_update" => reply(
            StatusCode::OK,
            json!({"data": null, "error": {"message": "not allowed"}}),
        ),
        _ => reply(
            StatusCode::NOT_FOUND,
            json!({
                "message": format!("Could not find the function public.{}", function),
                "code": "PGRST202",
                "details": null,
                "hint": "Perhaps you meant to call another function",
            }),
        ),
    }
}

async fn serve(backend: Arc<Backend>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let backend = backend.clone();
            tokio::spawn(async move {
                let service = service_fn(move |req: Request<Incoming>| {
                    let backend = backend.clone();
                    async move { Ok::<_, Infallible>(handle(backend, req).await) }
                });
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    addr
}

async fn source(token: &str) -> (RpcSource, Arc<Backend>) {
    let backend = Arc::new(Backend::default());
    let addr = serve(backend.clone()).await;
    let config = RpcConfig::new(format!("http://{}", addr), API_KEY)
        .with_page_size(2)
        .with_function("students", "get_students")
        .with_function("flaky", "get_flaky")
        .with_retry(RetryConfig::default().initial_delay(Duration::from_millis(5)));
    let source = RpcSource::new(config, StaticTokenProvider::new(token)).unwrap();
    (source, backend)
}

#[tokio::test]
async fn test_fetch_all_drains_pages() {
    let (source, backend) = source(TOKEN).await;

    let records = source.fetch_all(&FetchParams::table("students")).await.unwrap();
    assert_eq!(records.len(), 5);
    assert_eq!(records[0].id(), &RecordId::from(1i64));
    assert_eq!(
        records[4].get_list("program_names").unwrap(),
        Some(&["Robotics".to_string()][..])
    );

    let offsets: Vec<u64> = backend
        .calls_to("get_students")
        .iter()
        .map(|body| body["offset"].as_u64().unwrap())
        .collect();
    assert_eq!(offsets, vec![0, 2, 4]);
}

#[tokio::test]
async fn test_filters_are_passed_through() {
    let (source, backend) = source(TOKEN).await;

    let params = FetchParams::table("students").filter("academic_year", "2024");
    source.fetch_all(&params).await.unwrap();

    let calls = backend.calls_to("get_students");
    assert!(calls.iter().all(|body| body["academic_year"] == "2024"));
}

#[tokio::test]
async fn test_fetch_reference() {
    let (source, _backend) = source(TOKEN).await;

    let programs = source.fetch_reference(&ReferenceKind::Programs).await.unwrap();
    assert_eq!(programs.len(), 2);
    assert_eq!(programs.label("p2"), Some("Art"));

    let under_a: Vec<_> = programs.programs_for_branch(Some("A")).map(|p| p.id.clone()).collect();
    assert_eq!(under_a, vec!["p1".to_string()]);
}

#[tokio::test]
async fn test_mutate_sends_ids_and_value() {
    let (source, backend) = source(TOKEN).await;

    let action = BulkAction::mark("students", "bulk_update_student_status", "status", "inactive")
        .with_param("reason", "graduated");
    source
        .mutate(&action, &[RecordId::from(2i64), RecordId::from(4i64)])
        .await
        .unwrap();

    let calls = backend.calls_to("bulk_update_student_status");
    assert_eq!(
        calls,
        vec![json!({"ids": ["2", "4"], "status": "inactive", "reason": "graduated"})]
    );
}

#[tokio::test]
async fn test_in_band_error_fails_mutation() {
    let (source, _backend) = source(TOKEN).await;

    let action = BulkAction::delete("students", "refuse_update");
    let err = source.mutate(&action, &[RecordId::from(1i64)]).await.unwrap_err();
    assert!(matches!(err, Error::Api(ApiError::Remote(ref m)) if m == "not allowed"));
}

#[tokio::test]
async fn test_postgrest_error_body_is_parsed() {
    let (source, _backend) = source(TOKEN).await;

    let err = source.fetch_all(&FetchParams::table("payments")).await.unwrap_err();
    match err {
        Error::Api(ApiError::Http { status, code, details, .. }) => {
            assert_eq!(status, 404);
            assert_eq!(code.as_deref(), Some("PGRST202"));
            assert!(details.is_some());
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_bad_token_is_rejected() {
    let (source, _backend) = source("stale").await;

    let err = source.fetch_all(&FetchParams::table("students")).await.unwrap_err();
    assert!(matches!(err, Error::Api(ApiError::Http { status: 401, .. })));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_reads_retry_transient_failures() {
    let (source, backend) = source(TOKEN).await;
    backend.flaky_failures.store(2, Ordering::SeqCst);

    let records = source.fetch_all(&FetchParams::table("flaky")).await.unwrap();
    assert_eq!(records.len(), 5);
    // Two failures and a success at offset 0, then offsets 2 and 4.
    assert_eq!(backend.calls_to("get_flaky").len(), 5);
}

#[tokio::test]
async fn test_reads_give_up_after_max_retries() {
    let (source, backend) = source(TOKEN).await;
    backend.flaky_failures.store(10, Ordering::SeqCst);

    let err = source.fetch_all(&FetchParams::table("flaky")).await.unwrap_err();
    assert!(matches!(err, Error::Api(ApiError::Http { status: 503, .. })));
    assert_eq!(backend.calls_to("get_flaky").len(), 4);
}

#[tokio::test]
async fn test_mutations_are_not_retried() {
    let (source, backend) = source(TOKEN).await;

    let action = BulkAction::delete("students", "unstable_update");
    assert!(source.mutate(&action, &[RecordId::from(1i64)]).await.is_err());
    assert_eq!(backend.calls_to("unstable_update").len(), 1);
}
