//! End-to-end checks of the HTTP/JSON transport against a local server.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::Response;
use axum::Router;
use gax::call::{Deadline, Metadata};
use gax::descriptor::{HttpRule, HttpVerb, RetryClass, RpcDescriptor, ServiceDescriptor};
use gax::errors::ErrorKind;
use gax::longrunning::{CancelOperationRequest, ListOperationsRequest, ListOperationsResponse};
use gax::options::ResolvedEndpoint;
use gax::transport::{OutboundCall, Transport, TransportConfig, TransportKind};
use gax::wkt::Empty;
use rest::RestTransport;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

static LIST: RpcDescriptor = RpcDescriptor {
    service: "google.longrunning.Operations",
    method: "ListOperations",
    idempotent: true,
    retry: RetryClass::Transient,
    default_timeout: Duration::from_secs(10),
    paginated: true,
    long_running: false,
    routing: &[],
    http: HttpRule {
        verb: HttpVerb::Get,
        path: "/v1/{name=projects/*/locations/*}/operations",
        body: None,
    },
};

static CANCEL: RpcDescriptor = RpcDescriptor {
    service: "google.longrunning.Operations",
    method: "CancelOperation",
    idempotent: false,
    retry: RetryClass::None,
    default_timeout: Duration::from_secs(10),
    paginated: false,
    long_running: false,
    routing: &[],
    http: HttpRule {
        verb: HttpVerb::Post,
        path: "/v1/{name=projects/*/locations/*/operations/*}:cancel",
        body: Some("*"),
    },
};

static OPERATIONS: ServiceDescriptor = ServiceDescriptor {
    name: "google.longrunning.Operations",
    default_host: "aiplatform.googleapis.com",
    mtls_host: "aiplatform.mtls.googleapis.com",
    endpoint_template: "aiplatform.{UNIVERSE_DOMAIN}",
    default_port: 443,
    default_scopes: &[],
    rpcs: &[&LIST, &CANCEL],
};

#[derive(Debug, Clone)]
struct Seen {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: String,
}

struct Reply {
    status: StatusCode,
    headers: Vec<(&'static str, &'static str)>,
    body: String,
}

#[derive(Clone, Default)]
struct Fixture {
    seen: Arc<Mutex<Vec<Seen>>>,
    replies: Arc<Mutex<VecDeque<Reply>>>,
}

impl Fixture {
    fn reply(&self, status: StatusCode, body: serde_json::Value) {
        self.replies.lock().unwrap().push_back(Reply {
            status,
            headers: vec![],
            body: body.to_string(),
        });
    }
}

async fn record(
    State(fixture): State<Fixture>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let query = url::form_urlencoded::parse(uri.query().unwrap_or_default().as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    fixture.seen.lock().unwrap().push(Seen {
        method,
        path: uri.path().to_string(),
        query,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    });

    let reply = fixture.replies.lock().unwrap().pop_front().unwrap_or(Reply {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        headers: vec![],
        body: "no scripted reply".into(),
    });
    let mut response = Response::builder()
        .status(reply.status)
        .header("content-type", "application/json");
    for (name, value) in reply.headers {
        response = response.header(name, value);
    }
    response.body(Body::from(reply.body)).unwrap()
}

async fn serve(fixture: Fixture) -> RestTransport {
    let app = Router::new().fallback(record).with_state(fixture);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    RestTransport::new(TransportConfig {
        service: &OPERATIONS,
        endpoint: ResolvedEndpoint {
            host: format!("http://{addr}"),
            universe_domain: "googleapis.com".into(),
            client_certificate: None,
            mtls: false,
        },
        kind: TransportKind::Rest,
        user_agent: "test-agent/1.0".into(),
    })
    .unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_get_with_query_headers_and_json_reply() {
    let fixture = Fixture::default();
    fixture.reply(
        StatusCode::OK,
        serde_json::json!({
            "operations": [{"name": "projects/p/locations/l/operations/1", "done": true}],
            "nextPageToken": "next"
        }),
    );
    let transport = serve(fixture.clone()).await;

    let request = ListOperationsRequest {
        name: "projects/p/locations/l".into(),
        filter: "done=true".into(),
        page_size: 10,
        ..Default::default()
    };
    let mut metadata = Metadata::new();
    metadata.push("x-goog-request-params", "name=projects/p/locations/l");
    metadata.push("authorization", "Bearer t0k3n");

    let reply = transport
        .call(
            &LIST,
            OutboundCall {
                request: &request,
                metadata: &metadata,
                deadline: Deadline::after(Duration::from_secs(5)),
            },
        )
        .await
        .unwrap();
    let response: ListOperationsResponse = reply.decode().unwrap();
    assert_eq!(response.next_page_token, "next");
    assert_eq!(response.operations.len(), 1);
    assert!(response.operations[0].done);

    let seen = fixture.seen.lock().unwrap()[0].clone();
    assert_eq!(seen.method, Method::GET);
    assert_eq!(seen.path, "/v1/projects/p/locations/l/operations");
    let mut query = seen.query;
    query.sort();
    assert_eq!(
        query,
        vec![
            ("filter".to_string(), "done=true".to_string()),
            ("pageSize".to_string(), "10".to_string()),
        ]
    );
    assert_eq!(seen.headers["x-goog-request-params"], "name=projects/p/locations/l");
    assert_eq!(seen.headers["authorization"], "Bearer t0k3n");
    assert_eq!(seen.headers["user-agent"], "test-agent/1.0");
    assert!(seen.body.is_empty());
}

#[tokio::test]
async fn test_post_with_body_and_empty_reply() {
    let fixture = Fixture::default();
    fixture.replies.lock().unwrap().push_back(Reply {
        status: StatusCode::OK,
        headers: vec![],
        body: String::new(),
    });
    let transport = serve(fixture.clone()).await;

    let request = CancelOperationRequest {
        name: "projects/p/locations/l/operations/9".into(),
    };
    let metadata = Metadata::new();
    let reply = transport
        .call(
            &CANCEL,
            OutboundCall {
                request: &request,
                metadata: &metadata,
                deadline: Deadline::after(Duration::from_secs(5)),
            },
        )
        .await
        .unwrap();
    reply.decode::<Empty>().unwrap();

    let seen = fixture.seen.lock().unwrap()[0].clone();
    assert_eq!(seen.method, Method::POST);
    assert_eq!(seen.path, "/v1/projects/p/locations/l/operations/9:cancel");
    assert_eq!(seen.body, "{}");
    assert_eq!(seen.headers["content-type"], "application/json");
}

#[tokio::test]
async fn test_json_error_payload_is_mapped() {
    let fixture = Fixture::default();
    fixture.reply(
        StatusCode::NOT_FOUND,
        serde_json::json!({"error": {
            "code": 404,
            "message": "Location l not found",
            "status": "NOT_FOUND"
        }}),
    );
    fixture.replies.lock().unwrap().push_back(Reply {
        status: StatusCode::TOO_MANY_REQUESTS,
        headers: vec![("retry-after", "3")],
        body: "slow down".into(),
    });
    let transport = serve(fixture.clone()).await;

    let request = ListOperationsRequest {
        name: "projects/p/locations/l".into(),
        ..Default::default()
    };
    let metadata = Metadata::new();
    let call = || OutboundCall {
        request: &request,
        metadata: &metadata,
        deadline: Deadline::after(Duration::from_secs(5)),
    };

    let err = transport.call(&LIST, call()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(err.message, "Location l not found");

    let err = transport.call(&LIST, call()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ResourceExhausted);
    assert_eq!(err.retry_after, Some(Duration::from_secs(3)));
}

#[tokio::test]
async fn test_unbound_path_field_fails_before_sending() {
    let fixture = Fixture::default();
    let transport = serve(fixture.clone()).await;

    let request = ListOperationsRequest::default();
    let metadata = Metadata::new();
    let err = transport
        .call(
            &LIST,
            OutboundCall {
                request: &request,
                metadata: &metadata,
                deadline: Deadline::after(Duration::from_secs(5)),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidArgument);
    assert!(fixture.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_closed_transport_rejects_calls() {
    let fixture = Fixture::default();
    let transport = serve(fixture.clone()).await;
    transport.close().await;

    let request = ListOperationsRequest {
        name: "projects/p/locations/l".into(),
        ..Default::default()
    };
    let metadata = Metadata::new();
    let err = transport
        .call(
            &LIST,
            OutboundCall {
                request: &request,
                metadata: &metadata,
                deadline: Deadline::after(Duration::from_secs(5)),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Cancelled);
    assert!(fixture.seen.lock().unwrap().is_empty());
}
