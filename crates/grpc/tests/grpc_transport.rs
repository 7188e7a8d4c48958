//! Unary calls through `GrpcTransport` against a local tonic server.

use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use gax::call::{Deadline, Metadata};
use gax::descriptor::{HttpRule, HttpVerb, RetryClass, RpcDescriptor, ServiceDescriptor};
use gax::errors::ErrorKind;
use gax::options::ResolvedEndpoint;
use gax::transport::{OutboundCall, Transport, TransportConfig, TransportKind};
use gax::wkt::Status;
use grpc::codec::RawCodec;
use grpc::GrpcTransport;
use prost::Message;
use tonic::body::BoxBody;
use tonic::codegen::http::{self, HeaderMap};
use tonic::codegen::{empty_body, Body, BoxFuture, Context, Poll, Service, StdError};
use tonic::server::{NamedService, UnaryService};
use tonic::transport::server::TcpIncoming;
use tonic::transport::Server;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

static PING: RpcDescriptor = RpcDescriptor {
    service: "test.v1.Echo",
    method: "Ping",
    idempotent: true,
    retry: RetryClass::None,
    default_timeout: Duration::from_secs(5),
    paginated: false,
    long_running: false,
    routing: &[],
    http: HttpRule {
        verb: HttpVerb::Post,
        path: "/v1/ping",
        body: Some("*"),
    },
};

static MISSING: RpcDescriptor = RpcDescriptor {
    service: "test.v1.Echo",
    method: "Missing",
    idempotent: true,
    retry: RetryClass::None,
    default_timeout: Duration::from_secs(5),
    paginated: false,
    long_running: false,
    routing: &[],
    http: HttpRule {
        verb: HttpVerb::Post,
        path: "/v1/missing",
        body: Some("*"),
    },
};

static ECHO: ServiceDescriptor = ServiceDescriptor {
    name: "test.v1.Echo",
    default_host: "echo.googleapis.com",
    mtls_host: "echo.mtls.googleapis.com",
    endpoint_template: "echo.{UNIVERSE_DOMAIN}",
    default_port: 443,
    default_scopes: &[],
    rpcs: &[&PING, &MISSING],
};

/// Echoes `Ping` payloads back and records the request headers of every call.
#[derive(Clone, Default)]
struct EchoServer {
    seen: Arc<Mutex<Vec<HeaderMap>>>,
}

impl NamedService for EchoServer {
    const NAME: &'static str = "test.v1.Echo";
}

impl<B> Service<http::Request<B>> for EchoServer
where
    B: Body + Send + 'static,
    B::Error: Into<StdError> + Send + 'static,
{
    type Response = http::Response<BoxBody>;
    type Error = Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        self.seen.lock().unwrap().push(req.headers().clone());
        match req.uri().path() {
            "/test.v1.Echo/Ping" => Box::pin(async move {
                let mut grpc = tonic::server::Grpc::new(RawCodec);
                Ok(grpc.unary(Ping, req).await)
            }),
            _ => Box::pin(async move {
                Ok(http::Response::builder()
                    .status(200)
                    .header("grpc-status", tonic::Code::Unimplemented as i32)
                    .header(http::header::CONTENT_TYPE, "application/grpc")
                    .body(empty_body())
                    .unwrap())
            }),
        }
    }
}

/// Returns the request bytes unchanged; a message of `"in use"` is refused.
struct Ping;

impl UnaryService<Bytes> for Ping {
    type Response = Bytes;
    type Future = BoxFuture<tonic::Response<Bytes>, tonic::Status>;

    fn call(&mut self, request: tonic::Request<Bytes>) -> Self::Future {
        Box::pin(async move {
            let payload = request.into_inner();
            let decoded = Status::decode(payload.clone())
                .map_err(|e| tonic::Status::invalid_argument(e.to_string()))?;
            if decoded.message == "in use" {
                return Err(tonic::Status::failed_precondition("dataset is in use"));
            }
            Ok(tonic::Response::new(payload))
        })
    }
}

async fn serve() -> (GrpcTransport, Arc<Mutex<Vec<HeaderMap>>>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let incoming = TcpIncoming::from_listener(listener, true, None).unwrap();
    let server = EchoServer::default();
    let seen = server.seen.clone();
    tokio::spawn(
        Server::builder()
            .add_service(server)
            .serve_with_incoming(incoming),
    );

    let transport = GrpcTransport::new(TransportConfig {
        service: &ECHO,
        endpoint: ResolvedEndpoint {
            host: format!("http://{addr}"),
            universe_domain: "googleapis.com".into(),
            client_certificate: None,
            mtls: false,
        },
        kind: TransportKind::GrpcAsyncio,
        user_agent: "test-agent/1.0".into(),
    })
    .unwrap();
    (transport, seen)
}

fn message(text: &str) -> Status {
    Status {
        code: 0,
        message: text.into(),
        details: vec![],
    }
}

/// Parses a `grpc-timeout` header value (digits plus one unit letter).
fn grpc_timeout(value: &str) -> Duration {
    let (digits, unit) = value.split_at(value.len() - 1);
    let amount: u64 = digits.parse().unwrap();
    match unit {
        "H" => Duration::from_secs(amount * 3600),
        "M" => Duration::from_secs(amount * 60),
        "S" => Duration::from_secs(amount),
        "m" => Duration::from_millis(amount),
        "u" => Duration::from_micros(amount),
        "n" => Duration::from_nanos(amount),
        other => panic!("unknown grpc-timeout unit {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_unary_call_round_trips_payload_and_headers() {
    let (transport, seen) = serve().await;
    let mut metadata = Metadata::new();
    metadata.push("x-goog-request-params", "name=projects/p/locations/l/datasets/d");
    metadata.push("authorization", "Bearer t");

    let reply = transport
        .call(
            &PING,
            OutboundCall {
                request: &message("hello"),
                metadata: &metadata,
                deadline: Deadline::after(Duration::from_secs(5)),
            },
        )
        .await
        .unwrap();
    let echoed: Status = reply.decode().unwrap();
    assert_eq!(echoed.message, "hello");

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let headers = &seen[0];
    assert_eq!(
        headers.get("x-goog-request-params").unwrap(),
        "name=projects/p/locations/l/datasets/d"
    );
    assert_eq!(headers.get("authorization").unwrap(), "Bearer t");
    assert!(headers
        .get("user-agent")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("test-agent/1.0"));

    let timeout = grpc_timeout(headers.get("grpc-timeout").unwrap().to_str().unwrap());
    assert!(timeout <= Duration::from_secs(5), "{timeout:?}");
    assert!(timeout > Duration::from_secs(4), "{timeout:?}");
}

#[tokio::test]
async fn test_server_status_maps_to_error_kind() {
    let (transport, _seen) = serve().await;
    let metadata = Metadata::new();

    let err = transport
        .call(
            &PING,
            OutboundCall {
                request: &message("in use"),
                metadata: &metadata,
                deadline: Deadline::after(Duration::from_secs(5)),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::FailedPrecondition);
    assert_eq!(err.message, "dataset is in use");

    let err = transport
        .call(
            &MISSING,
            OutboundCall {
                request: &message("hello"),
                metadata: &metadata,
                deadline: Deadline::after(Duration::from_secs(5)),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unimplemented);
}

#[tokio::test]
async fn test_close_drops_channel() {
    let (transport, seen) = serve().await;
    transport.close().await;

    let metadata = Metadata::new();
    let err = transport
        .call(
            &PING,
            OutboundCall {
                request: &message("hello"),
                metadata: &metadata,
                deadline: Deadline::after(Duration::from_secs(5)),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Cancelled);
    assert!(seen.lock().unwrap().is_empty());
}
