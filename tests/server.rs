//! End-to-end over TCP: hyper in front of the router.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use vireo::{Context, Error, Router, Server};

async fn start(router: Router) -> (SocketAddr, oneshot::Sender<()>, JoinHandle<Result<(), Error>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();

    let server = Server::bind(addr).max_body(64);
    let handle = tokio::spawn(server.serve_with_shutdown(listener, router, async {
        let _ = stopped.await;
    }));
    (addr, stop, handle)
}

async fn roundtrip(addr: SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut raw = Vec::new();
    let mut buf = [0u8; 4096];
    // A reset after the response (unread request bytes) still counts as the end.
    while let Ok(n) = stream.read(&mut buf).await {
        if n == 0 {
            break;
        }
        raw.extend_from_slice(&buf[..n]);
    }
    String::from_utf8_lossy(&raw).into_owned()
}

fn router() -> Router {
    Router::new().get("/users/:id", |ctx: Context| async move {
        ctx.param("id").unwrap_or_default().to_owned()
    })
}

#[tokio::test]
async fn serves_routes_and_maps_errors() {
    let (addr, stop, handle) = start(router()).await;

    let res = roundtrip(addr, "GET /users/42 HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n").await;
    assert!(res.starts_with("HTTP/1.1 200 OK\r\n"), "{res}");
    assert!(res.ends_with("\r\n\r\n42"), "{res}");

    let res = roundtrip(addr, "GET /nope HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n").await;
    assert!(res.starts_with("HTTP/1.1 404 Not Found\r\n"), "{res}");

    let res = roundtrip(addr, "BREW /users/42 HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n").await;
    assert!(res.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"), "{res}");
    assert!(res.to_ascii_lowercase().contains("allow: get\r\n"), "{res}");

    stop.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn bodies_over_the_transport_cap_are_413() {
    let (addr, stop, handle) = start(router()).await;

    let body = "x".repeat(128);
    let request = format!(
        "GET /users/1 HTTP/1.1\r\nHost: test\r\nConnection: close\r\nContent-Length: {}\r\n\r\n{body}",
        body.len(),
    );
    let res = roundtrip(addr, &request).await;
    assert!(res.starts_with("HTTP/1.1 413 Payload Too Large\r\n"), "{res}");

    stop.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn bind_failure_is_reported() {
    let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = taken.local_addr().unwrap();

    let err = Server::bind(addr).serve(router()).await.unwrap_err();
    assert!(matches!(err, Error::Io(_)), "{err}");
}
