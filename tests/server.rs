//! Serves a wired handler over a real socket and talks raw HTTP/1.1 to it.

use courier::{Error, Json, Request, ResponseWriter, Server, WebError, handle_func};
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::time::{Duration, timeout};

#[derive(Serialize)]
struct Echo {
    path: String,
    greeting: String,
}

async fn echo(mut req: Request, _w: ResponseWriter) -> Result<Json<Echo>, WebError> {
    let greeting: String = req.decode().await?;
    Ok(Json(Echo { path: req.path().to_owned(), greeting }))
}

async fn roundtrip(addr: std::net::SocketAddr, body: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "POST /hello HTTP/1.1\r\nhost: localhost\r\ncontent-type: application/json\r\n\
         content-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn serves_json_until_shutdown() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let server = Server::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr();
    let (stop, stopped) = oneshot::channel::<()>();

    let running = tokio::spawn(server.serve_with_shutdown(handle_func(echo), async {
        let _ = stopped.await;
    }));

    let ok = roundtrip(addr, r#""hi""#).await;
    assert!(ok.starts_with("HTTP/1.1 200 OK\r\n"), "{ok}");
    assert!(ok.contains("content-type: application/json\r\n"), "{ok}");
    assert!(ok.ends_with(r#"{"path":"/hello","greeting":"hi"}"#), "{ok}");

    let bad = roundtrip(addr, "{oops").await;
    assert!(bad.starts_with("HTTP/1.1 400 Bad Request\r\n"), "{bad}");
    assert!(bad.contains(r#""ErrorID":"INVALIDREQJSON""#), "{bad}");

    stop.send(()).unwrap();
    running.await.unwrap().unwrap();
}

#[tokio::test]
async fn idle_keep_alive_connection_does_not_block_shutdown() {
    let server = Server::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr();
    let (stop, stopped) = oneshot::channel::<()>();

    let running = tokio::spawn(server.serve_with_shutdown(handle_func(echo), async {
        let _ = stopped.await;
    }));

    // No `connection: close`: the client keeps the connection open.
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let body = r#""still here""#;
    let request = format!(
        "POST /idle HTTP/1.1\r\nhost: localhost\r\ncontent-length: {}\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let expected_tail = r#"{"path":"/idle","greeting":"still here"}"#;
    let mut response = Vec::new();
    let mut chunk = [0u8; 1024];
    while !String::from_utf8_lossy(&response).ends_with(expected_tail) {
        let n = timeout(Duration::from_secs(5), stream.read(&mut chunk)).await.unwrap().unwrap();
        assert!(n > 0, "connection closed before the response arrived");
        response.extend_from_slice(&chunk[..n]);
    }
    assert!(String::from_utf8_lossy(&response).starts_with("HTTP/1.1 200 OK\r\n"));

    stop.send(()).unwrap();
    let served = timeout(Duration::from_secs(5), running)
        .await
        .expect("serve_with_shutdown kept waiting on an idle connection");
    served.unwrap().unwrap();

    // The server closed its side of the idle connection.
    let n = timeout(Duration::from_secs(5), stream.read(&mut chunk)).await.unwrap().unwrap_or(0);
    assert_eq!(n, 0);
}

#[tokio::test]
async fn binds_host_names() {
    let server = Server::bind("localhost:0").await.unwrap();
    assert!(server.local_addr().ip().is_loopback());
    assert_ne!(server.local_addr().port(), 0);
}

#[tokio::test]
async fn rejects_unresolvable_address() {
    let err = Server::bind("not an address").await.err().unwrap();
    assert!(matches!(err, Error::Io(_)), "{err}");
}
