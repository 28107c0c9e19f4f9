//! Minimal courier service: one handler, JSON in and out.
//!
//! Run with:
//!   RUST_LOG=courier=debug,info cargo run --example users
//!
//! Try:
//!   curl -i -X POST http://localhost:3000/users -d '{"name":"alice","age":31}'
//!   curl -i -X POST http://localhost:3000/users -d '{"name":"bob","age":-1}'
//!   curl -i -X POST http://localhost:3000/users -d '{"name":"","age":20}'
//!   curl -i http://localhost:3000/users/7
//!   curl -i http://localhost:3000/users/0
//!   curl -i http://localhost:3000/healthz

use courier::{
    Envelope, HttpError, IntoReply, Json, Reply, Request, ResponseWriter, Server, Validate,
    WebError, handle_func,
};
use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

const DEFAULT_ADDR: &str = "127.0.0.1:3000";

#[derive(Deserialize, Serialize)]
struct NewUser {
    name: String,
    age: u8,
}

impl Validate for NewUser {
    type Error = &'static str;

    fn validate(&self) -> Result<(), Self::Error> {
        if self.name.trim().is_empty() {
            return Err("name must not be blank");
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct User {
    id: u64,
    name: String,
}

#[derive(Debug, thiserror::Error)]
#[error("user {0} does not exist")]
struct NoSuchUser(u64);

impl HttpError for NoSuchUser {
    fn http_error(&self) -> (StatusCode, &str) {
        (StatusCode::NOT_FOUND, "NOSUCHUSER")
    }

    fn detail(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({"id": self.0}))
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let addr = std::env::var("COURIER_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_owned());

    let server = match Server::bind(&addr).await {
        Ok(server) => server,
        Err(err) => {
            tracing::error!(%err, "failed to bind");
            std::process::exit(1);
        }
    };

    if let Err(err) = server.serve(handle_func(users)).await {
        tracing::error!(%err, "server failed");
        std::process::exit(1);
    }
}

// courier does not route; a small match is enough for a demo.
async fn users(req: Request, w: ResponseWriter) -> Reply {
    let method = req.method().clone();
    let path = req.path().to_owned();

    match (&method, path.as_str()) {
        (&Method::POST, "/users") => create_user(req).await.into_reply(),
        (&Method::GET, "/healthz") => {
            w.write(b"ok");
            Reply::Done
        }
        (&Method::GET, path) => match path.strip_prefix("/users/").map(str::parse::<u64>) {
            Some(Ok(id)) => get_user(id),
            Some(Err(_)) => WebError::bad_request("BADUSERID").into(),
            None => WebError::not_found("NOROUTE").into(),
        },
        _ => WebError::new(StatusCode::METHOD_NOT_ALLOWED, "BADMETHOD").into(),
    }
}

// POST /users → 201 with the stored user
async fn create_user(mut req: Request) -> Result<Envelope, WebError> {
    let new: NewUser = req.decode_validated().await?;
    Ok(Envelope::new(StatusCode::CREATED, User { id: 99, name: new.name }))
}

// GET /users/{id} → 200, or 404 declared by the error itself
fn get_user(id: u64) -> Reply {
    if id == 0 {
        return Reply::declared(NoSuchUser(id));
    }
    Json(User { id, name: "alice".to_owned() }).into_reply()
}
