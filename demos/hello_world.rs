//! Demo application.
//!
//! ```text
//! $ cargo run --example hello_world
//! $ curl "http://localhost:9999/"
//! Hello twig
//! $ curl "http://localhost:9999/v1/hello/geek"
//! hello geek, you're at /v1/hello/geek
//! $ curl "http://localhost:9999/assets/css/main.css"
//! {"filepath":"css/main.css"}
//! $ curl "http://localhost:9999/panic"
//! {"message":"Internal Server Error"}
//! ```

use std::time::Instant;

use serde_json::json;
use tracing_subscriber::EnvFilter;
use twig::{Context, Engine, StatusCode};

fn v2_timer(c: &mut Context) {
    let start = Instant::now();
    c.next();
    tracing::info!(
        "[{}] {} in {:?} for group v2",
        c.status_code().as_u16(),
        c.path(),
        start.elapsed()
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut engine = Engine::with_defaults();
    engine.get("/", |c| c.string(StatusCode::Ok, "Hello twig\n"))?;
    engine.get("/panic", |c| {
        let names = vec!["twig"];
        let index = c.path().len() * 100;
        c.string(StatusCode::Ok, names[index]);
    })?;
    engine.get("/assets/*filepath", |c| {
        let file = c.param("filepath").unwrap_or_default().to_owned();
        c.json(StatusCode::Ok, &json!({ "filepath": file }));
    })?;

    {
        let mut v1 = engine.group("/v1");
        v1.get("/hello/:name", |c| {
            let name = c.param("name").unwrap_or_default().to_owned();
            let body = format!("hello {name}, you're at {}\n", c.path());
            c.string(StatusCode::Ok, body);
        })?;
        v1.get("/page", |c| c.html(StatusCode::Ok, "<h1>Hello twig</h1>"))?;
    }

    {
        let mut v2 = engine.group("/v2");
        v2.use_middleware(v2_timer);
        v2.post("/login", |c| {
            let username = c.post_form("username").unwrap_or_default();
            let password = c.post_form("password").unwrap_or_default();
            c.json(
                StatusCode::Ok,
                &json!({ "username": username, "password": password }),
            );
        })?;
    }

    engine.run("127.0.0.1:9999").await?;
    Ok(())
}
