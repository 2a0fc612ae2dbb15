//! Music stats routes - the landing page and the cached track collection

use actix_web::{get, web, HttpResponse, Responder};

use super::AppState;

const LANDING_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>spinstats</title>
</head>
<body>
  <h1>spinstats</h1>
  <p>Listening stats are served at <a href="/music">/music</a>.</p>
</body>
</html>
"#;

/// GET / — static landing page
#[get("/")]
pub async fn landing() -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(LANDING_PAGE)
}

/// GET /music — refresh the cache when stale, then serve whatever is on
/// disk. A failed refresh still answers with the previous (possibly empty)
/// data; no upstream failure reaches the caller.
#[get("/music")]
pub async fn music(state: web::Data<AppState>) -> impl Responder {
    state.cache.ensure_fresh(|| state.engine.sync()).await;
    HttpResponse::Ok().json(state.cache.load())
}
