use std::time::Instant;

use http::Extensions;
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next, Result};

/// Logs every request the client makes. Bodies are never logged since the
/// login and attendance forms carry passwords.
pub struct RequestLogMiddleware;

#[async_trait::async_trait]
impl Middleware for RequestLogMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        let method = req.method().clone();
        let url = req.url().clone();
        let started = Instant::now();

        let result = next.run(req, extensions).await;
        match &result {
            Ok(response) => log::debug!(
                "{method} {url} -> {} {} ({:?})",
                response.status(),
                response.url(),
                started.elapsed()
            ),
            Err(err) => log::warn!("{method} {url} failed: {err}"),
        }
        result
    }
}
