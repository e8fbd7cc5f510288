use std::fmt;

use http::Extensions;
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next, Result};
use url::Url;

/// Raised when a request that was not aimed at the login page ends up there.
#[derive(Debug)]
pub struct SessionExpired {
    pub requested: Url,
}

impl fmt::Display for SessionExpired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session expired: {} redirected to login", self.requested)
    }
}

impl std::error::Error for SessionExpired {}

fn is_login_redirect(requested: &Url, landed: &Url, login_path: &str) -> bool {
    requested.path() != login_path && landed.path() == login_path
}

pub struct SessionGuardMiddleware {
    login_path: String,
}

impl SessionGuardMiddleware {
    pub fn new(login_url: &Url) -> Self {
        SessionGuardMiddleware {
            login_path: login_url.path().to_string(),
        }
    }
}

#[async_trait::async_trait]
impl Middleware for SessionGuardMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        let requested = req.url().clone();
        let response = next.run(req, extensions).await?;

        if is_login_redirect(&requested, response.url(), &self.login_path) {
            return Err(reqwest_middleware::Error::Middleware(anyhow::Error::new(
                SessionExpired { requested },
            )));
        }
        Ok(response)
    }
}
