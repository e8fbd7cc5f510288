use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest_cookie_store::{CookieStore, CookieStoreMutex};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use url::Url;

use crate::core::html_parser;
use crate::error::lms::LmsError;
use crate::http::random_headers::{random_desktop_platform, random_user_agent, sec_ch_ua_platform};
use crate::http::request_log_middleware::RequestLogMiddleware;
use crate::http::session_middleware::{SessionExpired, SessionGuardMiddleware};
use crate::model::attendance::AttendanceStatus;
use crate::model::course_card::CourseCard;
use crate::model::resolved_course::ResolvedCourse;
use crate::model::user_info::UserInfo;

const LOGIN_PATH: &str = "login/index.php";
const PROFILE_PATH: &str = "user/profile.php";
const CALENDAR_PATH: &str = "calendar/view.php?view=day";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How attendance pages are read; see `config.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendancePageSettings {
    pub submit_link_labels: Vec<String>,
    pub attended_labels: Vec<String>,
    /// chrono format of the session date column, e.g. `%Y年 %m月 %d日`.
    pub date_format: String,
}

/// What a course's attendance page says right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendancePageInfo {
    pub attendance_url: Option<String>,
    pub status: AttendanceStatus,
}

pub struct Lms {
    pub(crate) client: ClientWithMiddleware,
    cookie_store: Arc<CookieStoreMutex>,
    cookie_path: PathBuf,
    base_url: Url,
}

/// One cookie jar per account, as JSON lines.
pub fn default_cookie_path(username: &str) -> PathBuf {
    PathBuf::from(format!("cookies/cookies-{}.jsonl", username))
}

impl Lms {
    pub fn new(base_url: &str, username: &str) -> Result<Self, LmsError> {
        Self::with_cookie_path(base_url, default_cookie_path(username))
    }

    pub fn with_cookie_path(base_url: &str, cookie_path: PathBuf) -> Result<Self, LmsError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let platform = random_desktop_platform();
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_str(&random_user_agent(&platform))?);
        headers.insert(
            "sec-ch-ua-platform",
            HeaderValue::from_str(&sec_ch_ua_platform(&platform))?,
        );

        let cookie_store = Arc::new(CookieStoreMutex::new(load_cookie_store(&cookie_path)));

        let client = Client::builder()
            .default_headers(headers)
            .cookie_provider(Arc::clone(&cookie_store))
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let login_url = base_url.join(LOGIN_PATH)?;
        let client = ClientBuilder::new(client)
            .with(RequestLogMiddleware)
            .with(SessionGuardMiddleware::new(&login_url))
            .build();

        Ok(Lms {
            client,
            cookie_store,
            cookie_path,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves `path` (absolute or relative to the portal root).
    pub fn url(&self, path: &str) -> Result<Url, LmsError> {
        Ok(self.base_url.join(path)?)
    }

    /// `true` when the stored cookies still belong to a logged-in session.
    pub async fn check_session(&self) -> Result<bool, LmsError> {
        match self.client.get(self.url(PROFILE_PATH)?).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(reqwest_middleware::Error::Middleware(err)) if err.is::<SessionExpired>() => {
                log::info!("stored session is no longer valid");
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<bool, LmsError> {
        let login_url = self.url(LOGIN_PATH)?;

        let login_page = self.client.get(login_url.clone()).send().await?.text().await?;
        let token = html_parser::parse_login_token(&login_page).unwrap_or_default();

        let payload = [
            ("username", username),
            ("password", password),
            ("logintoken", token.as_str()),
        ];
        let response = self.client.post(login_url.clone()).form(&payload).send().await?;

        if response.url().path() == login_url.path() {
            log::warn!("login rejected for {username}");
            return Ok(false);
        }

        log::info!("logged in as {username}");
        self.save_cookies()?;
        Ok(true)
    }

    pub async fn fetch_user_info(&self) -> Result<Option<UserInfo>, LmsError> {
        let (_, html) = self.fetch_page(PROFILE_PATH).await?;
        Ok(html_parser::parse_user_info(&html))
    }

    pub async fn fetch_calendar_cards(&self) -> Result<Vec<CourseCard>, LmsError> {
        let (_, html) = self.fetch_page(CALENDAR_PATH).await?;
        let cards = html_parser::parse_calendar_cards(&html);
        log::debug!("calendar has {} cards", cards.len());
        Ok(cards)
    }

    /// Returns the final URL after redirects together with the body.
    pub async fn fetch_page(&self, path: &str) -> Result<(Url, String), LmsError> {
        let response = self
            .client
            .get(self.url(path)?)
            .send()
            .await?
            .error_for_status()?;
        let landed = response.url().clone();
        Ok((landed, response.text().await?))
    }

    /// Follows a card to its attendance page, looking for the submit link
    /// and for today's recorded status.
    pub async fn inspect_attendance_page(
        &self,
        course: &ResolvedCourse,
        settings: &AttendancePageSettings,
        today: NaiveDate,
    ) -> Result<AttendancePageInfo, LmsError> {
        if course.course_url.is_empty() {
            return Ok(AttendancePageInfo {
                attendance_url: None,
                status: AttendanceStatus::Unknown,
            });
        }

        let (landed, html) = self.fetch_page(&course.course_url).await?;
        let attendance_url = html_parser::find_attendance_link(&html, &settings.submit_link_labels)
            .and_then(|href| landed.join(&href).ok())
            .map(|url| url.to_string());
        let status = html_parser::parse_attendance_status(&html, today, settings);
        log::debug!("{}: status {:?}, link {:?}", course.name, status, attendance_url);

        Ok(AttendancePageInfo {
            attendance_url,
            status,
        })
    }

    pub fn save_cookies(&self) -> Result<(), LmsError> {
        let path = self.cookie_path.as_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let store = self
            .cookie_store
            .lock()
            .map_err(|_| LmsError::new("cookie store lock poisoned"))?;
        let mut writer = BufWriter::new(std::fs::File::create(path)?);
        store
            .save_incl_expired_and_nonpersistent(&mut writer, |cookie| serde_json::to_string(cookie))
            .map_err(|err| LmsError::new(&format!("failed to save cookies: {err}")))?;
        writer.flush()?;
        Ok(())
    }
}

fn load_cookie_store(cookie_path: &Path) -> CookieStore {
    let file = match std::fs::File::open(cookie_path) {
        Ok(file) => file,
        Err(_) => {
            log::debug!("no cookie file at {}, starting fresh", cookie_path.display());
            return CookieStore::default();
        }
    };

    CookieStore::load_all(BufReader::new(file), |line| {
        serde_json::from_str::<cookie_store::Cookie>(line)
    })
    .unwrap_or_else(|err| {
        log::warn!(
            "failed to load cookies from {}, using an empty jar: {err}",
            cookie_path.display()
        );
        CookieStore::default()
    })
}

impl Drop for Lms {
    fn drop(&mut self) {
        log::debug!("saving cookies to {}", self.cookie_path.display());
        if let Err(err) = self.save_cookies() {
            log::warn!("{err}");
        }
    }
}
