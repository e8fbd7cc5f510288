use async_trait::async_trait;

use crate::core::html_parser;
use crate::core::lms::Lms;
use crate::error::lms::LmsError;

/// Fills in and sends an attendance form.
#[async_trait]
pub trait AttendanceSubmitter {
    async fn submit_attendance(&self, url: &str, password: &str) -> Result<(), LmsError>;
}

#[async_trait]
impl AttendanceSubmitter for Lms {
    async fn submit_attendance(&self, url: &str, password: &str) -> Result<(), LmsError> {
        let (page_url, html) = self.fetch_page(url).await?;
        let form = html_parser::parse_attendance_form(&html, &page_url).ok_or_else(|| {
            LmsError::new("attendance form not found, the session may already be closed")
        })?;

        let response = self
            .client
            .post(form.action.as_str())
            .form(&form.with_password(password))
            .send()
            .await?
            .error_for_status()?;

        // Moodle redirects back to the attendance page on success and
        // re-renders the form when the password is wrong.
        let landed = response.url().clone();
        let body = response.text().await?;
        if landed != page_url && html_parser::parse_attendance_form(&body, &landed).is_none() {
            log::info!("attendance submitted, landed on {landed}");
            Ok(())
        } else {
            Err(LmsError::new(
                "attendance was not accepted, the password may be wrong or the session closed",
            ))
        }
    }
}
