use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::core::lms::AttendancePageSettings;
use crate::core::resolver::ResolverSettings;
use crate::error::lms::LmsError;

pub const DEFAULT_LMS_URL: &str = "https://lms-tokyo.iput.ac.jp/";
const MAX_EARLY_CHECK_IN_MINUTES: i64 = 24 * 60;

/// Contents of `config.json`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub username: String,
    /// Portal password; prompted for when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default = "default_lms_url")]
    pub lms_url: String,
    #[serde(default)]
    pub attendance_titles: Vec<String>,
    #[serde(default, with = "clock_times")]
    pub timetable: Vec<NaiveTime>,
    #[serde(default = "default_early_check_in_minutes")]
    pub early_check_in_minutes: i64,
    #[serde(default)]
    pub skip_already_attended: bool,
    #[serde(default)]
    pub upcoming_requires_title: bool,
    #[serde(default = "default_submit_link_labels")]
    pub submit_link_labels: Vec<String>,
    #[serde(default = "default_attended_labels")]
    pub attended_labels: Vec<String>,
    #[serde(default = "default_attendance_date_format")]
    pub attendance_date_format: String,
}

fn default_lms_url() -> String {
    DEFAULT_LMS_URL.to_string()
}

fn default_early_check_in_minutes() -> i64 {
    5
}

fn default_submit_link_labels() -> Vec<String> {
    vec!["出欠を送信する".to_string(), "Submit attendance".to_string()]
}

fn default_attended_labels() -> Vec<String> {
    vec!["出席".to_string(), "Present".to_string()]
}

fn default_attendance_date_format() -> String {
    "%Y年 %m月 %d日".to_string()
}

impl Config {
    /// A config with every optional field at its default.
    pub fn new(username: &str) -> Self {
        Config {
            username: username.to_string(),
            password: None,
            lms_url: default_lms_url(),
            attendance_titles: Vec::new(),
            timetable: Vec::new(),
            early_check_in_minutes: default_early_check_in_minutes(),
            skip_already_attended: false,
            upcoming_requires_title: false,
            submit_link_labels: default_submit_link_labels(),
            attended_labels: default_attended_labels(),
            attendance_date_format: default_attendance_date_format(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LmsError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| {
            LmsError::new(&format!("cannot open config {}: {err}", path.display()))
        })?;
        let config: Config = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), LmsError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    fn validate(&self) -> Result<(), LmsError> {
        if self.username.trim().is_empty() {
            return Err(LmsError::new("config: username must not be empty"));
        }
        if !(0..=MAX_EARLY_CHECK_IN_MINUTES).contains(&self.early_check_in_minutes) {
            return Err(LmsError::new(
                "config: early_check_in_minutes must be between 0 and 1440",
            ));
        }
        if StrftimeItems::new(&self.attendance_date_format).any(|item| matches!(item, Item::Error)) {
            return Err(LmsError::new("config: attendance_date_format is not a valid date format"));
        }
        url::Url::parse(&self.lms_url)?;
        Ok(())
    }

    pub fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings {
            attendance_titles: self.attendance_titles.clone(),
            timetable: self.timetable.clone(),
            early_check_in: TimeDelta::try_minutes(self.early_check_in_minutes)
                .filter(|grace| *grace >= TimeDelta::zero())
                .unwrap_or_else(|| TimeDelta::minutes(default_early_check_in_minutes())),
            skip_already_attended: self.skip_already_attended,
            upcoming_requires_title: self.upcoming_requires_title,
        }
    }

    pub fn attendance_page_settings(&self) -> AttendancePageSettings {
        AttendancePageSettings {
            submit_link_labels: self.submit_link_labels.clone(),
            attended_labels: self.attended_labels.clone(),
            date_format: self.attendance_date_format.clone(),
        }
    }
}

/// Timetable entries are stored as `"HH:MM"` strings; `null` means none.
mod clock_times {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(times: &[NaiveTime], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(times.iter().map(|time| time.format("%H:%M").to_string()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<NaiveTime>, D::Error> {
        Option::<Vec<String>>::deserialize(deserializer)?
            .unwrap_or_default()
            .iter()
            .map(|raw| {
                NaiveTime::parse_from_str(raw.trim(), "%H:%M")
                    .map_err(|err| D::Error::custom(format!("invalid timetable entry {raw:?}: {err}")))
            })
            .collect()
    }
}
