use serde::{Deserialize, Serialize};

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct UserInfo {
    pub name: String,
    pub icon_url: Option<String>,
}
