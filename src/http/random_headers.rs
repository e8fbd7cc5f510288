use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Serialize;

#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq)]
pub struct PlatformInfo {
    pub user_agent_platform: &'static str,
    pub sec_ch_ua_platform: &'static str,
}

// Desktop only: the portal serves a different layout to phones.
const DESKTOP_PLATFORMS: &[PlatformInfo] = &[
    PlatformInfo {
        user_agent_platform: "Windows NT 10.0; Win64; x64",
        sec_ch_ua_platform: "Windows",
    },
    PlatformInfo {
        user_agent_platform: "Macintosh; Intel Mac OS X 10_15_7",
        sec_ch_ua_platform: "macOS",
    },
    PlatformInfo {
        user_agent_platform: "X11; Linux x86_64",
        sec_ch_ua_platform: "Linux",
    },
];

pub fn random_desktop_platform() -> PlatformInfo {
    let mut rng = rand::rng();
    *DESKTOP_PLATFORMS
        .choose(&mut rng)
        .unwrap_or(&DESKTOP_PLATFORMS[0])
}

pub fn random_user_agent(platform_info: &PlatformInfo) -> String {
    let mut rng = rand::rng();
    let major = 120 + rng.random_range(0..16);

    let browser = if rng.random_bool(0.5) {
        format!("Chrome/{major}.0.0.0 Safari/537.36")
    } else {
        format!("Chrome/{major}.0.0.0 Safari/537.36 Edg/{major}.0.0.0")
    };

    format!(
        "Mozilla/5.0 ({}) AppleWebKit/537.36 (KHTML, like Gecko) {}",
        platform_info.user_agent_platform, browser
    )
}

/// Value for the `sec-ch-ua-platform` client hint, quoted as browsers send it.
pub fn sec_ch_ua_platform(platform_info: &PlatformInfo) -> String {
    format!("\"{}\"", platform_info.sec_ch_ua_platform)
}
