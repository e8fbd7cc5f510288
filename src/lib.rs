/// A `&'static Selector` compiled once on first use.
macro_rules! selector {
    ($query:expr) => {{
        static SELECTOR: ::std::sync::LazyLock<::scraper::Selector> =
            ::std::sync::LazyLock::new(|| ::scraper::Selector::parse($query).unwrap());
        &SELECTOR
    }};
}

pub mod config;
pub mod core;
pub mod error;
pub mod http;
pub mod model;
pub mod utils;
