use scraper::Html;

/// One tile of the calendar's day view, kept as raw markup.
///
/// Cards are rebuilt on every poll; the markup is parsed on demand so the
/// card itself stays `Send` across the client's await points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseCard {
    html: String,
}

impl CourseCard {
    pub fn from_fragment(html: impl Into<String>) -> Self {
        CourseCard { html: html.into() }
    }

    #[cfg(test)]
    pub(crate) fn html(&self) -> &str {
        &self.html
    }

    pub fn fragment(&self) -> Html {
        Html::parse_fragment(&self.html)
    }
}
