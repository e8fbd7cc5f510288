use std::error::Error as StdError;
use std::fmt;

#[derive(Debug)]
pub struct LmsError {
    pub message: String,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl LmsError {
    pub fn new(message: &str) -> Self {
        LmsError {
            message: message.to_string(),
            source: None,
        }
    }

    /// The wrapped error, if any.
    pub fn source_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }
}

impl fmt::Display for LmsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LmsError: {}", self.message)
    }
}

// Every std error converts, so `?` works on reqwest, serde_json and io results alike.
impl<E: StdError + Send + Sync + 'static> From<E> for LmsError {
    fn from(err: E) -> Self {
        LmsError {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

/// Non-fatal problems found while reading a calendar card. The resolver
/// substitutes a fallback value and only logs these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardFault {
    ParseFailure(String),
    MissingField(&'static str),
}

impl fmt::Display for CardFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardFault::ParseFailure(text) => write!(f, "unparsable time text {text:?}"),
            CardFault::MissingField(field) => write!(f, "card has no {field}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_std_errors_with_their_message() {
        let parse_err = "abc".parse::<u32>().unwrap_err();
        let err: LmsError = parse_err.into();
        assert_eq!(err.message, "invalid digit found in string");
        assert!(err.source_error().is_some());
        assert!(LmsError::new("plain").source_error().is_none());
    }

    #[test]
    fn card_faults_describe_themselves() {
        assert_eq!(
            CardFault::MissingField("attendance label").to_string(),
            "card has no attendance label"
        );
        assert_eq!(
            CardFault::ParseFailure("soon".into()).to_string(),
            "unparsable time text \"soon\""
        );
    }
}
