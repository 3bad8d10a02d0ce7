use crate::fl;

/// Why an extraction did not produce a result. All of these are recoverable:
/// the user may edit the text and try again.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("no text to analyze")]
    EmptyInput,
    #[error("request failed: {0}")]
    Request(String),
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("no text in API response")]
    EmptyResponse,
    #[error("invalid JSON structure received from API: {0}")]
    MalformedResponse(String),
}

/// Errors surfaced to the user. Only [`AppError::Configuration`] is fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("could not load calendars and task lists: {0}")]
    ListFetch(String),
    #[error("could not save item: {0}")]
    RemoteWrite(String),
    #[error("no task list selected")]
    NoTaskList,
    #[error("sign-in failed: {0}")]
    SignIn(String),
}

impl AppError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Message for the user in the active language. Technical detail stays in
    /// the `Display` impl, which goes to the log.
    pub fn localized(&self) -> String {
        match self {
            Self::Configuration(_) => fl!("error-configuration"),
            Self::Extraction(ExtractionError::EmptyInput) => fl!("error-empty-input"),
            Self::Extraction(_) => fl!("error-extraction"),
            Self::ListFetch(_) => fl!("error-list-fetch"),
            Self::RemoteWrite(_) => fl!("error-remote-write"),
            Self::NoTaskList => fl!("error-no-task-list"),
            Self::SignIn(_) => fl!("error-sign-in"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_configuration_is_fatal() {
        assert!(AppError::Configuration("missing key".into()).is_fatal());
        assert!(!AppError::ListFetch("timeout".into()).is_fatal());
        assert!(!AppError::from(ExtractionError::EmptyResponse).is_fatal());
    }

    #[test]
    fn localized_messages_hide_detail() {
        let err = AppError::from(ExtractionError::Api {
            status: 500,
            message: "internal".into(),
        });
        assert_eq!(err.to_string(), "extraction failed: API error 500: internal");
        assert!(!err.localized().contains("internal"));
        assert_eq!(
            AppError::from(ExtractionError::EmptyInput).localized(),
            "Please enter some text to analyze."
        );
    }
}
