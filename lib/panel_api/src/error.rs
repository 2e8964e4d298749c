use std::fmt;

#[derive(Debug)]
pub enum Error {
    UrlParse(chipp_http::UrlParseError),
    Http(chipp_http::Error),
    Json(serde_json::Error),
    Api { status: u16, message: String },
}

impl From<chipp_http::UrlParseError> for Error {
    fn from(err: chipp_http::UrlParseError) -> Self {
        Self::UrlParse(err)
    }
}

impl From<chipp_http::Error> for Error {
    fn from(err: chipp_http::Error) -> Self {
        Self::Http(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UrlParse(err) => write!(f, "url parse error: {err}"),
            Self::Http(err) => write!(f, "http error: {err}"),
            Self::Json(err) => write!(f, "json error: {err}"),
            Self::Api { message, .. } => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for Error {}
