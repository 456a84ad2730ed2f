use std::fmt;

#[derive(Debug)]
pub enum Error {
    InvalidDocx(String),
    Zip(zip::result::ZipError),
    Xml(roxmltree::Error),
    Io(std::io::Error),
    Http(reqwest::Error),
    Api { status: u16, body: String },
    Json(serde_json::Error),
    MalformedResponse(String),
    NoDocument,
    MissingApiKey,
    EmptyInput,
    ParagraphOutOfRange { index: usize, len: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidDocx(reason) => write!(f, "not a valid DOCX file: {reason}"),
            Error::Zip(e) => write!(f, "ZIP error: {e}"),
            Error::Xml(e) => write!(f, "XML error: {e}"),
            Error::Io(e) => write!(f, "IO error: {e}"),
            Error::Http(e) => write!(f, "request to the completion endpoint failed: {e}"),
            Error::Api { status, body } => {
                write!(f, "completion endpoint returned status {status}")?;
                if !body.is_empty() {
                    write!(f, ", response: {body}")?;
                }
                Ok(())
            }
            Error::Json(e) => write!(f, "JSON error: {e}"),
            Error::MalformedResponse(reason) => write!(f, "unexpected completion response: {reason}"),
            Error::NoDocument => write!(f, "no document has been loaded"),
            Error::MissingApiKey => write!(f, "an API key is required"),
            Error::EmptyInput => write!(f, "there is no text to rewrite"),
            Error::ParagraphOutOfRange { index, len } => {
                write!(f, "paragraph {index} does not exist (document has {len})")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Zip(e) => Some(e),
            Error::Xml(e) => Some(e),
            Error::Io(e) => Some(e),
            Error::Http(e) => Some(e),
            Error::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Error::Zip(e)
    }
}

impl From<roxmltree::Error> for Error {
    fn from(e: roxmltree::Error) -> Self {
        Error::Xml(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}
