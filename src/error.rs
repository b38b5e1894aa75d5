use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP middleware failed: {0}")]
    Middleware(#[from] reqwest_middleware::Error),
    /// The API answered, but with a non-OK status in the body
    #[error("{service} returned {status}: {message}")]
    Api {
        service: &'static str,
        status: String,
        message: String,
    },
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("failed to read spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),
    #[error("failed to write spreadsheet: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
    #[error("failed to encode cache: {0}")]
    CacheEncode(#[from] bincode::error::EncodeError),
    #[error("failed to decode cache: {0}")]
    CacheDecode(#[from] bincode::error::DecodeError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{} has no {column:?} column", path.display())]
    MissingColumn { path: PathBuf, column: &'static str },
    #[error("{} contains no sheets", .0.display())]
    EmptyWorkbook(PathBuf),
    #[error("unsupported spreadsheet format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("not enough locations for route optimization: need at least 2, got {0}")]
    NotEnoughStops(usize),
}

impl Error {
    pub fn api(service: &'static str, status: &str, message: Option<String>) -> Self {
        Self::Api {
            service,
            status: status.into(),
            message: message.unwrap_or_else(|| String::from("no error message")),
        }
    }
}
