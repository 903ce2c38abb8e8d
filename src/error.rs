use thiserror::Error;

/// Errors that abort a shop run or a collaborator call.
///
/// Extraction problems inside a page never surface here: they are folded
/// into error rows by the page pipeline.
#[derive(Debug, Error)]
pub enum ShopError {
    #[error("no scraper registered for \"{name}\", known shops: {}", .known.join(", "))]
    UnknownShop { name: String, known: Vec<String> },

    #[error("shop {shop} has no spreadsheet configured")]
    MissingSpreadsheet { shop: String },

    #[error("no spreadsheet titled \"{name}\" is visible to the configured account")]
    SpreadsheetNotFound { name: String },

    #[error("conversion rate lookup {from}->{to} failed: {reason}")]
    Rate {
        from: String,
        to: String,
        reason: String,
    },

    #[error("list fields have mismatched lengths: {lengths:?}")]
    ListLengthMismatch { lengths: Vec<(String, usize)> },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("won't upload an empty table to sheet {sheet}")]
    EmptyUpload { sheet: String },

    #[error("lookup value \"{value}\" missing from sheet {sheet}")]
    LookupMissing { sheet: String, value: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("workbook error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error("browser error: {0}")]
    Browser(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
