//! Error classification
//!
//! Maps raw errors onto messages a user can act on. Patterns are tried in
//! order and the first match wins, so specific patterns must precede
//! general ones (a missing storage bucket is not a missing record).

use super::RetryError;

/// Message used when no pattern matches
pub const DEFAULT_MESSAGE: &str = "Terjadi kesalahan. Silakan coba lagi.";

const NETWORK: &str = "Tidak dapat terhubung ke server. Periksa koneksi internet Anda.";
const TIMEOUT: &str = "Permintaan terlalu lama. Silakan coba lagi.";
const AUTH: &str = "Sesi Anda telah berakhir. Silakan masuk kembali.";
const PERMISSION: &str = "Anda tidak memiliki izin untuk melakukan tindakan ini.";
const NOT_FOUND: &str = "Data tidak ditemukan.";
const SERVER: &str = "Terjadi kesalahan pada server. Silakan coba beberapa saat lagi.";
const STORAGE_MISSING: &str = "Penyimpanan file tidak tersedia. Hubungi administrator.";
const FILE_TOO_LARGE: &str = "Ukuran file melebihi batas yang diizinkan.";
const FILE_TYPE: &str = "Tipe file tidak didukung.";
const FILE_DUPLICATE: &str = "File dengan nama yang sama sudah ada.";
const DUPLICATE: &str = "Data sudah ada.";

/// How a pattern is matched against an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    /// Case-insensitive substring of the message
    Contains(&'static str),
    /// Case-insensitive exact match of the error code
    Code(&'static str),
}

impl Matcher {
    fn matches(&self, info: &ErrorInfo) -> bool {
        match self {
            Matcher::Contains(needle) => info.message.to_lowercase().contains(needle),
            Matcher::Code(code) => info
                .code
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(code)),
        }
    }
}

const ERROR_PATTERNS: &[(Matcher, &str)] = &[
    // Storage
    (Matcher::Contains("bucket not found"), STORAGE_MISSING),
    (Matcher::Contains("payload too large"), FILE_TOO_LARGE),
    (Matcher::Code("413"), FILE_TOO_LARGE),
    (Matcher::Contains("invalid mime type"), FILE_TYPE),
    (Matcher::Contains("mime type"), FILE_TYPE),
    (Matcher::Contains("the resource already exists"), FILE_DUPLICATE),
    // Network
    (Matcher::Contains("failed to fetch"), NETWORK),
    (Matcher::Contains("networkerror"), NETWORK),
    (Matcher::Contains("network request failed"), NETWORK),
    (Matcher::Contains("connection refused"), NETWORK),
    (Matcher::Contains("failed to connect"), NETWORK),
    (Matcher::Contains("not connected"), NETWORK),
    (Matcher::Contains("transport error"), NETWORK),
    (Matcher::Code("Unavailable"), NETWORK),
    // Timeout
    (Matcher::Code("DeadlineExceeded"), TIMEOUT),
    (Matcher::Contains("timed out"), TIMEOUT),
    (Matcher::Contains("timeout"), TIMEOUT),
    // Authentication
    (Matcher::Code("Unauthenticated"), AUTH),
    (Matcher::Contains("jwt expired"), AUTH),
    (Matcher::Contains("invalid refresh token"), AUTH),
    (Matcher::Contains("not authenticated"), AUTH),
    // Authorization
    (Matcher::Code("PermissionDenied"), PERMISSION),
    (Matcher::Code("42501"), PERMISSION),
    (Matcher::Contains("permission denied"), PERMISSION),
    (Matcher::Contains("row-level security"), PERMISSION),
    // Not found
    (Matcher::Code("NotFound"), NOT_FOUND),
    (Matcher::Code("PGRST116"), NOT_FOUND),
    (Matcher::Contains("not found"), NOT_FOUND),
    // Conflicts
    (Matcher::Code("AlreadyExists"), DUPLICATE),
    (Matcher::Code("23505"), DUPLICATE),
    (Matcher::Contains("duplicate key"), DUPLICATE),
    (Matcher::Contains("already exists"), DUPLICATE),
    // Server
    (Matcher::Code("Internal"), SERVER),
    (Matcher::Contains("internal server error"), SERVER),
];

/// The parts of an error that classification looks at
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorInfo {
    pub message: String,
    pub code: Option<String>,
}

impl ErrorInfo {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Collect the message chain of an error, and the gRPC status code when
    /// one is present in the chain
    pub fn from_error(err: &anyhow::Error) -> Self {
        let code = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<tonic::Status>())
            .map(|status| format!("{:?}", status.code()));
        Self {
            message: format!("{err:#}"),
            code,
        }
    }
}

/// First matching message, or [`DEFAULT_MESSAGE`]
pub fn classify(info: &ErrorInfo) -> &'static str {
    ERROR_PATTERNS
        .iter()
        .find(|(matcher, _)| matcher.matches(info))
        .map(|(_, message)| *message)
        .unwrap_or(DEFAULT_MESSAGE)
}

/// User-facing message for any error. An exhausted retry is classified by
/// the error of its last attempt.
pub fn user_friendly_error(err: &anyhow::Error) -> String {
    if let Some(retry) = err.chain().find_map(|c| c.downcast_ref::<RetryError>()) {
        return retry.user_message();
    }
    classify(&ErrorInfo::from_error(err)).to_string()
}

/// Whether `err` means the backend could not be reached at all
pub fn is_connection_error(err: &anyhow::Error) -> bool {
    if let Some(retry) = err.chain().find_map(|c| c.downcast_ref::<RetryError>()) {
        return retry.is_connection_error();
    }
    classify(&ErrorInfo::from_error(err)) == NETWORK
}
