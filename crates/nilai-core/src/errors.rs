//! Error code catalog
//!
//! Numeric codes reported to import callers alongside a message. Storage
//! validation uses the low codes; 500 is the generic internal error.

/// Mark has no URL
pub const MISSING_URL: u32 = 1;
/// URL could not be parsed as an absolute http(s) URL
pub const INVALID_URL: u32 = 2;
/// Title exceeds `MAX_TITLE_LEN`
pub const TITLE_TOO_LONG: u32 = 3;
/// Label or tag name is blank
pub const MISSING_NAME: u32 = 4;
/// Referenced mark does not exist
pub const UNKNOWN_MARK: u32 = 5;
/// Referenced label does not exist
pub const UNKNOWN_LABEL: u32 = 6;
/// Anything else
pub const INTERNAL: u32 = 500;

/// Longest title accepted for a mark, in characters
pub const MAX_TITLE_LEN: usize = 512;

/// Message for an error code
pub fn error_message(code: u32) -> &'static str {
    match code {
        MISSING_URL => "A URL is required",
        INVALID_URL => "Invalid URL",
        TITLE_TOO_LONG => "Title is too long",
        MISSING_NAME => "A name is required",
        UNKNOWN_MARK => "Mark does not exist",
        UNKNOWN_LABEL => "Label does not exist",
        _ => "Internal error, please try again",
    }
}
