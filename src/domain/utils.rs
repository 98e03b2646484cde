//! Shared input validation for the facade and the MCP surface

use percent_encoding::percent_decode_str;

use crate::domain::AdapterError;
use crate::errors::AppError;

pub const CONSOLE_LOGS_URI_PREFIX: &str = "resource://console_logs/";

/// Trims an identifier, rejecting it when nothing is left.
pub fn normalize_identifier<'a>(
    value: &'a str,
    label: &'static str,
) -> Result<&'a str, AdapterError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AdapterError::MissingIdentifier(label));
    }

    Ok(trimmed)
}

/// Extracts the resource name from a `resource://console_logs/{resourceName}` uri.
pub fn console_logs_resource_name(uri: &str) -> Option<Result<String, AppError>> {
    let encoded = uri.strip_prefix(CONSOLE_LOGS_URI_PREFIX)?;
    Some(percent_decode(encoded))
}

fn percent_decode(value: &str) -> Result<String, AppError> {
    let invalid = || {
        AppError::bad_request(
            "invalid_resource_uri",
            "resource name in uri is not valid percent-encoded utf-8",
        )
    };

    // percent_decode_str passes malformed escapes through verbatim.
    let bytes = value.as_bytes();
    let well_formed = bytes.iter().enumerate().all(|(index, byte)| {
        *byte != b'%'
            || bytes
                .get(index + 1..index + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit))
    });
    if !well_formed {
        return Err(invalid());
    }

    percent_decode_str(value)
        .decode_utf8()
        .map(|name| name.into_owned())
        .map_err(|_| invalid())
}
