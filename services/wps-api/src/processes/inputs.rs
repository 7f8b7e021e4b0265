//! Input resolution with declared defaults.

use wps_protocol::{ExecuteRequest, ProcessDescription};

use crate::error::{ProcessError, ProcessResult};

/// All values of an input, or its declared default when absent.
///
/// Values are returned unchanged; nothing is validated here. An absent input
/// without a default resolves to an empty list.
pub fn resolve_values(
    request: &ExecuteRequest,
    description: &ProcessDescription,
    identifier: &str,
) -> Vec<String> {
    if request.has_input(identifier) {
        return request
            .values(identifier)
            .into_iter()
            .map(str::to_string)
            .collect();
    }

    description
        .input(identifier)
        .and_then(|input| input.default.clone())
        .into_iter()
        .collect()
}

/// First resolved value of an input.
pub fn first_value(
    request: &ExecuteRequest,
    description: &ProcessDescription,
    identifier: &str,
) -> ProcessResult<String> {
    resolve_values(request, description, identifier)
        .into_iter()
        .next()
        .ok_or_else(|| ProcessError::MissingInput(identifier.to_string()))
}
