use validator::Validate;

use crate::api::errors::ApiError;

/// Run the derive-based field validators and flatten the first failure
/// into a VALIDATION_ERROR message.
pub(crate) fn validate_payload(payload: &impl Validate) -> Result<(), ApiError> {
    payload.validate().map_err(|errors| {
        let message = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, issues)| {
                issues.iter().map(move |issue| match &issue.message {
                    Some(message) => format!("{field}: {message}"),
                    None => format!("{field}: invalid value"),
                })
            })
            .next()
            .unwrap_or_else(|| "Invalid request payload".to_string());
        ApiError::Validation(message)
    })
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Probe {
        #[validate(length(min = 3, message = "too short"))]
        name: String,
    }

    #[test]
    fn surfaces_first_field_error() {
        let err = validate_payload(&Probe { name: "ab".to_string() }).unwrap_err();
        match err {
            ApiError::Validation(message) => assert!(message.contains("too short")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn passes_valid_payload() {
        assert!(validate_payload(&Probe { name: "abc".to_string() }).is_ok());
    }

    #[test]
    fn normalize_email_lowercases_and_trims() {
        assert_eq!(normalize_email("  Ada@X.IO "), "ada@x.io");
    }
}
