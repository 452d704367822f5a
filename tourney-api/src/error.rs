use serde::{Deserialize, Serialize};

/// The body of every error response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// A stable, machine readable identifier of the error, e.g. `match_completed`.
    pub code: String,
    /// A human readable description of the error.
    pub message: String,
}

impl ErrorResponse {
    pub fn new<C, M>(code: C, message: M) -> Self
    where
        C: ToString,
        M: ToString,
    {
        Self {
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_test::{assert_tokens, Token};

    use super::ErrorResponse;

    #[test]
    fn test_error_response() {
        assert_tokens(
            &ErrorResponse::new("not_found", "match 3 not found"),
            &[
                Token::Struct {
                    name: "ErrorResponse",
                    len: 2,
                },
                Token::Str("code"),
                Token::Str("not_found"),
                Token::Str("message"),
                Token::Str("match 3 not found"),
                Token::StructEnd,
            ],
        );
    }
}
