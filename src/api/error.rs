use thiserror::Error;

/// Normalized failure returned by the resource client.
///
/// Every call resolves to either decoded JSON or one of these variants;
/// transport-level errors never escape the client boundary.
#[derive(Error, Debug)]
pub enum Failure {
    #[error("Session expired and could not be refreshed - please log in again")]
    AuthExpired,

    #[error("Insufficient rights: {0}")]
    Forbidden(String),

    #[error("Request failed{}: {message}", .status.map(|s| format!(" (status {})", s)).unwrap_or_default())]
    Transport {
        status: Option<u16>,
        message: String,
    },
}

/// Maximum length for response bodies embedded in failure messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl Failure {
    /// Truncate a response body to avoid dragging large payloads into messages
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            // Back off to a char boundary; the limit may fall inside a
            // multi-byte character.
            let mut cut = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..cut],
                body.len()
            )
        }
    }

    /// Map a non-2xx, non-401 response to a failure.
    /// 401 is handled by the retry policy in the resource client and never
    /// reaches this function directly.
    pub fn from_status(status: u16, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status {
            403 => Failure::Forbidden(truncated),
            _ => Failure::Transport {
                status: Some(status),
                message: truncated,
            },
        }
    }

    /// Failure for errors below the HTTP layer (connect, timeout, bad JSON)
    pub fn transport(message: impl Into<String>) -> Self {
        Failure::Transport {
            status: None,
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Failure::Transport { status, .. } => *status,
            Failure::Forbidden(_) => Some(403),
            Failure::AuthExpired => Some(401),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_maps_forbidden() {
        let f = Failure::from_status(403, "Insufficient rights.");
        assert!(matches!(f, Failure::Forbidden(_)));
        assert_eq!(f.status(), Some(403));
    }

    #[test]
    fn test_from_status_maps_other_to_transport() {
        for code in [404u16, 409, 500, 503] {
            let f = Failure::from_status(code, "boom");
            match f {
                Failure::Transport { status, .. } => assert_eq!(status, Some(code)),
                other => panic!("expected Transport for {}, got {:?}", code, other),
            }
        }
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        // Multi-byte characters straddling the truncation limit must not
        // split mid-character
        // byte 500 lands inside the first "é"; the cut backs off to 499
        let body = "a".repeat(499) + &"é".repeat(5);
        let f = Failure::from_status(500, &body);
        let msg = f.to_string();
        assert!(msg.contains("truncated, 509 total bytes"));

        // all-multi-byte body, limit on a boundary
        let body = "é".repeat(400);
        let f = Failure::from_status(502, &body);
        let msg = f.to_string();
        assert!(msg.contains("truncated, 800 total bytes"));
        assert!(msg.contains('é'));
    }

    #[test]
    fn test_long_bodies_are_truncated() {
        let body = "x".repeat(2000);
        let f = Failure::from_status(500, &body);
        let msg = f.to_string();
        assert!(msg.contains("truncated"));
        assert!(msg.len() < 700);
    }
}
