//! Shared building blocks for the task API workspace: wire types that are
//! not tied to a single crate and the tracing subscriber setup.

pub mod types;
pub mod utils;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_type_ok() {
        let h = types::Health { status: "ok" };
        assert_eq!(h.status, "ok");
    }

    #[test]
    fn error_body_skips_missing_details() {
        let body = types::ErrorBody { error: "Not Found".into(), details: None };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"error":"Not Found"}"#);
    }
}
