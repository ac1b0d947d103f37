//! Cross-cutting helpers shared by the Hive crates: logging setup, startup
//! environment checks, metrics and small shared types.

pub mod types;
pub mod utils;
pub mod pagination;
pub mod env;
pub mod metrics;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_type_ok() {
        let h = types::Health { status: "ok", database: "connected" };
        assert_eq!(h.status, "ok");
        let v = serde_json::to_value(&h).unwrap();
        assert_eq!(v["database"], "connected");
    }
}
