//! Query request and result types

use serde::{Deserialize, Serialize};

use super::chunk::Scope;
use crate::error::Result;

/// Scope as sent by callers of the count and delete endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeRequest {
    pub user_id: String,
    pub chat_id: String,
    pub file_id: String,
}

impl ScopeRequest {
    /// Validate into a [`Scope`]
    pub fn scope(&self) -> Result<Scope> {
        Scope::new(&self.user_id, &self.chat_id, &self.file_id)
    }
}

/// Scoped nearest-neighbour query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(flatten)]
    pub scope: ScopeRequest,

    /// Maximum number of results (must be positive)
    pub top_k: i64,

    /// One or more query texts; results are merged across them
    #[serde(default)]
    pub query_texts: Vec<String>,
}

/// One ranked chunk returned by a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub scoped_id: String,
    pub content: String,
    pub source_name: String,
    pub page: u32,
    /// Lower is more relevant
    pub distance: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_request_deserialize() {
        let req: QueryRequest = serde_json::from_str(
            r#"{"user_id":"u1","chat_id":"c1","file_id":"f1","top_k":2,"query_texts":["refund policy"]}"#,
        )
        .unwrap();

        assert_eq!(req.top_k, 2);
        assert_eq!(req.query_texts, vec!["refund policy".to_string()]);
        assert_eq!(req.scope.scope().unwrap().file_id(), "f1");
    }

    #[test]
    fn test_missing_query_texts_default_empty() {
        let req: QueryRequest =
            serde_json::from_str(r#"{"user_id":"u1","chat_id":"c1","file_id":"f1","top_k":3}"#)
                .unwrap();
        assert!(req.query_texts.is_empty());
    }
}
