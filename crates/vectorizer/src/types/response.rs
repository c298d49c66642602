//! Success bodies returned by the HTTP surface

use serde::{Deserialize, Serialize};

use super::query::QueryResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorizeResponse {
    pub success: bool,
    pub message: String,
    pub chunk_count: usize,
}

/// A ranked hit in wire form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryHit {
    pub id: String,
    pub document: String,
    pub source: String,
    pub page: u32,
    pub distance: f32,
}

impl From<QueryResult> for QueryHit {
    fn from(result: QueryResult) -> Self {
        Self {
            id: result.scoped_id,
            document: result.content,
            source: result.source_name,
            page: result.page,
            distance: result.distance,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub success: bool,
    pub message: String,
    pub results: Vec<QueryHit>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountResponse {
    pub success: bool,
    pub message: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_document_keeps_line_breaks() {
        let hit = QueryHit::from(QueryResult {
            scoped_id: "id".to_string(),
            content: "Total Amount\nDue on receipt".to_string(),
            source_name: "invoice.pdf".to_string(),
            page: 2,
            distance: 0.25,
        });

        assert_eq!(hit.document, "Total Amount\nDue on receipt");
        assert_eq!(hit.page, 2);
        assert_eq!(hit.source, "invoice.pdf");
    }
}
