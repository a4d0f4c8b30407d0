//! Product index definition.

use serde_json::{json, Value};

/// Vector search profile used by `content_vector`.
pub const VECTOR_PROFILE: &str = "product-vector-profile";

const VECTOR_ALGORITHM: &str = "product-hnsw";

/// Index definition for product chunks with embeddings of `dimensions`.
pub fn index_definition(index_name: &str, dimensions: usize) -> Value {
    json!({
        "name": index_name,
        "fields": [
            { "name": "id", "type": "Edm.String", "key": true, "filterable": true },
            { "name": "content", "type": "Edm.String", "searchable": true },
            { "name": "title", "type": "Edm.String", "searchable": true, "filterable": true },
            { "name": "filepath", "type": "Edm.String", "filterable": true },
            { "name": "url", "type": "Edm.String" },
            { "name": "chunk_index", "type": "Edm.Int32", "filterable": true, "sortable": true },
            {
                "name": "content_vector",
                "type": "Collection(Edm.Single)",
                "searchable": true,
                "retrievable": false,
                "dimensions": dimensions,
                "vectorSearchProfile": VECTOR_PROFILE
            }
        ],
        "vectorSearch": {
            "algorithms": [
                {
                    "name": VECTOR_ALGORITHM,
                    "kind": "hnsw",
                    "hnswParameters": { "metric": "cosine", "m": 4, "efConstruction": 400, "efSearch": 500 }
                }
            ],
            "profiles": [
                { "name": VECTOR_PROFILE, "algorithm": VECTOR_ALGORITHM }
            ]
        },
        "semantic": {
            "configurations": [
                {
                    "name": "default",
                    "prioritizedFields": {
                        "titleField": { "fieldName": "title" },
                        "prioritizedContentFields": [{ "fieldName": "content" }]
                    }
                }
            ]
        }
    })
}
