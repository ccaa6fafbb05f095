//! Declared-topic catalog
//!
//! Purely informational registry of topic names with human-readable
//! metadata, so clients can discover what a server publishes. Not involved
//! in delivery.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::RwLock;

/// Catalog entry describing one topic
#[derive(Debug, Clone, Serialize)]
pub struct DeclaredTopic {
    /// Topic name
    pub topic: String,
    /// Human-readable description
    pub description: String,
    /// Example payload
    pub example: serde_json::Value,
}

/// Registry of declared topics
///
/// Re-declaring a name overwrites the previous entry.
#[derive(Debug, Default)]
pub struct TopicCatalog {
    topics: RwLock<HashMap<String, DeclaredTopic>>,
}

impl TopicCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a topic, overwriting any previous declaration
    pub async fn declare(
        &self,
        topic: impl Into<String>,
        description: impl Into<String>,
        example: serde_json::Value,
    ) {
        let topic = topic.into();
        let entry = DeclaredTopic {
            topic: topic.clone(),
            description: description.into(),
            example,
        };

        self.topics.write().await.insert(topic, entry);
    }

    /// Look up one declared topic
    pub async fn get(&self, topic: &str) -> Option<DeclaredTopic> {
        self.topics.read().await.get(topic).cloned()
    }

    /// All declared topics, sorted by name
    pub async fn list(&self) -> Vec<DeclaredTopic> {
        let mut entries: Vec<DeclaredTopic> = self.topics.read().await.values().cloned().collect();
        entries.sort_by(|a, b| a.topic.cmp(&b.topic));
        entries
    }

    /// Number of declared topics
    pub async fn len(&self) -> usize {
        self.topics.read().await.len()
    }

    /// Whether no topics have been declared
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_declare_and_list() {
        let catalog = TopicCatalog::new();

        catalog
            .declare("zen", "One zen lesson", serde_json::json!({"index": 0}))
            .await;
        catalog
            .declare("trades", "Trade executions", serde_json::json!({"price": 51.7}))
            .await;

        let entries = catalog.list().await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].topic, "trades");
        assert_eq!(entries[1].topic, "zen");
    }

    #[tokio::test]
    async fn test_redeclare_overwrites() {
        let catalog = TopicCatalog::new();

        catalog.declare("zen", "first", serde_json::json!(1)).await;
        catalog.declare("zen", "second", serde_json::json!(2)).await;

        assert_eq!(catalog.len().await, 1);
        let entry = catalog.get("zen").await.unwrap();
        assert_eq!(entry.description, "second");
        assert_eq!(entry.example, serde_json::json!(2));
    }

    #[tokio::test]
    async fn test_get_unknown() {
        let catalog = TopicCatalog::new();
        assert!(catalog.get("nope").await.is_none());
        assert!(catalog.is_empty().await);
    }

    #[tokio::test]
    async fn test_serializes_for_listing_route() {
        let catalog = TopicCatalog::new();
        catalog
            .declare("zen", "One zen lesson", serde_json::json!({"index": 0}))
            .await;

        let json = serde_json::to_value(catalog.list().await).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{
                "topic": "zen",
                "description": "One zen lesson",
                "example": {"index": 0},
            }])
        );
    }
}
