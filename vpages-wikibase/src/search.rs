//! Person search across the knowledge base and the document index
//!
//! Both searches run concurrently. Once the document hits are known, their titles are looked
//! up through sitelinks so each hit can be annotated with its item. Hits without an item are the
//! candidates for creating a new item.

use crate::api::WikibaseClient;
use crate::error::{Result, WikibaseError};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

const SEARCH_LIMIT: u32 = 20;

/// Item found by label search
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemHit {
    pub item: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub url: String,
}

/// Article found in the document index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentHit {
    pub title: String,
    pub snippet_html: String,
    pub url: String,
    /// Item linked to the article, when one exists
    pub item: Option<String>,
    pub item_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchResults {
    pub from_knowledge_base: Vec<ItemHit>,
    pub from_documents: Vec<DocumentHit>,
}

impl SearchResults {
    /// Document hits that no item links to yet
    pub fn unreconciled(&self) -> Vec<&DocumentHit> {
        self.from_documents.iter().filter(|d| d.item.is_none()).collect()
    }
}

impl WikibaseClient {
    /// Search `name` in the knowledge base (in `language`) and in the `wiki` document index
    pub async fn search(&self, name: &str, wiki: &str, language: &str) -> Result<SearchResults> {
        let (items, documents) = tokio::join!(
            self.search_items(name, language),
            self.search_documents_with_items(name, wiki)
        );

        Ok(SearchResults {
            from_knowledge_base: items?,
            from_documents: documents?,
        })
    }

    async fn search_items(&self, name: &str, language: &str) -> Result<Vec<ItemHit>> {
        let data = self
            .request(
                "wbsearchentities",
                &[
                    ("search", name.to_string()),
                    ("language", language.to_string()),
                    ("limit", SEARCH_LIMIT.to_string()),
                    ("type", "item".to_string()),
                ],
                false,
            )
            .await?;

        let hits = data
            .get("search")
            .and_then(Value::as_array)
            .map(|results| {
                results
                    .iter()
                    .filter_map(|r| {
                        let item = r.get("id")?.as_str()?.to_string();
                        Some(ItemHit {
                            url: self.entity_url(&item),
                            label: r.get("label").and_then(Value::as_str).map(str::to_string),
                            description: r
                                .get("description")
                                .and_then(Value::as_str)
                                .map(str::to_string),
                            item,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(hits)
    }

    async fn search_documents_with_items(&self, name: &str, wiki: &str) -> Result<Vec<DocumentHit>> {
        let mut hits = self.search_documents(name, wiki).await?;
        if hits.is_empty() {
            return Ok(hits);
        }

        let site = format!("{}wiki", wiki);
        let titles: Vec<&str> = hits.iter().map(|h| h.title.as_str()).collect();
        let data = self
            .request(
                "wbgetentities",
                &[
                    ("props", "sitelinks".to_string()),
                    ("titles", titles.join("|")),
                    ("sites", site.clone()),
                ],
                false,
            )
            .await?;

        let by_title = items_by_sitelink_title(&data, &site);
        debug!(hits = hits.len(), linked = by_title.len(), "Resolved sitelinks");
        for hit in &mut hits {
            if let Some(item) = by_title.get(&hit.title) {
                hit.item_url = Some(self.entity_url(item));
                hit.item = Some(item.clone());
            }
        }
        Ok(hits)
    }

    async fn search_documents(&self, name: &str, wiki: &str) -> Result<Vec<DocumentHit>> {
        let endpoint = self.config().document_index_url.replace("{lang}", wiki);
        let data = self
            .get_json(
                &endpoint,
                &[
                    ("action", "query"),
                    ("list", "search"),
                    ("format", "json"),
                    ("srsearch", name),
                ],
            )
            .await?;

        let results = data
            .pointer("/query/search")
            .and_then(Value::as_array)
            .ok_or_else(|| WikibaseError::Parse("No query.search in document index response".into()))?;

        Ok(results
            .iter()
            .filter_map(|r| {
                let title = r.get("title")?.as_str()?.to_string();
                Some(DocumentHit {
                    url: article_url(wiki, &title),
                    snippet_html: r
                        .get("snippet")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    title,
                    item: None,
                    item_url: None,
                })
            })
            .collect())
    }
}

/// Map sitelink title → item; titles that were not found come back under negative keys
fn items_by_sitelink_title(data: &Value, site: &str) -> HashMap<String, String> {
    let Some(entities) = data.get("entities").and_then(Value::as_object) else {
        return HashMap::new();
    };
    entities
        .iter()
        .filter(|(key, _)| !key.starts_with('-'))
        .filter_map(|(item, entity)| {
            let title = entity.pointer(&format!("/sitelinks/{}/title", site))?.as_str()?;
            Some((title.to_string(), item.clone()))
        })
        .collect()
}

fn article_url(wiki: &str, title: &str) -> String {
    let path = title.replace(' ', "_");
    let mut url = match url::Url::parse(&format!("https://{}.wikipedia.org/wiki/", wiki)) {
        Ok(url) => url,
        Err(_) => return format!("https://{}.wikipedia.org/wiki/{}", wiki, path),
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(&path);
    }
    url.to_string()
}
