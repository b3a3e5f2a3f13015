//! Read access to pages and statements, plus the page position rewrite
//!
//! The classifier only needs these three operations. [`crate::db::SqliteStore`] implements
//! them on SQLite; [`MemoryRepository`] keeps everything in process.

use crate::model::{Page, Statement};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[async_trait]
pub trait PageRepository: Send + Sync {
    /// Page by title; `Error::NotFound` when absent
    async fn find_page(&self, title: &str) -> Result<Page>;

    /// Statements of a page in insertion order, with full history.
    /// A non-empty `transaction_ids` restricts the result to those rows.
    async fn statements_for_page(
        &self,
        title: &str,
        transaction_ids: &[String],
    ) -> Result<Vec<Statement>>;

    /// Point the page at a different position item
    async fn update_position_held_item(&self, title: &str, item: &str) -> Result<()>;
}

/// In-process repository
#[derive(Default)]
pub struct MemoryRepository {
    inner: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    pages: HashMap<String, Page>,
    statements: HashMap<String, Vec<Statement>>,
    position_updates: usize,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_page(&self, page: Page, statements: Vec<Statement>) {
        let mut state = self.lock();
        state.statements.insert(page.title.clone(), statements);
        state.pages.insert(page.title.clone(), page);
    }

    /// Replace one statement of a page, matched by transaction id
    pub fn put_statement(&self, title: &str, statement: Statement) {
        let mut state = self.lock();
        let rows = state.statements.entry(title.to_string()).or_default();
        match rows
            .iter_mut()
            .find(|s| s.transaction_id == statement.transaction_id)
        {
            Some(existing) => *existing = statement,
            None => rows.push(statement),
        }
    }

    /// Number of position rewrites performed so far
    pub fn position_updates(&self) -> usize {
        self.lock().position_updates
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // A poisoned lock only means another test thread panicked mid-update
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl PageRepository for MemoryRepository {
    async fn find_page(&self, title: &str) -> Result<Page> {
        self.lock()
            .pages
            .get(title)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("page {}", title)))
    }

    async fn statements_for_page(
        &self,
        title: &str,
        transaction_ids: &[String],
    ) -> Result<Vec<Statement>> {
        let state = self.lock();
        let rows = state.statements.get(title).cloned().unwrap_or_default();
        if transaction_ids.is_empty() {
            return Ok(rows);
        }
        Ok(rows
            .into_iter()
            .filter(|s| transaction_ids.contains(&s.transaction_id))
            .collect())
    }

    async fn update_position_held_item(&self, title: &str, item: &str) -> Result<()> {
        let mut state = self.lock();
        let page = state
            .pages
            .get_mut(title)
            .ok_or_else(|| Error::NotFound(format!("page {}", title)))?;
        page.position_held_item = item.to_string();
        state.position_updates += 1;
        Ok(())
    }
}
