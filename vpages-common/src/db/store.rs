//! SQLite-backed page and statement store

use crate::model::{Page, Reconciliation, ResourceType, Statement, StatementType, Verification};
use crate::repository::PageRepository;
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use tracing::debug;

/// Page, statement and history persistence
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the database file, creating it and its schema when missing
    pub async fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(super::init::init_database(path).await?))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert or update a page
    pub async fn save_page(&self, page: &Page) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO pages (title, position_held_item, parliamentary_term_item, reference_url,
                               csv_source_url, executive_position, country_item,
                               new_item_description_en, new_item_label_language)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(title) DO UPDATE SET
                position_held_item = excluded.position_held_item,
                parliamentary_term_item = excluded.parliamentary_term_item,
                reference_url = excluded.reference_url,
                csv_source_url = excluded.csv_source_url,
                executive_position = excluded.executive_position,
                country_item = excluded.country_item,
                new_item_description_en = excluded.new_item_description_en,
                new_item_label_language = excluded.new_item_label_language,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&page.title)
        .bind(&page.position_held_item)
        .bind(&page.parliamentary_term_item)
        .bind(&page.reference_url)
        .bind(&page.csv_source_url)
        .bind(page.executive_position)
        .bind(&page.country_item)
        .bind(&page.new_item_description_en)
        .bind(&page.new_item_label_language)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Titles of the pages tracking each position item
    pub async fn position_page_titles(&self) -> Result<BTreeMap<String, BTreeSet<String>>> {
        let rows = sqlx::query("SELECT position_held_item, title FROM pages")
            .fetch_all(&self.pool)
            .await?;

        let mut titles: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for row in rows {
            let position: String = row.try_get("position_held_item")?;
            titles.entry(position).or_default().insert(row.try_get("title")?);
        }
        Ok(titles)
    }

    /// Insert or update the statement row (history is written separately)
    pub async fn save_statement(&self, page_title: &str, statement: &Statement) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO statements (transaction_id, page_title, person_name, person_item,
                                    parliamentary_group_name, parliamentary_group_item,
                                    electoral_district_name, electoral_district_item,
                                    parliamentary_term_item, position_start, position_end,
                                    statement_uuid, force_type, removed_from_source, actioned_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(transaction_id) DO UPDATE SET
                page_title = excluded.page_title,
                person_name = excluded.person_name,
                person_item = excluded.person_item,
                parliamentary_group_name = excluded.parliamentary_group_name,
                parliamentary_group_item = excluded.parliamentary_group_item,
                electoral_district_name = excluded.electoral_district_name,
                electoral_district_item = excluded.electoral_district_item,
                parliamentary_term_item = excluded.parliamentary_term_item,
                position_start = excluded.position_start,
                position_end = excluded.position_end,
                statement_uuid = excluded.statement_uuid,
                force_type = excluded.force_type,
                removed_from_source = excluded.removed_from_source,
                actioned_at = excluded.actioned_at
            "#,
        )
        .bind(&statement.transaction_id)
        .bind(page_title)
        .bind(&statement.person_name)
        .bind(&statement.person_item)
        .bind(&statement.parliamentary_group_name)
        .bind(&statement.parliamentary_group_item)
        .bind(&statement.electoral_district_name)
        .bind(&statement.electoral_district_item)
        .bind(&statement.parliamentary_term_item)
        .bind(&statement.position_start)
        .bind(&statement.position_end)
        .bind(&statement.statement_uuid)
        .bind(statement.force_type.map(|t| t.as_str()))
        .bind(statement.removed_from_source)
        .bind(statement.actioned_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Save a refreshed statement set for a page
    pub async fn save_statements(&self, page_title: &str, statements: &[Statement]) -> Result<()> {
        for statement in statements {
            self.save_statement(page_title, statement).await?;
        }
        debug!(page = %page_title, count = statements.len(), "Saved statements");
        Ok(())
    }

    /// Statement by transaction id, with history
    pub async fn find_statement(&self, transaction_id: &str) -> Result<(String, Statement)> {
        let row = sqlx::query("SELECT * FROM statements WHERE transaction_id = ?")
            .bind(transaction_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("statement {}", transaction_id)))?;

        let page_title: String = row.try_get("page_title")?;
        let mut statements = vec![statement_from_row(&row)?];
        self.attach_history(&mut statements).await?;
        let statement = statements
            .pop()
            .ok_or_else(|| Error::Internal("statement vanished while loading history".into()))?;
        Ok((page_title, statement))
    }

    /// Append a verification
    pub async fn record_verification(
        &self,
        transaction_id: &str,
        verification: &Verification,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO verifications (transaction_id, user, status, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(transaction_id)
        .bind(&verification.user)
        .bind(verification.status)
        .bind(verification.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Append a reconciliation and link the statement field to its item
    pub async fn record_reconciliation(
        &self,
        transaction_id: &str,
        reconciliation: &Reconciliation,
    ) -> Result<()> {
        let column = match reconciliation.resource_type {
            ResourceType::Person => "person_item",
            ResourceType::Party => "parliamentary_group_item",
            ResourceType::District => "electoral_district_item",
        };

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO reconciliations (transaction_id, resource_type, item, user, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(transaction_id)
        .bind(reconciliation.resource_type.as_str())
        .bind(&reconciliation.item)
        .bind(&reconciliation.user)
        .bind(reconciliation.created_at)
        .execute(&mut *tx)
        .await?;

        let sql = format!("UPDATE statements SET {} = ? WHERE transaction_id = ?", column);
        sqlx::query(&sql)
            .bind(&reconciliation.item)
            .bind(transaction_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(())
    }

    /// Record a successful write-back
    pub async fn mark_actioned(
        &self,
        transaction_id: &str,
        statement_uuid: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE statements SET statement_uuid = ?, actioned_at = ? WHERE transaction_id = ?",
        )
        .bind(statement_uuid)
        .bind(at)
        .bind(transaction_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("statement {}", transaction_id)));
        }
        Ok(())
    }

    async fn attach_history(&self, statements: &mut [Statement]) -> Result<()> {
        if statements.is_empty() {
            return Ok(());
        }
        let index: HashMap<String, usize> = statements
            .iter()
            .enumerate()
            .map(|(i, s)| (s.transaction_id.clone(), i))
            .collect();
        let ids: Vec<String> = statements.iter().map(|s| s.transaction_id.clone()).collect();
        let placeholders = vec!["?"; ids.len()].join(", ");

        let sql = format!(
            "SELECT transaction_id, user, status, created_at FROM verifications \
             WHERE transaction_id IN ({}) ORDER BY id",
            placeholders
        );
        let mut query = sqlx::query(&sql);
        for id in &ids {
            query = query.bind(id);
        }
        let rows = query.fetch_all(&self.pool).await?;
        for row in rows {
            let tx_id: String = row.try_get("transaction_id")?;
            if let Some(&i) = index.get(&tx_id) {
                statements[i].verifications.push(Verification {
                    user: row.try_get("user")?,
                    status: row.try_get("status")?,
                    created_at: row.try_get("created_at")?,
                });
            }
        }

        let sql = format!(
            "SELECT transaction_id, resource_type, item, user, created_at FROM reconciliations \
             WHERE transaction_id IN ({}) ORDER BY id",
            placeholders
        );
        let mut query = sqlx::query(&sql);
        for id in &ids {
            query = query.bind(id);
        }
        let rows = query.fetch_all(&self.pool).await?;
        for row in rows {
            let tx_id: String = row.try_get("transaction_id")?;
            let resource_type: String = row.try_get("resource_type")?;
            if let Some(&i) = index.get(&tx_id) {
                statements[i].reconciliations.push(Reconciliation {
                    resource_type: resource_type.parse()?,
                    item: row.try_get("item")?,
                    user: row.try_get("user")?,
                    created_at: row.try_get("created_at")?,
                });
            }
        }

        Ok(())
    }
}

fn statement_from_row(row: &SqliteRow) -> Result<Statement> {
    let force_type: Option<String> = row.try_get("force_type")?;
    Ok(Statement {
        transaction_id: row.try_get("transaction_id")?,
        person_name: row.try_get("person_name")?,
        person_item: row.try_get("person_item")?,
        parliamentary_group_name: row.try_get("parliamentary_group_name")?,
        parliamentary_group_item: row.try_get("parliamentary_group_item")?,
        electoral_district_name: row.try_get("electoral_district_name")?,
        electoral_district_item: row.try_get("electoral_district_item")?,
        parliamentary_term_item: row.try_get("parliamentary_term_item")?,
        position_start: row.try_get("position_start")?,
        position_end: row.try_get("position_end")?,
        statement_uuid: row.try_get("statement_uuid")?,
        force_type: force_type
            .filter(|t| !t.is_empty())
            .map(|t| t.parse::<StatementType>())
            .transpose()?,
        removed_from_source: row.try_get("removed_from_source")?,
        actioned_at: row.try_get("actioned_at")?,
        verifications: Vec::new(),
        reconciliations: Vec::new(),
    })
}

fn page_from_row(row: &SqliteRow) -> Result<Page> {
    Ok(Page {
        title: row.try_get("title")?,
        position_held_item: row.try_get("position_held_item")?,
        parliamentary_term_item: row.try_get("parliamentary_term_item")?,
        reference_url: row.try_get("reference_url")?,
        csv_source_url: row.try_get("csv_source_url")?,
        executive_position: row.try_get("executive_position")?,
        country_item: row.try_get("country_item")?,
        new_item_description_en: row.try_get("new_item_description_en")?,
        new_item_label_language: row.try_get("new_item_label_language")?,
    })
}

#[async_trait]
impl PageRepository for SqliteStore {
    async fn find_page(&self, title: &str) -> Result<Page> {
        let row = sqlx::query("SELECT * FROM pages WHERE title = ?")
            .bind(title)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("page {}", title)))?;
        page_from_row(&row)
    }

    async fn statements_for_page(
        &self,
        title: &str,
        transaction_ids: &[String],
    ) -> Result<Vec<Statement>> {
        let rows = if transaction_ids.is_empty() {
            sqlx::query("SELECT * FROM statements WHERE page_title = ? ORDER BY rowid")
                .bind(title)
                .fetch_all(&self.pool)
                .await?
        } else {
            let sql = format!(
                "SELECT * FROM statements WHERE page_title = ? AND transaction_id IN ({}) ORDER BY rowid",
                vec!["?"; transaction_ids.len()].join(", ")
            );
            let mut query = sqlx::query(&sql).bind(title);
            for id in transaction_ids {
                query = query.bind(id);
            }
            query.fetch_all(&self.pool).await?
        };

        let mut statements = rows
            .iter()
            .map(statement_from_row)
            .collect::<Result<Vec<_>>>()?;
        self.attach_history(&mut statements).await?;
        Ok(statements)
    }

    async fn update_position_held_item(&self, title: &str, item: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE pages SET position_held_item = ?, updated_at = CURRENT_TIMESTAMP WHERE title = ?",
        )
        .bind(item)
        .bind(title)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("page {}", title)));
        }
        Ok(())
    }
}
