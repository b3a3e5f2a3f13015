//! Page-level classification
//!
//! Loads a page's statements, fetches the knowledge-base records they need, and decorates
//! every statement with its type. Before any statement is classified the page's position item
//! is checked for an upstream merge; if it was merged the page is repointed at the merge target.
//! That rewrite is the only write this module performs.

use crate::classifier::DecoratedStatement;
use crate::comparison::{MembershipComparison, SuggestedMembership, TermWindow};
use crate::error::{ClassifierError, Result};
use crate::record_store::{ItemRecord, RecordStore};
use std::collections::{BTreeMap, HashMap};
use tracing::{info, warn};
use vpages_common::dates::parse_optional_date;
use vpages_common::repository::PageRepository;
use vpages_common::{Page, Statement, StatementType};

/// Classified statements of one page
#[derive(Debug, Clone)]
pub struct ClassifiedPage {
    pub page: Page,
    pub statements: Vec<DecoratedStatement>,
}

impl ClassifiedPage {
    /// Statements of one type, in page order
    pub fn group(&self, statement_type: StatementType) -> Vec<&DecoratedStatement> {
        self.statements
            .iter()
            .filter(|s| s.statement_type == statement_type)
            .collect()
    }

    /// All statements keyed by type; types with no statements are absent
    pub fn grouped(&self) -> BTreeMap<StatementType, Vec<&DecoratedStatement>> {
        let mut groups: BTreeMap<StatementType, Vec<&DecoratedStatement>> = BTreeMap::new();
        for statement in &self.statements {
            groups.entry(statement.statement_type).or_default().push(statement);
        }
        groups
    }

    pub fn find(&self, transaction_id: &str) -> Option<&DecoratedStatement> {
        self.statements
            .iter()
            .find(|s| s.statement.transaction_id == transaction_id)
    }
}

pub struct PageClassifier<'a> {
    repository: &'a dyn PageRepository,
    records: &'a dyn RecordStore,
}

impl<'a> PageClassifier<'a> {
    pub fn new(repository: &'a dyn PageRepository, records: &'a dyn RecordStore) -> Self {
        Self {
            repository,
            records,
        }
    }

    /// Classify a page, optionally restricted to some transaction ids
    pub async fn classify(
        &self,
        page_title: &str,
        transaction_ids: &[String],
    ) -> Result<ClassifiedPage> {
        let mut page = self.repository.find_page(page_title).await?;
        let statements = self
            .repository
            .statements_for_page(page_title, transaction_ids)
            .await?;

        let items = self.records.items(&item_ids(&page, &statements)).await?;

        let position = lookup(&items, &page.position_held_item)?;
        if position.merged() {
            warn!(
                page = %page.title,
                from = %position.requested,
                to = %position.item,
                "Position item was merged, updating page"
            );
            self.repository
                .update_position_held_item(&page.title, &position.item)
                .await?;
            page.position_held_item = position.item.clone();
        }

        // A single requested statement narrows the claim lookup to its person
        let person = match (transaction_ids.len(), statements.first()) {
            (1, Some(statement)) => statement.person_item.as_deref(),
            _ => None,
        };
        let existing = self.records.position_held(&position.item, person).await?;

        let term = match page.parliamentary_term_item.as_deref() {
            Some(term_item) => {
                let record = self
                    .records
                    .term(term_item)
                    .await?
                    .ok_or_else(|| ClassifierError::UnknownTerm(term_item.to_string()))?;
                TermWindow::from(&record)
            }
            None => TermWindow::default(),
        };

        let mut decorated = Vec::with_capacity(statements.len());
        for statement in statements {
            let suggested = suggestion(&statement, &page, &term, &items)?;
            let comparison = MembershipComparison::compare(&existing, &suggested);
            decorated.push(DecoratedStatement::new(
                statement,
                comparison,
                page.executive_position,
            ));
        }

        info!(
            page = %page.title,
            statements = decorated.len(),
            existing_claims = existing.len(),
            "Classified page"
        );

        Ok(ClassifiedPage {
            page,
            statements: decorated,
        })
    }
}

/// Position plus every party and district referenced, deduplicated in first-seen order
fn item_ids(page: &Page, statements: &[Statement]) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    let referenced = statements
        .iter()
        .flat_map(|s| {
            [
                s.parliamentary_group_item.as_deref(),
                s.electoral_district_item.as_deref(),
            ]
        })
        .flatten()
        .chain(std::iter::once(page.position_held_item.as_str()));
    for id in referenced {
        if !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
        }
    }
    ids
}

fn lookup<'i>(items: &'i HashMap<String, ItemRecord>, id: &str) -> Result<&'i ItemRecord> {
    items
        .get(id)
        .ok_or_else(|| ClassifierError::MissingItemData(id.to_string()))
}

fn suggestion(
    statement: &Statement,
    page: &Page,
    term: &TermWindow,
    items: &HashMap<String, ItemRecord>,
) -> Result<SuggestedMembership> {
    let resolve = |id: Option<&str>| -> Result<Option<String>> {
        id.map(|id| lookup(items, id).map(|record| record.item.clone()))
            .transpose()
    };

    let district = if page.executive_position {
        None
    } else {
        resolve(statement.electoral_district_item.as_deref())?
    };

    Ok(SuggestedMembership {
        person: statement.person_item.clone(),
        term: term.clone(),
        party: resolve(statement.parliamentary_group_item.as_deref())?,
        district,
        start: parse_optional_date(statement.position_start.as_deref()),
        end: parse_optional_date(statement.position_end.as_deref()),
    })
}
