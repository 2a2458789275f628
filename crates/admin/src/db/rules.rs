//! Rule persistence with identity-keyed reconciliation.
//!
//! Each section has its own table holding the canonical rule document in a
//! `data` column. Saving a section reconciles the submitted list against the
//! stored rows:
//!
//! 1. a rule whose `id` matches a stored row updates that row
//! 2. a rule without a known id adopts the stored row at its index, unless
//!    another submitted rule claims that row by id
//! 3. every other rule inserts a new row
//! 4. stored rows nobody matched are deleted
//!
//! A matched rule that arrives without a remote id inherits the stored one,
//! so the synchronizer can still remove the old remote object.

use std::collections::HashSet;
use std::marker::PhantomData;

use serde_json::Value;
use sqlx::PgPool;
use sqlx::types::Json;

use smartcartify_core::{BxgyRule, DiscountRule, FreeGiftRule, RuleId, SectionRule, ShippingRule};

use super::RepositoryError;

/// A rule type with its own table.
pub trait RuleTable: SectionRule {
    const TABLE: &'static str;
}

impl RuleTable for ShippingRule {
    const TABLE: &'static str = "shipping_rules";
}

impl RuleTable for DiscountRule {
    const TABLE: &'static str = "discount_rules";
}

impl RuleTable for FreeGiftRule {
    const TABLE: &'static str = "free_gift_rules";
}

impl RuleTable for BxgyRule {
    const TABLE: &'static str = "bxgy_rules";
}

#[derive(Debug, sqlx::FromRow)]
struct RuleRow {
    id: RuleId,
    data: Json<Value>,
}

impl RuleRow {
    fn into_rule<R: SectionRule>(self) -> Result<R, RepositoryError> {
        if !self.data.0.is_object() {
            return Err(RepositoryError::DataCorruption(format!(
                "{} rule {} is not an object",
                R::SECTION,
                self.id
            )));
        }
        let mut rule = R::normalize(&self.data.0);
        rule.set_id(Some(self.id));
        Ok(rule)
    }
}

/// Result of persisting a section.
#[derive(Debug, Clone, PartialEq)]
pub struct Persisted<R> {
    /// Submitted rules in submitted order, with row ids assigned.
    pub rules: Vec<R>,
    /// Stored rules whose rows were deleted.
    pub removed: Vec<R>,
}

// =============================================================================
// Reconciliation plan
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Update(RuleId),
    Insert,
}

#[derive(Debug, PartialEq, Eq)]
struct Plan {
    /// One slot per submitted rule.
    slots: Vec<Slot>,
    /// Remote ids inherited from the stored row, per submitted rule.
    inherited: Vec<Option<String>>,
    /// Indexes into the stored list of rows to delete.
    delete: Vec<usize>,
}

fn plan<R: SectionRule>(incoming: &[R], stored: &[R]) -> Plan {
    let stored_ids: HashSet<RuleId> = stored.iter().filter_map(SectionRule::id).collect();
    let claimed: HashSet<RuleId> = incoming
        .iter()
        .filter_map(SectionRule::id)
        .filter(|id| stored_ids.contains(id))
        .collect();

    let mut used: HashSet<RuleId> = HashSet::new();
    let mut slots = Vec::with_capacity(incoming.len());

    for (index, rule) in incoming.iter().enumerate() {
        let by_id = rule
            .id()
            .filter(|id| stored_ids.contains(id) && !used.contains(id));
        let by_index = || {
            stored
                .get(index)
                .and_then(SectionRule::id)
                .filter(|id| !claimed.contains(id) && !used.contains(id))
        };
        let known_id = rule.id().is_some_and(|id| stored_ids.contains(&id));

        let slot = match by_id {
            Some(id) => Slot::Update(id),
            None if !known_id => by_index().map_or(Slot::Insert, Slot::Update),
            None => Slot::Insert,
        };
        if let Slot::Update(id) = slot {
            used.insert(id);
        }
        slots.push(slot);
    }

    let inherited = incoming
        .iter()
        .zip(&slots)
        .map(|(rule, slot)| match slot {
            Slot::Update(id) if rule.remote_id().is_none() => stored
                .iter()
                .find(|s| s.id() == Some(*id))
                .and_then(|s| s.remote_id().map(str::to_string)),
            _ => None,
        })
        .collect();

    let delete = stored
        .iter()
        .enumerate()
        .filter(|(_, s)| s.id().is_none_or(|id| !used.contains(&id)))
        .map(|(i, _)| i)
        .collect();

    Plan {
        slots,
        inherited,
        delete,
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for one rule section.
pub struct RuleRepository<'a, R> {
    pool: &'a PgPool,
    _rule: PhantomData<R>,
}

impl<'a, R: RuleTable> RuleRepository<'a, R> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            _rule: PhantomData,
        }
    }

    /// Stored rules for `shop` ordered by ascending row id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a row is not a rule object.
    pub async fn list(&self, shop: &str) -> Result<Vec<R>, RepositoryError> {
        let rows = sqlx::query_as::<_, RuleRow>(&format!(
            "SELECT id, data FROM {} WHERE shop = $1 ORDER BY id",
            R::TABLE
        ))
        .bind(shop)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(RuleRow::into_rule::<R>).collect()
    }

    /// Enabled rules for `shop` ordered by ascending row id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a row is not a rule object.
    pub async fn list_enabled(&self, shop: &str) -> Result<Vec<R>, RepositoryError> {
        let rows = sqlx::query_as::<_, RuleRow>(&format!(
            "SELECT id, data FROM {} WHERE shop = $1 AND enabled ORDER BY id",
            R::TABLE
        ))
        .bind(shop)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(RuleRow::into_rule::<R>).collect()
    }

    /// Reconcile `rules` against the stored rows in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails; nothing is
    /// written in that case.
    pub async fn persist(&self, shop: &str, rules: Vec<R>) -> Result<Persisted<R>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let stored_rows = sqlx::query_as::<_, RuleRow>(&format!(
            "SELECT id, data FROM {} WHERE shop = $1 ORDER BY id FOR UPDATE",
            R::TABLE
        ))
        .bind(shop)
        .fetch_all(&mut *tx)
        .await?;
        let stored: Vec<R> = stored_rows
            .into_iter()
            .map(RuleRow::into_rule::<R>)
            .collect::<Result<_, _>>()?;

        let plan = plan(&rules, &stored);
        let mut saved = Vec::with_capacity(rules.len());

        for ((mut rule, slot), inherited) in rules.into_iter().zip(plan.slots).zip(plan.inherited)
        {
            if inherited.is_some() {
                rule.set_remote_id(inherited);
            }
            match slot {
                Slot::Update(id) => {
                    rule.set_id(Some(id));
                    sqlx::query(&format!(
                        r"
                        UPDATE {}
                        SET enabled = $1, remote_id = $2, data = $3, updated_at = NOW()
                        WHERE id = $4 AND shop = $5
                        ",
                        R::TABLE
                    ))
                    .bind(rule.enabled())
                    .bind(rule.remote_id())
                    .bind(Json(&rule))
                    .bind(id)
                    .bind(shop)
                    .execute(&mut *tx)
                    .await?;
                }
                Slot::Insert => {
                    rule.set_id(None);
                    let id = sqlx::query_scalar::<_, RuleId>(&format!(
                        r"
                        INSERT INTO {} (shop, enabled, remote_id, data)
                        VALUES ($1, $2, $3, $4)
                        RETURNING id
                        ",
                        R::TABLE
                    ))
                    .bind(shop)
                    .bind(rule.enabled())
                    .bind(rule.remote_id())
                    .bind(Json(&rule))
                    .fetch_one(&mut *tx)
                    .await?;
                    rule.set_id(Some(id));
                    // The stored document carries its own row id
                    sqlx::query(&format!("UPDATE {} SET data = $1 WHERE id = $2", R::TABLE))
                        .bind(Json(&rule))
                        .bind(id)
                        .execute(&mut *tx)
                        .await?;
                }
            }
            saved.push(rule);
        }

        let removed: Vec<R> = plan
            .delete
            .iter()
            .filter_map(|&i| stored.get(i).cloned())
            .collect();
        let removed_ids: Vec<i64> = removed
            .iter()
            .filter_map(SectionRule::id)
            .map(i64::from)
            .collect();
        if !removed_ids.is_empty() {
            sqlx::query(&format!(
                "DELETE FROM {} WHERE shop = $1 AND id = ANY($2)",
                R::TABLE
            ))
            .bind(shop)
            .bind(&removed_ids)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!(
            shop = %shop,
            section = %R::SECTION,
            saved = saved.len(),
            removed = removed.len(),
            "Persisted rules"
        );

        Ok(Persisted {
            rules: saved,
            removed,
        })
    }

    /// Write back synced rules (remote ids and fetched data) by row id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails.
    pub async fn write_back(&self, shop: &str, rules: &[R]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for rule in rules {
            let Some(id) = rule.id() else { continue };
            sqlx::query(&format!(
                r"
                UPDATE {}
                SET enabled = $1, remote_id = $2, data = $3, updated_at = NOW()
                WHERE id = $4 AND shop = $5
                ",
                R::TABLE
            ))
            .bind(rule.enabled())
            .bind(rule.remote_id())
            .bind(Json(rule))
            .bind(id)
            .bind(shop)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Delete one rule by row id, returning it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such row exists for `shop`.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, shop: &str, id: RuleId) -> Result<R, RepositoryError> {
        let row = sqlx::query_as::<_, RuleRow>(&format!(
            "DELETE FROM {} WHERE shop = $1 AND id = $2 RETURNING id, data",
            R::TABLE
        ))
        .bind(shop)
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.into_rule()
    }

    /// Delete the rule synced as `remote_id`, returning it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row carries that remote id.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_by_remote_id(&self, shop: &str, remote_id: &str) -> Result<R, RepositoryError> {
        let row = sqlx::query_as::<_, RuleRow>(&format!(
            "DELETE FROM {} WHERE shop = $1 AND remote_id = $2 RETURNING id, data",
            R::TABLE
        ))
        .bind(shop)
        .bind(remote_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.into_rule()
    }
}
