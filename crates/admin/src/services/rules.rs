//! Rule save, removal and resync.
//!
//! A save runs, in order:
//!
//! 1. normalize and validate the submission (no database or Shopify access)
//! 2. look up the shop's offline access token
//! 3. take the `(shop, section)` save lock
//! 4. merge a partial submission into the stored list, then re-validate
//! 5. persist the list in one transaction
//! 6. sync every rule to Shopify, collecting per-rule errors
//! 7. write remote ids back and drop the cached storefront payload
//!
//! Sync failures never undo step 5; they come back in `shopifySyncError`.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smartcartify_core::rules::{check_raw, coerce, normalize_payload, validate_rules};
use smartcartify_core::{
    BxgyRule, DiscountRule, FieldErrors, FreeGiftRule, RuleId, Section, SectionRule, ShippingRule,
    StyleSettings,
};
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument, warn};

use super::locks::SaveLocks;
use super::merge::merge_partial;
use super::proxy::ProxyCache;
use crate::db::{
    Persisted, PlanRepository, PlanSubscription, RepositoryError, RuleRepository, RuleTable,
    SessionRepository, StyleRepository,
};
use crate::shopify::AdminClient;
use crate::sync::{DiscountApi, RuleSyncResult, SyncReport, Syncable, Synchronizer};

/// Errors from rule operations.
#[derive(Debug, Error)]
pub enum RuleError {
    /// Submission rejected before any work was done.
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    /// Shop has not completed the OAuth install.
    #[error("no access token for {0}")]
    MissingToken(String),

    /// Rule to remove does not exist.
    #[error("rule not found")]
    NotFound,

    #[error(transparent)]
    Repository(RepositoryError),

    #[error("failed to encode rules: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<RepositoryError> for RuleError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}

impl From<FieldErrors> for RuleError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

fn field_error(field: &str, message: &str) -> FieldErrors {
    let mut errors = FieldErrors::default();
    errors.insert_global(field, message);
    errors
}

// =============================================================================
// Requests and responses
// =============================================================================

/// Body of `POST /api/rules`.
///
/// The `delete*` fields request removal of one rule instead of a save.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub section: Section,
    #[serde(default)]
    pub payload: Value,
    pub index: Option<usize>,
    #[serde(default)]
    pub partial: bool,
    /// Set from the session token before the request reaches the service.
    #[serde(default)]
    pub shop: String,
    /// Remote id of a discount rule to remove.
    pub delete_shopify_discount: Option<String>,
    /// Row id of a BXGY rule to remove.
    pub delete_bxgy_rule_id: Option<Value>,
    /// Row id of a free gift rule to remove.
    pub delete_free_rule_id: Option<Value>,
    /// Remote id of a free gift rule to remove.
    pub delete_free_product_discount: Option<String>,
    /// Remote id of a BXGY rule to remove.
    pub delete_shopify_bxgy: Option<String>,
}

/// Which stored rule to remove.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveTarget {
    Row(RuleId),
    Remote(String),
}

impl SaveRequest {
    /// Removal requested by the `delete*` fields, if any.
    ///
    /// Row ids win over remote ids when both are sent for one section.
    #[must_use]
    pub fn removal(&self) -> Option<(Section, RemoveTarget)> {
        let row = |value: &Option<Value>| value.as_ref().and_then(|v| coerce::rule_id(Some(v)));
        let remote = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| RemoveTarget::Remote(s.to_string()))
        };

        if let Some(id) = row(&self.delete_bxgy_rule_id) {
            return Some((Section::Bxgy, RemoveTarget::Row(id)));
        }
        if let Some(target) = remote(&self.delete_shopify_bxgy) {
            return Some((Section::Bxgy, target));
        }
        if let Some(id) = row(&self.delete_free_rule_id) {
            return Some((Section::FreeGift, RemoveTarget::Row(id)));
        }
        if let Some(target) = remote(&self.delete_free_product_discount) {
            return Some((Section::FreeGift, target));
        }
        remote(&self.delete_shopify_discount).map(|target| (Section::Discount, target))
    }
}

/// Result of a save or removal.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResponse {
    pub ok: bool,
    pub message: String,
    /// The section as stored after the operation.
    pub payload: Value,
    pub shopify_sync_error: Option<String>,
    pub results: Vec<RuleSyncResult>,
}

impl SaveResponse {
    fn new<R: Serialize>(rules: &[R], report: SyncReport) -> Result<Self, RuleError> {
        let shopify_sync_error = report.error_message();
        let message = match &shopify_sync_error {
            None => "Saved".to_string(),
            Some(e) => {
                warn!(error = %e, "Saved with Shopify sync errors");
                "Saved, but some rules could not be synced to Shopify".to_string()
            }
        };
        Ok(Self {
            ok: true,
            message,
            payload: serde_json::to_value(rules)?,
            shopify_sync_error,
            results: report.results,
        })
    }
}

/// Every section of one shop, for the admin page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllRules {
    pub shipping: Vec<ShippingRule>,
    pub discounts: Vec<DiscountRule>,
    pub free_gifts: Vec<FreeGiftRule>,
    pub bxgy: Vec<BxgyRule>,
    pub style: StyleSettings,
    pub plan: Option<PlanSubscription>,
    pub shipping_sync_enabled: bool,
}

/// A parsed rule section submission.
enum Submission<R> {
    Full(Vec<R>),
    Partial { rule: R, index: usize },
}

impl<R: SectionRule> Submission<R> {
    fn parse(request: &SaveRequest) -> Result<Self, FieldErrors> {
        if !request.partial {
            let Value::Array(items) = &request.payload else {
                return Err(field_error("payload", "must be a list of rules"));
            };
            return Ok(Self::Full(normalize_payload(items)?));
        }

        let index = request
            .index
            .ok_or_else(|| field_error("index", "is required for a partial save"))?;
        let raw = match &request.payload {
            Value::Array(items) => items.first(),
            other => Some(other),
        }
        .ok_or_else(|| field_error("payload", "must contain a rule"))?;

        let mut errors = FieldErrors::default();
        check_raw::<R>(index, raw, &mut errors);
        if !errors.is_empty() {
            return Err(errors);
        }
        let rule = R::normalize(raw);
        rule.validate(index, &mut errors);
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(Self::Partial { rule, index })
    }
}

// =============================================================================
// Service
// =============================================================================

/// Orchestrates rule persistence and Shopify sync.
#[derive(Clone)]
pub struct RuleService {
    pool: PgPool,
    shopify: AdminClient,
    locks: SaveLocks,
    proxy_cache: ProxyCache,
    shipping_enabled: bool,
}

impl RuleService {
    #[must_use]
    pub const fn new(
        pool: PgPool,
        shopify: AdminClient,
        locks: SaveLocks,
        proxy_cache: ProxyCache,
        shipping_enabled: bool,
    ) -> Self {
        Self {
            pool,
            shopify,
            locks,
            proxy_cache,
            shipping_enabled,
        }
    }

    #[must_use]
    pub const fn proxy_cache(&self) -> &ProxyCache {
        &self.proxy_cache
    }

    /// Offline access token of `shop`.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::MissingToken` if the shop never installed the app.
    pub async fn access_token(&self, shop: &str) -> Result<SecretString, RuleError> {
        SessionRepository::new(&self.pool)
            .access_token(shop)
            .await?
            .ok_or_else(|| RuleError::MissingToken(shop.to_string()))
    }

    /// Every stored section of `shop`.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::Repository` if a section fails to load.
    #[instrument(skip(self))]
    pub async fn load_all(&self, shop: &str) -> Result<AllRules, RuleError> {
        let pool = &self.pool;
        Ok(AllRules {
            shipping: RuleRepository::<ShippingRule>::new(pool).list(shop).await?,
            discounts: RuleRepository::<DiscountRule>::new(pool).list(shop).await?,
            free_gifts: RuleRepository::<FreeGiftRule>::new(pool).list(shop).await?,
            bxgy: RuleRepository::<BxgyRule>::new(pool).list(shop).await?,
            style: StyleRepository::new(pool).get(shop).await?,
            plan: PlanRepository::new(pool).get(shop).await?,
            shipping_sync_enabled: self.shipping_enabled,
        })
    }

    /// Save or remove, depending on the request.
    ///
    /// # Errors
    ///
    /// See [`Self::save`] and [`Self::remove`].
    #[instrument(skip(self, request), fields(shop = %request.shop, section = %request.section))]
    pub async fn handle(&self, request: SaveRequest) -> Result<SaveResponse, RuleError> {
        match request.removal() {
            Some((section, target)) => self.remove(&request.shop, section, target).await,
            None => self.save(&request).await,
        }
    }

    /// Save a submitted section.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::Validation` for a malformed or invalid submission,
    /// `RuleError::MissingToken` if the shop has no access token and
    /// `RuleError::Repository` if persisting fails. Shopify failures are
    /// reported in the response instead.
    pub async fn save(&self, request: &SaveRequest) -> Result<SaveResponse, RuleError> {
        match request.section {
            Section::Shipping => self.save_rules::<ShippingRule>(request).await,
            Section::Discount => self.save_rules::<DiscountRule>(request).await,
            Section::FreeGift => self.save_rules::<FreeGiftRule>(request).await,
            Section::Bxgy => self.save_rules::<BxgyRule>(request).await,
            Section::Style => self.save_style(request).await,
        }
    }

    async fn save_rules<R: RuleTable + Syncable>(
        &self,
        request: &SaveRequest,
    ) -> Result<SaveResponse, RuleError> {
        let shop = request.shop.as_str();
        let submission = Submission::<R>::parse(request)?;
        let token = self.access_token(shop).await?;

        let _guard = self.locks.acquire(shop, R::SECTION).await;
        let client = self.shopify.for_shop(shop, token);
        let sync = Synchronizer::new(&client, self.shipping_enabled);
        let response = apply_submission(&self.pool, &sync, shop, submission).await?;
        self.proxy_cache.invalidate(shop).await;

        Ok(response)
    }

    async fn save_style(&self, request: &SaveRequest) -> Result<SaveResponse, RuleError> {
        let shop = request.shop.as_str();
        if !request.payload.is_object() {
            return Err(field_error("payload", "must be an object").into());
        }
        let settings = StyleSettings::from_raw(&request.payload);
        self.access_token(shop).await?;

        let _guard = self.locks.acquire(shop, Section::Style).await;
        StyleRepository::new(&self.pool)
            .save(shop, &settings)
            .await?;
        self.proxy_cache.invalidate(shop).await;

        Ok(SaveResponse {
            ok: true,
            message: "Saved".to_string(),
            payload: settings.into_value(),
            shopify_sync_error: None,
            results: Vec::new(),
        })
    }

    /// Remove one stored rule and its remote object.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::NotFound` if no such rule is stored,
    /// `RuleError::MissingToken` if the shop has no access token and
    /// `RuleError::Validation` for the style section.
    #[instrument(skip(self))]
    pub async fn remove(
        &self,
        shop: &str,
        section: Section,
        target: RemoveTarget,
    ) -> Result<SaveResponse, RuleError> {
        match section {
            Section::Shipping => self.remove_rule::<ShippingRule>(shop, target).await,
            Section::Discount => self.remove_rule::<DiscountRule>(shop, target).await,
            Section::FreeGift => self.remove_rule::<FreeGiftRule>(shop, target).await,
            Section::Bxgy => self.remove_rule::<BxgyRule>(shop, target).await,
            Section::Style => Err(field_error("section", "style settings cannot be removed").into()),
        }
    }

    async fn remove_rule<R: RuleTable + Syncable>(
        &self,
        shop: &str,
        target: RemoveTarget,
    ) -> Result<SaveResponse, RuleError> {
        let token = self.access_token(shop).await?;

        let _guard = self.locks.acquire(shop, R::SECTION).await;
        let repo = RuleRepository::<R>::new(&self.pool);
        let removed = match &target {
            RemoveTarget::Row(id) => repo.delete(shop, *id).await?,
            RemoveTarget::Remote(remote_id) => repo.delete_by_remote_id(shop, remote_id).await?,
        };
        let kept = repo.list(shop).await?;
        info!(removed = ?target, remaining = kept.len(), "Rule removed");

        let client = self.shopify.for_shop(shop, token);
        let sync = Synchronizer::new(&client, self.shipping_enabled);
        let report = R::remove(&sync, std::slice::from_ref(&removed), &kept).await;
        self.proxy_cache.invalidate(shop).await;

        SaveResponse::new(&kept, report)
    }

    /// Re-run Shopify sync for the stored rules of one section.
    ///
    /// Lookup caches for the shop are dropped first so currency, zone and
    /// product changes are picked up.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::MissingToken` if the shop has no access token and
    /// `RuleError::Repository` if loading or writing back fails.
    #[instrument(skip(self))]
    pub async fn resync(&self, shop: &str, section: Section) -> Result<SyncReport, RuleError> {
        self.shopify.lookups().invalidate_shop(shop);
        match section {
            Section::Shipping => self.resync_rules::<ShippingRule>(shop).await,
            Section::Discount => self.resync_rules::<DiscountRule>(shop).await,
            Section::FreeGift => self.resync_rules::<FreeGiftRule>(shop).await,
            Section::Bxgy => self.resync_rules::<BxgyRule>(shop).await,
            Section::Style => Ok(SyncReport::default()),
        }
    }

    async fn resync_rules<R: RuleTable + Syncable>(&self, shop: &str) -> Result<SyncReport, RuleError> {
        let token = self.access_token(shop).await?;

        let _guard = self.locks.acquire(shop, R::SECTION).await;
        let repo = RuleRepository::<R>::new(&self.pool);
        let mut rules = repo.list(shop).await?;

        let client = self.shopify.for_shop(shop, token);
        let sync = Synchronizer::new(&client, self.shipping_enabled);
        let report = R::sync(&sync, &mut rules, &[]).await;

        repo.write_back(shop, &rules).await?;
        self.proxy_cache.invalidate(shop).await;
        Ok(report)
    }
}

/// Merge, persist, sync and write back one parsed submission.
///
/// The caller holds the section's save lock.
async fn apply_submission<R: RuleTable + Syncable, A: DiscountApi>(
    pool: &PgPool,
    sync: &Synchronizer<'_, A>,
    shop: &str,
    submission: Submission<R>,
) -> Result<SaveResponse, RuleError> {
    let repo = RuleRepository::<R>::new(pool);
    let previous = repo.list(shop).await?;

    let mut rules = match submission {
        Submission::Full(rules) => rules,
        Submission::Partial { rule, index } => {
            let merged = merge_partial(previous.clone(), rule, index)?;
            validate_rules(&merged)?;
            merged
        }
    };
    R::adopt_remote_ids(&previous, &mut rules);

    let Persisted { mut rules, removed } = repo.persist(shop, rules).await?;
    info!(saved = rules.len(), removed = removed.len(), "Rules persisted");

    let report = R::sync(sync, &mut rules, &removed).await;

    repo.write_back(shop, &rules).await?;
    SaveResponse::new(&rules, report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::sync::fake::FakeApi;
    use serde_json::json;

    fn request(body: Value) -> SaveRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_request_accepts_section_aliases() {
        let req = request(json!({"section": "discounts", "payload": [], "shop": "a.myshopify.com"}));
        assert_eq!(req.section, Section::Discount);
        assert!(!req.partial);
        assert!(req.removal().is_none());
    }

    #[test]
    fn test_removal_prefers_row_id() {
        let req = request(json!({
            "section": "bxgy",
            "shop": "a.myshopify.com",
            "deleteBxgyRuleId": "12",
            "deleteShopifyBxgy": "gid://shopify/DiscountAutomaticNode/5"
        }));
        assert_eq!(
            req.removal(),
            Some((Section::Bxgy, RemoveTarget::Row(RuleId::new(12))))
        );
    }

    #[test]
    fn test_removal_by_remote_discount_id() {
        let req = request(json!({
            "section": "discount",
            "shop": "a.myshopify.com",
            "deleteShopifyDiscount": "gid://shopify/DiscountCodeNode/8"
        }));
        assert_eq!(
            req.removal(),
            Some((
                Section::Discount,
                RemoveTarget::Remote("gid://shopify/DiscountCodeNode/8".to_string())
            ))
        );
    }

    #[test]
    fn test_blank_delete_fields_are_ignored() {
        let req = request(json!({
            "section": "free_gift",
            "shop": "a.myshopify.com",
            "payload": [],
            "deleteFreeProductDiscount": "  ",
            "deleteFreeRuleId": null
        }));
        assert!(req.removal().is_none());
    }

    #[test]
    fn test_bxgy_without_products_rejected_before_any_work() {
        let req = request(json!({
            "section": "bxgy",
            "shop": "a.myshopify.com",
            "payload": [{"scope": "product", "appliesTo": {"products": []}}]
        }));
        let Err(errors) = Submission::<BxgyRule>::parse(&req) else {
            panic!("expected validation failure");
        };
        assert_eq!(
            errors.get("0.appliesTo.products"),
            Some("select at least one product")
        );
    }

    #[test]
    fn test_partial_checks_fields_at_target_index() {
        let req = request(json!({
            "section": "shipping",
            "shop": "a.myshopify.com",
            "partial": true,
            "index": 2,
            "payload": [{"minSubtotal": "lots"}]
        }));
        let Err(errors) = Submission::<ShippingRule>::parse(&req) else {
            panic!("expected validation failure");
        };
        assert_eq!(errors.get("2.minSubtotal"), Some("must be a number"));
    }

    #[test]
    fn test_partial_rule_validated_before_any_work() {
        let req = request(json!({
            "section": "bxgy",
            "shop": "a.myshopify.com",
            "partial": true,
            "index": 1,
            "payload": {"scope": "product", "appliesTo": {"products": []}}
        }));
        let Err(errors) = Submission::<BxgyRule>::parse(&req) else {
            panic!("expected validation failure");
        };
        assert_eq!(
            errors.get("1.appliesTo.products"),
            Some("select at least one product")
        );
    }

    #[test]
    fn test_partial_requires_index() {
        let req = request(json!({
            "section": "discount",
            "shop": "a.myshopify.com",
            "partial": true,
            "payload": {"value": 10}
        }));
        let Err(errors) = Submission::<DiscountRule>::parse(&req) else {
            panic!("expected validation failure");
        };
        assert_eq!(errors.get("index"), Some("is required for a partial save"));
    }

    #[test]
    fn test_full_save_requires_list() {
        let req = request(json!({
            "section": "discount",
            "shop": "a.myshopify.com",
            "payload": {"value": 10}
        }));
        assert!(Submission::<DiscountRule>::parse(&req).is_err());
    }

    #[test]
    fn test_response_carries_sync_error() {
        let rules = vec![DiscountRule::normalize(&json!({"value": 10}))];
        let mut report = SyncReport::default();
        report.cleanup_errors.push("zone lookup failed".to_string());

        let response = SaveResponse::new(&rules, report).unwrap();
        assert!(response.ok);
        assert_eq!(response.shopify_sync_error.as_deref(), Some("zone lookup failed"));

        let body = serde_json::to_value(&response).unwrap();
        assert!(body.get("shopifySyncError").is_some());
        assert_eq!(body["payload"][0]["value"], "10");
    }

    // -------------------------------------------------------------------------
    // Save flow against PostgreSQL and the in-memory Shopify stand-in
    // -------------------------------------------------------------------------

    async fn database() -> (PgPool, String) {
        let url: SecretString = std::env::var("DATABASE_URL").unwrap().into();
        let pool = crate::db::create_pool(&url).await.unwrap();
        let shop = format!("svc-{}.myshopify.com", uuid::Uuid::new_v4().simple());
        crate::db::ShopRepository::new(&pool)
            .upsert_installed(&shop)
            .await
            .unwrap();
        (pool, shop)
    }

    async fn save_section<R: RuleTable + Syncable>(
        pool: &PgPool,
        api: &FakeApi,
        shop: &str,
        body: Value,
    ) -> Result<SaveResponse, RuleError> {
        let mut req = request(body);
        req.shop = shop.to_string();
        let submission = Submission::<R>::parse(&req)?;
        let sync = Synchronizer::new(api, true);
        apply_submission(pool, &sync, shop, submission).await
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL"]
    async fn test_free_shipping_rate_id_written_back() {
        let (pool, shop) = database().await;
        let api = FakeApi::default();

        let response = save_section::<ShippingRule>(
            &pool,
            &api,
            &shop,
            json!({
                "section": "shipping",
                "shop": "",
                "payload": [{"enabled": true, "rewardType": "free", "minSubtotal": "2000"}]
            }),
        )
        .await
        .unwrap();
        assert!(response.shopify_sync_error.is_none());

        let created = api.created_rates();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].price, rust_decimal::Decimal::ZERO);
        assert_eq!(created[0].min_subtotal, Some(rust_decimal::Decimal::from(2000)));

        let stored = RuleRepository::<ShippingRule>::new(&pool)
            .list(&shop)
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].remote_id(), api.live_rates().first().map(String::as_str));
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL"]
    async fn test_invalid_partial_leaves_stored_rules_alone() {
        let (pool, shop) = database().await;
        let api = FakeApi::default();

        save_section::<BxgyRule>(
            &pool,
            &api,
            &shop,
            json!({
                "section": "bxgy",
                "shop": "",
                "payload": [{
                    "scope": "product",
                    "appliesTo": {"products": ["gid://shopify/Product/1"]},
                    "xQty": 2,
                    "yQty": 1
                }]
            }),
        )
        .await
        .unwrap();
        let repo = RuleRepository::<BxgyRule>::new(&pool);
        let before = repo.list(&shop).await.unwrap();
        api.clear_calls();

        let result = save_section::<BxgyRule>(
            &pool,
            &api,
            &shop,
            json!({
                "section": "bxgy",
                "shop": "",
                "partial": true,
                "index": 0,
                "payload": {"scope": "product", "appliesTo": {"products": []}}
            }),
        )
        .await;

        let Err(RuleError::Validation(errors)) = result else {
            panic!("expected validation failure");
        };
        assert_eq!(
            errors.get("0.appliesTo.products"),
            Some("select at least one product")
        );
        assert!(api.calls().is_empty());
        assert_eq!(repo.list(&shop).await.unwrap(), before);
    }
}
