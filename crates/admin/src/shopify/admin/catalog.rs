//! Shop and catalog lookups, memoized per shop.

use std::sync::Arc;

use smartcartify_core::ShopifyGid;
use tracing::{debug, instrument};

use super::ShopClient;
use super::queries::{
    GetProductFirstVariant, GetProductIds, GetShopCurrency, get_product_first_variant,
    get_product_ids, get_shop_currency,
};
use crate::shopify::AdminShopifyError;

/// Upper bound on catalog pages fetched for store-wide offers.
const MAX_PRODUCT_PAGES: usize = 40;

fn currency_code(code: get_shop_currency::CurrencyCode) -> String {
    use get_shop_currency::CurrencyCode;
    match code {
        CurrencyCode::AUD => "AUD".to_string(),
        CurrencyCode::CAD => "CAD".to_string(),
        CurrencyCode::EUR => "EUR".to_string(),
        CurrencyCode::GBP => "GBP".to_string(),
        CurrencyCode::INR => "INR".to_string(),
        CurrencyCode::JPY => "JPY".to_string(),
        CurrencyCode::NZD => "NZD".to_string(),
        CurrencyCode::USD => "USD".to_string(),
        CurrencyCode::Other(other) => other,
    }
}

impl ShopClient {
    /// The shop's currency code, e.g. `USD`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(shop = %self.shop))]
    pub async fn shop_currency(&self) -> Result<String, AdminShopifyError> {
        if let Some(code) = self.lookups().currency(&self.shop).await {
            return Ok(code);
        }

        let data = self
            .execute::<GetShopCurrency>(get_shop_currency::Variables)
            .await?;
        let code = currency_code(data.shop.currency_code);

        self.lookups().put_currency(&self.shop, code.clone()).await;
        Ok(code)
    }

    /// Every product GID in the shop.
    ///
    /// # Errors
    ///
    /// Returns an error if any page request fails.
    #[instrument(skip(self), fields(shop = %self.shop))]
    pub async fn all_product_ids(&self) -> Result<Arc<Vec<String>>, AdminShopifyError> {
        if let Some(ids) = self.lookups().product_ids(&self.shop).await {
            debug!(count = ids.len(), "Cache hit for product ids");
            return Ok(ids);
        }

        let mut ids = Vec::new();
        let mut after = None;
        for _ in 0..MAX_PRODUCT_PAGES {
            let data = self
                .execute::<GetProductIds>(get_product_ids::Variables { after })
                .await?;
            ids.extend(data.products.nodes.into_iter().map(|n| n.id));

            if !data.products.page_info.has_next_page {
                break;
            }
            after = data.products.page_info.end_cursor;
            if after.is_none() {
                break;
            }
        }

        let ids = Arc::new(ids);
        self.lookups()
            .put_product_ids(&self.shop, Arc::clone(&ids))
            .await;
        Ok(ids)
    }

    /// Resolve a gift selection to a variant GID.
    ///
    /// Variant GIDs pass through. Product GIDs resolve to their first variant.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::NotFound` if the product does not exist or
    /// has no variants.
    #[instrument(skip(self), fields(shop = %self.shop))]
    pub async fn resolve_gift_variant(&self, gid: &str) -> Result<String, AdminShopifyError> {
        let parsed = ShopifyGid::parse(gid)
            .ok_or_else(|| AdminShopifyError::NotFound(format!("Invalid id: {gid}")))?;
        if parsed.resource() == "ProductVariant" {
            return Ok(gid.to_string());
        }

        if let Some(variant) = self.lookups().variant(&self.shop, gid).await {
            return Ok(variant);
        }

        let data = self
            .execute::<GetProductFirstVariant>(get_product_first_variant::Variables {
                id: gid.to_string(),
            })
            .await?;

        let variant = data
            .product
            .and_then(|p| p.variants.nodes.into_iter().next())
            .map(|n| n.id)
            .ok_or_else(|| AdminShopifyError::NotFound(format!("Gift product not found: {gid}")))?;

        self.lookups()
            .put_variant(&self.shop, gid, variant.clone())
            .await;
        Ok(variant)
    }
}
