//! In-memory Shopify stand-in for synchronizer tests.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Mutex;

use smartcartify_core::ShopifyGid;

use super::DiscountApi;
use crate::shopify::{
    AdminShopifyError, BasicDiscountInput, BxgyDiscountInput, DeliveryZone, DiscountNode,
    FreeShippingDiscountInput, ShippingRateInput,
};

/// Mutating call seen by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateBasic(String),
    CreateFreeShipping(String),
    CreateBxgy(String),
    SetActive(String, bool),
    Delete(String),
    FindByTitle(String),
    CreateRate(String),
    DeleteRates(Vec<String>),
}

#[derive(Default)]
struct State {
    next_id: u64,
    discounts: Vec<DiscountNode>,
    rates: Vec<String>,
    calls: Vec<Call>,
    basic: Vec<BasicDiscountInput>,
    free_shipping: Vec<FreeShippingDiscountInput>,
    bxgy: Vec<BxgyDiscountInput>,
    shipping_rates: Vec<ShippingRateInput>,
    /// Remaining forced collisions per title.
    collisions: HashMap<String, u32>,
    /// Reject creates whose title an existing discount already has.
    unique_titles: bool,
}

#[derive(Default)]
pub struct FakeApi {
    state: Mutex<State>,
}

fn missing(id: &str) -> AdminShopifyError {
    AdminShopifyError::UserError(format!("id: Discount {id} does not exist"))
}

fn title_taken() -> AdminShopifyError {
    AdminShopifyError::UserError("title: Title must be unique".to_string())
}

impl FakeApi {
    pub fn seed_discount(&self, id: &str, title: &str) {
        self.state.lock().unwrap().discounts.push(DiscountNode {
            id: id.to_string(),
            title: title.to_string(),
        });
    }

    pub fn seed_rate(&self, id: &str) {
        self.state.lock().unwrap().rates.push(id.to_string());
    }

    /// Next create with `title` collides.
    pub fn fail_title_once(&self, title: &str) {
        self.state
            .lock()
            .unwrap()
            .collisions
            .insert(title.to_string(), 1);
    }

    /// Every create with `title` collides.
    pub fn fail_title_always(&self, title: &str) {
        self.state
            .lock()
            .unwrap()
            .collisions
            .insert(title.to_string(), u32::MAX);
    }

    /// Creates collide with any live discount of the same title.
    pub fn reject_live_titles(&self) {
        self.state.lock().unwrap().unique_titles = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn created_basic(&self) -> Vec<BasicDiscountInput> {
        self.state.lock().unwrap().basic.clone()
    }

    pub fn created_free_shipping(&self) -> Vec<FreeShippingDiscountInput> {
        self.state.lock().unwrap().free_shipping.clone()
    }

    pub fn created_bxgy(&self) -> Vec<BxgyDiscountInput> {
        self.state.lock().unwrap().bxgy.clone()
    }

    pub fn created_rates(&self) -> Vec<ShippingRateInput> {
        self.state.lock().unwrap().shipping_rates.clone()
    }

    pub fn live_rates(&self) -> Vec<String> {
        self.state.lock().unwrap().rates.clone()
    }

    pub fn live_discounts(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .discounts
            .iter()
            .map(|d| d.id.clone())
            .collect()
    }

    fn create(&self, title: &str, code: bool) -> Result<String, AdminShopifyError> {
        let mut state = self.state.lock().unwrap();
        if let Some(remaining) = state.collisions.get_mut(title)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(title_taken());
        }
        if state.unique_titles && state.discounts.iter().any(|d| d.title == title) {
            return Err(title_taken());
        }
        state.next_id += 1;
        let resource = if code {
            "DiscountCodeNode"
        } else {
            "DiscountAutomaticNode"
        };
        let id = ShopifyGid::new(resource, state.next_id).to_string();
        state.discounts.push(DiscountNode {
            id: id.clone(),
            title: title.to_string(),
        });
        Ok(id)
    }
}

impl DiscountApi for FakeApi {
    async fn create_basic_discount(
        &self,
        input: &BasicDiscountInput,
    ) -> Result<String, AdminShopifyError> {
        {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::CreateBasic(input.title.clone()));
            state.basic.push(input.clone());
        }
        self.create(&input.title, input.code.is_some())
    }

    async fn create_free_shipping_discount(
        &self,
        input: &FreeShippingDiscountInput,
    ) -> Result<String, AdminShopifyError> {
        {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::CreateFreeShipping(input.title.clone()));
            state.free_shipping.push(input.clone());
        }
        self.create(&input.title, input.code.is_some())
    }

    async fn create_bxgy_discount(
        &self,
        input: &BxgyDiscountInput,
    ) -> Result<String, AdminShopifyError> {
        {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::CreateBxgy(input.title.clone()));
            state.bxgy.push(input.clone());
        }
        self.create(&input.title, false)
    }

    async fn set_discount_active(&self, id: &str, active: bool) -> Result<(), AdminShopifyError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::SetActive(id.to_string(), active));
        if state.discounts.iter().any(|d| d.id == id) {
            Ok(())
        } else {
            Err(missing(id))
        }
    }

    async fn delete_discount(&self, id: &str) -> Result<(), AdminShopifyError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Delete(id.to_string()));
        let before = state.discounts.len();
        state.discounts.retain(|d| d.id != id);
        if state.discounts.len() < before {
            Ok(())
        } else {
            Err(missing(id))
        }
    }

    async fn find_discounts_by_title(
        &self,
        title: &str,
    ) -> Result<Vec<DiscountNode>, AdminShopifyError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::FindByTitle(title.to_string()));
        Ok(state
            .discounts
            .iter()
            .filter(|d| d.title == title)
            .cloned()
            .collect())
    }

    async fn shop_currency(&self) -> Result<String, AdminShopifyError> {
        Ok("INR".to_string())
    }

    async fn all_product_ids(&self) -> Result<Vec<String>, AdminShopifyError> {
        Ok(vec![
            "gid://shopify/Product/1".to_string(),
            "gid://shopify/Product/2".to_string(),
        ])
    }

    async fn resolve_gift_variant(&self, gid: &str) -> Result<String, AdminShopifyError> {
        let parsed = ShopifyGid::parse(gid).ok_or_else(|| missing(gid))?;
        match parsed.resource() {
            "ProductVariant" => Ok(gid.to_string()),
            "Product" => Ok(format!("gid://shopify/ProductVariant/{}01", parsed.id())),
            _ => Err(AdminShopifyError::NotFound(gid.to_string())),
        }
    }

    async fn default_delivery_zone(&self) -> Result<DeliveryZone, AdminShopifyError> {
        Ok(DeliveryZone {
            profile_id: "gid://shopify/DeliveryProfile/1".to_string(),
            location_group_id: "gid://shopify/DeliveryLocationGroup/1".to_string(),
            zone_id: "gid://shopify/DeliveryZone/1".to_string(),
        })
    }

    async fn create_shipping_rate(
        &self,
        _zone: &DeliveryZone,
        input: &ShippingRateInput,
    ) -> Result<String, AdminShopifyError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreateRate(input.name.clone()));
        state.shipping_rates.push(input.clone());
        state.next_id += 1;
        let id = ShopifyGid::new("DeliveryMethodDefinition", state.next_id).to_string();
        state.rates.push(id.clone());
        Ok(id)
    }

    async fn delete_shipping_rates(
        &self,
        _zone: &DeliveryZone,
        definition_ids: &[String],
    ) -> Result<(), AdminShopifyError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::DeleteRates(definition_ids.to_vec()));
        state.rates.retain(|r| !definition_ids.contains(r));
        Ok(())
    }
}
