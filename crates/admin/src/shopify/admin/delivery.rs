//! Delivery profile operations for conditional shipping rates.

use std::collections::HashSet;

use tracing::{debug, instrument};

use super::queries::{
    DeliveryProfileUpdate, GetDeliveryProfileMethods, GetDeliveryProfiles,
    delivery_profile_update, get_delivery_profile_methods, get_delivery_profiles,
};
use super::{ShopClient, check_user_errors, missing_payload, user_errors};
use crate::shopify::AdminShopifyError;
use crate::shopify::types::{DeliveryZone, ShippingRateInput, format_money};

/// `(id, name)` of every method definition in one zone of a profile.
///
/// Works over any generated profile shape that selects
/// `profileLocationGroups.locationGroupZones.nodes.{zone.id, methodDefinitions}`.
macro_rules! zone_definitions {
    ($profile:expr, $zone_id:expr) => {
        $profile
            .profile_location_groups
            .into_iter()
            .flat_map(|g| g.location_group_zones.nodes)
            .filter(|z| z.zone.id == $zone_id)
            .flat_map(|z| z.method_definitions.nodes)
            .map(|d| (d.id, d.name))
            .collect::<Vec<(String, String)>>()
    };
}

/// First zone of the first location group in the default profile.
fn pick_default_zone(
    profiles: Vec<get_delivery_profiles::GetDeliveryProfilesDeliveryProfilesNodes>,
) -> Option<DeliveryZone> {
    let profile = profiles.into_iter().find(|p| p.default)?;
    profile.profile_location_groups.into_iter().find_map(|group| {
        let zone = group.location_group_zones.nodes.into_iter().next()?;
        Some(DeliveryZone {
            profile_id: profile.id.clone(),
            location_group_id: group.location_group.id,
            zone_id: zone.zone.id,
        })
    })
}

/// The definition named `name` that was not in the zone before the update.
fn created_definition(
    existing: &HashSet<String>,
    after: Vec<(String, String)>,
    name: &str,
) -> Option<String> {
    after
        .into_iter()
        .find(|(id, n)| n == name && !existing.contains(id))
        .map(|(id, _)| id)
}

fn currency_code(code: &str) -> delivery_profile_update::CurrencyCode {
    use delivery_profile_update::CurrencyCode;
    match code {
        "AUD" => CurrencyCode::AUD,
        "CAD" => CurrencyCode::CAD,
        "EUR" => CurrencyCode::EUR,
        "GBP" => CurrencyCode::GBP,
        "INR" => CurrencyCode::INR,
        "JPY" => CurrencyCode::JPY,
        "NZD" => CurrencyCode::NZD,
        "USD" => CurrencyCode::USD,
        other => CurrencyCode::Other(other.to_string()),
    }
}

fn definition_input(input: &ShippingRateInput) -> delivery_profile_update::DeliveryMethodDefinitionInput {
    use delivery_profile_update::{
        DeliveryConditionOperator, DeliveryMethodDefinitionInput, DeliveryPriceConditionInput,
        DeliveryRateDefinitionInput, MoneyInput,
    };

    let money = |amount| MoneyInput {
        amount: format_money(amount),
        currency_code: currency_code(&input.currency_code),
    };
    DeliveryMethodDefinitionInput {
        name: Some(input.name.clone()),
        active: Some(true),
        rate_definition: Some(DeliveryRateDefinitionInput {
            price: money(input.price),
        }),
        price_conditions_to_create: input.min_subtotal.map(|min| {
            vec![DeliveryPriceConditionInput {
                criteria: Some(money(min)),
                operator: Some(DeliveryConditionOperator::GREATER_THAN_OR_EQUAL_TO),
            }]
        }),
    }
}

fn create_variables(
    zone: &DeliveryZone,
    input: &ShippingRateInput,
) -> delivery_profile_update::Variables {
    use delivery_profile_update::{
        DeliveryLocationGroupZoneInput, DeliveryProfileInput, DeliveryProfileLocationGroupInput,
        Variables,
    };

    Variables {
        id: zone.profile_id.clone(),
        profile: DeliveryProfileInput {
            location_groups_to_update: Some(vec![DeliveryProfileLocationGroupInput {
                id: Some(zone.location_group_id.clone()),
                zones_to_update: Some(vec![DeliveryLocationGroupZoneInput {
                    id: Some(zone.zone_id.clone()),
                    method_definitions_to_create: Some(vec![definition_input(input)]),
                }]),
            }]),
            method_definitions_to_delete: None,
        },
    }
}

impl ShopClient {
    /// Zone in the shop's default delivery profile where app rates live.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::NotFound` if the shop has no default
    /// profile with a zone.
    #[instrument(skip(self), fields(shop = %self.shop))]
    pub async fn default_delivery_zone(&self) -> Result<DeliveryZone, AdminShopifyError> {
        if let Some(zone) = self.lookups().zone(&self.shop).await {
            debug!("Cache hit for delivery zone");
            return Ok(zone);
        }

        let data = self
            .execute::<GetDeliveryProfiles>(get_delivery_profiles::Variables)
            .await?;

        let zone = pick_default_zone(data.delivery_profiles.nodes).ok_or_else(|| {
            AdminShopifyError::NotFound("No zone in the default delivery profile".to_string())
        })?;

        self.lookups().put_zone(&self.shop, zone.clone()).await;
        Ok(zone)
    }

    /// Method definition ids currently in `zone`.
    async fn zone_definition_ids(
        &self,
        zone: &DeliveryZone,
    ) -> Result<HashSet<String>, AdminShopifyError> {
        let data = self
            .execute::<GetDeliveryProfileMethods>(get_delivery_profile_methods::Variables {
                id: zone.profile_id.clone(),
            })
            .await?;
        let profile = data.delivery_profile.ok_or_else(|| {
            AdminShopifyError::NotFound(format!("Delivery profile {}", zone.profile_id))
        })?;
        Ok(zone_definitions!(profile, zone.zone_id)
            .into_iter()
            .map(|(id, _)| id)
            .collect())
    }

    /// Create a flat rate method definition in `zone`.
    ///
    /// Returns the new method definition id. Definitions already in the zone
    /// are recorded first, so a same-named older rate is never picked.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails, Shopify rejects the input,
    /// or the created definition cannot be found in the response.
    #[instrument(skip(self, zone, input), fields(shop = %self.shop, name = %input.name))]
    pub async fn create_shipping_rate(
        &self,
        zone: &DeliveryZone,
        input: &ShippingRateInput,
    ) -> Result<String, AdminShopifyError> {
        let existing = self.zone_definition_ids(zone).await?;

        let payload = self
            .execute::<DeliveryProfileUpdate>(create_variables(zone, input))
            .await?
            .delivery_profile_update
            .ok_or_else(|| missing_payload("deliveryProfileUpdate"))?;
        check_user_errors(&user_errors!(payload.user_errors))?;

        let profile = payload
            .profile
            .ok_or_else(|| missing_payload("deliveryProfileUpdate"))?;
        created_definition(&existing, zone_definitions!(profile, zone.zone_id), &input.name)
            .ok_or_else(|| {
                AdminShopifyError::NotFound(format!(
                    "Created method definition '{}' missing from profile",
                    input.name
                ))
            })
    }

    /// Delete method definitions from the profile that owns `zone`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or Shopify rejects the
    /// delete.
    #[instrument(skip(self, zone), fields(shop = %self.shop))]
    pub async fn delete_shipping_rates(
        &self,
        zone: &DeliveryZone,
        definition_ids: &[String],
    ) -> Result<(), AdminShopifyError> {
        if definition_ids.is_empty() {
            return Ok(());
        }

        let variables = delivery_profile_update::Variables {
            id: zone.profile_id.clone(),
            profile: delivery_profile_update::DeliveryProfileInput {
                location_groups_to_update: None,
                method_definitions_to_delete: Some(definition_ids.to_vec()),
            },
        };

        let payload = self
            .execute::<DeliveryProfileUpdate>(variables)
            .await?
            .delivery_profile_update
            .ok_or_else(|| missing_payload("deliveryProfileUpdate"))?;
        check_user_errors(&user_errors!(payload.user_errors))
    }
}
