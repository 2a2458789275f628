//! Discount operations.

use rust_decimal::Decimal;
use smartcartify_core::DiscountKind;
use tracing::instrument;

use super::queries::{
    DiscountAutomaticActivate, DiscountAutomaticBasicCreate, DiscountAutomaticBxgyCreate,
    DiscountAutomaticDeactivate, DiscountAutomaticDelete, DiscountAutomaticFreeShippingCreate,
    DiscountCodeActivate, DiscountCodeBasicCreate, DiscountCodeDeactivate, DiscountCodeDelete,
    DiscountCodeFreeShippingCreate, GetDiscountNodes, discount_automatic_activate,
    discount_automatic_basic_create, discount_automatic_bxgy_create,
    discount_automatic_deactivate, discount_automatic_delete,
    discount_automatic_free_shipping_create, discount_code_activate, discount_code_basic_create,
    discount_code_deactivate, discount_code_delete, discount_code_free_shipping_create,
    get_discount_nodes,
};
use super::{ShopClient, UserError, check_user_errors, missing_payload, user_errors};
use crate::shopify::AdminShopifyError;
use crate::shopify::types::{
    BasicDiscountInput, BuysRequirement, BxgyDiscountInput, DiscountNode, DiscountValue,
    FreeShippingDiscountInput, format_money,
};

// =============================================================================
// Input conversions
// =============================================================================

// Each operation module carries its own copy of the shared input types, so the
// converters are stamped out once per module.

/// `context` and `combinesWith` builders.
macro_rules! shared_inputs {
    ($module:ident) => {
        use super::super::queries::$module as q;

        pub fn context() -> q::DiscountContextInput {
            q::DiscountContextInput {
                all: Some(q::DiscountBuyerSelection::ALL),
            }
        }

        pub fn combines_with(
            c: crate::shopify::types::CombinesWith,
        ) -> q::DiscountCombinesWithInput {
            q::DiscountCombinesWithInput {
                order_discounts: Some(c.order_discounts),
                product_discounts: Some(c.product_discounts),
                shipping_discounts: Some(c.shipping_discounts),
            }
        }
    };
}

/// `minimumRequirement` builder. A zero threshold means no requirement.
macro_rules! minimum_inputs {
    ($module:ident) => {
        pub fn minimum_requirement(
            min_subtotal: Option<rust_decimal::Decimal>,
        ) -> Option<super::super::queries::$module::DiscountMinimumRequirementInput> {
            use super::super::queries::$module::{
                DiscountMinimumRequirementInput, DiscountMinimumSubtotalInput,
            };
            min_subtotal
                .filter(|m| *m > rust_decimal::Decimal::ZERO)
                .map(|m| DiscountMinimumRequirementInput {
                    subtotal: Some(DiscountMinimumSubtotalInput {
                        greater_than_or_equal_to_subtotal: Some(
                            crate::shopify::types::format_money(m),
                        ),
                    }),
                })
        }
    };
}

/// `items` builder for operations that target products.
macro_rules! item_inputs {
    ($module:ident) => {
        pub fn items(
            items: &crate::shopify::types::DiscountItems,
        ) -> super::super::queries::$module::DiscountItemsInput {
            use super::super::queries::$module::{
                DiscountCollectionsInput, DiscountItemsInput, DiscountProductsInput,
            };
            use crate::shopify::types::DiscountItems;

            let products = |products: Option<Vec<String>>, variants: Option<Vec<String>>| {
                Some(DiscountProductsInput {
                    products_to_add: products,
                    product_variants_to_add: variants,
                })
            };
            match items {
                DiscountItems::All => DiscountItemsInput {
                    all: Some(true),
                    products: None,
                    collections: None,
                },
                DiscountItems::Products(ids) => DiscountItemsInput {
                    all: None,
                    products: products(Some(ids.clone()), None),
                    collections: None,
                },
                DiscountItems::Variants(ids) => DiscountItemsInput {
                    all: None,
                    products: products(None, Some(ids.clone())),
                    collections: None,
                },
                DiscountItems::Collections(ids) => DiscountItemsInput {
                    all: None,
                    products: None,
                    collections: Some(DiscountCollectionsInput {
                        add: Some(ids.clone()),
                    }),
                },
            }
        }
    };
}

mod code_basic {
    shared_inputs!(discount_code_basic_create);
    minimum_inputs!(discount_code_basic_create);
    item_inputs!(discount_code_basic_create);
}

mod automatic_basic {
    shared_inputs!(discount_automatic_basic_create);
    minimum_inputs!(discount_automatic_basic_create);
    item_inputs!(discount_automatic_basic_create);
}

mod code_free_shipping {
    shared_inputs!(discount_code_free_shipping_create);
    minimum_inputs!(discount_code_free_shipping_create);
}

mod automatic_free_shipping {
    shared_inputs!(discount_automatic_free_shipping_create);
    minimum_inputs!(discount_automatic_free_shipping_create);
}

mod automatic_bxgy {
    shared_inputs!(discount_automatic_bxgy_create);
    item_inputs!(discount_automatic_bxgy_create);
}

fn to_fraction(value: Decimal) -> f64 {
    f64::try_from(value).unwrap_or_default()
}

/// Percentage or fixed amount, as `customerGets.value` fields.
fn value_parts(value: DiscountValue) -> (Option<f64>, Option<(String, bool)>) {
    match value {
        DiscountValue::Percentage(p) => (Some(to_fraction(p)), None),
        DiscountValue::Amount(amount) => (None, Some((format_money(amount), false))),
    }
}

fn code_basic_gets(input: &BasicDiscountInput) -> discount_code_basic_create::DiscountCustomerGetsInput {
    use discount_code_basic_create::{
        DiscountAmountInput, DiscountCustomerGetsInput, DiscountCustomerGetsValueInput,
    };
    let (percentage, amount) = value_parts(input.value);
    DiscountCustomerGetsInput {
        value: Some(DiscountCustomerGetsValueInput {
            percentage,
            discount_amount: amount.map(|(amount, each)| DiscountAmountInput {
                amount: Some(amount),
                applies_on_each_item: Some(each),
            }),
            discount_on_quantity: None,
        }),
        items: Some(code_basic::items(&input.items)),
    }
}

fn automatic_basic_gets(
    input: &BasicDiscountInput,
) -> discount_automatic_basic_create::DiscountCustomerGetsInput {
    use discount_automatic_basic_create::{
        DiscountAmountInput, DiscountCustomerGetsInput, DiscountCustomerGetsValueInput,
    };
    let (percentage, amount) = value_parts(input.value);
    DiscountCustomerGetsInput {
        value: Some(DiscountCustomerGetsValueInput {
            percentage,
            discount_amount: amount.map(|(amount, each)| DiscountAmountInput {
                amount: Some(amount),
                applies_on_each_item: Some(each),
            }),
            discount_on_quantity: None,
        }),
        items: Some(automatic_basic::items(&input.items)),
    }
}

fn bxgy_variables(input: &BxgyDiscountInput) -> discount_automatic_bxgy_create::Variables {
    use discount_automatic_bxgy_create::{
        DiscountAutomaticBxgyInput, DiscountCustomerBuysInput, DiscountCustomerBuysValueInput,
        DiscountCustomerGetsInput, DiscountCustomerGetsValueInput, DiscountEffectInput,
        DiscountOnQuantityInput, Variables,
    };

    let buys_value = match input.buys {
        BuysRequirement::Quantity(n) => DiscountCustomerBuysValueInput {
            quantity: Some(n.to_string()),
            amount: None,
        },
        BuysRequirement::Subtotal(amount) => DiscountCustomerBuysValueInput {
            quantity: None,
            amount: Some(format_money(amount)),
        },
    };

    Variables {
        automatic_bxgy_discount: DiscountAutomaticBxgyInput {
            title: Some(input.title.clone()),
            starts_at: Some(input.starts_at.to_rfc3339()),
            ends_at: None,
            context: Some(automatic_bxgy::context()),
            customer_buys: Some(DiscountCustomerBuysInput {
                value: Some(buys_value),
                items: Some(automatic_bxgy::items(&input.buys_items)),
            }),
            customer_gets: Some(DiscountCustomerGetsInput {
                value: Some(DiscountCustomerGetsValueInput {
                    percentage: None,
                    discount_amount: None,
                    discount_on_quantity: Some(DiscountOnQuantityInput {
                        quantity: Some(input.gets_quantity.to_string()),
                        effect: Some(DiscountEffectInput {
                            percentage: Some(1.0),
                            amount: None,
                        }),
                    }),
                }),
                items: Some(automatic_bxgy::items(&input.gets_items)),
            }),
            uses_per_order_limit: input.uses_per_order_limit.map(|n| n.to_string()),
            combines_with: Some(automatic_bxgy::combines_with(input.combines_with)),
        },
    }
}

/// Pull the created node id out of a create payload.
fn created_id(
    operation: &str,
    id: Option<String>,
    user_errors: &[UserError],
) -> Result<String, AdminShopifyError> {
    check_user_errors(user_errors)?;
    id.ok_or_else(|| missing_payload(operation))
}

/// Shopify search syntax for an exact title.
fn title_query(title: &str) -> String {
    format!("title:'{}'", title.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn discount_title(discount: get_discount_nodes::GetDiscountNodesDiscountNodesNodesDiscount) -> String {
    use get_discount_nodes::GetDiscountNodesDiscountNodesNodesDiscount as Discount;
    match discount {
        Discount::DiscountAutomaticApp(d) => d.title,
        Discount::DiscountAutomaticBasic(d) => d.title,
        Discount::DiscountAutomaticBxgy(d) => d.title,
        Discount::DiscountAutomaticFreeShipping(d) => d.title,
        Discount::DiscountCodeApp(d) => d.title,
        Discount::DiscountCodeBasic(d) => d.title,
        Discount::DiscountCodeBxgy(d) => d.title,
        Discount::DiscountCodeFreeShipping(d) => d.title,
    }
}

fn discount_kind(id: &str) -> Result<DiscountKind, AdminShopifyError> {
    DiscountKind::from_gid(id)
        .ok_or_else(|| AdminShopifyError::NotFound(format!("Not a discount id: {id}")))
}

impl ShopClient {
    // =========================================================================
    // Discount creation
    // =========================================================================

    /// Create a basic discount. A code creates a code discount, otherwise an
    /// automatic one.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or Shopify rejects the input.
    #[instrument(skip(self, input), fields(shop = %self.shop, title = %input.title))]
    pub async fn create_basic_discount(
        &self,
        input: &BasicDiscountInput,
    ) -> Result<String, AdminShopifyError> {
        let starts_at = input.starts_at.to_rfc3339();

        if let Some(code) = &input.code {
            let variables = discount_code_basic_create::Variables {
                basic_code_discount: discount_code_basic_create::DiscountCodeBasicInput {
                    title: Some(input.title.clone()),
                    code: Some(code.clone()),
                    starts_at: Some(starts_at),
                    ends_at: None,
                    context: Some(code_basic::context()),
                    customer_gets: Some(code_basic_gets(input)),
                    minimum_requirement: code_basic::minimum_requirement(input.min_subtotal),
                    combines_with: Some(code_basic::combines_with(input.combines_with)),
                    applies_once_per_customer: Some(false),
                    usage_limit: None,
                },
            };
            let payload = self
                .execute::<DiscountCodeBasicCreate>(variables)
                .await?
                .discount_code_basic_create
                .ok_or_else(|| missing_payload("discountCodeBasicCreate"))?;
            return created_id(
                "discountCodeBasicCreate",
                payload.code_discount_node.map(|n| n.id),
                &user_errors!(payload.user_errors),
            );
        }

        let variables = discount_automatic_basic_create::Variables {
            automatic_basic_discount: discount_automatic_basic_create::DiscountAutomaticBasicInput {
                title: Some(input.title.clone()),
                starts_at: Some(starts_at),
                ends_at: None,
                context: Some(automatic_basic::context()),
                customer_gets: Some(automatic_basic_gets(input)),
                minimum_requirement: automatic_basic::minimum_requirement(input.min_subtotal),
                combines_with: Some(automatic_basic::combines_with(input.combines_with)),
            },
        };
        let payload = self
            .execute::<DiscountAutomaticBasicCreate>(variables)
            .await?
            .discount_automatic_basic_create
            .ok_or_else(|| missing_payload("discountAutomaticBasicCreate"))?;
        created_id(
            "discountAutomaticBasicCreate",
            payload.automatic_discount_node.map(|n| n.id),
            &user_errors!(payload.user_errors),
        )
    }

    /// Create a free shipping discount, code or automatic.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or Shopify rejects the input.
    #[instrument(skip(self, input), fields(shop = %self.shop, title = %input.title))]
    pub async fn create_free_shipping_discount(
        &self,
        input: &FreeShippingDiscountInput,
    ) -> Result<String, AdminShopifyError> {
        let starts_at = input.starts_at.to_rfc3339();

        if let Some(code) = &input.code {
            use discount_code_free_shipping_create::{
                DiscountCodeFreeShippingInput, DiscountShippingDestinationSelectionInput,
                Variables,
            };
            let variables = Variables {
                free_shipping_code_discount: DiscountCodeFreeShippingInput {
                    title: Some(input.title.clone()),
                    code: Some(code.clone()),
                    starts_at: Some(starts_at),
                    ends_at: None,
                    context: Some(code_free_shipping::context()),
                    minimum_requirement: code_free_shipping::minimum_requirement(
                        input.min_subtotal,
                    ),
                    combines_with: Some(code_free_shipping::combines_with(input.combines_with)),
                    destination: Some(DiscountShippingDestinationSelectionInput { all: Some(true) }),
                    applies_once_per_customer: Some(false),
                },
            };
            let payload = self
                .execute::<DiscountCodeFreeShippingCreate>(variables)
                .await?
                .discount_code_free_shipping_create
                .ok_or_else(|| missing_payload("discountCodeFreeShippingCreate"))?;
            return created_id(
                "discountCodeFreeShippingCreate",
                payload.code_discount_node.map(|n| n.id),
                &user_errors!(payload.user_errors),
            );
        }

        use discount_automatic_free_shipping_create::{
            DiscountAutomaticFreeShippingInput, DiscountShippingDestinationSelectionInput,
            Variables,
        };
        let variables = Variables {
            free_shipping_automatic_discount: DiscountAutomaticFreeShippingInput {
                title: Some(input.title.clone()),
                starts_at: Some(starts_at),
                ends_at: None,
                context: Some(automatic_free_shipping::context()),
                minimum_requirement: automatic_free_shipping::minimum_requirement(
                    input.min_subtotal,
                ),
                combines_with: Some(automatic_free_shipping::combines_with(input.combines_with)),
                destination: Some(DiscountShippingDestinationSelectionInput { all: Some(true) }),
            },
        };
        let payload = self
            .execute::<DiscountAutomaticFreeShippingCreate>(variables)
            .await?
            .discount_automatic_free_shipping_create
            .ok_or_else(|| missing_payload("discountAutomaticFreeShippingCreate"))?;
        created_id(
            "discountAutomaticFreeShippingCreate",
            payload.automatic_discount_node.map(|n| n.id),
            &user_errors!(payload.user_errors),
        )
    }

    /// Create an automatic Buy X Get Y discount. The gift items are 100% off.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or Shopify rejects the input.
    #[instrument(skip(self, input), fields(shop = %self.shop, title = %input.title))]
    pub async fn create_bxgy_discount(
        &self,
        input: &BxgyDiscountInput,
    ) -> Result<String, AdminShopifyError> {
        let payload = self
            .execute::<DiscountAutomaticBxgyCreate>(bxgy_variables(input))
            .await?
            .discount_automatic_bxgy_create
            .ok_or_else(|| missing_payload("discountAutomaticBxgyCreate"))?;
        created_id(
            "discountAutomaticBxgyCreate",
            payload.automatic_discount_node.map(|n| n.id),
            &user_errors!(payload.user_errors),
        )
    }

    // =========================================================================
    // Discount lifecycle
    // =========================================================================

    /// Activate or deactivate a code or automatic discount.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is not a discount node, the API request
    /// fails or Shopify rejects the change.
    #[instrument(skip(self), fields(shop = %self.shop))]
    pub async fn set_discount_active(
        &self,
        id: &str,
        active: bool,
    ) -> Result<(), AdminShopifyError> {
        let id = id.to_string();
        let errors = match (discount_kind(&id)?, active) {
            (DiscountKind::Automatic, true) => self
                .execute::<DiscountAutomaticActivate>(discount_automatic_activate::Variables { id })
                .await?
                .discount_automatic_activate
                .map(|p| user_errors!(p.user_errors)),
            (DiscountKind::Automatic, false) => self
                .execute::<DiscountAutomaticDeactivate>(discount_automatic_deactivate::Variables {
                    id,
                })
                .await?
                .discount_automatic_deactivate
                .map(|p| user_errors!(p.user_errors)),
            (DiscountKind::Code, true) => self
                .execute::<DiscountCodeActivate>(discount_code_activate::Variables { id })
                .await?
                .discount_code_activate
                .map(|p| user_errors!(p.user_errors)),
            (DiscountKind::Code, false) => self
                .execute::<DiscountCodeDeactivate>(discount_code_deactivate::Variables { id })
                .await?
                .discount_code_deactivate
                .map(|p| user_errors!(p.user_errors)),
        };
        check_user_errors(&errors.unwrap_or_default())
    }

    /// Delete a code or automatic discount.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is not a discount node, the API request
    /// fails or Shopify rejects the delete.
    #[instrument(skip(self), fields(shop = %self.shop))]
    pub async fn delete_discount(&self, id: &str) -> Result<(), AdminShopifyError> {
        let id = id.to_string();
        let errors = match discount_kind(&id)? {
            DiscountKind::Automatic => self
                .execute::<DiscountAutomaticDelete>(discount_automatic_delete::Variables { id })
                .await?
                .discount_automatic_delete
                .map(|p| user_errors!(p.user_errors)),
            DiscountKind::Code => self
                .execute::<DiscountCodeDelete>(discount_code_delete::Variables { id })
                .await?
                .discount_code_delete
                .map(|p| user_errors!(p.user_errors)),
        };
        check_user_errors(&errors.unwrap_or_default())
    }

    /// Find discounts whose title is exactly `title`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(shop = %self.shop))]
    pub async fn find_discounts_by_title(
        &self,
        title: &str,
    ) -> Result<Vec<DiscountNode>, AdminShopifyError> {
        let data = self
            .execute::<GetDiscountNodes>(get_discount_nodes::Variables {
                query: title_query(title),
            })
            .await?;

        Ok(data
            .discount_nodes
            .nodes
            .into_iter()
            .filter_map(|node| {
                let node_title = discount_title(node.discount);
                (node_title == title).then_some(DiscountNode {
                    id: node.id,
                    title: node_title,
                })
            })
            .collect())
    }
}
