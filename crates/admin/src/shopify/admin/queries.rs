//! GraphQL operation definitions for the Shopify Admin API.
//!
//! Uses `graphql_client` to generate type-safe Rust code from the queries
//! under `graphql/admin/queries/`, checked against the schema subset in
//! `graphql/admin/schema.graphql`.

use graphql_client::GraphQLQuery;

// =============================================================================
// Custom scalar type aliases (used by graphql_client)
// =============================================================================

/// ISO 8601 date-time string.
type DateTime = String;

/// Decimal number as string (preserves precision).
type Decimal = String;

/// Unsigned 64-bit integer as string.
type UnsignedInt64 = String;

// =============================================================================
// Discount creation
// =============================================================================

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/admin/schema.graphql",
    query_path = "graphql/admin/queries/discounts.graphql",
    response_derives = "Debug, Clone",
    variables_derives = "Debug, Clone"
)]
pub struct DiscountCodeBasicCreate;

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/admin/schema.graphql",
    query_path = "graphql/admin/queries/discounts.graphql",
    response_derives = "Debug, Clone",
    variables_derives = "Debug, Clone"
)]
pub struct DiscountAutomaticBasicCreate;

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/admin/schema.graphql",
    query_path = "graphql/admin/queries/discounts.graphql",
    response_derives = "Debug, Clone",
    variables_derives = "Debug, Clone"
)]
pub struct DiscountCodeFreeShippingCreate;

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/admin/schema.graphql",
    query_path = "graphql/admin/queries/discounts.graphql",
    response_derives = "Debug, Clone",
    variables_derives = "Debug, Clone"
)]
pub struct DiscountAutomaticFreeShippingCreate;

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/admin/schema.graphql",
    query_path = "graphql/admin/queries/discounts.graphql",
    response_derives = "Debug, Clone",
    variables_derives = "Debug, Clone"
)]
pub struct DiscountAutomaticBxgyCreate;

// =============================================================================
// Discount lifecycle
// =============================================================================

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/admin/schema.graphql",
    query_path = "graphql/admin/queries/discounts.graphql",
    response_derives = "Debug, Clone",
    variables_derives = "Debug, Clone"
)]
pub struct DiscountAutomaticActivate;

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/admin/schema.graphql",
    query_path = "graphql/admin/queries/discounts.graphql",
    response_derives = "Debug, Clone",
    variables_derives = "Debug, Clone"
)]
pub struct DiscountAutomaticDeactivate;

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/admin/schema.graphql",
    query_path = "graphql/admin/queries/discounts.graphql",
    response_derives = "Debug, Clone",
    variables_derives = "Debug, Clone"
)]
pub struct DiscountAutomaticDelete;

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/admin/schema.graphql",
    query_path = "graphql/admin/queries/discounts.graphql",
    response_derives = "Debug, Clone",
    variables_derives = "Debug, Clone"
)]
pub struct DiscountCodeActivate;

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/admin/schema.graphql",
    query_path = "graphql/admin/queries/discounts.graphql",
    response_derives = "Debug, Clone",
    variables_derives = "Debug, Clone"
)]
pub struct DiscountCodeDeactivate;

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/admin/schema.graphql",
    query_path = "graphql/admin/queries/discounts.graphql",
    response_derives = "Debug, Clone",
    variables_derives = "Debug, Clone"
)]
pub struct DiscountCodeDelete;

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/admin/schema.graphql",
    query_path = "graphql/admin/queries/discounts.graphql",
    response_derives = "Debug, Clone",
    variables_derives = "Debug, Clone"
)]
pub struct GetDiscountNodes;

// =============================================================================
// Catalog and shop
// =============================================================================

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/admin/schema.graphql",
    query_path = "graphql/admin/queries/catalog.graphql",
    response_derives = "Debug, Clone",
    variables_derives = "Debug, Clone"
)]
pub struct GetShopCurrency;

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/admin/schema.graphql",
    query_path = "graphql/admin/queries/catalog.graphql",
    response_derives = "Debug, Clone",
    variables_derives = "Debug, Clone"
)]
pub struct GetProductIds;

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/admin/schema.graphql",
    query_path = "graphql/admin/queries/catalog.graphql",
    response_derives = "Debug, Clone",
    variables_derives = "Debug, Clone"
)]
pub struct GetProductFirstVariant;

// =============================================================================
// Delivery profiles
// =============================================================================

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/admin/schema.graphql",
    query_path = "graphql/admin/queries/delivery.graphql",
    response_derives = "Debug, Clone",
    variables_derives = "Debug, Clone"
)]
pub struct GetDeliveryProfiles;

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/admin/schema.graphql",
    query_path = "graphql/admin/queries/delivery.graphql",
    response_derives = "Debug, Clone",
    variables_derives = "Debug, Clone"
)]
pub struct GetDeliveryProfileMethods;

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/admin/schema.graphql",
    query_path = "graphql/admin/queries/delivery.graphql",
    response_derives = "Debug, Clone",
    variables_derives = "Debug, Clone"
)]
pub struct DeliveryProfileUpdate;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_query_sets_operation_name() {
        let body = GetDiscountNodes::build_query(get_discount_nodes::Variables {
            query: "title:'Summer'".to_string(),
        });
        assert_eq!(body.operation_name, "GetDiscountNodes");
        assert!(body.query.contains("query GetDiscountNodes"));
    }

    #[test]
    fn test_id_mutation_variables_shape() {
        let body = DiscountCodeDelete::build_query(discount_code_delete::Variables {
            id: "gid://shopify/DiscountCodeNode/1".to_string(),
        });
        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(json["variables"]["id"], "gid://shopify/DiscountCodeNode/1");
        assert_eq!(json["operationName"], "DiscountCodeDelete");
    }

    #[test]
    fn test_delivery_profile_delete_variables() {
        let variables = delivery_profile_update::Variables {
            id: "gid://shopify/DeliveryProfile/1".to_string(),
            profile: delivery_profile_update::DeliveryProfileInput {
                location_groups_to_update: None,
                method_definitions_to_delete: Some(vec![
                    "gid://shopify/DeliveryMethodDefinition/1".to_string(),
                ]),
            },
        };
        let json = serde_json::to_value(&variables).expect("serialize");
        assert_eq!(
            json["profile"]["methodDefinitionsToDelete"][0],
            "gid://shopify/DeliveryMethodDefinition/1"
        );
    }

    #[test]
    fn test_discount_nodes_response_parses_union() {
        use get_discount_nodes::GetDiscountNodesDiscountNodesNodesDiscount as Discount;

        let data: get_discount_nodes::ResponseData = serde_json::from_value(serde_json::json!({
            "discountNodes": {"nodes": [{
                "id": "gid://shopify/DiscountAutomaticNode/3",
                "discount": {"__typename": "DiscountAutomaticBasic", "title": "Summer"}
            }]}
        }))
        .expect("parse");
        let node = data.discount_nodes.nodes.into_iter().next().expect("node");
        assert!(matches!(
            node.discount,
            Discount::DiscountAutomaticBasic(ref d) if d.title == "Summer"
        ));
    }
}
