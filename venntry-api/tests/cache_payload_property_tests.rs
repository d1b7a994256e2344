//! Property-Based Tests for Cache Payloads
//!
//! Every value the catalog caches must read back from its JSON payload
//! unchanged, or a cache hit would differ from the relational read it
//! replaced.

use proptest::prelude::*;
use venntry_test_utils::generators::{arb_inventory, arb_product, arb_warehouse_with_products};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_product_payload_is_lossless(product in arb_product()) {
        let bytes = serde_json::to_vec(&product).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let decoded: venntry_core::Product =
            serde_json::from_slice(&bytes).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(decoded, product);
    }

    #[test]
    fn prop_product_listing_payload_is_lossless(products in prop::collection::vec(arb_product(), 0..5)) {
        let bytes = serde_json::to_vec(&products).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let decoded: Vec<venntry_core::Product> =
            serde_json::from_slice(&bytes).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(decoded, products);
    }

    #[test]
    fn prop_warehouse_payload_is_lossless(warehouse in arb_warehouse_with_products()) {
        let bytes = serde_json::to_vec(&warehouse).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let decoded: venntry_core::Warehouse =
            serde_json::from_slice(&bytes).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(decoded, warehouse);
    }

    #[test]
    fn prop_inventory_payload_is_lossless(inventory in arb_inventory()) {
        let bytes = serde_json::to_vec(&inventory).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let decoded: venntry_core::Inventory =
            serde_json::from_slice(&bytes).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(decoded, inventory);
    }
}
