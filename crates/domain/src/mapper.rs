//! Configuration mapper: translates a validated five-step configuration
//! into the production machine payload and the inventory deduction set.
//!
//! Pure and deterministic. Both outputs are derived from the one catalog
//! table, so the payload builder and the deduction path cannot disagree
//! about codes or quantities.

use serde::{Deserialize, Serialize};

use crate::catalog::SneakerConfig;

/// Number of physical tread pattern slots per assembly block.
pub const TREAD_SLOTS_PER_BLOCK: usize = 3;

/// One blade color sub-field of an assembly block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blade {
    pub color_code: String,
}

/// One assembly block of the production payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub material_code: String,
    /// Sole code repeated once per tread pattern slot.
    pub tread_patterns: Vec<String>,
    /// Between 1 and 3 blades, per the lace detail weight.
    pub blades: Vec<Blade>,
}

/// Payload submitted to the production queue middleware for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionPayload {
    pub style_code: String,
    pub blocks: Vec<Block>,
}

/// A single entry of the inventory deduction set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryDeduction {
    pub code: String,
    pub quantity: u32,
}

/// Builds the production payload for a configuration.
///
/// The payload repeats one block per the style's block count; every block
/// carries the material code, the sole code in each tread slot, and one
/// blade per the lace detail's weight.
pub fn to_production_payload(config: &SneakerConfig) -> ProductionPayload {
    let block = Block {
        material_code: config.material.code().to_string(),
        tread_patterns: vec![config.sole.code().to_string(); TREAD_SLOTS_PER_BLOCK],
        blades: (0..config.lace_detail.blade_count())
            .map(|_| Blade {
                color_code: config.color.code().to_string(),
            })
            .collect(),
    };

    ProductionPayload {
        style_code: config.style.code().to_string(),
        blocks: vec![block; config.style.block_count() as usize],
    }
}

/// Builds the inventory deduction set for a configuration.
///
/// One entry per step: the style contributes as many units as the style's
/// block count, every other step contributes one unit.
pub fn to_inventory_deductions(config: &SneakerConfig) -> Vec<InventoryDeduction> {
    vec![
        InventoryDeduction {
            code: config.style.code().to_string(),
            quantity: config.style.block_count(),
        },
        InventoryDeduction {
            code: config.material.code().to_string(),
            quantity: 1,
        },
        InventoryDeduction {
            code: config.sole.code().to_string(),
            quantity: 1,
        },
        InventoryDeduction {
            code: config.color.code().to_string(),
            quantity: 1,
        },
        InventoryDeduction {
            code: config.lace_detail.code().to_string(),
            quantity: 1,
        },
    ]
}

/// Maps a configuration to both production outputs in one call.
pub fn map(config: &SneakerConfig) -> (ProductionPayload, Vec<InventoryDeduction>) {
    (to_production_payload(config), to_inventory_deductions(config))
}
