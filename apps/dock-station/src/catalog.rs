//! # In-Memory Catalog Resolver
//!
//! Answers the engine's resolve and confirm calls from a product catalog
//! loaded at startup, and records what each applied scan would add to the
//! picking.
//!
//! ## Resolution Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       resolve_identifiers                               │
//! │                                                                         │
//! │  picking unknown ───────────────────────────► Error "Picking not found" │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  template with this shared GTIN?                                       │
//! │       ├── one variant ─────────────────────► apply                     │
//! │       ├── several ─────────────────────────► NeedsVariantChoice        │
//! │       │                                                                 │
//! │       ▼ no                                                             │
//! │  variant with this barcode? ───────────────► apply                     │
//! │       │                                                                 │
//! │       ▼ no                                                             │
//! │  Error "Product not found for scanned code"                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Applying adds the quantity to the planned move for that variant and
//! records a move line carrying the lot and expiry. A confirmation repeated
//! for the same scan id is answered without recording anything twice.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use dock_core::{
    normalize_to_gtin14, ConfirmOutcome, ParsedIdentifiers, ResolutionOutcome, VariantCandidate,
};
use dock_scan::{ConfirmRequest, InventoryResolver, ResolveRequest, ResolverCall, ResolverError};

use crate::error::{StationError, StationResult};

// =============================================================================
// Catalog Model
// =============================================================================

/// Everything the station knows about products and open receipts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub pickings: Vec<Picking>,

    #[serde(default)]
    pub templates: Vec<ProductTemplate>,
}

/// An open incoming receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Picking {
    pub id: i64,
    pub name: String,
}

/// A product with one or more variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductTemplate {
    pub id: i64,
    pub name: String,

    /// GTIN printed on every variant of this product.
    #[serde(default)]
    pub shared_gtin: Option<String>,

    #[serde(default)]
    pub variants: Vec<ProductVariant>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: i64,
    pub name: String,

    /// Variant-level barcode, if the variant carries its own GTIN.
    #[serde(default)]
    pub barcode: Option<String>,

    #[serde(default = "default_uom")]
    pub uom: String,
}

fn default_uom() -> String {
    "Units".to_string()
}

impl ProductVariant {
    fn candidate(&self) -> VariantCandidate {
        VariantCandidate {
            id: self.id,
            display_name: self.name.clone(),
            uom: self.uom.clone(),
        }
    }
}

impl Catalog {
    /// Parses a catalog from JSON text.
    pub fn from_json(json: &str) -> StationResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a catalog file.
    pub fn load(path: &Path) -> StationResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| StationError::CatalogRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// A small catalog for trying the station without a file.
    pub fn demo() -> Self {
        let variant = |id: i64, name: &str, barcode: Option<&str>| ProductVariant {
            id,
            name: name.to_string(),
            barcode: barcode.map(str::to_string),
            uom: default_uom(),
        };

        Catalog {
            pickings: vec![
                Picking {
                    id: 1,
                    name: "WH/IN/00001".into(),
                },
                Picking {
                    id: 2,
                    name: "WH/IN/00002".into(),
                },
            ],
            templates: vec![
                ProductTemplate {
                    id: 10,
                    name: "Polo Shirt".into(),
                    shared_gtin: Some("12345678901231".into()),
                    variants: vec![
                        variant(100, "Polo Shirt (S)", None),
                        variant(101, "Polo Shirt (M)", None),
                        variant(102, "Polo Shirt (L)", None),
                    ],
                },
                ProductTemplate {
                    id: 20,
                    name: "Work Gloves".into(),
                    shared_gtin: Some("4006381333931".into()),
                    variants: vec![variant(200, "Work Gloves", None)],
                },
                ProductTemplate {
                    id: 30,
                    name: "Safety Helmet".into(),
                    shared_gtin: None,
                    variants: vec![
                        variant(300, "Safety Helmet (White)", Some("5901234123457")),
                        variant(301, "Safety Helmet (Yellow)", Some("10614141000415")),
                    ],
                },
            ],
        }
    }

    pub fn picking(&self, id: i64) -> Option<&Picking> {
        self.pickings.iter().find(|p| p.id == id)
    }

    /// Template whose shared GTIN normalizes to `gtin14`.
    fn template_by_shared_gtin(&self, gtin14: &str) -> Option<&ProductTemplate> {
        self.templates.iter().find(|t| {
            t.shared_gtin
                .as_deref()
                .and_then(normalize_to_gtin14)
                .is_some_and(|shared| shared == gtin14)
        })
    }

    /// Variant whose own barcode matches. Tries the normalized GTIN first,
    /// then the raw code.
    fn variant_by_barcode(&self, gtin14: &str) -> Option<&ProductVariant> {
        self.variants().find(|v| match v.barcode.as_deref() {
            Some(barcode) => {
                normalize_to_gtin14(barcode).is_some_and(|code| code == gtin14)
                    || barcode == gtin14
            }
            None => false,
        })
    }

    fn variant(&self, id: i64) -> Option<&ProductVariant> {
        self.variants().find(|v| v.id == id)
    }

    fn variants(&self) -> impl Iterator<Item = &ProductVariant> {
        self.templates.iter().flat_map(|t| t.variants.iter())
    }
}

// =============================================================================
// Recorded Moves
// =============================================================================

/// Planned quantity of one variant on one picking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedMove {
    pub picking_id: i64,
    pub variant_id: i64,
    pub name: String,
    pub planned: u32,
}

/// One applied scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveLine {
    pub scan_id: Uuid,
    pub picking_id: i64,
    pub variant_id: i64,
    pub quantity: u32,
    pub lot: Option<String>,
    pub expiry: Option<NaiveDate>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Default)]
struct Ledger {
    moves: Vec<PlannedMove>,
    lines: Vec<MoveLine>,
    confirmed: HashSet<Uuid>,
}

// =============================================================================
// Catalog Resolver
// =============================================================================

pub const PICKING_NOT_FOUND: &str = "Picking not found";
pub const PRODUCT_NOT_FOUND: &str = "Product not found for scanned code";
pub const INVALID_SELECTION: &str = "Invalid selection";

/// [`InventoryResolver`] backed by a [`Catalog`].
pub struct CatalogResolver {
    catalog: Catalog,
    ledger: Mutex<Ledger>,
}

impl CatalogResolver {
    pub fn new(catalog: Catalog) -> Self {
        CatalogResolver {
            catalog,
            ledger: Mutex::new(Ledger::default()),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Planned moves so far, in creation order.
    pub fn planned_moves(&self) -> Vec<PlannedMove> {
        self.ledger().moves.clone()
    }

    /// Recorded move lines so far, in creation order.
    pub fn move_lines(&self) -> Vec<MoveLine> {
        self.ledger().lines.clone()
    }

    fn log_call(call: ResolverCall) {
        match call.to_json() {
            Ok(payload) => debug!(scan_id = %call.scan_id(), %payload, "Resolver call"),
            Err(e) => debug!(scan_id = %call.scan_id(), error = %e, "Resolver call not serializable"),
        }
    }

    /// Synchronous body of `resolve_identifiers`.
    pub fn resolve(&self, request: &ResolveRequest) -> ResolutionOutcome {
        let Some(picking_id) = request
            .picking
            .picking_id
            .filter(|id| self.catalog.picking(*id).is_some())
        else {
            return ResolutionOutcome::error(PICKING_NOT_FOUND);
        };

        let Some(gtin) = request.identifiers.gtin() else {
            return ResolutionOutcome::error(PRODUCT_NOT_FOUND);
        };

        if let Some(template) = self.catalog.template_by_shared_gtin(gtin) {
            match template.variants.as_slice() {
                [] => {}
                [only] => {
                    let message = Self::apply(
                        &mut self.ledger(),
                        request.scan_id,
                        picking_id,
                        only,
                        &request.identifiers,
                    );
                    return ResolutionOutcome::Ok {
                        message: Some(message),
                    };
                }
                variants => {
                    return ResolutionOutcome::NeedsVariantChoice {
                        candidates: variants.iter().map(ProductVariant::candidate).collect(),
                    }
                }
            }
        }

        match self.catalog.variant_by_barcode(gtin) {
            Some(variant) => ResolutionOutcome::Ok {
                message: Some(Self::apply(
                    &mut self.ledger(),
                    request.scan_id,
                    picking_id,
                    variant,
                    &request.identifiers,
                )),
            },
            None => ResolutionOutcome::error(PRODUCT_NOT_FOUND),
        }
    }

    /// Synchronous body of `confirm_variant`.
    pub fn confirm(&self, request: &ConfirmRequest) -> ConfirmOutcome {
        let Some(picking_id) = request
            .picking
            .picking_id
            .filter(|id| self.catalog.picking(*id).is_some())
        else {
            return ConfirmOutcome::error(PICKING_NOT_FOUND);
        };

        let Some(variant) = self.catalog.variant(request.candidate_id) else {
            return ConfirmOutcome::error(INVALID_SELECTION);
        };

        // One guard across the check and the apply
        let mut ledger = self.ledger();
        if !ledger.confirmed.insert(request.scan_id) {
            info!(scan_id = %request.scan_id, "Confirmation already applied");
            return ConfirmOutcome::Ok {
                message: Some(format!("{} already added", variant.name)),
            };
        }

        let message = Self::apply(
            &mut ledger,
            request.scan_id,
            picking_id,
            variant,
            &request.identifiers,
        );
        ConfirmOutcome::Ok {
            message: Some(message),
        }
    }

    fn apply(
        ledger: &mut Ledger,
        scan_id: Uuid,
        picking_id: i64,
        variant: &ProductVariant,
        identifiers: &ParsedIdentifiers,
    ) -> String {
        let quantity = identifiers.effective_quantity();

        match ledger
            .moves
            .iter_mut()
            .find(|m| m.picking_id == picking_id && m.variant_id == variant.id)
        {
            Some(planned) => planned.planned = planned.planned.saturating_add(quantity),
            None => ledger.moves.push(PlannedMove {
                picking_id,
                variant_id: variant.id,
                name: variant.name.clone(),
                planned: quantity,
            }),
        }

        ledger.lines.push(MoveLine {
            scan_id,
            picking_id,
            variant_id: variant.id,
            quantity,
            lot: identifiers.lot.clone(),
            expiry: identifiers.expiry_date(),
            recorded_at: Utc::now(),
        });

        info!(
            %scan_id,
            picking_id,
            variant_id = variant.id,
            quantity,
            lot = ?identifiers.lot,
            "Move line recorded"
        );

        format!("Added line for {} (planned +{})", variant.name, quantity)
    }
}

impl InventoryResolver for CatalogResolver {
    fn resolve_identifiers(
        &self,
        request: ResolveRequest,
    ) -> BoxFuture<'_, Result<ResolutionOutcome, ResolverError>> {
        Box::pin(async move {
            let outcome = self.resolve(&request);
            Self::log_call(request.into());
            Ok(outcome)
        })
    }

    fn confirm_variant(
        &self,
        request: ConfirmRequest,
    ) -> BoxFuture<'_, Result<ConfirmOutcome, ResolverError>> {
        Box::pin(async move {
            let outcome = self.confirm(&request);
            Self::log_call(request.into());
            Ok(outcome)
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
