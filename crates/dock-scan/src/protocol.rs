//! # Resolver Protocol
//!
//! Request payloads sent to the inventory resolver.
//!
//! ## Protocol Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Resolver Protocol                                  │
//! │                                                                         │
//! │  ONE CALL PER ACCEPTED SCAN                                            │
//! │  ──────────────────────────                                            │
//! │  engine ───► Resolve { scan_id, identifiers, picking }                 │
//! │  engine ◄─── Ok | NeedsVariantChoice { candidates } | Error            │
//! │                                                                         │
//! │  FOLLOW-UP AFTER USER CHOICE                                           │
//! │  ───────────────────────────                                           │
//! │  engine ───► Confirm { scan_id, candidate_id, identifiers, picking }   │
//! │  engine ◄─── Ok | Error                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! Calls serialize as adjacently tagged JSON:
//! ```json
//! { "type": "confirm", "payload": { "scan_id": "...", "candidate_id": 12, ... } }
//! ```
//!
//! `scan_id` is stable across a dismissed-and-reopened choice, so a resolver
//! can treat it as an idempotency key for confirmations.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dock_core::{ParsedIdentifiers, PickingContext};

/// Asks the resolver to apply a scan to the active picking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveRequest {
    /// The physical scan this request belongs to.
    pub scan_id: Uuid,

    /// What the scan encoded.
    pub identifiers: ParsedIdentifiers,

    /// Active picking at call time.
    pub picking: PickingContext,
}

/// Applies the variant the user picked for an earlier `NeedsVariantChoice`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmRequest {
    /// The scan that produced the choice. Idempotency key.
    pub scan_id: Uuid,

    /// The chosen candidate's id.
    pub candidate_id: i64,

    /// The original identifiers.
    pub identifiers: ParsedIdentifiers,

    /// Active picking at confirmation time.
    pub picking: PickingContext,
}

/// Any call made to the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ResolverCall {
    Resolve(ResolveRequest),
    Confirm(ConfirmRequest),
}

impl ResolverCall {
    /// The scan this call belongs to.
    pub fn scan_id(&self) -> Uuid {
        match self {
            ResolverCall::Resolve(req) => req.scan_id,
            ResolverCall::Confirm(req) => req.scan_id,
        }
    }

    /// Serializes the call for transport or logging.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<ResolveRequest> for ResolverCall {
    fn from(req: ResolveRequest) -> Self {
        ResolverCall::Resolve(req)
    }
}

impl From<ConfirmRequest> for ResolverCall {
    fn from(req: ConfirmRequest) -> Self {
        ResolverCall::Confirm(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirm_wire_shape() {
        let identifiers = dock_core::normalize("0112345678901231").unwrap();
        let scan_id = Uuid::new_v4();
        let call = ResolverCall::from(ConfirmRequest {
            scan_id,
            candidate_id: 12,
            identifiers,
            picking: PickingContext::picking(7),
        });

        let json: serde_json::Value = serde_json::from_str(&call.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "confirm");
        assert_eq!(json["payload"]["candidate_id"], 12);
        assert_eq!(json["payload"]["picking"]["picking_id"], 7);
        assert_eq!(json["payload"]["identifiers"]["gtin14"], "12345678901231");
        assert_eq!(json["payload"]["scan_id"], scan_id.to_string());
        assert_eq!(call.scan_id(), scan_id);
    }

    #[test]
    fn test_resolve_round_trip() {
        let call = ResolverCall::from(ResolveRequest {
            scan_id: Uuid::new_v4(),
            identifiers: dock_core::normalize("012345678905").unwrap(),
            picking: PickingContext::none(),
        });
        let back: ResolverCall = serde_json::from_str(&call.to_json().unwrap()).unwrap();
        assert_eq!(back, call);
    }
}
