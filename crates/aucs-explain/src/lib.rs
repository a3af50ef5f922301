//! Explainability (component C10): per-cell, per-subscore top-K
//! contributor tables, best-mode-by-amenity, and corridor baskets,
//! emitted both as a JSON payload and as the flat [`ExplainabilityRow`]
//! tabular form (§4.10).

use aucs_contracts::tables::ExplainabilityRow;
use aucs_subscores::Contributor;
use aucs_types::{CellId, Mode, SubscoreKind};
use serde::Serialize;
use std::collections::HashMap;

/// Flatten one subscore's ranked [`Contributor`] list into
/// [`ExplainabilityRow`]s, ranks 1-based in contribution-descending order
/// (the caller is expected to have already sorted/truncated to top-K, as
/// every `aucs-subscores` module does).
pub fn to_rows(cell_id: CellId, subscore: SubscoreKind, contributors: &[Contributor]) -> Vec<ExplainabilityRow> {
    contributors
        .iter()
        .enumerate()
        .map(|(i, c)| ExplainabilityRow {
            cell_id: cell_id.0,
            subscore: subscore.to_string(),
            rank: (i + 1) as u32,
            amenity_id: c.amenity_id.map(|a| a.0),
            category: c.category.clone(),
            mode: c.mode.map(|m| m.to_string()),
            time_slice: c.time_slice.clone().map(|t| t.0),
            contribution: c.contribution,
        })
        .collect()
}

/// Argmax over per-mode nest "probability" shares (§4.10: "best-mode-by-
/// amenity (the nest-probability argmax)"). `mode_shares` is the
/// normalized `exp(U_m) / Σ exp(U_m')` distribution the logsum stage
/// computes per amenity; ties resolve to [`Mode::ALL`]'s iteration order.
pub fn best_mode_by_amenity(mode_shares: &HashMap<Mode, f64>) -> Option<Mode> {
    Mode::ALL
        .iter()
        .filter_map(|&m| mode_shares.get(&m).map(|&share| (m, share)))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(m, _)| m)
}

/// Corridor-specific extras (§4.10: "Corridor baskets for CTE include the
/// itinerary fingerprint and the selected pair").
#[derive(Debug, Clone, Serialize)]
pub struct CorridorBasket {
    pub itinerary_fingerprint: String,
    pub first_category: String,
    pub second_category: String,
    pub score: f64,
}

/// One cell's full explainability payload for one subscore: contributor
/// table, optional best-mode-by-amenity map, and any subscore-specific
/// extras (only populated for CTE today).
#[derive(Debug, Clone, Serialize)]
pub struct ExplainPayload {
    pub cell_id: u64,
    pub subscore: String,
    pub contributors: Vec<ContributorJson>,
    pub best_mode_by_amenity: HashMap<u64, String>,
    pub corridor_baskets: Vec<CorridorBasket>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContributorJson {
    pub rank: u32,
    pub amenity_id: Option<u64>,
    pub category: Option<String>,
    pub mode: Option<String>,
    pub time_slice: Option<String>,
    pub contribution: f64,
}

/// Build the JSON payload for one (cell, subscore), from the same
/// contributor list [`to_rows`] flattens to tabular form.
pub fn build_payload(
    cell_id: CellId,
    subscore: SubscoreKind,
    contributors: &[Contributor],
    best_mode_by_amenity: HashMap<u64, Mode>,
    corridor_baskets: Vec<CorridorBasket>,
) -> ExplainPayload {
    let contributors_json = contributors
        .iter()
        .enumerate()
        .map(|(i, c)| ContributorJson {
            rank: (i + 1) as u32,
            amenity_id: c.amenity_id.map(|a| a.0),
            category: c.category.clone(),
            mode: c.mode.map(|m| m.to_string()),
            time_slice: c.time_slice.clone().map(|t| t.0),
            contribution: c.contribution,
        })
        .collect();

    ExplainPayload {
        cell_id: cell_id.0,
        subscore: subscore.to_string(),
        contributors: contributors_json,
        best_mode_by_amenity: best_mode_by_amenity.into_iter().map(|(id, m)| (id, m.to_string())).collect(),
        corridor_baskets,
    }
}

/// Serialize a payload to its canonical JSON blob form for the
/// explainability artifact (§4.10: "emitted as a JSON blob plus a
/// normalized tabular form for query").
pub fn payload_to_json(payload: &ExplainPayload) -> Result<String, serde_json::Error> {
    serde_json::to_string(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aucs_types::{AmenityId, TimeSliceId};

    fn contributor(id: u64, contribution: f64) -> Contributor {
        Contributor {
            amenity_id: Some(AmenityId(id)),
            category: Some("grocery".into()),
            mode: Some(Mode::Walk),
            time_slice: Some(TimeSliceId("am_peak".into())),
            contribution,
        }
    }

    #[test]
    fn rows_are_ranked_in_input_order_starting_at_one() {
        let contributors = vec![contributor(1, 5.0), contributor(2, 3.0)];
        let rows = to_rows(CellId(10), SubscoreKind::Ea, &contributors);
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[1].rank, 2);
        assert_eq!(rows[0].cell_id, 10);
        assert_eq!(rows[0].subscore, "ea");
    }

    #[test]
    fn best_mode_picks_highest_share() {
        let mut shares = HashMap::new();
        shares.insert(Mode::Walk, 0.2);
        shares.insert(Mode::Car, 0.5);
        shares.insert(Mode::Transit, 0.3);
        assert_eq!(best_mode_by_amenity(&shares), Some(Mode::Car));
    }

    #[test]
    fn best_mode_is_none_when_no_shares_present() {
        assert_eq!(best_mode_by_amenity(&HashMap::new()), None);
    }

    #[test]
    fn payload_serializes_to_valid_json() {
        let contributors = vec![contributor(1, 5.0)];
        let payload = build_payload(CellId(1), SubscoreKind::Cte, &contributors, HashMap::new(), vec![CorridorBasket {
            itinerary_fingerprint: "abc123".into(),
            first_category: "grocery".into(),
            second_category: "pharmacy".into(),
            score: 42.0,
        }]);
        let json = payload_to_json(&payload).unwrap();
        assert!(json.contains("\"cell_id\":1"));
        assert!(json.contains("abc123"));
    }
}
