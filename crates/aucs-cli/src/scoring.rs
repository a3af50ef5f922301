//! End-to-end orchestration: loads the concrete input tables (§6), wires
//! them through the kernel crates in stage order, and writes the output
//! tables. `aucs-pipeline` owns sequencing, resumability, the run lock,
//! and concurrent fan-out; this module is the caller it was written for.
//!
//! A handful of joins the distilled table schemas don't spell out are
//! resolved here by convention rather than left ambiguous, each noted
//! inline and in `DESIGN.md`:
//! - a destination's `destination_id` in the skim table is the entity's
//!   own id (amenity id for places, hub/airport id, or the destination
//!   cell id for jobs and university rows);
//! - `GTC*_{i,h}` for MUHAA uses each time-slice's weighted-average GTC
//!   per mode rather than a single peak slice;
//! - stops/routes/micromobility stations carry only a `cell_id`, so the
//!   MORR radius parameters degrade to an exact cell match;
//! - corridor chain detours (CTE) are estimated from straight-line
//!   distance between the two amenities at an assumed walking pace, since
//!   the skim store has no amenity-to-amenity entries;
//! - no metro-crosswalk table is defined, so every cell normalizes in one
//!   ungrouped band (`metro: None`).

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;

use aucs_aggregate::{aggregate_category, AmenityContribution};
use aucs_contracts::manifest::{QaReport, RunManifest};
use aucs_contracts::tables::{
    AirportRow, AucsRow, ClimateNormalRow, HoursRegime, HubRow, JobsByCellRow, MicromobilityStationRow, ParkTrailRow, PlaceRow, ReliabilityRow,
    RouteStopRow, SkimRow, StopRow, SubscoresRawRow, UniversityRow,
};
use aucs_contracts::{read_table, write_table};
use aucs_params::ParamSnapshot;
use aucs_pipeline::driver::{run_parallel, Task};
use aucs_pipeline::{run_stage, PipelineError};
use aucs_quality::{compute_quality, AmenityFeatures};
use aucs_skim::{SkimFingerprint, SkimStore};
use aucs_subscores::cte::{cte_subscore, ChainCandidate};
use aucs_subscores::ea::ea_subscore;
use aucs_subscores::jea::{education_access, jea_subscore, jobs_access, EducationDestination, JobsDestination};
use aucs_subscores::lca::{lca_subscore, LcaCategoryInput};
use aucs_subscores::morr::{frequent_stop_exposure, micromobility_score, morr_subscore, redundancy_score, reliability_score, span_score, MorrComponents};
use aucs_subscores::muhaa::{airport_access_raw, hub_access_raw, hub_masses, muhaa_batch, HubRaw};
use aucs_subscores::sou::{sou_subscore, MonthClimate, ParkContribution};
use aucs_subscores::{min_max_rescale, IdentifiedContribution, SubscoreOutput};
use aucs_types::{AmenityId, CellId, DestinationId, Mode, SubscoreKind, TimeSliceId};

const TOP_K_CONTRIBUTORS: usize = 5;
const WALK_KM_PER_MIN: f64 = 0.075;

pub struct RunConfig<'a> {
    pub input_dir: &'a Path,
    pub output_dir: &'a Path,
    pub params_path: &'a Path,
    pub max_workers: usize,
    pub stage_timeout: Duration,
}

struct Inputs {
    places: Vec<PlaceRow>,
    skims: Vec<SkimRow>,
    stops: Vec<StopRow>,
    route_stops: Vec<RouteStopRow>,
    reliability: Vec<ReliabilityRow>,
    hubs: Vec<HubRow>,
    airports: Vec<AirportRow>,
    jobs_by_cell: Vec<JobsByCellRow>,
    universities: Vec<UniversityRow>,
    parks_trails: Vec<ParkTrailRow>,
    climate_normals: Vec<ClimateNormalRow>,
    micromobility_stations: Vec<MicromobilityStationRow>,
}

fn load_inputs(input_dir: &Path) -> Result<Inputs, PipelineError> {
    Ok(Inputs {
        places: read_table(&input_dir.join("places.csv"))?,
        skims: read_table(&input_dir.join("skims.csv"))?,
        stops: read_table(&input_dir.join("stops.csv"))?,
        route_stops: read_table(&input_dir.join("route_stops.csv"))?,
        reliability: read_table(&input_dir.join("reliability.csv"))?,
        hubs: read_table(&input_dir.join("hubs.csv"))?,
        airports: read_table(&input_dir.join("airports.csv"))?,
        jobs_by_cell: read_table(&input_dir.join("jobs_by_cell.csv"))?,
        universities: read_table(&input_dir.join("universities.csv"))?,
        parks_trails: read_table(&input_dir.join("parks_trails.csv"))?,
        climate_normals: read_table(&input_dir.join("climate_normals.csv"))?,
        micromobility_stations: read_table(&input_dir.join("micromobility_stations.csv"))?,
    })
}

fn parse_mode(s: &str) -> Option<Mode> {
    match s {
        "walk" => Some(Mode::Walk),
        "bike" => Some(Mode::Bike),
        "car" => Some(Mode::Car),
        "transit" => Some(Mode::Transit),
        _ => None,
    }
}

fn build_skim_store(skims: &[SkimRow]) -> Result<SkimStore, PipelineError> {
    let mut grouped: BTreeMap<(String, String), Vec<SkimRow>> = BTreeMap::new();
    for row in skims {
        grouped.entry((row.mode.clone(), row.time_slice.clone())).or_default().push(row.clone());
    }

    let mut store = SkimStore::new();
    for ((mode, slice), rows) in grouped {
        let mode_enum = parse_mode(&mode).ok_or_else(|| PipelineError::ContractViolation {
            stage: "skim_materialize".to_string(),
            detail: format!("unknown mode '{mode}' in skim partition"),
        })?;
        let tag = rows.first().map(|r| r.fingerprint.clone()).unwrap_or_default();
        let fingerprint = SkimFingerprint {
            engine_version: tag.clone(),
            graph_build_id: tag.clone(),
            od_set_id: tag,
            mode: mode_enum,
            time_slice: TimeSliceId(slice),
        };
        store.load_partition(&rows, fingerprint).map_err(|e| PipelineError::ContractViolation {
            stage: "skim_materialize".to_string(),
            detail: e.to_string(),
        })?;
    }
    Ok(store)
}

/// `w_{i,a}` and the single cheapest (mode, time-slice) pair for a cell's
/// contributor table, in one pass over every configured time-slice.
fn accessibility_weight_and_best_mode(
    origin: CellId,
    destination: DestinationId,
    store: &SkimStore,
    params: &ParamSnapshot,
    carry_multiplier: f64,
) -> (f64, Mode, TimeSliceId) {
    let mut slices = Vec::with_capacity(params.time_slices.len());
    let mut best: Option<(Mode, TimeSliceId, f64)> = None;

    for ts in &params.time_slices {
        let slice_id = TimeSliceId(ts.id.clone());
        let mut gtc_by_mode = HashMap::new();
        for mode in Mode::ALL {
            let entry = store.get(origin, destination, mode, &slice_id);
            let mode_params = params.modes.get(mode);
            let g = aucs_gtc::gtc(&entry, mode_params, &params.gtc, carry_multiplier, ts.value_of_time_per_min);
            if best.as_ref().map(|(_, _, bg)| g < *bg).unwrap_or(true) {
                best = Some((mode, slice_id.clone(), g));
            }
            gtc_by_mode.insert(mode, g);
        }
        slices.push(aucs_logsum::SliceGtc { weight: ts.weight, gtc_by_mode });
    }

    let w = aucs_logsum::accessibility_weight(&slices, &params.nests);
    let (mode, slice, _) = best.unwrap_or_else(|| {
        let fallback = params.time_slices.first().map(|t| t.id.clone()).unwrap_or_default();
        (Mode::Walk, TimeSliceId(fallback), f64::INFINITY)
    });
    (w, mode, slice)
}

/// Time-slice-weighted average GTC for one mode, used for MUHAA's
/// `GTC* = min(car, transit)` (§4.8).
fn weighted_mode_gtc(origin: CellId, destination: DestinationId, mode: Mode, store: &SkimStore, params: &ParamSnapshot) -> f64 {
    let mut acc = 0.0;
    let mut total_w = 0.0;
    for ts in &params.time_slices {
        let slice_id = TimeSliceId(ts.id.clone());
        let entry = store.get(origin, destination, mode, &slice_id);
        let mode_params = params.modes.get(mode);
        let g = aucs_gtc::gtc(&entry, mode_params, &params.gtc, 1.0, ts.value_of_time_per_min);
        if g.is_finite() {
            acc += ts.weight * g;
            total_w += ts.weight;
        }
    }
    if total_w > 0.0 {
        acc / total_w
    } else {
        f64::INFINITY
    }
}

fn gtc_star(origin: CellId, destination: DestinationId, store: &SkimStore, params: &ParamSnapshot) -> (f64, f64) {
    (
        weighted_mode_gtc(origin, destination, Mode::Car, store, params),
        weighted_mode_gtc(origin, destination, Mode::Transit, store, params),
    )
}

fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0088;
    let (lat1, lon1, lat2, lon2) = (lat1.to_radians(), lon1.to_radians(), lat2.to_radians(), lon2.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

fn hours_regime_of(row: &PlaceRow) -> HoursRegime {
    row.hours_regime
}

/// Per-category quality, computed once across the whole study area since
/// brand-proximity dedup is a global geometric property, not a per-cell
/// one (§4.6).
fn compute_all_quality(places: &[PlaceRow], params: &aucs_params::QualityParams) -> HashMap<u64, f64> {
    let mut by_category: BTreeMap<&str, Vec<&PlaceRow>> = BTreeMap::new();
    for p in places {
        by_category.entry(p.category.as_str()).or_default().push(p);
    }

    let mut quality_by_amenity = HashMap::with_capacity(places.len());
    for (_, rows) in by_category {
        let features: Vec<AmenityFeatures> = rows
            .iter()
            .map(|p| AmenityFeatures {
                id: AmenityId(p.amenity_id),
                brand_key: p.brand_key.clone(),
                size_metric: p.size_metric,
                popularity_metric: p.popularity_metric,
                brand_recognized: p.brand_recognized.unwrap_or(false),
                heritage_flag: p.heritage_flag.unwrap_or(false),
                hours_regime: hours_regime_of(p),
                lat: p.lat,
                lon: p.lon,
            })
            .collect();
        for result in compute_quality(&features, params) {
            quality_by_amenity.insert(result.amenity_id.0, result.q_final);
        }
    }
    quality_by_amenity
}

struct CellCategoryData {
    contributions: BTreeMap<String, Vec<IdentifiedContribution>>,
    results: BTreeMap<String, aucs_aggregate::CategoryResult>,
}

fn category_data_for_cell(
    cell: CellId,
    places: &[PlaceRow],
    quality_by_amenity: &HashMap<u64, f64>,
    store: &SkimStore,
    params: &ParamSnapshot,
) -> CellCategoryData {
    let mut by_category: BTreeMap<String, Vec<&PlaceRow>> = BTreeMap::new();
    for p in places {
        by_category.entry(p.category.clone()).or_default().push(p);
    }

    let mut contributions = BTreeMap::new();
    let mut results = BTreeMap::new();
    for (category, cat_params) in &params.categories {
        let places_in_cat = by_category.get(category).map(|v| v.as_slice()).unwrap_or(&[]);
        let mut identified = Vec::with_capacity(places_in_cat.len());
        for p in places_in_cat {
            let destination = DestinationId(p.amenity_id);
            let (w, mode, slice) = accessibility_weight_and_best_mode(cell, destination, store, params, cat_params.carry_multiplier);
            let quality = quality_by_amenity.get(&p.amenity_id).copied().unwrap_or(0.0);
            identified.push(IdentifiedContribution {
                amenity_id: AmenityId(p.amenity_id),
                category: category.clone(),
                mode,
                time_slice: slice,
                quality,
                weight: w,
            });
        }

        let agg_items: Vec<AmenityContribution> = identified
            .iter()
            .zip(places_in_cat)
            .map(|(c, p)| AmenityContribution {
                subtype: p.subtype.clone(),
                quality: c.quality,
                weight: c.weight,
            })
            .collect();
        results.insert(category.clone(), aggregate_category(&agg_items, cat_params));
        contributions.insert(category.clone(), identified);
    }

    CellCategoryData { contributions, results }
}

pub fn run(cfg: &RunConfig) -> Result<(), PipelineError> {
    let snapshot = ParamSnapshot::load(cfg.params_path)?;
    let param_hash = snapshot.param_hash()?;
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let _lock = aucs_pipeline::RunLock::acquire(cfg.output_dir)?;
    let manifest = RunManifest::new(cfg.output_dir.join("manifest.ndjson"));
    let thresholds = snapshot.qa.clone();

    run_stage(&manifest, "parameter_load", &param_hash, &[], &thresholds, now, || Ok((param_hash.clone(), 1, QaReport::default())))?;

    let inputs = load_inputs(cfg.input_dir)?;
    tracing::info!(places = inputs.places.len(), skims = inputs.skims.len(), "inputs loaded");

    let skim_store = build_skim_store(&inputs.skims)?;
    run_stage(&manifest, "skim_materialize", &param_hash, &[], &thresholds, now, || {
        let unreachable = inputs.skims.iter().filter(|r| !r.reachable).count() as u64;
        let qa = QaReport {
            total_rows: inputs.skims.len() as u64,
            unreachable_rows: unreachable,
            sentinel_rows: 0,
            category_shares: vec![],
        };
        Ok((format!("skim_store:{}", skim_store.len()), inputs.skims.len() as u64, qa))
    })?;

    // GTC and logsum are stateless per-call kernels (§5 "kernels ... are
    // pure"): this driver invokes them on demand from `category_data_for_cell`
    // and the MUHAA/JEA closures below rather than materializing a bulk
    // artifact, since §6 defines no standalone GTC/logsum table.
    run_stage(&manifest, "gtc", &param_hash, &[], &thresholds, now, || Ok(("gtc:inline".to_string(), 0, QaReport::default())))?;
    run_stage(&manifest, "logsum", &param_hash, &[], &thresholds, now, || Ok(("logsum:inline".to_string(), 0, QaReport::default())))?;

    let quality_by_amenity = compute_all_quality(&inputs.places, &snapshot.quality);
    run_stage(&manifest, "quality", &param_hash, &[], &thresholds, now, || {
        Ok((format!("quality:{}", quality_by_amenity.len()), inputs.places.len() as u64, QaReport::default()))
    })?;

    let mut cells: Vec<CellId> = inputs.skims.iter().map(|r| CellId(r.origin_cell)).collect();
    cells.sort_unstable();
    cells.dedup();
    if cells.is_empty() {
        tracing::warn!("no cells present in skim table; nothing to score");
    }

    let mut category_data: Vec<CellCategoryData> = Vec::with_capacity(cells.len());
    for &cell in &cells {
        category_data.push(category_data_for_cell(cell, &inputs.places, &quality_by_amenity, &skim_store, &snapshot));
    }
    run_stage(&manifest, "category_value", &param_hash, &[], &thresholds, now, || {
        let total = cells.len() as u64 * snapshot.categories.len().max(1) as u64;
        Ok((format!("category_value:{total}"), total, QaReport::default()))
    })?;

    // Hub/airport masses and gravity access, one raw value per cell.
    let hub_raws: Vec<HubRaw> = inputs
        .hubs
        .iter()
        .map(|h| HubRaw { hub_id: h.hub_id, pop: h.pop, gdp: h.gdp, poi_count: h.poi_count, culture_index: h.culture_index })
        .collect();
    let hub_masses_vec = hub_masses(&hub_raws, &snapshot.hubs_airports);
    let enplanements: Vec<f64> = inputs.airports.iter().map(|a| a.enplanements).collect();

    let mut hub_access_raw_values = Vec::with_capacity(cells.len());
    let mut airport_access_raw_values = Vec::with_capacity(cells.len());
    for &cell in &cells {
        let cell_gtc_to_hubs: Vec<(f64, f64)> = inputs.hubs.iter().map(|h| gtc_star(cell, DestinationId(h.hub_id), &skim_store, &snapshot)).collect();
        hub_access_raw_values.push(hub_access_raw(&cell_gtc_to_hubs, &hub_masses_vec, snapshot.hubs_airports.alpha_hub));

        let cell_gtc_to_airports: Vec<(f64, f64)> =
            inputs.airports.iter().map(|a| gtc_star(cell, DestinationId(a.airport_id), &skim_store, &snapshot)).collect();
        airport_access_raw_values.push(airport_access_raw(&cell_gtc_to_airports, &enplanements, snapshot.hubs_airports.alpha_hub));
    }
    let muhaa_results = muhaa_batch(&cells, &hub_access_raw_values, &airport_access_raw_values, &snapshot.hubs_airports);

    // Jobs and education gravity sums, each normalized across the study
    // area before the JEA blend.
    let mut jobs_raw = Vec::with_capacity(cells.len());
    let mut education_raw = Vec::with_capacity(cells.len());
    for &cell in &cells {
        let jobs_destinations: Vec<JobsDestination> = inputs
            .jobs_by_cell
            .iter()
            .map(|j| {
                let (w, _, _) = accessibility_weight_and_best_mode(cell, DestinationId(j.cell_id), &skim_store, &snapshot, 1.0);
                JobsDestination { cell_id: CellId(j.cell_id), jobs: j.jobs, industry_weight: j.industry_weight, weight: w }
            })
            .collect();
        jobs_raw.push(jobs_access(&jobs_destinations));

        let edu_destinations: Vec<EducationDestination> = inputs
            .universities
            .iter()
            .map(|u| {
                let (w, _, _) = accessibility_weight_and_best_mode(cell, DestinationId(u.cell_id), &skim_store, &snapshot, 1.0);
                EducationDestination { university_id: u.university_id, enrollment: u.enrollment, carnegie_tier_factor: u.carnegie_tier_factor, weight: w }
            })
            .collect();
        education_raw.push(education_access(&edu_destinations));
    }
    let jobs_normalized = min_max_rescale(&jobs_raw);
    let education_normalized = min_max_rescale(&education_raw);

    // MORR per-cell components. Stops/routes/stations carry only a
    // `cell_id` in this schema, so "within radius" degrades to an exact
    // cell match.
    let mut micromobility_raw = Vec::with_capacity(cells.len());
    for &cell in &cells {
        let docks: u32 = inputs.micromobility_stations.iter().filter(|s| s.cell_id == cell.0).map(|s| s.dock_count).sum();
        micromobility_raw.push(docks as f64);
    }
    let micromobility_normalized = min_max_rescale(&micromobility_raw);

    let ea_params = snapshot.ea.clone();
    let lca_params = snapshot.lca.clone();
    let jea_params = snapshot.jea.clone();
    let morr_params = snapshot.morr.clone();
    let corridor_params = snapshot.corridor.clone();
    let seasonality_params = snapshot.seasonality.clone();
    let category_params = snapshot.categories.clone();

    let ea_task = || -> Vec<SubscoreOutput> {
        category_data
            .iter()
            .map(|cd| ea_subscore(&cd.results, &category_params, &cd.contributions, &ea_params, TOP_K_CONTRIBUTORS))
            .collect()
    };

    let lca_task = || -> Vec<SubscoreOutput> {
        category_data
            .iter()
            .map(|cd| {
                let mut inputs_map = BTreeMap::new();
                for (cat, result) in &cd.results {
                    inputs_map.insert(cat.clone(), LcaCategoryInput { result: result.clone(), pageview_volatility_z: 0.0 });
                }
                lca_subscore(&inputs_map, &category_params, &cd.contributions, &lca_params, TOP_K_CONTRIBUTORS)
            })
            .collect()
    };

    let muhaa_task = || -> Vec<SubscoreOutput> {
        muhaa_results
            .iter()
            .map(|r| SubscoreOutput {
                value: r.value,
                contributors: vec![
                    aucs_subscores::Contributor {
                        amenity_id: None,
                        category: Some("hub_access".into()),
                        mode: None,
                        time_slice: None,
                        contribution: r.hub_access_normalized,
                    },
                    aucs_subscores::Contributor {
                        amenity_id: None,
                        category: Some("airport_access".into()),
                        mode: None,
                        time_slice: None,
                        contribution: r.airport_access_normalized,
                    },
                ],
            })
            .collect()
    };

    let jea_task = || -> Vec<SubscoreOutput> {
        (0..cells.len()).map(|i| jea_subscore(jobs_normalized[i], education_normalized[i], &jea_params)).collect()
    };

    let morr_task = || -> Vec<SubscoreOutput> {
        cells
            .iter()
            .enumerate()
            .map(|(i, &cell)| {
                let stop_headways: Vec<f64> = inputs.stops.iter().filter(|s| s.cell_id == cell.0).map(|s| s.peak_headway_min).collect();
                let stop_hours: Vec<f64> = inputs.stops.iter().filter(|s| s.cell_id == cell.0).map(|s| s.service_span_hours).collect();
                let stop_ids: Vec<u64> = inputs.stops.iter().filter(|s| s.cell_id == cell.0).map(|s| s.stop_id).collect();
                let route_ids: Vec<u64> = inputs.route_stops.iter().filter(|rs| stop_ids.contains(&rs.stop_id)).map(|rs| rs.route_id).collect();
                let route_on_time: Vec<(f64, f64)> = inputs
                    .reliability
                    .iter()
                    .filter(|r| route_ids.contains(&r.route_id))
                    .map(|r| (r.on_time_share, r.sample_count as f64))
                    .collect();
                let mut distinct_routes: Vec<u64> = route_ids.clone();
                distinct_routes.sort_unstable();
                distinct_routes.dedup();

                let components = MorrComponents {
                    frequent_stop: frequent_stop_exposure(&stop_headways, morr_params.frequent_headway_min),
                    span: span_score(&stop_hours),
                    reliability: reliability_score(&route_on_time, morr_params.schedule_proxy_on_time_share),
                    redundancy: redundancy_score(distinct_routes.len() as u32, stop_ids.len() as u32),
                    micromobility: micromobility_score(micromobility_normalized[i]),
                };
                morr_subscore(&components, &morr_params)
            })
            .collect()
    };

    let cte_task = || -> Vec<SubscoreOutput> {
        category_data
            .iter()
            .map(|cd| {
                let mut candidates = Vec::new();
                for (first_cat, second_cat) in &corridor_params.pair_whitelist {
                    let best = |cat: &str| -> Option<&IdentifiedContribution> {
                        cd.contributions.get(cat)?.iter().max_by(|a, b| {
                            (a.quality * a.weight).partial_cmp(&(b.quality * b.weight)).unwrap_or(std::cmp::Ordering::Equal)
                        })
                    };
                    if let (Some(a), Some(b)) = (best(first_cat), best(second_cat)) {
                        let place_a = inputs.places.iter().find(|p| p.amenity_id == a.amenity_id.0);
                        let place_b = inputs.places.iter().find(|p| p.amenity_id == b.amenity_id.0);
                        let delta_min = match (place_a, place_b) {
                            (Some(pa), Some(pb)) => haversine_km(pa.lat, pa.lon, pb.lat, pb.lon) / WALK_KM_PER_MIN,
                            _ => 0.0,
                        };
                        candidates.push(ChainCandidate {
                            first_category: first_cat.clone(),
                            second_category: second_cat.clone(),
                            first_contribution: a.quality * a.weight,
                            second_contribution: b.quality * b.weight,
                            delta_min,
                        });
                    }
                }
                cte_subscore(&candidates, &corridor_params)
            })
            .collect()
    };

    let sou_task = || -> Vec<SubscoreOutput> {
        cells
            .iter()
            .map(|&cell| {
                let parks: Vec<ParkContribution> = inputs
                    .parks_trails
                    .iter()
                    .filter(|p| p.cell_id == cell.0)
                    .map(|p| ParkContribution { park_id: p.park_id, area_acres: p.area_acres, designation_quality: p.designation_quality })
                    .collect();

                let neutral_temp = (seasonality_params.comfortable_temp_lo_f + seasonality_params.comfortable_temp_hi_f) / 2.0;
                let mut monthly = [MonthClimate { temp_f: neutral_temp, precip_in: 0.0, wind_mph: 0.0 }; 12];
                for row in inputs.climate_normals.iter().filter(|c| c.cell_id == cell.0) {
                    if (1..=12).contains(&row.month) {
                        monthly[(row.month - 1) as usize] = MonthClimate { temp_f: row.temp_f, precip_in: row.precip_in, wind_mph: row.wind_mph };
                    }
                }
                sou_subscore(&parks, &monthly, &seasonality_params)
            })
            .collect()
    };

    let tasks: Vec<Task<'_, (&'static str, Vec<SubscoreOutput>)>> = vec![
        Task { name: "subscore_ea", work: Box::new(move || ("subscore_ea", ea_task())) },
        Task { name: "subscore_lca", work: Box::new(move || ("subscore_lca", lca_task())) },
        Task { name: "subscore_muhaa", work: Box::new(move || ("subscore_muhaa", muhaa_task())) },
        Task { name: "subscore_jea", work: Box::new(move || ("subscore_jea", jea_task())) },
        Task { name: "subscore_morr", work: Box::new(move || ("subscore_morr", morr_task())) },
        Task { name: "subscore_cte", work: Box::new(move || ("subscore_cte", cte_task())) },
        Task { name: "subscore_sou", work: Box::new(move || ("subscore_sou", sou_task())) },
    ];
    let subscore_results = run_parallel(tasks, cfg.max_workers, cfg.stage_timeout)?;

    let mut by_kind: HashMap<&'static str, Vec<SubscoreOutput>> = subscore_results.into_iter().collect();
    let ea_outputs = by_kind.remove("subscore_ea").unwrap_or_default();
    let lca_outputs = by_kind.remove("subscore_lca").unwrap_or_default();
    let muhaa_outputs = by_kind.remove("subscore_muhaa").unwrap_or_default();
    let jea_outputs = by_kind.remove("subscore_jea").unwrap_or_default();
    let morr_outputs = by_kind.remove("subscore_morr").unwrap_or_default();
    let cte_outputs = by_kind.remove("subscore_cte").unwrap_or_default();
    let sou_outputs = by_kind.remove("subscore_sou").unwrap_or_default();

    for (stage, outputs) in [
        ("subscore_ea", &ea_outputs),
        ("subscore_lca", &lca_outputs),
        ("subscore_muhaa", &muhaa_outputs),
        ("subscore_jea", &jea_outputs),
        ("subscore_morr", &morr_outputs),
        ("subscore_cte", &cte_outputs),
        ("subscore_sou", &sou_outputs),
    ] {
        run_stage(&manifest, stage, &param_hash, &[], &thresholds, now, || Ok((format!("{stage}:{}", outputs.len()), outputs.len() as u64, QaReport::default())))?;
    }

    // Normalization and composition.
    let kinds_raw: [(SubscoreKind, &[SubscoreOutput]); 7] = [
        (SubscoreKind::Ea, &ea_outputs),
        (SubscoreKind::Lca, &lca_outputs),
        (SubscoreKind::Muhaa, &muhaa_outputs),
        (SubscoreKind::Jea, &jea_outputs),
        (SubscoreKind::Morr, &morr_outputs),
        (SubscoreKind::Cte, &cte_outputs),
        (SubscoreKind::Sou, &sou_outputs),
    ];
    let metros: Vec<Option<aucs_types::MetroId>> = vec![None; cells.len()];
    let mut normalized: HashMap<SubscoreKind, Vec<f64>> = HashMap::new();
    for (kind, outputs) in kinds_raw {
        let raw: Vec<f64> = outputs.iter().map(|o| o.value).collect();
        let mode = match kind {
            SubscoreKind::Ea => &snapshot.normalization.ea,
            SubscoreKind::Lca => &snapshot.normalization.lca,
            SubscoreKind::Muhaa => &snapshot.normalization.muhaa,
            SubscoreKind::Jea => &snapshot.normalization.jea,
            SubscoreKind::Morr => &snapshot.normalization.morr,
            SubscoreKind::Cte => &snapshot.normalization.cte,
            SubscoreKind::Sou => &snapshot.normalization.sou,
        };
        normalized.insert(kind, aucs_normalize::normalize_grouped_by_metro(&raw, &metros, mode));
    }
    run_stage(&manifest, "normalization", &param_hash, &[], &thresholds, now, || Ok(("normalization".to_string(), cells.len() as u64, QaReport::default())))?;

    let mut aucs_rows = Vec::with_capacity(cells.len());
    let mut raw_rows = Vec::with_capacity(cells.len());
    for (i, &cell) in cells.iter().enumerate() {
        let mut per_cell = HashMap::new();
        for kind in SubscoreKind::ALL {
            per_cell.insert(kind, normalized[&kind][i]);
        }
        let composition = aucs_normalize::compose_aucs(&per_cell, &snapshot.subscore_weights);

        raw_rows.push(SubscoresRawRow {
            cell_id: cell.0,
            ea: ea_outputs[i].value,
            lca: lca_outputs[i].value,
            muhaa: muhaa_outputs[i].value,
            jea: jea_outputs[i].value,
            morr: morr_outputs[i].value,
            cte: cte_outputs[i].value,
            sou: sou_outputs[i].value,
            metro: None,
            param_hash: param_hash.clone(),
        });

        aucs_rows.push(AucsRow {
            cell_id: cell.0,
            aucs: composition.aucs,
            ea: Some(ea_outputs[i].value),
            lca: Some(lca_outputs[i].value),
            muhaa: Some(muhaa_outputs[i].value),
            jea: Some(jea_outputs[i].value),
            morr: Some(morr_outputs[i].value),
            cte: Some(cte_outputs[i].value),
            sou: Some(sou_outputs[i].value),
            metro: None,
            param_hash: param_hash.clone(),
            unscored_reason: composition.unscored_reason.map(|r| r.to_string()),
        });
    }

    write_table(&cfg.output_dir.join("subscores_raw.csv"), &raw_rows)?;
    write_table(&cfg.output_dir.join("aucs.csv"), &aucs_rows)?;
    run_stage(&manifest, "composition", &param_hash, &[], &thresholds, now, || Ok(("composition".to_string(), cells.len() as u64, QaReport::default())))?;

    let mut explain_rows = Vec::new();
    for (i, &cell) in cells.iter().enumerate() {
        explain_rows.extend(aucs_explain::to_rows(cell, SubscoreKind::Ea, &ea_outputs[i].contributors));
        explain_rows.extend(aucs_explain::to_rows(cell, SubscoreKind::Lca, &lca_outputs[i].contributors));
        explain_rows.extend(aucs_explain::to_rows(cell, SubscoreKind::Muhaa, &muhaa_outputs[i].contributors));
        explain_rows.extend(aucs_explain::to_rows(cell, SubscoreKind::Jea, &jea_outputs[i].contributors));
        explain_rows.extend(aucs_explain::to_rows(cell, SubscoreKind::Morr, &morr_outputs[i].contributors));
        explain_rows.extend(aucs_explain::to_rows(cell, SubscoreKind::Cte, &cte_outputs[i].contributors));
        explain_rows.extend(aucs_explain::to_rows(cell, SubscoreKind::Sou, &sou_outputs[i].contributors));
    }
    write_table(&cfg.output_dir.join("explainability.csv"), &explain_rows)?;
    run_stage(&manifest, "explainability", &param_hash, &[], &thresholds, now, || {
        Ok(("explainability".to_string(), explain_rows.len() as u64, QaReport::default()))
    })?;

    let unscored = aucs_rows.iter().filter(|r| r.aucs.is_none()).count();
    tracing::info!(cells = cells.len(), unscored, "run complete");
    Ok(())
}
