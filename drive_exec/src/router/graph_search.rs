//! A* search over the road graph.
//!
//! Nodes are (road, lane) pairs. A road's neighbours are the roads linked to either of its ends,
//! fanning out through junctions to every connecting road. Entering a road at its `END` contact
//! point means travelling against its reference line, which flips the side of the lane.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashSet},
};

use log::{debug, trace};
use ordered_float::OrderedFloat;

use crate::road::{ContactPoint, ElementType, LaneId, RoadId, RoadQueryService};

use super::RouterError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One road of a route found by the search.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RoadLeg {
    pub road_id: RoadId,
    pub lane_id: LaneId,

    /// End of this road at which it is entered, `None` for the first road.
    pub entry: Option<ContactPoint>,

    /// End of the previous road through which this road was reached, `None` for the first road.
    pub via: Option<ContactPoint>,
}

/// Start of the search.
#[derive(Debug, Copy, Clone)]
pub struct SearchStart {
    pub road_id: RoadId,
    pub lane_id: LaneId,

    /// Straight line distance between the endpoints, the start node's heuristic
    pub direct_dist_m: f64,
}

/// An A* node, stored in the arena and referenced by id.
#[derive(Debug, Clone)]
struct Node {
    parent_id: Option<usize>,
    leg: RoadLeg,
    cost: f64,
}

/// A road reachable from another one.
#[derive(Debug, Copy, Clone)]
struct Neighbour {
    road_id: RoadId,
    entry: ContactPoint,
    via: ContactPoint,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Find a sequence of roads leading from the start road to the target road.
///
/// The first node popped on the target road wins and keeps its own lane. The search gives up
/// after `max_expansions` pops.
pub fn find_road_path(
    road: &dyn RoadQueryService,
    start: SearchStart,
    target_road_id: RoadId,
    max_expansions: usize,
) -> Result<Vec<RoadLeg>, RouterError> {
    let mut arena = vec![Node {
        parent_id: None,
        leg: RoadLeg {
            road_id: start.road_id,
            lane_id: start.lane_id,
            entry: None,
            via: None,
        },
        cost: 0.0,
    }];

    let mut open = BinaryHeap::new();
    open.push(Reverse((OrderedFloat(start.direct_dist_m), 0usize)));

    let mut closed: HashSet<(RoadId, LaneId)> = HashSet::new();
    let mut expansions = 0;

    while expansions < max_expansions {
        let id = match open.pop() {
            Some(Reverse((_, id))) => id,
            None => break,
        };
        expansions += 1;

        let leg = arena[id].leg;
        if leg.road_id == target_road_id {
            let legs = reconstruct(&arena, id);
            debug!(
                "Road path found after {} expansions: {:?}",
                expansions,
                legs.iter().map(|l| (l.road_id, l.lane_id)).collect::<Vec<_>>()
            );
            return Ok(legs);
        }

        if !closed.insert((leg.road_id, leg.lane_id)) {
            continue;
        }

        for n in neighbours(road, leg.road_id) {
            let lane_id = match n.entry {
                ContactPoint::End => -leg.lane_id,
                ContactPoint::Start => leg.lane_id,
            };

            if closed.contains(&(n.road_id, lane_id)) {
                continue;
            }

            let length_m = match road.road_length(n.road_id) {
                Ok(l) => l,
                Err(e) => {
                    trace!("Skipping road {}: {}", n.road_id, e);
                    continue;
                }
            };

            let cost = arena[id].cost + length_m;

            // The heuristic is the length of the road being entered
            let total = cost + length_m;

            arena.push(Node {
                parent_id: Some(id),
                leg: RoadLeg {
                    road_id: n.road_id,
                    lane_id,
                    entry: Some(n.entry),
                    via: Some(n.via),
                },
                cost,
            });
            open.push(Reverse((OrderedFloat(total), arena.len() - 1)));
        }
    }

    debug!(
        "No road path from road {} to road {} after {} expansions",
        start.road_id, target_road_id, expansions
    );

    Err(RouterError::NoRoadPath {
        from: start.road_id,
        to: target_road_id,
        expansions,
    })
}

/// All roads linked to either end of the given road.
///
/// A failed link query leaves that link out, the search carries on with the others.
fn neighbours(road: &dyn RoadQueryService, road_id: RoadId) -> Vec<Neighbour> {
    let mut neighbours = Vec::new();

    let links = [
        (road.successor(road_id), ContactPoint::End),
        (road.predecessor(road_id), ContactPoint::Start),
    ];

    for (link, via) in links.iter() {
        let link = match link {
            Ok(Some(l)) => l,
            Ok(None) => continue,
            Err(e) => {
                trace!("Skipping {:?} link of road {}: {}", via, road_id, e);
                continue;
            }
        };

        match link.element_type {
            ElementType::Road => neighbours.push(Neighbour {
                road_id: link.element_id,
                entry: link.contact_point,
                via: *via,
            }),
            ElementType::Junction => {
                let connections = match road.junction_connections(link.element_id, road_id) {
                    Ok(c) => c,
                    Err(e) => {
                        trace!(
                            "Skipping junction {} from road {}: {}",
                            link.element_id,
                            road_id,
                            e
                        );
                        continue;
                    }
                };

                neighbours.extend(connections.into_iter().map(|c| Neighbour {
                    road_id: c.connecting_road_id,
                    entry: c.contact_point,
                    via: *via,
                }));
            }
        }
    }

    neighbours
}

/// Walk the parent ids back from the given node to the start.
fn reconstruct(arena: &[Node], end_id: usize) -> Vec<RoadLeg> {
    let mut legs = Vec::new();
    let mut id = Some(end_id);

    while let Some(i) = id {
        legs.push(arena[i].leg);
        id = arena[i].parent_id;
    }

    legs.reverse();
    legs
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
