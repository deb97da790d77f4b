use std::collections::BTreeSet;

use glam::{DMat2, DVec2};
use tracing::debug;

use super::{BdmMesh, EdgeId, SwapTest};
use crate::metric::solve_2x2;

/// Result of one edge recovery attempt.
pub struct RecoverOutcome {
    /// The recovered edge, or `None` when recovery failed.
    pub edge: Option<EdgeId>,
    /// True when no further swap can make progress; the surface cannot be
    /// meshed with this boundary discretization.
    pub fatal: bool,
    /// Required edges found crossing this one, as `(p1, p2)` id pairs.
    /// Non-empty means the 1D mesh self-intersects.
    pub crossings: Vec<(i32, i32)>,
}

/// True iff the open segments `(p1, p2)` and `(q1, q2)` intersect,
/// endpoints included.
pub(crate) fn segments_intersect(p1: DVec2, p2: DVec2, q1: DVec2, q2: DVec2) -> bool {
    let m = DMat2::from_cols(
        DVec2::new(p2.x - p1.x, p2.y - p1.y),
        DVec2::new(-(q2.x - q1.x), -(q2.y - q1.y)),
    );
    let Some(x) = solve_2x2(m, q1 - p1) else {
        return false;
    };
    (0.0..=1.0).contains(&x.x) && (0.0..=1.0).contains(&x.y)
}

impl BdmMesh {
    /// Make the edge `(num1, num2)` appear in the triangulation by
    /// swapping every edge whose parametric segment crosses it, within a
    /// budget of 300 sweeps.
    ///
    /// `required` is the full set of boundary edges being recovered,
    /// keyed by ordered id pair; if a crossing edge is itself required
    /// the 1D mesh self-intersects and the recovery gives up with the
    /// crossing pairs reported in the outcome.
    pub fn recover_edge(
        &mut self,
        num1: i32,
        num2: i32,
        required: &BTreeSet<(i32, i32)>,
    ) -> RecoverOutcome {
        if let Some(e) = self.find_edge(num1, num2) {
            return RecoverOutcome {
                edge: Some(e),
                fatal: false,
                crossings: Vec::new(),
            };
        }

        debug!("edge {num1} {num2} has to be recovered");

        let (uv1, uv2) = (self.points[&num1].uv, self.points[&num2].uv);
        let this_pair = ordered_pair(num1, num2);

        for _ in 0..=300 {
            let mut intersected: Vec<EdgeId> = Vec::new();
            let mut crossings: Vec<(i32, i32)> = Vec::new();

            for (id, e) in &self.edges {
                if e.deleted
                    || e.has_endpoint(num1)
                    || e.has_endpoint(num2)
                {
                    continue;
                }
                let q1 = self.points[&e.p1].uv;
                let q2 = self.points[&e.p2].uv;
                if !segments_intersect(q1, q2, uv1, uv2) {
                    continue;
                }
                if required.contains(&ordered_pair(e.p1, e.p2)) {
                    debug!(
                        "edge {num1} {num2} cannot be recovered: it crosses required edge {} {}",
                        e.p1, e.p2
                    );
                    crossings.push(this_pair);
                    crossings.push(ordered_pair(e.p1, e.p2));
                }
                intersected.push(id);
            }

            if !crossings.is_empty() {
                return RecoverOutcome {
                    edge: None,
                    fatal: false,
                    crossings,
                };
            }

            if intersected.is_empty() {
                let edge = self.find_edge(num1, num2);
                let fatal = edge.is_none();
                if fatal {
                    debug!("edge {num1} {num2} cannot be recovered at all");
                }
                return RecoverOutcome {
                    edge,
                    fatal,
                    crossings: Vec::new(),
                };
            }

            let mut success = false;
            for e in intersected {
                if self.swap_edge(e, &SwapTest::Recover, false) {
                    success = true;
                    break;
                }
            }
            if !success {
                debug!("edge {num1} {num2} cannot be recovered at all");
                return RecoverOutcome {
                    edge: None,
                    fatal: true,
                    crossings: Vec::new(),
                };
            }
        }

        // budget exhausted
        let edge = self.find_edge(num1, num2);
        let fatal = edge.is_none();
        RecoverOutcome {
            edge,
            fatal,
            crossings: Vec::new(),
        }
    }
}

#[inline]
pub(crate) fn ordered_pair(a: i32, b: i32) -> (i32, i32) {
    if a < b { (a, b) } else { (b, a) }
}
