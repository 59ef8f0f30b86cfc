//! Page sequence alignment: cost matrix construction and the affine-gap
//! dynamic program that turns it into an [`AlignmentPath`].

mod cost;
mod engine;
mod path;

pub use cost::CostMatrix;
pub use engine::{AlignmentEngine, AlignmentParams};
pub use path::{AlignmentEntry, AlignmentPath};

use crate::error::Result;
use crate::model::{PageGroup, PairingMode};
use crate::similarity::SimilarityModel;

/// Produce the correspondence between two page sequences under the given
/// pairing mode. `manual_pairs` is consulted only in manual mode.
pub fn pair_pages(
    mode: PairingMode,
    costs: &CostMatrix,
    params: &AlignmentParams,
    manual_pairs: &[(usize, usize)],
) -> Result<AlignmentPath> {
    match mode {
        PairingMode::Sequential => Ok(AlignmentPath::sequential(costs.rows(), costs.cols())),
        PairingMode::Auto => Ok(AlignmentPath::auto(costs, params.auto_accept_cost)),
        PairingMode::Manual => AlignmentPath::manual(costs.rows(), costs.cols(), manual_pairs),
        PairingMode::Aligned => AlignmentEngine::new(params.clone()).align(costs),
    }
}

/// Plan the correspondence for two page groups, building the cost matrix
/// only for the modes that consult it. Sequential and manual pairing are
/// pure index arithmetic and skip the similarity pass entirely.
pub fn plan_pairs(
    model: &SimilarityModel,
    engine: &AlignmentEngine,
    group_a: &PageGroup,
    group_b: &PageGroup,
    mode: PairingMode,
    manual_pairs: &[(usize, usize)],
) -> Result<AlignmentPath> {
    let (n, m) = (group_a.len(), group_b.len());
    match mode {
        PairingMode::Sequential => Ok(AlignmentPath::sequential(n, m)),
        PairingMode::Manual => AlignmentPath::manual(n, m, manual_pairs),
        PairingMode::Auto => {
            let costs = CostMatrix::build(model, group_a, group_b);
            Ok(AlignmentPath::auto(&costs, engine.params().auto_accept_cost))
        }
        PairingMode::Aligned => {
            let costs = CostMatrix::build(model, group_a, group_b);
            engine.align(&costs)
        }
    }
}
