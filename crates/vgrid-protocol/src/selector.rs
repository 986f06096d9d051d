//! Protocol and stage selection.
//!
//! For each display set selector the selector ranks every candidate series
//! by descending match score (ties keep original series order), then picks
//! the first stage in declared order whose matched-viewport count reaches
//! its activation threshold.

use std::collections::BTreeMap;

use tracing::debug;

use vgrid_model::{
    DisplaySetSelector, DisplaySetUid, Protocol, SelectorId, Stage, Study, UNLIMITED_PRIORS,
};

use crate::error::MatchError;
use crate::evaluator::{self, Candidate};

/// One entry of a selector's ranked match list.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedMatch {
    pub display_set: DisplaySetUid,
    pub score: f64,
    /// True when the candidate came from a prior study rather than the
    /// active one.
    pub from_prior: bool,
}

/// Ranked match lists keyed by selector, shared by every stage of a
/// protocol.
pub type SelectorRankings = BTreeMap<SelectorId, Vec<RankedMatch>>;

/// Result of stage selection: the chosen stage and the rankings that
/// justified it. Feed this to the grid assigner unchanged.
#[derive(Debug, Clone)]
pub struct StageSelection {
    pub stage_index: usize,
    pub rankings: SelectorRankings,
}

impl StageSelection {
    pub fn stage<'a>(&self, protocol: &'a Protocol) -> &'a Stage {
        &protocol.stages[self.stage_index]
    }
}

/// Select the active stage for a protocol against a study.
///
/// `priors` are earlier studies of the same patient, any order; the
/// protocol's `number_of_priors_referenced` bounds how many are consulted,
/// newest first. Selection is pure: re-running on unchanged inputs yields
/// the same stage and the same rankings.
pub fn select_stage(
    protocol: &Protocol,
    study: &Study,
    priors: &[Study],
) -> Result<StageSelection, MatchError> {
    let gate = evaluator::evaluate_study(&protocol.protocol_matching_rules, study);
    if !gate.satisfied {
        return Err(MatchError::ProtocolNotApplicable {
            protocol: protocol.id.clone(),
            study: study.uid.to_string(),
        });
    }

    let scoped_priors = priors_in_scope(protocol, priors);
    let rankings = rank_selectors(protocol, study, &scoped_priors);

    for (index, stage) in protocol.stages.iter().enumerate() {
        let matched = matched_viewport_count(stage, &rankings);
        debug!(
            stage = %stage.id,
            matched,
            threshold = stage.min_viewports_matched(),
            "stage activation check"
        );
        if matched >= stage.min_viewports_matched() {
            return Ok(StageSelection {
                stage_index: index,
                rankings,
            });
        }
    }

    Err(MatchError::NoStageActivated {
        protocol: protocol.id.clone(),
    })
}

/// Compute the ranked match list for every selector in the protocol.
pub fn rank_selectors(protocol: &Protocol, study: &Study, priors: &[&Study]) -> SelectorRankings {
    protocol
        .display_set_selectors
        .iter()
        .map(|(id, selector)| (id.clone(), rank_one(selector, study, priors)))
        .collect()
}

fn rank_one(selector: &DisplaySetSelector, study: &Study, priors: &[&Study]) -> Vec<RankedMatch> {
    let mut ranked = Vec::new();
    collect_matches(selector, study, false, &mut ranked);
    if selector.allow_priors {
        for prior in priors {
            collect_matches(selector, prior, true, &mut ranked);
        }
    }
    // Stable sort keeps original series order on equal scores.
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

fn collect_matches(
    selector: &DisplaySetSelector,
    study: &Study,
    from_prior: bool,
    out: &mut Vec<RankedMatch>,
) {
    for display_set in &study.display_sets {
        let candidate = Candidate { study, display_set };
        let outcome = evaluator::evaluate(&selector.series_matching_rules, &candidate);
        if outcome.satisfied {
            out.push(RankedMatch {
                display_set: display_set.uid.clone(),
                score: outcome.score,
                from_prior,
            });
        }
    }
}

/// Prior studies in scope for a protocol: newest first (undated studies
/// last), truncated to `number_of_priors_referenced` unless unlimited.
fn priors_in_scope<'a>(protocol: &Protocol, priors: &'a [Study]) -> Vec<&'a Study> {
    if protocol.number_of_priors_referenced == 0 {
        return Vec::new();
    }
    let mut ordered: Vec<&Study> = priors.iter().collect();
    ordered.sort_by(|a, b| match (a.study_date, b.study_date) {
        (Some(left), Some(right)) => right.cmp(&left),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    if protocol.number_of_priors_referenced != UNLIMITED_PRIORS {
        ordered.truncate(protocol.number_of_priors_referenced as usize);
    }
    ordered
}

/// How many viewport definitions of a stage can be filled from the
/// rankings. A definition counts when every one of its display-set
/// references resolves in range.
fn matched_viewport_count(stage: &Stage, rankings: &SelectorRankings) -> usize {
    stage
        .viewports
        .iter()
        .filter(|viewport| {
            !viewport.display_sets.is_empty()
                && viewport.display_sets.iter().all(|ds_ref| {
                    rankings
                        .get(&ds_ref.id)
                        .is_some_and(|ranked| ds_ref.matched_display_sets_index < ranked.len())
                })
        })
        .count()
}
