pub mod assigner;
pub mod error;
pub mod evaluator;
pub mod selector;
pub mod validate;

pub use assigner::{
    assign, AssignmentIssue, GridAssignment, ResolvedViewportOptions, ViewportAssignment,
};
pub use error::{MatchError, Result};
pub use evaluator::{evaluate, evaluate_study, Candidate, RuleMatch, RuleOutcome};
pub use selector::{rank_selectors, select_stage, RankedMatch, SelectorRankings, StageSelection};
pub use validate::{validate_protocol, IssueSeverity, ProtocolIssue, ValidationReport};
