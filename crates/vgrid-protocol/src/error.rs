use thiserror::Error;

#[derive(Debug, Error)]
pub enum MatchError {
    /// The protocol's own matching rules rejected the study.
    #[error("protocol {protocol} does not apply to study {study}")]
    ProtocolNotApplicable { protocol: String, study: String },
    /// No stage met its activation threshold; the caller falls back to a
    /// default layout.
    #[error("no stage in protocol {protocol} meets its activation threshold")]
    NoStageActivated { protocol: String },
}

pub type Result<T> = std::result::Result<T, MatchError>;
