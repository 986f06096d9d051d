use vgrid_protocol::ValidationReport;

#[derive(Debug)]
pub struct LayoutResult {
    pub protocol_id: String,
    pub study_uid: String,
    pub stage_id: String,
    pub rows: usize,
    pub columns: usize,
    pub slots: Vec<SlotSummary>,
    pub issues: Vec<String>,
}

#[derive(Debug)]
pub struct SlotSummary {
    pub slot: usize,
    pub viewport_id: String,
    /// Empty when the slot renders as an empty viewport.
    pub display_sets: Vec<String>,
    pub modality: Option<String>,
    pub description: Option<String>,
    pub score: Option<f64>,
}

#[derive(Debug)]
pub struct CheckResult {
    pub report: ValidationReport,
}
