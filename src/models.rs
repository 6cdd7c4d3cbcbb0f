use serde::{Deserialize, Serialize};

use crate::model::Deck;
use crate::summary::DeckSummary;
use crate::validate::ValidationReport;

/// Request body carrying deck text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckRequest {
    pub deck: String,
    /// Overrides the service-wide strict setting for this request
    #[serde(default)]
    pub strict: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParseResponse {
    pub deck: Deck,
    pub summary: DeckSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeResponse {
    pub deck: String,
}

/// Analysis response structure
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResponse {
    pub job_id: String,
    pub status: AnalysisStatus,
    pub results: Option<AnalysisResults>,
    pub error_message: Option<String>,
    pub report: Option<ValidationReport>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisStatus {
    Success,
    Failed,
    Rejected,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisResults {
    pub displacements: Vec<NodeDisplacement>,
    pub reactions: Vec<NodeReaction>,
    pub max_displacement: f64,
    /// Sum of all reaction forces (fx, fy, fz)
    pub total_reaction: [f64; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDisplacement {
    pub node_id: usize,
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeReaction {
    pub node_id: usize,
    pub fx: f64,
    pub fy: f64,
    pub fz: f64,
}
