use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tempfile::TempDir;
use tokio::process::Command;
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::model::Deck;
use crate::models::{AnalysisResults, NodeDisplacement, NodeReaction};
use crate::writer::write_deck;

/// ccx expects the job name WITHOUT extension
const JOB_NAME: &str = "analysis";

fn displacement_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*displacements\s*\(\s*vx\s*,\s*vy\s*,\s*vz\s*\)(?:.*\btime\s+(\S+))?").unwrap()
    })
}

fn force_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*forces\s*\(\s*fx\s*,\s*fy\s*,\s*fz\s*\)(?:.*\btime\s+(\S+))?").unwrap())
}

pub struct CalculiXExecutor {
    ccx_path: String,
    debug_export: Option<PathBuf>,
}

impl CalculiXExecutor {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            ccx_path: config.ccx_path.clone(),
            debug_export: config.debug_export.clone(),
        }
    }

    pub fn ccx_path(&self) -> &str {
        &self.ccx_path
    }

    /// Whether the solver binary can be launched at all
    pub async fn solver_available(&self) -> bool {
        Command::new(&self.ccx_path).arg("-v").output().await.is_ok()
    }

    pub async fn execute(&self, deck: &Deck) -> Result<AnalysisResults, ExecutorError> {
        // Each analysis gets its own directory so concurrent jobs never share files
        let analysis_id = Uuid::new_v4();
        let temp_dir = TempDir::new().map_err(|e| ExecutorError::IoError(e.to_string()))?;
        let work_path = temp_dir.path();

        tracing::info!("Starting analysis {} in {:?}", analysis_id, work_path);

        let inp_path = work_path.join(format!("{}.inp", JOB_NAME));
        fs::write(&inp_path, write_deck(deck))
            .map_err(|e| ExecutorError::IoError(format!("Failed to write .inp file: {}", e)))?;
        self.maybe_export_debug_file(&inp_path, &analysis_id, "inp");

        tracing::info!("Running command: {} {}", self.ccx_path, JOB_NAME);
        let output = Command::new(&self.ccx_path)
            .arg(JOB_NAME)
            .current_dir(work_path)
            .output()
            .await
            .map_err(|e| ExecutorError::ExecutionError(format!("Failed to execute ccx: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            tracing::error!("CalculiX failed. Stderr: {}\nStdout: {}", stderr, stdout);
            return Err(ExecutorError::AnalysisFailed(format!(
                "CalculiX exited with status {}. Check logs.",
                output.status
            )));
        }

        let dat_path = work_path.join(format!("{}.dat", JOB_NAME));
        if !dat_path.exists() {
            return Err(ExecutorError::AnalysisFailed("No .dat file generated".to_string()));
        }
        self.maybe_export_debug_file(&dat_path, &analysis_id, "dat");

        let content = fs::read_to_string(&dat_path)
            .map_err(|e| ExecutorError::IoError(format!("Failed to read .dat file: {}", e)))?;
        let results = parse_dat(&content);
        tracing::info!(
            "Analysis {} finished: {} displacements, {} reactions, max |u| = {:.6e}",
            analysis_id,
            results.displacements.len(),
            results.reactions.len(),
            results.max_displacement
        );
        Ok(results)
    }

    fn maybe_export_debug_file(&self, path: &Path, analysis_id: &Uuid, extension: &str) {
        let Some(dest_dir) = &self.debug_export else {
            return;
        };
        if let Err(err) = fs::create_dir_all(dest_dir) {
            tracing::warn!("Failed to create debug export directory {:?}: {}", dest_dir, err);
            return;
        }

        let dest_file = dest_dir.join(format!("analysis_{}.{}", analysis_id, extension));
        if let Err(err) = fs::copy(path, &dest_file) {
            tracing::warn!("Failed to export debug file {:?}: {}", dest_file, err);
        } else {
            tracing::info!("Exported debug file to {:?}", dest_file);
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum DatBlock {
    None,
    Displacements,
    Forces,
}

/// Time printed at the end of a block header, if any
fn header_time(captures: &regex::Captures<'_>) -> Option<String> {
    captures.get(1).map(|m| m.as_str().to_string())
}

/// Extract nodal displacements and forces from a `.dat` listing.
/// Blocks printed at the same time (one per requested set) are merged; a
/// block at a later time replaces everything of its kind read so far.
pub fn parse_dat(content: &str) -> AnalysisResults {
    let mut displacements: HashMap<usize, NodeDisplacement> = HashMap::new();
    let mut reactions: HashMap<usize, NodeReaction> = HashMap::new();
    let mut displacement_time: Option<Option<String>> = None;
    let mut force_time: Option<Option<String>> = None;
    let mut current = DatBlock::None;

    for line in content.lines() {
        if let Some(captures) = displacement_header().captures(line) {
            let time = header_time(&captures);
            if displacement_time.as_ref() != Some(&time) {
                displacements.clear();
                displacement_time = Some(time);
            }
            current = DatBlock::Displacements;
            continue;
        }
        if let Some(captures) = force_header().captures(line) {
            let time = header_time(&captures);
            if force_time.as_ref() != Some(&time) {
                reactions.clear();
                force_time = Some(time);
            }
            current = DatBlock::Forces;
            continue;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        // Any other text header ends the current block
        if trimmed.chars().next().map_or(false, |c| !c.is_ascii_digit() && c != '-') {
            current = DatBlock::None;
            continue;
        }

        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        if parts.len() < 4 {
            continue;
        }
        let (Ok(id), Ok(x), Ok(y), Ok(z)) = (
            parts[0].parse::<usize>(),
            parts[1].parse::<f64>(),
            parts[2].parse::<f64>(),
            parts[3].parse::<f64>(),
        ) else {
            continue;
        };

        match current {
            DatBlock::Displacements => {
                displacements.insert(id, NodeDisplacement { node_id: id, dx: x, dy: y, dz: z });
            }
            DatBlock::Forces => {
                reactions.insert(id, NodeReaction { node_id: id, fx: x, fy: y, fz: z });
            }
            DatBlock::None => {}
        }
    }

    let mut results = AnalysisResults {
        displacements: displacements.into_values().collect(),
        reactions: reactions.into_values().collect(),
        ..AnalysisResults::default()
    };
    results.displacements.sort_by_key(|d| d.node_id);
    results.reactions.sort_by_key(|r| r.node_id);

    results.max_displacement = results
        .displacements
        .iter()
        .map(|d| (d.dx * d.dx + d.dy * d.dy + d.dz * d.dz).sqrt())
        .fold(0.0, f64::max);
    for r in &results.reactions {
        results.total_reaction[0] += r.fx;
        results.total_reaction[1] += r.fy;
        results.total_reaction[2] += r.fz;
    }
    results
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Execution error: {0}")]
    ExecutionError(String),
    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const DAT: &str = "
                        S T E P       1


                                INCREMENT     1


 displacements (vx,vy,vz) for set NALL and time  0.5000000E+00

         1  1.000000E-03  0.000000E+00 -2.000000E-03
         2  0.000000E+00  0.000000E+00  0.000000E+00

                                INCREMENT     2


 displacements (vx,vy,vz) for set NALL and time  0.1000000E+01

         1  3.000000E-03  0.000000E+00 -4.000000E-03
         2  0.000000E+00  0.000000E+00  0.000000E+00

 forces (fx,fy,fz) for set NALL and time  0.1000000E+01

         1  0.000000E+00  0.000000E+00  0.000000E+00
         2  1.500000E+01 -2.000000E+00  3.100000E+02
         5 -5.000000E+00  2.000000E+00  0.000000E+00

 stresses (elem, integ.pnt.,sxx,syy,szz,sxy,sxz,syz) for set EALL and time  0.1000000E+01

         1   1  1.0E+00  2.0E+00  3.0E+00  4.0E+00  5.0E+00  6.0E+00
";

    #[test]
    fn keeps_last_increment() {
        let results = parse_dat(DAT);
        assert_eq!(results.displacements.len(), 2);
        assert_relative_eq!(results.displacements[0].dx, 3.0e-3);
        assert_relative_eq!(results.max_displacement, 5.0e-3, epsilon = 1e-12);
    }

    #[test]
    fn sums_reactions_and_ignores_other_blocks() {
        let results = parse_dat(DAT);
        assert_eq!(results.reactions.len(), 3);
        assert_eq!(results.reactions[2].node_id, 5);
        assert_relative_eq!(results.total_reaction[0], 10.0);
        assert_relative_eq!(results.total_reaction[2], 310.0);
    }

    #[test]
    fn sets_printed_at_the_same_time_are_merged() {
        let dat = "
 displacements (vx,vy,vz) for set FIXED and time  0.1000000E+01

         5  0.000000E+00  0.000000E+00  0.000000E+00

 displacements (vx,vy,vz) for set TOP and time  0.1000000E+01

         1  1.000000E-03  0.000000E+00 -2.000000E-03
";
        let results = parse_dat(dat);
        let ids: Vec<usize> = results.displacements.iter().map(|d| d.node_id).collect();
        assert_eq!(ids, vec![1, 5]);
    }

    #[test]
    fn empty_listing() {
        let results = parse_dat("");
        assert!(results.displacements.is_empty());
        assert_eq!(results.max_displacement, 0.0);
    }
}
