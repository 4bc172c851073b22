use std::path::Path;

use crate::errors::ModelError;
use crate::models::PredictionResult;

/// Save an evaluation run's results to a JSON file, creating parent
/// directories as needed.
pub fn save_results(results: &[PredictionResult], path: &Path) -> Result<(), ModelError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json =
        serde_json::to_string_pretty(results).expect("prediction results serialize to plain JSON");
    std::fs::write(path, json)?;
    Ok(())
}

/// Load a previously saved results file.
pub fn load_results(path: &Path) -> Result<Vec<PredictionResult>, ModelError> {
    let json = std::fs::read_to_string(path)?;
    serde_json::from_str(&json).map_err(|e| ModelError::SnapshotParse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Make a test name safe for use in a filename.
pub fn sanitize_test_name(name: &str) -> String {
    let mut out = name.to_string();
    for c in ['\'', '-', '.', '&', ' '] {
        out = out.replace(c, "_");
    }
    out
}
