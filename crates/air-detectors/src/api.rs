//! API detector stub, reserved for HTTP-call extraction. Registered so
//! the slot in the detector pipeline exists, but returns empty results
//! until a real implementation lands.

use crate::Detector;
use air_errors::AirResult;
use air_types::{DependencyResult, DependencyType};
use std::path::Path;

pub struct ApiDetectorStub;

impl Detector for ApiDetectorStub {
    fn name(&self) -> &'static str {
        "api-stub"
    }

    fn can_detect(&self, _repo_path: &Path) -> bool {
        // Always registered, never yet implemented: `can_detect` stays
        // false so `detect_all` never calls into an unimplemented scan.
        false
    }

    fn detect(&self, repo_path: &Path) -> AirResult<DependencyResult> {
        Ok(DependencyResult::new(DependencyType::Api, repo_path.display().to_string()))
    }

    fn dependency_type(&self) -> DependencyType {
        DependencyType::Api
    }
}
