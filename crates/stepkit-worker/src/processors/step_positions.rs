use stepkit_common::StepRegistry;

use crate::messages::{Response, StepPositionsRequest};

/// Positions of the steps currently indexed for the requested file.
pub fn process(registry: &StepRegistry, request: &StepPositionsRequest) -> Response {
    Response::StepPositions(registry.step_positions(&request.file_path))
}
