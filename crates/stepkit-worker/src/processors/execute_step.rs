// ExecuteStep: resolve the step value, marshal parameters, run the step.

use stepkit_common::{ExecutionError, ExecutionResult, StepRegistry};
use tracing::warn;

use crate::execution_orchestrator::ExecutionOrchestrator;
use crate::messages::{ExecuteStepRequest, Parameter};

pub async fn process(
    registry: &StepRegistry,
    orchestrator: &mut ExecutionOrchestrator,
    request: &ExecuteStepRequest,
) -> ExecutionResult {
    let definition = match registry.method_for(&request.parsed_step_text) {
        Ok(definition) => definition,
        Err(e) => {
            warn!(target: "step", step = %request.actual_step_text, error = %e, "Step not found");
            return orchestrator.refuse(&ExecutionError::from(e));
        }
    };
    if registry.has_duplicates(&request.parsed_step_text) {
        warn!(
            target: "step",
            step = %request.parsed_step_text,
            method = %definition.qualified_name(),
            "Multiple implementations found; using the first"
        );
    }

    let args = request.parameters.iter().map(marshal_parameter).collect();
    orchestrator.execute_step(&definition, args).await
}

/// Table parameters travel as JSON; everything else as its plain value.
pub fn marshal_parameter(parameter: &Parameter) -> String {
    match (&parameter.table, parameter.is_table()) {
        (Some(table), true) => serde_json::json!({
            "headers": table.headers,
            "rows": table.rows,
        })
        .to_string(),
        _ => parameter.value.clone(),
    }
}
