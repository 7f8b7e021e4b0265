//! Execute request handling: synchronous, stored and stored-with-status.

use std::path::Path;
use std::sync::Arc;

use metrics::{counter, histogram};
use tracing::{error, info, warn, Instrument};
use wps_protocol::{
    ExecuteRequest, ExecuteResponse, ExecutionStatus, OutputReference, ProcessDescription,
    WpsError, WpsResult,
};

use crate::context::RequestContext;
use crate::error::ProcessResult;
use crate::outputs::ProcessOutputs;
use crate::processes::{Process, ProcessEnv};
use crate::state::AppState;

/// Execute a request and return the ExecuteResponse document.
///
/// With `status=true` the process runs in the background and the returned
/// document reports `ProcessAccepted`; the stored document is rewritten once
/// the process finishes.
pub async fn execute(state: Arc<AppState>, request: ExecuteRequest) -> WpsResult<String> {
    let process = state
        .registry
        .get(&request.identifier)
        .ok_or_else(|| WpsError::ProcessNotFound(request.identifier.clone()))?;

    let ctx = RequestContext::new(process.identifier());
    let service_url = state.config.service_url.clone();
    let stored = request
        .store_execute_response
        .then(|| state.env.outputs.status_document(&ctx));

    info!(
        parent: &ctx.span,
        inputs = request.inputs.len(),
        stored = stored.is_some(),
        background = request.status,
        "Execute request received"
    );

    if request.status {
        let (status_path, status_url) = stored.ok_or_else(|| {
            WpsError::Internal("status requires a stored response".to_string())
        })?;

        let accepted = ExecuteResponse::new(
            &service_url,
            process.description().clone(),
            ExecutionStatus::Accepted,
        )
        .with_status_location(&status_url)
        .build();
        write_document(&status_path, &accepted)
            .await
            .map_err(|e| WpsError::Internal(format!("Failed to store status document: {}", e)))?;

        let env = state.env.clone();
        let span = ctx.span.clone();
        tokio::spawn(
            async move {
                let result = run(&ctx, process.as_ref(), &request, &env).await;
                let document = response_for(&service_url, process.description(), &env, &result)
                    .with_status_location(&status_url)
                    .build();
                if let Err(e) = write_document(&status_path, &document).await {
                    error!(error = %e, path = %status_path.display(), "Failed to update status document");
                }
            }
            .instrument(span),
        );

        return Ok(accepted);
    }

    let result = run(&ctx, process.as_ref(), &request, &state.env)
        .instrument(ctx.span.clone())
        .await;

    if let Some((status_path, status_url)) = stored {
        let document = response_for(&service_url, process.description(), &state.env, &result)
            .with_status_location(&status_url)
            .build();
        if let Err(e) = write_document(&status_path, &document).await {
            warn!(parent: &ctx.span, error = %e, "Failed to store execute response");
        }
    }

    let outputs = result.map_err(WpsError::from)?;
    Ok(succeeded(&service_url, process.description(), &state.env, &outputs).build())
}

/// Run a process, recording outcome and duration.
async fn run(
    ctx: &RequestContext,
    process: &dyn Process,
    request: &ExecuteRequest,
    env: &ProcessEnv,
) -> ProcessResult<ProcessOutputs> {
    let result = process.execute(ctx, request, env).await;
    let elapsed = ctx.elapsed_ms();

    let outcome = match &result {
        Ok(outputs) => {
            info!(parent: &ctx.span, outputs = outputs.len(), elapsed_ms = elapsed, "Execution succeeded");
            "succeeded"
        }
        Err(e) => {
            error!(parent: &ctx.span, error = %e, kind = e.kind(), elapsed_ms = elapsed, "Execution failed");
            e.kind()
        }
    };

    counter!(
        "wps_executions_total",
        "process" => ctx.process.clone(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("wps_execute_duration_ms", "process" => ctx.process.clone()).record(elapsed as f64);

    result
}

fn response_for(
    service_url: &str,
    description: &ProcessDescription,
    env: &ProcessEnv,
    result: &ProcessResult<ProcessOutputs>,
) -> ExecuteResponse {
    match result {
        Ok(outputs) => succeeded(service_url, description, env, outputs),
        Err(e) => ExecuteResponse::new(
            service_url,
            description.clone(),
            ExecutionStatus::failed(e.exception_code(), e.to_string()),
        ),
    }
}

fn succeeded(
    service_url: &str,
    description: &ProcessDescription,
    env: &ProcessEnv,
    outputs: &ProcessOutputs,
) -> ExecuteResponse {
    outputs.iter().fold(
        ExecuteResponse::new(service_url, description.clone(), ExecutionStatus::Succeeded),
        |response, (identifier, file)| {
            let title = description
                .output(identifier)
                .map(|o| o.title.clone())
                .unwrap_or_else(|| identifier.clone());
            response.with_output(OutputReference {
                identifier: identifier.clone(),
                title,
                href: env.outputs.public_url(&file.path),
                mime_type: file.format.mime_type.clone(),
            })
        },
    )
}

async fn write_document(path: &Path, document: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, document).await
}
