// CacheFile: keep the step registry in line with editor file events.

use stepkit_common::RequestError;
use tracing::debug;

use crate::messages::{CacheFileRequest, FileStatus, Response};
use crate::step_loader::StepLoader;

pub fn process(loader: &StepLoader, request: &CacheFileRequest) -> Result<Response, RequestError> {
    let status = FileStatus::from_i32(request.status)
        .ok_or(RequestError::InvalidFileStatus(request.status))?;
    let file = request.file_path.as_path();

    match status {
        FileStatus::Changed | FileStatus::Opened => {
            loader.load_steps_from_text(&request.content, file)?;
        }
        FileStatus::Created => {
            if !loader.registry().is_file_cached(file) {
                loader.load_from_disk(file)?;
            }
        }
        FileStatus::Closed => {
            loader.load_from_disk(file)?;
        }
        FileStatus::Deleted => loader.remove_steps(file),
    }
    debug!(target: "loader", file = %file.display(), %status, "Processed file event");
    Ok(Response::Ack)
}
