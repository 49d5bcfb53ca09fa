//! CLI command implementations.

pub mod allocation;
pub mod allocations;
pub mod campaign;
pub mod campaigns;
pub mod claim;

use dropclaim_client::{AirdropClient, SnapshotSource};
use dropclaim_core::OperationResult;

use crate::config::Settings;
use crate::output;

/// Open the client, reporting a failure the same way a command would.
///
/// `Err` carries the exit code.
pub(crate) fn open_client(settings: &Settings, json: bool) -> Result<AirdropClient<SnapshotSource>, i32> {
    settings.open_client().map_err(|err| {
        let failed: OperationResult<()> = OperationResult::Failure(err);
        if json {
            output::json(&failed)
        } else {
            if let Some(err) = failed.error() {
                output::failure(err);
            }
            output::hint(&format!(
                "Pass --snapshot <file> or set `snapshot` in the config file (now: {}).",
                settings.snapshot.display()
            ));
            1
        }
    })
}
