//! Allocation command implementation.

use clap::Args;

use crate::config::Settings;
use crate::output;

/// Arguments for the allocation command.
#[derive(Args)]
pub struct AllocationArgs {
    /// Campaign (distributor) address
    pub campaign: String,

    /// Wallet public key to look up
    #[arg(short, long)]
    pub user: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the allocation command.
pub async fn run(args: AllocationArgs, settings: &Settings) -> i32 {
    let client = match super::open_client(settings, args.json) {
        Ok(client) => client,
        Err(code) => return code,
    };

    let result = client.allocation_view(&args.campaign, Some(args.user.as_str())).await;
    if args.json {
        return output::json(&result);
    }

    match result.into_result() {
        Ok(Some(allocation)) => {
            output::header(&format!("Allocation in {}", args.campaign));
            output::allocation(&allocation);
            println!();
            0
        }
        Ok(None) => {
            output::info(&format!("{} has no allocation in {}.", args.user, args.campaign));
            0
        }
        Err(err) => {
            output::failure(&err);
            1
        }
    }
}
