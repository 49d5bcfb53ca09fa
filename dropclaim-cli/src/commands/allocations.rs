//! Allocations command implementation.

use clap::Args;

use crate::config::Settings;
use crate::output;

/// Arguments for the allocations command.
#[derive(Args)]
pub struct AllocationsArgs {
    /// Campaign (distributor) addresses
    #[arg(required = true)]
    pub campaigns: Vec<String>,

    /// Wallet public key to look up
    #[arg(short, long)]
    pub user: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the allocations command.
pub async fn run(args: AllocationsArgs, settings: &Settings) -> i32 {
    let client = match super::open_client(settings, args.json) {
        Ok(client) => client,
        Err(code) => return code,
    };

    let result = client
        .get_batch_user_allocations(&args.campaigns, Some(args.user.as_str()))
        .await;
    if args.json {
        return output::json(&result);
    }

    let batch = match result.into_result() {
        Ok(batch) => batch,
        Err(err) => {
            output::failure(&err);
            return 1;
        }
    };

    output::header(&format!(
        "Allocations for {} ({} of {} campaigns)",
        args.user,
        batch.found(),
        batch.len()
    ));
    for (campaign, allocation) in batch.iter() {
        println!();
        output::kv("Campaign", campaign);
        match allocation {
            Some(allocation) => output::allocation(allocation),
            None => output::kv("Status", "no allocation"),
        }
    }
    println!();
    0
}
