//! Campaigns command implementation.

use clap::Args;

use dropclaim_core::CampaignFilter;

use crate::config::Settings;
use crate::output;

/// Arguments for the campaigns command.
#[derive(Args)]
pub struct CampaignsArgs {
    /// Only campaigns distributing this token mint
    #[arg(long)]
    pub mint: Option<String>,

    /// Only campaigns managed by this admin
    #[arg(long)]
    pub admin: Option<String>,

    /// Maximum number of campaigns to show
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the campaigns command.
pub async fn run(args: CampaignsArgs, settings: &Settings) -> i32 {
    let client = match super::open_client(settings, args.json) {
        Ok(client) => client,
        Err(code) => return code,
    };

    let filter = CampaignFilter {
        mint: args.mint,
        admin: args.admin,
    };
    let result = client.get_campaign_list(&filter, args.limit).await;
    if args.json {
        return output::json(&result);
    }

    let campaigns = match result.into_result() {
        Ok(campaigns) => campaigns,
        Err(err) => {
            output::failure(&err);
            return 1;
        }
    };

    if campaigns.is_empty() {
        output::info("No campaigns found.");
        return 0;
    }

    output::header(&format!("Campaigns ({})", campaigns.len()));
    for campaign in &campaigns {
        println!();
        output::kv("Address", &campaign.address);
        output::kv("Version", &campaign.version.to_string());
        output::kv("Mint", &campaign.mint);
        output::kv(
            "Claimed",
            &format!(
                "{} / {} ({:.2}%)",
                campaign.total_amount_claimed,
                campaign.max_total_claim,
                campaign.claimed_bps() as f64 / 100.0
            ),
        );
        output::kv(
            "Claimants",
            &format!("{} / {}", campaign.num_nodes_claimed, campaign.max_num_nodes),
        );
    }
    println!();
    0
}
