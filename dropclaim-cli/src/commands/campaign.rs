//! Campaign command implementation.

use clap::Args;
use serde::Serialize;

use dropclaim_core::{
    CampaignDetail, CampaignStatus, ClassifiedError, ErrorKind, OperationResult,
};

use crate::config::Settings;
use crate::output;

/// Arguments for the campaign command.
#[derive(Args)]
pub struct CampaignArgs {
    /// Campaign (distributor) address
    pub address: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Campaign detail with its status at the time of the call.
#[derive(Serialize)]
struct CampaignView {
    #[serde(flatten)]
    detail: CampaignDetail,
    status: CampaignStatus,
    claimed_bps: u64,
}

/// Run the campaign command.
pub async fn run(args: CampaignArgs, settings: &Settings) -> i32 {
    let client = match super::open_client(settings, args.json) {
        Ok(client) => client,
        Err(code) => return code,
    };

    let now = chrono::Utc::now().timestamp();
    let result: OperationResult<CampaignView> = client
        .get_campaign_detail(&args.address)
        .await
        .into_result()
        .and_then(|detail| {
            detail.ok_or_else(|| {
                ClassifiedError::new(
                    ErrorKind::CampaignNotFound,
                    format!("Campaign '{}' not found", args.address),
                )
                .with_context("campaign", args.address.as_str())
            })
        })
        .map(|detail| CampaignView {
            status: detail.status(now),
            claimed_bps: detail.summary.claimed_bps(),
            detail,
        })
        .into();

    if args.json {
        return output::json(&result);
    }

    let view = match result.into_result() {
        Ok(view) => view,
        Err(err) => {
            output::failure(&err);
            if err.kind() == ErrorKind::CampaignNotFound {
                output::info("Run `dropclaim campaigns` to list known campaigns.");
            }
            return 1;
        }
    };

    let detail = &view.detail;
    output::header(&format!("Campaign {}", detail.summary.address));
    output::kv("Status", &format!("{:?}", view.status));
    output::kv("Version", &detail.summary.version.to_string());
    output::kv("Mint", &detail.summary.mint);
    output::kv("Admin", &detail.summary.admin);
    if let Some(root) = &detail.merkle_root {
        output::kv("Merkle root", root);
    }
    output::kv(
        "Claimed",
        &format!(
            "{} / {} ({:.2}%)",
            detail.summary.total_amount_claimed,
            detail.summary.max_total_claim,
            view.claimed_bps as f64 / 100.0
        ),
    );
    output::kv(
        "Claimants",
        &format!("{} / {}", detail.summary.num_nodes_claimed, detail.summary.max_num_nodes),
    );
    for (label, ts) in [
        ("Starts", detail.start_ts),
        ("Ends", detail.end_ts),
        ("Clawback", detail.clawback_start_ts),
    ] {
        if let Some(ts) = ts {
            output::kv(label, &format_timestamp(ts));
        }
    }
    println!();
    0
}

fn format_timestamp(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}
