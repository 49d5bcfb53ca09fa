//! Claim command implementation.

use clap::Args;
use serde::Serialize;

use dropclaim_core::{MerkleProof, OperationResult, WalletHandle};

use crate::config::Settings;
use crate::output;

/// Arguments for the claim command.
#[derive(Args)]
pub struct ClaimArgs {
    /// Campaign (distributor) address
    pub campaign: String,

    /// Claiming wallet public key
    #[arg(short, long)]
    pub user: String,

    /// Merkle proof nodes, hex-encoded, comma separated
    #[arg(long, value_delimiter = ',')]
    pub proof: Vec<String>,

    /// Write the updated snapshot back to disk
    #[arg(long)]
    pub save: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct ClaimOutput {
    campaign: String,
    claimant: String,
    transaction_id: String,
    saved: bool,
}

/// Run the claim command.
pub async fn run(args: ClaimArgs, settings: &Settings) -> i32 {
    let client = match super::open_client(settings, args.json) {
        Ok(client) => client,
        Err(code) => return code,
    };

    let proof = match MerkleProof::from_hex_nodes(&args.proof) {
        Ok(proof) => proof,
        Err(err) => return report(OperationResult::<ClaimOutput>::Failure(err), args.json),
    };

    if !args.json {
        output::info(&format!("Claiming allocation in {}...", args.campaign));
    }
    let wallet = WalletHandle::connected(args.user.as_str());
    let result = client.submit_claim(&args.campaign, &wallet, proof).await;

    let result = match result.into_result() {
        Ok(receipt) => {
            let saved = if args.save {
                match client.source().save(&settings.snapshot) {
                    Ok(()) => true,
                    Err(err) => return report(OperationResult::<ClaimOutput>::Failure(err), args.json),
                }
            } else {
                false
            };
            OperationResult::Success(ClaimOutput {
                campaign: args.campaign.clone(),
                claimant: args.user.clone(),
                transaction_id: receipt.transaction_id,
                saved,
            })
        }
        Err(err) => OperationResult::Failure(err),
    };
    report(result, args.json)
}

fn report(result: OperationResult<ClaimOutput>, json: bool) -> i32 {
    if json {
        return output::json(&result);
    }
    match result.into_result() {
        Ok(claim) => {
            output::success("Claim confirmed");
            output::kv("Transaction", &claim.transaction_id);
            if claim.saved {
                output::kv("Snapshot", "updated");
            } else {
                output::warn("Snapshot not saved; pass --save to persist the claim.");
            }
            0
        }
        Err(err) => {
            output::failure(&err);
            1
        }
    }
}
