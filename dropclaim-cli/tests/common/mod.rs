#![allow(dead_code)]

use std::path::PathBuf;

use assert_cmd::Command;
use tempfile::TempDir;

pub const MINT: &str = "So11111111111111111111111111111111111111112";
pub const ADMIN: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
pub const USER: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";
pub const CAMPAIGN_A: &str = "A1111111111111111111111111111111";
pub const CAMPAIGN_B: &str = "B1111111111111111111111111111111";

pub struct TestEnv {
    pub home_dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            home_dir: TempDir::new().unwrap(),
        }
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.home_dir.path().join("snapshot.json")
    }

    /// Write the standard two-campaign snapshot and return its path.
    pub fn write_snapshot(&self) -> PathBuf {
        let snapshot = serde_json::json!({
            "campaigns": [
                campaign(CAMPAIGN_A, 1),
                campaign(CAMPAIGN_B, 2),
                { "address": "not a key", "account": { "version": 9 } }
            ],
            "claims": [
                { "campaign": CAMPAIGN_A, "claimant": USER, "total_amount": "1500" }
            ]
        });
        let path = self.snapshot_path();
        std::fs::write(&path, serde_json::to_string_pretty(&snapshot).unwrap()).unwrap();
        path
    }

    pub fn dropclaim(&self) -> Command {
        let mut cmd = Command::cargo_bin("dropclaim").unwrap();
        let path = self.home_dir.path();
        cmd.env("HOME", path);
        cmd.env("XDG_CONFIG_HOME", path);
        cmd.env("APPDATA", path);
        cmd.env("DROPCLAIM_BASE_DELAY_MS", "1");
        cmd.env("DROPCLAIM_MAX_DELAY_MS", "2");
        cmd.env_remove("RUST_LOG");
        cmd
    }

    /// Command with `--snapshot` pointing at the test snapshot.
    pub fn with_snapshot(&self) -> Command {
        let mut cmd = self.dropclaim();
        cmd.arg("--snapshot").arg(self.snapshot_path());
        cmd
    }
}

fn campaign(address: &str, version: u64) -> serde_json::Value {
    serde_json::json!({
        "address": address,
        "account": {
            "version": version,
            "mint": MINT,
            "admin": ADMIN,
            "merkle_root": "ab".repeat(32),
            "max_total_claim": "1000000",
            "max_num_nodes": 100,
            "total_amount_claimed": "0",
            "num_nodes_claimed": 0,
            "start_ts": 0,
            "end_ts": 4102444800i64
        }
    })
}
