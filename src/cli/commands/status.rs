//! `delphi status`: show the locally snapshotted state of the current
//! session without touching the network.

use anyhow::{bail, Result};

use crate::cli::{render, StatusArgs};
use crate::domain::models::Config;
use crate::domain::ports::SnapshotStore;
use crate::infrastructure::FileSnapshotStore;

pub async fn execute(_args: StatusArgs, config: Config, json: bool) -> Result<()> {
    let store = FileSnapshotStore::new(config.continuity.snapshot_dir.clone());
    let Some(session_id) = store.current().await? else {
        bail!("no session in progress");
    };
    let Some(snapshot) = store.load(&session_id).await? else {
        bail!("session {session_id} has no local snapshot yet");
    };
    render::print_snapshot(&snapshot, json);
    Ok(())
}
