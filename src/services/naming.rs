//! Unique output naming.

use std::path::Path;

use tracing::debug;

use crate::repository::{LedgerError, TitleLedger};

/// Candidate base name for a disambiguation index (`T`, `T_1`, `T_2`, ...).
fn candidate(base: &str, index: u32) -> String {
    if index == 0 {
        base.to_string()
    } else {
        format!("{}_{}", base, index)
    }
}

/// Choose a base name that collides with neither a file in `out_dir` nor a
/// ledger entry, and record it in the ledger before returning.
///
/// The ledger is re-read for every decision so separate processes sharing it
/// see each other's names.
pub fn claim_unique_name(
    ledger: &TitleLedger,
    out_dir: &Path,
    base: &str,
) -> Result<String, LedgerError> {
    let taken = ledger.load();

    let mut index = 0;
    let name = loop {
        let name = candidate(base, index);
        let in_ledger = taken.iter().any(|t| *t == name);
        let on_disk = out_dir.join(format!("{}.pdf", name)).exists();
        if !in_ledger && !on_disk {
            break name;
        }
        debug!(
            "Name '{}' already used (ledger: {}, out/: {})",
            name, in_ledger, on_disk
        );
        index += 1;
    };

    ledger.append(&name)?;
    Ok(name)
}
