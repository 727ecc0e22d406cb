//! The receiving locks we show to the user.

use crate::{
    db::{MintStorage, StorageError},
    types::P2SHScript,
};

/// All the P2SH locks we ever generated.
pub fn p2sh_locks(storage: &dyn MintStorage) -> Result<Vec<P2SHScript>, StorageError> {
    storage.get_scripts("")
}

/// One `P2SH:<address>` line per lock.
pub fn render_locks(scripts: &[P2SHScript]) -> String {
    scripts
        .iter()
        .map(|script| format!("P2SH:{}\n", script.address))
        .collect()
}
