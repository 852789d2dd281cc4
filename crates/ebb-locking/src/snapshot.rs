//! Binary snapshots of [`ControllerState`].
//!
//! bincode 2 with the standard config. The authorizer is not part of the
//! state and must be supplied again on load.

use std::fs;
use std::path::Path;

use ebb_core::error::SnapshotError;
use tracing::debug;

use crate::controller::ControllerState;

pub fn encode(state: &ControllerState) -> Result<Vec<u8>, SnapshotError> {
    bincode::encode_to_vec(state, bincode::config::standard())
        .map_err(|e| SnapshotError::Encode(e.to_string()))
}

pub fn decode(bytes: &[u8]) -> Result<ControllerState, SnapshotError> {
    let (state, read) = bincode::decode_from_slice(bytes, bincode::config::standard())
        .map_err(|e| SnapshotError::Decode(e.to_string()))?;
    if read != bytes.len() {
        return Err(SnapshotError::Decode(format!(
            "{} trailing bytes",
            bytes.len() - read
        )));
    }
    Ok(state)
}

/// Write `state` to `path`, replacing any existing file.
pub fn save_to(path: &Path, state: &ControllerState) -> Result<(), SnapshotError> {
    let bytes = encode(state)?;
    fs::write(path, &bytes)?;
    debug!(path = %path.display(), bytes = bytes.len(), "snapshot saved");
    Ok(())
}

pub fn load_from(path: &Path) -> Result<ControllerState, SnapshotError> {
    let bytes = fs::read(path)?;
    debug!(path = %path.display(), bytes = bytes.len(), "snapshot loaded");
    decode(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LockingConfig;
    use crate::controller::LockingController;
    use crate::token::Token;
    use ebb_core::auth::RoleTable;
    use ebb_core::epoch::epoch_start;
    use ebb_core::types::{Address, Env};

    const GOV: Address = Address::from_seed(1);
    const ENTRY: Address = Address::from_seed(2);
    const FIN: Address = Address::from_seed(3);
    const ALICE: Address = Address::from_seed(0xa1);

    fn busy_controller() -> LockingController<RoleTable> {
        let mut receipt = Token::new("eUSD");
        receipt.mint(&ENTRY, 10_000).unwrap();
        let mut c = LockingController::with_config(
            RoleTable::standard(GOV, ENTRY, FIN),
            receipt,
            &LockingConfig::standard(),
        )
        .unwrap();
        let now = epoch_start(3) + 10;
        c.create_position(&Env::new(ENTRY, now), 5_000, 13, ALICE).unwrap();
        c.start_unwinding(&Env::new(ENTRY, now), 2_000, 13, ALICE).unwrap();
        c
    }

    #[test]
    fn state_survives_encode_decode() {
        let c = busy_controller();
        let bytes = encode(c.state()).unwrap();
        let back = decode(&bytes).unwrap();
        assert_eq!(&back, c.state());
        assert_eq!(back.ledger().positions().count(), 1);
    }

    #[test]
    fn truncated_bytes_rejected() {
        let bytes = encode(busy_controller().state()).unwrap();
        assert!(matches!(
            decode(&bytes[..bytes.len() / 2]),
            Err(SnapshotError::Decode(_))
        ));
    }

    #[test]
    fn save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ebb.snapshot");
        let c = busy_controller();
        save_to(&path, c.state()).unwrap();

        let state = load_from(&path).unwrap();
        let resumed = LockingController::from_snapshot(RoleTable::standard(GOV, ENTRY, FIN), state);
        assert_eq!(resumed.balance_of(&ALICE).unwrap(), 3_000);
        assert!(matches!(
            load_from(&dir.path().join("missing")),
            Err(SnapshotError::Io(_))
        ));
    }
}
