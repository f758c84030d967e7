//! The AIR private input of the ecdsa builtin, consumed by the prover.

use serde::{Deserialize, Serialize};

use super::{registry::SignatureRegistry, InstanceCells};
use crate::memory::{MemoryError, Segment};

/// The signature part of a private input record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcdsaSignatureInput {
    /// `r`, as `0x`-prefixed hex.
    pub r: String,
    /// `s^-1` modulo the curve order, as `0x`-prefixed hex.
    pub w: String,
}

/// One ecdsa instance, as handed to the prover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcdsaPrivateInput {
    /// The instance index, `base / 2`.
    pub index: u64,
    /// The public key x-coordinate.
    pub pubkey: String,
    /// The message hash.
    pub msg: String,
    /// The signature.
    pub signature_input: EcdsaSignatureInput,
}

/// Builds one record per registered signature, by increasing instance index.
///
/// Both cells of every signed instance must hold field elements by now.
pub fn export_private_inputs(
    signatures: &SignatureRegistry,
    segment: &Segment,
) -> Result<Vec<EcdsaPrivateInput>, MemoryError> {
    signatures
        .iter()
        .map(|(base, signature)| {
            let cells = InstanceCells::containing(base);
            let pubkey = segment.read_felt(cells.pubkey)?;
            let msg = segment.read_felt(cells.message)?;
            Ok(EcdsaPrivateInput {
                index: cells.index(),
                pubkey: format!("{pubkey:#x}"),
                msg: format!("{msg:#x}"),
                signature_input: EcdsaSignatureInput {
                    r: format!("{:#x}", signature.r()),
                    w: format!("{:#x}", signature.w()),
                },
            })
        })
        .collect()
}
