use pl_02_ledger_store::ContractEvent;
use serde::{Deserialize, Serialize};
use shared_types::ErrorCode;
use std::fmt;

/// Committer verdict for one transaction in a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxValidationCode {
    Valid,
    /// A key read during endorsement changed before commit.
    MvccReadConflict,
    /// A range scanned during endorsement gained, lost or changed a key.
    PhantomReadConflict,
    EndorsementPolicyFailure,
    BadPayload,
    DuplicateTxId,
    BadCreatorSignature,
}

impl TxValidationCode {
    pub fn is_valid(self) -> bool {
        self == TxValidationCode::Valid
    }

    /// Error reported to the submitter of an invalid transaction.
    pub fn error_code(self) -> Option<ErrorCode> {
        match self {
            TxValidationCode::Valid => None,
            TxValidationCode::MvccReadConflict | TxValidationCode::PhantomReadConflict => {
                Some(ErrorCode::WriteConflict)
            }
            TxValidationCode::BadCreatorSignature => Some(ErrorCode::IdentityUnavailable),
            TxValidationCode::EndorsementPolicyFailure
            | TxValidationCode::BadPayload
            | TxValidationCode::DuplicateTxId => Some(ErrorCode::Internal),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TxValidationCode::Valid => "VALID",
            TxValidationCode::MvccReadConflict => "MVCC_READ_CONFLICT",
            TxValidationCode::PhantomReadConflict => "PHANTOM_READ_CONFLICT",
            TxValidationCode::EndorsementPolicyFailure => "ENDORSEMENT_POLICY_FAILURE",
            TxValidationCode::BadPayload => "BAD_PAYLOAD",
            TxValidationCode::DuplicateTxId => "DUPLICATE_TXID",
            TxValidationCode::BadCreatorSignature => "BAD_CREATOR_SIGNATURE",
        }
    }
}

impl fmt::Display for TxValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final outcome of a transaction as recorded by a peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitStatus {
    pub tx_id: String,
    pub block_number: u64,
    pub code: TxValidationCode,
    /// Contract event, delivered only for valid transactions.
    pub event: Option<ContractEvent>,
}

impl CommitStatus {
    pub fn is_valid(&self) -> bool {
        self.code.is_valid()
    }
}
