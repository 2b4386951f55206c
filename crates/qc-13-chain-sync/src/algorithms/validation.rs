//! # Download Validation
//!
//! Structural checks on data a peer sent for a range. Consensus rules are
//! the importer's business.

use crate::domain::SyncError;
use shared_types::{receipts_root, BlockBody, BlockHeader, PeerId, TransactionReceipt};

/// Headers downloaded for a range must extend `start` one block at a time
/// and, for a closed range, finish exactly at `end`.
pub fn validate_range_headers(
    peer: PeerId,
    start: &BlockHeader,
    headers: &[BlockHeader],
    end: Option<&BlockHeader>,
) -> Result<(), SyncError> {
    let mut previous = start;
    for header in headers {
        if header.number != previous.number + 1 {
            return Err(SyncError::InvalidHeaders {
                peer,
                reason: format!(
                    "expected block {}, got {}",
                    previous.number + 1,
                    header.number
                ),
            });
        }
        if header.parent_hash != previous.hash() {
            return Err(SyncError::InvalidHeaders {
                peer,
                reason: format!("block {} does not extend its parent", header.number),
            });
        }
        previous = header;
    }

    if let Some(end) = end {
        if previous.hash() != end.hash() {
            return Err(SyncError::InvalidHeaders {
                peer,
                reason: format!("range does not reach checkpoint {}", end.number),
            });
        }
    }
    Ok(())
}

/// Body roots must match the header.
pub fn validate_body(peer: PeerId, header: &BlockHeader, body: &BlockBody) -> Result<(), SyncError> {
    if body.matches(header) {
        Ok(())
    } else {
        Err(SyncError::InvalidBody {
            peer,
            number: header.number,
        })
    }
}

/// Receipts must hash to the header's receipts root.
pub fn validate_receipts(
    peer: PeerId,
    header: &BlockHeader,
    receipts: &[TransactionReceipt],
) -> Result<(), SyncError> {
    if receipts_root(receipts) == header.receipts_root {
        Ok(())
    } else {
        Err(SyncError::InvalidReceipts {
            peer,
            number: header.number,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{NodeId, SignedTransaction, U256, EMPTY_ROOT};

    const PEER: NodeId = NodeId([9; 32]);

    fn chain(len: u64) -> Vec<BlockHeader> {
        let mut headers = vec![BlockHeader {
            number: 0,
            transactions_root: EMPTY_ROOT,
            ommers_hash: EMPTY_ROOT,
            ..Default::default()
        }];
        for number in 1..len {
            let parent = &headers[headers.len() - 1];
            headers.push(BlockHeader {
                number,
                parent_hash: parent.hash(),
                transactions_root: EMPTY_ROOT,
                ommers_hash: EMPTY_ROOT,
                ..Default::default()
            });
        }
        headers
    }

    #[test]
    fn test_valid_segment() {
        let headers = chain(6);
        assert!(validate_range_headers(PEER, &headers[0], &headers[1..], headers.last()).is_ok());
    }

    #[test]
    fn test_empty_segment_must_equal_end() {
        let headers = chain(2);
        assert!(validate_range_headers(PEER, &headers[0], &[], Some(&headers[0])).is_ok());
        assert!(validate_range_headers(PEER, &headers[0], &[], Some(&headers[1])).is_err());
    }

    #[test]
    fn test_gap_rejected() {
        let headers = chain(5);
        let with_gap = vec![headers[1].clone(), headers[3].clone()];
        let err = validate_range_headers(PEER, &headers[0], &with_gap, None).unwrap_err();
        assert!(err.to_string().contains("expected block 2"));
    }

    #[test]
    fn test_broken_parent_rejected() {
        let headers = chain(4);
        let mut forged = headers[2].clone();
        forged.parent_hash = [0xFF; 32];
        let segment = vec![headers[1].clone(), forged];
        assert!(validate_range_headers(PEER, &headers[0], &segment, None).is_err());
    }

    #[test]
    fn test_wrong_end_rejected() {
        let headers = chain(4);
        let mut other_end = headers[3].clone();
        other_end.extra_data = vec![1];
        let result =
            validate_range_headers(PEER, &headers[0], &headers[1..], Some(&other_end));
        assert!(matches!(result, Err(SyncError::InvalidHeaders { .. })));
    }

    #[test]
    fn test_body_must_match() {
        let header = chain(1).remove(0);
        assert!(validate_body(PEER, &header, &BlockBody::default()).is_ok());

        let body = BlockBody {
            transactions: vec![SignedTransaction {
                from: [1; 20],
                to: None,
                value: U256::zero(),
                nonce: 0,
                gas_price: U256::one(),
                gas_limit: 21_000,
                data: vec![],
                signature: [0; 64],
            }],
            ommers: vec![],
        };
        assert_eq!(
            validate_body(PEER, &header, &body),
            Err(SyncError::InvalidBody { peer: PEER, number: 0 })
        );
    }

    #[test]
    fn test_receipts_must_match() {
        let receipts = vec![TransactionReceipt {
            transaction_hash: [3; 32],
            cumulative_gas_used: 21_000,
            success: true,
        }];
        let header = BlockHeader {
            number: 4,
            receipts_root: receipts_root(&receipts),
            ..Default::default()
        };
        assert!(validate_receipts(PEER, &header, &receipts).is_ok());
        assert!(validate_receipts(PEER, &header, &[]).is_err());
    }
}
