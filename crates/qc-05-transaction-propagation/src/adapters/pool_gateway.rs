//! `MempoolGateway` backed by the in-process transaction pool.

use crate::events::PropagationError;
use crate::ports::MempoolGateway;
use qc_06_mempool::{TransactionOrigin, TransactionPoolApi};
use shared_types::{Hash, SignedTransaction};
use std::sync::Arc;

pub struct PoolGateway {
    pool: Arc<dyn TransactionPoolApi>,
}

impl PoolGateway {
    pub fn new(pool: Arc<dyn TransactionPoolApi>) -> Self {
        Self { pool }
    }
}

impl MempoolGateway for PoolGateway {
    fn submit_remote(&self, tx: SignedTransaction) -> Result<Hash, PropagationError> {
        self.pool
            .add_transaction(tx, TransactionOrigin::Remote)
            .map_err(|e| PropagationError::RejectedByPool(e.to_string()))
    }
}
