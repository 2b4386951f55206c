//! # Integration Flows
//!
//! | Module | Crates wired together |
//! |--------|-----------------------|
//! | `sync_flows` | chain sync, peer directory, pool (via block events) |
//! | `transaction_flows` | pool, propagation, peer directory (via bus) |

pub mod sync_flows;
pub mod transaction_flows;
