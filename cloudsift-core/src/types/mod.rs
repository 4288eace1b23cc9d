//! Plain data carried through a scan.

pub mod account;
pub mod result;
pub mod unit;

pub use account::{Account, CallerIdentity};
pub use result::{AccountResultSet, ScanResult};
pub use unit::{
    CANONICAL_GLOBAL_REGION, GLOBAL_REGION_LABEL, ScanUnit, UnitKey,
};
