//! Policies - ストアに触れない純粋関数
//!
//! - **lock**: 読み直したレコードに対する lock 検証
//! - **pull**: 次に claim するタスクの選択（eligibility + 決定的な並び順）

pub mod lock;
pub mod pull;

pub use self::lock::{LockVerdict, verify_claim, verify_lock};
pub use self::pull::{is_eligible, next, sort, sorted};
