pub mod event;
pub mod group;
pub mod member;
pub mod snapshot;

pub use event::{MembershipAction, MembershipEvent};
pub use group::{GroupProfile, RoleCounts};
pub use member::{Gender, MemberRecord, ParseEnumError, Role};
pub use snapshot::{NewSnapshot, Snapshot, SnapshotKind, SnapshotStatus, SnapshotSummary};
