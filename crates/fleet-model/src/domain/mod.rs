mod source;
pub use source::PackageSource;

mod tag;
pub use tag::Tag;

mod distribution;
pub use distribution::TagDistribution;

mod instance;
pub use instance::{InstanceRef, Role};

/// 1-based position of a minion inside the fleet.
pub type InstanceNumber = u32;

/// Separates tag groups inside a fleet specification (`"2:a:1:git,3:b:2:deb"`).
pub const GROUP_SEPARATOR: char = ',';

/// Separates the fields of a single tag group.
pub const FIELD_SEPARATOR: char = ':';
