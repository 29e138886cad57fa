mod domain;
pub use domain::{InstanceNumber, InstanceRef, PackageSource, Role, Tag, TagDistribution};
pub use domain::{FIELD_SEPARATOR, GROUP_SEPARATOR};

mod error;
pub use error::{ModelError, ModelResult};

pub mod naming;
