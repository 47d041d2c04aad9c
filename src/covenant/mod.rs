pub mod perpetuity;
pub mod release;

pub use perpetuity::PerpetuityContract;
pub use release::{ReleaseCase, accepts, plan_release, verify_release};
