//! Tenancy CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the tenant controller, plus the
//! label and annotation keys it stamps onto the objects it manages.

pub mod annotations;
pub mod labels;
pub mod tenant;

pub use annotations::*;
pub use labels::*;
pub use tenant::*;
