//! Prints the Tenant CustomResourceDefinition as YAML.
//!
//! Usage: `cargo run -p crds --bin crdgen > config/crd/tenant.yaml`

use crds::Tenant;
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&Tenant::crd())?);
    Ok(())
}
