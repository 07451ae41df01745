//! # CRD Generator
//!
//! Generates the Kubernetes CustomResourceDefinition YAML for the `Patch`
//! resource from the Rust type definitions.
//!
//! ## Usage
//!
//! ```bash
//! # Generate CRD YAML
//! cargo run --bin crdgen > config/crd/patch.yaml
//!
//! # Generate and apply directly
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use kube::core::CustomResourceExt;
use patch_controller::crd::Patch;

fn main() {
    let crd = Patch::crd();

    match serde_yaml::to_string(&crd) {
        Ok(yaml) => print!("{yaml}"),
        Err(err) => {
            eprintln!("Failed to serialize CRD to YAML: {err}");
            std::process::exit(1);
        }
    }
}
