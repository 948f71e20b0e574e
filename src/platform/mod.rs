//! Renderings consumed by deployment platforms.
//!
//! - Cloud Build `secrets:` stanza built from the encrypted mapping (`cloudbuild`)
//! - Kubernetes Opaque `Secret` manifest from the decrypted mapping (`kube`)
//!
//! Both only produce YAML text; submitting it is left to the platform's
//! own tooling.

pub mod cloudbuild;
pub mod kube;
