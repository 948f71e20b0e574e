pub mod cloudbuild;
pub mod completions;
pub mod decrypt;
pub mod encrypt;
pub mod init;
pub mod kube;
pub mod secrets_add;
pub mod secrets_export;
pub mod secrets_get;
pub mod secrets_import;
pub mod secrets_list;
pub mod secrets_remove;
