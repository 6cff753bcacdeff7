//! Role prompt storage.
//!
//! Provides [`JsonPromptStore`], which loads the role id → system instruction
//! map from a JSON file and seeds it with the built-in personas on first run.

mod json_store;

pub use json_store::{JsonPromptStore, PromptStoreError};
