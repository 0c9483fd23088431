/// This module represents the main uses cases of a synchronization
/// with a submodule foreach one of them.
pub mod cancel;
pub mod del;
pub mod edit;
pub mod export;
pub mod issues;
pub mod runs;
pub mod show;
pub mod sync;
pub mod validate;
