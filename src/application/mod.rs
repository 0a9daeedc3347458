pub mod bootstrap;
pub mod controller;
pub mod presets;
pub mod runtime;
pub mod state_sync;
pub mod tag_cache;
#[cfg(test)]
pub mod test_support;
