pub mod api;
pub mod app;
pub mod commands;
pub mod pipeline;
pub mod reconciler;
pub mod sessions;
pub mod state;
pub mod store;
pub mod util;
pub mod view;

#[cfg(test)]
mod test_support;
