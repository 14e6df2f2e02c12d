pub mod bootstrap;
pub mod reconciler;
pub mod store;

pub use reconciler::Reconciler;
pub use store::StateStore;
