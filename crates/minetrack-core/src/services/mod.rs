//! Services shared across clients.

mod store;

pub use store::LocalStore;
