// Adapters layer: concrete implementations of the domain ports (storage, mesh toolkit).

pub mod storage;
pub mod toolkit;
pub mod vtu;

pub use storage::LocalStorage;
pub use toolkit::VtkToolkit;
