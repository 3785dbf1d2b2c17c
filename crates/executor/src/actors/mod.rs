pub mod supervisor;

pub use supervisor::{Supervisor, SupervisorSettings};
