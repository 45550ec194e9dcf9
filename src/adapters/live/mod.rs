//! Adapters that talk to the real system.

pub mod clock;
pub mod command;
pub mod filesystem;
pub mod id_gen;
pub mod registry;

pub use clock::SystemClock;
pub use command::ProcessRunner;
pub use filesystem::LocalFileSystem;
pub use id_gen::UuidGenerator;
pub use registry::HttpRegistry;
