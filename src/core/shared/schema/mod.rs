pub mod core;
pub use self::core::*;

pub mod crm;
pub use self::crm::*;

pub mod people;
pub use self::people::*;

pub mod project;
pub use self::project::*;
