//! Sea-ORM entities for the persistent media tier

pub mod media;
pub mod snapshots;

pub use media::Entity as Media;
pub use snapshots::Entity as Snapshots;
