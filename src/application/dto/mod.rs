//! Data transfer objects for the application layer.

mod prefetch_dto;
mod slot_dto;

pub use prefetch_dto::{PrefetchOutcome, PrefetchReport};
pub use slot_dto::SlotRequest;
