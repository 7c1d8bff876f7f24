pub mod catalog;
pub mod event;
pub mod response;
pub mod user;

pub use catalog::RawCatalogResponse;
pub use event::{normalize_response, CategoryRef, EventRecord, NormalizedEvent};
pub use response::ResponseMessage;
pub use user::User;
