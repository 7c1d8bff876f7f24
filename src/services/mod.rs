pub mod events;
pub mod pool;
pub mod recommend;

pub use self::events::EventService;
pub use self::pool::{TaskError, TaskHandle, WorkerPool};
pub use self::recommend::Recommender;
