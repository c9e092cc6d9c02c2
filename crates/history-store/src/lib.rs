pub mod long_history;
pub mod prices;
pub mod recorder;
pub mod repository;
pub mod store;

pub use long_history::LongHistorySource;
pub use prices::{load_price_map, PricePoint};
pub use recorder::{rebuild_history, record_reading};
pub use repository::{read_json, write_json_atomic, JsonFileRepository, MemoryRepository};
pub use store::{trailing_dates, HistoryStore};
