//! MySQL access for irhabi services: the pool facade, the list-endpoint
//! request query and its SQL rendering, and query logging.

pub mod condition;
pub mod config;
pub mod database;
pub mod query_log;
pub mod request_query;
pub mod users;

pub use condition::{CondValue, Condition, Lookup, Operator};
pub use config::DatabaseConfig;
pub use database::{Database, Page};
pub use request_query::{MAX_PER_PAGE, RequestQuery};
pub use users::{NewUser, User, UserRepository, UserStore};
