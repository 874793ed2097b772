// Database layer module

pub mod pool;
pub mod redis;
pub mod repositories;

pub use self::pool::DbPool;
pub use self::redis::RedisPool;
