pub mod postgres;
pub mod redis;

pub use self::postgres::PostgresPool;
pub use self::redis::RedisPool;
