//! 数据访问模块

pub mod user_repository;

pub use user_repository::UserRepository;
