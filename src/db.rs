pub mod profile_repo;
pub use profile_repo::ProfileRepository;
pub mod gear_repo;
pub use gear_repo::GearRepository;
pub mod history_repo;
pub use history_repo::HistoryRepository;
pub mod policy_repo;
pub use policy_repo::PolicyRepository;
pub mod rate_limit_repo;
pub use rate_limit_repo::RateLimitRepository;
pub mod runtime_config_repo;
pub use runtime_config_repo::RuntimeConfigRepository;
