pub mod config;
pub mod error;
pub mod models;

// ============ 重新导出常用类型 ============

// 错误处理
pub use error::{GatewayError, Outcome, Result as GatewayResult};

// 配置相关
pub use config::{AppConfig, BackendMode};

// 操作与响应约定
pub use models::{FailureConvention, Operation};
