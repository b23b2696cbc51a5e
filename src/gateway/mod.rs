//! 远端集合网关
//!
//! - `traits`: 存储层依赖的题目/科目集合接口
//! - `http`: 基于 reqwest 的实现
//! - `error`: 统一错误分类

pub mod error;
pub mod http;
pub mod traits;

pub use error::{GatewayError, GatewayResult};
pub use http::HttpGateway;
pub use traits::{QuestionGateway, SubjectGateway};
