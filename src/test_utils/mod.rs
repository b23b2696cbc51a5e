//! 测试辅助
//!
//! `MemoryGateway` 是题目/科目网关的内存实现，记录每次调用，支持注入失败，
//! 并可挂起指定页的列表请求以模拟乱序返回。

mod memory_gateway;

pub use memory_gateway::{sample_question, sample_subject, GatewayCall, GatewayOp, MemoryGateway};
