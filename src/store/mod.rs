//! 集合状态存储
//!
//! 每类实体一个存储对象，构造时注入网关与提示接收方。

pub mod notice;
pub mod question_store;
pub mod state;
pub mod subject_store;

pub use notice::{Notice, NoticeLevel, NoticeQueue, Notifier, TracingNotifier};
pub use question_store::{BatchResult, QuestionFetch, QuestionStore};
pub use state::{CollectionSnapshot, FetchOutcome};
pub use subject_store::{SubjectFetch, SubjectStore};
