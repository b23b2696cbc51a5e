// Question Bank Console library entry
// 题库管理控制台核心：远端集合网关、集合存储、单元格编辑状态、列绑定与浏览器编排。

pub mod browser;
pub mod columns;
pub mod config;
pub mod edit_state;
pub mod export;
pub mod gateway;
pub mod logging;
pub mod models;
pub mod session;
pub mod store;
pub mod test_utils;

pub use browser::{BrowserError, BrowserResult, CommitOutcome, FilterState, QuestionBrowser};
pub use config::ConsoleConfig;
pub use edit_state::{CellMode, EditState, EditableColumn};
pub use gateway::{GatewayError, GatewayResult, HttpGateway, QuestionGateway, SubjectGateway};
pub use store::{
    BatchResult, FetchOutcome, Notice, NoticeLevel, NoticeQueue, Notifier, QuestionFetch,
    QuestionStore, SubjectFetch, SubjectStore, TracingNotifier,
};
