//! 远端集合访问接口
//!
//! 存储层只依赖这两个 trait，HTTP 实现与测试用内存实现都通过它们注入。

use async_trait::async_trait;

use super::error::GatewayResult;
use crate::models::{
    CreateSubjectParams, Question, QuestionFilters, QuestionPage, QuestionPayload, Subject,
    SubjectFilters, SubjectPage, UpdateSubjectParams,
};

/// 题目集合接口
#[async_trait]
pub trait QuestionGateway: Send + Sync {
    /// 后端名称（用于日志）
    fn provider_name(&self) -> &'static str;

    /// 按筛选条件分页查询题目
    async fn list_questions(
        &self,
        filters: &QuestionFilters,
        page: u32,
        page_size: u32,
    ) -> GatewayResult<QuestionPage>;

    async fn get_question(&self, id: &str) -> GatewayResult<Question>;

    async fn create_question(&self, payload: &QuestionPayload) -> GatewayResult<Question>;

    /// 整条替换题目的可写字段
    async fn update_question(&self, id: &str, payload: &QuestionPayload)
        -> GatewayResult<Question>;

    async fn delete_question(&self, id: &str) -> GatewayResult<()>;

    async fn batch_delete_questions(&self, ids: &[String]) -> GatewayResult<()>;

    /// 导出符合筛选条件的题目，返回文件内容
    async fn export_questions(&self, filters: &QuestionFilters) -> GatewayResult<Vec<u8>>;
}

/// 科目集合接口
#[async_trait]
pub trait SubjectGateway: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn list_subjects(
        &self,
        filters: &SubjectFilters,
        page: u32,
        page_size: u32,
    ) -> GatewayResult<SubjectPage>;

    async fn get_subject(&self, id: &str) -> GatewayResult<Subject>;

    async fn create_subject(&self, params: &CreateSubjectParams) -> GatewayResult<Subject>;

    async fn update_subject(&self, id: &str, params: &UpdateSubjectParams)
        -> GatewayResult<Subject>;

    async fn delete_subject(&self, id: &str) -> GatewayResult<()>;
}
