//! 科目集合存储

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::notice::Notifier;
use super::state::{Collection, CollectionSnapshot, FetchOutcome};
use crate::gateway::{GatewayError, GatewayResult, SubjectGateway};
use crate::models::{
    CreateSubjectParams, Facet, Pagination, Subject, SubjectFilters, UpdateSubjectParams,
};

/// 科目拉取参数，未设置的字段沿用上次的值
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubjectFetch {
    pub search: Option<String>,
    pub enabled: Option<Facet<bool>>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl SubjectFetch {
    fn merge_over(
        self,
        filters: &SubjectFilters,
        pagination: &Pagination,
    ) -> (SubjectFilters, Pagination) {
        let merged = SubjectFilters {
            search: self.search.unwrap_or_else(|| filters.search.clone()),
            enabled: self.enabled.unwrap_or_else(|| filters.enabled.clone()),
        };
        let paging = Pagination {
            total: pagination.total,
            page: self.page.unwrap_or(pagination.page).max(1),
            limit: self.page_size.unwrap_or(pagination.limit).max(1),
        };
        (merged, paging)
    }
}

pub struct SubjectStore {
    gateway: Arc<dyn SubjectGateway>,
    notifier: Arc<dyn Notifier>,
    collection: Collection<Subject, SubjectFilters>,
}

impl SubjectStore {
    pub fn new(
        gateway: Arc<dyn SubjectGateway>,
        notifier: Arc<dyn Notifier>,
        page_size: u32,
    ) -> Self {
        Self {
            gateway,
            notifier,
            collection: Collection::new(SubjectFilters::default(), page_size.max(1)),
        }
    }

    pub fn snapshot(&self) -> CollectionSnapshot<Subject, SubjectFilters> {
        self.collection.snapshot()
    }

    pub fn items(&self) -> Vec<Subject> {
        self.collection.items()
    }

    pub fn find(&self, id: &str) -> Option<Subject> {
        self.collection.items().into_iter().find(|s| s.id == id)
    }

    pub fn is_loading(&self) -> bool {
        self.collection.is_loading()
    }

    pub async fn fetch(&self, params: SubjectFetch) -> GatewayResult<FetchOutcome> {
        let ticket = self
            .collection
            .begin(|filters, pagination| params.merge_over(filters, pagination));
        let generation = ticket.generation;

        let result = self
            .gateway
            .list_subjects(&ticket.filters, ticket.pagination.page, ticket.pagination.limit)
            .await;

        match result {
            Ok(page) => {
                let total = page.subjects.len() as u64;
                // 服务端未返回分页时按单页处理
                let pagination = page.pagination.unwrap_or(Pagination {
                    total,
                    page: ticket.pagination.page,
                    limit: ticket.pagination.limit,
                });
                Ok(self
                    .collection
                    .complete::<GatewayError>(ticket, Ok((page.subjects, pagination))))
            }
            Err(e) => match self.collection.complete(ticket, Err(&e)) {
                FetchOutcome::Superseded => {
                    debug!("[SubjectStore] dropped stale fetch failure gen={}", generation);
                    Ok(FetchOutcome::Superseded)
                }
                FetchOutcome::Applied => {
                    warn!("[SubjectStore] fetch failed: {}", e);
                    self.notifier
                        .error(&format!("获取科目列表失败：{}", e.user_message()));
                    Err(e)
                }
            },
        }
    }

    /// 关键词搜索，回到第一页
    pub async fn search(&self, keyword: &str) -> GatewayResult<FetchOutcome> {
        self.fetch(SubjectFetch {
            search: Some(keyword.trim().to_string()),
            page: Some(1),
            ..Default::default()
        })
        .await
    }

    async fn refetch(&self) {
        let _ = self.fetch(SubjectFetch::default()).await;
    }

    pub async fn detail(&self, id: &str) -> GatewayResult<Subject> {
        self.gateway.get_subject(id).await
    }

    pub async fn add(&self, params: CreateSubjectParams) -> GatewayResult<Subject> {
        if params.name.trim().is_empty() || params.code.trim().is_empty() {
            let message = "科目名称和代码不能为空".to_string();
            self.notifier.error(&message);
            return Err(GatewayError::Validation(message));
        }
        let result = self.gateway.create_subject(&params).await;
        match &result {
            Ok(subject) => {
                info!("[SubjectStore] Created subject id={} code={}", subject.id, subject.code);
                self.notifier.success("科目创建成功");
                self.refetch().await;
            }
            Err(e) => {
                warn!("[SubjectStore] create failed: {}", e);
                self.notifier
                    .error(&format!("创建科目失败：{}", e.user_message()));
            }
        }
        result
    }

    pub async fn edit(&self, id: &str, params: UpdateSubjectParams) -> GatewayResult<Subject> {
        let result = self.gateway.update_subject(id, &params).await;
        match &result {
            Ok(_) => {
                info!("[SubjectStore] Updated subject id={}", id);
                self.notifier.success("科目更新成功");
                self.refetch().await;
            }
            Err(e) => {
                warn!("[SubjectStore] update failed id={}: {}", id, e);
                self.notifier
                    .error(&format!("更新科目失败：{}", e.user_message()));
            }
        }
        result
    }

    pub async fn remove(&self, id: &str) -> GatewayResult<()> {
        let result = self.gateway.delete_subject(id).await;
        match &result {
            Ok(()) => {
                info!("[SubjectStore] Deleted subject id={}", id);
                self.notifier.success("科目删除成功");
                self.refetch().await;
            }
            Err(e) => {
                warn!("[SubjectStore] delete failed id={}: {}", id, e);
                self.notifier
                    .error(&format!("删除科目失败：{}", e.user_message()));
            }
        }
        result
    }
}
