//! 集合快照与请求代次
//!
//! 每次拉取都领取一个递增代次，只有最新代次的结果会写回快照，
//! 旧请求晚到的结果被丢弃，加载标记也只由最新代次清除。
//! 部分参数的拉取以最近一次发出的请求为底合并，而不是以已显示的快照为底。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::models::Pagination;

/// 某一时刻的集合状态
#[derive(Debug, Clone)]
pub struct CollectionSnapshot<T, F> {
    pub items: Vec<T>,
    pub filters: F,
    pub pagination: Pagination,
    pub is_loading: bool,
}

/// 拉取凭据
#[derive(Debug, Clone, PartialEq)]
pub struct FetchTicket<F> {
    pub generation: u64,
    pub filters: F,
    pub pagination: Pagination,
}

/// 拉取结果是否写回
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    Superseded,
}

#[derive(Debug)]
struct CollectionInner<T, F> {
    shown: CollectionSnapshot<T, F>,
    /// 最近一次发出的筛选与分页
    requested: (F, Pagination),
}

#[derive(Debug)]
pub struct Collection<T, F> {
    inner: Mutex<CollectionInner<T, F>>,
    issued: AtomicU64,
}

impl<T: Clone, F: Clone> Collection<T, F> {
    pub fn new(filters: F, page_size: u32) -> Self {
        let pagination = Pagination::first_page(page_size);
        Self {
            inner: Mutex::new(CollectionInner {
                shown: CollectionSnapshot {
                    items: Vec::new(),
                    filters: filters.clone(),
                    pagination,
                    is_loading: false,
                },
                requested: (filters, pagination),
            }),
            issued: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CollectionInner<T, F>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> CollectionSnapshot<T, F> {
        self.lock().shown.clone()
    }

    pub fn items(&self) -> Vec<T> {
        self.lock().shown.items.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().shown.is_loading
    }

    /// 最近一次发出的筛选与分页
    pub fn requested(&self) -> (F, Pagination) {
        self.lock().requested.clone()
    }

    /// 以最近一次发出的请求为底合并出本次请求，置加载标记并领取代次
    pub fn begin(&self, merge: impl FnOnce(&F, &Pagination) -> (F, Pagination)) -> FetchTicket<F> {
        let mut guard = self.lock();
        let (filters, pagination) = merge(&guard.requested.0, &guard.requested.1);
        let generation = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        guard.requested = (filters.clone(), pagination);
        guard.shown.is_loading = true;
        FetchTicket {
            generation,
            filters,
            pagination,
        }
    }

    /// 写回拉取结果；失败时保留原有条目
    pub fn complete<E>(
        &self,
        ticket: FetchTicket<F>,
        result: Result<(Vec<T>, Pagination), &E>,
    ) -> FetchOutcome {
        let mut guard = self.lock();
        if ticket.generation != self.issued.load(Ordering::SeqCst) {
            return FetchOutcome::Superseded;
        }
        guard.shown.is_loading = false;
        if let Ok((items, pagination)) = result {
            guard.shown.items = items;
            guard.shown.filters = ticket.filters;
            guard.shown.pagination = pagination;
        }
        FetchOutcome::Applied
    }
}
