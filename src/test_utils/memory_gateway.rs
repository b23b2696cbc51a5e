use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

use crate::gateway::{GatewayError, GatewayResult, QuestionGateway, SubjectGateway};
use crate::models::{
    CreateSubjectParams, Difficulty, Pagination, Question, QuestionFilters, QuestionPage,
    QuestionPayload, QuestionType, Subject, SubjectFilters, SubjectPage, UpdateSubjectParams,
};

/// 网关操作种类，用于注入失败
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    ListQuestions,
    GetQuestion,
    CreateQuestion,
    UpdateQuestion,
    DeleteQuestion,
    BatchDeleteQuestions,
    ExportQuestions,
    ListSubjects,
    GetSubject,
    CreateSubject,
    UpdateSubject,
    DeleteSubject,
}

/// 已记录的调用
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    ListQuestions {
        filters: QuestionFilters,
        page: u32,
        page_size: u32,
    },
    GetQuestion(String),
    CreateQuestion(QuestionPayload),
    UpdateQuestion {
        id: String,
        payload: QuestionPayload,
    },
    DeleteQuestion(String),
    BatchDeleteQuestions(Vec<String>),
    ExportQuestions(QuestionFilters),
    ListSubjects {
        filters: SubjectFilters,
        page: u32,
        page_size: u32,
    },
    GetSubject(String),
    CreateSubject(CreateSubjectParams),
    UpdateSubject {
        id: String,
        params: UpdateSubjectParams,
    },
    DeleteSubject(String),
}

#[derive(Default)]
struct Inner {
    questions: Vec<Question>,
    subjects: Vec<Subject>,
    calls: Vec<GatewayCall>,
    failures: HashMap<GatewayOp, VecDeque<GatewayError>>,
    row_failures: HashMap<String, GatewayError>,
    list_gates: HashMap<u32, Arc<Notify>>,
    next_id: u64,
    export_bytes: Vec<u8>,
}

#[derive(Default)]
pub struct MemoryGateway {
    inner: Mutex<Inner>,
}

fn paginate<T: Clone>(items: &[T], page: u32, page_size: u32) -> (Vec<T>, Pagination) {
    let page = page.max(1);
    let size = page_size.max(1);
    let start = ((page - 1) as usize).saturating_mul(size as usize);
    let slice = items
        .iter()
        .skip(start)
        .take(size as usize)
        .cloned()
        .collect();
    (
        slice,
        Pagination {
            total: items.len() as u64,
            page,
            limit: size,
        },
    )
}

fn matches_filters(q: &Question, filters: &QuestionFilters) -> bool {
    if let Some(scope) = &filters.scope_id {
        if &q.subject_id != scope {
            return false;
        }
    }
    let search = filters.search.trim().to_lowercase();
    if !search.is_empty()
        && !q.body_markdown.to_lowercase().contains(&search)
        && !q.tags.iter().any(|t| t.to_lowercase().contains(&search))
    {
        return false;
    }
    filters.kind.value().map_or(true, |k| *k == q.kind)
        && filters.difficulty.value().map_or(true, |d| *d == q.difficulty)
        && filters.has_audio.value().map_or(true, |a| *a == q.has_audio())
        && filters.enabled.value().map_or(true, |e| *e == q.enabled)
}

fn apply_payload(q: &mut Question, payload: &QuestionPayload) {
    q.kind = payload.kind;
    q.difficulty = payload.difficulty;
    q.subject_id = payload.subject_id.clone();
    q.tags = payload.tags.clone();
    q.body_markdown = payload.body_markdown.clone();
    q.answer_short_markdown = payload.answer_short_markdown.clone();
    q.answer_detail_markdown = payload.answer_detail_markdown.clone();
    q.answer_analysis_markdown = payload.answer_analysis_markdown.clone();
    q.options = payload.options.clone();
    q.attachments = (!payload.attachments.is_empty()).then(|| payload.attachments.clone());
    q.enabled = payload.enabled;
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn with_questions(self, questions: Vec<Question>) -> Self {
        self.lock().questions = questions;
        self
    }

    pub fn with_subjects(self, subjects: Vec<Subject>) -> Self {
        self.lock().subjects = subjects;
        self
    }

    pub fn with_export_bytes(self, bytes: Vec<u8>) -> Self {
        self.lock().export_bytes = bytes;
        self
    }

    /// 下一次 `op` 调用返回 `err`
    pub fn fail_next(&self, op: GatewayOp, err: GatewayError) {
        self.lock().failures.entry(op).or_default().push_back(err);
    }

    /// 对指定题目的更新/删除始终失败
    pub fn fail_row(&self, id: &str, err: GatewayError) {
        self.lock().row_failures.insert(id.to_string(), err);
    }

    /// 挂起下一次第 `page` 页的题目列表请求，直到返回的 `Notify` 被通知
    ///
    /// 调用在挂起前已被记录。
    pub fn gate_list_page(&self, page: u32) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.lock().list_gates.insert(page, gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn list_calls(&self) -> Vec<(QuestionFilters, u32, u32)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                GatewayCall::ListQuestions {
                    filters,
                    page,
                    page_size,
                } => Some((filters, page, page_size)),
                _ => None,
            })
            .collect()
    }

    pub fn update_calls(&self) -> Vec<(String, QuestionPayload)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                GatewayCall::UpdateQuestion { id, payload } => Some((id, payload)),
                _ => None,
            })
            .collect()
    }

    pub fn question(&self, id: &str) -> Option<Question> {
        self.lock().questions.iter().find(|q| q.id == id).cloned()
    }

    fn record(&self, call: GatewayCall, op: GatewayOp) -> GatewayResult<()> {
        let mut inner = self.lock();
        inner.calls.push(call);
        match inner.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn row_failure(&self, id: &str) -> GatewayResult<()> {
        match self.lock().row_failures.get(id) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl QuestionGateway for MemoryGateway {
    fn provider_name(&self) -> &'static str {
        "memory"
    }

    async fn list_questions(
        &self,
        filters: &QuestionFilters,
        page: u32,
        page_size: u32,
    ) -> GatewayResult<QuestionPage> {
        let injected = self.record(
            GatewayCall::ListQuestions {
                filters: filters.clone(),
                page,
                page_size,
            },
            GatewayOp::ListQuestions,
        );
        let gate = self.lock().list_gates.remove(&page);
        if let Some(gate) = gate {
            gate.notified().await;
        }
        injected?;

        let inner = self.lock();
        let matching: Vec<Question> = inner
            .questions
            .iter()
            .filter(|q| matches_filters(q, filters))
            .cloned()
            .collect();
        let (questions, pagination) = paginate(&matching, page, page_size);
        Ok(QuestionPage {
            questions,
            pagination,
        })
    }

    async fn get_question(&self, id: &str) -> GatewayResult<Question> {
        self.record(GatewayCall::GetQuestion(id.to_string()), GatewayOp::GetQuestion)?;
        self.question(id)
            .ok_or_else(|| GatewayError::NotFound(format!("question {}", id)))
    }

    async fn create_question(&self, payload: &QuestionPayload) -> GatewayResult<Question> {
        self.record(
            GatewayCall::CreateQuestion(payload.clone()),
            GatewayOp::CreateQuestion,
        )?;
        let mut inner = self.lock();
        inner.next_id += 1;
        let mut question = sample_question(&format!("new-{}", inner.next_id), &payload.subject_id);
        apply_payload(&mut question, payload);
        inner.questions.push(question.clone());
        Ok(question)
    }

    async fn update_question(
        &self,
        id: &str,
        payload: &QuestionPayload,
    ) -> GatewayResult<Question> {
        self.record(
            GatewayCall::UpdateQuestion {
                id: id.to_string(),
                payload: payload.clone(),
            },
            GatewayOp::UpdateQuestion,
        )?;
        self.row_failure(id)?;
        let mut inner = self.lock();
        let question = inner
            .questions
            .iter_mut()
            .find(|q| q.id == id)
            .ok_or_else(|| GatewayError::NotFound(format!("question {}", id)))?;
        apply_payload(question, payload);
        Ok(question.clone())
    }

    async fn delete_question(&self, id: &str) -> GatewayResult<()> {
        self.record(
            GatewayCall::DeleteQuestion(id.to_string()),
            GatewayOp::DeleteQuestion,
        )?;
        self.row_failure(id)?;
        let mut inner = self.lock();
        let before = inner.questions.len();
        inner.questions.retain(|q| q.id != id);
        if inner.questions.len() == before {
            return Err(GatewayError::NotFound(format!("question {}", id)));
        }
        Ok(())
    }

    async fn batch_delete_questions(&self, ids: &[String]) -> GatewayResult<()> {
        self.record(
            GatewayCall::BatchDeleteQuestions(ids.to_vec()),
            GatewayOp::BatchDeleteQuestions,
        )?;
        self.lock().questions.retain(|q| !ids.contains(&q.id));
        Ok(())
    }

    async fn export_questions(&self, filters: &QuestionFilters) -> GatewayResult<Vec<u8>> {
        self.record(
            GatewayCall::ExportQuestions(filters.clone()),
            GatewayOp::ExportQuestions,
        )?;
        Ok(self.lock().export_bytes.clone())
    }
}

#[async_trait]
impl SubjectGateway for MemoryGateway {
    fn provider_name(&self) -> &'static str {
        "memory"
    }

    async fn list_subjects(
        &self,
        filters: &SubjectFilters,
        page: u32,
        page_size: u32,
    ) -> GatewayResult<SubjectPage> {
        self.record(
            GatewayCall::ListSubjects {
                filters: filters.clone(),
                page,
                page_size,
            },
            GatewayOp::ListSubjects,
        )?;
        let keyword = filters.search.trim().to_lowercase();
        let inner = self.lock();
        let matching: Vec<Subject> = inner
            .subjects
            .iter()
            .filter(|s| {
                keyword.is_empty()
                    || s.name.to_lowercase().contains(&keyword)
                    || s.code.to_lowercase().contains(&keyword)
            })
            .filter(|s| filters.enabled.value().map_or(true, |e| *e == s.is_enabled))
            .cloned()
            .collect();
        let (subjects, pagination) = paginate(&matching, page, page_size);
        Ok(SubjectPage {
            subjects,
            pagination: Some(pagination),
        })
    }

    async fn get_subject(&self, id: &str) -> GatewayResult<Subject> {
        self.record(GatewayCall::GetSubject(id.to_string()), GatewayOp::GetSubject)?;
        self.lock()
            .subjects
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("subject {}", id)))
    }

    async fn create_subject(&self, params: &CreateSubjectParams) -> GatewayResult<Subject> {
        self.record(
            GatewayCall::CreateSubject(params.clone()),
            GatewayOp::CreateSubject,
        )?;
        let mut inner = self.lock();
        if inner.subjects.iter().any(|s| s.code == params.code) {
            return Err(GatewayError::Validation("科目代码已存在".to_string()));
        }
        inner.next_id += 1;
        let mut subject = sample_subject(&format!("sub-{}", inner.next_id), &params.code);
        subject.name = params.name.clone();
        subject.description = params.description.clone();
        subject.is_enabled = params.is_enabled.unwrap_or(true);
        inner.subjects.push(subject.clone());
        Ok(subject)
    }

    async fn update_subject(
        &self,
        id: &str,
        params: &UpdateSubjectParams,
    ) -> GatewayResult<Subject> {
        self.record(
            GatewayCall::UpdateSubject {
                id: id.to_string(),
                params: params.clone(),
            },
            GatewayOp::UpdateSubject,
        )?;
        let mut inner = self.lock();
        let subject = inner
            .subjects
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| GatewayError::NotFound(format!("subject {}", id)))?;
        if let Some(name) = &params.name {
            subject.name = name.clone();
        }
        if let Some(description) = &params.description {
            subject.description = Some(description.clone());
        }
        if let Some(enabled) = params.is_enabled {
            subject.is_enabled = enabled;
        }
        Ok(subject.clone())
    }

    async fn delete_subject(&self, id: &str) -> GatewayResult<()> {
        self.record(GatewayCall::DeleteSubject(id.to_string()), GatewayOp::DeleteSubject)?;
        let mut inner = self.lock();
        let before = inner.subjects.len();
        inner.subjects.retain(|s| s.id != id);
        if inner.subjects.len() == before {
            return Err(GatewayError::NotFound(format!("subject {}", id)));
        }
        Ok(())
    }
}

/// 构造一道单选题
pub fn sample_question(id: &str, subject_id: &str) -> Question {
    Question {
        id: id.to_string(),
        kind: QuestionType::Single,
        difficulty: Difficulty::Medium,
        subject_id: subject_id.to_string(),
        tags: vec!["基础".to_string()],
        body_markdown: format!("题目 {}", id),
        answer_short_markdown: Some("A".to_string()),
        answer_detail_markdown: Some("详解".to_string()),
        answer_analysis_markdown: None,
        options: Some(vec![
            crate::models::QuestionOption {
                id: format!("{}-a", id),
                content: "选项 A".to_string(),
                is_correct: true,
            },
            crate::models::QuestionOption {
                id: format!("{}-b", id),
                content: "选项 B".to_string(),
                is_correct: false,
            },
        ]),
        attachments: None,
        enabled: true,
        created_at: Some("2024-01-01T00:00:00Z".to_string()),
        updated_at: Some("2024-01-02T00:00:00Z".to_string()),
        legacy_created_at: None,
        legacy_updated_at: None,
    }
}

pub fn sample_subject(id: &str, code: &str) -> Subject {
    Subject {
        id: id.to_string(),
        name: format!("科目 {}", code),
        code: code.to_string(),
        description: None,
        tags: None,
        user_tags: None,
        difficulty_levels: None,
        is_enabled: true,
        created_at: Some("2024-01-01T00:00:00Z".to_string()),
        updated_at: None,
    }
}
