// 命令行入口：加载第一个（或参数指定代码的）科目，打印第一页题目。

use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};

use question_bank_console_lib::columns::question_columns;
use question_bank_console_lib::session::{FileSessionStore, SessionSource, StaticSession};
use question_bank_console_lib::{
    logging, ConsoleConfig, HttpGateway, NoticeLevel, NoticeQueue, Notifier, QuestionBrowser,
    QuestionGateway, QuestionStore, SubjectGateway, SubjectStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = ConsoleConfig::from_env_and_file()?;
    logging::init_tracing(&cfg.log_filter);

    let session: Arc<dyn SessionSource> = match &cfg.session_file {
        Some(path) => Arc::new(FileSessionStore::new(path)),
        None => Arc::new(StaticSession::anonymous()),
    };
    let http = Arc::new(
        HttpGateway::from_config(&cfg, session).context("failed to build HTTP gateway")?,
    );
    let question_gateway: Arc<dyn QuestionGateway> = http.clone();
    let subject_gateway: Arc<dyn SubjectGateway> = http;

    let notices = Arc::new(NoticeQueue::new());
    let notifier: Arc<dyn Notifier> = notices.clone();
    let questions = Arc::new(QuestionStore::new(
        question_gateway,
        notifier.clone(),
        cfg.page_size,
    ));
    let subjects = Arc::new(SubjectStore::new(subject_gateway, notifier, cfg.page_size));
    let mut browser = QuestionBrowser::new(questions.clone(), subjects.clone(), cfg.display_offset());

    info!("[Console] loading subjects from {}", cfg.api_base_url);
    if let Err(e) = browser.load_scopes().await {
        warn!("[Console] failed to load subjects: {}", e);
    }

    if let Some(code) = std::env::args().nth(1) {
        match subjects.items().into_iter().find(|s| s.code == code) {
            Some(subject) => {
                browser.select_scope(&subject.id).await?;
            }
            None => warn!("[Console] no subject with code {}", code),
        }
    }

    print_table(&browser);

    for notice in notices.drain() {
        match notice.level {
            NoticeLevel::Success => eprintln!("✓ {}", notice.message),
            NoticeLevel::Error => eprintln!("✗ {}", notice.message),
        }
    }
    Ok(())
}

fn print_table(browser: &QuestionBrowser) {
    let Some(scope) = browser.active_scope() else {
        println!("(没有可用的科目)");
        return;
    };
    let subject = browser.subjects().find(scope);
    let snapshot = browser.questions().snapshot();
    println!(
        "{}：共 {} 题，第 {} 页（每页 {}）",
        subject.map(|s| s.name).unwrap_or_else(|| scope.to_string()),
        snapshot.pagination.total,
        snapshot.pagination.page,
        snapshot.pagination.limit
    );

    let columns = question_columns();
    let header: Vec<&str> = columns.iter().map(|c| c.title).collect();
    println!("{}", header.join(" | "));
    for row in browser.rows() {
        let cells: Vec<String> = row
            .cells
            .iter()
            .map(|(_, cell)| truncate(&cell.plain_text(), 24))
            .collect();
        println!("{}", cells.join(" | "));
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    let single_line = text.replace('\n', " ");
    if single_line.chars().count() <= max_chars {
        return single_line;
    }
    let mut out: String = single_line.chars().take(max_chars).collect();
    out.push('…');
    out
}
