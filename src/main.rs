use std::path::Path;

use serde::Serialize;

use plan_review::{Error, PageImages, ReviewSession, ReviewSummary, config};

#[derive(Debug, Serialize)]
struct PageReport {
    page: u32,
    #[serde(flatten)]
    summary: ReviewSummary,
}

#[derive(Debug, Serialize)]
struct Report {
    load: plan_review::session::LoadReport,
    overall: ReviewSummary,
    pages: Vec<PageReport>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Error> {
    let args: Vec<String> = std::env::args().collect();
    let Some(detections_path) = args.get(1) else {
        return Err(Error::invalid_argument("usage: plan_review <detections.json>"));
    };

    let config = config::load_config(std::env::var_os("PLAN_REVIEW_CONFIG").as_deref().map(Path::new));
    let text = std::fs::read_to_string(detections_path)?;

    let mut session = ReviewSession::new(config, PageImages::default());
    let load = session.load_detections(text)?;

    let pages = session
        .store()
        .pages()
        .into_iter()
        .map(|page| PageReport {
            page,
            summary: session.page_summary(page),
        })
        .collect();

    let report = Report {
        load,
        overall: session.summary(),
        pages,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
