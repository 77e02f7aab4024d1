use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use podcastr::api::{ApiConfig, EpisodesApi};
use podcastr::http::RetryPolicy;
use podcastr::normalize_with_locale;
use podcastr::pages::{GenerateOptions, GenerateReport, PageOutcome, generate};
use podcastr::render::{DescriptionPolicy, render_detail, render_json};

use crate::cli::{Cli, Command, GlobalArgs};
use crate::paths::default_pages_dir;

const RETRY_DELAY: Duration = Duration::from_millis(500);

pub fn run(cli: Cli) -> Result<()> {
    let api = EpisodesApi::new(&api_config(&cli.global));

    match cli.command {
        Command::Paths { limit } => run_paths(&api, limit),
        Command::Show {
            id,
            json,
            trust_description,
        } => run_show(
            &api,
            &cli.global,
            &id,
            json,
            DescriptionPolicy::from_trust_flag(trust_description),
        ),
        Command::Generate {
            ids,
            out,
            limit,
            revalidate_secs,
            force,
            trust_description,
        } => {
            let out_dir = match out {
                Some(dir) => dir,
                None => default_pages_dir()?,
            };
            let options = GenerateOptions {
                out_dir,
                path_limit: limit,
                revalidate_secs,
                force,
                locale: cli.global.locale,
                description: DescriptionPolicy::from_trust_flag(trust_description),
            };
            run_generate(&api, &ids, &options)
        }
    }
}

fn api_config(global: &GlobalArgs) -> ApiConfig {
    let timeout = Duration::from_secs(global.timeout_secs.max(1));
    ApiConfig {
        base_url: global.api_url.clone(),
        retry: RetryPolicy {
            connect_timeout: timeout,
            read_timeout: timeout,
            attempts: global.retries.max(1),
            retry_delay: RETRY_DELAY,
        },
    }
}

fn run_paths(api: &EpisodesApi, limit: usize) -> Result<()> {
    let episodes = api
        .latest_episodes(limit)
        .context("failed to list latest episodes")?;
    for episode in episodes {
        println!("{}", episode.id);
    }
    Ok(())
}

fn run_show(
    api: &EpisodesApi,
    global: &GlobalArgs,
    id: &str,
    json: bool,
    policy: DescriptionPolicy,
) -> Result<()> {
    let raw = match api.episode(id) {
        Ok(raw) => raw,
        Err(err) if err.is_not_found() => bail!("episode '{id}' not found"),
        Err(err) => return Err(err).with_context(|| format!("failed to fetch episode '{id}'")),
    };
    let view = normalize_with_locale(&raw, global.locale)
        .with_context(|| format!("episode '{id}' has malformed data"))?;

    if json {
        let value = render_json(&view, policy)?;
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print!("{}", render_detail(&view, policy));
    }
    Ok(())
}

fn run_generate(api: &EpisodesApi, ids: &[String], options: &GenerateOptions) -> Result<()> {
    let report = generate(api, ids, options, Utc::now()).context("failed to enumerate episodes")?;

    if report.entries.is_empty() {
        println!("No episodes to generate.");
        return Ok(());
    }

    println!("{:<48} {:<10} {}", "EPISODE", "STATUS", "DETAIL");
    for (id, outcome) in &report.entries {
        let (status, detail) = outcome_columns(outcome);
        println!("{:<48} {:<10} {}", truncate(id, 48), status, detail);
    }
    println!("\n{}", summary_line(&report));

    if report.written() + report.fresh() == 0 {
        bail!("no pages could be generated");
    }
    Ok(())
}

fn outcome_columns(outcome: &PageOutcome) -> (&'static str, String) {
    match outcome {
        PageOutcome::Written(path) => ("written", path.display().to_string()),
        PageOutcome::Fresh => ("fresh", String::new()),
        PageOutcome::NotFound => ("missing", "episode not found".to_string()),
        PageOutcome::Failed(reason) => ("failed", reason.clone()),
    }
}

fn summary_line(report: &GenerateReport) -> String {
    format!(
        "{} written, {} fresh, {} failed",
        report.written(),
        report.fresh(),
        report.failed()
    )
}

fn truncate(s: &str, max: usize) -> String {
    let mut out = s.to_string();
    if out.chars().count() > max {
        out = out.chars().take(max.saturating_sub(3)).collect::<String>() + "...";
    }
    out
}
