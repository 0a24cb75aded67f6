//! Spyglass CLI - a GitHub issues dashboard.

use chrono::Utc;
use clap::Parser;
use std::process;

use spyglass::catalog::{self, CatalogSource, DEFAULT_OWNER};
use spyglass::cli::{Cli, Commands, IssuesArgs, TokenCommands};
use spyglass::engine::Engine;
use spyglass::events::{Action, Session};
use spyglass::filters::{AssigneeFilter, FilterState, LabelFilter, StateFilter};
use spyglass::github::GithubClient;
use spyglass::models::{Issue, SortKey, ViewMode};
use spyglass::ratelimit::RateLimit;
use spyglass::store::Store;
use spyglass::view::DEFAULT_PAGE_SIZE;
use spyglass::{Error, Result};

fn main() {
    // Logs go to stderr so stdout stays pipeable
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let owner = cli.owner.clone().unwrap_or_else(|| DEFAULT_OWNER.to_string());
    let store = Store::open_default(&owner)?;

    // Token precedence: flag/env > stored
    let token = match &cli.token {
        Some(token) => Some(token.clone()),
        None => store.token()?,
    };
    let source = cli
        .catalog
        .as_deref()
        .map(CatalogSource::from_arg)
        .unwrap_or_else(|| CatalogSource::File("repos.csv".into()));

    match cli.command.unwrap_or(Commands::Issues(IssuesArgs::default())) {
        Commands::Issues(args) => {
            let client = GithubClient::new(token);
            let engine = Engine::new(client, store, &owner, source);
            run_issues(engine, cli.json, args)
        }
        Commands::Repos => {
            let client = GithubClient::new(token);
            run_repos(client, store, &owner, &source, cli.json)
        }
        Commands::Show { repo, number } => {
            let client = GithubClient::new(token);
            let engine = Engine::new(client, store, &owner, source);
            run_show(engine, cli.json, repo, number)
        }
        Commands::Token { command } => run_token(store, command),
        Commands::View { mode } => run_view(store, mode),
        Commands::RateLimit => run_rate_limit(&store, cli.json),
    }
}

/// Build the requested filter set from CLI flags. `None` when nothing was
/// requested, so the snapshot's filters can be restored instead.
fn requested_filters(args: &IssuesArgs) -> Result<Option<FilterState>> {
    let mut filters = args
        .from_link
        .as_deref()
        .map(FilterState::from_fragment)
        .unwrap_or_default();
    let mut explicit = args.from_link.is_some();

    if let Some(repo) = &args.repo {
        filters.repo = repo.clone();
        explicit = true;
    }
    if let Some(state) = &args.state {
        filters.state = StateFilter::from_str(state)
            .ok_or_else(|| Error::InvalidInput(format!("unknown state filter: {}", state)))?;
        explicit = true;
    }
    if let Some(assignee) = &args.assignee {
        filters.assignee = AssigneeFilter::from_str(assignee);
        explicit = true;
    }
    if let Some(label) = &args.label {
        filters.label = LabelFilter::from_str(label);
        explicit = true;
    }
    if let Some(search) = &args.search {
        filters.search = search.trim().to_string();
        explicit = true;
    }
    if let Some(sort) = &args.sort {
        filters.sort = SortKey::from_str(sort)
            .ok_or_else(|| Error::InvalidInput(format!("unknown sort key: {}", sort)))?;
        explicit = true;
    }

    Ok(explicit.then_some(filters))
}

fn run_issues(engine: Engine, json: bool, args: IssuesArgs) -> Result<()> {
    let filters = requested_filters(&args)?;

    // An explicit filter set has a fragment without any data load
    if args.link {
        if let Some(filters) = &filters {
            println!("{}", filters.to_fragment());
            return Ok(());
        }
    }

    let (mut session, report) = match Session::load(engine, filters, args.page_size, args.refresh)
    {
        Ok(loaded) => loaded,
        Err(e) => {
            // Total load failure suppresses the normal dashboard output
            eprintln!("Error: {}", e);
            eprintln!("Retry with `sg issues --refresh` once the network or catalog source is reachable.");
            process::exit(1);
        }
    };

    if args.link {
        println!("{}", session.fragment());
        return Ok(());
    }

    if args.page != 1 {
        session.apply(Action::SetPage(args.page))?;
    }

    // Transient per-repository notifications; the collected data still renders
    for (repo, error) in report.failures() {
        eprintln!("warning: {}: {}", repo, error);
    }
    print_rate_limit_warning(session.engine().rate_limit());

    if json {
        let payload = serde_json::json!({
            "owner": session.engine().owner(),
            "filters": session.filters(),
            "fragment": session.fragment(),
            "stats": session.stats(),
            "view": session.view(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    let mode = session.engine().store().view_mode()?;
    render_dashboard(&session, mode);
    Ok(())
}

fn render_dashboard(session: &Session, mode: ViewMode) {
    let stats = session.stats();
    println!(
        "{} repositories | {} open | {} closed | {} comments",
        stats.repository_count, stats.open_count, stats.closed_count, stats.comment_count
    );

    let view = session.view();
    if view.page_items.is_empty() {
        println!("No issues match the current filters.");
        return;
    }

    println!();
    for issue in &view.page_items {
        match mode {
            ViewMode::List => println!("{}", list_line(issue)),
            ViewMode::Card => print_card(issue),
        }
    }

    let (start, end) = view.shown_range();
    println!();
    println!(
        "Showing {}-{} of {} issues (page {}/{})",
        start, end, view.total_count, view.page, view.total_pages
    );

    let fragment = session.fragment();
    if !fragment.is_empty() {
        println!("Link: #{}", fragment);
    }
}

fn list_line(issue: &Issue) -> String {
    let mut line = format!(
        "#{:<6} {:<6} {:<14} {}",
        issue.number,
        issue.state.as_str(),
        issue.repository,
        issue.title
    );
    if issue.comment_count > 0 {
        line.push_str(&format!(" ({}c)", issue.comment_count));
    }
    if !issue.labels.is_empty() {
        let names: Vec<&str> = issue.labels.iter().map(|l| l.name.as_str()).collect();
        line.push_str(&format!(" [{}]", names.join(", ")));
    }
    line
}

fn print_card(issue: &Issue) {
    println!(
        "#{} {} [{}] {}",
        issue.number,
        issue.title,
        issue.state.as_str(),
        issue.repository
    );
    println!(
        "    by {} | updated {} | {} comments",
        issue.author.login,
        issue.updated_at.format("%Y-%m-%d %H:%M"),
        issue.comment_count
    );
    if !issue.labels.is_empty() || !issue.assignees.is_empty() {
        let labels: Vec<&str> = issue.labels.iter().map(|l| l.name.as_str()).collect();
        let assignees: Vec<&str> = issue.assignees.iter().map(|a| a.login.as_str()).collect();
        println!(
            "    labels: {} | assignees: {}",
            if labels.is_empty() { "-".to_string() } else { labels.join(", ") },
            if assignees.is_empty() { "-".to_string() } else { assignees.join(", ") },
        );
    }
    println!("    {}", issue.url);
    println!();
}

fn run_show(engine: Engine, json: bool, repo: String, number: u64) -> Result<()> {
    let filters = FilterState {
        repo: repo.clone(),
        state: StateFilter::All,
        ..Default::default()
    };
    let (mut session, _report) = Session::load(engine, Some(filters), DEFAULT_PAGE_SIZE, false)?;
    // Acquire the repository if the restored snapshot did not cover it
    session.apply(Action::SetRepository(repo.clone()))?;

    let issue = session
        .engine()
        .issues()
        .iter()
        .find(|i| i.repository == repo && i.number == number)
        .ok_or_else(|| Error::InvalidInput(format!("issue {}#{} not found", repo, number)))?;

    if json {
        println!("{}", serde_json::to_string_pretty(issue)?);
        return Ok(());
    }

    println!("#{} {} [{}]", issue.number, issue.title, issue.state.as_str());
    println!(
        "{} | opened by {} | created {} | updated {}",
        issue.repository,
        issue.author.login,
        issue.created_at.format("%Y-%m-%d"),
        issue.updated_at.format("%Y-%m-%d")
    );
    println!("{}", issue.url);
    if let Some(body) = &issue.body {
        println!();
        println!("{}", body);
    }
    if !issue.comments.is_empty() {
        println!();
        println!("Comments ({}):", issue.comments.len());
        for comment in &issue.comments {
            println!();
            println!(
                "  {} on {}:",
                comment.author,
                comment.created_at.format("%Y-%m-%d %H:%M")
            );
            for line in comment.body.lines() {
                println!("  {}", line);
            }
        }
    }
    Ok(())
}

fn run_repos(
    client: GithubClient,
    mut store: Store,
    owner: &str,
    source: &CatalogSource,
    json: bool,
) -> Result<()> {
    let mut rate_limit = store.rate_limit()?;
    let repositories = catalog::load(&client, &mut store, &mut rate_limit, source, owner);
    store.save_rate_limit(&rate_limit)?;
    if repositories.is_empty() {
        return Err(Error::Catalog(
            "no repositories available from any source".to_string(),
        ));
    }

    let now = Utc::now();
    if json {
        let payload: Vec<_> = repositories
            .iter()
            .map(|repo| {
                let counts = store.issue_counts(&repo.name, now).ok().flatten();
                serde_json::json!({
                    "name": repo.name,
                    "display_name": repo.display_name,
                    "description": repo.description,
                    "open_issues": counts.map(|(open, _)| open),
                    "total_issues": counts.map(|(_, total)| total),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    for repo in &repositories {
        let counts = match store.issue_counts(&repo.name, now)? {
            Some((open, total)) => format!("{}/{}", open, total),
            None => "-".to_string(),
        };
        println!(
            "{:<18} {:>7}  {}",
            repo.label(),
            counts,
            repo.description.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

fn run_token(mut store: Store, command: TokenCommands) -> Result<()> {
    match command {
        TokenCommands::Set { token } => {
            store.set_token(token.trim())?;
            println!("Token saved; cached data invalidated.");
        }
        TokenCommands::Clear => {
            store.clear_token()?;
            println!("Token cleared; cached data invalidated.");
        }
        TokenCommands::Status => match store.token()? {
            Some(_) => println!("A token is stored."),
            None => println!("No token stored."),
        },
    }
    Ok(())
}

fn run_view(mut store: Store, mode: Option<String>) -> Result<()> {
    match mode {
        Some(mode) => {
            let mode = ViewMode::from_str(&mode)
                .ok_or_else(|| Error::InvalidInput(format!("unknown view mode: {}", mode)))?;
            store.set_view_mode(mode)?;
            println!("View mode set to {}.", mode);
        }
        None => println!("{}", store.view_mode()?),
    }
    Ok(())
}

fn run_rate_limit(store: &Store, json: bool) -> Result<()> {
    let rate_limit = store.rate_limit()?;
    let now = Utc::now();

    if json {
        println!("{}", serde_json::to_string_pretty(&rate_limit)?);
        return Ok(());
    }

    if !rate_limit.is_tracking() {
        println!("No rate-limit data observed yet.");
        return Ok(());
    }
    if let Some(remaining) = rate_limit.remaining {
        println!("Remaining requests: {}", remaining);
    }
    if let Some(seconds) = rate_limit.seconds_until_reset(now) {
        println!("Window resets in {}m{:02}s", seconds / 60, seconds % 60);
    }
    if rate_limit.is_exhausted(now) {
        println!("The budget is exhausted; calls will fail until the reset.");
    }
    Ok(())
}

fn print_rate_limit_warning(rate_limit: &RateLimit) {
    let now = Utc::now();
    if !rate_limit.should_warn(now) {
        return;
    }
    match rate_limit.seconds_until_reset(now) {
        Some(seconds) if rate_limit.is_exhausted(now) => eprintln!(
            "warning: API rate limit exhausted; resets in {}m{:02}s",
            seconds / 60,
            seconds % 60
        ),
        _ => eprintln!(
            "warning: {} API requests remaining",
            rate_limit.remaining.unwrap_or(0)
        ),
    }
}
