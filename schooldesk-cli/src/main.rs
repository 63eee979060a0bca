use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use log::info;
use schooldesk_lib::auth::StaticTokenProvider;
use schooldesk_lib::cache::InMemoryCache;
use schooldesk_lib::cache::ViewCache;
use schooldesk_lib::config::AppConfig;
use schooldesk_lib::error::ConfigError;
use schooldesk_lib::error::Error;
use schooldesk_lib::model::RecordId;
use schooldesk_lib::source::CachedSource;
use schooldesk_lib::source::DataSource;
use schooldesk_lib::source::MemorySource;
use schooldesk_lib::source::RpcSource;
use schooldesk_lib::view::FilterCriteria;
use schooldesk_lib::view::SortDescriptor;
use schooldesk_lib::view::TableView;
use simplelog::Config;
use simplelog::LevelFilter;
use simplelog::WriteLogger;

mod args;
use args::Cli;
use args::Commands;
use args::ViewArgs;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.log_file.as_deref()) {
        eprintln!("Failed to initialize logger: {}", e);
    }

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    match log_file {
        Some(path) => WriteLogger::init(level, Config::default(), File::create(path)?)?,
        None => WriteLogger::init(level, Config::default(), std::io::stderr())?,
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<(), Error> {
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    let schema = config.view(&cli.table)?;
    let source = open_source(&cli, &config)?;
    let cache = ViewCache::new(InMemoryCache::new(), config.cache.clone());
    let mut view = TableView::new(schema, CachedSource::from_arc(source, cache));

    view.refresh().await?;
    info!("{} loaded: {} records", cli.table, view.records().len());

    match cli.command {
        Commands::List {
            view: filters,
            sort,
            desc,
            page,
            page_size,
            hide,
        } => {
            apply_filters(&mut view, filters);
            if let Some(column) = sort {
                view.set_sort(if desc {
                    SortDescriptor::desc(column)
                } else {
                    SortDescriptor::asc(column)
                });
            } else if desc {
                let column = view.sort().column.clone();
                view.set_sort(SortDescriptor::desc(column));
            }
            if let Some(size) = page_size {
                view.set_page_size(size)?;
            }
            for key in &hide {
                view.toggle_column(key);
            }
            view.set_page(page);
            print_page(&view);
        }
        Commands::Mark {
            value,
            view: filters,
            ids,
            all,
        } => {
            apply_filters(&mut view, filters);
            if all {
                view.select_all();
            } else {
                for id in ids {
                    view.toggle_selection(&RecordId::from(id));
                }
            }
            let action = view.mark_action(&value);
            let outcome = view.apply_bulk(&action).await?;
            println!("Updated {} records", outcome.affected());
        }
        Commands::Delete { ids } => {
            if let [id] = ids.as_slice() {
                view.delete_row(&RecordId::from(id.as_str())).await?;
                println!("Deleted 1 record");
            } else {
                for id in &ids {
                    view.toggle_selection(&RecordId::from(id.as_str()));
                }
                let action = view.delete_action();
                let outcome = view.apply_bulk(&action).await?;
                println!("Deleted {} records", outcome.affected());
            }
        }
        Commands::Options { programs, branch } => {
            if programs {
                if let Some(branch) = branch {
                    view.set_branch(branch.as_str().into());
                }
                for program in view.program_options() {
                    println!("{}\t{}", program.id, program.label);
                }
            } else {
                for branch in view.branches().iter() {
                    println!("{}\t{}", branch.id, branch.label);
                }
            }
        }
    }

    Ok(())
}

fn open_source(cli: &Cli, config: &AppConfig) -> Result<Arc<dyn DataSource>, Error> {
    if let Some(path) = &cli.fixture {
        let json = std::fs::read_to_string(path).map_err(ConfigError::from)?;
        let id_field = config.rpc.as_ref().map(|r| r.id_field.as_str()).unwrap_or("id");
        return Ok(Arc::new(MemorySource::from_fixture(&json, id_field, 1000)?));
    }

    let rpc = config.rpc.clone().ok_or(ConfigError::Missing("rpc"))?;
    let token = cli.token.clone().unwrap_or_else(|| rpc.api_key.clone());
    Ok(Arc::new(RpcSource::new(rpc, StaticTokenProvider::new(token))?))
}

fn apply_filters(view: &mut TableView, args: ViewArgs) {
    let mut criteria = FilterCriteria::all();
    criteria.set_branch(args.branch.into());
    criteria.set_program(args.program.into());
    criteria.set_status(args.status.into());
    criteria.set_admitted_within(args.within.into());
    view.set_criteria(criteria);
    if let Some(query) = args.search {
        view.set_search(query);
    }
}

fn print_page(view: &TableView) {
    let columns: Vec<_> = view.columns().visible().collect();
    let header: Vec<&str> = columns.iter().map(|c| c.label.as_str()).collect();
    println!("{}", header.join("\t"));

    let window = view.visible();
    for record in &window.items {
        let row: Vec<String> = columns
            .iter()
            .map(|c| record.get(&c.key).map(|v| v.to_string()).unwrap_or_default())
            .collect();
        println!("{}", row.join("\t"));
    }
    println!(
        "-- page {} of {} ({} matching, {} total)",
        window.page,
        window.total_pages,
        view.filtered().len(),
        view.records().len()
    );
}
