//! habit-intent CLI: compile French habit commands into SPARQL.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use habit_intent::config::EngineConfig;
use habit_intent::engine::{CommandRequest, Engine};
use habit_intent::executor::OxigraphExecutor;
use habit_intent::intent::Action;
use habit_intent::present::{present_analysis, present_habits};

#[derive(Parser)]
#[command(name = "habit-intent", version, about = "Natural-language habit command compiler")]
struct Cli {
    /// Engine config file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Knowledge document to use instead of the bundled one.
    #[arg(long, global = true)]
    knowledge: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the intent and query for one command.
    Compile {
        /// The command text, e.g. "ajoute une habitude sommeil avec 8 heures".
        text: String,

        /// User id the command is issued for.
        #[arg(long)]
        user: Option<String>,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Compile and execute commands in order against an oxigraph store.
    Run {
        /// One or more command texts.
        #[arg(required = true)]
        texts: Vec<String>,

        #[arg(long)]
        user: Option<String>,

        /// Persistent store directory. In-memory when omitted.
        #[arg(long)]
        store_dir: Option<PathBuf>,
    },

    /// List categories, relationship phrases and example commands.
    Knowledge,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(path) = cli.knowledge {
        config.knowledge_path = Some(path);
    }
    let engine = Engine::new(config)?;

    match cli.command {
        Commands::Compile { text, user, json } => {
            let request = request(text, user);
            let compiled = engine.process(&request)?;
            if json {
                let out = serde_json::to_string_pretty(&compiled).into_diagnostic()?;
                println!("{out}");
            } else {
                let intent = &compiled.intent;
                println!("Action:    {}", intent.action);
                if intent.action_defaulted() {
                    println!("           (no action keyword, defaulted)");
                }
                println!(
                    "Entity:    {} ({})",
                    intent.entity.category, intent.entity.graph_class
                );
                for (key, value) in intent.filters.numeric() {
                    println!("Filter:    {} = {value}", key.name());
                }
                if let Some(date) = intent.filters.date {
                    println!("Filter:    date = {date:?}");
                }
                if let Some(period) = intent.filters.period {
                    println!("Filter:    period = {period:?}");
                }
                for rel in &intent.relationships {
                    println!(
                        "Relation:  \"{}\" {} \"{}\"",
                        rel.inferred_subject, rel.graph_predicate, rel.inferred_object
                    );
                }
                println!(
                    "Temporal:  {:?}, limit {}",
                    intent.temporal.scope, intent.temporal.limit
                );
                println!("\n{}", compiled.query);
            }
        }

        Commands::Run {
            texts,
            user,
            store_dir,
        } => {
            let executor = match &store_dir {
                Some(dir) => OxigraphExecutor::open(dir)?,
                None => OxigraphExecutor::in_memory()?,
            };
            for text in texts {
                println!("> {text}");
                let request = request(text, user.clone());
                let execution = match engine.execute(&executor, &request) {
                    Ok(execution) => execution,
                    Err(err) => {
                        eprintln!("{:?}", miette::Report::new(err));
                        continue;
                    }
                };
                let rows = execution.rows.unwrap_or_default();
                match execution.command.intent.action {
                    Action::Read => {
                        let habits = present_habits(&rows);
                        if habits.is_empty() {
                            println!("  (aucune habitude)");
                        }
                        for habit in habits {
                            println!("  {habit}");
                        }
                    }
                    Action::Analyze => {
                        for group in present_analysis(&rows) {
                            println!("  {group}");
                        }
                    }
                    action => println!("  {action}: ok"),
                }
            }
        }

        Commands::Knowledge => {
            let kb = engine.knowledge();
            println!("{} v{}", kb.name(), kb.version());
            println!("\nCategories:");
            for category in kb.categories() {
                let props: Vec<&str> = category.properties.iter().map(|m| m.as_str()).collect();
                println!(
                    "  {:<10} {:<18} [{}]  optimal {} {}",
                    category.key,
                    category.graph_class,
                    props.join(", "),
                    category.metric.optimal_range,
                    category.metric.unit
                );
                if !category.synonyms.is_empty() {
                    println!("             synonyms: {}", category.synonyms.join(", "));
                }
            }
            println!("\nRelationships:");
            for rel in kb.relationships() {
                println!("  \"{}\" -> {}", rel.phrase, rel.predicate);
            }
            println!("\nExamples:");
            for pattern in kb.patterns() {
                println!("  {:<12} {}", pattern.name, pattern.example);
            }
        }
    }

    Ok(())
}

fn request(text: String, user: Option<String>) -> CommandRequest {
    match user {
        Some(user) => CommandRequest::for_user(text, user),
        None => CommandRequest::new(text),
    }
}
