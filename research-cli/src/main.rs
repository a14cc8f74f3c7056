//! `research-core` — the single-command CLI wrapper.
//!
//! Composes the concrete [`Environment`] record (the only place in the
//! workspace allowed to do so), reads `models.ini` and `OPENROUTER_API_KEY`,
//! and hands a question to the [`Orchestrator`]. This binary, not any
//! library crate, owns configuration I/O and process exit codes.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use research_config::ModelsConfig;
use research_orchestrator::{register_default_roles, Environment, ModelRouter, Orchestrator};
use research_policy::DelegationPolicy;
use research_sandbox::{NoContainerRuntime, Sandbox};
use research_scholar::{PoolConfig, ScholarPool};
use research_tools::builtin::{
    CleanCsvTool, CleanMarkdownTool, ReadFileTool, RunSandboxTool, SearchCodeTool,
    SearchPapersTool, SummarizeResultsTool,
};
use research_tools::ToolRegistry;
use research_types::NullReasoner;
use research_verify::VerifierGate;

#[derive(Parser, Debug)]
#[command(
    name = "research-core",
    about = "Staged adaptive research assistant core engine",
    long_about = None,
)]
struct Args {
    /// The question to research. Omit when using --tools.
    question: Option<String>,

    /// Project root to search and sandbox code execution under.
    #[arg(short = 'r', long, default_value = ".")]
    root: PathBuf,

    /// List registered tools (name and description) and exit.
    #[arg(long)]
    tools: bool,

    /// Path to models.ini, relative to root unless absolute.
    #[arg(long, default_value = "models.ini")]
    models_ini: PathBuf,
}

fn build_registry(root: &PathBuf, sandbox: Arc<Sandbox<NoContainerRuntime>>, scholar: Arc<ScholarPool>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(SearchCodeTool::new(root.clone(), None)));
    registry.register(Arc::new(ReadFileTool::new(root.clone())));
    registry.register(Arc::new(RunSandboxTool::new(sandbox, Some(root.clone()))));
    registry.register(Arc::new(SearchPapersTool::new(scholar)));
    registry.register(Arc::new(CleanCsvTool::new(root.clone())));
    registry.register(Arc::new(CleanMarkdownTool::new(root.clone())));
    registry.register(Arc::new(SummarizeResultsTool));
    registry
}

/// Build the environment, attaching a reasoner only if `models.ini` parses.
/// The workspace ships no concrete `RemoteReasoner` backend (the HTTP chat
/// client is an external collaborator per the core's scope), so even a
/// fully configured `models.ini` resolves to [`NullReasoner`] today; wiring
/// it through here means a future HTTP-backed reasoner plugs in by
/// replacing this one constructor.
fn build_environment(args: &Args) -> Environment {
    let root = args.root.clone();
    let registry = build_registry(
        &root,
        Arc::new(Sandbox::subprocess_only()),
        Arc::new(ScholarPool::new(PoolConfig::default())),
    );
    let policy = Arc::new(DelegationPolicy::new());
    register_default_roles(&policy);
    let verifier = Arc::new(VerifierGate::local_only());

    let env = Environment::local_only(root.clone(), Arc::new(registry), policy, verifier);

    let ini_path = if args.models_ini.is_absolute() {
        args.models_ini.clone()
    } else {
        root.join(&args.models_ini)
    };

    match ModelsConfig::load(&ini_path) {
        Ok(cfg) => {
            if let Err(e) = ModelsConfig::api_key() {
                tracing::warn!(error = %e, "no reasoner credential; running local-evidence-only");
                return env;
            }
            tracing::info!(primary = %cfg.primary, fallback = %cfg.fallback, "model configuration loaded");
            let router = ModelRouter::new(cfg.primary, cfg.fallback, cfg.fallback_interval);
            env.with_reasoner(Arc::new(NullReasoner), router)
        }
        Err(e) => {
            tracing::warn!(error = %e, path = %ini_path.display(), "no model configuration; running local-evidence-only");
            env
        }
    }
}

fn print_tools(env: &Environment) {
    for schema in env.tools.list() {
        println!("{:<16} {}", schema.name, schema.description);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let env = build_environment(&args);

    if args.tools {
        print_tools(&env);
        return Ok(());
    }

    let Some(question) = args.question.clone() else {
        eprintln!("a question is required unless --tools is passed");
        std::process::exit(2);
    };

    let orchestrator = Orchestrator::new(env);
    match orchestrator.run(&question).await {
        Ok(answer) => {
            println!("{answer}");
            Ok(())
        }
        Err(e) => {
            eprintln!("research-core: {e}");
            std::process::exit(1);
        }
    }
}
