//! CLI command handlers.
//!
//! Each handler loads what it needs from the config and the project store,
//! calls into the library, and prints. Logs go to stderr, results to stdout.

use std::error::Error;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};

use storycase::config::Config;
use storycase::export;
use storycase::jira::JiraClient;
use storycase::llm::{generate as run_generation, CaseSource, GenerationOptions, LlmClient, MAX_CASES};
use storycase::persistence::{Project, ProjectStore};
use storycase::project::ProjectSettings;
use storycase::story;
use storycase::testgen::{SubstitutionTable, TestCase};

type CmdResult = Result<(), Box<dyn Error>>;

/* ============================================================
   Arguments
   ============================================================ */

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[arg(long, help = "User story text")]
    story: Option<String>,

    #[arg(long, conflicts_with = "story", help = "Read the user story from a file ('-' for stdin)")]
    story_file: Option<PathBuf>,

    #[arg(
        short = 'n',
        long,
        value_parser = clap::value_parser!(u16).range(1..=MAX_CASES as i64),
        help = "Number of test cases, 1-100 (default from config)"
    )]
    count: Option<u16>,

    #[arg(long, help = "Project id whose settings shape the prompt")]
    project: Option<String>,

    #[arg(long = "language", help = "Output language, repeatable (ignored with --project)")]
    languages: Vec<String>,

    #[arg(long, requires = "project", default_value_t = false, help = "Save the cases to the project")]
    save: bool,

    #[arg(long, help = "Also write the cases to this .csv, .json or .xlsx file")]
    out: Option<PathBuf>,

    #[arg(long, default_value_t = false, help = "Print cases as JSON")]
    json: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ProjectCommand {
    /// Create a project
    Create(ProjectCreateArgs),
    /// Replace a project's settings from a JSON file
    Update {
        id: String,
        #[arg(long, help = "Settings JSON file")]
        from: PathBuf,
    },
    /// List projects
    List,
    /// Show one project as JSON
    Show { id: String },
    /// Delete a project and its saved cases
    Delete { id: String },
}

#[derive(Args, Debug, Clone)]
pub struct ProjectCreateArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long = "language")]
    languages: Vec<String>,
    #[arg(long = "testing-type")]
    testing_types: Vec<String>,
    #[arg(long)]
    writing_style: Option<String>,
    #[arg(long)]
    detail_level: Option<String>,
    #[arg(long = "exclude", help = "Exclusion rule, repeatable")]
    exclusion_rules: Vec<String>,
    #[arg(long)]
    steps_detail: Option<String>,
    #[arg(long, help = "Start from a settings JSON file; flags override it")]
    from: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct CasesArgs {
    project: String,
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    project: String,
    #[arg(help = "Output path; format from the extension (.csv, .json or .xlsx)")]
    path: PathBuf,
}

#[derive(Subcommand, Debug, Clone)]
pub enum JiraCommand {
    /// Verify the project's Jira credentials
    Check { project: String },
    /// Create Xray Test issues from the project's saved cases
    Sync {
        project: String,
        #[arg(long, help = "Jira project key (default from project settings)")]
        key: Option<String>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeSpecArgs {
    #[arg(help = "Plain-text or markdown specification")]
    file: PathBuf,
    #[arg(long, help = "Project id for language and context")]
    project: Option<String>,
    #[arg(long, help = "Write the user story here instead of stdout")]
    out: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Store the LLM API key in the config file
    SetKey { key: String },
    /// Print the effective configuration (key masked)
    Show,
}

/* ============================================================
   Handlers
   ============================================================ */

pub fn generate(cfg: &Config, args: GenerateArgs) -> CmdResult {
    let story = read_story(&args)?;
    let store = ProjectStore::open(cfg.data_dir());

    let settings = match &args.project {
        Some(id) => store.get(id)?.settings,
        None => ProjectSettings {
            languages: if args.languages.is_empty() {
                vec!["English".to_string()]
            } else {
                args.languages.clone()
            },
            ..Default::default()
        },
    };

    let client = LlmClient::new(cfg.llm.clone())?;
    let options = GenerationOptions {
        policy: cfg.generation.fallback_policy(),
        substitutions: SubstitutionTable::load(cfg.generation.substitutions_file.as_deref()),
    };
    let count = args.count.map(usize::from).unwrap_or(cfg.generation.default_count);

    let outcome = run_generation(&client, &story, count, &settings, &options);

    if let CaseSource::Fallback { reason } = &outcome.source {
        eprintln!("warning: showing fallback test cases ({reason})");
    }
    tracing::debug!(trail = %outcome.trail, "generation trail");

    if let (true, Some(id)) = (args.save, &args.project) {
        store.save_cases(id, &outcome.cases)?;
        eprintln!("saved {} test cases to project {id}", outcome.cases.len());
    }
    if let Some(path) = &args.out {
        export::export(path, &outcome.cases)?;
        eprintln!("written to {}", path.display());
    }

    print_cases(&outcome.cases, args.json)
}

pub fn project(cfg: &Config, cmd: ProjectCommand) -> CmdResult {
    let store = ProjectStore::open(cfg.data_dir());

    match cmd {
        ProjectCommand::Create(args) => {
            let project = store.create(settings_from_args(args)?)?;
            println!("{}", project.id);
        }
        ProjectCommand::Update { id, from } => {
            let settings = read_settings(&from)?;
            let project = store.update(&id, settings)?;
            println!("updated {}", project.id);
        }
        ProjectCommand::List => {
            let projects = store.list()?;
            if projects.is_empty() {
                println!("no projects");
            }
            for p in projects {
                print_project_line(&p);
            }
        }
        ProjectCommand::Show { id } => {
            let project = store.get(&id)?;
            println!("{}", serde_json::to_string_pretty(&project)?);
        }
        ProjectCommand::Delete { id } => {
            store.delete(&id)?;
            println!("deleted {id}");
        }
    }
    Ok(())
}

pub fn cases(cfg: &Config, args: CasesArgs) -> CmdResult {
    let store = ProjectStore::open(cfg.data_dir());
    store.get(&args.project)?;
    print_cases(&store.load_cases(&args.project)?, args.json)
}

pub fn export(cfg: &Config, args: ExportArgs) -> CmdResult {
    let store = ProjectStore::open(cfg.data_dir());
    store.get(&args.project)?;
    let cases = store.load_cases(&args.project)?;
    if cases.is_empty() {
        return Err(format!("project {} has no saved test cases", args.project).into());
    }

    export::export(&args.path, &cases)?;
    println!("exported {} test cases to {}", cases.len(), args.path.display());
    Ok(())
}

pub fn jira(cfg: &Config, cmd: JiraCommand) -> CmdResult {
    let store = ProjectStore::open(cfg.data_dir());

    match cmd {
        JiraCommand::Check { project } => {
            let settings = store.get(&project)?.settings;
            let client = JiraClient::new(&settings.jira)?;
            let user = client.check_connection()?;
            println!("connected to {} as {}", client.server(), user);
        }
        JiraCommand::Sync { project, key, json } => {
            let settings = store.get(&project)?.settings;
            let project_key = key
                .or_else(|| Some(settings.jira.project_key.clone()).filter(|k| !k.trim().is_empty()))
                .ok_or("no Jira project key (set jira.project_key or pass --key)")?;

            let cases = store.load_cases(&project)?;
            if cases.is_empty() {
                return Err(format!("project {project} has no saved test cases").into());
            }

            let client = JiraClient::new(&settings.jira)?;
            let report = client.sync(&project_key, &cases)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }

            println!("project: {}", report.project_key);
            println!("created: {}", report.created.len());
            for issue in &report.created {
                println!("  #{} -> {} {}", issue.test_case_id, issue.key, issue.url);
            }
            if !report.failed.is_empty() {
                println!("failed: {}", report.failed.len());
                for f in &report.failed {
                    println!("  #{}: {}", f.test_case_id, f.error);
                }
            }
        }
    }
    Ok(())
}

pub fn analyze_spec(cfg: &Config, args: AnalyzeSpecArgs) -> CmdResult {
    let spec_text = story::read_spec_file(&args.file)?;

    let settings = match &args.project {
        Some(id) => ProjectStore::open(cfg.data_dir()).get(id)?.settings,
        None => ProjectSettings::default(),
    };

    let client = LlmClient::new(cfg.llm.clone())?;
    let user_story = story::analyze_spec(&client, &spec_text, &settings);

    match &args.out {
        Some(path) => {
            fs::write(path, &user_story)?;
            eprintln!("user story written to {}", path.display());
        }
        None => println!("{user_story}"),
    }
    Ok(())
}

pub fn config(cfg: &Config, cmd: ConfigCommand) -> CmdResult {
    match cmd {
        ConfigCommand::SetKey { key } => {
            if key.trim().is_empty() {
                return Err("API key cannot be empty".into());
            }
            let path = Config::save_api_key(&key)?;
            println!("API key saved to {}", path.display());
        }
        ConfigCommand::Show => {
            let mut shown = cfg.clone();
            shown.llm.api_key = shown.llm.api_key.as_deref().map(mask);
            println!("# {}", storycase::config::config_path().display());
            println!("{}", toml::to_string_pretty(&shown)?);
            println!("# data dir: {}", cfg.data_dir().display());
        }
    }
    Ok(())
}

/* ============================================================
   Helpers
   ============================================================ */

fn read_story(args: &GenerateArgs) -> Result<String, Box<dyn Error>> {
    let story = match (&args.story, &args.story_file) {
        (Some(s), _) => s.clone(),
        (None, Some(path)) if path.as_os_str() == "-" => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
        (None, Some(path)) => fs::read_to_string(path)?,
        (None, None) => return Err("provide --story or --story-file".into()),
    };

    if story.trim().is_empty() {
        return Err("user story is empty".into());
    }
    Ok(story)
}

fn read_settings(path: &Path) -> Result<ProjectSettings, Box<dyn Error>> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn settings_from_args(args: ProjectCreateArgs) -> Result<ProjectSettings, Box<dyn Error>> {
    let mut s = match &args.from {
        Some(path) => read_settings(path)?,
        None => ProjectSettings::default(),
    };

    if let Some(v) = args.name {
        s.name = v;
    }
    if let Some(v) = args.description {
        s.description = v;
    }
    if !args.languages.is_empty() {
        s.languages = args.languages;
    }
    if !args.testing_types.is_empty() {
        s.testing_types = args.testing_types;
    }
    if let Some(v) = args.writing_style {
        s.writing_style = v;
    }
    if let Some(v) = args.detail_level {
        s.detail_level = v;
    }
    if !args.exclusion_rules.is_empty() {
        s.exclusion_rules = args.exclusion_rules;
    }
    if let Some(v) = args.steps_detail {
        s.steps_detail = v;
    }

    if s.name.trim().is_empty() {
        return Err("project name is required (--name or \"name\" in --from)".into());
    }
    Ok(s)
}

fn print_project_line(p: &Project) {
    println!(
        "{}  {}  [{}]  updated {}",
        p.id,
        p.settings.name,
        p.settings.languages.join(", "),
        p.updated_at.format("%Y-%m-%d %H:%M")
    );
}

fn print_cases(cases: &[TestCase], json: bool) -> CmdResult {
    if json {
        println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "test_cases": cases }))?);
        return Ok(());
    }

    if cases.is_empty() {
        println!("no test cases");
        return Ok(());
    }

    for case in cases {
        println!("TC-{:03}  {}", case.test_case_id, case.test_title);
        for (header, value) in case.to_row().iter().skip(2) {
            if value.is_empty() {
                continue;
            }
            println!("  {header}:");
            for line in value.lines() {
                println!("    {line}");
            }
        }
        println!();
    }
    Ok(())
}

fn mask(key: &str) -> String {
    let visible: String = key.chars().take(4).collect();
    format!("{visible}…")
}
