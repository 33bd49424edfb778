use crate::app::App;
use crate::config::{Config, load_config};
use crate::layout::compute_plan_layout;
use crate::logging::init_logging;
use crate::plan::{Correlative, CorrelativeKind, Plan, Status};
use crate::render::{RenderInput, render_svg, write_output_svg};
#[cfg(feature = "png")]
use crate::render::write_output_png;
use crate::repository::{FileRepository, PlanRepository};
use crate::snapshot::write_snapshot;
use anyhow::{Context, Result, anyhow};
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "cplan", version, about = "Curriculum plan tracker with correlative checks")]
pub struct Args {
    /// Config JSON/JSON5 file
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the stored plan (overrides the config file)
    #[arg(short = 'd', long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List every year with its subjects and their effective status
    Show,
    /// Add a subject to a year
    Add {
        /// Year number (1-5)
        #[arg(short = 'y', long = "year")]
        year: u8,
        /// Subject name
        name: String,
        /// Required subject that must be regularized (id or name).
        /// Requirements keep the order they are given in, across -r and -a.
        #[arg(short = 'r', long = "regular")]
        regular: Vec<String>,
        /// Required subject that must be approved (id or name)
        #[arg(short = 'a', long = "approved")]
        approved: Vec<String>,
    },
    /// Delete a subject and every reference to it
    Delete {
        /// Subject id or name
        subject: String,
    },
    /// Set the manual status of a subject
    Status {
        /// Subject id or name
        subject: String,
        /// disponible, cursando, regular or aprobada
        status: String,
    },
    /// Write plan_de_estudios.json
    Export {
        /// Destination directory
        #[arg(short = 'o', long = "output", default_value = ".")]
        output: PathBuf,
    },
    /// Replace the stored plan with a plan file
    Import {
        file: PathBuf,
    },
    /// Render the plan view
    Render {
        /// Output file (svg/png). Defaults to stdout for SVG if omitted.
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
        /// Output format
        #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
        output_format: OutputFormat,
        /// Subject whose requirements are drawn (id or name)
        #[arg(short = 's', long = "select")]
        select: Option<String>,
        /// Also dump statuses, selection and edges as JSON
        #[arg(long = "snapshot")]
        snapshot: Option<PathBuf>,
        /// Width
        #[arg(short = 'w', long = "width")]
        width: Option<f32>,
        /// Height
        #[arg(short = 'H', long = "height")]
        height: Option<f32>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
}

pub fn run() -> Result<()> {
    let matches = Args::command().get_matches();
    let args = Args::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());
    init_logging(args.verbose);

    let mut config = load_config(args.config.as_deref())?;
    if let Some(dir) = args.data_dir.clone() {
        config.storage.data_dir = Some(dir);
    }
    let repository = open_repository(&config)?;
    let mut app = App::with_config(repository, &config);

    match args.command {
        Command::Show => print_plan(&app),
        Command::Add {
            year,
            name,
            regular,
            approved,
        } => {
            let requirements =
                requirements_in_order(matches.subcommand_matches("add"), regular, approved);
            let mut correlatives = Vec::with_capacity(requirements.len());
            for (key, kind) in &requirements {
                correlatives.push(Correlative::new(resolve_id(app.plan(), key)?, *kind));
            }
            let subject = app.add_subject(year, &name, correlatives)?;
            print_toast(&app);
            println!("{}", subject.id);
        }
        Command::Delete { subject } => {
            let id = resolve_id(app.plan(), &subject)?;
            let year = app
                .plan()
                .year_of(&id)
                .map(|year| year.id)
                .ok_or_else(|| anyhow!("subject {id} has no year"))?;
            app.delete_subject(year, &id);
            print_toast(&app);
        }
        Command::Status { subject, status } => {
            let id = resolve_id(app.plan(), &subject)?;
            let status = Status::from_token(&status)
                .ok_or_else(|| anyhow!("unknown status '{status}'"))?;
            app.set_manual_status(&id, status)?;
            print_toast(&app);
        }
        Command::Export { output } => {
            let file = app.request_export()?;
            let path = output.join(&file.file_name);
            crate::repository::write_atomic(&path, &file.bytes)?;
            print_toast(&app);
            println!("{}", path.display());
        }
        Command::Import { file } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let result = app.import_document(&bytes);
            print_toast(&app);
            result?;
        }
        Command::Render {
            output,
            output_format,
            select,
            snapshot,
            width,
            height,
        } => {
            if let Some(width) = width {
                config.render.width = width;
            }
            if let Some(height) = height {
                config.render.height = height;
            }
            render_plan(
                &mut app,
                &config,
                select.as_deref(),
                output.as_deref(),
                output_format,
                snapshot.as_deref(),
            )?;
        }
    }

    Ok(())
}

fn open_repository(config: &Config) -> Result<FileRepository> {
    let key = config.storage.key.clone();
    match &config.storage.data_dir {
        Some(dir) => Ok(FileRepository::new(dir, key)),
        None => FileRepository::in_data_dir(key)
            .ok_or_else(|| anyhow!("no data directory available, pass --data-dir")),
    }
}

/// Merges `-r` and `-a` values back into command-line order.
fn requirements_in_order(
    matches: Option<&ArgMatches>,
    regular: Vec<String>,
    approved: Vec<String>,
) -> Vec<(String, CorrelativeKind)> {
    let indices = |id: &str| -> Vec<usize> {
        matches
            .and_then(|matches| matches.indices_of(id))
            .map(|indices| indices.collect())
            .unwrap_or_default()
    };
    let regular_at = indices("regular");
    let approved_at = indices("approved");
    let mut entries: Vec<(usize, String, CorrelativeKind)> = regular
        .into_iter()
        .enumerate()
        .map(|(pos, key)| {
            let at = regular_at.get(pos).copied().unwrap_or(usize::MAX);
            (at, key, CorrelativeKind::Regularize)
        })
        .chain(approved.into_iter().enumerate().map(|(pos, key)| {
            let at = approved_at.get(pos).copied().unwrap_or(usize::MAX);
            (at, key, CorrelativeKind::Approve)
        }))
        .collect();
    entries.sort_by_key(|(at, _, _)| *at);
    entries.into_iter().map(|(_, key, kind)| (key, kind)).collect()
}

fn resolve_id(plan: &Plan, key: &str) -> Result<String> {
    plan.resolve(key)
        .map(|subject| subject.id.clone())
        .ok_or_else(|| anyhow!("no subject matches '{key}'"))
}

fn print_toast<R: PlanRepository>(app: &App<R>) {
    if let Some(toast) = app.toast() {
        eprintln!("{}", toast.message);
    }
}

fn print_plan<R: PlanRepository>(app: &App<R>) {
    let plan = app.plan();
    for year in &plan.years {
        println!("{} ({})", year.label, year.subjects.len());
        if year.subjects.is_empty() {
            println!("  Sin materias");
        }
        for subject in &year.subjects {
            let status = app.status_of(&subject.id);
            println!("  {:<11} {}  [{}]", status.label(), subject.name, subject.id);
            for correlative in &subject.correlatives {
                let name = plan
                    .find_subject(&correlative.subject_id)
                    .map(|s| s.name.as_str())
                    .unwrap_or(correlative.subject_id.as_str());
                println!("              {} → {}", correlative.kind.label(), name);
            }
        }
    }

    let counts = app.status_counts();
    println!(
        "Aprobadas {} · Regulares {} · Cursando {}",
        counts[&Status::Aprobada],
        counts[&Status::Regular],
        counts[&Status::Cursando]
    );
    for cycle in &app.status_report().cycles {
        let names: Vec<&str> = cycle
            .members
            .iter()
            .filter_map(|id| plan.find_subject(id))
            .map(|s| s.name.as_str())
            .collect();
        println!("Ciclo de correlativas: {}", names.join(", "));
    }
}

fn render_plan<R: PlanRepository>(
    app: &mut App<R>,
    config: &Config,
    select: Option<&str>,
    output: Option<&Path>,
    output_format: OutputFormat,
    snapshot: Option<&Path>,
) -> Result<()> {
    let layout = compute_plan_layout(
        app.plan(),
        app.effective_statuses(),
        &config.theme,
        &config.layout,
    );
    if let Some(key) = select {
        let id = resolve_id(app.plan(), key)?;
        if let Some(ticket) = app.select_subject(Some(&id)) {
            app.run_frame(ticket, &layout);
        }
        info!(subject = %id, edges = app.edges().len(), "rendering selection");
    }

    let selection = app.selection_view();
    let counts = app.status_counts();
    let input = RenderInput {
        layout: &layout,
        selection: &selection,
        counts: &counts,
        edges: app.edges(),
        epoch: app.animation_epoch(),
        overlay: app.overlay().config(),
        animate: matches!(output_format, OutputFormat::Svg),
    };
    let svg = render_svg(&input, &config.theme, &config.layout);

    match output_format {
        OutputFormat::Svg => write_output_svg(&svg, output)?,
        OutputFormat::Png => write_png(&svg, output, config)?,
    }
    if let Some(path) = snapshot {
        write_snapshot(path, app)?;
    }
    Ok(())
}

#[cfg(feature = "png")]
fn write_png(svg: &str, output: Option<&Path>, config: &Config) -> Result<()> {
    let output = output.ok_or_else(|| anyhow!("PNG output requires --output"))?;
    write_output_png(svg, output, &config.render)
}

#[cfg(not(feature = "png"))]
fn write_png(_svg: &str, _output: Option<&Path>, _config: &Config) -> Result<()> {
    Err(anyhow!("PNG output needs the `png` feature"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_add_with_requirements() {
        let args = Args::parse_from([
            "cplan",
            "-vv",
            "add",
            "--year",
            "2",
            "Análisis II",
            "-r",
            "Análisis I",
            "-a",
            "Álgebra",
        ]);
        assert_eq!(args.verbose, 2);
        match args.command {
            Command::Add {
                year,
                name,
                regular,
                approved,
            } => {
                assert_eq!(year, 2);
                assert_eq!(name, "Análisis II");
                assert_eq!(regular, vec!["Análisis I"]);
                assert_eq!(approved, vec!["Álgebra"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn requirements_keep_command_line_order() {
        let matches = Args::command().get_matches_from([
            "cplan", "add", "-y", "3", "Física III", "-a", "Física I", "-r", "Física II", "-a",
            "Análisis I",
        ]);
        let add = matches.subcommand_matches("add");
        assert!(add.is_some());
        let Command::Add {
            regular, approved, ..
        } = Args::from_arg_matches(&matches).unwrap().command
        else {
            panic!("expected add");
        };
        let ordered = requirements_in_order(add, regular, approved);
        assert_eq!(
            ordered,
            vec![
                ("Física I".to_string(), CorrelativeKind::Approve),
                ("Física II".to_string(), CorrelativeKind::Regularize),
                ("Análisis I".to_string(), CorrelativeKind::Approve),
            ]
        );
    }

    #[test]
    fn resolves_subjects_by_id_or_name() {
        let mut plan = Plan::new();
        let id = plan.add_subject(1, "Física I", Vec::new()).unwrap().id;
        assert_eq!(resolve_id(&plan, &id).unwrap(), id);
        assert_eq!(resolve_id(&plan, "física i").unwrap(), id);
        assert!(resolve_id(&plan, "Química").is_err());
    }
}
