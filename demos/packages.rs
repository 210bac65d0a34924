//! Compiles a small package-selection rule set and prints the solver request.
//!
//! Run with:
//! ```bash
//! cargo run --example packages -- --select gui --select -docs
//! cargo run --example packages -- --response answer.json
//! ```
//!
//! A selection prefixed with `-` is a removal. With `--response`, the given solver
//! answer is decoded against the prepared query.

use std::fs;
use std::path::PathBuf;

use chrono::{Duration, Utc};
use clap::Parser;
use ruleset_rs::model::Model;
use ruleset_rs::ruleset::RulesetBuilder;
use ruleset_rs::selection::Selection;
use ruleset_rs::solver::SolveResponse;
use ruleset_rs::types::Period;
use ruleset_rs::weights::WeightConfig;

#[derive(Debug, Parser)]
#[command(author, version, about = "Package selection rules as an integer program")]
struct Cli {
    /// Selections in priority order; prefix with '-' to remove
    #[arg(long = "select")]
    selections: Vec<String>,

    /// Solver response (JSON) to decode
    #[arg(long)]
    response: Option<PathBuf>,

    /// Write the constraint DAG in DOT format to this file
    #[arg(long)]
    dot: Option<PathBuf>,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Debug,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let cli = Cli::parse();

    let mut model = Model::new();
    model.add_primitives(["core", "gui", "cli", "docs", "nightly"])?;
    let ui = model.set_or(["gui", "cli"])?;
    let needs_ui = model.set_imply("core", &ui)?;
    let one_ui = model.set_one_or_none(["gui", "cli"])?;
    let docs_with_gui = model.set_imply("docs", "gui")?;
    model.assume([&needs_ui, &one_ui, &docs_with_gui])?;
    println!("variables = {}", model.variables().len());

    if let Some(path) = &cli.dot {
        fs::write(path, model.to_dot()?)?;
        println!("DAG written to {}", path.display());
    }

    let now = Utc::now();
    let mut builder = RulesetBuilder::new(model);
    builder.prefer(["core"])?;
    builder.enable_period(Period::new(now, now + Duration::days(14))?)?;
    builder.assume_in_period("nightly", Period::new(now + Duration::days(7), now + Duration::days(14))?)?;
    let ruleset = builder.build()?;
    println!("polyhedron {:?}:\n{}", ruleset.polyhedron().shape(), ruleset.polyhedron());

    let selections: Vec<Selection> = cli
        .selections
        .iter()
        .map(|s| match s.strip_prefix('-') {
            Some(id) => Selection::remove(id),
            None => Selection::add(s.as_str()),
        })
        .collect();
    let query = ruleset.prepare(&selections, Some(now), &WeightConfig::default())?;
    println!("selections after reduction = {:?}", query.selections());
    println!("problem = {}", query.problem().to_json()?);

    if let Some(path) = &cli.response {
        let response = SolveResponse::from_json(&fs::read_to_string(path)?)?;
        let solution = query.decode(response)?;
        println!("solution = {:?}", solution.values);
        if let Some(warning) = &solution.warning {
            println!("warning: {}", warning);
        }
    }

    Ok(())
}
