//! Paracurve CLI - formula evaluation and curve sampling tool

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use paracurve::prelude::*;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "paracurve")]
#[command(
    author,
    version,
    about = "Evaluate formulas and sample parametric curves"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a formula and print the result
    Eval {
        /// Formula text, e.g. "a*cos(t)"
        formula: String,

        /// Variable binding (repeatable)
        #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_variable)]
        vars: Vec<(String, f64)>,
    },

    /// Compile a formula and print its postfix instruction stream
    Compile {
        /// Formula text
        formula: String,
    },

    /// Sample a parametric curve and print its points
    Sample {
        #[command(flatten)]
        curve: CurveArgs,

        /// Repeat the first point at the end
        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        closed: bool,

        /// Drop samples whose formulas fail instead of aborting
        #[arg(long)]
        skip_errors: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Csv)]
        format: Format,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Curve formulas and range; anything omitted keeps the stock curve's value
#[derive(clap::Args)]
struct CurveArgs {
    #[arg(long)]
    a: Option<String>,
    #[arg(long)]
    b: Option<String>,
    #[arg(long)]
    c: Option<String>,
    #[arg(short = 'x', long = "x")]
    x: Option<String>,
    #[arg(short = 'y', long = "y")]
    y: Option<String>,
    #[arg(short = 'z', long = "z")]
    z: Option<String>,

    /// Helper formula evaluated after c (repeatable, kept in order)
    #[arg(long = "helper", value_name = "NAME=FORMULA", value_parser = parse_helper)]
    helpers: Vec<Helper>,

    #[arg(long, allow_negative_numbers = true)]
    t_min: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    t_max: Option<f64>,
    #[arg(long)]
    interval: Option<f64>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Csv,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Eval { formula, vars } => eval(&formula, vars),
        Commands::Compile { formula } => show_program(&formula),
        Commands::Sample {
            curve,
            closed,
            skip_errors,
            format,
            output,
        } => {
            let options = SamplingOptions {
                closed,
                on_error: if skip_errors {
                    ErrorPolicy::SkipPoint
                } else {
                    ErrorPolicy::Fail
                },
            };
            sample_curve(curve.into_definition(), &options, format, output.as_deref())
        }
    }
}

fn eval(formula: &str, vars: Vec<(String, f64)>) -> Result<()> {
    let bindings: Bindings = vars.into_iter().collect();
    let value = evaluate(formula, &bindings)
        .with_context(|| format!("Failed to evaluate '{}'", formula))?;
    println!("{}", value);
    Ok(())
}

fn show_program(formula: &str) -> Result<()> {
    let program = compile(formula).with_context(|| format!("Failed to compile '{}'", formula))?;
    println!("{}", program);
    eprintln!(
        "{} instructions, variables: {}",
        program.len(),
        program.variables().join(", ")
    );
    Ok(())
}

fn sample_curve(
    curve: CurveDefinition,
    options: &SamplingOptions,
    format: Format,
    output: Option<&Path>,
) -> Result<()> {
    let sampling = curve.sample(options).context("Failed to sample curve")?;

    let text = match format {
        Format::Csv => points_to_csv(&sampling.points),
        Format::Json => {
            serde_json::to_string_pretty(&sampling.points).context("Failed to encode points")?
        }
    };

    match output {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("Failed to write '{}'", path.display()))?,
        None => println!("{}", text.trim_end()),
    }

    eprintln!(
        "Sampled {} values of t: {} points ({} skipped)",
        sampling.stats.samples,
        sampling.points.len(),
        sampling.stats.skipped
    );
    if sampling.stats.skipped > 0 {
        eprintln!("Warning: some formulas failed; rerun without --skip-errors for details");
    }
    Ok(())
}

impl CurveArgs {
    fn into_definition(self) -> CurveDefinition {
        let stock = CurveDefinition::default();
        CurveDefinition {
            a: self.a.unwrap_or(stock.a),
            b: self.b.unwrap_or(stock.b),
            c: self.c.unwrap_or(stock.c),
            x: self.x.unwrap_or(stock.x),
            y: self.y.unwrap_or(stock.y),
            z: self.z.unwrap_or(stock.z),
            helpers: self.helpers,
            t_min: self.t_min.unwrap_or(stock.t_min),
            t_max: self.t_max.unwrap_or(stock.t_max),
            interval: self.interval.unwrap_or(stock.interval),
        }
    }
}

fn points_to_csv(points: &[Point]) -> String {
    let mut out = String::from("x,y,z\n");
    for p in points {
        out.push_str(&format!("{},{},{}\n", p.x, p.y, p.z));
    }
    out
}

fn split_assignment(text: &str) -> Result<(&str, &str)> {
    match text.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim(), value.trim())),
        _ => bail!("expected NAME=VALUE, got '{}'", text),
    }
}

fn parse_variable(text: &str) -> Result<(String, f64)> {
    let (name, value) = split_assignment(text)?;
    let value: f64 = value
        .parse()
        .with_context(|| format!("'{}' is not a number", value))?;
    Ok((name.to_string(), value))
}

fn parse_helper(text: &str) -> Result<Helper> {
    let (name, formula) = split_assignment(text)?;
    Ok(Helper::new(name, formula))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_variable() {
        assert_eq!(parse_variable("a=2.5").unwrap(), ("a".to_string(), 2.5));
        assert_eq!(parse_variable(" t = -1 ").unwrap(), ("t".to_string(), -1.0));
        assert!(parse_variable("a").is_err());
        assert!(parse_variable("=1").is_err());
        assert!(parse_variable("a=x").is_err());
    }

    #[test]
    fn test_parse_helper_keeps_inner_equals() {
        let helper = parse_helper("d1=isequal(a,b)").unwrap();
        assert_eq!(helper, Helper::new("d1", "isequal(a,b)"));
    }

    #[test]
    fn test_sample_arguments() {
        let cli = Cli::try_parse_from([
            "paracurve",
            "sample",
            "-x",
            "r*cos(t)",
            "--helper",
            "r=2",
            "--t-min",
            "-1",
            "--closed",
            "false",
            "--skip-errors",
        ])
        .unwrap();

        match cli.command {
            Commands::Sample {
                curve,
                closed,
                skip_errors,
                ..
            } => {
                assert!(!closed);
                assert!(skip_errors);
                let def = curve.into_definition();
                assert_eq!(def.x, "r*cos(t)");
                assert_eq!(def.y, CurveDefinition::default().y);
                assert_eq!(def.t_min, -1.0);
                assert_eq!(def.helpers, vec![Helper::new("r", "2")]);
            }
            _ => panic!("expected sample command"),
        }
    }

    #[test]
    fn test_points_to_csv() {
        let csv = points_to_csv(&[Point::new(1.0, 0.5, 0.0), Point::new(-2.0, 0.0, 3.25)]);
        assert_eq!(csv, "x,y,z\n1,0.5,0\n-2,0,3.25\n");
        assert_eq!(points_to_csv(&[]), "x,y,z\n");
    }
}
