use crate::app::dto::{StepKind, StrategyKind, TraceRequest, TraceStep};
use crate::app::engine::AnalysisEngine;
use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "callpath",
    version,
    about = "Reconstruct call graphs of Ruby programs and query possible execution traces"
)]
pub struct Cli {
    /// Symbol database (JSON)
    #[arg(long, short = 'd', value_name = "FILE")]
    pub database: PathBuf,

    /// Parsed source tree (JSON); repeat for several files
    #[arg(long = "source", short = 's', value_name = "FILE")]
    pub sources: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print every trace visiting the components in order, e.g. `trace toplevel A#b C.d`
    Trace {
        #[arg(required = true, num_args = 2..)]
        components: Vec<String>,
        /// Walk the relations directly instead of the trace graph
        #[arg(long)]
        direct: bool,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export the trace graph in Graphviz DOT format
    Dot {
        /// Output file (stdout when omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// List the extracted relations
    Relations {
        #[arg(long)]
        json: bool,
    },
    /// Interactive trace shell
    Shell,
    /// Serve the HTTP API
    Serve {
        #[arg(long, default_value = "127.0.0.1:8118")]
        addr: SocketAddr,
    },
    /// Serve MCP tools over stdio
    Mcp,
}

/// One line per step: `file:line:Owner#name`, `file:line:[block]` or `[toplevel]`.
pub fn format_step(step: &TraceStep) -> String {
    let location = match (&step.file, step.line) {
        (Some(file), Some(line)) => format!("{file}:{line}:"),
        _ => String::new(),
    };
    match step.kind {
        StepKind::Toplevel => "[toplevel]".to_string(),
        StepKind::Method => format!("{location}{}", step.name),
        StepKind::Block => format!("{location}[block]"),
    }
}

fn write_traces<W: Write>(out: &mut W, traces: &[Vec<TraceStep>]) -> Result<()> {
    for trace in traces {
        for step in trace {
            writeln!(out, "{}", format_step(step))?;
        }
        writeln!(out)?;
    }
    writeln!(out, "Found {} possible traces", traces.len())?;
    Ok(())
}

pub fn print_traces<W: Write>(
    engine: &AnalysisEngine,
    components: &[String],
    direct: bool,
    json: bool,
    out: &mut W,
) -> Result<()> {
    let strategy = if direct {
        StrategyKind::Direct
    } else {
        StrategyKind::Graph
    };
    let res = engine.trace(TraceRequest {
        components: components.to_vec(),
        strategy,
    })?;

    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&res)?)?;
    } else {
        write_traces(out, &res.traces)?;
    }
    Ok(())
}

pub fn export_dot(engine: &AnalysisEngine, output: Option<&Path>) -> Result<()> {
    let dot = engine.dot()?;
    match output {
        Some(path) => {
            std::fs::write(path, &dot)
                .with_context(|| format!("Failed to write DOT file: {}", path.display()))?;
            let summary = engine.graph_summary();
            eprintln!(
                "Wrote {}: {} edges, {} nodes",
                path.display(),
                summary.edge_count,
                summary.node_count
            );
        }
        None => print!("{dot}"),
    }
    Ok(())
}

pub fn print_relations<W: Write>(engine: &AnalysisEngine, json: bool, out: &mut W) -> Result<()> {
    let relations = engine.relations();
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&relations)?)?;
        return Ok(());
    }

    for relation in &relations {
        let mut line = format!("{} {} {}", relation.location, relation.kind, relation.origin);
        if let Some(callee) = &relation.callee {
            line.push_str(&format!(" -> {callee}"));
        }
        if let Some(block) = &relation.block {
            line.push_str(&format!(" with {block}"));
        }
        if relation.pass_through_block == Some(true) {
            line.push_str(" (passes own block)");
        }
        writeln!(out, "{line}")?;
    }
    writeln!(out, "{} relations", relations.len())?;
    Ok(())
}

/// Read-eval loop over `input`. Accepts `trace <components>...` and `quit`;
/// a failed query prints the error and keeps the shell running.
pub fn run_shell<R: BufRead, W: Write>(engine: &AnalysisEngine, input: R, out: &mut W) -> Result<()> {
    writeln!(out, "Ready:")?;
    writeln!(out, "  > trace toplevel Array#each String.new")?;
    out.flush()?;

    for line in input.lines() {
        let line = line?;
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };

        match command {
            "trace" => {
                let components: Vec<String> = words.map(str::to_string).collect();
                if let Err(e) = print_traces(engine, &components, false, false, out) {
                    writeln!(out, "error: {e}")?;
                }
            }
            "quit" | "exit" => break,
            other => writeln!(out, "Unknown command: {other}")?,
        }
        out.flush()?;
    }
    Ok(())
}
