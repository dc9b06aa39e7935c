use anyhow::{anyhow, Context, Result};
use clap::Parser;
use colchart::aggregate::Aggregation;
use colchart::chart::ChartType;
use colchart::csv_reader;
use colchart::data::Dataset;
use colchart::filter::{distinct_values, FilterSpec};
use colchart::palette::{ColorPalette, ColorSource, RandomColors};
use colchart::series::aggregation_tooltip;
use colchart::session::{DisplayMode, Session};
use colchart::value::CellValue;
use colchart::{OutputFormat, RenderOptions};
use log::{info, warn};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "colchart")]
#[command(about = "Chart raw or aggregated columns of a CSV/JSON dataset", long_about = None)]
struct Args {
    /// Input file; stdin when omitted or "-"
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Treat the input as a JSON array of objects instead of CSV
    #[arg(long)]
    json_input: bool,

    /// Comma-separated headers to chart
    #[arg(long, value_delimiter = ',', required = true)]
    headers: Vec<String>,

    #[arg(short, long, value_enum, default_value_t = DisplayMode::Raw)]
    mode: DisplayMode,

    /// Aggregation function: Concat, Count, CountDistinct, Mode, Minimum, Maximum,
    /// Sum, Average, Median, Range, Attribute or Percentage
    #[arg(short, long)]
    aggregation: Option<String>,

    #[arg(short, long, value_enum, default_value_t = ChartType::Bar)]
    chart: ChartType,

    /// Keep only these values of a header, e.g. --filter team=red,blue (repeatable)
    #[arg(long = "filter")]
    filters: Vec<String>,

    /// Write the filtered dataset as CSV to this path
    #[arg(long)]
    export: Option<PathBuf>,

    /// Export only this column (single-column download)
    #[arg(long, requires = "export")]
    export_column: Option<String>,

    /// Seed for random series colors; the category10 palette is used when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Output path; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long, default_value_t = 800)]
    width: u32,

    #[arg(long, default_value_t = 600)]
    height: u32,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Png)]
    format: OutputFormat,

    /// Print the aggregation result of every header to stderr
    #[arg(long)]
    summary: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let data = load_dataset(args.input.as_deref(), args.json_input)
        .context("Failed to load input data")?;
    let mut session = Session::new(data);

    for raw in &args.filters {
        let spec = parse_filter(raw, session.original())?;
        session.apply_filter(spec)?;
    }

    for header in &args.headers {
        session.drop_header(header)?;
    }
    session.set_chart_type(args.chart);
    session.set_mode(args.mode);

    let aggregation = args
        .aggregation
        .as_deref()
        .map(|name| {
            name.parse::<Aggregation>().map_err(|_| {
                let names: Vec<&str> = Aggregation::ALL.iter().map(|a| a.name()).collect();
                anyhow!("Unknown aggregation '{}' (expected one of: {})", name, names.join(", "))
            })
        })
        .transpose()?;
    if let Some(aggregation) = aggregation {
        session.set_aggregation(aggregation);
    } else if args.summary {
        warn!("--summary ignored: no aggregation function given");
    }

    if let Some(path) = &args.export {
        if let Some(header) = &args.export_column {
            if !session.view().has_header(header) {
                anyhow::bail!("Unknown header '{}' for --export-column", header);
            }
        }
        let file = fs::File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        match &args.export_column {
            Some(header) => {
                csv_reader::write_column_csv(session.view(), header, file)?;
                info!("Exported column {} to {}", header, path.display());
            }
            None => {
                csv_reader::write_csv(session.view(), session.headers(), file)?;
                info!("Exported filtered dataset to {}", path.display());
            }
        }
    }

    if args.summary {
        if let Some(aggregation) = aggregation {
            for header in session.selected_headers() {
                eprintln!("{}", aggregation_tooltip(session.view(), header, aggregation));
            }
        }
    }

    let mut colors: Box<dyn ColorSource> = match args.seed {
        Some(seed) => Box::new(RandomColors::seeded(seed)),
        None => Box::new(ColorPalette::category10()),
    };
    let board = session.build_board(colors.as_mut())?;

    let options = RenderOptions {
        width: args.width,
        height: args.height,
        format: args.format,
    };

    if options.format == OutputFormat::Json {
        let series: Vec<_> = board.handles().iter().map(|h| h.series()).collect();
        let bytes = if series.len() == 1 {
            serde_json::to_vec_pretty(series[0])
        } else {
            serde_json::to_vec_pretty(&series)
        }
        .context("Failed to serialize chart series")?;
        return write_output(args.output.as_deref(), &bytes);
    }

    if board.len() == 1 {
        let bytes = board.handles()[0].render(&options).context("Failed to render chart")?;
        return write_output(args.output.as_deref(), &bytes);
    }

    let output = args
        .output
        .as_deref()
        .ok_or_else(|| anyhow!("Rendering {} charts requires --output", board.len()))?;
    for (idx, handle) in board.handles().iter().enumerate() {
        let bytes = handle.render(&options).context("Failed to render chart")?;
        write_output(Some(&numbered_path(output, idx)), &bytes)?;
    }

    Ok(())
}

fn load_dataset(input: Option<&Path>, json: bool) -> Result<Dataset> {
    let stdin = input.map_or(true, |p| p.as_os_str() == "-");
    if json {
        let text = if stdin {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).context("Failed to read stdin")?;
            buf
        } else {
            let path = input.unwrap_or_else(|| Path::new("-"));
            fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?
        };
        let value: serde_json::Value =
            serde_json::from_str(&text).context("Input is not valid JSON")?;
        Dataset::from_json(&value)
    } else {
        match input {
            Some(path) if !stdin => csv_reader::read_csv_file(path),
            _ => csv_reader::read_csv_from_stdin(),
        }
    }
}

/// Parse `header=v1,v2`. Values are matched against the column's own cells
/// by text, so numbers and booleans from JSON input filter as expected.
fn parse_filter(raw: &str, data: &Dataset) -> Result<FilterSpec> {
    let (header, values) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("Filter '{}' must look like header=value1,value2", raw))?;
    let header = header.trim();
    if header.is_empty() {
        anyhow::bail!("Filter '{}' has no header", raw);
    }

    let candidates = distinct_values(data, header, None);
    let allowed = values
        .split(',')
        .map(|text| {
            candidates
                .iter()
                .find(|c| !c.is_absent() && c.to_text() == text)
                .cloned()
                .unwrap_or_else(|| CellValue::text(text))
        })
        .collect();

    Ok(FilterSpec::new(header, allowed))
}

fn numbered_path(path: &Path, idx: usize) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("chart");
    let name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}-{}.{}", stem, idx + 1, ext),
        None => format!("{}-{}", stem, idx + 1),
    };
    path.with_file_name(name)
}

fn write_output(path: Option<&Path>, bytes: &[u8]) -> Result<()> {
    match path {
        Some(path) if path.as_os_str() != "-" => {
            fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
        }
        _ => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(bytes).context("Failed to write to stdout")?;
            handle.flush().context("Failed to flush stdout")
        }
    }
}
