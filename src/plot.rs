use super::chart::{self, ChartSeries, TimeUnit};
use super::error::{Error, Result};
use super::{TimeDistance, VERSION};
use clap::{App, Arg, ArgMatches};
use std::path::{Path, PathBuf};

/// Settings of one plotting run, built once from the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotConfig {
    pub csv_path: PathBuf,
    /// None shows the chart in the image viewer instead of saving it
    pub out_path: Option<PathBuf>,
    pub use_milliseconds: bool,
}

fn cli_app() -> App<'static, 'static> {
    let arg_csvin = Arg::with_name("input_csvfile")
        .help("path to the csv file from the tag detector")
        .long("csv")
        .takes_value(true)
        .required(true);
    let arg_pngout = Arg::with_name("output_pngfile")
        .help("output png path (e.g., plot.png); if omitted, the plot is only shown")
        .short("o")
        .long("out")
        .takes_value(true);
    let arg_ms = Arg::with_name("milliseconds")
        .help("use milliseconds on the x axis (default: seconds)")
        .long("ms");
    App::new("tagdist_plot")
        .version(VERSION.unwrap_or("unknown"))
        .author("Luca Peruzzo")
        .about("cli app to plot elapsed time vs. m_dist from the AprilTag csv")
        .arg(arg_csvin)
        .arg(arg_pngout)
        .arg(arg_ms)
}

fn config_from_matches(cli_args: &ArgMatches) -> PlotConfig {
    PlotConfig {
        csv_path: PathBuf::from(cli_args.value_of("input_csvfile").unwrap_or_default()),
        out_path: cli_args.value_of("output_pngfile").map(PathBuf::from),
        use_milliseconds: cli_args.is_present("milliseconds"),
    }
}

/// Takes the CLI arguments that control the plotting of the distance log.
/// Exits with the clap message on invalid arguments.
pub fn parse_cli() -> PlotConfig {
    config_from_matches(&cli_app().get_matches())
}

/// Resolves a relative path against the current directory, without following symlinks.
pub fn absolute_path(p: &Path) -> std::io::Result<PathBuf> {
    if p.is_absolute() {
        Ok(p.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(p))
    }
}

/// Reads the csv, then saves or shows the chart.
/// Returns the absolute path of the saved image, None when the chart was shown.
pub fn run(config: &PlotConfig) -> Result<Option<PathBuf>> {
    let timedistance = TimeDistance::from_csv(&config.csv_path)?;
    if timedistance.is_empty() {
        return Err(Error::EmptyDataset);
    }
    let series = ChartSeries::prepare(
        &timedistance,
        TimeUnit::from_ms_flag(config.use_milliseconds),
    );
    match &config.out_path {
        Some(fout) => {
            log::info!("plotting {} samples to {}", series.len(), fout.display());
            chart::render_png(&series, fout)?;
            let abs = absolute_path(fout).map_err(|source| Error::Io {
                path: fout.clone(),
                source,
            })?;
            Ok(Some(abs))
        }
        None => {
            chart::show(&series)?;
            Ok(None)
        }
    }
}
