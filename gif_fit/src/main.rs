use clap::{Args, Parser, Subcommand};
use gif_fit::{
    compress_file, presets::Preset, tally, ConversionSummary, ConvertOptions, PresetStore,
};
use indicatif::ProgressBar;
use rayon::prelude::*;
use shared_utils::batch::{collect_files, BatchResult, GIF_EXTENSIONS};
use shared_utils::size_search::SizeConstraints;
use std::path::PathBuf;
use tracing::warn;

#[derive(Parser)]
#[command(name = "gif-fit")]
#[command(version, about = "Fit animated GIFs into a size budget via ffmpeg palette re-encoding", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Constraint flags layered on top of the selected preset.
#[derive(Args, Debug, Clone)]
struct ConstraintArgs {
    /// Target output size in MB
    #[arg(long)]
    target_mb: Option<f64>,
    /// Acceptable deviation below the target, in MB
    #[arg(long)]
    tolerance_mb: Option<f64>,
    /// Maximum output width in pixels
    #[arg(long)]
    max_width: Option<u32>,
    /// Minimum acceptable duration in seconds
    #[arg(long)]
    min_duration: Option<f64>,
    /// Maximum acceptable duration in seconds
    #[arg(long)]
    max_duration: Option<f64>,
    /// Slack applied to the duration range check, in seconds
    #[arg(long)]
    duration_epsilon: Option<f64>,
    /// Try keep-timing profiles before resampling frame rates
    #[arg(long)]
    prefer_stable_timing: bool,
    #[arg(long)]
    no_prefer_stable_timing: bool,
}

impl ConstraintArgs {
    fn apply(&self, base: &Preset) -> Preset {
        let mut preset = base.clone();
        if let Some(v) = self.target_mb {
            preset.max_mb = v;
        }
        if let Some(v) = self.tolerance_mb {
            preset.tol_mb = v;
        }
        if let Some(v) = self.max_width {
            preset.max_w = v;
        }
        if let Some(v) = self.min_duration {
            preset.dur_min = v;
        }
        if let Some(v) = self.max_duration {
            preset.dur_max = v;
        }
        if let Some(v) = self.duration_epsilon {
            preset.dur_eps = v;
        }
        if self.prefer_stable_timing {
            preset.prefer_keep = true;
        }
        if self.no_prefer_stable_timing {
            preset.prefer_keep = false;
        }
        preset
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compress files or directories of GIFs
    #[command(name = "run")]
    Run {
        #[arg(value_name = "INPUT", required = true)]
        inputs: Vec<PathBuf>,
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Preset to start from (defaults to the current one)
        #[arg(long)]
        preset: Option<String>,
        #[command(flatten)]
        constraints: ConstraintArgs,
        #[arg(short, long)]
        recursive: bool,
        /// Overwrite existing outputs
        #[arg(short, long)]
        force: bool,
        /// Concurrent compressions (each file is one sequential request)
        #[arg(short = 'j', long)]
        jobs: Option<usize>,
        /// Emit per-file results as JSON instead of text
        #[arg(long)]
        json: bool,
        /// Show full ffmpeg output in trials
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print GIF metadata (width, height, duration, frame count)
    Probe {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        #[arg(long)]
        json: bool,
    },

    /// Manage named constraint presets
    Preset {
        #[command(subcommand)]
        action: PresetAction,
    },
}

#[derive(Subcommand)]
enum PresetAction {
    /// List stored presets
    List,
    /// Save a preset from the current preset plus any constraint flags
    Save {
        name: String,
        #[command(flatten)]
        constraints: ConstraintArgs,
    },
    /// Delete a preset (the default cannot be deleted)
    Delete { name: String },
    /// Select the preset used by default
    Use { name: String },
}

fn main() -> anyhow::Result<()> {
    let _ = shared_utils::logging::init_logging(
        "gif_fit",
        shared_utils::logging::LogConfig::default(),
    );

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            inputs,
            output_dir,
            preset,
            constraints,
            recursive,
            force,
            jobs,
            json,
            verbose,
        } => {
            let store = PresetStore::load_default();
            let base = match &preset {
                Some(id) => store
                    .get(id)
                    .ok_or_else(|| anyhow::anyhow!("No such preset: {}", id))?,
                None => store.current(),
            };
            let effective = constraints.apply(base);
            let mut size_constraints = effective.constraints();
            size_constraints.verbose = size_constraints.verbose || verbose;
            size_constraints
                .validate()
                .map_err(|e| anyhow::anyhow!("{}", e))?;

            // Encoder availability is fatal for the whole run
            shared_utils::require_ffmpeg().map_err(|e| anyhow::anyhow!("{}", e))?;

            let files = gather_inputs(&inputs, recursive);
            if files.is_empty() {
                anyhow::bail!("No GIF files found in the given inputs");
            }

            let options = ConvertOptions {
                output_dir,
                force,
                custom_profiles: effective.profiles.clone(),
            };
            let jobs = jobs.unwrap_or_else(|| num_cpus::get().clamp(1, 4));

            let start = std::time::Instant::now();
            let (result, summaries) = run_batch(&files, &size_constraints, &options, jobs);

            if json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else {
                for summary in &summaries {
                    gif_fit::report::print_file_line(summary);
                }
                gif_fit::report::print_batch_summary(&result, start.elapsed());
            }

            if result.failed > 0 {
                std::process::exit(1);
            }
        }

        Commands::Probe { input, json } => {
            let meta = shared_utils::probe::probe_file(&input)
                .map_err(|e| anyhow::anyhow!("{}", e))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&meta)?);
            } else {
                println!("size:     {}", shared_utils::human_bytes(meta.size));
                println!(
                    "width:    {}",
                    meta.width.map(|w| w.to_string()).unwrap_or_else(|| "unknown".into())
                );
                println!(
                    "height:   {}",
                    meta.height.map(|h| h.to_string()).unwrap_or_else(|| "unknown".into())
                );
                println!(
                    "duration: {}",
                    meta.duration_secs
                        .map(|d| format!("{:.2}s", d))
                        .unwrap_or_else(|| "unknown".into())
                );
                println!(
                    "frames:   {}",
                    meta.frame_count
                        .map(|f| f.to_string())
                        .unwrap_or_else(|| "unknown".into())
                );
            }
        }

        Commands::Preset { action } => {
            let mut store = PresetStore::load_default();
            match action {
                PresetAction::List => {
                    for preset in &store.presets {
                        let marker = if preset.id == store.current { "*" } else { " " };
                        println!(
                            "{} {:<12} {} · {}MB ±{}MB · {}px · {}-{}s",
                            marker,
                            preset.id,
                            preset.name,
                            preset.max_mb,
                            preset.tol_mb,
                            preset.max_w,
                            preset.dur_min,
                            preset.dur_max,
                        );
                    }
                }
                PresetAction::Save { name, constraints } => {
                    let mut preset = constraints.apply(store.current());
                    preset.id = slugify(&name);
                    preset.name = name;
                    let id = preset.id.clone();
                    store.upsert(preset);
                    store.set_current(&id).map_err(|e| anyhow::anyhow!("{}", e))?;
                    store.save().map_err(|e| anyhow::anyhow!("{}", e))?;
                    println!("Saved preset '{}'", id);
                }
                PresetAction::Delete { name } => {
                    store.delete(&name).map_err(|e| anyhow::anyhow!("{}", e))?;
                    store.save().map_err(|e| anyhow::anyhow!("{}", e))?;
                    println!("Deleted preset '{}'", name);
                }
                PresetAction::Use { name } => {
                    store.set_current(&name).map_err(|e| anyhow::anyhow!("{}", e))?;
                    store.save().map_err(|e| anyhow::anyhow!("{}", e))?;
                    println!("Current preset is now '{}'", name);
                }
            }
        }
    }

    Ok(())
}

/// Expand the CLI inputs into a flat list of GIF files.
fn gather_inputs(inputs: &[PathBuf], recursive: bool) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            files.extend(collect_files(input, GIF_EXTENSIONS, recursive));
        } else if shared_utils::has_extension(input, GIF_EXTENSIONS) {
            files.push(input.clone());
        } else {
            warn!(path = %input.display(), "Skipping non-GIF input");
        }
    }
    files.sort();
    files.dedup();
    files
}

/// One worker per in-flight compression; trials within a request stay
/// strictly sequential in that worker.
fn run_batch(
    files: &[PathBuf],
    constraints: &SizeConstraints,
    options: &ConvertOptions,
    jobs: usize,
) -> (BatchResult, Vec<ConversionSummary>) {
    let pb = ProgressBar::new(files.len() as u64);

    let outcomes: Vec<(PathBuf, shared_utils::Result<ConversionSummary>)> =
        match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
            Ok(pool) => pool.install(|| {
                files
                    .par_iter()
                    .map(|file| {
                        let outcome = compress_file(file, constraints, options);
                        pb.inc(1);
                        (file.clone(), outcome)
                    })
                    .collect()
            }),
            Err(e) => {
                warn!(error = %e, "Failed to build worker pool, falling back to sequential");
                files
                    .iter()
                    .map(|file| {
                        let outcome = compress_file(file, constraints, options);
                        pb.inc(1);
                        (file.clone(), outcome)
                    })
                    .collect()
            }
        };
    pb.finish_and_clear();

    let mut result = BatchResult::new();
    let mut summaries = Vec::new();
    for (path, outcome) in outcomes {
        match outcome {
            Ok(summary) => {
                tally(&mut result, &summary);
                summaries.push(summary);
            }
            Err(e) => result.fail(path, e.to_string()),
        }
    }
    (result, summaries)
}

/// Lowercased, dash-separated preset id from a display name.
fn slugify(name: &str) -> String {
    let slug: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        "preset".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Discord Emoji"), "discord-emoji");
        assert_eq!(slugify("  weird!!name  "), "weird--name");
        assert_eq!(slugify("!!!"), "preset");
    }

    #[test]
    fn test_constraint_args_layering() {
        let args = ConstraintArgs {
            target_mb: Some(2.0),
            tolerance_mb: None,
            max_width: Some(512),
            min_duration: None,
            max_duration: None,
            duration_epsilon: None,
            prefer_stable_timing: false,
            no_prefer_stable_timing: true,
        };
        let preset = args.apply(&Preset::wechat_default());
        assert_eq!(preset.max_mb, 2.0);
        assert_eq!(preset.tol_mb, 1.0);
        assert_eq!(preset.max_w, 512);
        assert!(!preset.prefer_keep);
    }

    #[test]
    fn test_gather_inputs_filters_non_gif() {
        let dir = tempfile::tempdir().unwrap();
        let gif = dir.path().join("a.gif");
        let png = dir.path().join("b.png");
        std::fs::write(&gif, b"x").unwrap();
        std::fs::write(&png, b"x").unwrap();
        let files = gather_inputs(&[gif.clone(), png], false);
        assert_eq!(files, vec![gif]);
    }

    #[test]
    fn test_gather_inputs_dedups() {
        let dir = tempfile::tempdir().unwrap();
        let gif = dir.path().join("a.gif");
        std::fs::write(&gif, b"x").unwrap();
        let files = gather_inputs(&[gif.clone(), dir.path().to_path_buf()], false);
        assert_eq!(files.len(), 1);
    }
}
