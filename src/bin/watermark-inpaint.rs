use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use watermark_inpaint::session::{MAX_RADIUS, MIN_RADIUS};
use watermark_inpaint::{
    default_output_path, MethodChoice, ProcessOptions, ProcessResult, Region, Remover, Script,
    Session,
};

#[derive(Parser)]
#[command(
    name = "watermark-inpaint",
    about = "Remove watermarks and objects from images by inpainting",
    version,
    after_help = "Examples:\n  \
                  watermark-inpaint photo.jpg --rect 900,620,110,80\n  \
                  watermark-inpaint shots/ -o cleaned/ --mask logo_mask.png\n  \
                  watermark-inpaint photo.png --script edits.txt"
)]
struct Cli {
    /// Input image file or directory
    input: String,

    /// Output file or directory (default: {name}_inpainted.{ext})
    #[arg(short, long)]
    output: Option<String>,

    /// Rectangle to remove, as x,y,width,height (repeatable)
    #[arg(long = "rect", value_name = "X,Y,W,H", value_parser = parse_rect)]
    rects: Vec<Region>,

    /// Disc to remove, as x,y,radius (repeatable)
    #[arg(long = "disc", value_name = "X,Y,R", value_parser = parse_disc)]
    discs: Vec<Region>,

    /// Mask image; non-zero pixels are removed
    #[arg(long)]
    mask: Option<PathBuf>,

    /// Inpainting neighborhood radius in pixels (1-20)
    #[arg(short, long, default_value_t = 7)]
    radius: u32,

    /// Inpainting method: auto, telea or ns
    #[arg(short, long, default_value = "auto")]
    method: MethodChoice,

    /// Replay an editing script on a single image
    #[arg(long, conflicts_with_all = ["rects", "discs", "mask"])]
    script: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn parse_rect(s: &str) -> Result<Region, String> {
    match s.parse::<Region>() {
        Ok(region @ Region::Rect(_)) => Ok(region),
        Ok(_) => Err("expected x,y,width,height".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

fn parse_disc(s: &str) -> Result<Region, String> {
    match s.parse::<Region>() {
        Ok(region @ Region::Disc { .. }) => Ok(region),
        Ok(_) => Err("expected x,y,radius".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

fn init_logging(cli: &Cli) {
    let level = if cli.quiet {
        log::LevelFilter::Error
    } else if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    if !(MIN_RADIUS..=MAX_RADIUS).contains(&cli.radius) {
        eprintln!("Error: Radius must be between {MIN_RADIUS} and {MAX_RADIUS}");
        process::exit(1);
    }

    let input_path = Path::new(&cli.input);
    if !input_path.exists() {
        eprintln!("Error: Input path does not exist: {}", cli.input);
        process::exit(1);
    }

    if let Some(script) = &cli.script {
        process::exit(run_script(&cli, input_path, script));
    }

    let opts = ProcessOptions {
        regions: cli.rects.iter().chain(&cli.discs).copied().collect(),
        mask_path: cli.mask.clone(),
        radius: cli.radius,
        method: cli.method,
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    if opts.regions.is_empty() && opts.mask_path.is_none() {
        eprintln!("Error: Nothing to remove; pass --rect, --disc, --mask or --script");
        process::exit(1);
    }

    let remover = match Remover::new(&opts) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Fatal: Failed to load mask: {e}");
            process::exit(1);
        }
    };

    let results = if input_path.is_dir() {
        let output_dir = if let Some(o) = &cli.output {
            PathBuf::from(o)
        } else {
            eprintln!("Error: Output directory is required for batch processing");
            eprintln!("Usage: watermark-inpaint <input_dir> -o <output_dir> --rect x,y,w,h");
            process::exit(1);
        };
        remover.process_directory(input_path, &output_dir, &opts)
    } else {
        let output_path = match &cli.output {
            Some(o) => PathBuf::from(o),
            None => default_output_path(input_path),
        };
        vec![remover.process_file(input_path, &output_path, &opts)]
    };

    let mut success_count = 0u32;
    let mut skip_count = 0u32;
    let mut fail_count = 0u32;

    for r in &results {
        print_result(r, &opts);
        if r.skipped {
            skip_count += 1;
        } else if r.success {
            success_count += 1;
        } else {
            fail_count += 1;
        }
    }

    if results.len() > 1 && !opts.quiet {
        eprintln!();
        eprint!("[Summary] Processed: {success_count}");
        if skip_count > 0 {
            eprint!(", Skipped: {skip_count}");
        }
        if fail_count > 0 {
            eprint!(", Failed: {fail_count}");
        }
        eprintln!(" (Total: {})", results.len());
    }

    if fail_count > 0 {
        process::exit(1);
    }
}

/// Replay a script on a single image and save the result. Returns the exit
/// code.
fn run_script(cli: &Cli, input: &Path, script_path: &Path) -> i32 {
    if input.is_dir() {
        eprintln!("Error: --script works on a single image, not a directory");
        return 1;
    }

    let script = match Script::load(script_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("[FAIL] {}: {e}", script_path.display());
            return 1;
        }
    };

    let mut session = match Session::open(input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("[FAIL] {}: Failed to load: {e}", input.display());
            return 1;
        }
    };
    session.set_radius(cli.radius);
    session.set_method(cli.method);

    if let Err(e) = script.run(&mut session) {
        eprintln!("[FAIL] {}: {e}", script_path.display());
        return 1;
    }

    let output = match &cli.output {
        Some(o) => PathBuf::from(o),
        None => default_output_path(input),
    };
    if let Err(e) = session.save(&output) {
        eprintln!("[FAIL] {}: Failed to save: {e}", output.display());
        return 1;
    }

    if !cli.quiet {
        eprintln!(
            "[OK] {} ({} commands) -> {}",
            input.display(),
            script.len(),
            output.display()
        );
    }
    0
}

fn print_result(result: &ProcessResult, opts: &ProcessOptions) {
    if opts.quiet && result.success {
        return;
    }

    let filename = result.path.file_name().map_or_else(
        || result.path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    );

    if result.skipped {
        if !opts.quiet {
            eprintln!("[SKIP] {filename}: {}", result.message);
        }
    } else if result.success {
        if !opts.quiet {
            match result.method {
                Some(method) => eprintln!("[OK] {filename} ({method}, {} px)", result.marked),
                None => eprintln!("[OK] {filename}"),
            }
        }
    } else {
        eprintln!("[FAIL] {filename}: {}", result.message);
    }

    if opts.verbose && !result.message.is_empty() {
        eprintln!("  -> {}", result.message);
    }
}
