mod test_runner;

use std::io::Read;
use std::path::Path;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use newsdoc::{ContentState, from_html, to_html};

const SUBCOMMANDS: &[&str] = &["parse", "generate", "roundtrip", "test", "help"];

#[derive(Parser)]
#[command(name = "newsdoc", version, about = "Editor document <-> HTML converter")]
struct Cli {
    /// Disable colored test output
    #[arg(long, global = true)]
    no_color: bool,

    /// Log converter warnings to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse HTML into a document, printed as JSON
    Parse(ParseArgs),

    /// Generate HTML from a JSON document
    Generate(GenerateArgs),

    /// Parse HTML and generate it back
    Roundtrip(RoundtripArgs),

    /// Run .test.html test files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct ParseArgs {
    /// HTML input file, or - for stdin
    file: String,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Parse only, don't print the document (exit 0 if valid)
    #[arg(long)]
    check: bool,
}

#[derive(clap::Args)]
struct GenerateArgs {
    /// JSON document file, or - for stdin
    file: String,

    /// Atomic kinds to omit from the output ("table", "media", "embed"). Repeatable.
    #[arg(short, long)]
    disable: Vec<String>,
}

#[derive(clap::Args)]
struct RoundtripArgs {
    /// HTML input file, or - for stdin
    file: String,

    /// Atomic kinds to omit from the output ("table", "media", "embed"). Repeatable.
    #[arg(short, long)]
    disable: Vec<String>,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.html file or directory containing them
    path: String,
}

fn main() {
    // Backwards compatibility: if the first positional arg is not a known
    // subcommand, inject "roundtrip" so `newsdoc file.html` works like
    // `newsdoc roundtrip file.html`.
    let mut args: Vec<String> = std::env::args().collect();
    if let Some(first_pos) = args.iter().skip(1).find(|a| !a.starts_with('-')) {
        let first_pos = first_pos.clone();
        if !SUBCOMMANDS.contains(&first_pos.as_str()) {
            let pos = args.iter().position(|a| *a == first_pos).unwrap();
            args.insert(pos, "roundtrip".to_string());
        }
    }

    let cli = Cli::parse_from(&args);
    init_logging(cli.verbose);

    match cli.command {
        Command::Parse(parse_args) => do_parse(parse_args),
        Command::Generate(generate_args) => do_generate(generate_args),
        Command::Roundtrip(roundtrip_args) => do_roundtrip(roundtrip_args),
        Command::Test(test_args) => {
            let path = Path::new(&test_args.path);
            let exit_code = test_runner::run_tests(path, cli.no_color);
            process::exit(exit_code);
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "newsdoc=warn" } else { "off" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_input(file: &str) -> String {
    if file == "-" {
        let mut buf = String::new();
        if let Err(e) = std::io::stdin().read_to_string(&mut buf) {
            eprintln!("error: cannot read stdin: {}", e);
            process::exit(1);
        }
        buf
    } else {
        match std::fs::read_to_string(file) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error: cannot read '{}': {}", file, e);
                process::exit(1);
            }
        }
    }
}

fn do_parse(args: ParseArgs) {
    let html = read_input(&args.file);
    let state = match from_html(&html) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    if args.check {
        eprintln!("ok: {} parsed successfully", args.file);
        return;
    }

    let json = if args.pretty {
        serde_json::to_string_pretty(&state)
    } else {
        serde_json::to_string(&state)
    };
    match json {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("error: cannot encode document: {}", e);
            process::exit(1);
        }
    }
}

fn do_generate(args: GenerateArgs) {
    let json = read_input(&args.file);
    let state: ContentState = match serde_json::from_str(&json) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("error: invalid document: {}", e);
            process::exit(1);
        }
    };
    let options = match test_runner::generator_options(&args.disable) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };
    println!("{}", to_html(&state, &options));
}

fn do_roundtrip(args: RoundtripArgs) {
    let html = read_input(&args.file);
    let state = match from_html(&html) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };
    let options = match test_runner::generator_options(&args.disable) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };
    println!("{}", to_html(&state, &options));
}
