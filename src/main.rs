use anyhow::Result;
use demex::{
    args::{Cli, USAGE},
    demo::{DemoFile, DemoSource},
    export::{self, Outcome},
};
use std::{env, fs, process::exit};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    // ─── 2) resolve arguments ────────────────────────────────────────
    let argv: Vec<String> = env::args().skip(1).collect();
    let cli = match Cli::from_args(&argv) {
        Ok(cli) => cli,
        Err(err) => {
            println!("{}", err);
            println!("{}", USAGE);
            exit(1);
        }
    };
    if !cli.demo_path.is_file() {
        println!("Error: file '{}' not found.", cli.demo_path.display());
        exit(1);
    }

    // ─── 3) set up the output directory ──────────────────────────────
    let out_dir = cli.output_dir();
    fs::create_dir_all(&out_dir)?;
    println!("parsing demo: {}", cli.demo_path.display());
    println!("output directory: {}", out_dir.display());

    // ─── 4) parse the demo once ──────────────────────────────────────
    let bundle = DemoFile::new(&cli.demo_path).parse()?;
    info!("demo parsed");

    // ─── 5) export each category ─────────────────────────────────────
    let outcomes = export::export_bundle(bundle, &out_dir, cli.format)?;
    let saved = outcomes
        .iter()
        .filter(|o| matches!(o, Outcome::Saved { .. }))
        .count();

    // ─── 6) summary ──────────────────────────────────────────────────
    println!(
        "done: {} {} file(s) in {}",
        saved,
        cli.format.label(),
        out_dir.display()
    );
    Ok(())
}
