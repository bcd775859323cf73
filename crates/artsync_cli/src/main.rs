use clap::Parser;

use artsync_fs::{SpecMirrorOptions, mirror_tree};

/// Artifacts produced by the contract build, relative to the invocation
/// directory (the repo's `scripts/` directory).
const C_PATH_REL_ARTIFACTS: &str = "../artifacts";
/// Where the front-end checkout consumes the artifacts.
const C_PATH_REL_FRONTEND_ARTIFACTS: &str = "../../sports-betting-ui/sports-betting-ui/artifacts";

#[derive(Parser)]
#[command(name = "artsync")]
#[command(version)]
#[command(
    about = "Mirror contract build artifacts into the front-end repo",
    long_about = None
)]
struct Cli {}

fn main() {
    let _cli = Cli::parse();

    match mirror_tree(
        C_PATH_REL_ARTIFACTS,
        C_PATH_REL_FRONTEND_ARTIFACTS,
        SpecMirrorOptions::default(),
    ) {
        Ok(report) if report.error_count() == 0 => {
            println!("Front end repo updated");
        }
        Ok(report) => {
            for spec_error in &report.errors {
                eprintln!(
                    "Error: {}: {}",
                    spec_error.path.display(),
                    spec_error.exception
                );
            }
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
