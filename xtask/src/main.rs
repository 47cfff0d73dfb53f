use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{exit, Command, ExitStatus};

use clap::{Args, Parser, Subcommand, ValueEnum};
use hot_topics_infra::solution::{build_solution_stack, DeploymentConfig};
use serde_json::{Map, Value};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const LAMBDA_DIST_DIR: &str = "dist";
const PRODUCER_BIN: &str = "ingestion_producer";
const PRODUCER_ZIP: &str = "ingestion-producer.zip";

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the hot-topics infrastructure workspace",
    long_about = "A unified CLI for synthesizing the CloudFormation template,\n\
                  packaging the ingestion Lambda, and running CI checks."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize the solution stack to a CloudFormation JSON template
    Synth(SynthArgs),
    /// Run CI checks (fmt, clippy, tests)
    Ci {
        /// Job to run
        #[arg(value_enum, default_value_t = CiJob::Check)]
        job: CiJob,
    },
    /// Build and package the ingestion-producer Lambda zip
    LambdaPackage {
        /// Compilation target triple for Lambda binaries
        #[arg(long, default_value = "x86_64-unknown-linux-gnu")]
        target: String,
        /// Build profile used for binaries
        #[arg(value_enum, long, default_value_t = BuildProfile::Release)]
        profile: BuildProfile,
    },
}

/// Flags override values read from `--config`.
#[derive(Args, Debug, Default, Clone)]
struct SynthArgs {
    /// JSON deployment config file
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, env = "HOT_TOPICS_STACK_NAME")]
    stack_name: Option<String>,
    #[arg(long, env = "HOT_TOPICS_SOLUTION_NAME")]
    solution_name: Option<String>,
    #[arg(long, env = "HOT_TOPICS_STATE_MACHINE_ARN")]
    state_machine_arn: Option<String>,
    #[arg(long, env = "HOT_TOPICS_QUERY_PARAMETER")]
    query_parameter: Option<String>,
    /// e.g. `(0/2 * * * ? *)` or `rate(5 minutes)`
    #[arg(long, env = "HOT_TOPICS_INGEST_FREQUENCY")]
    ingest_frequency: Option<String>,
    #[arg(long, env = "HOT_TOPICS_SUPPORTED_LANG")]
    supported_lang: Option<String>,
    #[arg(long, env = "HOT_TOPICS_CREDENTIAL_KEY_PATH")]
    credential_key_path: Option<String>,
    /// Bucket the `lambda-package` zip was uploaded to
    #[arg(long, env = "HOT_TOPICS_PRODUCER_CODE_BUCKET")]
    producer_code_bucket: Option<String>,
    /// Defaults to `<solution>/ingestion-producer.zip`
    #[arg(long, env = "HOT_TOPICS_PRODUCER_CODE_KEY")]
    producer_code_key: Option<String>,
    /// Defaults to `cdk.out/<stack>.template.json`
    #[arg(long)]
    output: Option<PathBuf>,
}

impl SynthArgs {
    fn overrides(&self) -> [(&'static str, Option<&String>); 9] {
        [
            ("stack_name", self.stack_name.as_ref()),
            ("solution_name", self.solution_name.as_ref()),
            ("state_machine_arn", self.state_machine_arn.as_ref()),
            ("query_parameter", self.query_parameter.as_ref()),
            ("ingest_frequency", self.ingest_frequency.as_ref()),
            ("supported_lang", self.supported_lang.as_ref()),
            ("credential_key_path", self.credential_key_path.as_ref()),
            ("producer_code_bucket", self.producer_code_bucket.as_ref()),
            ("producer_code_key", self.producer_code_key.as_ref()),
        ]
    }
}

#[derive(Clone, ValueEnum)]
enum CiJob {
    /// Formatting, clippy, and tests
    Check,
    /// Check plus a template synthesis smoke run
    All,
}

#[derive(Clone, Copy, ValueEnum)]
enum BuildProfile {
    Debug,
    Release,
}

impl BuildProfile {
    fn dir_name(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
        }
    }

    fn as_cargo_flag(self) -> Option<&'static str> {
        match self {
            Self::Debug => None,
            Self::Release => Some("--release"),
        }
    }
}

// ── helpers ────────────────────────────────────────────────────────

fn step(label: &str) {
    eprintln!("\n=== {label} ===");
}

fn cargo(args: &[&str]) -> ExitStatus {
    eprintln!("+ cargo {}", args.join(" "));
    Command::new("cargo")
        .args(args)
        .status()
        .expect("failed to execute cargo")
}

fn run_cargo(args: &[&str]) {
    let status = cargo(args);
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

// ── synth ──────────────────────────────────────────────────────────

fn resolve_deployment_config(args: &SynthArgs) -> Result<DeploymentConfig, String> {
    let mut merged = match &args.config {
        Some(path) => {
            let raw = fs::read_to_string(path).map_err(|error| {
                format!("failed to read config '{}': {error}", path.display())
            })?;
            match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(map)) => map,
                Ok(_) => return Err(format!("config '{}' must be a JSON object", path.display())),
                Err(error) => {
                    return Err(format!("config '{}' is not valid JSON: {error}", path.display()))
                }
            }
        }
        None => Map::new(),
    };

    for (key, value) in args.overrides() {
        if let Some(value) = value {
            merged.insert(key.to_string(), Value::String(value.clone()));
        }
    }

    DeploymentConfig::from_json_str(&Value::Object(merged).to_string())
        .map_err(|error| error.to_string())
}

fn default_template_path(stack_name: &str) -> PathBuf {
    Path::new("cdk.out").join(format!("{stack_name}.template.json"))
}

fn write_template(config: &DeploymentConfig, output: &Path) -> Result<String, String> {
    let template = build_solution_stack(config)
        .map_err(|error| error.to_string())?
        .synth();

    if let Some(parent) = output.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|error| format!("failed to create '{}': {error}", parent.display()))?;
    }
    let mut body = template.to_json_pretty();
    body.push('\n');
    fs::write(output, body)
        .map_err(|error| format!("failed to write '{}': {error}", output.display()))?;

    Ok(template.fingerprint())
}

fn synth(args: &SynthArgs) -> Result<(), String> {
    step("Synthesize solution stack");
    let config = resolve_deployment_config(args)?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_template_path(&config.stack_name));
    let fingerprint = write_template(&config, &output)?;

    eprintln!(
        "\nWrote template:\n- {}\n- fingerprint {fingerprint}",
        output.display()
    );
    Ok(())
}

// ── lambda packaging ───────────────────────────────────────────────

fn package_producer_lambda(target: &str, profile: BuildProfile) {
    ensure_rust_target_installed(target);

    step("Build ingestion producer binary");

    let mut cargo_args = vec![
        "build",
        "-p",
        "hot_topics_lambda",
        "--target",
        target,
        "--bin",
        PRODUCER_BIN,
    ];
    if let Some(flag) = profile.as_cargo_flag() {
        cargo_args.push(flag);
    }
    run_cargo(&cargo_args);

    step("Package lambda zip artifact");
    let profile_dir = profile.dir_name();
    let target_dir = Path::new("target").join(target).join(profile_dir);
    let dist_dir = Path::new(LAMBDA_DIST_DIR);
    fs::create_dir_all(dist_dir).expect("failed to create lambda dist directory");

    package_lambda_zip(
        &target_dir.join(binary_name(PRODUCER_BIN, target)),
        &dist_dir.join(PRODUCER_ZIP),
    );

    eprintln!(
        "\nPackaged artifact:\n- {}\nUpload it and pass --producer-code-bucket/--producer-code-key \
         to `synth` to deploy it.",
        dist_dir.join(PRODUCER_ZIP).display()
    );
}

fn ensure_rust_target_installed(target: &str) {
    let output = Command::new("rustup")
        .args(["target", "list", "--installed"])
        .output();

    let output = match output {
        Ok(value) => value,
        Err(error) => {
            eprintln!(
                "warning: failed to run `rustup target list --installed` ({error}); \
                 continuing without target preflight"
            );
            return;
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!(
            "failed to list installed rust targets; run `rustup target list --installed` \
             manually. details: {}",
            stderr.trim()
        );
    }

    let installed = String::from_utf8_lossy(&output.stdout);
    if !installed.lines().any(|line| line.trim() == target) {
        panic!(
            "required rust target `{target}` is not installed. install it with \
             `rustup target add {target}` and re-run `cargo run -p xtask -- lambda-package`"
        );
    }
}

fn binary_name(bin_name: &str, target: &str) -> String {
    if target.contains("windows") {
        format!("{bin_name}.exe")
    } else {
        bin_name.to_string()
    }
}

/// Lambda custom runtimes expect the executable as `bootstrap` at the zip root.
fn package_lambda_zip(binary_path: &Path, zip_path: &Path) {
    if !binary_path.exists() {
        panic!("expected lambda binary at '{}'", binary_path.display());
    }

    let binary = fs::read(binary_path).expect("failed to read lambda binary");
    let file = fs::File::create(zip_path).expect("failed to create lambda zip");
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o755);
    zip.start_file("bootstrap", options)
        .expect("failed to start bootstrap entry in lambda zip");
    zip.write_all(&binary)
        .expect("failed to write bootstrap entry");
    zip.finish().expect("failed to finish lambda zip");
}

// ── CI jobs ────────────────────────────────────────────────────────

fn ci_check() {
    step("Check formatting");
    run_cargo(&["fmt", "--all", "--", "--check"]);

    step("Clippy");
    run_cargo(&[
        "clippy",
        "--all-targets",
        "--all-features",
        "--",
        "-D",
        "warnings",
    ]);

    step("Test hot_topics_infra");
    run_cargo(&["test", "-p", "hot_topics_infra"]);

    step("Test hot_topics_lambda");
    run_cargo(&["test", "-p", "hot_topics_lambda"]);
}

fn ci_synth_smoke() {
    let args = SynthArgs {
        stack_name: Some("ci-smoke".to_string()),
        solution_name: Some("SO0122".to_string()),
        state_machine_arn: Some(
            "arn:aws:states:us-east-1:111111111111:stateMachine:ingest".to_string(),
        ),
        query_parameter: Some("Health".to_string()),
        output: Some(Path::new("target").join("ci-smoke.template.json")),
        ..SynthArgs::default()
    };
    if let Err(error) = synth(&args) {
        eprintln!("error: {error}");
        exit(1);
    }
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Synth(args) => {
            if let Err(error) = synth(&args) {
                eprintln!("error: {error}");
                exit(1);
            }
        }
        Commands::Ci { job } => {
            match job {
                CiJob::Check => ci_check(),
                CiJob::All => {
                    ci_check();
                    ci_synth_smoke();
                }
            }
            eprintln!("\nCI job passed.");
        }
        Commands::LambdaPackage { target, profile } => {
            package_producer_lambda(&target, profile);
        }
    }
}
