use crate::commands::{
    run_default_matrix, run_matrix_estimate, run_matrix_validate, run_staging_evaluate,
    run_staging_simulate, run_weighted, DefaultMatrixArgs, MatrixEstimateArgs,
    MatrixValidateArgs, StagingEvaluateArgs, StagingSimulateArgs, WeightedArgs,
};
use crate::demo::{run_demo, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use psak_risk::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "psak-risk",
    about = "Run PSAK 71 staging, migration matrix, and forward-looking adjustment tooling",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Evaluate or simulate staging rules
    Staging {
        #[command(subcommand)]
        command: StagingCommand,
    },
    /// Validate, estimate, or generate migration matrices
    Matrix {
        #[command(subcommand)]
        command: MatrixCommand,
    },
    /// Forward-looking scenario adjustment
    Fla {
        #[command(subcommand)]
        command: FlaCommand,
    },
    /// Walk through staging, migration, FLA, and ECL on sample data
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum StagingCommand {
    /// Evaluate a rule list against one transaction context
    Evaluate(StagingEvaluateArgs),
    /// Run a rule list over a batch of transactions
    Simulate(StagingSimulateArgs),
}

#[derive(Subcommand, Debug)]
enum MatrixCommand {
    /// Check that every row of a period sums to 1
    Validate(MatrixValidateArgs),
    /// Estimate a matrix from a CSV of historical transitions
    Estimate(MatrixEstimateArgs),
    /// Print the default starting matrix
    Default(DefaultMatrixArgs),
}

#[derive(Subcommand, Debug)]
enum FlaCommand {
    /// Compute probability-weighted PD/LGD from a JSON request
    Weighted(WeightedArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Staging {
            command: StagingCommand::Evaluate(args),
        } => run_staging_evaluate(args),
        Command::Staging {
            command: StagingCommand::Simulate(args),
        } => run_staging_simulate(args),
        Command::Matrix {
            command: MatrixCommand::Validate(args),
        } => run_matrix_validate(args),
        Command::Matrix {
            command: MatrixCommand::Estimate(args),
        } => run_matrix_estimate(args),
        Command::Matrix {
            command: MatrixCommand::Default(args),
        } => run_default_matrix(args),
        Command::Fla {
            command: FlaCommand::Weighted(args),
        } => run_weighted(args),
        Command::Demo(args) => run_demo(args),
    }
}
