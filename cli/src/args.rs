use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "Coursepay CLI - ledger back-office operations")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Recompute lecturer balances from the transaction and withdrawal history
    ///
    /// Folds the recorded history and rewrites any aggregate counter that has
    /// drifted. Runs over every known lecturer unless one is given.
    Reconcile(ReconcileArgs),

    /// Print a lecturer's earnings summary
    Earnings(EarningsArgs),

    /// Register an affiliate referral code
    CreateAffiliateCode(CreateAffiliateCodeArgs),
}

#[derive(ClapArgs, Debug)]
pub struct ReconcileArgs {
    /// Reconcile only this lecturer
    #[arg(short, long, help = "Lecturer id to reconcile")]
    pub lecturer: Option<String>,
}

#[derive(ClapArgs, Debug)]
pub struct EarningsArgs {
    /// Lecturer id to summarize
    #[arg(short, long, help = "Lecturer id to summarize")]
    pub lecturer: String,
}

#[derive(ClapArgs, Debug)]
pub struct CreateAffiliateCodeArgs {
    /// The referral code itself
    #[arg(short, long, help = "The referral code, e.g. ABC123")]
    pub code: String,

    /// Lecturer id the code pays out to
    #[arg(short, long, help = "Lecturer id the code pays out to")]
    pub affiliate: String,
}
