mod args;

pub use args::{Args, Commands, CreateAffiliateCodeArgs, EarningsArgs, ReconcileArgs};
use clap::Parser;
use common::{AffiliateCode, Database};

/// Runs the CLI command parser and executes the selected command.
/// Returns true if a CLI command was handled, false otherwise.
pub async fn run_cli() -> bool {
    let args = Args::parse();
    match &args.command {
        Some(Commands::Reconcile(reconcile_args)) => {
            if let Err(e) = reconcile(reconcile_args.lecturer.as_deref()).await {
                eprintln!("Failed to reconcile balances: {e}");
            }
            true
        }
        Some(Commands::Earnings(earnings_args)) => {
            if let Err(e) = print_earnings(&earnings_args.lecturer).await {
                eprintln!("Failed to summarize earnings: {e}");
            }
            true
        }
        Some(Commands::CreateAffiliateCode(code_args)) => {
            if let Err(e) = create_affiliate_code(&code_args.code, &code_args.affiliate).await {
                eprintln!("Failed to create affiliate code: {e}");
            }
            true
        }
        None => false,
    }
}

async fn connect() -> anyhow::Result<Database> {
    let database_url =
        std::env::var("DATABASE_URL").map_err(|_| anyhow::anyhow!("DATABASE_URL not set"))?;
    Database::new(&database_url).await
}

/// Recomputes aggregate balances from history and reports what changed.
async fn reconcile(lecturer: Option<&str>) -> anyhow::Result<()> {
    let db = connect().await?;
    let lecturers = match lecturer {
        Some(id) => vec![id.to_string()],
        None => db.list_lecturer_ids().await?,
    };

    let mut corrected = 0;
    for lecturer_id in &lecturers {
        let (stored, derived) = db.reconcile_lecturer(lecturer_id).await?;
        if stored != derived {
            corrected += 1;
            println!(
                "Corrected lecturer {}: stored balance {} -> derived {}",
                lecturer_id, stored, derived
            );
        }
    }
    println!(
        "Reconciled {} lecturer(s), corrected {}.",
        lecturers.len(),
        corrected
    );
    Ok(())
}

async fn print_earnings(lecturer_id: &str) -> anyhow::Result<()> {
    let db = connect().await?;
    let account = db
        .get_lecturer_account(lecturer_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("No account recorded for lecturer '{lecturer_id}'"))?;
    let transactions = db.get_transactions_for_lecturer(lecturer_id).await?;

    println!("Lecturer {}", lecturer_id);
    println!("  total earnings:       {}", account.total_earnings);
    println!("  withdrawable balance: {}", account.pending_withdrawal);
    println!("  transactions:         {}", transactions.len());
    for tx in transactions.iter().take(10) {
        println!(
            "    {}  amount={} earning={} ref={}",
            tx.created_at
                .map(|t| t.to_string())
                .unwrap_or_else(|| "-".to_string()),
            tx.amount,
            tx.lecturer_earning,
            tx.external_reference
        );
    }
    Ok(())
}

/// Registers a referral code: validates it is non-empty and not yet taken.
async fn create_affiliate_code(code: &str, affiliate_id: &str) -> anyhow::Result<()> {
    if code.trim().is_empty() || affiliate_id.trim().is_empty() {
        return Err(anyhow::anyhow!("Code and affiliate id must be non-empty."));
    }

    let db = connect().await?;
    if db.get_affiliate_code(code).await?.is_some() {
        return Err(anyhow::anyhow!("Affiliate code '{}' already exists.", code));
    }

    db.save_affiliate_code(&AffiliateCode {
        code: code.to_string(),
        affiliate_id: affiliate_id.to_string(),
        active: true,
    })
    .await
    .map_err(|e| anyhow::anyhow!("Database error: {e}"))?;

    println!("Affiliate code '{}' created for '{}'.", code, affiliate_id);
    Ok(())
}
